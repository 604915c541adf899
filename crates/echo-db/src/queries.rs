use crate::models::{ActivityRow, EntryRow, ReplyRow, ReportRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::ToSql;

/// Parameters for the visibility-filtered entry listing. All fields are
/// plain strings so the DB layer stays independent of the engine types.
#[derive(Debug, Default)]
pub struct EntryQuery<'a> {
    /// Authenticated viewer id, if any. Drives the visibility clause.
    pub viewer: Option<&'a str>,
    /// Scope tab filter (exact match), e.g. "community".
    pub scope: Option<&'a str>,
    /// Restrict to one author (profile history view).
    pub author: Option<&'a str>,
    /// Substring search over headline OR reflection.
    pub search: Option<&'a str>,
    pub limit: u32,
    pub offset: u32,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn set_moderator(&self, id: &str, moderator: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE profiles SET is_moderator = ?1 WHERE id = ?2",
                (moderator as i64, id),
            )?;
            Ok(())
        })
    }

    /// Batch-resolve usernames for the moderation queue.
    pub fn usernames_for_ids(&self, ids: &[String]) -> Result<Vec<(String, String)>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, username FROM profiles WHERE id IN ({})",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(bind_all(ids).as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Entries --

    #[allow(clippy::too_many_arguments)]
    pub fn insert_entry(
        &self,
        id: &str,
        author_id: &str,
        headline: &str,
        reflection: &str,
        scope: &str,
        tags_json: &str,
        mood_tone: &str,
        image_url: Option<&str>,
        is_anonymous: bool,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO mood_entries
                    (id, author_id, headline, reflection, scope, tags, mood_tone, image_url, is_anonymous, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    author_id,
                    headline,
                    reflection,
                    scope,
                    tags_json,
                    mood_tone,
                    image_url,
                    is_anonymous as i64,
                    created_at
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_entry(&self, id: &str) -> Result<Option<EntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{ENTRY_COLUMNS} WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_entry_row).optional()?;
            Ok(row)
        })
    }

    /// Delete an entry; reactions and replies cascade. Returns false when
    /// the entry was already gone.
    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM mood_entries WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// One page of entries the viewer is allowed to see, newest first with
    /// the entry id as tiebreaker so the ordering key is strictly monotonic.
    pub fn list_entries(&self, q: &EntryQuery) -> Result<Vec<EntryRow>> {
        self.with_conn(|conn| {
            let mut clauses: Vec<String> = Vec::new();
            let mut args: Vec<String> = Vec::new();

            match q.viewer {
                Some(viewer) => {
                    clauses.push(format!(
                        "(e.scope = 'public'
                          OR e.scope = 'community'
                          OR e.author_id = ?{}
                          OR (e.scope = 'circle' AND EXISTS (
                                SELECT 1 FROM follows f
                                WHERE f.follower_id = e.author_id AND f.following_id = ?{})))",
                        args.len() + 1,
                        args.len() + 2,
                    ));
                    args.push(viewer.to_string());
                    args.push(viewer.to_string());
                }
                None => clauses.push("e.scope = 'public'".to_string()),
            }

            if let Some(scope) = q.scope {
                clauses.push(format!("e.scope = ?{}", args.len() + 1));
                args.push(scope.to_string());
            }

            if let Some(author) = q.author {
                clauses.push(format!("e.author_id = ?{}", args.len() + 1));
                args.push(author.to_string());
            }

            if let Some(search) = q.search {
                let pattern = format!("%{}%", search);
                clauses.push(format!(
                    "(e.headline LIKE ?{} OR e.reflection LIKE ?{})",
                    args.len() + 1,
                    args.len() + 2,
                ));
                args.push(pattern.clone());
                args.push(pattern);
            }

            let sql = format!(
                "{ENTRY_COLUMNS_ALIASED}
                 WHERE {}
                 ORDER BY e.created_at DESC, e.id DESC
                 LIMIT {} OFFSET {}",
                clauses.join(" AND "),
                q.limit,
                q.offset,
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(bind_all(&args).as_slice(), map_entry_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Engagement (batched lookups, one query per page) --

    pub fn reaction_counts(&self, entry_ids: &[String]) -> Result<Vec<(String, i64)>> {
        self.grouped_counts("reactions", entry_ids)
    }

    pub fn reply_counts(&self, entry_ids: &[String]) -> Result<Vec<(String, i64)>> {
        self.grouped_counts("replies", entry_ids)
    }

    fn grouped_counts(&self, table: &str, entry_ids: &[String]) -> Result<Vec<(String, i64)>> {
        if entry_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT entry_id, COUNT(*) FROM {table} WHERE entry_id IN ({}) GROUP BY entry_id",
                placeholders(entry_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(bind_all(entry_ids).as_slice(), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Of the given entries, which ones this user has reacted to.
    pub fn reacted_by(&self, entry_ids: &[String], user_id: &str) -> Result<Vec<String>> {
        if entry_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT entry_id FROM reactions WHERE user_id = ?1 AND entry_id IN ({})",
                placeholders_from(2, entry_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn ToSql> = vec![&user_id as &dyn ToSql];
            params.extend(entry_ids.iter().map(|id| id as &dyn ToSql));
            let rows = stmt
                .query_map(params.as_slice(), |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Of the given authors, which ones count the viewer in their circle.
    pub fn circle_authors(&self, author_ids: &[String], viewer_id: &str) -> Result<Vec<String>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT follower_id FROM follows WHERE following_id = ?1 AND follower_id IN ({})",
                placeholders_from(2, author_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn ToSql> = vec![&viewer_id as &dyn ToSql];
            params.extend(author_ids.iter().map(|id| id as &dyn ToSql));
            let rows = stmt
                .query_map(params.as_slice(), |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn add_follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                (follower_id, following_id),
            )?;
            Ok(())
        })
    }

    pub fn remove_follow(&self, follower_id: &str, following_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                (follower_id, following_id),
            )?;
            Ok(())
        })
    }

    // -- Reactions --

    /// Insert unless the (entry, user) pair already holds a reaction.
    /// Returns false on the duplicate; the UNIQUE constraint is the authority.
    pub fn insert_reaction(
        &self,
        id: &str,
        entry_id: &str,
        user_id: &str,
        kind: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO reactions (id, entry_id, user_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, entry_id, user_id, kind, created_at),
            )?;
            Ok(n > 0)
        })
    }

    /// Reactions left by other users on this author's entries, newest
    /// first. Backs the activity page; self-reactions are not activity.
    pub fn recent_activity(&self, author_id: &str, limit: u32) -> Result<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT r.id, r.kind, r.user_id, p.username, e.id, e.headline, r.created_at
                 FROM reactions r
                 JOIN mood_entries e ON e.id = r.entry_id
                 JOIN profiles p ON p.id = r.user_id
                 WHERE e.author_id = ?1 AND r.user_id != ?1
                 ORDER BY r.created_at DESC, r.id DESC
                 LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([author_id], |row| {
                    Ok(ActivityRow {
                        reaction_id: row.get(0)?,
                        kind: row.get(1)?,
                        reactor_id: row.get(2)?,
                        reactor_username: row.get(3)?,
                        entry_id: row.get(4)?,
                        headline: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn remove_reaction(&self, entry_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM reactions WHERE entry_id = ?1 AND user_id = ?2",
                (entry_id, user_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Toggle a reaction: removes if present, inserts if not.
    /// Returns (added, reaction count after the toggle).
    pub fn toggle_reaction(
        &self,
        id: &str,
        entry_id: &str,
        user_id: &str,
        kind: &str,
        created_at: &str,
    ) -> Result<(bool, i64)> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM reactions WHERE entry_id = ?1 AND user_id = ?2",
                    (entry_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            let added = match existing {
                Some(existing_id) => {
                    conn.execute("DELETE FROM reactions WHERE id = ?1", [&existing_id])?;
                    false
                }
                None => {
                    conn.execute(
                        "INSERT INTO reactions (id, entry_id, user_id, kind, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        (id, entry_id, user_id, kind, created_at),
                    )?;
                    true
                }
            };

            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reactions WHERE entry_id = ?1",
                [entry_id],
                |row| row.get(0),
            )?;

            Ok((added, count))
        })
    }

    // -- Replies --

    pub fn insert_reply(
        &self,
        id: &str,
        entry_id: &str,
        author_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO replies (id, entry_id, author_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, entry_id, author_id, body, created_at),
            )?;
            Ok(())
        })
    }

    /// Replies ordered oldest first for display.
    pub fn replies_for_entry(&self, entry_id: &str) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entry_id, author_id, body, created_at
                 FROM replies WHERE entry_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt
                .query_map([entry_id], |row| {
                    Ok(ReplyRow {
                        id: row.get(0)?,
                        entry_id: row.get(1)?,
                        author_id: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reports --

    pub fn insert_report(
        &self,
        id: &str,
        entry_id: &str,
        reporter_id: &str,
        reason: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, entry_id, reporter_id, reason, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                (id, entry_id, reporter_id, reason, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_report(&self, id: &str) -> Result<Option<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entry_id, reporter_id, reason, status, created_at
                 FROM reports WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_report_row).optional()?;
            Ok(row)
        })
    }

    /// Transition a pending report to a terminal status. The `status =
    /// 'pending'` guard makes terminal states immutable even under races;
    /// returns false when no pending row was updated.
    pub fn transition_report(&self, id: &str, to: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE reports SET status = ?1 WHERE id = ?2 AND status = 'pending'",
                (to, id),
            )?;
            Ok(n > 0)
        })
    }

    /// Full moderation queue, newest first.
    pub fn list_reports(&self) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, entry_id, reporter_id, reason, status, created_at
                 FROM reports ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], map_report_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const ENTRY_COLUMNS: &str = "SELECT id, author_id, headline, reflection, scope, tags, mood_tone, image_url, is_anonymous, created_at FROM mood_entries";

const ENTRY_COLUMNS_ALIASED: &str = "SELECT e.id, e.author_id, e.headline, e.reflection, e.scope, e.tags, e.mood_tone, e.image_url, e.is_anonymous, e.created_at FROM mood_entries e";

fn map_entry_row(row: &rusqlite::Row) -> std::result::Result<EntryRow, rusqlite::Error> {
    Ok(EntryRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        headline: row.get(2)?,
        reflection: row.get(3)?,
        scope: row.get(4)?,
        tags: row.get(5)?,
        mood_tone: row.get(6)?,
        image_url: row.get(7)?,
        is_anonymous: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
    })
}

fn map_report_row(row: &rusqlite::Row) -> std::result::Result<ReportRow, rusqlite::Error> {
    Ok(ReportRow {
        id: row.get(0)?,
        entry_id: row.get(1)?,
        reporter_id: row.get(2)?,
        reason: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, username, password, is_moderator, created_at FROM profiles WHERE {column} = ?1"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                is_moderator: row.get::<_, i64>(3)? != 0,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn placeholders(n: usize) -> String {
    placeholders_from(1, n)
}

fn placeholders_from(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_all(values: &[String]) -> Vec<&dyn ToSql> {
    values.iter().map(|v| v as &dyn ToSql).collect()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
