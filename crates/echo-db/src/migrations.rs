use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            is_moderator    INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS mood_entries (
            id              TEXT PRIMARY KEY,
            author_id       TEXT NOT NULL REFERENCES profiles(id),
            headline        TEXT NOT NULL,
            reflection      TEXT NOT NULL,
            scope           TEXT NOT NULL,
            tags            TEXT NOT NULL DEFAULT '[]',
            mood_tone       TEXT NOT NULL DEFAULT 'neutral',
            image_url       TEXT,
            is_anonymous    INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_feed
            ON mood_entries(created_at DESC, id DESC);

        CREATE INDEX IF NOT EXISTS idx_entries_author
            ON mood_entries(author_id);

        -- One reaction per (entry, viewer); rows die with their entry.
        CREATE TABLE IF NOT EXISTS reactions (
            id          TEXT PRIMARY KEY,
            entry_id    TEXT NOT NULL REFERENCES mood_entries(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES profiles(id),
            kind        TEXT NOT NULL DEFAULT 'like',
            created_at  TEXT NOT NULL,
            UNIQUE(entry_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_entry
            ON reactions(entry_id);

        CREATE TABLE IF NOT EXISTS replies (
            id          TEXT PRIMARY KEY,
            entry_id    TEXT NOT NULL REFERENCES mood_entries(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES profiles(id),
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_replies_entry
            ON replies(entry_id, created_at);

        -- Deliberately no FK to mood_entries: a report outlives its entry as
        -- an informational orphan in the moderation queue.
        CREATE TABLE IF NOT EXISTS reports (
            id          TEXT PRIMARY KEY,
            entry_id    TEXT NOT NULL,
            reporter_id TEXT NOT NULL REFERENCES profiles(id),
            reason      TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'pending',
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_status
            ON reports(status, created_at);

        -- Author-defined trusted relationships; backs the circle scope.
        CREATE TABLE IF NOT EXISTS follows (
            follower_id     TEXT NOT NULL REFERENCES profiles(id),
            following_id    TEXT NOT NULL REFERENCES profiles(id),
            created_at      TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (follower_id, following_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
