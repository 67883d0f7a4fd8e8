//! SQLite schema definition - archive index v1
//!
//! One row per preserved file. `content_hash` is the deduplication key;
//! `tags` holds a JSON array so the sequence round-trips in order.
//! Timestamps are RFC 3339 UTC with microseconds, so text order is time order.

pub const SCHEMA_VERSION: i64 = 1;

pub const SCHEMA: &str = r#"
-- ============================================
-- ARCHIVED FILES
-- ============================================

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,  -- monotonic, never reused
    filename TEXT NOT NULL,
    original_path TEXT NOT NULL,           -- informational, not re-validated
    content_hash TEXT NOT NULL UNIQUE,     -- remote content identifier
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',       -- JSON array, insertion order
    file_size INTEGER NOT NULL CHECK (file_size >= 0),
    mime_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_files_filename ON files(filename);
CREATE INDEX IF NOT EXISTS idx_files_title ON files(title);
CREATE INDEX IF NOT EXISTS idx_files_tags ON files(tags);
CREATE UNIQUE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash);
CREATE INDEX IF NOT EXISTS idx_files_recency ON files(updated_at DESC, id DESC);
"#;
