//! Archive index with SQLite
//!
//! Durable record of everything preserved in a vault:
//! - At most one record per content hash (re-archiving is a no-op)
//! - Exact lookup by content hash or id
//! - Case-insensitive substring search ranked by recency

mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use schema::{SCHEMA, SCHEMA_VERSION};

const COLUMNS: &str = "id, filename, original_path, content_hash, title, description, \
                       tags, file_size, mime_type, created_at, updated_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================
// RECORD TYPES
// ============================================

/// One preserved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub id: i64,
    pub filename: String,
    pub original_path: String,
    pub content_hash: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub file_size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record as submitted for insertion, before the index assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewArchiveRecord {
    pub filename: String,
    pub original_path: String,
    pub content_hash: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub file_size: u64,
    pub mime_type: String,
}

impl NewArchiveRecord {
    fn validate(&self) -> Result<()> {
        if self.filename.is_empty() {
            return Err(Error::InvalidArgument("filename must not be empty".into()));
        }
        if self.content_hash.is_empty() {
            return Err(Error::InvalidArgument("content hash must not be empty".into()));
        }
        Ok(())
    }
}

// ============================================
// TAG & TIMESTAMP ENCODING
// ============================================

/// Serialize a tag sequence for the `tags` column.
pub fn encode_tags(tags: &[String]) -> Result<String> {
    serde_json::to_string(tags)
        .map_err(|e| Error::Storage(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

/// Inverse of [`encode_tags`].
pub fn decode_tags(raw: &str) -> std::result::Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(raw)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn column_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn record_from_row(row: &Row) -> rusqlite::Result<ArchiveRecord> {
    let tags: String = row.get(6)?;
    let file_size: i64 = row.get(7)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(ArchiveRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_path: row.get(2)?,
        content_hash: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        tags: decode_tags(&tags).map_err(|e| column_error(6, e))?,
        file_size: u64::try_from(file_size)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Integer, Box::new(e)))?,
        mime_type: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| column_error(9, e))?
            .with_timezone(&Utc),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| column_error(10, e))?
            .with_timezone(&Utc),
    })
}

fn is_unavailable(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly | ErrorCode::PermissionDenied)
    )
}

/// Unicode-aware lowercase, so matching does not stop at ASCII the way
/// SQLite's builtin `lower()` does.
fn register_casefold(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn find_by_hash(conn: &Connection, hash: &str) -> Result<Option<ArchiveRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM files WHERE content_hash = ?"),
            params![hash],
            record_from_row,
        )
        .optional()?;
    Ok(record)
}

// ============================================
// INDEX HANDLE
// ============================================

/// Handle on a vault's archive index.
///
/// Holding a handle means the store is open; after [`ArchiveIndex::close`]
/// every operation fails with [`Error::IndexClosed`]. Writes are serialized
/// through the handle's lock and SQLite's own writer lock.
pub struct ArchiveIndex {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl ArchiveIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let unavailable = |source: Box<dyn std::error::Error + Send + Sync>| {
            Error::StorageUnavailable {
                path: path.to_path_buf(),
                source,
            }
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(Box::new(e)))?;
        }

        let conn = Connection::open(path).map_err(|e| unavailable(Box::new(e)))?;
        Self::init_connection(&conn, path).map_err(|e| match e {
            Error::Storage(inner) if is_unavailable(&inner) => unavailable(Box::new(inner)),
            other => other,
        })?;

        debug!(path = %path.display(), "archive index opened");
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(Some(conn)),
        })
    }

    fn init_connection(conn: &Connection, path: &Path) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // journal_mode answers with the resulting mode, so it has to be read back
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(Error::IncompatibleSchema {
                path: path.to_path_buf(),
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        register_casefold(conn)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = guard.as_mut().ok_or(Error::IndexClosed)?;
        f(conn)
    }

    /// Release the backing store. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let taken = self
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(conn) = taken {
            conn.close().map_err(|(_, e)| Error::Storage(e))?;
            debug!(path = %self.path.display(), "archive index closed");
        }
        Ok(())
    }

    // ============================================
    // LOOKUPS
    // ============================================

    pub fn find_by_hash(&self, hash: &str) -> Result<Option<ArchiveRecord>> {
        self.with_conn(|conn| find_by_hash(conn, hash))
    }

    pub fn get(&self, id: i64) -> Result<Option<ArchiveRecord>> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM files WHERE id = ?"),
                    params![id],
                    record_from_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    // ============================================
    // INSERTION
    // ============================================

    /// Record a newly archived file.
    ///
    /// Fails with [`Error::DuplicateContent`], carrying the stored record,
    /// when the content hash is already present; the index is left unchanged.
    pub fn insert(&self, draft: &NewArchiveRecord) -> Result<ArchiveRecord> {
        self.insert_stamped(draft, Utc::now())
    }

    pub(crate) fn insert_stamped(
        &self,
        draft: &NewArchiveRecord,
        now: DateTime<Utc>,
    ) -> Result<ArchiveRecord> {
        draft.validate()?;
        let tags = encode_tags(&draft.tags)?;
        let file_size = i64::try_from(draft.file_size)
            .map_err(|_| Error::InvalidArgument(format!("file size {} too large", draft.file_size)))?;
        let stamp = format_timestamp(now);

        self.with_conn(|conn| {
            // IMMEDIATE takes the write lock up front, so the lookup below
            // cannot race another writer between check and insert
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            if let Some(existing) = find_by_hash(&tx, &draft.content_hash)? {
                debug!(hash = %draft.content_hash, id = existing.id, "content already archived");
                return Err(Error::DuplicateContent(Box::new(existing)));
            }

            let record = tx.query_row(
                &format!(
                    "INSERT INTO files
                       (filename, original_path, content_hash, title, description,
                        tags, file_size, mime_type, created_at, updated_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                     RETURNING {COLUMNS}"
                ),
                params![
                    draft.filename,
                    draft.original_path,
                    draft.content_hash,
                    draft.title,
                    draft.description,
                    tags,
                    file_size,
                    draft.mime_type,
                    stamp,
                    stamp,
                ],
                record_from_row,
            )?;

            tx.commit()?;
            info!(id = record.id, hash = %record.content_hash, "archive record inserted");
            Ok(record)
        })
    }

    // ============================================
    // QUERIES
    // ============================================

    /// Records whose filename, title, description or any tag contains
    /// `query`, ignoring case. Most recently updated first, newest id on ties.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<ArchiveRecord>> {
        if limit == 0 {
            return Err(Error::InvalidArgument("search limit must be positive".into()));
        }
        let needle = query.to_lowercase();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                r#"SELECT {COLUMNS}
                   FROM files
                   WHERE instr(casefold(filename), ?1) > 0
                      OR instr(casefold(title), ?1) > 0
                      OR instr(casefold(description), ?1) > 0
                      OR EXISTS (
                          SELECT 1 FROM json_each(files.tags)
                          WHERE instr(casefold(json_each.value), ?1) > 0
                      )
                   ORDER BY updated_at DESC, id DESC
                   LIMIT ?2"#
            ))?;

            let rows = stmt.query_map(params![needle, limit], record_from_row)?;
            let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            debug!(query, matches = records.len(), "archive search");
            Ok(records)
        })
    }

    /// Every record, in search order.
    pub fn list_all(&self) -> Result<Vec<ArchiveRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {COLUMNS} FROM files ORDER BY updated_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], record_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn count(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        })
    }

    /// Sum of archived file sizes in bytes.
    pub fn total_size(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COALESCE(SUM(file_size), 0) FROM files",
                [],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(n).unwrap_or(0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, ArchiveIndex) {
        let dir = TempDir::new().unwrap();
        let index = ArchiveIndex::open(&dir.path().join(".etherith/index.db")).unwrap();
        (dir, index)
    }

    fn draft(filename: &str, hash: &str, title: &str, tags: &[&str]) -> NewArchiveRecord {
        NewArchiveRecord {
            filename: filename.to_string(),
            original_path: format!("/home/family/{}", filename),
            content_hash: hash.to_string(),
            title: title.to_string(),
            description: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            file_size: 1024,
            mime_type: "application/octet-stream".to_string(),
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");

        let index = ArchiveIndex::open(&path).unwrap();
        index.insert(&draft("a.txt", "H1", "A", &[])).unwrap();
        index.close().unwrap();

        let reopened = ArchiveIndex::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_open_under_a_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = ArchiveIndex::open(&blocker.join("index.db")).err().unwrap();
        assert!(matches!(err, Error::StorageUnavailable { .. }), "{err:?}");
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }

        let err = ArchiveIndex::open(&path).err().unwrap();
        assert!(
            matches!(
                err,
                Error::IncompatibleSchema { found, supported, .. }
                    if found == SCHEMA_VERSION + 1 && supported == SCHEMA_VERSION
            ),
            "{err:?}"
        );

        // The newer index is not downgraded
        let conn = Connection::open(&path).unwrap();
        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION + 1);
    }

    #[test]
    fn test_open_rejects_non_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");
        std::fs::write(&path, vec![0x42u8; 8192]).unwrap();

        let err = ArchiveIndex::open(&path).err().unwrap();
        match err {
            Error::Storage(inner) => {
                assert_eq!(inner.sqlite_error_code(), Some(ErrorCode::NotADatabase))
            }
            other => panic!("expected a storage error, got {other:?}"),
        }
    }

    #[test]
    fn test_ids_are_monotonic() {
        let (_dir, index) = open_temp();
        let a = index.insert(&draft("a.txt", "H1", "A", &[])).unwrap();
        let b = index.insert(&draft("b.txt", "H2", "B", &[])).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_duplicate_hash_is_rejected() {
        let (_dir, index) = open_temp();
        index
            .insert(&draft("grandma.mp3", "H1", "Grandma's Stories", &["oral-history"]))
            .unwrap();

        let err = index
            .insert(&draft("copy.mp3", "H1", "Something Else", &[]))
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(err.existing_record().unwrap().title, "Grandma's Stories");
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(
            index.find_by_hash("H1").unwrap().unwrap().title,
            "Grandma's Stories"
        );
    }

    #[test]
    fn test_concurrent_handles_insert_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.db");
        let writers = 8;

        let handles: Vec<ArchiveIndex> = (0..writers)
            .map(|_| ArchiveIndex::open(&path).unwrap())
            .collect();
        let barrier = Arc::new(Barrier::new(writers));

        let threads: Vec<_> = handles
            .into_iter()
            .enumerate()
            .map(|(i, index)| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let name = format!("copy{}.jpg", i);
                    barrier.wait();
                    let result = index.insert(&draft(&name, "SAME", "Copy", &[]));
                    index.close().unwrap();
                    result
                })
            })
            .collect();
        let results: Vec<Result<ArchiveRecord>> =
            threads.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.existing_record().map(|r| r.id), Some(1), "{err:?}");
        }

        let index = ArchiveIndex::open(&path).unwrap();
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_shared_handle_serializes_writers() {
        let (_dir, index) = open_temp();
        let index = Arc::new(index);
        let barrier = Arc::new(Barrier::new(4));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let index = Arc::clone(&index);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let own = draft(&format!("{}.txt", i), &format!("H{}", i), "T", &[]);
                    let unique = index.insert(&own);
                    let shared = index.insert(&draft("same.txt", "SHARED", "T", &[]));
                    (unique, shared)
                })
            })
            .collect();

        let mut shared_ok = 0;
        for t in threads {
            let (unique, shared) = t.join().unwrap();
            unique.unwrap();
            match shared {
                Ok(_) => shared_ok += 1,
                Err(e) => assert!(e.is_duplicate(), "{e:?}"),
            }
        }

        assert_eq!(shared_ok, 1);
        assert_eq!(index.count().unwrap(), 5);
        let mut ids: Vec<i64> = index.list_all().unwrap().iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_round_trip_keeps_tag_order() {
        let (_dir, index) = open_temp();
        let inserted = index
            .insert(&draft("a.txt", "H1", "A", &["zeta", "alpha", "zeta", "with, comma"]))
            .unwrap();

        let found = index.find_by_hash("H1").unwrap().unwrap();
        assert_eq!(found, inserted);
        assert_eq!(found.tags, vec!["zeta", "alpha", "zeta", "with, comma"]);
        assert_eq!(index.get(inserted.id).unwrap().unwrap(), inserted);
        assert!(index.find_by_hash("missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_hash_is_invalid() {
        let (_dir, index) = open_temp();
        let err = index.insert(&draft("a.txt", "", "A", &[])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_search_matches_every_field_case_insensitively() {
        let (_dir, index) = open_temp();
        let mut by_description = draft("d.bin", "H3", "Untitled", &[]);
        by_description.description = "Recorded at the LAKE house".to_string();

        index.insert(&draft("Lake_1970.jpg", "H1", "Photo", &[])).unwrap();
        index.insert(&draft("x.jpg", "H2", "Summer at the Lake", &[])).unwrap();
        index.insert(&by_description).unwrap();
        index.insert(&draft("y.jpg", "H4", "Other", &["lakeside"])).unwrap();
        index.insert(&draft("z.jpg", "H5", "Unrelated", &["city"])).unwrap();

        let hashes: Vec<String> = index
            .search("LaKe", 10)
            .unwrap()
            .into_iter()
            .map(|r| r.content_hash)
            .collect();
        assert_eq!(hashes, vec!["H4", "H3", "H2", "H1"]);
    }

    #[test]
    fn test_search_is_literal_and_unicode_aware() {
        let (_dir, index) = open_temp();
        index.insert(&draft("a.txt", "H1", "100% ÉTÉ", &[])).unwrap();
        index.insert(&draft("b.txt", "H2", "1000 summers", &[])).unwrap();

        let hits = index.search("0% été", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content_hash, "H1");

        assert!(index.search("_", 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_does_not_match_tag_separators() {
        let (_dir, index) = open_temp();
        index.insert(&draft("a.txt", "H1", "A", &["one", "two"])).unwrap();
        assert!(index.search("\",\"", 10).unwrap().is_empty());
        assert_eq!(index.search("tw", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_search_orders_by_updated_at_then_id() {
        let (_dir, index) = open_temp();
        let older = index
            .insert_stamped(&draft("a.txt", "H1", "family", &[]), at(100))
            .unwrap();
        let oldest = index
            .insert_stamped(&draft("b.txt", "H2", "family", &[]), at(50))
            .unwrap();
        let tie = index
            .insert_stamped(&draft("c.txt", "H3", "family", &[]), at(100))
            .unwrap();

        let ids: Vec<i64> = index.search("family", 10).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![tie.id, older.id, oldest.id]);

        let all: Vec<i64> = index.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(all, ids);
    }

    #[test]
    fn test_search_limit() {
        let (_dir, index) = open_temp();
        for i in 0..5 {
            index
                .insert(&draft(&format!("photo{}.jpg", i), &format!("H{}", i), "photo", &[]))
                .unwrap();
        }

        assert_eq!(index.search("photo", 3).unwrap().len(), 3);
        assert_eq!(index.search("photo", 50).unwrap().len(), 5);
        assert_eq!(index.search("", 10).unwrap().len(), 5);
        assert!(matches!(
            index.search("photo", 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_operations_after_close_fail() {
        let (_dir, index) = open_temp();
        index.close().unwrap();
        assert!(!index.is_open());
        index.close().unwrap();

        assert!(matches!(index.find_by_hash("H1"), Err(Error::IndexClosed)));
        assert!(matches!(index.search("x", 1), Err(Error::IndexClosed)));
        assert!(matches!(index.list_all(), Err(Error::IndexClosed)));
        assert!(matches!(
            index.insert(&draft("a.txt", "H1", "A", &[])),
            Err(Error::IndexClosed)
        ));
    }

    #[test]
    fn test_stats() {
        let (_dir, index) = open_temp();
        assert_eq!(index.total_size().unwrap(), 0);
        index.insert(&draft("a.txt", "H1", "A", &[])).unwrap();
        index.insert(&draft("b.txt", "H2", "B", &[])).unwrap();
        assert_eq!(index.count().unwrap(), 2);
        assert_eq!(index.total_size().unwrap(), 2048);
    }
}
