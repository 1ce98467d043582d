use crate::error::{Result, StatsError};
use crate::model::{ContentId, SCHEMA_VERSION};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CACHE_DIR: &str = "gitstats";
const CACHE_FILE: &str = "cache.db";

/// Content id -> fact. A key once present is never replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactTable {
    facts: BTreeMap<ContentId, u64>,
}

/// Inputs split into cached facts and keys still to be resolved.
#[derive(Debug)]
pub struct Partition<C> {
    pub hits: Vec<(C, ContentId, u64)>,
    pub misses: Vec<(C, ContentId)>,
}

impl FactTable {
    pub fn lookup(&self, key: &ContentId) -> Option<u64> {
        self.facts.get(key).copied()
    }

    pub fn partition<C>(&self, items: impl IntoIterator<Item = (C, ContentId)>) -> Partition<C> {
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for (context, key) in items {
            match self.lookup(&key) {
                Some(fact) => hits.push((context, key, fact)),
                None => misses.push((context, key)),
            }
        }
        Partition { hits, misses }
    }

    /// Inserts facts for keys not yet present; returns how many were new.
    pub fn merge(&mut self, results: impl IntoIterator<Item = (ContentId, u64)>) -> usize {
        let mut added = 0;
        for (key, fact) in results {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.facts.entry(key) {
                slot.insert(fact);
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ContentId, u64)> + '_ {
        self.facts.iter().map(|(key, fact)| (key, *fact))
    }
}

/// Facts that outlive a run, persisted as one SQLite file.
#[derive(Debug, Default)]
pub struct CacheStore {
    pub revision_to_file_count: FactTable,
    pub blob_to_line_count: FactTable,
    /// The file on disk could not be trusted and is rebuilt on save.
    reset: bool,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<cache_dir>/cache.db`, defaulting to `<git-dir>/gitstats/cache.db`.
    pub fn location<P: AsRef<Path>>(cache_dir: Option<P>, git_dir: &Path) -> PathBuf {
        let dir = match cache_dir {
            Some(dir) => dir.as_ref().to_path_buf(),
            None => git_dir.join(CACHE_DIR),
        };
        dir.join(CACHE_FILE)
    }

    /// Loads the persisted cache. A missing, unreadable, or mismatched file
    /// yields an empty store.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no cache file, starting cold");
            return Self::new();
        }
        match Self::read(path) {
            Ok(store) => {
                debug!(
                    revisions = store.revision_to_file_count.len(),
                    blobs = store.blob_to_line_count.len(),
                    "cache loaded"
                );
                store
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unusable cache");
                Self {
                    reset: true,
                    ..Self::new()
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if user_version != SCHEMA_VERSION as i64 {
            return Err(StatsError::Parse(format!(
                "Schema version mismatch: expected {}, found {}",
                SCHEMA_VERSION, user_version
            )));
        }
        Ok(Self {
            revision_to_file_count: read_table(&conn, "SELECT id, files FROM revision_files")?,
            blob_to_line_count: read_table(&conn, "SELECT id, lines FROM blob_lines")?,
            reset: false,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if self.reset {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        initialize(&conn)?;

        let tx = conn.transaction()?;
        {
            let mut insert_revision =
                tx.prepare("INSERT OR IGNORE INTO revision_files (id, files) VALUES (?, ?)")?;
            for (key, files) in self.revision_to_file_count.iter() {
                insert_revision.execute(params![key.as_str(), files as i64])?;
            }
            let mut insert_blob =
                tx.prepare("INSERT OR IGNORE INTO blob_lines (id, lines) VALUES (?, ?)")?;
            for (key, lines) in self.blob_to_line_count.iter() {
                insert_blob.execute(params![key.as_str(), lines as i64])?;
            }
        }
        tx.commit()?;
        debug!(path = %path.display(), "cache saved");
        Ok(())
    }
}

fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS revision_files (
            id TEXT PRIMARY KEY,
            files INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS blob_lines (
            id TEXT PRIMARY KEY,
            lines INTEGER NOT NULL
        );
        ",
    )?;
    let user_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if user_version == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    } else if user_version != SCHEMA_VERSION as i64 {
        return Err(StatsError::Parse(format!(
            "Schema version mismatch: expected {}, found {}",
            SCHEMA_VERSION, user_version
        )));
    }
    Ok(())
}

fn read_table(conn: &Connection, query: &str) -> Result<FactTable> {
    let mut stmt = conn.prepare(query)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    let mut table = FactTable::default();
    let mut skipped = 0usize;
    for row in rows {
        let (id, fact) = row?;
        match (ContentId::parse(&id), u64::try_from(fact)) {
            (Some(key), Ok(fact)) => {
                table.facts.insert(key, fact);
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "ignored malformed cache rows");
    }
    Ok(table)
}
