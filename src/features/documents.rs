//! Metadata persistence for uploaded documents.

use std::path::Path;
use std::sync::Mutex;

use sqlite::{Connection, State, Statement};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::features::storage::StorageError;
use crate::state::{DocumentRecord, SignedArtifact};

pub trait DocumentRepository: Send + Sync {
    /// Stores a new record, refreshing `updated_at`, and returns what was stored.
    fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StorageError>;
    fn get(&self, id: &str) -> Result<Option<DocumentRecord>, StorageError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<DocumentRecord>, StorageError>;
    /// Compare-and-set Unsigned -> Signed. `Ok(false)` when the record is
    /// missing or already signed.
    fn mark_signed(&self, id: &str, artifact: &SignedArtifact) -> Result<bool, StorageError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY NOT NULL,
        original_name TEXT NOT NULL,
        filename TEXT NOT NULL,
        size INTEGER NOT NULL,
        mime_type TEXT NOT NULL,
        original_hash TEXT NOT NULL,
        signed_hash TEXT,
        signed_filename TEXT,
        is_signed INTEGER NOT NULL DEFAULT 0,
        signed_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

const COLUMNS: &str = "id, original_name, filename, size, mime_type, original_hash, \
     signed_hash, signed_filename, is_signed, signed_at, created_at, updated_at";

pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(":memory:")?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn format_ts(ts: OffsetDateTime) -> Result<String, StorageError> {
    ts.format(&Rfc3339)
        .map_err(|e| StorageError::Corrupt(format!("timestamp_format:{e}")))
}

fn parse_ts(raw: &str) -> Result<OffsetDateTime, StorageError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|e| StorageError::Corrupt(format!("timestamp_parse:{raw}:{e}")))
}

fn read_record(stmt: &Statement<'_>) -> Result<DocumentRecord, StorageError> {
    let size: i64 = stmt.read("size")?;
    let signed_at: Option<String> = stmt.read("signed_at")?;
    let created_at: String = stmt.read("created_at")?;
    let updated_at: String = stmt.read("updated_at")?;
    let is_signed: i64 = stmt.read("is_signed")?;

    Ok(DocumentRecord {
        id: stmt.read("id")?,
        original_name: stmt.read("original_name")?,
        filename: stmt.read("filename")?,
        size: u64::try_from(size).map_err(|_| StorageError::Corrupt(format!("size:{size}")))?,
        mime_type: stmt.read("mime_type")?,
        original_hash: stmt.read("original_hash")?,
        signed_hash: stmt.read("signed_hash")?,
        signed_filename: stmt.read("signed_filename")?,
        is_signed: is_signed != 0,
        signed_at: signed_at.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

impl DocumentRepository for SqliteRepository {
    fn insert(&self, mut record: DocumentRecord) -> Result<DocumentRecord, StorageError> {
        record.touch();
        let size = i64::try_from(record.size)
            .map_err(|_| StorageError::Corrupt(format!("size:{}", record.size)))?;
        let signed_at = record.signed_at.map(format_ts).transpose()?;
        let created_at = format_ts(record.created_at)?;
        let updated_at = format_ts(record.updated_at)?;

        let conn = self.lock()?;
        if get_locked(&conn, &record.id)?.is_some() {
            return Err(StorageError::Duplicate(record.id));
        }
        let mut stmt = conn.prepare(format!(
            "INSERT INTO documents ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))?;
        stmt.bind((1, record.id.as_str()))?;
        stmt.bind((2, record.original_name.as_str()))?;
        stmt.bind((3, record.filename.as_str()))?;
        stmt.bind((4, size))?;
        stmt.bind((5, record.mime_type.as_str()))?;
        stmt.bind((6, record.original_hash.as_str()))?;
        stmt.bind((7, record.signed_hash.as_deref()))?;
        stmt.bind((8, record.signed_filename.as_deref()))?;
        stmt.bind((9, i64::from(record.is_signed)))?;
        stmt.bind((10, signed_at.as_deref()))?;
        stmt.bind((11, created_at.as_str()))?;
        stmt.bind((12, updated_at.as_str()))?;
        while let State::Row = stmt.next()? {}
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<DocumentRecord>, StorageError> {
        let conn = self.lock()?;
        get_locked(&conn, id)
    }

    fn list(&self) -> Result<Vec<DocumentRecord>, StorageError> {
        let conn = self.lock()?;
        // rowid follows insertion order, which is creation order.
        let mut stmt = conn.prepare(format!(
            "SELECT {COLUMNS} FROM documents ORDER BY rowid DESC"
        ))?;
        let mut records = Vec::new();
        while let State::Row = stmt.next()? {
            records.push(read_record(&stmt)?);
        }
        Ok(records)
    }

    fn mark_signed(&self, id: &str, artifact: &SignedArtifact) -> Result<bool, StorageError> {
        let signed_at = format_ts(artifact.signed_at)?;
        let updated_at = format_ts(OffsetDateTime::now_utc())?;

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "UPDATE documents
             SET is_signed = 1, signed_filename = ?, signed_hash = ?, signed_at = ?, updated_at = ?
             WHERE id = ? AND is_signed = 0",
        )?;
        stmt.bind((1, artifact.filename.as_str()))?;
        stmt.bind((2, artifact.hash.as_str()))?;
        stmt.bind((3, signed_at.as_str()))?;
        stmt.bind((4, updated_at.as_str()))?;
        stmt.bind((5, id))?;
        while let State::Row = stmt.next()? {}
        drop(stmt);
        Ok(conn.change_count() == 1)
    }
}

fn get_locked(conn: &Connection, id: &str) -> Result<Option<DocumentRecord>, StorageError> {
    let mut stmt = conn.prepare(format!("SELECT {COLUMNS} FROM documents WHERE id = ?"))?;
    stmt.bind((1, id))?;
    match stmt.next()? {
        State::Row => Ok(Some(read_record(&stmt)?)),
        State::Done => Ok(None),
    }
}

/// Process-local repository, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<Vec<DocumentRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentRepository for MemoryRepository {
    fn insert(&self, mut record: DocumentRecord) -> Result<DocumentRecord, StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(StorageError::Duplicate(record.id));
        }
        record.touch();
        records.push(record.clone());
        Ok(record)
    }

    fn get(&self, id: &str) -> Result<Option<DocumentRecord>, StorageError> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<DocumentRecord>, StorageError> {
        let records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records.iter().rev().cloned().collect())
    }

    fn mark_signed(&self, id: &str, artifact: &SignedArtifact) -> Result<bool, StorageError> {
        let mut records = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(records
            .iter_mut()
            .find(|r| r.id == id)
            .map(|record| record.apply_signature(artifact))
            .unwrap_or(false))
    }
}
