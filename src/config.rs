use std::path::{Path, PathBuf};

pub const STORAGE_DIR_VAR: &str = "SIGNET_STORAGE_DIR";
pub const DB_PATH_VAR: &str = "SIGNET_DB_PATH";
pub const MAX_UPLOAD_VAR: &str = "SIGNET_MAX_UPLOAD_BYTES";
pub const LOG_VAR: &str = "SIGNET_LOG";

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const STORAGE_SUBDIR: &str = "signet";
const DB_FILE: &str = "signet.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignetConfig {
    pub storage_dir: PathBuf,
    pub db_path: PathBuf,
    pub max_upload_bytes: u64,
}

impl SignetConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        let storage_dir = storage_dir.into();
        let db_path = storage_dir.join(DB_FILE);
        Self {
            storage_dir,
            db_path,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn from_env() -> Self {
        let storage_dir = std::env::var(STORAGE_DIR_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| preferred_base_dir().join(STORAGE_SUBDIR));

        let mut config = Self::new(storage_dir);
        if let Some(db) = std::env::var(DB_PATH_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            config.db_path = PathBuf::from(db);
        }
        if let Ok(raw) = std::env::var(MAX_UPLOAD_VAR) {
            config.max_upload_bytes = parse_upload_limit(&raw);
        }
        config
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.storage_dir
    }
}

impl Default for SignetConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_upload_limit(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(limit) if limit > 0 => limit,
        _ => {
            log::warn!(
                "ignoring {MAX_UPLOAD_VAR}={raw:?}, using {DEFAULT_MAX_UPLOAD_BYTES} bytes"
            );
            DEFAULT_MAX_UPLOAD_BYTES
        }
    }
}

/// First existing directory among `$TMPDIR` and the system temp dir.
pub fn preferred_base_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(tmpdir) = std::env::var("TMPDIR") {
        candidates.push(PathBuf::from(tmpdir));
    }
    candidates.push(std::env::temp_dir());

    for dir in candidates {
        if let Ok(meta) = std::fs::metadata(&dir) {
            if meta.is_dir() {
                return dir;
            }
        }
    }
    std::env::temp_dir()
}

#[cfg(test)]
pub(crate) fn test_env_lock() -> &'static std::sync::Mutex<()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}
