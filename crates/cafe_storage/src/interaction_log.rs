#![forbid(unsafe_code)]

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cafe_kernel_contracts::interaction::InteractionRecord;
use cafe_kernel_contracts::{ContractViolation, Validate};

use crate::repo::InteractionLogRepo;

/// Subdirectory of the store root holding the dated partitions.
pub const LOGS_DIR: &str = "logs";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Rows kept by [`InMemoryInteractionLog::new`] before the oldest are evicted.
pub const DEFAULT_MEMORY_LOG_MAX_ROWS: usize = 10_000;

#[derive(Debug, Default)]
struct MemoryRows {
    rows: VecDeque<InteractionRecord>,
    ids: HashSet<String>,
}

/// Bounded process-local log; once full, each append evicts the oldest row.
#[derive(Debug)]
pub struct InMemoryInteractionLog {
    max_rows: usize,
    inner: Mutex<MemoryRows>,
}

impl Default for InMemoryInteractionLog {
    fn default() -> Self {
        Self::with_max_rows(DEFAULT_MEMORY_LOG_MAX_ROWS)
    }
}

impl InMemoryInteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// `max_rows` below 1 is raised to 1.
    pub fn with_max_rows(max_rows: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
            inner: Mutex::new(MemoryRows::default()),
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InteractionLogRepo for InMemoryInteractionLog {
    fn append_interaction_row(&self, record: &InteractionRecord) -> Result<(), StorageError> {
        record.validate()?;
        let mut inner = self.inner.lock().map_err(|_| StorageError::LockPoisoned)?;
        if inner.ids.contains(&record.interaction_id) {
            return Err(StorageError::DuplicateKey {
                table: "interaction_log",
                key: record.interaction_id.clone(),
            });
        }
        while inner.rows.len() >= self.max_rows {
            match inner.rows.pop_front() {
                Some(evicted) => {
                    inner.ids.remove(&evicted.interaction_id);
                    tracing::debug!(
                        interaction_id = %evicted.interaction_id,
                        "interaction row evicted"
                    );
                }
                None => break,
            }
        }
        inner.ids.insert(record.interaction_id.clone());
        inner.rows.push_back(record.clone());
        Ok(())
    }

    fn interaction_rows_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<InteractionRecord>, StorageError> {
        let inner = self.inner.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}

/// One JSON document per interaction under `<root>/logs/<YYYY-MM-DD>/<id>.json`.
#[derive(Debug)]
pub struct FsInteractionLog {
    root: PathBuf,
    write_guard: Mutex<()>,
}

impl FsInteractionLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, record: &InteractionRecord) -> Result<PathBuf, StorageError> {
        let date = record.date_partition();
        let date_ok = date.len() == 10 && date.chars().all(|c| c.is_ascii_digit() || c == '-');
        if !date_ok {
            return Err(ContractViolation::InvalidValue {
                field: "interaction_record.timestamp",
                reason: "must start with a YYYY-MM-DD date",
            }
            .into());
        }
        Ok(self
            .root
            .join(LOGS_DIR)
            .join(date)
            .join(format!("{}.json", record.interaction_id)))
    }

    fn read_record(path: &Path) -> Result<InteractionRecord, StorageError> {
        let bytes = fs::read(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl InteractionLogRepo for FsInteractionLog {
    fn append_interaction_row(&self, record: &InteractionRecord) -> Result<(), StorageError> {
        record.validate()?;
        let path = self.record_path(record)?;
        let body = serde_json::to_vec_pretty(record)?;
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        if path.exists() {
            return Err(StorageError::DuplicateKey {
                table: "interaction_log",
                key: record.interaction_id.clone(),
            });
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, body).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "interaction row written");
        Ok(())
    }

    fn interaction_rows_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<InteractionRecord>, StorageError> {
        let logs = self.root.join(LOGS_DIR);
        if !logs.exists() {
            return Ok(Vec::new());
        }
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StorageError::Io { path, source }
        };
        let mut files = Vec::new();
        for day in fs::read_dir(&logs).map_err(io_err(&logs))? {
            let day = day.map_err(io_err(&logs))?.path();
            if !day.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&day).map_err(io_err(&day))? {
                let p = entry.map_err(io_err(&day))?.path();
                if p.extension().is_some_and(|e| e == "json") {
                    files.push(p);
                }
            }
        }
        let mut rows = Vec::new();
        for p in files {
            let r = Self::read_record(&p)?;
            if r.session_id == session_id {
                rows.push(r);
            }
        }
        // RFC 3339 UTC timestamps sort chronologically as strings.
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_kernel_contracts::intent::SourceService;
    use cafe_kernel_contracts::language::{LanguageCode, SupportedLanguage};
    use cafe_kernel_contracts::sentiment::SentimentLabel;
    use cafe_kernel_contracts::slot::SlotMap;

    fn record(id: &str, session: &str) -> InteractionRecord {
        InteractionRecord {
            interaction_id: id.to_string(),
            session_id: session.to_string(),
            timestamp: "2026-10-14T09:30:00Z".to_string(),
            user_input: "hola".to_string(),
            detected_language: LanguageCode::from(SupportedLanguage::Es),
            translated_input: "hola".to_string(),
            intent: "AskFAQ".to_string(),
            slots: SlotMap::new(),
            response_text: "¡Hola!".to_string(),
            source_service: SourceService::Structured,
            sentiment: SentimentLabel::Neutral,
            is_fallback: false,
        }
    }

    #[test]
    fn at_store_01_in_memory_rejects_duplicate_ids() {
        let log = InMemoryInteractionLog::new();
        log.append_interaction_row(&record("a1", "s1")).unwrap();
        assert!(matches!(
            log.append_interaction_row(&record("a1", "s1")),
            Err(StorageError::DuplicateKey { .. })
        ));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn at_store_02_invalid_records_never_land() {
        let log = InMemoryInteractionLog::new();
        let mut r = record("a1", "s1");
        r.is_fallback = true;
        assert!(matches!(
            log.append_interaction_row(&r),
            Err(StorageError::ContractViolation(_))
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn at_store_03_record_path_requires_dated_timestamp() {
        let log = FsInteractionLog::new("/tmp/unused");
        let mut r = record("a1", "s1");
        assert_eq!(
            log.record_path(&r).unwrap(),
            PathBuf::from("/tmp/unused/logs/2026-10-14/a1.json")
        );
        r.timestamp = "yesterday".to_string();
        assert!(log.record_path(&r).is_err());
    }

    #[test]
    fn at_store_04_in_memory_log_evicts_oldest_rows_when_full() {
        let log = InMemoryInteractionLog::with_max_rows(2);
        log.append_interaction_row(&record("a1", "s1")).unwrap();
        log.append_interaction_row(&record("a2", "s1")).unwrap();
        log.append_interaction_row(&record("a3", "s2")).unwrap();
        assert_eq!(log.len(), 2);
        let s1: Vec<_> = log
            .interaction_rows_for_session("s1")
            .unwrap()
            .into_iter()
            .map(|r| r.interaction_id)
            .collect();
        assert_eq!(s1, vec!["a2".to_string()]);
        // an evicted id is free again, a retained one is still unique
        log.append_interaction_row(&record("a1", "s1")).unwrap();
        assert!(matches!(
            log.append_interaction_row(&record("a3", "s2")),
            Err(StorageError::DuplicateKey { .. })
        ));
        assert_eq!(InMemoryInteractionLog::with_max_rows(0).max_rows(), 1);
        assert_eq!(InMemoryInteractionLog::new().max_rows(), DEFAULT_MEMORY_LOG_MAX_ROWS);
    }
}
