//! Append-only, session-keyed logs (messages and summaries).
//!
//! Entries are never updated or deleted by this layer. Reads are ordered
//! prefix scans over the session's key range, see [`crate::keys`].

use anyhow::Result;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::sync::Arc;

use crate::keys;

/// One raw log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub key: String,
    pub timestamp_ns: i64,
    pub data: Vec<u8>,
}

/// Append-only byte log partitioned by session id.
#[derive(Debug, Clone)]
pub struct SessionLogStorage {
    db: Arc<Database>,
    name: &'static str,
}

impl SessionLogStorage {
    /// Open (and create if missing) the log table `name`.
    pub fn new(db: Arc<Database>, name: &'static str) -> Result<Self> {
        let log = Self { db, name };
        let write_txn = log.db.begin_write()?;
        write_txn.open_table(log.table())?;
        write_txn.commit()?;

        Ok(log)
    }

    fn table(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        TableDefinition::new(self.name)
    }

    /// Append an entry for `session_id`, returning its key.
    pub fn append_raw(&self, session_id: &str, data: &[u8]) -> Result<LogEntry> {
        let timestamp_ns = keys::now_ns();
        let key = keys::log_key(session_id, timestamp_ns);

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(self.table())?;
            table.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;

        Ok(LogEntry {
            key,
            timestamp_ns,
            data: data.to_vec(),
        })
    }

    /// All entries of a session, oldest first.
    pub fn list_by_session_raw(&self, session_id: &str) -> Result<Vec<LogEntry>> {
        self.scan_session(session_id, None)
    }

    /// The newest `limit` entries of a session, returned oldest first.
    pub fn latest_by_session_raw(&self, session_id: &str, limit: usize) -> Result<Vec<LogEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.scan_session(session_id, Some(limit))
    }

    fn scan_session(&self, session_id: &str, newest: Option<usize>) -> Result<Vec<LogEntry>> {
        let start = keys::session_prefix(session_id);
        let end = keys::prefix_end_bound(&start);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(self.table())?;
        let range = table.range(start.as_str()..end.as_str())?;

        let mut entries = Vec::new();
        let mut push = |key: &str, value: &[u8]| {
            entries.push(LogEntry {
                key: key.to_string(),
                timestamp_ns: keys::timestamp_from_key(key).unwrap_or_default(),
                data: value.to_vec(),
            });
        };

        match newest {
            Some(limit) => {
                for item in range.rev().take(limit) {
                    let (key, value) = item?;
                    push(key.value(), value.value());
                }
                entries.reverse();
            }
            None => {
                for item in range {
                    let (key, value) = item?;
                    push(key.value(), value.value());
                }
            }
        }

        Ok(entries)
    }
}
