//! Shell-side backing stores for the key-value capability.
//!
//! The core only ever emits `KeyValueOperation`s. Native shells and tests
//! resolve them against one of these stores via [`execute_kv`].

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::capabilities::{KeyValueError, KeyValueOperation, KeyValueResponse, KeyValueResult, Value};

pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueError>;
    fn save(&mut self, key: &str, value: &[u8]) -> Result<(), KeyValueError>;
}

fn to_value(bytes: Option<Vec<u8>>) -> Value {
    match bytes {
        Some(bytes) => Value::Bytes(bytes),
        None => Value::None,
    }
}

pub fn execute_kv<S: KeyValueStore + ?Sized>(
    store: &mut S,
    operation: &KeyValueOperation,
) -> KeyValueResult {
    let response = match operation {
        KeyValueOperation::Get { key } => store.load(key).map(|value| {
            debug!(key = %key, found = value.is_some(), "kv get");
            KeyValueResponse::Get {
                value: to_value(value),
            }
        }),
        KeyValueOperation::Set { key, value } => store.load(key).and_then(|previous| {
            store.save(key, value)?;
            debug!(key = %key, bytes = value.len(), "kv set");
            Ok(KeyValueResponse::Set {
                previous: to_value(previous),
            })
        }),
        other => {
            warn!(operation = ?other, "unsupported kv operation");
            Err(KeyValueError::Other {
                message: "operation not supported by this store".to_string(),
            })
        }
    };

    match response {
        Ok(response) => KeyValueResult::Ok { response },
        Err(error) => KeyValueResult::Err { error },
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &[u8]) -> Result<(), KeyValueError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use self::sqlite::SqliteStore;

#[cfg(not(target_arch = "wasm32"))]
mod sqlite {
    use std::path::Path;

    use rusqlite::{Connection, OptionalExtension};
    use tracing::info;

    use super::KeyValueStore;
    use crate::capabilities::KeyValueError;

    pub struct SqliteStore {
        db: Connection,
    }

    impl SqliteStore {
        pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyValueError> {
            let path = path.as_ref();
            info!(path = %path.display(), "opening kv store");
            let db = Connection::open(path).map_err(map_err)?;
            Self::init(db)
        }

        pub fn open_in_memory() -> Result<Self, KeyValueError> {
            Self::init(Connection::open_in_memory().map_err(map_err)?)
        }

        fn init(db: Connection) -> Result<Self, KeyValueError> {
            db.execute_batch(
                "pragma journal_mode=wal;
                create table if not exists kv (
                    key text primary key,
                    value blob not null
                );",
            )
            .map_err(map_err)?;
            Ok(Self { db })
        }
    }

    impl KeyValueStore for SqliteStore {
        fn load(&self, key: &str) -> Result<Option<Vec<u8>>, KeyValueError> {
            self.db
                .query_row("select value from kv where key = ?1", [key], |row| row.get(0))
                .optional()
                .map_err(map_err)
        }

        fn save(&mut self, key: &str, value: &[u8]) -> Result<(), KeyValueError> {
            self.db
                .execute(
                    "insert into kv (key, value) values (?1, ?2)
                     on conflict(key) do update set value = excluded.value",
                    rusqlite::params![key, value],
                )
                .map_err(map_err)?;
            Ok(())
        }
    }

    // Busy and locked databases are reported as timeouts so the shell can retry.
    fn map_err(e: rusqlite::Error) -> KeyValueError {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                KeyValueError::Timeout
            }
            _ => KeyValueError::Io {
                message: e.to_string(),
            },
        }
    }
}
