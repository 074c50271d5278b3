use std::fmt::Display;

use gluesql::prelude::*;
use log::{debug, error};

const INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS SessionState (key TEXT, value BOOLEAN);";

const UNLOCK_KEY: &str = "audio_unlocked";

/// Session-scoped state shared between reloads of the same embedding
/// session. Currently a single flag: whether audio playback has been
/// unlocked by a user gesture.
pub trait SessionStore {
    fn audio_unlocked(&mut self) -> bool;

    fn set_audio_unlocked(&mut self, unlocked: bool);
}

/// In-memory store for tests and hosts without a writable session
/// directory. Forgets everything when dropped, which is exactly the
/// "new session" behavior.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    unlocked: bool,
}

impl SessionStore for MemorySessionStore {
    fn audio_unlocked(&mut self) -> bool {
        self.unlocked
    }

    fn set_audio_unlocked(&mut self, unlocked: bool) {
        self.unlocked = unlocked;
    }
}

#[derive(Debug)]
pub enum Error {
    ExecutionError {
        command: String,
        error: gluesql::prelude::Error,
    },
    TooManyStatements(usize),
    SelectFailure,
    InsertFailure,
    DeleteFailure,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExecutionError { command, error } => {
                write!(f, "Failed to execute: {command}\nOriginal error: {error}")
            }
            Self::TooManyStatements(v) => write!(f, "Found {v} statements, declining to execute"),
            Self::SelectFailure => write!(f, "Select failure"),
            Self::InsertFailure => write!(f, "Insert failure"),
            Self::DeleteFailure => write!(f, "Delete failure"),
        }
    }
}

impl std::error::Error for Error {}

type Result<T> = std::result::Result<T, Error>;

/// Sled-backed session database. The host passes the directory it considers
/// session-scoped; a fresh directory is a fresh session.
pub struct Database {
    db: Glue<SledStorage>,
}

impl Database {
    pub fn create(path: &str) -> Option<Database> {
        debug!("Create session database at {path}");

        let storage = match SledStorage::new(path) {
            Ok(v) => v,
            Err(e) => {
                error!("{e}");
                return None;
            }
        };

        let mut glue = Glue::new(storage);

        if let Err(e) = glue.execute(INIT_SQL) {
            error!("Unable to initialize session database: {e}");
            return None;
        }

        Some(Self { db: glue })
    }

    /// Execute a sql command and return the raw results.
    fn run(&mut self, command: impl AsRef<str>) -> Result<Vec<Payload>> {
        let command = command.as_ref();
        self.db.execute(command).map_err(|error| {
            error!("Unable to execute:\n{}", command);
            Error::ExecutionError {
                command: command.to_string(),
                error,
            }
        })
    }

    /// Run a select query. The results will be assumed to be from a select statement.
    fn select(&mut self, command: impl AsRef<str>) -> Result<Vec<Vec<Value>>> {
        let mut payloads = match self.run(command.as_ref()) {
            Ok(v) => v,
            Err(e) => return Err(e),
        };
        if payloads.len() > 1 {
            error!("Found too many statements, unable to select");
            return Err(Error::TooManyStatements(payloads.len()));
        }

        if let Some(payload) = payloads.pop() {
            let Payload::Select { rows, .. } = payload else {
                error!("Unhandled payload data: {payload:?}");
                return Err(Error::SelectFailure);
            };

            return Ok(rows);
        }

        Ok(vec![])
    }

    /// Run an insert statement. The results will be assumed to be from an insert statement.
    fn insert(&mut self, command: impl AsRef<str>) -> Result<()> {
        let payloads = match self.run(command.as_ref()) {
            Ok(v) => v,
            Err(e) => return Err(e),
        };
        if payloads.len() < 1 {
            error!("No payloads returned, insertion probably failed");
            return Err(Error::InsertFailure);
        }

        Ok(())
    }

    /// Run a delete statement. The results will be assumed to be from a delete statement.
    fn delete(&mut self, command: impl AsRef<str>) -> Result<()> {
        let payloads = match self.run(command.as_ref()) {
            Ok(v) => v,
            Err(e) => return Err(e),
        };
        if payloads.len() < 1 {
            error!("No payloads returned, delete probably failed");
            return Err(Error::DeleteFailure);
        }

        Ok(())
    }
}

impl SessionStore for Database {
    fn audio_unlocked(&mut self) -> bool {
        let rows = match self.select(format!(
            "SELECT value FROM SessionState WHERE key = '{UNLOCK_KEY}'"
        )) {
            Ok(v) => v,
            Err(e) => {
                error!("{e}");
                return false;
            }
        };

        rows.first()
            .map(|row| matches!(row.first(), Some(Value::Bool(true))))
            .unwrap_or(false)
    }

    fn set_audio_unlocked(&mut self, unlocked: bool) {
        if let Err(e) = self.delete(format!(
            "DELETE FROM SessionState WHERE key = '{UNLOCK_KEY}'"
        )) {
            debug!("{e}");
        }

        let value = if unlocked { "TRUE" } else { "FALSE" };
        if let Err(e) = self.insert(format!(
            "INSERT INTO SessionState VALUES ('{UNLOCK_KEY}', {value})"
        )) {
            error!("{e}");
        }
    }
}
