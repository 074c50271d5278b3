use log::{debug, error, info, warn};

/// A named logger for one component of the character.
///
/// The embedding host installs whatever [log] backend it wants; this only
/// prefixes messages with the owning component so interleaved callbacks
/// remain readable.
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
}

impl Logger {
    pub fn create(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        debug!("[{}] {}", self.name, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        info!("[{}] {}", self.name, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        warn!("[{}] {}", self.name, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        error!("[{}] {}", self.name, message.as_ref());
    }
}
