// rust/harvest-core/src/error.rs

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {

    #[error("Store error for key '{key}': {message}")]
    Store {
        key: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Sink error for '{name}': {message}")]
    Sink {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error at '{path}': {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Value for key '{key}' is not valid UTF-8 ({len} bytes)")]
    Decode {
        key: String,
        len: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Drain pass left {failed} key(s) pending after transport faults (first: {first})")]
    Drain {
        failed: usize,
        first: String,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, HarvestError>;

// Convenience constructors
impl HarvestError {

    pub fn store(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn store_with_source(
        key: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            key: key.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn sink(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn sink_with_source(
        name: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Sink {
            name: name.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn io_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn decode(key: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        Self::Decode {
            key: key.into(),
            len: source.as_bytes().len(),
            source,
        }
    }

    pub fn drain(failed: usize, first: impl Into<String>) -> Self {
        Self::Drain {
            failed,
            first: first.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns true for faults raised by a store or sink backend, as opposed
    /// to faults in the data itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Store { .. } | Self::Sink { .. } | Self::Io { .. })
    }
}
