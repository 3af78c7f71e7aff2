use thiserror::Error;

/// Canonical error type for cluster lifecycle operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A lookup against a fixed table or configuration key failed.
    #[error("{entity} `{id}` was not found")]
    NotFound {
        /// Entity type name (e.g. `"architecture"`).
        entity: &'static str,
        /// Identifier of the missing entity.
        id: String,
    },

    /// The environment or a component could not be set up.
    #[error("setup of [{component}] failed: {message}")]
    Setup {
        /// Component that failed (plugin name, host, stage).
        component: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A command could not be run on a host or exited non-zero.
    #[error("command \"{command}\" on host \"{host}\" failed{}", .code.map(|c| format!(" with exit code [{c}]")).unwrap_or_default())]
    Executor {
        /// Command line that was executed.
        command: String,
        /// Host the command ran on.
        host: String,
        /// Exit code, if the process ran to completion.
        code: Option<i32>,
    },

    /// A cluster node could not be started or stopped.
    #[error("launch error: {message}")]
    Launch {
        /// Human-readable failure description.
        message: String,
    },

    /// Teardown completed but one or more resources could not be released.
    #[error("teardown finished with {} failure(s): {}", .failures.len(), .failures.join("; "))]
    Teardown {
        /// One entry per failed release.
        failures: Vec<String>,
    },

    /// A template could not be rendered.
    #[error("template error: {0}")]
    Template(String),

    /// I/O error occurred during file or process operations.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error occurred.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error occurred.
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl CoreError {
    /// Creates a `NotFound` variant.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates a `Setup` variant.
    #[must_use]
    pub fn setup(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setup {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Creates an `Executor` variant.
    #[must_use]
    pub fn executor(command: impl Into<String>, host: impl Into<String>, code: Option<i32>) -> Self {
        Self::Executor {
            command: command.into(),
            host: host.into(),
            code,
        }
    }

    /// Creates a `Launch` variant.
    #[must_use]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch {
            message: message.into(),
        }
    }

    /// Exit code of a failed command, if this error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Executor { code, .. } => *code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() || err.is_syntax() {
            Self::DeserializationError(err.to_string())
        } else {
            Self::SerializationError(err.to_string())
        }
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
