//! Error types for the clinic simulation

/// Result type for clinic operations
pub type Result<T> = std::result::Result<T, ClinicError>;

/// Errors that can occur while configuring or running the clinic
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClinicError {
    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// A queue rejected an item because it was at capacity
    #[error("Queue '{queue}' is full: {capacity}/{capacity} patients waiting")]
    QueueFull {
        /// Name of the saturated queue
        queue: String,
        /// Capacity of the queue
        capacity: usize,
    },

    /// Clinic was already shut down
    #[error("Clinic run {run_id} is not running")]
    NotRunning {
        /// Identifier of the run
        run_id: String,
    },

    /// Failed to spawn a worker thread with details
    #[error("Failed to spawn worker '{worker}': {message}")]
    SpawnError {
        /// Name of the worker that failed to spawn
        worker: String,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker '{worker}': {message}")]
    JoinError {
        /// Name of the worker that failed to join
        worker: String,
        /// Error message
        message: String,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ClinicError {
    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        ClinicError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a queue full error
    pub fn queue_full(queue: impl Into<String>, capacity: usize) -> Self {
        ClinicError::QueueFull {
            queue: queue.into(),
            capacity,
        }
    }

    /// Create a not running error
    pub fn not_running(run_id: impl Into<String>) -> Self {
        ClinicError::NotRunning {
            run_id: run_id.into(),
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        ClinicError::SpawnError {
            worker: worker.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(worker: impl Into<String>, message: impl Into<String>) -> Self {
        ClinicError::JoinError {
            worker: worker.into(),
            message: message.into(),
        }
    }
}
