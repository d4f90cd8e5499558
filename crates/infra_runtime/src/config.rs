//! Runtime configuration

use std::time::Duration;

/// Configuration options for the process runtime
///
/// # Example
///
/// ```rust
/// use infra_runtime::RuntimeConfig;
/// use std::time::Duration;
///
/// let config = RuntimeConfig::new()
///     .command_buffer(256)
///     .query_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of each process's command channel
    pub command_buffer: usize,
    /// How long a caller waits for a query answer
    pub query_timeout: Duration,
}

impl RuntimeConfig {
    /// Creates a configuration with default settings
    pub fn new() -> Self {
        Self {
            command_buffer: 64,
            query_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the command channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Commands buffered per process before senders wait (default: 64, minimum 1)
    pub fn command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity.max(1);
        self
    }

    /// Sets the query timeout
    ///
    /// # Arguments
    ///
    /// * `timeout` - Duration to wait for a query answer (default: 5s)
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
