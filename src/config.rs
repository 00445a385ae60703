use crate::error::{Error, Result};

/// Compute the worker count for a given hardware concurrency.
///
/// The pool always leaves at least one processing unit unclaimed so that
/// the thread driving the user interface stays responsive even under
/// maximum background load, and it stops claiming threads once additional
/// workers would no longer help:
///
/// - more than 6 processors available: 4 workers
/// - 3 to 6 processors: all but two
/// - 1 or 2 processors: a single worker
pub(crate) fn pool_size_for(available: usize) -> usize {
    if available > 6 {
        4
    } else if available > 2 {
        available - 2
    } else {
        1
    }
}

/// Pool configuration, fixed at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Explicit worker count. When `None`, the count is derived from
    /// hardware concurrency via the reserve-a-core policy.
    pub num_threads: Option<usize>,
    /// Prefix for worker thread names (`<prefix>_<sequence>`).
    pub thread_name_prefix: String,
    /// Worker thread stack size, when overridden.
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name_prefix: "backplane".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    /// The number of worker threads this configuration yields.
    pub fn worker_threads(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| pool_size_for(num_cpus::get()))
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
