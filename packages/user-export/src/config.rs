use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use identity_client::{ExposeSecret, SecretString};

use crate::error::{ExportError, Result};
use crate::planner::PagePolicy;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_OUTPUT: &str = "result.csv";

/// How page jobs are spread over tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// A fixed set of long-lived workers sharing one bounded job queue
    #[default]
    Pooled,
    /// One task per page, no queue
    Unpooled,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Pooled => f.write_str("pooled"),
            ExecutionMode::Unpooled => f.write_str("unpooled"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pooled" => Ok(ExecutionMode::Pooled),
            "unpooled" => Ok(ExecutionMode::Unpooled),
            other => Err(format!(
                "unknown execution mode '{}', expected 'pooled' or 'unpooled'",
                other
            )),
        }
    }
}

/// What happens when a page fails to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run on the first failed page; nothing is written
    #[default]
    Abort,
    /// Log the page, leave it out of the export and keep going
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Skip => f.write_str("skip"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            other => Err(format!(
                "unknown failure policy '{}', expected 'abort' or 'skip'",
                other
            )),
        }
    }
}

/// Export configuration, passed explicitly into [`crate::run_export`].
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub host: String,
    pub token: SecretString,
    pub page_size: u32,
    pub workers: usize,
    pub mode: ExecutionMode,
    /// Job queue capacity in pooled mode; defaults to the worker count
    pub queue_capacity: Option<usize>,
    pub request_timeout: Duration,
    pub output: PathBuf,
    pub failure_policy: FailurePolicy,
    pub page_policy: PagePolicy,
}

impl ExportConfig {
    pub fn new(host: impl Into<String>, token: impl Into<SecretString>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            page_size: DEFAULT_PAGE_SIZE,
            workers: DEFAULT_WORKERS,
            mode: ExecutionMode::default(),
            queue_capacity: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            output: PathBuf::from(DEFAULT_OUTPUT),
            failure_policy: FailurePolicy::default(),
            page_policy: PagePolicy::default(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ExportError::Config(format!("{} must be set", key)))
        };

        let mut config = Self::new(required("IDENTITY_HOST")?, required("IDENTITY_TOKEN")?);

        if let Some(v) = parsed(&lookup, "EXPORT_PAGE_SIZE")? {
            config.page_size = v;
        }
        if let Some(v) = parsed(&lookup, "EXPORT_WORKERS")? {
            config.workers = v;
        }
        if let Some(v) = parsed(&lookup, "EXPORT_MODE")? {
            config.mode = v;
        }
        config.queue_capacity = parsed(&lookup, "EXPORT_QUEUE_CAPACITY")?;
        if let Some(secs) = parsed::<u64, _>(&lookup, "EXPORT_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("EXPORT_OUTPUT").filter(|v| !v.trim().is_empty()) {
            config.output = PathBuf::from(v);
        }
        if let Some(v) = parsed(&lookup, "EXPORT_FAILURE_POLICY")? {
            config.failure_policy = v;
        }
        if let Some(v) = parsed(&lookup, "EXPORT_PAGE_POLICY")? {
            config.page_policy = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_page_policy(mut self, policy: PagePolicy) -> Self {
        self.page_policy = policy;
        self
    }

    /// Effective job queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ExportError::Config("identity host must not be empty".into()));
        }
        if self.token.expose_secret().is_empty() {
            return Err(ExportError::Config("bearer token must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(ExportError::Config("page size must be greater than 0".into()));
        }
        if self.workers == 0 {
            return Err(ExportError::Config("worker count must be greater than 0".into()));
        }
        if self.queue_capacity() == 0 {
            return Err(ExportError::Config("queue capacity must be greater than 0".into()));
        }
        Ok(())
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ExportError::Config(format!("{} is invalid: {}", key, e))),
        _ => Ok(None),
    }
}
