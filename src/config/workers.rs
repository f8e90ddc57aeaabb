//! Worker count selection

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResizeError};

/// How many worker threads the batch pool runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "WorkerCountRepr", into = "WorkerCountRepr")]
pub enum WorkerCount {
    /// One worker per logical CPU
    #[default]
    Auto,
    /// Exactly this many workers
    Fixed(NonZeroUsize),
}

impl WorkerCount {
    /// Create an explicit worker count, rejecting zero
    pub fn fixed(count: usize) -> Result<Self> {
        NonZeroUsize::new(count)
            .map(Self::Fixed)
            .ok_or_else(|| ResizeError::config("Worker count must be greater than 0"))
    }

    /// Resolve to a concrete thread count (always at least 1)
    pub fn resolve(self) -> usize {
        match self {
            Self::Auto => num_cpus::get().max(1),
            Self::Fixed(count) => count.get(),
        }
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Fixed(count) => write!(f, "{}", count),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        let count = s.parse::<usize>().map_err(|_| {
            ResizeError::config(format!(
                "Invalid worker count '{}': expected 'auto' or a positive integer",
                s
            ))
        })?;
        Self::fixed(count)
    }
}

/// On-disk form: either the keyword `"auto"` or a bare integer
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WorkerCountRepr {
    Count(usize),
    Keyword(String),
}

impl TryFrom<WorkerCountRepr> for WorkerCount {
    type Error = ResizeError;

    fn try_from(repr: WorkerCountRepr) -> Result<Self> {
        match repr {
            WorkerCountRepr::Count(count) => Self::fixed(count),
            WorkerCountRepr::Keyword(keyword) => keyword.parse(),
        }
    }
}

impl From<WorkerCount> for WorkerCountRepr {
    fn from(count: WorkerCount) -> Self {
        match count {
            WorkerCount::Auto => Self::Keyword("auto".to_string()),
            WorkerCount::Fixed(count) => Self::Count(count.get()),
        }
    }
}
