//! Domain primitives shared by the services and the API layer.

pub mod generation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::threads::{STATUS_HIDDEN, STATUS_LOCKED, STATUS_OPEN};

pub use generation::GenerationError;

/// Moderation state of a thread.
///
/// Stored as its lowercase name so the column stays readable in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Open,
    Locked,
    Hidden,
}

impl ThreadStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => STATUS_OPEN,
            Self::Locked => STATUS_LOCKED,
            Self::Hidden => STATUS_HIDDEN,
        }
    }

    /// Whether new posts may be added.
    #[must_use]
    pub const fn accepts_posts(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            STATUS_OPEN => Ok(Self::Open),
            STATUS_LOCKED => Ok(Self::Locked),
            STATUS_HIDDEN => Ok(Self::Hidden),
            other => Err(format!("unknown thread status '{other}'")),
        }
    }
}
