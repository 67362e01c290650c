//! Store identity and open modes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identifier that selects a private volatile store instead of a file
pub const MEMORY_SENTINEL: &str = ":memory:";

/// Where a store lives: a durable file or private process memory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    pub fn is_memory(&self) -> bool {
        matches!(self, StoreLocation::Memory)
    }

    /// Backing file path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreLocation::File(path) => Some(path),
            StoreLocation::Memory => None,
        }
    }
}

impl From<String> for StoreLocation {
    fn from(s: String) -> Self {
        if s == MEMORY_SENTINEL {
            StoreLocation::Memory
        } else {
            StoreLocation::File(PathBuf::from(s))
        }
    }
}

impl From<&str> for StoreLocation {
    fn from(s: &str) -> Self {
        StoreLocation::from(s.to_string())
    }
}

impl From<StoreLocation> for String {
    fn from(location: StoreLocation) -> Self {
        location.to_string()
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory => f.write_str(MEMORY_SENTINEL),
        }
    }
}

/// How a durable store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Existing file, no writes
    ReadOnly,
    /// Existing file, writes allowed
    ReadWrite,
    /// Writes allowed, file created when missing
    Create,
}

/// One store of a plan: a unique label plus its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSpec {
    pub name: String,
    pub location: StoreLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<OpenMode>,
}

impl StoreSpec {
    pub fn new(name: impl Into<String>, location: impl Into<StoreLocation>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            mode: None,
        }
    }

    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Mode actually used when opening
    ///
    /// Files default to read-only. Volatile stores are always read-write.
    pub fn effective_mode(&self) -> OpenMode {
        match self.location {
            StoreLocation::Memory => OpenMode::ReadWrite,
            StoreLocation::File(_) => self.mode.unwrap_or(OpenMode::ReadOnly),
        }
    }
}

/// Parses `name=location`, as accepted by the `--store` flag
impl FromStr for StoreSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, location) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=location, got '{}'", s))?;
        let name = name.trim();
        let location = location.trim();
        if name.is_empty() || location.is_empty() {
            return Err(format!("expected name=location, got '{}'", s));
        }
        Ok(StoreSpec::new(name, location))
    }
}
