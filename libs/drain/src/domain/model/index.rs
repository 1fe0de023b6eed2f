use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of one index (or partition) known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexId(String);

impl IndexId {
    pub fn new(name: impl Into<String>) -> Self {
        IndexId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IndexId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for IndexId {
    fn from(name: String) -> Self {
        IndexId(name)
    }
}

impl From<&str> for IndexId {
    fn from(name: &str) -> Self {
        IndexId(name.to_string())
    }
}
