use std::fmt;

/// Whether the storage cluster can serve scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageHealth {
    /// Every primary shard is assigned.
    Available,
    /// Some primary shard is missing, so scans would see partial results.
    Degraded,
}

impl StorageHealth {
    pub fn is_available(self) -> bool {
        self == StorageHealth::Available
    }
}

impl fmt::Display for StorageHealth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            StorageHealth::Available => "available",
            StorageHealth::Degraded => "degraded",
        };
        f.write_str(label)
    }
}

/// Health and version reported by the storage cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStatus {
    pub health: StorageHealth,
    pub version: String,
}

impl fmt::Display for StorageStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "version {}, {}", self.version, self.health)
    }
}

/// Status of this library along with the storage it scans.
#[derive(Debug)]
pub struct Status {
    /// Version of this library.
    pub version: String,
    pub storage: StorageStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_describe_storage_status() {
        let status = StorageStatus {
            health: StorageHealth::Degraded,
            version: String::from("7.17.9"),
        };
        assert!(!status.health.is_available());
        assert_eq!(status.to_string(), "version 7.17.9, degraded");
    }
}
