pub mod probe;
pub mod resolver;

use serde::{Deserialize, Serialize};

pub use resolver::{RuntimeInstallation, RuntimeProvider, RuntimeResolver};

/// The fixed set of Java major versions this backend knows how to
/// resolve. Used as the registry lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeId {
    #[serde(rename = "8")]
    Java8,
    #[serde(rename = "16")]
    Java16,
    #[serde(rename = "17")]
    Java17,
    #[serde(rename = "21")]
    Java21,
}

impl RuntimeId {
    pub const ALL: [RuntimeId; 4] = [
        RuntimeId::Java8,
        RuntimeId::Java16,
        RuntimeId::Java17,
        RuntimeId::Java21,
    ];

    pub fn major(self) -> u32 {
        match self {
            RuntimeId::Java8 => 8,
            RuntimeId::Java16 => 16,
            RuntimeId::Java17 => 17,
            RuntimeId::Java21 => 21,
        }
    }

    pub fn from_major(major: u32) -> Option<Self> {
        match major {
            8 => Some(RuntimeId::Java8),
            16 => Some(RuntimeId::Java16),
            17 => Some(RuntimeId::Java17),
            21 => Some(RuntimeId::Java21),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_roundtrip() {
        for id in RuntimeId::ALL {
            assert_eq!(RuntimeId::from_major(id.major()), Some(id));
        }
        assert_eq!(RuntimeId::from_major(11), None);
    }

    #[test]
    fn displays_as_the_major_version() {
        assert_eq!(RuntimeId::Java8.to_string(), "8");
        assert_eq!(RuntimeId::Java21.to_string(), "21");
    }
}
