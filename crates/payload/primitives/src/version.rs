use ember_chainspec::Hardfork;
use std::fmt;

/// The version of an Engine API message.
///
/// Each version serves exactly one fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineApiMessageVersion {
    /// Version 1, Paris.
    V1 = 1,
    /// Version 2, Shanghai: adds withdrawals.
    V2 = 2,
    /// Version 3, Cancun: adds blob gas fields, versioned hashes and the parent beacon block root.
    V3 = 3,
}

impl EngineApiMessageVersion {
    /// Returns the version that serves the given fork.
    pub const fn for_fork(fork: Hardfork) -> Self {
        match fork {
            Hardfork::Paris => Self::V1,
            Hardfork::Shanghai => Self::V2,
            Hardfork::Cancun => Self::V3,
        }
    }

    /// Parses the trailing `V<n>` of a method name.
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// Returns the version number.
    pub const fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EngineApiMessageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.number())
    }
}

/// Returns true if a message of the given version may be used for an object of the given fork.
pub const fn is_method_allowed(version: EngineApiMessageVersion, fork: Hardfork) -> bool {
    version as u8 == EngineApiMessageVersion::for_fork(fork) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_fork_version_is_allowed() {
        let versions =
            [EngineApiMessageVersion::V1, EngineApiMessageVersion::V2, EngineApiMessageVersion::V3];
        for fork in Hardfork::ALL {
            for version in versions {
                assert_eq!(
                    is_method_allowed(version, fork),
                    EngineApiMessageVersion::for_fork(fork) == version,
                    "{version} {fork}"
                );
            }
        }
        assert!(!is_method_allowed(EngineApiMessageVersion::V3, Hardfork::Shanghai));
        assert!(!is_method_allowed(EngineApiMessageVersion::V2, Hardfork::Cancun));
    }

    #[test]
    fn versions_parse() {
        assert_eq!(EngineApiMessageVersion::from_number(2), Some(EngineApiMessageVersion::V2));
        assert_eq!(EngineApiMessageVersion::from_number(4), None);
        assert_eq!(EngineApiMessageVersion::V3.to_string(), "V3");
    }
}
