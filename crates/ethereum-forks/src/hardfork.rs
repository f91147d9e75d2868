use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The proof-of-stake Ethereum hardforks.
///
/// Ordered by activation, so `Cancun > Shanghai > Paris`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hardfork {
    /// The merge. Engine API V1.
    Paris,
    /// Withdrawals. Engine API V2.
    Shanghai,
    /// Blob transactions and the parent beacon block root. Engine API V3.
    Cancun,
}

impl Hardfork {
    /// All known forks, in activation order.
    pub const ALL: [Self; 3] = [Self::Paris, Self::Shanghai, Self::Cancun];
}

impl FromStr for Hardfork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hardfork = match s.to_lowercase().as_str() {
            "paris" | "merge" => Self::Paris,
            "shanghai" => Self::Shanghai,
            "cancun" => Self::Cancun,
            _ => return Err(format!("Unknown hardfork {s}")),
        };
        Ok(hardfork)
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_hardfork_from_str() {
        assert_eq!("PARIS".parse::<Hardfork>(), Ok(Hardfork::Paris));
        assert_eq!("merge".parse::<Hardfork>(), Ok(Hardfork::Paris));
        assert_eq!("shanghai".parse::<Hardfork>(), Ok(Hardfork::Shanghai));
        assert_eq!("Cancun".parse::<Hardfork>(), Ok(Hardfork::Cancun));
        assert!("prague".parse::<Hardfork>().is_err());
    }

    #[test]
    fn ordered_by_activation() {
        assert!(Hardfork::Paris < Hardfork::Shanghai);
        assert!(Hardfork::Shanghai < Hardfork::Cancun);
        assert_eq!(Hardfork::Cancun.to_string(), "Cancun");
        assert_eq!(serde_json::to_string(&Hardfork::Shanghai).unwrap(), "\"Shanghai\"");
    }
}
