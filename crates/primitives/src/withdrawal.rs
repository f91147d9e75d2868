use crate::{constants::GWEI_TO_WEI, Address, U256};
use alloy_rlp::{RlpDecodable, RlpEncodable};
use serde::{Deserialize, Serialize};

/// Withdrawal represents a validator withdrawal from the consensus layer.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Default, RlpEncodable, RlpDecodable, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    /// Monotonically increasing identifier issued by consensus layer.
    #[serde(with = "alloy_serde::quantity")]
    pub index: u64,
    /// Index of validator associated with withdrawal.
    #[serde(with = "alloy_serde::quantity")]
    pub validator_index: u64,
    /// Target address for withdrawn ether.
    pub address: Address,
    /// Value of the withdrawal in gwei.
    #[serde(with = "alloy_serde::quantity")]
    pub amount: u64,
}

impl Withdrawal {
    /// Return the withdrawal amount in wei.
    pub fn amount_wei(&self) -> U256 {
        U256::from(self.amount) * U256::from(GWEI_TO_WEI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address;

    #[test]
    fn serde_withdrawal() {
        let input = r#"{"index":"0x3","validatorIndex":"0x2","address":"0x000000000000000000000000000000000000dead","amount":"0x64"}"#;
        let withdrawal: Withdrawal = serde_json::from_str(input).unwrap();
        assert_eq!(
            withdrawal,
            Withdrawal {
                index: 3,
                validator_index: 2,
                address: address!("000000000000000000000000000000000000dead"),
                amount: 100,
            }
        );
        assert_eq!(serde_json::to_string(&withdrawal).unwrap(), input);
        assert_eq!(withdrawal.amount_wei(), U256::from(100_000_000_000u64));
    }
}
