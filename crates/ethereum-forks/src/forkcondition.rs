use alloy_primitives::BlockNumber;

/// The condition at which a fork is activated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ForkCondition {
    /// The fork is activated after a certain block.
    Block(BlockNumber),
    /// The fork is activated after a specific timestamp.
    Timestamp(u64),
    /// The fork is never activated
    #[default]
    Never,
}

impl ForkCondition {
    /// Returns true if the fork condition is timestamp based.
    pub const fn is_timestamp(&self) -> bool {
        matches!(self, Self::Timestamp(_))
    }

    /// Checks whether the fork condition is satisfied at the given block.
    ///
    /// For timestamp conditions, this will always return false.
    pub const fn active_at_block(&self, current_block: BlockNumber) -> bool {
        matches!(self, Self::Block(block) if current_block >= *block)
    }

    /// Checks whether the fork condition is satisfied at the given timestamp.
    ///
    /// This will return false for any condition that is not timestamp-based.
    pub const fn active_at_timestamp(&self, timestamp: u64) -> bool {
        matches!(self, Self::Timestamp(time) if timestamp >= *time)
    }

    /// Returns the timestamp of the fork condition, if it is timestamp based.
    pub const fn as_timestamp(&self) -> Option<u64> {
        match self {
            Self::Timestamp(timestamp) => Some(*timestamp),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_condition() {
        let condition = ForkCondition::Timestamp(1000);
        assert!(condition.is_timestamp());
        assert!(!condition.active_at_timestamp(999));
        assert!(condition.active_at_timestamp(1000));
        assert!(!condition.active_at_block(u64::MAX));
        assert_eq!(condition.as_timestamp(), Some(1000));
    }

    #[test]
    fn block_and_never_conditions() {
        assert!(ForkCondition::Block(10).active_at_block(10));
        assert!(!ForkCondition::Block(10).active_at_block(9));
        assert!(!ForkCondition::Block(0).active_at_timestamp(u64::MAX));
        assert!(!ForkCondition::Never.active_at_block(u64::MAX));
        assert!(!ForkCondition::Never.active_at_timestamp(u64::MAX));
        assert_eq!(ForkCondition::default(), ForkCondition::Never);
    }
}
