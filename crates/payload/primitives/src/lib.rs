//! Engine API message versions and the fork dependent rules that decide which fields a payload or
//! payload attributes object must carry for a given version.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
mod payload_or_attribute;
mod version;

pub use error::{EngineObjectValidationError, VersionSpecificValidationError};
pub use payload_or_attribute::{MessageValidationKind, PayloadOrAttributes};
pub use version::{is_method_allowed, EngineApiMessageVersion};

use ember_chainspec::ChainSpec;

/// Validates the timestamp of a payload or attributes against the version of the method it came
/// in with.
///
/// The fork active at `timestamp` must be exactly the fork this version serves, otherwise the call
/// is rejected with [`EngineObjectValidationError::UnsupportedFork`].
pub fn validate_payload_timestamp(
    chain_spec: &ChainSpec,
    version: EngineApiMessageVersion,
    timestamp: u64,
) -> Result<(), EngineObjectValidationError> {
    let fork = chain_spec.fork_at_timestamp(timestamp);
    if !is_method_allowed(version, fork) {
        return Err(EngineObjectValidationError::UnsupportedFork)
    }
    Ok(())
}

/// Validates the presence of the `withdrawals` field according to the message version.
///
/// Only V1 messages may omit the field, and V1 messages must not carry it. Callers are expected to
/// have already checked the version against the fork with [`validate_payload_timestamp`].
pub fn validate_withdrawals_presence(
    chain_spec: &ChainSpec,
    version: EngineApiMessageVersion,
    message_validation_kind: MessageValidationKind,
    timestamp: u64,
    has_withdrawals: bool,
) -> Result<(), EngineObjectValidationError> {
    let is_shanghai = chain_spec.is_shanghai_active_at_timestamp(timestamp);

    match version {
        EngineApiMessageVersion::V1 => {
            if has_withdrawals {
                return Err(message_validation_kind
                    .to_error(VersionSpecificValidationError::WithdrawalsNotSupportedInV1))
            }
        }
        EngineApiMessageVersion::V2 | EngineApiMessageVersion::V3 => {
            if is_shanghai && !has_withdrawals {
                return Err(message_validation_kind
                    .to_error(VersionSpecificValidationError::NoWithdrawalsPostShanghai))
            }
            if !is_shanghai && has_withdrawals {
                return Err(message_validation_kind
                    .to_error(VersionSpecificValidationError::HasWithdrawalsPreShanghai))
            }
        }
    };

    Ok(())
}

/// Validates the presence of the `parentBeaconBlockRoot` field according to the message version.
///
/// V3 messages must carry it, earlier versions must not.
pub fn validate_parent_beacon_block_root_presence(
    version: EngineApiMessageVersion,
    validation_kind: MessageValidationKind,
    has_parent_beacon_block_root: bool,
) -> Result<(), EngineObjectValidationError> {
    match version {
        EngineApiMessageVersion::V1 | EngineApiMessageVersion::V2 => {
            if has_parent_beacon_block_root {
                return Err(validation_kind.to_error(
                    VersionSpecificValidationError::ParentBeaconBlockRootNotSupportedBeforeV3,
                ))
            }
        }
        EngineApiMessageVersion::V3 => {
            if !has_parent_beacon_block_root {
                return Err(validation_kind
                    .to_error(VersionSpecificValidationError::NoParentBeaconBlockRootPostCancun))
            }
        }
    };

    Ok(())
}

/// Validates the fork and the presence of the fork specific fields of a payload or payload
/// attributes object received with the given message version.
///
/// The checks run in order:
///  1. the fork active at the object's timestamp must be the one `version` serves
///  2. `withdrawals` must be present exactly from V2 onwards
///  3. `parentBeaconBlockRoot` must be present exactly on V3
pub fn validate_version_specific_fields(
    chain_spec: &ChainSpec,
    version: EngineApiMessageVersion,
    payload_or_attrs: PayloadOrAttributes<'_>,
) -> Result<(), EngineObjectValidationError> {
    let timestamp = payload_or_attrs.timestamp();
    validate_payload_timestamp(chain_spec, version, timestamp)?;
    validate_withdrawals_presence(
        chain_spec,
        version,
        payload_or_attrs.message_validation_kind(),
        timestamp,
        payload_or_attrs.withdrawals().is_some(),
    )?;
    validate_parent_beacon_block_root_presence(
        version,
        payload_or_attrs.message_validation_kind(),
        payload_or_attrs.parent_beacon_block_root().is_some(),
    )
}

/// Returns the Engine API version that serves payloads built at `timestamp`.
pub fn version_at_timestamp(chain_spec: &ChainSpec, timestamp: u64) -> EngineApiMessageVersion {
    EngineApiMessageVersion::for_fork(chain_spec.fork_at_timestamp(timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ember_chainspec::ChainSpecBuilder;
    use ember_primitives::{Address, Withdrawal, B256};
    use ember_rpc_types::engine::PayloadAttributes;

    fn spec() -> ChainSpec {
        ChainSpecBuilder::mainnet().paris_activated().shanghai_at(100).cancun_at(200).build()
    }

    fn attributes(timestamp: u64, withdrawals: bool, root: bool) -> PayloadAttributes {
        PayloadAttributes {
            timestamp,
            prev_randao: B256::ZERO,
            suggested_fee_recipient: Address::ZERO,
            withdrawals: withdrawals.then(|| vec![Withdrawal::default()]),
            parent_beacon_block_root: root.then_some(B256::ZERO),
        }
    }

    fn validate(
        version: EngineApiMessageVersion,
        attrs: &PayloadAttributes,
    ) -> Result<(), EngineObjectValidationError> {
        validate_version_specific_fields(&spec(), version, attrs.into())
    }

    #[test]
    fn attributes_for_matching_fork() {
        use EngineApiMessageVersion::*;
        assert_matches!(validate(V1, &attributes(50, false, false)), Ok(()));
        assert_matches!(validate(V2, &attributes(150, true, false)), Ok(()));
        assert_matches!(validate(V3, &attributes(250, true, true)), Ok(()));
    }

    #[test]
    fn attributes_for_other_fork_are_unsupported() {
        use EngineApiMessageVersion::*;
        assert_matches!(
            validate(V3, &attributes(150, true, true)),
            Err(EngineObjectValidationError::UnsupportedFork)
        );
        assert_matches!(
            validate(V2, &attributes(250, true, false)),
            Err(EngineObjectValidationError::UnsupportedFork)
        );
        assert_matches!(
            validate(V1, &attributes(150, false, false)),
            Err(EngineObjectValidationError::UnsupportedFork)
        );
    }

    #[test]
    fn missing_or_stray_fields() {
        use EngineApiMessageVersion::*;
        assert_matches!(
            validate(V1, &attributes(50, true, false)),
            Err(EngineObjectValidationError::PayloadAttributes(
                VersionSpecificValidationError::WithdrawalsNotSupportedInV1
            ))
        );
        assert_matches!(
            validate(V2, &attributes(150, false, false)),
            Err(EngineObjectValidationError::PayloadAttributes(
                VersionSpecificValidationError::NoWithdrawalsPostShanghai
            ))
        );
        assert_matches!(
            validate(V2, &attributes(150, true, true)),
            Err(EngineObjectValidationError::PayloadAttributes(
                VersionSpecificValidationError::ParentBeaconBlockRootNotSupportedBeforeV3
            ))
        );
        assert_matches!(
            validate(V3, &attributes(250, true, false)),
            Err(EngineObjectValidationError::PayloadAttributes(
                VersionSpecificValidationError::NoParentBeaconBlockRootPostCancun
            ))
        );
    }

    #[test]
    fn version_at_timestamp_follows_forks() {
        assert_eq!(version_at_timestamp(&spec(), 0), EngineApiMessageVersion::V1);
        assert_eq!(version_at_timestamp(&spec(), 100), EngineApiMessageVersion::V2);
        assert_eq!(version_at_timestamp(&spec(), 200), EngineApiMessageVersion::V3);
    }
}
