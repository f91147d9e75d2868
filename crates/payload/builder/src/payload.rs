//! Contains types required for building a payload.

use alloy_rlp::Encodable;
use ember_primitives::{Address, BlobTransactionSidecar, SealedBlock, Withdrawal, B256, U256};
use ember_rpc_types::engine::{
    ExecutionPayloadEnvelopeV2, ExecutionPayloadEnvelopeV3, ExecutionPayloadV1, PayloadAttributes,
    PayloadId,
};

/// Contains the built payload.
///
/// According to the [engine API specification](https://github.com/ethereum/execution-apis/blob/main/src/engine/README.md) the execution layer should build the initial version of the payload with an empty transaction set and then keep update it in order to maximize the revenue.
/// Therefore, the empty-block here is always available and full-block will be set/updated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPayload {
    /// Identifier of the payload
    pub(crate) id: PayloadId,
    /// The built block
    pub(crate) block: SealedBlock,
    /// The fees of the block
    pub(crate) fees: U256,
    /// The blobs, proofs, and commitments in the block. If the block is pre-cancun, this will be
    /// empty.
    pub(crate) sidecars: Vec<BlobTransactionSidecar>,
}

// === impl BuiltPayload ===

impl BuiltPayload {
    /// Initializes the payload with the given initial block.
    pub const fn new(id: PayloadId, block: SealedBlock, fees: U256) -> Self {
        Self { id, block, fees, sidecars: Vec::new() }
    }

    /// Returns the identifier of the payload.
    pub const fn id(&self) -> PayloadId {
        self.id
    }

    /// Returns the built block(sealed)
    pub const fn block(&self) -> &SealedBlock {
        &self.block
    }

    /// Fees of the block
    pub const fn fees(&self) -> U256 {
        self.fees
    }

    /// Returns the blob sidecars of the blob transactions in the block, in transaction order.
    pub fn sidecars(&self) -> &[BlobTransactionSidecar] {
        &self.sidecars
    }

    /// Adds sidecars to the payload.
    pub fn extend_sidecars(&mut self, sidecars: impl IntoIterator<Item = BlobTransactionSidecar>) {
        self.sidecars.extend(sidecars)
    }

    /// Converts the type into the response expected by `engine_getPayloadV1`
    pub fn into_v1_payload(self) -> ExecutionPayloadV1 {
        self.into()
    }

    /// Converts the type into the response expected by `engine_getPayloadV2`
    pub fn into_v2_payload(self) -> ExecutionPayloadEnvelopeV2 {
        self.into()
    }

    /// Converts the type into the response expected by `engine_getPayloadV3`
    pub fn into_v3_payload(self) -> ExecutionPayloadEnvelopeV3 {
        self.into()
    }
}

// V1 engine_getPayloadV1 response
impl From<BuiltPayload> for ExecutionPayloadV1 {
    fn from(value: BuiltPayload) -> Self {
        value.block.into()
    }
}

// V2 engine_getPayloadV2 response
impl From<BuiltPayload> for ExecutionPayloadEnvelopeV2 {
    fn from(value: BuiltPayload) -> Self {
        let BuiltPayload { block, fees, .. } = value;

        Self { block_value: fees, execution_payload: block.into() }
    }
}

impl From<BuiltPayload> for ExecutionPayloadEnvelopeV3 {
    fn from(value: BuiltPayload) -> Self {
        let BuiltPayload { block, fees, sidecars, .. } = value;

        Self {
            execution_payload: block.into(),
            block_value: fees,
            // Clients without a heuristic for overriding the builder must return `false`.
            should_override_builder: false,
            blobs_bundle: sidecars.into(),
        }
    }
}

/// Container type for all components required to build a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBuilderAttributes {
    /// Id of the payload
    pub id: PayloadId,
    /// Parent block to build the payload on top
    pub parent: B256,
    /// Timestamp for the generated payload
    pub timestamp: u64,
    /// Address of the recipient for collecting transaction fee
    pub suggested_fee_recipient: Address,
    /// Randomness value for the generated payload
    pub prev_randao: B256,
    /// Withdrawals for the generated payload
    pub withdrawals: Vec<Withdrawal>,
    /// Root of the parent beacon block
    pub parent_beacon_block_root: Option<B256>,
}

// === impl PayloadBuilderAttributes ===

impl PayloadBuilderAttributes {
    /// Creates a new payload builder for the given parent block and the attributes.
    ///
    /// Derives the unique [PayloadId] for the given parent and attributes
    pub fn new(parent: B256, attributes: PayloadAttributes) -> Self {
        let id = payload_id(&parent, &attributes);
        Self {
            id,
            parent,
            timestamp: attributes.timestamp,
            suggested_fee_recipient: attributes.suggested_fee_recipient,
            prev_randao: attributes.prev_randao,
            withdrawals: attributes.withdrawals.unwrap_or_default(),
            parent_beacon_block_root: attributes.parent_beacon_block_root,
        }
    }

    /// Returns the identifier of the payload.
    pub const fn payload_id(&self) -> PayloadId {
        self.id
    }

    /// Returns the hash of the parent block.
    pub const fn parent(&self) -> B256 {
        self.parent
    }
}

/// Generates the payload id for the configured payload
///
/// Returns an 8-byte identifier by hashing the payload components with sha256 hash.
pub fn payload_id(parent: &B256, attributes: &PayloadAttributes) -> PayloadId {
    use sha2::Digest;
    let mut hasher = sha2::Sha256::new();
    hasher.update(parent.as_slice());
    hasher.update(&attributes.timestamp.to_be_bytes()[..]);
    hasher.update(attributes.prev_randao.as_slice());
    hasher.update(attributes.suggested_fee_recipient.as_slice());
    if let Some(withdrawals) = &attributes.withdrawals {
        let mut buf = Vec::new();
        withdrawals.encode(&mut buf);
        hasher.update(buf);
    }
    if let Some(parent_beacon_block) = attributes.parent_beacon_block_root {
        hasher.update(parent_beacon_block.as_slice());
    }
    let out = hasher.finalize();
    let mut id = [0u8; 8];
    id.copy_from_slice(&out[..8]);
    PayloadId::new(id)
}

/// Checks if the new payload is better than the current best.
///
/// This compares the total fees of the blocks, higher is better.
#[inline(always)]
pub fn is_better_payload(best_payload: Option<&BuiltPayload>, new_fees: U256) -> bool {
    if let Some(best_payload) = best_payload {
        new_fees > best_payload.fees()
    } else {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_primitives::{Block, Bytes, Bytes48};

    fn attributes() -> PayloadAttributes {
        PayloadAttributes {
            timestamp: 1_700_000_000,
            prev_randao: B256::repeat_byte(1),
            suggested_fee_recipient: Address::repeat_byte(2),
            withdrawals: Some(vec![Withdrawal {
                index: 0,
                validator_index: 1,
                address: Address::repeat_byte(3),
                amount: 32,
            }]),
            parent_beacon_block_root: Some(B256::repeat_byte(4)),
        }
    }

    #[test]
    fn payload_id_is_deterministic() {
        let parent = B256::repeat_byte(9);
        assert_eq!(payload_id(&parent, &attributes()), payload_id(&parent, &attributes()));
        let builder_attributes = PayloadBuilderAttributes::new(parent, attributes());
        assert_eq!(builder_attributes.payload_id(), payload_id(&parent, &attributes()));
    }

    #[test]
    fn payload_id_changes_with_any_attribute() {
        let parent = B256::repeat_byte(9);
        let base = payload_id(&parent, &attributes());

        let variants = [
            PayloadAttributes { timestamp: 1_700_000_001, ..attributes() },
            PayloadAttributes { prev_randao: B256::repeat_byte(5), ..attributes() },
            PayloadAttributes { suggested_fee_recipient: Address::ZERO, ..attributes() },
            PayloadAttributes { withdrawals: Some(vec![]), ..attributes() },
            PayloadAttributes { withdrawals: None, ..attributes() },
            PayloadAttributes { parent_beacon_block_root: None, ..attributes() },
        ];
        for variant in variants {
            assert_ne!(payload_id(&parent, &variant), base);
        }
        assert_ne!(payload_id(&B256::ZERO, &attributes()), base);
    }

    #[test]
    fn better_payload_requires_strictly_more_fees() {
        let payload =
            BuiltPayload::new(PayloadId::new([0; 8]), Block::default().seal_slow(), U256::from(10));
        assert!(is_better_payload(None, U256::ZERO));
        assert!(is_better_payload(Some(&payload), U256::from(11)));
        assert!(!is_better_payload(Some(&payload), U256::from(10)));
        assert!(!is_better_payload(Some(&payload), U256::from(9)));
    }

    #[test]
    fn v3_envelope_carries_blobs_bundle() {
        let mut payload =
            BuiltPayload::new(PayloadId::new([0; 8]), Block::default().seal_slow(), U256::from(7));
        let sidecar = |n: usize| {
            BlobTransactionSidecar::new(
                vec![Bytes::from_static(&[1]); n],
                vec![Bytes48::repeat_byte(2); n],
                vec![Bytes48::repeat_byte(3); n],
            )
        };
        payload.extend_sidecars([sidecar(2), sidecar(1)]);

        let envelope = payload.into_v3_payload();
        assert_eq!(envelope.block_value, U256::from(7));
        assert!(!envelope.should_override_builder);
        assert_eq!(envelope.blobs_bundle.blobs.len(), 3);
        assert_eq!(envelope.blobs_bundle.commitments.len(), 3);
        assert_eq!(envelope.blobs_bundle.proofs.len(), 3);
    }
}
