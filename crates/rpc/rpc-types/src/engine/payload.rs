use ember_primitives::{
    constants::{EMPTY_OMMER_ROOT_HASH, MAXIMUM_EXTRA_DATA_SIZE, MIN_PROTOCOL_BASE_FEE},
    proofs, Address, BlobTransactionSidecar, Block, Bloom, Bytes, Bytes48, Header, SealedBlock,
    Withdrawal, B256, B64, U256,
};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

/// The execution payload body response that allows for `null` values.
pub type ExecutionPayloadBodiesV1 = Vec<Option<ExecutionPayloadBodyV1>>;

/// And 8-byte identifier for an execution payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PayloadId(B64);

// === impl PayloadId ===

impl PayloadId {
    /// Creates a new payload id from the given identifier.
    pub const fn new(id: [u8; 8]) -> Self {
        Self(B64::new(id))
    }
}

impl std::fmt::Display for PayloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// This represents the `executionPayload` field in the return value of `engine_getPayloadV2`,
/// specified as:
///
///  - `executionPayload`: `ExecutionPayloadV1` | `ExecutionPayloadV2` where:
///    - `ExecutionPayloadV1` **MUST** be returned if the payload `timestamp` is lower than the
///      Shanghai timestamp
///    - `ExecutionPayloadV2` **MUST** be returned if the payload `timestamp` is greater or equal
///      to the Shanghai timestamp
///
/// See:
/// <https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/shanghai.md#response>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionPayloadFieldV2 {
    /// V2 payload
    V2(ExecutionPayloadV2),
    /// V1 payload
    V1(ExecutionPayloadV1),
}

impl ExecutionPayloadFieldV2 {
    /// Returns the inner [`ExecutionPayloadV1`]
    pub fn into_v1_payload(self) -> ExecutionPayloadV1 {
        match self {
            Self::V1(payload) => payload,
            Self::V2(payload) => payload.payload_inner,
        }
    }
}

impl From<SealedBlock> for ExecutionPayloadFieldV2 {
    fn from(value: SealedBlock) -> Self {
        // if there are withdrawals, return V2
        if value.withdrawals.is_some() {
            Self::V2(value.into())
        } else {
            Self::V1(value.into())
        }
    }
}

/// This structure maps for the return value of `engine_getPayload` of the beacon chain spec, for
/// V2.
///
/// See also:
/// <https://github.com/ethereum/execution-apis/blob/main/src/engine/shanghai.md#engine_getpayloadv2>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadEnvelopeV2 {
    /// Execution payload, which could be either V1 or V2
    pub execution_payload: ExecutionPayloadFieldV2,
    /// The expected value to be received by the feeRecipient in wei
    pub block_value: U256,
}

impl ExecutionPayloadEnvelopeV2 {
    /// Returns the [`ExecutionPayloadV1`] for the `engine_getPayloadV1` endpoint
    pub fn into_v1_payload(self) -> ExecutionPayloadV1 {
        self.execution_payload.into_v1_payload()
    }
}

/// This structure maps for the return value of `engine_getPayload` of the beacon chain spec, for
/// V3.
///
/// See also:
/// <https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#response-2>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadEnvelopeV3 {
    /// Execution payload V3
    pub execution_payload: ExecutionPayloadV3,
    /// The expected value to be received by the feeRecipient in wei
    pub block_value: U256,
    /// The blobs, commitments, and proofs associated with the executed payload.
    pub blobs_bundle: BlobsBundleV1,
    /// Introduced in V3, this represents a suggestion from the execution layer if the payload
    /// should be used instead of an externally provided one.
    pub should_override_builder: bool,
}

/// This structure maps on the ExecutionPayload structure of the beacon chain spec.
///
/// See also: <https://github.com/ethereum/execution-apis/blob/6709c2a795b707202e93c4f2867fa0bf2640a84f/src/engine/paris.md#executionpayloadv1>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV1 {
    /// The parent hash of the block.
    pub parent_hash: B256,
    /// The fee recipient of the block.
    pub fee_recipient: Address,
    /// The state root of the block.
    pub state_root: B256,
    /// The receipts root of the block.
    pub receipts_root: B256,
    /// The logs bloom of the block.
    pub logs_bloom: Bloom,
    /// The previous randao of the block.
    pub prev_randao: B256,
    /// The block number.
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    /// The gas limit of the block.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    /// The gas used of the block.
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    /// The timestamp of the block.
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// The extra data of the block.
    pub extra_data: Bytes,
    /// The base fee per gas of the block.
    pub base_fee_per_gas: U256,
    /// The block hash of the block.
    pub block_hash: B256,
    /// The transactions of the block.
    pub transactions: Vec<Bytes>,
}

impl ExecutionPayloadV1 {
    /// Converts the payload into a [`Block`], without withdrawals.
    ///
    /// Performs the validation of `extra_data` and `base_fee_per_gas` the conversion requires.
    ///
    /// NOTE: The log bloom is assumed to be validated during deserialization.
    /// NOTE: Empty ommers, nonce and difficulty values are validated upon computing block hash and
    /// comparing the value with `payload.block_hash`.
    pub fn try_into_block(self) -> Result<Block, PayloadError> {
        if self.extra_data.len() > MAXIMUM_EXTRA_DATA_SIZE {
            return Err(PayloadError::ExtraData(self.extra_data))
        }

        if self.base_fee_per_gas < U256::from(MIN_PROTOCOL_BASE_FEE) {
            return Err(PayloadError::BaseFee(self.base_fee_per_gas))
        }
        let base_fee_per_gas = u64::try_from(self.base_fee_per_gas)
            .map_err(|_| PayloadError::BaseFee(self.base_fee_per_gas))?;

        let transactions_root = proofs::calculate_transaction_root(&self.transactions);

        let header = Header {
            parent_hash: self.parent_hash,
            beneficiary: self.fee_recipient,
            state_root: self.state_root,
            transactions_root,
            receipts_root: self.receipts_root,
            withdrawals_root: None,
            logs_bloom: self.logs_bloom,
            number: self.block_number,
            gas_limit: self.gas_limit,
            gas_used: self.gas_used,
            timestamp: self.timestamp,
            mix_hash: self.prev_randao,
            base_fee_per_gas: Some(base_fee_per_gas),
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            extra_data: self.extra_data,
            // Defaults
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            difficulty: Default::default(),
            nonce: Default::default(),
        };

        Ok(Block { header, body: self.transactions, withdrawals: None })
    }
}

impl From<SealedBlock> for ExecutionPayloadV1 {
    fn from(value: SealedBlock) -> Self {
        let block_hash = value.hash();
        let (header, transactions, _) = value.split();
        let header = header.unseal();
        Self {
            parent_hash: header.parent_hash,
            fee_recipient: header.beneficiary,
            state_root: header.state_root,
            receipts_root: header.receipts_root,
            logs_bloom: header.logs_bloom,
            prev_randao: header.mix_hash,
            block_number: header.number,
            gas_limit: header.gas_limit,
            gas_used: header.gas_used,
            timestamp: header.timestamp,
            extra_data: header.extra_data,
            base_fee_per_gas: U256::from(header.base_fee_per_gas.unwrap_or_default()),
            block_hash,
            transactions,
        }
    }
}

/// This structure maps on the ExecutionPayloadV2 structure of the beacon chain spec.
///
/// See also: <https://github.com/ethereum/execution-apis/blob/6709c2a795b707202e93c4f2867fa0bf2640a84f/src/engine/shanghai.md#executionpayloadv2>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV2 {
    /// Inner V1 payload
    #[serde(flatten)]
    pub payload_inner: ExecutionPayloadV1,

    /// Array of [`Withdrawal`] enabled with V2
    pub withdrawals: Vec<Withdrawal>,
}

impl ExecutionPayloadV2 {
    /// Returns the timestamp for the execution payload.
    pub const fn timestamp(&self) -> u64 {
        self.payload_inner.timestamp
    }

    /// Converts the payload into a [`Block`] with withdrawals and their root.
    pub fn try_into_block(self) -> Result<Block, PayloadError> {
        let mut block = self.payload_inner.try_into_block()?;
        block.header.withdrawals_root = Some(proofs::calculate_withdrawals_root(&self.withdrawals));
        block.withdrawals = Some(self.withdrawals);
        Ok(block)
    }
}

impl From<SealedBlock> for ExecutionPayloadV2 {
    fn from(mut value: SealedBlock) -> Self {
        let withdrawals = value.withdrawals.take().unwrap_or_default();
        Self { payload_inner: value.into(), withdrawals }
    }
}

/// This structure maps on the ExecutionPayloadV3 structure of the beacon chain spec.
///
/// See also: <https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#ExecutionPayloadV3>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadV3 {
    /// Inner V2 payload
    #[serde(flatten)]
    pub payload_inner: ExecutionPayloadV2,

    /// Total blob gas consumed by the transactions of the payload, enabled with V3
    #[serde(with = "alloy_serde::quantity")]
    pub blob_gas_used: u64,
    /// Excess blob gas of the payload, enabled with V3
    #[serde(with = "alloy_serde::quantity")]
    pub excess_blob_gas: u64,
}

impl ExecutionPayloadV3 {
    /// Returns the withdrawals for the payload.
    pub const fn withdrawals(&self) -> &Vec<Withdrawal> {
        &self.payload_inner.withdrawals
    }

    /// Returns the timestamp for the payload.
    pub const fn timestamp(&self) -> u64 {
        self.payload_inner.payload_inner.timestamp
    }

    /// Converts the payload into a [`Block`] with the blob gas fields set.
    pub fn try_into_block(self) -> Result<Block, PayloadError> {
        let mut block = self.payload_inner.try_into_block()?;
        block.header.blob_gas_used = Some(self.blob_gas_used);
        block.header.excess_blob_gas = Some(self.excess_blob_gas);
        Ok(block)
    }
}

impl From<SealedBlock> for ExecutionPayloadV3 {
    fn from(value: SealedBlock) -> Self {
        let blob_gas_used = value.blob_gas_used.unwrap_or_default();
        let excess_blob_gas = value.excess_blob_gas.unwrap_or_default();
        Self { payload_inner: value.into(), blob_gas_used, excess_blob_gas }
    }
}

/// The input of `engine_newPayloadV2`: a V1 payload before Shanghai, a V2 payload after.
///
/// See also:
/// <https://github.com/ethereum/execution-apis/blob/main/src/engine/shanghai.md#request>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadInputV2 {
    /// The V1 execution payload
    #[serde(flatten)]
    pub execution_payload: ExecutionPayloadV1,
    /// The withdrawals, present from Shanghai onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl From<ExecutionPayloadInputV2> for ExecutionPayload {
    fn from(input: ExecutionPayloadInputV2) -> Self {
        match input.withdrawals {
            Some(withdrawals) => Self::V2(ExecutionPayloadV2 {
                payload_inner: input.execution_payload,
                withdrawals,
            }),
            None => Self::V1(input.execution_payload),
        }
    }
}

/// This includes all bundled blob related data of an executed payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobsBundleV1 {
    /// All commitments in the bundle.
    pub commitments: Vec<Bytes48>,
    /// All proofs in the bundle.
    pub proofs: Vec<Bytes48>,
    /// All blobs in the bundle.
    pub blobs: Vec<Bytes>,
}

impl BlobsBundleV1 {
    /// Number of blobs in the bundle.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if the bundle carries no blobs.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl From<Vec<BlobTransactionSidecar>> for BlobsBundleV1 {
    fn from(sidecars: Vec<BlobTransactionSidecar>) -> Self {
        let (commitments, proofs, blobs) = sidecars.into_iter().fold(
            (Vec::new(), Vec::new(), Vec::new()),
            |(mut commitments, mut proofs, mut blobs), sidecar| {
                commitments.extend(sidecar.commitments);
                proofs.extend(sidecar.proofs);
                blobs.extend(sidecar.blobs);
                (commitments, proofs, blobs)
            },
        );
        Self { commitments, proofs, blobs }
    }
}

/// An execution payload, which can be either [`ExecutionPayloadV1`], [`ExecutionPayloadV2`], or
/// [`ExecutionPayloadV3`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionPayload {
    /// V1 payload
    V1(ExecutionPayloadV1),
    /// V2 payload
    V2(ExecutionPayloadV2),
    /// V3 payload
    V3(ExecutionPayloadV3),
}

impl ExecutionPayload {
    /// Returns a reference to the V1 payload fields shared by every version.
    pub const fn as_v1(&self) -> &ExecutionPayloadV1 {
        match self {
            Self::V1(payload) => payload,
            Self::V2(payload) => &payload.payload_inner,
            Self::V3(payload) => &payload.payload_inner.payload_inner,
        }
    }

    /// Returns the withdrawals for the payload.
    pub const fn withdrawals(&self) -> Option<&Vec<Withdrawal>> {
        match self {
            Self::V1(_) => None,
            Self::V2(payload) => Some(&payload.withdrawals),
            Self::V3(payload) => Some(payload.withdrawals()),
        }
    }

    /// Returns the timestamp for the payload.
    pub const fn timestamp(&self) -> u64 {
        self.as_v1().timestamp
    }

    /// Returns the parent hash for the payload.
    pub const fn parent_hash(&self) -> B256 {
        self.as_v1().parent_hash
    }

    /// Returns the block hash for the payload.
    pub const fn block_hash(&self) -> B256 {
        self.as_v1().block_hash
    }

    /// Returns the block number for this payload.
    pub const fn block_number(&self) -> u64 {
        self.as_v1().block_number
    }

    /// Returns the canonical transaction encodings of the payload.
    pub fn transactions(&self) -> &[Bytes] {
        &self.as_v1().transactions
    }

    /// Returns the blob gas used, present on V3 payloads.
    pub const fn blob_gas_used(&self) -> Option<u64> {
        match self {
            Self::V3(payload) => Some(payload.blob_gas_used),
            _ => None,
        }
    }

    /// Returns the excess blob gas, present on V3 payloads.
    pub const fn excess_blob_gas(&self) -> Option<u64> {
        match self {
            Self::V3(payload) => Some(payload.excess_blob_gas),
            _ => None,
        }
    }

    /// Tries to create a new unsealed block from the given payload and optional parent beacon
    /// block root.
    pub fn try_into_block(
        self,
        parent_beacon_block_root: Option<B256>,
    ) -> Result<Block, PayloadError> {
        let mut block = match self {
            Self::V1(payload) => payload.try_into_block()?,
            Self::V2(payload) => payload.try_into_block()?,
            Self::V3(payload) => payload.try_into_block()?,
        };
        block.header.parent_beacon_block_root = parent_beacon_block_root;
        Ok(block)
    }

    /// Tries to create a new block from the given payload and optional parent beacon block root,
    /// and checks that the resulting block hash matches the payload's block hash.
    ///
    /// See <https://github.com/ethereum/go-ethereum/blob/79a478bb6176425c2400e949890e668a3d9a3d05/core/beacon/types.go#L145>
    pub fn try_into_sealed_block(
        self,
        parent_beacon_block_root: Option<B256>,
    ) -> Result<SealedBlock, PayloadError> {
        let block_hash = self.block_hash();
        let block = self.try_into_block(parent_beacon_block_root)?.seal_slow();

        if block_hash != block.hash() {
            return Err(PayloadError::BlockHash { execution: block.hash(), consensus: block_hash })
        }

        Ok(block)
    }
}

impl From<ExecutionPayloadV1> for ExecutionPayload {
    fn from(payload: ExecutionPayloadV1) -> Self {
        Self::V1(payload)
    }
}

impl From<ExecutionPayloadV2> for ExecutionPayload {
    fn from(payload: ExecutionPayloadV2) -> Self {
        Self::V2(payload)
    }
}

impl From<ExecutionPayloadV3> for ExecutionPayload {
    fn from(payload: ExecutionPayloadV3) -> Self {
        Self::V3(payload)
    }
}

impl From<SealedBlock> for ExecutionPayload {
    fn from(block: SealedBlock) -> Self {
        if block.header.parent_beacon_block_root.is_some() {
            // block with parent beacon block root: V3
            Self::V3(block.into())
        } else if block.withdrawals.is_some() {
            // block with withdrawals: V2
            Self::V2(block.into())
        } else {
            // otherwise V1
            Self::V1(block.into())
        }
    }
}

/// Error that can occur when converting a payload into a block.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Invalid payload extra data.
    #[error("invalid payload extra data: {0}")]
    ExtraData(Bytes),
    /// Invalid payload base fee.
    #[error("invalid payload base fee: {0}")]
    BaseFee(U256),
    /// Invalid payload block hash.
    #[error("block hash mismatch: want {consensus}, got {execution}")]
    BlockHash {
        /// The block hash computed from the payload.
        execution: B256,
        /// The block hash provided with the payload.
        consensus: B256,
    },
}

impl PayloadError {
    /// Returns `true` if the error is caused by a block hash mismatch.
    pub const fn is_block_hash_mismatch(&self) -> bool {
        matches!(self, Self::BlockHash { .. })
    }
}

impl From<PayloadError> for PayloadStatusEnum {
    fn from(error: PayloadError) -> Self {
        if error.is_block_hash_mismatch() {
            Self::InvalidBlockHash { validation_error: error.to_string() }
        } else {
            Self::Invalid { validation_error: error.to_string() }
        }
    }
}

/// This structure contains a body of an execution payload.
///
/// See also: <https://github.com/ethereum/execution-apis/blob/6452a6b194d7db269bf1dbd087a267251d3cc7f8/src/engine/shanghai.md#executionpayloadbodyv1>
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPayloadBodyV1 {
    /// Enveloped encoded transactions.
    pub transactions: Vec<Bytes>,
    /// All withdrawals in the block.
    ///
    /// Will always be `None` if pre shanghai.
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl From<SealedBlock> for ExecutionPayloadBodyV1 {
    fn from(value: SealedBlock) -> Self {
        Self { transactions: value.body, withdrawals: value.withdrawals }
    }
}

/// This structure contains the attributes required to initiate a payload build process in the
/// context of an `engine_forkchoiceUpdated` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadAttributes {
    /// Value for the `timestamp` field of the new payload
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    /// Value for the `prevRandao` field of the new payload
    pub prev_randao: B256,
    /// Suggested value for the `feeRecipient` field of the new payload
    pub suggested_fee_recipient: Address,
    /// Array of [`Withdrawal`] enabled with V2
    /// See <https://github.com/ethereum/execution-apis/blob/6452a6b194d7db269bf1dbd087a267251d3cc7f8/src/engine/shanghai.md#payloadattributesv2>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Root of the parent beacon block enabled with V3.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/cancun.md#payloadattributesv3>
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
}

/// This structure contains the result of processing a payload or fork choice update.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatus {
    /// The status of the payload.
    #[serde(flatten)]
    pub status: PayloadStatusEnum,
    /// Hash of the most recent valid block in the branch defined by payload and its ancestors
    pub latest_valid_hash: Option<B256>,
}

impl PayloadStatus {
    /// Creates a new payload status.
    pub const fn new(status: PayloadStatusEnum, latest_valid_hash: Option<B256>) -> Self {
        Self { status, latest_valid_hash }
    }

    /// Creates a new payload status without a latest valid hash.
    pub const fn from_status(status: PayloadStatusEnum) -> Self {
        Self { status, latest_valid_hash: None }
    }

    /// Sets the latest valid hash.
    pub fn with_latest_valid_hash(mut self, latest_valid_hash: B256) -> Self {
        self.latest_valid_hash = Some(latest_valid_hash);
        self
    }

    /// Sets the latest valid hash if it's not None.
    pub fn maybe_latest_valid_hash(mut self, latest_valid_hash: Option<B256>) -> Self {
        self.latest_valid_hash = latest_valid_hash;
        self
    }

    /// Returns true if the payload status is syncing.
    pub const fn is_syncing(&self) -> bool {
        self.status.is_syncing()
    }

    /// Returns true if the payload status is valid.
    pub const fn is_valid(&self) -> bool {
        self.status.is_valid()
    }

    /// Returns true if the payload status is invalid.
    pub const fn is_invalid(&self) -> bool {
        self.status.is_invalid()
    }
}

impl std::fmt::Display for PayloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PayloadStatus {{status: {}, latestValidHash: {:?} }}",
            self.status, self.latest_valid_hash
        )
    }
}

impl Serialize for PayloadStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("status", self.status.as_str())?;
        map.serialize_entry("latestValidHash", &self.latest_valid_hash)?;
        map.serialize_entry("validationError", &self.status.validation_error())?;
        map.end()
    }
}

/// The status of a payload, as reported by `engine_newPayload` and `engine_forkchoiceUpdated`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusEnum {
    /// VALID is returned by the engine API in the following calls:
    ///   - newPayload:       if the payload was already known or was just validated and executed
    ///   - forkchoiceUpdate: if the chain accepted the reorg (might ignore if it's stale)
    Valid,

    /// INVALID is returned by the engine API in the following calls:
    ///   - newPayload:       if the payload failed to execute on top of the local chain
    ///   - forkchoiceUpdate: if the new head is unknown, pre-merge, or reorg to it fails
    Invalid {
        /// The error message for the invalid payload.
        #[serde(rename = "validationError")]
        validation_error: String,
    },

    /// SYNCING is returned by the engine API in the following calls:
    ///   - newPayload:       if the payload was accepted on top of an active sync
    ///   - forkchoiceUpdate: if the new head was seen before, but not part of the chain
    Syncing,

    /// ACCEPTED is returned by the engine API in the following calls:
    ///   - newPayload: if the payload was accepted, but not processed (side chain)
    Accepted,

    /// INVALID_BLOCK_HASH is returned by `newPayload` if the block hash computed from the payload
    /// does not match the supplied one.
    InvalidBlockHash {
        /// The error message for the invalid payload.
        #[serde(rename = "validationError")]
        validation_error: String,
    },
}

impl PayloadStatusEnum {
    /// Returns the string representation of the payload status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid { .. } => "INVALID",
            Self::Syncing => "SYNCING",
            Self::Accepted => "ACCEPTED",
            Self::InvalidBlockHash { .. } => "INVALID_BLOCK_HASH",
        }
    }

    /// Returns the validation error if the payload status is invalid.
    pub fn validation_error(&self) -> Option<&str> {
        match self {
            Self::Invalid { validation_error } | Self::InvalidBlockHash { validation_error } => {
                Some(validation_error)
            }
            _ => None,
        }
    }

    /// Returns true if the payload status is syncing.
    pub const fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing)
    }

    /// Returns true if the payload status is valid.
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns true if the payload status is invalid, including an invalid block hash.
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::InvalidBlockHash { .. })
    }
}

impl std::fmt::Display for PayloadStatusEnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.validation_error() {
            Some(validation_error) => {
                f.write_str(self.as_str())?;
                f.write_str(": ")?;
                f.write_str(validation_error)
            }
            None => f.write_str(self.as_str()),
        }
    }
}
