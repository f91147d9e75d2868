use crate::{metrics::EngineApiMetrics, EngineApiError, EngineApiResult};
use ember_chainspec::ChainSpec;
use ember_interfaces::{blockchain_tree::BlockTree, executor::BlockExecutor};
use ember_payload_builder::{BuiltPayload, PayloadBuilderAttributes, PayloadBuilderHandle};
use ember_payload_primitives::{
    is_method_allowed, validate_version_specific_fields, EngineApiMessageVersion,
    EngineObjectValidationError,
};
use ember_payload_validator::PayloadValidator;
use ember_primitives::{BlockHash, BlockNumber, B256};
use ember_rpc_types::engine::{
    CancunPayloadFields, ExecutionPayload, ExecutionPayloadBodiesV1, ExecutionPayloadEnvelopeV2,
    ExecutionPayloadEnvelopeV3, ExecutionPayloadInputV2, ExecutionPayloadV1, ExecutionPayloadV3,
    ForkchoiceState, ForkchoiceUpdated, MaybeCancunPayloadFields, PayloadAttributes, PayloadId,
    PayloadStatus, PayloadStatusEnum,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{sync::Arc, time::Instant};
use tracing::{debug, trace};

/// The upper limit for payload bodies request.
pub const MAX_PAYLOAD_BODIES_LIMIT: u64 = 1024;

/// The list of all supported Engine capabilities available over the engine endpoint.
pub const CAPABILITIES: &[&str] = &[
    "engine_forkchoiceUpdatedV1",
    "engine_forkchoiceUpdatedV2",
    "engine_forkchoiceUpdatedV3",
    "engine_getPayloadV1",
    "engine_getPayloadV2",
    "engine_getPayloadV3",
    "engine_newPayloadV1",
    "engine_newPayloadV2",
    "engine_newPayloadV3",
    "engine_getPayloadBodiesByHashV1",
    "engine_getPayloadBodiesByRangeV1",
];

/// The methods served by [`EngineApi::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMethod {
    /// `engine_newPayloadV*`
    NewPayload,
    /// `engine_forkchoiceUpdatedV*`
    ForkchoiceUpdated,
    /// `engine_getPayloadV*`
    GetPayload,
    /// `engine_getPayloadBodiesByHashV1`
    GetPayloadBodiesByHash,
    /// `engine_getPayloadBodiesByRangeV1`
    GetPayloadBodiesByRange,
    /// `engine_exchangeCapabilities`
    ExchangeCapabilities,
}

impl EngineMethod {
    /// Parses a method name into the method and its version.
    ///
    /// Methods outside the fork-versioned families report [`EngineApiMessageVersion::V1`].
    pub fn parse(method: &str) -> Option<(Self, EngineApiMessageVersion)> {
        let name = method.strip_prefix("engine_")?;
        if name == "exchangeCapabilities" {
            return Some((Self::ExchangeCapabilities, EngineApiMessageVersion::V1))
        }

        let (base, number) = name.rsplit_once('V')?;
        let version = EngineApiMessageVersion::from_number(number.parse().ok()?)?;
        let method = match base {
            "newPayload" => Self::NewPayload,
            "forkchoiceUpdated" => Self::ForkchoiceUpdated,
            "getPayload" => Self::GetPayload,
            "getPayloadBodiesByHash" if version == EngineApiMessageVersion::V1 => {
                Self::GetPayloadBodiesByHash
            }
            "getPayloadBodiesByRange" if version == EngineApiMessageVersion::V1 => {
                Self::GetPayloadBodiesByRange
            }
            _ => return None,
        };
        Some((method, version))
    }
}

/// The Engine API implementation that grants the Consensus layer access to data and
/// functions in the Execution layer that are crucial for the consensus process.
pub struct EngineApi<Tree, Exec> {
    inner: Arc<EngineApiInner<Tree, Exec>>,
}

struct EngineApiInner<Tree, Exec> {
    /// Consensus configuration
    chain_spec: Arc<ChainSpec>,
    /// The block tree forkchoice updates and body requests are served from.
    tree: Tree,
    /// Validates payloads received through `engine_newPayload`.
    validator: PayloadValidator<Tree, Exec>,
    /// The type that can communicate with the payload service to build and retrieve payloads.
    payload_builder: PayloadBuilderHandle,
    metrics: EngineApiMetrics,
}

impl<Tree, Exec> EngineApi<Tree, Exec>
where
    Tree: BlockTree + Clone + 'static,
    Exec: BlockExecutor + 'static,
{
    /// Create new instance of [`EngineApi`].
    pub fn new(
        chain_spec: Arc<ChainSpec>,
        tree: Tree,
        executor: Exec,
        payload_builder: PayloadBuilderHandle,
    ) -> Self {
        let validator = PayloadValidator::new(chain_spec.clone(), tree.clone(), executor);
        let inner = EngineApiInner {
            chain_spec,
            tree,
            validator,
            payload_builder,
            metrics: EngineApiMetrics::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/paris.md#engine_newpayloadv1>
    /// Caution: This should not accept the `withdrawals` field
    pub async fn new_payload_v1(&self, payload: ExecutionPayloadV1) -> EngineApiResult<PayloadStatus> {
        let start = Instant::now();
        let res = self
            .validate_payload(
                EngineApiMessageVersion::V1,
                payload.into(),
                MaybeCancunPayloadFields::none(),
            )
            .await;
        self.inner.metrics.latency.new_payload_v1.record(start.elapsed());
        res
    }

    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/shanghai.md#engine_newpayloadv2>
    pub async fn new_payload_v2(
        &self,
        payload: ExecutionPayloadInputV2,
    ) -> EngineApiResult<PayloadStatus> {
        let start = Instant::now();
        let res = self
            .validate_payload(
                EngineApiMessageVersion::V2,
                payload.into(),
                MaybeCancunPayloadFields::none(),
            )
            .await;
        self.inner.metrics.latency.new_payload_v2.record(start.elapsed());
        res
    }

    /// See also <https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#engine_newpayloadv3>
    pub async fn new_payload_v3(
        &self,
        payload: ExecutionPayloadV3,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: B256,
    ) -> EngineApiResult<PayloadStatus> {
        let start = Instant::now();
        let cancun_fields = CancunPayloadFields { parent_beacon_block_root, versioned_hashes };
        let res = self
            .validate_payload(EngineApiMessageVersion::V3, payload.into(), cancun_fields.into())
            .await;
        self.inner.metrics.latency.new_payload_v3.record(start.elapsed());
        res
    }

    /// Validates the payload on the blocking pool.
    async fn validate_payload(
        &self,
        version: EngineApiMessageVersion,
        payload: ExecutionPayload,
        cancun_fields: MaybeCancunPayloadFields,
    ) -> EngineApiResult<PayloadStatus> {
        let inner = self.inner.clone();
        let status = tokio::task::spawn_blocking(move || {
            inner.validator.new_payload(version, payload, cancun_fields)
        })
        .await
        .map_err(|err| EngineApiError::Internal(err.to_string()))??;
        Ok(status)
    }

    /// Updates the fork choice _without_ withdrawals.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/paris.md#engine_forkchoiceUpdatedV1>
    ///
    /// Caution: This should not accept the `withdrawals` field
    pub async fn fork_choice_updated_v1(
        &self,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> EngineApiResult<ForkchoiceUpdated> {
        let start = Instant::now();
        let res =
            self.validate_and_update(EngineApiMessageVersion::V1, state, payload_attrs).await;
        self.inner.metrics.latency.fork_choice_updated_v1.record(start.elapsed());
        res
    }

    /// Updates the fork choice _with_ withdrawals, but only _after_ shanghai.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/shanghai.md#engine_forkchoiceupdatedv2>
    pub async fn fork_choice_updated_v2(
        &self,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> EngineApiResult<ForkchoiceUpdated> {
        let start = Instant::now();
        let res =
            self.validate_and_update(EngineApiMessageVersion::V2, state, payload_attrs).await;
        self.inner.metrics.latency.fork_choice_updated_v2.record(start.elapsed());
        res
    }

    /// Updates the fork choice _with_ withdrawals and the parent beacon block root, but only
    /// _after_ cancun.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/main/src/engine/cancun.md#engine_forkchoiceupdatedv3>
    pub async fn fork_choice_updated_v3(
        &self,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> EngineApiResult<ForkchoiceUpdated> {
        let start = Instant::now();
        let res =
            self.validate_and_update(EngineApiMessageVersion::V3, state, payload_attrs).await;
        self.inner.metrics.latency.fork_choice_updated_v3.record(start.elapsed());
        res
    }

    async fn validate_and_update(
        &self,
        version: EngineApiMessageVersion,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> EngineApiResult<ForkchoiceUpdated> {
        if let Some(ref attrs) = payload_attrs {
            validate_version_specific_fields(&self.inner.chain_spec, version, attrs.into())?;
        }
        self.fork_choice_updated(state, payload_attrs).await
    }

    /// Applies the forkchoice state and starts a build if attributes are given.
    ///
    /// Suspends until the first version of the payload is built.
    async fn fork_choice_updated(
        &self,
        state: ForkchoiceState,
        payload_attrs: Option<PayloadAttributes>,
    ) -> EngineApiResult<ForkchoiceUpdated> {
        let tree = &self.inner.tree;
        if state.head_block_hash.is_zero() {
            return Err(EngineApiError::ForkchoiceEmptyHead)
        }

        let Some(head) = tree.header_by_hash(state.head_block_hash)? else {
            debug!(target: "rpc::engine", head = %state.head_block_hash, "forkchoice head unknown, syncing");
            return Ok(ForkchoiceUpdated::from_status(PayloadStatusEnum::Syncing))
        };

        for hash in [state.safe_block_hash, state.finalized_block_hash] {
            if !hash.is_zero() && tree.header_by_hash(hash)?.is_none() {
                return Err(EngineApiError::InvalidForkchoiceState)
            }
        }

        let head_hash = head.hash();
        tree.make_canonical(head_hash)?;
        self.inner.payload_builder.new_head(head_hash);

        let status = PayloadStatus::new(PayloadStatusEnum::Valid, Some(head_hash));
        let Some(attrs) = payload_attrs else { return Ok(ForkchoiceUpdated::new(status)) };

        if attrs.timestamp <= head.timestamp {
            debug!(target: "rpc::engine", timestamp = attrs.timestamp, head_timestamp = head.timestamp, "payload attributes do not follow the head");
            return Err(EngineApiError::InvalidPayloadAttributes)
        }

        let attributes = PayloadBuilderAttributes::new(head_hash, attrs);
        let id = self.inner.payload_builder.new_payload(attributes).await?;
        trace!(target: "rpc::engine", %id, parent = %head_hash, "started payload build");
        Ok(ForkchoiceUpdated::new(status).with_payload_id(id))
    }

    /// Returns the most recent version of the payload that is available in the corresponding
    /// payload build process at the time of receiving this call.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/paris.md#engine_getPayloadV1>
    ///
    /// Caution: This should not return the `withdrawals` field
    ///
    /// Note:
    /// > Provider software MAY stop the corresponding build process after serving this call.
    pub fn get_payload_v1(&self, payload_id: PayloadId) -> EngineApiResult<ExecutionPayloadV1> {
        let start = Instant::now();
        let res = self
            .get_payload(EngineApiMessageVersion::V1, payload_id)
            .map(|payload| (*payload).clone().into_v1_payload());
        self.inner.metrics.latency.get_payload_v1.record(start.elapsed());
        res
    }

    /// Returns the most recent version of the payload that is available in the corresponding
    /// payload build process at the time of receiving this call.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/3d627c95a4d3510a8187dd02e0250ecb4331d27e/src/engine/shanghai.md#engine_getpayloadv2>
    ///
    /// Note:
    /// > Provider software MAY stop the corresponding build process after serving this call.
    pub fn get_payload_v2(
        &self,
        payload_id: PayloadId,
    ) -> EngineApiResult<ExecutionPayloadEnvelopeV2> {
        let start = Instant::now();
        let res = self
            .get_payload(EngineApiMessageVersion::V2, payload_id)
            .map(|payload| (*payload).clone().into_v2_payload());
        self.inner.metrics.latency.get_payload_v2.record(start.elapsed());
        res
    }

    /// Returns the most recent version of the payload that is available in the corresponding
    /// payload build process at the time of receiving this call, with its blobs bundle.
    ///
    /// See also <https://github.com/ethereum/execution-apis/blob/fe8e13c288c592ec154ce25c534e26cb7ce0530d/src/engine/cancun.md#engine_getpayloadv3>
    ///
    /// Note:
    /// > Provider software MAY stop the corresponding build process after serving this call.
    pub fn get_payload_v3(
        &self,
        payload_id: PayloadId,
    ) -> EngineApiResult<ExecutionPayloadEnvelopeV3> {
        let start = Instant::now();
        let res = self
            .get_payload(EngineApiMessageVersion::V3, payload_id)
            .map(|payload| (*payload).clone().into_v3_payload());
        self.inner.metrics.latency.get_payload_v3.record(start.elapsed());
        res
    }

    /// Resolves the payload if the method version serves the fork of the payload's timestamp.
    ///
    /// A payload that was already resolved is returned again until it expires.
    fn get_payload(
        &self,
        version: EngineApiMessageVersion,
        payload_id: PayloadId,
    ) -> EngineApiResult<Arc<BuiltPayload>> {
        let payload_builder = &self.inner.payload_builder;
        let attributes =
            payload_builder.payload_attributes(payload_id).ok_or(EngineApiError::UnknownPayload)?;

        let fork = self.inner.chain_spec.fork_at_timestamp(attributes.timestamp);
        if !is_method_allowed(version, fork) {
            return Err(EngineObjectValidationError::UnsupportedFork.into())
        }

        payload_builder.resolve(payload_id).ok_or(EngineApiError::UnknownPayload)
    }

    /// Returns the execution payload bodies by the range starting at `start`, containing `count`
    /// blocks.
    ///
    /// WARNING: This method is associated with the BeaconBlocksByRange message in the consensus
    /// layer p2p specification, meaning the input should be treated as untrusted or potentially
    /// adversarial.
    ///
    /// Implementors should take care when acting on the input to this method, specifically
    /// ensuring that the range is limited properly, and that the range boundaries are computed
    /// correctly and without panics.
    pub fn get_payload_bodies_by_range(
        &self,
        start: BlockNumber,
        count: u64,
    ) -> EngineApiResult<ExecutionPayloadBodiesV1> {
        let started_at = Instant::now();
        let res = self.payload_bodies_by_range(start, count);
        self.inner.metrics.latency.get_payload_bodies_by_range_v1.record(started_at.elapsed());
        res
    }

    fn payload_bodies_by_range(
        &self,
        start: BlockNumber,
        count: u64,
    ) -> EngineApiResult<ExecutionPayloadBodiesV1> {
        if count > MAX_PAYLOAD_BODIES_LIMIT {
            return Err(EngineApiError::PayloadRequestTooLarge { len: count })
        }

        if start == 0 || count == 0 {
            return Err(EngineApiError::InvalidBodiesRange { start, count })
        }

        // no trailing nulls past the canonical head
        let head = self.inner.tree.canonical_head()?.number;
        let end = start.saturating_add(count - 1).min(head);

        let mut result = Vec::with_capacity((end.saturating_sub(start) + 1) as usize);
        for num in start..=end {
            let block = self.inner.tree.block_by_number(num)?;
            result.push(block.map(Into::into));
        }

        Ok(result)
    }

    /// Called to retrieve execution payload bodies by hashes.
    pub fn get_payload_bodies_by_hash(
        &self,
        hashes: Vec<BlockHash>,
    ) -> EngineApiResult<ExecutionPayloadBodiesV1> {
        let start = Instant::now();
        let res = self.payload_bodies_by_hash(hashes);
        self.inner.metrics.latency.get_payload_bodies_by_hash_v1.record(start.elapsed());
        res
    }

    fn payload_bodies_by_hash(
        &self,
        hashes: Vec<BlockHash>,
    ) -> EngineApiResult<ExecutionPayloadBodiesV1> {
        let len = hashes.len() as u64;
        if len > MAX_PAYLOAD_BODIES_LIMIT {
            return Err(EngineApiError::PayloadRequestTooLarge { len })
        }

        let mut result = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let block = self.inner.tree.block_by_hash(hash)?;
            result.push(block.map(Into::into));
        }

        Ok(result)
    }

    /// Handler for `engine_exchangeCapabilitiesV1`
    /// See also <https://github.com/ethereum/execution-apis/blob/6452a6b194d7db269bf1dbd087a267251d3cc7f8/src/engine/common.md#capabilities>
    pub fn exchange_capabilities(&self, _capabilities: Vec<String>) -> Vec<String> {
        CAPABILITIES.iter().copied().map(str::to_owned).collect()
    }

    /// Serves a JSON-RPC call with positional `params`.
    pub async fn call(&self, method: &str, params: Value) -> EngineApiResult<Value> {
        let res = self.dispatch(method, params).await;
        if let Err(err) = &res {
            let calls = &self.inner.metrics.calls;
            match err {
                EngineApiError::MethodNotFound(_) => calls.unknown_methods.increment(1),
                EngineApiError::InvalidParams(_) => calls.invalid_params.increment(1),
                EngineApiError::UnknownPayload => calls.unknown_payloads.increment(1),
                EngineApiError::EngineObjectValidationError(
                    EngineObjectValidationError::UnsupportedFork,
                ) => calls.unsupported_fork.increment(1),
                _ => {}
            }
            debug!(target: "rpc::engine", method, %err, "engine call failed");
        }
        res
    }

    async fn dispatch(&self, name: &str, params: Value) -> EngineApiResult<Value> {
        use EngineApiMessageVersion::{V1, V2, V3};

        let Some((method, version)) = EngineMethod::parse(name) else {
            return Err(EngineApiError::MethodNotFound(name.to_string()))
        };
        trace!(target: "rpc::engine", method = name, "Serving engine call");

        let mut params = Params::new(params)?;
        let value = match (method, version) {
            (EngineMethod::NewPayload, V1) => {
                let payload: Value = params.required("executionPayload")?;
                params.finish()?;
                if payload.get("withdrawals").is_some() {
                    return Err(EngineApiError::InvalidParams(
                        "withdrawals not supported in V1".to_string(),
                    ))
                }
                let payload = serde_json::from_value(payload).map_err(|err| {
                    EngineApiError::InvalidParams(format!("invalid executionPayload: {err}"))
                })?;
                serde_json::to_value(self.new_payload_v1(payload).await?)?
            }
            (EngineMethod::NewPayload, V2) => {
                let payload = params.required("executionPayload")?;
                params.finish()?;
                serde_json::to_value(self.new_payload_v2(payload).await?)?
            }
            (EngineMethod::NewPayload, V3) => {
                let payload = params.required("executionPayload")?;
                let versioned_hashes = params.required("expectedBlobVersionedHashes")?;
                let parent_beacon_block_root = params.required("parentBeaconBlockRoot")?;
                params.finish()?;
                let status =
                    self.new_payload_v3(payload, versioned_hashes, parent_beacon_block_root).await?;
                serde_json::to_value(status)?
            }
            (EngineMethod::ForkchoiceUpdated, version) => {
                let state = params.required("forkchoiceState")?;
                let attrs = params.optional("payloadAttributes")?;
                params.finish()?;
                let updated = match version {
                    V1 => self.fork_choice_updated_v1(state, attrs).await?,
                    V2 => self.fork_choice_updated_v2(state, attrs).await?,
                    V3 => self.fork_choice_updated_v3(state, attrs).await?,
                };
                serde_json::to_value(updated)?
            }
            (EngineMethod::GetPayload, version) => {
                let id = params.required("payloadId")?;
                params.finish()?;
                match version {
                    V1 => serde_json::to_value(self.get_payload_v1(id)?)?,
                    V2 => serde_json::to_value(self.get_payload_v2(id)?)?,
                    V3 => serde_json::to_value(self.get_payload_v3(id)?)?,
                }
            }
            (EngineMethod::GetPayloadBodiesByHash, _) => {
                let hashes = params.required("blockHashes")?;
                params.finish()?;
                serde_json::to_value(self.get_payload_bodies_by_hash(hashes)?)?
            }
            (EngineMethod::GetPayloadBodiesByRange, _) => {
                let start: Quantity = params.required("start")?;
                let count: Quantity = params.required("count")?;
                params.finish()?;
                serde_json::to_value(self.get_payload_bodies_by_range(start.0, count.0)?)?
            }
            (EngineMethod::ExchangeCapabilities, _) => {
                let capabilities = params.required("capabilities")?;
                params.finish()?;
                serde_json::to_value(self.exchange_capabilities(capabilities))?
            }
        };
        Ok(value)
    }
}

impl<Tree, Exec> Clone for EngineApi<Tree, Exec> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<Tree, Exec> std::fmt::Debug for EngineApi<Tree, Exec> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineApi").finish_non_exhaustive()
    }
}

/// Positional JSON-RPC params, decoded in order.
struct Params(std::vec::IntoIter<Value>);

impl Params {
    fn new(params: Value) -> EngineApiResult<Self> {
        match params {
            Value::Array(params) => Ok(Self(params.into_iter())),
            Value::Null => Ok(Self(Vec::new().into_iter())),
            other => {
                Err(EngineApiError::InvalidParams(format!("expected positional params, got {other}")))
            }
        }
    }

    fn required<T: DeserializeOwned>(&mut self, name: &str) -> EngineApiResult<T> {
        let value = self
            .0
            .next()
            .ok_or_else(|| EngineApiError::InvalidParams(format!("missing {name}")))?;
        serde_json::from_value(value)
            .map_err(|err| EngineApiError::InvalidParams(format!("invalid {name}: {err}")))
    }

    fn optional<T: DeserializeOwned>(&mut self, name: &str) -> EngineApiResult<Option<T>> {
        match self.0.next() {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|err| EngineApiError::InvalidParams(format!("invalid {name}: {err}"))),
        }
    }

    fn finish(self) -> EngineApiResult<()> {
        let extra = self.0.len();
        if extra > 0 {
            return Err(EngineApiError::InvalidParams(format!("{extra} unexpected params")))
        }
        Ok(())
    }
}

/// A hex encoded quantity param.
#[derive(serde::Deserialize)]
struct Quantity(#[serde(with = "alloy_serde::quantity")] u64);
