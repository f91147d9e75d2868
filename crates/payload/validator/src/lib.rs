//! Validation of execution payloads received through `engine_newPayload`.
//!
//! Defects of the payload itself are reported as a [`PayloadStatus`], never as an error. Errors
//! are reserved for calls the engine rejects as a whole (unsupported fork, missing fields) and for
//! failures of the block tree.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use crate::metrics::PayloadValidatorMetrics;
use ember_chainspec::ChainSpec;
use ember_interfaces::{
    blockchain_tree::{BlockStatus, BlockTree},
    executor::BlockExecutor,
    provider::ProviderError,
};
use ember_payload_primitives::{
    validate_version_specific_fields, EngineApiMessageVersion, EngineObjectValidationError,
    PayloadOrAttributes,
};
use ember_primitives::{
    constants::eip4844::{DATA_GAS_PER_BLOB, MAX_BLOBS_PER_BLOCK},
    Block, SealedHeader, B256,
};
use ember_rpc_types::engine::{
    ExecutionPayload, MaybeCancunPayloadFields, PayloadError, PayloadStatus, PayloadStatusEnum,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, trace, warn};

mod metrics;
pub mod versioned_hashes;

pub use versioned_hashes::{
    matches_versioned_hashes, transaction_versioned_hashes, verify_versioned_hashes,
    VersionedHashesError,
};

/// Errors that reject a `engine_newPayload` call as a whole.
#[derive(Debug, thiserror::Error)]
pub enum NewPayloadError {
    /// The payload does not belong to the called method version.
    #[error(transparent)]
    Validation(#[from] EngineObjectValidationError),
    /// The block tree failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Validates execution payloads and registers valid ones with the block tree.
#[derive(Debug)]
pub struct PayloadValidator<Tree, Exec> {
    /// The chain spec used to validate the payload.
    chain_spec: Arc<ChainSpec>,
    /// The block tree payloads extend.
    tree: Tree,
    /// Executes payloads on top of their parent.
    executor: Exec,
    metrics: PayloadValidatorMetrics,
}

impl<Tree, Exec> PayloadValidator<Tree, Exec>
where
    Tree: BlockTree,
    Exec: BlockExecutor,
{
    /// Create a new validator.
    pub fn new(chain_spec: Arc<ChainSpec>, tree: Tree, executor: Exec) -> Self {
        Self { chain_spec, tree, executor, metrics: Default::default() }
    }

    /// Returns the chain spec used by the validator.
    #[inline]
    pub fn chain_spec(&self) -> &ChainSpec {
        &self.chain_spec
    }

    /// Validates a payload received with the given method version and registers it with the
    /// block tree.
    ///
    /// The checks run in order and the first failing one decides the outcome:
    ///  1. the payload belongs to the fork `version` serves and carries its fields
    ///  2. the payload is well formed and every transaction is in canonical form
    ///  3. the blob gas used matches the blob count, which is within the block limit
    ///  4. the supplied blob versioned hashes match the transactions exactly
    ///  5. the block hash matches the header
    ///  6. the parent is known and the header follows it
    ///  7. executing the block yields the post-state of the header
    pub fn new_payload(
        &self,
        version: EngineApiMessageVersion,
        payload: ExecutionPayload,
        cancun_fields: MaybeCancunPayloadFields,
    ) -> Result<PayloadStatus, NewPayloadError> {
        validate_version_specific_fields(
            &self.chain_spec,
            version,
            PayloadOrAttributes::from_execution_payload(
                &payload,
                cancun_fields.parent_beacon_block_root(),
            ),
        )?;

        let status = self.validate_and_insert(payload, cancun_fields)?;
        self.record(&status);
        Ok(status)
    }

    fn validate_and_insert(
        &self,
        payload: ExecutionPayload,
        cancun_fields: MaybeCancunPayloadFields,
    ) -> Result<PayloadStatus, NewPayloadError> {
        let expected_hash = payload.block_hash();
        let payload_blob_gas_used = payload.blob_gas_used();
        let is_cancun = self.chain_spec.is_cancun_active_at_timestamp(payload.timestamp());

        let block = match payload.try_into_block(cancun_fields.parent_beacon_block_root()) {
            Ok(block) => block,
            Err(err) => {
                debug!(target: "engine::validator", %expected_hash, %err, "malformed payload");
                return Ok(invalid(err.to_string(), None))
            }
        };

        let per_tx_hashes = match transaction_versioned_hashes(&block.body) {
            Ok(hashes) => hashes,
            Err(err) => {
                debug!(target: "engine::validator", %expected_hash, %err, "payload carries a non-canonical transaction");
                return Ok(invalid(err.to_string(), None))
            }
        };

        let blob_count = per_tx_hashes.iter().map(Vec::len).sum::<usize>() as u64;
        if !is_cancun && blob_count > 0 {
            return Ok(invalid("blob transactions before cancun", None))
        }
        if blob_count > MAX_BLOBS_PER_BLOCK {
            return Ok(invalid(
                format!("too many blobs: {blob_count} exceeds the limit of {MAX_BLOBS_PER_BLOCK}"),
                None,
            ))
        }
        if let Some(blob_gas_used) = payload_blob_gas_used {
            if blob_gas_used != blob_count * DATA_GAS_PER_BLOB {
                return Ok(invalid(
                    format!(
                        "blob gas used {blob_gas_used} does not match the {blob_count} blobs of the payload"
                    ),
                    None,
                ))
            }
        }

        if let Some(supplied) = cancun_fields.versioned_hashes() {
            if let Err(err) = verify_versioned_hashes(supplied, &per_tx_hashes) {
                self.metrics.versioned_hash_mismatches.increment(1);
                debug!(target: "engine::validator", %expected_hash, %err, "blob versioned hashes mismatch");
                return Ok(invalid(err.to_string(), None))
            }
        }

        let block_hash = block.header.hash_slow();
        if block_hash != expected_hash {
            let err = PayloadError::BlockHash { execution: block_hash, consensus: expected_hash };
            debug!(target: "engine::validator", %err, "block hash mismatch");
            return Ok(PayloadStatus::from_status(err.into()))
        }

        if self.tree.header_by_hash(block_hash)?.is_some() {
            trace!(target: "engine::validator", %block_hash, "payload already known");
            return Ok(PayloadStatus::new(PayloadStatusEnum::Valid, Some(block_hash)))
        }

        let Some(parent) = self.tree.header_by_hash(block.parent_hash)? else {
            debug!(target: "engine::validator", %block_hash, parent = %block.parent_hash, "parent unknown, syncing");
            return Ok(PayloadStatus::from_status(PayloadStatusEnum::Syncing))
        };

        if let Err(err) = self.validate_against_parent(&block, &parent) {
            debug!(target: "engine::validator", %block_hash, %err, "payload does not follow its parent");
            return Ok(invalid(err.to_string(), Some(parent.hash())))
        }

        let started_at = Instant::now();
        let outcome = match self.executor.execute(&parent, &block) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(target: "engine::validator", %block_hash, %err, "payload execution failed");
                return Ok(invalid(err.to_string(), Some(parent.hash())))
            }
        };
        self.metrics.execution_duration.record(started_at.elapsed().as_secs_f64());

        let mismatch = if outcome.gas_used != block.gas_used {
            Some(HeaderMismatch::GasUsed { header: block.gas_used, executed: outcome.gas_used })
        } else if outcome.state_root != block.state_root {
            Some(HeaderMismatch::StateRoot { header: block.state_root, executed: outcome.state_root })
        } else if outcome.receipts_root != block.receipts_root {
            Some(HeaderMismatch::ReceiptsRoot {
                header: block.receipts_root,
                executed: outcome.receipts_root,
            })
        } else if outcome.logs_bloom != block.logs_bloom {
            Some(HeaderMismatch::LogsBloom)
        } else {
            None
        };
        if let Some(err) = mismatch {
            debug!(target: "engine::validator", %block_hash, %err, "post-state mismatch");
            return Ok(invalid(err.to_string(), Some(parent.hash())))
        }

        let status = match self.tree.insert_block(block.seal(block_hash))? {
            BlockStatus::Valid => PayloadStatus::new(PayloadStatusEnum::Valid, Some(block_hash)),
            BlockStatus::Accepted => PayloadStatus::from_status(PayloadStatusEnum::Accepted),
        };
        debug!(target: "engine::validator", %block_hash, status = %status.status, "inserted payload");
        Ok(status)
    }

    /// Checks the header fields that follow from the parent.
    fn validate_against_parent(
        &self,
        block: &Block,
        parent: &SealedHeader,
    ) -> Result<(), HeaderMismatch> {
        if block.number != parent.number + 1 {
            return Err(HeaderMismatch::Number { parent: parent.number, block: block.number })
        }
        if block.timestamp <= parent.timestamp {
            return Err(HeaderMismatch::Timestamp {
                parent: parent.timestamp,
                block: block.timestamp,
            })
        }
        if block.gas_used > block.gas_limit {
            return Err(HeaderMismatch::GasUsedExceedsLimit {
                gas_used: block.gas_used,
                gas_limit: block.gas_limit,
            })
        }

        let expected_base_fee = self.chain_spec.next_block_base_fee(parent);
        if block.base_fee_per_gas != expected_base_fee {
            return Err(HeaderMismatch::BaseFee {
                expected: expected_base_fee,
                got: block.base_fee_per_gas,
            })
        }

        if self.chain_spec.is_cancun_active_at_timestamp(block.timestamp) {
            // the first cancun block starts from zero excess blob gas
            let expected = parent.next_block_excess_blob_gas().unwrap_or_default();
            if block.excess_blob_gas != Some(expected) {
                return Err(HeaderMismatch::ExcessBlobGas {
                    expected,
                    got: block.excess_blob_gas,
                })
            }
        }

        Ok(())
    }

    fn record(&self, status: &PayloadStatus) {
        match status.status {
            PayloadStatusEnum::Valid => self.metrics.valid_payloads.increment(1),
            PayloadStatusEnum::Accepted => self.metrics.accepted_payloads.increment(1),
            PayloadStatusEnum::Syncing => self.metrics.syncing_payloads.increment(1),
            PayloadStatusEnum::Invalid { .. } => self.metrics.invalid_payloads.increment(1),
            PayloadStatusEnum::InvalidBlockHash { .. } => {
                self.metrics.invalid_block_hash_payloads.increment(1)
            }
        }
    }
}

/// An `INVALID` status with the given reason.
fn invalid(validation_error: impl Into<String>, latest_valid_hash: Option<B256>) -> PayloadStatus {
    PayloadStatus::new(
        PayloadStatusEnum::Invalid { validation_error: validation_error.into() },
        latest_valid_hash,
    )
}

/// Header fields that contradict the parent or the execution result.
#[derive(Debug, thiserror::Error)]
enum HeaderMismatch {
    #[error("block number {block} does not follow parent number {parent}")]
    Number { parent: u64, block: u64 },
    #[error("timestamp {block} is not after parent timestamp {parent}")]
    Timestamp { parent: u64, block: u64 },
    #[error("gas used {gas_used} exceeds gas limit {gas_limit}")]
    GasUsedExceedsLimit { gas_used: u64, gas_limit: u64 },
    #[error("base fee {got:?} does not match expected {expected:?}")]
    BaseFee { expected: Option<u64>, got: Option<u64> },
    #[error("excess blob gas {got:?} does not match expected {expected}")]
    ExcessBlobGas { expected: u64, got: Option<u64> },
    #[error("gas used {header} does not match executed {executed}")]
    GasUsed { header: u64, executed: u64 },
    #[error("state root {header} does not match executed {executed}")]
    StateRoot { header: B256, executed: B256 },
    #[error("receipts root {header} does not match executed {executed}")]
    ReceiptsRoot { header: B256, executed: B256 },
    #[error("logs bloom does not match executed")]
    LogsBloom,
}
