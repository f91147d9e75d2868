use crate::{
    basefee::calculate_next_block_base_fee,
    constants::{EMPTY_OMMER_ROOT_HASH, EMPTY_ROOT_HASH},
    eip4844::{calc_blob_gasprice, calculate_excess_blob_gas},
    keccak256, Address, BaseFeeParams, BlockHash, BlockNumber, Bloom, Bytes, B256, B64, U256,
};
use alloy_rlp::{length_of_length, BufMut, Encodable, EMPTY_STRING_CODE};
use std::ops::Deref;

/// Block header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Header {
    /// The Keccak 256-bit hash of the parent
    /// block’s header, in its entirety; formally Hp.
    pub parent_hash: B256,
    /// The Keccak 256-bit hash of the ommers list portion of this block; formally Ho.
    pub ommers_hash: B256,
    /// The 160-bit address to which all fees collected from the successful mining of this block
    /// be transferred; formally Hc.
    pub beneficiary: Address,
    /// The Keccak 256-bit hash of the root node of the state trie, after all transactions are
    /// executed and finalisations applied; formally Hr.
    pub state_root: B256,
    /// The Keccak 256-bit hash of the root node of the trie structure populated with each
    /// transaction in the transactions list portion of the block; formally Ht.
    pub transactions_root: B256,
    /// The Keccak 256-bit hash of the root node of the trie structure populated with the receipts
    /// of each transaction in the transactions list portion of the block; formally He.
    pub receipts_root: B256,
    /// The Bloom filter composed from indexable information (logger address and log topics)
    /// contained in each log entry from the receipt of each transaction in the transactions list;
    /// formally Hb.
    pub logs_bloom: Bloom,
    /// A scalar value corresponding to the difficulty level of this block. Zero after the merge.
    pub difficulty: U256,
    /// A scalar value equal to the number of ancestor blocks. The genesis block has a number of
    /// zero; formally Hi.
    pub number: BlockNumber,
    /// A scalar value equal to the current limit of gas expenditure per block; formally Hl.
    pub gas_limit: u64,
    /// A scalar value equal to the total gas used in transactions in this block; formally Hg.
    pub gas_used: u64,
    /// A scalar value equal to the reasonable output of Unix’s time() at this block’s inception;
    /// formally Hs.
    pub timestamp: u64,
    /// An arbitrary byte array containing data relevant to this block. This must be 32 bytes or
    /// fewer; formally Hx.
    pub extra_data: Bytes,
    /// The `prevRandao` value provided by the beacon chain for this block.
    pub mix_hash: B256,
    /// Zero after the merge.
    pub nonce: B64,
    /// Introduced in London. Base fee per gas of this block.
    pub base_fee_per_gas: Option<u64>,
    /// Introduced in Shanghai. Root of the withdrawals trie.
    pub withdrawals_root: Option<B256>,
    /// Introduced in Cancun. Total blob gas consumed by the transactions of this block.
    pub blob_gas_used: Option<u64>,
    /// Introduced in Cancun. Running total of blob gas consumed in excess of the target, prior
    /// to this block.
    pub excess_blob_gas: Option<u64>,
    /// Introduced in Cancun. Root of the parent beacon block.
    pub parent_beacon_block_root: Option<B256>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: Default::default(),
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            beneficiary: Default::default(),
            state_root: EMPTY_ROOT_HASH,
            transactions_root: EMPTY_ROOT_HASH,
            receipts_root: EMPTY_ROOT_HASH,
            logs_bloom: Default::default(),
            difficulty: Default::default(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Default::default(),
            mix_hash: Default::default(),
            nonce: B64::ZERO,
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        }
    }
}

impl Header {
    /// Heavy function that will calculate hash of data and will *not* save the change to metadata.
    /// Use [`Header::seal_slow`] and unlock if you need the hash to be persistent.
    pub fn hash_slow(&self) -> B256 {
        let mut out = Vec::<u8>::new();
        self.encode(&mut out);
        keccak256(&out)
    }

    /// Calculate hash and seal the Header so that it can't be changed.
    pub fn seal_slow(self) -> SealedHeader {
        let hash = self.hash_slow();
        self.seal(hash)
    }

    /// Seal the header with a known hash.
    ///
    /// WARNING: This method does not perform validation whether the hash is correct.
    pub const fn seal(self, hash: BlockHash) -> SealedHeader {
        SealedHeader { header: self, hash }
    }

    /// Calculate base fee for next block according to the EIP-1559 spec.
    ///
    /// Returns a `None` if no base fee is set, no EIP-1559 support
    pub fn next_block_base_fee(&self, base_fee_params: BaseFeeParams) -> Option<u64> {
        Some(calculate_next_block_base_fee(
            self.gas_used,
            self.gas_limit,
            self.base_fee_per_gas?,
            base_fee_params,
        ))
    }

    /// Calculate excess blob gas for the next block according to the EIP-4844 spec.
    ///
    /// Returns a `None` if no excess blob gas is set, no EIP-4844 support
    pub fn next_block_excess_blob_gas(&self) -> Option<u64> {
        Some(calculate_excess_blob_gas(self.excess_blob_gas?, self.blob_gas_used?))
    }

    /// Returns the blob fee for _this_ block according to the EIP-4844 spec.
    ///
    /// Returns `None` if `excess_blob_gas` is None
    pub fn blob_fee(&self) -> Option<u128> {
        self.excess_blob_gas.map(calc_blob_gasprice)
    }

    /// Checks if the header's transactions, ommers and withdrawals are all empty.
    pub fn is_empty(&self) -> bool {
        self.transactions_root == EMPTY_ROOT_HASH &&
            self.ommers_hash == EMPTY_OMMER_ROOT_HASH &&
            self.withdrawals_root.map_or(true, |root| root == EMPTY_ROOT_HASH)
    }

    fn header_payload_length(&self) -> usize {
        let mut length = 0;
        length += self.parent_hash.length();
        length += self.ommers_hash.length();
        length += self.beneficiary.length();
        length += self.state_root.length();
        length += self.transactions_root.length();
        length += self.receipts_root.length();
        length += self.logs_bloom.length();
        length += self.difficulty.length();
        length += U256::from(self.number).length();
        length += U256::from(self.gas_limit).length();
        length += U256::from(self.gas_used).length();
        length += self.timestamp.length();
        length += self.extra_data.length();
        length += self.mix_hash.length();
        length += self.nonce.length();

        if let Some(base_fee) = self.base_fee_per_gas {
            length += U256::from(base_fee).length();
        } else if self.has_fields_after_base_fee() {
            length += 1; // EMPTY STRING CODE
        }

        if let Some(root) = self.withdrawals_root {
            length += root.length();
        } else if self.has_fields_after_withdrawals_root() {
            length += 1; // EMPTY STRING CODE
        }

        if let Some(blob_gas_used) = self.blob_gas_used {
            length += U256::from(blob_gas_used).length();
        } else if self.has_fields_after_blob_gas_used() {
            length += 1; // EMPTY STRING CODE
        }

        if let Some(excess_blob_gas) = self.excess_blob_gas {
            length += U256::from(excess_blob_gas).length();
        } else if self.parent_beacon_block_root.is_some() {
            length += 1; // EMPTY STRING CODE
        }

        if let Some(parent_beacon_block_root) = self.parent_beacon_block_root {
            length += parent_beacon_block_root.length();
        }

        length
    }

    fn has_fields_after_base_fee(&self) -> bool {
        self.withdrawals_root.is_some() || self.has_fields_after_withdrawals_root()
    }

    fn has_fields_after_withdrawals_root(&self) -> bool {
        self.blob_gas_used.is_some() || self.has_fields_after_blob_gas_used()
    }

    fn has_fields_after_blob_gas_used(&self) -> bool {
        self.excess_blob_gas.is_some() || self.parent_beacon_block_root.is_some()
    }
}

impl Encodable for Header {
    fn encode(&self, out: &mut dyn BufMut) {
        let list_header =
            alloy_rlp::Header { list: true, payload_length: self.header_payload_length() };
        list_header.encode(out);
        self.parent_hash.encode(out);
        self.ommers_hash.encode(out);
        self.beneficiary.encode(out);
        self.state_root.encode(out);
        self.transactions_root.encode(out);
        self.receipts_root.encode(out);
        self.logs_bloom.encode(out);
        self.difficulty.encode(out);
        U256::from(self.number).encode(out);
        U256::from(self.gas_limit).encode(out);
        U256::from(self.gas_used).encode(out);
        self.timestamp.encode(out);
        self.extra_data.encode(out);
        self.mix_hash.encode(out);
        self.nonce.encode(out);

        // Encode base fee. Put empty string if base fee is missing,
        // but withdrawals root is present.
        if let Some(ref base_fee) = self.base_fee_per_gas {
            U256::from(*base_fee).encode(out);
        } else if self.has_fields_after_base_fee() {
            out.put_u8(EMPTY_STRING_CODE);
        }

        // Encode withdrawals root. Put empty string if withdrawals root is missing,
        // but blob gas used is present.
        if let Some(ref root) = self.withdrawals_root {
            root.encode(out);
        } else if self.has_fields_after_withdrawals_root() {
            out.put_u8(EMPTY_STRING_CODE);
        }

        // Encode blob gas used. Put empty string if blob gas used is missing,
        // but excess blob gas is present.
        if let Some(ref blob_gas_used) = self.blob_gas_used {
            U256::from(*blob_gas_used).encode(out);
        } else if self.has_fields_after_blob_gas_used() {
            out.put_u8(EMPTY_STRING_CODE);
        }

        // Encode excess blob gas. Put empty string if excess blob gas is missing,
        // but parent beacon block root is present.
        if let Some(ref excess_blob_gas) = self.excess_blob_gas {
            U256::from(*excess_blob_gas).encode(out);
        } else if self.parent_beacon_block_root.is_some() {
            out.put_u8(EMPTY_STRING_CODE);
        }

        if let Some(ref parent_beacon_block_root) = self.parent_beacon_block_root {
            parent_beacon_block_root.encode(out);
        }
    }

    fn length(&self) -> usize {
        let mut length = 0;
        length += self.header_payload_length();
        length += length_of_length(length);
        length
    }
}

/// A [`Header`] that is sealed at a precalculated hash, use [`SealedHeader::unseal()`] if you
/// want to modify header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SealedHeader {
    /// Locked Header fields.
    header: Header,
    /// Locked Header hash.
    hash: BlockHash,
}

impl SealedHeader {
    /// Returns the sealed Header fields.
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns header/block hash.
    pub const fn hash(&self) -> BlockHash {
        self.hash
    }

    /// Extract raw header that can be modified.
    pub fn unseal(self) -> Header {
        self.header
    }

    /// This is the inverse of [`Header::seal_slow`] which returns the raw header and hash.
    pub fn split(self) -> (Header, BlockHash) {
        (self.header, self.hash)
    }
}

impl Deref for SealedHeader {
    type Target = Header;

    fn deref(&self) -> &Self::Target {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{b256, hex};

    fn shanghai_block_header() -> Header {
        Header {
            parent_hash: b256!("e4e0c1bb8d2a4a0b3bd7dd0e9d8bbaa16cfd7b9d0db4f2b8e7f26cb0bf4fd5ae"),
            ommers_hash: EMPTY_OMMER_ROOT_HASH,
            beneficiary: Address::ZERO,
            state_root: EMPTY_ROOT_HASH,
            transactions_root: EMPTY_ROOT_HASH,
            receipts_root: EMPTY_ROOT_HASH,
            logs_bloom: Default::default(),
            difficulty: U256::ZERO,
            number: 1,
            gas_limit: 30_000_000,
            gas_used: 0,
            timestamp: 12,
            extra_data: Bytes::from_static(b"ember"),
            mix_hash: B256::ZERO,
            nonce: B64::ZERO,
            base_fee_per_gas: Some(875_000_000),
            withdrawals_root: Some(EMPTY_ROOT_HASH),
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
        }
    }

    #[test]
    fn encoded_length_matches_payload() {
        let header = shanghai_block_header();
        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), header.length());

        let decoded = alloy_rlp::Header::decode(&mut buf.as_slice()).unwrap();
        assert!(decoded.list);
        assert_eq!(decoded.payload_length, header.header_payload_length());
    }

    #[test]
    fn hash_changes_with_optional_fields() {
        let shanghai = shanghai_block_header();
        let mut cancun = shanghai.clone();
        cancun.blob_gas_used = Some(0);
        cancun.excess_blob_gas = Some(0);
        cancun.parent_beacon_block_root = Some(B256::ZERO);

        assert_ne!(shanghai.hash_slow(), cancun.hash_slow());
        assert!(cancun.length() > shanghai.length());
    }

    #[test]
    fn missing_fields_encode_as_empty_strings() {
        let mut header = shanghai_block_header();
        header.withdrawals_root = None;
        header.parent_beacon_block_root = Some(B256::ZERO);

        let mut buf = Vec::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), header.length());
        // withdrawals root, blob gas used and excess blob gas are all placeholders
        let tail = hex::encode(&buf[buf.len() - 36..]);
        assert!(tail.starts_with("808080a0"), "{tail}");
    }

    #[test]
    fn sealed_header_keeps_hash() {
        let header = shanghai_block_header();
        let hash = header.hash_slow();
        let sealed = header.clone().seal_slow();
        assert_eq!(sealed.hash(), hash);
        assert_eq!(sealed.number, 1);
        assert_eq!(sealed.unseal(), header);
    }

    #[test]
    fn next_block_fees() {
        let mut header = shanghai_block_header();
        assert_eq!(header.next_block_base_fee(BaseFeeParams::ethereum()), Some(765_625_000));
        assert_eq!(header.next_block_excess_blob_gas(), None);

        header.blob_gas_used = Some(786_432);
        header.excess_blob_gas = Some(0);
        assert_eq!(header.next_block_excess_blob_gas(), Some(393_216));
        assert_eq!(header.blob_fee(), Some(1));
    }
}
