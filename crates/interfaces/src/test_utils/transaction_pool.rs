use crate::transaction_pool::{PendingTransaction, TransactionSource};
use parking_lot::Mutex;
use std::sync::Arc;

/// A [`TransactionSource`] backed by a plain list.
///
/// Transactions are returned in the order they were added; nothing is removed when a payload
/// includes them.
#[derive(Debug, Clone, Default)]
pub struct MockTransactionSource {
    transactions: Arc<Mutex<Vec<PendingTransaction>>>,
}

impl MockTransactionSource {
    /// Appends a transaction.
    pub fn add(&self, tx: PendingTransaction) {
        self.transactions.lock().push(tx);
    }

    /// Appends all given transactions.
    pub fn extend(&self, txs: impl IntoIterator<Item = PendingTransaction>) {
        self.transactions.lock().extend(txs);
    }

    /// Removes all transactions.
    pub fn clear(&self) {
        self.transactions.lock().clear();
    }
}

impl TransactionSource for MockTransactionSource {
    fn pending(&self) -> Vec<PendingTransaction> {
        self.transactions.lock().clone()
    }
}
