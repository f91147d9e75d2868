mod blockchain_tree;
mod executor;
pub mod generators;
mod transaction_pool;

pub use blockchain_tree::MockBlockTree;
pub use executor::{MockExecutor, MOCK_TRANSACTION_GAS};
pub use transaction_pool::MockTransactionSource;
