//! Engine node integration tests.

mod engine;
mod launch;
