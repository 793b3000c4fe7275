//! Chain storage: index, genesis and validated append.

mod chain;
pub mod genesis;
mod index;
pub mod validation;

pub use chain::{Chain, ChainHead};
pub use index::ChainIndex;
