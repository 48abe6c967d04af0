//! Synthesis pipeline: resolve, gather, mock, assemble

mod assemble;
mod gather;
mod mock;
mod resolve;

pub use assemble::*;
pub use gather::*;
pub use mock::*;
pub use resolve::*;
