mod trait_store;
mod types;

pub use trait_store::*;
pub use types::*;
