pub mod caps;
pub mod contract;
mod error;
pub mod gate;
pub mod msg;
pub mod pricing;
pub mod state;
pub mod vault;

pub use crate::error::ContractError;
