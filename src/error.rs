use cosmwasm_std::{OverflowError, StdError, Uint128};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("{0}")]
    Overflow(#[from] OverflowError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("Crowdsale is paused")]
    Paused,

    #[error("Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("Invalid funds: {reason}")]
    InvalidFunds { reason: String },

    #[error("Cap exceeded: {reason}")]
    CapExceeded { reason: String },

    #[error("Insufficient token supply: requested {requested}, available {available}")]
    InsufficientSupply {
        requested: Uint128,
        available: Uint128,
    },

    #[error("Exceeds reserved allocation: requested {requested}, available {available}")]
    ExceedsReservedAllocation {
        requested: Uint128,
        available: Uint128,
    },

    #[error("Nothing to refund")]
    NothingToRefund,

    #[error("Crowdsale has not started yet")]
    NotYetStarted,

    #[error("Crowdsale has already ended")]
    AlreadyEnded,

    #[error("No sale stage is open at this time")]
    NotInStage,
}

impl ContractError {
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        ContractError::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        ContractError::InvalidArguments {
            reason: reason.into(),
        }
    }

    pub fn cap_exceeded(reason: impl Into<String>) -> Self {
        ContractError::CapExceeded {
            reason: reason.into(),
        }
    }
}
