use cosmwasm_std::Uint128;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{Config, State};
use crate::ContractError;

/// Funding limits of the sale: soft/hard cap plus optional per-purchase bounds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct CapGuard {
    pub soft_cap: Uint128,
    pub hard_cap: Uint128,
    pub minimum_investment: Option<Uint128>,
    pub maximum_investment: Option<Uint128>,
}

impl CapGuard {
    pub fn new(config: &Config, state: &State) -> Self {
        CapGuard {
            soft_cap: state.soft_cap,
            hard_cap: state.hard_cap,
            minimum_investment: config.minimum_investment,
            maximum_investment: config.maximum_investment,
        }
    }

    /// Accepts the whole contribution or nothing; there is no partial fill.
    pub fn admit(&self, wei_raised: Uint128, amount: Uint128) -> Result<(), ContractError> {
        if amount.is_zero() {
            return Err(ContractError::invalid_arguments(
                "contribution must be positive",
            ));
        }
        if let Some(minimum) = self.minimum_investment {
            if amount < minimum {
                return Err(ContractError::invalid_arguments(format!(
                    "contribution {} is below the minimum investment {}",
                    amount, minimum
                )));
            }
        }
        if let Some(maximum) = self.maximum_investment {
            if amount > maximum {
                return Err(ContractError::cap_exceeded(format!(
                    "contribution {} is above the maximum investment {}",
                    amount, maximum
                )));
            }
        }
        let raised_after = wei_raised.checked_add(amount)?;
        if raised_after > self.hard_cap {
            return Err(ContractError::cap_exceeded(format!(
                "contribution {} exceeds the remaining capacity {}",
                amount,
                self.remaining_capacity(wei_raised)
            )));
        }
        Ok(())
    }

    pub fn soft_cap_reached(&self, wei_raised: Uint128) -> bool {
        wei_raised >= self.soft_cap
    }

    pub fn hard_cap_reached(&self, wei_raised: Uint128) -> bool {
        wei_raised >= self.hard_cap
    }

    pub fn remaining_capacity(&self, wei_raised: Uint128) -> Uint128 {
        self.hard_cap.checked_sub(wei_raised).unwrap_or_default()
    }
}

pub fn validate_caps(soft_cap: Uint128, hard_cap: Uint128) -> Result<(), ContractError> {
    if soft_cap.is_zero() {
        return Err(ContractError::invalid_arguments("soft cap must be positive"));
    }
    if hard_cap < soft_cap {
        return Err(ContractError::invalid_arguments(
            "hard cap must not be below the soft cap",
        ));
    }
    Ok(())
}
