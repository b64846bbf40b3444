use cosmwasm_std::{Addr, Storage};

use crate::state::{Config, State, WHITELIST};
use crate::ContractError;

pub fn ensure_owner(config: &Config, sender: &Addr) -> Result<(), ContractError> {
    if *sender != config.owner {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

pub fn ensure_not_paused(state: &State) -> Result<(), ContractError> {
    if state.is_paused {
        return Err(ContractError::Paused);
    }
    Ok(())
}

pub fn is_whitelisted(
    storage: &dyn Storage,
    config: &Config,
    state: &State,
    addr: &Addr,
) -> Result<bool, ContractError> {
    if state.whitelist_size == 0 || *addr == config.owner {
        return Ok(true);
    }
    Ok(WHITELIST.may_load(storage, addr)?.unwrap_or(false))
}

/// Gate for purchases: the sale must not be paused and, when a whitelist
/// is configured, the caller must be on it.
pub fn authorize(
    storage: &dyn Storage,
    config: &Config,
    state: &State,
    caller: &Addr,
) -> Result<(), ContractError> {
    ensure_not_paused(state)?;
    if !is_whitelisted(storage, config, state, caller)? {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

/// Returns how many of `addresses` were not yet listed.
pub fn add_to_whitelist(
    storage: &mut dyn Storage,
    addresses: &[Addr],
) -> Result<u64, ContractError> {
    let mut added = 0u64;
    for addr in addresses {
        if WHITELIST.may_load(storage, addr)?.is_none() {
            WHITELIST.save(storage, addr, &true)?;
            added += 1;
        }
    }
    Ok(added)
}

pub fn remove_from_whitelist(
    storage: &mut dyn Storage,
    addresses: &[Addr],
) -> Result<u64, ContractError> {
    let mut removed = 0u64;
    for addr in addresses {
        if WHITELIST.may_load(storage, addr)?.is_some() {
            WHITELIST.remove(storage, addr);
            removed += 1;
        }
    }
    Ok(removed)
}
