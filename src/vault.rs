//! Escrow for contributed funds.
//!
//! The vault holds every contribution until the sale resolves. A successful
//! sale closes it and forwards the whole balance to the wallet in one bank
//! message; a failed one switches it to refunding, after which each depositor
//! may take back exactly what they put in. While the vault is active or
//! refunding, `balance` equals the sum of the `DEPOSITS` entries. Closing
//! leaves the entries untouched as a record of who paid what, so they are
//! history once the vault is closed.

use cosmwasm_std::{
    coins, Addr, BankMsg, CosmosMsg, Order, StdError, StdResult, Storage, Uint128,
};

use crate::state::{VaultState, VaultStatus, DEPOSITS, VAULT};
use crate::ContractError;

pub fn init(storage: &mut dyn Storage) -> StdResult<()> {
    VAULT.save(
        storage,
        &VaultStatus {
            state: VaultState::Active,
            balance: Uint128::zero(),
            forwarded: Uint128::zero(),
            refunded: Uint128::zero(),
        },
    )
}

pub fn status(storage: &dyn Storage) -> StdResult<VaultStatus> {
    VAULT.load(storage)
}

pub fn deposit_of(storage: &dyn Storage, depositor: &Addr) -> StdResult<Uint128> {
    Ok(DEPOSITS.may_load(storage, depositor)?.unwrap_or_default())
}

pub fn all_deposits(storage: &dyn Storage) -> StdResult<Vec<(Addr, Uint128)>> {
    DEPOSITS
        .range(storage, None, None, Order::Ascending)
        .map(|item| {
            let (key, amount) = item?;
            let depositor = String::from_utf8(key)
                .map_err(|_| StdError::invalid_utf8("deposit key is not valid utf-8"))?;
            Ok((Addr::unchecked(depositor), amount))
        })
        .collect()
}

pub fn ensure_active(vault: &VaultStatus) -> Result<(), ContractError> {
    if vault.state != VaultState::Active {
        return Err(ContractError::invalid_state(format!(
            "vault is {:?}",
            vault.state
        )));
    }
    Ok(())
}

pub fn deposit(
    storage: &mut dyn Storage,
    depositor: &Addr,
    amount: Uint128,
) -> Result<Uint128, ContractError> {
    let mut vault = VAULT.load(storage)?;
    ensure_active(&vault)?;
    if amount.is_zero() {
        return Err(ContractError::invalid_arguments("deposit must be positive"));
    }

    let deposited = deposit_of(storage, depositor)?.checked_add(amount)?;
    vault.balance = vault.balance.checked_add(amount)?;

    DEPOSITS.save(storage, depositor, &deposited)?;
    VAULT.save(storage, &vault)?;
    Ok(deposited)
}

/// Callers check that the sale has ended.
pub fn enable_refunds(
    storage: &mut dyn Storage,
    soft_cap_reached: bool,
) -> Result<VaultStatus, ContractError> {
    let mut vault = VAULT.load(storage)?;
    ensure_active(&vault)?;
    if soft_cap_reached {
        return Err(ContractError::invalid_state(
            "soft cap reached, refunds are not available",
        ));
    }

    vault.state = VaultState::Refunding;
    VAULT.save(storage, &vault)?;
    Ok(vault)
}

/// Moves the whole balance to `wallet`. Only the vault record is written, so
/// the cost does not grow with the number of depositors. Callers check that
/// the sale has ended.
pub fn close(
    storage: &mut dyn Storage,
    soft_cap_reached: bool,
    wallet: &Addr,
    denom: &str,
) -> Result<(Uint128, Option<CosmosMsg>), ContractError> {
    let mut vault = VAULT.load(storage)?;
    ensure_active(&vault)?;
    if !soft_cap_reached {
        return Err(ContractError::invalid_state(
            "soft cap not reached, funds can not be forwarded",
        ));
    }

    let amount = vault.balance;
    vault.state = VaultState::Closed;
    vault.forwarded = vault.forwarded.checked_add(amount)?;
    vault.balance = Uint128::zero();
    VAULT.save(storage, &vault)?;

    let msg = if amount.is_zero() {
        None
    } else {
        Some(CosmosMsg::Bank(BankMsg::Send {
            to_address: wallet.to_string(),
            amount: coins(amount.u128(), denom),
        }))
    };
    Ok((amount, msg))
}

/// Pays the depositor back. The entry is zeroed before the bank message is
/// handed out, so a second claim finds nothing to refund.
pub fn claim_refund(
    storage: &mut dyn Storage,
    depositor: &Addr,
    denom: &str,
) -> Result<(Uint128, CosmosMsg), ContractError> {
    let mut vault = VAULT.load(storage)?;
    if vault.state != VaultState::Refunding {
        return Err(ContractError::invalid_state(format!(
            "refunds are not enabled, vault is {:?}",
            vault.state
        )));
    }
    let amount = deposit_of(storage, depositor)?;
    if amount.is_zero() {
        return Err(ContractError::NothingToRefund);
    }

    vault.balance = vault.balance.checked_sub(amount)?;
    vault.refunded = vault.refunded.checked_add(amount)?;

    DEPOSITS.remove(storage, depositor);
    VAULT.save(storage, &vault)?;

    Ok((
        amount,
        CosmosMsg::Bank(BankMsg::Send {
            to_address: depositor.to_string(),
            amount: coins(amount.u128(), denom),
        }),
    ))
}
