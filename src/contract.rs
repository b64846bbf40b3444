use cosmwasm_std::{
    attr, coins, entry_point, from_binary, to_binary, Addr, BankMsg, Binary, CosmosMsg, Deps,
    DepsMut, Env, Event, MessageInfo, Response, StdError, StdResult, Storage, Uint128, WasmMsg,
};
use cw20::{Cw20ExecuteMsg, Cw20ReceiveMsg};

use crate::caps::{validate_caps, CapGuard};
use crate::gate;
use crate::msg::{
    ConfigResponse, CurrentStageResponse, Cw20HookMsg, DepositResponse, DepositsResponse,
    ExecuteMsg, InstantiateMsg, PreviewResponse, QueryMsg, ScheduleMsg, ScheduleResponse,
    StateResponse, TokenReservesResponse, VaultResponse, WhitelistResponse,
};
use crate::pricing::{raised_in_stages, validate_goal_stages, zip_goal_stages};
use crate::state::{
    Config, GoalStage, PricingSchedule, State, TimedStage, TokenReserves, VaultState, CONFIG,
    RESERVES, SCHEDULE, STATE,
};
use crate::vault;
use crate::ContractError;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    let owner = if let Some(owner) = msg.owner {
        deps.api.addr_validate(&owner)?
    } else {
        info.sender.clone()
    };
    let wallet = deps.api.addr_validate(&msg.wallet)?;
    let token_addr = deps.api.addr_validate(&msg.token_addr)?;

    if msg.opening_time >= msg.closing_time {
        return Err(ContractError::invalid_arguments(
            "opening time must be before closing time",
        ));
    }
    validate_caps(msg.soft_cap, msg.hard_cap)?;
    if msg.ico_tokens_reserved_percent > 100 {
        return Err(ContractError::invalid_arguments(
            "ico tokens reserved percent exceeds 100",
        ));
    }
    if let (Some(minimum), Some(maximum)) = (msg.minimum_investment, msg.maximum_investment) {
        if minimum > maximum {
            return Err(ContractError::invalid_arguments(
                "minimum investment is above maximum investment",
            ));
        }
    }
    if msg.stable_denom.is_empty() {
        return Err(ContractError::invalid_arguments("stable denom is empty"));
    }

    let schedule = match msg.schedule {
        ScheduleMsg::GoalBoxed {
            rate,
            goals,
            bonuses,
        } => PricingSchedule::GoalBoxed {
            rate,
            stages: zip_goal_stages(&goals, &bonuses)?,
        },
        ScheduleMsg::TimeBoxed { stages } => PricingSchedule::TimeBoxed { stages },
    };
    schedule.validate()?;

    let whitelist = msg
        .whitelist
        .iter()
        .map(|addr| deps.api.addr_validate(addr))
        .collect::<StdResult<Vec<Addr>>>()?;

    CONFIG.save(
        deps.storage,
        &Config {
            owner: owner.clone(),
            wallet,
            token_addr,
            stable_denom: msg.stable_denom,
            minimum_investment: msg.minimum_investment,
            maximum_investment: msg.maximum_investment,
            ico_tokens_reserved_percent: msg.ico_tokens_reserved_percent,
            refundable: msg.refundable,
        },
    )?;
    SCHEDULE.save(deps.storage, &schedule)?;
    RESERVES.save(deps.storage, &TokenReserves::default())?;
    let whitelist_size = gate::add_to_whitelist(deps.storage, &whitelist)?;
    STATE.save(
        deps.storage,
        &State {
            opening_time: msg.opening_time,
            closing_time: msg.closing_time,
            wei_raised: Uint128::zero(),
            soft_cap: msg.soft_cap,
            hard_cap: msg.hard_cap,
            is_paused: false,
            finalized: false,
            killed: false,
            whitelist_size,
        },
    )?;
    vault::init(deps.storage)?;

    Ok(Response::new().add_attributes(vec![
        attr("action", "instantiate"),
        attr("owner", owner),
        attr("stages_count", schedule.stages_count().to_string()),
    ]))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Receive(msg) => receive(deps, env, info, msg),
        ExecuteMsg::Contribute { beneficiary } => contribute(deps, env, info, beneficiary),
        ExecuteMsg::ManualTransferPrivateReservedTokens { to, amount } => {
            manual_transfer(deps, info, to, amount, ReservePool::Private)
        }
        ExecuteMsg::ManualTransferIcoReservedTokens { to, amount } => {
            manual_transfer(deps, info, to, amount, ReservePool::Ico)
        }
        ExecuteMsg::AddBounties { addresses, amounts } => {
            add_bounties(deps, info, addresses, amounts)
        }
        ExecuteMsg::PauseCrowdsale {} => set_paused(deps, info, true),
        ExecuteMsg::RestoreCrowdsale {} => set_paused(deps, info, false),
        ExecuteMsg::UpdateOpeningTime { time } => update_opening_time(deps, env, info, time),
        ExecuteMsg::UpdateClosingTime { time } => update_closing_time(deps, env, info, time),
        ExecuteMsg::UpdateStageGoals { goals } => update_goal_stages(deps, env, info, |stages| {
            let bonuses: Vec<u64> = stages.iter().map(|stage| stage.bonus).collect();
            zip_goal_stages(&goals, &bonuses)
        }),
        ExecuteMsg::UpdateStageGoal { index, goal } => {
            update_goal_stages(deps, env, info, |stages| {
                let mut stages = stages.to_vec();
                stage_at(&mut stages, index)?.goal = goal;
                Ok(stages)
            })
        }
        ExecuteMsg::UpdateStageBonuses { bonuses } => {
            update_goal_stages(deps, env, info, |stages| {
                let goals: Vec<Uint128> = stages.iter().map(|stage| stage.goal).collect();
                zip_goal_stages(&goals, &bonuses)
            })
        }
        ExecuteMsg::UpdateStageBonus { index, bonus } => {
            update_goal_stages(deps, env, info, |stages| {
                let mut stages = stages.to_vec();
                stage_at(&mut stages, index)?.bonus = bonus;
                Ok(stages)
            })
        }
        ExecuteMsg::UpdateStages { goals, bonuses } => {
            update_goal_stages(deps, env, info, |_| zip_goal_stages(&goals, &bonuses))
        }
        ExecuteMsg::UpdateTimedStages { stages } => update_timed_stages(deps, info, stages),
        ExecuteMsg::UpdateCaps { soft_cap, hard_cap } => {
            update_caps(deps, env, info, soft_cap, hard_cap)
        }
        ExecuteMsg::AddToWhitelist { addresses } => update_whitelist(deps, info, addresses, true),
        ExecuteMsg::RemoveFromWhitelist { addresses } => {
            update_whitelist(deps, info, addresses, false)
        }
        ExecuteMsg::TransferOwnership { new_owner } => transfer_ownership(deps, info, new_owner),
        ExecuteMsg::Finalize {} => finalize(deps, env, info),
        ExecuteMsg::ForwardFundsToWallet {} => forward_funds_to_wallet(deps, env, info),
        ExecuteMsg::ClaimRefund {} => claim_refund(deps, env, info),
        ExecuteMsg::KillContract {} => kill_contract(deps, env, info),
        ExecuteMsg::BurnTokens {} => burn_tokens(deps, env, info),
    }
}

pub fn has_started(state: &State, now: u64) -> bool {
    now >= state.opening_time
}

pub fn time_over(state: &State, now: u64) -> bool {
    now >= state.closing_time
}

pub fn has_ended(state: &State, now: u64) -> bool {
    time_over(state, now) || state.wei_raised >= state.hard_cap
}

pub fn is_running(state: &State, now: u64) -> bool {
    has_started(state, now) && !has_ended(state, now) && !state.is_paused
}

fn ensure_not_killed(state: &State) -> Result<(), ContractError> {
    if state.killed {
        return Err(ContractError::invalid_state("crowdsale was killed"));
    }
    Ok(())
}

// schedule, caps and token issuance are frozen once the sale is resolved
fn ensure_unresolved(state: &State) -> Result<(), ContractError> {
    ensure_not_killed(state)?;
    if state.finalized {
        return Err(ContractError::invalid_state("crowdsale is finalized"));
    }
    Ok(())
}

fn stage_at(stages: &mut [GoalStage], index: u32) -> Result<&mut GoalStage, ContractError> {
    let count = stages.len();
    stages.get_mut(index as usize).ok_or_else(|| {
        ContractError::invalid_arguments(format!(
            "stage index {} out of range, {} stages",
            index, count
        ))
    })
}

fn must_pay(info: &MessageInfo, denom: &str) -> Result<Uint128, ContractError> {
    if info.funds.len() > 1usize {
        return Err(ContractError::InvalidFunds {
            reason: "More than one coin is sent; only one asset is supported".to_string(),
        });
    }
    let payment = info
        .funds
        .iter()
        .find(|x| x.denom == denom && x.amount > Uint128::zero())
        .ok_or_else(|| ContractError::InvalidFunds {
            reason: format!("No {} assets are provided to contribute", denom),
        })?;
    Ok(payment.amount)
}

fn token_transfer(config: &Config, recipient: &Addr, amount: Uint128) -> StdResult<CosmosMsg> {
    token_msg(
        config,
        &Cw20ExecuteMsg::Transfer {
            recipient: recipient.to_string(),
            amount,
        },
    )
}

fn token_msg(config: &Config, msg: &Cw20ExecuteMsg) -> StdResult<CosmosMsg> {
    Ok(CosmosMsg::Wasm(WasmMsg::Execute {
        contract_addr: config.token_addr.to_string(),
        msg: to_binary(msg)?,
        funds: vec![],
    }))
}

fn receive(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    wrapper: Cw20ReceiveMsg,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if info.sender != config.token_addr {
        return Err(ContractError::Unauthorized);
    }
    let state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;

    match from_binary::<Cw20HookMsg>(&wrapper.msg)? {
        Cw20HookMsg::FundReserve {} => {
            let mut reserves = RESERVES.load(deps.storage)?;
            let ico_part = wrapper
                .amount
                .multiply_ratio(config.ico_tokens_reserved_percent, 100u64);
            let private_part = wrapper.amount.checked_sub(ico_part)?;
            reserves.ico_tokens_reserved = reserves.ico_tokens_reserved.checked_add(ico_part)?;
            reserves.private_tokens_reserved =
                reserves.private_tokens_reserved.checked_add(private_part)?;
            RESERVES.save(deps.storage, &reserves)?;

            Ok(Response::new().add_attributes(vec![
                attr("action", "fund_reserve"),
                attr("sender", wrapper.sender),
                attr("ico_tokens_reserved", ico_part),
                attr("private_tokens_reserved", private_part),
            ]))
        }
    }
}

fn contribute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    beneficiary: Option<String>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let mut state = STATE.load(deps.storage)?;
    let mut reserves = RESERVES.load(deps.storage)?;
    let schedule = SCHEDULE.load(deps.storage)?;
    let now = env.block.time.seconds();

    ensure_unresolved(&state)?;
    if !has_started(&state, now) {
        return Err(ContractError::NotYetStarted);
    }
    if has_ended(&state, now) {
        return Err(ContractError::AlreadyEnded);
    }
    gate::authorize(deps.storage, &config, &state, &info.sender)?;

    let value = must_pay(&info, &config.stable_denom)?;
    CapGuard::new(&config, &state).admit(state.wei_raised, value)?;

    let allocation = schedule.allocate(now, value, state.wei_raised)?;
    let amount = allocation.total()?;
    let available = reserves.ico_tokens_available();
    if amount > available {
        return Err(ContractError::InsufficientSupply {
            requested: amount,
            available,
        });
    }
    let beneficiary = match beneficiary {
        Some(beneficiary) => deps.api.addr_validate(&beneficiary)?,
        None => info.sender.clone(),
    };
    if config.refundable {
        vault::ensure_active(&vault::status(deps.storage)?)?;
    }

    let mut msgs = vec![token_transfer(&config, &beneficiary, amount)?];
    if config.refundable {
        vault::deposit(deps.storage, &info.sender, value)?;
    } else {
        msgs.push(CosmosMsg::Bank(BankMsg::Send {
            to_address: config.wallet.to_string(),
            amount: coins(value.u128(), &config.stable_denom),
        }));
    }
    state.wei_raised = state.wei_raised.checked_add(value)?;
    reserves.ico_tokens_sold = reserves.ico_tokens_sold.checked_add(amount)?;
    STATE.save(deps.storage, &state)?;
    RESERVES.save(deps.storage, &reserves)?;

    let (_, stage_index) = schedule.current_stage(now, state.wei_raised)?;
    let stages_crossed = allocation
        .portions
        .iter()
        .map(|portion| portion.stage_index.to_string())
        .collect::<Vec<String>>()
        .join(",");

    Ok(Response::new()
        .add_messages(msgs)
        .add_event(
            Event::new("TokenPurchase")
                .add_attribute("purchaser", info.sender.to_string())
                .add_attribute("beneficiary", beneficiary.to_string())
                .add_attribute("value", value)
                .add_attribute("amount", amount),
        )
        .add_attributes(vec![
            attr("action", "contribute"),
            attr("base_amount", allocation.base_amount),
            attr("bonus_amount", allocation.bonus_amount),
            attr("stages", stages_crossed),
            attr("current_stage_index", stage_index.to_string()),
            attr("wei_raised", state.wei_raised),
        ]))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ReservePool {
    Private,
    Ico,
}

fn manual_transfer(
    deps: DepsMut,
    info: MessageInfo,
    to: String,
    amount: Uint128,
    pool: ReservePool,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    gate::ensure_not_paused(&state)?;
    if amount.is_zero() {
        return Err(ContractError::invalid_arguments("amount must be positive"));
    }
    let to = deps.api.addr_validate(&to)?;

    let mut reserves = RESERVES.load(deps.storage)?;
    let available = match pool {
        ReservePool::Private => reserves.private_tokens_available(),
        ReservePool::Ico => reserves.ico_tokens_available(),
    };
    if amount > available {
        return Err(ContractError::ExceedsReservedAllocation {
            requested: amount,
            available,
        });
    }
    let event_kind = match pool {
        ReservePool::Private => {
            reserves.private_tokens_issued = reserves.private_tokens_issued.checked_add(amount)?;
            "ManualTransferOfPrivatelyReservedTokens"
        }
        ReservePool::Ico => {
            reserves.ico_tokens_transferred =
                reserves.ico_tokens_transferred.checked_add(amount)?;
            "ManualTransferOfICOReservedTokens"
        }
    };
    RESERVES.save(deps.storage, &reserves)?;

    Ok(Response::new()
        .add_message(token_transfer(&config, &to, amount)?)
        .add_event(
            Event::new(event_kind)
                .add_attribute("from", info.sender.to_string())
                .add_attribute("to", to.to_string())
                .add_attribute("amount", amount),
        )
        .add_attributes(vec![
            attr("action", "manual_transfer"),
            attr("to", to),
            attr("amount", amount),
        ]))
}

fn add_bounties(
    deps: DepsMut,
    info: MessageInfo,
    addresses: Vec<String>,
    amounts: Vec<Uint128>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    gate::ensure_not_paused(&state)?;
    if addresses.len() != amounts.len() {
        return Err(ContractError::invalid_arguments(format!(
            "{} addresses but {} amounts",
            addresses.len(),
            amounts.len()
        )));
    }
    if addresses.is_empty() {
        return Err(ContractError::invalid_arguments("no bounties given"));
    }

    let mut total = Uint128::zero();
    let mut bounties = Vec::with_capacity(addresses.len());
    for (addr, amount) in addresses.iter().zip(amounts.into_iter()) {
        if amount.is_zero() {
            return Err(ContractError::invalid_arguments(format!(
                "bounty for {} must be positive",
                addr
            )));
        }
        total = total.checked_add(amount)?;
        bounties.push((deps.api.addr_validate(addr)?, amount));
    }

    let mut reserves = RESERVES.load(deps.storage)?;
    let available = reserves.private_tokens_available();
    if total > available {
        return Err(ContractError::ExceedsReservedAllocation {
            requested: total,
            available,
        });
    }
    reserves.private_tokens_issued = reserves.private_tokens_issued.checked_add(total)?;
    RESERVES.save(deps.storage, &reserves)?;

    let mut response = Response::new();
    for (spender, amount) in bounties {
        // allowances on the token accumulate across calls
        response = response
            .add_message(token_msg(
                &config,
                &Cw20ExecuteMsg::IncreaseAllowance {
                    spender: spender.to_string(),
                    amount,
                    expires: None,
                },
            )?)
            .add_event(
                Event::new("BountyAdded")
                    .add_attribute("to", spender.to_string())
                    .add_attribute("amount", amount),
            );
    }
    Ok(response.add_attributes(vec![
        attr("action", "add_bounties"),
        attr("total", total),
    ]))
}

fn set_paused(deps: DepsMut, info: MessageInfo, paused: bool) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_not_killed(&state)?;
    if state.is_paused == paused {
        return Err(ContractError::invalid_state(if paused {
            "crowdsale is already paused"
        } else {
            "crowdsale is not paused"
        }));
    }
    state.is_paused = paused;
    STATE.save(deps.storage, &state)?;

    let (action, event) = if paused {
        ("pause_crowdsale", "CrowdsalePaused")
    } else {
        ("restore_crowdsale", "CrowdsaleRestored")
    };
    Ok(Response::new()
        .add_event(Event::new(event))
        .add_attributes(vec![attr("action", action)]))
}

fn update_opening_time(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    time: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    if !state.wei_raised.is_zero() {
        return Err(ContractError::invalid_state(
            "opening time is fixed once contributions were accepted",
        ));
    }
    if time >= state.closing_time {
        return Err(ContractError::invalid_arguments(
            "opening time must be before closing time",
        ));
    }
    state.opening_time = time;
    STATE.save(deps.storage, &state)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", "update_opening_time"),
        attr("opening_time", time.to_string()),
    ]))
}

fn update_closing_time(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    time: u64,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    if has_ended(&state, env.block.time.seconds()) {
        return Err(ContractError::AlreadyEnded);
    }
    if time <= state.opening_time {
        return Err(ContractError::invalid_arguments(
            "closing time must be after opening time",
        ));
    }
    state.closing_time = time;
    STATE.save(deps.storage, &state)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", "update_closing_time"),
        attr("closing_time", time.to_string()),
    ]))
}

/// Replaces the goal-boxed stage list with `edit(current)`. Nothing per stage
/// is stored besides goal and bonus, so the stage index is simply re-derived
/// from `wei_raised` against the new thresholds.
fn update_goal_stages<F>(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    edit: F,
) -> Result<Response, ContractError>
where
    F: FnOnce(&[GoalStage]) -> Result<Vec<GoalStage>, ContractError>,
{
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;

    let (rate, stages) = match SCHEDULE.load(deps.storage)? {
        PricingSchedule::GoalBoxed { rate, stages } => (rate, stages),
        PricingSchedule::TimeBoxed { .. } => {
            return Err(ContractError::invalid_state(
                "schedule is time-boxed, stage goals do not apply",
            ))
        }
    };
    let stages = edit(&stages)?;
    validate_goal_stages(rate, &stages)?;

    let schedule = PricingSchedule::GoalBoxed { rate, stages };
    SCHEDULE.save(deps.storage, &schedule)?;

    let (found, index) = schedule.current_stage(env.block.time.seconds(), state.wei_raised)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", "update_stages"),
        attr("stages_count", schedule.stages_count().to_string()),
        attr("current_stage_found", found.to_string()),
        attr("current_stage_index", index.to_string()),
    ]))
}

fn update_timed_stages(
    deps: DepsMut,
    info: MessageInfo,
    stages: Vec<TimedStage>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    if let PricingSchedule::GoalBoxed { .. } = SCHEDULE.load(deps.storage)? {
        return Err(ContractError::invalid_state(
            "schedule is goal-boxed, stage windows do not apply",
        ));
    }
    let schedule = PricingSchedule::TimeBoxed { stages };
    schedule.validate()?;
    SCHEDULE.save(deps.storage, &schedule)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", "update_timed_stages"),
        attr("stages_count", schedule.stages_count().to_string()),
    ]))
}

fn update_caps(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    soft_cap: Uint128,
    hard_cap: Uint128,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    if has_ended(&state, env.block.time.seconds()) {
        return Err(ContractError::AlreadyEnded);
    }
    validate_caps(soft_cap, hard_cap)?;
    if hard_cap < state.wei_raised {
        return Err(ContractError::cap_exceeded(
            "hard cap is below the amount already raised",
        ));
    }
    state.soft_cap = soft_cap;
    state.hard_cap = hard_cap;
    STATE.save(deps.storage, &state)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", "update_caps"),
        attr("soft_cap", soft_cap),
        attr("hard_cap", hard_cap),
    ]))
}

fn update_whitelist(
    deps: DepsMut,
    info: MessageInfo,
    addresses: Vec<String>,
    add: bool,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;
    let addresses = addresses
        .iter()
        .map(|addr| deps.api.addr_validate(addr))
        .collect::<StdResult<Vec<Addr>>>()?;

    let (action, changed) = if add {
        let added = gate::add_to_whitelist(deps.storage, &addresses)?;
        state.whitelist_size += added;
        ("add_to_whitelist", added)
    } else {
        let removed = gate::remove_from_whitelist(deps.storage, &addresses)?;
        state.whitelist_size -= removed;
        ("remove_from_whitelist", removed)
    };
    STATE.save(deps.storage, &state)?;
    Ok(Response::new().add_attributes(vec![
        attr("action", action),
        attr("changed", changed.to_string()),
        attr("whitelist_size", state.whitelist_size.to_string()),
    ]))
}

fn transfer_ownership(
    deps: DepsMut,
    info: MessageInfo,
    new_owner: String,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let new_owner = deps.api.addr_validate(&new_owner)?;
    let previous_owner = config.owner;
    config.owner = new_owner.clone();
    CONFIG.save(deps.storage, &config)?;
    Ok(Response::new()
        .add_event(
            Event::new("OwnershipTransferred")
                .add_attribute("previous_owner", previous_owner.to_string())
                .add_attribute("new_owner", new_owner.to_string()),
        )
        .add_attributes(vec![attr("action", "transfer_ownership")]))
}

/// Routes the ended sale to its single outcome: forward on success, refunds
/// on failure. Marks the state finalized; callers save it.
fn resolve(
    storage: &mut dyn Storage,
    config: &Config,
    state: &mut State,
    now: u64,
) -> Result<Response, ContractError> {
    if !has_ended(state, now) {
        return Err(ContractError::invalid_state("crowdsale has not ended"));
    }
    let goal_reached = CapGuard::new(config, state).soft_cap_reached(state.wei_raised);
    let mut response = Response::new();
    if config.refundable {
        if goal_reached {
            let (amount, msg) =
                vault::close(storage, goal_reached, &config.wallet, &config.stable_denom)?;
            if let Some(msg) = msg {
                response = response.add_message(msg);
            }
            response = response.add_event(
                Event::new("VaultClosed")
                    .add_attribute("wallet", config.wallet.to_string())
                    .add_attribute("amount", amount),
            );
        } else {
            vault::enable_refunds(storage, goal_reached)?;
            response = response.add_event(Event::new("RefundsEnabled"));
        }
    }
    state.finalized = true;
    let outcome = if goal_reached { "successful" } else { "failed" };
    Ok(response.add_attribute("outcome", outcome))
}

fn finalize(deps: DepsMut, env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_unresolved(&state)?;

    let response = resolve(deps.storage, &config, &mut state, env.block.time.seconds())?;
    STATE.save(deps.storage, &state)?;
    Ok(response.add_attributes(vec![attr("action", "finalize")]))
}

fn forward_funds_to_wallet(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    if !config.refundable {
        return Err(ContractError::invalid_state(
            "contributions are forwarded on purchase",
        ));
    }
    let mut state = STATE.load(deps.storage)?;
    ensure_not_killed(&state)?;
    if !has_ended(&state, env.block.time.seconds()) {
        return Err(ContractError::invalid_state("crowdsale has not ended"));
    }

    let goal_reached = CapGuard::new(&config, &state).soft_cap_reached(state.wei_raised);
    let (amount, msg) = vault::close(
        deps.storage,
        goal_reached,
        &config.wallet,
        &config.stable_denom,
    )?;
    state.finalized = true;
    STATE.save(deps.storage, &state)?;

    Ok(Response::new()
        .add_messages(msg)
        .add_event(
            Event::new("VaultClosed")
                .add_attribute("wallet", config.wallet.to_string())
                .add_attribute("amount", amount),
        )
        .add_attributes(vec![
            attr("action", "forward_funds_to_wallet"),
            attr("amount", amount),
        ]))
}

fn claim_refund(deps: DepsMut, env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    if !config.refundable {
        return Err(ContractError::invalid_state("crowdsale is not refundable"));
    }
    let mut state = STATE.load(deps.storage)?;
    let vault_status = vault::status(deps.storage)?;
    let now = env.block.time.seconds();
    let goal_reached = CapGuard::new(&config, &state).soft_cap_reached(state.wei_raised);

    let needs_refunds_enabled = match vault_status.state {
        VaultState::Active => {
            if !has_ended(&state, now) {
                return Err(ContractError::invalid_state("crowdsale has not ended"));
            }
            if goal_reached {
                return Err(ContractError::invalid_state(
                    "soft cap reached, refunds are not available",
                ));
            }
            true
        }
        VaultState::Refunding => false,
        VaultState::Closed => {
            return Err(ContractError::invalid_state("vault is closed"));
        }
    };
    if vault::deposit_of(deps.storage, &info.sender)?.is_zero() {
        return Err(ContractError::NothingToRefund);
    }

    let mut response = Response::new();
    if needs_refunds_enabled {
        vault::enable_refunds(deps.storage, goal_reached)?;
        state.finalized = true;
        STATE.save(deps.storage, &state)?;
        response = response.add_event(Event::new("RefundsEnabled"));
    }
    let (amount, msg) = vault::claim_refund(deps.storage, &info.sender, &config.stable_denom)?;

    Ok(response
        .add_message(msg)
        .add_event(
            Event::new("Refunded")
                .add_attribute("depositor", info.sender.to_string())
                .add_attribute("amount", amount),
        )
        .add_attributes(vec![attr("action", "claim_refund"), attr("amount", amount)]))
}

fn kill_contract(deps: DepsMut, env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let mut state = STATE.load(deps.storage)?;
    ensure_not_killed(&state)?;
    let now = env.block.time.seconds();
    if !has_ended(&state, now) {
        return Err(ContractError::invalid_state("crowdsale has not ended"));
    }

    let mut response = if state.finalized {
        Response::new()
    } else {
        resolve(deps.storage, &config, &mut state, now)?
    };

    let mut reserves = RESERVES.load(deps.storage)?;
    let unsold = reserves.ico_tokens_available();
    if !unsold.is_zero() {
        reserves.ico_tokens_burned = reserves.ico_tokens_burned.checked_add(unsold)?;
        response = response
            .add_message(token_msg(&config, &Cw20ExecuteMsg::Burn { amount: unsold })?)
            .add_event(Event::new("TokensBurned").add_attribute("amount", unsold));
    }
    let leftover = reserves.private_tokens_available();
    if !leftover.is_zero() {
        reserves.private_tokens_issued = reserves.private_tokens_issued.checked_add(leftover)?;
        response = response.add_message(token_transfer(&config, &config.owner, leftover)?);
    }
    state.killed = true;
    RESERVES.save(deps.storage, &reserves)?;
    STATE.save(deps.storage, &state)?;

    Ok(response.add_attributes(vec![
        attr("action", "kill_contract"),
        attr("burned", unsold),
        attr("returned_to_owner", leftover),
    ]))
}

fn burn_tokens(deps: DepsMut, env: Env, info: MessageInfo) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    gate::ensure_owner(&config, &info.sender)?;
    let state = STATE.load(deps.storage)?;
    ensure_not_killed(&state)?;
    if !has_ended(&state, env.block.time.seconds()) {
        return Err(ContractError::invalid_state(
            "tokens can not be burned while the crowdsale is running",
        ));
    }
    let mut reserves = RESERVES.load(deps.storage)?;
    let amount = reserves.ico_tokens_available();
    if amount.is_zero() {
        return Err(ContractError::invalid_state("no unsold tokens left to burn"));
    }
    reserves.ico_tokens_burned = reserves.ico_tokens_burned.checked_add(amount)?;
    RESERVES.save(deps.storage, &reserves)?;

    Ok(Response::new()
        .add_message(token_msg(&config, &Cw20ExecuteMsg::Burn { amount })?)
        .add_event(Event::new("TokensBurned").add_attribute("amount", amount))
        .add_attributes(vec![attr("action", "burn_tokens"), attr("amount", amount)]))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, env: Env, msg: QueryMsg) -> StdResult<Binary> {
    match msg {
        QueryMsg::Config {} => to_binary(&query_config(deps)?),
        QueryMsg::State {} => to_binary(&query_state(deps, env)?),
        QueryMsg::Schedule {} => to_binary(&query_schedule(deps)?),
        QueryMsg::CurrentStage {} => to_binary(&query_current_stage(deps, env)?),
        QueryMsg::PreviewTokenAmount { amount } => {
            to_binary(&query_preview_token_amount(deps, env, amount)?)
        }
        QueryMsg::Deposit { address } => to_binary(&query_deposit(deps, address)?),
        QueryMsg::Deposits {} => to_binary(&query_deposits(deps)?),
        QueryMsg::Vault {} => to_binary(&query_vault(deps)?),
        QueryMsg::IsWhitelisted { address } => to_binary(&query_is_whitelisted(deps, address)?),
        QueryMsg::TokenReserves {} => to_binary(&query_token_reserves(deps)?),
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        owner: config.owner.to_string(),
        wallet: config.wallet.to_string(),
        token_addr: config.token_addr.to_string(),
        stable_denom: config.stable_denom,
        minimum_investment: config.minimum_investment,
        maximum_investment: config.maximum_investment,
        ico_tokens_reserved_percent: config.ico_tokens_reserved_percent,
        refundable: config.refundable,
    })
}

fn query_state(deps: Deps, env: Env) -> StdResult<StateResponse> {
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let vault_status = vault::status(deps.storage)?;
    let guard = CapGuard::new(&config, &state);
    let now = env.block.time.seconds();
    Ok(StateResponse {
        opening_time: state.opening_time,
        closing_time: state.closing_time,
        wei_raised: state.wei_raised,
        soft_cap: state.soft_cap,
        hard_cap: state.hard_cap,
        is_paused: state.is_paused,
        has_started: has_started(&state, now),
        time_over: time_over(&state, now),
        has_ended: has_ended(&state, now),
        is_running: is_running(&state, now),
        soft_cap_reached: guard.soft_cap_reached(state.wei_raised),
        hard_cap_reached: guard.hard_cap_reached(state.wei_raised),
        refund_enabled: vault_status.state == VaultState::Refunding,
        finalized: state.finalized,
        killed: state.killed,
        wei_to_receive_limit: guard.remaining_capacity(state.wei_raised),
    })
}

fn query_schedule(deps: Deps) -> StdResult<ScheduleResponse> {
    let state = STATE.load(deps.storage)?;
    let schedule = SCHEDULE.load(deps.storage)?;
    let raised_in_stage = match &schedule {
        PricingSchedule::GoalBoxed { stages, .. } => raised_in_stages(stages, state.wei_raised)?,
        PricingSchedule::TimeBoxed { .. } => vec![],
    };
    Ok(ScheduleResponse {
        stages_count: schedule.stages_count() as u32,
        schedule,
        raised_in_stage,
    })
}

fn query_current_stage(deps: Deps, env: Env) -> StdResult<CurrentStageResponse> {
    let state = STATE.load(deps.storage)?;
    let schedule = SCHEDULE.load(deps.storage)?;
    match schedule.quote(env.block.time.seconds(), state.wei_raised) {
        Ok(quote) => Ok(CurrentStageResponse {
            found: quote.found,
            index: quote.stage_index,
            goal: quote.goal,
            bonus: quote.bonus,
            rate: quote.rate,
        }),
        // between or outside the timed windows
        Err(ContractError::NotInStage) => Ok(CurrentStageResponse {
            found: false,
            index: 0,
            goal: None,
            bonus: 0,
            rate: Uint128::zero(),
        }),
        Err(err) => Err(StdError::generic_err(err.to_string())),
    }
}

fn query_preview_token_amount(
    deps: Deps,
    env: Env,
    amount: Uint128,
) -> StdResult<PreviewResponse> {
    let state = STATE.load(deps.storage)?;
    let schedule = SCHEDULE.load(deps.storage)?;
    let allocation = schedule
        .allocate(env.block.time.seconds(), amount, state.wei_raised)
        .map_err(|err| StdError::generic_err(err.to_string()))?;
    Ok(PreviewResponse {
        amount: allocation.total()?,
        base_amount: allocation.base_amount,
        bonus_amount: allocation.bonus_amount,
        portions: allocation.portions,
    })
}

fn query_deposit(deps: Deps, address: String) -> StdResult<DepositResponse> {
    let addr = deps.api.addr_validate(&address)?;
    Ok(DepositResponse {
        amount: vault::deposit_of(deps.storage, &addr)?,
        address,
    })
}

fn query_deposits(deps: Deps) -> StdResult<DepositsResponse> {
    let deposits: Vec<DepositResponse> = vault::all_deposits(deps.storage)?
        .into_iter()
        .map(|(addr, amount)| DepositResponse {
            address: addr.to_string(),
            amount,
        })
        .collect();
    let mut total = Uint128::zero();
    for deposit in deposits.iter() {
        total = total.checked_add(deposit.amount)?;
    }
    Ok(DepositsResponse { deposits, total })
}

fn query_vault(deps: Deps) -> StdResult<VaultResponse> {
    let status = vault::status(deps.storage)?;
    Ok(VaultResponse {
        state: status.state,
        balance: status.balance,
        forwarded: status.forwarded,
        refunded: status.refunded,
    })
}

fn query_is_whitelisted(deps: Deps, address: String) -> StdResult<WhitelistResponse> {
    let addr = deps.api.addr_validate(&address)?;
    let config = CONFIG.load(deps.storage)?;
    let state = STATE.load(deps.storage)?;
    let whitelisted = gate::is_whitelisted(deps.storage, &config, &state, &addr)
        .map_err(|err| StdError::generic_err(err.to_string()))?;
    Ok(WhitelistResponse {
        address,
        whitelisted,
    })
}

fn query_token_reserves(deps: Deps) -> StdResult<TokenReservesResponse> {
    let reserves = RESERVES.load(deps.storage)?;
    Ok(TokenReservesResponse {
        ico_tokens_available: reserves.ico_tokens_available(),
        private_tokens_available: reserves.private_tokens_available(),
        ico_tokens_reserved: reserves.ico_tokens_reserved,
        ico_tokens_sold: reserves.ico_tokens_sold,
        ico_tokens_transferred: reserves.ico_tokens_transferred,
        ico_tokens_burned: reserves.ico_tokens_burned,
        private_tokens_reserved: reserves.private_tokens_reserved,
        private_tokens_issued: reserves.private_tokens_issued,
    })
}
