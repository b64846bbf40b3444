//! Converts contributed wei into token amounts.
//!
//! Two schedule shapes are supported. A goal-boxed schedule has one base rate
//! and a list of stages, each accepting `goal` wei at its own bonus; stages
//! open one after another as `wei_raised` grows, and the last stage keeps
//! accepting past its goal. A time-boxed schedule looks the rate up by the
//! block time instead.

use cosmwasm_std::{StdResult, Uint128};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{GoalStage, PricingSchedule, TimedStage};
use crate::ContractError;

pub const MAX_BONUS_PERCENT: u64 = 100;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Quote {
    pub stage_index: u32,
    /// False when every goal is already met and the last stage is pricing
    /// the overflow.
    pub found: bool,
    pub goal: Option<Uint128>,
    pub rate: Uint128,
    pub bonus: u64,
}

/// Tokens owed for the part of a contribution that fell into one stage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct StagePortion {
    pub stage_index: u32,
    pub wei: Uint128,
    pub base_amount: Uint128,
    pub bonus_amount: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Allocation {
    pub base_amount: Uint128,
    pub bonus_amount: Uint128,
    pub portions: Vec<StagePortion>,
}

impl Allocation {
    pub fn total(&self) -> StdResult<Uint128> {
        Ok(self.base_amount.checked_add(self.bonus_amount)?)
    }
}

fn price(stage_index: u32, wei: Uint128, rate: Uint128, bonus: u64) -> StdResult<StagePortion> {
    let base_amount = wei.checked_mul(rate)?;
    // truncated per stage, never on the aggregate
    let bonus_amount = base_amount.multiply_ratio(bonus, MAX_BONUS_PERCENT);
    Ok(StagePortion {
        stage_index,
        wei,
        base_amount,
        bonus_amount,
    })
}

pub fn validate_goal_stages(rate: Uint128, stages: &[GoalStage]) -> Result<(), ContractError> {
    if rate.is_zero() {
        return Err(ContractError::invalid_arguments("rate must be positive"));
    }
    if stages.is_empty() {
        return Err(ContractError::invalid_arguments(
            "schedule needs at least one stage",
        ));
    }
    for (idx, stage) in stages.iter().enumerate() {
        // zero-sized stage would make the cumulative thresholds non-increasing
        if stage.goal.is_zero() {
            return Err(ContractError::invalid_arguments(format!(
                "goal of stage {} must be positive",
                idx
            )));
        }
        if stage.bonus > MAX_BONUS_PERCENT {
            return Err(ContractError::invalid_arguments(format!(
                "bonus of stage {} exceeds {}%",
                idx, MAX_BONUS_PERCENT
            )));
        }
    }
    cumulative_goals(stages)?;
    Ok(())
}

pub fn validate_timed_stages(stages: &[TimedStage]) -> Result<(), ContractError> {
    if stages.is_empty() {
        return Err(ContractError::invalid_arguments(
            "schedule needs at least one stage",
        ));
    }
    let mut previous_end: Option<u64> = None;
    for (idx, stage) in stages.iter().enumerate() {
        if stage.start >= stage.end {
            return Err(ContractError::invalid_arguments(format!(
                "stage {} ends before it starts",
                idx
            )));
        }
        if stage.rate.is_zero() {
            return Err(ContractError::invalid_arguments(format!(
                "rate of stage {} must be positive",
                idx
            )));
        }
        if stage.bonus > MAX_BONUS_PERCENT {
            return Err(ContractError::invalid_arguments(format!(
                "bonus of stage {} exceeds {}%",
                idx, MAX_BONUS_PERCENT
            )));
        }
        if let Some(previous_end) = previous_end {
            if stage.start < previous_end {
                return Err(ContractError::invalid_arguments(format!(
                    "stage {} overlaps the previous stage",
                    idx
                )));
            }
        }
        previous_end = Some(stage.end);
    }
    Ok(())
}

/// Builds a goal-boxed stage list from parallel goal/bonus arrays.
pub fn zip_goal_stages(
    goals: &[Uint128],
    bonuses: &[u64],
) -> Result<Vec<GoalStage>, ContractError> {
    if goals.len() != bonuses.len() {
        return Err(ContractError::invalid_arguments(format!(
            "{} goals but {} bonuses",
            goals.len(),
            bonuses.len()
        )));
    }
    Ok(goals
        .iter()
        .zip(bonuses.iter())
        .map(|(goal, bonus)| GoalStage {
            goal: *goal,
            bonus: *bonus,
        })
        .collect())
}

/// Running totals of stage goals: stage `i` is exhausted once
/// `wei_raised >= cumulative[i]`.
pub fn cumulative_goals(stages: &[GoalStage]) -> StdResult<Vec<Uint128>> {
    let mut total = Uint128::zero();
    let mut thresholds = Vec::with_capacity(stages.len());
    for stage in stages {
        total = total.checked_add(stage.goal)?;
        thresholds.push(total);
    }
    Ok(thresholds)
}

/// Wei attributed to every stage for the given raised total. The last stage
/// absorbs everything beyond the final threshold.
pub fn raised_in_stages(stages: &[GoalStage], wei_raised: Uint128) -> StdResult<Vec<Uint128>> {
    let thresholds = cumulative_goals(stages)?;
    let last = stages.len().saturating_sub(1);
    let mut floor = Uint128::zero();
    let mut raised = Vec::with_capacity(stages.len());
    for (idx, threshold) in thresholds.iter().enumerate() {
        let in_stage = if wei_raised <= floor {
            Uint128::zero()
        } else if idx == last || wei_raised < *threshold {
            wei_raised.checked_sub(floor)?
        } else {
            threshold.checked_sub(floor)?
        };
        raised.push(in_stage);
        floor = *threshold;
    }
    Ok(raised)
}

impl PricingSchedule {
    pub fn validate(&self) -> Result<(), ContractError> {
        match self {
            PricingSchedule::GoalBoxed { rate, stages } => validate_goal_stages(*rate, stages),
            PricingSchedule::TimeBoxed { stages } => validate_timed_stages(stages),
        }
    }

    pub fn stages_count(&self) -> usize {
        match self {
            PricingSchedule::GoalBoxed { stages, .. } => stages.len(),
            PricingSchedule::TimeBoxed { stages } => stages.len(),
        }
    }

    /// Stage serving the next wei. `found` is false once every goal is met
    /// (the last stage still prices the overflow) or, for timed schedules,
    /// when no window contains `now`.
    pub fn current_stage(&self, now: u64, wei_raised: Uint128) -> StdResult<(bool, u32)> {
        match self {
            PricingSchedule::GoalBoxed { stages, .. } => {
                let thresholds = cumulative_goals(stages)?;
                let found = thresholds.iter().position(|goal| wei_raised < *goal);
                Ok(match found {
                    Some(idx) => (true, idx as u32),
                    None => (false, stages.len().saturating_sub(1) as u32),
                })
            }
            PricingSchedule::TimeBoxed { stages } => Ok(stages
                .iter()
                .position(|stage| stage.start <= now && now < stage.end)
                .map(|idx| (true, idx as u32))
                .unwrap_or((false, 0))),
        }
    }

    pub fn quote(&self, now: u64, wei_raised: Uint128) -> Result<Quote, ContractError> {
        let (found, idx) = self.current_stage(now, wei_raised)?;
        match self {
            PricingSchedule::GoalBoxed { rate, stages } => {
                let stage = stages.get(idx as usize).ok_or(ContractError::NotInStage)?;
                Ok(Quote {
                    stage_index: idx,
                    found,
                    goal: Some(stage.goal),
                    rate: *rate,
                    bonus: stage.bonus,
                })
            }
            PricingSchedule::TimeBoxed { stages } => {
                let stage = stages
                    .get(idx as usize)
                    .filter(|_| found)
                    .ok_or(ContractError::NotInStage)?;
                Ok(Quote {
                    stage_index: idx,
                    found,
                    goal: None,
                    rate: stage.rate,
                    bonus: stage.bonus,
                })
            }
        }
    }

    /// Prices `wei` on top of `wei_raised`. In a goal-boxed schedule a
    /// contribution that crosses stage boundaries is split, and each part is
    /// priced and truncated with its own stage's bonus.
    pub fn allocate(
        &self,
        now: u64,
        wei: Uint128,
        wei_raised: Uint128,
    ) -> Result<Allocation, ContractError> {
        let portions = match self {
            PricingSchedule::GoalBoxed { rate, stages } => {
                split_across_stages(*rate, stages, wei, wei_raised)?
            }
            PricingSchedule::TimeBoxed { .. } => {
                let quote = self.quote(now, wei_raised)?;
                vec![price(quote.stage_index, wei, quote.rate, quote.bonus)?]
            }
        };

        let mut base_amount = Uint128::zero();
        let mut bonus_amount = Uint128::zero();
        for portion in portions.iter() {
            base_amount = base_amount.checked_add(portion.base_amount)?;
            bonus_amount = bonus_amount.checked_add(portion.bonus_amount)?;
        }
        Ok(Allocation {
            base_amount,
            bonus_amount,
            portions,
        })
    }
}

fn split_across_stages(
    rate: Uint128,
    stages: &[GoalStage],
    wei: Uint128,
    wei_raised: Uint128,
) -> StdResult<Vec<StagePortion>> {
    let thresholds = cumulative_goals(stages)?;
    let last = stages.len().saturating_sub(1);

    let mut portions = vec![];
    let mut remaining = wei;
    let mut raised = wei_raised;
    for (idx, stage) in stages.iter().enumerate() {
        if remaining.is_zero() {
            break;
        }
        let threshold = thresholds[idx];
        if idx != last && raised >= threshold {
            continue;
        }
        let take = if idx == last {
            remaining
        } else {
            std::cmp::min(remaining, threshold.checked_sub(raised)?)
        };
        portions.push(price(idx as u32, take, rate, stage.bonus)?);
        raised = raised.checked_add(take)?;
        remaining = remaining.checked_sub(take)?;
    }
    Ok(portions)
}
