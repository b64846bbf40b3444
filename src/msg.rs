use cosmwasm_std::Uint128;
use cw20::Cw20ReceiveMsg;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::pricing::StagePortion;
use crate::state::{PricingSchedule, TimedStage, VaultState};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMsg {
    GoalBoxed {
        rate: Uint128,
        goals: Vec<Uint128>,
        bonuses: Vec<u64>,
    },
    TimeBoxed {
        stages: Vec<TimedStage>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct InstantiateMsg {
    pub owner: Option<String>,
    pub wallet: String,
    pub token_addr: String,
    pub stable_denom: String,
    pub opening_time: u64,
    pub closing_time: u64,
    pub schedule: ScheduleMsg,
    pub soft_cap: Uint128,
    pub hard_cap: Uint128,
    pub minimum_investment: Option<Uint128>,
    pub maximum_investment: Option<Uint128>,
    pub ico_tokens_reserved_percent: u64,
    pub refundable: bool,
    #[serde(default)]
    pub whitelist: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    Receive(Cw20ReceiveMsg),
    Contribute {
        beneficiary: Option<String>,
    },
    ManualTransferPrivateReservedTokens {
        to: String,
        amount: Uint128,
    },
    ManualTransferIcoReservedTokens {
        to: String,
        amount: Uint128,
    },
    AddBounties {
        addresses: Vec<String>,
        amounts: Vec<Uint128>,
    },
    PauseCrowdsale {},
    RestoreCrowdsale {},
    UpdateOpeningTime {
        time: u64,
    },
    UpdateClosingTime {
        time: u64,
    },
    UpdateStageGoals {
        goals: Vec<Uint128>,
    },
    UpdateStageGoal {
        index: u32,
        goal: Uint128,
    },
    UpdateStageBonuses {
        bonuses: Vec<u64>,
    },
    UpdateStageBonus {
        index: u32,
        bonus: u64,
    },
    UpdateStages {
        goals: Vec<Uint128>,
        bonuses: Vec<u64>,
    },
    UpdateTimedStages {
        stages: Vec<TimedStage>,
    },
    UpdateCaps {
        soft_cap: Uint128,
        hard_cap: Uint128,
    },
    AddToWhitelist {
        addresses: Vec<String>,
    },
    RemoveFromWhitelist {
        addresses: Vec<String>,
    },
    TransferOwnership {
        new_owner: String,
    },
    Finalize {},
    ForwardFundsToWallet {},
    ClaimRefund {},
    KillContract {},
    BurnTokens {},
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Cw20HookMsg {
    FundReserve {},
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    Config {},
    State {},
    Schedule {},
    CurrentStage {},
    PreviewTokenAmount { amount: Uint128 },
    Deposit { address: String },
    Deposits {},
    Vault {},
    IsWhitelisted { address: String },
    TokenReserves {},
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ConfigResponse {
    pub owner: String,
    pub wallet: String,
    pub token_addr: String,
    pub stable_denom: String,
    pub minimum_investment: Option<Uint128>,
    pub maximum_investment: Option<Uint128>,
    pub ico_tokens_reserved_percent: u64,
    pub refundable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct StateResponse {
    pub opening_time: u64,
    pub closing_time: u64,
    pub wei_raised: Uint128,
    pub soft_cap: Uint128,
    pub hard_cap: Uint128,
    pub is_paused: bool,
    pub has_started: bool,
    pub time_over: bool,
    pub has_ended: bool,
    pub is_running: bool,
    pub soft_cap_reached: bool,
    pub hard_cap_reached: bool,
    pub refund_enabled: bool,
    pub finalized: bool,
    pub killed: bool,
    pub wei_to_receive_limit: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct ScheduleResponse {
    pub schedule: PricingSchedule,
    pub stages_count: u32,
    // empty for time-boxed schedules
    pub raised_in_stage: Vec<Uint128>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct CurrentStageResponse {
    pub found: bool,
    pub index: u32,
    pub goal: Option<Uint128>,
    pub bonus: u64,
    pub rate: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct PreviewResponse {
    pub base_amount: Uint128,
    pub bonus_amount: Uint128,
    pub amount: Uint128,
    pub portions: Vec<StagePortion>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct DepositResponse {
    pub address: String,
    pub amount: Uint128,
}

/// Once the vault is closed the entries record what each address paid in;
/// the funds themselves are with the wallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct DepositsResponse {
    pub deposits: Vec<DepositResponse>,
    pub total: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct VaultResponse {
    pub state: VaultState,
    pub balance: Uint128,
    pub forwarded: Uint128,
    pub refunded: Uint128,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct WhitelistResponse {
    pub address: String,
    pub whitelisted: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TokenReservesResponse {
    pub ico_tokens_reserved: Uint128,
    pub ico_tokens_sold: Uint128,
    pub ico_tokens_transferred: Uint128,
    pub ico_tokens_burned: Uint128,
    pub ico_tokens_available: Uint128,
    pub private_tokens_reserved: Uint128,
    pub private_tokens_issued: Uint128,
    pub private_tokens_available: Uint128,
}
