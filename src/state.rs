use cosmwasm_std::{Addr, Uint128};
use cw_storage_plus::{Item, Map};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct Config {
    pub owner: Addr,
    pub wallet: Addr,
    pub token_addr: Addr,
    pub stable_denom: String,
    pub minimum_investment: Option<Uint128>,
    pub maximum_investment: Option<Uint128>,
    pub ico_tokens_reserved_percent: u64,
    // false: contributions go straight to the wallet, no escrow
    pub refundable: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct State {
    pub opening_time: u64,
    pub closing_time: u64,
    pub wei_raised: Uint128,
    pub soft_cap: Uint128,
    pub hard_cap: Uint128,
    pub is_paused: bool,
    pub finalized: bool,
    pub killed: bool,
    pub whitelist_size: u64,
}

/// Tokens held by the crowdsale on the external cw20 ledger, split into the
/// part sold through contributions and the part issued by the owner directly.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema, Default)]
pub struct TokenReserves {
    pub ico_tokens_reserved: Uint128,
    pub ico_tokens_sold: Uint128,
    pub ico_tokens_transferred: Uint128,
    pub ico_tokens_burned: Uint128,
    pub private_tokens_reserved: Uint128,
    pub private_tokens_issued: Uint128,
}

impl TokenReserves {
    pub fn ico_tokens_available(&self) -> Uint128 {
        let spent = self.ico_tokens_sold + self.ico_tokens_transferred + self.ico_tokens_burned;
        self.ico_tokens_reserved
            .checked_sub(spent)
            .unwrap_or_default()
    }

    pub fn private_tokens_available(&self) -> Uint128 {
        self.private_tokens_reserved
            .checked_sub(self.private_tokens_issued)
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct GoalStage {
    // wei this stage accepts before the next one opens
    pub goal: Uint128,
    pub bonus: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct TimedStage {
    pub start: u64,
    pub end: u64,
    pub rate: Uint128,
    #[serde(default)]
    pub bonus: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PricingSchedule {
    GoalBoxed { rate: Uint128, stages: Vec<GoalStage> },
    TimeBoxed { stages: Vec<TimedStage> },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum VaultState {
    Active,
    Refunding,
    Closed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct VaultStatus {
    pub state: VaultState,
    pub balance: Uint128,
    pub forwarded: Uint128,
    pub refunded: Uint128,
}

pub const CONFIG: Item<Config> = Item::new("config");
pub const STATE: Item<State> = Item::new("state");
pub const RESERVES: Item<TokenReserves> = Item::new("reserves");
pub const SCHEDULE: Item<PricingSchedule> = Item::new("schedule");

pub const WHITELIST: Map<&Addr, bool> = Map::new("whitelist");

pub const VAULT: Item<VaultStatus> = Item::new("vault");
// refundable balance per depositor
pub const DEPOSITS: Map<&Addr, Uint128> = Map::new("deposits");
