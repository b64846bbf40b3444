use cosmwasm_std::Uint128;

use super::*;
use crate::msg::{
    CurrentStageResponse, ExecuteMsg, PreviewResponse, QueryMsg, ScheduleResponse, StateResponse,
};
use crate::pricing::{raised_in_stages, StagePortion};
use crate::state::{GoalStage, PricingSchedule, TimedStage};
use crate::ContractError;

fn current_stage(deps: &TestDeps) -> CurrentStageResponse {
    query_at(deps, QueryMsg::CurrentStage {}, RUNNING)
}

fn schedule(deps: &TestDeps) -> ScheduleResponse {
    query_at(deps, QueryMsg::Schedule {}, RUNNING)
}

#[test]
fn test_split_across_three_stage_boundaries() {
    let mut deps = setup();

    let preview: PreviewResponse = query_at(
        &deps,
        QueryMsg::PreviewTokenAmount { amount: eth(8) },
        RUNNING,
    );
    assert_eq!(
        preview.portions,
        vec![
            StagePortion {
                stage_index: 0,
                wei: eth(2),
                base_amount: eth(3400),
                bonus_amount: eth(1360),
            },
            StagePortion {
                stage_index: 1,
                wei: eth(5),
                base_amount: eth(8500),
                bonus_amount: eth(2550),
            },
            StagePortion {
                stage_index: 2,
                wei: eth(1),
                base_amount: eth(1700),
                bonus_amount: eth(340),
            },
        ]
    );
    assert_eq!(preview.base_amount, eth(13600));
    assert_eq!(preview.bonus_amount, eth(4250));
    assert_eq!(preview.amount, eth(17850));

    let res = contribute(&mut deps, ALICE, eth(8)).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(17850)));

    let stage = current_stage(&deps);
    assert!(stage.found);
    assert_eq!(stage.index, 2);
    assert_eq!(stage.goal, Some(eth(4)));
    assert_eq!(stage.bonus, 20);

    assert_eq!(
        schedule(&deps).raised_in_stage,
        vec![eth(2), eth(5), eth(1), Uint128::zero(), Uint128::zero()]
    );
}

#[test]
fn test_current_stage_follows_raised_amount() {
    let mut deps = setup();

    let stage = current_stage(&deps);
    assert!(stage.found);
    assert_eq!(stage.index, 0);
    assert_eq!(stage.goal, Some(eth(2)));
    assert_eq!(stage.bonus, 40);

    contribute(&mut deps, ALICE, eth(1)).unwrap();
    assert_eq!(current_stage(&deps).index, 0);

    contribute(&mut deps, ALICE, eth(1)).unwrap();
    let stage = current_stage(&deps);
    assert_eq!(stage.index, 1);
    assert_eq!(stage.goal, Some(eth(5)));

    contribute(&mut deps, ALICE, eth(6)).unwrap();
    let stage = current_stage(&deps);
    assert_eq!(stage.index, 2);
    assert_eq!(stage.bonus, 20);

    contribute(&mut deps, ALICE, eth(5)).unwrap();
    let stage = current_stage(&deps);
    assert_eq!(stage.index, 3);
    assert_eq!(stage.goal, Some(eth(6)));
    assert_eq!(stage.bonus, 10);

    contribute(&mut deps, ALICE, eth(7)).unwrap();
    let stage = current_stage(&deps);
    assert_eq!(stage.index, 4);
    assert_eq!(stage.bonus, 5);

    // every goal met: the last stage keeps pricing the overflow
    contribute(&mut deps, ALICE, eth(20)).unwrap();
    let stage = current_stage(&deps);
    assert!(!stage.found);
    assert_eq!(stage.index, 4);
    assert_eq!(stage.goal, Some(eth(7)));
    assert_eq!(stage.bonus, 5);
    assert_eq!(stage.rate, Uint128::new(1700));

    let state: StateResponse = query_at(&deps, QueryMsg::State {}, RUNNING);
    assert_eq!(state.wei_to_receive_limit, eth(75 - 40));
}

#[test]
fn test_amount_beyond_last_goal_uses_last_bonus() {
    let mut deps = setup();
    let res = contribute(&mut deps, ALICE, eth(25)).unwrap();

    // 2@40%, 5@30%, 4@20%, 6@10%, 7@5%, remaining 1@5%
    let base = 25 * 1700;
    let bonus = 2 * 1700 * 40 / 100
        + 5 * 1700 * 30 / 100
        + 4 * 1700 * 20 / 100
        + 6 * 1700 * 10 / 100
        + 8 * 1700 * 5 / 100;
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(base + bonus)));
    assert!(res.attributes.contains(&cosmwasm_std::attr("stages", "0,1,2,3,4")));
}

#[test]
fn test_bonus_truncates_per_stage() {
    let schedule = PricingSchedule::GoalBoxed {
        rate: Uint128::new(1),
        stages: vec![
            GoalStage {
                goal: Uint128::new(3),
                bonus: 33,
            },
            GoalStage {
                goal: Uint128::new(3),
                bonus: 33,
            },
        ],
    };
    let allocation = schedule
        .allocate(0, Uint128::new(6), Uint128::zero())
        .unwrap();
    // 3 * 33 / 100 truncates to 0 in each stage; 6 * 33 / 100 would be 1
    assert_eq!(allocation.base_amount, Uint128::new(6));
    assert_eq!(allocation.bonus_amount, Uint128::zero());
    assert_eq!(allocation.portions.len(), 2);
}

#[test]
fn test_raised_in_stages_sums_to_raised() {
    let stages = vec![
        GoalStage {
            goal: Uint128::new(2),
            bonus: 40,
        },
        GoalStage {
            goal: Uint128::new(5),
            bonus: 30,
        },
    ];
    assert_eq!(
        raised_in_stages(&stages, Uint128::new(1)).unwrap(),
        vec![Uint128::new(1), Uint128::zero()]
    );
    assert_eq!(
        raised_in_stages(&stages, Uint128::new(10)).unwrap(),
        vec![Uint128::new(2), Uint128::new(8)]
    );
}

#[test]
fn test_update_stage_goals_mid_sale() {
    let mut deps = setup();
    contribute(&mut deps, ALICE, eth(3)).unwrap();
    assert_eq!(current_stage(&deps).index, 1);

    let err = exec_at(
        &mut deps,
        ALICE,
        ExecuteMsg::UpdateStageGoals {
            goals: vec![eth(1); 5],
        },
        RUNNING,
    )
    .unwrap_err();
    assert_eq!(err, ContractError::Unauthorized);

    let res = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoals {
            goals: vec![eth(1); 5],
        },
        RUNNING,
    )
    .unwrap();
    assert!(res
        .attributes
        .contains(&cosmwasm_std::attr("current_stage_index", "3")));
    assert_eq!(current_stage(&deps).index, 3);
    assert_eq!(
        schedule(&deps).raised_in_stage,
        vec![eth(1), eth(1), eth(1), Uint128::zero(), Uint128::zero()]
    );

    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoals {
            goals: vec![eth(10), eth(20), eth(30), eth(40), eth(50)],
        },
        RUNNING,
    )
    .unwrap();
    let stage = current_stage(&deps);
    assert_eq!(stage.index, 0);
    assert_eq!(stage.bonus, 40);
    let raised: Vec<Uint128> = schedule(&deps).raised_in_stage;
    assert_eq!(raised[0], eth(3));
    assert_eq!(
        raised.iter().fold(Uint128::zero(), |sum, x| sum + *x),
        eth(3)
    );

    // the next purchase continues from the raised total in the new stage 0
    let res = contribute(&mut deps, ALICE, eth(1)).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(2380)));
    let state: StateResponse = query_at(&deps, QueryMsg::State {}, RUNNING);
    assert_eq!(state.wei_raised, eth(4));
}

#[test]
fn test_invalid_schedule_updates_leave_schedule_unchanged() {
    let mut deps = setup();
    let before = schedule(&deps);

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoals {
            goals: vec![eth(11), eth(22), eth(33)],
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoal {
            index: 1,
            goal: Uint128::zero(),
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoal {
            index: 5,
            goal: eth(1),
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageBonus {
            index: 0,
            bonus: 101,
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStages {
            goals: vec![],
            bonuses: vec![],
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    assert_eq!(schedule(&deps), before);
}

#[test]
fn test_update_individual_goals_and_bonuses() {
    let mut deps = setup();
    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoal {
            index: 0,
            goal: eth(12),
        },
        RUNNING,
    )
    .unwrap();
    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageBonuses {
            bonuses: vec![50, 40, 30, 20, 10],
        },
        RUNNING,
    )
    .unwrap();
    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageBonus { index: 4, bonus: 0 },
        RUNNING,
    )
    .unwrap();

    let expected = PricingSchedule::GoalBoxed {
        rate: Uint128::new(1700),
        stages: vec![
            GoalStage {
                goal: eth(12),
                bonus: 50,
            },
            GoalStage {
                goal: eth(5),
                bonus: 40,
            },
            GoalStage {
                goal: eth(4),
                bonus: 30,
            },
            GoalStage {
                goal: eth(6),
                bonus: 20,
            },
            GoalStage {
                goal: eth(7),
                bonus: 0,
            },
        ],
    };
    assert_eq!(schedule(&deps).schedule, expected);

    // 1 ETH at 50% bonus
    let res = contribute(&mut deps, ALICE, eth(1)).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(2550)));

    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStages {
            goals: vec![eth(11), eth(22), eth(33)],
            bonuses: vec![30, 20, 10],
        },
        RUNNING,
    )
    .unwrap();
    assert_eq!(schedule(&deps).stages_count, 3);
}

fn timed_msg() -> crate::msg::InstantiateMsg {
    let mut msg = default_instantiate_msg();
    msg.schedule = ScheduleMsg::TimeBoxed {
        stages: vec![
            TimedStage {
                start: OPENING,
                end: OPENING + DAY,
                rate: Uint128::new(3000),
                bonus: 0,
            },
            TimedStage {
                start: OPENING + DAY + 1,
                end: OPENING + 2 * DAY,
                rate: Uint128::new(2200),
                bonus: 10,
            },
        ],
    };
    msg
}

#[test]
fn test_time_boxed_schedule() {
    let mut deps = setup_with(timed_msg(), FUNDED);

    let res = contribute(&mut deps, ALICE, eth(1)).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(3000)));

    // gap between the two windows
    let err = contribute_at(&mut deps, ALICE, eth(1), OPENING + DAY).unwrap_err();
    assert_eq!(err, ContractError::NotInStage);

    let res = contribute_at(&mut deps, ALICE, eth(1), OPENING + DAY + 5).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(2420)));

    // sale still open, but every window has passed
    let err = contribute_at(&mut deps, ALICE, eth(1), OPENING + 3 * DAY).unwrap_err();
    assert_eq!(err, ContractError::NotInStage);

    let stage: CurrentStageResponse =
        query_at(&deps, QueryMsg::CurrentStage {}, OPENING + DAY + 5);
    assert!(stage.found);
    assert_eq!(stage.index, 1);
    assert_eq!(stage.rate, Uint128::new(2200));
    assert_eq!(stage.bonus, 10);
    assert_eq!(stage.goal, None);

    let stage: CurrentStageResponse = query_at(&deps, QueryMsg::CurrentStage {}, OPENING + DAY);
    assert_eq!(
        stage,
        CurrentStageResponse {
            found: false,
            index: 0,
            goal: None,
            bonus: 0,
            rate: Uint128::zero(),
        }
    );
}

#[test]
fn test_time_boxed_schedule_updates() {
    let mut deps = setup_with(timed_msg(), FUNDED);

    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateStageGoals {
            goals: vec![eth(1), eth(2)],
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidState { .. }));

    let overlapping = vec![
        TimedStage {
            start: OPENING,
            end: OPENING + DAY,
            rate: Uint128::new(3000),
            bonus: 0,
        },
        TimedStage {
            start: OPENING + 10,
            end: OPENING + 2 * DAY,
            rate: Uint128::new(2200),
            bonus: 0,
        },
    ];
    let err = exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateTimedStages {
            stages: overlapping,
        },
        RUNNING,
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidArguments { .. }));

    exec_at(
        &mut deps,
        OWNER,
        ExecuteMsg::UpdateTimedStages {
            stages: vec![TimedStage {
                start: OPENING,
                end: CLOSING,
                rate: Uint128::new(1000),
                bonus: 0,
            }],
        },
        RUNNING,
    )
    .unwrap();
    let res = contribute_at(&mut deps, ALICE, eth(1), OPENING + 3 * DAY).unwrap();
    assert_eq!(res.messages[0].msg, token_transfer(ALICE, eth(1000)));
}
