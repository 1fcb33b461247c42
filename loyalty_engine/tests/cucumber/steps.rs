use std::time::Duration;

use cucumber::{then, when};
use loyalty_common::MinorUnits;
use loyalty_engine::{
    accrual_objects::{GoodsItem, RewardRuleRequest},
    db_types::OrderStatusType,
    InsertResult,
    LedgerManagement,
    RegisterOrderResult,
    WithdrawResult,
};

use crate::cucumber::{loyalty_world::PERIOD, LoyaltyWorld};

#[allow(clippy::cast_precision_loss)]
fn major(minor: i64) -> f64 {
    minor as f64 / 100.0
}

#[when(expr = "the partner registers a reward rule {string} of {int} {word}")]
#[allow(clippy::cast_precision_loss)]
async fn register_rule(world: &mut LoyaltyWorld, match_text: String, reward: i64, reward_type: String) {
    let request = RewardRuleRequest { match_text, reward: reward as f64, reward_type };
    let result = world.system().accrual.register_rule(request).await.expect("Error registering reward rule");
    assert!(matches!(result, InsertResult::Inserted(_)), "Rule was not inserted: {result:?}");
}

#[when(expr = "the partner deletes the reward rule {string}")]
async fn delete_rule(world: &mut LoyaltyWorld, match_text: String) {
    let deleted = world.system().accrual.delete_rule(&match_text).await.expect("Error deleting reward rule");
    assert!(deleted, "Rule {match_text} was not deleted");
}

#[when(expr = "the accrual service registers order {word} with a line {string} priced at {int} minor units")]
async fn register_receipt(world: &mut LoyaltyWorld, order: String, description: String, price: i64) {
    let goods = vec![GoodsItem { description, price: major(price) }];
    let result = world.system().accrual.register_receipt(&order, goods).await.expect("Error registering receipt");
    assert!(matches!(result, InsertResult::Inserted(_)), "Receipt was not inserted: {result:?}");
}

#[when(expr = "the accrual service registers order {word} with no goods")]
async fn register_empty_receipt(world: &mut LoyaltyWorld, order: String) {
    world.system().accrual.register_receipt(&order, vec![]).await.expect("Error registering receipt");
}

#[when(expr = "user {int} uploads order {word}")]
async fn upload_order(world: &mut LoyaltyWorld, user_id: i64, order: String) {
    let result = world.system().ledger.register_order(&order, user_id).await.expect("Error uploading order");
    world.last_upload = Some(result);
}

#[then("the upload is accepted")]
async fn upload_accepted(world: &mut LoyaltyWorld) {
    assert!(matches!(world.last_upload, Some(RegisterOrderResult::Registered(_))), "{:?}", world.last_upload);
}

#[then("the upload was already done by the same user")]
async fn upload_already_done(world: &mut LoyaltyWorld) {
    assert!(
        matches!(world.last_upload, Some(RegisterOrderResult::AlreadyOwnedBySameUser(_))),
        "{:?}",
        world.last_upload
    );
}

#[then("the upload conflicts with another user")]
async fn upload_conflicts(world: &mut LoyaltyWorld) {
    assert_eq!(world.last_upload, Some(RegisterOrderResult::OwnedByOtherUser));
}

#[when("the enrichment engine runs a cycle")]
async fn run_enrichment(world: &mut LoyaltyWorld) {
    let report = world.system().enrichment.run_cycle().await;
    world.last_report = Some(report);
}

#[when("the calculation engine runs a cycle")]
async fn run_calculation(world: &mut LoyaltyWorld) {
    let report = world.system().calculation.run_cycle().await;
    world.last_report = Some(report);
}

#[when(expr = "the accrual service starts rate limiting with a retry after of {int} seconds")]
async fn start_rate_limit(world: &mut LoyaltyWorld, seconds: u64) {
    world.system().client.set_rate_limit(Some(Some(Duration::from_secs(seconds))));
    world.system().client.reset_calls();
}

#[when("the accrual service starts rate limiting without a retry after")]
async fn start_rate_limit_without_header(world: &mut LoyaltyWorld) {
    world.system().client.set_rate_limit(Some(None));
    world.system().client.reset_calls();
}

#[when("the accrual service stops rate limiting")]
async fn stop_rate_limit(world: &mut LoyaltyWorld) {
    world.system().client.set_rate_limit(None);
    world.system().client.reset_calls();
}

#[then(expr = "the accrual service was queried at most {int} times")]
async fn queried_at_most(world: &mut LoyaltyWorld, max: usize) {
    let calls = world.system().client.calls();
    assert!(calls <= max, "The accrual service was queried {calls} times");
}

#[then(expr = "the accrual service was queried {int} times")]
async fn queried_exactly(world: &mut LoyaltyWorld, count: usize) {
    assert_eq!(world.system().client.calls(), count);
}

#[then(expr = "the next cycle waits {int} seconds")]
async fn next_cycle_waits(world: &mut LoyaltyWorld, seconds: u64) {
    assert_eq!(world.system().enrichment.next_delay(), Duration::from_secs(seconds));
}

#[then("the next cycle waits for the normal period")]
async fn next_cycle_waits_period(world: &mut LoyaltyWorld) {
    assert_eq!(world.system().enrichment.next_delay(), PERIOD);
}

#[then("the last cycle was throttled")]
async fn last_cycle_throttled(world: &mut LoyaltyWorld) {
    let report = world.last_report.as_ref().expect("No cycle has run");
    assert!(report.throttled, "The cycle was not throttled: {report}");
}

#[then(expr = "order {word} has status {word} in the ledger")]
async fn ledger_status(world: &mut LoyaltyWorld, order: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Invalid status");
    let order = world.system().ledger.order_by_number(&order).await.expect("Error fetching order").expect("No order");
    assert_eq!(order.status, status);
}

#[then(expr = "order {word} has status {word} in the ledger with an accrual of {int} minor units")]
async fn ledger_status_and_accrual(world: &mut LoyaltyWorld, order: String, status: String, accrual: i64) {
    let status = status.parse::<OrderStatusType>().expect("Invalid status");
    let order = world.system().ledger.order_by_number(&order).await.expect("Error fetching order").expect("No order");
    assert_eq!(order.status, status);
    assert_eq!(order.accrual, MinorUnits::from(accrual));
}

#[then(expr = "order {word} has status {word} in the accrual service")]
async fn accrual_status(world: &mut LoyaltyWorld, order: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Invalid status");
    let state = world.system().accrual.order_state(&order).await.expect("Error fetching state").expect("No order");
    assert_eq!(state.status, status);
}

#[then(expr = "order {word} has an accrual of {int} minor units in the accrual service")]
async fn accrual_amount(world: &mut LoyaltyWorld, order: String, accrual: i64) {
    let state = world.system().accrual.order_state(&order).await.expect("Error fetching state").expect("No order");
    let reported = state.accrual.map(|a| MinorUnits::try_from_major(a).unwrap());
    assert_eq!(reported, Some(MinorUnits::from(accrual)));
}

#[then(expr = "there are {int} pending orders in the ledger")]
async fn pending_orders(world: &mut LoyaltyWorld, count: usize) {
    let pending = world.system().ledger.db().fetch_pending_orders(100).await.expect("Error fetching pending orders");
    assert_eq!(pending.len(), count);
}

#[then(expr = "user {int} has a balance of {int} minor units")]
async fn user_balance(world: &mut LoyaltyWorld, user_id: i64, balance: i64) {
    let account =
        world.system().ledger.balance_for_user(user_id).await.expect("Error fetching balance").expect("No account");
    assert_eq!(account.balance, MinorUnits::from(balance));
}

#[then(expr = "user {int} has withdrawn {int} minor units")]
async fn user_withdrawn(world: &mut LoyaltyWorld, user_id: i64, withdrawn: i64) {
    let account =
        world.system().ledger.balance_for_user(user_id).await.expect("Error fetching balance").expect("No account");
    assert_eq!(account.withdrawn, MinorUnits::from(withdrawn));
}

#[when(expr = "user {int} withdraws {int} minor units against order {word}")]
async fn withdraw(world: &mut LoyaltyWorld, user_id: i64, amount: i64, order: String) {
    let result = world.system().ledger.withdraw(user_id, &order, major(amount)).await.expect("Error withdrawing");
    world.last_withdrawal = Some(result);
}

#[then("the withdrawal succeeds")]
async fn withdrawal_succeeds(world: &mut LoyaltyWorld) {
    assert!(matches!(world.last_withdrawal, Some(WithdrawResult::Completed(_))), "{:?}", world.last_withdrawal);
}

#[then("the withdrawal is rejected for insufficient funds")]
async fn withdrawal_rejected(world: &mut LoyaltyWorld) {
    assert!(
        matches!(world.last_withdrawal, Some(WithdrawResult::InsufficientFunds { .. })),
        "{:?}",
        world.last_withdrawal
    );
}

#[then(expr = "user {int} has {int} withdrawals")]
async fn withdrawal_count(world: &mut LoyaltyWorld, user_id: i64, count: usize) {
    let withdrawals = world
        .system()
        .ledger
        .withdrawals_for_user(user_id)
        .await
        .expect("Error fetching withdrawals")
        .unwrap_or_default();
    assert_eq!(withdrawals.len(), count);
}
