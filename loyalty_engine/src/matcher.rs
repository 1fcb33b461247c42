//! Reward rule matching.
//!
//! Every receipt line is tested against every active rule. A rule matches a line when the rule's `match_text` occurs
//! as a plain substring of the line description (case-sensitive). A line that matches several rules earns the sum of
//! all their rewards. A line that matches nothing earns nothing.
//!
//! Percentage rules pay `price × percent / 100`, rounded half away from zero to the nearest minor unit. Points rules
//! pay a flat amount. The calculation is a pure function of its inputs: the same receipt and rule set always produce the
//! same result.
use log::{debug, trace, warn};
use loyalty_common::MinorUnits;
use thiserror::Error;

use crate::db_types::{OrderStatusType, ReceiptLine, RewardRule, RewardType};

/// Percentage rewards are stored in hundredths of a percent, so 100% is 10,000.
const PERCENT_SCALE: i128 = 100 * 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Rule '{0}' has an unknown reward type '{1}'")]
    UnknownRewardType(String, String),
    #[error("The accrual does not fit in the ledger's amount type")]
    Overflow,
}

/// The disposition of a receipt after matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualResult {
    pub status: OrderStatusType,
    pub accrual: MinorUnits,
}

impl AccrualResult {
    pub fn invalid() -> Self {
        Self { status: OrderStatusType::Invalid, accrual: MinorUnits::default() }
    }

    pub fn processed(accrual: MinorUnits) -> Self {
        Self { status: OrderStatusType::Processed, accrual }
    }
}

/// Computes the accrual for a receipt.
///
/// The result is `INVALID` with a zero accrual when there are no active rules, when the receipt is empty, or when any
/// matching rule has an unknown reward type. Otherwise it is `PROCESSED` with the summed rewards, which may be zero.
pub fn compute_accrual(lines: &[ReceiptLine], rules: &[RewardRule]) -> AccrualResult {
    let active = rules.iter().filter(|r| r.is_active()).collect::<Vec<_>>();
    if active.is_empty() {
        debug!("🧮️ No active reward rules. The receipt is invalid.");
        return AccrualResult::invalid();
    }
    if lines.is_empty() {
        debug!("🧮️ The receipt has no lines. It is invalid.");
        return AccrualResult::invalid();
    }
    let mut total = MinorUnits::default();
    for line in lines {
        let reward = match line_reward(line, &active) {
            Ok(r) => r,
            Err(e) => {
                warn!("🧮️ Could not calculate the reward for '{}': {e}. The receipt is invalid.", line.description);
                return AccrualResult::invalid();
            },
        };
        total = match total.value().checked_add(reward.value()) {
            Some(v) => MinorUnits::from(v),
            None => {
                warn!("🧮️ {}. The receipt is invalid.", MatchError::Overflow);
                return AccrualResult::invalid();
            },
        };
    }
    trace!("🧮️ Receipt with {} lines earns {total}", lines.len());
    AccrualResult::processed(total)
}

/// The summed reward for a single line across every rule that matches it.
pub fn line_reward(line: &ReceiptLine, rules: &[&RewardRule]) -> Result<MinorUnits, MatchError> {
    rules.iter().filter(|r| line.description.contains(r.match_text.as_str())).try_fold(
        MinorUnits::default(),
        |acc, rule| {
            let reward = rule_reward(rule, line.price)?;
            acc.value().checked_add(reward.value()).map(MinorUnits::from).ok_or(MatchError::Overflow)
        },
    )
}

/// The reward a single rule pays on a line with the given price.
pub fn rule_reward(rule: &RewardRule, price: MinorUnits) -> Result<MinorUnits, MatchError> {
    let reward_type = rule
        .reward_type()
        .map_err(|_| MatchError::UnknownRewardType(rule.match_text.clone(), rule.reward_type.clone()))?;
    match reward_type {
        RewardType::Percent => percent_of(price, rule.reward),
        RewardType::Points => Ok(MinorUnits::from(rule.reward)),
    }
}

fn percent_of(price: MinorUnits, hundredths_of_percent: i64) -> Result<MinorUnits, MatchError> {
    let n = i128::from(price.value()) * i128::from(hundredths_of_percent);
    let q = n / PERCENT_SCALE;
    let r = n % PERCENT_SCALE;
    let rounded = if r.abs() * 2 >= PERCENT_SCALE { q + n.signum() } else { q };
    i64::try_from(rounded).map(MinorUnits::from).map_err(|_| MatchError::Overflow)
}
