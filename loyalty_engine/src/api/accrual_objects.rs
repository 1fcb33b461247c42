//! JSON bodies accepted by the accrual service. Amounts are decimals in major units.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsItem {
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptRegistration {
    pub order: String,
    #[serde(default)]
    pub goods: Vec<GoodsItem>,
}

/// A reward rule as submitted by the partner. For `%` rules `reward` is a percentage, for `pt` rules it is a flat
/// amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRuleRequest {
    #[serde(rename = "match")]
    pub match_text: String,
    pub reward: f64,
    pub reward_type: String,
}
