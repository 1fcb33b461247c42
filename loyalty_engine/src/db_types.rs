use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use loyalty_common::{is_luhn_valid, MinorUnits};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle of an order, in both the mart ledger and the accrual service.
///
/// Transitions are monotonic: `NEW`/`REGISTERED` → `PROCESSING` → `INVALID` | `PROCESSED`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order was uploaded by a user and has not been seen by the accrual service yet.
    New,
    /// The accrual service has the order, but has not started calculating the reward.
    Registered,
    /// The reward is being calculated.
    Processing,
    /// No reward will ever be paid for this order.
    Invalid,
    /// The reward has been calculated and credited.
    Processed,
}

impl OrderStatusType {
    /// Statuses that are still waiting on the reconciliation engine.
    pub const PENDING: [OrderStatusType; 3] =
        [OrderStatusType::New, OrderStatusType::Registered, OrderStatusType::Processing];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// Position in the lifecycle. `NEW` and `REGISTERED` are the same stage, seen from the two services.
    pub fn rank(&self) -> u8 {
        match self {
            Self::New | Self::Registered => 0,
            Self::Processing => 1,
            Self::Invalid | Self::Processed => 2,
        }
    }

    pub fn may_transition_to(&self, next: OrderStatusType) -> bool {
        !self.is_terminal() && self.rank() <= next.rank()
    }

    /// All the stored statuses from which an order may move into `self`.
    pub fn allowed_predecessors(&self) -> Vec<OrderStatusType> {
        Self::PENDING.into_iter().filter(|s| s.may_transition_to(*self)).collect()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Registered => write!(f, "REGISTERED"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "REGISTERED" => Ok(Self::Registered),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

//--------------------------------------      OrderNumber      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("The order number is required")]
    Empty,
    #[error("The order number must be a number")]
    NotNumeric,
    #[error("The order number failed the Luhn check")]
    FailedChecksum,
}

/// A purchase order number: a string of digits with a valid Luhn check digit.
///
/// Values read back from the database are trusted; values from clients must go through [`FromStr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(OrderNumberError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NotNumeric);
        }
        if !is_luhn_valid(s) {
            return Err(OrderNumberError::FailedChecksum);
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
/// An order in the mart ledger.
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    pub accrual: MinorUnits,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      UserAccount      ---------------------------------------------------------
#[derive(Debug, Clone, Default, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub balance: MinorUnits,
    pub withdrawn: MinorUnits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// Free-form reference supplied by the user. It does not have to match an uploaded order.
    pub order_number: String,
    pub amount: MinorUnits,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_number: String,
    pub amount: MinorUnits,
}

impl NewWithdrawal {
    pub fn new(user_id: i64, order_number: String, amount: MinorUnits) -> Self {
        Self { user_id, order_number, amount }
    }
}

//--------------------------------------      ReceiptLine      ---------------------------------------------------------
/// A single line item on a receipt submitted to the accrual service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub description: String,
    pub price: MinorUnits,
}

impl ReceiptLine {
    pub fn new<S: Into<String>>(description: S, price: MinorUnits) -> Self {
        Self { description: description.into(), price }
    }
}

/// A receipt, as registered with the accrual service.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub order_number: OrderNumber,
    pub lines: Vec<ReceiptLine>,
}

//--------------------------------------      RewardType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardType {
    /// `reward` is a percentage of the line price, in hundredths of a percent.
    Percent,
    /// `reward` is a flat amount in minor units, independent of price.
    Points,
}

impl Display for RewardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardType::Percent => write!(f, "%"),
            RewardType::Points => write!(f, "pt"),
        }
    }
}

impl FromStr for RewardType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "%" => Ok(Self::Percent),
            "pt" => Ok(Self::Points),
            s => Err(ConversionError(format!("Unknown reward type: {s}"))),
        }
    }
}

//--------------------------------------      RewardRule       ---------------------------------------------------------
/// A product-matching reward rule.
///
/// `reward` is stored in hundredths: hundredths of a percent for [`RewardType::Percent`] rules, and minor units for
/// [`RewardType::Points`] rules. `reward_type` is kept as raw text so that a malformed row surfaces during matching
/// instead of failing the whole rule fetch.
#[derive(Debug, Clone, FromRow)]
pub struct RewardRule {
    pub id: i64,
    pub match_text: String,
    pub reward: i64,
    pub reward_type: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl RewardRule {
    pub fn reward_type(&self) -> Result<RewardType, ConversionError> {
        self.reward_type.parse()
    }

    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

#[derive(Debug, Clone)]
pub struct NewRewardRule {
    pub match_text: String,
    pub reward: i64,
    pub reward_type: RewardType,
}

//--------------------------------------     AccrualOrder      ---------------------------------------------------------
/// An order as held by the accrual service, together with its receipt.
#[derive(Debug, Clone, FromRow)]
pub struct AccrualOrder {
    pub id: i64,
    pub order_number: OrderNumber,
    pub status: OrderStatusType,
    pub accrual: MinorUnits,
    /// JSON encoded list of [`ReceiptLine`]s
    pub receipt: String,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccrualOrder {
    pub fn receipt_lines(&self) -> Result<Vec<ReceiptLine>, serde_json::Error> {
        serde_json::from_str(&self.receipt)
    }
}
