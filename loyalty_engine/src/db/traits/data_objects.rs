use loyalty_common::MinorUnits;

use crate::db_types::{OrderStatusType, UserAccount};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Inserted(i64),
    AlreadyExists(i64),
}

/// The result of a user uploading an order number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOrderResult {
    /// A new order was created with the given id, in state `NEW`.
    Registered(i64),
    /// The same user uploaded this order number before. Nothing changed.
    AlreadyOwnedBySameUser(i64),
    /// Another user owns this order number. Nothing changed.
    OwnedByOtherUser,
}

#[derive(Debug, Clone)]
pub enum WithdrawResult {
    /// The withdrawal was recorded. The account state after the debit is returned.
    Completed(UserAccount),
    /// The balance was too low. Nothing changed.
    InsufficientFunds { balance: MinorUnits },
}

/// The result of writing a reconciled status back to a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// The order moved to the new status. `credited` is the amount added to the owner's balance, which is zero unless
    /// the new status is `PROCESSED`.
    Applied { credited: MinorUnits },
    /// The order was already terminal, or the new status would move it backwards. Nothing changed.
    Skipped { current: OrderStatusType },
    OrderNotFound,
}
