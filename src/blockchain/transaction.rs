use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A transferred amount.
///
/// Integers and decimals are kept apart because `5` and `5.0` encode to
/// different canonical bytes and therefore to different block hashes.
/// Integers above `i64::MAX` stay exact in `Unsigned`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Integer(i64),
    Unsigned(u64),
    Decimal(f64),
}

impl Amount {
    /// Whether the amount can be canonically encoded
    pub fn is_finite(&self) -> bool {
        match self {
            Amount::Integer(_) | Amount::Unsigned(_) => true,
            Amount::Decimal(value) => value.is_finite(),
        }
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Amount::Integer(value.into())
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::Integer(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Amount::Integer(value.into())
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(value) => Amount::Integer(value),
            Err(_) => Amount::Unsigned(value),
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::Decimal(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Integer(value) => write!(f, "{}", value),
            Amount::Unsigned(value) => write!(f, "{}", value),
            Amount::Decimal(value) => write!(f, "{}", value),
        }
    }
}

/// A transfer waiting in, or sealed into, a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's address
    pub sender: String,

    /// Recipient's address
    pub recipient: String,

    /// Amount being transferred
    #[schema(value_type = f64)]
    pub amount: Amount,
}

impl Transaction {
    /// Creates a new transaction. Field contents are not validated.
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount: amount.into(),
        }
    }
}
