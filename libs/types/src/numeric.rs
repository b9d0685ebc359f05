//! Integer money amounts
//!
//! Every amount is held in the smallest currency increment ("cents") as a
//! `u64`, so balances cannot go negative by construction and arithmetic is
//! exact. Operations that could underflow or overflow are `checked_*` only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest coin the machine accepts or returns.
///
/// Deposits and unit costs must be multiples of this so that every balance
/// the ledger can reach is expressible in coins.
pub const COIN_UNIT: u64 = 5;

/// Largest balance an account may hold. Change for any reachable balance
/// stays a short coin list.
pub const MAX_BALANCE: Cents = Cents(1_000_000);

/// Non-negative amount of money in cents
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(u64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// True when the amount can be paid out exactly in coins
    pub const fn is_coin_aligned(self) -> bool {
        self.0 % COIN_UNIT == 0
    }

    /// Price of `quantity` units at this unit cost; `None` on overflow
    pub fn checked_mul(self, quantity: u32) -> Option<Cents> {
        self.0.checked_mul(u64::from(quantity)).map(Cents)
    }

    /// `None` when `rhs` exceeds `self`
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }
}

impl From<u64> for Cents {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}c", self.0)
    }
}
