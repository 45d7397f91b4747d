//! Cents money type.
//!
//! All money amounts in the store use integer cents stored as `i64`. Using
//! raw `i64` for money is error-prone: it allows accidental arithmetic with
//! unrelated integers (quantities, ids) without any compile-time signal.
//!
//! `Cents` wraps the raw `i64` so the type system prevents:
//! - Implicit construction from raw `i64` (no `From<i64>` impl).
//! - Mixing `Cents` with unrelated `i64` values in arithmetic.
//!
//! Line totals use [`Cents::checked_mul_qty`]; overflow returns `None` and
//! callers must handle it explicitly (checkout aborts the transaction).

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// A monetary amount in integer cents. 1 unit of currency = `Cents(100)`.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Explicit construction from a raw cent count.
    pub const fn new(raw: i64) -> Self {
        Cents(raw)
    }

    /// Extract the underlying `i64` for layer boundaries (DB binds, DTOs).
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Multiply a per-unit price by an integer quantity with overflow
    /// detection. Returns `None` on overflow.
    pub fn checked_mul_qty(self, qty: i64) -> Option<Cents> {
        self.0.checked_mul(qty).map(Cents)
    }

    /// Overflow-checked addition, for summing line totals.
    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }
}

impl Add for Cents {
    type Output = Cents;
    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;
    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}
