use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Reduces the amount by `percent`; the reduction is rounded half up to
    /// whole cents. Exact for every amount.
    #[must_use]
    pub fn percent_off(self, percent: u32) -> Self {
        let amount = i128::from(self.0);
        let reduction = (amount * i128::from(percent.min(100)) + 50) / 100;
        Self::saturating_from(amount - reduction)
    }

    /// Subtracts `other`, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Money) -> Self {
        Self(self.0.saturating_sub(other.0).max(0))
    }

    #[must_use]
    pub fn saturating_add(self, other: Money) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    fn saturating_from(cents: i128) -> Self {
        Self(i64::try_from(cents).unwrap_or(if cents < 0 { i64::MIN } else { i64::MAX }))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub name: String,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
}

/// Employment record of a customer who is also an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub personnel_id: u32,
    pub discount_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherCompatibility {
    /// Can be combined with other combinable vouchers.
    Combinable,
    /// Cannot be combined with any other voucher.
    TopDog,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub code: String,
    pub amount: Money,
    pub compatibility: VoucherCompatibility,
}

impl Voucher {
    #[must_use]
    pub fn combinable(code: impl Into<String>, amount: Money) -> Self {
        Self {
            code: code.into(),
            amount,
            compatibility: VoucherCompatibility::Combinable,
        }
    }

    #[must_use]
    pub fn top_dog(code: impl Into<String>, amount: Money) -> Self {
        Self {
            code: code.into(),
            amount,
            compatibility: VoucherCompatibility::TopDog,
        }
    }
}

/// Total reduction granted by `vouchers`.
///
/// If any top-dog voucher is present only the largest one counts; otherwise
/// all combinable vouchers add up.
#[must_use]
pub fn voucher_reduction(vouchers: &[Voucher]) -> Money {
    let top_dog = vouchers
        .iter()
        .filter(|v| v.compatibility == VoucherCompatibility::TopDog)
        .map(|v| v.amount)
        .max();
    top_dog.unwrap_or_else(|| {
        vouchers
            .iter()
            .fold(Money::ZERO, |total, voucher| total.saturating_add(voucher.amount))
    })
}
