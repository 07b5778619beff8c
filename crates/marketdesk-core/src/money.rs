//! # Money
//!
//! Amounts travel as `*_cents` integers on every wire type. `Money` is the
//! arithmetic view the summaries use when they add deposits, order totals,
//! budget commitments and stock value.
//!
//! ```text
//!   deposit_cents ──┐
//!   total_cents  ───┼──► Money ──► Σ ──► summary.*_cents
//!   price × stock ──┘
//! ```
//!
//! ```rust
//! use marketdesk_core::money::Money;
//!
//! let held: Money = [15_000, 500].into_iter().map(Money::from_cents).sum();
//! assert_eq!(held.cents(), 15_500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

/// Minor-unit amount (cents). Negative values are allowed so refunds and
/// overspend can be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Unit price times a count (line totals, price × stock).
    #[inline]
    pub const fn multiply_quantity(self, count: i64) -> Self {
        Money(self.0.saturating_mul(count))
    }

    /// Price after a percentage coupon given in basis points. The discount
    /// rounds half up, so the customer never pays the extra half cent.
    ///
    /// ```rust
    /// use marketdesk_core::money::Money;
    ///
    /// let price = Money::from_cents(10_000);
    /// assert_eq!(price.apply_percentage_discount(1_500).cents(), 8_500);
    /// ```
    pub fn apply_percentage_discount(self, discount_bps: u32) -> Money {
        let off = (i128::from(self.0) * i128::from(discount_bps) + 5_000) / i128::from(BPS_SCALE);
        Money(self.0 - off as i64)
    }

    /// Share of `limit` this amount represents, in basis points.
    ///
    /// Zero when the limit is zero or negative. Not capped, so overspend
    /// reads as more than 10000.
    pub fn ratio_bps(self, limit: Money) -> i64 {
        if limit.0 <= 0 {
            return 0;
        }
        (i128::from(self.0) * i128::from(BPS_SCALE) / i128::from(limit.0)) as i64
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    #[inline]
    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}
