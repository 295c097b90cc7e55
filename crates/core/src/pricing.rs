//! Cart totals
//!
//! Pure functions over priced lines. Amounts are rounded to cents after
//! every step.

use serde::{Deserialize, Serialize};

/// Subtotals strictly above this ship for free; exactly 500 still pays
pub const FREE_SHIPPING_THRESHOLD: f64 = 500.0;

/// Flat shipping fee below the threshold
pub const SHIPPING_FEE: f64 = 29.99;

/// Tax rate applied to the subtotal
pub const TAX_RATE: f64 = 0.18;

/// Anything with a quantity and a unit price
pub trait PricedLine {
    /// Units on the line
    fn quantity(&self) -> u32;
    /// Price of one unit
    fn unit_price(&self) -> f64;

    /// `quantity × unit_price`, rounded to cents
    fn line_total(&self) -> f64 {
        round_cents(f64::from(self.quantity()) * self.unit_price())
    }
}

impl PricedLine for (u32, f64) {
    fn quantity(&self) -> u32 {
        self.0
    }

    fn unit_price(&self) -> f64 {
        self.1
    }
}

/// Breakdown of what a cart costs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of line totals
    pub subtotal: f64,
    /// Flat fee, or 0 when waived
    pub shipping: f64,
    /// Tax on the subtotal
    pub tax: f64,
    /// Subtotal plus shipping plus tax
    pub total: f64,
}

impl CartTotals {
    /// Compute totals for a set of lines
    pub fn from_lines<'a, L, I>(lines: I) -> Self
    where
        L: PricedLine + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        let subtotal = round_cents(lines.into_iter().map(PricedLine::line_total).sum());
        Self::from_subtotal(subtotal)
    }

    /// Compute totals for a known subtotal
    pub fn from_subtotal(subtotal: f64) -> Self {
        let subtotal = round_cents(subtotal);
        let shipping = shipping_for(subtotal);
        let tax = tax_for(subtotal);
        Self {
            subtotal,
            shipping,
            tax,
            total: round_cents(subtotal + shipping + tax),
        }
    }

    /// Whether shipping is waived
    #[must_use]
    pub fn has_free_shipping(&self) -> bool {
        self.shipping == 0.0
    }
}

/// Shipping for a subtotal; an empty cart pays nothing
#[must_use]
pub fn shipping_for(subtotal: f64) -> f64 {
    if subtotal <= 0.0 || subtotal > FREE_SHIPPING_THRESHOLD {
        0.0
    } else {
        SHIPPING_FEE
    }
}

/// Tax for a subtotal
#[must_use]
pub fn tax_for(subtotal: f64) -> f64 {
    round_cents(subtotal * TAX_RATE)
}

/// Round half away from zero to two decimals
#[must_use]
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
