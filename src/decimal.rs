//! Process-wide decimal configuration.
//!
//! All prices, sizes, values, fees and balances in this crate are
//! `rust_decimal::Decimal`. Rounding only happens at explicit division points
//! (average price, inverse-market value, pnl rate); this module centralizes
//! the configured scale and rounding strategy so every division site agrees.

use rust_decimal::{Decimal, RoundingStrategy};

/// Minimum decimal precision this crate is specified to support.
pub const MIN_SCALE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalConfig {
    pub scale: u32,
    pub rounding: RoundingStrategy,
}

impl Default for DecimalConfig {
    fn default() -> Self {
        Self {
            scale: MIN_SCALE,
            rounding: RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl DecimalConfig {
    /// Builds a config, clamping `scale` up to `MIN_SCALE` if a caller passes less.
    pub fn new(scale: u32, rounding: RoundingStrategy) -> Self {
        Self {
            scale: scale.max(MIN_SCALE),
            rounding,
        }
    }

    pub fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.scale, self.rounding)
    }

    pub fn divide(&self, numerator: Decimal, denominator: Decimal) -> Decimal {
        self.round(numerator / denominator)
    }
}
