//! Per-asset balance tracking.

use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Constructor)]
pub struct AssetBalance {
    pub asset: SmolStr,
    pub balance: Balance,
    pub time_exchange: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Constructor)]
pub struct Balance {
    pub total: Decimal,
    pub free: Decimal,
}

impl Balance {
    pub fn used(&self) -> Decimal {
        self.total - self.free
    }

    /// Applies a signed change to both `total` and `free`.
    pub fn apply(&mut self, change: Decimal) {
        self.total += change;
        self.free += change;
    }
}
