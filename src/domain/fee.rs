//! Fee attribution for a trade.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fee {
    pub rate: Decimal,
    pub balance_change: Decimal,
    /// The asset the fee is charged in, when it differs from the trade's
    /// settlement asset (e.g. a discounted exchange-token fee).
    pub asset: Option<SmolStr>,
}

impl Fee {
    /// `rate` applied to `gross`; `balance_change`'s sign always matches `rate`'s.
    pub fn from_rate(rate: Decimal, gross: Decimal) -> Self {
        Self {
            rate,
            balance_change: gross * rate,
            asset: None,
        }
    }

    pub fn with_asset(mut self, asset: impl Into<SmolStr>) -> Self {
        self.asset = Some(asset.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_change_sign_matches_rate() {
        let fee = Fee::from_rate(dec!(-0.0001), dec!(200));
        assert_eq!(fee.balance_change, dec!(-0.02));
    }

    #[test]
    fn with_asset_sets_the_optional_fee_asset() {
        let fee = Fee::from_rate(dec!(-0.0001), dec!(200)).with_asset("BNB");
        assert_eq!(fee.asset.as_deref(), Some("BNB"));
    }
}
