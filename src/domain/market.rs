//! Market configuration: symbol, assets, and linear/inverse direction.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Whether a contract's value scales linearly with price (spot, USDT-margined
/// futures) or inversely (coin-margined futures, where value is
/// `size / price`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum MarketDirection {
    Linear,
    Inverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    pub symbol: SmolStr,
    pub base_asset: SmolStr,
    pub quote_asset: SmolStr,
    pub direction: MarketDirection,
    pub price_tick: Decimal,
    pub lot_size: Decimal,
    /// The asset a derivative contract settles or margins in, when it
    /// differs from `base_asset`/`quote_asset` (e.g. a coin-margined future
    /// quoted in USD but settling in BTC). `None` for spot markets, where
    /// settlement is simply the quote asset.
    pub contract_asset: Option<SmolStr>,
}

impl Market {
    pub fn new(
        symbol: impl Into<SmolStr>,
        base_asset: impl Into<SmolStr>,
        quote_asset: impl Into<SmolStr>,
        direction: MarketDirection,
        price_tick: Decimal,
        lot_size: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            base_asset: base_asset.into(),
            quote_asset: quote_asset.into(),
            direction,
            price_tick,
            lot_size,
            contract_asset: None,
        }
    }

    pub fn with_contract_asset(mut self, contract_asset: impl Into<SmolStr>) -> Self {
        self.contract_asset = Some(contract_asset.into());
        self
    }

    /// The value of `size` units at `price` in this market's direction.
    pub fn value_of(&self, size: Decimal, price: Decimal) -> Decimal {
        match self.direction {
            MarketDirection::Linear => size * price,
            MarketDirection::Inverse => size / price,
        }
    }

    /// The asset balance changes from filling this market settle in:
    /// the contract asset if one is configured, otherwise the quote asset
    /// for linear markets or the base asset for inverse markets.
    pub fn settlement_asset(&self) -> &SmolStr {
        match (&self.contract_asset, self.direction) {
            (Some(asset), _) => asset,
            (None, MarketDirection::Linear) => &self.quote_asset,
            (None, MarketDirection::Inverse) => &self.base_asset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn linear_value_is_size_times_price() {
        let m = Market::new("BTCUSDT", "BTC", "USDT", MarketDirection::Linear, dec!(0.01), dec!(0.001));
        assert_eq!(m.value_of(dec!(2), dec!(100)), dec!(200));
    }

    #[test]
    fn inverse_value_is_size_over_price() {
        let m = Market::new("BTCUSD", "BTC", "USD", MarketDirection::Inverse, dec!(0.5), dec!(1));
        assert_eq!(m.value_of(dec!(100), dec!(10000)), dec!(0.01));
    }

    #[test]
    fn settlement_asset_defaults_by_direction() {
        let linear = Market::new("BTCUSDT", "BTC", "USDT", MarketDirection::Linear, dec!(0.01), dec!(0.001));
        assert_eq!(linear.settlement_asset(), "USDT");
        let inverse = Market::new("BTCUSD", "BTC", "USD", MarketDirection::Inverse, dec!(0.5), dec!(1));
        assert_eq!(inverse.settlement_asset(), "BTC");
    }

    #[test]
    fn settlement_asset_prefers_explicit_contract_asset() {
        let m = Market::new("BTCUSD", "BTC", "USD", MarketDirection::Inverse, dec!(0.5), dec!(1))
            .with_contract_asset("USDC");
        assert_eq!(m.settlement_asset(), "USDC");
    }
}
