//! OHLCV candle accumulated from trades within `[from, to)`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub timeframe: Duration,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trades_count: u64,
}

impl Candle {
    pub fn opening(from: DateTime<Utc>, timeframe: Duration, price: Decimal, size: Decimal) -> Self {
        Self {
            from,
            to: from + timeframe,
            timeframe,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: size,
            trades_count: 1,
        }
    }

    /// Folds one more trade into the candle. Caller must ensure the trade's
    /// timestamp falls within `[from, to)`.
    pub fn ingest_trade(&mut self, price: Decimal, size: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += size;
        self.trades_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ingest_updates_high_low_close_volume() {
        let from = DateTime::UNIX_EPOCH;
        let mut candle = Candle::opening(from, Duration::minutes(1), dec!(100), dec!(1));
        candle.ingest_trade(dec!(105), dec!(2));
        candle.ingest_trade(dec!(95), dec!(3));

        assert_eq!(candle.open, dec!(100));
        assert_eq!(candle.high, dec!(105));
        assert_eq!(candle.low, dec!(95));
        assert_eq!(candle.close, dec!(95));
        assert_eq!(candle.volume, dec!(6));
        assert_eq!(candle.trades_count, 3);
    }
}
