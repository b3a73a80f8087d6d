//! Trade ingestion into an order's execution state.

use rust_decimal::Decimal;

use crate::domain::{Fee, Market, Order, OrderStatus, Trade};
use crate::error::XchangeError;

/// Ingests `trade` into `order`'s execution, validating side and remaining
/// size, and advancing `status` to `partially_filled` or `filled`.
pub fn ingest_trade(order: &mut Order, trade: &Trade, market: &Market) -> Result<(), XchangeError> {
    if trade.side != order.parameters.side {
        return Err(XchangeError::InvalidParams(format!(
            "trade side {:?} does not match order side {:?}",
            trade.side, order.parameters.side
        )));
    }
    if trade.size > order.remaining_size() {
        return Err(XchangeError::InvalidParams(format!(
            "trade size {} exceeds remaining order size {}",
            trade.size,
            order.remaining_size()
        )));
    }

    let trade_value = market.value_of(trade.size, trade.price);
    let new_size = order.execution.filled_size + trade.size;
    let new_value = order.execution.filled_value + trade_value;
    order.execution.avg_price = average_price(new_size, new_value, market);
    order.execution.filled_size = new_size;
    order.execution.filled_value = new_value;

    if let Some(trade_fee) = &trade.fee {
        let accumulated = order
            .execution
            .fee
            .as_ref()
            .map(|existing| existing.balance_change)
            .unwrap_or(Decimal::ZERO);
        order.execution.fee = Some(Fee {
            rate: trade_fee.rate,
            balance_change: accumulated + trade_fee.balance_change,
            asset: trade_fee.asset.clone(),
        });
    }

    order.execution.status = if new_size == order.parameters.size {
        OrderStatus::Filled
    } else {
        OrderStatus::PartiallyFilled
    };

    Ok(())
}

fn average_price(total_size: Decimal, total_value: Decimal, market: &Market) -> Decimal {
    if total_size.is_zero() {
        return Decimal::ZERO;
    }
    match market.direction {
        crate::domain::MarketDirection::Linear => total_value / total_size,
        crate::domain::MarketDirection::Inverse => total_size / total_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Actor, MarketDirection, OrderParameters, Side, TimeInForce};
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn linear_market() -> Market {
        Market::new("BTCUSDT", "BTC", "USDT", MarketDirection::Linear, dec!(0.01), dec!(0.001))
    }

    fn trade(side: Side, price: Decimal, size: Decimal) -> Trade {
        Trade {
            id: "t1".into(),
            market_symbol: "BTCUSDT".into(),
            time: DateTime::UNIX_EPOCH,
            price,
            size,
            side,
            actor: Actor::Taker,
            fee: Some(Fee::from_rate(dec!(0.0005), price * size)),
        }
    }

    #[test]
    fn partial_fill_advances_status_and_avg_price() {
        let market = linear_market();
        let mut order = Order::new(
            "o1",
            "BTCUSDT",
            OrderParameters {
                size: dec!(2),
                side: Side::Buy,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        );

        ingest_trade(&mut order, &trade(Side::Buy, dec!(101), dec!(1)), &market).unwrap();
        assert_eq!(order.execution.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.execution.filled_size, dec!(1));
        assert_eq!(order.execution.avg_price, dec!(101));

        ingest_trade(&mut order, &trade(Side::Buy, dec!(101), dec!(1)), &market).unwrap();
        assert_eq!(order.execution.status, OrderStatus::Filled);
        assert_eq!(order.execution.filled_size, dec!(2));
    }

    #[test]
    fn wrong_side_trade_is_rejected() {
        let market = linear_market();
        let mut order = Order::new(
            "o1",
            "BTCUSDT",
            OrderParameters {
                size: dec!(2),
                side: Side::Buy,
                actor: Some(Actor::Maker),
                price: Some(dec!(101)),
                time_in_force: TimeInForce::GoodTilCancel,
            },
        );
        let err = ingest_trade(&mut order, &trade(Side::Sell, dec!(101), dec!(1)), &market).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::InvalidParams);
    }
}
