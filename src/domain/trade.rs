//! A completed trade: either a venue fill we're ingesting, or one produced by
//! the simulator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{
    fee::Fee,
    transaction::{Actor, Side, Transaction},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: SmolStr,
    pub market_symbol: SmolStr,
    pub time: DateTime<Utc>,
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
    pub actor: Actor,
    pub fee: Option<Fee>,
}

impl Trade {
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.price, self.size, self.side, self.actor)
    }
}
