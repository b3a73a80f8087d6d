//! Order parameters, execution state, and cancellation tracking.

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ErrorCategory;

use super::{
    fee::Fee,
    transaction::{Actor, Side},
};

/// Time-in-force for a maker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum TimeInForce {
    GoodTilCancel,
    ImmediateOrCancel,
    FillOrKill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParameters {
    pub size: Decimal,
    pub side: Side,
    pub actor: Option<Actor>,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum OrderStatus {
    InFlight,
    Created,
    PartiallyFilled,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal status transition per the order
    /// lifecycle state machine.
    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (InFlight, Created)
                | (InFlight, PartiallyFilled)
                | (InFlight, Filled)
                | (InFlight, Rejected)
                | (Created, PartiallyFilled)
                | (Created, Filled)
                | (Created, Cancelled)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Cancelled)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum CancellationStatus {
    InFlight,
    Created,
    Rejected,
}

impl CancellationStatus {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (CancellationStatus::InFlight, CancellationStatus::Created)
                | (CancellationStatus::InFlight, CancellationStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExecution {
    pub status: OrderStatus,
    pub side: Side,
    pub filled_size: Decimal,
    pub filled_value: Decimal,
    pub avg_price: Decimal,
    pub fee: Option<Fee>,
}

impl OrderExecution {
    pub fn new_in_flight(side: Side) -> Self {
        Self {
            status: OrderStatus::InFlight,
            side,
            filled_size: Decimal::ZERO,
            filled_value: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            fee: None,
        }
    }

    /// Whether a transition from `self` to `next` is forward-equivalent: the
    /// transition is legal AND one of the allowed forward patterns holds (see
    /// the order-consistency design).
    pub fn is_forward_of(&self, next: &Self) -> bool {
        if !self.status.can_transition_to(next.status) && self.status != next.status {
            return false;
        }
        if next.status.is_terminal() && !self.status.is_terminal() {
            return next.filled_size >= self.filled_size;
        }
        if self.status == OrderStatus::PartiallyFilled && next.status == OrderStatus::PartiallyFilled
        {
            return next.filled_size >= self.filled_size;
        }
        next.filled_size > self.filled_size || next.status == self.status
    }

    /// Two executions have diverged when neither is forward of the other and
    /// their (size, status) differ — signalling source-of-truth corruption.
    pub fn diverged_from(&self, other: &Self) -> bool {
        if self.filled_size == other.filled_size && self.status == other.status {
            return false;
        }
        !self.is_forward_of(other) && !other.is_forward_of(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: SmolStr,
    pub market_symbol: SmolStr,
    pub parameters: OrderParameters,
    pub execution: OrderExecution,
    pub cancellation: Option<CancellationStatus>,
    /// Populated only when an operation on this order failed.
    pub error: Option<ErrorCategory>,
}

impl Order {
    pub fn new(id: impl Into<SmolStr>, market_symbol: impl Into<SmolStr>, parameters: OrderParameters) -> Self {
        let side = parameters.side;
        Self {
            id: id.into(),
            market_symbol: market_symbol.into(),
            parameters,
            execution: OrderExecution::new_in_flight(side),
            cancellation: None,
            error: None,
        }
    }

    pub fn rejected(mut self, category: ErrorCategory) -> Self {
        self.execution.status = OrderStatus::Rejected;
        self.error = Some(category);
        self
    }

    pub fn remaining_size(&self) -> Decimal {
        self.parameters.size - self.execution.filled_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TransitionCase {
        from: OrderStatus,
        to: OrderStatus,
        expected: bool,
    }

    #[test]
    fn legal_transitions_match_lifecycle_table() {
        let cases = vec![
            TransitionCase { from: OrderStatus::InFlight, to: OrderStatus::Created, expected: true },
            TransitionCase { from: OrderStatus::InFlight, to: OrderStatus::Rejected, expected: true },
            TransitionCase { from: OrderStatus::Created, to: OrderStatus::Cancelled, expected: true },
            TransitionCase { from: OrderStatus::Filled, to: OrderStatus::Created, expected: false },
            TransitionCase { from: OrderStatus::Rejected, to: OrderStatus::Filled, expected: false },
            TransitionCase { from: OrderStatus::PartiallyFilled, to: OrderStatus::InFlight, expected: false },
        ];
        for (index, case) in cases.iter().enumerate() {
            assert_eq!(
                case.from.can_transition_to(case.to),
                case.expected,
                "case {index} failed: {:?} -> {:?}",
                case.from,
                case.to
            );
        }
    }

    #[test]
    fn forward_equivalence_requires_non_decreasing_fill() {
        let mut a = OrderExecution::new_in_flight(Side::Buy);
        a.status = OrderStatus::PartiallyFilled;
        a.filled_size = Decimal::from(2);

        let mut b = a.clone();
        b.filled_size = Decimal::from(3);

        assert!(a.is_forward_of(&b));
        assert!(!b.is_forward_of(&a));
    }

    #[test]
    fn divergence_is_symmetric() {
        let mut a = OrderExecution::new_in_flight(Side::Buy);
        a.status = OrderStatus::PartiallyFilled;
        a.filled_size = Decimal::from(2);

        let mut b = OrderExecution::new_in_flight(Side::Buy);
        b.status = OrderStatus::Cancelled;
        b.filled_size = Decimal::from(1);

        assert_eq!(a.diverged_from(&b), b.diverged_from(&a));
    }
}
