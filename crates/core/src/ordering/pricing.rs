use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::menu::MenuItemId;

/// Order totals are rounded to cents, midpoint away from zero.
pub const TOTAL_SCALE: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

pub trait PricingEngine: Send + Sync {
    fn total(&self, lines: &[PricedLine]) -> Decimal;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HalfUpPricingEngine;

impl PricingEngine for HalfUpPricingEngine {
    fn total(&self, lines: &[PricedLine]) -> Decimal {
        order_total(lines)
    }
}

pub fn order_total(lines: &[PricedLine]) -> Decimal {
    round_total(lines.iter().map(PricedLine::line_total).sum())
}

pub fn round_total(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(TOTAL_SCALE, RoundingStrategy::MidpointAwayFromZero)
}
