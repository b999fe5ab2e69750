pub mod catalog;
pub mod pricing;

use rust_decimal::Decimal;

use crate::domain::order::OrderLine;
use crate::errors::DomainError;

use self::{
    catalog::MenuCatalog,
    pricing::{HalfUpPricingEngine, PricedLine, PricingEngine},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Validates order lines against the menu and prices them.
pub struct OrderPricer<P = HalfUpPricingEngine> {
    pricing_engine: P,
}

impl Default for OrderPricer<HalfUpPricingEngine> {
    fn default() -> Self {
        Self::new(HalfUpPricingEngine)
    }
}

impl<P> OrderPricer<P>
where
    P: PricingEngine,
{
    pub fn new(pricing_engine: P) -> Self {
        Self { pricing_engine }
    }

    /// Fails on the first line whose menu item does not resolve; nothing is
    /// priced in that case.
    pub fn price(
        &self,
        catalog: &MenuCatalog,
        lines: &[OrderLine],
    ) -> Result<PricedOrder, DomainError> {
        let mut priced = Vec::with_capacity(lines.len());
        for line in lines {
            let item = catalog.find(&line.menu_item_id).ok_or_else(|| {
                DomainError::UnknownMenuItem { menu_item_id: line.menu_item_id.clone() }
            })?;
            if line.quantity == 0 {
                return Err(DomainError::InvalidQuantity { menu_item_id: line.menu_item_id.clone() });
            }
            priced.push(PricedLine {
                menu_item_id: item.id.clone(),
                quantity: line.quantity,
                unit_price: item.price,
            });
        }

        let total = self.pricing_engine.total(&priced);
        Ok(PricedOrder { lines: priced, total })
    }
}
