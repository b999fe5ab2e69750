//! Utterance → order-line extraction.
//!
//! Matching is deliberately narrow: an item is recognised only when its
//! whole lower-cased name equals one whitespace token of the utterance, and
//! the token right before it is a positive integer. Multi-word names such
//! as "Caesar Salad" therefore never match, and quantity words ("two") are
//! not understood.

use ordermate_core::domain::menu::MenuItem;
use ordermate_core::domain::order::OrderLine;

/// Extracts order lines from `utterance`.
///
/// Lines come out in menu order, and within one item in utterance order.
/// Repeated mentions of an item produce separate lines; they are not merged.
/// Occurrences without a usable quantity are skipped silently.
pub fn resolve(utterance: &str, menu: &[MenuItem]) -> Vec<OrderLine> {
    let lowered = utterance.to_lowercase();
    let tokens = lowered.split_whitespace().collect::<Vec<_>>();

    let mut lines = Vec::new();
    for item in menu {
        let name = item.name.to_lowercase();
        for (index, token) in tokens.iter().enumerate() {
            if *token != name {
                continue;
            }
            let Some(quantity) = index.checked_sub(1).and_then(|prev| parse_quantity(tokens[prev]))
            else {
                continue;
            };
            lines.push(OrderLine { menu_item_id: item.id.clone(), quantity });
        }
    }
    lines
}

fn parse_quantity(token: &str) -> Option<u32> {
    token.parse::<u32>().ok().filter(|quantity| *quantity > 0)
}
