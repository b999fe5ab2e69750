use rust_decimal::Decimal;

use crate::domain::menu::{MenuItem, MenuItemId};

/// Read-only menu reference data, iterated in seed order.
#[derive(Clone, Debug, Default)]
pub struct MenuCatalog {
    items: Vec<MenuItem>,
}

impl MenuCatalog {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    /// The restaurant menu the service starts with.
    pub fn seeded() -> Self {
        Self::new(vec![
            MenuItem::new(
                "1",
                "Pizza Margherita",
                "Classic tomato and mozzarella pizza",
                Decimal::new(1099, 2),
            ),
            MenuItem::new("2", "Burger", "Beef burger with cheese and fries", Decimal::new(1250, 2)),
            MenuItem::new(
                "3",
                "Caesar Salad",
                "Fresh salad with chicken and Caesar dressing",
                Decimal::new(899, 2),
            ),
            MenuItem::new("4", "Pasta Carbonara", "Creamy pasta with bacon", Decimal::new(1150, 2)),
            MenuItem::new("5", "Tiramisu", "Italian coffee-flavored dessert", Decimal::new(699, 2)),
        ])
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn find(&self, id: &MenuItemId) -> Option<&MenuItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Looks an item up by id or by case-insensitive full name.
    pub fn find_by_name_or_id(&self, needle: &str) -> Option<&MenuItem> {
        let needle = needle.trim();
        self.items
            .iter()
            .find(|item| item.id.0 == needle)
            .or_else(|| self.items.iter().find(|item| item.name.eq_ignore_ascii_case(needle)))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::MenuCatalog;
    use crate::domain::menu::MenuItemId;

    #[test]
    fn seeded_catalog_keeps_seed_order_and_prices() {
        let catalog = MenuCatalog::seeded();
        let ids = catalog.items().iter().map(|item| item.id.0.as_str()).collect::<Vec<_>>();

        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(
            catalog.find(&MenuItemId::from("2")).map(|item| item.price),
            Some(Decimal::new(1250, 2))
        );
        assert!(catalog.find(&MenuItemId::from("999")).is_none());
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        let catalog = MenuCatalog::seeded();

        assert_eq!(
            catalog.find_by_name_or_id("caesar salad").map(|item| item.id.0.as_str()),
            Some("3")
        );
        assert_eq!(catalog.find_by_name_or_id("5").map(|item| item.name.as_str()), Some("Tiramisu"));
        assert!(catalog.find_by_name_or_id("sushi").is_none());
    }
}
