//! Core domain for the ordermate assistant: menu and order types, the menu
//! catalog, pricing, configuration, and the error taxonomy shared by every
//! crate in the workspace.

pub mod config;
pub mod domain;
pub mod errors;
pub mod ordering;

pub use domain::menu::{MenuItem, MenuItemId};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ordering::{catalog::MenuCatalog, OrderPricer, PricedOrder};
