//! The closed set of actions the assistant may take, and their tool schema
//! as advertised to a language model.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use ordermate_core::domain::order::OrderLine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub menu_item_id: String,
    pub quantity: u32,
}

impl From<&LineRequest> for OrderLine {
    fn from(value: &LineRequest) -> Self {
        OrderLine::new(value.menu_item_id.clone(), value.quantity)
    }
}

impl From<&OrderLine> for LineRequest {
    fn from(value: &OrderLine) -> Self {
        Self { menu_item_id: value.menu_item_id.0.clone(), quantity: value.quantity }
    }
}

/// A typed request decoded from a model tool call or the local planner.
///
/// `items: None` on `CreateOrder`/`UpdateOrder` means the items are to be
/// resolved from the user's own utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum OrderCommand {
    CreateOrder {
        #[serde(default)]
        items: Option<Vec<LineRequest>>,
        #[serde(default)]
        customer_name: Option<String>,
    },
    UpdateOrder {
        order_id: String,
        #[serde(default)]
        items: Option<Vec<LineRequest>>,
        #[serde(default)]
        customer_name: Option<String>,
    },
    CancelOrder {
        #[serde(default)]
        order_id: Option<String>,
    },
    GetStatus {
        #[serde(default)]
        order_id: Option<String>,
    },
    SetStatus {
        order_id: String,
        status: String,
    },
    ShowMenu,
    GetOrder {
        order_id: String,
    },
    ListOrders,
    DeleteOrder {
        order_id: String,
    },
}

impl OrderCommand {
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::CreateOrder { .. } => "create_order",
            Self::UpdateOrder { .. } => "update_order",
            Self::CancelOrder { .. } => "cancel_order",
            Self::GetStatus { .. } => "get_status",
            Self::SetStatus { .. } => "set_status",
            Self::ShowMenu => "show_menu",
            Self::GetOrder { .. } => "get_order",
            Self::ListOrders => "list_orders",
            Self::DeleteOrder { .. } => "delete_order",
        }
    }

    /// Decodes a tool call by name and JSON argument object.
    pub fn from_tool_call(name: &str, arguments: Value) -> Result<Self, serde_json::Error> {
        let arguments = match arguments {
            Value::Null => json!({}),
            other => other,
        };
        match name {
            "show_menu" => Ok(Self::ShowMenu),
            "list_orders" => Ok(Self::ListOrders),
            _ => serde_json::from_value(json!({ "tool": name, "arguments": arguments })),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

fn items_schema() -> Value {
    json!({
        "type": "array",
        "description": "Ordered items. Omit to take the items from the customer's message.",
        "items": {
            "type": "object",
            "properties": {
                "menu_item_id": { "type": "string" },
                "quantity": { "type": "integer", "minimum": 1 }
            },
            "required": ["menu_item_id", "quantity"]
        }
    })
}

fn order_id_schema(required: bool) -> Value {
    let required = if required { vec!["order_id"] } else { Vec::new() };
    json!({
        "type": "object",
        "properties": { "order_id": { "type": "string" } },
        "required": required
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "create_order",
            description: "Place a new order. Ask for the customer's name if it is not known.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "items": items_schema(),
                    "customer_name": { "type": "string" }
                }
            }),
        },
        ToolDefinition {
            name: "update_order",
            description: "Replace the items and customer name of an existing order.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "items": items_schema(),
                    "customer_name": { "type": "string" }
                },
                "required": ["order_id"]
            }),
        },
        ToolDefinition {
            name: "cancel_order",
            description: "Cancel an order. Omit order_id to cancel the customer's latest order.",
            parameters: order_id_schema(false),
        },
        ToolDefinition {
            name: "get_status",
            description: "Fetch the status of an order. Omit order_id for the latest order.",
            parameters: order_id_schema(false),
        },
        ToolDefinition {
            name: "set_status",
            description:
                "Update an order's status. Valid statuses: pending, preparing, ready, delivered, cancelled.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "order_id": { "type": "string" },
                    "status": {
                        "type": "string",
                        "enum": ["pending", "preparing", "ready", "delivered", "cancelled"]
                    }
                },
                "required": ["order_id", "status"]
            }),
        },
        ToolDefinition {
            name: "show_menu",
            description: "Fetch all menu items.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "get_order",
            description: "Fetch details of a specific order by id.",
            parameters: order_id_schema(true),
        },
        ToolDefinition {
            name: "list_orders",
            description: "Fetch all orders.",
            parameters: json!({ "type": "object", "properties": {} }),
        },
        ToolDefinition {
            name: "delete_order",
            description: "Delete an order by id.",
            parameters: order_id_schema(true),
        },
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{tool_definitions, LineRequest, OrderCommand};

    #[test]
    fn every_definition_decodes_to_its_command() {
        for definition in tool_definitions() {
            let arguments = match definition.name {
                "update_order" | "get_order" | "delete_order" => json!({ "order_id": "o-1" }),
                "set_status" => json!({ "order_id": "o-1", "status": "ready" }),
                _ => json!({}),
            };
            let command = OrderCommand::from_tool_call(definition.name, arguments)
                .unwrap_or_else(|error| panic!("{} should decode: {error}", definition.name));
            assert_eq!(command.tool_name(), definition.name);
        }
    }

    #[test]
    fn create_order_decodes_explicit_items() {
        let command = OrderCommand::from_tool_call(
            "create_order",
            json!({
                "items": [{ "menu_item_id": "1", "quantity": 2 }],
                "customer_name": "John"
            }),
        )
        .expect("decode");

        assert_eq!(
            command,
            OrderCommand::CreateOrder {
                items: Some(vec![LineRequest { menu_item_id: "1".to_string(), quantity: 2 }]),
                customer_name: Some("John".to_string()),
            }
        );
    }

    #[test]
    fn null_arguments_are_treated_as_empty() {
        let command = OrderCommand::from_tool_call("get_status", serde_json::Value::Null)
            .expect("decode");
        assert_eq!(command, OrderCommand::GetStatus { order_id: None });
    }

    #[test]
    fn unknown_tool_is_rejected() {
        assert!(OrderCommand::from_tool_call("refund_order", json!({})).is_err());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        assert!(OrderCommand::from_tool_call("set_status", json!({ "order_id": "o-1" })).is_err());
    }
}
