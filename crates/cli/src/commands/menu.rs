use ordermate_core::ordering::catalog::MenuCatalog;

use crate::commands::CommandResult;

pub fn run(json_output: bool) -> CommandResult {
    let catalog = MenuCatalog::seeded();

    if json_output {
        return match serde_json::to_string_pretty(catalog.items()) {
            Ok(output) => CommandResult::plain(output),
            Err(error) => CommandResult::failure("menu", "serialization", error.to_string(), 1),
        };
    }

    let mut lines = vec![format!("menu ({} items):", catalog.len())];
    lines.extend(catalog.items().iter().map(|item| {
        format!("- [{}] {} ${}: {}", item.id, item.name, item.price, item.description)
    }));
    CommandResult::plain(lines.join("\n"))
}
