//! Outbound notification texts.

/// Separator placed between items in a new-items summary.
pub const ITEM_SEPARATOR: &str = "\n----------\n";

pub const NO_NEW_ITEMS: &str = "No new items were added";

pub fn start_message(topic: &str, url: &str) -> String {
    format!("Starting scanning {topic} on link:\n{url}")
}

pub fn new_items_message(items: &[String]) -> String {
    format!("{} new items:\n{}", items.len(), items.join(ITEM_SEPARATOR))
}

/// Failure report; the `Error:` line is omitted when there is no description.
pub fn failure_message(description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        "Scan workflow failed... 😥\n".to_string()
    } else {
        format!("Scan workflow failed... 😥\nError: {description}")
    }
}
