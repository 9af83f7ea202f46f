//! Grounded system instructions for the Drafting round.
//!
//! The model sees the caller's Order Record and the catalog verbatim so that
//! every id it passes to a tool can be copied from the prompt.

use crumb_shared::catalog::{Catalog, SAUCE_MAX_PER_ITEM};
use crumb_shared::order::{format_money, CookingPreference, OrderRecord, StoreSelection};
use std::fmt::Write;

/// Ordering flow and tone rules (constant, always appended)
const ORDERING_FLOW: &str = r#"
=== ORDERING FLOW ===
1. Greet the user and offer pickup or delivery. Ask for their location, or a ZIP or city if they would rather not share it.
2. List the nearby stores and ask which one. Record the answer with set_store.
3. Once a store is chosen, confirm pickup or delivery with set_mode, then ask what they would like to order.
4. When they name an item, add it with add_item. For burgers, offer add-ons (with prices) and a cooking preference.
5. Quantity changes ("make it two") use update_quantity. Per-line changes ("the second burger well done") use update_line_customization.
6. Offer sides and drinks.
7. When they seem done, call show_cart and ask whether everything looks right.
8. On confirmation, hand off to secure checkout and ask them to reply "Checkout complete." when finished.
9. When they say "Checkout complete.", call place_order with an order number such as FNC-510284, then confirm the order number, pickup location, ETA and items.

=== RULES ===
- The order state above is the truth. Change it only through tools; never claim a change you did not make with a tool.
- line_index is 0-based and matches the numbering of the cart above.
- Use show_menu, show_menu_item or show_store_locations when the user wants to see something.
- Speak only as the assistant. Never write lines for the user.
- Keep confirmations short and friendly."#;

/// Build the system prompt for one turn
pub fn system_prompt(record: &OrderRecord, catalog: &Catalog) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(
        "You are the friendly ordering assistant for \"Flame & Crumb\", a restaurant. \
         You help the user order food for pickup or delivery.\n\n",
    );

    out.push_str("=== CURRENT ORDER (update it with tools; do not invent state) ===\n");
    out.push_str(&order_section(record, catalog));

    out.push_str("\n=== STORES (set_store with store_id) ===\n");
    for store in &catalog.stores {
        let _ = writeln!(
            out,
            "{} (id: {}) - {}, open until {}, pickup ETA {}",
            store.name, store.id, store.distance, store.open_until, store.pickup_eta
        );
    }

    out.push_str("\n=== MENU (add_item with menu_item_id) ===\n");
    for (group, items) in catalog.items_by_display_group() {
        let _ = writeln!(out, "{}:", group.label());
        for item in items {
            let _ = writeln!(
                out,
                "  {} (id: {}) - {} - {}",
                item.name,
                item.id,
                format_money(item.price),
                item.description
            );
        }
    }

    let _ = writeln!(
        out,
        "\n=== ADD-ONS (addon_ids on add_item; sauces max {} per entree) ===",
        SAUCE_MAX_PER_ITEM
    );
    for addon in &catalog.addons {
        let _ = writeln!(
            out,
            "{} (id: {}) - +{} [{:?}]",
            addon.name,
            addon.id,
            format_money(addon.price),
            addon.category
        );
    }

    let prefs: Vec<&str> = CookingPreference::ALL.iter().map(|p| p.as_str()).collect();
    let _ = writeln!(out, "\nCooking preferences for burgers: {}.", prefs.join(", "));

    out.push_str(ORDERING_FLOW);
    out
}

fn order_section(record: &OrderRecord, catalog: &Catalog) -> String {
    let mut out = String::new();

    let store = match &record.store_id {
        StoreSelection::Chosen(id) => catalog
            .store(id.as_str())
            .map(|s| format!("{} ({})", s.name, s.id))
            .unwrap_or_else(|| id.to_string()),
        StoreSelection::Declined => {
            "not shared yet (user declined; ask for ZIP or city/state)".to_string()
        }
        StoreSelection::Unset => "not set".to_string(),
    };
    let _ = writeln!(out, "- Store: {}", store);
    let _ = writeln!(
        out,
        "- Mode: {}",
        record.mode.map(|m| m.as_str()).unwrap_or("not set")
    );
    let _ = writeln!(out, "- Ready ETA: {}", record.ready_eta.as_deref().unwrap_or("-"));
    let _ = writeln!(
        out,
        "- Order number: {}",
        record.order_number.as_deref().unwrap_or("- (not placed)")
    );

    if record.cart.is_empty() {
        out.push_str("- Cart: empty\n");
        return out;
    }

    out.push_str("- Cart:\n");
    for (index, line) in record.cart.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", index, line.describe());
    }
    let summary = record.summary();
    let _ = writeln!(
        out,
        "- Subtotal {} + tax {} = estimated total {} ({} items)",
        format_money(summary.subtotal),
        format_money(summary.tax),
        format_money(summary.total),
        summary.item_count
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crumb_shared::catalog::StoreId;
    use crumb_shared::reducer::apply_raw;

    #[test]
    fn test_prompt_lists_catalog_ids() {
        let catalog = Catalog::standard();
        let prompt = system_prompt(&OrderRecord::new(), &catalog);
        for store in StoreId::ALL {
            assert!(prompt.contains(&format!("(id: {})", store)));
        }
        for id in catalog.item_ids() {
            assert!(prompt.contains(&format!("(id: {})", id)), "missing {}", id);
        }
        assert!(prompt.contains("medium-well"));
        assert!(prompt.contains("- Cart: empty"));
        assert!(prompt.contains("- Store: not set"));
    }

    #[test]
    fn test_prompt_renders_current_order() {
        let catalog = Catalog::standard();
        let record = apply_raw(
            "add_item",
            r#"{"menu_item_id":"classic-flame-burger","quantity":2,"addon_ids":["bacon"]}"#,
            &OrderRecord::new(),
            &catalog,
        );
        let record = apply_raw("set_store", r#"{"store_id":"west-loop"}"#, &record, &catalog);

        let prompt = system_prompt(&record, &catalog);
        assert!(prompt.contains("0. 2x Classic Flame Burger @ $12.99 each + Bacon (+$1.50)"));
        assert!(prompt.contains("(west-loop)"));
        assert!(prompt.contains("Ready ETA: 25-40 min"));
        assert!(prompt.contains("estimated total $31.88"));
    }

    #[test]
    fn test_prompt_declined_store() {
        let mut record = OrderRecord::new();
        record.store_id = StoreSelection::Declined;
        let prompt = system_prompt(&record, &Catalog::standard());
        assert!(prompt.contains("user declined"));
    }
}
