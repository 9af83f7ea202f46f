//! Display-Intent Collector.
//!
//! Gathers "reveal to user" requests for one turn: menu item cards and the
//! store map. Kept apart from the Order Record and started fresh every turn.

use crate::catalog::Catalog;
use crate::tools::ToolCall;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayIntents {
    /// Menu item ids to surface, first-requested first, no duplicates
    pub item_ids: Vec<String>,
    pub show_store_map: bool,
}

/// What a single display call contributed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revealed {
    /// Catalog-resolved ids the call asked for (including ones already collected)
    pub item_ids: Vec<String>,
    pub store_map: bool,
}

impl DisplayIntents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.item_ids.is_empty() && !self.show_store_map
    }

    /// Record a display-intent call. Returns `None` for any other call.
    ///
    /// `show_menu_item` ids that do not resolve in the catalog are dropped.
    pub fn collect(&mut self, call: &ToolCall, catalog: &Catalog) -> Option<Revealed> {
        let revealed = match call {
            ToolCall::ShowMenu => Revealed {
                item_ids: catalog.item_ids().map(str::to_string).collect(),
                store_map: false,
            },
            ToolCall::ShowMenuItem { menu_item_id } => Revealed {
                item_ids: catalog
                    .menu_item(menu_item_id)
                    .map(|item| vec![item.id.clone()])
                    .unwrap_or_default(),
                store_map: false,
            },
            ToolCall::ShowStoreLocations => Revealed {
                item_ids: Vec::new(),
                store_map: true,
            },
            _ => return None,
        };

        for id in &revealed.item_ids {
            if !self.item_ids.contains(id) {
                self.item_ids.push(id.clone());
            }
        }
        self.show_store_map |= revealed.store_map;

        Some(revealed)
    }

    /// Display names for the collected ids, in collection order
    pub fn item_names<'a>(&self, catalog: &'a Catalog) -> Vec<&'a str> {
        self.item_ids
            .iter()
            .filter_map(|id| catalog.menu_item(id))
            .map(|item| item.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_menu_collects_everything_once() {
        let catalog = Catalog::standard();
        let mut intents = DisplayIntents::new();
        intents.collect(&ToolCall::ShowMenuItem { menu_item_id: "coke".into() }, &catalog);
        intents.collect(&ToolCall::ShowMenu, &catalog);
        assert_eq!(intents.item_ids.len(), catalog.items.len());
        assert_eq!(intents.item_ids[0], "coke");
        assert!(!intents.show_store_map);
    }

    #[test]
    fn test_store_map_flag() {
        let catalog = Catalog::standard();
        let mut intents = DisplayIntents::new();
        assert!(intents.is_empty());
        let revealed = intents.collect(&ToolCall::ShowStoreLocations, &catalog).unwrap();
        assert!(revealed.store_map);
        assert!(intents.show_store_map);
        assert!(intents.item_ids.is_empty());
    }

    #[test]
    fn test_non_display_calls_ignored() {
        let catalog = Catalog::standard();
        let mut intents = DisplayIntents::new();
        assert!(intents.collect(&ToolCall::ShowCart, &catalog).is_none());
        assert!(intents
            .collect(&ToolCall::PlaceOrder { order_number: "X".into() }, &catalog)
            .is_none());
        assert!(intents.is_empty());
    }

    #[test]
    fn test_item_names() {
        let catalog = Catalog::standard();
        let mut intents = DisplayIntents::new();
        intents.collect(&ToolCall::ShowMenuItem { menu_item_id: "fries".into() }, &catalog);
        intents.collect(&ToolCall::ShowMenuItem { menu_item_id: "lemonade".into() }, &catalog);
        assert_eq!(intents.item_names(&catalog), vec!["Fries", "Lemonade"]);
    }
}
