//! Reducer: (tool call, record, catalog) -> next record.
//!
//! Pure and total. A call that fails validation returns the record unchanged;
//! `try_apply` additionally says why.

use crate::catalog::{AddOn, Catalog};
use crate::error::Rejection;
use crate::order::{
    AddOnSnapshot, Customization, LineItem, OrderRecord, StoreSelection, MAX_LINE_QUANTITY,
};
use crate::tools::{AddItemArgs, CustomizationPatch, ToolCall};
use std::collections::HashMap;

/// Apply one tool call. Never fails; invalid calls are no-ops.
pub fn apply(call: &ToolCall, record: &OrderRecord, catalog: &Catalog) -> OrderRecord {
    try_apply(call, record, catalog).unwrap_or_else(|_| record.clone())
}

/// Apply an unvalidated `(name, arguments)` pair straight from the model.
pub fn apply_raw(
    name: &str,
    raw_arguments: &str,
    record: &OrderRecord,
    catalog: &Catalog,
) -> OrderRecord {
    apply(&ToolCall::parse(name, raw_arguments), record, catalog)
}

/// Apply one tool call, reporting why it was rejected.
///
/// Display-intent and `show_cart` calls succeed without touching the record.
pub fn try_apply(
    call: &ToolCall,
    record: &OrderRecord,
    catalog: &Catalog,
) -> Result<OrderRecord, Rejection> {
    let mut next = record.clone();

    match call {
        ToolCall::SetStore { store_id } => {
            let store = catalog
                .store(store_id)
                .ok_or_else(|| Rejection::UnknownStore(store_id.clone()))?;
            next.store_id = StoreSelection::Chosen(store.id);
            next.ready_eta = Some(store.pickup_eta.clone());
        }

        ToolCall::SetMode { mode } => {
            next.mode = Some(*mode);
        }

        ToolCall::AddItem(args) => {
            let line = build_line(args, catalog)?;
            next.cart.push(line);
        }

        ToolCall::UpdateQuantity {
            line_index,
            quantity,
        } => {
            let idx = line_index_in(*line_index, &next)?;
            next.cart[idx].quantity = valid_quantity(*quantity)?;
        }

        ToolCall::UpdateLineCustomization(patch) => {
            let idx = line_index_in(patch.line_index, &next)?;
            let line = &mut next.cart[idx];
            ensure_customizable(line, catalog)?;
            let customization = line.customization.get_or_insert_with(Customization::default);
            merge(customization, patch);
        }

        ToolCall::PlaceOrder { order_number } => {
            if let Some(existing) = &record.order_number {
                return Err(Rejection::AlreadyPlaced(existing.clone()));
            }
            next.order_number = Some(order_number.clone());
        }

        ToolCall::ShowStoreLocations
        | ToolCall::ShowMenu
        | ToolCall::ShowMenuItem { .. }
        | ToolCall::ShowCart => {}

        ToolCall::Noop { name, reason } => {
            return Err(Rejection::Malformed(format!("{} ({})", name, reason)));
        }
    }

    Ok(next)
}

fn build_line(args: &AddItemArgs, catalog: &Catalog) -> Result<LineItem, Rejection> {
    let item = catalog
        .menu_item(&args.menu_item_id)
        .ok_or_else(|| Rejection::UnknownMenuItem(args.menu_item_id.clone()))?;
    let quantity = valid_quantity(args.quantity.unwrap_or(1))?;

    let addons = resolve_addons(&args.addon_ids, catalog);
    let add_ons = addons
        .iter()
        .map(|a| AddOnSnapshot {
            name: a.name.clone(),
            price: a.price,
        })
        .collect();

    let customization = item.is_entree().then(|| Customization {
        add_on_ids: addons.iter().map(|a| a.id.clone()).collect(),
        cooking_preference: args.cooking_preference,
        no_tomato: args.no_tomato,
        ..Default::default()
    });

    Ok(LineItem {
        menu_item_id: item.id.clone(),
        name: item.name.clone(),
        unit_price: item.price,
        quantity,
        add_ons,
        customization,
        line_label: None,
    })
}

/// Unknown ids and add-ons past their category cap are dropped silently.
fn resolve_addons<'a>(ids: &[String], catalog: &'a Catalog) -> Vec<&'a AddOn> {
    let mut per_category = HashMap::new();
    let mut resolved = Vec::new();

    for addon in ids.iter().filter_map(|id| catalog.addon(id)) {
        let count = per_category.entry(addon.category).or_insert(0usize);
        if addon.max_per_item.is_some_and(|max| *count >= max) {
            continue;
        }
        *count += 1;
        resolved.push(addon);
    }

    resolved
}

fn line_index_in(index: i64, record: &OrderRecord) -> Result<usize, Rejection> {
    let len = record.cart.len();
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(Rejection::LineOutOfRange { index, len })
}

fn valid_quantity(quantity: i64) -> Result<u32, Rejection> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| (1..=MAX_LINE_QUANTITY).contains(q))
        .ok_or(Rejection::InvalidQuantity(quantity))
}

/// Lines that already carry a customization stay editable even if the
/// catalog entry has since disappeared.
fn ensure_customizable(line: &LineItem, catalog: &Catalog) -> Result<(), Rejection> {
    if line.customization.is_some() {
        return Ok(());
    }
    match catalog.menu_item(&line.menu_item_id) {
        Some(item) if item.is_entree() => Ok(()),
        _ => Err(Rejection::NotCustomizable(line.name.clone())),
    }
}

fn merge(customization: &mut Customization, patch: &CustomizationPatch) {
    if let Some(pref) = patch.cooking_preference {
        customization.cooking_preference = Some(pref);
    }
    if let Some(flag) = patch.no_tomato {
        customization.no_tomato = Some(flag);
    }
    if let Some(flag) = patch.no_lettuce {
        customization.no_lettuce = Some(flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::CookingPreference;

    fn catalog() -> Catalog {
        Catalog::standard()
    }

    fn with_burger() -> OrderRecord {
        apply_raw(
            "add_item",
            r#"{"menu_item_id":"classic-flame-burger"}"#,
            &OrderRecord::new(),
            &catalog(),
        )
    }

    #[test]
    fn test_rejection_reasons() {
        let record = OrderRecord::new();
        let c = catalog();

        let err = try_apply(&ToolCall::parse("set_store", r#"{"store_id":"nowhere"}"#), &record, &c);
        assert_eq!(err, Err(Rejection::UnknownStore("nowhere".to_string())));

        let err = try_apply(
            &ToolCall::parse("update_quantity", r#"{"line_index":-1,"quantity":2}"#),
            &record,
            &c,
        );
        assert_eq!(err, Err(Rejection::LineOutOfRange { index: -1, len: 0 }));

        let err = try_apply(&ToolCall::parse("nope", "{}"), &record, &c).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn test_add_item_zero_quantity_rejected() {
        let record = apply_raw(
            "add_item",
            r#"{"menu_item_id":"fries","quantity":0}"#,
            &OrderRecord::new(),
            &catalog(),
        );
        assert!(record.cart.is_empty());
    }

    #[test]
    fn test_side_has_no_customization() {
        let record = apply_raw(
            "add_item",
            r#"{"menu_item_id":"fries","cooking_preference":"rare"}"#,
            &OrderRecord::new(),
            &catalog(),
        );
        assert_eq!(record.cart.len(), 1);
        assert!(record.cart[0].customization.is_none());

        let after = apply_raw(
            "update_line_customization",
            r#"{"line_index":0,"no_tomato":true}"#,
            &record,
            &catalog(),
        );
        assert_eq!(after, record);
    }

    #[test]
    fn test_sauce_cap() {
        let record = apply_raw(
            "add_item",
            r#"{"menu_item_id":"veggie-burger","addon_ids":["ketchup","mayo","mustard","bacon"]}"#,
            &OrderRecord::new(),
            &catalog(),
        );
        let names: Vec<&str> = record.cart[0].add_ons.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Ketchup", "Mayo", "Bacon"]);
        let ids = &record.cart[0].customization.as_ref().unwrap().add_on_ids;
        assert_eq!(ids, &vec!["ketchup", "mayo", "bacon"]);
    }

    #[test]
    fn test_customization_patch_without_fields_creates_empty_object() {
        let mut record = with_burger();
        record.cart[0].customization = None;
        let after = apply_raw(
            "update_line_customization",
            r#"{"line_index":0}"#,
            &record,
            &catalog(),
        );
        assert_eq!(after.cart[0].customization, Some(Customization::default()));
    }

    #[test]
    fn test_customization_merge_overwrites_only_named_field() {
        let record = apply_raw(
            "update_line_customization",
            r#"{"line_index":0,"cooking_preference":"rare","no_tomato":true}"#,
            &with_burger(),
            &catalog(),
        );
        let record = apply_raw(
            "update_line_customization",
            r#"{"line_index":0,"cooking_preference":"well-done"}"#,
            &record,
            &catalog(),
        );
        let cust = record.cart[0].customization.as_ref().unwrap();
        assert_eq!(cust.cooking_preference, Some(CookingPreference::WellDone));
        assert_eq!(cust.no_tomato, Some(true));
        assert_eq!(cust.no_lettuce, None);
    }

    #[test]
    fn test_place_order_only_once() {
        let c = catalog();
        let placed = apply_raw("place_order", r#"{"order_number":"FNC-1"}"#, &OrderRecord::new(), &c);
        let again = try_apply(&ToolCall::parse("place_order", r#"{"order_number":"FNC-2"}"#), &placed, &c);
        assert_eq!(again, Err(Rejection::AlreadyPlaced("FNC-1".to_string())));
        assert_eq!(apply_raw("place_order", r#"{"order_number":"FNC-2"}"#, &placed, &c), placed);
    }
}
