//! Tool Schema: the closed vocabulary the model may invoke.
//!
//! Model output is untrusted. Raw `(name, arguments)` pairs are parsed into a
//! strict `ToolCall` here, before any business logic sees them. Anything that
//! does not fit becomes `ToolCall::Noop`.
//!
//! Argument parsing rules:
//! - Arguments that are not valid JSON, or not a JSON object, parse as `{}`
//! - Missing or mistyped required fields make the whole call a `Noop`
//! - Optional decorative fields (cooking preference, exclusion flags) are
//!   dropped individually when mistyped; the rest of the call still applies
//! - Numbers must be whole; `2` and `2.0` are both accepted

use crate::catalog::Catalog;
use crate::order::{CookingPreference, OrderMode, MAX_LINE_QUANTITY};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Tool names, as exposed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SetStore,
    SetMode,
    AddItem,
    UpdateQuantity,
    UpdateLineCustomization,
    ShowStoreLocations,
    ShowMenu,
    ShowMenuItem,
    ShowCart,
    PlaceOrder,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        Self::SetStore,
        Self::SetMode,
        Self::AddItem,
        Self::UpdateQuantity,
        Self::UpdateLineCustomization,
        Self::ShowStoreLocations,
        Self::ShowMenu,
        Self::ShowMenuItem,
        Self::ShowCart,
        Self::PlaceOrder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetStore => "set_store",
            Self::SetMode => "set_mode",
            Self::AddItem => "add_item",
            Self::UpdateQuantity => "update_quantity",
            Self::UpdateLineCustomization => "update_line_customization",
            Self::ShowStoreLocations => "show_store_locations",
            Self::ShowMenu => "show_menu",
            Self::ShowMenuItem => "show_menu_item",
            Self::ShowCart => "show_cart",
            Self::PlaceOrder => "place_order",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn effect(&self) -> EffectClass {
        match self {
            Self::SetStore
            | Self::SetMode
            | Self::AddItem
            | Self::UpdateQuantity
            | Self::UpdateLineCustomization
            | Self::PlaceOrder => EffectClass::Mutation,
            Self::ShowStoreLocations | Self::ShowMenu | Self::ShowMenuItem => {
                EffectClass::DisplayIntent
            }
            Self::ShowCart => EffectClass::NoOp,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tool call is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectClass {
    /// Changes the Order Record
    Mutation,
    /// Reveals catalog data to the user; never changes the record
    DisplayIntent,
    /// Touches nothing
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddItemArgs {
    pub menu_item_id: String,
    /// `None` means the default of 1
    #[serde(default, deserialize_with = "optional_whole_number")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_ids")]
    pub addon_ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cooking_preference: Option<CookingPreference>,
    #[serde(default, deserialize_with = "lenient")]
    pub no_tomato: Option<bool>,
}

/// Field-level patch for one cart line. `None` fields are left alone.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomizationPatch {
    #[serde(deserialize_with = "whole_number")]
    pub line_index: i64,
    #[serde(default, deserialize_with = "lenient")]
    pub cooking_preference: Option<CookingPreference>,
    #[serde(default, deserialize_with = "lenient")]
    pub no_tomato: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub no_lettuce: Option<bool>,
}

#[derive(Deserialize)]
struct SetStoreArgs {
    store_id: String,
}

#[derive(Deserialize)]
struct SetModeArgs {
    mode: OrderMode,
}

#[derive(Deserialize)]
struct UpdateQuantityArgs {
    #[serde(deserialize_with = "whole_number")]
    line_index: i64,
    #[serde(deserialize_with = "whole_number")]
    quantity: i64,
}

#[derive(Deserialize)]
struct MenuItemArgs {
    menu_item_id: String,
}

#[derive(Deserialize)]
struct PlaceOrderArgs {
    order_number: String,
}

/// A validated tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Store id is resolved against the catalog by the reducer
    SetStore { store_id: String },
    SetMode { mode: OrderMode },
    AddItem(AddItemArgs),
    /// Index and quantity are range-checked by the reducer
    UpdateQuantity { line_index: i64, quantity: i64 },
    UpdateLineCustomization(CustomizationPatch),
    ShowStoreLocations,
    ShowMenu,
    ShowMenuItem { menu_item_id: String },
    ShowCart,
    PlaceOrder { order_number: String },
    /// Unknown tool, or arguments that did not fit the tool's shape
    Noop { name: String, reason: String },
}

impl ToolCall {
    /// Parse a raw invocation as emitted by the model. Never fails.
    pub fn parse(name: &str, raw_arguments: &str) -> Self {
        Self::from_value(name, parse_arguments(raw_arguments))
    }

    /// Validate already-decoded arguments into a typed call.
    pub fn from_value(name: &str, args: Value) -> Self {
        let Some(tool) = ToolName::parse(name) else {
            return Self::noop(name, "unknown tool");
        };

        let parsed = match tool {
            ToolName::SetStore => {
                typed::<SetStoreArgs>(args).map(|a| Self::SetStore { store_id: a.store_id })
            }
            ToolName::SetMode => typed::<SetModeArgs>(args).map(|a| Self::SetMode { mode: a.mode }),
            ToolName::AddItem => typed::<AddItemArgs>(args).map(Self::AddItem),
            ToolName::UpdateQuantity => {
                typed::<UpdateQuantityArgs>(args).map(|a| Self::UpdateQuantity {
                    line_index: a.line_index,
                    quantity: a.quantity,
                })
            }
            ToolName::UpdateLineCustomization => {
                typed::<CustomizationPatch>(args).map(Self::UpdateLineCustomization)
            }
            ToolName::ShowStoreLocations => Ok(Self::ShowStoreLocations),
            ToolName::ShowMenu => Ok(Self::ShowMenu),
            ToolName::ShowMenuItem => typed::<MenuItemArgs>(args).map(|a| Self::ShowMenuItem {
                menu_item_id: a.menu_item_id,
            }),
            ToolName::ShowCart => Ok(Self::ShowCart),
            ToolName::PlaceOrder => typed::<PlaceOrderArgs>(args).map(|a| Self::PlaceOrder {
                order_number: a.order_number,
            }),
        };

        parsed.unwrap_or_else(|e| Self::noop(name, &e.to_string()))
    }

    fn noop(name: &str, reason: &str) -> Self {
        Self::Noop {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// `None` for `Noop`
    pub fn tool(&self) -> Option<ToolName> {
        Some(match self {
            Self::SetStore { .. } => ToolName::SetStore,
            Self::SetMode { .. } => ToolName::SetMode,
            Self::AddItem(_) => ToolName::AddItem,
            Self::UpdateQuantity { .. } => ToolName::UpdateQuantity,
            Self::UpdateLineCustomization(_) => ToolName::UpdateLineCustomization,
            Self::ShowStoreLocations => ToolName::ShowStoreLocations,
            Self::ShowMenu => ToolName::ShowMenu,
            Self::ShowMenuItem { .. } => ToolName::ShowMenuItem,
            Self::ShowCart => ToolName::ShowCart,
            Self::PlaceOrder { .. } => ToolName::PlaceOrder,
            Self::Noop { .. } => return None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Noop { name, .. } => name.as_str(),
            other => other.tool().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    pub fn effect(&self) -> EffectClass {
        self.tool().map(|t| t.effect()).unwrap_or(EffectClass::NoOp)
    }
}

/// Decode model-supplied arguments. Malformed input degrades to `{}`.
pub fn parse_arguments(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => Value::Object(Map::new()),
    }
}

fn typed<T: DeserializeOwned>(args: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(args)
}

fn to_whole(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() <= i64::MAX as f64 / 2.0).then_some(n as i64)
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let n = f64::deserialize(deserializer)?;
    to_whole(n).ok_or_else(|| D::Error::custom(format!("expected a whole number, got {}", n)))
}

fn optional_whole_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(n) => to_whole(n)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a whole number, got {}", n))),
    }
}

/// Mistyped values become `None` instead of failing the call.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Keeps the string entries of an array; anything else is an empty list.
fn lenient_ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Function declaration handed to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the arguments object
    pub parameters: Value,
}

impl ToolSpec {
    fn new(tool: ToolName, description: &str, parameters: Value) -> Self {
        Self {
            name: tool.as_str().to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Declarations for every tool, with enums filled from the catalog.
pub fn tool_specs(catalog: &Catalog) -> Vec<ToolSpec> {
    let store_ids: Vec<&str> = catalog.stores.iter().map(|s| s.id.as_str()).collect();
    let preferences: Vec<&str> = CookingPreference::ALL.iter().map(|p| p.as_str()).collect();
    let no_params = json!({ "type": "object", "properties": {} });

    vec![
        ToolSpec::new(
            ToolName::SetStore,
            "Set the chosen store (e.g. after the user picks River North or gives a ZIP you resolve to a store).",
            json!({
                "type": "object",
                "properties": { "store_id": { "type": "string", "enum": store_ids } },
                "required": ["store_id"],
            }),
        ),
        ToolSpec::new(
            ToolName::SetMode,
            "Set pickup or delivery.",
            json!({
                "type": "object",
                "properties": { "mode": { "type": "string", "enum": ["pickup", "delivery"] } },
                "required": ["mode"],
            }),
        ),
        ToolSpec::new(
            ToolName::AddItem,
            "Add a menu item to the cart. Entrees may include addon_ids, cooking_preference and no_tomato. Sides and drinks only need menu_item_id and quantity.",
            json!({
                "type": "object",
                "properties": {
                    "menu_item_id": { "type": "string", "description": "e.g. classic-flame-burger, fries, coke" },
                    "quantity": { "type": "integer", "default": 1, "minimum": 1, "maximum": MAX_LINE_QUANTITY },
                    "addon_ids": { "type": "array", "items": { "type": "string" }, "description": "Add-on ids" },
                    "cooking_preference": { "type": "string", "enum": preferences },
                    "no_tomato": { "type": "boolean" },
                },
                "required": ["menu_item_id"],
            }),
        ),
        ToolSpec::new(
            ToolName::UpdateQuantity,
            "Change the quantity of a cart line. line_index is 0-based from the cart list.",
            json!({
                "type": "object",
                "properties": {
                    "line_index": { "type": "integer", "minimum": 0 },
                    "quantity": { "type": "integer", "minimum": 1, "maximum": MAX_LINE_QUANTITY },
                },
                "required": ["line_index", "quantity"],
            }),
        ),
        ToolSpec::new(
            ToolName::UpdateLineCustomization,
            "Update one line's customization, e.g. 'second burger well done' or 'first burger no tomato'. line_index is 0-based. Only the fields you pass are changed.",
            json!({
                "type": "object",
                "properties": {
                    "line_index": { "type": "integer", "minimum": 0 },
                    "cooking_preference": { "type": "string", "enum": preferences },
                    "no_tomato": { "type": "boolean" },
                    "no_lettuce": { "type": "boolean" },
                },
                "required": ["line_index"],
            }),
        ),
        ToolSpec::new(
            ToolName::ShowStoreLocations,
            "Show the user a map of nearby store locations.",
            no_params.clone(),
        ),
        ToolSpec::new(
            ToolName::ShowMenu,
            "Show the user the full menu with pictures.",
            no_params.clone(),
        ),
        ToolSpec::new(
            ToolName::ShowMenuItem,
            "Show the user one menu item card. Call once per item you recommend.",
            json!({
                "type": "object",
                "properties": { "menu_item_id": { "type": "string" } },
                "required": ["menu_item_id"],
            }),
        ),
        ToolSpec::new(
            ToolName::ShowCart,
            "Call when you are about to show the user their cart / order summary.",
            no_params,
        ),
        ToolSpec::new(
            ToolName::PlaceOrder,
            "Call when the user has completed checkout. Sets the order number and marks the order placed.",
            json!({
                "type": "object",
                "properties": { "order_number": { "type": "string", "description": "e.g. FNC-510284" } },
                "required": ["order_number"],
            }),
        ),
    ]
}
