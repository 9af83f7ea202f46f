//! Order Record: the state threaded through every chat turn.
//!
//! The caller owns the record. It is sent with each request and handed back
//! (possibly changed) with each response; nothing here is kept between turns.

use crate::catalog::StoreId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Estimated sales tax applied to the subtotal
pub const TAX_RATE: f64 = 0.10;

/// Pickup orders carry no fee
pub const PICKUP_FEE: f64 = 0.0;

/// Largest quantity a single cart line may hold
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Which store the order is for.
///
/// Wire format: field absent = `Unset`, `null` = `Declined`, string = `Chosen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSelection {
    /// Never asked
    #[default]
    Unset,
    /// Asked, user had no preference yet
    Declined,
    Chosen(StoreId),
}

impl StoreSelection {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

}

impl Serialize for StoreSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Chosen(id) => id.serialize(serializer),
            Self::Unset | Self::Declined => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for StoreSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Absent fields never reach here; `#[serde(default)]` yields Unset.
        Ok(match Option::<StoreId>::deserialize(deserializer)? {
            Some(id) => Self::Chosen(id),
            None => Self::Declined,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderMode {
    Pickup,
    Delivery,
}

impl OrderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CookingPreference {
    Rare,
    MediumRare,
    Medium,
    MediumWell,
    WellDone,
}

impl CookingPreference {
    pub const ALL: [CookingPreference; 5] = [
        Self::Rare,
        Self::MediumRare,
        Self::Medium,
        Self::MediumWell,
        Self::WellDone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rare => "rare",
            Self::MediumRare => "medium-rare",
            Self::Medium => "medium",
            Self::MediumWell => "medium-well",
            Self::WellDone => "well-done",
        }
    }
}

impl fmt::Display for CookingPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Add-on captured when the line was created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOnSnapshot {
    pub name: String,
    pub price: f64,
}

/// Per-line preparation choices. Entrees only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
    #[serde(default)]
    pub add_on_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooking_preference: Option<CookingPreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tomato: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_lettuce: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Customization {
    /// Display modifiers, e.g. `["medium-well", "no tomato"]`
    pub fn modifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(pref) = self.cooking_preference {
            out.push(pref.to_string());
        }
        if self.no_tomato == Some(true) {
            out.push("no tomato".to_string());
        }
        if self.no_lettuce == Some(true) {
            out.push("no lettuce".to_string());
        }
        if let Some(notes) = self.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            out.push(notes.trim().to_string());
        }
        out
    }
}

/// One cart entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: f64,
    /// Always within `1..=MAX_LINE_QUANTITY`, also for caller-supplied records
    #[serde(deserialize_with = "line_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub add_ons: Vec<AddOnSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customization: Option<Customization>,
    /// e.g. "Burger #2" when several lines share an entree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_label: Option<String>,
}

impl LineItem {
    /// Modifiers for display. A missing customization and an empty one render the same.
    pub fn modifiers(&self) -> Vec<String> {
        self.customization
            .as_ref()
            .map(Customization::modifiers)
            .unwrap_or_default()
    }

    /// Saturates instead of overflowing on absurd caller-supplied prices.
    pub fn line_total_cents(&self) -> i64 {
        let each = self
            .add_ons
            .iter()
            .fold(to_cents(self.unit_price), |acc, a| acc.saturating_add(to_cents(a.price)));
        each.saturating_mul(i64::from(self.quantity))
    }

    /// One-line description, e.g.
    /// `2x Classic Flame Burger @ $12.99 each + Bacon (+$1.50) - medium`
    pub fn describe(&self) -> String {
        let mut text = format!(
            "{}x {} @ {} each",
            self.quantity,
            self.name,
            format_money(self.unit_price)
        );
        if !self.add_ons.is_empty() {
            let add_ons: Vec<String> = self
                .add_ons
                .iter()
                .map(|a| format!("{} (+{})", a.name, format_money(a.price)))
                .collect();
            text.push_str(" + ");
            text.push_str(&add_ons.join(", "));
        }
        for modifier in self.modifiers() {
            text.push_str(" - ");
            text.push_str(&modifier);
        }
        if let Some(label) = &self.line_label {
            text.push_str(&format!(" [{}]", label));
        }
        text
    }
}

/// The serializable order snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, skip_serializing_if = "StoreSelection::is_unset")]
    pub store_id: StoreSelection,
    #[serde(default)]
    pub mode: Option<OrderMode>,
    #[serde(default)]
    pub cart: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_eta: Option<String>,
    /// Set once the order is placed; the sole "placed" signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
}

impl OrderRecord {
    /// Fresh record: empty cart, store and mode unset
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_placed(&self) -> bool {
        self.order_number.is_some()
    }

    pub fn summary(&self) -> OrderSummary {
        let subtotal = self
            .cart
            .iter()
            .fold(0i64, |acc, line| acc.saturating_add(line.line_total_cents()));
        let tax = (subtotal as f64 * TAX_RATE).round() as i64;
        let fee = to_cents(PICKUP_FEE);
        OrderSummary {
            subtotal: from_cents(subtotal),
            tax: from_cents(tax),
            pickup_fee: from_cents(fee),
            total: from_cents(subtotal.saturating_add(tax).saturating_add(fee)),
            item_count: self
                .cart
                .iter()
                .fold(0u32, |acc, line| acc.saturating_add(line.quantity)),
        }
    }
}

/// Totals shown next to the cart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub subtotal: f64,
    pub tax: f64,
    pub pickup_fee: f64,
    pub total: f64,
    pub item_count: u32,
}

/// `$12.99`
pub fn format_money(dollars: f64) -> String {
    let cents = to_cents(dollars);
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, cents / 100, cents % 100)
}

fn line_quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let quantity = u32::deserialize(deserializer)?;
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(serde::de::Error::custom(format!(
            "quantity must be between 1 and {} (got {})",
            MAX_LINE_QUANTITY, quantity
        )))
    }
}

fn to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}
