//! Catalog: stores, menu items and add-ons.
//!
//! Read-only reference data. Every reducer and collector function takes a
//! `&Catalog` explicitly, so tests can hand in a modified copy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store identifiers known to the ordering flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreId {
    RiverNorth,
    Streeterville,
    WestLoop,
}

impl StoreId {
    pub const ALL: [StoreId; 3] = [Self::RiverNorth, Self::Streeterville, Self::WestLoop];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RiverNorth => "river-north",
            Self::Streeterville => "streeterville",
            Self::WestLoop => "west-loop",
        }
    }

    /// Parse a wire id. Exact match only; the model is told the ids verbatim.
    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == id)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub distance: String,
    pub open_until: String,
    pub pickup_eta: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuCategory {
    Entree,
    Side,
    Drink,
}

/// Grouping used when the full menu is laid out for the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayGroup {
    Burgers,
    ChickenAndWings,
    Sides,
    Drinks,
}

impl DisplayGroup {
    /// Order in which groups are presented
    pub const DISPLAY_ORDER: [DisplayGroup; 4] = [
        Self::Burgers,
        Self::ChickenAndWings,
        Self::Sides,
        Self::Drinks,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Burgers => "Burgers",
            Self::ChickenAndWings => "Chicken & Wings",
            Self::Sides => "Sides",
            Self::Drinks => "Drinks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
    pub category: MenuCategory,
    pub display_group: DisplayGroup,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl MenuItem {
    pub fn is_entree(&self) -> bool {
        self.category == MenuCategory::Entree
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddOnCategory {
    Cheese,
    Protein,
    Vegetable,
    Sauce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOn {
    pub id: String,
    pub name: String,
    pub category: AddOnCategory,
    pub price: f64,
    /// Cap on add-ons of this category per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_item: Option<usize>,
}

/// Sauces: choose up to two per entree
pub const SAUCE_MAX_PER_ITEM: usize = 2;

/// The complete reference data set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub stores: Vec<Store>,
    pub items: Vec<MenuItem>,
    pub addons: Vec<AddOn>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    pub fn store(&self, id: &str) -> Option<&Store> {
        let id = StoreId::parse(id)?;
        self.stores.iter().find(|s| s.id == id)
    }

    pub fn menu_item(&self, id: &str) -> Option<&MenuItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn addon(&self, id: &str) -> Option<&AddOn> {
        self.addons.iter().find(|a| a.id == id)
    }

    /// Every menu item id, in catalog order
    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|i| i.id.as_str())
    }

    /// Items bucketed by display group, groups in `DisplayGroup::DISPLAY_ORDER`.
    /// Empty groups are omitted.
    pub fn items_by_display_group(&self) -> Vec<(DisplayGroup, Vec<&MenuItem>)> {
        DisplayGroup::DISPLAY_ORDER
            .iter()
            .map(|group| {
                let items: Vec<&MenuItem> = self
                    .items
                    .iter()
                    .filter(|i| i.display_group == *group)
                    .collect();
                (*group, items)
            })
            .filter(|(_, items)| !items.is_empty())
            .collect()
    }

    /// The Flame & Crumb menu and store list.
    pub fn standard() -> Self {
        Self {
            stores: vec![
                store(StoreId::RiverNorth, "Flame & Crumb - River North", "0.9 mi", "12:00 AM", "15-25 min"),
                store(StoreId::Streeterville, "Flame & Crumb - Streeterville", "1.4 mi", "11:00 PM", "20-30 min"),
                store(StoreId::WestLoop, "Flame & Crumb - West Loop", "2.6 mi", "11:00 PM", "25-40 min"),
            ],
            items: vec![
                item("classic-flame-burger", "Classic Flame Burger", 12.99, "Flame-grilled Angus beef, aged cheddar, lettuce, tomato, special sauce, brioche bun", MenuCategory::Entree, DisplayGroup::Burgers, &[], Some("https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80")),
                item("spicy-flame-burger", "Spicy Flame Burger", 9.49, "Flame-grilled beef, pepper jack, jalapenos, chipotle mayo, brioche bun", MenuCategory::Entree, DisplayGroup::Burgers, &["spicy"], Some("https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80")),
                item("spicy-combo", "Spicy Combo", 9.99, "Spicy Flame Burger + Fries. Best value under $10.", MenuCategory::Entree, DisplayGroup::Burgers, &["spicy", "combo"], Some("https://images.unsplash.com/photo-1568901346375-23c9450c58cd?w=400&q=80")),
                item("veggie-burger", "Veggie Burger", 11.99, "House-made black bean patty, avocado, lettuce, tomato, chipotle aioli", MenuCategory::Entree, DisplayGroup::Burgers, &[], Some("https://images.unsplash.com/photo-1594212699903-ec8a3eca50f5?w=400&q=80")),
                item("hot-wings", "Hot Wings (6 pc)", 6.99, "Crispy wings tossed in buffalo sauce with ranch", MenuCategory::Entree, DisplayGroup::ChickenAndWings, &["spicy"], Some("https://images.unsplash.com/photo-1567620832903-0fc476de5b2b?w=400&q=80")),
                item("chicken-sandwich", "Crispy Chicken Sandwich", 10.99, "Crispy chicken, pickles, mayo, brioche bun", MenuCategory::Entree, DisplayGroup::ChickenAndWings, &[], Some("https://images.unsplash.com/photo-1606755962773-d324e0a13086?w=400&q=80")),
                item("fries", "Fries", 3.99, "Crispy seasoned fries", MenuCategory::Side, DisplayGroup::Sides, &[], Some("https://images.unsplash.com/photo-1573080496219-bb080dd4f877?w=400&q=80")),
                item("loaded-fries", "Loaded Fries", 5.99, "Fries topped with cheese sauce and bacon", MenuCategory::Side, DisplayGroup::Sides, &[], Some("https://images.unsplash.com/photo-1573080496219-bb080dd4f877?w=400&q=80")),
                item("onion-rings", "Onion Rings", 4.49, "Beer-battered onion rings with ranch", MenuCategory::Side, DisplayGroup::Sides, &[], Some("https://images.unsplash.com/photo-1639024471283-03518883512d?w=400&q=80")),
                item("coleslaw", "Coleslaw", 2.99, "Creamy classic coleslaw", MenuCategory::Side, DisplayGroup::Sides, &[], None),
                item("side-salad", "Side Salad", 3.49, "Mixed greens, tomato, cucumber, vinaigrette", MenuCategory::Side, DisplayGroup::Sides, &[], None),
                item("coke", "Coke", 2.79, "Coca-Cola", MenuCategory::Drink, DisplayGroup::Drinks, &[], Some("https://images.unsplash.com/photo-1629203851122-3726ecdf080e?w=400&q=80")),
                item("diet-coke", "Diet Coke", 2.79, "Diet Coca-Cola", MenuCategory::Drink, DisplayGroup::Drinks, &[], None),
                item("lemonade", "Lemonade", 3.29, "Fresh-squeezed lemonade", MenuCategory::Drink, DisplayGroup::Drinks, &[], Some("https://images.unsplash.com/photo-1621263764928-df1444c5e859?w=400&q=80")),
                item("iced-tea", "Iced Tea", 2.99, "House brewed iced tea", MenuCategory::Drink, DisplayGroup::Drinks, &[], None),
                item("water", "Water", 0.0, "Still water", MenuCategory::Drink, DisplayGroup::Drinks, &[], None),
            ],
            addons: vec![
                addon("extra-cheese", "Extra Cheese", AddOnCategory::Cheese, 1.0),
                addon("vegan-cheese", "Vegan Cheese", AddOnCategory::Cheese, 1.5),
                addon("bacon", "Bacon", AddOnCategory::Protein, 1.5),
                addon("extra-patty", "Extra Patty", AddOnCategory::Protein, 3.0),
                addon("salmon", "Salmon", AddOnCategory::Protein, 4.0),
                addon("grilled-mushrooms", "Grilled Mushrooms", AddOnCategory::Protein, 0.0),
                addon("lettuce", "Lettuce", AddOnCategory::Vegetable, 0.0),
                addon("tomato", "Tomato", AddOnCategory::Vegetable, 0.0),
                addon("onions", "Onions", AddOnCategory::Vegetable, 0.0),
                addon("avocado", "Avocado", AddOnCategory::Vegetable, 1.5),
                addon("ketchup", "Ketchup", AddOnCategory::Sauce, 0.0),
                addon("mayo", "Mayo", AddOnCategory::Sauce, 0.0),
                addon("mustard", "Mustard", AddOnCategory::Sauce, 0.0),
                addon("special-sauce", "Special Sauce", AddOnCategory::Sauce, 0.5),
                addon("almond-butter", "Almond Butter Drizzle", AddOnCategory::Sauce, 0.75),
            ],
        }
    }
}

fn store(id: StoreId, name: &str, distance: &str, open_until: &str, pickup_eta: &str) -> Store {
    Store {
        id,
        name: name.to_string(),
        distance: distance.to_string(),
        open_until: open_until.to_string(),
        pickup_eta: pickup_eta.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn item(
    id: &str,
    name: &str,
    price: f64,
    description: &str,
    category: MenuCategory,
    display_group: DisplayGroup,
    tags: &[&str],
    image: Option<&str>,
) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        price,
        description: description.to_string(),
        category,
        display_group,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image: image.map(str::to_string),
    }
}

fn addon(id: &str, name: &str, category: AddOnCategory, price: f64) -> AddOn {
    let max_per_item = match category {
        AddOnCategory::Sauce => Some(SAUCE_MAX_PER_ITEM),
        _ => None,
    };
    AddOn {
        id: id.to_string(),
        name: name.to_string(),
        category,
        price,
        max_per_item,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_lookup() {
        let catalog = Catalog::standard();
        let store = catalog.store("river-north").unwrap();
        assert_eq!(store.pickup_eta, "15-25 min");
        assert!(catalog.store("lincoln-park").is_none());
        assert!(catalog.store("River-North").is_none());
    }

    #[test]
    fn test_store_id_wire_format() {
        let json = serde_json::to_string(&StoreId::WestLoop).unwrap();
        assert_eq!(json, "\"west-loop\"");
        for id in StoreId::ALL {
            assert_eq!(StoreId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let catalog = Catalog::standard();
        let mut ids: Vec<&str> = catalog.item_ids().collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);

        let mut addon_ids: Vec<&str> = catalog.addons.iter().map(|a| a.id.as_str()).collect();
        let total = addon_ids.len();
        addon_ids.sort();
        addon_ids.dedup();
        assert_eq!(addon_ids.len(), total);
    }

    #[test]
    fn test_display_groups_cover_every_item() {
        let catalog = Catalog::standard();
        let grouped = catalog.items_by_display_group();
        let count: usize = grouped.iter().map(|(_, items)| items.len()).sum();
        assert_eq!(count, catalog.items.len());
        assert_eq!(grouped[0].0, DisplayGroup::Burgers);
        assert_eq!(grouped.last().unwrap().0, DisplayGroup::Drinks);
    }

    #[test]
    fn test_sauces_are_capped() {
        let catalog = Catalog::standard();
        let ketchup = catalog.addon("ketchup").unwrap();
        assert_eq!(ketchup.max_per_item, Some(SAUCE_MAX_PER_ITEM));
        assert_eq!(catalog.addon("bacon").unwrap().max_per_item, None);
    }
}
