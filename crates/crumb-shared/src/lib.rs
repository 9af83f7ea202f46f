//! Shared ordering core for Flame & Crumb.
//!
//! Pure data and pure functions: the catalog, the Order Record, the tool
//! vocabulary the model may call, the reducer that applies those calls, the
//! display-intent collector and the reply sanitizer. No I/O.

pub mod catalog;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod order;
pub mod reducer;
pub mod sanitize;
pub mod tools;

pub use catalog::{Catalog, MenuItem, Store, StoreId};
pub use dispatch::{ToolOutcome, TurnState};
pub use display::DisplayIntents;
pub use error::Rejection;
pub use order::{LineItem, OrderMode, OrderRecord, StoreSelection};
pub use tools::{EffectClass, ToolCall, ToolName, ToolSpec};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
