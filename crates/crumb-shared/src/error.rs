//! Error types for the ordering core.
//!
//! These never escape a turn: a rejected tool call leaves the record as it was
//! and the reason is reported back to the model in the tool acknowledgment.

use thiserror::Error;

/// Why a tool call had no effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("call ignored: {0}")]
    Malformed(String),

    #[error("unknown store id '{0}'")]
    UnknownStore(String),

    #[error("unknown menu item id '{0}'")]
    UnknownMenuItem(String),

    #[error("line index {index} is out of range for a cart of {len} line(s)")]
    LineOutOfRange { index: i64, len: usize },

    #[error("quantity must be between 1 and 99 (got {0})")]
    InvalidQuantity(i64),

    #[error("'{0}' is not an entree and cannot be customized")]
    NotCustomizable(String),

    #[error("order already placed as {0}")]
    AlreadyPlaced(String),
}

impl Rejection {
    /// Stable short code, used in logs and acknowledgments
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::Malformed(_) => "malformed",
            Rejection::UnknownStore(_) => "unknown_store",
            Rejection::UnknownMenuItem(_) => "unknown_menu_item",
            Rejection::LineOutOfRange { .. } => "line_out_of_range",
            Rejection::InvalidQuantity(_) => "invalid_quantity",
            Rejection::NotCustomizable(_) => "not_customizable",
            Rejection::AlreadyPlaced(_) => "already_placed",
        }
    }
}
