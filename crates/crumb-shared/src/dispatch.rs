//! Dispatcher: routes each tool call to the reducer or the collector and
//! produces the acknowledgment the model sees in the grounding round.

use crate::catalog::Catalog;
use crate::display::DisplayIntents;
use crate::order::OrderRecord;
use crate::reducer;
use crate::tools::{EffectClass, ToolCall};
use serde_json::{json, Value};

/// Result of dispatching one call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    pub tool: String,
    pub effect: EffectClass,
    pub success: bool,
    /// The Order Record changed
    pub updated: bool,
    /// Resolved item ids a display call surfaced
    pub shown: Vec<String>,
    pub store_map: bool,
    /// Rejection message when `success` is false
    pub error: Option<String>,
    /// Short rejection code, e.g. `unknown_menu_item`
    pub code: Option<&'static str>,
}

impl ToolOutcome {
    /// JSON body of the tool-result message
    pub fn acknowledgment(&self) -> Value {
        let mut ack = json!({
            "tool": self.tool,
            "success": self.success,
            "updated": self.updated,
        });
        if self.effect == EffectClass::DisplayIntent {
            ack["shown"] = json!(self.shown);
            if self.store_map {
                ack["storeMap"] = json!(true);
            }
        }
        if let Some(error) = &self.error {
            ack["error"] = json!(error);
        }
        if let Some(code) = self.code {
            ack["code"] = json!(code);
        }
        ack
    }
}

/// Working state for one turn's tool round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnState {
    pub record: OrderRecord,
    pub intents: DisplayIntents,
}

impl TurnState {
    pub fn new(record: OrderRecord) -> Self {
        Self {
            record,
            intents: DisplayIntents::new(),
        }
    }

    /// Apply one call in place.
    pub fn dispatch(&mut self, call: &ToolCall, catalog: &Catalog) -> ToolOutcome {
        let mut outcome = ToolOutcome {
            tool: call.name().to_string(),
            effect: call.effect(),
            success: true,
            updated: false,
            shown: Vec::new(),
            store_map: false,
            error: None,
            code: None,
        };

        if let Some(revealed) = self.intents.collect(call, catalog) {
            outcome.success = revealed.store_map || !revealed.item_ids.is_empty();
            if !outcome.success {
                outcome.error = Some("nothing to show for that id".to_string());
                outcome.code = Some("unknown_menu_item");
            }
            outcome.shown = revealed.item_ids;
            outcome.store_map = revealed.store_map;
            return outcome;
        }

        match reducer::try_apply(call, &self.record, catalog) {
            Ok(next) => {
                outcome.updated = next != self.record;
                self.record = next;
            }
            Err(rejection) => {
                outcome.success = false;
                outcome.error = Some(rejection.to_string());
                outcome.code = Some(rejection.code());
            }
        }
        outcome
    }
}
