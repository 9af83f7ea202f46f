//! Conversation orchestrator: the two-round turn protocol.
//!
//! Drafting: history + grounded instructions + tool schema, tools allowed.
//! If the draft carries tool calls they are applied in order, each answered
//! with a tool-result acknowledgment, and a Grounding round runs with tools
//! disabled so the reply describes the state as actually applied. The final
//! text always goes through the sanitizer.

use crate::error::TurnError;
use crate::llm_client::{AssistantMessage, ChatMessage, ChatRequest, LlmClient, ToolChoice};
use crate::prompts;
use crumb_shared::sanitize::{sanitize, Fallback};
use crumb_shared::tools::{tool_specs, ToolSpec};
use crumb_shared::{Catalog, DisplayIntents, OrderRecord, ToolCall, TurnState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Speaker of a history entry. Only these two are accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior turn supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl HistoryMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    fn to_chat(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(self.content.clone()),
            Role::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// Everything a finished turn hands back to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Sanitized reply text, never empty
    pub message: String,
    pub order: OrderRecord,
    pub intents: DisplayIntents,
    /// Tool calls applied this turn, in order
    pub tool_calls: usize,
}

/// Runs turns against one model client and catalog
pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    catalog: Arc<Catalog>,
    tools: Vec<ToolSpec>,
    model: String,
    max_tokens: u32,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        catalog: Arc<Catalog>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let tools = tool_specs(&catalog);
        Self {
            client,
            catalog,
            tools,
            model: model.into(),
            max_tokens,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn request(&self, messages: Vec<ChatMessage>, tool_choice: ToolChoice) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            tools: self.tools.clone(),
            tool_choice,
            max_tokens: self.max_tokens,
        }
    }

    /// Run one turn. On upstream failure the error carries the record as it
    /// stood at that point: unchanged if Drafting failed, with the applied
    /// tool calls if Grounding failed.
    pub async fn run_turn(
        &self,
        history: &[HistoryMessage],
        order: OrderRecord,
    ) -> Result<TurnOutcome, TurnError> {
        let mut transcript = Vec::with_capacity(history.len() + 4);
        transcript.push(ChatMessage::system(prompts::system_prompt(&order, &self.catalog)));
        transcript.extend(history.iter().map(HistoryMessage::to_chat));

        // Drafting
        let draft = match self
            .client
            .chat(&self.request(transcript.clone(), ToolChoice::Auto))
            .await
        {
            Ok(draft) => draft,
            Err(e) => {
                error!("Drafting round failed: {}", e);
                return Err(TurnError::upstream(e, order));
            }
        };

        let mut state = TurnState::new(order);

        let raw_reply = if draft.tool_calls.is_empty() {
            draft.content.clone().unwrap_or_default()
        } else {
            self.apply_tool_calls(&draft, &mut state, &mut transcript);

            // Grounding
            let grounded = match self
                .client
                .chat(&self.request(transcript, ToolChoice::None))
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Grounding round failed after {} tool calls: {}", draft.tool_calls.len(), e);
                    return Err(TurnError::upstream(e, state.record));
                }
            };

            grounded
                .content
                .filter(|text| !text.trim().is_empty())
                .or(draft.content)
                .unwrap_or_default()
        };

        let shown = state.intents.item_names(&self.catalog);
        let fallback = Fallback {
            shown_items: shown,
            last_user_message: last_user_message(history),
        };
        let message = sanitize(&raw_reply, &fallback);
        if message != raw_reply.trim() {
            debug!("Reply sanitized ({} -> {} chars)", raw_reply.len(), message.len());
        }

        let tool_calls = draft.tool_calls.len();
        info!(
            "Turn complete: {} tool calls, {} cart lines, {} items shown",
            tool_calls,
            state.record.cart.len(),
            state.intents.item_ids.len()
        );

        Ok(TurnOutcome {
            message,
            order: state.record,
            intents: state.intents,
            tool_calls,
        })
    }

    /// Dispatch every call of the draft in order and extend the transcript
    /// with the assistant's tool-call message and one acknowledgment per call.
    fn apply_tool_calls(
        &self,
        draft: &AssistantMessage,
        state: &mut TurnState,
        transcript: &mut Vec<ChatMessage>,
    ) {
        transcript.push(draft.to_message());

        for invocation in &draft.tool_calls {
            let call = ToolCall::parse(&invocation.function.name, &invocation.function.arguments);
            let outcome = state.dispatch(&call, &self.catalog);

            if outcome.success {
                debug!(
                    "Applied {} (updated={}) args={}",
                    outcome.tool, outcome.updated, invocation.function.arguments
                );
            } else {
                warn!(
                    "Tool call {} had no effect: {} args={}",
                    outcome.tool,
                    outcome.error.as_deref().unwrap_or("rejected"),
                    invocation.function.arguments
                );
            }

            transcript.push(ChatMessage::tool_result(
                invocation.id.clone(),
                outcome.acknowledgment().to_string(),
            ));
        }
    }
}

fn last_user_message(history: &[HistoryMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}
