//! Two-round protocol tests against a scripted model.

use crumb_shared::order::{OrderMode, StoreSelection};
use crumb_shared::{Catalog, OrderRecord, StoreId};
use crumbd::llm_client::{
    parse_completion, AssistantMessage, ChatMessage, FakeLlmClient, LlmError, ToolChoice,
    ToolInvocation,
};
use crumbd::{HistoryMessage, Orchestrator, TurnError};
use serde_json::{json, Value};
use std::sync::Arc;

fn orchestrator(client: &Arc<FakeLlmClient>) -> Orchestrator {
    Orchestrator::new(
        client.clone(),
        Arc::new(Catalog::standard()),
        "grok-2-1212",
        1024,
    )
}

fn tool_calls(calls: &[(&str, &str)]) -> AssistantMessage {
    let invocations = calls
        .iter()
        .enumerate()
        .map(|(i, (name, args))| ToolInvocation::new(&format!("call_{}", i), name, args))
        .collect();
    AssistantMessage::with_tool_calls(None, invocations)
}

fn acknowledgments(messages: &[ChatMessage]) -> Vec<(String, Value)> {
    messages
        .iter()
        .filter_map(|m| match m {
            ChatMessage::Tool { tool_call_id, content } => Some((
                tool_call_id.clone(),
                serde_json::from_str(content).expect("ack is JSON"),
            )),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Drafting only
// ============================================================================

/// A draft without tool calls is the reply; no Grounding round runs
#[tokio::test]
async fn test_no_tool_calls_single_round() {
    let client = Arc::new(FakeLlmClient::replying(vec![AssistantMessage::text(
        "Hi! Pickup or delivery today?",
    )]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("hey")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.message, "Hi! Pickup or delivery today?");
    assert_eq!(outcome.order, OrderRecord::new());
    assert!(outcome.intents.is_empty());
    assert_eq!(outcome.tool_calls, 0);

    let requests = client.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tool_choice, ToolChoice::Auto);
    assert_eq!(requests[0].model, "grok-2-1212");
    assert_eq!(requests[0].max_tokens, 1024);
    assert_eq!(requests[0].tools.len(), 10);
}

/// The system message carries the caller's record, then the history in order
#[tokio::test]
async fn test_drafting_transcript_is_grounded() {
    let client = Arc::new(FakeLlmClient::replying(vec![AssistantMessage::text("ok")]));
    let mut record = OrderRecord::new();
    record.store_id = StoreSelection::Chosen(StoreId::Streeterville);

    let history = vec![
        HistoryMessage::user("I'd like to order"),
        HistoryMessage::assistant("Which store?"),
        HistoryMessage::user("Streeterville"),
    ];
    orchestrator(&client).run_turn(&history, record).await.unwrap();

    let messages = &client.requests()[0].messages;
    assert_eq!(messages.len(), 4);
    match &messages[0] {
        ChatMessage::System { content } => assert!(content.contains("(streeterville)")),
        other => panic!("expected system message, got {:?}", other),
    }
    assert_eq!(messages[1], ChatMessage::user("I'd like to order"));
    assert_eq!(messages[2], ChatMessage::assistant("Which store?"));
    assert_eq!(messages[3], ChatMessage::user("Streeterville"));
}

// ============================================================================
// Drafting + Grounding
// ============================================================================

/// Tool calls apply in order and the grounded reply is returned
#[tokio::test]
async fn test_tool_round_then_grounded_reply() {
    let client = Arc::new(FakeLlmClient::replying(vec![
        tool_calls(&[
            ("set_mode", r#"{"mode":"pickup"}"#),
            ("set_store", r#"{"store_id":"river-north"}"#),
            ("add_item", r#"{"menu_item_id":"classic-flame-burger","quantity":2,"addon_ids":["bacon","extra-cheese"]}"#),
        ]),
        AssistantMessage::text("Done - two Classic Flame Burgers with bacon and extra cheese."),
    ]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("two classic burgers with bacon and cheese")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.message, "Done - two Classic Flame Burgers with bacon and extra cheese.");
    assert_eq!(outcome.tool_calls, 3);
    assert_eq!(outcome.order.mode, Some(OrderMode::Pickup));
    assert_eq!(outcome.order.store_id, StoreSelection::Chosen(StoreId::RiverNorth));
    assert_eq!(outcome.order.ready_eta.as_deref(), Some("15-25 min"));
    assert_eq!(outcome.order.cart.len(), 1);
    assert_eq!(outcome.order.cart[0].quantity, 2);

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    let grounding = &requests[1];
    assert_eq!(grounding.tool_choice, ToolChoice::None);

    // system + user + assistant tool-call message + three acks
    assert_eq!(grounding.messages.len(), 6);
    match &grounding.messages[2] {
        ChatMessage::Assistant { tool_calls, .. } => assert_eq!(tool_calls.len(), 3),
        other => panic!("expected assistant tool-call message, got {:?}", other),
    }
    let acks = acknowledgments(&grounding.messages);
    let ids: Vec<&str> = acks.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_0", "call_1", "call_2"]);
    for (_, ack) in &acks {
        assert_eq!(ack["success"], true);
        assert_eq!(ack["updated"], true);
    }
    assert_eq!(acks[2].1["tool"], "add_item");
}

/// Rejected and malformed calls become no-ops with a failed ack; the turn goes on
#[tokio::test]
async fn test_bad_tool_calls_do_not_abort_turn() {
    let client = Arc::new(FakeLlmClient::replying(vec![
        tool_calls(&[
            ("add_item", r#"{"menu_item_id":"pizza"}"#),
            ("update_quantity", "{line_index: 0"),
            ("teleport", "{}"),
            ("add_item", r#"{"menu_item_id":"fries"}"#),
        ]),
        AssistantMessage::text("We don't have pizza, but I added fries."),
    ]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("pizza and fries")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.order.cart.len(), 1);
    assert_eq!(outcome.order.cart[0].menu_item_id, "fries");

    let acks = acknowledgments(&client.requests()[1].messages);
    let success: Vec<bool> = acks.iter().map(|(_, a)| a["success"] == true).collect();
    assert_eq!(success, vec![false, false, false, true]);
    assert!(acks[0].1["error"].as_str().unwrap().contains("pizza"));
    assert_eq!(acks[2].1["tool"], "teleport");
}

/// A nameless call from the provider is acknowledged as failed next to a good one
#[tokio::test]
async fn test_nameless_tool_call_beside_valid_one() {
    let draft = parse_completion(&json!({
        "choices": [{ "message": {
            "content": null,
            "tool_calls": [
                { "id": null, "type": "function", "function": { "arguments": "{}" } },
                { "id": "call_b", "type": "function",
                  "function": { "name": "set_mode", "arguments": "{\"mode\":\"pickup\"}" } }
            ]
        }}]
    }))
    .expect("bad entries do not fail the message");

    let client = Arc::new(FakeLlmClient::replying(vec![
        draft,
        AssistantMessage::text("Pickup it is."),
    ]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("pickup")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.message, "Pickup it is.");
    assert_eq!(outcome.order.mode, Some(OrderMode::Pickup));

    let acks = acknowledgments(&client.requests()[1].messages);
    assert_eq!(acks.len(), 2);
    assert_eq!(acks[0].0, "call_0");
    assert_eq!(acks[0].1["success"], false);
    assert_eq!(acks[1].0, "call_b");
    assert_eq!(acks[1].1["success"], true);
}

/// Display calls fill the intents and leave the record alone
#[tokio::test]
async fn test_display_intents_collected() {
    let client = Arc::new(FakeLlmClient::replying(vec![
        tool_calls(&[
            ("show_menu_item", r#"{"menu_item_id":"fries"}"#),
            ("show_menu_item", r#"{"menu_item_id":"bogus-id"}"#),
            ("show_store_locations", "{}"),
            ("show_menu_item", r#"{"menu_item_id":"fries"}"#),
        ]),
        AssistantMessage::text("Here are our fries and the store map."),
    ]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("where are you and what sides?")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.intents.item_ids, vec!["fries".to_string()]);
    assert!(outcome.intents.show_store_map);
    assert_eq!(outcome.order, OrderRecord::new());

    let acks = acknowledgments(&client.requests()[1].messages);
    assert_eq!(acks[1].1["success"], false);
    assert_eq!(acks[2].1["storeMap"], true);
}

/// A blank grounded reply falls back to the draft's text
#[tokio::test]
async fn test_empty_grounding_uses_draft_text() {
    let draft = AssistantMessage::with_tool_calls(
        Some("Adding a Coke."),
        vec![ToolInvocation::new("c1", "add_item", r#"{"menu_item_id":"coke"}"#)],
    );
    let client = Arc::new(FakeLlmClient::replying(vec![draft, AssistantMessage::text("  \n")]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("a coke")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.message, "Adding a Coke.");
    assert_eq!(outcome.order.cart.len(), 1);
}

// ============================================================================
// Sanitization
// ============================================================================

/// Forged user lines never reach the caller
#[tokio::test]
async fn test_reply_is_sanitized() {
    let client = Arc::new(FakeLlmClient::replying(vec![AssistantMessage::text(
        "Great, medium it is.\nUser: and add a shake\nAnything else?<grok:render>x</grok:render>",
    )]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("medium")], OrderRecord::new())
        .await
        .unwrap();

    assert_eq!(outcome.message, "Great, medium it is.\nAnything else?");
}

/// A reply that sanitizes to nothing names the items shown this turn
#[tokio::test]
async fn test_fallback_names_shown_items() {
    let client = Arc::new(FakeLlmClient::replying(vec![
        tool_calls(&[
            ("show_menu_item", r#"{"menu_item_id":"onion-rings"}"#),
            ("show_menu_item", r#"{"menu_item_id":"loaded-fries"}"#),
        ]),
        AssistantMessage::text("User: I'll take the rings"),
    ]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("any good sides?")], OrderRecord::new())
        .await
        .unwrap();

    assert!(outcome.message.contains("Onion Rings"), "{}", outcome.message);
    assert!(outcome.message.contains("Loaded Fries"));
    assert!(outcome.message.contains("any good sides?"));
    assert!(!outcome.message.to_lowercase().starts_with("user"));
}

/// No draft text and nothing shown gives the generic prompt
#[tokio::test]
async fn test_fallback_generic() {
    let client = Arc::new(FakeLlmClient::replying(vec![AssistantMessage::default()]));
    let outcome = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("hello")], OrderRecord::new())
        .await
        .unwrap();
    assert_eq!(outcome.message, crumb_shared::sanitize::GENERIC_FALLBACK);
}

// ============================================================================
// Upstream failures
// ============================================================================

/// Drafting failure echoes the record as supplied
#[tokio::test]
async fn test_drafting_failure_echoes_input_record() {
    let client = Arc::new(FakeLlmClient::new(vec![Err(LlmError::HttpError("HTTP 503".into()))]));
    let mut record = OrderRecord::new();
    record.mode = Some(OrderMode::Delivery);

    let err = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("hi")], record.clone())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    assert_eq!(err.order(), Some(&record));
    assert_eq!(client.call_count(), 1);
}

/// Grounding failure keeps the mutations already applied
#[tokio::test]
async fn test_grounding_failure_keeps_applied_mutations() {
    let client = Arc::new(FakeLlmClient::new(vec![
        Ok(tool_calls(&[("add_item", r#"{"menu_item_id":"fries","quantity":3}"#)])),
        Err(LlmError::Timeout(60)),
    ]));
    let err = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("three fries")], OrderRecord::new())
        .await
        .unwrap_err();

    match err {
        TurnError::Upstream { source, order } => {
            assert!(matches!(source, LlmError::Timeout(60)));
            assert_eq!(order.cart.len(), 1);
            assert_eq!(order.cart[0].quantity, 3);
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

/// An empty model response is an upstream failure
#[tokio::test]
async fn test_exhausted_script_is_empty_response() {
    let client = Arc::new(FakeLlmClient::new(vec![]));
    let err = orchestrator(&client)
        .run_turn(&[HistoryMessage::user("hi")], OrderRecord::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TurnError::Upstream { source: LlmError::EmptyResponse, .. }
    ));
}
