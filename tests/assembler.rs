mod common;

use common::{file_search, function_call, text_message};
use docbot::assembler::Assembler;
use docbot::error::ChatError;
use docbot::models::{OutputItem, PartKey, StreamEvent, ToolCallDescriptor, ToolCallKind};
use docbot::transport::TurnEvent;
use proptest::prelude::*;
use serde_json::json;

fn run(events: Vec<StreamEvent>) -> (Assembler, Vec<TurnEvent>) {
    let mut assembler = Assembler::new();
    let notifications = events
        .into_iter()
        .filter_map(|e| assembler.apply(e))
        .collect();
    (assembler, notifications)
}

fn delta(item_id: &str, index: u32, text: &str) -> StreamEvent {
    StreamEvent::TextDelta {
        item_id: item_id.to_string(),
        content_index: index,
        delta: text.to_string(),
    }
}

fn part_added(item_id: &str, index: u32) -> StreamEvent {
    StreamEvent::ContentPartAdded {
        item_id: item_id.to_string(),
        content_index: index,
    }
}

fn text_done(item_id: &str, index: u32) -> StreamEvent {
    StreamEvent::TextDone {
        item_id: item_id.to_string(),
        content_index: index,
    }
}

#[test]
fn test_text_message_is_finalized_in_full() {
    let (assembler, notifications) = run(text_message("msg_1", "Hello, how can I help?"));

    let finalized: Vec<&TurnEvent> = notifications
        .iter()
        .filter(|n| matches!(n, TurnEvent::MessageFinalized { .. }))
        .collect();
    assert_eq!(
        finalized,
        vec![&TurnEvent::MessageFinalized {
            key: PartKey::new("msg_1", 0),
            text: "Hello, how can I help?".to_string(),
        }]
    );

    let assembly = assembler.finish();
    assert!(assembly.is_complete());
    assert_eq!(assembly.text(), "Hello, how can I help?");
    assert!(assembly.stats.is_clean());
}

#[test]
fn test_delta_before_part_added_is_dropped() {
    let (assembler, notifications) = run(vec![
        delta("msg_1", 0, "lost"),
        part_added("msg_1", 0),
        delta("msg_1", 0, "kept"),
        text_done("msg_1", 0),
    ]);

    assert!(!notifications.iter().any(|n| matches!(
        n,
        TurnEvent::TokenAppended { delta, .. } if delta == "lost"
    )));
    assert_eq!(assembler.stats().dropped_deltas, 1);

    let assembly = assembler.finish();
    assert_eq!(assembly.texts, vec!["kept".to_string()]);
    assert!(assembly.incomplete_error().is_none());
}

#[test]
fn test_step_without_results_closes_with_empty_list() {
    let descriptor = ToolCallDescriptor {
        item_id: "fs_1".to_string(),
        call_id: "fs_1".to_string(),
        name: "file_search".to_string(),
        kind: ToolCallKind::Hosted,
        arguments: json!({"queries": ["refunds"]}),
        results: None,
    };
    let (_, notifications) = run(vec![
        StreamEvent::ItemAdded {
            item: OutputItem::ToolCall(descriptor.clone()),
        },
        StreamEvent::ItemDone {
            item: OutputItem::ToolCall(descriptor),
        },
    ]);

    let output = notifications
        .iter()
        .find_map(|n| match n {
            TurnEvent::ToolStepClosed { output, .. } => Some(output.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(output, "[]");
    assert!(serde_json::from_str::<serde_json::Value>(&output).is_ok());
}

#[test]
fn test_item_done_without_added_is_noop() {
    let mut events = file_search("fs_1", json!(["pricing"]), json!([]));
    events.remove(0);
    let (assembler, notifications) = run(events);

    assert!(notifications.is_empty());
    assert_eq!(assembler.stats().unmatched_done, 1);
    let assembly = assembler.finish();
    assert!(assembly.tool_calls.is_empty());
    assert!(assembly.is_complete());
}

#[test]
fn test_added_and_done_close_exactly_one_step() {
    let results = json!([{ "file_id": "file_1", "filename": "billing.md", "score": 0.91, "text": "Plans start at $10." }]);
    let (assembler, notifications) = run(file_search("fs_1", json!(["pricing plans"]), results.clone()));

    let closed: Vec<&TurnEvent> = notifications
        .iter()
        .filter(|n| matches!(n, TurnEvent::ToolStepClosed { .. }))
        .collect();
    assert_eq!(closed.len(), 1);
    match closed[0] {
        TurnEvent::ToolStepClosed {
            item_id,
            name,
            input,
            output,
        } => {
            assert_eq!(item_id, "fs_1");
            assert_eq!(name, "file_search");
            assert_eq!(input, &serde_json::to_string_pretty(&json!(["pricing plans"])).unwrap());
            assert_eq!(output, &serde_json::to_string_pretty(&results).unwrap());
        }
        _ => unreachable!(),
    }

    let assembly = assembler.finish();
    assert_eq!(assembly.tool_calls.len(), 1);
    // Hosted calls are executed by the provider.
    assert!(assembly.dispatchable().is_empty());
}

#[test]
fn test_second_item_done_is_ignored() {
    let mut events = function_call("fc_1", "call_1", "generate_component", json!({"query": "card"}));
    events.push(events[1].clone());
    let (assembler, notifications) = run(events);

    let closed = notifications
        .iter()
        .filter(|n| matches!(n, TurnEvent::ToolStepClosed { .. }))
        .count();
    assert_eq!(closed, 1);
    assert_eq!(assembler.stats().unmatched_done, 1);
}

#[test]
fn test_text_done_twice_is_idempotent() {
    let (assembler, notifications) = run(vec![
        part_added("msg_1", 0),
        delta("msg_1", 0, "once"),
        text_done("msg_1", 0),
        text_done("msg_1", 0),
    ]);

    let finalized = notifications
        .iter()
        .filter(|n| matches!(n, TurnEvent::MessageFinalized { .. }))
        .count();
    assert_eq!(finalized, 1);
    assert_eq!(assembler.stats().unmatched_text_done, 1);
    assert_eq!(assembler.finish().texts, vec!["once".to_string()]);
}

#[test]
fn test_interleaved_parts_do_not_merge() {
    let (assembler, _) = run(vec![
        part_added("msg_1", 0),
        part_added("msg_1", 1),
        delta("msg_1", 0, "first "),
        delta("msg_1", 1, "second "),
        delta("msg_1", 0, "part"),
        delta("msg_1", 1, "part"),
        text_done("msg_1", 1),
        text_done("msg_1", 0),
    ]);

    let assembly = assembler.finish();
    assert_eq!(
        assembly.texts,
        vec!["second part".to_string(), "first part".to_string()]
    );
}

#[test]
fn test_open_items_report_incomplete_turn() {
    let mut events = vec![part_added("msg_1", 0), delta("msg_1", 0, "partial")];
    events.push(function_call("fc_1", "call_1", "generate_component", json!({}))[0].clone());
    let (assembler, _) = run(events);

    assert_eq!(assembler.open_parts(), 1);
    assert_eq!(assembler.open_tool_calls(), 1);

    let assembly = assembler.finish();
    assert!(!assembly.is_complete());
    match assembly.incomplete_error() {
        Some(ChatError::IncompleteTurn {
            open_tool_calls,
            open_messages,
        }) => {
            assert_eq!(open_tool_calls, 1);
            assert_eq!(open_messages, 1);
        }
        other => panic!("expected IncompleteTurn, got {:?}", other),
    }
}

#[test]
fn test_function_call_done_carries_final_arguments() {
    let (assembler, _) = run(function_call(
        "fc_1",
        "call_9",
        "generate_component",
        json!({"query": "Linear issue card"}),
    ));

    let assembly = assembler.finish();
    let calls = assembly.dispatchable();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].call_id, "call_9");
    assert_eq!(calls[0].arguments, json!({"query": "Linear issue card"}));
}

#[test]
fn test_duplicate_item_added_is_counted() {
    let added = StreamEvent::ItemAdded {
        item: OutputItem::ToolCall(ToolCallDescriptor {
            item_id: "fc_1".to_string(),
            call_id: "call_1".to_string(),
            name: "generate_component".to_string(),
            kind: ToolCallKind::Function,
            arguments: json!({}),
            results: None,
        }),
    };
    let (assembler, notifications) = run(vec![added.clone(), added]);

    assert_eq!(notifications.len(), 1);
    assert_eq!(assembler.stats().duplicate_added, 1);
}

// ============================================================================
// Properties over arbitrary event orders
// ============================================================================

fn arb_event() -> impl Strategy<Value = StreamEvent> {
    let item = prop::sample::select(vec!["a", "b", "c"]);
    let index = 0u32..2;
    prop_oneof![
        (item.clone(), index.clone()).prop_map(|(i, n)| part_added(i, n)),
        (item.clone(), index.clone(), "[a-z ]{0,6}").prop_map(|(i, n, d)| delta(i, n, &d)),
        (item.clone(), index).prop_map(|(i, n)| text_done(i, n)),
        item.clone().prop_map(|i| function_call(i, i, "tool", json!({}))[0].clone()),
        item.prop_map(|i| function_call(i, i, "tool", json!({}))[1].clone()),
    ]
}

proptest! {
    #[test]
    fn prop_every_delta_is_shown_or_counted(events in prop::collection::vec(arb_event(), 0..60)) {
        let deltas = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::TextDelta { .. }))
            .count();
        let (assembler, notifications) = run(events);
        let appended = notifications
            .iter()
            .filter(|n| matches!(n, TurnEvent::TokenAppended { .. }))
            .count();
        prop_assert_eq!(appended + assembler.stats().dropped_deltas, deltas);
    }

    #[test]
    fn prop_steps_close_at_most_once(events in prop::collection::vec(arb_event(), 0..60)) {
        let (assembler, notifications) = run(events);
        let mut closed: Vec<String> = notifications
            .iter()
            .filter_map(|n| match n {
                TurnEvent::ToolStepClosed { item_id, .. } => Some(item_id.clone()),
                _ => None,
            })
            .collect();
        let total = closed.len();
        closed.sort();
        closed.dedup();
        prop_assert_eq!(closed.len(), total);

        let opened = notifications
            .iter()
            .filter(|n| matches!(n, TurnEvent::ToolStepOpened { .. }))
            .count();
        let assembly = assembler.finish();
        prop_assert_eq!(opened, assembly.tool_calls.len() + assembly.open_tool_calls.len());
        prop_assert_eq!(total, assembly.tool_calls.len());
    }

    #[test]
    fn prop_finalized_text_matches_its_deltas(text in "[a-zA-Z0-9 .,]{0,80}") {
        let (assembler, _) = run(text_message("msg", &text));
        let assembly = assembler.finish();
        prop_assert!(assembly.is_complete());
        prop_assert_eq!(assembly.texts, vec![text]);
    }
}
