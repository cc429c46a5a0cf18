mod common;

use common::{linear_card, Reply, ScriptedStructured};
use docbot::error::ChatError;
use docbot::models::{
    Artifact, Session, Settings, ToolCall, ToolCallDescriptor, ToolCallKind, ToolCallState,
    ToolDefinition,
};
use docbot::retry::RetryPolicy;
use docbot::tools::{normalize_artifact, ComponentTool, Retrieval, ToolDispatcher, ToolRegistry};
use serde_json::{json, Value};
use std::sync::Arc;

fn dispatcher(structured: Arc<ScriptedStructured>, retrieval: Option<Retrieval>) -> ToolDispatcher {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ComponentTool::new(structured, RetryPolicy::single_retry())));
    ToolDispatcher::new(registry, retrieval)
}

fn bound_session(tools: &[&str]) -> Session {
    let mut session = Session::new("tools-test", Settings::new("gpt-4o"));
    session.tools = tools.iter().map(|t| t.to_string()).collect();
    session
}

fn completed_call(name: &str, arguments: Value) -> ToolCall {
    let mut call = ToolCall::requested(ToolCallDescriptor {
        item_id: "fc_1".to_string(),
        call_id: "call_1".to_string(),
        name: name.to_string(),
        kind: ToolCallKind::Function,
        arguments,
        results: None,
    });
    call.state = ToolCallState::Completed;
    call
}

#[test]
fn test_normalize_artifact_parses_string_props() {
    let artifact = normalize_artifact(linear_card()).unwrap();
    assert_eq!(artifact.name, "LinearIssueCard");
    assert!(artifact.source_code.starts_with("export default function"));
    assert_eq!(artifact.props, json!({"title": "Fix login redirect"}));
}

#[test]
fn test_normalize_artifact_accepts_object_and_missing_props() {
    let object = normalize_artifact(json!({
        "name": "Badge",
        "sourceCode": "export default () => <span />;",
        "props": {"label": "new"}
    }))
    .unwrap();
    assert_eq!(object.props, json!({"label": "new"}));

    let missing = normalize_artifact(json!({
        "name": "Badge",
        "sourceCode": "export default () => <span />;",
        "props": ""
    }))
    .unwrap();
    assert_eq!(missing.props, json!({}));
}

#[test]
fn test_normalize_artifact_rejects_bad_input() {
    let bad_props = normalize_artifact(json!({
        "name": "Badge",
        "sourceCode": "x",
        "props": "{oops"
    }));
    assert!(bad_props.unwrap_err().contains("props is not valid JSON"));

    let no_name = normalize_artifact(json!({"sourceCode": "x"}));
    assert!(no_name.unwrap_err().contains("missing component name"));

    let no_source = normalize_artifact(json!({"name": "Badge"}));
    assert!(no_source.unwrap_err().contains("missing source code"));
}

#[test]
fn test_registry_definitions_and_validation() {
    let dispatcher = dispatcher(Arc::new(ScriptedStructured::new(Vec::new())), None);
    let registry = dispatcher.registry();

    assert_eq!(registry.names(), vec!["generate_component".to_string()]);
    match registry.definition("generate_component") {
        Some(ToolDefinition::Function { parameters, .. }) => {
            assert_eq!(parameters["required"], json!(["query"]));
        }
        other => panic!("unexpected definition {:?}", other),
    }

    assert!(registry
        .validate_arguments("generate_component", &json!({"query": "card"}))
        .is_ok());
    assert!(registry
        .validate_arguments("generate_component", &json!({"prompt": "card"}))
        .is_err());
    assert!(registry.validate_arguments("missing", &json!({})).is_err());
}

#[test]
fn test_definitions_follow_session_bindings() {
    let retrieval = Retrieval {
        vector_store_ids: vec!["vs_docs".to_string()],
        max_num_results: 10,
    };
    let dispatcher = dispatcher(Arc::new(ScriptedStructured::new(Vec::new())), Some(retrieval));

    assert_eq!(
        dispatcher.available(),
        vec!["file_search".to_string(), "generate_component".to_string()]
    );

    let session = bound_session(&["generate_component", "file_search", "web_browser"]);
    let definitions = dispatcher.definitions(&session);
    let names: Vec<&str> = definitions.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["generate_component", "file_search"]);
    assert!(definitions.contains(&ToolDefinition::FileSearch {
        vector_store_ids: vec!["vs_docs".to_string()],
        max_num_results: 10,
    }));
}

#[test]
fn test_file_search_needs_a_vector_store() {
    let dispatcher = dispatcher(Arc::new(ScriptedStructured::new(Vec::new())), None);
    let session = bound_session(&["file_search"]);
    assert!(dispatcher.definitions(&session).is_empty());
}

#[tokio::test]
async fn test_dispatch_generates_and_stores_artifact() {
    let structured = Arc::new(ScriptedStructured::new(vec![Reply::Object(linear_card())]));
    let dispatcher = dispatcher(structured.clone(), None);
    let mut session = bound_session(&["generate_component"]);

    let result = dispatcher
        .dispatch(
            &completed_call("generate_component", json!({"query": "Linear issue card"})),
            &mut session,
        )
        .await
        .unwrap();

    assert_eq!(result.call_id, "call_1");
    let artifact = result.artifact.unwrap();
    assert_eq!(session.last_artifact, Some(artifact.clone()));

    let payload: Value = serde_json::from_str(&result.output).unwrap();
    assert_eq!(payload["status"], "rendered");
    assert_eq!(payload["name"], "LinearIssueCard");
    assert!(!result.output.contains(&artifact.source_code));

    let request = &structured.recorded_requests()[0];
    assert_eq!(request.schema["required"], json!(["name", "sourceCode", "props"]));
}

#[tokio::test]
async fn test_dispatch_accepts_string_arguments() {
    let structured = Arc::new(ScriptedStructured::new(vec![Reply::Object(linear_card())]));
    let dispatcher = dispatcher(structured, None);
    let mut session = bound_session(&["generate_component"]);

    let call = completed_call(
        "generate_component",
        Value::String("{\"query\": \"card\"}".to_string()),
    );
    assert!(dispatcher.dispatch(&call, &mut session).await.is_ok());

    let broken = completed_call("generate_component", Value::String("{\"query\"".to_string()));
    assert!(matches!(
        dispatcher.dispatch(&broken, &mut session).await,
        Err(ChatError::InvalidToolArguments { .. })
    ));
}

#[tokio::test]
async fn test_dispatch_rejects_schema_violations() {
    let structured = Arc::new(ScriptedStructured::new(vec![Reply::Object(linear_card())]));
    let dispatcher = dispatcher(structured.clone(), None);
    let mut session = bound_session(&["generate_component"]);

    let result = dispatcher
        .dispatch(&completed_call("generate_component", json!({"query": 42})), &mut session)
        .await;

    let error = result.unwrap_err();
    assert!(matches!(error, ChatError::InvalidToolArguments { .. }));
    assert!(error.is_contained_to_tool());
    assert_eq!(structured.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_tool_is_not_retried() {
    let structured = Arc::new(ScriptedStructured::new(Vec::new()));
    let dispatcher = dispatcher(structured.clone(), None);
    let mut session = bound_session(&["generate_component", "search_web"]);

    let error = dispatcher
        .dispatch(&completed_call("search_web", json!({})), &mut session)
        .await
        .unwrap_err();

    assert!(matches!(error, ChatError::UnsupportedTool { ref name } if name == "search_web"));
    assert!(!error.is_contained_to_tool());
    assert!(!error.is_transport());
}

#[tokio::test]
async fn test_garbage_reply_is_malformed_without_retry() {
    let structured = Arc::new(ScriptedStructured::new(vec![
        Reply::Garbage,
        Reply::Object(linear_card()),
    ]));
    let dispatcher = dispatcher(structured.clone(), None);
    let mut session = bound_session(&["generate_component"]);
    let previous = Artifact {
        name: "Kept".to_string(),
        source_code: "export default () => null;".to_string(),
        props: json!({}),
    };
    session.last_artifact = Some(previous.clone());

    let error = dispatcher
        .dispatch(&completed_call("generate_component", json!({"query": "card"})), &mut session)
        .await
        .unwrap_err();

    assert!(matches!(error, ChatError::ToolResultMalformed { .. }));
    assert_eq!(structured.request_count(), 1);
    // A failed generation leaves the previous artifact in place.
    assert_eq!(session.last_artifact, Some(previous));
}

#[tokio::test]
async fn test_retry_policy_counts_attempts() {
    let policy = RetryPolicy::with_attempts(3);
    let mut seen = Vec::new();
    let exhausted = policy
        .run("test", |attempt| {
            seen.push(attempt);
            async move {
                Err::<(), _>(ChatError::Api {
                    status: 502,
                    message: "bad gateway".to_string(),
                })
            }
        })
        .await
        .unwrap_err();

    assert_eq!(exhausted.attempts, 3);
    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(RetryPolicy::with_attempts(0), RetryPolicy::no_retry());
    assert_eq!(RetryPolicy::default().max_attempts, 2);
}
