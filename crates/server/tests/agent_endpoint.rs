use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use toolbridge_core::model::ModelMessage;
use toolbridge_server::{build_agent, router};
use toolbridge_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use tower::ServiceExt;

fn app(provider: &TestModelProvider) -> Router {
    router(Arc::new(build_agent(provider.clone()).unwrap()))
}

fn run_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/agent")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends a run and returns the streamed events.
async fn run(app: Router, body: Value) -> Vec<Value> {
    let resp = app.oneshot(run_request(body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec())
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

fn types(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|event| event["type"].as_str().unwrap())
        .collect()
}

fn change_background() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "change_background",
            "description": "Change the background color of the chat.",
            "parameters": {
                "type": "object",
                "properties": {
                    "background": { "type": "string" }
                },
                "required": ["background"]
            }
        }
    })
}

#[tokio::test]
async fn test_health() {
    let resp = app(&TestModelProvider::default())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_text_run() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::MessageDelta("Hello".to_owned()),
        PresetEvent::MessageDelta(", there!".to_owned()),
    ]));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "runId": "run-1",
            "messages": [{ "id": "1", "role": "user", "content": "Hi" }],
            "tools": []
        }),
    )
    .await;

    assert_eq!(
        types(&events),
        [
            "RUN_STARTED",
            "TEXT_MESSAGE_START",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_CONTENT",
            "TEXT_MESSAGE_END",
            "RUN_FINISHED"
        ]
    );
    assert_eq!(events[0]["threadId"], "thread-1");
    assert_eq!(events[0]["runId"], "run-1");
    assert_eq!(events[3]["delta"], ", there!");

    let requests = provider.requests();
    assert_eq!(requests[0].messages[0].role(), "system");
    let tools: Vec<_> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tools, ["get_weather", "read_file"]);
}

#[tokio::test]
async fn test_weather_run() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "get_weather",
        r#"{"location":"Boston"}"#,
    ));
    provider.add_response(PresetResponse::text("It's 70 degrees in Boston."));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{
                "id": "1",
                "role": "user",
                "content": "What's the weather in Boston?"
            }],
            "tools": [change_background()]
        }),
    )
    .await;

    assert_eq!(types(&events).last(), Some(&"RUN_FINISHED"));
    assert!(!types(&events).contains(&"TOOL_CALL_START"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools[0].name, "change_background");
    assert_eq!(
        requests[1].messages.last(),
        Some(&ModelMessage::tool(
            "call_1",
            "The weather for Boston is 70 degrees, clear skies, 45% humidity, \
             5 mph wind, and feels like 72 degrees."
        ))
    );
}

#[tokio::test]
async fn test_frontend_action_run() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_5",
        "change_background",
        r#"{"background":"blue"}"#,
    ));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{ "role": "user", "content": "Make it blue" }],
            "tools": [change_background()]
        }),
    )
    .await;

    assert_eq!(
        types(&events),
        [
            "RUN_STARTED",
            "TOOL_CALL_START",
            "TOOL_CALL_ARGS",
            "TOOL_CALL_END",
            "RUN_FINISHED"
        ]
    );
    assert_eq!(events[1]["toolCallId"], "call_5");
    assert_eq!(events[1]["toolCallName"], "change_background");
    assert_eq!(events[2]["delta"], r#"{"background":"blue"}"#);
}

#[tokio::test]
async fn test_missing_file_is_reported_to_model() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_1",
        "read_file",
        r#"{"file_path":"/no/such/file.md"}"#,
    ));
    provider.add_response(PresetResponse::text("That file does not exist."));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{ "role": "user", "content": "Read /no/such/file.md" }]
        }),
    )
    .await;

    assert_eq!(types(&events).last(), Some(&"RUN_FINISHED"));
    assert_eq!(
        provider.requests()[1].messages.last().map(ModelMessage::content),
        Some("Error: File not found at path: /no/such/file.md")
    );
}

#[tokio::test]
async fn test_failed_run() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call("call_1", "launch_rockets", "{}"));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{ "role": "user", "content": "Launch" }]
        }),
    )
    .await;

    assert_eq!(types(&events), ["RUN_STARTED", "RUN_ERROR"]);
    assert_eq!(events[1]["code"], "UNKNOWN_TOOL");
    assert_eq!(events[1]["message"], "unknown tool `launch_rockets`");
}

#[tokio::test]
async fn test_orphan_tool_result_rejected() {
    let provider = TestModelProvider::default();
    let resp = app(&provider)
        .oneshot(run_request(json!({
            "threadId": "thread-1",
            "messages": [
                { "role": "user", "content": "Hi" },
                { "role": "tool", "content": "done", "toolCallId": "call_1" }
            ]
        })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(provider.requests().is_empty());
}

fn add_proverb() -> Value {
    json!({
        "name": "addProverb",
        "description": "Add a proverb to the list.",
        "parameters": {
            "type": "object",
            "properties": {
                "proverb": { "type": "string" }
            },
            "required": ["proverb"]
        }
    })
}

#[tokio::test]
async fn test_state_fills_system_prompt() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("You have one proverb."));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{ "role": "user", "content": "How many proverbs?" }],
            "state": { "proverbs": ["Haste makes waste."] }
        }),
    )
    .await;

    assert!(!types(&events).contains(&"STATE_SNAPSHOT"));
    let system = provider.requests()[0].messages[0].content().to_owned();
    assert!(
        system.starts_with(
            r#"You are a helpful assistant. The current proverbs are ["Haste makes waste."]."#
        ),
        "{system}"
    );
}

#[tokio::test]
async fn test_add_proverb_updates_state() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::tool_call(
        "call_7",
        "addProverb",
        r#"{"proverb":"Measure twice, cut once."}"#,
    ));

    let events = run(
        app(&provider),
        json!({
            "threadId": "thread-1",
            "messages": [{ "role": "user", "content": "Add a proverb" }],
            "tools": [add_proverb()],
            "state": { "proverbs": ["Haste makes waste."], "theme": "dark" }
        }),
    )
    .await;

    assert_eq!(
        types(&events),
        [
            "RUN_STARTED",
            "TOOL_CALL_START",
            "TOOL_CALL_ARGS",
            "TOOL_CALL_END",
            "STATE_SNAPSHOT",
            "RUN_FINISHED"
        ]
    );
    assert_eq!(
        events[4]["snapshot"],
        json!({
            "proverbs": ["Haste makes waste.", "Measure twice, cut once."],
            "theme": "dark"
        })
    );
}
