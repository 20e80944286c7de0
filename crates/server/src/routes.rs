use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedSender};
use toolbridge_core::bridge::{ActionDeclaration, BridgeEvent, EventSink};
use toolbridge_core::{Agent, Conversation, Error};
use tracing::Instrument;
use uuid::Uuid;

use crate::SYSTEM_PROMPT;
use crate::protocol::RunAgentInput;
use crate::state::AgentState;

/// Builds the HTTP routes serving `agent`.
pub fn router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agent", post(run_agent))
        .with_state(agent)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn run_agent(
    State(agent): State<Arc<Agent>>,
    Json(input): Json<RunAgentInput>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)>
{
    let conversation = input.conversation().map_err(|err| {
        warn!("rejecting run: {err}");
        (StatusCode::BAD_REQUEST, err.to_string())
    })?;
    let run_id = input
        .run_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let (tx, rx) = mpsc::unbounded_channel();
    let span = info_span!("run", thread = %input.thread_id, run = %run_id);
    let state = input.state.unwrap_or_default();
    tokio::spawn(
        run(agent, conversation, input.tools, state, input.thread_id, run_id, tx)
            .instrument(span),
    );

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(to_sse(&event)), rx))
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn run(
    agent: Arc<Agent>,
    mut conversation: Conversation,
    actions: Vec<ActionDeclaration>,
    mut state: AgentState,
    thread_id: String,
    run_id: String,
    tx: UnboundedSender<BridgeEvent>,
) {
    let sink: Arc<dyn EventSink> = Arc::new(tx);
    sink.emit(BridgeEvent::RunStarted {
        thread_id: thread_id.clone(),
        run_id: run_id.clone(),
    });

    let system_prompt = state.render_prompt(SYSTEM_PROMPT.trim());
    match agent
        .run_turn_with_prompt(
            &mut conversation,
            &actions,
            Some(&system_prompt),
            Arc::clone(&sink),
        )
        .await
    {
        Ok(outcome) => {
            info!("run finished after {} round(s)", outcome.rounds);
            if outcome.deferred.as_ref().is_some_and(|call| state.apply(call)) {
                emit_state(sink.as_ref(), &state);
            }
            sink.emit(BridgeEvent::RunFinished { thread_id, run_id });
        }
        Err(err) => {
            error!("run failed: {err}");
            sink.emit(BridgeEvent::RunError {
                message: err.to_string(),
                code: Some(error_code(&err).to_owned()),
            });
        }
    }
}

fn emit_state(sink: &dyn EventSink, state: &AgentState) {
    match serde_json::to_value(state) {
        Ok(snapshot) => sink.emit(BridgeEvent::StateSnapshot { snapshot }),
        Err(err) => error!("failed to encode state: {err}"),
    }
}

fn to_sse(event: &BridgeEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|err| {
        error!("failed to encode event: {err}");
        Event::default().comment("dropped event")
    })
}

fn error_code(err: &Error) -> &'static str {
    match err {
        Error::CompletionRequest(_) => "COMPLETION_FAILED",
        Error::ArgumentParse { .. } => "MALFORMED_ARGUMENTS",
        Error::UnknownTool(_) => "UNKNOWN_TOOL",
        Error::HandlerExecution { .. } => "TOOL_FAILED",
        Error::Transcript(_) => "INVALID_TRANSCRIPT",
        Error::ToolSet(_) => "TOOL_CONFLICT",
        Error::RoundLimitExceeded(_) => "ROUND_LIMIT_EXCEEDED",
    }
}
