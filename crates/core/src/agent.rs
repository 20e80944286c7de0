mod builder;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use toolbridge_model::{ModelMessage, ToolCallRequest};

use crate::bridge::{
    ActionDeclaration, BridgeEvent, EventSink, defer_to_frontend,
    fresh_message_id,
};
use crate::conversation::Conversation;
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::resolve::{Signal, resolve};
use crate::tool::{HandlerRegistry, ToolSet};
use crate::transcript::Transcript;
pub use builder::AgentBuilder;

/// An agent that answers turns of a conversation.
///
/// The agent holds no conversation state itself: each call to
/// [`Agent::run_turn`] works on the conversation it is given, so one agent
/// can serve many conversations, one turn at a time each.
pub struct Agent {
    model_client: ModelClient,
    registry: HandlerRegistry,
    system_prompt: Option<String>,
    max_rounds: Option<usize>,
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The number of model rounds the turn took.
    pub rounds: usize,
    /// The tool call handed to the frontend, if the turn ended with one.
    ///
    /// Its result is expected as a tool message on the next turn.
    pub deferred: Option<ToolCallRequest>,
}

impl Agent {
    /// Returns the backend tools of this agent.
    #[inline]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Runs one turn: model rounds until the model replies without calling
    /// a backend tool.
    ///
    /// `actions` are the tools the frontend offers for this turn. Assistant
    /// text is streamed to `sink` as text message events, one message per
    /// round. If the turn ends with a call to a frontend tool, the call is
    /// forwarded through `sink` and returned in the outcome.
    ///
    /// Messages produced by the turn are appended to `conversation`, also
    /// when the turn fails halfway.
    #[inline]
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        actions: &[ActionDeclaration],
        sink: Arc<dyn EventSink>,
    ) -> Result<TurnOutcome, Error> {
        let system_prompt = self.system_prompt.as_deref();
        self.run_turn_with_prompt(conversation, actions, system_prompt, sink)
            .await
    }

    /// Runs one turn like [`Agent::run_turn`], with `system_prompt` in
    /// place of the prompt the agent was built with.
    ///
    /// Used when the prompt depends on state that changes between turns.
    pub async fn run_turn_with_prompt(
        &self,
        conversation: &mut Conversation,
        actions: &[ActionDeclaration],
        system_prompt: Option<&str>,
        sink: Arc<dyn EventSink>,
    ) -> Result<TurnOutcome, Error> {
        let tools = ToolSet::from_actions(actions, &self.registry)?;
        debug!(
            "turn offers {} frontend and {} backend tool(s)",
            tools.frontend().len(),
            tools.backend().len()
        );
        let system = system_prompt.map(ModelMessage::system);
        let mut transcript = Transcript::from_messages(
            system.into_iter().chain(conversation.messages().iter().cloned()),
        )?;

        let result = self.drive(&mut transcript, &tools, &sink).await;
        conversation.extend_validated(transcript.appended());
        let rounds = result?;

        let deferred = transcript
            .last_tool_call()
            .filter(|call| tools.is_frontend(&call.name))
            .cloned();
        if let Some(call) = &deferred {
            defer_to_frontend(sink.as_ref(), call);
        }

        debug!("turn finished after {rounds} round(s)");
        Ok(TurnOutcome { rounds, deferred })
    }

    async fn drive(
        &self,
        transcript: &mut Transcript,
        tools: &ToolSet,
        sink: &Arc<dyn EventSink>,
    ) -> Result<usize, Error> {
        let mut rounds = 0;
        loop {
            rounds += 1;
            trace!("starting round {rounds}");

            let text = TextMessage::new(Arc::clone(sink));
            let signal = resolve(
                transcript,
                tools,
                &self.registry,
                &self.model_client,
                text.on_delta(),
            )
            .await;
            text.finish();

            match signal? {
                Signal::End => return Ok(rounds),
                Signal::Continue => {}
            }
            if self.max_rounds == Some(rounds) {
                warn!("turn did not end within {rounds} rounds");
                return Err(Error::RoundLimitExceeded(rounds));
            }
        }
    }
}

/// Streams the text of one assistant message as UI events.
///
/// The start event is sent lazily, so rounds that produce no text produce
/// no events either.
struct TextMessage {
    sink: Arc<dyn EventSink>,
    message_id: String,
    started: Arc<AtomicBool>,
}

impl TextMessage {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            message_id: fresh_message_id(),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    fn on_delta(&self) -> impl Fn(String) + Send + 'static {
        let sink = Arc::clone(&self.sink);
        let message_id = self.message_id.clone();
        let started = Arc::clone(&self.started);
        move |delta| {
            if delta.is_empty() {
                return;
            }
            if !started.swap(true, Ordering::Relaxed) {
                sink.emit(BridgeEvent::TextMessageStart {
                    message_id: message_id.clone(),
                    role: "assistant".to_owned(),
                });
            }
            sink.emit(BridgeEvent::TextMessageContent {
                message_id: message_id.clone(),
                delta,
            });
        }
    }

    fn finish(self) {
        if self.started.load(Ordering::Relaxed) {
            self.sink.emit(BridgeEvent::TextMessageEnd {
                message_id: self.message_id,
            });
        }
    }
}
