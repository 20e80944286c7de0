use serde_json::{Map, Value};
use toolbridge_model::{ModelMessage, ModelRequest, ToolCallRequest};

use crate::bridge::fresh_call_id;
use crate::error::Error;
use crate::model_client::ModelClient;
use crate::tool::{HandlerRegistry, ToolSet};
use crate::transcript::{Transcript, TranscriptError};

/// What the caller should do after a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// A backend tool ran and its result was appended. Run another round.
    Continue,
    /// The model replied with text only, or handed a tool call to the
    /// frontend. The turn is over.
    End,
}

/// Runs one round of the tool-call resolution loop.
///
/// Asks the model for a completion over `transcript` and the tools in
/// `tools`, appends the assistant message, and if the model called a
/// backend tool, runs it and appends its result. Text deltas are passed to
/// `on_delta` while the response streams.
///
/// Only the first tool call of a response is kept, the model is asked
/// not to make parallel calls in the first place. A call to a frontend
/// tool ends the turn with the call left unanswered in the transcript;
/// see [`Transcript::last_tool_call`].
///
/// Nothing is retried and nothing is rolled back: on error, messages
/// appended before the failure stay in the transcript.
pub async fn resolve(
    transcript: &mut Transcript,
    tools: &ToolSet,
    registry: &HandlerRegistry,
    model_client: &ModelClient,
    on_delta: impl Fn(String) + Send + 'static,
) -> Result<Signal, Error> {
    if transcript.is_empty() {
        return Err(TranscriptError::Empty.into());
    }

    let req = ModelRequest {
        messages: transcript.messages().to_vec(),
        tools: tools.model_tools(),
        parallel_tool_calls: false,
    };
    let resp = model_client.send_request(req, on_delta).await?;

    let mut tool_calls = resp.tool_calls.into_iter();
    let tool_call = tool_calls.next().map(|mut call| {
        if call.id.is_empty() {
            call.id = fresh_call_id();
        }
        call
    });
    let dropped = tool_calls.count();
    if dropped > 0 {
        warn!("model requested {dropped} extra tool call(s), ignoring them");
    }

    transcript.push(ModelMessage::Assistant {
        content: resp.content,
        tool_call: tool_call.clone(),
    })?;

    let Some(call) = tool_call else {
        trace!("no tool call, ending the turn");
        return Ok(Signal::End);
    };

    let arguments = parse_arguments(&call)?;
    if tools.is_frontend(&call.name) {
        trace!("tool {} belongs to the frontend", call.name);
        return Ok(Signal::End);
    }

    let span = debug_span!("tool call", tool = %call.name, id = %call.id);
    let result = span.in_scope(|| {
        debug!("calling with {}", call.arguments);
        registry.call(&call.name, arguments)
    });
    let content = match result {
        Some(Ok(content)) => content,
        Some(Err(source)) => {
            error!("tool {} failed: {source}", call.name);
            return Err(Error::HandlerExecution {
                tool: call.name,
                source,
            });
        }
        None => {
            error!("model called an unknown tool: {}", call.name);
            return Err(Error::UnknownTool(call.name));
        }
    };

    transcript.push(ModelMessage::tool(call.id, content))?;
    Ok(Signal::Continue)
}

fn parse_arguments(call: &ToolCallRequest) -> Result<Map<String, Value>, Error> {
    serde_json::from_str(&call.arguments).map_err(|source| {
        warn!("malformed arguments for {}: {source}", call.name);
        Error::ArgumentParse {
            tool: call.name.clone(),
            source,
        }
    })
}
