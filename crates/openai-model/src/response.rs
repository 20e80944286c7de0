use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use toolbridge_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ToolCallChunk};

/// A tool call being reassembled from streamed fragments.
#[derive(Default)]
struct PartialToolCall {
    index: Option<u32>,
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn patch(&mut self, chunk: ToolCallChunk) {
        if let Some(id) = chunk.id {
            self.id.push_str(&id);
        }
        if let Some(function) = chunk.function {
            if let Some(name) = function.name {
                self.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    tool_calls: Vec<PartialToolCall>,
    // Tool calls are only complete once the stream ends, they are moved here
    // at that point and emitted one by one.
    pending_tool_calls: VecDeque<ToolCallRequest>,
    finish_reason: Option<ModelFinishReason>,
    stream_ended: bool,
}

impl PartialState {
    fn end_stream(&mut self) {
        self.stream_ended = true;
        let has_tool_calls = !self.tool_calls.is_empty();
        self.pending_tool_calls
            .extend(self.tool_calls.drain(..).map(|call| ToolCallRequest {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            }));
        // Some servers close the stream without a finish reason.
        self.finish_reason.get_or_insert(if has_tool_calls {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        });
    }

    /// Merges the fragment at `position` of one chunk's `tool_calls`.
    fn merge_tool_call(&mut self, position: usize, mut chunk: ToolCallChunk) {
        // Gemini sends empty ids rather than none.
        if chunk.id.as_deref() == Some("") {
            chunk.id = None;
        }
        let slot = match (chunk.index, chunk.id.as_deref()) {
            (Some(index), _) => self
                .tool_calls
                .iter()
                .rposition(|call| call.index == Some(index)),
            (None, Some(id)) => {
                self.tool_calls.iter().rposition(|call| call.id == id)
            }
            // Without index or id, every element of one chunk is its own
            // call, and a fragment naming a tool starts a new one.
            (None, None) if position > 0 => None,
            (None, None) => {
                let names_tool = chunk
                    .function
                    .as_ref()
                    .and_then(|function| function.name.as_deref())
                    .is_some_and(|name| !name.is_empty());
                self.tool_calls
                    .last()
                    .filter(|last| {
                        last.index.is_none()
                            && !(names_tool && !last.name.is_empty())
                    })
                    .map(|_| self.tool_calls.len() - 1)
            }
        };
        match slot {
            Some(slot) => self.tool_calls[slot].patch(chunk),
            None => {
                let mut call = PartialToolCall {
                    index: chunk.index,
                    ..Default::default()
                };
                call.patch(chunk);
                self.tool_calls.push(call);
            }
        }
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_tool_calls: Default::default(),
            finish_reason: None,
            stream_ended: false,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    loop {
        // The order of events matters: message deltas are emitted as they
        // arrive, then the complete tool calls, and finally the finish reason.
        if let Some(tool_call) = partial_state.pending_tool_calls.pop_front() {
            return Ok((
                Some(ModelResponseEvent::ToolCall(tool_call)),
                partial_state,
            ));
        }
        if partial_state.stream_ended {
            let event = partial_state
                .finish_reason
                .take()
                .map(ModelResponseEvent::Completed);
            return Ok((event, partial_state));
        }

        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.end_stream();
                continue;
            }
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.end_stream();
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }
        if let Some(usage) = chunk.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "usage reported"
            );
        }

        let mut message_delta = String::new();
        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(delta) = choice.delta {
                if let Some(content) = delta.content {
                    message_delta.push_str(&content);
                }
                let tool_calls = delta.tool_calls.into_iter().flatten();
                for (position, tool_call) in tool_calls.enumerate() {
                    partial_state.merge_tool_call(position, tool_call);
                }
            }
            if let Some(finish_reason) = choice.finish_reason {
                partial_state.finish_reason = Some(match finish_reason.as_str() {
                    "tool_calls" | "function_call" => ModelFinishReason::ToolCalls,
                    "content_filter" => {
                        return Err(Error::new(
                            "response blocked by content filter",
                            ErrorKind::Moderated,
                        ));
                    }
                    _ => ModelFinishReason::Stop,
                });
            }
        }

        if !message_delta.is_empty() {
            return Ok((
                Some(ModelResponseEvent::MessageDelta(message_delta)),
                partial_state,
            ));
        }
    }
}
