use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use toolbridge_model::{
    ModelFinishReason, ModelProvider, ModelRequest, ModelResponse,
    ModelResponseEvent, ToolCallRequest,
};
use tracing::Instrument;

use crate::error::CompletionError;

type SendRequestResult = Result<ModelClientResponse, CompletionError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, Box<dyn Fn(String) + Send + 'static>)
        -> BoxedSendRequestFuture + Send + Sync
>;

/// A type-erased handle to a model provider.
///
/// It sends one completion request at a time and collects the streamed
/// response into a [`ModelClientResponse`]. Cloning is cheap.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps a provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            let span = debug_span!(
                "model request",
                messages = req.messages.len(),
                tools = req.tools.len()
            );
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    let resp_or_err = fut.await;
                    collect_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(span),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the complete response.
    ///
    /// Text deltas are passed to `on_delta` as they arrive.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming when the
    /// returned future is dropped.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_delta: impl Fn(String) + Send + 'static,
    ) -> Result<ModelClientResponse, CompletionError> {
        (self.handler_fn)(req, Box::new(on_delta)).await
    }
}

/// A completely received response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelClientResponse {
    /// The concatenated text deltas.
    pub content: String,
    /// Tool calls requested by the model, in the order received.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

async fn collect_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: Box<dyn Fn(String) + Send + 'static>,
) -> SendRequestResult {
    let resp = resp_or_err.map_err(|err| {
        error!("request rejected: {err}");
        CompletionError::new(err)
    })?;

    let mut collected = ModelClientResponse::default();
    let mut resp = pin!(resp);
    loop {
        let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("response failed: {err}");
                CompletionError::new(err)
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                collected.content.push_str(&delta);
                on_delta(delta);
            }
            ModelResponseEvent::ToolCall(req) => {
                collected.tool_calls.push(req);
            }
            ModelResponseEvent::Completed(reason) => {
                collected.finish_reason = Some(reason);
            }
        }
    }

    debug!(
        "response finished: {:?}, {} tool call(s)",
        collected.finish_reason,
        collected.tool_calls.len()
    );
    Ok(collected)
}
