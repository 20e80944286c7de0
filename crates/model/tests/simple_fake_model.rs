use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use toolbridge_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message word by word. When the model is offered
/// an `echo` tool it calls it instead of replying with text.
struct FakeModelResponse {
    pending: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl FakeModelResponse {
    fn new(input: &str, call_tool: bool) -> Self {
        let mut pending: VecDeque<_> = if call_tool {
            let arguments = format!(r#"{{"text":"{input}"}}"#);
            [
                ModelResponseEvent::ToolCall(ToolCallRequest::new(
                    "call_1", "echo", arguments,
                )),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
            .into()
        } else {
            format!("You said {input}")
                .split(' ')
                .map(|word| ModelResponseEvent::MessageDelta(word.to_owned()))
                .collect()
        };
        if !call_tool {
            pending
                .push_back(ModelResponseEvent::Completed(ModelFinishReason::Stop));
        }
        Self {
            pending,
            sleep: None,
        }
    }
}

impl ModelResponse for FakeModelResponse {
    type Error = FakeModelProviderError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.pending.pop_front()))
    }
}

struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;
    type Response = FakeModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let input = req.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User { content } => Some(content.as_str()),
            _ => None,
        });
        let result = match input {
            Some(input) => {
                let call_tool = req.tools.iter().any(|t| t.name == "echo");
                Ok(FakeModelResponse::new(input, call_tool))
            }
            None => Err(FakeModelProviderError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(
    mut resp: FakeModelResponse,
) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
    let mut text = Vec::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;
    loop {
        let event = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap();
        match event {
            Some(ModelResponseEvent::MessageDelta(delta)) => text.push(delta),
            Some(ModelResponseEvent::ToolCall(req)) => tool_calls.push(req),
            Some(ModelResponseEvent::Completed(reason)) => {
                finish_reason = Some(reason)
            }
            None => break,
        }
    }
    (text.join(" "), tool_calls, finish_reason)
}

#[tokio::test]
async fn test_completion() {
    let req = ModelRequest {
        messages: vec![ModelMessage::user("Good morning")],
        tools: vec![],
        parallel_tool_calls: false,
    };
    let resp = FakeModelProvider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;

    assert_eq!(text, "You said Good morning");
    assert!(tool_calls.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
}

#[tokio::test]
async fn test_tool_call_keeps_raw_arguments() {
    let req = ModelRequest {
        messages: vec![ModelMessage::user("Boston")],
        tools: vec![toolbridge_model::ModelTool {
            name: "echo".to_owned(),
            description: "Echoes the text".to_owned(),
            parameters: serde_json::json!({ "type": "object" }),
        }],
        parallel_tool_calls: false,
    };
    let resp = FakeModelProvider.send_request(&req).await.unwrap();
    let (text, tool_calls, finish_reason) = collect(resp).await;

    assert!(text.is_empty());
    assert_eq!(finish_reason, Some(ModelFinishReason::ToolCalls));
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].arguments, r#"{"text":"Boston"}"#);
}

#[tokio::test]
async fn test_error() {
    let req = ModelRequest {
        messages: vec![ModelMessage::system("Be nice")],
        tools: vec![],
        parallel_tool_calls: false,
    };
    let result = FakeModelProvider.send_request(&req).await;
    let err = result.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
}

#[test]
fn test_message_wire_shape() {
    let msg = ModelMessage::tool("call_1", "70 degrees");
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        serde_json::json!({
            "role": "tool",
            "content": "70 degrees",
            "tool_call_id": "call_1",
        })
    );

    let msg: ModelMessage =
        serde_json::from_str(r#"{"role":"user","content":"Hi"}"#).unwrap();
    assert_eq!(msg, ModelMessage::user("Hi"));
    assert_eq!(msg.role(), "user");
    assert!(msg.tool_call().is_none());
}
