//! The tool-calling reasoning loop.

use std::sync::Arc;

use async_trait::async_trait;
use knowbridge_config::LlmConfig;
use knowbridge_core::message::{Message, MessageToolCall};
use knowbridge_core::provider::{Provider, ProviderRequest};
use knowbridge_core::tool::{ToolCall, ToolRegistry};
use tracing::{debug, warn};

use crate::reasoner::{Reasoner, Reasoning};

/// Drives a provider through repeated completion rounds, executing any
/// tool calls it requests, until it answers in plain text.
pub struct ToolLoopReasoner {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,

    /// Completion rounds allowed per turn
    max_iterations: u32,
}

impl ToolLoopReasoner {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 10,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &LlmConfig) -> Self {
        Self::new(provider, &config.model, config.temperature)
            .with_max_tokens(config.max_tokens)
            .with_max_iterations(config.max_iterations)
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    async fn execute_tools(
        &self,
        history: &mut Vec<Message>,
        tools: &ToolRegistry,
        calls: &[MessageToolCall],
    ) {
        for tc in calls {
            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments: serde_json::from_str(&tc.arguments).unwrap_or_default(),
            };

            let start = std::time::Instant::now();
            let result = tools.execute(&call).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(tool_result) => {
                    debug!(tool = %tc.name, duration_ms, "Tool executed");
                    history.push(Message::tool_result(&tc.id, tool_result.output));
                }
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, duration_ms, "Tool execution failed");
                    // Reported back so the model can recover.
                    history.push(Message::tool_result(&tc.id, format!("Error: {e}")));
                }
            }
        }
    }
}

#[async_trait]
impl Reasoner for ToolLoopReasoner {
    async fn run(
        &self,
        mut history: Vec<Message>,
        tools: &ToolRegistry,
    ) -> Result<Reasoning, knowbridge_core::Error> {
        let tool_definitions = tools.definitions();
        let mut iteration = 0;

        loop {
            iteration += 1;

            if iteration > self.max_iterations {
                warn!(
                    iterations = self.max_iterations,
                    "Max tool iterations reached without a text response"
                );
                return Ok(Reasoning {
                    history,
                    reply: None,
                });
            }

            debug!(iteration, messages = history.len(), "Reasoning iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: history.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await?;

            if let Some(usage) = &response.usage {
                debug!(model = %response.model, tokens = usage.total_tokens, "Completion received");
            }

            if response.message.tool_calls.is_empty() {
                let reply = response.message.content.clone();
                history.push(response.message);
                return Ok(Reasoning {
                    history,
                    reply: Some(reply),
                });
            }

            debug!(
                tool_count = response.message.tool_calls.len(),
                "Executing tool calls"
            );

            let tool_calls = response.message.tool_calls.clone();
            history.push(response.message);
            self.execute_tools(&mut history, tools, &tool_calls).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbridge_core::error::{ProviderError, ToolError};
    use knowbridge_core::message::Role;
    use knowbridge_core::provider::{ProviderResponse, Usage};
    use knowbridge_core::tool::{Tool, ToolResult};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns scripted assistant messages in order and records requests.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Message, ProviderError>>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Message, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            let message = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Message::assistant("script exhausted")))?;
            Ok(ProviderResponse {
                message,
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            })
        }
    }

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase the text"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            let text = arguments["text"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;
            Ok(ToolResult {
                call_id: String::new(),
                success: true,
                output: text.to_uppercase(),
            })
        }
    }

    fn calls(name: &str, args: &str) -> Message {
        let mut msg = Message::assistant("");
        msg.tool_calls.push(MessageToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: args.into(),
        });
        msg
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UpperTool));
        registry
    }

    #[tokio::test]
    async fn simple_text_response() {
        let provider = ScriptedProvider::new(vec![Ok(Message::assistant("Hello! How can I help?"))]);
        let reasoner = ToolLoopReasoner::new(provider.clone(), "mock-model", 0.7);

        let out = reasoner
            .run(vec![Message::system("sys"), Message::user("Hello!")], &registry())
            .await
            .unwrap();

        assert_eq!(out.reply.as_deref(), Some("Hello! How can I help?"));
        assert_eq!(out.history.len(), 3);
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[0].model, "mock-model");
    }

    #[tokio::test]
    async fn executes_tool_then_answers() {
        let provider = ScriptedProvider::new(vec![
            Ok(calls("upper", r#"{"text":"shout"}"#)),
            Ok(Message::assistant("It says SHOUT")),
        ]);
        let reasoner = ToolLoopReasoner::new(provider.clone(), "m", 0.7);

        let out = reasoner.run(vec![Message::user("go")], &registry()).await.unwrap();

        assert_eq!(out.reply.as_deref(), Some("It says SHOUT"));
        // user, assistant(tool call), tool result, assistant
        assert_eq!(out.history.len(), 4);
        assert_eq!(out.history[2].role, Role::Tool);
        assert_eq!(out.history[2].content, "SHOUT");
        assert_eq!(out.history[2].tool_call_id.as_deref(), Some("call_1"));

        // The second round must see the tool result.
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn tool_errors_are_reported_to_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(calls("missing_tool", "{}")),
            Ok(Message::assistant("Sorry, that failed")),
        ]);
        let reasoner = ToolLoopReasoner::new(provider, "m", 0.7);

        let out = reasoner.run(vec![Message::user("go")], &registry()).await.unwrap();
        assert!(out.history[2].content.starts_with("Error: "));
        assert_eq!(out.reply.as_deref(), Some("Sorry, that failed"));
    }

    #[tokio::test]
    async fn iteration_cap_ends_without_reply() {
        let provider = ScriptedProvider::new(vec![
            Ok(calls("upper", r#"{"text":"a"}"#)),
            Ok(calls("upper", r#"{"text":"b"}"#)),
            Ok(calls("upper", r#"{"text":"c"}"#)),
        ]);
        let reasoner = ToolLoopReasoner::new(provider.clone(), "m", 0.7).with_max_iterations(2);

        let out = reasoner.run(vec![Message::user("loop")], &registry()).await.unwrap();
        assert!(out.reply.is_none());
        assert_eq!(provider.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::Timeout("slow".into()))]);
        let reasoner = ToolLoopReasoner::new(provider, "m", 0.7);

        let err = reasoner.run(vec![Message::user("hi")], &registry()).await.unwrap_err();
        assert!(matches!(err, knowbridge_core::Error::Provider(ProviderError::Timeout(_))));
    }

    #[test]
    fn from_config_applies_limits() {
        let provider = ScriptedProvider::new(vec![]);
        let config = LlmConfig {
            max_iterations: 4,
            max_tokens: 256,
            ..LlmConfig::default()
        };
        let reasoner = ToolLoopReasoner::from_config(provider, &config);
        assert_eq!(reasoner.max_iterations, 4);
        assert_eq!(reasoner.max_tokens, Some(256));
        assert_eq!(reasoner.model, "gemini-2.0-flash");
    }
}
