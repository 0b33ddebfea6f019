//! Turns one user message into one reply, remembering each thread.

use std::sync::Arc;

use knowbridge_config::AppConfig;
use knowbridge_core::message::Message;
use knowbridge_core::remote::RemoteAgent;
use knowbridge_core::tool::ToolRegistry;
use tracing::{debug, error, info};

use crate::checkpoint::MemoryCheckpointStore;
use crate::loop_runner::ToolLoopReasoner;
use crate::prompt::system_instruction;
use crate::reasoner::Reasoner;

const NO_REPLY: &str = "I'm sorry, I couldn't generate a response at this time.";

/// The knowledge-augmented conversational agent.
///
/// Shared across requests. Callers always get a string back: failures
/// are rendered as an apology instead of being propagated.
pub struct KnowledgeResponder {
    reasoner: Arc<dyn Reasoner>,
    tools: Arc<ToolRegistry>,
    checkpoints: MemoryCheckpointStore,
    system_prompt: String,
}

impl KnowledgeResponder {
    pub fn new(reasoner: Arc<dyn Reasoner>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            reasoner,
            tools,
            checkpoints: MemoryCheckpointStore::new(),
            system_prompt: crate::prompt::SYSTEM_INSTRUCTION.to_string(),
        }
    }

    /// Wire the language model, the search tool and the book agent together.
    ///
    /// Fails when the language model is not configured.
    pub fn from_config(
        config: &AppConfig,
        agent: Arc<dyn RemoteAgent>,
    ) -> Result<Self, knowbridge_core::Error> {
        let provider = knowbridge_providers::from_config(&config.llm)?;
        let reasoner = ToolLoopReasoner::from_config(provider, &config.llm);
        let tools = knowbridge_tools::default_registry(agent, config.remote.search_limit);

        info!(
            provider = %config.llm.provider,
            model = %config.llm.model,
            tools = ?tools.names(),
            "Knowledge responder ready"
        );

        Ok(Self::new(Arc::new(reasoner), Arc::new(tools))
            .with_system_prompt(system_instruction(config.llm.system_prompt_override.as_deref())))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn checkpoints(&self) -> &MemoryCheckpointStore {
        &self.checkpoints
    }

    /// Answer `message` in the context of `thread_id`'s prior turns.
    pub async fn chat(&self, message: &str, thread_id: &str) -> String {
        let mut checkpoint = self.checkpoints.lock(thread_id).await;

        let mut history = checkpoint.clone();
        if history.is_empty() {
            debug!(thread_id, "New thread");
            history.push(Message::system(&self.system_prompt));
        }
        history.push(Message::user(message));

        match self.reasoner.run(history, &self.tools).await {
            Ok(reasoning) => {
                *checkpoint = reasoning.history;
                debug!(thread_id, messages = checkpoint.len(), "Checkpoint saved");
                reasoning.reply.unwrap_or_else(|| NO_REPLY.to_string())
            }
            Err(e) => {
                error!(thread_id, error = %e, "Reasoning failed");
                format!("I encountered an error while processing your request: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowbridge_core::message::Role;
    use knowbridge_core::{Error, ProviderError};
    use std::sync::Mutex;

    use crate::reasoner::Reasoning;

    /// Echoes how many user messages it has seen; records each input.
    #[derive(Default)]
    struct CountingReasoner {
        inputs: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl Reasoner for CountingReasoner {
        async fn run(&self, mut history: Vec<Message>, _tools: &ToolRegistry) -> Result<Reasoning, Error> {
            self.inputs.lock().unwrap().push(history.clone());
            let users = history.iter().filter(|m| m.role == Role::User).count();
            let reply = format!("seen {users}");
            history.push(Message::assistant(&reply));
            Ok(Reasoning {
                history,
                reply: Some(reply),
            })
        }
    }

    struct FailingReasoner;

    #[async_trait]
    impl Reasoner for FailingReasoner {
        async fn run(&self, _history: Vec<Message>, _tools: &ToolRegistry) -> Result<Reasoning, Error> {
            Err(ProviderError::Network("connection reset".into()).into())
        }
    }

    struct SilentReasoner;

    #[async_trait]
    impl Reasoner for SilentReasoner {
        async fn run(&self, history: Vec<Message>, _tools: &ToolRegistry) -> Result<Reasoning, Error> {
            Ok(Reasoning { history, reply: None })
        }
    }

    fn responder(reasoner: Arc<dyn Reasoner>) -> KnowledgeResponder {
        KnowledgeResponder::new(reasoner, Arc::new(ToolRegistry::new()))
    }

    #[tokio::test]
    async fn thread_history_carries_across_calls() {
        let reasoner = Arc::new(CountingReasoner::default());
        let responder = responder(reasoner.clone()).with_system_prompt("sys");

        assert_eq!(responder.chat("first", "t1").await, "seen 1");
        assert_eq!(responder.chat("second", "t1").await, "seen 2");
        assert_eq!(responder.chat("other", "t2").await, "seen 1");

        let inputs = reasoner.inputs.lock().unwrap();
        // System instruction only once, at the head of the thread.
        assert_eq!(inputs[1][0].role, Role::System);
        assert_eq!(inputs[1][0].content, "sys");
        assert_eq!(inputs[1].iter().filter(|m| m.role == Role::System).count(), 1);
        assert_eq!(inputs[1].last().unwrap().content, "second");
    }

    #[tokio::test]
    async fn reasoner_error_becomes_apology_and_keeps_checkpoint() {
        let responder = responder(Arc::new(FailingReasoner));
        let reply = responder.chat("hello", "t1").await;
        assert!(reply.starts_with("I encountered an error while processing your request: "));
        assert!(reply.contains("connection reset"));
        assert!(responder.checkpoints().history("t1").await.is_empty());
    }

    #[tokio::test]
    async fn no_reply_falls_back() {
        let responder = responder(Arc::new(SilentReasoner));
        assert_eq!(
            responder.chat("hello", "t1").await,
            "I'm sorry, I couldn't generate a response at this time."
        );
        // The turn still happened, so it is checkpointed.
        assert_eq!(responder.checkpoints().history("t1").await.len(), 2);
    }

    #[test]
    fn from_config_without_api_key_fails() {
        struct NoAgent;

        #[async_trait]
        impl RemoteAgent for NoAgent {
            async fn chat(&self, _m: &str, _t: &str) -> Result<String, knowbridge_core::RemoteError> {
                Ok(String::new())
            }
            async fn search(
                &self,
                _q: &str,
                _l: usize,
            ) -> Result<Vec<knowbridge_core::SearchHit>, knowbridge_core::RemoteError> {
                Ok(Vec::new())
            }
        }

        let err = KnowledgeResponder::from_config(&AppConfig::default(), Arc::new(NoAgent))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Provider(ProviderError::NotConfigured(_))));
    }
}
