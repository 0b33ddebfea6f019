//! The reasoning seam between the responder and whatever drives the model.

use async_trait::async_trait;
use knowbridge_core::message::Message;
use knowbridge_core::tool::ToolRegistry;

/// Outcome of one reasoning run.
#[derive(Debug, Clone)]
pub struct Reasoning {
    /// The input history extended with every message produced during the run.
    pub history: Vec<Message>,

    /// The final assistant utterance, if the run produced one.
    pub reply: Option<String>,
}

/// Turns a conversation history into an assistant reply, invoking tools
/// from `tools` as it sees fit.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn run(
        &self,
        history: Vec<Message>,
        tools: &ToolRegistry,
    ) -> Result<Reasoning, knowbridge_core::Error>;
}
