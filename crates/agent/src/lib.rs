//! The knowledge-augmented responder.
//!
//! A language model converses with the user and decides on its own when to
//! consult the book agent's knowledge base. Each turn follows a
//! **Plan → Act → Observe** cycle:
//!
//! 1. **Load** the thread's checkpointed history (system instruction first)
//! 2. **Append** the user message
//! 3. **Send to LLM** with the `search_knowledge` tool definition
//! 4. **If tool calls**: execute them, append results, loop back to step 3
//! 5. **If text response**: checkpoint the history and return the reply
//!
//! Histories are kept in process memory, keyed by thread id.

pub mod checkpoint;
pub mod loop_runner;
pub mod prompt;
pub mod reasoner;
pub mod responder;

pub use checkpoint::MemoryCheckpointStore;
pub use loop_runner::ToolLoopReasoner;
pub use prompt::SYSTEM_INSTRUCTION;
pub use reasoner::{Reasoner, Reasoning};
pub use responder::KnowledgeResponder;
