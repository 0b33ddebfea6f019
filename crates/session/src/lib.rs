//! Session bookkeeping for conversations with the book agent.

pub mod service;

pub use service::ChatService;
