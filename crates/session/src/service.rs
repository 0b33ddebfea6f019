//! The chat service: one conversation thread at a time, delegated to the
//! remote book agent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use knowbridge_core::message::ThreadId;
use knowbridge_core::remote::RemoteAgent;
use knowbridge_core::session::{ChatResponse, SessionInfo};
use tracing::{debug, info, warn};

struct ActiveSession {
    thread_id: ThreadId,
    start_time: DateTime<Utc>,
    message_count: u64,
}

impl ActiveSession {
    fn snapshot(&self) -> SessionInfo {
        SessionInfo {
            thread_id: self.thread_id.clone(),
            start_time: self.start_time,
            message_count: self.message_count,
        }
    }
}

/// Tracks the current conversation thread and counts successful exchanges.
///
/// The remote agent owns the conversation memory; this side only holds
/// the thread id that keys it.
pub struct ChatService {
    agent: Arc<dyn RemoteAgent>,
    session: Option<ActiveSession>,
}

impl ChatService {
    pub fn new(agent: Arc<dyn RemoteAgent>) -> Self {
        Self {
            agent,
            session: None,
        }
    }

    /// Begin a new conversation thread. Any active session is replaced.
    pub fn start_session(&mut self) -> SessionInfo {
        if let Some(previous) = &self.session {
            debug!(
                thread_id = %previous.thread_id,
                messages = previous.message_count,
                "Replacing active session"
            );
        }

        let session = ActiveSession {
            thread_id: ThreadId::new(),
            start_time: Utc::now(),
            message_count: 0,
        };
        info!(thread_id = %session.thread_id, "Session started");

        let info = session.snapshot();
        self.session = Some(session);
        info
    }

    /// Send one message on the active thread.
    ///
    /// Returns `None` when no session is active, when the remote call fails,
    /// or when the agent replies with an empty string. The message count only
    /// advances on a non-empty reply.
    pub async fn send_message(&mut self, text: &str) -> Option<ChatResponse> {
        let session = self.session.as_mut()?;

        let reply = match self.agent.chat(text, session.thread_id.as_str()).await {
            Ok(reply) if !reply.is_empty() => reply,
            Ok(_) => {
                warn!(thread_id = %session.thread_id, "Book agent returned an empty reply");
                return None;
            }
            Err(e) => {
                warn!(thread_id = %session.thread_id, error = %e, "Message not delivered");
                return None;
            }
        };

        session.message_count += 1;
        debug!(thread_id = %session.thread_id, count = session.message_count, "Reply received");

        Some(ChatResponse {
            message: reply,
            thread_id: session.thread_id.clone(),
            timestamp: Utc::now(),
        })
    }

    /// Close the active session, returning its final state.
    pub fn end_session(&mut self) -> Option<SessionInfo> {
        let session = self.session.take()?;
        info!(
            thread_id = %session.thread_id,
            messages = session.message_count,
            "Session ended"
        );
        Some(session.snapshot())
    }

    pub fn get_session_info(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(ActiveSession::snapshot)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.session.as_ref().map(|s| &s.thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowbridge_core::error::RemoteError;
    use knowbridge_core::remote::SearchHit;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies from a script and records what it was sent.
    struct ScriptedAgent {
        replies: Mutex<VecDeque<Result<String, RemoteError>>>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedAgent {
        fn new(replies: Vec<Result<String, RemoteError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<(String, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteAgent for ScriptedAgent {
        async fn chat(&self, message: &str, thread_id: &str) -> Result<String, RemoteError> {
            self.seen
                .lock()
                .unwrap()
                .push((message.to_string(), thread_id.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RemoteError::Transport("script exhausted".into())))
        }

        async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>, RemoteError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn new_service_is_idle() {
        let service = ChatService::new(ScriptedAgent::new(vec![]));
        assert!(!service.is_active());
        assert!(service.thread_id().is_none());
        assert!(service.get_session_info().is_none());
    }

    #[test]
    fn start_session_has_zero_count() {
        let mut service = ChatService::new(ScriptedAgent::new(vec![]));
        let info = service.start_session();
        assert_eq!(info.message_count, 0);
        assert!(service.is_active());
        assert_eq!(service.thread_id(), Some(&info.thread_id));
        assert_eq!(service.get_session_info(), Some(info));
    }

    #[test]
    fn restart_replaces_thread() {
        let mut service = ChatService::new(ScriptedAgent::new(vec![]));
        let first = service.start_session();
        let second = service.start_session();
        assert_ne!(first.thread_id, second.thread_id);
        assert_eq!(service.thread_id(), Some(&second.thread_id));
    }

    #[tokio::test]
    async fn send_while_idle_is_none() {
        let agent = ScriptedAgent::new(vec![Ok("unused".into())]);
        let mut service = ChatService::new(agent.clone());
        assert!(service.send_message("hello").await.is_none());
        assert!(agent.seen().is_empty());
        assert!(!service.is_active());
    }

    #[tokio::test]
    async fn successful_sends_are_counted() {
        let agent = ScriptedAgent::new(vec![Ok("one".into()), Ok("two".into()), Ok("three".into())]);
        let mut service = ChatService::new(agent.clone());
        let info = service.start_session();

        for _ in 0..3 {
            let response = service.send_message("ping").await.unwrap();
            assert_eq!(response.thread_id, info.thread_id);
        }

        assert_eq!(service.get_session_info().unwrap().message_count, 3);
        assert!(agent.seen().iter().all(|(_, t)| t == info.thread_id.as_str()));
    }

    #[tokio::test]
    async fn failed_or_empty_reply_leaves_count() {
        let agent = ScriptedAgent::new(vec![
            Ok("first".into()),
            Err(RemoteError::Status { status_code: 500, body: "boom".into() }),
            Ok(String::new()),
        ]);
        let mut service = ChatService::new(agent);
        service.start_session();

        assert!(service.send_message("a").await.is_some());
        assert!(service.send_message("b").await.is_none());
        assert!(service.send_message("c").await.is_none());
        assert_eq!(service.get_session_info().unwrap().message_count, 1);
        assert!(service.is_active());
    }

    #[tokio::test]
    async fn end_session_returns_final_snapshot() {
        let mut service = ChatService::new(ScriptedAgent::new(vec![Ok("hi".into())]));
        assert!(service.end_session().is_none());

        let started = service.start_session();
        service.send_message("hello").await.unwrap();
        let ended = service.end_session().unwrap();

        assert_eq!(ended.thread_id, started.thread_id);
        assert_eq!(ended.start_time, started.start_time);
        assert_eq!(ended.message_count, 1);
        assert!(!service.is_active());
        assert!(service.end_session().is_none());
    }

    #[tokio::test]
    async fn remembers_favorite_color_on_same_thread() {
        let agent = ScriptedAgent::new(vec![
            Ok("OK, noted.".into()),
            Ok("Your favorite color is purple.".into()),
        ]);
        let mut service = ChatService::new(agent.clone());
        service.start_session();

        let first = service
            .send_message("Remember this: my favorite color is purple")
            .await
            .unwrap();
        assert_eq!(first.message, "OK, noted.");

        let second = service.send_message("What is my favorite color?").await.unwrap();
        assert!(second.message.contains("purple"));

        let seen = agent.seen();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, seen[1].1);
    }
}
