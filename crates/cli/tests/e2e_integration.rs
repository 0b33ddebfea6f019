//! End-to-end tests: the session and the responder talking to a stand-in
//! book agent over real HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use knowbridge_agent::{KnowledgeResponder, ToolLoopReasoner};
use knowbridge_core::error::ProviderError;
use knowbridge_core::message::{Message, MessageToolCall, Role};
use knowbridge_core::provider::{Provider, ProviderRequest, ProviderResponse};
use knowbridge_remote::{Authenticator, RemoteAgentClient};
use knowbridge_session::ChatService;
use serde_json::{Value, json};

// ── Stand-in book agent ──────────────────────────────────────────────────

/// Remembers a favorite color per thread; serves two search passages.
#[derive(Default)]
struct BookAgent {
    colors: Mutex<HashMap<String, String>>,
}

async fn chat(State(agent): State<Arc<BookAgent>>, Json(body): Json<Value>) -> Json<Value> {
    let message = body["message"].as_str().unwrap_or_default().to_string();
    let thread = body["thread_id"].as_str().unwrap_or_default().to_string();
    let mut colors = agent.colors.lock().unwrap();

    let response = if let Some(color) = message.strip_prefix("Remember this: my favorite color is ") {
        colors.insert(thread, color.to_string());
        "OK, noted.".to_string()
    } else if message == "What is my favorite color?" {
        match colors.get(&thread) {
            Some(color) => format!("Your favorite color is {color}."),
            None => "I don't know yet.".to_string(),
        }
    } else {
        format!("You said: {message}")
    };

    Json(json!({ "response": response }))
}

async fn search(Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default();
    if query == "nothing" {
        return Json(json!({ "result": [] }));
    }
    Json(json!({
        "result": [
            {"book_id": "the-sovereign-individual", "content": "Power follows the economics of protection.", "page_number": 3},
            {"book_id": "the-bitcoin-standard", "content": "Hard money rewards saving."}
        ]
    }))
}

async fn spawn_book_agent() -> String {
    let router = Router::new()
        .route("/chat", post(chat))
        .route("/search", post(search))
        .with_state(Arc::new(BookAgent::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(url: &str) -> Arc<RemoteAgentClient> {
    let auth = Arc::new(Authenticator::with_supplied_token("e2e-token"));
    Arc::new(RemoteAgentClient::new(url, Duration::from_secs(5), auth).unwrap())
}

// ── Mock Provider ────────────────────────────────────────────────────────

/// First asks for a knowledge search, then answers with whatever the
/// search returned.
struct SearchingProvider {
    requests: Mutex<Vec<ProviderRequest>>,
}

#[async_trait::async_trait]
impl Provider for SearchingProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());

        let last = request.messages.last().cloned().unwrap_or_else(|| Message::user(""));
        let message = if last.role == Role::Tool {
            Message::assistant(format!("Here is what I found. {}", last.content))
        } else {
            let mut msg = Message::assistant("");
            msg.tool_calls.push(MessageToolCall {
                id: "call_1".into(),
                name: "search_knowledge".into(),
                arguments: json!({ "query": last.content }).to_string(),
            });
            msg
        };

        Ok(ProviderResponse {
            message,
            usage: None,
            model: "e2e-model".into(),
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_remembers_across_turns() {
    let url = spawn_book_agent().await;
    let mut service = ChatService::new(client(&url));
    service.start_session();

    let first = service
        .send_message("Remember this: my favorite color is purple")
        .await
        .unwrap();
    assert_eq!(first.message, "OK, noted.");

    let second = service.send_message("What is my favorite color?").await.unwrap();
    assert!(second.message.contains("purple"));

    let summary = service.end_session().unwrap();
    assert_eq!(summary.message_count, 2);
}

#[tokio::test]
async fn new_session_gets_a_new_thread() {
    let url = spawn_book_agent().await;
    let mut service = ChatService::new(client(&url));

    service.start_session();
    service
        .send_message("Remember this: my favorite color is purple")
        .await
        .unwrap();
    service.start_session();

    let reply = service.send_message("What is my favorite color?").await.unwrap();
    assert_eq!(reply.message, "I don't know yet.");
}

#[tokio::test]
async fn unreachable_agent_yields_no_response() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut service = ChatService::new(client(&url));
    service.start_session();
    assert!(service.send_message("hello").await.is_none());
    assert_eq!(service.get_session_info().unwrap().message_count, 0);
}

#[tokio::test]
async fn responder_grounds_reply_in_search_results() {
    let url = spawn_book_agent().await;
    let provider = Arc::new(SearchingProvider {
        requests: Mutex::new(Vec::new()),
    });
    let reasoner = ToolLoopReasoner::new(provider.clone(), "e2e-model", 0.7);
    let tools = knowbridge_tools::default_registry(client(&url), 3);
    let responder = KnowledgeResponder::new(Arc::new(reasoner), Arc::new(tools));

    let reply = responder.chat("digital sovereignty", "thread-e2e").await;
    assert!(reply.starts_with("Here is what I found."));
    assert!(reply.contains("From the-sovereign-individual (page 3): Power follows"));
    assert!(reply.contains("\n\nFrom the-bitcoin-standard: Hard money"));

    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools[0].name, "search_knowledge");
    assert_eq!(requests[0].messages[0].role, Role::System);
}

#[tokio::test]
async fn responder_relays_empty_search() {
    let url = spawn_book_agent().await;
    let provider = Arc::new(SearchingProvider {
        requests: Mutex::new(Vec::new()),
    });
    let reasoner = ToolLoopReasoner::new(provider, "e2e-model", 0.7);
    let tools = knowbridge_tools::default_registry(client(&url), 3);
    let responder = KnowledgeResponder::new(Arc::new(reasoner), Arc::new(tools));

    let reply = responder.chat("nothing", "thread-empty").await;
    assert!(reply.ends_with("No relevant insights found in the knowledge base."));
}
