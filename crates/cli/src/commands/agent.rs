//! `knowbridge agent`: interactive or single-message chat with the local
//! knowledge-augmented responder.

use std::future::Future;
use std::io::Write;

use knowbridge_agent::KnowledgeResponder;
use knowbridge_config::AppConfig;
use knowbridge_core::message::ThreadId;
use tokio::io::AsyncBufRead;

use super::repl::{self, Input};

pub async fn run(
    config: AppConfig,
    message: Option<String>,
    thread: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Check for an API key early so the error is actionable.
    if config.llm.api_key.is_none() {
        eprintln!();
        eprintln!("  ERROR: No language model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GEMINI_API_KEY=...            (Gemini)");
        eprintln!("    KNOWBRIDGE_LLM_API_KEY=...    (any OpenAI-compatible endpoint)");
        eprintln!();
        eprintln!("  Or add `api_key` under [llm] in:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let client = super::remote_client(&config)?;
    let responder = KnowledgeResponder::from_config(&config, client)?;
    let thread_id = thread.map(ThreadId::from).unwrap_or_default();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = responder.chat(&msg, thread_id.as_str()).await;
        eprint!("\r              \r");
        println!("{response}");
        return Ok(());
    }

    println!();
    println!("  Knowbridge Agent: Interactive Mode");
    println!();
    println!("  Model:   {} ({})", config.llm.model, config.llm.provider);
    println!("  Tools:   search_knowledge");
    println!("  Thread:  {thread_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let turns = converse(&responder, &thread_id, stdin, &mut std::io::stdout(), ctrl_c).await?;

    println!();
    println!("  Goodbye! {turns} message(s) on thread {thread_id}");
    println!();

    Ok(())
}

/// Relay lines from `reader` to the responder until exit, end of input or
/// `shutdown`. Returns the number of turns taken.
pub async fn converse<R, W, S>(
    responder: &KnowledgeResponder,
    thread_id: &ThreadId,
    mut reader: R,
    out: &mut W,
    shutdown: S,
) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut turns = 0;

    loop {
        write!(out, "  You > ")?;
        out.flush()?;

        let input = tokio::select! {
            input = repl::next_input(&mut reader) => input?,
            _ = &mut shutdown => break,
        };

        let text = match input {
            Input::Exit => break,
            Input::Blank => continue,
            Input::Message(text) => text,
        };

        let response = responder.chat(&text, thread_id.as_str()).await;
        turns += 1;

        writeln!(out)?;
        for line in response.lines() {
            writeln!(out, "  Assistant > {line}")?;
        }
        writeln!(out)?;
    }

    Ok(turns)
}
