//! `knowbridge chat`: interactive session against the remote book agent.

use std::future::Future;
use std::io::Write;

use knowbridge_config::AppConfig;
use knowbridge_core::session::SessionInfo;
use knowbridge_session::ChatService;
use tokio::io::AsyncBufRead;
use tracing::info;

use super::repl::{self, Input};

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::remote_client(&config)?;
    let mut service = ChatService::new(client);

    println!();
    println!("  Knowbridge Chat");
    println!("  Book agent: {}", config.remote.book_agent_url);
    println!();

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    run_session(&mut service, stdin, &mut std::io::stdout(), ctrl_c).await?;

    Ok(())
}

/// Drive one session from `reader` until an exit word, end of input, or
/// `shutdown` resolves. Returns the final session summary.
pub async fn run_session<R, W, S>(
    service: &mut ChatService,
    mut reader: R,
    out: &mut W,
    shutdown: S,
) -> std::io::Result<Option<SessionInfo>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let info = service.start_session();
    writeln!(out, "  Session started: {}", info.thread_id)?;
    writeln!(out, "  Type 'exit' or press Ctrl+C to quit.")?;
    writeln!(out)?;

    tokio::pin!(shutdown);

    loop {
        write!(out, "  You > ")?;
        out.flush()?;

        let input = tokio::select! {
            input = repl::next_input(&mut reader) => input?,
            _ = &mut shutdown => {
                writeln!(out)?;
                break;
            }
        };

        match input {
            Input::Exit => break,
            Input::Blank => continue,
            Input::Message(text) => match service.send_message(&text).await {
                Some(response) => {
                    for line in response.message.lines() {
                        writeln!(out, "  Agent > {line}")?;
                    }
                    writeln!(out)?;
                }
                None => {
                    writeln!(out, "  [Error] No response from the book agent. Try again.")?;
                    writeln!(out)?;
                }
            },
        }
    }

    let summary = service.end_session();
    if let Some(summary) = &summary {
        info!(
            thread_id = %summary.thread_id,
            messages = summary.message_count,
            "Chat session ended"
        );
        writeln!(out, "  Session ended")?;
        writeln!(out, "    Thread:   {}", summary.thread_id)?;
        writeln!(out, "    Started:  {}", summary.start_time.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(out, "    Messages: {}", summary.message_count)?;
    }
    Ok(summary)
}
