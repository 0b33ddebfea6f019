//! Line input shared by the interactive commands.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Words that end an interactive session.
pub const EXIT_WORDS: &[&str] = &["exit", "quit", "bye", "/exit", "/quit", ":q"];

pub fn is_exit_word(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    EXIT_WORDS.contains(&line.as_str())
}

#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Blank,
    Exit,
}

/// Read the next line. End of input counts as an exit.
pub async fn next_input<R>(reader: &mut R) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(Input::Exit);
    }

    let line = line.trim();
    Ok(if line.is_empty() {
        Input::Blank
    } else if is_exit_word(line) {
        Input::Exit
    } else {
        Input::Message(line.to_string())
    })
}
