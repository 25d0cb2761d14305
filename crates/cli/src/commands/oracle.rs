//! `apeiron oracle` - Speak with a concept, interactively or with one message.

use std::future::Future;
use std::io::Write;

use apeiron_oracle::{OracleSession, StreamPolicy, StreamingResponder};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

pub async fn run(topic: &str, message: Option<String>) -> super::CommandResult {
    let config = super::load_config()?;
    super::require_api_key(&config)?;

    let catalog = super::load_catalog(&config)?;
    let provider = super::default_provider(&config)?;

    // Accept either an id or a free-form title
    let title = catalog
        .topic(topic)
        .map(|t| t.title.clone())
        .unwrap_or_else(|| topic.to_string());

    let responder = StreamingResponder::new(provider, catalog, config.model())
        .with_policy(StreamPolicy::from(&config.oracle))
        .with_temperature(config.default_temperature);
    let mut session = OracleSession::new(title);

    if let Some(msg) = message {
        // Single message mode
        relay(&mut session, &responder, &msg).await?;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║             The Oracle — Interactive           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.model());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Ctrl+C interrupts a reply. Type 'exit' or Ctrl+C at the prompt to quit.");
    println!();
    if let Some(greeting) = session.messages().first() {
        println!("  Oracle > {}", greeting.text);
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        // The Ctrl+C handler stays installed after the first reply, so the
        // prompt has to watch for it too.
        let Some(line) = read_message(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        relay(&mut session, &responder, line).await?;
    }

    println!();
    println!("  The void closes.");
    println!();

    Ok(())
}

/// Next input line, or `None` on end of input or when `interrupt` fires first.
async fn read_message<R, I>(lines: &mut Lines<R>, interrupt: I) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    tokio::select! {
        biased;
        _ = interrupt => Ok(None),
        line = lines.next_line() => line,
    }
}

/// Print the reply fragment by fragment as it arrives.
async fn relay(
    session: &mut OracleSession,
    responder: &StreamingResponder,
    message: &str,
) -> super::CommandResult {
    let mut turn = session.submit(responder, message)?;
    let mut printed = 0;

    print!("  Oracle > ");
    std::io::stdout().flush()?;

    let interrupted = loop {
        tokio::select! {
            fragment = turn.next() => match fragment {
                Some(text) => {
                    print!("{}", &text[printed..]);
                    std::io::stdout().flush()?;
                    printed = text.len();
                }
                None => break false,
            },
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    if interrupted {
        turn.close();
        print!(" [interrupted]");
    }
    println!();
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_lines_until_end_of_input() {
        let input: &[u8] = b"What are you?\nexit\n";
        let mut lines = BufReader::new(input).lines();

        let first = read_message(&mut lines, std::future::pending::<()>()).await.unwrap();
        assert_eq!(first.as_deref(), Some("What are you?"));
        let second = read_message(&mut lines, std::future::pending::<()>()).await.unwrap();
        assert_eq!(second.as_deref(), Some("exit"));
        let end = read_message(&mut lines, std::future::pending::<()>()).await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn interrupt_ends_waiting_prompt() {
        // An open pipe with no input keeps `next_line` pending
        let (reader, mut writer) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let line = read_message(&mut lines, std::future::ready(())).await.unwrap();
        assert!(line.is_none());

        // Input that arrives afterwards is still readable
        writer.write_all(b"still here\n").await.unwrap();
        let line = read_message(&mut lines, std::future::pending::<()>()).await.unwrap();
        assert_eq!(line.as_deref(), Some("still here"));
    }
}
