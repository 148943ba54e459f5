//! Operator commands from standard input.
//!
//! Each non-empty line is one JSON-encoded [`OperatorCommand`], e.g.
//! `{"command": "force_event", "kind": "COMET"}`. The line `stop` requests
//! a clean stop. Malformed lines are logged and skipped.

use std::sync::Arc;

use firefly_core::{OperatorCommand, OperatorState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// What one input line asks for.
#[derive(Debug, PartialEq)]
pub enum FeedLine {
    /// Nothing to do.
    Blank,
    /// End the run.
    Stop,
    /// Queue a command.
    Command(OperatorCommand),
}

/// Parse one input line.
pub fn parse_line(line: &str) -> Result<FeedLine, serde_json::Error> {
    match line.trim() {
        "" => Ok(FeedLine::Blank),
        "stop" => Ok(FeedLine::Stop),
        text => serde_json::from_str(text).map(FeedLine::Command),
    }
}

/// Read commands from `input` until it closes, queueing each for the next
/// frame.
pub async fn pump<R>(input: R, operator: Arc<OperatorState>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Command input failed, feed closed");
                break;
            }
        };
        match parse_line(&line) {
            Ok(FeedLine::Blank) => {}
            Ok(FeedLine::Stop) => {
                info!("Stop requested from command input");
                operator.request_stop();
            }
            Ok(FeedLine::Command(command)) => operator.submit(command).await,
            Err(e) => warn!(error = %e, line = %line, "Unparseable operator command"),
        }
    }
}

/// Spawn a task feeding commands from standard input.
pub fn spawn_stdin(operator: Arc<OperatorState>) {
    tokio::spawn(pump(BufReader::new(tokio::io::stdin()), operator));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use firefly_core::config::SimulationBoundsConfig;
    use firefly_types::CosmicEventKind;

    use super::*;

    #[test]
    fn lines_parse() {
        assert_eq!(parse_line("   ").unwrap(), FeedLine::Blank);
        assert_eq!(parse_line("stop").unwrap(), FeedLine::Stop);
        assert_eq!(
            parse_line(r#"{"command": "force_event", "kind": "COMET"}"#).unwrap(),
            FeedLine::Command(OperatorCommand::ForceEvent {
                kind: CosmicEventKind::Comet,
            })
        );
        assert!(parse_line("{not json").is_err());
    }

    #[tokio::test]
    async fn pump_queues_commands_and_honours_stop() {
        let operator = Arc::new(OperatorState::new(16, &SimulationBoundsConfig::default()));
        let input = b"{\"command\": \"pause\"}\ngarbage\n\n{\"command\": \"resume\"}\nstop\n";
        pump(&input[..], Arc::clone(&operator)).await;

        assert_eq!(
            operator.drain_commands().await,
            vec![OperatorCommand::Pause, OperatorCommand::Resume]
        );
        assert!(operator.is_stop_requested());
    }
}
