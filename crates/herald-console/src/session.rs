//! Interactive read-dispatch loop

use crate::commands::Transcript;
use crate::roster::Player;
use herald::CommandGroup;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::debug;

/// One actor typing commands into a command tree.
pub struct Session {
    root: Arc<CommandGroup<Player>>,
    actor: Player,
    transcript: Transcript,
    prompt: String,
    prefix: String,
}

impl Session {
    /// Create a session acting as `actor`.
    pub fn new(
        root: Arc<CommandGroup<Player>>,
        actor: Player,
        transcript: Transcript,
        prompt: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            root,
            actor,
            transcript,
            prompt: prompt.into(),
            prefix: prefix.into(),
        }
    }

    /// The acting player.
    #[must_use]
    pub fn actor(&self) -> &Player {
        &self.actor
    }

    /// Handle a single input line and return the lines to print.
    pub fn handle_line(&self, line: &str) -> Vec<String> {
        let text = self.strip(line);
        if text.is_empty() {
            return Vec::new();
        }

        let handled = self.root.dispatch(&self.actor, text);
        let mut output = self.transcript.drain();
        if handled {
            return output;
        }

        debug!(actor = %self.actor.name, text, "command not handled");
        let candidates = self.root.match_candidates(text);
        if candidates.is_empty() {
            output.push(format!("Unknown command: {text}"));
        } else {
            output.push(format!("Could not run: {text}"));
            for route in candidates {
                output.push(format!("  usage: {}", route.usage()));
            }
        }
        output
    }

    fn strip<'a>(&self, line: &'a str) -> &'a str {
        let line = line.trim();
        line.strip_prefix(self.prefix.as_str()).unwrap_or(line).trim()
    }

    /// Read lines until end of input or `quit`.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> io::Result<()> {
        write!(output, "{}", self.prompt)?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            if matches!(self.strip(&line), "quit" | "exit") {
                break;
            }
            for out in self.handle_line(&line) {
                writeln!(output, "{out}")?;
            }
            write!(output, "{}", self.prompt)?;
            output.flush()?;
        }
        writeln!(output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_command_tree;
    use crate::config::ConsoleConfig;
    use crate::roster::Roster;
    use std::io::Cursor;

    fn session() -> Session {
        let config = ConsoleConfig::default();
        let roster = Arc::new(Roster::from_config(&config.actors));
        let actor = roster.players()[0].clone();
        let transcript = Transcript::default();
        let root = build_command_tree(roster, &transcript).unwrap();
        Session::new(root, actor, transcript, "> ", "/")
    }

    #[test]
    fn test_prefix_is_optional() {
        let session = session();
        assert_eq!(session.handle_line("/say hi"), vec!["<console> hi"]);
        assert_eq!(session.handle_line("upper quiet"), vec!["QUIET"]);
        assert!(session.handle_line("   ").is_empty());
        assert!(session.handle_line("/").is_empty());
    }

    #[test]
    fn test_failure_messages() {
        let session = session();
        assert_eq!(session.handle_line("/dance"), vec!["Unknown command: dance"]);
        assert_eq!(
            session.handle_line("/msg nobody hello"),
            vec!["Could not run: msg nobody hello", "  usage: msg <target> <text>"]
        );
    }

    #[test]
    fn test_run_loop_stops_at_quit() {
        let session = session();
        let input = Cursor::new("/add 1 2\n/quit\n/say never\n");
        let mut output = Vec::new();
        session.run(input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text, "> 3\n> \n");
    }
}
