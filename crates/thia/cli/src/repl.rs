//! Interactive chat loop
//!
//! One line in, one reply out. The loop ends on an exit command, at end
//! of input, or when the interrupt future resolves (Ctrl-C in the binary).

use std::future::Future;
use std::io::Write;

use thia_engine::Thia;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::CliResult;

/// Why a chat session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The user typed an exit command
    Command,
    /// Input was closed
    EndOfInput,
    /// The interrupt signal arrived
    Interrupted,
}

/// A chat session over arbitrary input and output streams
pub struct Repl<'c> {
    thia: Thia<'c>,
    show_banner: bool,
}

impl<'c> Repl<'c> {
    pub fn new(thia: Thia<'c>) -> Self {
        Self {
            thia,
            show_banner: true,
        }
    }

    pub fn with_banner(mut self, show_banner: bool) -> Self {
        self.show_banner = show_banner;
        self
    }

    /// Run until the user leaves, input ends or `interrupt` resolves.
    ///
    /// An `interrupt` that fails (no signal handler could be installed)
    /// is logged and ignored for the rest of the session.
    pub async fn run<R, W, F>(&self, mut reader: R, mut writer: W, interrupt: F) -> CliResult<ExitReason>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        F: Future<Output = std::io::Result<()>>,
    {
        let phrases = &self.thia.catalog().phrases;
        tokio::pin!(interrupt);
        let mut interrupt_armed = true;

        if self.show_banner {
            writeln!(writer, "{}", phrases.banner)?;
        }

        loop {
            write!(writer, "{}", phrases.prompt)?;
            writer.flush()?;

            let mut line = Vec::new();
            let read = loop {
                tokio::select! {
                    read = reader.read_until(b'\n', &mut line) => break Some(read?),
                    signal = &mut interrupt, if interrupt_armed => match signal {
                        Ok(()) => break None,
                        Err(err) => {
                            tracing::warn!(error = %err, "Cannot listen for interrupts");
                            interrupt_armed = false;
                        }
                    },
                }
            };

            let reason = match read {
                None => Some(ExitReason::Interrupted),
                Some(0) => Some(ExitReason::EndOfInput),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                writeln!(writer)?;
                writeln!(writer, "{}", phrases.interrupted_farewell)?;
                tracing::debug!(?reason, "Chat session ended");
                return Ok(reason);
            }

            // Undecodable bytes become U+FFFD so the line still gets an answer
            let line = String::from_utf8_lossy(&line);
            let text = line.trim();
            if phrases.is_exit_command(text) {
                writeln!(writer, "{}", phrases.farewell)?;
                tracing::debug!(reason = ?ExitReason::Command, "Chat session ended");
                return Ok(ExitReason::Command);
            }

            writeln!(writer, "{}{}", phrases.reply_prefix, self.thia.respond(text))?;
        }
    }
}
