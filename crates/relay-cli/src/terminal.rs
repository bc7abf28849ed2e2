use std::io::Write;

use relay_client::{DisplayMessage, MessageSink};
use relay_harness::Role;

/// Writes assistant text to `out` as it grows.
///
/// Only the new suffix of a message is written. When a message is replaced
/// (the apology after a failed read) the replacement goes on a fresh line.
pub struct TerminalSink<W> {
    out: W,
    current: Option<uuid::Uuid>,
    shown: String,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: None,
            shown: String::new(),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn write_update(&mut self, message: &DisplayMessage) -> std::io::Result<()> {
        if self.current != Some(message.id()) {
            self.current = Some(message.id());
            self.shown.clear();
        }
        let content = message.content();
        match content.strip_prefix(self.shown.as_str()) {
            Some(suffix) => write!(self.out, "{suffix}")?,
            None => write!(self.out, "\n{content}")?,
        }
        self.shown.clear();
        self.shown.push_str(content);
        if message.is_finalized() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> MessageSink for TerminalSink<W> {
    fn render(&mut self, message: &DisplayMessage) {
        if message.role() != Role::Assistant {
            return;
        }
        if let Err(e) = self.write_update(message) {
            tracing::warn!(error = %e, "failed to write answer to terminal");
        }
    }
}
