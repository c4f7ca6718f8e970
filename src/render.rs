//! Styled terminal output behind an injectable sink.
//!
//! Everything the shell prints goes through an [`OutputSink`], so tests can
//! capture the exact output with a [`BufferSink`] while the binary uses the
//! ANSI-emitting [`StdoutSink`].

use std::io::Write;

/// Semantic styles the shell uses. The sink decides how they look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Error,
    Success,
    Warning,
    Info,
    /// Directory names in listings.
    Directory,
    /// File content echoed by `cat`.
    FileBody,
    /// The persona part of the prompt.
    Persona,
    /// The `@` separator of the prompt.
    Separator,
    /// The mode tag of the prompt when the shell is in root mode.
    ModeRoot,
    /// The mode tag of the prompt in user mode.
    ModeUser,
    /// The current path in the prompt.
    PromptPath,
    /// The trailing `$>` of the prompt.
    PromptTail,
}

impl Style {
    /// ANSI SGR parameters for this style.
    fn sgr(self) -> &'static str {
        match self {
            Style::Error => "31",
            Style::Success => "32",
            Style::Warning => "33",
            Style::Info => "34",
            Style::Directory => "36",
            Style::FileBody => "33",
            Style::Persona => "1;4;32",
            Style::Separator => "1",
            Style::ModeRoot => "3;32",
            Style::ModeUser => "3;34",
            Style::PromptPath => "35",
            Style::PromptTail => "33",
        }
    }
}

pub trait OutputSink {
    fn write_plain(&mut self, text: &str);
    fn write_styled(&mut self, style: Style, text: &str);

    fn error(&mut self, text: &str) {
        self.write_styled(Style::Error, &format!("[ERROR] {text}"));
    }

    fn success(&mut self, text: &str) {
        self.write_styled(Style::Success, &format!("[SUCCESS] {text}"));
    }

    fn warning(&mut self, text: &str) {
        self.write_styled(Style::Warning, &format!("[WARNING] {text}"));
    }

    fn info(&mut self, text: &str) {
        self.write_styled(Style::Info, &format!("[INFO] {text}"));
    }
}

/// The real sink: ANSI escapes on stdout, flushed eagerly so the prompt
/// shows up before the read on stdin blocks.
#[derive(Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink
    }
}

impl OutputSink for StdoutSink {
    fn write_plain(&mut self, text: &str) {
        let mut out = std::io::stdout();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn write_styled(&mut self, style: Style, text: &str) {
        let mut out = std::io::stdout();
        let _ = write!(out, "\x1b[{}m{}\x1b[0m", style.sgr(), text);
        let _ = out.flush();
    }
}

/// Test sink: keeps each write with its style so assertions can check both
/// content and coloring.
#[derive(Default)]
pub struct BufferSink {
    writes: Vec<(Option<Style>, String)>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All written text, styles ignored.
    pub fn text(&self) -> String {
        self.writes.iter().map(|(_, t)| t.as_str()).collect()
    }

    pub fn writes(&self) -> &[(Option<Style>, String)] {
        &self.writes
    }
}

impl OutputSink for BufferSink {
    fn write_plain(&mut self, text: &str) {
        self.writes.push((None, text.to_string()));
    }

    fn write_styled(&mut self, style: Style, text: &str) {
        self.writes.push((Some(style), text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_helpers_prefix_their_level() {
        let mut sink = BufferSink::new();
        sink.error("boom\n");
        sink.info("fine\n");
        assert_eq!(sink.text(), "[ERROR] boom\n[INFO] fine\n");
        assert_eq!(sink.writes()[0].0, Some(Style::Error));
        assert_eq!(sink.writes()[1].0, Some(Style::Info));
    }

    #[test]
    fn plain_writes_carry_no_style() {
        let mut sink = BufferSink::new();
        sink.write_plain("raw");
        assert_eq!(sink.writes()[0], (None, "raw".to_string()));
    }
}
