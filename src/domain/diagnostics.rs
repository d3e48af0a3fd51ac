//! Diagnostics sink for operators.
//!
//! Lines are only collected for privileged callers; for everyone else every
//! write is a no-op.

#[derive(Debug, Default)]
pub struct Diagnostics {
    privileged: bool,
    lines: Vec<String>,
}

impl Diagnostics {
    pub fn new(privileged: bool) -> Self {
        Self {
            privileged,
            lines: Vec::new(),
        }
    }

    /// A sink that never records anything.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn add(&mut self, line: impl Into<String>) {
        if self.privileged {
            self.lines.push(line.into());
        }
    }

    /// Discards everything collected so far.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain-text rendering, one line per entry.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}
