//! Text / JSON rendering of command results.

use std::fmt::Write as _;

use serde_json::Value;

/// What a command produced.
#[derive(Debug)]
pub struct Report {
    text: String,
    json: Value,
    /// False makes the process exit with status 1.
    pub success: bool,
}

impl Report {
    pub fn new(json: Value) -> Self {
        Self {
            text: String::new(),
            json,
            success: true,
        }
    }

    /// Append one line of text output.
    #[must_use]
    pub fn line(mut self, line: impl AsRef<str>) -> Self {
        let _ = writeln!(self.text, "{}", line.as_ref());
        self
    }

    #[must_use]
    pub fn lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines.into_iter().fold(self, Self::line)
    }

    #[must_use]
    pub const fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    pub const fn json(&self) -> &Value {
        &self.json
    }

    /// Rendered output, ending with a newline unless empty.
    pub fn render(&self, json: bool) -> String {
        if json {
            let mut out = serde_json::to_string_pretty(&self.json).unwrap_or_default();
            out.push('\n');
            out
        } else {
            self.text.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_either_form() {
        let r = Report::new(json!({ "n": 2 })).line("a").lines(["b", "c"]);
        assert_eq!(r.render(false), "a\nb\nc\n");
        assert_eq!(r.render(true), "{\n  \"n\": 2\n}\n");
        assert!(r.success);
        assert!(!r.failed().success);
    }
}
