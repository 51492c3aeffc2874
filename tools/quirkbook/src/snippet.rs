use crate::sandbox::{Sandbox, Thrown};
use crate::types::ErrorKind;

pub type SnippetBody = fn(&mut Sandbox) -> Result<(), Thrown>;

/// What a snippet is recorded to do when run under default options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Transcript(&'static [&'static str]),
    /// Any one of these transcripts is acceptable.
    OneOf(&'static [&'static [&'static str]]),
    /// The run throws after emitting `transcript`.
    Throws {
        kind: ErrorKind,
        message: &'static str,
        transcript: &'static [&'static str],
    },
    /// The run never settles on its own.
    Hang,
}

impl Expectation {
    pub fn describe(&self) -> String {
        match self {
            Self::Transcript(lines) => format!("transcript of {} line(s)", lines.len()),
            Self::OneOf(options) => format!("one of {} transcripts", options.len()),
            Self::Throws { kind, message, .. } => format!("throws {}: {message}", kind.as_str()),
            Self::Hang => "hang".to_string(),
        }
    }
}

pub struct Snippet {
    pub name: &'static str,
    pub topic: &'static str,
    pub summary: &'static str,
    pub deterministic: bool,
    pub body: SnippetBody,
    pub expected: Expectation,
}

impl std::fmt::Debug for Snippet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snippet")
            .field("name", &self.name)
            .field("topic", &self.topic)
            .field("deterministic", &self.deterministic)
            .field("expected", &self.expected)
            .finish()
    }
}
