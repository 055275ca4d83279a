use crate::processor::ast::Range;

/// What went wrong during a compilation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced file does not exist.
    Resolution,
    /// A directive points back at a file that is still being resolved.
    Circular,
    /// Malformed source text.
    Parse,
    /// Broken invariant inside the compiler itself.
    Internal,
    /// Reading a resource failed.
    Io,
}

/// The single failure envelope of a compilation run.
///
/// Carries the offending file and, when the failure can be pinned to a
/// piece of source, the line/column range.
#[derive(Debug, Clone)]
pub struct BuildError {
    pub message: String,
    pub kind: ErrorKind,
    pub target: Option<String>,
    pub range: Option<Range>,
}

impl BuildError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            target: None,
            range: None,
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn circular(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Circular, message)
    }

    pub fn parse(message: impl Into<String>, range: Range) -> Self {
        Self::new(ErrorKind::Parse, message).at(range)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Attach the file the error belongs to, unless a more specific one
    /// was already recorded deeper down.
    pub fn in_target(mut self, target: impl Into<String>) -> Self {
        if self.target.is_none() {
            self.target = Some(target.into());
        }
        self
    }
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.target, &self.range) {
            (Some(target), Some(range)) => write!(
                f,
                "{}:{}:{}: {}",
                target, range.start.line, range.start.column, self.message
            ),
            (Some(target), None) => write!(f, "{}: {}", target, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ast::Position;

    #[test]
    fn test_display_includes_location_when_known() {
        let range = Range {
            start: Position { line: 3, column: 7 },
            end: Position { line: 3, column: 9 },
        };
        let err = BuildError::parse("unexpected token", range).in_target("/main.src");
        assert_eq!(err.to_string(), "/main.src:3:7: unexpected token");
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_first_target_wins() {
        let err = BuildError::resolution("missing")
            .in_target("/lib.src")
            .in_target("/main.src");
        assert_eq!(err.target.as_deref(), Some("/lib.src"));
        assert_eq!(err.to_string(), "/lib.src: missing");
    }
}
