use std::fmt;

use thiserror::Error;

use crate::parser::ParseError;

/// Runtime error categories. `General` is the plain `Error` constructor and
/// also covers stack overflow and protection violations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    General,
    Eval,
    Range,
    Reference,
    Syntax,
    Type,
    Uri,
}

impl ErrorKind {
    pub const NATIVE: [ErrorKind; 6] = [
        ErrorKind::Eval,
        ErrorKind::Range,
        ErrorKind::Reference,
        ErrorKind::Syntax,
        ErrorKind::Type,
        ErrorKind::Uri,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::General => "Error",
            ErrorKind::Eval => "EvalError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Uri => "URIError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Host-facing failures. Script errors are reported through the host
/// interface instead and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] ParseError),
    #[error("execution aborted")]
    Aborted,
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::General.to_string(), "Error");
        assert_eq!(ErrorKind::Uri.name(), "URIError");
        assert!(!ErrorKind::NATIVE.contains(&ErrorKind::General));
    }

    #[test]
    fn syntax_error_display() {
        let err: Error = crate::parser::parse("var = ;").unwrap_err().into();
        assert!(err.to_string().starts_with("SyntaxError:"));
    }
}
