//! Errors generated by the toolkit.
use thiserror::Error as ThisError;

/// Convenience wrapper to represent success or meaningful tabula error.
pub type TabulaResult<T> = std::result::Result<T, Error>;

/// Errors generated by the toolkit.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The input text could not be parsed.
    #[error("[Parse] {0}")]
    Parse(String),
    /// The design violates a structural invariant.
    #[error("[Malformed Design] {0}")]
    MalformedDesign(String),
    /// A resource class name that the design does not know about.
    #[error("[Unknown Resource Class] `{0}'")]
    UnknownResourceClass(String),
    /// A pass name that was never registered.
    #[error("[Unknown Pass] `{0}'")]
    UnknownPass(String),
    /// A construct that a backend cannot emit.
    #[error("[Unsupported] {0}")]
    Unsupported(String),
    /// Failure to read or write a file.
    #[error("[Invalid File] {0}")]
    InvalidFile(String),
    /// Failure while writing the output.
    #[error("[Write] {0}")]
    Write(String),
    /// A miscellaneous error.
    #[error("{0}")]
    Misc(String),
}

impl Error {
    pub fn parse_error<S: ToString>(msg: S) -> Self {
        Self::Parse(msg.to_string())
    }

    pub fn malformed_design<S: ToString>(msg: S) -> Self {
        Self::MalformedDesign(msg.to_string())
    }

    pub fn unknown_class<S: ToString>(name: S) -> Self {
        Self::UnknownResourceClass(name.to_string())
    }

    pub fn unknown_pass<S: ToString>(name: S) -> Self {
        Self::UnknownPass(name.to_string())
    }

    pub fn unsupported<S: ToString>(msg: S) -> Self {
        Self::Unsupported(msg.to_string())
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self::InvalidFile(msg.to_string())
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self::Write(msg.to_string())
    }

    pub fn misc<S: ToString>(msg: S) -> Self {
        Self::Misc(msg.to_string())
    }

    /// The message carried by the error, without its category prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Parse(m)
            | Error::MalformedDesign(m)
            | Error::UnknownResourceClass(m)
            | Error::UnknownPass(m)
            | Error::Unsupported(m)
            | Error::InvalidFile(m)
            | Error::Write(m)
            | Error::Misc(m) => m,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {e}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::write_error(format!("Formatting Error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_category() {
        let e = Error::malformed_design("table 1 has no initial state");
        assert_eq!(
            e.to_string(),
            "[Malformed Design] table 1 has no initial state"
        );
        assert_eq!(e.message(), "table 1 has no initial state");
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> TabulaResult<()> {
            Err(std::io::Error::other("disk full"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Write(_))));
    }
}
