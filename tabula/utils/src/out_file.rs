use crate::{Error, TabulaResult};
use std::{
    io::{self, BufWriter},
    path::PathBuf,
    str::FromStr,
};

/// Destination of a backend, chosen with `-o`. `-` and `<out>` name
/// stdout, `<err>` stderr and `<null>` discards everything; anything else
/// is a file path.
#[derive(Debug, Clone)]
pub enum OutputFile {
    Null,
    Stdout,
    Stderr,
    /// `opened` is set once the file has been truncated.
    File { path: PathBuf, opened: bool },
}

impl OutputFile {
    pub fn file(path: PathBuf) -> Self {
        OutputFile::File {
            path,
            opened: false,
        }
    }

    /// Open the stream. A file is truncated on first use and appended to
    /// afterwards.
    pub fn get_write(&mut self) -> TabulaResult<Box<dyn io::Write>> {
        Ok(match self {
            OutputFile::Stdout => Box::new(BufWriter::new(io::stdout())),
            OutputFile::Stderr => Box::new(BufWriter::new(io::stderr())),
            OutputFile::File { path, opened } => {
                let file = if *opened {
                    std::fs::OpenOptions::new().append(true).open(&*path)
                } else {
                    *opened = true;
                    std::fs::File::create(&*path)
                }
                .map_err(|e| {
                    Error::invalid_file(format!(
                        "{}: {e}",
                        path.to_string_lossy()
                    ))
                })?;
                Box::new(BufWriter::new(file))
            }
            OutputFile::Null => Box::new(io::sink()),
        })
    }
}

impl FromStr for OutputFile {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "-" | "<out>" => Ok(OutputFile::Stdout),
            "<err>" => Ok(OutputFile::Stderr),
            "<null>" => Ok(OutputFile::Null),
            _ => Ok(OutputFile::file(PathBuf::from(s))),
        }
    }
}

impl std::fmt::Display for OutputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFile::Stdout => write!(f, "-"),
            OutputFile::Stderr => write!(f, "<err>"),
            OutputFile::Null => write!(f, "<null>"),
            OutputFile::File { path, .. } => {
                write!(f, "{}", path.to_string_lossy())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_streams() {
        assert!(matches!("-".parse(), Ok(OutputFile::Stdout)));
        assert!(matches!("<err>".parse(), Ok(OutputFile::Stderr)));
        assert!(matches!("<null>".parse(), Ok(OutputFile::Null)));
        let f: OutputFile = "out.v".parse().unwrap();
        assert_eq!(f.to_string(), "out.v");
    }

    #[test]
    fn file_truncated_once() {
        let path = std::env::temp_dir().join(format!("tabula-out-{}.txt", std::process::id()));
        std::fs::write(&path, "stale").unwrap();
        let mut out = OutputFile::file(path.clone());
        out.get_write().unwrap().write_all(b"a").unwrap();
        out.get_write().unwrap().write_all(b"b").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ab");
        std::fs::remove_file(&path).unwrap();
    }
}
