use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading files produced by the external tool.
///
/// Implementors parse from any buffered reader; path-based reading is provided on top of
/// that so tests can feed in-memory fixtures while callers work with files on disk.
pub trait ResultFile: Sized {
    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Parses the file contents from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the contents do not match the format.
    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error>;

    /// Parses the file contents from an in-memory string.
    fn parse_str(content: &str) -> Result<Self, Self::Error> {
        let mut reader = content.as_bytes();
        Self::read_from(&mut reader)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}
