use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::OutputError;

/// A named destination for rendered tables and decks.
pub struct Sink<'a> {
    name: String,
    writer: Box<dyn Write + 'a>,
}

impl<'a> Sink<'a> {
    pub fn file(path: impl AsRef<Path>) -> Result<Self, OutputError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        match File::create(path) {
            Ok(file) => Ok(Sink { name, writer: Box::new(BufWriter::new(file)) }),
            Err(source) => Err(OutputError { destination: name, source }),
        }
    }

    pub fn stdout() -> Self {
        Sink { name: "<stdout>".to_string(), writer: Box::new(io::stdout()) }
    }

    pub fn from_writer(name: impl Into<String>, writer: impl Write + 'a) -> Self {
        Sink { name: name.into(), writer: Box::new(writer) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes `item` and flushes, so a failure surfaces here rather than on drop.
    pub fn write(&mut self, item: &dyn Display) -> Result<(), OutputError> {
        write!(self.writer, "{}", item)
            .and_then(|()| self.writer.flush())
            .map_err(|source| OutputError { destination: self.name.clone(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_into_buffer() {
        let mut buffer = Vec::new();
        {
            let mut sink = Sink::from_writer("buffer", &mut buffer);
            sink.write(&"HCOPY  000000001033\n").unwrap();
            sink.write(&format_args!("E{:06X}\n", 0)).unwrap();
        }
        assert_eq!(b"HCOPY  000000001033\nE000000\n".to_vec(), buffer);
    }

    #[test]
    fn failure_names_destination() {
        let mut sink = Sink::from_writer("deck.obj", Broken);
        let error = sink.write(&"T").unwrap_err();
        assert_eq!("deck.obj", error.destination);
        assert_eq!(io::ErrorKind::PermissionDenied, error.source.kind());
    }

    #[test]
    fn unwritable_file_is_an_error() {
        let error = Sink::file("/nonexistent/dir/deck.obj").err().unwrap();
        assert_eq!("/nonexistent/dir/deck.obj", error.destination);
    }
}
