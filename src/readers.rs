use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

/// Read buffer for input files
pub const DEFAULT_READ_BUFFER: usize = 256 * 1024;

/// Streams through several inputs in order as if they were one.
///
/// `-` stands for stdin. Files that can't be opened are skipped with a warning.
/// A file that doesn't end in a newline never runs into the next one.
pub struct MultiFileReader {
    files: Vec<String>,
    current_file_idx: usize,
    current_reader: Option<Box<dyn BufRead + Send>>,
    buffer_size: usize,
    skipped: Vec<String>,
}

impl MultiFileReader {
    pub fn new(files: Vec<String>) -> Self {
        Self::with_buffer_size(files, DEFAULT_READ_BUFFER)
    }

    pub fn with_buffer_size(files: Vec<String>, buffer_size: usize) -> Self {
        Self {
            files,
            current_file_idx: 0,
            current_reader: None,
            buffer_size,
            skipped: Vec::new(),
        }
    }

    /// Inputs that could not be opened so far
    pub fn skipped_files(&self) -> &[String] {
        &self.skipped
    }

    fn ensure_current_reader(&mut self) -> bool {
        while self.current_reader.is_none() && self.current_file_idx < self.files.len() {
            let file_path = &self.files[self.current_file_idx];

            if file_path == "-" {
                self.current_reader = Some(Box::new(BufReader::with_capacity(
                    self.buffer_size,
                    io::stdin(),
                )));
                return true;
            }

            match File::open(file_path) {
                Ok(file) => {
                    tracing::debug!(file = %file_path, "Reading input file");
                    self.current_reader =
                        Some(Box::new(BufReader::with_capacity(self.buffer_size, file)));
                    return true;
                }
                Err(e) => {
                    tracing::warn!(file = %file_path, error = %e, "Failed to open input file; skipping");
                    self.skipped.push(file_path.clone());
                    self.current_file_idx += 1;
                }
            }
        }

        self.current_reader.is_some()
    }

    fn advance_to_next_file(&mut self) {
        self.current_reader = None;
        self.current_file_idx += 1;
    }
}

impl Read for MultiFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.ensure_current_reader() {
                return Ok(0);
            }

            if let Some(ref mut reader) = self.current_reader {
                match reader.read(buf)? {
                    0 => {
                        self.advance_to_next_file();
                        continue;
                    }
                    n => return Ok(n),
                }
            }
        }
    }
}

impl BufRead for MultiFileReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if !self.ensure_current_reader() {
            return Ok(&[]);
        }

        match self.current_reader {
            Some(ref mut reader) => reader.fill_buf(),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let Some(ref mut reader) = self.current_reader {
            reader.consume(amt);
        }
    }

    fn read_until(&mut self, byte: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        let start_len = buf.len();
        loop {
            if !self.ensure_current_reader() {
                return Ok(buf.len() - start_len);
            }

            if let Some(ref mut reader) = self.current_reader {
                match reader.read_until(byte, buf)? {
                    0 => {
                        self.advance_to_next_file();

                        // Terminate a final unterminated line at the file boundary
                        if buf.len() > start_len && buf.last() != Some(&byte) {
                            buf.push(byte);
                            return Ok(buf.len() - start_len);
                        }
                        continue;
                    }
                    _ if buf.last() == Some(&byte) => return Ok(buf.len() - start_len),
                    // Partial line at EOF: loop to close it off at the boundary
                    _ => continue,
                }
            }
        }
    }

    fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        let mut bytes = Vec::new();
        let n = self.read_until(b'\n', &mut bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        buf.push_str(&text);
        Ok(n)
    }
}
