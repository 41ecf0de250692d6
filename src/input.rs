use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;

/// Unified input reader over a file or stdin.
///
/// The correction pass needs the recording twice. A file is simply opened a
/// second time once the first read is done; stdin is either expected to
/// carry both copies already or is buffered once and replayed.
pub struct InputReader {
    reader: Box<dyn Read>,
    is_pipe: bool,
    total_len: Option<u64>,
}

impl InputReader {
    /// One copy of the input. Use "-" for stdin.
    pub fn single<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let path = input_path.as_ref();
        if is_stdin(path) {
            return Ok(Self {
                reader: Box::new(io::stdin().lock()),
                is_pipe: true,
                total_len: None,
            });
        }

        let file = open(path)?;
        let total_len = file.metadata().ok().map(|m| m.len());
        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            is_pipe: false,
            total_len,
        })
    }

    /// Two copies of the input, back to back.
    ///
    /// For stdin without `buffer_pipe` the caller has to supply both copies.
    pub fn doubled<P: AsRef<Path>>(input_path: P, buffer_pipe: bool) -> Result<Self> {
        let path = input_path.as_ref();
        if is_stdin(path) {
            if !buffer_pipe {
                return Self::single(path);
            }

            let mut data = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to buffer stdin")?;
            log::debug!("Buffered {} bytes of stdin", data.len());

            let total_len = Some(2 * data.len() as u64);
            let replay = Cursor::new(data.clone()).chain(Cursor::new(data));
            return Ok(Self {
                reader: Box::new(replay),
                is_pipe: true,
                total_len,
            });
        }

        let first = open(path)?;
        let total_len = first.metadata().ok().map(|m| 2 * m.len());
        let second = ReopenOnDemand::new(path);
        Ok(Self {
            reader: Box::new(BufReader::new(first).chain(second)),
            is_pipe: false,
            total_len,
        })
    }

    /// Check if this is pipe input
    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }

    /// Bytes this reader will produce, when known up front.
    pub fn total_len(&self) -> Option<u64> {
        self.total_len
    }

    /// Wraps the reader so every read advances `pb`.
    pub fn with_progress(self, pb: Option<ProgressBar>) -> ProgressReader {
        ProgressReader { inner: self, pb }
    }
}

impl Read for InputReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn open(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Opens the file on the first read, so the second copy is read from a fresh
/// handle only after the first copy is exhausted.
struct ReopenOnDemand {
    path: PathBuf,
    reader: Option<BufReader<File>>,
}

impl ReopenOnDemand {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: None,
        }
    }
}

impl Read for ReopenOnDemand {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.reader.is_none() {
            self.reader = Some(BufReader::new(File::open(&self.path)?));
        }
        match &mut self.reader {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

/// Input that reports consumption to a progress bar.
pub struct ProgressReader {
    inner: InputReader,
    pb: Option<ProgressBar>,
}

impl Read for ProgressReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(pb) = &self.pb {
            pb.inc(n as u64);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_is_read_twice() -> Result<()> {
        let path = std::env::temp_dir().join(format!("oggcorrect-input-{}", std::process::id()));
        std::fs::write(&path, b"OggS page bytes")?;

        let mut reader = InputReader::doubled(&path, false)?;
        assert_eq!(reader.total_len(), Some(30));
        assert!(!reader.is_pipe());

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        std::fs::remove_file(&path)?;

        assert_eq!(data, b"OggS page bytesOggS page bytes");
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(InputReader::doubled("/nonexistent/recording.ogg", false).is_err());
    }
}
