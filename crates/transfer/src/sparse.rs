use std::io::{self, Seek, SeekFrom, Write};

/// Sparse-aware writer state for one output file.
///
/// Zero runs are not written; they accumulate as a pending seek that is
/// flushed right before the next non-zero bytes. [`finish`](Self::finish)
/// materializes a trailing hole by seeking to its last byte and writing a
/// single zero, so the file ends up with the correct length even when the
/// content ends in zeros.
#[derive(Debug, Default)]
pub struct SparseWriteState {
    pending: u64,
}

impl SparseWriteState {
    /// Fresh state with no pending hole.
    #[must_use]
    pub fn new() -> Self {
        Self { pending: 0 }
    }

    /// Bytes of zero run accumulated but not yet materialized.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.pending
    }

    /// Adds `len` bytes of zeros to the pending hole.
    pub fn accumulate(&mut self, len: u64) {
        self.pending += len;
    }

    /// Converts the pending hole into a seek.
    pub fn flush<W: Write + Seek>(&mut self, out: &mut W) -> io::Result<()> {
        if self.pending > 0 {
            out.seek(SeekFrom::Current(self.pending as i64))?;
            self.pending = 0;
        }
        Ok(())
    }

    /// Writes `data`, turning its leading and trailing zero runs into holes.
    pub fn write<W: Write + Seek>(&mut self, out: &mut W, data: &[u8]) -> io::Result<()> {
        let leading = data.iter().take_while(|&&b| b == 0).count();
        if leading == data.len() {
            self.accumulate(leading as u64);
            return Ok(());
        }
        let trailing = data.iter().rev().take_while(|&&b| b == 0).count();

        self.accumulate(leading as u64);
        self.flush(out)?;
        out.write_all(&data[leading..data.len() - trailing])?;
        self.accumulate(trailing as u64);
        Ok(())
    }

    /// Materializes a trailing hole, fixing the file's final length.
    pub fn finish<W: Write + Seek>(&mut self, out: &mut W) -> io::Result<()> {
        if self.pending > 0 {
            out.seek(SeekFrom::Current(self.pending as i64 - 1))?;
            out.write_all(&[0])?;
            self.pending = 0;
        }
        Ok(())
    }
}
