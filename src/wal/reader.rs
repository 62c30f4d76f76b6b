//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, StoreError};
use super::{WalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    /// Buffered handle to the log
    reader: BufReader<File>,

    /// Byte offset just past the last entry read successfully
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file. A torn header or body, a
    /// checksum mismatch, or an LSN that disagrees with its header is
    /// reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(StoreError::WalCorruption(format!(
                "truncated header at offset {} ({} of {} bytes)",
                self.position, read, HEADER_SIZE
            )));
        }

        let lsn = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let crc = u32::from_le_bytes(header[8..12].try_into().unwrap_or_default());
        let len = u32::from_le_bytes(header[12..16].try_into().unwrap_or_default()) as usize;

        // The writer never produces a larger body, so this is a damaged header
        if len > MAX_ENTRY_SIZE {
            return Err(StoreError::WalCorruption(format!(
                "entry {} at offset {} claims {} bytes",
                lsn, self.position, len
            )));
        }

        let mut data = vec![0u8; len];
        let read = read_full(&mut self.reader, &mut data)?;
        if read < len {
            return Err(StoreError::WalCorruption(format!(
                "truncated entry {} at offset {} ({} of {} bytes)",
                lsn, self.position, read, len
            )));
        }

        if WalEntry::compute_crc(&data) != crc {
            return Err(StoreError::WalCorruption(format!(
                "checksum mismatch for entry {} at offset {}",
                lsn, self.position
            )));
        }

        let entry = WalEntry::deserialize(&data)?;
        if entry.lsn != lsn {
            return Err(StoreError::WalCorruption(format!(
                "entry at offset {} claims LSN {} but header says {}",
                self.position, entry.lsn, lsn
            )));
        }

        self.position += (HEADER_SIZE + len) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last valid entry
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
///
/// Stops after the first error.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
