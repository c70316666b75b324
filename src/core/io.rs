//! Input loading and feed-loop helpers
//!
//! The scanner itself never reads; callers load the input and feed it in
//! slices. [`SmartInput`] loads a file with an automatically selected
//! strategy (memory mapping for large files, plain read otherwise) and
//! [`ChunkFeeder`] drives a [`VcfScanner`] feed loop over the loaded
//! bytes.

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::error::ParsingEvent;
use super::scanner::VcfScanner;

/// Default feed buffer size (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Threshold for using memory mapping (100MB)
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;

/// File contents loaded with the optimal strategy for their size.
pub enum SmartInput {
    /// Whole file read into memory
    Owned(Vec<u8>),
    /// Memory-mapped file
    Mapped(Mmap),
}

impl SmartInput {
    /// Opens `path`, memory-mapping it when it is at least
    /// [`MMAP_THRESHOLD`] bytes.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();

        if file_size >= MMAP_THRESHOLD {
            // SAFETY: the mapping is read-only and the file is assumed
            // not to be truncated while mapped.
            let mmap = unsafe { Mmap::map(&file)? };
            Ok(SmartInput::Mapped(mmap))
        } else {
            let mut data = Vec::with_capacity(file_size as usize);
            file.read_to_end(&mut data)?;
            Ok(SmartInput::Owned(data))
        }
    }

    /// The loaded bytes.
    pub fn bytes(&self) -> &[u8] {
        match self {
            SmartInput::Owned(data) => data,
            SmartInput::Mapped(mmap) => mmap,
        }
    }
}

/// Feeds a byte slice to a [`VcfScanner`] in fixed-size chunks, supplying
/// the empty EOF chunk once the data runs out.
pub struct ChunkFeeder<'a> {
    data: &'a [u8],
    offset: usize,
    chunk_size: usize,
}

impl<'a> ChunkFeeder<'a> {
    pub fn new(data: &'a [u8], chunk_size: usize) -> Self {
        ChunkFeeder {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    fn next_chunk(&mut self) -> &'a [u8] {
        let end = self.data.len().min(self.offset + self.chunk_size);
        let chunk = &self.data[self.offset..end];
        self.offset = end;
        chunk
    }

    /// Feeds chunks until the suspended operation completes.
    pub fn complete(&mut self, scanner: &mut VcfScanner<'a>, event: ParsingEvent) -> ParsingEvent {
        let mut event = event;
        while event == ParsingEvent::NeedMoreData {
            let chunk = self.next_chunk();
            event = scanner.feed(chunk);
        }
        event
    }

    /// Starts `op` on the scanner and feeds chunks until it completes.
    pub fn run(
        &mut self,
        scanner: &mut VcfScanner<'a>,
        op: impl FnOnce(&mut VcfScanner<'a>) -> ParsingEvent,
    ) -> ParsingEvent {
        let event = op(scanner);
        self.complete(scanner, event)
    }
}
