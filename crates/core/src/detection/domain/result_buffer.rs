//! Caller-owned scratch memory the detection engine writes its results into.
//!
//! The engine never takes ownership of the buffer and never hands memory
//! back: it returns a view into the same bytes, valid only until the next
//! detection call on that buffer. [`RawResultView`] borrows the buffer, so
//! the borrow checker rejects a second call while a view is still alive.
//! One buffer per worker; buffers are never shared between concurrent calls.

use thiserror::Error;

use super::detection_engine::EngineError;

const WORD: usize = std::mem::size_of::<u32>();

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BufferError {
    #[error("result buffer capacity must be a non-zero multiple of 4 bytes, got {0}")]
    InvalidCapacity(usize),
    #[error("cannot allocate {0} bytes for the result buffer")]
    Allocation(usize),
}

/// Fixed-capacity result buffer, 4-byte aligned.
///
/// Allocated once per worker and reused for every detection call. The
/// capacity never changes after acquisition.
pub struct ResultBuffer {
    words: Vec<u32>,
}

impl ResultBuffer {
    pub fn acquire(capacity_bytes: usize) -> Result<Self, BufferError> {
        if capacity_bytes == 0 || capacity_bytes % WORD != 0 {
            return Err(BufferError::InvalidCapacity(capacity_bytes));
        }
        let len = capacity_bytes / WORD;
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|_| BufferError::Allocation(capacity_bytes))?;
        words.resize(len, 0);
        Ok(Self { words })
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * WORD
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    /// Start of the buffer, for handing to a native engine.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr().cast()
    }
}

impl std::fmt::Debug for ResultBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultBuffer")
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// Non-owning, read-only view of an engine result inside a [`ResultBuffer`].
///
/// A null view means the engine returned no result, which decodes as zero faces.
#[derive(Clone, Copy, Debug)]
pub struct RawResultView<'b> {
    bytes: Option<&'b [u8]>,
}

impl<'b> RawResultView<'b> {
    pub fn null() -> Self {
        Self { bytes: None }
    }

    /// View starting at the beginning of `bytes` and running to its end.
    pub fn new(bytes: &'b [u8]) -> Self {
        Self { bytes: Some(bytes) }
    }

    /// View of a whole buffer, for engines that write results at offset 0.
    pub fn of_buffer(buffer: &'b ResultBuffer) -> Self {
        Self::new(buffer.as_bytes())
    }

    /// Converts a pointer returned by a native engine into a view.
    ///
    /// A null pointer is the engine's "no result" and maps to [`RawResultView::null`].
    /// Any other pointer must point into `buffer` at a 4-byte aligned offset.
    pub fn from_engine_pointer(
        buffer: &'b ResultBuffer,
        ptr: *const u8,
    ) -> Result<Self, EngineError> {
        if ptr.is_null() {
            return Ok(Self::null());
        }
        let bytes = buffer.as_bytes();
        let start = bytes.as_ptr() as usize;
        let addr = ptr as usize;
        if addr < start || addr >= start + bytes.len() {
            return Err(EngineError::ForeignPointer);
        }
        let offset = addr - start;
        if offset % WORD != 0 {
            return Err(EngineError::ForeignPointer);
        }
        Ok(Self::new(&bytes[offset..]))
    }

    pub fn is_null(&self) -> bool {
        self.bytes.is_none()
    }

    pub fn bytes(&self) -> Option<&'b [u8]> {
        self.bytes
    }
}
