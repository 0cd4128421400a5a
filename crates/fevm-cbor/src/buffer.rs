//! Growable byte buffer backing the encoder.
//!
//! Capacity is tracked explicitly so growth is predictable: it is always a
//! multiple of 32 bytes and doubles when an append would overflow it.

use crate::error::BufferError;

/// Capacity used by [`ByteBuffer::new`]
pub const DEFAULT_CAPACITY: usize = 64;

const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a buffer sized for at least `hint` bytes.
    ///
    /// Hints too large to round up are clamped to the largest word-aligned
    /// capacity; use [`ByteBuffer::try_with_capacity`] to surface that case.
    pub fn with_capacity(hint: usize) -> Self {
        Self::try_with_capacity(hint).unwrap_or_else(|_| Self::allocate(usize::MAX - WORD + 1, 0))
    }

    pub fn try_with_capacity(hint: usize) -> Result<Self, BufferError> {
        let capacity = round_up(hint).ok_or(BufferError::CapacityOverflow(hint))?;
        Ok(Self::allocate(capacity, hint.min(DEFAULT_CAPACITY * 16)))
    }

    fn allocate(capacity: usize, reserve: usize) -> Self {
        Self {
            data: Vec::with_capacity(reserve.min(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity; never smaller than `len()` and never shrinks
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn append_u8(&mut self, byte: u8) {
        self.ensure(1);
        self.data.push(byte);
    }

    /// Append the low `width` bytes of `value` in big-endian order.
    pub fn append_int(&mut self, value: u64, width: usize) {
        debug_assert!(width <= 8, "integer width {width} exceeds 8 bytes");
        let width = width.min(8);
        let bytes = value.to_be_bytes();
        self.append(&bytes[8 - width..]);
    }

    /// Consume the buffer and return the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn ensure(&mut self, additional: usize) {
        let required = self.data.len().saturating_add(additional);
        if required <= self.capacity {
            return;
        }

        let doubled = self.capacity.saturating_mul(2);
        let target = round_up(doubled.max(required)).unwrap_or(usize::MAX);
        self.data.reserve(target - self.data.len());
        self.capacity = target;
    }
}

fn round_up(n: usize) -> Option<usize> {
    let n = n.max(WORD);
    match n % WORD {
        0 => Some(n),
        rem => n.checked_add(WORD - rem),
    }
}
