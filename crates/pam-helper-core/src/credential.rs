//! Fixed-capacity password buffer.

use std::ffi::CStr;
use zeroize::Zeroizing;

/// Capacity of the credential buffer in bytes, terminator included.
///
/// A password frame must announce fewer than this many bytes.
pub const CREDENTIAL_CAPACITY: usize = 8192;

/// Zero-allocated buffer holding the password as a NUL-terminated string.
///
/// The contents are wiped when the buffer is dropped.
pub struct Credential {
    buf: Zeroizing<Vec<u8>>,
    len: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to allocate {capacity}-byte password buffer")]
pub struct AllocError {
    pub capacity: usize,
}

impl Credential {
    /// Allocate a zeroed buffer of `capacity` bytes.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub fn with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| AllocError { capacity })?;
        buf.resize(capacity, 0);
        Ok(Self {
            buf: Zeroizing::new(buf),
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writable region for a payload of `len` bytes.
    ///
    /// Returns `None` when `len` leaves no room for the terminator.
    pub(crate) fn payload_mut(&mut self, len: usize) -> Option<&mut [u8]> {
        if len >= self.buf.len() {
            return None;
        }
        Some(&mut self.buf[..len])
    }

    /// Record that `len` payload bytes were filled and terminate them.
    pub(crate) fn commit(&mut self, len: usize) {
        debug_assert!(len < self.buf.len());
        self.buf[len] = 0;
        self.len = len;
    }

    /// Raw payload bytes, terminator excluded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The password as a C string.
    ///
    /// A payload with an embedded NUL reads as its prefix up to that NUL, the
    /// same view `strdup` would take of it.
    pub fn as_c_str(&self) -> &CStr {
        // commit() always places a terminator at `len`; only a zero-capacity
        // buffer has no byte there.
        self.buf
            .get(..=self.len)
            .and_then(|bytes| CStr::from_bytes_until_nul(bytes).ok())
            .unwrap_or_default()
    }
}
