//! Length-prefixed framing between the helper and its caller.
//!
//! Helper → caller (stdout):
//!   tag:c_int  len:usize  text:[u8; len]
//! Caller → helper (stdin):
//!   len:usize  password:[u8; len]
//!
//! All integers are in host byte order. Every part goes through exactly one
//! `write`/`read` call; a short transfer is an error, never resumed. The one
//! exception is `WouldBlock` on the password length, which is retried.

use crate::credential::Credential;
use crate::ffi::PAM_PROMPT_ECHO_OFF;
use std::io::{self, Read, Write};

/// Prompt text sent with the hidden-input tag.
pub const PASSWORD_PROMPT: &str = "Password";

const LEN_SIZE: usize = std::mem::size_of::<usize>();

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("write of {part} failed: {source}")]
    Write {
        part: &'static str,
        source: io::Error,
    },
    #[error("short write of {part}: {actual} of {expected} bytes")]
    ShortWrite {
        part: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("read of {part} failed: {source}")]
    Read {
        part: &'static str,
        source: io::Error,
    },
    #[error("short read of {part}: {actual} of {expected} bytes")]
    ShortRead {
        part: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("password length {len} exceeds buffer capacity {capacity}")]
    TooLong { len: usize, capacity: usize },
}

/// A prompt frame: message style tag plus prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt<'a> {
    pub style: libc::c_int,
    pub text: &'a [u8],
}

impl Prompt<'static> {
    /// The only prompt the helper sends: hidden input, text "Password".
    pub fn password() -> Self {
        Self {
            style: PAM_PROMPT_ECHO_OFF,
            text: PASSWORD_PROMPT.as_bytes(),
        }
    }
}

impl Prompt<'_> {
    /// Write the frame as three separate writes.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), FrameError> {
        write_part(out, "prompt tag", &self.style.to_ne_bytes())?;
        write_part(out, "prompt length", &self.text.len().to_ne_bytes())?;
        write_part(out, "prompt text", self.text)?;
        out.flush().map_err(|source| FrameError::Write {
            part: "prompt",
            source,
        })
    }
}

fn write_part<W: Write>(out: &mut W, part: &'static str, bytes: &[u8]) -> Result<(), FrameError> {
    let written = out
        .write(bytes)
        .map_err(|source| FrameError::Write { part, source })?;
    if written != bytes.len() {
        return Err(FrameError::ShortWrite {
            part,
            expected: bytes.len(),
            actual: written,
        });
    }
    Ok(())
}

/// Read one password frame into `cred`. Returns the payload length.
///
/// The length prefix read spins on `WouldBlock` with no backoff. A length
/// that does not fit `cred` is rejected before any payload byte is read.
pub fn read_password<R: Read>(input: &mut R, cred: &mut Credential) -> Result<usize, FrameError> {
    let mut len_bytes = [0u8; LEN_SIZE];
    let got = loop {
        match input.read(&mut len_bytes) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::hint::spin_loop(),
            Err(source) => {
                return Err(FrameError::Read {
                    part: "password length",
                    source,
                })
            }
        }
    };
    if got != LEN_SIZE {
        return Err(FrameError::ShortRead {
            part: "password length",
            expected: LEN_SIZE,
            actual: got,
        });
    }

    let len = usize::from_ne_bytes(len_bytes);
    let capacity = cred.capacity();
    let payload = cred
        .payload_mut(len)
        .ok_or(FrameError::TooLong { len, capacity })?;

    let got = input.read(payload).map_err(|source| FrameError::Read {
        part: "password",
        source,
    })?;
    if got != len {
        return Err(FrameError::ShortRead {
            part: "password",
            expected: len,
            actual: got,
        });
    }
    cred.commit(len);

    tracing::debug!(len, "read password frame");
    Ok(len)
}
