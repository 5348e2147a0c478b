//! Unbuffered access to an inherited file descriptor.
//!
//! `std::io::stdin()` buffers and `stdout()` line-buffers, which would let a
//! single `read` consume more than one frame part or split a write. The
//! framing contract needs exactly one `read(2)`/`write(2)` per part, so the
//! helper talks to fds 0 and 1 through this thin wrapper.

use std::io;
use std::os::unix::io::RawFd;

/// A borrowed, unbuffered file descriptor. Never closes the fd.
#[derive(Debug)]
pub struct FdChannel {
    fd: RawFd,
}

impl FdChannel {
    pub fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }

    pub fn stdout() -> Self {
        Self {
            fd: libc::STDOUT_FILENO,
        }
    }

    /// Wrap an fd the caller keeps open for the life of the channel.
    pub fn from_raw(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl io::Read for FdChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf is valid for writes of buf.len() bytes.
        let ret = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret as usize)
        }
    }
}

impl io::Write for FdChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: buf is valid for reads of buf.len() bytes.
        let ret = unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret as usize)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
