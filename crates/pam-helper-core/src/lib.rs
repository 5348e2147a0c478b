//! pam-helper-core: the logic behind the `pam_helper` binary.
//!
//! Writes a password prompt frame to the caller, reads the password frame
//! back, and runs one PAM transaction whose conversation answers with the
//! username and that password. The PAM library itself sits behind the
//! [`Backend`] trait so the binary can bind `libpam` and tests can script it.

// Enforce explicit `unsafe {}` blocks inside `unsafe fn` bodies.
#![warn(unsafe_op_in_unsafe_fn)]

pub mod backend;
pub mod channel;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod driver;
pub mod ffi;
pub mod frame;
pub mod syslog;

pub use backend::{AuthContext, Backend};
pub use config::{Config, PostAuthPolicy};
pub use conversation::Closure;
pub use credential::{Credential, CREDENTIAL_CAPACITY};
pub use driver::{run, HelperError, Invocation, Outcome};
pub use ffi::PamStatus;
pub use frame::FrameError;
