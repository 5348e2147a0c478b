//! Seam between the driver and the PAM library.
//!
//! The binary implements these over `libpam`; tests implement them with a
//! scripted backend that calls the conversation function directly.

use crate::ffi::{PamConv, PamStatus};
use std::ffi::CStr;

/// Opens authentication contexts (`pam_start`).
pub trait Backend {
    type Context: AuthContext;

    /// Start a transaction for `service` and `user` using `conv`.
    ///
    /// `conv` and the closure behind its `appdata_ptr` outlive the returned
    /// context; the driver guarantees this.
    fn start(
        &self,
        service: &CStr,
        user: &CStr,
        conv: &PamConv,
    ) -> Result<Self::Context, PamStatus>;
}

/// One open PAM transaction.
pub trait AuthContext {
    /// `pam_authenticate`
    fn authenticate(&mut self, flags: libc::c_int) -> PamStatus;

    /// `pam_acct_mgmt`
    fn acct_mgmt(&mut self, flags: libc::c_int) -> PamStatus;

    /// `pam_setcred`
    fn setcred(&mut self, flags: libc::c_int) -> PamStatus;

    /// `pam_end`, passing the final status of the transaction.
    fn end(self, status: PamStatus) -> PamStatus;
}
