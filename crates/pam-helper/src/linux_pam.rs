//! [`Backend`] over the system's Linux-PAM library.

use pam_helper_core::ffi::{PamConv, PamHandle, PamStatus, PAM_ABORT, PAM_SUCCESS};
use pam_helper_core::{AuthContext, Backend};
use std::ffi::CStr;
use std::ptr::{self, NonNull};

#[link(name = "pam")]
extern "C" {
    fn pam_start(
        service_name: *const libc::c_char,
        user: *const libc::c_char,
        pam_conversation: *const PamConv,
        pamh: *mut *mut PamHandle,
    ) -> libc::c_int;
    fn pam_end(pamh: *mut PamHandle, pam_status: libc::c_int) -> libc::c_int;
    fn pam_authenticate(pamh: *mut PamHandle, flags: libc::c_int) -> libc::c_int;
    fn pam_acct_mgmt(pamh: *mut PamHandle, flags: libc::c_int) -> libc::c_int;
    fn pam_setcred(pamh: *mut PamHandle, flags: libc::c_int) -> libc::c_int;
}

pub struct LinuxPam;

/// An open `pam_handle_t`. Ended by [`AuthContext::end`].
pub struct LinuxPamContext {
    handle: NonNull<PamHandle>,
}

impl Backend for LinuxPam {
    type Context = LinuxPamContext;

    fn start(
        &self,
        service: &CStr,
        user: &CStr,
        conv: &PamConv,
    ) -> Result<LinuxPamContext, PamStatus> {
        let mut handle: *mut PamHandle = ptr::null_mut();
        // SAFETY: service and user are NUL-terminated; conv points to a
        // pam_conv that the driver keeps alive until pam_end.
        let ret = unsafe { pam_start(service.as_ptr(), user.as_ptr(), conv, &mut handle) };
        if ret != PAM_SUCCESS {
            return Err(PamStatus(ret));
        }
        NonNull::new(handle)
            .map(|handle| LinuxPamContext { handle })
            .ok_or(PamStatus(PAM_ABORT))
    }
}

impl AuthContext for LinuxPamContext {
    fn authenticate(&mut self, flags: libc::c_int) -> PamStatus {
        // SAFETY: handle came from a successful pam_start and is not yet ended.
        PamStatus(unsafe { pam_authenticate(self.handle.as_ptr(), flags) })
    }

    fn acct_mgmt(&mut self, flags: libc::c_int) -> PamStatus {
        // SAFETY: as above.
        PamStatus(unsafe { pam_acct_mgmt(self.handle.as_ptr(), flags) })
    }

    fn setcred(&mut self, flags: libc::c_int) -> PamStatus {
        // SAFETY: as above.
        PamStatus(unsafe { pam_setcred(self.handle.as_ptr(), flags) })
    }

    fn end(self, status: PamStatus) -> PamStatus {
        // SAFETY: consuming self guarantees pam_end runs once per handle.
        PamStatus(unsafe { pam_end(self.handle.as_ptr(), status.code()) })
    }
}
