//! Mirrors of the Linux-PAM application ABI (<security/pam_appl.h>).
//!
//! Only the pieces the helper touches are declared. The functions
//! themselves are linked by the binary; this crate stays free of `-lpam`.

use std::fmt;

// PAM return codes (Linux-PAM values)
pub const PAM_SUCCESS: libc::c_int = 0;
pub const PAM_BUF_ERR: libc::c_int = 5;
pub const PAM_AUTH_ERR: libc::c_int = 7;
pub const PAM_USER_UNKNOWN: libc::c_int = 10;
pub const PAM_CONV_ERR: libc::c_int = 19;
pub const PAM_ABORT: libc::c_int = 26;

// PAM message styles
pub const PAM_PROMPT_ECHO_OFF: libc::c_int = 1;
pub const PAM_PROMPT_ECHO_ON: libc::c_int = 2;
pub const PAM_ERROR_MSG: libc::c_int = 3;
pub const PAM_TEXT_INFO: libc::c_int = 4;

// pam_setcred flags
pub const PAM_REINITIALIZE_CRED: libc::c_int = 0x0008;

/// Opaque `pam_handle_t`.
#[repr(C)]
pub struct PamHandle {
    _private: [u8; 0],
}

/// PAM message struct, mirrors `struct pam_message`.
#[repr(C)]
pub struct PamMessage {
    pub msg_style: libc::c_int,
    pub msg: *const libc::c_char,
}

/// PAM response struct, mirrors `struct pam_response`.
#[repr(C)]
pub struct PamResponse {
    pub resp: *mut libc::c_char,
    pub resp_retcode: libc::c_int,
}

/// Signature of the conversation function PAM calls back into.
pub type ConvFn = unsafe extern "C" fn(
    num_msg: libc::c_int,
    msg: *mut *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut libc::c_void,
) -> libc::c_int;

/// PAM conversation struct, mirrors `struct pam_conv`.
#[repr(C)]
pub struct PamConv {
    pub conv: Option<ConvFn>,
    pub appdata_ptr: *mut libc::c_void,
}

/// A status code returned by a PAM entry point.
///
/// Only `PAM_SUCCESS` means success; every other value is some failure kind
/// defined by the backend. The helper's exit status is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PamStatus(pub libc::c_int);

impl PamStatus {
    pub const SUCCESS: PamStatus = PamStatus(PAM_SUCCESS);
    pub const AUTH_ERR: PamStatus = PamStatus(PAM_AUTH_ERR);
    pub const CONV_ERR: PamStatus = PamStatus(PAM_CONV_ERR);

    pub fn is_success(self) -> bool {
        self.0 == PAM_SUCCESS
    }

    pub fn code(self) -> libc::c_int {
        self.0
    }

    /// Short name for the codes the helper is likely to see.
    pub fn name(self) -> &'static str {
        match self.0 {
            PAM_SUCCESS => "success",
            PAM_BUF_ERR => "memory buffer error",
            PAM_AUTH_ERR => "authentication failure",
            PAM_USER_UNKNOWN => "user not known",
            PAM_CONV_ERR => "conversation error",
            PAM_ABORT => "critical error",
            _ => "backend error",
        }
    }
}

impl fmt::Display for PamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pam_return_codes_match_linux_pam() {
        // These are load-bearing: they become the helper's exit status.
        assert_eq!(PAM_SUCCESS, 0, "PAM_SUCCESS must be 0");
        assert_eq!(PAM_AUTH_ERR, 7, "PAM_AUTH_ERR must be 7");
        assert_eq!(PAM_CONV_ERR, 19, "PAM_CONV_ERR must be 19");
    }

    #[test]
    fn message_styles_match_linux_pam() {
        assert_eq!(PAM_PROMPT_ECHO_OFF, 1);
        assert_eq!(PAM_PROMPT_ECHO_ON, 2);
        assert_eq!(PAM_ERROR_MSG, 3);
        assert_eq!(PAM_TEXT_INFO, 4);
    }

    #[test]
    fn reinitialize_cred_flag_matches_linux_pam() {
        assert_eq!(PAM_REINITIALIZE_CRED, 8);
    }

    #[test]
    fn status_display_includes_code() {
        assert_eq!(PamStatus::AUTH_ERR.to_string(), "authentication failure (7)");
        assert_eq!(PamStatus(42).to_string(), "backend error (42)");
        assert!(PamStatus::SUCCESS.is_success());
        assert!(!PamStatus::CONV_ERR.is_success());
    }
}
