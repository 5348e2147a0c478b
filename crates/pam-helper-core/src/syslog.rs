//! Audit trail to syslog under `LOG_AUTHPRIV`.

use std::ffi::CString;

// syslog constants
const LOG_PID: libc::c_int = 0x01;
const LOG_AUTHPRIV: libc::c_int = 10 << 3;
pub const LOG_ERR: libc::c_int = 3;
pub const LOG_NOTICE: libc::c_int = 5;
pub const LOG_INFO: libc::c_int = 6;

/// Open syslog with `pam_helper` ident and `LOG_AUTHPRIV` facility.
pub fn open() {
    // openlog keeps the pointer, so the ident must be 'static.
    static IDENT: &[u8] = b"pam_helper\0";
    // SAFETY: IDENT is a valid NUL-terminated static string.
    unsafe {
        libc::openlog(IDENT.as_ptr() as *const libc::c_char, LOG_PID, LOG_AUTHPRIV);
    }
}

/// Log a message to syslog at the given priority.
pub fn log(priority: libc::c_int, msg: &str) {
    // "%s" keeps '%' in usernames from being read as format specifiers.
    let c_msg = match CString::new(msg) {
        Ok(s) => s,
        Err(_) => return, // interior NUL: skip logging rather than panic
    };
    let fmt = b"%s\0";
    // SAFETY: fmt is a valid NUL-terminated format string; c_msg is a valid C string.
    unsafe {
        libc::syslog(priority, fmt.as_ptr() as *const libc::c_char, c_msg.as_ptr());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syslog_constants_match_libc() {
        assert_eq!(LOG_AUTHPRIV, libc::LOG_AUTHPRIV);
        assert_eq!(LOG_PID, libc::LOG_PID);
        assert_eq!(LOG_ERR, libc::LOG_ERR);
        assert_eq!(LOG_NOTICE, libc::LOG_NOTICE);
        assert_eq!(LOG_INFO, libc::LOG_INFO);
    }

    #[test]
    fn interior_nul_is_skipped() {
        // Must return quietly instead of panicking.
        log(LOG_INFO, "bad\0message");
    }
}
