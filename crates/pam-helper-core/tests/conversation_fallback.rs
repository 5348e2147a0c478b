//! Backends that drop `appdata_ptr` still get answers through the fallback
//! slot, and only while the transaction that installed it is running.

use pam_helper_core::conversation::{converse, free_responses, install_fallback};
use pam_helper_core::ffi::{
    PamMessage, PamResponse, PAM_CONV_ERR, PAM_PROMPT_ECHO_OFF, PAM_PROMPT_ECHO_ON, PAM_SUCCESS,
};
use pam_helper_core::Closure;
use std::ffi::{CStr, CString};
use std::ptr;

fn ask_user_and_password() -> (libc::c_int, Vec<Vec<u8>>) {
    let text = CString::new("Login:").unwrap();
    let messages = [
        PamMessage {
            msg_style: PAM_PROMPT_ECHO_ON,
            msg: text.as_ptr(),
        },
        PamMessage {
            msg_style: PAM_PROMPT_ECHO_OFF,
            msg: text.as_ptr(),
        },
    ];
    let mut ptrs: Vec<*const PamMessage> = messages.iter().map(|m| m as *const _).collect();
    let mut resp: *mut PamResponse = ptr::null_mut();

    let ret = unsafe { converse(2, ptrs.as_mut_ptr(), &mut resp, ptr::null_mut()) };
    if ret != PAM_SUCCESS {
        assert!(resp.is_null());
        return (ret, Vec::new());
    }
    let answers = (0..2)
        .map(|i| unsafe { CStr::from_ptr((*resp.add(i)).resp) }.to_bytes().to_vec())
        .collect();
    unsafe { free_responses(resp, 2) };
    (ret, answers)
}

#[test]
fn null_appdata_uses_installed_fallback() {
    let user = CString::new("carol").unwrap();
    let password = CString::new("hunter2").unwrap();
    let closure = Closure {
        user: &user,
        password: &password,
    };

    let guard = unsafe { install_fallback(&closure) }.unwrap();
    assert!(unsafe { install_fallback(&closure) }.is_none(), "slot is held");

    let (ret, answers) = ask_user_and_password();
    assert_eq!(ret, PAM_SUCCESS);
    assert_eq!(answers, vec![b"carol".to_vec(), b"hunter2".to_vec()]);

    drop(guard);
    let (ret, answers) = ask_user_and_password();
    assert_eq!(ret, PAM_CONV_ERR);
    assert!(answers.is_empty());
}
