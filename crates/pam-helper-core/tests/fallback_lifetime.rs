//! Repeated runs against a backend that never passes `appdata_ptr` back.
//! Each run must be answered from its own password, never a previous one's.

use pam_helper_core::conversation::free_responses;
use pam_helper_core::ffi::{
    ConvFn, PamConv, PamMessage, PamResponse, PAM_PROMPT_ECHO_OFF, PAM_PROMPT_ECHO_ON,
};
use pam_helper_core::{run, AuthContext, Backend, Config, Invocation, PamStatus};
use std::cell::RefCell;
use std::ffi::{CStr, CString, OsString};
use std::io::Cursor;
use std::ptr;
use std::rc::Rc;

/// Calls the conversation with a null `appdata_ptr`, like a backend that
/// loses the closure pointer, and records what it was told.
#[derive(Default)]
struct DropsAppdata {
    answers: Rc<RefCell<Vec<Vec<u8>>>>,
}

struct DropsAppdataContext {
    conv: ConvFn,
    answers: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Backend for DropsAppdata {
    type Context = DropsAppdataContext;

    fn start(
        &self,
        _service: &CStr,
        _user: &CStr,
        conv: &PamConv,
    ) -> Result<DropsAppdataContext, PamStatus> {
        Ok(DropsAppdataContext {
            conv: conv.conv.ok_or(PamStatus(4))?,
            answers: Rc::clone(&self.answers),
        })
    }
}

impl AuthContext for DropsAppdataContext {
    fn authenticate(&mut self, _flags: libc::c_int) -> PamStatus {
        let text = CString::new("Password:").unwrap();
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

        let ret = unsafe { (self.conv)(2, ptrs.as_mut_ptr(), &mut resp, ptr::null_mut()) };
        if ret != 0 {
            return PamStatus(ret);
        }
        for i in 0..2 {
            let answer = unsafe { CStr::from_ptr((*resp.add(i)).resp) };
            self.answers.borrow_mut().push(answer.to_bytes().to_vec());
        }
        unsafe { free_responses(resp, 2) };
        PamStatus::SUCCESS
    }

    fn acct_mgmt(&mut self, _flags: libc::c_int) -> PamStatus {
        PamStatus::SUCCESS
    }

    fn setcred(&mut self, _flags: libc::c_int) -> PamStatus {
        PamStatus::SUCCESS
    }

    fn end(self, _status: PamStatus) -> PamStatus {
        PamStatus::SUCCESS
    }
}

fn authenticate(user: &str, password: &[u8]) -> (PamStatus, Vec<Vec<u8>>) {
    let backend = DropsAppdata::default();
    let invocation = Invocation::new(OsString::from("login"), OsString::from(user)).unwrap();
    let mut input = password.len().to_ne_bytes().to_vec();
    input.extend_from_slice(password);

    let outcome = run(
        &backend,
        &Config::default(),
        &invocation,
        &mut Cursor::new(input),
        &mut Vec::new(),
    )
    .unwrap();
    let answers = backend.answers.borrow().clone();
    (outcome.status, answers)
}

#[test]
fn second_run_is_answered_with_its_own_password() {
    let first = std::thread::spawn(|| authenticate("alice", b"first-secret"))
        .join()
        .unwrap();
    assert_eq!(first.0, PamStatus::SUCCESS);
    assert_eq!(first.1, vec![b"alice".to_vec(), b"first-secret".to_vec()]);

    let second = authenticate("alice", b"second-secret");
    assert_eq!(second.0, PamStatus::SUCCESS);
    assert_eq!(second.1, vec![b"alice".to_vec(), b"second-secret".to_vec()]);
}

#[test]
fn consecutive_runs_on_one_thread_each_install_the_fallback() {
    let first = authenticate("bob", b"one");
    let second = authenticate("carol", b"two");
    assert_eq!(first.1, vec![b"bob".to_vec(), b"one".to_vec()]);
    assert_eq!(second.1, vec![b"carol".to_vec(), b"two".to_vec()]);
}
