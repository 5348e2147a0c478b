//! The PAM conversation function.
//!
//! PAM calls [`converse`] with a batch of messages during
//! `pam_authenticate`. Prompts are answered from a [`Closure`] holding the
//! username and password; text messages are accepted and dropped. Any other
//! style fails the whole batch with `PAM_CONV_ERR`.
//!
//! # Safety
//!
//! The response array and every string in it are allocated with the C
//! allocator, since PAM releases them with `free(3)`. On failure nothing
//! allocated during the call survives: strings are wiped and freed along
//! with the array.

use crate::ffi::{
    PamMessage, PamResponse, PAM_CONV_ERR, PAM_ERROR_MSG, PAM_PROMPT_ECHO_OFF,
    PAM_PROMPT_ECHO_ON, PAM_SUCCESS, PAM_TEXT_INFO,
};
use std::cell::Cell;
use std::ffi::CStr;
use std::marker::PhantomData;
use std::panic;
use std::ptr;

/// Answers available to the conversation: borrowed views, never copies.
#[derive(Debug, Clone, Copy)]
pub struct Closure<'a> {
    pub user: &'a CStr,
    pub password: &'a CStr,
}

/// What a single message gets back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Visible prompt: answer with the username.
    Username,
    /// Hidden prompt: answer with the password.
    Password,
    /// Informational or error text: acknowledged, no payload.
    Ack,
}

impl Reply {
    /// Map a message style to its reply, or `None` for styles the helper
    /// does not handle.
    pub fn for_style(style: libc::c_int) -> Option<Self> {
        match style {
            PAM_PROMPT_ECHO_ON => Some(Reply::Username),
            PAM_PROMPT_ECHO_OFF => Some(Reply::Password),
            PAM_TEXT_INFO | PAM_ERROR_MSG => Some(Reply::Ack),
            _ => None,
        }
    }

    fn payload<'a>(self, closure: &Closure<'a>) -> Option<&'a CStr> {
        match self {
            Reply::Username => Some(closure.user),
            Reply::Password => Some(closure.password),
            Reply::Ack => None,
        }
    }
}

thread_local! {
    /// Fallback for backends that hand `converse` a null `appdata_ptr`.
    ///
    /// Set for the duration of one PAM transaction by [`install_fallback`]
    /// and cleared when the returned guard drops. PAM calls the conversation
    /// on the thread that called `pam_authenticate`, so a per-thread slot is
    /// enough and no other thread can observe a stale pointer.
    static FALLBACK: Cell<*const Closure<'static>> = const { Cell::new(ptr::null()) };
}

/// Keeps `closure` installed in the fallback slot; clears the slot on drop.
#[must_use = "the fallback slot is cleared as soon as the guard drops"]
pub struct FallbackGuard<'a> {
    ptr: *const Closure<'static>,
    _closure: PhantomData<&'a ()>,
}

impl Drop for FallbackGuard<'_> {
    fn drop(&mut self) {
        let _ = FALLBACK.try_with(|slot| {
            if slot.get() == self.ptr {
                slot.set(ptr::null());
            }
        });
    }
}

/// Install `closure` as this thread's fallback for the life of the returned
/// guard. Returns `None` if a transaction already holds the slot; an
/// installed closure is never replaced.
///
/// # Safety
///
/// The guard must be dropped, not leaked with `mem::forget`, so the slot
/// never outlives `closure`.
pub unsafe fn install_fallback<'a>(closure: &'a Closure<'_>) -> Option<FallbackGuard<'a>> {
    let ptr = closure as *const Closure<'_> as *const Closure<'static>;
    FALLBACK.with(|slot| {
        if !slot.get().is_null() {
            return None;
        }
        slot.set(ptr);
        Some(FallbackGuard {
            ptr,
            _closure: PhantomData,
        })
    })
}

fn fallback() -> *const Closure<'static> {
    FALLBACK.try_with(Cell::get).unwrap_or(ptr::null())
}

/// Conversation entry point registered in `struct pam_conv`.
///
/// # Safety
///
/// Called by PAM with `num_msg` valid message pointers and a writable `resp`.
/// `appdata_ptr` is null or points to a live [`Closure`].
pub unsafe extern "C" fn converse(
    num_msg: libc::c_int,
    msg: *mut *const PamMessage,
    resp: *mut *mut PamResponse,
    appdata_ptr: *mut libc::c_void,
) -> libc::c_int {
    let result = panic::catch_unwind(|| {
        let closure = if appdata_ptr.is_null() {
            fallback()
        } else {
            appdata_ptr as *const Closure<'static>
        };
        if closure.is_null() || msg.is_null() || resp.is_null() || num_msg <= 0 {
            return PAM_CONV_ERR;
        }

        // SAFETY: closure is non-null and, per the contract above, live.
        let closure = unsafe { &*closure };
        // SAFETY: PAM passes num_msg message pointers.
        let messages = unsafe { std::slice::from_raw_parts(msg, num_msg as usize) };

        // SAFETY: messages come from PAM; the returned array goes back to it.
        match unsafe { build_responses(closure, messages) } {
            Some(reply) => {
                // SAFETY: resp is non-null and writable.
                unsafe { *resp = reply };
                PAM_SUCCESS
            }
            None => PAM_CONV_ERR,
        }
    });

    result.unwrap_or(PAM_CONV_ERR)
}

/// Allocate and fill the response array, or free everything and return
/// `None`.
unsafe fn build_responses(
    closure: &Closure<'_>,
    messages: &[*const PamMessage],
) -> Option<*mut PamResponse> {
    // SAFETY: plain calloc; checked for null below.
    let reply = unsafe {
        libc::calloc(messages.len(), std::mem::size_of::<PamResponse>()) as *mut PamResponse
    };
    if reply.is_null() {
        return None;
    }

    for (i, &message) in messages.iter().enumerate() {
        if message.is_null() {
            // SAFETY: reply holds messages.len() slots, the first i filled.
            unsafe { free_responses(reply, i) };
            return None;
        }
        // SAFETY: non-null message pointer supplied by PAM.
        let style = unsafe { (*message).msg_style };
        let Some(kind) = Reply::for_style(style) else {
            tracing::debug!(style, index = i, "unsupported conversation message style");
            // SAFETY: as above.
            unsafe { free_responses(reply, i) };
            return None;
        };

        let resp = match kind.payload(closure) {
            Some(text) => {
                // SAFETY: text is a valid NUL-terminated string.
                let copy = unsafe { libc::strdup(text.as_ptr()) };
                if copy.is_null() {
                    // SAFETY: as above.
                    unsafe { free_responses(reply, i) };
                    return None;
                }
                copy
            }
            None => ptr::null_mut(),
        };

        // SAFETY: i < messages.len(), inside the calloc'd array.
        unsafe {
            let slot = &mut *reply.add(i);
            slot.resp = resp;
            slot.resp_retcode = PAM_SUCCESS;
        }
    }

    Some(reply)
}

/// Wipe and free the first `filled` response strings, then the array.
///
/// # Safety
///
/// `reply` must come from `calloc` with at least `filled` slots, each `resp`
/// null or from `strdup`.
pub unsafe fn free_responses(reply: *mut PamResponse, filled: usize) {
    for i in 0..filled {
        // SAFETY: i < filled, inside the array.
        let resp = unsafe { (*reply.add(i)).resp };
        if !resp.is_null() {
            // SAFETY: resp is a NUL-terminated strdup copy owned by us.
            unsafe {
                let len = libc::strlen(resp);
                ptr::write_bytes(resp, 0, len);
                libc::free(resp as *mut libc::c_void);
            }
        }
    }
    // SAFETY: reply came from calloc.
    unsafe { libc::free(reply as *mut libc::c_void) };
}
