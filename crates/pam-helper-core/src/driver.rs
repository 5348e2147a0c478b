//! One authentication attempt, start to finish.
//!
//! `Start → ContextOpen → Authenticating → {AccountCheck → CredRefresh} → End`
//!
//! Everything acquired along the way is scoped: the credential buffer is
//! wiped and freed on every return path, and an opened PAM context is ended
//! exactly once, by the session guard or by its `Drop` if the driver
//! unwinds.

use crate::backend::{AuthContext, Backend};
use crate::config::{Config, PostAuthPolicy};
use crate::conversation::{self, Closure};
use crate::credential::{AllocError, Credential};
use crate::ffi::{PamConv, PamStatus, PAM_ABORT, PAM_REINITIALIZE_CRED};
use crate::frame::{self, FrameError, Prompt};
use std::ffi::{CStr, CString, OsString};
use std::io::{Read, Write};
use std::mem::ManuallyDrop;
use std::os::unix::ffi::OsStringExt;

/// Exit status for a bad invocation.
pub const EXIT_USAGE: i32 = 1;
/// Exit status for framing and allocation failures.
pub const EXIT_FATAL: i32 = 1;
/// Exit status when `pam_start` fails.
pub const EXIT_START: i32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum HelperError {
    #[error("usage: pam_helper service username")]
    Usage,
    #[error("{0} contains a NUL byte")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("failed to write prompt: {0}")]
    Prompt(#[source] FrameError),
    #[error("failed to read password: {0}")]
    Password(#[source] FrameError),
    #[error("error starting PAM conversation: {0}")]
    Start(PamStatus),
}

impl HelperError {
    pub fn exit_code(&self) -> i32 {
        match self {
            HelperError::Usage | HelperError::InvalidArgument(_) => EXIT_USAGE,
            HelperError::Alloc(_) | HelperError::Prompt(_) | HelperError::Password(_) => {
                EXIT_FATAL
            }
            HelperError::Start(_) => EXIT_START,
        }
    }
}

/// The two command-line arguments, as C strings for PAM.
#[derive(Debug, Clone)]
pub struct Invocation {
    service: CString,
    username: CString,
}

impl Invocation {
    pub fn new(service: OsString, username: OsString) -> Result<Self, HelperError> {
        Ok(Self {
            service: CString::new(service.into_vec())
                .map_err(|_| HelperError::InvalidArgument("service"))?,
            username: CString::new(username.into_vec())
                .map_err(|_| HelperError::InvalidArgument("username"))?,
        })
    }

    pub fn service(&self) -> &CStr {
        &self.service
    }

    pub fn username(&self) -> &CStr {
        &self.username
    }
}

/// Statuses collected over one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// `pam_authenticate` result.
    pub auth: PamStatus,
    /// `pam_acct_mgmt` result; only run after successful authentication.
    pub account: Option<PamStatus>,
    /// `pam_setcred(PAM_REINITIALIZE_CRED)` result; same condition.
    pub refresh: Option<PamStatus>,
    /// Status handed to `pam_end` and used as the exit status.
    pub status: PamStatus,
    /// `pam_end` result, for logging only.
    pub end: PamStatus,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        self.status.code()
    }

    pub fn authenticated(&self) -> bool {
        self.status.is_success()
    }
}

/// Guard around an open context: ends it with the last recorded status.
struct Session<C: AuthContext> {
    ctx: ManuallyDrop<C>,
    status: PamStatus,
    ended: bool,
}

impl<C: AuthContext> Session<C> {
    fn new(ctx: C) -> Self {
        Self {
            ctx: ManuallyDrop::new(ctx),
            status: PamStatus(PAM_ABORT),
            ended: false,
        }
    }

    fn finish(mut self, status: PamStatus) -> PamStatus {
        self.status = status;
        self.ended = true;
        // SAFETY: `ended` is set, so Drop will not take ctx a second time.
        let ctx = unsafe { ManuallyDrop::take(&mut self.ctx) };
        ctx.end(status)
    }
}

impl<C: AuthContext> Drop for Session<C> {
    fn drop(&mut self) {
        if !self.ended {
            self.ended = true;
            // SAFETY: ctx has not been taken; `ended` guards against reentry.
            let ctx = unsafe { ManuallyDrop::take(&mut self.ctx) };
            ctx.end(self.status);
        }
    }
}

/// Run one authentication attempt over the given frame channels.
///
/// Fatal setup and framing problems come back as `Err`. A rejected password
/// is an `Ok` outcome carrying the backend's status.
pub fn run<B, R, W>(
    backend: &B,
    config: &Config,
    invocation: &Invocation,
    input: &mut R,
    output: &mut W,
) -> Result<Outcome, HelperError>
where
    B: Backend,
    R: Read,
    W: Write,
{
    let mut cred = Credential::with_capacity(config.credential_capacity)?;

    Prompt::password()
        .write_to(output)
        .map_err(HelperError::Prompt)?;
    frame::read_password(input, &mut cred).map_err(HelperError::Password)?;

    let closure = Closure {
        user: invocation.username(),
        password: cred.as_c_str(),
    };
    let conv = PamConv {
        conv: Some(conversation::converse),
        appdata_ptr: &closure as *const Closure<'_> as *mut libc::c_void,
    };
    // SAFETY: the guard is a local, declared before the session so it drops
    // after pam_end and before closure and cred.
    let fallback_guard = unsafe { conversation::install_fallback(&closure) };
    if fallback_guard.is_none() {
        tracing::debug!("conversation fallback held by another transaction");
    }

    tracing::debug!(
        service = %invocation.service().to_string_lossy(),
        user = %invocation.username().to_string_lossy(),
        "starting PAM transaction"
    );
    let ctx = backend
        .start(invocation.service(), invocation.username(), &conv)
        .map_err(HelperError::Start)?;
    let mut session = Session::new(ctx);

    let auth = session.ctx.authenticate(0);
    session.status = auth;

    let (account, refresh) = if auth.is_success() {
        let account = session.ctx.acct_mgmt(0);
        if !account.is_success() {
            tracing::warn!(status = %account, "account check failed after authentication");
        }
        let refresh = session.ctx.setcred(PAM_REINITIALIZE_CRED);
        if !refresh.is_success() {
            tracing::warn!(status = %refresh, "credential refresh failed after authentication");
        }
        (Some(account), Some(refresh))
    } else {
        tracing::debug!(status = %auth, "authentication failed");
        (None, None)
    };

    let status = final_status(config.post_auth_policy, auth, account, refresh);
    let end = session.finish(status);
    if !end.is_success() {
        tracing::debug!(status = %end, "pam_end reported failure");
    }

    Ok(Outcome {
        auth,
        account,
        refresh,
        status,
        end,
    })
}

fn final_status(
    policy: PostAuthPolicy,
    auth: PamStatus,
    account: Option<PamStatus>,
    refresh: Option<PamStatus>,
) -> PamStatus {
    match policy {
        PostAuthPolicy::Ignore => auth,
        PostAuthPolicy::Enforce => [account, refresh]
            .into_iter()
            .flatten()
            .find(|s| !s.is_success())
            .unwrap_or(auth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCT_EXPIRED: PamStatus = PamStatus(13);
    const CRED_ERR: PamStatus = PamStatus(17);

    #[test]
    fn ignore_policy_keeps_auth_status() {
        let s = final_status(
            PostAuthPolicy::Ignore,
            PamStatus::SUCCESS,
            Some(ACCT_EXPIRED),
            Some(CRED_ERR),
        );
        assert_eq!(s, PamStatus::SUCCESS);
    }

    #[test]
    fn enforce_policy_takes_first_failure() {
        let s = final_status(
            PostAuthPolicy::Enforce,
            PamStatus::SUCCESS,
            Some(ACCT_EXPIRED),
            Some(CRED_ERR),
        );
        assert_eq!(s, ACCT_EXPIRED);

        let s = final_status(
            PostAuthPolicy::Enforce,
            PamStatus::SUCCESS,
            Some(PamStatus::SUCCESS),
            Some(CRED_ERR),
        );
        assert_eq!(s, CRED_ERR);
    }

    #[test]
    fn enforce_policy_keeps_auth_failure() {
        let s = final_status(PostAuthPolicy::Enforce, PamStatus::AUTH_ERR, None, None);
        assert_eq!(s, PamStatus::AUTH_ERR);
    }

    #[test]
    fn nul_in_arguments_is_rejected() {
        let err = Invocation::new(OsString::from("login"), OsString::from_vec(b"al\0ice".to_vec()))
            .unwrap_err();
        assert!(matches!(err, HelperError::InvalidArgument("username")));
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn exit_codes_by_error_kind() {
        assert_eq!(HelperError::Usage.exit_code(), 1);
        assert_eq!(HelperError::Start(PamStatus(4)).exit_code(), 2);
        let framing = HelperError::Password(FrameError::TooLong {
            len: 9000,
            capacity: 8192,
        });
        assert_eq!(framing.exit_code(), EXIT_FATAL);
    }
}
