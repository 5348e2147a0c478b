//! pam_helper: authenticate one user through PAM for an unprivileged caller.
//!
//! Usage: `pam_helper <service> <username>`. The prompt frame goes out on
//! stdout, the password frame comes in on stdin, and the exit status is the
//! result: 0 on success, 1 for usage or framing errors, 2 if PAM could not be
//! started, otherwise the PAM status of the failed authentication.

use clap::Parser;
use pam_helper_core::channel::FdChannel;
use pam_helper_core::driver::EXIT_USAGE;
use pam_helper_core::{run, syslog, Config, HelperError, Invocation, Outcome};
use std::ffi::OsString;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod linux_pam;

#[derive(Parser)]
#[command(
    name = "pam_helper",
    about = "Authenticate a user via PAM over a framed stdin/stdout exchange",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// PAM service name (e.g., "mate-screensaver")
    #[arg(allow_hyphen_values = true)]
    service: OsString,
    /// Account to authenticate
    #[arg(allow_hyphen_values = true)]
    username: OsString,
}

fn main() -> ExitCode {
    // stdout carries protocol frames; diagnostics go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("PAM_HELPER_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = match parse_args(std::env::args_os().collect()) {
        Some(cli) => cli,
        None => {
            eprintln!("{}", HelperError::Usage);
            return exit_code(EXIT_USAGE);
        }
    };

    let config = Config::from_env();
    if config.syslog_enabled {
        syslog::open();
    }

    let invocation = match Invocation::new(cli.service, cli.username) {
        Ok(invocation) => invocation,
        Err(e) => return fail(&config, e),
    };

    let result = run(
        &linux_pam::LinuxPam,
        &config,
        &invocation,
        &mut FdChannel::stdin(),
        &mut FdChannel::stdout(),
    );

    match result {
        Ok(outcome) => {
            report(&config, &invocation, &outcome);
            exit_code(outcome.exit_code())
        }
        Err(e) => fail(&config, e),
    }
}

/// Accept exactly two arguments, whatever they look like.
///
/// The count is checked on the raw argv, then both values are handed to clap
/// behind an explicit `--` so that neither `--` nor a leading `-` in a
/// service or user name is read as an option.
fn parse_args(args: Vec<OsString>) -> Option<Cli> {
    let [program, service, username]: [OsString; 3] = args.try_into().ok()?;
    Cli::try_parse_from([program, OsString::from("--"), service, username]).ok()
}

fn report(config: &Config, invocation: &Invocation, outcome: &Outcome) {
    let user = invocation.username().to_string_lossy();
    let service = invocation.service().to_string_lossy();

    if !outcome.auth.is_success() {
        eprintln!("Error authenticating user.");
    }

    tracing::info!(
        user = %user,
        service = %service,
        status = %outcome.status,
        "authentication finished"
    );

    if config.syslog_enabled {
        if outcome.authenticated() {
            syslog::log(
                syslog::LOG_INFO,
                &format!("authentication succeeded for user '{user}' (service '{service}')"),
            );
        } else {
            syslog::log(
                syslog::LOG_NOTICE,
                &format!(
                    "authentication failed for user '{user}' (service '{service}'): {}",
                    outcome.status
                ),
            );
        }
    }
}

fn fail(config: &Config, error: HelperError) -> ExitCode {
    eprintln!("pam_helper: {error}");
    if config.syslog_enabled {
        syslog::log(syslog::LOG_ERR, &error.to_string());
    }
    exit_code(error.exit_code())
}

/// Truncate to the low 8 bits, as `exit(3)` would.
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}
