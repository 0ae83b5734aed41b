mod catalog;
mod checksum;
mod cli;
mod config;
mod context;
mod diff;
mod exit_status;
mod generate;
mod manifest;
mod report;
mod sanitize;
mod scan;
mod verify;

use anyhow::Context as _;
use cli::{Cli, Command, LogArgs};
use config::PolicyFile;
use context::{CancelToken, RunContext, ScanPolicy};
use exit_status::ExitStatus;
use std::fmt as stdfmt;
use std::fs::OpenOptions;
use std::io::{IsTerminal, stderr};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{Event, Level, Subscriber, error, info};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use verify::VerifyError;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return clap_exit_status(&e).into(),
    };

    if let Err(e) = init_tracing(&cli.logging) {
        eprintln!("Error: {e:#}");
        return ExitStatus::FileIoError.into();
    }

    let cancel = CancelToken::new();
    install_signal_handlers(cancel.flag());

    run(cli, cancel).into()
}

/// Prints a parse error (or help/version) and picks the exit status for it.
fn clap_exit_status(err: &clap::Error) -> ExitStatus {
    use clap::error::ErrorKind;

    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitStatus::Ok,
        ErrorKind::ArgumentConflict => ExitStatus::ModeConflict,
        _ => ExitStatus::InvalidArguments,
    }
}

fn run(cli: Cli, cancel: CancelToken) -> ExitStatus {
    let base = match cli.config.as_deref().map(PolicyFile::load).transpose() {
        Ok(file) => file.map(|f| f.to_policy()).unwrap_or_default(),
        Err(e) => {
            error!("{e}");
            return e.exit_status();
        }
    };

    let mut ctx = RunContext::new(effective_policy(base, &cli.command), cancel);
    ctx.count_first = cli.progress;

    let started = Instant::now();

    let status = match cli.command {
        Command::Generate { paths, .. } => handle_generate(&paths, &ctx),
        Command::Verify {
            mirror, manifest, ..
        } => handle_verify(&mirror, &manifest, &ctx),
        Command::Compare {
            manifest_a,
            manifest_b,
        } => handle_diff(diff::diff_manifests(&manifest_a, &manifest_b, &ctx)),
        Command::Diff { dir_a, dir_b, .. } => {
            handle_diff(diff::diff_directories(&dir_a, &dir_b, &ctx))
        }
    };

    info!(
        "Hashed {}",
        report::format_throughput(&ctx.stats.snapshot(), started.elapsed())
    );

    status
}

/// Overlays a command's flags onto the policy loaded from the config file.
fn effective_policy(mut policy: ScanPolicy, command: &Command) -> ScanPolicy {
    match command {
        Command::Generate {
            policy: args,
            dry_run,
            ..
        } => {
            args.apply(&mut policy);
            policy.dry_run = *dry_run;
        }
        Command::Verify {
            policy: args,
            no_extra_check,
            ..
        } => {
            args.apply(&mut policy);
            if *no_extra_check {
                policy.check_extra = false;
            }
        }
        Command::Compare { .. } => {}
        Command::Diff { policy: args, .. } => args.apply(&mut policy),
    }
    policy
}

fn handle_generate(paths: &[PathBuf], ctx: &RunContext) -> ExitStatus {
    let Some((manifest, sources)) = paths.split_last() else {
        error!("generate needs at least one source directory and a manifest path");
        return ExitStatus::InvalidArguments;
    };

    match generate::generate(sources, manifest, ctx) {
        Ok(report) => {
            report::print_generate(&report);
            ExitStatus::Ok
        }
        Err(e) => {
            error!("{e}");
            e.exit_status()
        }
    }
}

fn handle_verify(mirror: &Path, manifest: &Path, ctx: &RunContext) -> ExitStatus {
    match verify::verify(mirror, manifest, ctx) {
        Ok(report) => {
            report::print_verify(&report);
            ExitStatus::Ok
        }
        Err(VerifyError::Failed(report)) => {
            report::print_verify(&report);
            error!(
                "Verification failed: {} missing, {} corrupt, {} errors",
                report.counters.missing, report.counters.corrupt, report.counters.errors
            );
            ExitStatus::VerifyFailed
        }
        Err(e) => {
            error!("{e}");
            e.exit_status()
        }
    }
}

fn handle_diff(result: Result<diff::DiffReport, diff::DiffError>) -> ExitStatus {
    match result {
        Ok(report) => {
            report::print_diff(&report);
            if report.is_identical() {
                ExitStatus::Ok
            } else {
                ExitStatus::GeneralError
            }
        }
        Err(e) => {
            error!("{e}");
            e.exit_status()
        }
    }
}

static CANCEL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_termination_signal(_signal: libc::c_int) {
    if let Some(flag) = CANCEL_FLAG.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Routes SIGINT and SIGTERM to the run's cancellation flag. The handler
/// only stores to an atomic; the work loops notice at their next checkpoint.
fn install_signal_handlers(flag: Arc<AtomicBool>) {
    let _ = CANCEL_FLAG.set(flag);

    let handler = on_termination_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler is async-signal-safe; it performs a single atomic
    // store through a value that is initialized before installation.
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
}

fn init_tracing(args: &LogArgs) -> anyhow::Result<()> {
    let filter = match args.level_override() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let (formatter, writer) = match &args.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let formatter = EmojiFormatter {
                emoji: false,
                timestamps: true,
            };
            (formatter, BoxMakeWriter::new(Mutex::new(file)))
        }
        None => {
            let formatter = EmojiFormatter {
                emoji: stderr().is_terminal(),
                timestamps: false,
            };
            (formatter, BoxMakeWriter::new(std::io::stderr))
        }
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install the log subscriber")?;

    Ok(())
}

struct EmojiFormatter {
    emoji: bool,
    /// Prefix each line with the local time, for log files read later.
    timestamps: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.timestamps {
            write!(
                writer,
                "[{}] ",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
            )?;
        }

        if self.emoji {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::TRACE => writer.write_str("TRACE: ")?,
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
