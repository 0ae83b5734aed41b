//! Human-readable results on stdout.
//!
//! Logs go to stderr; everything here is the command's actual output, so it
//! stays stable for scripts reading it.

use crate::context::Counters;
use crate::diff::DiffReport;
use crate::generate::GenerateReport;
use crate::verify::{Verdict, VerifyReport};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::time::{Duration, SystemTime};

pub fn print_generate(report: &GenerateReport) {
    print!("{}", format_generate(report));
}

pub fn print_verify(report: &VerifyReport) {
    print!("{}", format_verify(report));
}

pub fn print_diff(report: &DiffReport) {
    print!("{}", format_diff(report));
}

fn format_generate(report: &GenerateReport) -> String {
    let mut out = String::new();
    let action = if report.dry_run {
        "Would write"
    } else {
        "Wrote"
    };
    let _ = writeln!(
        out,
        "{} {} ({} files, {} hashed)",
        action,
        report.manifest.display(),
        report.files,
        format_size(report.counters.bytes_hashed)
    );
    if report.counters.errors > 0 {
        let _ = writeln!(out, "Skipped {} unreadable entries", report.counters.errors);
    }
    out
}

fn verdict_code(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Valid => ".",
        Verdict::Missing => "M",
        Verdict::Corrupt => "C",
        Verdict::Extra => "+",
        Verdict::Error => "E",
    }
}

fn format_verify(report: &VerifyReport) -> String {
    let mut out = String::new();
    for entry in &report.entries {
        let _ = writeln!(out, "{:<2} {}", verdict_code(entry.verdict), entry.path);
    }
    if !report.entries.is_empty() {
        out.push('\n');
    }

    let c = &report.counters;
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Processed: {}", c.processed);
    let _ = writeln!(out, "  Missing:   {}", c.missing);
    let _ = writeln!(out, "  Corrupt:   {}", c.corrupt);
    let _ = writeln!(out, "  Extra:     {}", c.extra);
    let _ = writeln!(out, "  Errors:    {}", c.errors);
    if c.rejected > 0 {
        let _ = writeln!(out, "  Rejected:  {}", c.rejected);
    }
    let _ = writeln!(out, "  Hashed:    {}", format_size(c.bytes_hashed));
    let _ = writeln!(
        out,
        "Result: {}",
        if report.is_success() { "OK" } else { "FAILED" }
    );
    out
}

fn format_diff(report: &DiffReport) -> String {
    let mut out = String::new();
    for path in &report.different {
        let _ = writeln!(out, "{:<2} {}", "!", path);
    }
    for path in &report.only_in_a {
        let _ = writeln!(out, "{:<2} {}", "<", path);
    }
    for path in &report.only_in_b {
        let _ = writeln!(out, "{:<2} {}", ">", path);
    }
    if !report.is_identical() {
        out.push('\n');
    }

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Same:      {}", report.same);
    let _ = writeln!(out, "  Different: {}", report.different.len());
    let _ = writeln!(out, "  Only in A: {}", report.only_in_a.len());
    let _ = writeln!(out, "  Only in B: {}", report.only_in_b.len());
    let _ = writeln!(
        out,
        "Result: {}",
        if report.is_identical() { "IDENTICAL" } else { "DIFFERENT" }
    );
    out
}

/// One-line throughput figure for the closing log message.
pub fn format_throughput(counters: &Counters, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let mb = counters.bytes_hashed as f64 / (1024.0 * 1024.0);
    let rate = if secs > 0.0 { mb / secs } else { 0.0 };
    format!(
        "{} in {:.2}s ({:.2} MB/s)",
        format_size(counters.bytes_hashed),
        secs,
        rate
    )
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Local wall-clock time, to the second.
pub fn format_mtime(mtime: SystemTime) -> String {
    DateTime::<Local>::from(mtime)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
