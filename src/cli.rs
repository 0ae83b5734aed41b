mod help_text;

use crate::context::ScanPolicy;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Content-hash integrity checks for mirrored directory trees
#[derive(Parser, Debug)]
#[command(name = "mirrorguard", version, about, long_about = help_text::ROOT_LONG_ABOUT)]
pub struct Cli {
    #[command(flatten)]
    pub logging: LogArgs,

    /// Read default policy settings from a TOML file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Count files before hashing so progress can be logged as a fraction
    #[arg(short = 'p', long, global = true)]
    pub progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        conflicts_with_all = ["log_level", "quiet"]
    )]
    pub verbose: u8,

    /// Set the log level explicitly
    #[arg(long, value_enum, value_name = "LEVEL", global = true, conflicts_with = "quiet")]
    pub log_level: Option<LogLevel>,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append log output to a file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl LogArgs {
    /// The filter requested on the command line, if any. `None` defers to
    /// `RUST_LOG`.
    pub fn level_override(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        if let Some(level) = self.log_level {
            return Some(level.as_filter());
        }
        match self.verbose {
            0 => None,
            1 => Some("info"),
            _ => Some("debug"),
        }
    }
}

/// Filters shared by every command that walks a tree.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Hash the targets of symlinks that point to regular files
    #[arg(short = 'f', long)]
    pub follow_symlinks: bool,

    /// Only look at the top level of each directory
    #[arg(short = 'r', long)]
    pub no_recursive: bool,

    /// Skip files and directories whose name starts with a dot
    #[arg(short = 'H', long)]
    pub no_hidden: bool,

    /// Match include/exclude patterns case-insensitively
    #[arg(short = 'C', long)]
    pub case_insensitive: bool,

    /// Only process paths containing PATTERN (repeatable)
    #[arg(short = 'i', long = "include", value_name = "PATTERN")]
    pub include: Vec<String>,

    /// Skip paths containing PATTERN (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

impl PolicyArgs {
    /// Overlays the flags onto `policy`. Flags only ever switch a setting
    /// away from its default; patterns are appended.
    pub fn apply(&self, policy: &mut ScanPolicy) {
        if self.follow_symlinks {
            policy.follow_symlinks = true;
        }
        if self.no_recursive {
            policy.recursive = false;
        }
        if self.no_hidden {
            policy.ignore_hidden = true;
        }
        if self.case_insensitive {
            policy.case_sensitive = false;
        }
        policy.include.extend(self.include.iter().cloned());
        policy.exclude.extend(self.exclude.iter().cloned());
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Hash one or more source trees into a manifest
    #[command(long_about = help_text::GENERATE_LONG_ABOUT)]
    Generate {
        /// Source directories followed by the manifest to write
        #[arg(value_name = "PATH", required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Scan and hash without writing the manifest
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Check a mirror tree against a manifest
    #[command(long_about = help_text::VERIFY_LONG_ABOUT)]
    Verify {
        /// Mirror directory to check
        #[arg(value_name = "MIRROR")]
        mirror: PathBuf,

        /// Manifest produced by generate
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Do not report mirror files missing from the manifest
        #[arg(short = 'e', long)]
        no_extra_check: bool,
    },

    /// Compare two manifests
    #[command(long_about = help_text::COMPARE_LONG_ABOUT)]
    Compare {
        #[arg(value_name = "MANIFEST_A")]
        manifest_a: PathBuf,

        #[arg(value_name = "MANIFEST_B")]
        manifest_b: PathBuf,
    },

    /// Hash two directory trees and compare them
    #[command(long_about = help_text::DIFF_LONG_ABOUT)]
    Diff {
        #[arg(value_name = "DIR_A")]
        dir_a: PathBuf,

        #[arg(value_name = "DIR_B")]
        dir_b: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

impl Cli {
    pub fn try_parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}
