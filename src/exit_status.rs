use std::process::ExitCode;

/// Result codes surfaced to the caller of the binary.
///
/// The numeric values are part of the command line interface and must not
/// be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok = 0,
    GeneralError = 1,
    InvalidArguments = 2,
    FileIoError = 3,
    MemoryError = 4,
    VerifyFailed = 5,
    Interrupted = 6,
    InvalidFormat = 7,
    /// More than one top-level operation (or mutually exclusive flags) requested.
    ModeConflict = 8,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}
