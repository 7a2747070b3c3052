//! Result reporting
//!
//! Turns a [`CallResult`] into user-visible output and an exit status. The
//! reporter writes to injected handles so the binary can pass stdout and
//! stderr while tests capture into buffers.

use crate::outcome::{CallResult, Response};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::error;

/// Process exit status for one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Failure => ExitCode::FAILURE,
        }
    }
}

/// Writes call results to an output and an error stream
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
}

impl Reporter<io::Stdout, io::Stderr> {
    /// Reporter bound to the process stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Emit the result for `destination` and decide the exit status
    ///
    /// Generated text goes to the output stream verbatim. A publish
    /// acknowledgement prints nothing. Failures print one line naming the
    /// destination and the error on the error stream.
    pub fn report(&mut self, destination: &str, result: &CallResult) -> io::Result<ExitStatus> {
        match result {
            CallResult::Success {
                response: Response::Generated { text, .. },
            } => {
                writeln!(self.out, "{text}")?;
                self.out.flush()?;
                Ok(ExitStatus::Success)
            }
            CallResult::Success {
                response: Response::Acknowledged { .. },
            } => Ok(ExitStatus::Success),
            CallResult::Failure { kind, message } => {
                error!(destination, %kind, "Call failed");
                writeln!(self.err, "Error calling '{destination}': {kind}: {message}")?;
                self.err.flush()?;
                Ok(ExitStatus::Failure)
            }
        }
    }

    /// Write free-form command output (e.g. the effective configuration)
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Consume the reporter, returning the output and error handles
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
