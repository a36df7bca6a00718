use std::{error::Error, fmt, io};

use backtrace::Backtrace;
use log::{debug, log_enabled, Level};

/// The category of a failure.
///
/// `TransactionAborted` is the only recoverable kind: the caller is
/// expected to roll the transaction back (`transaction_complete(tx,
/// false)`) and may retry it from the beginning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TransactionAborted,
    Storage,
}

#[derive(Debug)]
pub struct SmallError {
    kind: ErrorKind,
    details: String,
}

impl SmallError {
    /// A storage or logic fault.
    pub fn new(msg: &str) -> SmallError {
        SmallError {
            kind: ErrorKind::Storage,
            details: msg.to_string(),
        }
    }

    pub fn aborted(msg: &str) -> SmallError {
        SmallError {
            kind: ErrorKind::TransactionAborted,
            details: msg.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::TransactionAborted
    }

    /// Log the error together with the current backtrace. Capturing a
    /// backtrace is slow, so it's skipped unless debug logging is on.
    pub fn show_backtrace(&self) {
        if log_enabled!(Level::Debug) {
            let bt = Backtrace::new();
            debug!("{}\nbacktrace:\n{:?}", self, bt);
        }
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::TransactionAborted => {
                write!(f, "transaction aborted: {}", self.details)
            }
            ErrorKind::Storage => write!(f, "{}", self.details),
        }
    }
}

impl Error for SmallError {}

impl From<io::Error> for SmallError {
    fn from(e: io::Error) -> Self {
        SmallError::new(&format!("io error: {}", e))
    }
}
