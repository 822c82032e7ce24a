use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the client.
#[derive(Debug, Error)]
pub enum Error {
    /// The server answered with a status other than the expected one.
    #[error("status code mismatch: {status} != {expected}. reason: {reason}. text: {text}")]
    StatusMismatch {
        /// Status the server answered with.
        status: StatusCode,
        /// Status the request expected.
        expected: StatusCode,
        /// Canonical reason phrase of `status`.
        reason: String,
        /// Response body, verbatim.
        text: String,
    },

    /// The request never produced a response (DNS, refused connection, timeout).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[source] reqwest::Error),

    /// A URL could not be built from the base and a path.
    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        /// The URL or path that failed to parse.
        url: String,
        /// Why it failed.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP session could not be built.
    #[error("could not start up the client: {0}")]
    ClientFormation(#[source] reqwest::Error),

    /// Board metadata could not be fetched while building the client.
    #[error("board metadata is unavailable: {0}")]
    CatalogUnavailable(#[source] Box<Error>),

    /// The requested board is not in the catalog.
    #[error("board {0} not found")]
    BoardNotFound(String),

    /// Passcode authentication was attempted without a passcode.
    #[error("please provide an actual passcode")]
    PasscodeMissing,

    /// An outgoing message carries more files than allowed.
    #[error(
        "the maximum number of files has been exceeded: {count} files with passcode {}, at most {} allowed",
        enabled(.passcode),
        max_files(.passcode)
    )]
    ExtraFiles {
        /// Number of attached files.
        count: usize,
        /// Whether the passcode limits applied.
        passcode: bool,
    },

    /// The files of an outgoing message are too large in total.
    #[error(
        "file size limit exceeded: {megabytes:.2} MB with passcode {}, at most {} MB allowed",
        enabled(.passcode),
        max_megabytes(.passcode)
    )]
    FileSize {
        /// Combined size of the files in megabytes.
        megabytes: f64,
        /// Whether the passcode limits applied.
        passcode: bool,
    },

    /// A single file could not be downloaded.
    #[error("failed to download {}: {source}", .path.display())]
    Download {
        /// Where the file was to be written.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: Box<Error>,
    },

    /// A download worker stopped before reporting its jobs.
    #[error("download worker stopped: {0}")]
    Worker(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response body, expected {0}")]
    UnexpectedBody(&'static str),

    /// JSON decoding failed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// A filesystem operation failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn enabled(passcode: &bool) -> &'static str {
    if *passcode {
        "enabled"
    } else {
        "disabled"
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn max_files(passcode: &bool) -> usize {
    crate::models::message::Limits::for_passcode(*passcode).files
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn max_megabytes(passcode: &bool) -> u64 {
    crate::models::message::Limits::for_passcode(*passcode).megabytes
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::TransportUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_embed_offending_values() {
        let err = Error::BoardNotFound("zz".into());
        assert_eq!(err.to_string(), "board zz not found");

        let err = Error::ExtraFiles {
            count: 6,
            passcode: false,
        };
        let msg = err.to_string();
        assert!(msg.contains("6 files"));
        assert!(msg.contains("disabled"));
        assert!(msg.contains("at most 4"));

        let err = Error::StatusMismatch {
            status: StatusCode::NOT_FOUND,
            expected: StatusCode::OK,
            reason: "Not Found".into(),
            text: "no such thread".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("no such thread"));
    }
}
