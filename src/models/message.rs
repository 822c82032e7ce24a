//! Outgoing posts and their file limits.

use std::path::{Path, PathBuf};

use crate::{error::Error, result::Result};

/// File limits of a single post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of attached files.
    pub files: usize,
    /// Maximum combined size in megabytes (10^6 bytes).
    pub megabytes: u64,
}

impl Limits {
    /// Limits for posters with a passcode.
    pub const PASSCODE: Limits = Limits {
        files: 8,
        megabytes: 60,
    };

    /// Limits for everyone else.
    pub const ANONYMOUS: Limits = Limits {
        files: 4,
        megabytes: 20,
    };

    /// Returns the limits that apply with or without a passcode.
    pub fn for_passcode(passcode: bool) -> Limits {
        if passcode {
            Self::PASSCODE
        } else {
            Self::ANONYMOUS
        }
    }
}

/// An outgoing post.
///
/// A message is only built and validated here; it is never sent.
///
/// ```rust
/// use makaba::message::Message;
///
/// let message = Message::new("b", "300000000")
///     .comment("bump")
///     .sage(true);
///
/// assert!(message.validate(false).is_ok());
/// assert!(message.payload().contains(&("sage".to_string(), "1".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    board: String,
    thread: String,
    comment: String,
    email: String,
    subject: String,
    name: String,
    sage: bool,
    files: Vec<PathBuf>,
}

impl Message {
    /// A reply to `thread` on `board`. An empty thread starts a new one.
    pub fn new(board: impl Into<String>, thread: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            thread: thread.into(),
            ..Self::default()
        }
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the email field.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the poster name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the post as not bumping the thread.
    #[must_use]
    pub fn sage(mut self, sage: bool) -> Self {
        self.sage = sage;
        self
    }

    /// Attaches a local file.
    #[must_use]
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Returns the attached files.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Returns the form fields of the post, without the files.
    pub fn payload(&self) -> Vec<(String, String)> {
        [
            ("json", "1".to_string()),
            ("task", "post".to_string()),
            ("board", self.board.clone()),
            ("thread", self.thread.clone()),
            ("email", self.email.clone()),
            ("name", self.name.clone()),
            ("subject", self.subject.clone()),
            ("comment", self.comment.clone()),
            ("sage", u8::from(self.sage).to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Checks the attached files against the posting limits.
    ///
    /// # Errors
    ///
    /// [`Error::ExtraFiles`] if there are too many files, [`Error::FileSize`] if
    /// they are too large together, [`Error::Io`] if a file cannot be read.
    pub fn validate(&self, passcode: bool) -> Result<()> {
        let limits = Limits::for_passcode(passcode);
        if self.files.len() > limits.files {
            return Err(Error::ExtraFiles {
                count: self.files.len(),
                passcode,
            });
        }

        let mut bytes = 0u64;
        for file in &self.files {
            bytes += std::fs::metadata(file)?.len();
        }
        if bytes > limits.megabytes * 1_000_000 {
            #[allow(clippy::cast_precision_loss)]
            let megabytes = bytes as f64 / 1_000_000.0;
            return Err(Error::FileSize {
                megabytes,
                passcode,
            });
        }
        Ok(())
    }
}
