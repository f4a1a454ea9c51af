/// Repository-wide structured errors for upload operations.
#[derive(Debug, Clone)]
pub enum UploadError {
    /// Caller-supplied arguments are invalid (bad path, empty bucket, etc.).
    InvalidInput(String),
    /// The object-store transport returned an error (network, auth, 5xx).
    Transport(String),
    /// A multipart upload protocol invariant was violated (missing part,
    /// mismatched etag, unexpected part count).
    MultipartProtocol(String),
    /// The operation observed a cancellation request.
    Cancelled,
    /// An unexpected internal error (I/O on the local filesystem, etc.).
    Internal(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use UploadError::*;
        match self {
            InvalidInput(s) => write!(f, "invalid input: {}", s),
            Transport(s) => write!(f, "transport error: {}", s),
            MultipartProtocol(s) => write!(f, "multipart protocol error: {}", s),
            Cancelled => write!(f, "operation cancelled"),
            Internal(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    /// Whether this error is considered retriable when it occurs before any
    /// bytes have been sent (session setup, `create_multipart`, precondition
    /// checks). Conservative: only transport failures are retriable.
    pub fn is_retriable_pre_transfer(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }

    /// Whether this error is considered retriable mid-transfer (an
    /// individual `put_object`/`upload_part` call). Transport failures are
    /// retriable; protocol and input errors are not, since retrying them
    /// would repeat the same mistake.
    pub fn is_retriable_during_transfer(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        UploadError::Internal(err.to_string())
    }
}
