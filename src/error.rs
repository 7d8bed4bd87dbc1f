use thiserror::Error;

/// Reasons the controller rejects an intent or reports a failed operation.
///
/// These are recoverable: the session state is left unchanged and the same
/// intent may be retried.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The effect identifier is not part of the static catalog.
    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    /// A photo index outside the current collection.
    #[error("photo index {index} out of range ({len} photos loaded)")]
    PhotoIndexOutOfRange { index: usize, len: usize },

    /// An intent that needs at least one photo arrived on an empty session.
    #[error("no photos loaded")]
    NoPhotos,

    /// Commit requested without a selected effect.
    #[error("no effect selected")]
    NoEffectSelected,

    /// Commit requested while another commit is still in flight.
    #[error("a commit is already in progress")]
    CommitInFlight,

    /// An upload intent in which no file was an image.
    #[error("no image files accepted from upload")]
    EmptyUpload,
}

/// Failures at the effect-service boundary. Both variants leave session
/// state untouched; the failed request may simply be reissued.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service was unreachable, the connection dropped, or the
    /// client-imposed timeout elapsed.
    #[error("effect service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status. The response body
    /// is opaque failure detail and is not interpreted.
    #[error("effect service returned status {status}")]
    Status { status: u16 },
}
