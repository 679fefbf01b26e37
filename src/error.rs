// error.rs
//
// Error taxonomy shared by the capture bridge, the remote client, and the
// job controller. Every failure is converted to user-visible state; nothing
// here is retried automatically.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Missing or placeholder credential, detected before any network call.
    #[error("{0}")]
    Config(String),

    /// No speech recognition engine is available in this environment.
    #[error("Speech recognition is not supported in this environment")]
    UnsupportedCapability,

    /// Selected file exceeds the upload ceiling.
    #[error("File size must be less than {}MB", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    /// Selected file is neither video nor audio.
    #[error("Please select a valid video or audio file (got {0})")]
    UnsupportedMedia(String),

    /// The remote service rejected the credential.
    #[error("Invalid API key. Please check your AssemblyAI API key")]
    Auth,

    #[error("Failed to upload file: {0}")]
    Upload(String),

    #[error("Failed to start transcription: {0}")]
    Submit(String),

    #[error("Failed to check status: {0}")]
    Status(String),

    /// Fault reported by the live recognition engine.
    #[error("Speech recognition error: {code}")]
    Recognition { code: String },

    /// A transcription job is already active on this controller.
    #[error("A transcription job is already in progress")]
    JobInFlight,
}
