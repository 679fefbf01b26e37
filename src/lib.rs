// lib.rs
//
// echoscribe: live speech-to-text via a pluggable recognition engine, and
// batch media transcription through the AssemblyAI v2 API. The batch side
// is an upload -> submit -> poll pipeline owned by a cancellable job
// controller; the live side pumps engine events into append-only
// transcript state.

pub mod config;
pub mod error;
pub mod export;
pub mod live;
pub mod media;
pub mod transcript;
pub mod transcription;

// Re-export the public surface
pub use config::{ApiConfig, API_KEY_ENV};
pub use error::TranscribeError;
pub use live::{LiveTranscriber, RecognitionEngine, RecognitionEvent, UnsupportedEngine};
pub use media::{MediaFile, MediaKind, MAX_FILE_BYTES};
pub use transcript::TranscriptState;
pub use transcription::{
    AssemblyAiClient, JobController, JobEvent, JobStage, JobStatus, TranscriptService,
    POLL_INTERVAL,
};
