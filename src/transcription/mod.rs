// transcription/mod.rs
//
// Batch transcription over the remote service: wire types, HTTP client,
// and the job lifecycle controller.

pub mod client;
pub mod controller;
pub mod job;

// Re-export commonly used types
pub use client::{AssemblyAiClient, TranscriptService};
pub use controller::{JobController, JobEvent, JobStage, POLL_INTERVAL};
pub use job::{JobStatus, JobStatusResponse, TranscriptionJob};
