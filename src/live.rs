// live.rs
//
// Media capture bridge: wraps a platform speech recognition engine behind a
// narrow trait and pumps its events into the shared transcript state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::TranscribeError;
use crate::transcript::TranscriptState;

/// One recognition update from the platform engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Revisable best guess for the utterance in progress.
    Interim(String),
    /// A segment the engine will not revise further.
    Final(String),
    /// Engine-reported fault.
    Error { code: String },
    /// Natural termination (silence timeout, engine shutdown). Not a failure.
    Ended,
}

/// A continuous recognition engine supplied by the platform. `start` hands
/// back the event stream for the session; `stop` must be idempotent and
/// must end that stream (emit `Ended` or drop the sender).
pub trait RecognitionEngine: Send {
    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>, TranscribeError>;
    fn stop(&mut self);
}

/// Placeholder binding for environments without a recognition engine.
pub struct UnsupportedEngine;

impl RecognitionEngine for UnsupportedEngine {
    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<RecognitionEvent>, TranscribeError> {
        Err(TranscribeError::UnsupportedCapability)
    }

    fn stop(&mut self) {}
}

/// Drives a [`RecognitionEngine`] session and owns the transcript it builds.
///
/// While listening, a background task applies every engine event to the
/// shared [`TranscriptState`]: finalized segments append, interim segments
/// replace. An engine error or a natural end both drop the listening flag;
/// only the former records an error.
pub struct LiveTranscriber {
    engine: Box<dyn RecognitionEngine>,
    state: Arc<Mutex<TranscriptState>>,
    listening: Arc<AtomicBool>,
    last_error: Arc<Mutex<Option<String>>>,
    pump: Option<JoinHandle<()>>,
}

impl LiveTranscriber {
    pub fn new(engine: Box<dyn RecognitionEngine>) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(TranscriptState::new())),
            listening: Arc::new(AtomicBool::new(false)),
            last_error: Arc::new(Mutex::new(None)),
            pump: None,
        }
    }

    /// Begin continuous listening. Fails with `UnsupportedCapability` when
    /// no engine binding exists. Starting twice is a no-op.
    pub fn start_listening(&mut self) -> Result<(), TranscribeError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut rx = match self.engine.start() {
            Ok(rx) => rx,
            Err(e) => {
                self.listening.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if let Ok(mut last) = self.last_error.lock() {
            *last = None;
        }

        let state = self.state.clone();
        let listening = self.listening.clone();
        let last_error = self.last_error.clone();

        self.pump = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    RecognitionEvent::Interim(segment) => {
                        state
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .set_interim(&segment);
                    }
                    RecognitionEvent::Final(segment) => {
                        state
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .push_final(&segment);
                    }
                    RecognitionEvent::Error { code } => {
                        let err = TranscribeError::Recognition { code };
                        warn!("recognition engine fault: {err}");
                        if let Ok(mut last) = last_error.lock() {
                            *last = Some(err.to_string());
                        }
                        listening.store(false, Ordering::SeqCst);
                    }
                    RecognitionEvent::Ended => {
                        info!("recognition session ended by engine");
                        break;
                    }
                }
            }
            listening.store(false, Ordering::SeqCst);
        }));

        Ok(())
    }

    /// End listening. Safe to call at any time, any number of times.
    pub fn stop_listening(&mut self) {
        self.engine.stop();
        self.listening.store(false, Ordering::SeqCst);
    }

    /// Clear finalized and interim text. Does not affect listening state.
    pub fn reset_transcript(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset();
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Copy of the current transcript.
    pub fn transcript(&self) -> TranscriptState {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Wait for the event pump of the current session to finish.
    pub async fn ended(&mut self) {
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
    }
}
