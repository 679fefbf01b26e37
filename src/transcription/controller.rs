// transcription/controller.rs
//
// Job lifecycle controller: drives one remote transcription job through
// upload -> submit -> poll-until-terminal, with guaranteed poll cleanup.
//
// At most one job is in flight per controller. Terminal outcomes are
// reported exactly once over the event channel; tearing the controller
// down mid-flight cancels the poll task and suppresses any late result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::client::TranscriptService;
use super::job::{JobStatus, TranscriptionJob};
use crate::error::TranscribeError;
use crate::media::MediaFile;

/// Fixed delay between consecutive status checks. Ticks are serialized:
/// the next delay is armed only after the previous check resolves.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Shown when the service marks a job failed without an error message.
const FALLBACK_FAILURE_MESSAGE: &str = "Transcription failed";

/// Pipeline stage of the active job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Uploading,
    Submitting,
    Polling,
}

/// Observable output of the controller. Every job emits its stage
/// transitions followed by exactly one `Completed` or `Failed`, unless the
/// controller is shut down first, in which case nothing further arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Stage(JobStage),
    Completed { text: String },
    Failed { message: String },
}

/// The live pipeline task for one job, cancellable as a unit.
struct PollHandle {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct ControllerInner {
    service: Arc<dyn TranscriptService>,
    events: mpsc::UnboundedSender<JobEvent>,
    active: Mutex<Option<PollHandle>>,
    shutdown: CancellationToken,
    generations: AtomicU64,
    poll_interval: Duration,
}

pub struct JobController {
    inner: Arc<ControllerInner>,
}

impl JobController {
    /// Build a controller over `service` with the default poll interval.
    /// Returns the receiving end of its event channel.
    pub fn new(
        service: Arc<dyn TranscriptService>,
    ) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        Self::with_poll_interval(service, POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        service: Arc<dyn TranscriptService>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<JobEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ControllerInner {
            service,
            events,
            active: Mutex::new(None),
            shutdown: CancellationToken::new(),
            generations: AtomicU64::new(0),
            poll_interval,
        });
        (Self { inner }, rx)
    }

    /// Start transcribing `media`. Rejected with `JobInFlight` while a
    /// previous job is still active. Must be called within a tokio runtime.
    pub fn transcribe(&self, media: MediaFile) -> Result<(), TranscribeError> {
        let mut slot = self
            .inner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().map_or(false, |h| !h.task.is_finished()) {
            return Err(TranscribeError::JobInFlight);
        }

        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.inner.shutdown.child_token();
        let task = tokio::spawn(run_job(
            self.inner.clone(),
            media,
            cancel.clone(),
            generation,
        ));
        *slot = Some(PollHandle {
            generation,
            cancel,
            task,
        });
        Ok(())
    }

    /// True while a job is in flight.
    pub fn is_processing(&self) -> bool {
        self.inner
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(false, |h| !h.task.is_finished())
    }

    /// Cancel the active job, if any, and refuse further work from it.
    /// No terminal event is emitted for a job torn down this way.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        if let Ok(slot) = self.inner.active.lock() {
            if let Some(handle) = slot.as_ref() {
                handle.cancel.cancel();
            }
        }
    }

    /// Wait until no pipeline task is running.
    pub async fn wait_idle(&self) {
        loop {
            let finished = self
                .inner
                .active
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_ref()
                .map_or(true, |h| h.task.is_finished());
            if finished {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        // A dangling poll must not outlive its owner.
        self.inner.shutdown.cancel();
    }
}

async fn run_job(
    inner: Arc<ControllerInner>,
    media: MediaFile,
    cancel: CancellationToken,
    generation: u64,
) {
    match drive(&inner, &media, &cancel).await {
        Some(Ok(text)) => {
            info!("transcription of {} completed ({} chars)", media.name(), text.len());
            let _ = inner.events.send(JobEvent::Completed { text });
        }
        Some(Err(message)) => {
            error!("transcription of {} failed: {}", media.name(), message);
            let _ = inner.events.send(JobEvent::Failed { message });
        }
        None => {
            info!("transcription of {} cancelled", media.name());
        }
    }

    // Free the slot so a fresh transcribe call can start. The generation
    // check keeps a stale task from clearing a newer job's handle.
    let mut slot = inner.active.lock().unwrap_or_else(|e| e.into_inner());
    if slot.as_ref().map_or(false, |h| h.generation == generation) {
        *slot = None;
    }
}

/// Run the pipeline to its outcome. `None` means the job was cancelled and
/// nothing may be reported; in-flight request futures are dropped at that
/// point and their results discarded.
async fn drive(
    inner: &ControllerInner,
    media: &MediaFile,
    cancel: &CancellationToken,
) -> Option<Result<String, String>> {
    let _ = inner.events.send(JobEvent::Stage(JobStage::Uploading));
    let upload_url = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        result = inner.service.upload(media) => match result {
            Ok(url) => url,
            Err(e) => return Some(Err(e.to_string())),
        },
    };

    let _ = inner.events.send(JobEvent::Stage(JobStage::Submitting));
    let job_id = tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        result = inner.service.submit(&upload_url) => match result {
            Ok(id) => id,
            Err(e) => return Some(Err(e.to_string())),
        },
    };

    let mut job = TranscriptionJob::submitted(job_id);
    info!(
        "transcription job {} submitted; polling every {:?}",
        job.id, inner.poll_interval
    );
    let _ = inner.events.send(JobEvent::Stage(JobStage::Polling));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(inner.poll_interval) => {}
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = inner.service.fetch_status(&job.id) => result,
        };

        match status {
            Err(e) => return Some(Err(e.to_string())),
            Ok(resp) => {
                job.status = resp.status;
                match resp.status {
                    // Not terminal: stay in the polling state, say nothing.
                    JobStatus::Queued | JobStatus::Processing => {}
                    JobStatus::Completed => {
                        return Some(Ok(resp.text.unwrap_or_default()));
                    }
                    JobStatus::Error => {
                        return Some(Err(resp
                            .error
                            .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string())));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::transcription::job::JobStatusResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    enum Behavior {
        Ok(String),
        Fail(String),
        Hang,
    }

    /// Service whose responses are scripted per test. An exhausted status
    /// queue keeps answering `processing`.
    struct ScriptedService {
        upload: Behavior,
        submit: Behavior,
        statuses: Mutex<VecDeque<Result<JobStatusResponse, String>>>,
        status_calls: AtomicUsize,
    }

    impl ScriptedService {
        fn new(statuses: Vec<Result<JobStatusResponse, String>>) -> Arc<Self> {
            Arc::new(Self {
                upload: Behavior::Ok("https://cdn.test/upload/1".into()),
                submit: Behavior::Ok("job-1".into()),
                statuses: Mutex::new(statuses.into()),
                status_calls: AtomicUsize::new(0),
            })
        }

        fn status(kind: JobStatus, text: Option<&str>, error: Option<&str>) -> JobStatusResponse {
            JobStatusResponse {
                status: kind,
                text: text.map(str::to_string),
                error: error.map(str::to_string),
            }
        }

        fn calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptService for ScriptedService {
        async fn upload(&self, _media: &MediaFile) -> Result<String, TranscribeError> {
            match self.upload.clone() {
                Behavior::Ok(url) => Ok(url),
                Behavior::Fail(msg) => Err(TranscribeError::Upload(msg)),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn submit(&self, _upload_url: &str) -> Result<String, TranscribeError> {
            match self.submit.clone() {
                Behavior::Ok(id) => Ok(id),
                Behavior::Fail(msg) => Err(TranscribeError::Submit(msg)),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        async fn fetch_status(&self, _job_id: &str) -> Result<JobStatusResponse, TranscribeError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .statuses
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front();
            match next {
                Some(Ok(resp)) => Ok(resp),
                Some(Err(msg)) => Err(TranscribeError::Status(msg)),
                None => Ok(Self::status(JobStatus::Processing, None, None)),
            }
        }
    }

    fn media() -> MediaFile {
        MediaFile::new("talk.mp4", MediaKind::Video, Bytes::from_static(b"vid")).unwrap()
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<JobEvent>) -> JobEvent {
        rx.recv().await.expect("event channel open")
    }

    fn assert_no_more_events(rx: &mut mpsc::UnboundedReceiver<JobEvent>) {
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_polling_through_processing() {
        let service = ScriptedService::new(vec![
            Ok(ScriptedService::status(JobStatus::Processing, None, None)),
            Ok(ScriptedService::status(JobStatus::Processing, None, None)),
            Ok(ScriptedService::status(
                JobStatus::Completed,
                Some("hello world"),
                None,
            )),
        ]);
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Submitting));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Polling));
        assert_eq!(
            next(&mut rx).await,
            JobEvent::Completed {
                text: "hello world".into()
            }
        );

        controller.wait_idle().await;
        assert!(!controller.is_processing());
        assert_eq!(service.calls(), 3);
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn service_reported_error_fails_exactly_once() {
        let service = ScriptedService::new(vec![Ok(ScriptedService::status(
            JobStatus::Error,
            None,
            Some("silence detected"),
        ))]);
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Submitting));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Polling));
        assert_eq!(
            next(&mut rx).await,
            JobEvent::Failed {
                message: "silence detected".into()
            }
        );

        controller.wait_idle().await;
        assert_eq!(service.calls(), 1);
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_service_error_message_gets_fallback() {
        let service = ScriptedService::new(vec![Ok(ScriptedService::status(
            JobStatus::Error,
            None,
            None,
        ))]);
        let (controller, mut rx) = JobController::new(service);

        controller.transcribe(media()).unwrap();
        loop {
            if let JobEvent::Failed { message } = next(&mut rx).await {
                assert_eq!(message, FALLBACK_FAILURE_MESSAGE);
                break;
            }
        }
        controller.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn status_transport_failure_cancels_polling() {
        let service = ScriptedService::new(vec![Err("connection reset".into())]);
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        loop {
            if let JobEvent::Failed { message } = next(&mut rx).await {
                assert!(message.contains("Failed to check status"));
                assert!(message.contains("connection reset"));
                break;
            }
        }

        controller.wait_idle().await;
        assert_eq!(service.calls(), 1);
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_fails_job_before_any_poll() {
        let service = Arc::new(ScriptedService {
            upload: Behavior::Fail("storage unavailable".into()),
            submit: Behavior::Ok("unused".into()),
            statuses: Mutex::new(VecDeque::new()),
            status_calls: AtomicUsize::new(0),
        });
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        match next(&mut rx).await {
            JobEvent::Failed { message } => {
                assert!(message.contains("Failed to upload file"));
                assert!(message.contains("storage unavailable"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        controller.wait_idle().await;
        assert_eq!(service.calls(), 0);
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_failure_fails_job_before_any_poll() {
        let service = Arc::new(ScriptedService {
            upload: Behavior::Ok("https://cdn.test/upload/1".into()),
            submit: Behavior::Fail("audio_url is invalid".into()),
            statuses: Mutex::new(VecDeque::new()),
            status_calls: AtomicUsize::new(0),
        });
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Submitting));
        match next(&mut rx).await {
            JobEvent::Failed { message } => {
                assert!(message.contains("Failed to start transcription"));
            }
            other => panic!("expected failure, got {other:?}"),
        }

        controller.wait_idle().await;
        assert_eq!(service.calls(), 0);
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_second_job_while_one_is_in_flight() {
        let service = Arc::new(ScriptedService {
            upload: Behavior::Hang,
            submit: Behavior::Ok("unused".into()),
            statuses: Mutex::new(VecDeque::new()),
            status_calls: AtomicUsize::new(0),
        });
        let (controller, mut rx) = JobController::new(service);

        controller.transcribe(media()).unwrap();
        assert!(controller.is_processing());
        assert!(matches!(
            controller.transcribe(media()),
            Err(TranscribeError::JobInFlight)
        ));

        controller.shutdown();
        controller.wait_idle().await;

        // The hung job emitted its stage and nothing else.
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_mid_poll_suppresses_all_callbacks() {
        // Empty queue: every poll answers `processing`, forever.
        let service = ScriptedService::new(vec![]);
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Submitting));
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Polling));

        // Let a couple of ticks land, then tear down mid-poll.
        tokio::time::sleep(POLL_INTERVAL * 2).await;
        controller.shutdown();
        controller.wait_idle().await;
        assert!(!controller.is_processing());

        let polls_at_shutdown = service.calls();
        tokio::time::sleep(POLL_INTERVAL * 4).await;
        assert_eq!(service.calls(), polls_at_shutdown, "no ticks after teardown");
        assert_no_more_events(&mut rx);
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_a_fresh_job_after_terminal_state() {
        let service = ScriptedService::new(vec![
            Ok(ScriptedService::status(JobStatus::Completed, Some("one"), None)),
            Ok(ScriptedService::status(JobStatus::Completed, Some("two"), None)),
        ]);
        let (controller, mut rx) = JobController::new(service);

        controller.transcribe(media()).unwrap();
        loop {
            if let JobEvent::Completed { text } = next(&mut rx).await {
                assert_eq!(text, "one");
                break;
            }
        }
        controller.wait_idle().await;

        controller.transcribe(media()).expect("controller idle again");
        loop {
            if let JobEvent::Completed { text } = next(&mut rx).await {
                assert_eq!(text, "two");
                break;
            }
        }
        controller.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_controller_cancels_the_poll() {
        let service = ScriptedService::new(vec![]);
        let (controller, mut rx) = JobController::new(service.clone());

        controller.transcribe(media()).unwrap();
        assert_eq!(next(&mut rx).await, JobEvent::Stage(JobStage::Uploading));
        drop(controller);

        // The cancelled task winds down without emitting a terminal event.
        tokio::time::sleep(POLL_INTERVAL * 4).await;
        while let Ok(event) = rx.try_recv() {
            assert!(matches!(event, JobEvent::Stage(_)), "got {event:?}");
        }
    }
}
