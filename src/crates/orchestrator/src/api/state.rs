//! Shared application state threaded through every HTTP handler.

use crate::events::{Event, EventBus, Handler, Payload};
use crate::job::{JobResult, JobStore};
use crate::providers::{FallbackChain, Router};
use crate::renderer::EnvironmentProbe;
use crate::session::SessionTable;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub event_bus: Arc<EventBus>,
    pub job_store: Arc<JobStore>,
    pub router: Arc<Router>,
    pub fallback_chain: Arc<FallbackChain>,
    pub sessions: Arc<SessionTable>,
    pub media_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub started_at: Instant,
    active_jobs: AtomicUsize,
}

impl AppState {
    pub fn new(
        event_bus: Arc<EventBus>,
        job_store: Arc<JobStore>,
        router: Arc<Router>,
        fallback_chain: Arc<FallbackChain>,
        sessions: Arc<SessionTable>,
        media_dir: PathBuf,
        temp_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            event_bus,
            job_store,
            router,
            fallback_chain,
            sessions,
            media_dir,
            temp_dir,
            started_at: Instant::now(),
            active_jobs: AtomicUsize::new(0),
        })
    }

    pub fn job_started(&self) {
        self.active_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_finished(&self) {
        self.active_jobs.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_job_count(&self) -> usize {
        self.active_jobs.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn renderer_probe(&self) -> EnvironmentProbe {
        EnvironmentProbe::get()
    }
}

/// Writes terminal job outcomes to the job store and retires the active
/// job counter. Subscribed directly on the `video.rendered` /
/// `video.failed` topics, since both are terminal for a job.
#[async_trait]
impl Handler for AppState {
    async fn handle(&self, event: Event) {
        match &*event.payload {
            Payload::VideoRendered { video_url, code, used_ai, quality, generation_type } => {
                self.job_store.put(
                    event.job_id.clone(),
                    JobResult::Completed {
                        video_url: video_url.clone(),
                        code: code.clone(),
                        used_ai: *used_ai,
                        quality: *quality,
                        generation_type: generation_type.clone(),
                    },
                );
                self.job_finished();
            }
            Payload::VideoFailed { error, details } => {
                self.job_store.put(
                    event.job_id.clone(),
                    JobResult::Failed { error: error.clone(), details: details.clone() },
                );
                self.job_finished();
            }
            _ => {}
        }
    }
}

pub type SharedState = Arc<AppState>;
