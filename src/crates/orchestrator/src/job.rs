//! Job submission types and the TTL-indexed job store.
//!
//! The store is intentionally narrow (`put`/`get`/`sweep`) so a durable
//! key-value store could be substituted later without touching callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Render quality. Drives both the child-process quality flag and the
/// render timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    /// Output directory segment under `{mediaDir}/videos/scene/`.
    pub fn folder(&self) -> &'static str {
        match self {
            Quality::Low => "480p15",
            Quality::Medium => "720p30",
            Quality::High => "1080p60",
        }
    }

    /// Render timeout, derived from quality per the concurrency model.
    pub fn render_timeout(&self) -> Duration {
        match self {
            Quality::Low => Duration::from_secs(60),
            Quality::Medium => Duration::from_secs(180),
            Quality::High => Duration::from_secs(600),
        }
    }
}

/// The five visual style presets. Each drives a distinct color palette,
/// typography, and pacing multiplier in the visual designer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[serde(rename = "3blue1brown")]
    ThreeBlue1Brown,
    Minimalist,
    Playful,
    Cinematic,
    Technical,
}

impl Style {
    /// Pacing multiplier applied to beat durations.
    pub fn pacing_multiplier(&self) -> f64 {
        match self {
            Style::ThreeBlue1Brown => 1.0,
            Style::Minimalist => 0.85,
            Style::Playful => 1.2,
            Style::Cinematic => 1.1,
            Style::Technical => 0.9,
        }
    }

    /// Maximum camera zoom allowed for this style.
    pub fn max_zoom(&self) -> f64 {
        match self {
            Style::ThreeBlue1Brown => 2.5,
            Style::Minimalist => 1.5,
            Style::Playful => 3.0,
            Style::Cinematic => 2.0,
            Style::Technical => 1.8,
        }
    }

    /// Whether this style permits camera rotation.
    pub fn allows_rotation(&self) -> bool {
        !matches!(self, Style::Minimalist | Style::Technical)
    }
}

/// A job submission, created by the gateway and threaded through every
/// pipeline event by its string `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub concept: String,
    pub quality: Quality,
    pub style: Style,
    pub use_smart_mode: bool,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Maximum accepted concept length, in characters.
    pub const MAX_CONCEPT_LEN: usize = 2000;

    /// Create a new job with a fresh id, validating the concept length.
    pub fn new(concept: impl Into<String>, quality: Quality, style: Style, use_smart_mode: bool) -> crate::Result<Self> {
        let concept = concept.into();
        if concept.is_empty() || concept.chars().count() > Self::MAX_CONCEPT_LEN {
            return Err(crate::OrchestratorError::Validation(format!(
                "concept must be 1..{} characters, got {}",
                Self::MAX_CONCEPT_LEN,
                concept.chars().count()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            concept,
            quality,
            style,
            use_smart_mode,
            created_at: Utc::now(),
        })
    }
}

/// The submission context every pipeline stage after `concept.submitted`
/// carries forward, so a stage only ever needs the event immediately
/// upstream of it rather than re-deriving state from the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub concept: String,
    pub quality: Quality,
    pub style: Style,
    pub use_smart_mode: bool,
}

/// Terminal outcome of a job, as stored by the job store and returned by
/// the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResult {
    Completed {
        video_url: String,
        code: String,
        used_ai: bool,
        quality: Quality,
        generation_type: String,
    },
    Failed {
        error: String,
        details: Option<String>,
    },
}

struct StoredResult {
    result: JobResult,
    stored_at: DateTime<Utc>,
}

/// TTL-indexed in-memory map from job id to terminal result.
///
/// Jobs with no entry are reported as still generating by the gateway;
/// this store never holds in-flight state, only completed/failed outcomes.
pub struct JobStore {
    entries: parking_lot::RwLock<HashMap<String, StoredResult>>,
    ttl: Duration,
}

impl JobStore {
    /// Default time-to-live for a stored result.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

    /// Default sweep interval.
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

    pub fn new() -> Arc<Self> {
        Self::with_ttl(Self::DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            entries: parking_lot::RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Store a terminal result for a job.
    pub fn put(&self, job_id: impl Into<String>, result: JobResult) {
        let job_id = job_id.into();
        tracing::info!(job_id = %job_id, "job reached terminal state");
        self.entries.write().insert(
            job_id,
            StoredResult {
                result,
                stored_at: Utc::now(),
            },
        );
    }

    /// Fetch a job's result, if it has reached a terminal state and has
    /// not yet expired.
    pub fn get(&self, job_id: &str) -> Option<JobResult> {
        self.entries.read().get(job_id).map(|e| e.result.clone())
    }

    /// Remove entries older than the configured TTL. Returns the number
    /// of entries removed.
    pub fn sweep(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::hours(1));
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.stored_at > cutoff);
        before - entries.len()
    }

    /// Spawn the periodic sweep task. The returned handle can be aborted
    /// on process shutdown.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Self::SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired job results");
                }
            }
        })
    }
}
