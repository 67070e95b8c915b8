//! In-process publish/subscribe event bus.
//!
//! Each topic carries a statically-typed payload variant. Handlers run
//! concurrently on the tokio runtime's worker pool but events for the same
//! `job_id` are delivered to a given subscriber in publish order; there is
//! no ordering guarantee across job ids.

use crate::domain::{KnowledgeTree, MathEnrichment, Narrative, VisualDesign};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// The nine pipeline topics, in publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    ConceptSubmitted,
    ConceptAnalyzed,
    PrerequisitesResolved,
    MathEnriched,
    VisualDesigned,
    NarrativeComposed,
    CodeGenerated,
    VideoRendered,
    VideoFailed,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::ConceptSubmitted => "concept.submitted",
            Topic::ConceptAnalyzed => "concept.analyzed",
            Topic::PrerequisitesResolved => "prerequisites.resolved",
            Topic::MathEnriched => "math.enriched",
            Topic::VisualDesigned => "visual.designed",
            Topic::NarrativeComposed => "narrative.composed",
            Topic::CodeGenerated => "code.generated",
            Topic::VideoRendered => "video.rendered",
            Topic::VideoFailed => "video.failed",
        }
    }
}

/// Classification of a concept, produced by the concept analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    VisualizeMath,
    ExplainConcept,
    TransformObject,
    GraphFunction,
    GeometricProof,
    KineticText,
    CreateScene,
}

/// Entities extracted by the concept analyzer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub objects: Vec<String>,
    pub actions: Vec<String>,
    pub colors: Vec<String>,
    pub math_expressions: Vec<String>,
}

/// Tagged payload carried by each topic. Exactly one agent publishes each
/// variant; the bus enforces this at registration time.
#[derive(Debug, Clone)]
pub enum Payload {
    ConceptSubmitted {
        concept: String,
        quality: crate::job::Quality,
        style: crate::job::Style,
        use_smart_mode: bool,
    },
    ConceptAnalyzed {
        context: crate::job::JobContext,
        intent: Intent,
        confidence: f64,
        entities: ExtractedEntities,
        skill_tag: String,
    },
    PrerequisitesResolved {
        context: crate::job::JobContext,
        tree: KnowledgeTree,
    },
    MathEnriched {
        context: crate::job::JobContext,
        tree: KnowledgeTree,
        enrichment: MathEnrichment,
    },
    VisualDesigned {
        context: crate::job::JobContext,
        tree: KnowledgeTree,
        enrichment: MathEnrichment,
        design: VisualDesign,
    },
    NarrativeComposed {
        context: crate::job::JobContext,
        tree: KnowledgeTree,
        design: VisualDesign,
        narrative: Narrative,
    },
    CodeGenerated {
        context: crate::job::JobContext,
        code: String,
        used_ai: bool,
        generation_type: String,
    },
    VideoRendered {
        video_url: String,
        code: String,
        used_ai: bool,
        quality: crate::job::Quality,
        generation_type: String,
    },
    VideoFailed {
        error: String,
        details: Option<String>,
    },
}

/// An immutable event published on the bus.
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: Topic,
    pub job_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub payload: Arc<Payload>,
}

impl Event {
    pub fn new(topic: Topic, job_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            topic,
            job_id: job_id.into(),
            timestamp: chrono::Utc::now(),
            payload: Arc::new(payload),
        }
    }
}

/// Implemented by pipeline agents that subscribe to a topic.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, event: Event);
}

/// Per-jobId serialized delivery queue for a single subscriber.
struct Subscription {
    handler: Arc<dyn Handler>,
    tx: mpsc::UnboundedSender<Event>,
}

/// In-process topic router.
///
/// `publish` returns once the event has been handed to every subscriber's
/// per-jobId queue; the handlers themselves run on background tasks so a
/// slow handler never blocks the publisher or other subscribers.
pub struct EventBus {
    publishers: Mutex<HashMap<Topic, ()>>,
    subscribers: Mutex<HashMap<Topic, Vec<Subscription>>>,
}

impl EventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            publishers: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
        })
    }

    /// Register a handler for `topic`. Spawns a dedicated task that drains
    /// this subscriber's queue in order, so per-jobId ordering is
    /// preserved even though handlers run concurrently across topics.
    pub async fn subscribe(&self, topic: Topic, handler: Arc<dyn Handler>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        {
            let mut subs = self.subscribers.lock().await;
            subs.entry(topic).or_default().push(Subscription {
                handler: Arc::clone(&handler),
                tx,
            });
        }

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let job_id = event.job_id.clone();
                let topic = event.topic;
                handler.handle(event).await;
                tracing::debug!(job_id = %job_id, topic = topic.as_str(), "handler completed");
            }
        });
    }

    /// Declare that `publisher_topic` is published by exactly this call
    /// site. A second registration for the same topic is a bug: panics
    /// in debug builds, returns an error in release.
    pub fn register_publisher(&self, topic: Topic) -> crate::Result<()> {
        let mut publishers = self
            .publishers
            .try_lock()
            .expect("register_publisher is called only during startup wiring");
        if publishers.contains_key(&topic) {
            let msg = format!("topic {:?} already has a registered publisher", topic);
            if cfg!(debug_assertions) {
                panic!("{msg}");
            }
            return Err(crate::OrchestratorError::Internal(msg));
        }
        publishers.insert(topic, ());
        Ok(())
    }

    /// Publish an event. Delivery to each subscriber's queue is
    /// synchronous from the caller's perspective; handler execution is
    /// not awaited here.
    pub async fn publish(&self, event: Event) {
        tracing::info!(
            job_id = %event.job_id,
            topic = event.topic.as_str(),
            "publishing event"
        );

        let subs = self.subscribers.lock().await;
        if let Some(subscriptions) = subs.get(&event.topic) {
            for sub in subscriptions {
                if sub.tx.send(event.clone()).is_err() {
                    tracing::warn!(
                        job_id = %event.job_id,
                        topic = event.topic.as_str(),
                        "subscriber queue closed, dropping event"
                    );
                }
            }
        }
    }
}
