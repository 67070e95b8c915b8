//! The six pipeline agents: concept analysis, prerequisite exploration,
//! math enrichment, visual design, narrative composition, and code
//! generation. Each subscribes to exactly one topic and publishes
//! exactly one topic downstream, threading a [`crate::job::JobContext`]
//! forward so no stage needs to consult the job store.

pub mod code_generator;
pub mod concept_analyzer;
pub mod math_enricher;
pub mod narrative_composer;
pub mod prerequisite_explorer;
pub mod visual_designer;

pub use code_generator::CodeGenerator;
pub use concept_analyzer::ConceptAnalyzer;
pub use math_enricher::MathEnricher;
pub use narrative_composer::NarrativeComposer;
pub use prerequisite_explorer::PrerequisiteExplorer;
pub use visual_designer::VisualDesigner;

use crate::events::{EventBus, Topic};
use crate::providers::{FallbackChain, Router};
use std::sync::Arc;

/// Register every pipeline agent as both publisher and subscriber on its
/// respective topics. Called once during server startup; a second call
/// panics in debug builds via [`EventBus::register_publisher`].
pub async fn register_pipeline(event_bus: &Arc<EventBus>, router: &Arc<Router>, chain: &Arc<FallbackChain>) -> crate::Result<()> {
    event_bus.register_publisher(Topic::ConceptAnalyzed)?;
    event_bus.register_publisher(Topic::PrerequisitesResolved)?;
    event_bus.register_publisher(Topic::MathEnriched)?;
    event_bus.register_publisher(Topic::VisualDesigned)?;
    event_bus.register_publisher(Topic::NarrativeComposed)?;
    event_bus.register_publisher(Topic::CodeGenerated)?;

    event_bus
        .subscribe(
            Topic::ConceptSubmitted,
            Arc::new(ConceptAnalyzer::new(Arc::clone(event_bus), Arc::clone(router), Arc::clone(chain))),
        )
        .await;
    event_bus
        .subscribe(
            Topic::ConceptAnalyzed,
            Arc::new(PrerequisiteExplorer::new(Arc::clone(event_bus), Arc::clone(router), Arc::clone(chain))),
        )
        .await;
    event_bus
        .subscribe(
            Topic::PrerequisitesResolved,
            Arc::new(MathEnricher::new(Arc::clone(event_bus), Arc::clone(router), Arc::clone(chain))),
        )
        .await;
    event_bus
        .subscribe(Topic::MathEnriched, Arc::new(VisualDesigner::new(Arc::clone(event_bus))))
        .await;
    event_bus
        .subscribe(Topic::VisualDesigned, Arc::new(NarrativeComposer::new(Arc::clone(event_bus))))
        .await;
    event_bus
        .subscribe(
            Topic::NarrativeComposed,
            Arc::new(CodeGenerator::new(Arc::clone(event_bus), Arc::clone(router), Arc::clone(chain))),
        )
        .await;

    Ok(())
}
