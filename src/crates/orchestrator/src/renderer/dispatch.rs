//! Render dispatch: the glue between the pipeline and the renderer
//! subsystem. Subscribes to `code.generated`, selects a renderer variant,
//! invokes it as a child process, and publishes `video.rendered` or
//! `video.failed`.

use crate::events::{Event, Handler, Payload, Topic};
use crate::renderer::{renderer_for, select_renderer, EnvironmentProbe, RenderOptions, RendererKind, SelectionCriteria};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub struct RenderDispatcher {
    event_bus: Arc<crate::events::EventBus>,
    media_dir: PathBuf,
    temp_dir: PathBuf,
    preferred_renderer: Option<RendererKind>,
}

impl RenderDispatcher {
    pub fn new(event_bus: Arc<crate::events::EventBus>, media_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self { event_bus, media_dir, temp_dir, preferred_renderer: None }
    }

    pub fn with_preferred_renderer(mut self, preferred: Option<RendererKind>) -> Self {
        self.preferred_renderer = preferred;
        self
    }
}

#[async_trait]
impl Handler for RenderDispatcher {
    async fn handle(&self, event: Event) {
        let Payload::CodeGenerated { context, code, used_ai, generation_type } = &*event.payload else { return };

        let probe = EnvironmentProbe::get();
        let criteria = SelectionCriteria { preferred_renderer: self.preferred_renderer, ..SelectionCriteria::default() };

        let selection = match select_renderer(&criteria, &probe) {
            Ok(selection) => selection,
            Err(e) => {
                self.fail(&event.job_id, &e.to_string(), None).await;
                return;
            }
        };

        let renderer = renderer_for(selection.renderer);
        let options = RenderOptions {
            job_id: event.job_id.clone(),
            code: code.clone(),
            quality: context.quality,
            temp_dir: self.temp_dir.clone(),
            media_dir: self.media_dir.clone(),
        };

        let timeout = context.quality.render_timeout();
        let rendered = match tokio::time::timeout(timeout, renderer.render(&options)).await {
            Ok(result) => result,
            Err(_) => {
                self.fail(
                    &event.job_id,
                    &format!("renderer timed out after {}s", timeout.as_secs()),
                    Some(selection.reason),
                )
                .await;
                return;
            }
        };

        match rendered {
            Ok(result) => {
                let video_url = format!(
                    "/media/{}",
                    result
                        .video_path
                        .strip_prefix(&self.media_dir)
                        .unwrap_or(&result.video_path)
                        .display()
                );
                self.event_bus
                    .publish(Event::new(
                        Topic::VideoRendered,
                        event.job_id.clone(),
                        Payload::VideoRendered {
                            video_url,
                            code: code.clone(),
                            used_ai: *used_ai,
                            quality: context.quality,
                            generation_type: generation_type.clone(),
                        },
                    ))
                    .await;
            }
            Err(e) => {
                self.fail(&event.job_id, &e.to_string(), Some(selection.reason)).await;
            }
        }
    }
}

impl RenderDispatcher {
    async fn fail(&self, job_id: &str, error: &str, details: Option<String>) {
        tracing::error!(job_id, error, "render dispatch failed");
        self.event_bus
            .publish(Event::new(
                Topic::VideoFailed,
                job_id.to_string(),
                Payload::VideoFailed { error: error.to_string(), details },
            ))
            .await;
    }
}
