use crate::job::{JobResult, Quality};
use serde::Serialize;

/// Response of `GET /api/jobs/:id`: pending jobs report `generating`,
/// everything else mirrors the stored [`JobResult`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobStatusResponse {
    Generating,
    Completed {
        #[serde(rename = "videoUrl")]
        video_url: String,
        code: String,
        #[serde(rename = "usedAI")]
        used_ai: bool,
        quality: Quality,
        #[serde(rename = "generationType")]
        generation_type: String,
    },
    Failed {
        error: String,
        details: Option<String>,
    },
}

impl From<Option<JobResult>> for JobStatusResponse {
    fn from(result: Option<JobResult>) -> Self {
        match result {
            None => JobStatusResponse::Generating,
            Some(JobResult::Completed { video_url, code, used_ai, quality, generation_type }) => {
                JobStatusResponse::Completed { video_url, code, used_ai, quality, generation_type }
            }
            Some(JobResult::Failed { error, details }) => JobStatusResponse::Failed { error, details },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_job_reports_generating() {
        let response: JobStatusResponse = None.into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "generating");
    }

    #[test]
    fn completed_job_carries_video_url() {
        let result = JobResult::Completed {
            video_url: "/media/videos/scene/720p30/MainScene.mp4".to_string(),
            code: "class MainScene: pass".to_string(),
            used_ai: true,
            quality: Quality::Medium,
            generation_type: "ai".to_string(),
        };
        let response: JobStatusResponse = Some(result).into();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["videoUrl"], "/media/videos/scene/720p30/MainScene.mp4");
    }
}
