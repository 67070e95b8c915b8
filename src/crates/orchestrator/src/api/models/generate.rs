use crate::job::{Quality, Style};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub concept: String,
    pub style: Style,
    pub quality: Quality,
    #[serde(default, rename = "useNLU")]
    pub use_nlu: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_body() {
        let body = r#"{"concept": "the pythagorean theorem", "style": "minimalist", "quality": "medium", "useNLU": true}"#;
        let req: GenerateRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.concept, "the pythagorean theorem");
        assert!(req.use_nlu);
    }

    #[test]
    fn use_nlu_defaults_to_false() {
        let body = r#"{"concept": "vectors", "style": "technical", "quality": "low"}"#;
        let req: GenerateRequest = serde_json::from_str(body).unwrap();
        assert!(!req.use_nlu);
    }
}
