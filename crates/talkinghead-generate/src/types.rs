use serde::{Deserialize, Serialize};

/// Body of `POST /generate/`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRequest {
    /// URL of the source face image
    pub image_link: String,
    /// URL of the driving audio
    pub audio_link: String,
}

/// Successful generation result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateResponse {
    /// Retrieval link for the published video
    pub video_url: String,
}
