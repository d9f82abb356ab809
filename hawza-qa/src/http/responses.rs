use serde::{Deserialize, Serialize};

use crate::questions::Question;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuestionRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

impl MessageResponse {
    pub fn ok(message: &'static str) -> Self {
        Self {
            success: true,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub question: Question,
}

impl QuestionResponse {
    pub fn ok(question: Question) -> Self {
        Self {
            success: true,
            question,
        }
    }
}
