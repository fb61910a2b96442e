use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    constants::grading_prompt::ESSAY_GRADING_PROMPT,
    errors::{AppError, AppResult},
    models::domain::EssayGrade,
};

#[derive(Clone, Debug)]
pub struct GradeEssayInput {
    pub answer_text: String,
    pub question_text: String,
    pub subject_name: String,
}

/// The external AI grading collaborator. `finish` fans out one `grade`
/// call per attempt; implementations must tolerate concurrent calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EssayGrader: Send + Sync {
    async fn grade(&self, input: GradeEssayInput) -> AppResult<EssayGrade>;
}

pub struct OpenAiEssayGrader {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiEssayGrader {
    pub fn new(api_key: &SecretString, model: &str, timeout: Duration) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            timeout,
        }
    }

    /// Models occasionally wrap JSON in markdown fences despite the
    /// response-format instruction.
    fn strip_fences(content: &str) -> &str {
        let trimmed = content.trim();
        let trimmed = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
    }

    fn parse_grade(content: &str, tokens_used: i64) -> AppResult<EssayGrade> {
        let mut grade: EssayGrade = serde_json::from_str(Self::strip_fences(content))
            .map_err(|e| AppError::Upstream(format!("Grader returned malformed JSON: {}", e)))?;

        if !(0..=100).contains(&grade.score) {
            return Err(AppError::Upstream(format!(
                "Grader returned out-of-range score {}",
                grade.score
            )));
        }

        grade.tokens_used = tokens_used;
        Ok(grade)
    }
}

#[async_trait]
impl EssayGrader for OpenAiEssayGrader {
    async fn grade(&self, input: GradeEssayInput) -> AppResult<EssayGrade> {
        let user_content = format!(
            "Subject: {}\n\nQuestion:\n{}\n\nCandidate's answer:\n{}",
            input.subject_name, input.question_text, input.answer_text
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .response_format(ResponseFormat::JsonObject)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(ESSAY_GRADING_PROMPT)
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_content)
                    .build()
                    .map_err(|e| AppError::InternalError(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::Upstream("Grading call timed out".to_string()))?
            .map_err(|e| AppError::Upstream(format!("Grading call failed: {}", e)))?;

        let tokens_used = response
            .usage
            .as_ref()
            .map(|u| i64::from(u.total_tokens))
            .unwrap_or(0);

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Upstream("Grader returned an empty response".to_string()))?;

        Self::parse_grade(&content, tokens_used)
    }
}
