//! Custom and résumé-generated questions

use crate::db;
use crate::error::PipelineError;
use crate::models::{Question, QuestionKind, Video};
use crate::services::analysis_gateway::AnalysisGateway;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Outcome of saving résumé-generated questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResumeQuestionOutcome {
    pub success: usize,
    pub fail: usize,
    pub total: usize,
}

pub struct QuestionService {
    db: SqlitePool,
    gateway: Arc<dyn AnalysisGateway>,
}

impl QuestionService {
    pub fn new(db: SqlitePool, gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self { db, gateway }
    }

    /// COMMON questions followed by the user's own
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Question>, PipelineError> {
        self.require_user(user_id).await?;
        let mut questions = db::questions::list_visible_to(&self.db, user_id).await?;
        // Stable sort keeps id order within each group
        questions.sort_by_key(|q| q.kind != QuestionKind::Common);
        Ok(questions)
    }

    /// Create a CUSTOM question and its placeholder video in `interview_id`
    pub async fn create_custom(
        &self,
        interview_id: i64,
        owner_id: &str,
        text: &str,
    ) -> Result<(Question, Video), PipelineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::Validation("Question text is empty".to_string()));
        }
        self.require_owned_interview(interview_id, owner_id).await?;

        let question =
            db::questions::insert_question(&self.db, Some(owner_id), QuestionKind::Custom, text)
                .await?;
        let placeholder =
            db::videos::insert_placeholder(&self.db, interview_id, question.question_id).await?;

        tracing::info!(
            interview_id,
            question_id = question.question_id,
            "Created custom question"
        );
        Ok((question, placeholder))
    }

    /// Generate questions from résumé text and attach them to `interview_id`
    ///
    /// One gateway round trip. Individual save failures are counted, not
    /// fatal; an empty generated list is.
    pub async fn generate_from_resume(
        &self,
        interview_id: i64,
        owner_id: &str,
        title: Option<&str>,
        resume_text: &str,
    ) -> Result<ResumeQuestionOutcome, PipelineError> {
        if resume_text.trim().is_empty() {
            return Err(PipelineError::Validation("Résumé text is empty".to_string()));
        }
        self.require_owned_interview(interview_id, owner_id).await?;

        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            db::interviews::update_title(&self.db, interview_id, title).await?;
        }

        let generated = self.gateway.generate_questions(resume_text).await?;
        if generated.is_empty() {
            return Err(PipelineError::Validation(
                "No questions could be generated from the résumé".to_string(),
            ));
        }

        let total = generated.len();
        let mut success = 0;
        for text in generated {
            let text = text.trim();
            if text.is_empty() {
                tracing::warn!(interview_id, "Skipping blank generated question");
                continue;
            }
            let saved = async {
                let question = db::questions::insert_question(
                    &self.db,
                    Some(owner_id),
                    QuestionKind::Resume,
                    text,
                )
                .await?;
                db::videos::insert_placeholder(&self.db, interview_id, question.question_id)
                    .await
            }
            .await;

            match saved {
                Ok(_) => success += 1,
                Err(e) => tracing::warn!(interview_id, error = %e, "Failed to save generated question"),
            }
        }

        tracing::info!(interview_id, success, total, "Saved résumé questions");
        Ok(ResumeQuestionOutcome {
            success,
            fail: total - success,
            total,
        })
    }

    /// Delete a user-owned question; COMMON questions are refused
    pub async fn delete(&self, question_id: i64) -> Result<(), PipelineError> {
        let question = db::questions::require_question(&self.db, question_id).await?;
        if question.kind == QuestionKind::Common {
            return Err(PipelineError::Validation(
                "Common questions cannot be deleted".to_string(),
            ));
        }
        db::questions::delete_question(&self.db, question_id).await?;
        tracing::info!(question_id, "Deleted question");
        Ok(())
    }

    async fn require_user(&self, user_id: &str) -> Result<(), PipelineError> {
        match db::users::find_user(&self.db, user_id).await? {
            Some(_) => Ok(()),
            None => Err(PipelineError::NotFound(format!("User {}", user_id))),
        }
    }

    async fn require_owned_interview(
        &self,
        interview_id: i64,
        owner_id: &str,
    ) -> Result<(), PipelineError> {
        let interview = db::interviews::require_interview(&self.db, interview_id).await?;
        if interview.owner_id != owner_id {
            return Err(PipelineError::Validation(format!(
                "Interview {} does not belong to user {}",
                interview_id, owner_id
            )));
        }
        Ok(())
    }
}
