use crate::impl_paginatable_for;
use crate::model::access::HasOwner;
use crate::model::entity::{Question, QuestionOption, UserProgress};
use crate::model::grading::grade;
use crate::model::progress::ProgressState;
use crate::model::repo::ResourceTyped;
use crate::model::{DatabaseError, ResourceType};
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserAnswer {
    id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
    answer_text: String,
    is_correct: bool,
    /// The option that was correct when the answer was graded.
    correct_option_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserAnswerCreateUpdate {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
}

impl ResourceTyped for UserAnswer {
    fn get_resource_type() -> ResourceType {
        ResourceType::UserAnswer
    }
}

impl UserAnswer {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn answer_text(&self) -> &str {
        &self.answer_text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn correct_option_id(&self) -> Option<Uuid> {
        self.correct_option_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result of grading a submission against the question's current correct option.
struct Graded {
    section_id: Uuid,
    correct_option_id: Uuid,
    is_correct: bool,
}

async fn grade_in(
    conn: &mut PgConnection,
    question_id: Uuid,
    answer_text: &str,
) -> DatabaseResult<Graded> {
    let question = Question::find_by_id_in(conn, question_id)
        .await?
        .ok_or(DatabaseError::NotFound(ResourceType::Question))?;

    let correct = QuestionOption::find_correct_in(conn, question.id())
        .await?
        .ok_or(DatabaseError::NotFound(ResourceType::QuestionOption))?;

    Ok(Graded {
        section_id: question.section_id(),
        correct_option_id: correct.id(),
        is_correct: grade(answer_text, correct.text()),
    })
}

#[async_trait]
impl CrudRepository<UserAnswer, UserAnswerCreateUpdate, Uuid> for UserAnswer {
    /// Grades the submission, stores it and refreshes the user's progress in
    /// the question's section. Either all of it happens or none of it.
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserAnswerCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        let graded = grade_in(&mut tx, data.question_id, &data.answer_text).await?;

        // Taken before the insert so submissions of the same pair serialize.
        UserProgress::get_or_create_in(
            &mut tx,
            data.user_id,
            graded.section_id,
            ProgressState::reset(),
        )
        .await?;

        let created: Self = sqlx::query_as(
            r#"
            INSERT INTO user_answers
            (id, user_id, question_id, answer_text, is_correct, correct_option_id)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.user_id)
        .bind(data.question_id)
        .bind(&data.answer_text)
        .bind(graded.is_correct)
        .bind(graded.correct_option_id)
        .fetch_one(&mut *tx)
        .await?;

        UserProgress::recompute_in(&mut tx, data.user_id, graded.section_id).await?;

        tx.commit().await?;
        tracing::debug!(
            "answer {} of user {} to question {} graded, correct: {}",
            created.id,
            created.user_id,
            created.question_id,
            created.is_correct
        );
        Ok(created)
    }

    /// Regrades against the current correct option. Progress is refreshed for
    /// the new `(user, section)` pair and for the old one when it differs.
    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserAnswerCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        let previous_section = Question::find_by_id_in(&mut tx, self.question_id)
            .await?
            .map(|q| q.section_id());
        let graded = grade_in(&mut tx, data.question_id, &data.answer_text).await?;

        let updated: Self = sqlx::query_as(
            r#"
            UPDATE user_answers
            SET user_id = $1, question_id = $2, answer_text = $3,
                is_correct = $4, correct_option_id = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(data.user_id)
        .bind(data.question_id)
        .bind(&data.answer_text)
        .bind(graded.is_correct)
        .bind(graded.correct_option_id)
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;

        UserProgress::recompute_in(&mut tx, data.user_id, graded.section_id).await?;
        if let Some(section_id) = previous_section
            .filter(|s| (*s, self.user_id) != (graded.section_id, data.user_id))
        {
            UserProgress::recompute_in(&mut tx, self.user_id, section_id).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.begin().await?;
        let section_id = Question::find_by_id_in(&mut tx, self.question_id)
            .await?
            .map(|q| q.section_id());

        sqlx::query("DELETE FROM user_answers WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        if let Some(section_id) = section_id {
            UserProgress::recompute_in(&mut tx, self.user_id, section_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM user_answers WHERE id = $1")
            .bind(id)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    async fn list(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM user_answers ORDER BY created_at LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_answers")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserAnswer, UserAnswerCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserAnswer {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

// Utils

impl UserAnswer {
    pub async fn all(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM user_answers ORDER BY created_at")
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_all_by_user(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM user_answers WHERE user_id = $1 ORDER BY created_at")
                .bind(user_id)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }
}
