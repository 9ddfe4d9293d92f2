use std::collections::HashSet;

use crate::impl_paginatable_for;
use crate::model::entity::QuestionOption;
use crate::model::entity::option::lock_question;
use crate::model::grading::{ensure_distinct_options, ensure_single_correct};
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
pub struct Question {
    id: Uuid,
    section_id: Uuid,
    question: String,
    created_at: DateTime<Utc>,
}

/// An option as submitted together with its question. Drafts carrying an `id`
/// update that option, drafts without one create a new option.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct OptionDraft {
    pub id: Option<Uuid>,
    pub text: String,
    pub is_correct: bool,
}

/// `options: None` on update keeps the current option set.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionCreateUpdate {
    pub section_id: Uuid,
    pub question: String,
    pub options: Option<Vec<OptionDraft>>,
}

impl ResourceTyped for Question {
    fn get_resource_type() -> ResourceType {
        ResourceType::Question
    }
}

impl Question {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn section_id(&self) -> Uuid {
        self.section_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[async_trait]
impl CrudRepository<Question, QuestionCreateUpdate, Uuid> for Question {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let options = data.options.unwrap_or_default();
        ensure_single_correct(options.iter().map(|o| o.is_correct))?;

        let mut tx = mm.begin().await?;
        ensure_section_exists(&mut tx, data.section_id).await?;

        let created: Self = sqlx::query_as(
            r#"
            INSERT INTO questions (id, section_id, question)
            VALUES ($1,$2,$3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.section_id)
        .bind(&data.question)
        .fetch_one(&mut *tx)
        .await?;

        for option in &options {
            QuestionOption::insert_in(&mut tx, created.id, &option.text, option.is_correct).await?;
        }

        tx.commit().await?;
        tracing::debug!("question {} created with {} options", created.id, options.len());
        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        lock_question(&mut tx, self.id).await?;

        if data.section_id != self.section_id {
            ensure_section_exists(&mut tx, data.section_id).await?;
        }

        let updated: Self = sqlx::query_as(
            "UPDATE questions SET section_id = $1, question = $2 WHERE id = $3 RETURNING *",
        )
        .bind(data.section_id)
        .bind(&data.question)
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(options) = data.options {
            replace_options_in(&mut tx, self.id, &options).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        // options and answers go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = $1")
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
            sqlx::query_as("SELECT * FROM questions ORDER BY created_at LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Question, QuestionCreateUpdate, Uuid);

impl Question {
    pub(crate) async fn find_by_id_in(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(result)
    }
}

async fn ensure_section_exists(conn: &mut PgConnection, section_id: Uuid) -> DatabaseResult<()> {
    let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM sections WHERE id = $1")
        .bind(section_id)
        .fetch_optional(&mut *conn)
        .await?;

    found
        .map(|_| ())
        .ok_or(DatabaseError::NotFound(ResourceType::Section))
}

/// Makes the question's options match `drafts` exactly: listed ids are
/// updated, new drafts inserted and everything else removed.
async fn replace_options_in(
    conn: &mut PgConnection,
    question_id: Uuid,
    drafts: &[OptionDraft],
) -> DatabaseResult<()> {
    ensure_single_correct(drafts.iter().map(|d| d.is_correct))?;

    let existing: HashSet<Uuid> = QuestionOption::find_all_by_question_in(conn, question_id)
        .await?
        .iter()
        .map(QuestionOption::id)
        .collect();

    let kept: Vec<Uuid> = drafts.iter().filter_map(|d| d.id).collect();
    ensure_distinct_options(&kept)?;
    if kept.iter().any(|id| !existing.contains(id)) {
        return Err(DatabaseError::NotFound(ResourceType::QuestionOption));
    }

    sqlx::query("DELETE FROM options WHERE question_id = $1 AND NOT (id = ANY($2))")
        .bind(question_id)
        .bind(&kept)
        .execute(&mut *conn)
        .await?;

    for draft in drafts {
        match draft.id {
            Some(id) => {
                QuestionOption::update_in(conn, id, &draft.text, draft.is_correct).await?;
            }
            None => {
                QuestionOption::insert_in(conn, question_id, &draft.text, draft.is_correct).await?;
            }
        }
    }

    Ok(())
}

// Utils

#[derive(Debug, sqlx::FromRow)]
pub struct QuestionWithOptionsRow {
    pub id: Uuid,
    pub section_id: Uuid,
    pub question: String,
    pub options: serde_json::Value,
}

impl QuestionWithOptionsRow {
    async fn fetch(
        mm: &ModelManager,
        question_id: Option<Uuid>,
        section_ids: Option<&[Uuid]>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT
            q.id,
            q.section_id,
            q.question,
            COALESCE(
                json_agg(
                    json_build_object(
                        'id', o.id,
                        'question_id', o.question_id,
                        'text', o.text,
                        'is_correct', o.is_correct
                    )
                    ORDER BY o.created_at, o.id
                ) FILTER (WHERE o.id IS NOT NULL),
                '[]'
            ) AS options
            FROM questions q
            LEFT JOIN options o ON o.question_id = q.id
            WHERE ($1::uuid IS NULL OR q.id = $1)
            AND ($2::uuid[] IS NULL OR q.section_id = ANY($2))
            GROUP BY q.id
            ORDER BY q.created_at, q.id
            "#,
        )
        .bind(question_id)
        .bind(section_ids)
        .fetch_all(mm.executor())
        .await?;

        Ok(rows)
    }

    pub async fn fetch_all(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        Self::fetch(mm, None, None).await
    }

    pub async fn fetch_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        Ok(Self::fetch(mm, Some(id), None).await?.into_iter().next())
    }

    pub async fn fetch_by_sections(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        section_ids: &[Uuid],
    ) -> DatabaseResult<Vec<Self>> {
        Self::fetch(mm, None, Some(section_ids)).await
    }
}
