use crate::impl_paginatable_for;
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
pub struct QuestionOption {
    id: Uuid,
    question_id: Uuid,
    text: String,
    is_correct: bool,
    created_at: DateTime<Utc>,
}

/// `question_id` is only read on create; an option never moves between questions.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct QuestionOptionCreateUpdate {
    pub question_id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

impl ResourceTyped for QuestionOption {
    fn get_resource_type() -> ResourceType {
        ResourceType::QuestionOption
    }
}

impl QuestionOption {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn question_id(&self) -> Uuid {
        self.question_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[async_trait]
impl CrudRepository<QuestionOption, QuestionOptionCreateUpdate, Uuid> for QuestionOption {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionOptionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        lock_question(&mut tx, data.question_id).await?;

        if data.is_correct {
            clear_correct(&mut tx, data.question_id, None).await?;
        }
        let created =
            Self::insert_in(&mut tx, data.question_id, &data.text, data.is_correct).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: QuestionOptionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        lock_question(&mut tx, self.question_id).await?;

        if data.is_correct {
            clear_correct(&mut tx, self.question_id, Some(self.id)).await?;
        } else if count_other_correct(&mut tx, self.question_id, self.id).await? == 0 {
            return Err(DatabaseError::invariant(
                ResourceType::QuestionOption,
                "cannot unmark the only correct option of a question",
            ));
        }

        let updated = Self::update_in(&mut tx, self.id, &data.text, data.is_correct).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        let mut tx = mm.begin().await?;
        lock_question(&mut tx, self.question_id).await?;

        if self.is_correct && count_other_correct(&mut tx, self.question_id, self.id).await? == 0 {
            return Err(DatabaseError::invariant(
                ResourceType::QuestionOption,
                "cannot delete the only correct option of a question",
            ));
        }

        sqlx::query("DELETE FROM options WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM options WHERE id = $1")
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
        let result = sqlx::query_as(
            "SELECT * FROM options ORDER BY question_id, created_at LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM options")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(QuestionOption, QuestionOptionCreateUpdate, Uuid);

// Utils

impl QuestionOption {
    pub async fn all(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM options ORDER BY question_id, created_at")
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_all_by_question(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        question_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let mut conn = mm.executor().acquire().await?;
        Self::find_all_by_question_in(&mut conn, question_id).await
    }

    pub(crate) async fn find_all_by_question_in(
        conn: &mut PgConnection,
        question_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            "SELECT * FROM options WHERE question_id = $1 ORDER BY created_at, id",
        )
        .bind(question_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// The option currently flagged correct for `question_id`, if any.
    pub(crate) async fn find_correct_in(
        conn: &mut PgConnection,
        question_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let row = sqlx::query_as(
            r#"
            SELECT * FROM options
            WHERE question_id = $1 AND is_correct = TRUE
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(question_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    pub(crate) async fn insert_in(
        conn: &mut PgConnection,
        question_id: Uuid,
        text: &str,
        is_correct: bool,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO options (id, question_id, text, is_correct)
            VALUES ($1,$2,$3,$4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(question_id)
        .bind(text)
        .bind(is_correct)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub(crate) async fn update_in(
        conn: &mut PgConnection,
        id: Uuid,
        text: &str,
        is_correct: bool,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            "UPDATE options SET text = $1, is_correct = $2 WHERE id = $3 RETURNING *",
        )
        .bind(text)
        .bind(is_correct)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }
}

/// Row lock on the owning question; serialises option writes per question.
pub(crate) async fn lock_question(
    conn: &mut PgConnection,
    question_id: Uuid,
) -> DatabaseResult<()> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM questions WHERE id = $1 FOR UPDATE")
            .bind(question_id)
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DatabaseError::NotFound(ResourceType::Question)),
    }
}

async fn clear_correct(
    conn: &mut PgConnection,
    question_id: Uuid,
    except: Option<Uuid>,
) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        UPDATE options SET is_correct = FALSE
        WHERE question_id = $1 AND is_correct = TRUE AND ($2::uuid IS NULL OR id <> $2)
        "#,
    )
    .bind(question_id)
    .bind(except)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn count_other_correct(
    conn: &mut PgConnection,
    question_id: Uuid,
    except: Uuid,
) -> DatabaseResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM options WHERE question_id = $1 AND is_correct = TRUE AND id <> $2",
    )
    .bind(question_id)
    .bind(except)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}
