use crate::impl_paginatable_for;
use crate::model::ResourceType;
use crate::model::access::HasOwner;
use crate::model::progress::{ProgressState, SectionCounts, mean};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct UserProgress {
    id: Uuid,
    user_id: Uuid,
    section_id: Uuid,
    progress: f64,
    is_completed: bool,
    completion_date: Option<DateTime<Utc>>,
}

impl ResourceTyped for UserProgress {
    fn get_resource_type() -> ResourceType {
        ResourceType::UserProgress
    }
}

impl UserProgress {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn section_id(&self) -> Uuid {
        self.section_id
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.completion_date
    }

    pub fn state(&self) -> ProgressState {
        ProgressState {
            progress: self.progress,
            is_completed: self.is_completed,
            completion_date: self.completion_date,
        }
    }
}

pub struct UserProgressCreateUpdate {
    pub user_id: Uuid,
    pub section_id: Uuid,
    pub state: ProgressState,
}

impl UserProgressCreateUpdate {
    pub fn new(user_id: Uuid, section_id: Uuid) -> Self {
        Self {
            user_id,
            section_id,
            state: ProgressState::reset(),
        }
    }
}

#[async_trait]
impl CrudRepository<UserProgress, UserProgressCreateUpdate, Uuid> for UserProgress {
    /// Returns the existing row for `(user_id, section_id)` untouched if there
    /// is one, so creating twice is harmless.
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserProgressCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut conn = mm.executor().acquire().await?;
        Self::get_or_create_in(&mut conn, data.user_id, data.section_id, data.state).await
    }

    /// Overwrites the stored state. The `(user, section)` pair of a row is fixed.
    async fn update(
        self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: UserProgressCreateUpdate,
    ) -> DatabaseResult<Self> {
        let mut conn = mm.executor().acquire().await?;
        Self::write_state_in(&mut conn, self.id, data.state).await
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM user_progress WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM user_progress WHERE id = $1")
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
            "SELECT * FROM user_progress ORDER BY user_id, section_id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_progress")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(UserProgress, UserProgressCreateUpdate, Uuid);

#[async_trait]
impl HasOwner for UserProgress {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}

// Progress computation

impl UserProgress {
    /// Upserts the row for the pair. The upsert takes a row lock that is held
    /// until the surrounding transaction ends, so writers of the same pair
    /// queue up behind each other.
    pub(crate) async fn get_or_create_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        section_id: Uuid,
        state: ProgressState,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            INSERT INTO user_progress
            (id, user_id, section_id, progress, is_completed, completion_date)
            VALUES ($1,$2,$3,$4,$5,$6)
            ON CONFLICT (user_id, section_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(section_id)
        .bind(state.progress)
        .bind(state.is_completed)
        .bind(state.completion_date)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    async fn write_state_in(
        conn: &mut PgConnection,
        id: Uuid,
        state: ProgressState,
    ) -> DatabaseResult<Self> {
        let row = sqlx::query_as(
            r#"
            UPDATE user_progress
            SET progress = $1, is_completed = $2, completion_date = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(state.progress)
        .bind(state.is_completed)
        .bind(state.completion_date)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(row)
    }

    pub(crate) async fn counts_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        section_id: Uuid,
    ) -> DatabaseResult<SectionCounts> {
        let counts = sqlx::query_as(
            r#"
            SELECT
            (SELECT COUNT(*) FROM questions WHERE section_id = $2) AS total,
            COUNT(DISTINCT ua.question_id) AS answered,
            COUNT(DISTINCT ua.question_id) FILTER (WHERE ua.is_correct) AS correct
            FROM user_answers ua
            JOIN questions q ON q.id = ua.question_id
            WHERE ua.user_id = $1 AND q.section_id = $2
            "#,
        )
        .bind(user_id)
        .bind(section_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(counts)
    }

    /// Refreshes the stored progress of `(user_id, section_id)` from fresh
    /// answer counts, creating the row on first use.
    #[tracing::instrument(skip(conn))]
    pub(crate) async fn recompute_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        section_id: Uuid,
    ) -> DatabaseResult<Self> {
        let row = Self::get_or_create_in(conn, user_id, section_id, ProgressState::reset()).await?;
        let counts = Self::counts_in(conn, user_id, section_id).await?;

        let current = row.state();
        let next = current.recomputed(counts, Utc::now());
        if next == current {
            return Ok(row);
        }

        if next.is_completed && !current.is_completed {
            tracing::info!("user {} completed section {}", user_id, section_id);
        }
        tracing::debug!(
            "progress {:.2} -> {:.2} ({}/{} correct, {} answered)",
            current.progress,
            next.progress,
            counts.correct,
            counts.total,
            counts.answered
        );

        Self::write_state_in(conn, row.id, next).await
    }

    pub async fn recompute(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
        section_id: Uuid,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.begin().await?;
        let row = Self::recompute_in(&mut tx, user_id, section_id).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Percentage of the section's questions the user answered correctly.
    /// Reads only, the stored row is left alone.
    pub async fn section_progress(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
        section_id: Uuid,
    ) -> DatabaseResult<f64> {
        let mut conn = mm.executor().acquire().await?;
        let counts = Self::counts_in(&mut conn, user_id, section_id).await?;
        Ok(counts.percentage())
    }

    /// Mean of the fresh section percentages over every section the user has
    /// a progress row for. The stored `progress` values are not consulted.
    pub async fn overall(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<f64> {
        let rows = Self::find_all_by_user(mm, actor, user_id).await?;

        let mut percentages = Vec::with_capacity(rows.len());
        for row in &rows {
            percentages.push(Self::section_progress(mm, actor, user_id, row.section_id).await?);
        }

        Ok(mean(&percentages))
    }

    /// Back to a zeroed, not completed state. Answers are kept.
    pub async fn reset(self, mm: &ModelManager, actor: &AuthenticatedUser) -> DatabaseResult<Self> {
        let data = UserProgressCreateUpdate::new(self.user_id, self.section_id);
        tracing::info!(
            "resetting progress of user {} in section {}",
            self.user_id,
            self.section_id
        );
        self.update(mm, actor, data).await
    }
}

// Utils

impl UserProgress {
    pub async fn find_by_user_and_section(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
        section_id: Uuid,
    ) -> DatabaseResult<Option<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM user_progress WHERE user_id = $1 AND section_id = $2")
                .bind(user_id)
                .bind(section_id)
                .fetch_optional(mm.executor())
                .await?;
        Ok(result)
    }

    pub async fn find_all_by_user(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT up.*
            FROM user_progress up
            JOIN sections s ON s.id = up.section_id
            WHERE up.user_id = $1
            ORDER BY s.section_order, s.title
            "#,
        )
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    pub async fn find_completed_by_user(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT up.*
            FROM user_progress up
            JOIN sections s ON s.id = up.section_id
            WHERE up.user_id = $1 AND up.is_completed = TRUE
            ORDER BY s.section_order, s.title
            "#,
        )
        .bind(user_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }

    /// Rows matching every filter given; no filters lists everything.
    pub async fn filter(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        user_id: Option<Uuid>,
        section_id: Option<Uuid>,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r#"
            SELECT * FROM user_progress
            WHERE ($1::uuid IS NULL OR user_id = $1)
            AND ($2::uuid IS NULL OR section_id = $2)
            ORDER BY user_id, section_id
            "#,
        )
        .bind(user_id)
        .bind(section_id)
        .fetch_all(mm.executor())
        .await?;
        Ok(rows)
    }
}
