use crate::impl_paginatable_for;
use crate::model::ResourceType;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult, repo::CrudRepository};
use crate::web::AuthenticatedUser;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Section {
    id: Uuid,
    title: String,
    description: String,
    video_url: String,
    section_order: i32,
    is_active: bool,
}

#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SectionCreateUpdate {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub section_order: i32,
    pub is_active: bool,
}

impl ResourceTyped for Section {
    fn get_resource_type() -> ResourceType {
        ResourceType::Section
    }
}

impl Section {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn video_url(&self) -> &str {
        &self.video_url
    }

    pub fn section_order(&self) -> i32 {
        self.section_order
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[async_trait]
impl CrudRepository<Section, SectionCreateUpdate, Uuid> for Section {
    async fn create(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SectionCreateUpdate,
    ) -> DatabaseResult<Self> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO sections (id, title, description, video_url, section_order, is_active)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.video_url)
        .bind(data.section_order)
        .bind(data.is_active)
        .fetch_one(mm.executor())
        .await?;

        Ok(created)
    }

    async fn update(
        mut self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        data: SectionCreateUpdate,
    ) -> DatabaseResult<Self> {
        sqlx::query(
            r#"
            UPDATE sections
            SET title = $1, description = $2, video_url = $3, section_order = $4, is_active = $5
            WHERE id = $6
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.video_url)
        .bind(data.section_order)
        .bind(data.is_active)
        .bind(self.id)
        .execute(mm.executor())
        .await?;

        self.title = data.title;
        self.description = data.description;
        self.video_url = data.video_url;
        self.section_order = data.section_order;
        self.is_active = data.is_active;
        Ok(self)
    }

    async fn delete(self, mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM sections WHERE id = $1")
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
        let result = sqlx::query_as("SELECT * FROM sections WHERE id = $1")
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
            "SELECT * FROM sections ORDER BY section_order, title LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;
        Ok(result)
    }

    async fn count(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<i64> {
        let result: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sections")
            .fetch_one(mm.executor())
            .await?;

        Ok(result)
    }
}

impl_paginatable_for!(Section, SectionCreateUpdate, Uuid);

impl Section {
    pub async fn all(mm: &ModelManager, _actor: &AuthenticatedUser) -> DatabaseResult<Vec<Self>> {
        let result = sqlx::query_as("SELECT * FROM sections ORDER BY section_order, title")
            .fetch_all(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn find_by_title(
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
        title: &str,
    ) -> DatabaseResult<Vec<Self>> {
        let result =
            sqlx::query_as("SELECT * FROM sections WHERE title = $1 ORDER BY section_order")
                .bind(title)
                .fetch_all(mm.executor())
                .await?;
        Ok(result)
    }
}
