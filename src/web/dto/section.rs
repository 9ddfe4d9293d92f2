use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    model::{
        DatabaseResult,
        entity::{QuestionWithOptionsRow, Section, SectionCreateUpdate},
    },
    web::dto::question::QuestionWithOptions,
};

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct SectionCreateBody {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(url)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub section_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl From<SectionCreateBody> for SectionCreateUpdate {
    fn from(value: SectionCreateBody) -> Self {
        Self {
            title: value.title,
            description: value.description,
            video_url: value.video_url.unwrap_or_default(),
            section_order: value.section_order,
            is_active: value.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct SectionUpdateBody {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    pub section_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl SectionUpdateBody {
    /// Applies the present fields on top of `current`.
    pub fn merge(self, current: &Section) -> SectionCreateUpdate {
        SectionCreateUpdate {
            title: self.title.unwrap_or_else(|| current.title().to_string()),
            description: self
                .description
                .unwrap_or_else(|| current.description().to_string()),
            video_url: self
                .video_url
                .unwrap_or_else(|| current.video_url().to_string()),
            section_order: self.section_order.unwrap_or(current.section_order()),
            is_active: self.is_active.unwrap_or(current.is_active()),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TitleQuery {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SectionWithQuestions {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub section_order: i32,
    pub is_active: bool,
    pub questions: Vec<QuestionWithOptions>,
}

impl SectionWithQuestions {
    /// Nests `rows` under their sections, keeping the order of `sections`.
    pub fn assemble(
        sections: Vec<Section>,
        rows: Vec<QuestionWithOptionsRow>,
        reveal: bool,
    ) -> DatabaseResult<Vec<Self>> {
        let mut questions = QuestionWithOptions::from_rows(rows, reveal)?;

        Ok(sections
            .into_iter()
            .map(|section| {
                let (own, rest): (Vec<_>, Vec<_>) = questions
                    .drain(..)
                    .partition(|q| q.section_id == section.id());
                questions = rest;

                Self {
                    id: section.id(),
                    title: section.title().to_string(),
                    description: section.description().to_string(),
                    video_url: section.video_url().to_string(),
                    section_order: section.section_order(),
                    is_active: section.is_active(),
                    questions: own,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_body_rules() {
        let body: SectionCreateBody = serde_json::from_value(serde_json::json!({
            "title": "Dengue Basics",
            "description": "What dengue is and how it spreads",
        }))
        .unwrap();
        assert!(body.validate().is_ok());
        assert!(body.is_active);
        assert_eq!(body.section_order, 0);

        let data = SectionCreateUpdate::from(body);
        assert_eq!(data.video_url, "");

        let body: SectionCreateBody = serde_json::from_value(serde_json::json!({
            "title": "",
            "description": "",
            "video_url": "not a url",
        }))
        .unwrap();
        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("description"));
        assert!(fields.contains_key("video_url"));
    }
}
