use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::model::{
    DatabaseResult,
    entity::{
        OptionDraft, Question, QuestionCreateUpdate, QuestionOption, QuestionOptionCreateUpdate,
        QuestionWithOptionsRow,
    },
};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct OptionBody {
    /// Id of an existing option to keep; absent for a new option.
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<OptionBody> for OptionDraft {
    fn from(value: OptionBody) -> Self {
        Self {
            id: value.id,
            text: value.text,
            is_correct: value.is_correct,
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct QuestionCreateBody {
    pub section_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub question: String,
    #[validate]
    pub options: Vec<OptionBody>,
}

impl From<QuestionCreateBody> for QuestionCreateUpdate {
    fn from(value: QuestionCreateBody) -> Self {
        Self {
            section_id: value.section_id,
            question: value.question,
            options: Some(value.options.into_iter().map(OptionDraft::from).collect()),
        }
    }
}

/// Fields left out keep their current value; `options`, when given, replaces
/// the whole option set.
#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct QuestionUpdateBody {
    pub section_id: Option<Uuid>,
    #[validate(length(min = 1, max = 255))]
    pub question: Option<String>,
    pub options: Option<Vec<OptionBody>>,
}

impl QuestionUpdateBody {
    /// Runs the field rules of the body and of every listed option.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        for option in self.options.iter().flatten() {
            option.validate()?;
        }
        Ok(())
    }

    pub fn merge(self, current: &Question) -> QuestionCreateUpdate {
        QuestionCreateUpdate {
            section_id: self.section_id.unwrap_or(current.section_id()),
            question: self
                .question
                .unwrap_or_else(|| current.question().to_string()),
            options: self
                .options
                .map(|options| options.into_iter().map(OptionDraft::from).collect()),
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct OptionCreateBody {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl From<OptionCreateBody> for QuestionOptionCreateUpdate {
    fn from(value: OptionCreateBody) -> Self {
        Self {
            question_id: value.question_id,
            text: value.text,
            is_correct: value.is_correct,
        }
    }
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct OptionPatchBody {
    #[validate(length(min = 1, max = 255))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
}

impl OptionPatchBody {
    pub fn merge(self, current: &QuestionOption) -> QuestionOptionCreateUpdate {
        QuestionOptionCreateUpdate {
            question_id: current.question_id(),
            text: self.text.unwrap_or_else(|| current.text().to_string()),
            is_correct: self.is_correct.unwrap_or(current.is_correct()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OptionRow {
    id: Uuid,
    question_id: Uuid,
    text: String,
    is_correct: bool,
}

/// An option as shown to clients. `is_correct` is only present for admins.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OptionView {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuestionWithOptions {
    pub id: Uuid,
    pub section_id: Uuid,
    pub question: String,
    pub options: Vec<OptionView>,
}

impl QuestionWithOptions {
    pub fn from_row(row: QuestionWithOptionsRow, reveal: bool) -> Result<Self, serde_json::Error> {
        let options: Vec<OptionRow> = serde_json::from_value(row.options)?;

        Ok(Self {
            id: row.id,
            section_id: row.section_id,
            question: row.question,
            options: options
                .into_iter()
                .map(|o| OptionView {
                    id: o.id,
                    question_id: o.question_id,
                    text: o.text,
                    is_correct: reveal.then_some(o.is_correct),
                })
                .collect(),
        })
    }

    pub fn from_rows(rows: Vec<QuestionWithOptionsRow>, reveal: bool) -> DatabaseResult<Vec<Self>> {
        Ok(rows
            .into_iter()
            .map(|row| Self::from_row(row, reveal))
            .collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn row() -> QuestionWithOptionsRow {
        let question_id = Uuid::new_v4();
        QuestionWithOptionsRow {
            id: question_id,
            section_id: Uuid::new_v4(),
            question: "Capital of France?".to_string(),
            options: json!([
                {
                    "id": Uuid::new_v4(),
                    "question_id": question_id,
                    "text": "Paris",
                    "is_correct": true,
                },
                {
                    "id": Uuid::new_v4(),
                    "question_id": question_id,
                    "text": "Lyon",
                    "is_correct": false,
                },
            ]),
        }
    }

    #[test]
    fn correct_flag_hidden_from_learners() {
        let view = QuestionWithOptions::from_row(row(), false).unwrap();
        assert_eq!(view.options.len(), 2);
        assert!(view.options.iter().all(|o| o.is_correct.is_none()));

        let body = serde_json::to_string(&view).unwrap();
        assert!(!body.contains("is_correct"));
    }

    #[test]
    fn correct_flag_shown_to_admins() {
        let view = QuestionWithOptions::from_row(row(), true).unwrap();
        assert_eq!(view.options[0].is_correct, Some(true));
        assert_eq!(view.options[1].is_correct, Some(false));
    }

    #[test]
    fn option_text_is_validated() {
        let body: QuestionCreateBody = serde_json::from_value(json!({
            "section_id": Uuid::new_v4(),
            "question": "Capital of France?",
            "options": [{ "text": "", "is_correct": true }],
        }))
        .unwrap();
        assert!(body.validate().is_err());

        let body: QuestionUpdateBody = serde_json::from_value(json!({
            "options": [{ "text": "", "is_correct": true }],
        }))
        .unwrap();
        assert!(body.validate_all().is_err());
    }
}
