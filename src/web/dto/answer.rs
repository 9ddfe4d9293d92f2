use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::model::entity::{UserAnswer, UserAnswerCreateUpdate};

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AnswerCreateBody {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 500))]
    pub answer_text: String,
    /// Admins may submit on behalf of another user. Defaults to the caller.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, utoipa::ToSchema)]
pub struct AnswerPatchBody {
    pub question_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500))]
    pub answer_text: Option<String>,
}

impl AnswerPatchBody {
    pub fn merge(self, current: &UserAnswer) -> UserAnswerCreateUpdate {
        UserAnswerCreateUpdate {
            user_id: current.user_id(),
            question_id: self.question_id.unwrap_or(current.question_id()),
            answer_text: self
                .answer_text
                .unwrap_or_else(|| current.answer_text().to_string()),
        }
    }
}
