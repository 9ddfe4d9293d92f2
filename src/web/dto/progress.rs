use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ProgressCreateBody {
    pub user_id: Uuid,
    pub section_id: Uuid,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProgressQuery {
    pub user_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProgressValue {
    pub progress: f64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OverallProgress {
    pub overall_progress: f64,
}
