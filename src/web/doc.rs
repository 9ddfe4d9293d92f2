use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;
use crate::web::routes::{options, questions, section, user, user_answers, user_progress};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        user::user_register_handler,
        user::user_login_handler,
        user::user_login_admin_handler,
        user::user_logout_handler,
        user::user_verify_handler,
        user::user_create_handler,
        user::user_all_handler,
        user::user_list_handler,
        user::user_get_handler,
        user::user_update_handler,
        user::user_delete_handler,
        section::section_list_handler,
        section::section_by_title_handler,
        section::section_get_handler,
        section::section_create_handler,
        section::section_update_handler,
        section::section_delete_handler,
        questions::question_create_handler,
        questions::question_list_handler,
        questions::question_get_handler,
        questions::question_by_section_handler,
        questions::question_update_handler,
        questions::question_delete_handler,
        options::option_list_handler,
        options::option_create_handler,
        options::option_by_question_handler,
        options::option_get_handler,
        options::option_patch_handler,
        options::option_delete_handler,
        user_answers::answer_submit_handler,
        user_answers::answer_list_handler,
        user_answers::answer_get_handler,
        user_answers::answer_by_user_handler,
        user_answers::answer_patch_handler,
        user_answers::answer_delete_handler,
        user_progress::progress_create_handler,
        user_progress::progress_update_handler,
        user_progress::progress_calculate_handler,
        user_progress::progress_overall_handler,
        user_progress::progress_filter_handler,
        user_progress::progress_get_handler,
        user_progress::progress_all_handler,
        user_progress::progress_completed_handler,
        user_progress::progress_reset_handler,
        user_progress::progress_delete_handler,
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;
