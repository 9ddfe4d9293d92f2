mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, PASSWORD, create_question_action, create_section_action, id_of,
    login_admin_action, register_action, setup_server, setup_test_db,
};

/// Id of the option with `text` among the options saved as `options`.
fn option_id(ctx: &FlowContext, text: &str) -> String {
    ctx.get("options")
        .as_array()
        .expect("options are not a list")
        .iter()
        .find(|o| o["text"] == text)
        .and_then(|o| o["id"].as_str())
        .unwrap_or_else(|| panic!("no option `{}`", text))
        .to_string()
}

fn option_path(ctx: &FlowContext, text: &str) -> String {
    format!("/api/v1/question/option/{}", option_id(ctx, text))
}

fn list_options_action() -> Action {
    Action::new("option_by_question", "GET", "dynamic")
        .with_dyn_path(|ctx| {
            format!(
                "/api/v1/question/option/question/{}",
                id_of(ctx, "question")
            )
        })
        .with_save_as("options")
}

fn correct_texts(body: &str) -> Vec<String> {
    let options: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
    options
        .iter()
        .filter(|o| o["is_correct"] == true)
        .map(|o| o["text"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn route_question_option_set_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_section_action("Geography").with_save_as("section"))
        // no correct option
        .step(
            Action::new("question_create", "POST", "/api/v1/questions")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "question": "Capital of France?",
                        "options": [
                            { "text": "Paris", "is_correct": false },
                            { "text": "Lyon", "is_correct": false },
                        ],
                    })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // two correct options
        .step(
            Action::new("question_create", "POST", "/api/v1/questions")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "question": "Capital of France?",
                        "options": [
                            { "text": "Paris", "is_correct": true },
                            { "text": "Lyon", "is_correct": true },
                        ],
                    })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // unknown section
        .step(
            Action::new("question_create", "POST", "/api/v1/questions")
                .with_body(json!({
                    "section_id": "00000000-0000-0000-0000-000000000000",
                    "question": "Capital of France?",
                    "options": [{ "text": "Paris", "is_correct": true }],
                }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            create_question_action("section", "Capital of France?", &["Paris", "Lyon"], 0)
                .with_save_as("question")
                .assert_body(|body| assert!(body.contains("Capital of France?"))),
        )
        .step(list_options_action().assert_body(|body| {
            assert_eq!(correct_texts(body), vec!["Paris".to_string()]);
        }))
        // a new correct option takes over
        .step(
            Action::new("option_create", "POST", "/api/v1/question/option")
                .with_dyn_body(|ctx| {
                    json!({
                        "question_id": id_of(ctx, "question"),
                        "text": "Marseille",
                        "is_correct": true,
                    })
                })
                .with_expect(StatusCode::CREATED),
        )
        .step(list_options_action().assert_body(|body| {
            assert_eq!(correct_texts(body), vec!["Marseille".to_string()]);
        }))
        // the only correct option can't be removed or unmarked
        .step(
            Action::new("option_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| option_path(ctx, "Marseille"))
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        .step(
            Action::new("option_patch", "PATCH", "dynamic")
                .with_dyn_path(|ctx| option_path(ctx, "Marseille"))
                .with_body(json!({ "is_correct": false }))
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        // moving the mark back to Paris
        .step(
            Action::new("option_patch", "PATCH", "dynamic")
                .with_dyn_path(|ctx| option_path(ctx, "Paris"))
                .with_body(json!({ "is_correct": true })),
        )
        .step(list_options_action().assert_body(|body| {
            assert_eq!(correct_texts(body), vec!["Paris".to_string()]);
        }))
        .step(
            Action::new("option_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| option_path(ctx, "Marseille"))
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(list_options_action().assert_body(|body| {
            let options: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
            assert_eq!(options.len(), 2);
        }))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_question_update_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_section_action("Geography").with_save_as("section"))
        .step(
            create_question_action("section", "Capital of Spain?", &["Madrid", "Seville"], 0)
                .with_save_as("question"),
        )
        .step(
            Action::new("question_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .with_body(json!({ "question": "What is the capital of Spain?" }))
                .assert_body(|body| assert!(body.contains("What is the capital of Spain?"))),
        )
        // the same option listed twice can't sneak past the correct-option check
        .step(list_options_action())
        .step(
            Action::new("question_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .with_dyn_body(|ctx| {
                    let madrid = option_id(ctx, "Madrid");
                    json!({
                        "options": [
                            { "id": madrid, "text": "Madrid", "is_correct": true },
                            { "id": madrid, "text": "Madrid", "is_correct": false },
                        ],
                    })
                })
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        .step(list_options_action().assert_body(|body| {
            assert_eq!(correct_texts(body), vec!["Madrid".to_string()]);
        }))
        // a replacement option set still needs exactly one correct option
        .step(
            Action::new("question_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .with_body(json!({
                    "options": [
                        { "text": "Madrid", "is_correct": false },
                        { "text": "Valencia", "is_correct": false },
                    ],
                }))
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY),
        )
        .step(
            Action::new("question_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .with_body(json!({
                    "options": [
                        { "text": "Madrid", "is_correct": true },
                        { "text": "Valencia", "is_correct": false },
                        { "text": "Bilbao", "is_correct": false },
                    ],
                })),
        )
        .step(
            Action::new("question_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .assert_body(|body| {
                    let question: Value = serde_json::from_str(body).expect("Invalid body");
                    let options = question["options"].as_array().expect("no options");
                    assert_eq!(options.len(), 3);
                    assert!(!body.contains("Seville"));
                }),
        )
        .step(
            Action::new("question_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(
            Action::new("question_by_section", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/section/{}", id_of(ctx, "section")))
                .assert_body(|body| {
                    let questions: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
                    assert!(questions.is_empty());
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_question_learner_view_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_section_action("Geography").with_save_as("section"))
        .step(
            create_question_action("section", "Capital of Italy?", &["Rome", "Milan"], 0)
                .with_save_as("question"),
        )
        .step(register_action("Olga", "olga@example.com", PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("question_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/questions/{}", id_of(ctx, "question")))
                .assert_body(|body| {
                    assert!(body.contains("Rome"));
                    assert!(!body.contains("is_correct"));
                }),
        )
        .step(Action::new("question_list", "GET", "/api/v1/questions").assert_body(|body| {
            let questions: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
            assert_eq!(questions.len(), 1);
            assert!(!body.contains("is_correct"));
        }))
        // option management is for admins only
        .step(
            Action::new("option_list", "GET", "/api/v1/question/option")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("question_create", "POST", "/api/v1/questions")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "question": "Capital of Germany?",
                        "options": [{ "text": "Berlin", "is_correct": true }],
                    })
                })
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("question_get", "GET", "dynamic")
                .with_dyn_path(|_| format!("/api/v1/questions/{}", uuid::Uuid::nil()))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}
