mod common;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, PASSWORD, create_question_action, create_section_action, id_of,
    login_admin_action, register_action, setup_server, setup_test_db,
};

#[tokio::test]
async fn route_section_crud_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(
            create_section_action("Dengue Basics")
                .with_save_as("section")
                .assert_body(|body| {
                    let section: Value = serde_json::from_str(body).expect("Invalid body");
                    assert_eq!(section["title"], "Dengue Basics");
                    assert_eq!(section["video_url"], "");
                    assert_eq!(section["section_order"], 0);
                    assert_eq!(section["is_active"], true);
                }),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/section/create")
                .with_body(json!({
                    "title": "Prevention",
                    "description": "Keeping mosquitoes away",
                    "video_url": "https://videos.example.com/prevention",
                    "section_order": 2,
                }))
                .with_expect(StatusCode::CREATED),
        )
        .step(
            Action::new("section_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .with_body(json!({ "section_order": 1, "is_active": false }))
                .assert_body(|body| {
                    let section: Value = serde_json::from_str(body).expect("Invalid body");
                    assert_eq!(section["title"], "Dengue Basics");
                    assert_eq!(section["section_order"], 1);
                    assert_eq!(section["is_active"], false);
                }),
        )
        .step(Action::new("section_list", "GET", "/api/v1/section").assert_body(|body| {
            let sections: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
            assert_eq!(sections.len(), 2);
        }))
        .step(
            Action::new("section_by_title", "GET", "/api/v1/section/by-title")
                .with_param("title", "Prevention")
                .assert_body(|body| {
                    let sections: Vec<Value> = serde_json::from_str(body).expect("Invalid body");
                    assert_eq!(sections.len(), 1);
                    assert_eq!(
                        sections[0]["video_url"],
                        "https://videos.example.com/prevention"
                    );
                }),
        )
        .step(
            Action::new("section_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .with_expect(StatusCode::NO_CONTENT),
        )
        .step(
            Action::new("section_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .with_expect(StatusCode::NOT_FOUND)
                .assert_body(|body| assert!(body.contains("not found"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_section_validation_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(
            Action::new("section_create", "POST", "/api/v1/section/create")
                .with_body(json!({
                    "title": "",
                    "description": "No title",
                }))
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY)
                .assert_body(|body| assert!(body.contains("title"))),
        )
        .step(
            Action::new("section_create", "POST", "/api/v1/section/create")
                .with_body(json!({
                    "title": "Broken video",
                    "description": "Video is not a url",
                    "video_url": "not a url",
                }))
                .with_expect(StatusCode::UNPROCESSABLE_ENTITY)
                .assert_body(|body| assert!(body.contains("video_url"))),
        )
        .step(
            Action::new("section_update", "PUT", "dynamic")
                .with_dyn_path(|_| format!("/api/v1/section/{}", uuid::Uuid::nil()))
                .with_body(json!({ "title": "Nothing here" }))
                .with_expect(StatusCode::NOT_FOUND),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_section_permissions_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        // anonymous
        .step(
            Action::new("section_list", "GET", "/api/v1/section")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(login_admin_action())
        .step(create_section_action("Symptoms").with_save_as("section"))
        .step(register_action("Mia", "mia@example.com", PASSWORD).with_clear_cookies(true))
        .step(
            create_section_action("Learner section")
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| assert!(body.contains("forbidden"))),
        )
        .step(
            Action::new("section_update", "PUT", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .with_body(json!({ "title": "Hijacked" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("section_delete", "DELETE", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // reading is open to learners
        .step(
            Action::new("section_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .assert_body(|body| assert!(body.contains("Symptoms"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_section_nested_questions_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(login_admin_action())
        .step(create_section_action("Transmission").with_save_as("section"))
        .step(create_question_action(
            "section",
            "Which mosquito spreads dengue?",
            &["Aedes aegypti", "Anopheles"],
            0,
        ))
        .step(
            Action::new("section_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .assert_body(|body| {
                    let section: Value = serde_json::from_str(body).expect("Invalid body");
                    let questions = section["questions"].as_array().expect("no questions");
                    assert_eq!(questions.len(), 1);
                    let options = questions[0]["options"].as_array().expect("no options");
                    assert_eq!(options.len(), 2);
                    // admins see which option is correct
                    assert!(options.iter().any(|o| o["is_correct"] == true));
                }),
        )
        .step(register_action("Noa", "noa@example.com", PASSWORD).with_clear_cookies(true))
        .step(
            Action::new("section_get", "GET", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/section/{}", id_of(ctx, "section")))
                .assert_body(|body| {
                    let section: Value = serde_json::from_str(body).expect("Invalid body");
                    let options = section["questions"][0]["options"]
                        .as_array()
                        .expect("no options");
                    assert_eq!(options.len(), 2);
                    assert!(options.iter().all(|o| o.get("is_correct").is_none()));
                }),
        )
        .run(&mut server, pool)
        .await;
}
