use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::board::domain::JobStatus;
use crate::board::{board_router, JobBoard, SessionContext};
use crate::store::StoreError;

fn request(
    method: Method,
    uri: &str,
    auth: Option<&SessionContext>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ctx) = auth {
        builder = builder.header(header::AUTHORIZATION, bearer(ctx));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn router(board: &JobBoard) -> axum::Router {
    board_router(Arc::new(board.clone()))
}

#[tokio::test]
async fn register_then_read_profile_with_the_bearer_token() {
    let board = board();
    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "http@example.test",
                "password": "correct-horse",
                "password_confirm": "correct-horse",
                "user_type": "candidate",
                "first_name": "Http",
                "last_name": "Client",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    let token = body["access_token"].as_str().expect("token").to_string();
    assert_eq!(body["profile"]["user_type"], "candidate");

    let response = router(&board)
        .oneshot(
            Request::get("/api/v1/profile")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["first_name"], "Http");
}

#[tokio::test]
async fn mismatched_registration_is_unprocessable() {
    let board = board();
    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "email": "oops@example.test",
                "password": "correct-horse",
                "password_confirm": "battery-staple",
                "user_type": "candidate",
                "first_name": "Oops",
                "last_name": "Typo",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "Passwords do not match");
}

#[tokio::test]
async fn public_job_listing_applies_query_filters() {
    let board = board();
    let employer = employer(&board, "routes@acme.test");
    let acme = company(&board, &employer, "Acme");
    let mut remote = job_draft(&acme.id, "Remote Rustacean", JobStatus::Active);
    remote.remote_allowed = true;
    board.jobs.create(&employer, remote).expect("job");
    board
        .jobs
        .create(&employer, job_draft(&acme.id, "Office Rustacean", JobStatus::Active))
        .expect("job");
    board
        .jobs
        .create(&employer, job_draft(&acme.id, "Hidden", JobStatus::Draft))
        .expect("job");

    let response = router(&board)
        .oneshot(request(
            Method::GET,
            "/api/v1/jobs?remote_allowed=true&search=rust",
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let jobs = body.as_array().expect("array");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["title"], "Remote Rustacean");
    assert_eq!(jobs[0]["applications_count"], 0);
}

#[tokio::test]
async fn writes_without_a_session_are_unauthorized() {
    let board = board();
    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/companies",
            None,
            Some(json!({ "name": "Nobody Inc" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "not authenticated");
}

#[tokio::test]
async fn apply_twice_conflicts_and_missing_jobs_are_not_found() {
    let board = board();
    let employer = employer(&board, "apply@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "apply@example.test");

    let payload = json!({ "job_id": job.id, "cover_letter": "Hello" });
    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(&candidate),
            Some(payload.clone()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/applications",
            Some(&candidate),
            Some(payload),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router(&board)
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/jobs/{}/applied", job.id),
            Some(&candidate),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(read_json_body(response).await, json!({ "applied": true }));

    let response = router(&board)
        .oneshot(request(Method::GET, "/api/v1/jobs/nope", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_salary_bounds_are_unprocessable_over_http() {
    let board = board();
    let employer = employer(&board, "salary@acme.test");
    let acme = company(&board, &employer, "Acme");

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/jobs",
            Some(&employer),
            Some(json!({
                "title": "Analyst",
                "company_id": acme.id,
                "description": "Numbers",
                "requirements": "Spreadsheets",
                "location": "Paris",
                "salary_min": 90000.0,
                "salary_max": 50000.0,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn job_form_endpoint_creates_then_updates() {
    let board = board();
    let employer = employer(&board, "form@acme.test");
    let acme = company(&board, &employer, "Acme");

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/jobs/form",
            Some(&employer),
            Some(json!({
                "title": "Support",
                "company_id": acme.id,
                "description": "Help",
                "requirements": "Patience",
                "location": "Remote",
                "salary_min": "",
                "deadline": "",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json_body(response).await;
    assert_eq!(created["salary_min"], Value::Null);
    assert_eq!(created["deadline"], Value::Null);
    assert_eq!(created["status"], "draft");

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            "/api/v1/jobs/form",
            Some(&employer),
            Some(json!({
                "editing": created["id"],
                "title": "Support Lead",
                "company_id": acme.id,
                "description": "Help",
                "requirements": "Patience",
                "location": "Remote",
                "status": "active",
                "deadline": "2025-12-01",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = read_json_body(response).await;
    assert_eq!(updated["title"], "Support Lead");
    assert_eq!(updated["deadline"], "2025-12-01T00:00:00Z");
}

#[tokio::test]
async fn status_changes_follow_the_transition_table() {
    let board = board();
    let employer = employer(&board, "fsm@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "fsm@example.test");
    let application = board
        .applications
        .create(
            &candidate,
            crate::board::NewApplication {
                job_id: job.id,
                ..Default::default()
            },
        )
        .expect("applied");

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/applications/{}/withdraw", application.id),
            Some(&candidate),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router(&board)
        .oneshot(request(
            Method::PATCH,
            &format!("/api/v1/applications/{}/status", application.id),
            Some(&employer),
            Some(json!({ "status": "reviewing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn candidates_cannot_move_applications_or_delete_jobs() {
    let board = board();
    let employer = employer(&board, "guard@acme.test");
    let acme = company(&board, &employer, "Acme");
    let job = board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");
    let candidate = candidate(&board, "sneaky@example.test");
    let application = board
        .applications
        .create(
            &candidate,
            crate::board::NewApplication {
                job_id: job.id.clone(),
                ..Default::default()
            },
        )
        .expect("applied");

    let response = router(&board)
        .oneshot(request(
            Method::PATCH,
            &format!("/api/v1/applications/{}/status", application.id),
            Some(&candidate),
            Some(json!({ "status": "hired" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router(&board)
        .oneshot(request(
            Method::DELETE,
            &format!("/api/v1/jobs/{}", job.id),
            Some(&candidate),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router(&board)
        .oneshot(request(
            Method::POST,
            &format!("/api/v1/applications/{}/interviews", application.id),
            Some(&candidate),
            Some(json!({
                "interview_type": "video",
                "scheduled_at": "2025-11-03T15:00:00Z",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let stored = board.applications.get(&application.id).expect("stored");
    assert_eq!(stored.status, crate::board::ApplicationStatus::Pending);
    assert!(board.jobs.get(&job.id).is_ok());
}

#[tokio::test]
async fn dashboards_render_for_the_session_user() {
    let board = board();
    let employer = employer(&board, "dash@acme.test");
    company(&board, &employer, "Acme");

    let response = router(&board)
        .oneshot(request(
            Method::GET,
            "/api/v1/dashboard/employer",
            Some(&employer),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stats"]["active_jobs"], 0);
    assert_eq!(body["companies"][0]["name"], "Acme");

    let response = router(&board)
        .oneshot(request(Method::GET, "/api/v1/dashboard/candidate", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn store_outages_map_to_service_unavailable() {
    let board = board_with_failing_applications(StoreError::Unavailable("offline".to_string()));
    let employer = employer(&board, "outage@acme.test");
    let acme = company(&board, &employer, "Acme");
    board
        .jobs
        .create(&employer, job_draft(&acme.id, "Engineer", JobStatus::Active))
        .expect("job");

    let response = router(&board)
        .oneshot(request(Method::GET, "/api/v1/jobs", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
