use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::applications::{NewApplication, StatusUpdate};
use super::companies::{CompanyDraft, CompanyPatch};
use super::dashboard::{CandidateDashboard, DashboardError, EmployerDashboard};
use super::domain::{
    ApplicationId, CompanyId, InterviewId, InterviewType, JobId, UserId, UserProfile,
};
use super::form::JobForm;
use super::identity::{ProfilePatch, Registration, SessionContext};
use super::interviews::{InterviewDraft, InterviewStatusUpdate, DEFAULT_DURATION_MINUTES};
use super::jobs::{JobDraft, JobFilters, JobPatch};
use super::{AuthError, JobBoard, ServiceError};
use crate::store::StoreError;

/// Router exposing the board over JSON. Sessions travel as `Authorization: Bearer <token>`.
pub fn board_router(board: Arc<JobBoard>) -> Router {
    Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/sign-in", post(sign_in_handler))
        .route("/api/v1/auth/sign-out", post(sign_out_handler))
        .route(
            "/api/v1/profile",
            get(profile_handler).patch(update_profile_handler),
        )
        .route("/api/v1/jobs", get(list_jobs_handler).post(create_job_handler))
        .route("/api/v1/jobs/form", post(job_form_handler))
        .route(
            "/api/v1/jobs/:job_id",
            get(job_detail_handler)
                .patch(update_job_handler)
                .delete(delete_job_handler),
        )
        .route("/api/v1/jobs/:job_id/applied", get(has_applied_handler))
        .route(
            "/api/v1/companies",
            get(list_companies_handler).post(create_company_handler),
        )
        .route(
            "/api/v1/companies/:company_id",
            get(company_handler)
                .patch(update_company_handler)
                .delete(delete_company_handler),
        )
        .route("/api/v1/applications", post(apply_handler))
        .route(
            "/api/v1/applications/:application_id/status",
            patch(application_status_handler),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler),
        )
        .route(
            "/api/v1/applications/:application_id/interviews",
            get(list_interviews_handler).post(schedule_interview_handler),
        )
        .route(
            "/api/v1/interviews/:interview_id/status",
            patch(interview_status_handler),
        )
        .route("/api/v1/me/jobs", get(my_jobs_handler))
        .route("/api/v1/me/companies", get(my_companies_handler))
        .route("/api/v1/me/applications", get(my_applications_handler))
        .route(
            "/api/v1/me/received-applications",
            get(received_applications_handler),
        )
        .route("/api/v1/dashboard/candidate", get(candidate_dashboard_handler))
        .route("/api/v1/dashboard/employer", get(employer_dashboard_handler))
        .with_state(board)
}

pub(crate) fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Validation(_) | ServiceError::Form(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Unauthenticated | ServiceError::Auth(AuthError::InvalidCredentials) => {
            StatusCode::UNAUTHORIZED
        }
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::AlreadyApplied(_)
        | ServiceError::JobNotOpen(_)
        | ServiceError::InterviewExists(_)
        | ServiceError::InvalidTransition(_)
        | ServiceError::Auth(AuthError::EmailTaken(_))
        | ServiceError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
        ServiceError::Auth(AuthError::Unavailable(_))
        | ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn failure(error: ServiceError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!(%status, "request failed: {error}");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, Json(payload)).into_response()
}

fn reply<T: Serialize>(status: StatusCode, result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => failure(error),
    }
}

fn no_content(result: Result<(), ServiceError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => failure(error),
    }
}

fn dashboard_reply<T: Serialize>(result: Result<T, DashboardError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(DashboardError::Service(error)) => failure(error),
        Err(other) => {
            let payload = json!({
                "error": other.to_string(),
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Session for the request; missing or unknown tokens give an anonymous context.
fn context(board: &JobBoard, headers: &HeaderMap) -> Result<SessionContext, ServiceError> {
    match bearer_token(headers) {
        Some(token) => board.identity.hydrate(token),
        None => Ok(SessionContext::anonymous()),
    }
}

/// Session for writes, which always need a signed-in user.
fn user_context(board: &JobBoard, headers: &HeaderMap) -> Result<SessionContext, ServiceError> {
    let ctx = context(board, headers)?;
    ctx.require_user()?;
    Ok(ctx)
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub(crate) access_token: String,
    pub(crate) user_id: UserId,
    pub(crate) email: String,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) profile: Option<UserProfile>,
}

impl SessionView {
    fn from_context(ctx: &SessionContext) -> Result<Self, ServiceError> {
        let session = ctx.session().ok_or(ServiceError::Unauthenticated)?;
        Ok(Self {
            access_token: session.access_token.clone(),
            user_id: session.user_id.clone(),
            email: session.email.clone(),
            issued_at: session.issued_at,
            profile: ctx.profile().cloned(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InterviewRequest {
    pub(crate) interview_type: InterviewType,
    pub(crate) scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) duration_minutes: Option<u32>,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

async fn register_handler(
    State(board): State<Arc<JobBoard>>,
    Json(registration): Json<Registration>,
) -> Response {
    let result = board
        .identity
        .register(registration)
        .and_then(|ctx| SessionView::from_context(&ctx));
    reply(StatusCode::CREATED, result)
}

async fn sign_in_handler(
    State(board): State<Arc<JobBoard>>,
    Json(request): Json<SignInRequest>,
) -> Response {
    let result = board
        .identity
        .sign_in(&request.email, &request.password)
        .and_then(|ctx| SessionView::from_context(&ctx));
    reply(StatusCode::OK, result)
}

async fn sign_out_handler(State(board): State<Arc<JobBoard>>, headers: HeaderMap) -> Response {
    let result = context(&board, &headers).and_then(|mut ctx| board.identity.sign_out(&mut ctx));
    no_content(result)
}

async fn profile_handler(State(board): State<Arc<JobBoard>>, headers: HeaderMap) -> Response {
    let result = user_context(&board, &headers).and_then(|ctx| {
        let user_id = ctx.require_user()?;
        ctx.profile().cloned().ok_or_else(|| ServiceError::NotFound {
            entity: "profile",
            id: user_id.to_string(),
        })
    });
    reply(StatusCode::OK, result)
}

async fn update_profile_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Json(patch): Json<ProfilePatch>,
) -> Response {
    let result = user_context(&board, &headers)
        .and_then(|mut ctx| board.identity.update_profile(&mut ctx, patch));
    reply(StatusCode::OK, result)
}

async fn list_jobs_handler(
    State(board): State<Arc<JobBoard>>,
    Query(filters): Query<JobFilters>,
) -> Response {
    reply(StatusCode::OK, board.jobs.list(&filters))
}

async fn job_detail_handler(
    State(board): State<Arc<JobBoard>>,
    Path(job_id): Path<String>,
) -> Response {
    reply(StatusCode::OK, board.jobs.get_by_id(&JobId(job_id)))
}

async fn create_job_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Json(draft): Json<JobDraft>,
) -> Response {
    let result = user_context(&board, &headers).and_then(|ctx| board.jobs.create(&ctx, draft));
    reply(StatusCode::CREATED, result)
}

async fn update_job_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    Json(patch): Json<JobPatch>,
) -> Response {
    let result = user_context(&board, &headers)
        .and_then(|ctx| board.jobs.update(&ctx, &JobId(job_id), patch));
    reply(StatusCode::OK, result)
}

async fn delete_job_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    let result = user_context(&board, &headers)
        .and_then(|ctx| board.jobs.delete(&ctx, &JobId(job_id)));
    no_content(result)
}

async fn job_form_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Json(form): Json<JobForm>,
) -> Response {
    let status = if form.is_editing() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let result = user_context(&board, &headers).and_then(|ctx| board.jobs.save_form(&ctx, &form));
    reply(status, result)
}

async fn has_applied_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Response {
    let result = user_context(&board, &headers).and_then(|ctx| {
        let user_id = ctx.require_user()?;
        let applied = board.applications.has_applied(&JobId(job_id), user_id)?;
        Ok(json!({ "applied": applied }))
    });
    reply(StatusCode::OK, result)
}

async fn list_companies_handler(State(board): State<Arc<JobBoard>>) -> Response {
    reply(StatusCode::OK, board.companies.list())
}

async fn company_handler(
    State(board): State<Arc<JobBoard>>,
    Path(company_id): Path<String>,
) -> Response {
    reply(StatusCode::OK, board.companies.get(&CompanyId(company_id)))
}

async fn create_company_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Json(draft): Json<CompanyDraft>,
) -> Response {
    let result =
        user_context(&board, &headers).and_then(|ctx| board.companies.create(&ctx, draft));
    reply(StatusCode::CREATED, result)
}

async fn update_company_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
    Json(patch): Json<CompanyPatch>,
) -> Response {
    let result = user_context(&board, &headers)
        .and_then(|ctx| board.companies.update(&ctx, &CompanyId(company_id), patch));
    reply(StatusCode::OK, result)
}

async fn delete_company_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(company_id): Path<String>,
) -> Response {
    let result = user_context(&board, &headers)
        .and_then(|ctx| board.companies.delete(&ctx, &CompanyId(company_id)));
    no_content(result)
}

async fn apply_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Json(request): Json<NewApplication>,
) -> Response {
    let result =
        context(&board, &headers).and_then(|ctx| board.applications.create(&ctx, request));
    reply(StatusCode::CREATED, result)
}

async fn application_status_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> Response {
    let result = user_context(&board, &headers).and_then(|ctx| {
        board
            .applications
            .update_status(&ctx, &ApplicationId(application_id), update)
    });
    reply(StatusCode::OK, result)
}

async fn withdraw_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response {
    let result = context(&board, &headers)
        .and_then(|ctx| board.applications.withdraw(&ctx, &ApplicationId(application_id)));
    reply(StatusCode::OK, result)
}

async fn list_interviews_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
) -> Response {
    let result = user_context(&board, &headers).and_then(|_| {
        board
            .interviews
            .list_for_application(&ApplicationId(application_id))
    });
    reply(StatusCode::OK, result)
}

async fn schedule_interview_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    Json(request): Json<InterviewRequest>,
) -> Response {
    let draft = InterviewDraft {
        application_id: ApplicationId(application_id),
        interview_type: request.interview_type,
        scheduled_at: request.scheduled_at,
        duration_minutes: request
            .duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES),
        notes: request.notes,
    };
    let result =
        user_context(&board, &headers).and_then(|ctx| board.interviews.schedule(&ctx, draft));
    reply(StatusCode::CREATED, result)
}

async fn interview_status_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
    Path(interview_id): Path<String>,
    Json(update): Json<InterviewStatusUpdate>,
) -> Response {
    let result = user_context(&board, &headers).and_then(|ctx| {
        board
            .interviews
            .update_status(&ctx, &InterviewId(interview_id), update)
    });
    reply(StatusCode::OK, result)
}

async fn my_jobs_handler(State(board): State<Arc<JobBoard>>, headers: HeaderMap) -> Response {
    let result = context(&board, &headers).and_then(|ctx| board.jobs.list_mine(&ctx));
    reply(StatusCode::OK, result)
}

async fn my_companies_handler(State(board): State<Arc<JobBoard>>, headers: HeaderMap) -> Response {
    let result = context(&board, &headers).and_then(|ctx| board.companies.list_mine(&ctx));
    reply(StatusCode::OK, result)
}

async fn my_applications_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
) -> Response {
    let result = context(&board, &headers).and_then(|ctx| board.applications.list_mine(&ctx));
    reply(StatusCode::OK, result)
}

async fn received_applications_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
) -> Response {
    let result =
        context(&board, &headers).and_then(|ctx| board.applications.list_for_my_jobs(&ctx));
    reply(StatusCode::OK, result)
}

async fn candidate_dashboard_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
) -> Response {
    let result = context(&board, &headers)
        .map_err(DashboardError::from)
        .and_then(|ctx| CandidateDashboard::load(&board, &ctx));
    dashboard_reply(result)
}

async fn employer_dashboard_handler(
    State(board): State<Arc<JobBoard>>,
    headers: HeaderMap,
) -> Response {
    let result = context(&board, &headers)
        .map_err(DashboardError::from)
        .and_then(|ctx| EmployerDashboard::load(&board, &ctx));
    dashboard_reply(result)
}
