use crate::error::FormsError;
use crate::render::{render_form, FormState, Widget};
use crate::repository::FormRepository;
use crate::responses::{error_response, json_response, parse_body};
use crate::session::Clock;
use crate::types::{FormPayload, FormSubmission, SubmitRequest, SurveyForm};
use crate::validations::{compile_builder_schema, compile_submission_schema};
use chrono::SecondsFormat;
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

fn timestamp(clock: &dyn Clock) -> String {
    clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct SubmitResponse<'a> {
    success: bool,
    submission: &'a FormSubmission,
}

#[derive(Serialize)]
struct RenderedForm<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    widgets: Vec<Widget>,
}

/// GET /forms
pub async fn list_forms(repo: &FormRepository) -> Result<Response<Body>, Error> {
    let forms = repo.get_all().await;
    tracing::info!("Listing {} forms", forms.len());
    json_response(StatusCode::OK, &forms)
}

/// POST /forms
pub async fn create_form(repo: &FormRepository, clock: &dyn Clock, body: &Body) -> Result<Response<Body>, Error> {
    let payload: FormPayload = match parse_body(body) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    if let Err(errors) = compile_builder_schema().validate(&payload) {
        tracing::warn!("Rejected form payload: {}", errors);
        return error_response(&errors.into());
    }

    let now = timestamp(clock);
    let form = SurveyForm {
        id: uuid::Uuid::new_v4().to_string(),
        title: payload.title,
        description: payload.description,
        fields: payload.fields,
        created_at: now.clone(),
        updated_at: now,
    };

    match repo.create(&form).await {
        Ok(()) => json_response(StatusCode::CREATED, &form),
        Err(e) => error_response(&e),
    }
}

/// GET /forms/{id}
pub async fn get_form(repo: &FormRepository, form_id: &str) -> Result<Response<Body>, Error> {
    match repo.get_by_id(form_id).await {
        Some(form) => json_response(StatusCode::OK, &form),
        None => error_response(&FormsError::NotFound),
    }
}

/// PUT /forms/{id}: title, description and fields are replaced wholesale.
pub async fn update_form(
    repo: &FormRepository,
    clock: &dyn Clock,
    form_id: &str,
    body: &Body,
) -> Result<Response<Body>, Error> {
    let payload: FormPayload = match parse_body(body) {
        Ok(p) => p,
        Err(resp) => return Ok(resp),
    };
    if let Err(errors) = compile_builder_schema().validate(&payload) {
        tracing::warn!("Rejected form update for {}: {}", form_id, errors);
        return error_response(&errors.into());
    }

    let Some(existing) = repo.get_by_id(form_id).await else {
        return error_response(&FormsError::NotFound);
    };

    let updated = SurveyForm {
        title: payload.title,
        description: payload.description,
        fields: payload.fields,
        updated_at: timestamp(clock),
        ..existing
    };

    match repo.update(&updated).await {
        Ok(()) => json_response(StatusCode::OK, &updated),
        Err(e) => error_response(&e),
    }
}

/// DELETE /forms/{id}
pub async fn delete_form(repo: &FormRepository, form_id: &str) -> Result<Response<Body>, Error> {
    match repo.delete(form_id).await {
        Ok(()) => json_response(StatusCode::OK, &serde_json::json!({"success": true})),
        Err(e) => error_response(&e),
    }
}

/// POST /forms/submit
pub async fn submit_form(repo: &FormRepository, clock: &dyn Clock, body: &Body) -> Result<Response<Body>, Error> {
    let request: SubmitRequest = match parse_body(body) {
        Ok(r) => r,
        Err(resp) => return Ok(resp),
    };

    let Some(form) = repo.get_by_id(&request.form_id).await else {
        tracing::warn!("Submission for unknown form {}", request.form_id);
        return error_response(&FormsError::NotFound);
    };

    if let Err(errors) = compile_submission_schema(&form.fields).validate(&request.data) {
        tracing::info!("Submission for {} failed validation: {}", form.id, errors);
        return error_response(&errors.into());
    }

    let submission = FormSubmission {
        id: uuid::Uuid::new_v4().to_string(),
        form_id: request.form_id,
        data: request.data,
        submitted_at: timestamp(clock),
    };

    match repo.submit_response(&submission, &form).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SubmitResponse { success: true, submission: &submission },
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /forms/{id}/render: widget descriptors for a blank submission.
pub async fn render_form_widgets(repo: &FormRepository, form_id: &str) -> Result<Response<Body>, Error> {
    let Some(form) = repo.get_by_id(form_id).await else {
        return error_response(&FormsError::NotFound);
    };
    let state = FormState::for_fields(&form.fields);
    json_response(
        StatusCode::OK,
        &RenderedForm {
            id: &form.id,
            title: &form.title,
            description: &form.description,
            widgets: render_form(&form, &state),
        },
    )
}

/// GET /forms/{id}/responses
pub async fn list_responses(repo: &FormRepository, form_id: &str) -> Result<Response<Body>, Error> {
    if repo.get_by_id(form_id).await.is_none() {
        return error_response(&FormsError::NotFound);
    }
    match repo.responses(form_id).await {
        Ok(sheet) => json_response(StatusCode::OK, &sheet),
        Err(e) => error_response(&e),
    }
}
