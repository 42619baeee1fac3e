use lambda_http::{http::Method, Body, Error, Request, Response};
use std::sync::Arc;
use survey_shared::responses::{error_response, method_not_allowed, not_found, preflight};
use survey_shared::{auth, forms, AppState};

/// Main Lambda handler - routes requests to auth and form endpoints
pub(crate) async fn function_handler(event: Request, state: Arc<AppState>) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("Survey API invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        return preflight();
    }

    // Accept both "/forms" and "/api/forms" style paths
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let parts = match parts.split_first() {
        Some((&"api", rest)) => rest,
        _ => parts.as_slice(),
    };

    let repo = &state.repository;
    let clock = state.clock.as_ref();

    match (method, parts) {
        // --- AUTH ---
        (&Method::POST, ["auth"]) => auth::login(&state.config.auth, clock, body).await,
        (_, ["auth"]) => method_not_allowed(),

        // --- PUBLIC ---
        // GET /forms - list forms
        (&Method::GET, ["forms"]) => forms::list_forms(repo).await,
        // POST /forms/submit - store a response
        (&Method::POST, ["forms", "submit"]) => forms::submit_form(repo, clock, body).await,
        // GET /forms/{id} - get form
        (&Method::GET, ["forms", form_id]) => forms::get_form(repo, form_id).await,
        // GET /forms/{id}/render - widget descriptors
        (&Method::GET, ["forms", form_id, "render"]) => forms::render_form_widgets(repo, form_id).await,

        // --- ADMIN ---
        // POST /forms - create form
        (&Method::POST, ["forms"]) => {
            if let Err(e) = require_admin(&event, &state) {
                return error_response(&e);
            }
            forms::create_form(repo, clock, body).await
        }
        // PUT /forms/{id} - replace form
        (&Method::PUT, ["forms", form_id]) => {
            if let Err(e) = require_admin(&event, &state) {
                return error_response(&e);
            }
            forms::update_form(repo, clock, form_id, body).await
        }
        // DELETE /forms/{id} - delete form and its responses
        (&Method::DELETE, ["forms", form_id]) => {
            if let Err(e) = require_admin(&event, &state) {
                return error_response(&e);
            }
            forms::delete_form(repo, form_id).await
        }
        // GET /forms/{id}/responses - response table
        (&Method::GET, ["forms", form_id, "responses"]) => {
            if let Err(e) = require_admin(&event, &state) {
                return error_response(&e);
            }
            forms::list_responses(repo, form_id).await
        }
        (_, ["forms", ..]) => method_not_allowed(),

        _ => not_found(),
    }
}

fn require_admin(event: &Request, state: &AppState) -> Result<(), survey_shared::error::FormsError> {
    let user = auth::authorize_admin(&state.config.auth, Arc::clone(&state.clock), event.headers())?;
    tracing::info!("Admin request by {}", user.email);
    Ok(())
}
