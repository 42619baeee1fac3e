use crate::error::FormsError;
use crate::session::LOGIN_PATH;
use lambda_http::{
    http::{HeaderValue, StatusCode},
    Body, Error, Response,
};
use serde::{de::DeserializeOwned, Serialize};

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(body)?.into())
        .map_err(Box::new)?)
}

/// Maps the error taxonomy onto HTTP. Store and config failures are logged
/// and answered with a generic 500.
pub fn error_response(error: &FormsError) -> Result<Response<Body>, Error> {
    match error {
        FormsError::NotFound => json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "Form not found"})),
        FormsError::Validation(details) => json_response(
            StatusCode::BAD_REQUEST,
            &serde_json::json!({"error": "Validation failed", "details": details.as_map()}),
        ),
        FormsError::Unauthorized(message) => json_response(
            StatusCode::UNAUTHORIZED,
            &serde_json::json!({"error": message, "redirect": LOGIN_PATH}),
        ),
        FormsError::Upstream(_) | FormsError::Config(_) => {
            tracing::error!("Request failed: {}", error);
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({"error": "Internal server error"}),
            )
        }
    }
}

/// Parses a JSON body, or yields the 400 response to return.
pub fn parse_body<T: DeserializeOwned>(body: &Body) -> Result<T, Response<Body>> {
    let bytes: &[u8] = match body {
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes,
        Body::Empty => b"",
    };
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!("Failed to parse request body: {}", e);
        bad_request(&format!("Invalid request body: {}", e))
    })
}

fn bad_request(message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(serde_json::json!({ "error": message }).to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    let headers = response.headers_mut();
    headers.insert("Content-Type", HeaderValue::from_static("application/json"));
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    response
}

pub fn not_found() -> Result<Response<Body>, Error> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "Not found"}))
}

pub fn method_not_allowed() -> Result<Response<Body>, Error> {
    json_response(StatusCode::METHOD_NOT_ALLOWED, &serde_json::json!({"error": "Method not allowed"}))
}

pub fn preflight() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(Box::new)?)
}
