use lambda_http::{run, service_fn, tracing, Error, Request};
use survey_shared::config::AppConfig;
use survey_shared::session::SystemClock;
use survey_shared::sheets::GoogleSheetsStore;
use survey_shared::AppState;
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting survey API with {:?}", config);

    // One store client per cold start; it caches its access token.
    let store = Arc::new(GoogleSheetsStore::new(&config.sheets));
    let state = AppState::new(config, store, Arc::new(SystemClock));

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
