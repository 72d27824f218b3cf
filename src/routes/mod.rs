pub mod gpt_tts;
pub mod health;

use axum::Router;
use tower_http::services::ServeDir;

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    Router::new()
        .merge(health::router())
        .merge(gpt_tts::router())
        .nest_service("/static", static_files)
        .with_state(state)
}
