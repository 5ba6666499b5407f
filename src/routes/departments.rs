use axum::routing::get;
use axum::Router;

use crate::corpus::departments::DEPARTMENTS;
use crate::response::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_departments))
}

async fn list_departments() -> impl axum::response::IntoResponse {
    ok(DEPARTMENTS)
}
