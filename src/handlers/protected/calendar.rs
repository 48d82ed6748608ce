// handlers/protected/calendar.rs - GET /api/calendar.ics

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Extension,
};

use crate::domain::Actor;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/calendar.ics - iCalendar feed of open tasks with a due date
pub async fn feed(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.calendar().feed(&actor).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"tasks.ics\""),
        ],
        body,
    ))
}
