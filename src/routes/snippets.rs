use axum::{
    Extension, Router,
    extract::Path,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use super::AppState;
use crate::errors::AppError;
use crate::forms::SnippetCreateForm;
use crate::logging::LoggableUuid;
use crate::security::auth::{AuthenticatedUser, require_authentication};
use crate::security::form::ValidatedForm;
use crate::session::{FLASH_KEY, Session};
use crate::views::{Page, TemplateData, render};

pub const SNIPPET_CREATED_FLASH: &str = "Snippet successfully created!";

pub fn router() -> Router {
    let protected = Router::new()
        .route(
            "/snippet/create",
            get(create_snippet_form).post(create_snippet),
        )
        .route_layer(middleware::from_fn(require_authentication));

    Router::new()
        .route("/", get(home))
        .route("/snippet/view/:id", get(view_snippet))
        .route("/ping", get(ping))
        .merge(protected)
}

pub async fn home(
    Extension(state): Extension<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let snippets = state.snippets.latest().await?;

    Ok(render(
        StatusCode::OK,
        Page::Home(snippets),
        TemplateData::from_session(&session),
    ))
}

pub async fn view_snippet(
    Extension(state): Extension<AppState>,
    session: Session,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = raw_id
        .parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or(AppError::NotFound)?;

    let snippet = state.snippets.get(id).await?;

    Ok(render(
        StatusCode::OK,
        Page::View(snippet),
        TemplateData::from_session(&session),
    ))
}

pub async fn create_snippet_form(session: Session) -> Response {
    render(
        StatusCode::OK,
        Page::Create(SnippetCreateForm::default()),
        TemplateData::from_session(&session),
    )
}

#[tracing::instrument(name = "create_snippet", skip_all, fields(user_id, snippet_id))]
pub async fn create_snippet(
    Extension(state): Extension<AppState>,
    session: Session,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ValidatedForm(mut form): ValidatedForm<SnippetCreateForm>,
) -> Result<Response, AppError> {
    tracing::Span::current().record("user_id", tracing::field::display(LoggableUuid(user_id)));

    if !form.validate() {
        tracing::debug!(
            invalid_fields = ?form.validator.field_errors().keys().collect::<Vec<_>>(),
            "Snippet submission failed validation"
        );
        return Ok(render(
            StatusCode::UNPROCESSABLE_ENTITY,
            Page::Create(form),
            TemplateData::from_session(&session),
        ));
    }

    let id = state
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;
    tracing::Span::current().record("snippet_id", id);

    session.put(FLASH_KEY, SNIPPET_CREATED_FLASH)?;
    tracing::info!(expires_days = form.expires, "Snippet created");

    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}

pub async fn ping() -> &'static str {
    "OK"
}
