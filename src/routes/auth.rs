use std::{num::NonZeroU32, time::Duration};

use axum::{
    Extension, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use super::AppState;
use crate::errors::AppError;
use crate::forms::user::{DUPLICATE_EMAIL_MESSAGE, INVALID_CREDENTIALS_MESSAGE};
use crate::forms::{LoginForm, SignupForm};
use crate::logging::{LoggableUuid, SanitizedEmail, SanitizedName, SecurityEvent};
use crate::models::ModelError;
use crate::security::auth::{AuthenticatedUser, LOGIN_PATH, log_in, log_out, require_authentication};
use crate::security::form::ValidatedForm;
use crate::security::rate_limit::{RateLimiterState, enforce_rate_limit};
use crate::session::{FLASH_KEY, Session};
use crate::views::{Page, TemplateData, render};

pub const SIGNUP_SUCCESS_FLASH: &str = "Your signup was successful. Please log in.";
pub const AFTER_LOGIN_PATH: &str = "/snippet/create";

const SIGNUP_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const SIGNUP_WINDOW: Duration = Duration::from_secs(5 * 60);
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(10).unwrap();
const LOGIN_WINDOW: Duration = Duration::from_secs(60);

pub fn router(trust_proxy_headers: bool) -> Router {
    let logout = Router::new()
        .route("/user/logout", post(logout))
        .route_layer(middleware::from_fn(require_authentication));

    Router::new()
        .route(
            "/user/signup",
            get(signup_form).merge(post(signup).layer(middleware::from_fn_with_state(
                RateLimiterState::new(SIGNUP_BURST, SIGNUP_WINDOW)
                    .trust_proxy_headers(trust_proxy_headers),
                enforce_rate_limit,
            ))),
        )
        .route(
            "/user/login",
            get(login_form).merge(post(login).layer(middleware::from_fn_with_state(
                RateLimiterState::new(LOGIN_BURST, LOGIN_WINDOW)
                    .trust_proxy_headers(trust_proxy_headers),
                enforce_rate_limit,
            ))),
        )
        .merge(logout)
}

pub async fn signup_form(session: Session) -> Response {
    render(
        StatusCode::OK,
        Page::Signup(SignupForm::default()),
        TemplateData::from_session(&session),
    )
}

#[tracing::instrument(name = "signup_user", skip_all, fields(name, email))]
pub async fn signup(
    Extension(state): Extension<AppState>,
    session: Session,
    ValidatedForm(mut form): ValidatedForm<SignupForm>,
) -> Result<Response, AppError> {
    let span = tracing::Span::current();
    span.record("name", tracing::field::display(SanitizedName::new(&form.name)));
    span.record("email", tracing::field::display(SanitizedEmail::new(&form.email)));

    if !form.validate() {
        tracing::debug!(
            invalid_fields = ?form.validator.field_errors().keys().collect::<Vec<_>>(),
            "Signup failed validation"
        );
        return Ok(render(
            StatusCode::UNPROCESSABLE_ENTITY,
            Page::Signup(form),
            TemplateData::from_session(&session),
        ));
    }

    match state
        .users
        .insert(&form.name, &form.email, &form.password)
        .await
    {
        Ok(()) => {}
        Err(ModelError::DuplicateEmail) => {
            crate::log_security_event!(
                SecurityEvent::SignupFailure,
                email = %SanitizedEmail::new(&form.email),
                reason = "duplicate_email",
                "Signup rejected"
            );
            form.validator
                .add_field_error("email", DUPLICATE_EMAIL_MESSAGE);
            return Ok(render(
                StatusCode::UNPROCESSABLE_ENTITY,
                Page::Signup(form),
                TemplateData::from_session(&session),
            ));
        }
        Err(err) => return Err(err.into()),
    }

    crate::log_security_event!(
        SecurityEvent::SignupSuccess,
        name = %SanitizedName::new(&form.name),
        email = %SanitizedEmail::new(&form.email),
        "Account created"
    );

    session.put(FLASH_KEY, SIGNUP_SUCCESS_FLASH)?;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

pub async fn login_form(session: Session) -> Response {
    render(
        StatusCode::OK,
        Page::Login(LoginForm::default()),
        TemplateData::from_session(&session),
    )
}

#[tracing::instrument(name = "login_user", skip_all, fields(email, user_id))]
pub async fn login(
    Extension(state): Extension<AppState>,
    session: Session,
    ValidatedForm(mut form): ValidatedForm<LoginForm>,
) -> Result<Response, AppError> {
    tracing::Span::current().record(
        "email",
        tracing::field::display(SanitizedEmail::new(&form.email)),
    );

    if !form.validate() {
        return Ok(render(
            StatusCode::UNPROCESSABLE_ENTITY,
            Page::Login(form),
            TemplateData::from_session(&session),
        ));
    }

    let user_id = match state.users.authenticate(&form.email, &form.password).await {
        Ok(user_id) => user_id,
        Err(ModelError::InvalidCredentials) => {
            crate::log_security_event!(
                SecurityEvent::LoginFailure,
                email = %SanitizedEmail::new(&form.email),
                "Login failed: invalid credentials"
            );
            form.validator
                .add_non_field_error(INVALID_CREDENTIALS_MESSAGE);
            return Ok(render(
                StatusCode::UNPROCESSABLE_ENTITY,
                Page::Login(form),
                TemplateData::from_session(&session),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::Span::current().record("user_id", tracing::field::display(LoggableUuid(user_id)));

    log_in(&session, user_id).await?;

    crate::log_security_event!(
        SecurityEvent::LoginSuccess,
        user_id = %LoggableUuid(user_id),
        email = %SanitizedEmail::new(&form.email),
        "User logged in"
    );

    Ok(Redirect::to(AFTER_LOGIN_PATH).into_response())
}

pub async fn logout(
    session: Session,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, AppError> {
    log_out(&session).await?;

    crate::log_security_event!(
        SecurityEvent::Logout,
        user_id = %LoggableUuid(user_id),
        "User logged out"
    );

    Ok(Redirect::to("/").into_response())
}
