use axum::{
    Extension, async_trait,
    extract::FromRequestParts,
    http::{HeaderValue, Request, header::CACHE_CONTROL, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::logging::{LoggableUuid, SecurityEvent};
use crate::routes::AppState;
use crate::session::{AUTHENTICATED_USER_ID_KEY, FLASH_KEY, Session, SessionError};

pub const LOGIN_PATH: &str = "/user/login";
pub const LOGGED_OUT_FLASH: &str = "You've been logged out successfully!";

/// Identity of the account behind an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

/// Identity currently attached to the session, if any.
pub fn authenticated_user_id(session: &Session) -> Option<Uuid> {
    session.get(AUTHENTICATED_USER_ID_KEY)
}

/// Raises the session to authenticated. The token is renewed first; the
/// identity is only attached once the old token is gone from the store.
pub async fn log_in(session: &Session, user_id: Uuid) -> Result<(), SessionError> {
    session.renew_token().await?;
    session.put(AUTHENTICATED_USER_ID_KEY, user_id)?;
    Ok(())
}

/// Drops the session back to anonymous, renewing the token before the
/// identity is removed, and leaves a confirmation flash.
pub async fn log_out(session: &Session) -> Result<(), SessionError> {
    session.renew_token().await?;
    session.remove(AUTHENTICATED_USER_ID_KEY);
    session.put(FLASH_KEY, LOGGED_OUT_FLASH)?;
    Ok(())
}

/// Gate for routes that need posting rights. Anonymous visitors, and
/// sessions whose account no longer exists, are sent to the login page. A
/// stale identity is dropped under a freshly renewed token.
pub async fn require_authentication(
    Extension(state): Extension<AppState>,
    session: Session,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();

    let Some(user_id) = authenticated_user_id(&session) else {
        crate::log_security_event!(
            SecurityEvent::UnauthorizedAccess,
            path = %path,
            "Anonymous request to a protected route"
        );
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    if !state.users.exists(user_id).await? {
        crate::log_security_event!(
            SecurityEvent::UnauthorizedAccess,
            user_id = %LoggableUuid(user_id),
            path = %path,
            "Session refers to an account that no longer exists"
        );
        session.renew_token().await?;
        session.remove(AUTHENTICATED_USER_ID_KEY);
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    request.extensions_mut().insert(AuthenticatedUser(user_id));

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}
