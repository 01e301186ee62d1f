use axum::{
    Form, async_trait,
    extract::{FromRequest, Request, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
};

use crate::errors::AppError;
use crate::forms::{DecodeError, FormData, FromForm};

pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024; // 64 KiB upper bound for form bodies

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Url-encoded body decoded into a typed command.
///
/// Any structural problem (wrong content type, unreadable body, a value that
/// cannot be coerced) is rejected as `AppError::Decode`, which renders as
/// 400. Bodies over the configured limit are a 413. Content rules are left
/// to the command's own validation.
#[derive(Debug)]
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    T: FromForm + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        validate_content_type(req.headers())?;

        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(reject_form)?;

        let data = FormData::from_pairs(pairs);
        let command = T::from_form(&data).inspect_err(|err| {
            tracing::debug!(field = %err.field, kind = %err.kind, "Form decode failed");
        })?;

        Ok(ValidatedForm(command))
    }
}

fn reject_form(rejection: FormRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    DecodeError::malformed(rejection.body_text()).into()
}

fn validate_content_type(headers: &HeaderMap) -> Result<(), DecodeError> {
    let value = headers.get(CONTENT_TYPE);

    if let Some(value) = value
        && let Ok(value) = value.to_str()
        && value.starts_with(FORM_CONTENT_TYPE)
    {
        return Ok(());
    }

    let received = value
        .and_then(|val| val.to_str().ok())
        .unwrap_or("missing");
    Err(DecodeError::malformed(format!(
        "expected {FORM_CONTENT_TYPE}, received {received}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::SnippetCreateForm;
    use crate::forms::decoder::DecodeErrorKind;
    use axum::{body::Body, http::Request as HttpRequest};

    fn post(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = HttpRequest::builder().method("POST").uri("/snippet/create");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn extract(request: Request) -> Result<SnippetCreateForm, AppError> {
        ValidatedForm::<SnippetCreateForm>::from_request(request, &())
            .await
            .map(|ValidatedForm(form)| form)
    }

    #[tokio::test]
    async fn test_decodes_urlencoded_body() {
        let form = extract(post(
            Some(FORM_CONTENT_TYPE),
            "title=Hello+there&content=A%20snippet&expires=7",
        ))
        .await
        .unwrap();

        assert_eq!(form.title, "Hello there");
        assert_eq!(form.content, "A snippet");
        assert_eq!(form.expires, 7);
    }

    #[tokio::test]
    async fn test_rejects_non_form_content_type() {
        let err = extract(post(Some("application/json"), "{}")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Decode(DecodeError {
                kind: DecodeErrorKind::Malformed,
                ..
            })
        ));

        let err = extract(post(None, "title=x")).await.unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_decode_error() {
        let err = extract(post(
            Some(FORM_CONTENT_TYPE),
            "title=t&content=c&expires=forever",
        ))
        .await
        .unwrap_err();

        match err {
            AppError::Decode(decode) => {
                assert_eq!(decode.kind, DecodeErrorKind::TypeMismatch);
                assert_eq!(decode.field, "expires");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_fields_still_decode() {
        let form = extract(post(Some(FORM_CONTENT_TYPE), "")).await.unwrap();
        assert_eq!(form.title, "");
        assert_eq!(form.expires, 0);
    }
}
