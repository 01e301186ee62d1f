use std::convert::Infallible;

use axum::{
    http::{HeaderValue, Request, header::HeaderName},
    middleware::Next,
    response::Response,
};

const SECURITY_HEADERS: [(&str, &str); 5] = [
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com; frame-ancestors 'none'; form-action 'self'",
    ),
    ("referrer-policy", "origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "0"),
];

pub async fn set_security_headers(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Infallible> {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    Ok(response)
}
