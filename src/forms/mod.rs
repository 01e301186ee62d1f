//! Typed commands decoded from url-encoded submissions.
//!
//! A submission goes through two separate gates. Decoding (`FromForm`) only
//! fails when the request itself is malformed and maps to a 400. Validation
//! (`validate`) records user-correctable problems on the command's
//! `Validator` so the page can be rendered again with the submitted values.

pub mod decoder;
pub mod snippet;
pub mod user;
pub mod validator;

pub use decoder::{DecodeError, FormData, FromForm};
pub use snippet::SnippetCreateForm;
pub use user::{LoginForm, SignupForm};
pub use validator::Validator;
