use super::decoder::{DecodeError, FormData, FromForm};
use super::validator::{Validator, max_chars, not_blank, permitted_value};

pub const TITLE_MAX_CHARS: usize = 100;
pub const PERMITTED_EXPIRY_DAYS: [i64; 3] = [1, 7, 365];
pub const DEFAULT_EXPIRY_DAYS: i64 = 365;

/// Submission from the snippet creation page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetCreateForm {
    pub title: String,
    pub content: String,
    pub expires: i64,
    pub validator: Validator,
}

impl Default for SnippetCreateForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            expires: DEFAULT_EXPIRY_DAYS,
            validator: Validator::default(),
        }
    }
}

impl FromForm for SnippetCreateForm {
    fn from_form(form: &FormData) -> Result<Self, DecodeError> {
        Ok(Self {
            title: form.text("title"),
            content: form.text("content"),
            expires: form.number("expires")?,
            validator: Validator::default(),
        })
    }
}

impl SnippetCreateForm {
    /// Runs every rule and returns whether the submission is acceptable.
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.title), "title", "This field cannot be blank");
        v.check_field(
            max_chars(&self.title, TITLE_MAX_CHARS),
            "title",
            "This field cannot be more than 100 characters long",
        );
        v.check_field(not_blank(&self.content), "content", "This field cannot be blank");
        v.check_field(
            permitted_value(&self.expires, &PERMITTED_EXPIRY_DAYS),
            "expires",
            "This field must equal 1, 7 or 365",
        );
        v.valid()
    }
}
