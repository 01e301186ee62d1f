use std::fmt;

use super::decoder::{DecodeError, FormData, FromForm};
use super::validator::{EMAIL_RX, Validator, matches, max_chars, min_chars, not_blank};

pub const NAME_MAX_CHARS: usize = 255;
pub const EMAIL_MAX_CHARS: usize = 255;
pub const PASSWORD_MIN_CHARS: usize = 8;

pub const DUPLICATE_EMAIL_MESSAGE: &str = "Email address is already in use";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Email or password is incorrect";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub validator: Validator,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("validator", &self.validator)
            .finish()
    }
}

impl FromForm for SignupForm {
    fn from_form(form: &FormData) -> Result<Self, DecodeError> {
        Ok(Self {
            name: form.text("name"),
            email: form.text("email"),
            password: form.text("password"),
            validator: Validator::default(),
        })
    }
}

impl SignupForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.name), "name", "This field cannot be blank");
        v.check_field(
            max_chars(&self.name, NAME_MAX_CHARS),
            "name",
            "This field cannot be more than 255 characters long",
        );
        v.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        v.check_field(
            matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        v.check_field(
            max_chars(&self.email, EMAIL_MAX_CHARS),
            "email",
            "This field cannot be more than 255 characters long",
        );
        v.check_field(not_blank(&self.password), "password", "This field cannot be blank");
        v.check_field(
            min_chars(&self.password, PASSWORD_MIN_CHARS),
            "password",
            "This field must be at least 8 characters long",
        );
        v.valid()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub validator: Validator,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("validator", &self.validator)
            .finish()
    }
}

impl FromForm for LoginForm {
    fn from_form(form: &FormData) -> Result<Self, DecodeError> {
        Ok(Self {
            email: form.text("email"),
            password: form.text("password"),
            validator: Validator::default(),
        })
    }
}

impl LoginForm {
    pub fn validate(&mut self) -> bool {
        let v = &mut self.validator;
        v.check_field(not_blank(&self.email), "email", "This field cannot be blank");
        v.check_field(
            matches(&self.email, &EMAIL_RX),
            "email",
            "This field must be a valid email address",
        );
        v.check_field(not_blank(&self.password), "password", "This field cannot be blank");
        v.valid()
    }
}
