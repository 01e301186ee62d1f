//! Server-rendered pages.
//!
//! Handlers choose a `Page` and hand it to `render` together with the
//! per-request `TemplateData`. Forms are rendered from the command object
//! itself, so a failed submission shows the values the user typed next to
//! the errors recorded on its validator.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::{DateTime, Datelike, Utc};
use maud::{DOCTYPE, Markup, html};

use crate::forms::{LoginForm, SignupForm, SnippetCreateForm, Validator};
use crate::models::Snippet;
use crate::security::auth::authenticated_user_id;
use crate::session::{FLASH_KEY, Session};

#[derive(Debug, Clone)]
pub enum Page {
    Home(Vec<Snippet>),
    View(Snippet),
    Create(SnippetCreateForm),
    Signup(SignupForm),
    Login(LoginForm),
}

impl Page {
    pub fn template_name(&self) -> &'static str {
        match self {
            Page::Home(_) => "home",
            Page::View(_) => "view",
            Page::Create(_) => "create",
            Page::Signup(_) => "signup",
            Page::Login(_) => "login",
        }
    }

    fn title(&self) -> String {
        match self {
            Page::Home(_) => "Home".to_string(),
            Page::View(snippet) => format!("Snippet #{}", snippet.id),
            Page::Create(_) => "Create a New Snippet".to_string(),
            Page::Signup(_) => "Signup".to_string(),
            Page::Login(_) => "Login".to_string(),
        }
    }
}

/// Values every page layout needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    pub current_year: i32,
    pub flash: Option<String>,
    pub is_authenticated: bool,
}

impl TemplateData {
    /// Consumes the pending flash message, if any.
    pub fn from_session(session: &Session) -> Self {
        Self {
            current_year: Utc::now().year(),
            flash: session.pop(FLASH_KEY),
            is_authenticated: authenticated_user_id(session).is_some(),
        }
    }
}

pub fn render(status: StatusCode, page: Page, data: TemplateData) -> Response {
    tracing::debug!(template = page.template_name(), status = %status, "Rendering page");
    let markup = layout(&page, &data);
    (status, Html(markup.into_string())).into_response()
}

fn layout(page: &Page, data: &TemplateData) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (page.title()) " - Snipshare" }
            }
            body {
                header { h1 { a href="/" { "Snipshare" } } }
                (nav(data))
                main {
                    @if let Some(flash) = &data.flash {
                        div.flash { (flash) }
                    }
                    (content(page))
                }
                footer { "Powered by Rust in " (data.current_year.to_string()) }
            }
        }
    }
}

fn nav(data: &TemplateData) -> Markup {
    html! {
        nav {
            div {
                a href="/" { "Home" }
                @if data.is_authenticated {
                    " " a href="/snippet/create" { "Create snippet" }
                }
            }
            div {
                @if data.is_authenticated {
                    form action="/user/logout" method="POST" {
                        button { "Logout" }
                    }
                } @else {
                    a href="/user/signup" { "Signup" }
                    " "
                    a href="/user/login" { "Login" }
                }
            }
        }
    }
}

fn content(page: &Page) -> Markup {
    match page {
        Page::Home(snippets) => home(snippets),
        Page::View(snippet) => view(snippet),
        Page::Create(form) => create(form),
        Page::Signup(form) => signup(form),
        Page::Login(form) => login(form),
    }
}

fn human_date(at: &DateTime<Utc>) -> String {
    at.format("%d %b %Y at %H:%M").to_string()
}

fn home(snippets: &[Snippet]) -> Markup {
    html! {
        h2 { "Latest Snippets" }
        @if snippets.is_empty() {
            p { "There's nothing to see here... yet!" }
        } @else {
            table {
                tr { th { "Title" } th { "Created" } th { "ID" } }
                @for snippet in snippets {
                    tr {
                        td { a href={ "/snippet/view/" (snippet.id.to_string()) } { (snippet.title) } }
                        td { (human_date(&snippet.created)) }
                        td { "#" (snippet.id.to_string()) }
                    }
                }
            }
        }
    }
}

fn view(snippet: &Snippet) -> Markup {
    html! {
        div.snippet {
            div.metadata {
                strong { (snippet.title) }
                span { "#" (snippet.id.to_string()) }
            }
            pre { code { (snippet.content) } }
            div.metadata {
                time { "Created: " (human_date(&snippet.created)) }
                time { "Expires: " (human_date(&snippet.expires)) }
            }
        }
    }
}

fn field_error(validator: &Validator, field: &str) -> Markup {
    html! {
        @if let Some(message) = validator.field_error(field) {
            label.error { (message) }
        }
    }
}

fn non_field_errors(validator: &Validator) -> Markup {
    html! {
        @for message in validator.non_field_errors() {
            div.error { (message) }
        }
    }
}

fn create(form: &SnippetCreateForm) -> Markup {
    let v = &form.validator;
    html! {
        form action="/snippet/create" method="POST" {
            div {
                label { "Title:" }
                (field_error(v, "title"))
                input type="text" name="title" value=(form.title);
            }
            div {
                label { "Content:" }
                (field_error(v, "content"))
                textarea name="content" { (form.content) }
            }
            div {
                label { "Delete in:" }
                (field_error(v, "expires"))
                input type="radio" name="expires" value="365" checked[form.expires == 365]; " One Year "
                input type="radio" name="expires" value="7" checked[form.expires == 7]; " One Week "
                input type="radio" name="expires" value="1" checked[form.expires == 1]; " One Day"
            }
            div { input type="submit" value="Publish snippet"; }
        }
    }
}

fn signup(form: &SignupForm) -> Markup {
    let v = &form.validator;
    html! {
        form action="/user/signup" method="POST" novalidate {
            (non_field_errors(v))
            div {
                label { "Name:" }
                (field_error(v, "name"))
                input type="text" name="name" value=(form.name);
            }
            div {
                label { "Email:" }
                (field_error(v, "email"))
                input type="email" name="email" value=(form.email);
            }
            div {
                label { "Password:" }
                (field_error(v, "password"))
                input type="password" name="password";
            }
            div { input type="submit" value="Signup"; }
        }
    }
}

fn login(form: &LoginForm) -> Markup {
    let v = &form.validator;
    html! {
        form action="/user/login" method="POST" novalidate {
            (non_field_errors(v))
            div {
                label { "Email:" }
                (field_error(v, "email"))
                input type="email" name="email" value=(form.email);
            }
            div {
                label { "Password:" }
                (field_error(v, "password"))
                input type="password" name="password";
            }
            div { input type="submit" value="Login"; }
        }
    }
}
