use std::fmt;
use uuid::Uuid;

/// Email address with the local part masked.
#[derive(Debug, Clone)]
pub struct SanitizedEmail(String);

impl SanitizedEmail {
    pub fn new(email: impl AsRef<str>) -> Self {
        Self(Self::sanitize(email.as_ref()))
    }

    fn sanitize(email: &str) -> String {
        let Some((local, domain)) = email.trim().split_once('@') else {
            return "***@***".to_string();
        };

        let mut chars = local.chars();
        match (chars.next(), local.chars().count()) {
            (Some(first), count) if count > 2 => format!("{first}***@{domain}"),
            (_, count) => format!("{}@{domain}", "*".repeat(count)),
        }
    }
}

impl fmt::Display for SanitizedEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display name reduced to its first and last character.
#[derive(Debug, Clone)]
pub struct SanitizedName(String);

impl SanitizedName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Self::sanitize(name.as_ref().trim()))
    }

    fn sanitize(name: &str) -> String {
        let count = name.chars().count();
        match (name.chars().next(), name.chars().last()) {
            (Some(first), Some(last)) if count > 4 => format!("{first}***{last}"),
            (Some(first), _) if count > 2 => format!("{first}***"),
            _ => "*".repeat(count),
        }
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account identifiers are opaque and safe to log as-is.
#[derive(Debug, Clone, Copy)]
pub struct LoggableUuid(pub Uuid);

impl fmt::Display for LoggableUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LoggableUuid {
    fn from(uuid: Uuid) -> Self {
        LoggableUuid(uuid)
    }
}

/// IP address with the last segment masked.
#[derive(Debug, Clone)]
pub struct SanitizedIpAddr(String);

impl SanitizedIpAddr {
    pub fn new(ip: impl fmt::Display) -> Self {
        Self(Self::sanitize(&ip.to_string()))
    }

    fn sanitize(ip: &str) -> String {
        if let Some((prefix, _)) = ip.rsplit_once('.') {
            format!("{prefix}.***")
        } else if let Some((prefix, _)) = ip.rsplit_once(':') {
            format!("{prefix}:****")
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Display for SanitizedIpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    LoginSuccess,
    LoginFailure,
    SignupSuccess,
    SignupFailure,
    Logout,
    UnauthorizedAccess,
    RateLimitExceeded,
    SessionStoreFailure,
}

impl SecurityEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEvent::LoginSuccess => "login_success",
            SecurityEvent::LoginFailure => "login_failure",
            SecurityEvent::SignupSuccess => "signup_success",
            SecurityEvent::SignupFailure => "signup_failure",
            SecurityEvent::Logout => "logout",
            SecurityEvent::UnauthorizedAccess => "unauthorized_access",
            SecurityEvent::RateLimitExceeded => "rate_limit_exceeded",
            SecurityEvent::SessionStoreFailure => "session_store_failure",
        }
    }

    /// Critical events are logged at `warn` rather than `info`.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            SecurityEvent::LoginFailure
                | SecurityEvent::UnauthorizedAccess
                | SecurityEvent::RateLimitExceeded
                | SecurityEvent::SessionStoreFailure
        )
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log a security event with sanitized context
#[macro_export]
macro_rules! log_security_event {
    ($event:expr, $($field:tt)*) => {
        if $event.is_critical() {
            tracing::warn!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        } else {
            tracing::info!(
                security_event = %$event,
                event_type = "security",
                $($field)*
            );
        }
    };
}
