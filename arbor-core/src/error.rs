// Error types for the arbor dispatcher

use crate::{HttpStatus, Request, Response};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Control signals, recovered inside the resolver and the site loop
    #[error("no routable child named `{0}`")]
    ChildNotFound(String),

    #[error("node is out of scope")]
    OutOfScope,

    #[error("signature mismatch: {0}")]
    SignatureMismatch(String),

    #[error("internal redirect: {0:?}")]
    InternalRedirect(Arc<dyn InternalRedirect>),

    // Failures with their own wire rendering
    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed { allowed: Vec<String> },

    #[error("Forbidden")]
    Forbidden,

    #[error("redirect to {}", .0.location)]
    Redirect(Redirect),

    #[error("Internal server error: {0}")]
    Internal(String),

    // Engine errors
    #[error("redirect loop detected after {0} internal redirects")]
    RedirectLoop(usize),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Handler error: {0}")]
    Handler(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a binding failure.
    pub fn mismatch(reason: impl Into<String>) -> Self {
        Error::SignatureMismatch(reason.into())
    }

    /// Rewrite the request path and restart resolution.
    pub fn rewrite(path: impl Into<String>) -> Self {
        Error::InternalRedirect(Arc::new(PathRewrite::new(path)))
    }

    /// Wrap any error raised by handler code.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Handler(Box::new(err))
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ChildNotFound(_)
            | Error::OutOfScope
            | Error::SignatureMismatch(_)
            | Error::NotFound => HttpStatus::NotFound.code(),
            Error::MethodNotAllowed { .. } => HttpStatus::MethodNotAllowed.code(),
            Error::Forbidden => HttpStatus::Forbidden.code(),
            Error::Redirect(redirect) => redirect.status,
            _ => HttpStatus::InternalServerError.code(),
        }
    }

    /// Signals that only steer resolution and never reach the client.
    pub fn is_control_signal(&self) -> bool {
        matches!(
            self,
            Error::ChildNotFound(_)
                | Error::OutOfScope
                | Error::SignatureMismatch(_)
                | Error::InternalRedirect(_)
        )
    }

    /// Failures that carry their own status and headers contract.
    pub fn is_web_failure(&self) -> bool {
        matches!(
            self,
            Error::NotFound
                | Error::MethodNotAllowed { .. }
                | Error::Forbidden
                | Error::Redirect(_)
                | Error::Internal(_)
        )
    }

    /// Wire rendering used when no custom error page takes over.
    ///
    /// Internal details never appear in the body.
    pub fn default_response(&self) -> Response {
        match self {
            Error::Redirect(redirect) => redirect.default_response(),
            Error::MethodNotAllowed { allowed } => {
                let response = error_page(HttpStatus::MethodNotAllowed, "405 Method Not Allowed");
                if allowed.is_empty() {
                    response
                } else {
                    response.with_header("Allow", allowed.join(", "))
                }
            }
            Error::Forbidden => error_page(HttpStatus::Forbidden, "403 Forbidden"),
            Error::NotFound
            | Error::ChildNotFound(_)
            | Error::OutOfScope
            | Error::SignatureMismatch(_) => {
                error_page(HttpStatus::NotFound, "404 Page Not Found")
            }
            _ => error_page(
                HttpStatus::InternalServerError,
                "500 Internal Server Error",
            ),
        }
    }
}

fn error_page(status: HttpStatus, title: &str) -> Response {
    Response::html(
        status.code(),
        format!(
            "<!DOCTYPE html><html><head><title>{title}</title></head>\
             <body><h1>{title}</h1></body></html>"
        ),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Client-visible redirect (3xx with a `Location` header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: u16,
    pub reason: String,
    /// Rendered as a `Set-Cookie` header when present.
    pub cookie: Option<String>,
}

impl Redirect {
    pub fn new(location: impl Into<String>, status: HttpStatus) -> Self {
        Self {
            location: location.into(),
            status: status.code(),
            reason: status.reason().to_string(),
            cookie: None,
        }
    }

    pub fn moved_permanently(location: impl Into<String>) -> Self {
        Self::new(location, HttpStatus::MovedPermanently)
    }

    pub fn found(location: impl Into<String>) -> Self {
        Self::new(location, HttpStatus::Found)
    }

    pub fn see_other(location: impl Into<String>) -> Self {
        Self::new(location, HttpStatus::SeeOther)
    }

    pub fn temporary(location: impl Into<String>) -> Self {
        Self::new(location, HttpStatus::TemporaryRedirect)
    }

    /// 303 sent after a non-idempotent action, optionally setting a cookie
    /// (the usual ending of a login form).
    pub fn completion(location: impl Into<String>, cookie: Option<String>) -> Self {
        Self {
            cookie,
            ..Self::see_other(location)
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn status_line(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }

    pub fn default_response(&self) -> Response {
        let line = escape_html(&self.status_line());
        let href = escape_html(&self.location);
        let mut response = Response::html(
            self.status,
            format!(
                "<!DOCTYPE html><html><head><title>{line}</title></head>\
                 <body><h1>{line}</h1><a href=\"{href}\">Follow</a></body></html>"
            ),
        )
        .with_header("Location", self.location.clone());
        if let Some(cookie) = &self.cookie {
            response = response.with_header("Set-Cookie", cookie.clone());
        }
        response
    }
}

impl From<Redirect> for Error {
    fn from(redirect: Redirect) -> Self {
        Error::Redirect(redirect)
    }
}

/// Recoverable signal that mutates the request and restarts resolution
/// from the first root.
pub trait InternalRedirect: fmt::Debug + Send + Sync {
    fn update_request(&self, request: &mut Request);
}

/// Internal redirect to another path of the same site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    pub new_path: String,
}

impl PathRewrite {
    pub fn new(new_path: impl Into<String>) -> Self {
        Self {
            new_path: new_path.into(),
        }
    }
}

impl InternalRedirect for PathRewrite {
    fn update_request(&self, request: &mut Request) {
        request.set_uri(self.new_path.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::NotFound.status_code(), 404);
        assert_eq!(Error::MethodNotAllowed { allowed: vec![] }.status_code(), 405);
        assert_eq!(Error::Forbidden.status_code(), 403);
        assert_eq!(Error::Internal("boom".into()).status_code(), 500);
        assert_eq!(Error::RedirectLoop(10).status_code(), 500);
        assert_eq!(Error::from(Redirect::found("/x")).status_code(), 302);
    }

    #[test]
    fn test_classification() {
        assert!(Error::OutOfScope.is_control_signal());
        assert!(Error::rewrite("/x").is_control_signal());
        assert!(!Error::NotFound.is_control_signal());
        assert!(Error::NotFound.is_web_failure());
        assert!(!Error::RedirectLoop(3).is_web_failure());
        assert!(!Error::Configuration("x".into()).is_web_failure());
    }

    #[test]
    fn test_not_found_page() {
        let response = Error::NotFound.default_response();
        assert_eq!(response.status, 404);
        assert_eq!(response.header("Content-Type"), Some("text/html"));
        assert!(response.body_str().unwrap().contains("<h1>404 Page Not Found</h1>"));
    }

    #[test]
    fn test_internal_page_hides_details() {
        let response = Error::Internal("database password is hunter2".into()).default_response();
        assert_eq!(response.status, 500);
        assert!(!response.body_str().unwrap().contains("hunter2"));
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let err = Error::MethodNotAllowed {
            allowed: vec!["GET".into(), "PUT".into()],
        };
        let response = err.default_response();
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("GET, PUT"));
    }

    #[test]
    fn test_redirect_page() {
        let response = Redirect::see_other("/done?a=1&b=2").default_response();
        assert_eq!(response.status, 303);
        assert_eq!(response.header("Location"), Some("/done?a=1&b=2"));
        let body = response.body_str().unwrap();
        assert!(body.contains("<title>303 See Other</title>"));
        assert!(body.contains("href=\"/done?a=1&amp;b=2\""));
        assert!(response.header("Set-Cookie").is_none());
    }

    #[test]
    fn test_completion_redirect_sets_cookie() {
        let redirect = Redirect::completion("/home", Some("sid=abc; Path=/".into()));
        let response = redirect.default_response();
        assert_eq!(response.status, 303);
        assert_eq!(response.header("Set-Cookie"), Some("sid=abc; Path=/"));
    }

    #[test]
    fn test_path_rewrite_updates_request() {
        let mut req = Request::get("/forum?id=3");
        PathRewrite::new("/forums").update_request(&mut req);
        assert_eq!(req.uri(), "/forums");
        assert_eq!(req.path(), "/forums");
        assert!(req.form_arguments().is_empty());
    }
}
