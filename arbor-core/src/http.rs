// Request and response types exchanged with the transport adapter

use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Content type whose body contributes to [`Request::form_arguments`].
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Incoming request as supplied by the transport adapter.
///
/// The adapter fills in the method, the raw request URI, the content type,
/// the cookie header and the body. Everything derived from those
/// (path, query arguments, form arguments, cookies) is parsed lazily and
/// cached until [`Request::set_uri`] replaces the URI.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    uri: String,
    pub content_type: Option<String>,
    pub cookie: Option<String>,
    pub body: Bytes,
    pub headers: HashMap<String, String>,
    parsed: OnceLock<ParsedUri>,
    form: OnceLock<BTreeMap<String, String>>,
    multi: OnceLock<BTreeMap<String, Vec<String>>>,
    cookies: OnceLock<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ParsedUri {
    path: String,
    query: String,
}

impl Request {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            content_type: None,
            cookie: None,
            body: Bytes::new(),
            headers: HashMap::new(),
            parsed: OnceLock::new(),
            form: OnceLock::new(),
            multi: OnceLock::new(),
            cookies: OnceLock::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Replace the request URI, dropping every value derived from the old one.
    pub fn set_uri(&mut self, uri: impl Into<String>) {
        self.uri = uri.into();
        self.parsed = OnceLock::new();
        self.form = OnceLock::new();
        self.multi = OnceLock::new();
    }

    pub fn path(&self) -> &str {
        &self.parsed_uri().path
    }

    pub fn query(&self) -> &str {
        &self.parsed_uri().query
    }

    fn parsed_uri(&self) -> &ParsedUri {
        self.parsed.get_or_init(|| parse_uri(&self.uri))
    }

    /// Query string arguments merged with a url-encoded form body.
    ///
    /// When a key repeats, the last occurrence wins. Pairs with an empty
    /// value are dropped.
    pub fn form_arguments(&self) -> &BTreeMap<String, String> {
        self.form
            .get_or_init(|| self.argument_pairs().into_iter().collect())
    }

    /// Same sources as [`Request::form_arguments`], keeping every value.
    pub fn multi_arguments(&self) -> &BTreeMap<String, Vec<String>> {
        self.multi.get_or_init(|| {
            let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (key, value) in self.argument_pairs() {
                map.entry(key).or_default().push(value);
            }
            map
        })
    }

    /// Cookies parsed from the `Cookie` header value.
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        self.cookies
            .get_or_init(|| parse_cookies(self.cookie.as_deref().unwrap_or("")))
    }

    fn has_form_body(&self) -> bool {
        let Some(content_type) = self.content_type.as_deref() else {
            return false;
        };
        let media_type = content_type.split(';').next().unwrap_or("").trim();
        media_type.eq_ignore_ascii_case(FORM_CONTENT_TYPE) && !self.body.is_empty()
    }

    fn argument_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(self.query()).unwrap_or_default();
        if self.has_form_body() {
            let body: Vec<(String, String)> =
                serde_urlencoded::from_bytes(&self.body).unwrap_or_default();
            pairs.extend(body);
        }
        pairs.retain(|(_, value)| !value.is_empty());
        pairs
    }
}

fn parse_uri(uri: &str) -> ParsedUri {
    let rest = match absolute_form_target(uri) {
        Some(target) => target,
        None => uri,
    };
    let rest = rest.split('#').next().unwrap_or("");
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, query),
        None => (rest, ""),
    };
    ParsedUri {
        path: path.to_string(),
        query: query.to_string(),
    }
}

/// Path and query of an absolute-form URI (`scheme://authority/path?query`).
///
/// Returns `None` for origin-form targets, including ones whose query
/// happens to contain `://`.
fn absolute_form_target(uri: &str) -> Option<&str> {
    let (scheme, after) = uri.split_once("://")?;
    if !is_scheme(scheme) {
        return None;
    }
    Some(match after.find(['/', '?', '#']) {
        Some(start) => &after[start..],
        None => "",
    })
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_cookies(header: &str) -> BTreeMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Final `(status, headers, body)` triple handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    /// HTML page with a `Content-Type: text/html` header.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("Content-Type", "text/html")
            .with_body(body.into())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First header with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
