// Test client driving a site without a transport

use arbor_core::{Error, FORM_CONTENT_TYPE, Reply, Request, Response, Site};
use std::sync::Arc;

/// Dispatches requests straight into a [`Site`].
#[derive(Clone)]
pub struct TestClient {
    site: Arc<Site>,
}

impl TestClient {
    pub fn new(site: Site) -> Self {
        Self {
            site: Arc::new(site),
        }
    }

    pub fn from_arc(site: Arc<Site>) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request("GET", uri).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = fields
            .iter()
            .fold(TestRequestBuilder::new("POST", uri), |builder, (k, v)| {
                builder.form(k, v)
            })
            .build();
        self.send(request).await
    }

    /// Make a request with a custom method
    pub async fn request(&self, method: &str, uri: &str) -> TestResponse {
        self.send(Request::new(method, uri)).await
    }

    /// Full dispatch, including failure rendering.
    pub async fn send(&self, request: Request) -> TestResponse {
        TestResponse::new(self.site.dispatch(request).await)
    }

    /// Single resolution attempt; failures come back as errors.
    pub async fn resolve(&self, request: Request) -> Result<Reply, Error> {
        self.site.resolve(request).await
    }

    /// Resolve `GET uri` and return the reply text.
    pub async fn resolve_text(&self, uri: &str) -> Result<String, Error> {
        let reply = self.resolve(Request::get(uri)).await?;
        Ok(reply.as_text().unwrap_or_default().to_string())
    }
}

/// Builder for test requests
pub struct TestRequestBuilder {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<String>,
}

impl TestRequestBuilder {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            query: Vec::new(),
            form: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a query argument, percent-encoded.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a url-encoded form field. Replaces any raw body.
    pub fn form(mut self, key: &str, value: &str) -> Self {
        self.form.push((key.to_string(), value.to_string()));
        self
    }

    /// Raw body with its content type.
    pub fn body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Request {
        let mut uri = self.path;
        if !self.query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            uri.push_str(&encode(&self.query));
        }

        let mut request = Request::new(self.method, uri);
        for (key, value) in self.headers {
            request = request.with_header(key, value);
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            request = request.with_cookie(cookie);
        }
        if !self.form.is_empty() {
            request = request
                .with_content_type(FORM_CONTENT_TYPE)
                .with_body(encode(&self.form));
        } else if let (Some(content_type), Some(body)) = (self.content_type, self.body) {
            request = request.with_content_type(content_type).with_body(body);
        }
        request
    }
}

fn encode(pairs: &[(String, String)]) -> String {
    // Serializing string pairs cannot fail.
    serde_urlencoded::to_string(pairs).unwrap_or_default()
}

/// Response from a test dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResponse {
    response: Response,
}

impl TestResponse {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.response.header(key)
    }

    pub fn body_string(&self) -> Option<String> {
        self.response.body_str().map(str::to_string)
    }

    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_slice(&self.response.body)
            .map_err(|e| format!("Deserialization error: {e}"))
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
