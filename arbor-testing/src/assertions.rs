// Test assertions for dispatched responses and resolution results

use crate::TestResponse;
use arbor_core::{Error, Reply};

/// Assert that a response has a specific status code
pub fn assert_status(response: &TestResponse, expected: u16) {
    let actual = response.status();
    assert_eq!(actual, expected, "Expected status {expected}, got {actual}");
}

pub fn assert_body(response: &TestResponse, expected: &str) {
    let actual = response.body_string();
    assert_eq!(
        actual.as_deref(),
        Some(expected),
        "Expected body {expected:?}, got {actual:?}"
    );
}

pub fn assert_body_contains(response: &TestResponse, expected: &str) {
    let body = response.body_string().unwrap_or_default();
    assert!(
        body.contains(expected),
        "Expected body to contain '{expected}', but it didn't. Body: {body}"
    );
}

/// Assert that a response has a specific header
pub fn assert_header(response: &TestResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{key}' to be '{expected}', got {actual:?}"
    );
}

/// Assert that a response body contains JSON matching expected value
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = response
        .body_json()
        .expect("Failed to deserialize response body");
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

/// Assert a 2xx status
pub fn assert_success(response: &TestResponse) {
    let status = response.status();
    assert!(
        (200..300).contains(&status),
        "Expected successful status (2xx), got {status}"
    );
}

pub fn assert_not_found(response: &TestResponse) {
    assert_status(response, 404);
}

/// Assert a client redirect to `location`.
pub fn assert_redirect(response: &TestResponse, status: u16, location: &str) {
    assert_status(response, status);
    assert_header(response, "Location", location);
}

/// Assert that resolution produced a text reply equal to `expected`.
pub fn assert_resolved(result: &Result<Reply, Error>, expected: &str) {
    match result {
        Ok(reply) => assert_eq!(
            reply.as_text(),
            Some(expected),
            "Expected reply {expected:?}, got {reply:?}"
        ),
        Err(err) => panic!("Expected reply {expected:?}, got error: {err:?}"),
    }
}

/// Assert that resolution found nothing to answer the request.
pub fn assert_unresolved(result: &Result<Reply, Error>) {
    assert!(
        matches!(result, Err(Error::NotFound)),
        "Expected NotFound, got {result:?}"
    );
}
