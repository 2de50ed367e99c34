//! Testing utilities for arbor sites.
//!
//! - **TestClient** dispatches requests into a [`Site`](arbor_core::Site)
//!   without a transport
//! - **TestRequestBuilder** assembles query, form, cookie and header input
//! - **Spy** records calls, e.g. to prove a handler never ran
//! - **Assertions** for responses and resolution results
//!
//! ```
//! use arbor_core::*;
//! use arbor_testing::*;
//!
//! # tokio_test::block_on(async {
//! let spy = Spy::new();
//! let root = ResourceTable::builder()
//!     .leaf("hello", spy.page("hello", "Hello!"))
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(Site::new([root]));
//!
//! let response = client.get("/hello").await;
//! assert_status(&response, 200);
//! assert_body(&response, "Hello!");
//! assert!(spy.was_called("hello"));
//! assert_not_found(&client.get("/missing").await);
//! # });
//! ```

mod assertions;
mod spy;
mod test_client;

pub use assertions::{
    assert_body, assert_body_contains, assert_header, assert_json, assert_not_found,
    assert_redirect, assert_resolved, assert_status, assert_success, assert_unresolved,
};
pub use spy::Spy;
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};

pub use tokio::test as tokio_test;
