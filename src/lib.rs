// Arbor - resource-tree request routing for Rust
//
// Requests are resolved by walking a tree of resources one path segment at
// a time, binding arguments to compiled signatures and running hook
// pipelines around each endpoint.

// Re-export core functionality
pub use arbor_core::*;

pub use async_trait::async_trait;
pub use serde;
pub use serde_json;

// Re-export optional crates
#[cfg(feature = "config")]
pub use arbor_config;

#[cfg(feature = "testing")]
pub use arbor_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BoundArgs,
        Context,
        Endpoint,
        Error,
        Input,
        Leaf,
        MapResource,
        MethodResolver,
        Next,
        Parameter,
        PathResolver,
        Redirect,
        Reply,
        Request,
        Resource,
        ResourceTable,
        Response,
        Scope,
        Signature,
        Site,
        Sticker,
        Transition,
        Value,
        decorator_fn,
        leaf_fn,
        post_fn,
        pre_fn,
        transition_fn,
    };
    pub use async_trait::async_trait;
}
