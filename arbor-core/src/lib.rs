// Core library for arbor resource-tree routing
// Scope-aware traversal, compiled argument binding, hook pipelines and dispatch

pub mod context;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod logging;
pub mod reply;
pub mod resolver;
pub mod resource;
pub mod scope;
pub mod signature;
pub mod site;
pub mod status;
pub mod sticker;
pub mod value;

// Re-export commonly used types
pub use context::*;
pub use endpoint::*;
pub use error::*;
pub use http::*;
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, Rotation};
pub use reply::*;
pub use resolver::*;
pub use resource::*;
pub use scope::*;
pub use signature::*;
pub use site::*;
pub use status::*;
pub use sticker::*;
pub use value::*;
