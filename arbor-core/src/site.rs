//! The dispatch entry point.
//!
//! A [`Site`] owns an ordered list of root resources. Each request is tried
//! against every root in turn with a fresh [`Context`]; the first root that
//! does not fall out of scope answers. Internal redirects mutate the request
//! and restart from the first root, up to a configurable bound.

use crate::logging::{debug, error, trace, warn};
use crate::resolver::path_segments;
use crate::{Context, Error, Reply, Request, Resource, Response, Scope, StickerTable, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Internal redirects followed before a dispatch gives up.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Custom rendering of failures, replacing [`Error::default_response`].
#[async_trait]
pub trait ErrorPage: Send + Sync {
    async fn render(&self, request: &Request, error: &Error) -> Result<Response, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteOptions {
    pub max_redirects: usize,
}

impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

pub struct SiteBuilder {
    roots: Vec<Arc<dyn Resource>>,
    scope: Scope,
    stickers: StickerTable,
    options: SiteOptions,
    error_page: Option<Arc<dyn ErrorPage>>,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            scope: Scope::HTTP,
            stickers: StickerTable::new(),
            options: SiteOptions::default(),
            error_page: None,
        }
    }

    /// Append a root; roots are tried in insertion order.
    pub fn root(mut self, resource: Arc<dyn Resource>) -> Self {
        self.roots.push(resource);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.options.max_redirects = max;
        self
    }

    pub fn options(mut self, options: SiteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn stickers(mut self, stickers: StickerTable) -> Self {
        self.stickers = stickers;
        self
    }

    pub fn error_page<P: ErrorPage + 'static>(mut self, page: P) -> Self {
        self.error_page = Some(Arc::new(page));
        self
    }

    pub fn build(self) -> Site {
        Site {
            roots: self.roots,
            scope: self.scope,
            stickers: Arc::new(self.stickers),
            options: self.options,
            error_page: self.error_page,
        }
    }
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Site {
    roots: Vec<Arc<dyn Resource>>,
    scope: Scope,
    stickers: Arc<StickerTable>,
    options: SiteOptions,
    error_page: Option<Arc<dyn ErrorPage>>,
}

impl Site {
    pub fn builder() -> SiteBuilder {
        SiteBuilder::new()
    }

    /// HTTP site over `roots` with default options.
    pub fn new(roots: impl IntoIterator<Item = Arc<dyn Resource>>) -> Self {
        roots
            .into_iter()
            .fold(SiteBuilder::new(), SiteBuilder::root)
            .build()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn options(&self) -> SiteOptions {
        self.options
    }

    pub fn roots(&self) -> &[Arc<dyn Resource>] {
        &self.roots
    }

    /// Resolve once, without following internal redirects or rendering
    /// failures.
    pub async fn resolve(&self, request: Request) -> Result<Reply, Error> {
        self.attempt(&Arc::new(request), Uuid::new_v4()).await
    }

    /// Resolve `request` and render the outcome. Never fails: every error
    /// ends up as a response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let request_id = Uuid::new_v4();
        let span = crate::logging::info_span!(
            "dispatch",
            %request_id,
            method = %request.method,
            uri = %request.uri(),
        );
        async move {
            let mut request = Arc::new(request);
            let outcome = self.follow(&mut request, request_id).await;
            let response = match outcome {
                Ok(reply) => match reply.into_response().await {
                    Ok(response) => response,
                    Err(err) => self.failure_response(&request, err).await,
                },
                Err(err) => self.failure_response(&request, err).await,
            };
            debug!(status = response.status, "Dispatch complete");
            response
        }
        .instrument(span)
        .await
    }

    async fn follow(&self, request: &mut Arc<Request>, request_id: Uuid) -> Result<Reply, Error> {
        let mut redirects = 0;
        loop {
            match self.attempt(request, request_id).await {
                Err(Error::InternalRedirect(redirect)) => {
                    if redirects >= self.options.max_redirects {
                        warn!(
                            redirects,
                            uri = %request.uri(),
                            "Redirect loop detected"
                        );
                        return Err(Error::RedirectLoop(redirects));
                    }
                    redirect.update_request(Arc::make_mut(request));
                    redirects += 1;
                    debug!(redirects, uri = %request.uri(), "Following internal redirect");
                }
                other => return other,
            }
        }
    }

    async fn attempt(&self, request: &Arc<Request>, request_id: Uuid) -> Result<Reply, Error> {
        for (index, root) in self.roots.iter().enumerate() {
            let Some(resolver) = root.resolver_for(self.scope) else {
                trace!(root = index, scope = %self.scope, "Root has no resolver for scope");
                continue;
            };
            let mut ctx = Context::new(
                request.clone(),
                self.scope,
                self.stickers.clone(),
                request_id,
            );
            let kwargs: BTreeMap<String, Value> = request
                .form_arguments()
                .iter()
                .map(|(key, value)| (key.clone(), Value::Str(value.clone())))
                .collect();
            ctx.start(root.clone(), path_segments(request.path()), kwargs);

            match resolver.resolve(&mut ctx).await {
                Err(
                    Error::OutOfScope
                    | Error::NotFound
                    | Error::ChildNotFound(_)
                    | Error::SignatureMismatch(_),
                ) => {
                    trace!(root = index, "Root did not match");
                }
                Ok(reply) => {
                    trace!(root = index, leaf = ctx.leaf(), "Resolved");
                    return Ok(reply);
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::NotFound)
    }

    async fn failure_response(&self, request: &Request, err: Error) -> Response {
        let failure = match err {
            err if err.is_web_failure() => err,
            // Already reported where the loop was cut.
            Error::RedirectLoop(_) => Error::Internal(err.to_string()),
            err => {
                error!(error = %err, "Request failed");
                Error::Internal(err.to_string())
            }
        };

        let Some(page) = &self.error_page else {
            return failure.default_response();
        };
        match page.render(request, &failure).await {
            Ok(response) => response,
            Err(page_err) => {
                error!(
                    error = %page_err,
                    status = failure.status_code(),
                    "Error page failed, using default rendering"
                );
                failure.default_response()
            }
        }
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("roots", &self.roots.len())
            .field("scope", &self.scope)
            .field("options", &self.options)
            .field("stickers", &self.stickers)
            .field("error_page", &self.error_page.is_some())
            .finish()
    }
}
