//! Dispatchable endpoints and their hook pipeline.
//!
//! An [`Endpoint`] couples a compiled [`Signature`] with a handler and three
//! ordered lists:
//!
//! - pre-hooks run first, on the raw input. The first one returning a reply
//!   short-circuits everything else; binding never happens.
//! - decorators wrap the bound invocation. The most recently added
//!   decorator is the outermost; each receives a [`Next`] continuation that
//!   runs the next inner layer, and the innermost layer binds the input and
//!   calls the handler.
//! - post-hooks transform the reply of a leaf, or the short-circuit reply of
//!   a transition.
//!
//! [`Leaf`] endpoints terminate resolution; [`Transition`] endpoints return
//! the resource to descend into.

use crate::logging::{debug, trace};
use crate::{
    BindMode, BoundArgs, Consumed, Context, Error, Input, Reply, Resource, ScopeSet, Signature,
};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Endpoint producing the final reply.
pub type Leaf = Endpoint<Reply>;

/// Endpoint producing the next resource to traverse.
pub type Transition = Endpoint<Arc<dyn Resource>>;

/// Handler body, invoked with bound arguments.
#[async_trait]
pub trait Handler<T>: Send + Sync {
    async fn call(&self, ctx: &Context, args: BoundArgs) -> Result<T, Error>;
}

/// Runs before binding; a returned reply short-circuits the handler.
#[async_trait]
pub trait PreHook: Send + Sync {
    async fn before(&self, ctx: &Context, input: &Input) -> Result<Option<Reply>, Error>;
}

/// Transforms a reply after the handler (or a short-circuit) produced it.
#[async_trait]
pub trait PostHook: Send + Sync {
    async fn after(&self, ctx: &Context, reply: Reply) -> Result<Reply, Error>;
}

/// Intercepts the bound invocation of an endpoint.
#[async_trait]
pub trait Decorator<T>: Send + Sync {
    async fn wrap(&self, ctx: &Context, input: Input, next: Next<'_, T>) -> Result<T, Error>;
}

/// Closure-backed [`Handler`], see [`leaf_fn`] and [`transition_fn`].
pub struct HandlerFn<F>(F);

/// Wrap a closure as a leaf handler.
pub fn leaf_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a Context, BoundArgs) -> BoxFuture<'a, Result<Reply, Error>>
        + Send
        + Sync
        + 'static,
{
    HandlerFn(f)
}

/// Wrap a closure as a transition handler.
pub fn transition_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a Context, BoundArgs) -> BoxFuture<'a, Result<Arc<dyn Resource>, Error>>
        + Send
        + Sync
        + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<T, F> Handler<T> for HandlerFn<F>
where
    T: Send + 'static,
    F: for<'a> Fn(&'a Context, BoundArgs) -> BoxFuture<'a, Result<T, Error>> + Send + Sync,
{
    async fn call(&self, ctx: &Context, args: BoundArgs) -> Result<T, Error> {
        (self.0)(ctx, args).await
    }
}

pub struct PreFn<F>(F);

pub fn pre_fn<F>(f: F) -> PreFn<F>
where
    F: for<'a> Fn(&'a Context, &'a Input) -> BoxFuture<'a, Result<Option<Reply>, Error>>
        + Send
        + Sync
        + 'static,
{
    PreFn(f)
}

#[async_trait]
impl<F> PreHook for PreFn<F>
where
    F: for<'a> Fn(&'a Context, &'a Input) -> BoxFuture<'a, Result<Option<Reply>, Error>>
        + Send
        + Sync,
{
    async fn before(&self, ctx: &Context, input: &Input) -> Result<Option<Reply>, Error> {
        (self.0)(ctx, input).await
    }
}

pub struct PostFn<F>(F);

pub fn post_fn<F>(f: F) -> PostFn<F>
where
    F: for<'a> Fn(&'a Context, Reply) -> BoxFuture<'a, Result<Reply, Error>> + Send + Sync + 'static,
{
    PostFn(f)
}

#[async_trait]
impl<F> PostHook for PostFn<F>
where
    F: for<'a> Fn(&'a Context, Reply) -> BoxFuture<'a, Result<Reply, Error>> + Send + Sync,
{
    async fn after(&self, ctx: &Context, reply: Reply) -> Result<Reply, Error> {
        (self.0)(ctx, reply).await
    }
}

pub struct DecoratorFn<F>(F);

pub fn decorator_fn<T, F>(f: F) -> DecoratorFn<F>
where
    T: Send + 'static,
    F: for<'a> Fn(&'a Context, Input, Next<'a, T>) -> BoxFuture<'a, Result<T, Error>>
        + Send
        + Sync
        + 'static,
{
    DecoratorFn(f)
}

#[async_trait]
impl<T, F> Decorator<T> for DecoratorFn<F>
where
    T: Send + 'static,
    F: for<'a> Fn(&'a Context, Input, Next<'a, T>) -> BoxFuture<'a, Result<T, Error>>
        + Send
        + Sync,
{
    async fn wrap(&self, ctx: &Context, input: Input, next: Next<'_, T>) -> Result<T, Error> {
        (self.0)(ctx, input, next).await
    }
}

/// Continuation handed to a [`Decorator`].
///
/// Each call of [`Next::run`] runs the next inner layer with fresh input;
/// the innermost layer binds that input against the endpoint signature.
pub struct Next<'a, T> {
    endpoint: &'a Endpoint<T>,
    depth: usize,
    ctx: &'a Context,
    consumed: &'a Mutex<Option<Consumed>>,
}

impl<T: Send + 'static> Next<'_, T> {
    pub async fn run(&self, input: Input) -> Result<T, Error> {
        self.endpoint
            .invoke(self.depth, self.ctx, input, self.consumed)
            .await
    }
}

/// Outcome of dispatching a transition.
pub enum Step {
    /// Descend into the resource, advancing the input by `Consumed`.
    Descend(Arc<dyn Resource>, Consumed),
    /// A pre-hook answered; resolution ends with this reply.
    Interrupt(Reply),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Descend(_, consumed) => f.debug_tuple("Descend").field(consumed).finish(),
            Step::Interrupt(reply) => f.debug_tuple("Interrupt").field(reply).finish(),
        }
    }
}

/// Handler plus signature plus hooks, registered as a tree member.
pub struct Endpoint<T> {
    scopes: ScopeSet,
    signature: Signature,
    mode: BindMode,
    handler: Arc<dyn Handler<T>>,
    pre: Vec<Arc<dyn PreHook>>,
    post: Vec<Arc<dyn PostHook>>,
    decorators: Vec<Arc<dyn Decorator<T>>>,
}

impl<T: Send + 'static> Endpoint<T> {
    fn with_mode<H>(scopes: ScopeSet, signature: Signature, mode: BindMode, handler: H) -> Self
    where
        H: Handler<T> + 'static,
    {
        Self {
            scopes,
            signature,
            mode,
            handler: Arc::new(handler),
            pre: Vec::new(),
            post: Vec::new(),
            decorators: Vec::new(),
        }
    }

    /// Restrict the endpoint to `scopes`.
    pub fn in_scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn pre<P: PreHook + 'static>(mut self, hook: P) -> Self {
        self.pre.push(Arc::new(hook));
        self
    }

    pub fn post<P: PostHook + 'static>(mut self, hook: P) -> Self {
        self.post.push(Arc::new(hook));
        self
    }

    /// Wrap the current invocation chain; the new decorator becomes outermost.
    pub fn decorate<D: Decorator<T> + 'static>(mut self, decorator: D) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn scopes(&self) -> ScopeSet {
        self.scopes
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn run_pre(&self, ctx: &Context, input: &Input) -> Result<Option<Reply>, Error> {
        for (index, hook) in self.pre.iter().enumerate() {
            if let Some(reply) = hook.before(ctx, input).await? {
                trace!(hook = index, "Pre-hook short-circuited the handler");
                return Ok(Some(reply));
            }
        }
        Ok(None)
    }

    async fn run_post(&self, ctx: &Context, mut reply: Reply) -> Result<Reply, Error> {
        for hook in &self.post {
            reply = hook.after(ctx, reply).await?;
        }
        Ok(reply)
    }

    fn invoke<'a>(
        &'a self,
        depth: usize,
        ctx: &'a Context,
        input: Input,
        consumed: &'a Mutex<Option<Consumed>>,
    ) -> BoxFuture<'a, Result<T, Error>> {
        Box::pin(async move {
            if let Some(layer) = depth.checked_sub(1) {
                trace!(decorator = layer, "Entering decorator");
                let next = Next {
                    endpoint: self,
                    depth: layer,
                    ctx,
                    consumed,
                };
                return self.decorators[layer].wrap(ctx, input, next).await;
            }

            let bound = match self.signature.bind(ctx, input, self.mode).await {
                Ok(bound) => bound,
                Err(Error::SignatureMismatch(reason)) => {
                    debug!(%reason, "Signature mismatch");
                    return Err(Error::OutOfScope);
                }
                Err(err) => return Err(err),
            };
            *consumed.lock() = Some(bound.consumed);
            self.handler.call(ctx, bound.args).await
        })
    }

    async fn run_chain(&self, ctx: &Context, input: Input) -> Result<(T, Consumed), Error> {
        let consumed = Mutex::new(None);
        let value = self
            .invoke(self.decorators.len(), ctx, input, &consumed)
            .await?;
        // A decorator may answer without ever reaching the handler.
        let consumed = consumed.lock().take().unwrap_or(Consumed::Count(0));
        Ok((value, consumed))
    }
}

impl Endpoint<Reply> {
    /// Leaf reachable in `scopes`.
    pub fn leaf<H: Handler<Reply> + 'static>(
        scopes: ScopeSet,
        signature: Signature,
        handler: H,
    ) -> Self {
        Self::with_mode(scopes, signature, BindMode::Terminal, handler)
    }

    /// Leaf reachable over HTTP only.
    pub fn page<H: Handler<Reply> + 'static>(signature: Signature, handler: H) -> Self {
        Self::leaf(ScopeSet::HTTP, signature, handler)
    }

    pub async fn dispatch(&self, ctx: &Context, input: Input) -> Result<Reply, Error> {
        let reply = match self.run_pre(ctx, &input).await? {
            Some(reply) => reply,
            None => self.run_chain(ctx, input).await?.0,
        };
        self.run_post(ctx, reply).await
    }
}

impl Endpoint<Arc<dyn Resource>> {
    /// Transition reachable in every scope.
    pub fn transition<H: Handler<Arc<dyn Resource>> + 'static>(
        signature: Signature,
        handler: H,
    ) -> Self {
        Self::with_mode(ScopeSet::GENERIC, signature, BindMode::Partial, handler)
    }

    /// Transition reachable over HTTP only.
    pub fn http_transition<H: Handler<Arc<dyn Resource>> + 'static>(
        signature: Signature,
        handler: H,
    ) -> Self {
        Self::with_mode(ScopeSet::HTTP, signature, BindMode::Partial, handler)
    }

    pub async fn dispatch(&self, ctx: &Context, input: Input) -> Result<Step, Error> {
        if let Some(reply) = self.run_pre(ctx, &input).await? {
            return Ok(Step::Interrupt(self.run_post(ctx, reply).await?));
        }
        let (resource, consumed) = self.run_chain(ctx, input).await?;
        Ok(Step::Descend(resource, consumed))
    }
}

impl<T> fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("scopes", &self.scopes)
            .field("mode", &self.mode)
            .field("params", &self.signature.params().len())
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
