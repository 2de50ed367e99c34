//! Traversal strategies.
//!
//! A [`Resolver`] picks the next member name and tracks how much input has
//! been consumed; the shared [`step`] does the rest:
//!
//! 1. look the name up on the current resource, falling back to the
//!    resolver's default member (the name is then left unconsumed and
//!    becomes the first positional argument);
//! 2. check the member's scopes against the context;
//! 3. dispatch a leaf, run a transition, or descend into a plain resource;
//! 4. continue with the resolver the new resource declares for the scope.

use crate::logging::trace;
use crate::resource::is_routable_name;
use crate::{Consumed, Context, Error, Node, Reply, Step, Value};
use async_trait::async_trait;
use std::fmt;

/// Phase of a single resolution step, reported in trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    PendingSegment,
    ResolvedChild,
    Dispatched,
    Exhausted,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolveState::PendingSegment => "pending-segment",
            ResolveState::ResolvedChild => "resolved-child",
            ResolveState::Dispatched => "dispatched",
            ResolveState::Exhausted => "exhausted",
        })
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve from the resource on top of the context path.
    async fn resolve(&self, ctx: &mut Context) -> Result<Reply, Error>;

    /// Input was consumed by a child lookup or a transition.
    fn consumed(&self, _ctx: &mut Context, _consumed: Consumed) {}

    /// Refresh the context input before a member is dispatched.
    fn update_args(&self, _ctx: &mut Context) {}

    /// Member used when a name does not resolve.
    fn default_member(&self) -> Option<&str> {
        None
    }

    /// Error raised when a name does not resolve and there is no default.
    fn child_not_found(&self, _ctx: &Context, _name: &str) -> Error {
        Error::OutOfScope
    }
}

/// One traversal step from the current resource through member `name`.
pub async fn step<R>(resolver: &R, ctx: &mut Context, name: &str) -> Result<Reply, Error>
where
    R: Resolver + ?Sized,
{
    let current = ctx.current()?;
    trace!(state = %ResolveState::PendingSegment, segment = name, "Resolving member");

    let (member, node) = match current.resolve_local(name).await {
        Ok(node) => {
            resolver.consumed(ctx, Consumed::Count(1));
            (name, node)
        }
        Err(Error::ChildNotFound(_)) => match resolver.default_member() {
            Some(default) => {
                trace!(segment = name, default, "Falling back to default member");
                (default, current.member(default).ok_or(Error::OutOfScope)?)
            }
            None => return Err(resolver.child_not_found(ctx, name)),
        },
        Err(err) => return Err(err),
    };

    if !node.scopes().compatible(ctx.scope_set()) {
        trace!(member, scope = %ctx.scope(), "Member out of scope");
        return Err(Error::OutOfScope);
    }
    resolver.update_args(ctx);
    trace!(state = %ResolveState::ResolvedChild, member, kind = ?node.kind(), "Resolved member");

    let next = match node {
        Node::Leaf(leaf) => {
            ctx.set_leaf(member);
            trace!(state = %ResolveState::Dispatched, member, "Dispatching leaf");
            let input = ctx.input();
            return leaf.dispatch(ctx, input).await;
        }
        Node::Transition(transition) => {
            let input = ctx.input();
            match transition.dispatch(ctx, input).await? {
                Step::Interrupt(reply) => return Ok(reply),
                Step::Descend(resource, consumed) => {
                    resolver.consumed(ctx, consumed);
                    resource
                }
            }
        }
        Node::Resource(resource) => resource,
    };

    let scope = ctx.scope();
    let resolver = next.resolver_for(scope).ok_or_else(|| {
        Error::Internal(format!("resource `{member}` has no resolver for scope `{scope}`"))
    })?;
    ctx.push_resource(next);
    resolver.resolve(ctx).await
}

/// Split a request path into percent-decoded segments.
///
/// Leading and trailing slashes are ignored, so `/hello/` and `/hello`
/// both yield `["hello"]`.
pub fn path_segments(path: &str) -> Vec<Value> {
    let path = path.trim_matches('/');
    if path.is_empty() {
        return Vec::new();
    }
    path.split('/')
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => Value::Str(decoded.into_owned()),
            Err(_) => Value::Str(segment.to_string()),
        })
        .collect()
}

/// Path segments still to walk and those already consumed.
///
/// Stored in the context artifacts and shared by every [`PathResolver`] of
/// one resolution attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathState {
    remaining: Vec<Value>,
    consumed: Vec<Value>,
}

impl PathState {
    pub fn new(segments: Vec<Value>) -> Self {
        Self {
            remaining: segments,
            consumed: Vec::new(),
        }
    }

    pub fn next_segment(&self) -> Option<&Value> {
        self.remaining.first()
    }

    pub fn remaining(&self) -> &[Value] {
        &self.remaining
    }

    pub fn consumed(&self) -> &[Value] {
        &self.consumed
    }

    /// Move up to `n` segments from remaining to consumed.
    pub fn consume(&mut self, n: usize) {
        let n = n.min(self.remaining.len());
        self.consumed.extend(self.remaining.drain(..n));
    }

    pub fn consume_rest(&mut self) {
        self.consumed.append(&mut self.remaining);
    }

    /// Push the last consumed segment back for reinterpretation.
    pub fn unconsume(&mut self) -> bool {
        match self.consumed.pop() {
            Some(segment) => {
                self.remaining.insert(0, segment);
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, consumed: Consumed) {
        match consumed {
            Consumed::Count(n) => self.consume(n),
            Consumed::Rest => self.consume_rest(),
        }
    }
}

/// Walks the request path one segment at a time.
///
/// When the path is exhausted, the index member is dispatched if it is a
/// leaf reachable in the current scope. Names that do not resolve fall back
/// to the default member.
#[derive(Debug, Clone)]
pub struct PathResolver {
    index: Option<String>,
    default: Option<String>,
}

impl PathResolver {
    pub fn new() -> Self {
        Self {
            index: Some("index".to_string()),
            default: Some("default".to_string()),
        }
    }

    pub fn with_index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    pub fn without_index(mut self) -> Self {
        self.index = None;
        self
    }

    pub fn without_default(mut self) -> Self {
        self.default = None;
        self
    }

    fn state<'c>(&self, ctx: &'c mut Context) -> &'c mut PathState {
        let request = ctx.request().clone();
        ctx.artifacts_mut()
            .get_or_insert_with(|| PathState::new(path_segments(request.path())))
    }

    async fn resolve_index(&self, ctx: &mut Context) -> Result<Reply, Error> {
        let Some(index) = self.index.as_deref() else {
            return Err(Error::OutOfScope);
        };
        trace!(state = %ResolveState::Exhausted, index, "Path exhausted");
        match ctx.current()?.member(index) {
            Some(Node::Leaf(leaf)) if leaf.scopes().compatible(ctx.scope_set()) => {
                ctx.set_leaf(index);
                let input = ctx.input();
                leaf.dispatch(ctx, input).await
            }
            _ => Err(Error::OutOfScope),
        }
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for PathResolver {
    async fn resolve(&self, ctx: &mut Context) -> Result<Reply, Error> {
        let next = self.state(ctx).next_segment().map(Value::to_string);
        match next {
            Some(name) => step(self, ctx, &name).await,
            None => self.resolve_index(ctx).await,
        }
    }

    fn consumed(&self, ctx: &mut Context, consumed: Consumed) {
        let state = self.state(ctx);
        state.apply(consumed);
        let remaining = state.remaining().to_vec();
        ctx.set_args(remaining);
    }

    fn update_args(&self, ctx: &mut Context) {
        let remaining = self.state(ctx).remaining().to_vec();
        ctx.set_args(remaining);
    }

    fn default_member(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// Dispatches on the upper-cased request method, e.g. a `GET` member.
///
/// The method is not path input, so nothing is consumed. A method with no
/// matching member is `405 Method Not Allowed` listing the verbs the
/// resource does have.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodResolver;

impl MethodResolver {
    pub fn new() -> Self {
        Self
    }
}

fn is_verb(name: &str) -> bool {
    is_routable_name(name) && name.chars().all(|c| c.is_ascii_uppercase())
}

#[async_trait]
impl Resolver for MethodResolver {
    async fn resolve(&self, ctx: &mut Context) -> Result<Reply, Error> {
        let method = ctx.request().method.to_uppercase();
        step(self, ctx, &method).await
    }

    fn child_not_found(&self, ctx: &Context, _name: &str) -> Error {
        let allowed = ctx
            .current()
            .map(|resource| {
                resource
                    .member_names()
                    .into_iter()
                    .filter(|name| is_verb(name))
                    .collect()
            })
            .unwrap_or_default();
        Error::MethodNotAllowed { allowed }
    }
}
