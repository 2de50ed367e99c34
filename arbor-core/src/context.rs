//! Per-attempt dispatch state.
//!
//! A [`Context`] is created for every root resource a site tries and is
//! dropped when that attempt ends. It owns the resource path walked so far,
//! the current positional and keyword input, an [`Artifacts`] map where
//! resolvers memoize their own state (for example the remaining path), and
//! the stickers already created for the request.

use crate::logging::trace;
use crate::{
    Error, Input, Request, Resource, Scope, ScopeSet, Sticker, StickerTable, StickerValue, Value,
};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Typed storage for resolver state, keyed by `TypeId`.
#[derive(Default)]
pub struct Artifacts {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    /// Memoize: compute the value on first access only.
    pub fn get_or_insert_with<T, F>(&mut self, init: F) -> &mut T
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let slot = self
            .map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(init()));
        match slot.downcast_mut::<T>() {
            Some(value) => value,
            None => unreachable!("artifact stored under a foreign TypeId"),
        }
    }

    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Mutable state threaded through one resolution attempt.
pub struct Context {
    request: Arc<Request>,
    scope: Scope,
    scope_set: ScopeSet,
    stickers: Arc<StickerTable>,
    request_id: Uuid,
    resource_path: Vec<Arc<dyn Resource>>,
    artifacts: Artifacts,
    args: Vec<Value>,
    kwargs: BTreeMap<String, Value>,
    leaf: Option<String>,
    // Keyed by the requested capability, not the type that served it.
    sticker_memo: Mutex<HashMap<TypeId, StickerValue>>,
}

impl Context {
    pub fn new(
        request: Arc<Request>,
        scope: Scope,
        stickers: Arc<StickerTable>,
        request_id: Uuid,
    ) -> Self {
        Self {
            request,
            scope,
            scope_set: scope.context_set(),
            stickers,
            request_id,
            resource_path: Vec::new(),
            artifacts: Artifacts::new(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            leaf: None,
            sticker_memo: Mutex::new(HashMap::new()),
        }
    }

    /// Context with an empty sticker table and a fresh request id.
    pub fn for_request(request: Arc<Request>, scope: Scope) -> Self {
        Self::new(request, scope, Arc::new(StickerTable::new()), Uuid::new_v4())
    }

    /// Reset the walk to `root` with the initial input.
    pub fn start(
        &mut self,
        root: Arc<dyn Resource>,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) {
        trace!(
            args = args.len(),
            kwargs = kwargs.len(),
            "Starting resolution from root"
        );
        self.resource_path = vec![root];
        self.artifacts = Artifacts::new();
        self.args = args;
        self.kwargs = kwargs;
        self.leaf = None;
    }

    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// `{generic, scope}`
    pub fn scope_set(&self) -> ScopeSet {
        self.scope_set
    }

    pub fn stickers(&self) -> &StickerTable {
        &self.stickers
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Create (or resolve through the sticker table) a contextual value.
    ///
    /// Each capability is created at most once per context; later requests
    /// for it get the same instance.
    pub async fn sticker<S: Sticker>(&self) -> Result<Arc<S>, Error> {
        let value = self.stickers.create_for::<S>(self).await?;
        value.downcast::<S>().ok_or_else(|| {
            Error::Internal(format!(
                "sticker table produced a foreign type for {}",
                std::any::type_name::<S>()
            ))
        })
    }

    pub(crate) fn memoized_sticker(&self, capability: TypeId) -> Option<StickerValue> {
        self.sticker_memo.lock().get(&capability).cloned()
    }

    /// Store a created sticker; an instance stored first is kept and returned.
    pub(crate) fn memoize_sticker(&self, capability: TypeId, value: StickerValue) -> StickerValue {
        self.sticker_memo
            .lock()
            .entry(capability)
            .or_insert(value)
            .clone()
    }

    pub fn resource_path(&self) -> &[Arc<dyn Resource>] {
        &self.resource_path
    }

    /// Resource the walk currently stands on.
    pub fn current(&self) -> Result<Arc<dyn Resource>, Error> {
        self.resource_path
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("resolution has not been started".to_string()))
    }

    pub(crate) fn push_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resource_path.push(resource);
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn artifacts_mut(&mut self) -> &mut Artifacts {
        &mut self.artifacts
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &BTreeMap<String, Value> {
        &self.kwargs
    }

    pub fn set_args(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    pub fn set_kwargs(&mut self, kwargs: BTreeMap<String, Value>) {
        self.kwargs = kwargs;
    }

    /// Snapshot of the current input, handed to the next dispatched node.
    pub fn input(&self) -> Input {
        Input::from_parts(self.args.clone(), self.kwargs.clone())
    }

    /// Name of the leaf that produced the result, once dispatched.
    pub fn leaf(&self) -> Option<&str> {
        self.leaf.as_deref()
    }

    pub(crate) fn set_leaf(&mut self, name: &str) {
        self.leaf = Some(name.to_string());
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("uri", &self.request.uri())
            .field("scope", &self.scope)
            .field("depth", &self.resource_path.len())
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("leaf", &self.leaf)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_artifacts_memoize() {
        let mut artifacts = Artifacts::new();
        *artifacts.get_or_insert_with(|| Counter(1)) = Counter(2);
        let value = artifacts.get_or_insert_with(|| Counter(100));
        assert_eq!(*value, Counter(2));
        assert_eq!(artifacts.len(), 1);
    }

    #[test]
    fn test_artifacts_typed_access() {
        let mut artifacts = Artifacts::new();
        artifacts.insert(7u8);
        artifacts.insert("label");
        assert_eq!(artifacts.get::<u8>(), Some(&7));
        assert_eq!(artifacts.get::<&str>(), Some(&"label"));
        assert!(artifacts.get::<u16>().is_none());
        assert_eq!(artifacts.remove::<u8>(), Some(7));
        assert!(!artifacts.contains::<u8>());
    }

    #[test]
    fn test_new_context_scope_set() {
        let ctx = Context::for_request(Arc::new(Request::get("/")), Scope::HTTP);
        assert_eq!(ctx.scope_set(), ScopeSet::GENERIC | ScopeSet::HTTP);
        assert!(ctx.current().is_err());
        assert!(ctx.leaf().is_none());
    }
}
