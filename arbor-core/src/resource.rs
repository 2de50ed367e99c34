// Resource tree nodes and routable member tables

use crate::{Error, Leaf, PathResolver, Resolver, Scope, ScopeSet, Transition};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Resource,
    Transition,
    Leaf,
}

/// A routable member of a resource.
#[derive(Clone)]
pub enum Node {
    /// Plain resource: only exposes further members.
    Resource(Arc<dyn Resource>),
    /// Produces the next resource from bound arguments.
    Transition(Arc<Transition>),
    /// Produces the final reply.
    Leaf(Arc<Leaf>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Resource(_) => NodeKind::Resource,
            Node::Transition(_) => NodeKind::Transition,
            Node::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn scopes(&self) -> ScopeSet {
        match self {
            Node::Resource(resource) => resource.scopes(),
            Node::Transition(endpoint) => endpoint.scopes(),
            Node::Leaf(endpoint) => endpoint.scopes(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("scopes", &self.scopes())
            .finish()
    }
}

impl From<Leaf> for Node {
    fn from(endpoint: Leaf) -> Self {
        Node::Leaf(Arc::new(endpoint))
    }
}

impl From<Transition> for Node {
    fn from(endpoint: Transition) -> Self {
        Node::Transition(Arc::new(endpoint))
    }
}

impl From<Arc<dyn Resource>> for Node {
    fn from(resource: Arc<dyn Resource>) -> Self {
        Node::Resource(resource)
    }
}

/// A node of the tree that exposes named members.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Routable member `name`, or `Error::ChildNotFound`.
    async fn resolve_local(&self, name: &str) -> Result<Node, Error>;

    /// Unfiltered member access, used for index and default handlers.
    fn member(&self, _name: &str) -> Option<Node> {
        None
    }

    /// Names of all members, routable or not.
    fn member_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Traversal strategy used below this resource for `scope`.
    fn resolver_for(&self, scope: Scope) -> Option<Arc<dyn Resolver>>;

    fn scopes(&self) -> ScopeSet {
        ScopeSet::GENERIC
    }
}

/// `true` for plain identifiers that do not start with an underscore.
pub fn is_routable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn default_resolvers() -> HashMap<Scope, Arc<dyn Resolver>> {
    let mut resolvers: HashMap<Scope, Arc<dyn Resolver>> = HashMap::new();
    resolvers.insert(Scope::HTTP, Arc::new(PathResolver::new()));
    resolvers
}

/// Resource whose members are declared up front in a table.
///
/// Lookup through [`Resource::resolve_local`] hides every member whose name
/// is not a plain identifier or starts with `_`; [`Resource::member`] sees
/// all of them.
pub struct ResourceTable {
    members: HashMap<String, Node>,
    order: Vec<String>,
    resolvers: HashMap<Scope, Arc<dyn Resolver>>,
    scopes: ScopeSet,
}

impl ResourceTable {
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::new()
    }
}

#[async_trait]
impl Resource for ResourceTable {
    async fn resolve_local(&self, name: &str) -> Result<Node, Error> {
        if !is_routable_name(name) {
            return Err(Error::ChildNotFound(name.to_string()));
        }
        self.members
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ChildNotFound(name.to_string()))
    }

    fn member(&self, name: &str) -> Option<Node> {
        self.members.get(name).cloned()
    }

    fn member_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn resolver_for(&self, scope: Scope) -> Option<Arc<dyn Resolver>> {
        self.resolvers.get(&scope).cloned()
    }

    fn scopes(&self) -> ScopeSet {
        self.scopes
    }
}

impl fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTable")
            .field("members", &self.order)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Builder for [`ResourceTable`].
pub struct ResourceBuilder {
    members: Vec<(String, Node)>,
    resolvers: HashMap<Scope, Arc<dyn Resolver>>,
    scopes: ScopeSet,
}

impl ResourceBuilder {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            resolvers: default_resolvers(),
            scopes: ScopeSet::GENERIC,
        }
    }

    pub fn leaf(self, name: impl Into<String>, endpoint: Leaf) -> Self {
        self.node(name, endpoint)
    }

    pub fn transition(self, name: impl Into<String>, endpoint: Transition) -> Self {
        self.node(name, endpoint)
    }

    pub fn child(self, name: impl Into<String>, resource: Arc<dyn Resource>) -> Self {
        self.node(name, resource)
    }

    pub fn node(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.members.push((name.into(), node.into()));
        self
    }

    /// Replace the traversal strategy for `scope`.
    pub fn resolver<R: Resolver + 'static>(mut self, scope: Scope, resolver: R) -> Self {
        self.resolvers.insert(scope, Arc::new(resolver));
        self
    }

    /// Scopes in which this resource is reachable when returned as a member.
    pub fn scopes(mut self, scopes: ScopeSet) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn build_table(self) -> Result<ResourceTable, Error> {
        let mut members = HashMap::with_capacity(self.members.len());
        let mut order = Vec::with_capacity(self.members.len());
        for (name, node) in self.members {
            if members.contains_key(&name) {
                return Err(Error::Configuration(format!(
                    "member `{name}` declared twice"
                )));
            }
            order.push(name.clone());
            members.insert(name, node);
        }
        Ok(ResourceTable {
            members,
            order,
            resolvers: self.resolvers,
            scopes: self.scopes,
        })
    }

    pub fn build(self) -> Result<Arc<dyn Resource>, Error> {
        Ok(Arc::new(self.build_table()?))
    }
}

impl Default for ResourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource backed by a plain map, resolved by exact key.
pub struct MapResource {
    entries: HashMap<String, Node>,
    resolvers: HashMap<Scope, Arc<dyn Resolver>>,
}

impl MapResource {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            resolvers: default_resolvers(),
        }
    }

    pub fn insert(mut self, key: impl Into<String>, node: impl Into<Node>) -> Self {
        self.entries.insert(key.into(), node.into());
        self
    }

    pub fn resolver<R: Resolver + 'static>(mut self, scope: Scope, resolver: R) -> Self {
        self.resolvers.insert(scope, Arc::new(resolver));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MapResource {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>> FromIterator<(K, Arc<dyn Resource>)> for MapResource {
    fn from_iter<I: IntoIterator<Item = (K, Arc<dyn Resource>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(MapResource::new(), |map, (key, child)| map.insert(key, child))
    }
}

#[async_trait]
impl Resource for MapResource {
    async fn resolve_local(&self, name: &str) -> Result<Node, Error> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ChildNotFound(name.to_string()))
    }

    fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolver_for(&self, scope: Scope) -> Option<Arc<dyn Resolver>> {
        self.resolvers.get(&scope).cloned()
    }
}

impl fmt::Debug for MapResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapResource")
            .field("keys", &self.member_names())
            .finish()
    }
}
