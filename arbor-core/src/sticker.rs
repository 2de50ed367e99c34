//! Contextual value injection.
//!
//! A sticker is a capability resolved from the dispatch [`Context`] rather
//! than from request input: a parameter declared with
//! [`Parameter::sticker`](crate::Parameter::sticker) receives the value
//! produced by [`Sticker::create`].
//!
//! A site may replace the factory of a capability with a more specific
//! implementation through its [`StickerTable`]. Overrides form a chain
//! described by [`Sticker::ancestors`]; an override that neither refines
//! nor is refined by the current one is rejected.
//!
//! ```
//! use arbor_core::{Context, Error, Sticker, Specializes, StickerTable};
//! use async_trait::async_trait;
//! use std::any::TypeId;
//! use std::sync::Arc;
//!
//! struct User { id: i64 }
//! struct Admin { id: i64 }
//!
//! #[async_trait]
//! impl Sticker for User {
//!     async fn create(_ctx: &Context) -> Result<Arc<Self>, Error> {
//!         Ok(Arc::new(User { id: 0 }))
//!     }
//! }
//!
//! #[async_trait]
//! impl Sticker for Admin {
//!     async fn create(_ctx: &Context) -> Result<Arc<Self>, Error> {
//!         Ok(Arc::new(Admin { id: 1 }))
//!     }
//!     fn ancestors() -> Vec<TypeId> {
//!         vec![TypeId::of::<User>()]
//!     }
//! }
//!
//! impl Specializes<User> for Admin {
//!     fn generalize(self: Arc<Self>) -> Arc<User> {
//!         Arc::new(User { id: self.id })
//!     }
//! }
//!
//! let table = StickerTable::new().supersede::<User, Admin>().unwrap();
//! assert!(table.is_superseded::<User>());
//! ```

use crate::logging::trace;
use crate::{Context, Error, Request, StickerValue};
use async_trait::async_trait;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A capability created from the dispatch context.
#[async_trait]
pub trait Sticker: Send + Sync + Sized + 'static {
    async fn create(ctx: &Context) -> Result<Arc<Self>, Error>;

    /// Every sticker type this one refines, directly or transitively.
    fn ancestors() -> Vec<TypeId> {
        Vec::new()
    }
}

/// A sticker usable in place of the more general capability `Base`.
pub trait Specializes<Base: Sticker>: Sticker {
    fn generalize(self: Arc<Self>) -> Arc<Base>;
}

#[async_trait]
impl Sticker for Request {
    async fn create(ctx: &Context) -> Result<Arc<Self>, Error> {
        Ok(ctx.request().clone())
    }
}

#[async_trait]
trait StickerFactory: Send + Sync {
    async fn create(&self, ctx: &Context) -> Result<StickerValue, Error>;
}

struct Direct<S>(PhantomData<fn() -> S>);

#[async_trait]
impl<S: Sticker> StickerFactory for Direct<S> {
    async fn create(&self, ctx: &Context) -> Result<StickerValue, Error> {
        S::create(ctx).await.map(StickerValue::new)
    }
}

struct Generalized<B, S>(PhantomData<fn() -> (B, S)>);

#[async_trait]
impl<B, S> StickerFactory for Generalized<B, S>
where
    B: Sticker,
    S: Specializes<B>,
{
    async fn create(&self, ctx: &Context) -> Result<StickerValue, Error> {
        let specific = S::create(ctx).await?;
        Ok(StickerValue::new(specific.generalize()))
    }
}

/// Erased description of a sticker capability, carried by parameters.
#[derive(Clone)]
pub struct StickerSpec {
    type_id: TypeId,
    type_name: &'static str,
    factory: Arc<dyn StickerFactory>,
}

impl StickerSpec {
    pub fn of<S: Sticker>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: type_name::<S>(),
            factory: Arc::new(Direct::<S>(PhantomData)),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for StickerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StickerSpec").field(&self.type_name).finish()
    }
}

struct Override {
    sub: TypeId,
    sub_name: &'static str,
    sub_ancestors: Vec<TypeId>,
    factory: Arc<dyn StickerFactory>,
}

/// Capability resolution table owned by a site.
#[derive(Default)]
pub struct StickerTable {
    overrides: HashMap<TypeId, Override>,
}

impl StickerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve capability `B` with the more specific sticker `S`.
    ///
    /// Superseding again with a refinement of the current override replaces
    /// it; superseding with something the current override already refines
    /// keeps the current one. Any other combination is ambiguous.
    pub fn supersede<B, S>(mut self) -> Result<Self, Error>
    where
        B: Sticker,
        S: Specializes<B>,
    {
        let sub = TypeId::of::<S>();
        let sub_ancestors = S::ancestors();

        if let Some(current) = self.overrides.get(&TypeId::of::<B>()) {
            let refines_current = current.sub == sub || sub_ancestors.contains(&current.sub);
            if !refines_current {
                if current.sub_ancestors.contains(&sub) {
                    trace!(
                        capability = type_name::<B>(),
                        kept = current.sub_name,
                        "Sticker already superseded by a more specific type"
                    );
                    return Ok(self);
                }
                return Err(Error::Configuration(format!(
                    "ambiguous supersede: {} is already superseded by {}, which is unrelated to {}",
                    type_name::<B>(),
                    current.sub_name,
                    type_name::<S>()
                )));
            }
        }

        self.overrides.insert(
            TypeId::of::<B>(),
            Override {
                sub,
                sub_name: type_name::<S>(),
                sub_ancestors,
                factory: Arc::new(Generalized::<B, S>(PhantomData)),
            },
        );
        Ok(self)
    }

    pub fn is_superseded<B: Sticker>(&self) -> bool {
        self.overrides.contains_key(&TypeId::of::<B>())
    }

    /// Type name of the sticker currently serving capability `B`.
    pub fn resolved_name<B: Sticker>(&self) -> &'static str {
        self.overrides
            .get(&TypeId::of::<B>())
            .map_or(type_name::<B>(), |o| o.sub_name)
    }

    pub(crate) async fn create(&self, spec: &StickerSpec, ctx: &Context) -> Result<StickerValue, Error> {
        if let Some(value) = ctx.memoized_sticker(spec.type_id) {
            return Ok(value);
        }
        let value = match self.overrides.get(&spec.type_id) {
            Some(current) => current.factory.create(ctx).await?,
            None => spec.factory.create(ctx).await?,
        };
        Ok(ctx.memoize_sticker(spec.type_id, value))
    }

    pub(crate) async fn create_for<S: Sticker>(&self, ctx: &Context) -> Result<StickerValue, Error> {
        let capability = TypeId::of::<S>();
        if let Some(value) = ctx.memoized_sticker(capability) {
            return Ok(value);
        }
        let value = match self.overrides.get(&capability) {
            Some(current) => current.factory.create(ctx).await?,
            None => S::create(ctx).await.map(StickerValue::new)?,
        };
        Ok(ctx.memoize_sticker(capability, value))
    }
}

impl fmt::Debug for StickerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.overrides.values().map(|o| o.sub_name))
            .finish()
    }
}
