//! Scopes gate which nodes are reachable for a given kind of request.
//!
//! A [`Scope`] is an opaque token identified by the bit it occupies in a
//! [`ScopeSet`]. Labels exist for logs only: defining two scopes with the
//! same label yields two distinct, unequal scopes.

use crate::Error;
use bitflags::bitflags;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

const MAX_SCOPES: u32 = u64::BITS;

// Bits 0 and 1 belong to the predefined scopes.
static NEXT_BIT: AtomicU32 = AtomicU32::new(2);

bitflags! {
    /// Set of scopes, intersected to decide reachability.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ScopeSet: u64 {
        const GENERIC = 1;
        const HTTP = 1 << 1;
        // Scopes created with `Scope::define` occupy the remaining bits.
        const _ = !0;
    }
}

impl ScopeSet {
    pub fn of(scopes: &[Scope]) -> Self {
        scopes
            .iter()
            .fold(ScopeSet::empty(), |set, scope| set | scope.as_set())
    }

    /// Non-empty intersection with `other`.
    pub fn compatible(&self, other: ScopeSet) -> bool {
        self.intersects(other)
    }
}

/// Identity-compared scope token.
#[derive(Clone, Copy)]
pub struct Scope {
    bit: u32,
    label: &'static str,
}

impl Scope {
    /// Matches every request regardless of the site scope.
    pub const GENERIC: Scope = Scope {
        bit: 0,
        label: "generic",
    };

    pub const HTTP: Scope = Scope {
        bit: 1,
        label: "http",
    };

    /// Allocate a fresh scope. Meant for startup code; the space holds
    /// 64 scopes in total.
    pub fn define(label: &'static str) -> Result<Scope, Error> {
        let bit = NEXT_BIT
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bit| {
                (bit < MAX_SCOPES).then_some(bit + 1)
            })
            .map_err(|_| {
                Error::Configuration(format!("cannot define scope `{label}`: all 64 scopes in use"))
            })?;
        Ok(Scope { bit, label })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn as_set(&self) -> ScopeSet {
        ScopeSet::from_bits_retain(1u64 << self.bit)
    }

    /// Scope set seen by a dispatch running in this scope.
    pub fn context_set(&self) -> ScopeSet {
        ScopeSet::GENERIC | self.as_set()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.bit == other.bit
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bit.hash(state);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Scope {}#{}>", self.label, self.bit)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

impl From<Scope> for ScopeSet {
    fn from(scope: Scope) -> Self {
        scope.as_set()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_different_identity() {
        let a = Scope::define("admin").unwrap();
        let b = Scope::define("admin").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.label(), b.label());
        assert!(!a.as_set().compatible(b.as_set()));
    }

    #[test]
    fn test_predefined_scope_sets() {
        assert_eq!(Scope::GENERIC.as_set(), ScopeSet::GENERIC);
        assert_eq!(Scope::HTTP.as_set(), ScopeSet::HTTP);
        assert_eq!(
            Scope::HTTP.context_set(),
            ScopeSet::GENERIC | ScopeSet::HTTP
        );
    }

    #[test]
    fn test_compatibility_is_intersection() {
        let ctx = Scope::HTTP.context_set();
        assert!(ScopeSet::HTTP.compatible(ctx));
        assert!(ScopeSet::GENERIC.compatible(ctx));
        assert!(!ScopeSet::empty().compatible(ctx));

        let rpc = Scope::define("rpc").unwrap();
        assert!(!rpc.as_set().compatible(ctx));
        assert!(ScopeSet::of(&[rpc, Scope::HTTP]).compatible(ctx));
        assert!(rpc.as_set().compatible(rpc.context_set()));
    }
}
