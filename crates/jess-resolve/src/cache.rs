//! The invocation-scoped resolution cache.
//!
//! The original keeps a process-wide solver cache; here the cache is owned
//! by one pipeline invocation and cleared by [`ResolutionCacheScope`] when
//! the stages it encloses finish, success or not, so a subsequent invocation
//! never sees stale bindings.

use crate::oracle::{CtorSig, FieldSig, MethodSig, ResolutionOracle, TypeEntry};
use jess_core::Fqn;
use std::cell::RefCell;
use std::collections::HashMap;

/// Wraps an oracle with an FQN-keyed type-lookup cache.
pub struct CachingOracle<O> {
    inner: O,
    types: RefCell<HashMap<Fqn, Option<TypeEntry>>>,
}

impl<O: ResolutionOracle> CachingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            types: RefCell::new(HashMap::new()),
        }
    }

    pub fn clear(&self) {
        self.types.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn cached_len(&self) -> usize {
        self.types.borrow().len()
    }
}

impl<O: ResolutionOracle> ResolutionOracle for CachingOracle<O> {
    fn lookup_type(&self, fqn: &Fqn) -> Option<TypeEntry> {
        if let Some(cached) = self.types.borrow().get(fqn) {
            return cached.clone();
        }
        let entry = self.inner.lookup_type(fqn);
        self.types.borrow_mut().insert(fqn.clone(), entry.clone());
        entry
    }

    fn lookup_methods(&self, owner: &Fqn, name: &str) -> Vec<MethodSig> {
        self.inner.lookup_methods(owner, name)
    }

    fn lookup_field(&self, owner: &Fqn, name: &str) -> Option<FieldSig> {
        self.inner.lookup_field(owner, name)
    }

    fn lookup_ctors(&self, owner: &Fqn) -> Vec<CtorSig> {
        self.inner.lookup_ctors(owner)
    }
}

/// Clears the wrapped cache when dropped, including on early returns and
/// panics.
pub struct ResolutionCacheScope<'a, O: ResolutionOracle> {
    cache: &'a CachingOracle<O>,
}

impl<'a, O: ResolutionOracle> ResolutionCacheScope<'a, O> {
    pub fn new(cache: &'a CachingOracle<O>) -> Self {
        Self { cache }
    }
}

impl<O: ResolutionOracle> Drop for ResolutionCacheScope<'_, O> {
    fn drop(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::EmptyOracle;

    #[test]
    fn scope_clears_cache_on_drop() {
        let cache = CachingOracle::new(EmptyOracle);
        {
            let _scope = ResolutionCacheScope::new(&cache);
            let _ = cache.lookup_type(&Fqn::new("p.A"));
            let _ = cache.lookup_type(&Fqn::new("p.B"));
            assert_eq!(cache.cached_len(), 2);
        }
        assert_eq!(cache.cached_len(), 0);
    }
}
