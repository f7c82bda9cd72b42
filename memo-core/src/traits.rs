//! Contracts between the cache and the code around it.
//!
//! The cache consumes a [`LookupFn`] and is consumed through [`Provider`], so
//! a verifier resolving key ids can depend on the contract and swap the
//! cache out in tests.

use std::sync::Arc;

/// Keyed, potentially slow and fallible source of truth.
///
/// Shared by reference with the cache; the cache never clones the closure
/// or calls it concurrently for the same key.
pub type LookupFn<V, E> = Arc<dyn Fn(&str) -> std::result::Result<V, E> + Send + Sync>;

/// Wraps a closure into a [`LookupFn`].
pub fn lookup_fn<V, E, F>(f: F) -> LookupFn<V, E>
where
    F: Fn(&str) -> std::result::Result<V, E> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Get-by-key access to a value source.
pub trait Provider<V>: Send + Sync {
    /// Error returned when the value cannot be produced.
    type Error;

    /// Returns the value associated with `key`.
    fn get(&self, key: &str) -> std::result::Result<V, Self::Error>;
}

impl<V, P> Provider<V> for Arc<P>
where
    P: Provider<V> + ?Sized,
{
    type Error = P::Error;

    fn get(&self, key: &str) -> std::result::Result<V, Self::Error> {
        (**self).get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Provider<String> for Upper {
        type Error = ();

        fn get(&self, key: &str) -> std::result::Result<String, ()> {
            Ok(key.to_uppercase())
        }
    }

    #[test]
    fn test_lookup_fn_wraps_closure() {
        let lookup: LookupFn<usize, String> = lookup_fn(|key: &str| Ok(key.len()));
        assert_eq!(lookup("kid-1").unwrap(), 5);
    }

    #[test]
    fn test_provider_through_arc() {
        let provider = Arc::new(Upper);
        assert_eq!(provider.get("kid").unwrap(), "KID");
    }
}
