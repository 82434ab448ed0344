use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{CacheError, CacheResult, Ledger, Operation};

/// The operation set of a key-value cache client.
///
/// Every method has a default body that fails with
/// [`CacheError::Unsupported`], so a backend only implements what it
/// actually supports and callers of the rest get the "no such method" error.
///
/// `timeout` of `None` leaves expiry to the backend's default.
///
/// # Examples
///
/// A backend that only knows how to read:
///
/// ```
/// use cache_panel_core::{CacheBackend, CacheResult, Operation};
///
/// struct Constant;
///
/// impl CacheBackend for Constant {
///     type Value = i64;
///
///     fn get(&self, _key: &str, _default: Option<i64>) -> CacheResult<Option<i64>> {
///         Ok(Some(42))
///     }
/// }
///
/// assert_eq!(Constant.get("anything", None).unwrap(), Some(42));
/// let err = Constant.incr("counter", 1).unwrap_err();
/// assert!(err.is_unsupported());
/// ```
pub trait CacheBackend: Send + Sync {
    type Value: Clone + PartialEq + Serialize + Send + Sync;

    /// Stores `value` only if `key` is not already present. Returns whether it
    /// was stored.
    fn add(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<bool> {
        let _ = (key, value, timeout);
        Err(CacheError::Unsupported(Operation::Add))
    }

    /// Fetches `key`, returning `default` when it is absent.
    fn get(&self, key: &str, default: Option<Self::Value>) -> CacheResult<Option<Self::Value>> {
        let _ = (key, default);
        Err(CacheError::Unsupported(Operation::Get))
    }

    fn set(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<()> {
        let _ = (key, value, timeout);
        Err(CacheError::Unsupported(Operation::Set))
    }

    /// Removes `key`. Returns whether it was present.
    fn delete(&self, key: &str) -> CacheResult<bool> {
        let _ = key;
        Err(CacheError::Unsupported(Operation::Delete))
    }

    /// Fetches several keys at once; absent keys are left out of the result.
    fn get_many(&self, keys: &[&str]) -> CacheResult<BTreeMap<String, Self::Value>> {
        let _ = keys;
        Err(CacheError::Unsupported(Operation::GetMany))
    }

    /// Stores every entry. Returns the keys that could not be stored.
    fn set_many(
        &self,
        entries: BTreeMap<String, Self::Value>,
        timeout: Option<Duration>,
    ) -> CacheResult<Vec<String>> {
        let _ = (entries, timeout);
        Err(CacheError::Unsupported(Operation::SetMany))
    }

    fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        let _ = keys;
        Err(CacheError::Unsupported(Operation::DeleteMany))
    }

    /// Adds `delta` to the integer stored at `key` and returns the new value.
    fn incr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let _ = (key, delta);
        Err(CacheError::Unsupported(Operation::Incr))
    }

    /// Subtracts `delta` from the integer stored at `key` and returns the new value.
    fn decr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let _ = (key, delta);
        Err(CacheError::Unsupported(Operation::Decr))
    }

    fn has_key(&self, key: &str) -> CacheResult<bool> {
        let _ = key;
        Err(CacheError::Unsupported(Operation::HasKey))
    }

    fn clear(&self) -> CacheResult<()> {
        Err(CacheError::Unsupported(Operation::Clear))
    }

    /// Whether this client already records its calls.
    fn is_instrumented(&self) -> bool {
        false
    }

    /// A copy of this already instrumented client that records into `ledger`.
    ///
    /// `None` for clients that do not record. Installing a proxy over an
    /// instrumented client uses this so that each request still sees its own
    /// calls.
    fn rebind(&self, ledger: &Ledger) -> Option<Self>
    where
        Self: Sized,
    {
        let _ = ledger;
        None
    }
}

impl<C: CacheBackend + ?Sized> CacheBackend for Arc<C> {
    type Value = C::Value;

    fn add(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<bool> {
        (**self).add(key, value, timeout)
    }

    fn get(&self, key: &str, default: Option<Self::Value>) -> CacheResult<Option<Self::Value>> {
        (**self).get(key, default)
    }

    fn set(&self, key: &str, value: Self::Value, timeout: Option<Duration>) -> CacheResult<()> {
        (**self).set(key, value, timeout)
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        (**self).delete(key)
    }

    fn get_many(&self, keys: &[&str]) -> CacheResult<BTreeMap<String, Self::Value>> {
        (**self).get_many(keys)
    }

    fn set_many(
        &self,
        entries: BTreeMap<String, Self::Value>,
        timeout: Option<Duration>,
    ) -> CacheResult<Vec<String>> {
        (**self).set_many(entries, timeout)
    }

    fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        (**self).delete_many(keys)
    }

    fn incr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        (**self).incr(key, delta)
    }

    fn decr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        (**self).decr(key, delta)
    }

    fn has_key(&self, key: &str) -> CacheResult<bool> {
        (**self).has_key(key)
    }

    fn clear(&self) -> CacheResult<()> {
        (**self).clear()
    }

    fn is_instrumented(&self) -> bool {
        (**self).is_instrumented()
    }
}
