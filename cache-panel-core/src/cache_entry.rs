use std::time::{Duration, Instant};

/// A stored value together with the moment it stops being valid.
///
/// # Examples
///
/// ```
/// use cache_panel_core::CacheEntry;
/// use std::time::Duration;
///
/// let entry = CacheEntry::new(42, Some(Duration::from_secs(60)));
/// assert_eq!(entry.value, 42);
/// assert!(!entry.is_expired());
///
/// let forever = CacheEntry::new("data", None);
/// assert!(forever.expires_at.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct CacheEntry<R> {
    pub value: R,
    pub inserted_at: Instant,
    pub expires_at: Option<Instant>,
}

impl<R> CacheEntry<R> {
    /// Creates an entry expiring `timeout` from now, or never for `None`.
    pub fn new(value: R, timeout: Option<Duration>) -> Self {
        let inserted_at = Instant::now();
        Self {
            value,
            inserted_at,
            expires_at: timeout.and_then(|t| inserted_at.checked_add(t)),
        }
    }

    /// Returns true once the expiry instant has been reached.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::CacheEntry;
    /// use std::time::Duration;
    ///
    /// let entry = CacheEntry::new("gone", Some(Duration::ZERO));
    /// assert!(entry.is_expired());
    /// ```
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Replaces the value, keeping the original expiry.
    pub fn replace(&mut self, value: R) {
        self.value = value;
    }
}
