//! Type-safe observable identifier.
//!
//! [`ObservableId`] is a newtype wrapper around a `u64` drawn from the
//! registry's monotonic allocator, providing type safety so that query
//! identifiers cannot be confused with other counters.

use std::fmt;

/// Unique identifier for one live query observable.
///
/// Assigned once at fetch time from a monotonic counter and immutable
/// thereafter. Unique for the lifetime of the allocating
/// [`super::ObservableRegistry`]. Used as the table key in the registry
/// and as the correlation field in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservableId(u64);

impl ObservableId {
    /// Creates an `ObservableId` from a raw counter value.
    #[must_use]
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObservableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ObservableId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<ObservableId> for u64 {
    fn from(id: ObservableId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        let id = ObservableId::from_u64(7);
        assert_eq!(id.as_u64(), 7);
        assert_eq!(u64::from(id), 7);
    }

    #[test]
    fn display_is_raw_counter() {
        let id = ObservableId::from_u64(42);
        assert_eq!(format!("{id}"), "42");
    }

    #[test]
    fn ordering_follows_allocation_order() {
        let a = ObservableId::from_u64(1);
        let b = ObservableId::from_u64(2);
        assert!(a < b);
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = ObservableId::from_u64(3);
        let mut map = HashMap::new();
        map.insert(id, "test");
        assert_eq!(map.get(&id), Some(&"test"));
    }
}
