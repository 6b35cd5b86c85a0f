//! Wrapper for data that diagnostics need but passes must ignore.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Where the payload of a `Transparent` came from.
#[derive(Clone, Copy)]
enum Origin<T> {
    /// A genuine value.
    Real(T),
    /// A placeholder made by `Transparent::forge` at the given location.
    Forged(&'static str),
}

/// A value that every comparison and hash ignores.
///
/// Two `Transparent`s are always equal, whatever they hold, so a struct
/// that carries one as a field compares and hashes by its other fields
/// only. Source locations are the typical payload: they tell the user
/// where a problem is but never influence what the passes decide.
///
/// Tests that build programs by hand have no source to point to and use
/// `forge` instead.
#[derive(Clone, Copy)]
pub struct Transparent<T> {
    /// Payload or placeholder.
    origin: Origin<T>,
}

impl<T> fmt::Debug for Transparent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_")
    }
}

impl<T> Transparent<T> {
    /// Wrap a genuine value.
    pub fn new(t: T) -> Self {
        Self {
            origin: Origin::Real(t),
        }
    }

    /// Placeholder, labeled by where it was made (see `here!`).
    #[must_use]
    pub fn forge(loc: &'static str) -> Self {
        Self {
            origin: Origin::Forged(loc),
        }
    }

    /// The payload, unless this is a placeholder.
    pub fn get(&self) -> Option<&T> {
        match &self.origin {
            Origin::Real(t) => Some(t),
            Origin::Forged(_) => None,
        }
    }

    /// Where the placeholder was made, if this is one.
    #[must_use]
    pub fn forged_at(&self) -> Option<&'static str> {
        match self.origin {
            Origin::Real(_) => None,
            Origin::Forged(loc) => Some(loc),
        }
    }
}

impl<T> PartialEq for Transparent<T> {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl<T> Eq for Transparent<T> {}

impl<T> Hash for Transparent<T> {
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

#[cfg(test)]
mod test {
    use super::Transparent;
    use std::collections::HashSet;

    #[test]
    fn invisible_to_comparisons() {
        let real = Transparent::new(1);
        let fake = Transparent::forge(crate::here!());
        assert_eq!(real, fake);
        let mut set = HashSet::new();
        set.insert((0, real));
        assert!(!set.insert((0, fake)));
        assert!(set.insert((1, fake)));
    }

    #[test]
    fn payload_is_only_in_real_values() {
        let real = Transparent::new("span");
        let fake: Transparent<&str> = Transparent::forge("test.rs:1:1");
        assert_eq!(real.get(), Some(&"span"));
        assert_eq!(real.forged_at(), None);
        assert_eq!(fake.get(), None);
        assert_eq!(fake.forged_at(), Some("test.rs:1:1"));
    }
}
