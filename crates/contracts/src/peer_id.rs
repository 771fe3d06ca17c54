//! PeerId - Cheap-to-clone transport node identifier
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::ContractError;

/// Upper bound on identifier length accepted from the transport
pub const MAX_PEER_ID_LEN: usize = 128;

/// Opaque transport-level node identifier.
///
/// Identifiers are treated as opaque, but anything that arrives from the
/// transport goes through [`PeerId::parse`] before it can reach a session.
///
/// # Examples
/// ```
/// use contracts::PeerId;
///
/// let id = PeerId::parse("watch-4f2a").unwrap();
/// let id2 = id.clone();  // O(1) - just increments ref count
/// assert_eq!(id, id2);
/// assert!(PeerId::parse("").is_err());
/// ```
#[derive(Clone)]
pub struct PeerId(Arc<str>);

impl PeerId {
    /// Validate and wrap an identifier received from the transport
    pub fn parse(s: &str) -> Result<Self, ContractError> {
        let reason = if s.is_empty() {
            Some("empty")
        } else if s.len() > MAX_PEER_ID_LEN {
            Some("too long")
        } else if s.chars().any(char::is_control) {
            Some("contains control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ContractError::InvalidPeerId {
                id: s.chars().take(MAX_PEER_ID_LEN).collect(),
                reason,
            }),
            None => Ok(Self(Arc::from(s))),
        }
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for PeerId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for PeerId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PeerId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PeerId {
    type Error = ContractError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({:?})", self.0)
    }
}

impl PartialEq for PeerId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for PeerId {}

impl PartialEq<str> for PeerId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for PeerId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Hash - same as str hash for HashMap compatibility
impl Hash for PeerId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for PeerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_is_cheap() {
        let id1 = PeerId::parse("node-a").unwrap();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(PeerId::parse("").is_err());
        assert!(PeerId::parse("bad\nid").is_err());
        assert!(PeerId::parse(&"x".repeat(MAX_PEER_ID_LEN + 1)).is_err());
        assert!(PeerId::parse(&"x".repeat(MAX_PEER_ID_LEN)).is_ok());
    }

    #[test]
    fn test_hashmap_key() {
        let mut map: HashMap<PeerId, i32> = HashMap::new();
        map.insert(PeerId::parse("watch").unwrap(), 1);
        assert_eq!(map.get("watch"), Some(&1));
    }

    #[test]
    fn test_serde_validates() {
        let id = PeerId::parse("phone").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"phone\"");
        assert_eq!(serde_json::from_str::<PeerId>(&json).unwrap(), id);
        assert!(serde_json::from_str::<PeerId>("\"\"").is_err());
    }
}
