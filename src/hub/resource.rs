//! Resource type broadcast by the hub
//!
//! A resource is identified by its IRI. Everything else is an opaque payload
//! owned by the publisher and the transport; the hub only clones it.

use bytes::Bytes;

/// A resource update to be broadcast to subscribers
///
/// Cheap to clone: the payload is reference-counted, so every subscriber
/// shares the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Canonical identifier of the resource (e.g. "/books/1")
    pub iri: String,
    /// Serialized representation, opaque to the hub
    pub data: Bytes,
}

impl Resource {
    /// Create a resource with an empty payload
    pub fn new(iri: impl Into<String>) -> Self {
        Self::with_data(iri, Bytes::new())
    }

    /// Create a resource carrying a payload
    pub fn with_data(iri: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            iri: iri.into(),
            data: data.into(),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_empty_payload() {
        let resource = Resource::new("/books/1");
        assert_eq!(resource.iri, "/books/1");
        assert!(resource.data.is_empty());
        assert_eq!(resource.to_string(), "/books/1");
    }

    #[test]
    fn test_clone_shares_payload() {
        let resource = Resource::with_data("/books/2", Bytes::from_static(b"{\"title\":\"Dune\"}"));
        let copy = resource.clone();

        // Same backing memory, not a deep copy
        assert_eq!(copy.data.as_ptr(), resource.data.as_ptr());
        assert_eq!(copy, resource);
    }
}
