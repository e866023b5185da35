//! Endpoint identity: the Endpoint Name and Product Instance ID strings
//! advertised inside invitation packets.
//!
//! Both strings travel on the wire NUL-terminated and padded with NUL bytes
//! to a 4-byte boundary. The name may be at most 98 bytes including the
//! terminator, the product instance ID at most 43.

use crate::constants::{MAX_ENDPOINT_NAME_LEN, MAX_PRODUCT_INSTANCE_ID_LEN};
use crate::error::IdentityError;

/// Number of 32-bit words needed for a string plus its NUL terminator,
/// rounded up to a word boundary.
pub fn padded_words(text_len: usize) -> usize {
    (text_len + 1).div_ceil(4)
}

/// Append `text`, a NUL terminator, and NUL padding to a word boundary.
pub fn push_padded(buf: &mut Vec<u8>, text: &str) {
    let words = padded_words(text.len());
    buf.extend_from_slice(text.as_bytes());
    buf.resize(buf.len() + (words * 4 - text.len()), 0);
}

/// The identity strings an endpoint sends in INVITATION and
/// INVITATION_ACCEPTED packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointIdentity {
    name: String,
    product_instance_id: String,
}

impl EndpointIdentity {
    /// Create an identity, validating both strings against the wire limits.
    pub fn new(name: &str, product_instance_id: &str) -> Result<Self, IdentityError> {
        let mut identity = Self::default();
        identity.set_name(name)?;
        identity.set_product_instance_id(product_instance_id)?;
        Ok(identity)
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), IdentityError> {
        if name.is_empty() {
            return Err(IdentityError::EmptyName);
        }
        if name.len() + 1 > MAX_ENDPOINT_NAME_LEN {
            return Err(IdentityError::NameTooLong {
                max: MAX_ENDPOINT_NAME_LEN,
                actual: name.len() + 1,
            });
        }
        if name.contains('\0') {
            return Err(IdentityError::EmbeddedNul {
                field: "endpoint name",
            });
        }
        self.name = name.to_owned();
        Ok(())
    }

    pub fn set_product_instance_id(&mut self, piid: &str) -> Result<(), IdentityError> {
        if piid.is_empty() {
            return Err(IdentityError::EmptyProductInstanceId);
        }
        if piid.len() + 1 > MAX_PRODUCT_INSTANCE_ID_LEN {
            return Err(IdentityError::ProductInstanceIdTooLong {
                max: MAX_PRODUCT_INSTANCE_ID_LEN,
                actual: piid.len() + 1,
            });
        }
        if piid.contains('\0') {
            return Err(IdentityError::EmbeddedNul {
                field: "product instance ID",
            });
        }
        self.product_instance_id = piid.to_owned();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product_instance_id(&self) -> &str {
        &self.product_instance_id
    }

    /// Wire length of the name field in 32-bit words (the CSD1 value).
    pub fn name_words(&self) -> usize {
        padded_words(self.name.len())
    }

    /// Wire length of the product instance ID field in 32-bit words.
    pub fn product_instance_id_words(&self) -> usize {
        padded_words(self.product_instance_id.len())
    }
}

impl Default for EndpointIdentity {
    fn default() -> Self {
        Self {
            name: "NetUMP".to_owned(),
            product_instance_id: "DefaultID".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_words_rounds_up_with_terminator() {
        // len + NUL, rounded up to 4
        assert_eq!(padded_words(0), 1);
        assert_eq!(padded_words(3), 1); // "abc\0" = 4 bytes
        assert_eq!(padded_words(4), 2); // "abcd\0" = 5 bytes → 2 words
        assert_eq!(padded_words(7), 2);
        assert_eq!(padded_words(8), 3);
    }

    #[test]
    fn push_padded_pads_with_nul() {
        let mut buf = Vec::new();
        push_padded(&mut buf, "Peer");
        assert_eq!(buf, b"Peer\0\0\0\0"); // 4 chars + NUL → 2 words
        buf.clear();
        push_padded(&mut buf, "abc");
        assert_eq!(buf, b"abc\0");
    }

    #[test]
    fn default_identity_matches_reference() {
        let identity = EndpointIdentity::default();
        assert_eq!(identity.name(), "NetUMP");
        assert_eq!(identity.product_instance_id(), "DefaultID");
        assert_eq!(identity.name_words(), 2); // "NetUMP\0" = 7 bytes
        assert_eq!(identity.product_instance_id_words(), 3); // "DefaultID\0" = 10 bytes
    }

    #[test]
    fn name_length_limits() {
        let mut identity = EndpointIdentity::default();
        assert!(identity.set_name(&"x".repeat(97)).is_ok()); // 97 + NUL = 98
        assert!(matches!(
            identity.set_name(&"x".repeat(98)),
            Err(IdentityError::NameTooLong { .. })
        ));
        assert!(matches!(identity.set_name(""), Err(IdentityError::EmptyName)));
        // Failed setter leaves the previous value in place.
        assert_eq!(identity.name().len(), 97);
    }

    #[test]
    fn piid_length_limits() {
        let mut identity = EndpointIdentity::default();
        assert!(identity.set_product_instance_id(&"y".repeat(42)).is_ok()); // 42 + NUL = 43
        assert!(matches!(
            identity.set_product_instance_id(&"y".repeat(43)),
            Err(IdentityError::ProductInstanceIdTooLong { .. })
        ));
    }

    #[test]
    fn rejects_embedded_nul() {
        let mut identity = EndpointIdentity::default();
        assert!(matches!(
            identity.set_name("a\0b"),
            Err(IdentityError::EmbeddedNul { .. })
        ));
    }
}
