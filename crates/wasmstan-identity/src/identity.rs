//! Content-addressed model identities
//!
//! Provides [`ModelIdentity`], the opaque `models/<16 hex>` token handed to
//! collaborators in place of the identity the upstream service would compute,
//! and [`resolve`], the deterministic function producing it.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace every model identity lives under
pub const MODEL_NAMESPACE: &str = "models";

/// Number of hex characters kept from the digest
pub const ID_HEX_LEN: usize = 16;

/// Compute the identity of `source_code` compiled by the backend identified
/// by `backend_version`.
///
/// Hashes `source_code || backend_version` (no separator, fixed order) with
/// Blake3 and keeps the first [`ID_HEX_LEN`] lowercase hex characters.
/// Total over any input and free of per-process salting.
#[must_use]
pub fn resolve(source_code: &[u8], backend_version: &[u8]) -> ModelIdentity {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source_code);
    hasher.update(backend_version);
    let digest = hasher.finalize();
    let id = hex::encode(&digest.as_bytes()[..ID_HEX_LEN / 2]);
    ModelIdentity(format!("{MODEL_NAMESPACE}/{id}"))
}

/// Opaque model identity of the form `models/<id>`
///
/// Consumers only compare identities for equality or by prefix; the id part
/// carries no structure beyond being lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelIdentity(String);

impl ModelIdentity {
    /// Parse an identity from either `models/<hex>` or a bare `<hex>` id
    ///
    /// Hex digits are accepted in any case and normalized to lowercase.
    ///
    /// # Errors
    /// Returns [`IdentityError`] if the id part is empty or not hex
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let id = s
            .strip_prefix(MODEL_NAMESPACE)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(s);

        if id.is_empty() {
            return Err(IdentityError::EmptyId);
        }
        if let Some(bad) = id.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(IdentityError::InvalidCharacter(bad));
        }

        Ok(Self(format!("{MODEL_NAMESPACE}/{}", id.to_ascii_lowercase())))
    }

    /// The all-zero identity, `models/0000000000000000`
    #[must_use]
    pub fn zero() -> Self {
        Self(format!("{MODEL_NAMESPACE}/{}", "0".repeat(ID_HEX_LEN)))
    }

    /// Full token, `models/<id>`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id part without the namespace
    #[inline]
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.0[MODEL_NAMESPACE.len() + 1..]
    }

    /// Path segments, `["models", "<id>"]`
    #[inline]
    #[must_use]
    pub fn segments(&self) -> [&str; 2] {
        [MODEL_NAMESPACE, self.model_id()]
    }
}

impl Display for ModelIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModelIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModelIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelIdentity> for String {
    fn from(identity: ModelIdentity) -> Self {
        identity.0
    }
}

impl AsRef<str> for ModelIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ModelIdentity {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModelIdentity {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for ModelIdentity {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

/// Errors that can occur when parsing model identities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Nothing after the namespace
    #[error("model id is empty")]
    EmptyId,

    /// Id contains a non-hex character
    #[error("model id contains non-hex character {0:?}")]
    InvalidCharacter(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_has_namespace_and_sixteen_hex_chars() {
        let identity = resolve(b"data { int n; }", b"v1.2.3");
        let s = identity.as_str();

        assert!(s.starts_with("models/"));
        let id = identity.model_id();
        assert_eq!(id.len(), ID_HEX_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn resolve_is_stable() {
        let h1 = resolve(b"data { int n; }", b"v1.2.3");
        let h2 = resolve(b"data { int n; }", b"v1.2.3");
        assert_eq!(h1, h2);
    }

    #[test]
    fn resolve_depends_on_backend_version() {
        let h1 = resolve(b"data { int n; }", b"v1.2.3");
        let h2 = resolve(b"data { int n; }", b"v1.2.4");
        assert_ne!(h1, h2);
    }

    #[test]
    fn resolve_matches_blake3_prefix() {
        let expected = blake3::hash(b"parameters { real y; }v1");
        let identity = resolve(b"parameters { real y; }", b"v1");
        assert_eq!(identity.model_id(), &expected.to_hex()[..ID_HEX_LEN]);
    }

    #[test]
    fn parse_accepts_both_forms() {
        let a = ModelIdentity::parse("models/ABCdef0123456789").unwrap();
        let b = ModelIdentity::parse("abcdef0123456789").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "models/abcdef0123456789");
    }

    #[test]
    fn parse_rejects_empty_and_non_hex() {
        assert_eq!(ModelIdentity::parse("models/"), Err(IdentityError::EmptyId));
        assert_eq!(ModelIdentity::parse(""), Err(IdentityError::EmptyId));
        assert_eq!(
            ModelIdentity::parse("models/xyz"),
            Err(IdentityError::InvalidCharacter('x'))
        );
    }

    #[test]
    fn zero_identity_parses_back() {
        let zero = ModelIdentity::zero();
        assert_eq!(zero, "models/0000000000000000");
        assert_eq!(ModelIdentity::parse(zero.model_id()).unwrap(), zero);
    }

    #[test]
    fn segments_split_on_slash() {
        let identity = resolve(b"model", b"backend");
        let [ns, id] = identity.segments();
        assert_eq!(ns, "models");
        assert_eq!(format!("{ns}/{id}"), identity.to_string());
    }

    #[test]
    fn serde_as_plain_string() {
        let identity = resolve(b"model", b"backend");
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, format!("\"{identity}\""));

        let decoded: ModelIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, identity);

        assert!(serde_json::from_str::<ModelIdentity>("\"models/zz\"").is_err());
    }
}
