//! Credentials read from configuration
//!
//! Server passwords and receipt shared secrets are [`SecretString`]s. The inner
//! [`SecretValue`] is zeroed on drop and `Debug` prints `Secret([REDACTED])`.
//!
//! ```rust
//! use ediflow::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let secret = secret_string("abracadabra".to_string());
//! assert!(secret.expose_secret().matches("abracadabra"));
//! assert!(!format!("{secret:?}").contains("abracadabra"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Plain credential text, only reachable through `expose_secret()`
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

/// Configuration credential
pub type SecretString = Secret<SecretValue>;

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl SecretValue {
    /// Compares a candidate through SHA-256 digests of both sides
    ///
    /// The digests have a fixed length and every byte is folded, so the running time
    /// does not depend on the position of the first difference.
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = Sha256::digest(self.0.as_bytes());
        let actual = Sha256::digest(candidate.as_bytes());
        expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl From<String> for SecretValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Serialize for SecretValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

/// Wraps a plain string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_debug_is_redacted() {
        let secret = secret_string("ftp-password".to_string());
        let debug_output = format!("{secret:?}");
        assert!(!debug_output.contains("ftp-password"));
        assert!(debug_output.contains("REDACTED"));
    }

    #[test]
    fn test_matches() {
        let secret = secret_string("s3cret".to_string());
        assert!(secret.expose_secret().matches("s3cret"));
        assert!(!secret.expose_secret().matches("s3cret "));
        assert!(!secret.expose_secret().matches(""));
        assert_eq!(secret.expose_secret(), "s3cret");
    }

    #[test]
    fn test_deserializes_from_toml() {
        #[derive(Deserialize, Serialize)]
        struct User {
            shared_secret: SecretString,
        }

        let user: User = toml::from_str(r#"shared_secret = "abracadabra""#).unwrap();
        let secret: &str = user.shared_secret.expose_secret().as_ref();
        assert_eq!(secret, "abracadabra");

        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"shared_secret":"abracadabra"}"#);
    }
}
