//! Configuration seam
//!
//! Package building itself needs no configuration. Front ends that upload or
//! sign packages read credentials and the signing key through
//! [`ConfigSource`]; where those values live is up to the implementor.

use std::path::PathBuf;

/// Server credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
}

/// Source of user configuration
pub trait ConfigSource {
    /// Server credentials, if both parts are configured
    fn credentials(&self) -> Option<Credentials>;

    /// Path of the private key used to sign packages
    fn private_key_path(&self) -> Option<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ConfigSource for Fixed {
        fn credentials(&self) -> Option<Credentials> {
            Some(Credentials {
                access_key: "id".to_string(),
                secret_key: "secret".to_string(),
            })
        }

        fn private_key_path(&self) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_config_source_is_object_safe() {
        let source: &dyn ConfigSource = &Fixed;
        assert_eq!(
            source.credentials().map(|c| c.access_key),
            Some("id".to_string())
        );
        assert_eq!(source.private_key_path(), None);
    }
}
