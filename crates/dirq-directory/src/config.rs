//! Connection configuration for the directory client.

use crate::{dn::DistinguishedName, Result};
use dirq_core::{ConnectionCause, Error};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default directory server URL.
pub const DEFAULT_URL: &str = "ldap://192.168.1.1:389";
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default per-operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to a directory server.
///
/// Immutable once constructed; the constructor validates the server URL and
/// the search base so no pipeline stage runs with a malformed target.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    url: String,
    bind_dn: String,
    bind_password: String,
    base_dn: DistinguishedName,
    tls_verify: bool,
    tls_ca_cert: Option<PathBuf>,
    connection_timeout_secs: u64,
    operation_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Creates a new connection configuration.
    ///
    /// An empty `bind_dn`/`bind_password` pair requests an anonymous bind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] with cause `malformed-uri` if `url` does
    /// not parse or uses a scheme other than `ldap` or `ldaps`, and
    /// [`Error::Usage`] if `base_dn` is empty or not a valid distinguished
    /// name.
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        base_dn: &str,
    ) -> Result<Self> {
        let url_string = url.into();
        let parsed = Url::parse(&url_string)?;
        match parsed.scheme() {
            "ldap" | "ldaps" => {}
            other => {
                return Err(Error::Connection {
                    cause: ConnectionCause::MalformedUri,
                    message: format!("unsupported scheme `{other}` in `{url_string}`"),
                });
            }
        }

        let base_dn = DistinguishedName::parse(base_dn)
            .map_err(|err| Error::Usage(format!("invalid search base: {err}")))?;

        Ok(Self {
            url: url_string,
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            base_dn,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        })
    }

    /// Returns the directory server URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the bind DN (empty for anonymous bind).
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Returns the bind password (empty for anonymous bind).
    #[must_use]
    pub fn bind_password(&self) -> &str {
        &self.bind_password
    }

    /// Returns true if the configuration requests an anonymous bind.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_empty() && self.bind_password.is_empty()
    }

    /// Returns the search base distinguished name.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the per-operation timeout duration.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirq_core::{ConnectionCause, Error};

    #[test]
    fn accepts_ldap_and_ldaps_schemes() {
        let config =
            ConnectionConfig::new("ldap://dir.example.org:389", "", "", "dc=example,dc=org")
                .unwrap();
        assert_eq!(config.url(), "ldap://dir.example.org:389");
        assert!(config.is_anonymous());

        ConnectionConfig::new("ldaps://dir.example.org:636", "", "", "dc=example,dc=org").unwrap();
    }

    #[test]
    fn rejects_malformed_uri() {
        let err = ConnectionConfig::new("not-a-uri", "", "", "dc=example,dc=org").unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                cause: ConnectionCause::MalformedUri,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let err = ConnectionConfig::new("http://dir.example.org", "", "", "dc=example,dc=org")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                cause: ConnectionCause::MalformedUri,
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_search_base() {
        let err = ConnectionConfig::new("ldap://dir.example.org", "", "", "").unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn builder_overrides() {
        let config = ConnectionConfig::new(
            "ldaps://dir.example.org",
            "cn=admin,dc=example,dc=org",
            "secret",
            "dc=example,dc=org",
        )
        .unwrap()
        .with_tls_verification(false)
        .with_connection_timeout_secs(5)
        .with_operation_timeout_secs(60);

        assert!(!config.is_anonymous());
        assert!(!config.tls_verify());
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
        assert_eq!(config.operation_timeout(), Duration::from_secs(60));
        assert_eq!(config.base_dn().as_str(), "dc=example,dc=org");
    }
}
