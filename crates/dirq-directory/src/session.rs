//! Directory session lifecycle and search execution.

use crate::{
    config::ConnectionConfig,
    criteria::{DerefPolicy, SearchCriteria, SearchScope},
    dn::DistinguishedName,
    entry::DirectoryEntry,
    Result,
};
use async_trait::async_trait;
use dirq_core::{AuthCause, ConnectionCause, Error, SearchCause};
use ldap3::{
    DerefAliases, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Scope, SearchEntry,
    SearchOptions,
};
use native_tls::{Certificate, TlsConnector};
use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

impl From<DerefPolicy> for DerefAliases {
    fn from(policy: DerefPolicy) -> Self {
        match policy {
            DerefPolicy::Never => DerefAliases::Never,
            DerefPolicy::InSearching => DerefAliases::Searching,
            DerefPolicy::FindingBase => DerefAliases::Finding,
            DerefPolicy::Always => DerefAliases::Always,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapBackend: Send {
    async fn simple_bind(&mut self, bind_dn: &str, bind_password: &str) -> Result<()>;
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<DirectoryEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapBackend>>;
}

/// State of a directory session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The network session is open but no bind has succeeded.
    Connected,
    /// A simple bind succeeded; the session may be used for search.
    Authenticated,
    /// The session has been released.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Closed => "closed",
        })
    }
}

/// An open session to one directory server.
///
/// Owned exclusively by the run that created it. The session moves through
/// `Connected → Authenticated → Closed`; [`close`](Self::close) is idempotent
/// and must run on every exit path once a session exists.
pub struct DirectorySession {
    backend: Box<dyn LdapBackend>,
    state: SessionState,
}

impl DirectorySession {
    /// Returns the current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Performs a simple bind, transitioning the session to `Authenticated`
    /// on success. Empty credentials request an anonymous bind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the server rejects the bind or if the
    /// session is not in the `Connected` state; the session then remains
    /// unauthenticated.
    pub async fn bind(&mut self, bind_dn: &str, bind_password: &str) -> Result<()> {
        if self.state != SessionState::Connected {
            return Err(Error::Auth {
                cause: AuthCause::ProtocolError,
                message: format!("bind attempted on a {} session", self.state),
            });
        }
        self.backend.simple_bind(bind_dn, bind_password).await?;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Executes one search and returns the entries in server-delivery order.
    ///
    /// Requires an `Authenticated` session; any other state fails without a
    /// network call. On a failing server result (size limit, time limit,
    /// referral) partial entries are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`] on precondition violation, server-reported
    /// failure or transport failure.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<DirectoryEntry>> {
        if self.state != SessionState::Authenticated {
            return Err(Error::Search {
                cause: SearchCause::NotAuthenticated,
                message: format!("search requires an authenticated session, got {}", self.state),
            });
        }

        let entries = self.backend.search(criteria).await?;
        for entry in &entries {
            match DistinguishedName::parse(&entry.dn) {
                Ok(dn) if dn.is_descendant_of(criteria.base_dn()) => {}
                Ok(_) => warn!(dn = %entry.dn, "entry lies outside the search base"),
                Err(err) => warn!(dn = %entry.dn, "entry DN does not parse: {err}"),
            }
        }
        Ok(entries)
    }

    /// Releases the session. Idempotent: only the first call unbinds, later
    /// calls have no network effect. Unbind failures are logged, not
    /// propagated, so error paths can always run this before returning.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(err) = self.backend.unbind().await {
            warn!("failed to release directory session: {err}");
        }
        self.state = SessionState::Closed;
    }
}

/// Directory client with a pluggable LDAP backend.
pub struct DirectoryClient {
    config: Arc<ConnectionConfig>,
    connector: Box<dyn LdapConnector>,
}

impl DirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self { config, connector }
    }

    #[cfg(test)]
    pub(crate) fn with_connector(config: ConnectionConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }

    /// Establishes a network session to the configured server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the transport cannot be established;
    /// no session exists in that case and nothing needs to be released.
    pub async fn connect(&self) -> Result<DirectorySession> {
        let backend = self.connector.connect().await?;
        debug!(url = self.config.url(), "directory connection established");
        Ok(DirectorySession {
            backend,
            state: SessionState::Connected,
        })
    }

    /// Runs the full pipeline: connect, bind, search, close.
    ///
    /// The session is released on every path after it exists, including the
    /// bind-failure and search-failure paths.
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure; later stages do not run.
    pub async fn execute(&self, criteria: &SearchCriteria) -> Result<Vec<DirectoryEntry>> {
        let mut session = self.connect().await?;

        if let Err(err) = session
            .bind(self.config.bind_dn(), self.config.bind_password())
            .await
        {
            session.close().await;
            return Err(err);
        }
        info!(
            url = self.config.url(),
            anonymous = self.config.is_anonymous(),
            "bound to directory server"
        );

        debug!(
            base_dn = criteria.base_dn().as_str(),
            filter = criteria.filter(),
            "submitting search"
        );
        let outcome = session.search(criteria).await;
        session.close().await;
        outcome
    }
}

/// Real LDAP connector backed by `ldap3`.
struct RealLdapConnector {
    config: Arc<ConnectionConfig>,
}

impl RealLdapConnector {
    fn new(config: Arc<ConnectionConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapBackend>> {
        let settings = build_ldap_settings(&self.config)?;
        let (conn, ldap) = LdapConnAsync::with_settings(settings, self.config.url())
            .await
            .map_err(connect_error)?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapBackend {
            inner: ldap,
            operation_timeout: self.config.operation_timeout(),
        }))
    }
}

struct RealLdapBackend {
    inner: ldap3::Ldap,
    operation_timeout: Duration,
}

#[async_trait]
impl LdapBackend for RealLdapBackend {
    async fn simple_bind(&mut self, bind_dn: &str, bind_password: &str) -> Result<()> {
        let result = timeout(
            self.operation_timeout,
            self.inner.simple_bind(bind_dn, bind_password),
        )
        .await
        .map_err(|_| Error::Timeout("directory bind timed out".to_string()))?
        .map_err(bind_transport_error)?;

        if result.rc == 0 {
            Ok(())
        } else {
            Err(bind_result_error(&result))
        }
    }

    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<DirectoryEntry>> {
        let options = SearchOptions::new()
            .deref(criteria.deref_policy().into())
            .sizelimit(criteria.size_limit())
            .timelimit(criteria.time_limit());
        let attributes: Vec<&str> = criteria.attributes().iter().map(String::as_str).collect();

        let result = timeout(
            self.operation_timeout,
            self.inner.with_search_options(options).search(
                criteria.base_dn().as_str(),
                criteria.scope().into(),
                criteria.filter(),
                attributes,
            ),
        )
        .await
        .map_err(|_| Error::Timeout("directory search timed out".to_string()))?
        .map_err(search_error)?;

        // A failing result code discards any entries already received.
        let (entries, _done) = result.success().map_err(search_error)?;

        Ok(entries
            .into_iter()
            .filter(|raw| {
                if raw.is_ref() {
                    debug!("skipping continuation reference; paging is not supported");
                    false
                } else {
                    true
                }
            })
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        timeout(self.operation_timeout, self.inner.unbind())
            .await
            .map_err(|_| Error::Timeout("directory unbind timed out".to_string()))?
            .map_err(|err| Error::Search {
                cause: SearchCause::Transport,
                message: err.to_string(),
            })?;
        Ok(())
    }
}

fn build_ldap_settings(config: &ConnectionConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| Error::Connection {
                cause: ConnectionCause::Tls,
                message: format!("failed to construct TLS connector: {err}"),
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| Error::Connection {
            cause: ConnectionCause::Tls,
            message: format!("failed to read CA certificate {}: {err}", cert_path.display()),
        })?;
        let certificate = Certificate::from_pem(&pem).map_err(|err| Error::Connection {
            cause: ConnectionCause::Tls,
            message: format!("invalid CA certificate: {err}"),
        })?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| Error::Connection {
                cause: ConnectionCause::Tls,
                message: format!("failed to load CA certificate: {err}"),
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn connect_error(err: LdapError) -> Error {
    match err {
        LdapError::UrlParsing { source } => Error::Connection {
            cause: ConnectionCause::MalformedUri,
            message: source.to_string(),
        },
        LdapError::UnknownScheme(scheme) => Error::Connection {
            cause: ConnectionCause::MalformedUri,
            message: format!("unknown URL scheme `{scheme}`"),
        },
        LdapError::NativeTLS { source } => Error::Connection {
            cause: ConnectionCause::Tls,
            message: source.to_string(),
        },
        other => Error::Connection {
            cause: ConnectionCause::Network,
            message: other.to_string(),
        },
    }
}

fn bind_transport_error(err: LdapError) -> Error {
    match err {
        LdapError::LdapResult { result } => bind_result_error(&result),
        other => Error::Auth {
            cause: AuthCause::ProtocolError,
            message: other.to_string(),
        },
    }
}

// Result codes per RFC 4511: 49 invalidCredentials, 48 inappropriateAuthentication,
// 50 insufficientAccessRights, 53 unwillingToPerform, 7/8 unsupported auth method.
fn bind_result_error(result: &LdapResult) -> Error {
    let cause = match result.rc {
        49 => AuthCause::InvalidCredentials,
        7 | 8 | 48 | 50 | 53 => AuthCause::ServerRefused,
        _ => AuthCause::ProtocolError,
    };
    Error::Auth {
        cause,
        message: describe_result(result),
    }
}

fn search_error(err: LdapError) -> Error {
    match err {
        LdapError::LdapResult { result } => {
            // 3 timeLimitExceeded, 4 sizeLimitExceeded, 9/10 referral.
            let cause = match result.rc {
                3 => SearchCause::TimeLimitExceeded,
                4 => SearchCause::SizeLimitExceeded,
                9 | 10 => SearchCause::Referral,
                _ => SearchCause::Transport,
            };
            Error::Search {
                cause,
                message: describe_result(&result),
            }
        }
        LdapError::FilterParsing => Error::Search {
            cause: SearchCause::MalformedFilter,
            message: "filter expression did not parse".to_string(),
        },
        other => Error::Search {
            cause: SearchCause::Transport,
            message: other.to_string(),
        },
    }
}

fn describe_result(result: &LdapResult) -> String {
    if result.text.is_empty() {
        format!("server result code {}", result.rc)
    } else {
        format!("server result code {}: {}", result.rc, result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::SearchCriteria;
    use std::collections::HashMap;

    fn sample_config() -> ConnectionConfig {
        ConnectionConfig::new(
            "ldap://dir.example.org:389",
            "cn=admin,dc=example,dc=org",
            "secret",
            "dc=example,dc=org",
        )
        .unwrap()
    }

    fn sample_criteria() -> SearchCriteria {
        SearchCriteria::from_config(&sample_config())
    }

    fn sample_entry(dn: &str) -> DirectoryEntry {
        let mut attributes = HashMap::new();
        attributes.insert("cn".to_string(), vec!["sample".to_string()]);
        attributes.insert("objectClass".to_string(), vec!["top".to_string()]);
        DirectoryEntry {
            dn: dn.to_string(),
            attributes,
        }
    }

    fn auth_failure() -> Error {
        Error::Auth {
            cause: AuthCause::InvalidCredentials,
            message: "server result code 49".to_string(),
        }
    }

    #[tokio::test]
    async fn execute_returns_entries_in_order() {
        let mut backend = MockLdapBackend::new();
        backend.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        backend.expect_search().times(1).returning(|_| {
            Ok(vec![
                sample_entry("cn=alpha,dc=example,dc=org"),
                sample_entry("cn=beta,dc=example,dc=org"),
            ])
        });
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let entries = client.execute(&sample_criteria()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].dn, "cn=alpha,dc=example,dc=org");
        assert_eq!(entries[1].dn, "cn=beta,dc=example,dc=org");
    }

    #[tokio::test]
    async fn execute_propagates_connect_failure() {
        let mut connector = MockLdapConnector::new();
        connector.expect_connect().return_once(|| {
            Err(Error::Connection {
                cause: ConnectionCause::Network,
                message: "connection refused".to_string(),
            })
        });

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client.execute(&sample_criteria()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection {
                cause: ConnectionCause::Network,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn execute_closes_session_when_bind_fails() {
        let mut backend = MockLdapBackend::new();
        backend
            .expect_simple_bind()
            .times(1)
            .returning(|_, _| Err(auth_failure()));
        // No search expectation: a search call would panic the test.
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client.execute(&sample_criteria()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth {
                cause: AuthCause::InvalidCredentials,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn execute_closes_session_when_search_fails() {
        let mut backend = MockLdapBackend::new();
        backend.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        backend.expect_search().times(1).returning(|_| {
            Err(Error::Search {
                cause: SearchCause::SizeLimitExceeded,
                message: "server result code 4".to_string(),
            })
        });
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client.execute(&sample_criteria()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Search {
                cause: SearchCause::SizeLimitExceeded,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn search_requires_authenticated_session() {
        let backend = MockLdapBackend::new();
        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let mut session = client.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);

        let err = session.search(&sample_criteria()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Search {
                cause: SearchCause::NotAuthenticated,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn failed_bind_leaves_session_unauthenticated() {
        let mut backend = MockLdapBackend::new();
        backend
            .expect_simple_bind()
            .times(1)
            .returning(|_, _| Err(auth_failure()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let mut session = client.connect().await.unwrap();
        session.bind("cn=admin,dc=example,dc=org", "wrong").await.unwrap_err();
        assert_eq!(session.state(), SessionState::Connected);

        let err = session.search(&sample_criteria()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Search {
                cause: SearchCause::NotAuthenticated,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let mut backend = MockLdapBackend::new();
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let mut session = client.connect().await.unwrap();
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
        session.close().await;
        session.close().await;
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn bind_on_closed_session_is_rejected() {
        let mut backend = MockLdapBackend::new();
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let mut session = client.connect().await.unwrap();
        session.close().await;

        let err = session.bind("", "").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth {
                cause: AuthCause::ProtocolError,
                ..
            }
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn empty_search_result_is_not_an_error() {
        let mut backend = MockLdapBackend::new();
        backend.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        backend.expect_search().times(1).returning(|_| Ok(Vec::new()));
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let entries = client.execute(&sample_criteria()).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn entries_outside_base_are_still_returned() {
        let mut backend = MockLdapBackend::new();
        backend.expect_simple_bind().times(1).returning(|_, _| Ok(()));
        backend
            .expect_search()
            .times(1)
            .returning(|_| Ok(vec![sample_entry("cn=stray,dc=other,dc=org")]));
        backend.expect_unbind().times(1).returning(|| Ok(()));

        let mut connector = MockLdapConnector::new();
        connector
            .expect_connect()
            .return_once(move || Ok(Box::new(backend)));

        let client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let entries = client.execute(&sample_criteria()).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn bind_result_codes_map_to_causes() {
        let result = |rc| LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        };

        assert!(matches!(
            bind_result_error(&result(49)),
            Error::Auth {
                cause: AuthCause::InvalidCredentials,
                ..
            }
        ));
        assert!(matches!(
            bind_result_error(&result(53)),
            Error::Auth {
                cause: AuthCause::ServerRefused,
                ..
            }
        ));
        assert!(matches!(
            bind_result_error(&result(2)),
            Error::Auth {
                cause: AuthCause::ProtocolError,
                ..
            }
        ));
    }

    #[test]
    fn search_result_codes_map_to_causes() {
        let failure = |rc| {
            search_error(LdapError::LdapResult {
                result: LdapResult {
                    rc,
                    matched: String::new(),
                    text: String::new(),
                    refs: Vec::new(),
                    ctrls: Vec::new(),
                },
            })
        };

        assert!(matches!(
            failure(4),
            Error::Search {
                cause: SearchCause::SizeLimitExceeded,
                ..
            }
        ));
        assert!(matches!(
            failure(3),
            Error::Search {
                cause: SearchCause::TimeLimitExceeded,
                ..
            }
        ));
        assert!(matches!(
            failure(10),
            Error::Search {
                cause: SearchCause::Referral,
                ..
            }
        ));
        assert!(matches!(
            failure(80),
            Error::Search {
                cause: SearchCause::Transport,
                ..
            }
        ));
    }

    #[test]
    fn scope_and_deref_convert_to_protocol_values() {
        assert!(matches!(Scope::from(SearchScope::Base), Scope::Base));
        assert!(matches!(Scope::from(SearchScope::OneLevel), Scope::OneLevel));
        assert!(matches!(Scope::from(SearchScope::Subtree), Scope::Subtree));
        assert!(matches!(
            DerefAliases::from(DerefPolicy::Never),
            DerefAliases::Never
        ));
        assert!(matches!(
            DerefAliases::from(DerefPolicy::FindingBase),
            DerefAliases::Finding
        ));
    }
}
