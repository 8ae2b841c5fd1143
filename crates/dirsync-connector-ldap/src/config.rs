//! LDAP reader configuration
//!
//! Configuration types for LDAP/Active Directory group snapshots.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Configuration for the LDAP group reader.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server hostname or IP address.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Base DN for all operations (e.g., "dc=example,dc=com").
    pub base_dn: String,

    /// Bind DN for authentication (e.g., "cn=reader,dc=example,dc=com").
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Group container DN (e.g., "ou=groups" - relative to `base_dn`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_container: Option<String>,

    /// LDAP filter selecting group objects.
    #[serde(default = "default_group_filter")]
    pub group_filter: String,

    /// Attribute holding the stable group identifier.
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    /// Whether the identifier attribute holds raw bytes (objectGUID). Binary
    /// identifiers are always base64-encoded, including values the LDAP
    /// client happened to decode as UTF-8.
    #[serde(default = "default_id_attribute_binary")]
    pub id_attribute_binary: bool,

    /// Attribute holding the short account name. `cn` is used when absent.
    #[serde(default = "default_account_attribute")]
    pub account_attribute: String,

    /// Page size for the paged search control.
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("group_container", &self.group_container)
            .field("group_filter", &self.group_filter)
            .field("id_attribute", &self.id_attribute)
            .field("id_attribute_binary", &self.id_attribute_binary)
            .field("account_attribute", &self.account_attribute)
            .field("page_size", &self.page_size)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_group_filter() -> String {
    "(objectClass=group)".to_string()
}

fn default_id_attribute() -> String {
    "objectGUID".to_string()
}

fn default_id_attribute_binary() -> bool {
    true
}

/// Attributes stored as raw bytes by Active Directory.
const BINARY_ID_ATTRIBUTES: [&str; 3] = ["objectGUID", "objectSid", "mS-DS-ConsistencyGuid"];

fn default_account_attribute() -> String {
    "sAMAccountName".to_string()
}

fn default_page_size() -> i32 {
    500
}

fn default_connection_timeout_secs() -> u64 {
    30
}

impl LdapConfig {
    /// Create a new LDAP config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            group_container: None,
            group_filter: default_group_filter(),
            id_attribute: default_id_attribute(),
            id_attribute_binary: default_id_attribute_binary(),
            account_attribute: default_account_attribute(),
            page_size: default_page_size(),
            connection_timeout_secs: default_connection_timeout_secs(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Enable STARTTLS.
    #[must_use]
    pub fn with_starttls(mut self) -> Self {
        self.use_starttls = true;
        self
    }

    /// Set group container.
    pub fn with_group_container(mut self, container: impl Into<String>) -> Self {
        self.group_container = Some(container.into());
        self
    }

    /// Set the group filter.
    pub fn with_group_filter(mut self, filter: impl Into<String>) -> Self {
        self.group_filter = filter.into();
        self
    }

    /// Use OpenLDAP defaults: `entryUUID` ids, `cn` account names, `groupOfNames` objects.
    #[must_use]
    pub fn for_openldap(mut self) -> Self {
        self = self.with_id_attribute("entryUUID");
        self.account_attribute = "cn".to_string();
        self.group_filter = "(|(objectClass=groupOfNames)(objectClass=groupOfUniqueNames))".to_string();
        self
    }

    /// Set the identifier attribute. Known binary AD attributes are
    /// flagged as binary; anything else is read as text.
    pub fn with_id_attribute(mut self, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        self.id_attribute_binary = BINARY_ID_ATTRIBUTES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&attribute));
        self.id_attribute = attribute;
        self
    }

    /// Get the full group container DN.
    #[must_use]
    pub fn group_dn(&self) -> String {
        match &self.group_container {
            Some(container) => format!("{},{}", container, self.base_dn),
            None => self.base_dn.clone(),
        }
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConnectorResult<()> {
        if self.host.is_empty() {
            return Err(ConnectorError::invalid_configuration("host is required"));
        }

        if self.base_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("base_dn is required"));
        }

        if self.bind_dn.is_empty() {
            return Err(ConnectorError::invalid_configuration("bind_dn is required"));
        }

        if self.use_ssl && self.use_starttls {
            return Err(ConnectorError::invalid_configuration(
                "cannot use both SSL and STARTTLS",
            ));
        }

        if self.id_attribute.is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "id_attribute is required",
            ));
        }

        let filter = self.group_filter.trim();
        if !(filter.starts_with('(') && filter.ends_with(')')) {
            return Err(ConnectorError::invalid_configuration(format!(
                "group_filter must be a parenthesized LDAP filter, got '{}'",
                self.group_filter
            )));
        }

        if self.page_size <= 0 {
            return Err(ConnectorError::invalid_configuration(
                "page_size must be positive",
            ));
        }

        Ok(())
    }

    /// Copy of this configuration with the bind password masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some("***REDACTED***".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LdapConfig {
        LdapConfig::new("dc1.corp.example.com", "DC=corp,DC=example,DC=com", "CN=reader")
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.port, 389);
        assert_eq!(config.id_attribute, "objectGUID");
        assert_eq!(config.account_attribute, "sAMAccountName");
        assert_eq!(config.page_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_and_group_dn() {
        let config = config().with_ssl().with_group_container("OU=Groups");
        assert_eq!(config.url(), "ldaps://dc1.corp.example.com:636");
        assert_eq!(config.group_dn(), "OU=Groups,DC=corp,DC=example,DC=com");
    }

    #[test]
    fn test_ssl_and_starttls_conflict() {
        let err = config().with_ssl().with_starttls().validate().unwrap_err();
        assert!(err.to_string().contains("both SSL and STARTTLS"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let err = config()
            .with_group_filter("objectClass=group")
            .validate()
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_password_is_redacted() {
        let config = config().with_password("hunter2");
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***REDACTED***"));
        assert_eq!(
            config.redacted().bind_password.as_deref(),
            Some("***REDACTED***")
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: LdapConfig = serde_json::from_str(
            r#"{"host":"ldap.example.com","base_dn":"dc=example,dc=com","bind_dn":"cn=reader"}"#,
        )
        .unwrap();
        assert_eq!(config.group_filter, "(objectClass=group)");
        assert_eq!(config.connection_timeout_secs, 30);
    }

    #[test]
    fn test_openldap_preset() {
        let config = config().for_openldap();
        assert_eq!(config.id_attribute, "entryUUID");
        assert!(!config.id_attribute_binary);
        assert_eq!(config.account_attribute, "cn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_id_attribute_binary_detection() {
        assert!(config().id_attribute_binary);
        assert!(config().with_id_attribute("objectguid").id_attribute_binary);
        assert!(config().with_id_attribute("objectSid").id_attribute_binary);
        assert!(!config().with_id_attribute("entryUUID").id_attribute_binary);
    }
}
