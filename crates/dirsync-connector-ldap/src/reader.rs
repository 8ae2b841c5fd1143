//! LDAP group snapshot reader.
//!
//! Produces the groups under the configured container as a stream of
//! [`SnapshotItem`]s. The search runs with the paged results control, so only
//! one page of entries is buffered at a time regardless of directory size.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchStream};
use tracing::{debug, info, instrument, warn};

use dirsync_core::{SnapshotError, SnapshotItem};

use crate::attributes::AttributeSet;
use crate::config::LdapConfig;
use crate::error::{ConnectorError, ConnectorResult};
use crate::groups::{group_sync_attributes, map_directory_group};

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Reads directory groups over LDAP.
#[derive(Debug, Clone)]
pub struct LdapGroupReader {
    config: Arc<LdapConfig>,
}

impl LdapGroupReader {
    /// Create a reader after validating the configuration.
    pub fn new(config: LdapConfig) -> ConnectorResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The reader configuration.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Open a connection and bind with the configured credentials.
    async fn connect(&self) -> ConnectorResult<Ldap> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {url}"),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = &self.config.bind_dn;
        let bind_password = self.config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| {
                ConnectorError::connection_failed_with_source(
                    format!("LDAP bind failed for {bind_dn}"),
                    e,
                )
            })?;

        if result.rc != 0 {
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(ConnectorError::AuthenticationFailed);
            }
            return Err(ConnectorError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(host = %self.config.host, "LDAP connection established");
        Ok(ldap)
    }

    /// Check that the server accepts the bind and the group container exists.
    #[instrument(skip(self), fields(host = %self.config.host))]
    pub async fn test_connection(&self) -> ConnectorResult<()> {
        let mut ldap = self.connect().await?;
        let group_dn = self.config.group_dn();

        let result = ldap
            .search(&group_dn, Scope::Base, "(objectClass=*)", vec!["dn"])
            .await
            .map_err(|e| ConnectorError::connection_failed_with_source("Test search failed", e))?;

        let (entries, _res) = result.success().map_err(|e| {
            ConnectorError::connection_failed_with_source("Test search failed", e)
        })?;

        if let Err(e) = ldap.unbind().await {
            debug!(error = %e, "LDAP unbind failed");
        }

        if entries.is_empty() {
            return Err(ConnectorError::connection_failed(format!(
                "Group container '{group_dn}' not found or not accessible"
            )));
        }

        info!("LDAP connection test successful");
        Ok(())
    }

    /// Start a full snapshot of the directory groups.
    ///
    /// Connection and bind failures are returned here. Failures once the
    /// stream is running surface as a [`SnapshotError::Source`] item, after
    /// which the stream ends. Entries that cannot be mapped surface as
    /// [`SnapshotError::Malformed`] and the stream continues.
    #[instrument(skip(self), fields(host = %self.config.host))]
    pub async fn snapshot(&self) -> ConnectorResult<BoxStream<'static, SnapshotItem>> {
        let mut ldap = self.connect().await?;
        let base = self.config.group_dn();
        let attrs = group_sync_attributes(&self.config);

        let adapters: Vec<Box<dyn Adapter<'static, String, Vec<String>>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.config.page_size)),
        ];

        let search = ldap
            .streaming_search_with(
                adapters,
                &base,
                Scope::Subtree,
                &self.config.group_filter,
                attrs,
            )
            .await
            .map_err(|e| {
                ConnectorError::operation_failed_with_source(
                    format!("Failed to start group search under {base}"),
                    e,
                )
            })?;

        info!(
            base = %base,
            filter = %self.config.group_filter,
            page_size = self.config.page_size,
            "Started directory group snapshot"
        );

        let state = SearchState {
            ldap,
            search,
            config: Arc::clone(&self.config),
            entries: 0,
        };

        Ok(stream::unfold(Some(state), next_item).boxed())
    }
}

struct SearchState {
    ldap: Ldap,
    search: SearchStream<'static, String, Vec<String>>,
    config: Arc<LdapConfig>,
    entries: u64,
}

async fn next_item(state: Option<SearchState>) -> Option<(SnapshotItem, Option<SearchState>)> {
    let mut state = state?;

    match state.search.next().await {
        Ok(Some(entry)) => {
            state.entries += 1;
            let attrs = AttributeSet::from(SearchEntry::construct(entry));
            let item = map_directory_group(&attrs, &state.config).map_err(SnapshotError::from);
            Some((item, Some(state)))
        }
        Ok(None) => {
            let result = state.search.finish().await;
            match result.success() {
                Ok(_) => {
                    info!(entries = state.entries, "Directory group snapshot complete");
                    if let Err(e) = state.ldap.unbind().await {
                        debug!(error = %e, "LDAP unbind failed");
                    }
                    None
                }
                Err(e) => Some((
                    Err(SnapshotError::source(format!(
                        "group search ended with an error after {} entries: {e}",
                        state.entries
                    ))),
                    None,
                )),
            }
        }
        Err(e) => Some((
            Err(SnapshotError::source(format!(
                "group search failed after {} entries: {e}",
                state.entries
            ))),
            None,
        )),
    }
}
