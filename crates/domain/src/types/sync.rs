//! Sync bookkeeping types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::errors::LinkError;

/// The synchronizable resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncResource {
    Invoices,
    Accounts,
    Transactions,
}

impl SyncResource {
    /// All resource kinds, in the order `sync_all` dispatches them.
    pub const ALL: [Self; 3] = [Self::Invoices, Self::Accounts, Self::Transactions];

    /// Backend path segment for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoices => "invoices",
            Self::Accounts => "accounts",
            Self::Transactions => "transactions",
        }
    }

    /// Persistent-store key of this resource's cached listing.
    #[must_use]
    pub fn listing_cache_key(&self) -> &'static str {
        match self {
            Self::Invoices => constants::KEY_INVOICES_CACHE,
            Self::Accounts => constants::KEY_ACCOUNTS_CACHE,
            Self::Transactions => constants::KEY_TRANSACTIONS_CACHE,
        }
    }
}

impl std::fmt::Display for SyncResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-resource last-successful-sync timestamps, persisted independently of
/// the connection state. Each field is set only by a successful sync of that
/// resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTimestamps {
    pub invoices: Option<DateTime<Utc>>,
    pub accounts: Option<DateTime<Utc>>,
    pub transactions: Option<DateTime<Utc>>,
}

impl SyncTimestamps {
    /// Timestamp for one resource.
    #[must_use]
    pub fn get(&self, resource: SyncResource) -> Option<DateTime<Utc>> {
        match resource {
            SyncResource::Invoices => self.invoices,
            SyncResource::Accounts => self.accounts,
            SyncResource::Transactions => self.transactions,
        }
    }

    /// Record a successful sync of one resource.
    pub fn record(&mut self, resource: SyncResource, at: DateTime<Utc>) {
        match resource {
            SyncResource::Invoices => self.invoices = Some(at),
            SyncResource::Accounts => self.accounts = Some(at),
            SyncResource::Transactions => self.transactions = Some(at),
        }
    }
}

/// Successful sync of a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub resource: SyncResource,
    /// Backend status message, verbatim
    pub message: String,
    pub synced_at: DateTime<Utc>,
}

/// Result of syncing one resource.
pub type SyncResult = std::result::Result<SyncOutcome, LinkError>;

/// Aggregate status of a `sync_all` run.
///
/// `Success` only when every individual sync succeeded; a mixed run is
/// `Partial` and must be surfaced distinctly from a uniform success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAllStatus {
    Success,
    Partial,
    Failed,
}

/// Report of a concurrent sync of all resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAllReport {
    pub invoices: SyncResult,
    pub accounts: SyncResult,
    pub transactions: SyncResult,
}

impl SyncAllReport {
    fn results(&self) -> [&SyncResult; 3] {
        [&self.invoices, &self.accounts, &self.transactions]
    }

    /// Aggregate status across the three resources.
    #[must_use]
    pub fn status(&self) -> SyncAllStatus {
        let successes = self.results().iter().filter(|r| r.is_ok()).count();
        match successes {
            3 => SyncAllStatus::Success,
            0 => SyncAllStatus::Failed,
            _ => SyncAllStatus::Partial,
        }
    }

    /// First failure message, if any resource failed.
    #[must_use]
    pub fn first_failure(&self) -> Option<String> {
        self.results().iter().find_map(|r| r.as_ref().err().map(ToString::to_string))
    }
}
