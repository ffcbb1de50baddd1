//! Service principal credentials read from the environment.
//!
//! Values are passed through unvalidated; the token provider fails when it
//! needs one that is absent.

use std::fmt;

pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";

/// Subscription used when `AZURE_SUBSCRIPTION_ID` is unset or empty.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "11111111-1111-1111-1111-111111111111";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub subscription_id: String,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let subscription_id = lookup(SUBSCRIPTION_ID_VAR)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBSCRIPTION_ID.to_string());
        Self {
            tenant_id: lookup(TENANT_ID_VAR),
            client_id: lookup(CLIENT_ID_VAR),
            client_secret: lookup(CLIENT_SECRET_VAR),
            subscription_id,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}
