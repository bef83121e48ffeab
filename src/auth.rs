// ABOUTME: Client identities and the authentication, authorization, and rate-limit guard
// ABOUTME: Bearer credentials are matched as SHA-256 digests in constant time and never logged
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::IdentityConfig;
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::secrets::SecretResolver;
use crate::types::GatewayError;

/// Scheme prefix expected in the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

type CredentialDigest = [u8; 32];

fn digest(credential: &str) -> CredentialDigest {
    Sha256::digest(credential.as_bytes()).into()
}

/// A recognized caller of the gateway
///
/// Built from configuration at startup and immutable afterwards.
#[derive(Clone)]
pub struct ClientIdentity {
    /// Unique identity id
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    credential_digest: CredentialDigest,
    /// Adapters this identity may reach; empty means all
    pub allowed_adapters: BTreeSet<String>,
    /// Request quota, `None` for unlimited
    pub rate_limit: Option<RateLimitPolicy>,
}

impl ClientIdentity {
    /// Create an identity with no adapter restrictions and no rate limit
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, credential: &str) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            credential_digest: digest(credential),
            allowed_adapters: BTreeSet::new(),
            rate_limit: None,
        }
    }

    /// Restrict the identity to the given adapters
    #[must_use]
    pub fn with_allowed_adapters<I, S>(mut self, adapters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_adapters = adapters.into_iter().map(Into::into).collect();
        self
    }

    /// Apply a request quota
    #[must_use]
    pub const fn with_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }

    /// Whether the identity may reach `adapter`
    pub fn allows(&self, adapter: &str) -> bool {
        self.allowed_adapters.is_empty() || self.allowed_adapters.contains(adapter)
    }

    fn matches(&self, candidate: &CredentialDigest) -> bool {
        self.credential_digest[..].ct_eq(&candidate[..]).into()
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("credential", &"<redacted>")
            .field("allowed_adapters", &self.allowed_adapters)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

/// Authentication, authorization, and rate-limit checks for every transport
///
/// Built once at startup; the embedded [`RateLimiter`] is shared by every
/// request so quotas persist across calls and transports.
#[derive(Debug)]
pub struct Guard {
    identities: Vec<Arc<ClientIdentity>>,
    limiter: RateLimiter,
}

impl Guard {
    /// Create a guard over a fixed identity table
    pub fn new(identities: Vec<ClientIdentity>) -> Result<Self, GatewayError> {
        let mut ids = HashSet::new();
        let mut digests = HashSet::new();
        for identity in &identities {
            if !ids.insert(identity.id.clone()) {
                return Err(GatewayError::config(format!(
                    "duplicate identity id: {}",
                    identity.id
                )));
            }
            if !digests.insert(identity.credential_digest) {
                return Err(GatewayError::config(format!(
                    "identity '{}' shares a credential with another identity",
                    identity.id
                )));
            }
        }

        Ok(Self {
            identities: identities.into_iter().map(Arc::new).collect(),
            limiter: RateLimiter::new(),
        })
    }

    /// Build a guard from config, resolving every credential reference
    pub async fn from_config(
        configs: &[IdentityConfig],
        secrets: &SecretResolver,
    ) -> Result<Self, GatewayError> {
        let mut identities = Vec::with_capacity(configs.len());
        for config in configs {
            let credential = secrets.resolve(&config.credential).await?;
            if credential.is_empty() {
                return Err(GatewayError::config(format!(
                    "identity '{}' has an empty credential",
                    config.id
                )));
            }

            let display_name = config.display_name.clone().unwrap_or_else(|| config.id.clone());
            let mut identity = ClientIdentity::new(config.id.clone(), display_name, &credential)
                .with_allowed_adapters(config.allowed_adapters.iter().cloned());
            if let Some(limit) = &config.rate_limit {
                identity = identity.with_rate_limit(limit.to_policy()?);
            }
            debug!(
                identity = %identity.id,
                allowed = identity.allowed_adapters.len(),
                rate_limited = identity.rate_limit.is_some(),
                "Loaded client identity"
            );
            identities.push(identity);
        }
        Self::new(identities)
    }

    /// Match a credential to an identity
    ///
    /// Every identity is compared so the running time does not depend on
    /// which entry (if any) matches.
    pub fn authenticate(&self, credential: &str) -> Result<Arc<ClientIdentity>, GatewayError> {
        let candidate = digest(credential);
        let mut matched = None;
        for identity in &self.identities {
            if identity.matches(&candidate) && matched.is_none() {
                matched = Some(Arc::clone(identity));
            }
        }

        matched.ok_or_else(|| {
            warn!("Rejected request with unrecognized credential");
            GatewayError::authentication("Invalid credential")
        })
    }

    /// Authenticate the value of an `Authorization` header
    pub fn authenticate_header(
        &self,
        header: Option<&str>,
    ) -> Result<Arc<ClientIdentity>, GatewayError> {
        match header {
            Some(value) => match value.strip_prefix(BEARER_PREFIX) {
                Some(token) => self.authenticate(token.trim()),
                None => Err(GatewayError::authentication(
                    "Authorization header must use Bearer scheme",
                )),
            },
            None => Err(GatewayError::authentication("Missing Authorization header")),
        }
    }

    /// Reject `adapter` unless it is in the identity's allow-list
    pub fn authorize(&self, identity: &ClientIdentity, adapter: &str) -> Result<(), GatewayError> {
        if identity.allows(adapter) {
            Ok(())
        } else {
            debug!(identity = %identity.id, adapter, "Adapter not permitted for identity");
            Err(GatewayError::permission_denied(&identity.id, adapter))
        }
    }

    /// Record one request against the identity's quota
    pub fn check_rate(&self, identity: &ClientIdentity) -> Result<(), GatewayError> {
        let Some(policy) = &identity.rate_limit else {
            return Ok(());
        };

        self.limiter.check(&identity.id, policy).map_err(|retry_after| {
            debug!(
                identity = %identity.id,
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            GatewayError::rate_limited(retry_after)
        })
    }

    /// Requests left in the identity's current window, `None` when unlimited
    pub fn remaining(&self, identity: &ClientIdentity) -> Option<u32> {
        identity
            .rate_limit
            .as_ref()
            .map(|policy| self.limiter.remaining(&identity.id, policy))
    }

    /// Look up an identity by id
    pub fn identity(&self, id: &str) -> Option<Arc<ClientIdentity>> {
        self.identities.iter().find(|i| i.id == id).cloned()
    }

    /// Number of configured identities
    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}
