// src/sas.rs
//
// Access-grant provider: time-bounded, scope-limited read tokens for one
// container or one blob, in the service shared-access-signature format.
//
// Signing is pure computation over the account key and the clock; a fresh
// grant is minted per listing or download and never cached or renewed. An
// operation that outlives its grant fails with an authorization error at the
// store, not here.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::{DEFAULT_GRANT_TTL, SAS_VERSION};
use crate::error::HarvestError;

type HmacSha256 = Hmac<Sha256>;

/// What a grant covers: the whole container, or a single blob within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Container,
    Blob(&'a str),
}

impl Scope<'_> {
    /// `sr` value on the wire.
    fn resource_tag(&self) -> &'static str {
        match self {
            Scope::Container => "c",
            Scope::Blob(_) => "b",
        }
    }
}

/// Read-only capability set carried by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub list: bool,
}

impl Permissions {
    /// Read a single object.
    pub const READ: Permissions = Permissions { read: true, list: false };
    /// Read and enumerate a container.
    pub const READ_LIST: Permissions = Permissions { read: true, list: true };

    /// `sp` value on the wire. Order is fixed by the signing format.
    fn as_str(&self) -> &'static str {
        match (self.read, self.list) {
            (true, true) => "rl",
            (true, false) => "r",
            (false, true) => "l",
            (false, false) => "",
        }
    }
}

/// A signed, time-bounded authorization to read one resource.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    /// When the grant stops working.
    pub expiry: DateTime<Utc>,
    /// Canonicalized resource path the signature covers.
    pub scope: String,
    /// Query-string form of the grant (no leading '?').
    pub token: String,
}

/// Mints grants for one account/container pair from its signing key.
#[derive(Clone)]
pub struct SasProvider {
    account: String,
    container: String,
    key: Vec<u8>,
}

impl SasProvider {
    /// Decode the base64 signing key up front; a malformed key is fatal for
    /// the whole run since no object can be accessed without it.
    pub fn new(account: &str, container: &str, key_b64: &str) -> Result<Self, HarvestError> {
        let key = B64
            .decode(key_b64.trim())
            .map_err(|e| HarvestError::MalformedSigningKey(e.to_string()))?;
        if key.is_empty() {
            return Err(HarvestError::MalformedSigningKey("empty key".to_string()));
        }
        Ok(SasProvider {
            account: account.to_string(),
            container: container.to_string(),
            key,
        })
    }

    /// Mint a grant valid from now for `ttl` (defaulting to one hour).
    pub fn grant(&self, scope: Scope<'_>, permissions: Permissions, ttl: Option<Duration>) -> AccessGrant {
        self.grant_at(scope, permissions, ttl.unwrap_or(DEFAULT_GRANT_TTL), Utc::now())
    }

    /// Deterministic variant: same key, scope, and clock produce the same
    /// signature.
    pub fn grant_at(
        &self,
        scope: Scope<'_>,
        permissions: Permissions,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AccessGrant {
        let expiry = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(1));
        let expiry_str = expiry.to_rfc3339_opts(SecondsFormat::Secs, true);
        let resource = self.canonicalized_resource(scope);

        // Service SAS string-to-sign, version 2020-12-06 layout.
        let string_to_sign = [
            permissions.as_str(),  // sp
            "",                    // st (no start bound)
            expiry_str.as_str(),   // se
            resource.as_str(),     // canonicalized resource
            "",                    // si
            "",                    // sip
            PROTOCOLS,             // spr
            SAS_VERSION,           // sv
            scope.resource_tag(),  // sr
            "",                    // sst
            "",                    // ses
            "",                    // rscc
            "",                    // rscd
            "",                    // rsce
            "",                    // rscl
            "",                    // rsct
        ]
        .join("\n");
        let signature = self.sign(&string_to_sign);

        let token = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("sv", SAS_VERSION)
            .append_pair("sp", permissions.as_str())
            .append_pair("sr", scope.resource_tag())
            .append_pair("se", &expiry_str)
            .append_pair("spr", PROTOCOLS)
            .append_pair("sig", &signature)
            .finish();

        AccessGrant { expiry, scope: resource, token }
    }

    fn canonicalized_resource(&self, scope: Scope<'_>) -> String {
        match scope {
            Scope::Container => format!("/blob/{}/{}", self.account, self.container),
            Scope::Blob(name) => format!("/blob/{}/{}/{}", self.account, self.container, name),
        }
    }

    fn sign(&self, string_to_sign: &str) -> String {
        // HMAC accepts keys of any length; construction cannot fail here.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key length");
        mac.update(string_to_sign.as_bytes());
        B64.encode(mac.finalize().into_bytes())
    }
}

/// Both schemes are accepted so emulator endpoints keep working.
const PROTOCOLS: &str = "https,http";

impl std::fmt::Debug for SasProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SasProvider")
            .field("account", &self.account)
            .field("container", &self.container)
            .field("key", &"<redacted>")
            .finish()
    }
}
