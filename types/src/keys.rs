//! Opaque reference keys and origin fingerprints.
//!
//! Providers, plans and locations are owned by external reference data; this
//! system only ever sees their identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::blake2b_256_multi;

/// Maximum byte length of any opaque key.
pub const MAX_KEY_LEN: usize = 128;

macro_rules! opaque_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Non-blank and at most [`MAX_KEY_LEN`] bytes.
            pub fn is_valid(&self) -> bool {
                !self.0.trim().is_empty() && self.0.len() <= MAX_KEY_LEN
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_key!(
    /// Identifier of a healthcare provider (e.g. an NPI).
    ProviderKey
);
opaque_key!(
    /// Identifier of an insurance plan.
    PlanKey
);
opaque_key!(
    /// Identifier of one practice location of a provider.
    LocationKey
);

/// The unique key of an acceptance record: (provider, plan, location?).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcceptanceKey {
    pub provider: ProviderKey,
    pub plan: PlanKey,
    pub location: Option<LocationKey>,
}

impl AcceptanceKey {
    pub fn new(provider: impl Into<ProviderKey>, plan: impl Into<PlanKey>) -> Self {
        Self {
            provider: provider.into(),
            plan: plan.into(),
            location: None,
        }
    }

    /// Narrow this key to a single practice location.
    pub fn at(mut self, location: impl Into<LocationKey>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_valid(&self) -> bool {
        self.provider.is_valid()
            && self.plan.is_valid()
            && self.location.as_ref().map_or(true, LocationKey::is_valid)
    }

    /// Self-delimiting binary encoding.
    ///
    /// Every segment is length-prefixed and the location carries a presence
    /// flag, so no encoded key is a prefix of another. Storage backends use
    /// this both as the unique record key and as a scan prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        let provider = self.provider.as_str().as_bytes();
        let plan = self.plan.as_str().as_bytes();
        let location = self.location.as_ref().map(|l| l.as_str().as_bytes());
        let mut out =
            Vec::with_capacity(6 + provider.len() + plan.len() + location.map_or(0, <[u8]>::len));
        push_segment(&mut out, provider);
        push_segment(&mut out, plan);
        match location {
            Some(l) => {
                out.push(1);
                push_segment(&mut out, l);
            }
            None => out.push(0),
        }
        out
    }
}

fn push_segment(out: &mut Vec<u8>, segment: &[u8]) {
    // Keys are bounded by MAX_KEY_LEN; u16 leaves ample headroom.
    out.extend_from_slice(&(segment.len().min(u16::MAX as usize) as u16).to_be_bytes());
    out.extend_from_slice(segment);
}

impl fmt::Display for AcceptanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.plan)?;
        if let Some(location) = &self.location {
            write!(f, "@{location}")?;
        }
        Ok(())
    }
}

/// Hashed identity of whoever sent a submission or vote.
///
/// Built from either a client IP or an authenticated user id; the raw value
/// never reaches storage.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-hashed fingerprint.
    pub fn new(hashed: impl Into<String>) -> Self {
        Self(hashed.into())
    }

    pub fn from_ip(ip: &str) -> Self {
        Self(hex::encode(blake2b_256_multi(&[b"ip", ip.trim().as_bytes()])))
    }

    pub fn from_user_id(user_id: &str) -> Self {
        Self(hex::encode(blake2b_256_multi(&[b"user", user_id.trim().as_bytes()])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && self.0.len() <= MAX_KEY_LEN
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
