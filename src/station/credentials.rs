//! Credential encoding for station association.
//!
//! The radio accepts credentials as fixed-capacity, non-terminated byte
//! buffers. [`BoundedBytes`] models that form directly: construction copies
//! at most the capacity and silently drops the rest. No terminator, no error
//! on oversize input; the radio reads exactly `len()` bytes.
//!
//! Two credential shapes exist: [`PersonalCredentials`] for PSK networks and
//! [`EnterpriseCredentials`] for 802.1X (EAP-TTLS) networks. Passphrase
//! material is wiped on drop and never appears in `Debug` output.

use std::borrow::Cow;
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length in bytes, as accepted by the radio.
pub const SSID_MAX_LEN: usize = 32;

/// Maximum passphrase length in bytes, as accepted by the radio.
pub const PASSPHRASE_MAX_LEN: usize = 64;

/// Maximum EAP identity length in bytes (outer and inner alike).
pub const IDENTITY_MAX_LEN: usize = 128;

/// Fixed-capacity byte buffer with silent truncation on construction.
///
/// Stores up to `N` bytes without a terminator. Values longer than the
/// capacity are cut at `N` bytes; shorter values are stored as-is.
#[derive(Clone, PartialEq, Eq, Zeroize)]
pub struct BoundedBytes<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> BoundedBytes<N> {
    /// Copies at most `N` bytes of `value`; the rest is silently dropped.
    pub fn new(value: &[u8]) -> Self {
        let len = value.len().min(N);
        let mut buf = [0u8; N];
        buf[..len].copy_from_slice(&value[..len]);
        Self { buf, len }
    }

    /// The stored bytes, at most `N` of them.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Number of stored bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lossy UTF-8 view, for log lines. SSIDs are byte strings on the wire;
    /// anything non-UTF-8 renders with replacement characters.
    pub fn display_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl<const N: usize> From<&str> for BoundedBytes<N> {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl<const N: usize> fmt::Debug for BoundedBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.display_lossy())
    }
}

/// SSID buffer.
pub type Ssid = BoundedBytes<SSID_MAX_LEN>;

/// Passphrase buffer.
pub type Passphrase = BoundedBytes<PASSPHRASE_MAX_LEN>;

/// EAP identity buffer.
pub type Identity = BoundedBytes<IDENTITY_MAX_LEN>;

/// Authentication mode for personal (PSK) networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Open network, no key.
    Open,
    Wep,
    Wpa,
    #[default]
    Wpa2Personal,
    WpaWpa2Personal,
    Wpa3Personal,
    Wpa2Wpa3Personal,
}

/// Inner (phase-2) method for EAP-TTLS enterprise authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase2Method {
    Eap,
    #[default]
    Mschapv2,
    Mschap,
    Pap,
    Chap,
}

/// PSK login material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PersonalCredentials {
    pub ssid: Ssid,
    pub passphrase: Passphrase,
    #[zeroize(skip)]
    pub auth_mode: AuthMode,
}

/// 802.1X login material (EAP-TTLS).
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EnterpriseCredentials {
    pub ssid: Ssid,
    /// Inner identity: the username the phase-2 method authenticates.
    pub identity: Identity,
    /// Outer identity, presented before the TLS tunnel is established.
    pub anonymous_identity: Identity,
    pub passphrase: Passphrase,
    #[zeroize(skip)]
    pub phase2: Phase2Method,
}

/// Login material for one connection attempt.
///
/// Exactly one variant is active per attempt; a new connect request replaces
/// whatever the radio held before.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum Credentials {
    Personal(PersonalCredentials),
    Enterprise(EnterpriseCredentials),
}

impl Credentials {
    /// Builds PSK credentials. Oversize fields are truncated silently.
    pub fn personal(ssid: &str, passphrase: &str, auth_mode: AuthMode) -> Self {
        Self::Personal(PersonalCredentials {
            ssid: Ssid::from(ssid),
            passphrase: Passphrase::from(passphrase),
            auth_mode,
        })
    }

    /// Builds enterprise credentials. Oversize fields are truncated silently.
    pub fn enterprise(
        ssid: &str,
        identity: &str,
        anonymous_identity: &str,
        passphrase: &str,
        phase2: Phase2Method,
    ) -> Self {
        Self::Enterprise(EnterpriseCredentials {
            ssid: Ssid::from(ssid),
            identity: Identity::from(identity),
            anonymous_identity: Identity::from(anonymous_identity),
            passphrase: Passphrase::from(passphrase),
            phase2,
        })
    }

    /// The SSID this attempt targets.
    pub fn ssid(&self) -> &Ssid {
        match self {
            Self::Personal(p) => &p.ssid,
            Self::Enterprise(e) => &e.ssid,
        }
    }
}

impl fmt::Debug for PersonalCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersonalCredentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<hidden>")
            .field("auth_mode", &self.auth_mode)
            .finish()
    }
}

impl fmt::Debug for EnterpriseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnterpriseCredentials")
            .field("ssid", &self.ssid)
            .field("identity", &self.identity)
            .field("anonymous_identity", &self.anonymous_identity)
            .field("passphrase", &"<hidden>")
            .field("phase2", &self.phase2)
            .finish()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal(p) => p.fmt(f),
            Self::Enterprise(e) => e.fmt(f),
        }
    }
}
