//! Browser ClientHello catalog and identifier resolution.
//!
//! Identifiers follow the `hello<family>_<version>` scheme. `_auto` identifiers resolve
//! through [`AUTO_ALIASES`], which is pinned to [`CATALOG_VERSION`] and only changes when
//! the catalog itself is revised.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::http2::Http2Settings;
use super::tls::suites::*;
use super::tls::{
    CertCompression, ClientHelloProfile, Extension, NamedGroup, SignatureScheme, TlsVersion,
    GREASE_PLACEHOLDER,
};
use crate::error::{Error, Result};

/// Revision of the profile catalog and its `_auto` aliases.
pub const CATALOG_VERSION: &str = "2019.02";

/// `_auto` identifier → concrete identifier.
pub const AUTO_ALIASES: &[(&str, &str)] = &[
    ("hellofirefox_auto", "hellofirefox_65"),
    ("hellochrome_auto", "hellochrome_72"),
    ("helloios_auto", "helloios_12_1"),
];

const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36";
const CHROME_70_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/70.0.3538.110 Safari/537.36";
const CHROME_62_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/62.0.3202.94 Safari/537.36";
const CHROME_58_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";
const FIREFOX_65_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:65.0) Gecko/20100101 Firefox/65.0";
const FIREFOX_63_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:63.0) Gecko/20100101 Firefox/63.0";
const FIREFOX_56_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:56.0) Gecko/20100101 Firefox/56.0";
const FIREFOX_55_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:55.0) Gecko/20100101 Firefox/55.0";
const IOS_12_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 12_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/12.0 Mobile/15E148 Safari/604.1";
const IOS_11_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_1 like Mac OS X) AppleWebKit/604.3.5 (KHTML, like Gecko) Version/11.0 Mobile/15B93 Safari/604.1";

const NULL_COMPRESSION: &[u8] = &[0];
const UNCOMPRESSED_POINTS: &[u8] = &[0];
const PSK_DHE_KE: &[u8] = &[1];

const H2_HTTP11: &[&str] = &["h2", "http/1.1"];
const IOS_ALPN: &[&str] = &["h2", "h2-16", "h2-15", "h2-14", "spdy/3.1", "spdy/3", "http/1.1"];

// Chrome

const CHROME_58_CIPHERS: &[u16] = &[
    GREASE_PLACEHOLDER,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_CHACHA20_POLY1305,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_AES256_CBC_SHA,
    RSA_AES128_GCM_SHA256,
    RSA_AES256_GCM_SHA384,
    RSA_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    RSA_3DES_EDE_CBC_SHA,
];

const CHROME_70_CIPHERS: &[u16] = &[
    GREASE_PLACEHOLDER,
    TLS_AES_128_GCM_SHA256,
    TLS_AES_256_GCM_SHA384,
    TLS_CHACHA20_POLY1305_SHA256,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_CHACHA20_POLY1305,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_AES256_CBC_SHA,
    RSA_AES128_GCM_SHA256,
    RSA_AES256_GCM_SHA384,
    RSA_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    RSA_3DES_EDE_CBC_SHA,
];

const CHROME_GROUPS: &[NamedGroup] = &[
    NamedGroup::Grease,
    NamedGroup::X25519,
    NamedGroup::P256,
    NamedGroup::P384,
];

const CHROME_SIGALGS_WITH_SHA1: &[SignatureScheme] = &[
    SignatureScheme::EcdsaP256Sha256,
    SignatureScheme::RsaPssSha256,
    SignatureScheme::RsaPkcs1Sha256,
    SignatureScheme::EcdsaP384Sha384,
    SignatureScheme::RsaPssSha384,
    SignatureScheme::RsaPkcs1Sha384,
    SignatureScheme::RsaPssSha512,
    SignatureScheme::RsaPkcs1Sha512,
    SignatureScheme::RsaPkcs1Sha1,
];

const CHROME_SIGALGS: &[SignatureScheme] = &[
    SignatureScheme::EcdsaP256Sha256,
    SignatureScheme::RsaPssSha256,
    SignatureScheme::RsaPkcs1Sha256,
    SignatureScheme::EcdsaP384Sha384,
    SignatureScheme::RsaPssSha384,
    SignatureScheme::RsaPkcs1Sha384,
    SignatureScheme::RsaPssSha512,
    SignatureScheme::RsaPkcs1Sha512,
];

const CHROME_VERSIONS: &[TlsVersion] = &[
    TlsVersion::Grease,
    TlsVersion::Tls13,
    TlsVersion::Tls12,
    TlsVersion::Tls11,
    TlsVersion::Tls10,
];

const CHROME_58_EXTENSIONS: &[Extension] = &[
    Extension::Grease,
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(CHROME_GROUPS),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::SignatureAlgorithms(CHROME_SIGALGS_WITH_SHA1),
    Extension::SignedCertificateTimestamp,
    Extension::ChannelId,
    Extension::Grease,
    Extension::Padding,
];

const CHROME_70_EXTENSIONS: &[Extension] = &[
    Extension::Grease,
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(CHROME_GROUPS),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::SignatureAlgorithms(CHROME_SIGALGS_WITH_SHA1),
    Extension::SignedCertificateTimestamp,
    Extension::KeyShare(&[NamedGroup::Grease, NamedGroup::X25519]),
    Extension::PskKeyExchangeModes(PSK_DHE_KE),
    Extension::SupportedVersions(CHROME_VERSIONS),
    Extension::CompressCertificate(&[CertCompression::Brotli]),
    Extension::Grease,
    Extension::Padding,
];

const CHROME_72_EXTENSIONS: &[Extension] = &[
    Extension::Grease,
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(CHROME_GROUPS),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::SignatureAlgorithms(CHROME_SIGALGS),
    Extension::SignedCertificateTimestamp,
    Extension::KeyShare(&[NamedGroup::Grease, NamedGroup::X25519]),
    Extension::PskKeyExchangeModes(PSK_DHE_KE),
    Extension::SupportedVersions(CHROME_VERSIONS),
    Extension::CompressCertificate(&[CertCompression::Brotli]),
    Extension::Grease,
    Extension::Padding,
];

pub const HELLO_CHROME_58: ClientHelloProfile = ClientHelloProfile {
    name: "hellochrome_58",
    cipher_suites: CHROME_58_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: CHROME_58_EXTENSIONS,
    user_agent: CHROME_58_UA,
    http2: Http2Settings::CHROME,
};

pub const HELLO_CHROME_62: ClientHelloProfile = ClientHelloProfile {
    name: "hellochrome_62",
    cipher_suites: CHROME_58_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: CHROME_58_EXTENSIONS,
    user_agent: CHROME_62_UA,
    http2: Http2Settings::CHROME,
};

pub const HELLO_CHROME_70: ClientHelloProfile = ClientHelloProfile {
    name: "hellochrome_70",
    cipher_suites: CHROME_70_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: CHROME_70_EXTENSIONS,
    user_agent: CHROME_70_UA,
    http2: Http2Settings::CHROME,
};

pub const HELLO_CHROME_72: ClientHelloProfile = ClientHelloProfile {
    name: "hellochrome_72",
    cipher_suites: CHROME_70_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: CHROME_72_EXTENSIONS,
    user_agent: CHROME_UA,
    http2: Http2Settings::CHROME,
};

// Firefox

const FIREFOX_55_CIPHERS: &[u16] = &[
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_CHACHA20_POLY1305,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_AES256_CBC_SHA,
    ECDHE_ECDSA_AES128_CBC_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_AES256_CBC_SHA,
    DHE_RSA_AES128_CBC_SHA,
    DHE_RSA_AES256_CBC_SHA,
    RSA_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    RSA_3DES_EDE_CBC_SHA,
];

const FIREFOX_63_CIPHERS: &[u16] = &[
    TLS_AES_128_GCM_SHA256,
    TLS_CHACHA20_POLY1305_SHA256,
    TLS_AES_256_GCM_SHA384,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_CHACHA20_POLY1305,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_AES256_CBC_SHA,
    ECDHE_ECDSA_AES128_CBC_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_AES256_CBC_SHA,
    DHE_RSA_AES128_CBC_SHA,
    DHE_RSA_AES256_CBC_SHA,
    RSA_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    RSA_3DES_EDE_CBC_SHA,
];

const FIREFOX_SIGALGS: &[SignatureScheme] = &[
    SignatureScheme::EcdsaP256Sha256,
    SignatureScheme::EcdsaP384Sha384,
    SignatureScheme::EcdsaP521Sha512,
    SignatureScheme::RsaPssSha256,
    SignatureScheme::RsaPssSha384,
    SignatureScheme::RsaPssSha512,
    SignatureScheme::RsaPkcs1Sha256,
    SignatureScheme::RsaPkcs1Sha384,
    SignatureScheme::RsaPkcs1Sha512,
    SignatureScheme::EcdsaSha1,
    SignatureScheme::RsaPkcs1Sha1,
];

const FIREFOX_55_EXTENSIONS: &[Extension] = &[
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(&[
        NamedGroup::X25519,
        NamedGroup::P256,
        NamedGroup::P384,
        NamedGroup::P521,
    ]),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::SignatureAlgorithms(FIREFOX_SIGALGS),
    Extension::Padding,
];

const FIREFOX_63_GROUPS: &[NamedGroup] = &[
    NamedGroup::X25519,
    NamedGroup::P256,
    NamedGroup::P384,
    NamedGroup::P521,
    NamedGroup::Ffdhe2048,
    NamedGroup::Ffdhe3072,
];

const FIREFOX_VERSIONS: &[TlsVersion] = &[
    TlsVersion::Tls13,
    TlsVersion::Tls12,
    TlsVersion::Tls11,
    TlsVersion::Tls10,
];

const FIREFOX_63_EXTENSIONS: &[Extension] = &[
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(FIREFOX_63_GROUPS),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::KeyShare(&[NamedGroup::X25519, NamedGroup::P256]),
    Extension::SupportedVersions(FIREFOX_VERSIONS),
    Extension::SignatureAlgorithms(FIREFOX_SIGALGS),
    Extension::PskKeyExchangeModes(PSK_DHE_KE),
    Extension::Padding,
];

const FIREFOX_65_EXTENSIONS: &[Extension] = &[
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::RenegotiationInfo,
    Extension::SupportedGroups(FIREFOX_63_GROUPS),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SessionTicket,
    Extension::Alpn(H2_HTTP11),
    Extension::StatusRequest,
    Extension::KeyShare(&[NamedGroup::X25519, NamedGroup::P256]),
    Extension::SupportedVersions(FIREFOX_VERSIONS),
    Extension::SignatureAlgorithms(FIREFOX_SIGALGS),
    Extension::PskKeyExchangeModes(PSK_DHE_KE),
    Extension::RecordSizeLimit(0x4001),
    Extension::Padding,
];

pub const HELLO_FIREFOX_55: ClientHelloProfile = ClientHelloProfile {
    name: "hellofirefox_55",
    cipher_suites: FIREFOX_55_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: FIREFOX_55_EXTENSIONS,
    user_agent: FIREFOX_55_UA,
    http2: Http2Settings::FIREFOX,
};

pub const HELLO_FIREFOX_56: ClientHelloProfile = ClientHelloProfile {
    name: "hellofirefox_56",
    cipher_suites: FIREFOX_55_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: FIREFOX_55_EXTENSIONS,
    user_agent: FIREFOX_56_UA,
    http2: Http2Settings::FIREFOX,
};

pub const HELLO_FIREFOX_63: ClientHelloProfile = ClientHelloProfile {
    name: "hellofirefox_63",
    cipher_suites: FIREFOX_63_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: FIREFOX_63_EXTENSIONS,
    user_agent: FIREFOX_63_UA,
    http2: Http2Settings::FIREFOX,
};

pub const HELLO_FIREFOX_65: ClientHelloProfile = ClientHelloProfile {
    name: "hellofirefox_65",
    cipher_suites: FIREFOX_63_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: FIREFOX_65_EXTENSIONS,
    user_agent: FIREFOX_65_UA,
    http2: Http2Settings::FIREFOX,
};

// iOS Safari

const IOS_11_CIPHERS: &[u16] = &[
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_CBC_SHA384,
    ECDHE_ECDSA_AES128_CBC_SHA256,
    ECDHE_ECDSA_AES256_CBC_SHA,
    ECDHE_ECDSA_AES128_CBC_SHA,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES256_CBC_SHA384,
    ECDHE_RSA_AES128_CBC_SHA256,
    ECDHE_RSA_AES256_CBC_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_CHACHA20_POLY1305,
    RSA_AES256_GCM_SHA384,
    RSA_AES128_GCM_SHA256,
    RSA_AES256_CBC_SHA256,
    RSA_AES128_CBC_SHA256,
    RSA_AES256_CBC_SHA,
    RSA_AES128_CBC_SHA,
];

const IOS_12_CIPHERS: &[u16] = &[
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_CBC_SHA384,
    ECDHE_ECDSA_AES128_CBC_SHA256,
    ECDHE_ECDSA_AES256_CBC_SHA,
    ECDHE_ECDSA_AES128_CBC_SHA,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES256_CBC_SHA384,
    ECDHE_RSA_AES128_CBC_SHA256,
    ECDHE_RSA_AES256_CBC_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_RSA_CHACHA20_POLY1305,
    RSA_AES256_GCM_SHA384,
    RSA_AES128_GCM_SHA256,
    RSA_AES256_CBC_SHA256,
    RSA_AES128_CBC_SHA256,
    RSA_AES256_CBC_SHA,
    RSA_AES128_CBC_SHA,
    ECDHE_ECDSA_3DES_EDE_CBC_SHA,
    ECDHE_RSA_3DES_EDE_CBC_SHA,
    RSA_3DES_EDE_CBC_SHA,
];

const IOS_GROUPS: &[NamedGroup] = &[
    NamedGroup::X25519,
    NamedGroup::P256,
    NamedGroup::P384,
    NamedGroup::P521,
];

const IOS_11_EXTENSIONS: &[Extension] = &[
    Extension::RenegotiationInfo,
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::SignatureAlgorithms(&[
        SignatureScheme::EcdsaP256Sha256,
        SignatureScheme::RsaPssSha256,
        SignatureScheme::RsaPkcs1Sha256,
        SignatureScheme::EcdsaP384Sha384,
        SignatureScheme::RsaPssSha384,
        SignatureScheme::RsaPkcs1Sha384,
        SignatureScheme::RsaPssSha512,
        SignatureScheme::RsaPkcs1Sha512,
        SignatureScheme::RsaPkcs1Sha1,
    ]),
    Extension::StatusRequest,
    Extension::NextProtocolNegotiation,
    Extension::SignedCertificateTimestamp,
    Extension::Alpn(IOS_ALPN),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SupportedGroups(IOS_GROUPS),
];

const IOS_12_EXTENSIONS: &[Extension] = &[
    Extension::RenegotiationInfo,
    Extension::ServerName,
    Extension::ExtendedMasterSecret,
    Extension::SignatureAlgorithms(&[
        SignatureScheme::EcdsaP256Sha256,
        SignatureScheme::RsaPssSha256,
        SignatureScheme::RsaPkcs1Sha256,
        SignatureScheme::EcdsaP384Sha384,
        SignatureScheme::EcdsaSha1,
        SignatureScheme::RsaPssSha384,
        SignatureScheme::RsaPssSha384,
        SignatureScheme::RsaPkcs1Sha384,
        SignatureScheme::RsaPssSha512,
        SignatureScheme::RsaPkcs1Sha512,
        SignatureScheme::RsaPkcs1Sha1,
    ]),
    Extension::StatusRequest,
    Extension::NextProtocolNegotiation,
    Extension::SignedCertificateTimestamp,
    Extension::Alpn(IOS_ALPN),
    Extension::EcPointFormats(UNCOMPRESSED_POINTS),
    Extension::SupportedGroups(IOS_GROUPS),
];

pub const HELLO_IOS_11_1: ClientHelloProfile = ClientHelloProfile {
    name: "helloios_11_1",
    cipher_suites: IOS_11_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: IOS_11_EXTENSIONS,
    user_agent: IOS_11_UA,
    http2: Http2Settings::SAFARI,
};

pub const HELLO_IOS_12_1: ClientHelloProfile = ClientHelloProfile {
    name: "helloios_12_1",
    cipher_suites: IOS_12_CIPHERS,
    compression_methods: NULL_COMPRESSION,
    extensions: IOS_12_EXTENSIONS,
    user_agent: IOS_12_UA,
    http2: Http2Settings::SAFARI,
};

static PROFILES: [ClientHelloProfile; 10] = [
    HELLO_FIREFOX_55,
    HELLO_FIREFOX_56,
    HELLO_FIREFOX_63,
    HELLO_FIREFOX_65,
    HELLO_CHROME_58,
    HELLO_CHROME_62,
    HELLO_CHROME_70,
    HELLO_CHROME_72,
    HELLO_IOS_11_1,
    HELLO_IOS_12_1,
];

/// Frozen identifier → profile map, built on first use.
static CATALOG: LazyLock<HashMap<&'static str, &'static ClientHelloProfile>> =
    LazyLock::new(|| {
        let mut catalog: HashMap<&'static str, &'static ClientHelloProfile> =
            PROFILES.iter().map(|p| (p.name, p)).collect();
        for &(alias, target) in AUTO_ALIASES {
            if let Some(profile) = catalog.get(target).copied() {
                catalog.insert(alias, profile);
            }
        }
        catalog
    });

/// Resolve a case-sensitive profile identifier.
///
/// Returns the same `'static` profile on every call for a given identifier.
pub fn resolve(identifier: &str) -> Result<&'static ClientHelloProfile> {
    CATALOG
        .get(identifier)
        .copied()
        .ok_or_else(|| Error::UnknownProfile(identifier.to_string()))
}

/// Every registered identifier, `_auto` aliases included, sorted.
pub fn identifiers() -> Vec<&'static str> {
    let mut ids: Vec<&'static str> = CATALOG.keys().copied().collect();
    ids.sort_unstable();
    ids
}
