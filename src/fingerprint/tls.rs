//! ClientHello fingerprint description.
//!
//! A [`ClientHelloProfile`] lists cipher suites and extensions in the exact order a browser
//! puts them on the wire. The connector feeds every parameter BoringSSL exposes into the
//! handshake; the full ordering is kept for JA3 computation and for comparisons.

use md5::{Digest, Md5};

use super::http2::Http2Settings;

/// Placeholder for a GREASE value (RFC 8701). BoringSSL picks the concrete value.
pub const GREASE_PLACEHOLDER: u16 = 0x0a0a;

/// ClientHello `legacy_version`, fixed at TLS 1.2 for every modern client.
const LEGACY_VERSION: u16 = 0x0303;

/// Check if a u16 value is a GREASE value: 0x0A0A, 0x1A1A, ..., 0xFAFA.
pub fn is_grease(val: u16) -> bool {
    let hi = (val >> 8) as u8;
    let lo = val as u8;
    hi == lo && (hi & 0x0F) == 0x0A
}

/// Cipher suite code points used by the catalog.
pub mod suites {
    pub const TLS_AES_128_GCM_SHA256: u16 = 0x1301;
    pub const TLS_AES_256_GCM_SHA384: u16 = 0x1302;
    pub const TLS_CHACHA20_POLY1305_SHA256: u16 = 0x1303;
    pub const ECDHE_ECDSA_AES128_GCM_SHA256: u16 = 0xc02b;
    pub const ECDHE_RSA_AES128_GCM_SHA256: u16 = 0xc02f;
    pub const ECDHE_ECDSA_AES256_GCM_SHA384: u16 = 0xc02c;
    pub const ECDHE_RSA_AES256_GCM_SHA384: u16 = 0xc030;
    pub const ECDHE_ECDSA_CHACHA20_POLY1305: u16 = 0xcca9;
    pub const ECDHE_RSA_CHACHA20_POLY1305: u16 = 0xcca8;
    pub const ECDHE_ECDSA_AES128_CBC_SHA: u16 = 0xc009;
    pub const ECDHE_ECDSA_AES256_CBC_SHA: u16 = 0xc00a;
    pub const ECDHE_RSA_AES128_CBC_SHA: u16 = 0xc013;
    pub const ECDHE_RSA_AES256_CBC_SHA: u16 = 0xc014;
    pub const ECDHE_ECDSA_AES128_CBC_SHA256: u16 = 0xc023;
    pub const ECDHE_ECDSA_AES256_CBC_SHA384: u16 = 0xc024;
    pub const ECDHE_RSA_AES128_CBC_SHA256: u16 = 0xc027;
    pub const ECDHE_RSA_AES256_CBC_SHA384: u16 = 0xc028;
    pub const ECDHE_ECDSA_3DES_EDE_CBC_SHA: u16 = 0xc008;
    pub const ECDHE_RSA_3DES_EDE_CBC_SHA: u16 = 0xc012;
    pub const DHE_RSA_AES128_CBC_SHA: u16 = 0x0033;
    pub const DHE_RSA_AES256_CBC_SHA: u16 = 0x0039;
    pub const RSA_AES128_GCM_SHA256: u16 = 0x009c;
    pub const RSA_AES256_GCM_SHA384: u16 = 0x009d;
    pub const RSA_AES128_CBC_SHA: u16 = 0x002f;
    pub const RSA_AES256_CBC_SHA: u16 = 0x0035;
    pub const RSA_AES128_CBC_SHA256: u16 = 0x003c;
    pub const RSA_AES256_CBC_SHA256: u16 = 0x003d;
    pub const RSA_3DES_EDE_CBC_SHA: u16 = 0x000a;
}

/// BoringSSL cipher-string name for a TLS 1.2 (or older) suite.
///
/// TLS 1.3 suites and GREASE return `None`: BoringSSL does not accept them in the cipher
/// string. Suites BoringSSL has removed (DHE) are still named; non-strict parsing skips them.
pub fn cipher_name(id: u16) -> Option<&'static str> {
    use suites::*;
    let name = match id {
        ECDHE_ECDSA_AES128_GCM_SHA256 => "ECDHE-ECDSA-AES128-GCM-SHA256",
        ECDHE_RSA_AES128_GCM_SHA256 => "ECDHE-RSA-AES128-GCM-SHA256",
        ECDHE_ECDSA_AES256_GCM_SHA384 => "ECDHE-ECDSA-AES256-GCM-SHA384",
        ECDHE_RSA_AES256_GCM_SHA384 => "ECDHE-RSA-AES256-GCM-SHA384",
        ECDHE_ECDSA_CHACHA20_POLY1305 => "ECDHE-ECDSA-CHACHA20-POLY1305",
        ECDHE_RSA_CHACHA20_POLY1305 => "ECDHE-RSA-CHACHA20-POLY1305",
        ECDHE_ECDSA_AES128_CBC_SHA => "ECDHE-ECDSA-AES128-SHA",
        ECDHE_ECDSA_AES256_CBC_SHA => "ECDHE-ECDSA-AES256-SHA",
        ECDHE_RSA_AES128_CBC_SHA => "ECDHE-RSA-AES128-SHA",
        ECDHE_RSA_AES256_CBC_SHA => "ECDHE-RSA-AES256-SHA",
        ECDHE_ECDSA_AES128_CBC_SHA256 => "ECDHE-ECDSA-AES128-SHA256",
        ECDHE_ECDSA_AES256_CBC_SHA384 => "ECDHE-ECDSA-AES256-SHA384",
        ECDHE_RSA_AES128_CBC_SHA256 => "ECDHE-RSA-AES128-SHA256",
        ECDHE_RSA_AES256_CBC_SHA384 => "ECDHE-RSA-AES256-SHA384",
        ECDHE_ECDSA_3DES_EDE_CBC_SHA => "ECDHE-ECDSA-DES-CBC3-SHA",
        ECDHE_RSA_3DES_EDE_CBC_SHA => "ECDHE-RSA-DES-CBC3-SHA",
        DHE_RSA_AES128_CBC_SHA => "DHE-RSA-AES128-SHA",
        DHE_RSA_AES256_CBC_SHA => "DHE-RSA-AES256-SHA",
        RSA_AES128_GCM_SHA256 => "AES128-GCM-SHA256",
        RSA_AES256_GCM_SHA384 => "AES256-GCM-SHA384",
        RSA_AES128_CBC_SHA => "AES128-SHA",
        RSA_AES256_CBC_SHA => "AES256-SHA",
        RSA_AES128_CBC_SHA256 => "AES128-SHA256",
        RSA_AES256_CBC_SHA256 => "AES256-SHA256",
        RSA_3DES_EDE_CBC_SHA => "DES-CBC3-SHA",
        _ => return None,
    };
    Some(name)
}

/// Supported group (named curve or finite-field group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedGroup {
    Grease,
    X25519,
    P256,
    P384,
    P521,
    Ffdhe2048,
    Ffdhe3072,
}

impl NamedGroup {
    /// IANA code point.
    pub fn id(self) -> u16 {
        match self {
            Self::Grease => GREASE_PLACEHOLDER,
            Self::X25519 => 0x001d,
            Self::P256 => 0x0017,
            Self::P384 => 0x0018,
            Self::P521 => 0x0019,
            Self::Ffdhe2048 => 0x0100,
            Self::Ffdhe3072 => 0x0101,
        }
    }

    /// Name understood by BoringSSL's curves list, if supported.
    pub fn boring_name(self) -> Option<&'static str> {
        match self {
            Self::X25519 => Some("X25519"),
            Self::P256 => Some("P-256"),
            Self::P384 => Some("P-384"),
            Self::P521 => Some("P-521"),
            Self::Grease | Self::Ffdhe2048 | Self::Ffdhe3072 => None,
        }
    }
}

/// TLS signature scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    EcdsaP256Sha256,
    EcdsaP384Sha384,
    EcdsaP521Sha512,
    EcdsaSha1,
    RsaPssSha256,
    RsaPssSha384,
    RsaPssSha512,
    RsaPkcs1Sha256,
    RsaPkcs1Sha384,
    RsaPkcs1Sha512,
    RsaPkcs1Sha1,
}

impl SignatureScheme {
    pub fn id(self) -> u16 {
        match self {
            Self::EcdsaP256Sha256 => 0x0403,
            Self::EcdsaP384Sha384 => 0x0503,
            Self::EcdsaP521Sha512 => 0x0603,
            Self::EcdsaSha1 => 0x0203,
            Self::RsaPssSha256 => 0x0804,
            Self::RsaPssSha384 => 0x0805,
            Self::RsaPssSha512 => 0x0806,
            Self::RsaPkcs1Sha256 => 0x0401,
            Self::RsaPkcs1Sha384 => 0x0501,
            Self::RsaPkcs1Sha512 => 0x0601,
            Self::RsaPkcs1Sha1 => 0x0201,
        }
    }

    /// Name accepted by BoringSSL's sigalgs list.
    pub fn name(self) -> &'static str {
        match self {
            Self::EcdsaP256Sha256 => "ecdsa_secp256r1_sha256",
            Self::EcdsaP384Sha384 => "ecdsa_secp384r1_sha384",
            Self::EcdsaP521Sha512 => "ecdsa_secp521r1_sha512",
            Self::EcdsaSha1 => "ecdsa_sha1",
            Self::RsaPssSha256 => "rsa_pss_rsae_sha256",
            Self::RsaPssSha384 => "rsa_pss_rsae_sha384",
            Self::RsaPssSha512 => "rsa_pss_rsae_sha512",
            Self::RsaPkcs1Sha256 => "rsa_pkcs1_sha256",
            Self::RsaPkcs1Sha384 => "rsa_pkcs1_sha384",
            Self::RsaPkcs1Sha512 => "rsa_pkcs1_sha512",
            Self::RsaPkcs1Sha1 => "rsa_pkcs1_sha1",
        }
    }
}

/// Protocol version as advertised in `supported_versions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Grease,
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl TlsVersion {
    pub fn id(self) -> u16 {
        match self {
            Self::Grease => GREASE_PLACEHOLDER,
            Self::Tls10 => 0x0301,
            Self::Tls11 => 0x0302,
            Self::Tls12 => 0x0303,
            Self::Tls13 => 0x0304,
        }
    }

    pub(crate) fn to_ssl_version(self) -> Option<boring::ssl::SslVersion> {
        use boring::ssl::SslVersion;
        match self {
            Self::Grease => None,
            Self::Tls10 => Some(SslVersion::TLS1),
            Self::Tls11 => Some(SslVersion::TLS1_1),
            Self::Tls12 => Some(SslVersion::TLS1_2),
            Self::Tls13 => Some(SslVersion::TLS1_3),
        }
    }
}

/// Certificate compression algorithm (RFC 8879).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertCompression {
    Zlib,
    Brotli,
}

impl CertCompression {
    pub fn id(self) -> u16 {
        match self {
            Self::Zlib => 0x0001,
            Self::Brotli => 0x0002,
        }
    }
}

/// One ClientHello extension with the parameters that shape it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Grease,
    ServerName,
    ExtendedMasterSecret,
    RenegotiationInfo,
    SupportedGroups(&'static [NamedGroup]),
    EcPointFormats(&'static [u8]),
    SessionTicket,
    Alpn(&'static [&'static str]),
    StatusRequest,
    SignatureAlgorithms(&'static [SignatureScheme]),
    SignedCertificateTimestamp,
    KeyShare(&'static [NamedGroup]),
    PskKeyExchangeModes(&'static [u8]),
    SupportedVersions(&'static [TlsVersion]),
    CompressCertificate(&'static [CertCompression]),
    RecordSizeLimit(u16),
    NextProtocolNegotiation,
    ChannelId,
    Padding,
}

impl Extension {
    /// Extension type code point.
    pub fn id(&self) -> u16 {
        match self {
            Self::Grease => GREASE_PLACEHOLDER,
            Self::ServerName => 0,
            Self::StatusRequest => 5,
            Self::SupportedGroups(_) => 10,
            Self::EcPointFormats(_) => 11,
            Self::SignatureAlgorithms(_) => 13,
            Self::Alpn(_) => 16,
            Self::SignedCertificateTimestamp => 18,
            Self::Padding => 21,
            Self::ExtendedMasterSecret => 23,
            Self::CompressCertificate(_) => 27,
            Self::RecordSizeLimit(_) => 28,
            Self::SessionTicket => 35,
            Self::SupportedVersions(_) => 43,
            Self::PskKeyExchangeModes(_) => 45,
            Self::KeyShare(_) => 51,
            Self::NextProtocolNegotiation => 13172,
            Self::ChannelId => 30032,
            Self::RenegotiationInfo => 65281,
        }
    }
}

/// Complete description of one impersonated client's ClientHello.
#[derive(Debug, PartialEq, Eq)]
pub struct ClientHelloProfile {
    /// Catalog key, e.g. `hellochrome_72`.
    pub name: &'static str,
    /// Cipher suites in wire order. `GREASE_PLACEHOLDER` marks a GREASE slot.
    pub cipher_suites: &'static [u16],
    pub compression_methods: &'static [u8],
    /// Extensions in wire order.
    pub extensions: &'static [Extension],
    /// User-Agent the impersonated browser sends.
    pub user_agent: &'static str,
    /// SETTINGS the browser sends once HTTP/2 is negotiated.
    pub http2: Http2Settings,
}

impl ClientHelloProfile {
    /// Extension type codes in wire order (GREASE included).
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(Extension::id).collect()
    }

    /// Whether GREASE appears anywhere in the hello.
    pub fn grease(&self) -> bool {
        self.cipher_suites.iter().any(|c| is_grease(*c))
            || self.extensions.iter().any(|e| matches!(e, Extension::Grease))
    }

    /// Whether the hello carries a server_name extension.
    pub fn sends_sni(&self) -> bool {
        self.has(|e| matches!(e, Extension::ServerName))
    }

    pub fn has(&self, pred: impl Fn(&Extension) -> bool) -> bool {
        self.extensions.iter().any(pred)
    }

    /// ALPN protocols in preference order; empty if ALPN is not offered.
    pub fn alpn_protocols(&self) -> &'static [&'static str] {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::Alpn(protos) => Some(*protos),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// ALPN list in wire format (length-prefixed strings).
    pub fn alpn_wire(&self) -> Vec<u8> {
        let mut wire = Vec::new();
        for proto in self.alpn_protocols() {
            wire.push(proto.len() as u8);
            wire.extend_from_slice(proto.as_bytes());
        }
        wire
    }

    pub fn supported_groups(&self) -> &'static [NamedGroup] {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::SupportedGroups(groups) => Some(*groups),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn signature_algorithms(&self) -> &'static [SignatureScheme] {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::SignatureAlgorithms(algs) => Some(*algs),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn ec_point_formats(&self) -> &'static [u8] {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::EcPointFormats(formats) => Some(*formats),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn cert_compression(&self) -> &'static [CertCompression] {
        self.extensions
            .iter()
            .find_map(|e| match e {
                Extension::CompressCertificate(algs) => Some(*algs),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Lowest and highest protocol versions offered.
    ///
    /// Without a supported_versions extension the hello tops out at TLS 1.2.
    pub fn version_range(&self) -> (TlsVersion, TlsVersion) {
        let versions = self.extensions.iter().find_map(|e| match e {
            Extension::SupportedVersions(v) => Some(*v),
            _ => None,
        });
        let mut offered = versions
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(|v| *v != TlsVersion::Grease);
        match offered.next() {
            Some(first) => offered.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))),
            None => (TlsVersion::Tls10, TlsVersion::Tls12),
        }
    }

    /// TLS 1.2 cipher string for BoringSSL, in profile order.
    pub fn cipher_string(&self) -> String {
        self.cipher_suites
            .iter()
            .filter_map(|id| cipher_name(*id))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Signature algorithm list for BoringSSL, first occurrence wins.
    pub fn sigalgs_string(&self) -> String {
        let mut seen: Vec<SignatureScheme> = Vec::new();
        for alg in self.signature_algorithms() {
            if !seen.contains(alg) {
                seen.push(*alg);
            }
        }
        seen.iter().map(|a| a.name()).collect::<Vec<_>>().join(":")
    }

    /// Curves list for BoringSSL; groups BoringSSL lacks are left out.
    pub fn curves_string(&self) -> String {
        self.supported_groups()
            .iter()
            .filter_map(|g| g.boring_name())
            .collect::<Vec<_>>()
            .join(":")
    }

    /// JA3 raw string: version,ciphers,extensions,curves,point formats (GREASE filtered).
    pub fn ja3_text(&self) -> String {
        let ciphers = join_u16(self.cipher_suites.iter().copied());
        let extensions = join_u16(self.extensions.iter().map(Extension::id));
        let curves = join_u16(self.supported_groups().iter().map(|g| g.id()));
        let formats = self
            .ec_point_formats()
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("-");
        format!("{},{},{},{},{}", LEGACY_VERSION, ciphers, extensions, curves, formats)
    }

    /// MD5 of [`ja3_text`](Self::ja3_text), lowercase hex.
    pub fn ja3_hash(&self) -> String {
        let mut hasher = Md5::new();
        hasher.update(self.ja3_text().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

fn join_u16(values: impl Iterator<Item = u16>) -> String {
    values
        .filter(|v| !is_grease(*v))
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: ClientHelloProfile = ClientHelloProfile {
        name: "tiny",
        cipher_suites: &[GREASE_PLACEHOLDER, 0x1301, 0xc02b, 0xc02f],
        compression_methods: &[0],
        extensions: &[
            Extension::Grease,
            Extension::ServerName,
            Extension::SupportedGroups(&[NamedGroup::Grease, NamedGroup::X25519, NamedGroup::Ffdhe2048]),
            Extension::EcPointFormats(&[0]),
            Extension::SignatureAlgorithms(&[
                SignatureScheme::EcdsaP256Sha256,
                SignatureScheme::RsaPssSha384,
                SignatureScheme::RsaPssSha384,
            ]),
            Extension::Alpn(&["h2", "http/1.1"]),
            Extension::SupportedVersions(&[TlsVersion::Grease, TlsVersion::Tls13, TlsVersion::Tls12]),
        ],
        user_agent: "tiny/1.0",
        http2: Http2Settings::CHROME,
    };

    #[test]
    fn test_grease_detection() {
        for hi in 0..16u16 {
            let v = (hi << 12) | 0x0a00 | (hi << 4) | 0x0a;
            assert!(is_grease(v), "0x{:04X} should be GREASE", v);
        }
        assert!(!is_grease(0x1301));
        assert!(!is_grease(0x0a0b));
    }

    #[test]
    fn test_ja3_filters_grease() {
        assert_eq!(TINY.ja3_text(), "771,4865-49195-49199,0-10-11-13-16-43,29-256,0");
        assert_eq!(TINY.ja3_hash().len(), 32);
    }

    #[test]
    fn test_boring_strings() {
        // TLS 1.3 suites and GREASE are not part of the BoringSSL cipher string
        assert_eq!(
            TINY.cipher_string(),
            "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256"
        );
        assert_eq!(TINY.curves_string(), "X25519");
        assert_eq!(TINY.sigalgs_string(), "ecdsa_secp256r1_sha256:rsa_pss_rsae_sha384");
    }

    #[test]
    fn test_alpn_wire_format() {
        assert_eq!(TINY.alpn_wire(), b"\x02h2\x08http/1.1".to_vec());
    }

    #[test]
    fn test_version_range() {
        assert_eq!(TINY.version_range(), (TlsVersion::Tls12, TlsVersion::Tls13));
        assert!(TINY.grease());
        assert!(TINY.sends_sni());
    }
}
