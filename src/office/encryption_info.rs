//! EncryptionInfo stream parsing
//!
//! Password-protected Office documents keep their key material in the
//! `EncryptionInfo` stream of an OLE2 compound file.
//!
//! ## Stream Layout
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0x00   | 2    | Version major                           |
//! | 0x02   | 2    | Version minor                           |
//! | 0x04   | 4    | Flags                                   |
//! | 0x08   | ...  | Standard: header size + header + verifier |
//! |        |      | Agile: XML descriptor                   |
//!
//! Version x.2 (major 2, 3 or 4) is Standard encryption, 4.4 is Agile,
//! 3.3/4.3 is Extensible (unsupported here).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::trace;

use crate::common::binary::{utf16le_to_string, ByteReader};
use crate::error::{DocIdError, DocIdResult};

// Standard header algorithm identifiers
pub const ALG_ID_AES_128: u32 = 0x0000_660E;
pub const ALG_ID_AES_192: u32 = 0x0000_660F;
pub const ALG_ID_AES_256: u32 = 0x0000_6610;
pub const ALG_ID_RC4: u32 = 0x0000_6801;
pub const ALG_ID_HASH_SHA1: u32 = 0x0000_8004;

/// Reserved value of the flags field in Agile streams
pub const AGILE_RESERVED_FLAGS: u32 = 0x40;

/// Largest spin count MS-OFFCRYPTO allows for a password key encryptor
pub const MAX_SPIN_COUNT: u32 = 10_000_000;

/// Password key encryptor namespace in Agile descriptors
pub const PASSWORD_KEY_ENCRYPTOR_URI: &str =
    "http://schemas.microsoft.com/office/2006/keyEncryptor/password";

// =============================================================================
// Types
// =============================================================================

/// Parsed EncryptionInfo stream
#[derive(Debug, Clone)]
pub enum EncryptionInfo {
    Standard(StandardInfo),
    Agile(AgileInfo),
}

impl EncryptionInfo {
    pub fn kind(&self) -> &'static str {
        match self {
            EncryptionInfo::Standard(_) => "standard",
            EncryptionInfo::Agile(_) => "agile",
        }
    }
}

/// Standard (ECMA-376 binary header) encryption parameters
#[derive(Debug, Clone)]
pub struct StandardInfo {
    pub version_major: u16,
    pub version_minor: u16,
    pub flags: u32,
    pub alg_id: u32,
    pub alg_id_hash: u32,
    /// Key size in bits
    pub key_size: u32,
    pub csp_name: String,
    pub salt: Vec<u8>,
    pub encrypted_verifier: Vec<u8>,
    pub verifier_hash_size: u32,
    pub encrypted_verifier_hash: Vec<u8>,
}

/// Agile (XML descriptor) password key encryptor parameters
#[derive(Debug, Clone, Default)]
pub struct AgileInfo {
    pub spin_count: u32,
    pub salt_size: usize,
    pub block_size: usize,
    pub key_bits: usize,
    pub hash_size: usize,
    pub cipher_algorithm: String,
    pub cipher_chaining: String,
    pub hash_algorithm: String,
    pub salt: Vec<u8>,
    pub encrypted_verifier_hash_input: Vec<u8>,
    pub encrypted_verifier_hash_value: Vec<u8>,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a complete EncryptionInfo stream
pub fn parse(data: &[u8]) -> DocIdResult<EncryptionInfo> {
    let mut reader = ByteReader::new(data);
    let version_major = reader.read_u16_le()?;
    let version_minor = reader.read_u16_le()?;
    trace!(version_major, version_minor, "EncryptionInfo version");

    match (version_major, version_minor) {
        (4, 4) => {
            let flags = reader.read_u32_le()?;
            if flags != AGILE_RESERVED_FLAGS {
                trace!(flags, "Unexpected Agile reserved flags");
            }
            parse_agile(reader.read_rest()).map(EncryptionInfo::Agile)
        }
        (2..=4, 2) => parse_standard(version_major, version_minor, &mut reader)
            .map(EncryptionInfo::Standard),
        (3 | 4, 3) => Err(DocIdError::EncryptionInfo(
            "Extensible encryption is not supported".into(),
        )),
        (major, minor) => Err(DocIdError::EncryptionInfo(format!(
            "Unknown EncryptionInfo version {}.{}",
            major, minor
        ))),
    }
}

fn parse_standard(
    version_major: u16,
    version_minor: u16,
    reader: &mut ByteReader<'_>,
) -> DocIdResult<StandardInfo> {
    let flags = reader.read_u32_le()?;
    let header_size = reader.read_u32_le()? as usize;

    // EncryptionHeader: 8 fixed u32 fields then the CSP name
    let header = reader.read_bytes(header_size)?;
    let mut header_reader = ByteReader::new(header);
    let _header_flags = header_reader.read_u32_le()?;
    let _size_extra = header_reader.read_u32_le()?;
    let alg_id = header_reader.read_u32_le()?;
    let alg_id_hash = header_reader.read_u32_le()?;
    let key_size = header_reader.read_u32_le()?;
    let _provider_type = header_reader.read_u32_le()?;
    let _reserved1 = header_reader.read_u32_le()?;
    let _reserved2 = header_reader.read_u32_le()?;
    let csp_name = utf16le_to_string(header_reader.read_rest());

    // EncryptionVerifier
    let salt_size = reader.read_u32_le()? as usize;
    let salt = reader.read_bytes(salt_size)?.to_vec();
    let encrypted_verifier = reader.read_bytes(16)?.to_vec();
    let verifier_hash_size = reader.read_u32_le()?;
    let encrypted_verifier_hash = reader.read_rest().to_vec();

    trace!(alg_id, key_size, csp = %csp_name, "Standard encryption header");

    Ok(StandardInfo {
        version_major,
        version_minor,
        flags,
        alg_id,
        alg_id_hash,
        key_size,
        csp_name,
        salt,
        encrypted_verifier,
        verifier_hash_size,
        encrypted_verifier_hash,
    })
}

/// Parse the Agile XML descriptor, keeping the password key encryptor
fn parse_agile(xml: &[u8]) -> DocIdResult<AgileInfo> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_password_encryptor = false;

    loop {
        match xml_reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"keyEncryptor" => {
                        in_password_encryptor = e.attributes().flatten().any(|attr| {
                            attr.key.as_ref() == b"uri"
                                && attr.value.as_ref() == PASSWORD_KEY_ENCRYPTOR_URI.as_bytes()
                        });
                    }
                    b"encryptedKey" if in_password_encryptor => {
                        return agile_from_attributes(e);
                    }
                    _ => {}
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"keyEncryptor" => {
                in_password_encryptor = false;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(DocIdError::EncryptionInfo(
        "Agile descriptor has no password key encryptor".into(),
    ))
}

fn agile_from_attributes(e: &quick_xml::events::BytesStart<'_>) -> DocIdResult<AgileInfo> {
    let mut info = AgileInfo::default();

    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = String::from_utf8_lossy(&attr.value).to_string();

        match key.as_str() {
            "spinCount" => info.spin_count = parse_number(&key, &value)?,
            "saltSize" => info.salt_size = parse_number(&key, &value)?,
            "blockSize" => info.block_size = parse_number(&key, &value)?,
            "keyBits" => info.key_bits = parse_number(&key, &value)?,
            "hashSize" => info.hash_size = parse_number(&key, &value)?,
            "cipherAlgorithm" => info.cipher_algorithm = value,
            "cipherChaining" => info.cipher_chaining = value,
            "hashAlgorithm" => info.hash_algorithm = value,
            "saltValue" => info.salt = decode_base64(&key, &value)?,
            "encryptedVerifierHashInput" => {
                info.encrypted_verifier_hash_input = decode_base64(&key, &value)?
            }
            "encryptedVerifierHashValue" => {
                info.encrypted_verifier_hash_value = decode_base64(&key, &value)?
            }
            _ => {}
        }
    }

    if info.salt.is_empty()
        || info.encrypted_verifier_hash_input.is_empty()
        || info.encrypted_verifier_hash_value.is_empty()
    {
        return Err(DocIdError::EncryptionInfo(
            "Agile password key encryptor is missing verifier fields".into(),
        ));
    }
    if info.spin_count > MAX_SPIN_COUNT {
        return Err(DocIdError::EncryptionInfo(format!(
            "Agile spin count {} exceeds {}",
            info.spin_count, MAX_SPIN_COUNT
        )));
    }

    Ok(info)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> DocIdResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DocIdError::EncryptionInfo(format!("Invalid {} value: {}", key, value)))
}

fn decode_base64(key: &str, value: &str) -> DocIdResult<Vec<u8>> {
    BASE64
        .decode(value.trim())
        .map_err(|e| DocIdError::EncryptionInfo(format!("Invalid base64 in {}: {}", key, e)))
}

// =============================================================================
// Tests
// =============================================================================
