//! Password verification against EncryptionInfo verifiers
//!
//! Only the verifier is decrypted; document payloads are never touched.
//!
//! Standard encryption (MS-OFFCRYPTO 2.3.4.7, 2.3.4.9):
//! ```text
//! H0     = SHA1(salt + password)
//! Hn     = SHA1(iterator + Hn-1)        50 000 rounds
//! Hfinal = SHA1(Hn + block 0)
//! key    = (SHA1(0x36^Hfinal) + SHA1(0x5C^Hfinal))[..keySize]
//! valid  = SHA1(AES-ECB(verifier)) == AES-ECB(verifierHash)[..20]
//! ```
//!
//! Agile encryption (MS-OFFCRYPTO 2.3.4.11, 2.3.4.13) uses the descriptor's
//! hash, spin count and AES-CBC with the salt as IV, and two fixed block keys
//! for the verifier input and verifier hash.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};
use md5::Md5;
use sha1::{Digest, Sha1};
use sha2::{Sha256, Sha384, Sha512};
use tracing::{debug, trace};

use super::encryption_info::{
    AgileInfo, EncryptionInfo, StandardInfo, ALG_ID_AES_128, ALG_ID_AES_192, ALG_ID_AES_256,
};
use crate::common::binary::utf16le_bytes;
use crate::error::{DocIdError, DocIdResult};

const STANDARD_SPIN_COUNT: u32 = 50_000;
const AES_BLOCK_SIZE: usize = 16;
const SHA1_DIGEST_SIZE: usize = 20;

pub const BLOCK_KEY_VERIFIER_INPUT: [u8; 8] = [0xFE, 0xA7, 0xD2, 0x76, 0x3B, 0x4B, 0x9E, 0x79];
pub const BLOCK_KEY_VERIFIER_VALUE: [u8; 8] = [0xD7, 0xAA, 0x0F, 0x6D, 0x30, 0x61, 0x34, 0x4E];

// =============================================================================
// Hashing
// =============================================================================

/// Hash algorithms an Agile descriptor may name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorHash {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DescriptorHash {
    pub fn from_name(name: &str) -> DocIdResult<Self> {
        match name.trim().to_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(DescriptorHash::Md5),
            "SHA1" => Ok(DescriptorHash::Sha1),
            "SHA256" => Ok(DescriptorHash::Sha256),
            "SHA384" => Ok(DescriptorHash::Sha384),
            "SHA512" => Ok(DescriptorHash::Sha512),
            _ => Err(DocIdError::EncryptionInfo(format!(
                "Unsupported hash algorithm: {}",
                name
            ))),
        }
    }

    /// Hash the concatenation of `parts`
    pub fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        fn run<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
            let mut hasher = D::new();
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().to_vec()
        }

        match self {
            DescriptorHash::Md5 => run::<Md5>(parts),
            DescriptorHash::Sha1 => run::<Sha1>(parts),
            DescriptorHash::Sha256 => run::<Sha256>(parts),
            DescriptorHash::Sha384 => run::<Sha384>(parts),
            DescriptorHash::Sha512 => run::<Sha512>(parts),
        }
    }
}

/// Salted, iterated password hash shared by both schemes
fn iterated_hash(hash: DescriptorHash, salt: &[u8], password: &str, spin_count: u32) -> Vec<u8> {
    let mut h = hash.digest(&[salt, utf16le_bytes(password).as_slice()]);
    for i in 0..spin_count {
        h = hash.digest(&[&i.to_le_bytes()[..], &h[..]]);
    }
    h
}

// =============================================================================
// AES
// =============================================================================

/// AES block cipher keyed for 128, 192 or 256 bits
enum AesKey {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesKey {
    fn new(key: &[u8]) -> DocIdResult<Self> {
        let invalid = |_| DocIdError::EncryptionInfo(format!("Invalid AES key length: {}", key.len()));
        match key.len() {
            16 => Aes128::new_from_slice(key).map(AesKey::Aes128).map_err(invalid),
            24 => Aes192::new_from_slice(key).map(AesKey::Aes192).map_err(invalid),
            32 => Aes256::new_from_slice(key).map(AesKey::Aes256).map_err(invalid),
            n => Err(DocIdError::EncryptionInfo(format!("Invalid AES key length: {}", n))),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            AesKey::Aes128(c) => c.decrypt_block(block),
            AesKey::Aes192(c) => c.decrypt_block(block),
            AesKey::Aes256(c) => c.decrypt_block(block),
        }
    }

    fn decrypt_ecb(&self, data: &[u8]) -> DocIdResult<Vec<u8>> {
        check_block_aligned(data)?;
        let mut out = data.to_vec();
        for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.decrypt_block(block);
        }
        Ok(out)
    }

    fn decrypt_cbc(&self, iv: &[u8], data: &[u8]) -> DocIdResult<Vec<u8>> {
        check_block_aligned(data)?;
        let mut out = data.to_vec();
        let mut previous = iv.to_vec();
        for block in out.chunks_exact_mut(AES_BLOCK_SIZE) {
            let ciphertext = block.to_vec();
            self.decrypt_block(block);
            for (byte, mask) in block.iter_mut().zip(&previous) {
                *byte ^= mask;
            }
            previous = ciphertext;
        }
        Ok(out)
    }
}

fn check_block_aligned(data: &[u8]) -> DocIdResult<()> {
    if data.is_empty() || data.len() % AES_BLOCK_SIZE != 0 {
        return Err(DocIdError::EncryptionInfo(format!(
            "Ciphertext length {} is not a multiple of the AES block size",
            data.len()
        )));
    }
    Ok(())
}

/// Truncate or pad (with 0x36) to `len` bytes
fn fit_to_length(mut bytes: Vec<u8>, len: usize) -> Vec<u8> {
    bytes.resize(len, 0x36);
    bytes
}

// =============================================================================
// Standard Encryption
// =============================================================================

/// Derive the Standard encryption key for `password`
pub fn standard_key(info: &StandardInfo, password: &str) -> DocIdResult<Vec<u8>> {
    let key_len = (info.key_size / 8) as usize;
    if key_len == 0 || key_len > 2 * SHA1_DIGEST_SIZE {
        return Err(DocIdError::EncryptionInfo(format!(
            "Unsupported key size: {} bits",
            info.key_size
        )));
    }

    let h = iterated_hash(DescriptorHash::Sha1, &info.salt, password, STANDARD_SPIN_COUNT);
    let h_final = DescriptorHash::Sha1.digest(&[&h[..], &0u32.to_le_bytes()[..]]);

    let mut inner = [0x36u8; 64];
    let mut outer = [0x5Cu8; 64];
    for (i, byte) in h_final.iter().enumerate() {
        inner[i] ^= byte;
        outer[i] ^= byte;
    }

    let mut derived = DescriptorHash::Sha1.digest(&[&inner[..]]);
    derived.extend(DescriptorHash::Sha1.digest(&[&outer[..]]));
    derived.truncate(key_len);
    Ok(derived)
}

fn verify_standard(info: &StandardInfo, password: &str) -> DocIdResult<bool> {
    match info.alg_id {
        ALG_ID_AES_128 | ALG_ID_AES_192 | ALG_ID_AES_256 => {}
        other => {
            return Err(DocIdError::EncryptionInfo(format!(
                "Unsupported Standard cipher: 0x{:04X}",
                other
            )))
        }
    }

    let key = AesKey::new(&standard_key(info, password)?)?;
    let verifier = key.decrypt_ecb(&info.encrypted_verifier)?;
    let verifier_hash = key.decrypt_ecb(&info.encrypted_verifier_hash)?;

    let expected = DescriptorHash::Sha1.digest(&[&verifier[..]]);
    let hash_len = (info.verifier_hash_size as usize).min(SHA1_DIGEST_SIZE);
    Ok(verifier_hash.len() >= hash_len && expected[..hash_len] == verifier_hash[..hash_len])
}

// =============================================================================
// Agile Encryption
// =============================================================================

/// Spun password hash every Agile block key is derived from
fn agile_password_hash(info: &AgileInfo, password: &str) -> DocIdResult<(DescriptorHash, Vec<u8>)> {
    let hash = DescriptorHash::from_name(&info.hash_algorithm)?;
    Ok((hash, iterated_hash(hash, &info.salt, password, info.spin_count)))
}

fn agile_block_key(hash: DescriptorHash, h: &[u8], key_bits: usize, block_key: &[u8]) -> Vec<u8> {
    fit_to_length(hash.digest(&[h, block_key]), key_bits / 8)
}

/// Derive an Agile key for one block key
pub fn agile_key(info: &AgileInfo, password: &str, block_key: &[u8]) -> DocIdResult<Vec<u8>> {
    let (hash, h) = agile_password_hash(info, password)?;
    Ok(agile_block_key(hash, &h, info.key_bits, block_key))
}

fn verify_agile(info: &AgileInfo, password: &str) -> DocIdResult<bool> {
    if !info.cipher_algorithm.eq_ignore_ascii_case("AES") {
        return Err(DocIdError::EncryptionInfo(format!(
            "Unsupported Agile cipher: {}",
            info.cipher_algorithm
        )));
    }
    if !info.cipher_chaining.eq_ignore_ascii_case("ChainingModeCBC") {
        return Err(DocIdError::EncryptionInfo(format!(
            "Unsupported Agile chaining: {}",
            info.cipher_chaining
        )));
    }

    let (hash, h) = agile_password_hash(info, password)?;
    let iv = fit_to_length(info.salt.clone(), info.block_size.max(AES_BLOCK_SIZE));

    let input_key = AesKey::new(&agile_block_key(hash, &h, info.key_bits, &BLOCK_KEY_VERIFIER_INPUT))?;
    let value_key = AesKey::new(&agile_block_key(hash, &h, info.key_bits, &BLOCK_KEY_VERIFIER_VALUE))?;

    let mut verifier_input = input_key.decrypt_cbc(&iv, &info.encrypted_verifier_hash_input)?;
    verifier_input.truncate(info.salt_size.max(1));
    let expected = hash.digest(&[&verifier_input[..]]);

    let verifier_value = value_key.decrypt_cbc(&iv, &info.encrypted_verifier_hash_value)?;
    let hash_len = info.hash_size.min(expected.len());
    Ok(verifier_value.len() >= hash_len && expected[..hash_len] == verifier_value[..hash_len])
}

// =============================================================================
// Entry Point
// =============================================================================

/// Check whether `password` opens the document described by `info`.
///
/// `Ok(false)` is a verifier mismatch; `Err` means the parameters could not
/// be used at all (unsupported cipher, bad lengths).
pub fn verify_password(info: &EncryptionInfo, password: &str) -> DocIdResult<bool> {
    trace!(kind = info.kind(), "Verifying password");
    let verified = match info {
        EncryptionInfo::Standard(standard) => verify_standard(standard, password)?,
        EncryptionInfo::Agile(agile) => verify_agile(agile, password)?,
    };
    debug!(kind = info.kind(), verified, "Password verification finished");
    Ok(verified)
}

// =============================================================================
// Tests
// =============================================================================
