//! Trusted-certificate entries of a Java `JKS` (or `JCEKS`) keystore.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! magic u32 | version u32 | count u32 | entry* | sha1 digest [20]
//! ```
//!
//! The digest covers the passphrase (as UTF-16BE), the fixed whitener
//! `"Mighty Aphrodite"`, and every byte before the digest. A mismatch means
//! the passphrase is wrong or the file was altered.

use sha1::{Digest, Sha1};
use thiserror::Error;

pub const JKS_MAGIC: [u8; 4] = [0xFE, 0xED, 0xFE, 0xED];
pub const JCEKS_MAGIC: [u8; 4] = [0xCE, 0xCE, 0xCE, 0xCE];

const WHITENER: &[u8] = b"Mighty Aphrodite";
const DIGEST_LEN: usize = 20;

const PRIVATE_KEY_ENTRY: u32 = 1;
const TRUSTED_CERT_ENTRY: u32 = 2;

const X509: &str = "X.509";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JksError {
    #[error("not a Java keystore")]
    BadMagic,

    #[error("unsupported keystore version {0}")]
    Version(u32),

    #[error("keystore is truncated")]
    Truncated,

    #[error("unsupported keystore entry type {0}")]
    EntryType(u32),

    #[error("keystore was tampered with, or the passphrase is incorrect")]
    Integrity,
}

/// A certificate the keystore owner marked as trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCertificate {
    pub alias: String,
    pub der: Vec<u8>,
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], JksError> {
        let (head, rest) = self
            .data
            .split_first_chunk::<N>()
            .ok_or(JksError::Truncated)?;
        self.data = rest;
        Ok(*head)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], JksError> {
        if self.data.len() < len {
            return Err(JksError::Truncated);
        }

        let (head, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(head)
    }

    fn u32(&mut self) -> Result<u32, JksError> {
        self.array().map(u32::from_be_bytes)
    }

    fn length(&mut self) -> Result<usize, JksError> {
        usize::try_from(self.u32()?).map_err(|_| JksError::Truncated)
    }

    /// A `DataOutput::writeUTF` string: u16 length, then modified UTF-8.
    fn utf(&mut self) -> Result<String, JksError> {
        let len = usize::from(u16::from_be_bytes(self.array()?));
        Ok(String::from_utf8_lossy(self.bytes(len)?).into_owned())
    }

    fn certificate(&mut self, version: u32) -> Result<(String, &'a [u8]), JksError> {
        let kind = if version == 2 {
            self.utf()?
        } else {
            X509.to_string()
        };
        let len = self.length()?;
        Ok((kind, self.bytes(len)?))
    }
}

fn digest(passphrase: &str, body: &[u8]) -> impl AsRef<[u8]> + use<> {
    let password: Vec<u8> = passphrase
        .encode_utf16()
        .flat_map(u16::to_be_bytes)
        .collect();

    let mut hasher = Sha1::new();
    hasher.update(&password);
    hasher.update(WHITENER);
    hasher.update(body);
    hasher.finalize()
}

/// Verify the keystore against `passphrase` and return its trusted
/// certificates. Private key entries are skipped.
pub fn trusted_certificates(
    data: &[u8],
    passphrase: &str,
) -> Result<Vec<TrustedCertificate>, JksError> {
    match data.first_chunk::<4>() {
        Some(magic) if *magic == JKS_MAGIC || *magic == JCEKS_MAGIC => {}
        Some(_) => return Err(JksError::BadMagic),
        None => return Err(JksError::Truncated),
    }

    let split = data
        .len()
        .checked_sub(DIGEST_LEN)
        .ok_or(JksError::Truncated)?;
    let (body, expected) = data.split_at(split);

    if digest(passphrase, body).as_ref() != expected {
        return Err(JksError::Integrity);
    }

    let mut reader = Reader::new(body);
    reader.array::<4>()?;

    let version = reader.u32()?;
    if version != 1 && version != 2 {
        return Err(JksError::Version(version));
    }

    let count = reader.u32()?;
    let mut trusted = Vec::new();

    for _ in 0..count {
        let tag = reader.u32()?;
        let alias = reader.utf()?;
        reader.array::<8>()?;

        match tag {
            PRIVATE_KEY_ENTRY => {
                let key_len = reader.length()?;
                reader.bytes(key_len)?;
                for _ in 0..reader.u32()? {
                    reader.certificate(version)?;
                }
            }
            TRUSTED_CERT_ENTRY => {
                let (kind, der) = reader.certificate(version)?;
                if kind == X509 {
                    trusted.push(TrustedCertificate {
                        alias,
                        der: der.to_vec(),
                    });
                }
            }
            other => return Err(JksError::EntryType(other)),
        }
    }

    Ok(trusted)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixture(name: &str) -> Vec<u8> {
        let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
        std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
    }

    #[test]
    fn test_reads_trusted_certificate() {
        let certs = trusted_certificates(&fixture("trust.jks"), "changeit").unwrap();

        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].alias, "ca");
        // DER SEQUENCE with a two-byte length
        assert_eq!(&certs[0].der[..2], &[0x30, 0x82]);
    }

    #[test]
    fn test_wrong_passphrase() {
        assert_eq!(
            trusted_certificates(&fixture("trust.jks"), "changeme"),
            Err(JksError::Integrity)
        );
    }

    #[test]
    fn test_private_key_entries_are_skipped() {
        let certs = trusted_certificates(&fixture("keyonly.jks"), "changeit").unwrap();

        assert!(certs.is_empty());
    }

    #[test]
    fn test_altered_body_fails_integrity() {
        let mut data = fixture("trust.jks");
        data[40] ^= 0xFF;

        assert_eq!(
            trusted_certificates(&data, "changeit"),
            Err(JksError::Integrity)
        );
    }

    #[test]
    fn test_not_a_java_keystore() {
        assert_eq!(
            trusted_certificates(&fixture("trust.p12"), "changeit"),
            Err(JksError::BadMagic)
        );
        assert_eq!(
            trusted_certificates(&JKS_MAGIC, "changeit"),
            Err(JksError::Truncated)
        );
    }

    #[test]
    fn test_truncated_entries() {
        // Header claims one entry but the body ends straight after it.
        let mut data = Vec::from(JKS_MAGIC);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        let sum = digest("pw", &data);
        data.extend_from_slice(sum.as_ref());

        assert_eq!(trusted_certificates(&data, "pw"), Err(JksError::Truncated));
    }
}
