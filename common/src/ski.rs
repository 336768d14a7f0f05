// Copyright 2025. The OpenEEBUS Developers
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::{
    fmt::{Display, Error, Formatter},
    str::FromStr,
};

use serde_derive::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::EebusError;

/// The subject-key-identifier of a peer's TLS certificate: the 160-bit
/// fingerprint of its public key. The SKI is the stable identity of a
/// service across reconnects and IP changes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ski([u8; 20]);

impl Ski {
    pub fn new(bytes: [u8; 20]) -> Self {
        Ski(bytes)
    }

    /// Compute the SKI from a DER-encoded SubjectPublicKeyInfo.
    ///
    /// The fingerprint is the SHA-1 of the raw BIT STRING contents: the
    /// outer sequence header, the embedded AlgorithmIdentifier and the
    /// unused-bits byte of the BIT STRING are all skipped.
    pub fn from_subject_public_key_info(der: &[u8]) -> Result<Ski, EebusError> {
        let (tag, seq, _) = read_tlv(der)?;
        if tag != 0x30 {
            return Err(EebusError::parse("SubjectPublicKeyInfo is not a DER sequence"));
        }
        // AlgorithmIdentifier comes first inside the sequence
        let (_, _, rest) = read_tlv(seq)?;
        let (tag, bit_string, _) = read_tlv(rest)?;
        if tag != 0x03 {
            return Err(EebusError::parse("SubjectPublicKeyInfo is missing the subjectPublicKey BIT STRING"));
        }
        if bit_string.is_empty() {
            return Err(EebusError::parse("subjectPublicKey BIT STRING is empty"));
        }
        // The first content byte of a BIT STRING counts its unused bits
        let mut hasher = Sha1::new();
        hasher.update(&bit_string[1..]);
        Ok(Ski(hasher.finalize().into()))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

/// Read one DER TLV, returning (tag, contents, remainder).
fn read_tlv(buf: &[u8]) -> Result<(u8, &[u8], &[u8]), EebusError> {
    if buf.len() < 2 {
        return Err(EebusError::parse("truncated DER element"));
    }
    let tag = buf[0];
    let (len, header) = match buf[1] {
        n if n < 0x80 => (n as usize, 2),
        0x81 => {
            if buf.len() < 3 {
                return Err(EebusError::parse("truncated DER length"));
            }
            (buf[2] as usize, 3)
        },
        0x82 => {
            if buf.len() < 4 {
                return Err(EebusError::parse("truncated DER length"));
            }
            (((buf[2] as usize) << 8) | buf[3] as usize, 4)
        },
        _ => return Err(EebusError::parse("unsupported DER length encoding")),
    };
    if buf.len() < header + len {
        return Err(EebusError::parse("DER element overruns its buffer"));
    }
    Ok((tag, &buf[header..header + len], &buf[header + len..]))
}

impl FromStr for Ski {
    type Err = EebusError;

    /// Parse a SKI from hex. Whitespace separators, as printed on many
    /// device labels, are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&compact).map_err(|e| EebusError::parse(format!("invalid SKI hex: {}", e)))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| EebusError::parse("a SKI must be exactly 20 bytes"))?;
        Ok(Ski(bytes))
    }
}

impl Display for Ski {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Ski {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "Ski({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spki() -> Vec<u8> {
        // SEQUENCE { SEQUENCE { OID ecPublicKey }, BIT STRING { 00, key.. } }
        let algorithm: &[u8] = &[0x30, 0x09, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
        let key: &[u8] = &[0x04, 0xde, 0xad, 0xbe, 0xef];
        let mut bit_string = vec![0x03, (key.len() + 1) as u8, 0x00];
        bit_string.extend_from_slice(key);
        let mut spki = vec![0x30, (algorithm.len() + bit_string.len()) as u8];
        spki.extend_from_slice(algorithm);
        spki.extend_from_slice(&bit_string);
        spki
    }

    #[test]
    fn it_hashes_only_the_bit_string_contents() {
        let ski = Ski::from_subject_public_key_info(&sample_spki()).unwrap();
        let mut hasher = Sha1::new();
        hasher.update([0x04, 0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(ski.as_bytes(), &<[u8; 20]>::from(hasher.finalize()));
    }

    #[test]
    fn it_rejects_non_sequences() {
        let err = Ski::from_subject_public_key_info(&[0x04, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, EebusError::Parse(_)));
    }

    #[test]
    fn it_round_trips_through_hex() {
        let ski = Ski::new([0xab; 20]);
        let parsed: Ski = ski.to_string().parse().unwrap();
        assert_eq!(parsed, ski);
    }

    #[test]
    fn it_accepts_spaced_hex() {
        let ski: Ski = "abab abab abab abab abab abab abab abab abab abab".parse().unwrap();
        assert_eq!(ski, Ski::new([0xab; 20]));
    }

    #[test]
    fn it_rejects_short_hex() {
        assert!("abcd".parse::<Ski>().is_err());
    }
}
