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

//! The TLS credential collaborator seam.
//!
//! TLS termination and certificate parsing live with the embedder; the
//! core only needs the DER SubjectPublicKeyInfo to derive the local SKI,
//! plus the certificate's stored subject-key-identifier to validate it.

use eebus_common::{EebusError, Ski};

pub trait CredentialProvider: Send + Sync {
    /// The DER-encoded SubjectPublicKeyInfo of the local certificate.
    fn subject_public_key_info(&self) -> &[u8];

    /// The subject-key-identifier extension stored in the certificate, if
    /// any.
    fn stored_ski(&self) -> Option<Ski>;
}

/// Derive the local SKI and refuse credentials whose stored identifier
/// disagrees with the computed one — a misissued certificate would
/// otherwise advertise an identity the TLS handshake cannot prove.
pub fn validate_credentials(credentials: &dyn CredentialProvider) -> Result<Ski, EebusError> {
    let computed = Ski::from_subject_public_key_info(credentials.subject_public_key_info())?;
    if let Some(stored) = credentials.stored_ski() {
        if stored != computed {
            return Err(EebusError::init(format!(
                "certificate subject-key-identifier {} does not match the public key ({})",
                stored, computed
            )));
        }
    }
    Ok(computed)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCredentials {
        spki: Vec<u8>,
        stored: Option<Ski>,
    }

    impl CredentialProvider for TestCredentials {
        fn subject_public_key_info(&self) -> &[u8] {
            &self.spki
        }

        fn stored_ski(&self) -> Option<Ski> {
            self.stored
        }
    }

    fn sample_spki() -> Vec<u8> {
        let algorithm: &[u8] = &[0x30, 0x09, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
        let key: &[u8] = &[0x04, 0x01, 0x02, 0x03];
        let mut spki = vec![0x30, (algorithm.len() + key.len() + 3) as u8];
        spki.extend_from_slice(algorithm);
        spki.extend_from_slice(&[0x03, (key.len() + 1) as u8, 0x00]);
        spki.extend_from_slice(key);
        spki
    }

    #[test]
    fn matching_stored_ski_passes() {
        let computed = Ski::from_subject_public_key_info(&sample_spki()).unwrap();
        let credentials = TestCredentials {
            spki: sample_spki(),
            stored: Some(computed),
        };
        assert_eq!(validate_credentials(&credentials).unwrap(), computed);
    }

    #[test]
    fn mismatching_stored_ski_is_fatal() {
        let credentials = TestCredentials {
            spki: sample_spki(),
            stored: Some(Ski::new([9; 20])),
        };
        let err = validate_credentials(&credentials).unwrap_err();
        assert!(matches!(err, EebusError::Init(_)));
    }

    #[test]
    fn absent_stored_ski_uses_the_computed_one() {
        let credentials = TestCredentials {
            spki: sample_spki(),
            stored: None,
        };
        assert!(validate_credentials(&credentials).is_ok());
    }
}
