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

//! Per-remote-SKI service details surfaced to the embedder, including the
//! coarse connection state derived from SME updates.

use std::fmt::{Display, Error, Formatter};

use eebus_common::Ski;
use eebus_ship::SmeStateKind;

/// The embedder-facing summary of one remote service's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No pairing exists.
    None,
    /// A connection request is queued, waiting for initialisation.
    Queued,
    /// The local service initiated the connection.
    Initiated,
    /// A remote service initiated the connection.
    ReceivedPairingRequest,
    /// The handshake is in progress.
    InProgress,
    /// Both ends trust each other.
    Trusted,
    /// The handshake is completed on both ends.
    Completed,
    /// The remote service denied trust.
    RemoteDeniedTrust,
    /// The handshake ended in an error.
    Error,
}

impl ConnectionState {
    /// Derive the coarse state from an SME transition.
    pub fn from_sme(kind: &SmeStateKind) -> ConnectionState {
        match kind {
            SmeStateKind::CmiInit |
            SmeStateKind::HelloReady |
            SmeStateKind::HelloPending |
            SmeStateKind::ProtocolHandshake |
            SmeStateKind::PinCheck |
            SmeStateKind::AccessMethods => ConnectionState::InProgress,
            SmeStateKind::Trusted => ConnectionState::Trusted,
            SmeStateKind::Complete => ConnectionState::Completed,
            SmeStateKind::CloseNormal => ConnectionState::None,
            SmeStateKind::CloseError(reason) if reason.contains("denied trust") => ConnectionState::RemoteDeniedTrust,
            SmeStateKind::CloseError(_) => ConnectionState::Error,
        }
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let name = match self {
            ConnectionState::None => "none",
            ConnectionState::Queued => "queued",
            ConnectionState::Initiated => "initiated",
            ConnectionState::ReceivedPairingRequest => "received pairing request",
            ConnectionState::InProgress => "in progress",
            ConnectionState::Trusted => "trusted",
            ConnectionState::Completed => "completed",
            ConnectionState::RemoteDeniedTrust => "remote denied trust",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

/// What the service knows about one remote SKI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDetails {
    pub ski: Ski,
    /// Optional address hint from discovery.
    pub ipv4: Option<String>,
    /// The SHIP identifier learned during access methods; persisted by
    /// the embedder so it can be verified on reconnect.
    pub ship_id: Option<String>,
    pub device_type: Option<String>,
    /// The peer accepts pairings without user interaction.
    pub auto_accept: bool,
    /// The local side trusts this peer and reconnects to it.
    pub trusted: bool,
    pub state: ConnectionState,
}

impl ServiceDetails {
    pub fn new(ski: Ski) -> Self {
        Self {
            ski,
            ipv4: None,
            ship_id: None,
            device_type: None,
            auto_accept: false,
            trusted: false,
            state: ConnectionState::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sme_kinds_map_onto_coarse_states() {
        assert_eq!(ConnectionState::from_sme(&SmeStateKind::HelloPending), ConnectionState::InProgress);
        assert_eq!(ConnectionState::from_sme(&SmeStateKind::Trusted), ConnectionState::Trusted);
        assert_eq!(ConnectionState::from_sme(&SmeStateKind::Complete), ConnectionState::Completed);
        assert_eq!(
            ConnectionState::from_sme(&SmeStateKind::CloseError("remote denied trust".into())),
            ConnectionState::RemoteDeniedTrust
        );
        assert_eq!(
            ConnectionState::from_sme(&SmeStateKind::CloseError("protocol mismatch".into())),
            ConnectionState::Error
        );
    }
}
