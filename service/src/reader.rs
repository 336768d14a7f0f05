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

//! The embedder-facing event surface. Callbacks arrive on internal tasks
//! in no specified thread; they must return quickly and must not assume
//! reentrancy.

use eebus_common::Ski;
use eebus_ship::{mdns::MdnsEntry, SmeStateKind};

pub trait ServiceReader: Send + Sync {
    /// Exactly once per established connection.
    fn on_remote_ski_connected(&self, _ski: &Ski) {}

    /// Exactly once per ended connection.
    fn on_remote_ski_disconnected(&self, _ski: &Ski) {}

    /// Every SME transition of every connection.
    fn on_ship_state_update(&self, _ski: &Ski, _state: &SmeStateKind) {}

    /// The peer's SHIP identifier became known; persist it for later
    /// verification.
    fn on_ship_id_update(&self, _ski: &Ski, _ship_id: &str) {}

    /// A fresh discovery refresh, own service already filtered out.
    fn on_remote_services_update(&self, _entries: &[MdnsEntry]) {}

    /// Whether an unknown peer may keep waiting for the user's pairing
    /// decision. Consulted in addition to the pairing window.
    fn is_waiting_for_trust_allowed(&self, _ski: &Ski) -> bool {
        true
    }
}

/// The do-nothing reader for embedders that only poll.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopServiceReader;

impl ServiceReader for NoopServiceReader {}
