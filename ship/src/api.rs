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

//! The seam through which SHIP connections talk back to the owning
//! service. Callbacks arrive on connection tasks and must not block.

use std::sync::Arc;

use eebus_common::{EebusError, Ski, SpineDataReader, SpineDataWriter};

use crate::connection::SmeStateKind;

pub trait ShipNodeReader: Send + Sync {
    /// Fired exactly once per connection, when the handshake completes and
    /// data may flow.
    fn on_remote_ski_connected(&self, ski: &Ski);

    /// Fired exactly once per connection, when it ends for any reason.
    fn on_remote_ski_disconnected(&self, ski: &Ski);

    /// Attach the upper layer for a completed handshake: the connection
    /// provides its writer and receives the reader its inbound data frames
    /// are fed into.
    fn setup_remote_device(
        &self,
        ski: &Ski,
        writer: Arc<dyn SpineDataWriter>,
    ) -> Result<Arc<dyn SpineDataReader>, EebusError>;

    /// The peer's permanent SHIP identifier, learned during the
    /// access-methods exchange.
    fn on_ship_id_update(&self, ski: &Ski, ship_id: &str);

    /// Every state transition of the connection's SME.
    fn on_ship_state_update(&self, ski: &Ski, state: SmeStateKind);

    /// Whether an untrusted peer may keep waiting for the user to decide.
    /// `false` aborts the handshake.
    fn is_waiting_for_trust_allowed(&self, ski: &Ski) -> bool;
}
