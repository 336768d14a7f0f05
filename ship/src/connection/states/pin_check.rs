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

//! The PIN exchange. Only the `none` variant is implemented: both sides
//! declare that no PIN is required; any other advertised variant closes
//! the connection.

use tokio::time::Instant;

use crate::{
    connection::{states::SmeEvent, ConnectionShared},
    message::{ConnectionPinState, ControlMessage, PinState, ShipFrame},
};

#[derive(Debug, Default)]
pub struct PinCheck {}

impl PinCheck {
    pub fn new() -> Self {
        PinCheck {}
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let deadline = Instant::now() + shared.config.cmi_timeout;
        let own = ConnectionPinState {
            pin_state: PinState::None,
            input_permission: None,
        };
        if let Err(e) = shared.send_control(ControlMessage::ConnectionPinState(own)).await {
            return SmeEvent::Failed(format!("pin state send failed: {}", e));
        }
        let peer = match shared.next_frame(deadline, "pin state timeout").await {
            Ok(ShipFrame::Control(ControlMessage::ConnectionPinState(peer))) => peer,
            Ok(_) => return SmeEvent::Failed("unexpected message during pin check".to_string()),
            Err(event) => return event,
        };
        match peer.pin_state {
            PinState::None => SmeEvent::PinPassed,
            _ => SmeEvent::Failed("pin not supported".to_string()),
        }
    }
}
