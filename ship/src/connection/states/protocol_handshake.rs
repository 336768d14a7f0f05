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

//! The protocol handshake: the client announces its supported SHIP
//! versions and message formats, the server selects one, the client
//! confirms the selection.

use tokio::time::Instant;

use crate::{
    connection::{states::SmeEvent, ConnectionRole, ConnectionShared},
    message::{
        ControlMessage,
        MessageProtocolHandshake,
        MessageProtocolHandshakeError,
        ProtocolHandshakeType,
        ShipFrame,
        PROTOCOL_VERSION,
    },
};

#[derive(Debug, Default)]
pub struct ProtocolHandshake {}

impl ProtocolHandshake {
    pub fn new() -> Self {
        ProtocolHandshake {}
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        match shared.role {
            ConnectionRole::Client => self.run_client(shared).await,
            ConnectionRole::Server => self.run_server(shared).await,
        }
    }

    async fn run_client(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let deadline = Instant::now() + shared.config.cmi_timeout;
        let announce = MessageProtocolHandshake::new(ProtocolHandshakeType::AnnounceMax);
        if let Err(e) = shared
            .send_control(ControlMessage::MessageProtocolHandshake(announce))
            .await
        {
            return SmeEvent::Failed(format!("handshake send failed: {}", e));
        }
        let selection = match self.expect_handshake(shared, deadline).await {
            Ok(selection) => selection,
            Err(event) => return event,
        };
        if selection.handshake_type != ProtocolHandshakeType::Select || !selection_acceptable(&selection) {
            return self.mismatch(shared).await;
        }
        // Confirm the server's selection by echoing it
        if let Err(e) = shared
            .send_control(ControlMessage::MessageProtocolHandshake(selection))
            .await
        {
            return SmeEvent::Failed(format!("handshake send failed: {}", e));
        }
        SmeEvent::ProtocolAgreed
    }

    async fn run_server(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let deadline = Instant::now() + shared.config.cmi_timeout;
        let announced = match self.expect_handshake(shared, deadline).await {
            Ok(announced) => announced,
            Err(event) => return event,
        };
        if announced.handshake_type != ProtocolHandshakeType::AnnounceMax || !selection_acceptable(&announced) {
            return self.mismatch(shared).await;
        }
        let selection = MessageProtocolHandshake::new(ProtocolHandshakeType::Select);
        if let Err(e) = shared
            .send_control(ControlMessage::MessageProtocolHandshake(selection.clone()))
            .await
        {
            return SmeEvent::Failed(format!("handshake send failed: {}", e));
        }
        let confirmation = match self.expect_handshake(shared, deadline).await {
            Ok(confirmation) => confirmation,
            Err(event) => return event,
        };
        if confirmation != selection {
            return self.mismatch(shared).await;
        }
        SmeEvent::ProtocolAgreed
    }

    async fn expect_handshake(
        &mut self,
        shared: &mut ConnectionShared,
        deadline: Instant,
    ) -> Result<MessageProtocolHandshake, SmeEvent> {
        match shared.next_frame(deadline, "protocol handshake timeout").await? {
            ShipFrame::Control(ControlMessage::MessageProtocolHandshake(handshake)) => Ok(handshake),
            ShipFrame::Control(ControlMessage::MessageProtocolHandshakeError(error)) => {
                Err(SmeEvent::Failed(format!("peer rejected the protocol handshake ({})", error.error)))
            },
            _ => Err(SmeEvent::Failed("unexpected message during protocol handshake".to_string())),
        }
    }

    async fn mismatch(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let _ = shared
            .send_control(ControlMessage::MessageProtocolHandshakeError(MessageProtocolHandshakeError {
                error: MessageProtocolHandshakeError::SELECTION_MISMATCH,
            }))
            .await;
        SmeEvent::Failed("protocol mismatch".to_string())
    }
}

fn selection_acceptable(handshake: &MessageProtocolHandshake) -> bool {
    handshake.version == PROTOCOL_VERSION && handshake.supports_json()
}
