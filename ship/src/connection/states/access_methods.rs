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

//! The access-methods exchange: both sides request and provide their
//! permanent SHIP identifier. Once both identifiers have crossed, the
//! connection is trusted.

use tokio::time::Instant;

use crate::{
    connection::{
        states::{SmeEvent, SmeStateKind},
        ConnectionShared,
    },
    message::{AccessMethods, AccessMethodsRequest, ControlMessage, ShipFrame},
};

#[derive(Debug, Default)]
pub struct AccessMethodsExchange {
    sent_methods: bool,
    remote_id: Option<String>,
}

impl AccessMethodsExchange {
    pub fn new() -> Self {
        AccessMethodsExchange::default()
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let deadline = Instant::now() + shared.config.cmi_timeout;
        if let Err(e) = shared
            .send_control(ControlMessage::AccessMethodsRequest(AccessMethodsRequest {}))
            .await
        {
            return SmeEvent::Failed(format!("access methods send failed: {}", e));
        }
        loop {
            if self.sent_methods {
                if let Some(id) = &self.remote_id {
                    shared.node.on_ship_id_update(&shared.ski, id);
                    shared.update_state(SmeStateKind::Trusted);
                    return SmeEvent::ShipIdExchanged;
                }
            }
            let frame = match shared.next_frame(deadline, "access methods timeout").await {
                Ok(frame) => frame,
                Err(event) => return event,
            };
            match frame {
                ShipFrame::Control(ControlMessage::AccessMethodsRequest(_)) => {
                    let methods = AccessMethods {
                        id: shared.config.local_ship_id.clone(),
                    };
                    if let Err(e) = shared.send_control(ControlMessage::AccessMethods(methods)).await {
                        return SmeEvent::Failed(format!("access methods send failed: {}", e));
                    }
                    self.sent_methods = true;
                },
                ShipFrame::Control(ControlMessage::AccessMethods(methods)) => {
                    self.remote_id = Some(methods.id);
                },
                _ => return SmeEvent::Failed("unexpected message during access methods".to_string()),
            }
        }
    }
}
