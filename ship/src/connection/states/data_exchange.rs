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

//! The completed connection: SPINE data frames flow in both directions,
//! control frames still share the link.

use std::sync::Arc;

use log::*;

use crate::{
    connection::{
        states::{SmeEvent, SmeStateKind},
        ConnectionShared,
        ShipConnectionWriter,
    },
    message::{self, ConnectionClose, ConnectionClosePhase, ShipFrame},
};

const LOG_TARGET: &str = "eebus::ship::sme::data";

#[derive(Debug, Default)]
pub struct DataExchange {
    attached: bool,
}

impl DataExchange {
    pub fn new() -> Self {
        DataExchange::default()
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        if !self.attached {
            self.attached = true;
            let writer = Arc::new(ShipConnectionWriter {
                outbound: shared.outbound_tx.clone(),
            });
            match shared.node.setup_remote_device(&shared.ski, writer) {
                Ok(reader) => shared.reader = Some(reader),
                Err(e) => return SmeEvent::Failed(format!("spine attach failed: {}", e)),
            }
            shared.update_state(SmeStateKind::Complete);
            shared.node.on_remote_ski_connected(&shared.ski);
        }

        loop {
            enum Wake {
                Outbound(Option<Vec<u8>>),
                Inbound(Result<Vec<u8>, eebus_common::EebusError>),
            }
            let wake = {
                let ConnectionShared {
                    transport,
                    shutdown,
                    outbound_rx,
                    ..
                } = shared;
                tokio::select! {
                    _ = shutdown.wait() => return SmeEvent::CloseRequested,
                    payload = outbound_rx.recv() => Wake::Outbound(payload),
                    read = transport.read_frame() => Wake::Inbound(read),
                }
            };
            match wake {
                Wake::Outbound(None) => return SmeEvent::CloseRequested,
                Wake::Outbound(Some(payload)) => {
                    if let Err(e) = shared.send_frame(&ShipFrame::Data(payload)).await {
                        return SmeEvent::Failed(format!("send failed: {}", e));
                    }
                },
                Wake::Inbound(Err(e)) => return SmeEvent::Failed(format!("connection lost: {}", e)),
                Wake::Inbound(Ok(bytes)) => match message::decode(&bytes) {
                    Ok(ShipFrame::Data(payload)) => {
                        let reader = shared.reader.as_ref().expect("attached above");
                        if let Err(e) = reader.handle_incoming(&payload) {
                            warn!(target: LOG_TARGET, "[{}] dropping invalid data frame: {}", shared.ski, e);
                        }
                    },
                    Ok(ShipFrame::End(close)) => {
                        if close.phase == ConnectionClosePhase::Announce {
                            let _ = shared.send_frame(&ShipFrame::End(ConnectionClose::confirm())).await;
                        }
                        return SmeEvent::ClosedByPeer(close.reason);
                    },
                    Ok(other) => {
                        debug!(target: LOG_TARGET, "[{}] ignoring control frame in data phase: {:?}", shared.ski, other);
                    },
                    Err(e) => {
                        warn!(target: LOG_TARGET, "[{}] dropping malformed frame: {}", shared.ski, e);
                    },
                },
            }
        }
    }
}
