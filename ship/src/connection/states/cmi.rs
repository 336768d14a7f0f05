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

//! Connection-mode initialisation: both sides exchange the two-byte CMI
//! frame before any SHIP message may flow.

use tokio::time::Instant;

use crate::{
    connection::{states::SmeEvent, ConnectionRole, ConnectionShared},
    message::ShipFrame,
};

#[derive(Debug, Default)]
pub struct CmiInit {}

impl CmiInit {
    pub fn new() -> Self {
        CmiInit {}
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        let deadline = Instant::now() + shared.config.cmi_timeout;
        if shared.role == ConnectionRole::Client {
            if let Err(e) = shared.send_frame(&ShipFrame::Init).await {
                return SmeEvent::Failed(format!("CMI send failed: {}", e));
            }
        }
        let frame = match shared.next_frame(deadline, "CMI timeout").await {
            Ok(frame) => frame,
            Err(event) => return event,
        };
        if frame != ShipFrame::Init {
            return SmeEvent::Failed("unexpected message during CMI".to_string());
        }
        if shared.role == ConnectionRole::Server {
            if let Err(e) = shared.send_frame(&ShipFrame::Init).await {
                return SmeEvent::Failed(format!("CMI send failed: {}", e));
            }
        }
        SmeEvent::CmiCompleted
    }
}
