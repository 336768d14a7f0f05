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

//! The hello phase: both sides must reach `ready` before the protocol
//! handshake may start.
//!
//! A side without trust for its peer waits in `pending`, announcing how
//! long it will keep the door open; the other side paces it with
//! prolongation requests and gives up when the reply window or the
//! prolongation budget is exhausted.

use log::*;
use tokio::time::{timeout_at, Instant};

use crate::{
    connection::{
        states::{SmeEvent, SmeStateKind},
        ConnectionShared,
        HELLO_PROLONGATION_LIMIT,
    },
    message::{self, ConnectionClose, ConnectionClosePhase, ConnectionHello, ConnectionHelloPhase, ControlMessage, ShipFrame},
};

const LOG_TARGET: &str = "eebus::ship::sme::hello";

#[derive(Debug, Default)]
pub struct Hello {
    started: bool,
    local_ready: bool,
    peer_ready: bool,
    /// How long we keep waiting for the user to trust the peer.
    own_deadline: Option<Instant>,
    /// When to pace a pending peer with a prolongation request.
    prolongation_due: Option<Instant>,
    /// A sent prolongation request must be answered by this instant.
    reply_deadline: Option<Instant>,
    peer_prolongations: u32,
    /// The trust channel is gone; no pairing decision can arrive anymore.
    trust_closed: bool,
}

impl Hello {
    pub fn new() -> Self {
        Hello::default()
    }

    pub async fn next_event(&mut self, shared: &mut ConnectionShared) -> SmeEvent {
        if !self.started {
            self.started = true;
            if let Some(event) = self.announce_phase(shared).await {
                return event;
            }
        }

        loop {
            if self.local_ready && self.peer_ready {
                return SmeEvent::HelloAgreed;
            }
            if !self.local_ready && !shared.node.is_waiting_for_trust_allowed(&shared.ski) {
                let _ = shared
                    .send_control(ControlMessage::ConnectionHello(ConnectionHello::aborted()))
                    .await;
                return SmeEvent::Failed("waiting for trust denied".to_string());
            }

            let fallback = Instant::now() + shared.config.wait_for_ready;
            let deadline = [self.own_deadline, self.prolongation_due, self.reply_deadline]
                .into_iter()
                .flatten()
                .chain(std::iter::once(fallback))
                .min()
                .expect("at least the fallback deadline");

            enum Wake {
                Trusted,
                Frame(Vec<u8>),
                TimedOut,
            }
            let wake = {
                let ConnectionShared {
                    transport,
                    shutdown,
                    trust_rx,
                    ..
                } = shared;
                tokio::select! {
                    _ = shutdown.wait() => return SmeEvent::CloseRequested,
                    changed = trust_rx.changed(), if !self.local_ready && !self.trust_closed => match changed {
                        Ok(()) if *trust_rx.borrow() => Wake::Trusted,
                        Ok(()) => continue,
                        Err(_) => {
                            self.trust_closed = true;
                            continue;
                        },
                    },
                    read = timeout_at(deadline, transport.read_frame()) => match read {
                        Err(_) => Wake::TimedOut,
                        Ok(Err(e)) => return SmeEvent::Failed(format!("connection lost: {}", e)),
                        Ok(Ok(bytes)) => Wake::Frame(bytes),
                    },
                }
            };

            let event = match wake {
                Wake::Trusted => self.promote_to_ready(shared).await,
                Wake::TimedOut => self.handle_timeout(shared, deadline).await,
                Wake::Frame(bytes) => self.handle_frame(shared, &bytes).await,
            };
            if let Some(event) = event {
                return event;
            }
        }
    }

    /// Send our opening hello: ready when the peer is trusted, pending
    /// with a waiting window otherwise.
    async fn announce_phase(&mut self, shared: &mut ConnectionShared) -> Option<SmeEvent> {
        let trusted = *shared.trust_rx.borrow();
        if trusted {
            self.local_ready = true;
            shared.update_state(SmeStateKind::HelloReady);
            if let Err(e) = shared
                .send_control(ControlMessage::ConnectionHello(ConnectionHello::ready()))
                .await
            {
                return Some(SmeEvent::Failed(format!("hello send failed: {}", e)));
            }
        } else {
            if !shared.node.is_waiting_for_trust_allowed(&shared.ski) {
                let _ = shared
                    .send_control(ControlMessage::ConnectionHello(ConnectionHello::aborted()))
                    .await;
                return Some(SmeEvent::Failed("waiting for trust denied".to_string()));
            }
            let waiting = shared.config.wait_for_ready;
            self.own_deadline = Some(Instant::now() + waiting);
            shared.update_state(SmeStateKind::HelloPending);
            if let Err(e) = shared
                .send_control(ControlMessage::ConnectionHello(ConnectionHello::pending(waiting.as_millis() as u64)))
                .await
            {
                return Some(SmeEvent::Failed(format!("hello send failed: {}", e)));
            }
        }
        None
    }

    async fn promote_to_ready(&mut self, shared: &mut ConnectionShared) -> Option<SmeEvent> {
        self.local_ready = true;
        self.own_deadline = None;
        shared.update_state(SmeStateKind::HelloReady);
        if let Err(e) = shared
            .send_control(ControlMessage::ConnectionHello(ConnectionHello::ready()))
            .await
        {
            return Some(SmeEvent::Failed(format!("hello send failed: {}", e)));
        }
        None
    }

    async fn handle_timeout(&mut self, shared: &mut ConnectionShared, fired: Instant) -> Option<SmeEvent> {
        if self.reply_deadline.map(|deadline| fired >= deadline).unwrap_or(false) {
            // The pending peer never answered our prolongation request
            return Some(SmeEvent::Failed("wait-for-ready timeout".to_string()));
        }
        if self.prolongation_due.map(|due| fired >= due).unwrap_or(false) {
            self.prolongation_due = None;
            self.reply_deadline = Some(Instant::now() + shared.config.prolongation_reply);
            let request = ConnectionHello {
                phase: if self.local_ready {
                    ConnectionHelloPhase::Ready
                } else {
                    ConnectionHelloPhase::Pending
                },
                waiting: None,
                prolongation_request: Some(true),
            };
            if let Err(e) = shared.send_control(ControlMessage::ConnectionHello(request)).await {
                return Some(SmeEvent::Failed(format!("hello send failed: {}", e)));
            }
            return None;
        }
        if self.own_deadline.map(|deadline| fired >= deadline).unwrap_or(false) {
            // Nobody trusted the peer in time
            let _ = shared
                .send_control(ControlMessage::ConnectionHello(ConnectionHello::aborted()))
                .await;
            return Some(SmeEvent::Failed("hello timeout".to_string()));
        }
        Some(SmeEvent::Failed("hello timeout".to_string()))
    }

    async fn handle_frame(&mut self, shared: &mut ConnectionShared, bytes: &[u8]) -> Option<SmeEvent> {
        let frame = match message::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(target: LOG_TARGET, "[{}] dropping malformed frame: {}", shared.ski, e);
                return None;
            },
        };
        let hello = match frame {
            ShipFrame::Control(ControlMessage::ConnectionHello(hello)) => hello,
            ShipFrame::End(close) => {
                if close.phase == ConnectionClosePhase::Announce {
                    let _ = shared.send_frame(&ShipFrame::End(ConnectionClose::confirm())).await;
                }
                return Some(SmeEvent::ClosedByPeer(close.reason));
            },
            ShipFrame::Init => return None,
            other => {
                debug!(target: LOG_TARGET, "[{}] unexpected message during hello: {:?}", shared.ski, other);
                return Some(SmeEvent::Failed("unexpected message during hello".to_string()));
            },
        };

        match hello.phase {
            ConnectionHelloPhase::Ready => {
                self.peer_ready = true;
                self.prolongation_due = None;
                self.reply_deadline = None;
                None
            },
            ConnectionHelloPhase::Aborted => Some(SmeEvent::Failed("remote denied trust".to_string())),
            ConnectionHelloPhase::Pending => {
                if hello.prolongation_request == Some(true) {
                    // The pending peer asks us to keep waiting; answer with
                    // our current phase within the reply window
                    self.peer_prolongations += 1;
                    if self.peer_prolongations > HELLO_PROLONGATION_LIMIT {
                        let _ = shared
                            .send_control(ControlMessage::ConnectionHello(ConnectionHello::aborted()))
                            .await;
                        return Some(SmeEvent::Failed("wait-for-ready timeout".to_string()));
                    }
                    let reply = if self.local_ready {
                        ConnectionHello::ready()
                    } else {
                        ConnectionHello::pending(shared.config.wait_for_ready.as_millis() as u64)
                    };
                    if let Err(e) = shared.send_control(ControlMessage::ConnectionHello(reply)).await {
                        return Some(SmeEvent::Failed(format!("hello send failed: {}", e)));
                    }
                    return None;
                }
                // An answer to our prolongation request still counts
                // against the peer's budget
                if self.reply_deadline.take().is_some() {
                    self.peer_prolongations += 1;
                    if self.peer_prolongations > HELLO_PROLONGATION_LIMIT {
                        let _ = shared
                            .send_control(ControlMessage::ConnectionHello(ConnectionHello::aborted()))
                            .await;
                        return Some(SmeEvent::Failed("wait-for-ready timeout".to_string()));
                    }
                }
                let waiting = hello
                    .waiting
                    .map(std::time::Duration::from_millis)
                    .unwrap_or(shared.config.wait_for_ready);
                self.prolongation_due = Some(Instant::now() + waiting / 2);
                None
            },
        }
    }
}
