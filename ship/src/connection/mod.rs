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

//! The per-peer SHIP connection.
//!
//! Each connection runs a finite state machine from WebSocket-open through
//! trusted/completed: every possible transition is described by
//! [`states::transition`], each state produces its next event by reading
//! frames and timers, and a shutdown signal closes the machine from any
//! state. Once completed, the connection multiplexes SPINE data frames in
//! both directions.

pub mod states;

use std::{
    fmt::{Display, Error, Formatter},
    sync::Arc,
    time::Duration,
};

use eebus_common::{EebusError, Ski, SpineDataReader, SpineDataWriter};
use eebus_shutdown::{Shutdown, ShutdownSignal};
use log::*;
use tokio::sync::{mpsc, watch};

pub use states::{CloseReason, SmeStateKind};

use crate::{
    api::ShipNodeReader,
    message::{self, ConnectionClose, ControlMessage, ShipFrame},
    transport::ShipTransport,
};

const LOG_TARGET: &str = "eebus::ship::connection";

/// Inactivity guard while the handshake makes progress.
pub const T_WAIT_FOR_READY: Duration = Duration::from_secs(60);
/// A peer asked to prolong must answer within this window.
pub const T_PROLONGATION_REPLY: Duration = T_WAIT_FOR_READY;
/// The initial connection-mode-initialisation exchange.
pub const T_CMI_TIMEOUT: Duration = Duration::from_secs(10);

/// How often an untrusted peer may extend the hello phase before the
/// connection is closed.
pub const HELLO_PROLONGATION_LIMIT: u32 = 2;

/// Which side of the SHIP handshake this connection plays; unrelated to
/// the SPINE client/server roles above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Client,
    Server,
}

impl Display for ConnectionRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            ConnectionRole::Client => f.write_str("client"),
            ConnectionRole::Server => f.write_str("server"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShipConnectionConfig {
    /// The permanent SHIP identifier announced during access methods.
    pub local_ship_id: String,
    pub cmi_timeout: Duration,
    pub wait_for_ready: Duration,
    pub prolongation_reply: Duration,
}

impl ShipConnectionConfig {
    pub fn new<T: Into<String>>(local_ship_id: T) -> Self {
        Self {
            local_ship_id: local_ship_id.into(),
            cmi_timeout: T_CMI_TIMEOUT,
            wait_for_ready: T_WAIT_FOR_READY,
            prolongation_reply: T_PROLONGATION_REPLY,
        }
    }
}

/// The writer handed to the SPINE layer on attach; enqueues data frames
/// onto the connection's writer side without blocking.
pub(crate) struct ShipConnectionWriter {
    pub(crate) outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl SpineDataWriter for ShipConnectionWriter {
    fn write(&self, payload: Vec<u8>) -> Result<(), EebusError> {
        self.outbound
            .send(payload)
            .map_err(|_| EebusError::init("connection closed"))
    }
}

/// Everything the SME states share.
pub(crate) struct ConnectionShared {
    pub(crate) role: ConnectionRole,
    pub(crate) ski: Ski,
    pub(crate) config: ShipConnectionConfig,
    pub(crate) transport: Box<dyn ShipTransport>,
    pub(crate) node: Arc<dyn ShipNodeReader>,
    /// Whether the local side trusts the peer; flipped by the service when
    /// the user pairs the SKI while the connection waits in hello.
    pub(crate) trust_rx: watch::Receiver<bool>,
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    pub(crate) outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pub(crate) reader: Option<Arc<dyn SpineDataReader>>,
    state_tx: watch::Sender<SmeStateKind>,
    last_kind: SmeStateKind,
}

impl ConnectionShared {
    /// Publish a state transition to the handle watch and the service.
    pub(crate) fn update_state(&mut self, kind: SmeStateKind) {
        if kind == self.last_kind {
            return;
        }
        debug!(target: LOG_TARGET, "[{}] SME {} -> {}", self.ski, self.last_kind, kind);
        self.last_kind = kind.clone();
        let _ = self.state_tx.send(kind.clone());
        self.node.on_ship_state_update(&self.ski, kind);
    }

    pub(crate) async fn send_frame(&mut self, frame: &ShipFrame) -> Result<(), EebusError> {
        let bytes = message::encode(frame)?;
        self.transport.write_frame(bytes).await
    }

    pub(crate) async fn send_control(&mut self, control: ControlMessage) -> Result<(), EebusError> {
        self.send_frame(&ShipFrame::Control(control)).await
    }

    /// Read the next frame, honouring the shutdown signal, the deadline
    /// and close announcements from the peer.
    pub(crate) async fn next_frame(
        &mut self,
        deadline: tokio::time::Instant,
        timeout_reason: &str,
    ) -> Result<ShipFrame, states::SmeEvent> {
        loop {
            let ConnectionShared {
                transport, shutdown, ..
            } = self;
            let frame = tokio::select! {
                _ = shutdown.wait() => return Err(states::SmeEvent::CloseRequested),
                read = tokio::time::timeout_at(deadline, transport.read_frame()) => match read {
                    Err(_) => return Err(states::SmeEvent::Failed(timeout_reason.to_string())),
                    Ok(Err(e)) => return Err(states::SmeEvent::Failed(format!("connection lost: {}", e))),
                    Ok(Ok(bytes)) => bytes,
                },
            };
            match message::decode(&frame) {
                Ok(ShipFrame::End(close)) => {
                    if close.phase == message::ConnectionClosePhase::Announce {
                        let _ = self.send_frame(&ShipFrame::End(ConnectionClose::confirm())).await;
                    }
                    return Err(states::SmeEvent::ClosedByPeer(close.reason));
                },
                Ok(frame) => return Ok(frame),
                Err(e) => {
                    warn!(target: LOG_TARGET, "[{}] dropping malformed frame: {}", self.ski, e);
                },
            }
        }
    }
}

/// Handle the service keeps per connection: state observation and close.
pub struct ShipConnectionHandle {
    ski: Ski,
    shutdown: Shutdown,
    state_rx: watch::Receiver<SmeStateKind>,
}

impl ShipConnectionHandle {
    pub fn ski(&self) -> &Ski {
        &self.ski
    }

    pub fn state(&self) -> SmeStateKind {
        self.state_rx.borrow().clone()
    }

    pub fn state_watch(&self) -> watch::Receiver<SmeStateKind> {
        self.state_rx.clone()
    }

    /// Close the connection from any thread: cancels the SME's timers,
    /// signals the reader task and drops queued outbound frames.
    pub fn close(&mut self) {
        self.shutdown.trigger();
    }
}

/// One SHIP connection; owns its transport and runs its SME to
/// completion.
pub struct ShipConnection {
    shared: ConnectionShared,
}

impl ShipConnection {
    /// Wire up a connection over an established transport. `trusted`
    /// carries the service's live trust decision for the peer's SKI.
    pub fn new(
        role: ConnectionRole,
        ski: Ski,
        transport: Box<dyn ShipTransport>,
        config: ShipConnectionConfig,
        node: Arc<dyn ShipNodeReader>,
        trust_rx: watch::Receiver<bool>,
    ) -> (Self, ShipConnectionHandle) {
        let shutdown = Shutdown::new();
        let (state_tx, state_rx) = watch::channel(SmeStateKind::CmiInit);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = ConnectionShared {
            role,
            ski,
            config,
            transport,
            node,
            trust_rx,
            shutdown: shutdown.to_signal(),
            outbound_tx,
            outbound_rx,
            reader: None,
            state_tx,
            last_kind: SmeStateKind::CmiInit,
        };
        let handle = ShipConnectionHandle {
            ski,
            shutdown,
            state_rx,
        };
        (Self { shared }, handle)
    }

    /// Drive the SME until it closes. Emits the final state update and the
    /// disconnected callback exactly once.
    pub async fn run(mut self) {
        use states::SmeState;

        let mut state = SmeState::initial();
        info!(
            target: LOG_TARGET,
            "[{}] SHIP connection started as {}", self.shared.ski, self.shared.role
        );
        let reason = loop {
            if let Some(kind) = state.kind() {
                self.shared.update_state(kind);
            }
            let event = match &mut state {
                SmeState::CmiInit(s) => s.next_event(&mut self.shared).await,
                SmeState::Hello(s) => s.next_event(&mut self.shared).await,
                SmeState::ProtocolHandshake(s) => s.next_event(&mut self.shared).await,
                SmeState::PinCheck(s) => s.next_event(&mut self.shared).await,
                SmeState::AccessMethods(s) => s.next_event(&mut self.shared).await,
                SmeState::DataExchange(s) => s.next_event(&mut self.shared).await,
                SmeState::Closed(closed) => break closed.reason.clone(),
            };
            trace!(target: LOG_TARGET, "[{}] SME event in {}: {}", self.shared.ski, state, event);
            state = states::transition(state, event);
        };
        self.close_link(&reason).await;

        let kind = match &reason {
            CloseReason::Error(message) => SmeStateKind::CloseError(message.clone()),
            _ => SmeStateKind::CloseNormal,
        };
        self.shared.update_state(kind);
        self.shared.node.on_remote_ski_disconnected(&self.shared.ski);
        info!(
            target: LOG_TARGET,
            "[{}] SHIP connection closed ({})", self.shared.ski, reason
        );
    }

    /// Best-effort close announcement, then drop the transport.
    async fn close_link(&mut self, reason: &CloseReason) {
        match reason {
            CloseReason::Remote(_) => {},
            CloseReason::Local => {
                let _ = self.shared.send_frame(&ShipFrame::End(ConnectionClose::announce(None))).await;
            },
            CloseReason::Error(message) => {
                let _ = self
                    .shared
                    .send_frame(&ShipFrame::End(ConnectionClose::announce(Some(message.clone()))))
                    .await;
            },
        }
        self.shared.transport.close().await;
    }
}
