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

//! The transport collaborator seam.
//!
//! The core never opens sockets itself: a mutually-authenticated,
//! frame-delimited link (in production a TLS WebSocket) is supplied by the
//! embedder through these capability traits, together with the peer's SKI
//! extracted from its certificate.

use async_trait::async_trait;
use eebus_common::{EebusError, Ski};

/// One established frame-delimited link to a peer.
#[async_trait]
pub trait ShipTransport: Send {
    /// The next complete frame. An error means the link is gone.
    async fn read_frame(&mut self) -> Result<Vec<u8>, EebusError>;
    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), EebusError>;
    /// Best effort; must be idempotent.
    async fn close(&mut self);
}

/// Accepts inbound links on the configured port.
#[async_trait]
pub trait ShipTransportListener: Send {
    async fn accept(&mut self) -> Result<(Box<dyn ShipTransport>, Ski), EebusError>;
}

/// Dials a discovered peer.
#[async_trait]
pub trait ShipTransportConnector: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> Result<(Box<dyn ShipTransport>, Ski), EebusError>;
}
