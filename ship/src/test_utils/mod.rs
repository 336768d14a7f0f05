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

//! In-memory collaborators for tests: a duplex frame transport and the
//! matching listener/connector pair.

use std::collections::HashMap;

use async_trait::async_trait;
use eebus_common::{EebusError, Ski};
use tokio::sync::mpsc;

use crate::transport::{ShipTransport, ShipTransportConnector, ShipTransportListener};

/// One end of an in-memory frame-delimited link.
pub struct MemoryTransport {
    tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemoryTransport {
    /// A connected pair of transports.
    pub fn pair() -> (MemoryTransport, MemoryTransport) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                tx: Some(a_tx),
                rx: b_rx,
            },
            MemoryTransport {
                tx: Some(b_tx),
                rx: a_rx,
            },
        )
    }
}

#[async_trait]
impl ShipTransport for MemoryTransport {
    async fn read_frame(&mut self) -> Result<Vec<u8>, EebusError> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| EebusError::init("transport closed"))
    }

    async fn write_frame(&mut self, frame: Vec<u8>) -> Result<(), EebusError> {
        match &self.tx {
            Some(tx) => tx.send(frame).map_err(|_| EebusError::init("transport closed")),
            None => Err(EebusError::init("transport closed")),
        }
    }

    async fn close(&mut self) {
        self.tx.take();
    }
}

/// A listener fed by [`MemoryNetwork::dial`].
pub struct MemoryListener {
    accept_rx: mpsc::UnboundedReceiver<(Box<dyn ShipTransport>, Ski)>,
}

#[async_trait]
impl ShipTransportListener for MemoryListener {
    async fn accept(&mut self) -> Result<(Box<dyn ShipTransport>, Ski), EebusError> {
        self.accept_rx
            .recv()
            .await
            .ok_or_else(|| EebusError::init("listener closed"))
    }
}

/// An in-memory "network": hosts register a listener, connectors dial by
/// host name.
#[derive(Default)]
pub struct MemoryNetwork {
    hosts: std::sync::Mutex<HashMap<String, (mpsc::UnboundedSender<(Box<dyn ShipTransport>, Ski)>, Ski)>>,
}

impl MemoryNetwork {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(MemoryNetwork::default())
    }

    /// Register a host; inbound dials surface on the returned listener.
    pub fn listen(&self, host: &str, local_ski: Ski) -> MemoryListener {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        self.hosts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(host.to_string(), (accept_tx, local_ski));
        MemoryListener { accept_rx }
    }

    /// Dial a registered host, handing it the caller's SKI as the
    /// "certificate" identity.
    pub fn dial(&self, host: &str, caller_ski: Ski) -> Result<(Box<dyn ShipTransport>, Ski), EebusError> {
        let hosts = self.hosts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (accept_tx, host_ski) = hosts
            .get(host)
            .ok_or_else(|| EebusError::init(format!("unknown host {}", host)))?;
        let (local, remote) = MemoryTransport::pair();
        accept_tx
            .send((Box::new(remote), caller_ski))
            .map_err(|_| EebusError::init("listener closed"))?;
        Ok((Box::new(local), *host_ski))
    }
}

/// Connector backed by a [`MemoryNetwork`].
pub struct MemoryConnector {
    pub network: std::sync::Arc<MemoryNetwork>,
    pub local_ski: Ski,
}

#[async_trait]
impl ShipTransportConnector for MemoryConnector {
    async fn connect(&self, host: &str, _port: u16) -> Result<(Box<dyn ShipTransport>, Ski), EebusError> {
        self.network.dial(host, self.local_ski)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_cross_a_transport_pair() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.write_frame(vec![1, 2, 3]).await.unwrap();
        assert_eq!(b.read_frame().await.unwrap(), vec![1, 2, 3]);
        b.write_frame(vec![4]).await.unwrap();
        assert_eq!(a.read_frame().await.unwrap(), vec![4]);
        a.close().await;
        assert!(b.read_frame().await.is_err());
    }

    #[tokio::test]
    async fn the_memory_network_connects_hosts() {
        let network = MemoryNetwork::new();
        let host_ski = Ski::new([1; 20]);
        let caller_ski = Ski::new([2; 20]);
        let mut listener = network.listen("server.local", host_ski);
        let (mut client, seen_host_ski) = network.dial("server.local", caller_ski).unwrap();
        assert_eq!(seen_host_ski, host_ski);
        let (mut server, seen_caller_ski) = listener.accept().await.unwrap();
        assert_eq!(seen_caller_ski, caller_ski);
        client.write_frame(vec![7]).await.unwrap();
        assert_eq!(server.read_frame().await.unwrap(), vec![7]);
    }
}
