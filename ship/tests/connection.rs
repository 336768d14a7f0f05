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

//! End-to-end tests of the SHIP connection SME, against a real peer and
//! against a scripted one.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use eebus_common::{EebusError, Ski, SpineDataReader, SpineDataWriter};
use eebus_ship::{
    connection::{ConnectionRole, ShipConnection, ShipConnectionConfig, ShipConnectionHandle},
    message::{
        self,
        ConnectionHello,
        ConnectionHelloPhase,
        ConnectionPinState,
        ControlMessage,
        MessageProtocolHandshake,
        PinState,
        ProtocolHandshakeType,
        ShipFrame,
    },
    test_utils::MemoryTransport,
    transport::ShipTransport,
    ShipNodeReader,
    SmeStateKind,
};
use tokio::sync::watch;

#[derive(Default)]
struct TestNode {
    connected: AtomicUsize,
    disconnected: AtomicUsize,
    ship_ids: Mutex<Vec<String>>,
    inbound: Arc<Mutex<Vec<Vec<u8>>>>,
    writer: Mutex<Option<Arc<dyn SpineDataWriter>>>,
}

struct TestReader {
    inbound: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl SpineDataReader for TestReader {
    fn handle_incoming(&self, payload: &[u8]) -> Result<(), EebusError> {
        self.inbound.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

impl ShipNodeReader for TestNode {
    fn on_remote_ski_connected(&self, _ski: &Ski) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_remote_ski_disconnected(&self, _ski: &Ski) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }

    fn setup_remote_device(
        &self,
        _ski: &Ski,
        writer: Arc<dyn SpineDataWriter>,
    ) -> Result<Arc<dyn SpineDataReader>, EebusError> {
        *self.writer.lock().unwrap() = Some(writer);
        Ok(Arc::new(TestReader {
            inbound: self.inbound.clone(),
        }))
    }

    fn on_ship_id_update(&self, _ski: &Ski, ship_id: &str) {
        self.ship_ids.lock().unwrap().push(ship_id.to_string());
    }

    fn on_ship_state_update(&self, _ski: &Ski, _state: SmeStateKind) {}

    fn is_waiting_for_trust_allowed(&self, _ski: &Ski) -> bool {
        true
    }
}

fn quick_config(ship_id: &str) -> ShipConnectionConfig {
    let mut config = ShipConnectionConfig::new(ship_id);
    config.cmi_timeout = Duration::from_secs(2);
    config.wait_for_ready = Duration::from_secs(2);
    config.prolongation_reply = Duration::from_millis(300);
    config
}

fn spawn_peer(
    role: ConnectionRole,
    remote_ski: Ski,
    transport: MemoryTransport,
    ship_id: &str,
    trusted: bool,
) -> (Arc<TestNode>, ShipConnectionHandle) {
    let node = Arc::new(TestNode::default());
    let (_trust_tx, trust_rx) = {
        let (tx, rx) = watch::channel(trusted);
        // Leak the sender so the trust decision stays alive for the test
        (Box::leak(Box::new(tx)), rx)
    };
    let (connection, handle) = ShipConnection::new(
        role,
        remote_ski,
        Box::new(transport),
        quick_config(ship_id),
        node.clone(),
        trust_rx,
    );
    tokio::spawn(connection.run());
    (node, handle)
}

async fn wait_for_state(handle: &ShipConnectionHandle, want: impl Fn(&SmeStateKind) -> bool) -> SmeStateKind {
    let mut watch = handle.state_watch();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let state = watch.borrow().clone();
            if want(&state) {
                return state;
            }
            watch.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("timed out waiting for SME state")
}

#[tokio::test]
async fn trusted_peers_complete_the_handshake_and_exchange_data() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (transport_a, transport_b) = MemoryTransport::pair();
    let ski_a = Ski::new([1; 20]);
    let ski_b = Ski::new([2; 20]);

    let (node_a, handle_a) = spawn_peer(ConnectionRole::Client, ski_b, transport_a, "Brand-A-1", true);
    let (node_b, handle_b) = spawn_peer(ConnectionRole::Server, ski_a, transport_b, "Brand-B-1", true);

    wait_for_state(&handle_a, |state| *state == SmeStateKind::Complete).await;
    wait_for_state(&handle_b, |state| *state == SmeStateKind::Complete).await;

    assert_eq!(node_a.connected.load(Ordering::SeqCst), 1);
    assert_eq!(node_b.connected.load(Ordering::SeqCst), 1);
    assert_eq!(node_a.ship_ids.lock().unwrap().as_slice(), &["Brand-B-1".to_string()]);
    assert_eq!(node_b.ship_ids.lock().unwrap().as_slice(), &["Brand-A-1".to_string()]);

    // SPINE payloads cross the completed link in both directions
    let writer_a = node_a.writer.lock().unwrap().clone().expect("attached");
    writer_a.write(b"from-a".to_vec()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if node_b.inbound.lock().unwrap().iter().any(|frame| frame == b"from-a") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("data frame never arrived");

    // An orderly local close surfaces exactly one disconnect on each side
    let mut handle_a = handle_a;
    handle_a.close();
    wait_for_state(&handle_a, SmeStateKind::is_closed).await;
    wait_for_state(&handle_b, SmeStateKind::is_closed).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node_a.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(node_b.disconnected.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn a_silent_pending_peer_times_out_with_wait_for_ready() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (transport, mut peer) = MemoryTransport::pair();
    let (node, handle) = spawn_peer(ConnectionRole::Client, Ski::new([2; 20]), transport, "Brand-A-1", true);

    // CMI
    assert_eq!(peer.read_frame().await.unwrap(), vec![0, 0]);
    peer.write_frame(vec![0, 0]).await.unwrap();

    // Our ready hello
    let hello = message::decode(&peer.read_frame().await.unwrap()).unwrap();
    assert!(matches!(
        hello,
        ShipFrame::Control(ControlMessage::ConnectionHello(ConnectionHello {
            phase: ConnectionHelloPhase::Ready,
            ..
        }))
    ));

    // The peer claims pending with a short waiting window, then goes silent
    peer.write_frame(message::encode(&ShipFrame::Control(ControlMessage::ConnectionHello(ConnectionHello::pending(100)))).unwrap())
        .await
        .unwrap();

    // At half the advertised window we must be asked for a prolongation
    let frame = message::decode(&peer.read_frame().await.unwrap()).unwrap();
    match frame {
        ShipFrame::Control(ControlMessage::ConnectionHello(hello)) => {
            assert_eq!(hello.prolongation_request, Some(true));
        },
        other => panic!("expected a prolongation request, got {:?}", other),
    }

    // No reply within the prolongation window closes with the documented reason
    let state = wait_for_state(&handle, SmeStateKind::is_closed).await;
    match state {
        SmeStateKind::CloseError(reason) => assert!(reason.contains("wait-for-ready timeout"), "{}", reason),
        other => panic!("expected an error close, got {}", other),
    }

    // The close is announced to the peer with the reason before the link drops
    let mut saw_close = false;
    while let Ok(Ok(frame)) = tokio::time::timeout(Duration::from_millis(200), peer.read_frame()).await {
        if let Ok(ShipFrame::End(close)) = message::decode(&frame) {
            assert!(close.reason.unwrap_or_default().contains("wait-for-ready timeout"));
            saw_close = true;
            break;
        }
    }
    assert!(saw_close, "no close announcement observed");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.connected.load(Ordering::SeqCst), 0);
    assert_eq!(node.disconnected.load(Ordering::SeqCst), 1);
}

/// Drive a scripted peer through CMI and hello so the next phase can be
/// exercised in isolation.
async fn script_until_protocol_handshake(peer: &mut MemoryTransport) {
    peer.write_frame(vec![0, 0]).await.unwrap();
    assert_eq!(peer.read_frame().await.unwrap(), vec![0, 0]);
    peer.write_frame(message::encode(&ShipFrame::Control(ControlMessage::ConnectionHello(ConnectionHello::ready()))).unwrap())
        .await
        .unwrap();
    let hello = message::decode(&peer.read_frame().await.unwrap()).unwrap();
    assert!(matches!(hello, ShipFrame::Control(ControlMessage::ConnectionHello(_))));
}

#[tokio::test]
async fn a_version_mismatch_closes_with_protocol_mismatch() {
    let (transport, mut peer) = MemoryTransport::pair();
    let (_node, handle) = spawn_peer(ConnectionRole::Server, Ski::new([2; 20]), transport, "Brand-A-1", true);

    script_until_protocol_handshake(&mut peer).await;

    let mut announce = MessageProtocolHandshake::new(ProtocolHandshakeType::AnnounceMax);
    announce.version = message::Version { major: 2, minor: 0 };
    peer.write_frame(message::encode(&ShipFrame::Control(ControlMessage::MessageProtocolHandshake(announce))).unwrap())
        .await
        .unwrap();

    let state = wait_for_state(&handle, SmeStateKind::is_closed).await;
    match state {
        SmeStateKind::CloseError(reason) => assert!(reason.contains("protocol mismatch"), "{}", reason),
        other => panic!("expected an error close, got {}", other),
    }
}

#[tokio::test]
async fn an_unsupported_pin_variant_closes_the_connection() {
    let (transport, mut peer) = MemoryTransport::pair();
    let (_node, handle) = spawn_peer(ConnectionRole::Server, Ski::new([2; 20]), transport, "Brand-A-1", true);

    script_until_protocol_handshake(&mut peer).await;

    // Protocol handshake as the scripted client
    let announce = MessageProtocolHandshake::new(ProtocolHandshakeType::AnnounceMax);
    peer.write_frame(message::encode(&ShipFrame::Control(ControlMessage::MessageProtocolHandshake(announce))).unwrap())
        .await
        .unwrap();
    let selection = match message::decode(&peer.read_frame().await.unwrap()).unwrap() {
        ShipFrame::Control(ControlMessage::MessageProtocolHandshake(selection)) => selection,
        other => panic!("expected a selection, got {:?}", other),
    };
    assert_eq!(selection.handshake_type, ProtocolHandshakeType::Select);
    peer.write_frame(message::encode(&ShipFrame::Control(ControlMessage::MessageProtocolHandshake(selection))).unwrap())
        .await
        .unwrap();

    // The peer demands a PIN this implementation does not speak
    peer.write_frame(
        message::encode(&ShipFrame::Control(ControlMessage::ConnectionPinState(ConnectionPinState {
            pin_state: PinState::Required,
            input_permission: None,
        })))
        .unwrap(),
    )
    .await
    .unwrap();
    // Drain our own pin announcement
    let _ = peer.read_frame().await.unwrap();

    let state = wait_for_state(&handle, SmeStateKind::is_closed).await;
    match state {
        SmeStateKind::CloseError(reason) => assert!(reason.contains("pin not supported"), "{}", reason),
        other => panic!("expected an error close, got {}", other),
    }
}

#[tokio::test]
async fn an_untrusted_peer_waits_in_pending_until_the_user_pairs() {
    let (transport_a, transport_b) = MemoryTransport::pair();
    let ski_a = Ski::new([1; 20]);
    let ski_b = Ski::new([2; 20]);

    // Side A trusts B; side B has no trust for A yet
    let node_a = Arc::new(TestNode::default());
    let (_trust_a, trust_rx_a) = watch::channel(true);
    let (connection_a, handle_a) = ShipConnection::new(
        ConnectionRole::Client,
        ski_b,
        Box::new(transport_a),
        quick_config("Brand-A-1"),
        node_a.clone(),
        trust_rx_a,
    );
    tokio::spawn(connection_a.run());

    let node_b = Arc::new(TestNode::default());
    let (trust_b, trust_rx_b) = watch::channel(false);
    let (connection_b, handle_b) = ShipConnection::new(
        ConnectionRole::Server,
        ski_a,
        Box::new(transport_b),
        quick_config("Brand-B-1"),
        node_b.clone(),
        trust_rx_b,
    );
    tokio::spawn(connection_b.run());

    wait_for_state(&handle_b, |state| *state == SmeStateKind::HelloPending).await;

    // The user pairs the SKI; both sides proceed to completion
    trust_b.send_replace(true);
    wait_for_state(&handle_a, |state| *state == SmeStateKind::Complete).await;
    wait_for_state(&handle_b, |state| *state == SmeStateKind::Complete).await;
    assert_eq!(node_a.connected.load(Ordering::SeqCst), 1);
    assert_eq!(node_b.connected.load(Ordering::SeqCst), 1);
}
