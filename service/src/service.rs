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

//! The service shell: local device, trust set, discovery wiring and the
//! set of SHIP connections.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use eebus_common::{EebusError, Ski, SpineDataReader, SpineDataWriter};
use eebus_ship::{
    api::ShipNodeReader,
    connection::{ConnectionRole, ShipConnection, ShipConnectionConfig, ShipConnectionHandle},
    mdns::{filter_own_entries, MdnsAnnouncement, MdnsEntry, MdnsProvider},
    transport::{ShipTransport, ShipTransportConnector, ShipTransportListener},
    SmeStateKind,
};
use eebus_shutdown::{Shutdown, ShutdownSignal};
use eebus_spine::{
    codec::SpineCodec,
    device::DeviceLocal,
    feature::{FeatureType, Operations, Role},
    heartbeat::HeartbeatPublisher,
    model::{EntityAddress, FeatureAddress, Function},
    SpineEvent,
};
use log::*;
use tokio::sync::{broadcast, mpsc, watch};

use crate::{
    config::ServiceConfig,
    credentials::{validate_credentials, CredentialProvider},
    details::{ConnectionState, ServiceDetails},
    reader::ServiceReader,
};

const LOG_TARGET: &str = "eebus::service";

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(1);
const ENTRIES_CHANNEL_CAPACITY: usize = 8;

struct ServiceInner {
    /// Present while the service runs; triggering it stops every task.
    running: Option<Shutdown>,
    pairing_possible: bool,
    trust: HashMap<Ski, watch::Sender<bool>>,
    details: HashMap<Ski, ServiceDetails>,
    connections: HashMap<Ski, ShipConnectionHandle>,
    dialing: HashSet<Ski>,
    entries: Vec<MdnsEntry>,
}

struct ServiceShared {
    config: ServiceConfig,
    local_ski: Ski,
    device: DeviceLocal,
    reader: Arc<dyn ServiceReader>,
    mdns: Arc<dyn MdnsProvider>,
    connector: Arc<dyn ShipTransportConnector>,
    listener: Mutex<Option<Box<dyn ShipTransportListener>>>,
    inner: Mutex<ServiceInner>,
}

fn lock(inner: &Mutex<ServiceInner>) -> std::sync::MutexGuard<'_, ServiceInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The embeddable EEBUS service.
#[derive(Clone)]
pub struct EebusService {
    shared: Arc<ServiceShared>,
}

impl EebusService {
    /// Validate the credentials and build the local device. The transport
    /// listener, the dialer, the discovery backend and the SPINE codec are
    /// collaborators supplied by the embedder.
    pub fn new(
        config: ServiceConfig,
        credentials: &dyn CredentialProvider,
        codec: Arc<dyn SpineCodec>,
        mdns: Arc<dyn MdnsProvider>,
        connector: Arc<dyn ShipTransportConnector>,
        listener: Box<dyn ShipTransportListener>,
        reader: Arc<dyn ServiceReader>,
    ) -> Result<Self, EebusError> {
        let local_ski = validate_credentials(credentials)?;
        let device = DeviceLocal::new(
            config.device_info().clone(),
            config.device_type(),
            codec,
            config.max_response_delay(),
        );
        let inner = ServiceInner {
            running: None,
            pairing_possible: false,
            trust: HashMap::new(),
            details: HashMap::new(),
            connections: HashMap::new(),
            dialing: HashSet::new(),
            entries: Vec::new(),
        };
        Ok(Self {
            shared: Arc::new(ServiceShared {
                config,
                local_ski,
                device,
                reader,
                mdns,
                connector,
                listener: Mutex::new(Some(listener)),
                inner: Mutex::new(inner),
            }),
        })
    }

    pub fn local_ski(&self) -> &Ski {
        &self.shared.local_ski
    }

    /// The local SPINE device: add entities, features, functions and
    /// use-case supports through it.
    pub fn device(&self) -> &DeviceLocal {
        &self.shared.device
    }

    /// Per-feature change events for use cases.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<SpineEvent>> {
        self.shared.device.subscribe_events()
    }

    /// Announce the service, start discovery, accept inbound connections
    /// and begin connecting to trusted peers. Idempotent.
    pub async fn start(&self) -> Result<(), EebusError> {
        let signal = {
            let mut inner = lock(&self.shared.inner);
            if inner.running.is_some() {
                return Ok(());
            }
            let shutdown = Shutdown::new();
            let signal = shutdown.to_signal();
            inner.running = Some(shutdown);
            signal
        };

        let announcement = MdnsAnnouncement {
            service_name: self.shared.config.device_info().ship_id(),
            port: self.shared.config.port(),
            ski: self.shared.local_ski,
            ship_id: self.shared.config.device_info().ship_id(),
            brand: self.shared.config.device_info().brand_name().to_string(),
            model: self.shared.config.device_info().device_model().to_string(),
            device_type: self.shared.config.device_type().wire_name().to_string(),
            register: self.shared.config.auto_accept(),
        };
        if let Err(e) = self.shared.mdns.announce(announcement).await {
            lock(&self.shared.inner).running = None;
            return Err(e);
        }

        // Discovery entries arrive by message passing from the browse task
        let (entries_tx, entries_rx) = mpsc::channel(ENTRIES_CHANNEL_CAPACITY);
        {
            let mdns = self.shared.mdns.clone();
            let browse_signal = signal.clone();
            tokio::spawn(async move {
                mdns.browse(entries_tx, browse_signal).await;
            });
        }
        tokio::spawn(entries_task(self.shared.clone(), entries_rx, signal.clone()));

        let listener = self.shared.listener.lock().unwrap_or_else(PoisonError::into_inner).take();
        match listener {
            Some(listener) => {
                tokio::spawn(accept_task(self.shared.clone(), listener, signal.clone()));
            },
            None => {
                lock(&self.shared.inner).running = None;
                return Err(EebusError::init("the service cannot be started twice in one lifetime"));
            },
        }

        tokio::spawn(housekeeping_task(self.shared.clone(), signal));

        info!(
            target: LOG_TARGET,
            "EEBUS service started (ski {}, port {})", self.shared.local_ski, self.shared.config.port()
        );
        Ok(())
    }

    /// Close every connection in parallel, stop every task and withdraw
    /// the announcement. Idempotent.
    pub async fn stop(&self) {
        let handles = {
            let mut inner = lock(&self.shared.inner);
            let mut running = match inner.running.take() {
                Some(running) => running,
                None => return,
            };
            running.trigger();
            inner.dialing.clear();
            std::mem::take(&mut inner.connections)
        };
        for (_, mut handle) in handles {
            handle.close();
        }
        self.shared.mdns.withdraw().await;
        info!(target: LOG_TARGET, "EEBUS service stopped");
    }

    /// Add a peer to the trust set. A waiting connection proceeds
    /// immediately; otherwise a connection attempt starts when the peer
    /// becomes visible.
    pub fn register_remote_ski(&self, ski: Ski, auto_accept: bool) {
        let entry = {
            let mut inner = lock(&self.shared.inner);
            inner
                .trust
                .entry(ski)
                .or_insert_with(|| watch::channel(false).0)
                .send_replace(true);
            let details = inner.details.entry(ski).or_insert_with(|| ServiceDetails::new(ski));
            details.trusted = true;
            details.auto_accept = auto_accept;
            inner
                .entries
                .iter()
                .find(|entry| entry.ski == ski)
                .cloned()
                .filter(|_| inner.running.is_some() && !inner.connections.contains_key(&ski))
        };
        if let Some(entry) = entry {
            dial(self.shared.clone(), entry);
        }
    }

    /// Remove a peer from the trust set and tear down any existing
    /// connection. The embedder persists the change.
    pub fn unregister_remote_ski(&self, ski: &Ski) {
        let handle = {
            let mut inner = lock(&self.shared.inner);
            if let Some(trust) = inner.trust.get(ski) {
                trust.send_replace(false);
            }
            if let Some(details) = inner.details.get_mut(ski) {
                details.trusted = false;
            }
            inner.connections.remove(ski)
        };
        if let Some(mut handle) = handle {
            handle.close();
        }
    }

    /// Abort an in-flight pairing with an untrusted peer.
    pub fn cancel_pairing_with_ski(&self, ski: &Ski) {
        let handle = {
            let mut inner = lock(&self.shared.inner);
            let trusted = inner.details.get(ski).map(|details| details.trusted).unwrap_or(false);
            if trusted {
                return;
            }
            if let Some(trust) = inner.trust.get(ski) {
                trust.send_replace(false);
            }
            inner.connections.remove(ski)
        };
        if let Some(mut handle) = handle {
            handle.close();
        }
    }

    /// Open or close the window in which unknown peers may wait for a
    /// pairing decision.
    pub fn set_pairing_possible(&self, possible: bool) {
        lock(&self.shared.inner).pairing_possible = possible;
    }

    pub fn get_connection_state_with_ski(&self, ski: &Ski) -> ConnectionState {
        lock(&self.shared.inner)
            .details
            .get(ski)
            .map(|details| details.state)
            .unwrap_or(ConnectionState::None)
    }

    pub fn get_remote_service_details_with_ski(&self, ski: &Ski) -> Option<ServiceDetails> {
        lock(&self.shared.inner).details.get(ski).cloned()
    }

    /// Create a device-diagnosis server feature on the entity and start
    /// publishing heartbeats on it.
    pub fn start_heartbeat(&self, entity: &EntityAddress) -> Result<FeatureAddress, EebusError> {
        let signal = lock(&self.shared.inner)
            .running
            .as_ref()
            .map(|running| running.to_signal())
            .ok_or_else(|| EebusError::init("the service is not started"))?;
        let feature = self.shared.device.add_feature(entity, FeatureType::DeviceDiagnosis, Role::Server)?;
        self.shared
            .device
            .add_function(&feature, Function::DeviceDiagnosisHeartbeatData, Operations::read())?;
        let timeout = self.shared.config.heartbeat_timeout();
        HeartbeatPublisher::new(self.shared.device.clone(), feature.clone(), timeout).spawn(signal);
        Ok(feature)
    }
}

// Background tasks

async fn entries_task(
    shared: Arc<ServiceShared>,
    mut entries_rx: mpsc::Receiver<Vec<MdnsEntry>>,
    mut signal: ShutdownSignal,
) {
    loop {
        let entries = tokio::select! {
            _ = signal.wait() => break,
            entries = entries_rx.recv() => match entries {
                Some(entries) => entries,
                None => break,
            },
        };
        let entries = filter_own_entries(entries, &shared.local_ski);
        let to_dial: Vec<MdnsEntry> = {
            let mut inner = lock(&shared.inner);
            for entry in &entries {
                let details = inner.details.entry(entry.ski).or_insert_with(|| ServiceDetails::new(entry.ski));
                details.ipv4 = Some(entry.host.clone());
                details.device_type = Some(entry.device_type.clone());
                if details.ship_id.is_none() {
                    details.ship_id = Some(entry.id.clone());
                }
            }
            inner.entries = entries.clone();
            entries
                .iter()
                .filter(|entry| {
                    inner.trust.get(&entry.ski).map(|trust| *trust.borrow()).unwrap_or(false) &&
                        !inner.connections.contains_key(&entry.ski) &&
                        !inner.dialing.contains(&entry.ski)
                })
                .cloned()
                .collect()
        };
        shared.reader.on_remote_services_update(&entries);
        for entry in to_dial {
            dial(shared.clone(), entry);
        }
    }
    debug!(target: LOG_TARGET, "Discovery entries task stopped");
}

/// Dial a discovered peer on its own task.
fn dial(shared: Arc<ServiceShared>, entry: MdnsEntry) {
    {
        let mut inner = lock(&shared.inner);
        if !inner.dialing.insert(entry.ski) {
            return;
        }
    }
    tokio::spawn(async move {
        debug!(target: LOG_TARGET, "Connecting to {} at {}:{}", entry.ski, entry.host, entry.port);
        let outcome = shared.connector.connect(&entry.host, entry.port).await;
        lock(&shared.inner).dialing.remove(&entry.ski);
        match outcome {
            Ok((transport, remote_ski)) => {
                if remote_ski != entry.ski {
                    warn!(
                        target: LOG_TARGET,
                        "Peer at {}:{} presented ski {}, expected {}; dropping",
                        entry.host,
                        entry.port,
                        remote_ski,
                        entry.ski
                    );
                    return;
                }
                spawn_connection(&shared, ConnectionRole::Client, transport, remote_ski);
            },
            Err(e) => {
                debug!(target: LOG_TARGET, "Connection attempt to {} failed: {}", entry.ski, e);
            },
        }
    });
}

async fn accept_task(shared: Arc<ServiceShared>, mut listener: Box<dyn ShipTransportListener>, mut signal: ShutdownSignal) {
    loop {
        let accepted = tokio::select! {
            _ = signal.wait() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((transport, remote_ski)) => {
                spawn_connection(&shared, ConnectionRole::Server, transport, remote_ski);
            },
            Err(e) => {
                warn!(target: LOG_TARGET, "Listener failed: {}", e);
                break;
            },
        }
    }
    debug!(target: LOG_TARGET, "Accept task stopped");
}

async fn housekeeping_task(shared: Arc<ServiceShared>, mut signal: ShutdownSignal) {
    let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = signal.wait() => break,
            _ = interval.tick() => shared.device.evict_expired(),
        }
    }
}

fn spawn_connection(shared: &Arc<ServiceShared>, role: ConnectionRole, transport: Box<dyn ShipTransport>, ski: Ski) {
    let connection = {
        let mut inner = lock(&shared.inner);
        if inner.running.is_none() {
            return;
        }
        if inner.connections.contains_key(&ski) {
            debug!(target: LOG_TARGET, "Dropping duplicate connection to {}", ski);
            return;
        }
        let trust_rx = inner
            .trust
            .entry(ski)
            .or_insert_with(|| watch::channel(false).0)
            .subscribe();
        let details = inner.details.entry(ski).or_insert_with(|| ServiceDetails::new(ski));
        details.state = match role {
            ConnectionRole::Client => ConnectionState::Initiated,
            ConnectionRole::Server => ConnectionState::ReceivedPairingRequest,
        };
        let config = ShipConnectionConfig::new(shared.config.device_info().ship_id());
        let node: Arc<dyn ShipNodeReader> = Arc::new(NodeBridge { shared: shared.clone() });
        let (connection, handle) = ShipConnection::new(role, ski, transport, config, node, trust_rx);
        inner.connections.insert(ski, handle);
        connection
    };
    tokio::spawn(connection.run());
}

/// The seam through which SHIP connections report back.
struct NodeBridge {
    shared: Arc<ServiceShared>,
}

impl ShipNodeReader for NodeBridge {
    fn on_remote_ski_connected(&self, ski: &Ski) {
        self.shared.reader.on_remote_ski_connected(ski);
    }

    fn on_remote_ski_disconnected(&self, ski: &Ski) {
        self.shared.device.remove_remote_device(ski);
        lock(&self.shared.inner).connections.remove(ski);
        self.shared.reader.on_remote_ski_disconnected(ski);
    }

    fn setup_remote_device(
        &self,
        ski: &Ski,
        writer: Arc<dyn SpineDataWriter>,
    ) -> Result<Arc<dyn SpineDataReader>, EebusError> {
        self.shared.device.setup_remote_device(*ski, writer)
    }

    fn on_ship_id_update(&self, ski: &Ski, ship_id: &str) {
        {
            let mut inner = lock(&self.shared.inner);
            let details = inner.details.entry(*ski).or_insert_with(|| ServiceDetails::new(*ski));
            details.ship_id = Some(ship_id.to_string());
        }
        self.shared.reader.on_ship_id_update(ski, ship_id);
    }

    fn on_ship_state_update(&self, ski: &Ski, state: SmeStateKind) {
        {
            let mut inner = lock(&self.shared.inner);
            let details = inner.details.entry(*ski).or_insert_with(|| ServiceDetails::new(*ski));
            details.state = ConnectionState::from_sme(&state);
            // The first time a connection reaches trusted the peer becomes
            // part of the trust set the embedder should persist
            if details.state == ConnectionState::Trusted {
                details.trusted = true;
            }
        }
        self.shared.reader.on_ship_state_update(ski, &state);
    }

    fn is_waiting_for_trust_allowed(&self, ski: &Ski) -> bool {
        let pairing_possible = lock(&self.shared.inner).pairing_possible;
        pairing_possible && self.shared.reader.is_waiting_for_trust_allowed(ski)
    }
}
