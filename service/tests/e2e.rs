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

//! End-to-end: two services discover each other over a mock mDNS backend,
//! complete the SHIP handshake through in-memory transports and exchange
//! SPINE data.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use eebus_common::{EebusError, Ski};
use eebus_service::{ConnectionState, CredentialProvider, EebusService, ServiceConfig, ServiceReader};
use eebus_ship::{
    mdns::{MdnsAnnouncement, MdnsEntry, MdnsProvider, SERVICE_PATH},
    test_utils::{MemoryConnector, MemoryNetwork},
};
use eebus_shutdown::ShutdownSignal;
use eebus_spine::{
    codec::json::JsonCodec,
    device::DeviceType,
    entity::EntityType,
    feature::{FeatureType, Operations, Role},
    model::{shapes, Function, Leaf, Value},
    node_management::{UseCaseActor, UseCaseName, UseCaseSupport},
};
use tokio::sync::mpsc;

struct TestCredentials {
    spki: Vec<u8>,
}

impl TestCredentials {
    fn new(seed: u8) -> Self {
        let algorithm: &[u8] = &[0x30, 0x09, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
        let key = [0x04, seed, seed.wrapping_add(1), seed.wrapping_add(2)];
        let mut spki = vec![0x30, (algorithm.len() + key.len() + 3) as u8];
        spki.extend_from_slice(algorithm);
        spki.extend_from_slice(&[0x03, (key.len() + 1) as u8, 0x00]);
        spki.extend_from_slice(&key);
        Self { spki }
    }

    fn ski(&self) -> Ski {
        Ski::from_subject_public_key_info(&self.spki).unwrap()
    }
}

impl CredentialProvider for TestCredentials {
    fn subject_public_key_info(&self) -> &[u8] {
        &self.spki
    }

    fn stored_ski(&self) -> Option<Ski> {
        None
    }
}

/// A discovery backend the test feeds by hand.
#[derive(Default)]
struct MockMdns {
    subscribers: Mutex<Vec<mpsc::Sender<Vec<MdnsEntry>>>>,
    announced: Mutex<Option<MdnsAnnouncement>>,
}

impl MockMdns {
    async fn push(&self, entries: Vec<MdnsEntry>) {
        let subscribers = self.subscribers.lock().unwrap().clone();
        for subscriber in subscribers {
            let _ = subscriber.send(entries.clone()).await;
        }
    }
}

#[async_trait]
impl MdnsProvider for MockMdns {
    async fn announce(&self, announcement: MdnsAnnouncement) -> Result<(), EebusError> {
        *self.announced.lock().unwrap() = Some(announcement);
        Ok(())
    }

    async fn withdraw(&self) {
        self.announced.lock().unwrap().take();
    }

    async fn browse(&self, entries: mpsc::Sender<Vec<MdnsEntry>>, mut shutdown: ShutdownSignal) {
        self.subscribers.lock().unwrap().push(entries);
        shutdown.wait().await;
    }
}

#[derive(Default)]
struct CountingReader {
    connected: AtomicUsize,
    disconnected: AtomicUsize,
}

impl ServiceReader for CountingReader {
    fn on_remote_ski_connected(&self, _ski: &Ski) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_remote_ski_disconnected(&self, _ski: &Ski) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

fn entry_for(announcement: &MdnsAnnouncement, host: &str) -> MdnsEntry {
    let mut txt = HashMap::new();
    txt.insert("txtvers".to_string(), "1".to_string());
    txt.insert("id".to_string(), announcement.ship_id.clone());
    txt.insert("path".to_string(), SERVICE_PATH.to_string());
    txt.insert("ski".to_string(), announcement.ski.to_string());
    txt.insert("register".to_string(), announcement.register.to_string());
    txt.insert("brand".to_string(), announcement.brand.clone());
    txt.insert("type".to_string(), announcement.device_type.clone());
    txt.insert("model".to_string(), announcement.model.clone());
    MdnsEntry::from_txt(&announcement.service_name, host, announcement.port, None, &txt).unwrap()
}

async fn wait_until<F: Fn() -> bool>(what: &str, predicate: F) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if predicate() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

struct Harness {
    service: EebusService,
    mdns: Arc<MockMdns>,
    reader: Arc<CountingReader>,
    ski: Ski,
}

fn build_service(
    network: &Arc<MemoryNetwork>,
    host: &str,
    vendor: &str,
    serial: &str,
    device_type: DeviceType,
    seed: u8,
) -> Harness {
    let credentials = TestCredentials::new(seed);
    let ski = credentials.ski();
    let config = ServiceConfig::new(vendor, "Brand", "Model", serial, device_type, 4711).unwrap();
    let mdns = Arc::new(MockMdns::default());
    let reader = Arc::new(CountingReader::default());
    let listener = network.listen(host, ski);
    let connector = Arc::new(MemoryConnector {
        network: network.clone(),
        local_ski: ski,
    });
    let service = EebusService::new(
        config,
        &credentials,
        Arc::new(JsonCodec::new()),
        mdns.clone(),
        connector,
        Box::new(listener),
        reader.clone(),
    )
    .unwrap();
    Harness {
        service,
        mdns,
        reader,
        ski,
    }
}

fn measurement_element(id: u64, number: i64, scale: i64) -> Value {
    let shape = &shapes::MEASUREMENT_DATA;
    let mut element = Value::empty(shape);
    element.set_field(shape, "measurementId", Value::Simple(Leaf::Unsigned(id))).unwrap();
    let mut value = Value::empty(&shapes::SCALED_NUMBER);
    value.set_field(&shapes::SCALED_NUMBER, "number", Value::Simple(Leaf::Number(number))).unwrap();
    value.set_field(&shapes::SCALED_NUMBER, "scale", Value::Simple(Leaf::Number(scale))).unwrap();
    element.set_field(shape, "value", value).unwrap();
    element
}

fn measurement_value(data: &Value) -> Option<(i64, i64)> {
    let element = data.elements()?.first()?;
    let value = element.field(&shapes::MEASUREMENT_DATA, "value")?;
    Some((
        value.field(&shapes::SCALED_NUMBER, "number")?.as_number()?,
        value.field(&shapes::SCALED_NUMBER, "scale")?.as_number()?,
    ))
}

#[tokio::test(flavor = "multi_thread")]
async fn two_services_pair_subscribe_and_exchange_measurements() {
    let _ = env_logger::builder().is_test(true).try_init();
    let network = MemoryNetwork::new();
    let cem = build_service(&network, "cem.local", "DemoCem", "1", DeviceType::EnergyManagementSystem, 10);
    let unit = build_service(&network, "unit.local", "DemoUnit", "2", DeviceType::HeatPumpAppliance, 20);

    // The monitored unit advertises a measurement server with power data
    let unit_entity = unit.service.device().add_entity(EntityType::HeatPumpAppliance);
    let unit_measurement = unit
        .service
        .device()
        .add_feature(&unit_entity, FeatureType::Measurement, Role::Server)
        .unwrap();
    unit.service
        .device()
        .add_function(&unit_measurement, Function::MeasurementListData, Operations::read())
        .unwrap();
    unit.service
        .device()
        .set_function_data(
            &unit_measurement,
            Function::MeasurementListData,
            Value::Container(vec![measurement_element(1, 1000, -2)]),
        )
        .unwrap();
    unit.service
        .device()
        .add_use_case_support(&unit_entity, UseCaseActor::MonitoredUnit, UseCaseSupport {
            name: UseCaseName::MonitoringOfPowerConsumption,
            version: "1.0.0".into(),
            sub_revision: "release".into(),
            available: true,
            scenarios: vec![1, 2, 3],
        })
        .unwrap();

    // The CEM consumes it with a client feature
    let cem_entity = cem.service.device().add_entity(EntityType::Cem);
    let cem_client = cem
        .service
        .device()
        .add_feature(&cem_entity, FeatureType::Measurement, Role::Client)
        .unwrap();

    // Mutual trust was established out of band
    cem.service.register_remote_ski(unit.ski, false);
    unit.service.register_remote_ski(cem.ski, false);

    cem.service.start().await.unwrap();
    unit.service.start().await.unwrap();

    // Discovery reports the unit to the CEM; the CEM dials
    let unit_announcement = unit.mdns.announced.lock().unwrap().clone().unwrap();
    cem.mdns.push(vec![entry_for(&unit_announcement, "unit.local")]).await;

    wait_until("both connections to complete", || {
        cem.service.get_connection_state_with_ski(&unit.ski) == ConnectionState::Completed &&
            unit.service.get_connection_state_with_ski(&cem.ski) == ConnectionState::Completed
    })
    .await;
    assert_eq!(cem.reader.connected.load(Ordering::SeqCst), 1);
    assert_eq!(unit.reader.connected.load(Ordering::SeqCst), 1);

    // Detailed discovery mirrored the unit's measurement server
    wait_until("detailed discovery to mirror the measurement feature", || {
        cem.service
            .device()
            .remote_feature_of_type(&unit.ski, FeatureType::Measurement, Role::Server)
            .is_some()
    })
    .await;
    let remote_measurement = cem
        .service
        .device()
        .remote_feature_of_type(&unit.ski, FeatureType::Measurement, Role::Server)
        .unwrap();

    // Subscribe, then read back the current value
    cem.service
        .device()
        .subscribe_to_remote(&cem_client, &remote_measurement, FeatureType::Measurement)
        .unwrap();

    let (reply_tx, reply_rx) = std::sync::mpsc::channel();
    let callback: eebus_spine::feature::ResponseCallback = Box::new(move |message| {
        let _ = reply_tx.send(message);
    });
    cem.service
        .device()
        .request_remote_data(&cem_client, &remote_measurement, Function::MeasurementListData, None, Some(callback))
        .unwrap();
    let reply = tokio::task::spawn_blocking(move || reply_rx.recv_timeout(Duration::from_secs(10)))
        .await
        .unwrap()
        .expect("no reply to the measurement read");
    let data = reply.datagram.cmd.payload.data().expect("reply carries data");
    assert_eq!(measurement_value(data), Some((1000, -2)));

    // A fresh measurement on the unit reaches the CEM's mirror via notify
    unit.service
        .device()
        .set_function_data(
            &unit_measurement,
            Function::MeasurementListData,
            Value::Container(vec![measurement_element(1, 2500, -2)]),
        )
        .unwrap();
    wait_until("the notify to update the mirror", || {
        cem.service
            .device()
            .remote_function_data(&unit.ski, &remote_measurement, Function::MeasurementListData)
            .and_then(|data| measurement_value(&data))
            == Some((2500, -2))
    })
    .await;

    // The unit's use-case advertisement is readable from the CEM side
    let remote_nm = eebus_spine::node_management::node_management_address(
        cem.service.device().remote_device_address(&unit.ski),
    );
    wait_until("the use-case data to arrive", || {
        cem.service
            .device()
            .remote_function_data(&unit.ski, &remote_nm, Function::NodeManagementUseCaseData)
            .map(|data| !data.elements().unwrap_or_default().is_empty())
            .unwrap_or(false)
    })
    .await;

    // Shutdown closes the link and fires exactly one disconnect per side
    cem.service.stop().await;
    wait_until("both sides to observe the disconnect", || {
        cem.reader.disconnected.load(Ordering::SeqCst) == 1 && unit.reader.disconnected.load(Ordering::SeqCst) == 1
    })
    .await;
    unit.service.stop().await;
    assert_eq!(cem.reader.connected.load(Ordering::SeqCst), 1);
    assert_eq!(unit.reader.connected.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn an_unknown_peer_is_held_until_pairing_is_allowed() {
    let network = MemoryNetwork::new();
    let cem = build_service(&network, "cem2.local", "DemoCem", "3", DeviceType::EnergyManagementSystem, 30);
    let unit = build_service(&network, "unit2.local", "DemoUnit", "4", DeviceType::HeatPumpAppliance, 40);

    // Only the CEM trusts the unit; the unit waits for the user
    cem.service.register_remote_ski(unit.ski, false);
    unit.service.set_pairing_possible(true);

    cem.service.start().await.unwrap();
    unit.service.start().await.unwrap();

    let unit_announcement = unit.mdns.announced.lock().unwrap().clone().unwrap();
    cem.mdns.push(vec![entry_for(&unit_announcement, "unit2.local")]).await;

    wait_until("the unit to report the pairing request", || {
        unit.service.get_connection_state_with_ski(&cem.ski) == ConnectionState::InProgress
    })
    .await;
    assert_ne!(cem.service.get_connection_state_with_ski(&unit.ski), ConnectionState::Completed);

    // The user pairs the CEM on the unit; the handshake completes
    unit.service.register_remote_ski(cem.ski, false);
    wait_until("the held handshake to complete", || {
        unit.service.get_connection_state_with_ski(&cem.ski) == ConnectionState::Completed &&
            cem.service.get_connection_state_with_ski(&unit.ski) == ConnectionState::Completed
    })
    .await;

    cem.service.stop().await;
    unit.service.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn starting_twice_is_idempotent_and_own_entries_are_ignored() {
    let network = MemoryNetwork::new();
    let cem = build_service(&network, "cem3.local", "DemoCem", "5", DeviceType::EnergyManagementSystem, 50);

    cem.service.start().await.unwrap();
    cem.service.start().await.unwrap();

    // An advertisement carrying our own SKI must not create a connection
    let own = cem.mdns.announced.lock().unwrap().clone().unwrap();
    cem.mdns.push(vec![entry_for(&own, "cem3.local")]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cem.service.get_connection_state_with_ski(&cem.ski), ConnectionState::None);

    cem.service.stop().await;
    cem.service.stop().await;
}
