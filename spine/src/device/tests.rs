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

//! Dispatcher tests: a local device wired to a frame-capturing writer,
//! fed with crafted inbound datagrams.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use eebus_common::{DeviceInfo, EebusError, Ski, SpineDataWriter};
use crate::{
    codec::{json::JsonCodec, SpineCodec},
    device::{DeviceLocal, DeviceType},
    entity::{EntityLocal, EntityType},
    feature::{FeatureType, Operations, Role},
    model::{
        shapes,
        CmdClassifier,
        Command,
        CommandPayload,
        Datagram,
        DeviceAddress,
        EntityAddress,
        FeatureAddress,
        Filter,
        Function,
        Header,
        Leaf,
        MsgCounter,
        ResultData,
        Value,
        SPECIFICATION_VERSION,
    },
    node_management,
};

const REMOTE_DEVICE: &str = "d:_n:Remote_9";

#[derive(Default)]
struct FrameLog {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl FrameLog {
    fn datagrams(&self, codec: &JsonCodec) -> Vec<Datagram> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|frame| codec.parse(frame).expect("captured frame must parse"))
            .collect()
    }

    fn clear(&self) {
        self.frames.lock().unwrap().clear();
    }
}

impl SpineDataWriter for FrameLog {
    fn write(&self, payload: Vec<u8>) -> Result<(), EebusError> {
        self.frames.lock().unwrap().push(payload);
        Ok(())
    }
}

struct Fixture {
    device: DeviceLocal,
    codec: JsonCodec,
    log: Arc<FrameLog>,
    reader: Arc<dyn eebus_common::SpineDataReader>,
    ski: Ski,
    measurement: FeatureAddress,
}

fn remote_nm_address() -> FeatureAddress {
    FeatureAddress::new(Some(DeviceAddress::new(REMOTE_DEVICE)), vec![], 0)
}

fn remote_client_address() -> FeatureAddress {
    FeatureAddress::new(Some(DeviceAddress::new(REMOTE_DEVICE)), vec![1], 1)
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

/// The tree the fake peer advertises: a root with node management and one
/// entity with a measurement client feature.
fn remote_discovery_data() -> Value {
    let device = DeviceAddress::new(REMOTE_DEVICE);
    let mut root = EntityLocal::new(EntityAddress::root(Some(device.clone())), EntityType::DeviceInformation);
    root.add_feature(FeatureType::NodeManagement, Role::Special);
    let mut cem = EntityLocal::new(EntityAddress::new(Some(device.clone()), vec![1]), EntityType::Cem);
    let client = cem.add_feature(FeatureType::Measurement, Role::Client);
    assert_eq!(client, remote_client_address());
    node_management::detailed_discovery::build(&device, 3, 0, &[root, cem])
}

fn inbound(
    source: FeatureAddress,
    destination: FeatureAddress,
    classifier: CmdClassifier,
    counter: u64,
    reference: Option<u64>,
    cmd: Command,
) -> Datagram {
    Datagram::new(
        Header {
            specification_version: SPECIFICATION_VERSION.to_string(),
            address_source: source,
            address_destination: destination,
            msg_counter: MsgCounter(counter),
            msg_counter_reference: reference.map(MsgCounter),
            cmd_classifier: classifier,
            ack_request: None,
        },
        cmd,
    )
}

fn setup() -> Fixture {
    let codec = JsonCodec::new();
    let info = DeviceInfo::new("Demo".into(), "Brand".into(), "HeatPump".into(), "1".into()).unwrap();
    let device = DeviceLocal::new(
        info,
        DeviceType::HeatPumpAppliance,
        Arc::new(JsonCodec::new()),
        Duration::from_secs(10),
    );

    let appliance = device.add_entity(EntityType::HeatPumpAppliance);
    let measurement = device.add_feature(&appliance, FeatureType::Measurement, Role::Server).unwrap();
    device.add_function(&measurement, Function::MeasurementListData, Operations::read()).unwrap();
    device
        .set_function_data(&measurement, Function::MeasurementListData, Value::Container(vec![measurement_element(1, 1000, -2)]))
        .unwrap();

    let ski = Ski::new([7; 20]);
    let log = Arc::new(FrameLog::default());
    let reader = device.setup_remote_device(ski, log.clone()).unwrap();

    let fixture = Fixture {
        device,
        codec,
        log,
        reader,
        ski,
        measurement,
    };

    // Answer the initial detailed-discovery read so the remote mirror
    // exists for the tests
    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header.cmd_classifier, CmdClassifier::Read);
    assert_eq!(sent[0].cmd.function, Function::NodeManagementDetailedDiscoveryData);
    let discovery_reply = inbound(
        remote_nm_address(),
        sent[0].header.address_source.clone(),
        CmdClassifier::Reply,
        1,
        Some(sent[0].header.msg_counter.0),
        Command::with_data(Function::NodeManagementDetailedDiscoveryData, remote_discovery_data()),
    );
    fixture.feed(&discovery_reply);
    fixture.log.clear();
    fixture
}

impl Fixture {
    fn feed(&self, datagram: &Datagram) {
        let bytes = self.codec.serialise(datagram).unwrap();
        self.reader.handle_incoming(&bytes).unwrap();
    }

    fn local_nm(&self) -> FeatureAddress {
        self.device.node_management_address()
    }
}

#[test]
fn msg_counters_are_strictly_increasing() {
    let fixture = setup();
    let remote = fixture
        .device
        .remote_feature_of_type(&fixture.ski, FeatureType::Measurement, Role::Client)
        .unwrap();
    let mut last = 0;
    for _ in 0..5 {
        let counter = fixture
            .device
            .request_remote_data(&fixture.measurement, &remote, Function::MeasurementListData, None, None)
            .unwrap();
        assert!(counter.0 > last);
        last = counter.0;
    }
}

#[test]
fn a_read_is_answered_with_the_cache() {
    let fixture = setup();
    let read = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Read,
        10,
        None,
        Command::read(Function::MeasurementListData),
    );
    fixture.feed(&read);

    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let reply = &sent[0];
    assert_eq!(reply.header.cmd_classifier, CmdClassifier::Reply);
    assert_eq!(reply.header.msg_counter_reference, Some(MsgCounter(10)));
    assert_eq!(reply.header.address_destination, remote_client_address());
    let data = reply.cmd.payload.data().unwrap();
    assert_eq!(data.elements().unwrap().len(), 1);
    let value = data.elements().unwrap()[0].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(1000))));
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "scale"), Some(&Value::Simple(Leaf::Number(-2))));
}

#[test]
fn a_read_of_an_unknown_feature_is_answered_with_a_result_error() {
    let fixture = setup();
    let read = inbound(
        remote_client_address(),
        FeatureAddress::new(None, vec![9, 9], 4),
        CmdClassifier::Read,
        11,
        None,
        Command::read(Function::MeasurementListData),
    );
    fixture.feed(&read);

    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let result = sent[0].cmd.payload.result().unwrap();
    assert_eq!(result.error_number, ResultData::DESTINATION_UNKNOWN);
}

#[test]
fn a_write_without_write_permission_is_rejected() {
    let fixture = setup();
    let write = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Write,
        12,
        None,
        Command::with_data(Function::MeasurementListData, Value::Container(vec![measurement_element(1, 5, 0)])),
    );
    fixture.feed(&write);

    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let result = sent[0].cmd.payload.result().unwrap();
    assert_eq!(result.error_number, ResultData::COMMAND_REJECTED);
    // The cache is untouched
    let data = fixture.device.function_data(&fixture.measurement, Function::MeasurementListData).unwrap();
    let value = data.elements().unwrap()[0].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(1000))));
}

#[test]
fn a_response_callback_fires_exactly_once_and_the_second_reply_errors() {
    let fixture = setup();
    let remote = fixture
        .device
        .remote_feature_of_type(&fixture.ski, FeatureType::Measurement, Role::Client)
        .unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let callback: crate::feature::ResponseCallback = {
        let fired = fired.clone();
        Box::new(move |_message| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    };
    let counter = fixture
        .device
        .request_remote_data(&fixture.measurement, &remote, Function::MeasurementListData, None, Some(callback))
        .unwrap();
    fixture.log.clear();

    let reply = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Reply,
        20,
        Some(counter.0),
        Command::with_data(Function::MeasurementListData, Value::Container(vec![measurement_element(1, 7, 0)])),
    );
    fixture.feed(&reply);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(fixture.log.datagrams(&fixture.codec).is_empty());

    // The duplicate reply is a protocol violation answered with an error
    let duplicate = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Reply,
        21,
        Some(counter.0),
        Command::with_data(Function::MeasurementListData, Value::Container(vec![measurement_element(1, 8, 0)])),
    );
    fixture.feed(&duplicate);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let result = sent[0].cmd.payload.result().unwrap();
    assert_ne!(result.error_number, ResultData::NO_ERROR);
    assert!(result.description.as_deref().unwrap_or_default().contains("unmatched reply"));
}

#[test]
fn a_subscription_call_registers_and_data_changes_notify_the_subscriber() {
    let fixture = setup();

    let request = Value::Sequence(vec![Some(Value::Sequence(vec![
        Some(remote_client_address().to_value()),
        Some(fixture.measurement.to_value()),
        Some(Value::Simple(Leaf::Tag(FeatureType::Measurement.tag_index()))),
    ]))]);
    let call = inbound(
        remote_nm_address(),
        fixture.local_nm(),
        CmdClassifier::Call,
        30,
        None,
        Command::with_data(Function::NodeManagementSubscriptionRequestCall, request),
    );
    fixture.feed(&call);

    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let result = sent[0].cmd.payload.result().unwrap();
    assert!(result.is_ok());
    fixture.log.clear();

    // A local mutation now produces exactly one notify to the subscriber
    fixture
        .device
        .set_function_data(
            &fixture.measurement,
            Function::MeasurementListData,
            Value::Container(vec![measurement_element(1, 2500, -2)]),
        )
        .unwrap();
    let sent = fixture.log.datagrams(&fixture.codec);
    assert_eq!(sent.len(), 1);
    let notify = &sent[0];
    assert_eq!(notify.header.cmd_classifier, CmdClassifier::Notify);
    assert_eq!(notify.header.address_destination, remote_client_address());
    let element = &notify.cmd.payload.data().unwrap().elements().unwrap()[0];
    let value = element.field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(2500))));

    // The subscription list is the authoritative inventory
    let read = inbound(
        remote_nm_address(),
        fixture.local_nm(),
        CmdClassifier::Read,
        31,
        None,
        Command::read(Function::NodeManagementSubscriptionData),
    );
    fixture.log.clear();
    fixture.feed(&read);
    let sent = fixture.log.datagrams(&fixture.codec);
    let entries = sent[0].cmd.payload.data().unwrap().elements().unwrap().len();
    assert_eq!(entries, 1);
}

#[test]
fn a_registered_write_approval_defers_the_write_until_approved() {
    let fixture = setup();
    // Allow writes on the measurement function for this test
    fixture
        .device
        .add_function(&fixture.measurement, Function::MeasurementListData, Operations::read_write())
        .unwrap();
    fixture
        .device
        .set_function_data(&fixture.measurement, Function::MeasurementListData, Value::Container(vec![measurement_element(1, 1, 0)]))
        .unwrap();

    let pending = Arc::new(Mutex::new(Vec::new()));
    let callback = {
        let pending = pending.clone();
        Arc::new(move |request: crate::device::WriteApprovalRequest| {
            pending.lock().unwrap().push(request.approval.clone());
        })
    };
    fixture.device.set_write_approval(&fixture.measurement, callback).unwrap();

    let write = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Write,
        40,
        None,
        Command::with_data(Function::MeasurementListData, Value::Container(vec![measurement_element(1, 42, 0)])),
    );
    fixture.feed(&write);

    // Deferred: no mutation yet
    let data = fixture.device.function_data(&fixture.measurement, Function::MeasurementListData).unwrap();
    let value = data.elements().unwrap()[0].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(1))));

    let approvals = pending.lock().unwrap().clone();
    assert_eq!(approvals.len(), 1);
    approvals[0].approve();
    // Only the first resolution wins
    approvals[0].deny(ResultData::error(ResultData::COMMAND_REJECTED, "too late"));

    let data = fixture.device.function_data(&fixture.measurement, Function::MeasurementListData).unwrap();
    let value = data.elements().unwrap()[0].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(42))));
}

#[test]
fn detaching_a_remote_device_evicts_its_pending_requests() {
    let fixture = setup();
    let remote = fixture
        .device
        .remote_feature_of_type(&fixture.ski, FeatureType::Measurement, Role::Client)
        .unwrap();
    let fired = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let callback: crate::feature::ResponseCallback = {
        let fired = fired.clone();
        let errors = errors.clone();
        Box::new(move |message: crate::feature::ResponseMessage| {
            fired.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = message.datagram.cmd.payload.result() {
                errors.lock().unwrap().push(result.error_number);
            }
        })
    };
    fixture
        .device
        .request_remote_data(&fixture.measurement, &remote, Function::MeasurementListData, None, Some(callback))
        .unwrap();

    fixture.device.remove_remote_device(&fixture.ski);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!errors.lock().unwrap().is_empty());
    assert!(fixture
        .device
        .remote_feature_of_type(&fixture.ski, FeatureType::Measurement, Role::Client)
        .is_none());
}

#[test]
fn delete_with_element_descriptor_via_write_clears_only_named_subfields() {
    let fixture = setup();
    fixture
        .device
        .add_function(&fixture.measurement, Function::MeasurementListData, Operations::read_write())
        .unwrap();
    fixture
        .device
        .set_function_data(
            &fixture.measurement,
            Function::MeasurementListData,
            Value::Container(vec![measurement_element(10, 40, 0), measurement_element(25, 60, 0)]),
        )
        .unwrap();

    let mut selector = Value::empty(&shapes::MEASUREMENT_DATA);
    selector
        .set_field(&shapes::MEASUREMENT_DATA, "measurementId", Value::Simple(Leaf::Unsigned(10)))
        .unwrap();
    let elements =
        crate::model::Selection::from_paths(&shapes::MEASUREMENT_DATA, &["value.number"]).unwrap();
    let write = inbound(
        remote_client_address(),
        fixture.measurement.clone(),
        CmdClassifier::Write,
        50,
        None,
        Command::with_filters(
            Function::MeasurementListData,
            vec![Filter::delete(Some(selector), Some(elements))],
            CommandPayload::None,
        ),
    );
    fixture.feed(&write);

    let data = fixture.device.function_data(&fixture.measurement, Function::MeasurementListData).unwrap();
    let items = data.elements().unwrap();
    assert_eq!(items.len(), 2);
    let value = items[0].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), None);
    assert_eq!(value.field(&shapes::SCALED_NUMBER, "scale"), Some(&Value::Simple(Leaf::Number(0))));
    let untouched = items[1].field(&shapes::MEASUREMENT_DATA, "value").unwrap();
    assert_eq!(untouched.field(&shapes::SCALED_NUMBER, "number"), Some(&Value::Simple(Leaf::Number(60))));
}

#[test]
fn device_type_indices_align_with_the_tag_table() {
    assert_eq!(DeviceType::ALL.len(), shapes::DEVICE_TYPE_NAMES.len());
    for device_type in DeviceType::ALL {
        assert_eq!(DeviceType::from_tag_index(device_type.tag_index()), Some(*device_type));
    }
}
