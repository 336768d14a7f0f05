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

//! The local SPINE device: the entity/feature tree, the inbound frame
//! dispatcher and the outbound request plumbing.
//!
//! One device-wide lock guards every mutation of the tree; it is held
//! across the processing of one inbound frame. Embedder callbacks and
//! change events fire after the lock has been released, so a callback may
//! call straight back into this API.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

use eebus_common::{DeviceInfo, EebusError, Ski, SpineDataReader, SpineDataWriter};
use log::*;
use tokio::sync::broadcast;

use crate::{
    codec::SpineCodec,
    device::{DeviceRemote, DeviceType, NetworkFeatureSet},
    entity::{EntityLocal, EntityType},
    events::{ElementChange, SpineEvent, SpineEventKind},
    feature::{
        FeatureLocal,
        FeatureType,
        Operations,
        ResponseCallback,
        ResponseMessage,
        ResultCallback,
        Role,
        WriteApprovalCallback,
    },
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
    node_management::{
        self,
        use_case,
        BindingManager,
        SubscriptionManager,
        UseCaseActor,
        UseCaseFilter,
        UseCaseName,
        UseCaseSupport,
    },
};

const LOG_TARGET: &str = "eebus::spine::device";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// An inbound write handed to a write-approval callback. The receiver must
/// resolve the carried [`WriteApproval`] exactly once; an unanswered
/// approval expires with the device's max-response-delay.
pub struct WriteApprovalRequest {
    pub ski: Ski,
    pub local_feature: FeatureAddress,
    pub remote_feature: FeatureAddress,
    pub function: Function,
    pub datagram: Datagram,
    pub approval: WriteApproval,
}

/// Resolves a deferred write. Cloneable; only the first resolution wins.
#[derive(Clone)]
pub struct WriteApproval {
    shared: Arc<DeviceShared>,
    ski: Ski,
    msg_counter: u64,
}

impl WriteApproval {
    /// Apply the deferred write and answer the peer.
    pub fn approve(&self) {
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            let pending = match state.pending_writes.remove(&(self.ski, self.msg_counter)) {
                Some(pending) => pending,
                None => return,
            };
            apply_write(&self.shared, &mut state, self.ski, &pending.datagram, &mut deferred);
        }
        run_deferred(&self.shared, deferred);
    }

    /// Reject the deferred write with the given result.
    pub fn deny(&self, result: ResultData) {
        let mut state = lock(&self.shared.state);
        let pending = match state.pending_writes.remove(&(self.ski, self.msg_counter)) {
            Some(pending) => pending,
            None => return,
        };
        send_result(&self.shared, &mut state, self.ski, &pending.datagram, result);
    }
}

struct PendingWrite {
    datagram: Datagram,
    expires_at: Instant,
}

struct DeviceState {
    entities: Vec<EntityLocal>,
    next_entity_id: u32,
    msg_counter: u64,
    remotes: HashMap<Ski, DeviceRemote>,
    subscriptions: SubscriptionManager,
    bindings: BindingManager,
    pending_writes: HashMap<(Ski, u64), PendingWrite>,
}

struct DeviceShared {
    info: DeviceInfo,
    address: DeviceAddress,
    device_type: DeviceType,
    max_response_delay: Duration,
    codec: Arc<dyn SpineCodec>,
    events: broadcast::Sender<Arc<SpineEvent>>,
    state: Mutex<DeviceState>,
}

/// Work queued while the device lock is held, run after release.
enum Deferred {
    Event(SpineEvent),
    Response(ResponseCallback, ResponseMessage),
    Result(ResultCallback, ResponseMessage),
    Approval(WriteApprovalCallback, WriteApprovalRequest),
}

fn lock(state: &Mutex<DeviceState>) -> std::sync::MutexGuard<'_, DeviceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_deferred(shared: &Arc<DeviceShared>, deferred: Vec<Deferred>) {
    for action in deferred {
        match action {
            Deferred::Event(event) => {
                let _ = shared.events.send(Arc::new(event));
            },
            Deferred::Response(callback, message) => callback(message),
            Deferred::Result(callback, message) => callback(&message),
            Deferred::Approval(callback, request) => callback(request),
        }
    }
}

/// The local device. Cheap to clone; all clones share one tree.
#[derive(Clone)]
pub struct DeviceLocal {
    shared: Arc<DeviceShared>,
}

impl DeviceLocal {
    /// Construct the device with its root entity: node management plus a
    /// device-classification server announcing the device info.
    pub fn new(
        info: DeviceInfo,
        device_type: DeviceType,
        codec: Arc<dyn SpineCodec>,
        max_response_delay: Duration,
    ) -> Self {
        let address = DeviceAddress::new(info.device_address());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut root = EntityLocal::new(EntityAddress::root(Some(address.clone())), EntityType::DeviceInformation);
        let node_management = root.add_feature(FeatureType::NodeManagement, Role::Special);
        {
            let feature = root.feature_mut(node_management.feature).expect("root feature just added");
            for function in [
                Function::NodeManagementDetailedDiscoveryData,
                Function::NodeManagementUseCaseData,
                Function::NodeManagementSubscriptionData,
                Function::NodeManagementBindingData,
                Function::NodeManagementDestinationListData,
            ] {
                let _ = feature.add_function(function, Operations::READ);
            }
            for call in [
                Function::NodeManagementSubscriptionRequestCall,
                Function::NodeManagementSubscriptionDeleteCall,
                Function::NodeManagementBindingRequestCall,
                Function::NodeManagementBindingDeleteCall,
            ] {
                let _ = feature.add_function(call, Operations::empty());
            }
        }

        let classification = root.add_feature(FeatureType::DeviceClassification, Role::Server);
        {
            let feature = root.feature_mut(classification.feature).expect("root feature just added");
            let _ = feature.add_function(Function::DeviceClassificationManufacturerData, Operations::READ);
            let shape = Function::DeviceClassificationManufacturerData.shape();
            let mut data = Value::empty(shape);
            let _ = data.set_field(shape, "deviceName", Value::Simple(Leaf::Text(info.device_model().to_string())));
            let _ = data.set_field(shape, "serialNumber", Value::Simple(Leaf::Text(info.serial_number().to_string())));
            let _ = data.set_field(shape, "vendorCode", Value::Simple(Leaf::Text(info.vendor_code().to_string())));
            let _ = data.set_field(shape, "brandName", Value::Simple(Leaf::Text(info.brand_name().to_string())));
            let _ = feature.set_data(Function::DeviceClassificationManufacturerData, data);
        }

        let state = DeviceState {
            entities: vec![root],
            next_entity_id: 1,
            msg_counter: 0,
            remotes: HashMap::new(),
            subscriptions: SubscriptionManager::new(),
            bindings: BindingManager::new(),
            pending_writes: HashMap::new(),
        };

        Self {
            shared: Arc::new(DeviceShared {
                info,
                address,
                device_type,
                max_response_delay,
                codec,
                events,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.shared.address
    }

    pub fn device_type(&self) -> DeviceType {
        self.shared.device_type
    }

    /// The local node-management feature address.
    pub fn node_management_address(&self) -> FeatureAddress {
        node_management::node_management_address(Some(self.shared.address.clone()))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Arc<SpineEvent>> {
        self.shared.events.subscribe()
    }

    // Tree construction

    /// Create an entity; its id is unique for the lifetime of the device.
    pub fn add_entity(&self, entity_type: EntityType) -> EntityAddress {
        let mut state = lock(&self.shared.state);
        let id = state.next_entity_id;
        state.next_entity_id += 1;
        let address = EntityAddress::new(Some(self.shared.address.clone()), vec![id]);
        state.entities.push(EntityLocal::new(address.clone(), entity_type));
        drop(state);
        self.notify_discovery_change();
        address
    }

    pub fn add_feature(
        &self,
        entity: &EntityAddress,
        feature_type: FeatureType,
        role: Role,
    ) -> Result<FeatureAddress, EebusError> {
        let mut state = lock(&self.shared.state);
        let entity = state
            .entities
            .iter_mut()
            .find(|candidate| candidate.address().entity == entity.entity)
            .ok_or_else(|| EebusError::input(format!("unknown entity {}", entity)))?;
        let address = entity.add_feature(feature_type, role);
        drop(state);
        self.notify_discovery_change();
        Ok(address)
    }

    pub fn add_function(
        &self,
        feature: &FeatureAddress,
        function: Function,
        operations: Operations,
    ) -> Result<(), EebusError> {
        let mut state = lock(&self.shared.state);
        feature_mut(&mut state, feature)?.add_function(function, operations)
    }

    pub fn set_feature_description(&self, feature: &FeatureAddress, description: &str) -> Result<(), EebusError> {
        let mut state = lock(&self.shared.state);
        feature_mut(&mut state, feature)?.set_description(description);
        Ok(())
    }

    // Local data plane

    /// Replace a function cache and notify subscribers.
    pub fn set_function_data(&self, feature: &FeatureAddress, function: Function, data: Value) -> Result<(), EebusError> {
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            feature_mut(&mut state, feature)?.set_data(function, data)?;
            deferred.push(Deferred::Event(SpineEvent::data_change(
                None,
                ElementChange::Update,
                Some(feature.clone()),
                None,
                function,
                None,
            )));
            notify_subscribers(&self.shared, &mut state, feature, function);
        }
        run_deferred(&self.shared, deferred);
        Ok(())
    }

    /// Apply a filtered update to a local cache and notify subscribers.
    pub fn update_function_data(
        &self,
        feature: &FeatureAddress,
        function: Function,
        incoming: Option<&Value>,
        filters: &[Filter],
    ) -> Result<(), EebusError> {
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            feature_mut(&mut state, feature)?.update_data(function, incoming, filters)?;
            deferred.push(Deferred::Event(SpineEvent::data_change(
                None,
                ElementChange::Update,
                Some(feature.clone()),
                None,
                function,
                None,
            )));
            notify_subscribers(&self.shared, &mut state, feature, function);
        }
        run_deferred(&self.shared, deferred);
        Ok(())
    }

    pub fn function_data(&self, feature: &FeatureAddress, function: Function) -> Option<Value> {
        let state = lock(&self.shared.state);
        find_feature(&state, &feature.entity, feature.feature).and_then(|feature| feature.data_copy(function))
    }

    pub fn add_result_callback(&self, feature: &FeatureAddress, callback: ResultCallback) -> Result<(), EebusError> {
        let mut state = lock(&self.shared.state);
        feature_mut(&mut state, feature)?.add_result_callback(callback);
        Ok(())
    }

    pub fn set_write_approval(
        &self,
        feature: &FeatureAddress,
        callback: WriteApprovalCallback,
    ) -> Result<(), EebusError> {
        let mut state = lock(&self.shared.state);
        feature_mut(&mut state, feature)?.set_write_approval(callback);
        Ok(())
    }

    // Remote data plane

    pub fn remote_device_address(&self, ski: &Ski) -> Option<DeviceAddress> {
        let state = lock(&self.shared.state);
        state.remotes.get(ski).and_then(|remote| remote.address().cloned())
    }

    pub fn remote_function_data(&self, ski: &Ski, feature: &FeatureAddress, function: Function) -> Option<Value> {
        let state = lock(&self.shared.state);
        state
            .remotes
            .get(ski)
            .and_then(|remote| remote.feature(feature))
            .and_then(|feature| feature.data_copy(function))
    }

    /// The address of the first remote feature of the given type and role.
    pub fn remote_feature_of_type(&self, ski: &Ski, feature_type: FeatureType, role: Role) -> Option<FeatureAddress> {
        let state = lock(&self.shared.state);
        state
            .remotes
            .get(ski)
            .and_then(|remote| remote.feature_of_type(feature_type, role))
            .map(|feature| feature.address().clone())
    }

    /// Issue a read towards a remote feature. The response callback is
    /// registered before the frame reaches the sender.
    pub fn request_remote_data(
        &self,
        local: &FeatureAddress,
        remote: &FeatureAddress,
        function: Function,
        filter: Option<Filter>,
        callback: Option<ResponseCallback>,
    ) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        let filters: Vec<Filter> = filter.into_iter().collect();
        let cmd = Command::with_filters(function, filters, CommandPayload::None);
        send_request(
            &self.shared,
            &mut state,
            ski,
            local,
            remote,
            CmdClassifier::Read,
            cmd,
            callback,
        )
    }

    /// Issue a write towards a remote feature. No filters replaces the
    /// remote cache; a partial filter merges; a delete filter removes.
    pub fn write_remote_data(
        &self,
        local: &FeatureAddress,
        remote: &FeatureAddress,
        function: Function,
        data: Option<Value>,
        filters: Vec<Filter>,
        callback: Option<ResponseCallback>,
    ) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        let payload = match data {
            Some(data) => CommandPayload::Data(data),
            None => CommandPayload::None,
        };
        let cmd = Command::with_filters(function, filters, payload);
        send_request(
            &self.shared,
            &mut state,
            ski,
            local,
            remote,
            CmdClassifier::Write,
            cmd,
            callback,
        )
    }

    // Subscriptions and bindings towards remote servers

    pub fn has_subscription_to(&self, local: &FeatureAddress, remote: &FeatureAddress) -> bool {
        let state = lock(&self.shared.state);
        find_feature(&state, &local.entity, local.feature)
            .map(|feature| feature.has_subscription_to(remote))
            .unwrap_or(false)
    }

    pub fn has_binding_to(&self, local: &FeatureAddress, remote: &FeatureAddress) -> bool {
        let state = lock(&self.shared.state);
        find_feature(&state, &local.entity, local.feature)
            .map(|feature| feature.has_binding_to(remote))
            .unwrap_or(false)
    }

    /// Subscribe the local client feature to a remote server feature via a
    /// node-management call.
    pub fn subscribe_to_remote(
        &self,
        local: &FeatureAddress,
        remote: &FeatureAddress,
        server_type: FeatureType,
    ) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        feature_mut(&mut state, local)?.add_subscription(remote.clone())?;
        let request = management_request(local, remote, server_type);
        let payload = Value::Sequence(vec![Some(request)]);
        let cmd = Command::with_data(Function::NodeManagementSubscriptionRequestCall, payload);
        let counter = send_call(&self.shared, &mut state, ski, remote, cmd)?;
        Ok(counter)
    }

    pub fn unsubscribe_from_remote(
        &self,
        local: &FeatureAddress,
        remote: &FeatureAddress,
    ) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        feature_mut(&mut state, local)?.remove_subscription(remote)?;
        let delete = management_delete(local, remote);
        let payload = Value::Sequence(vec![Some(delete)]);
        let cmd = Command::with_data(Function::NodeManagementSubscriptionDeleteCall, payload);
        send_call(&self.shared, &mut state, ski, remote, cmd)
    }

    /// Bind the local client feature to a remote server feature, the
    /// precondition for writes the peer will accept.
    pub fn bind_to_remote(
        &self,
        local: &FeatureAddress,
        remote: &FeatureAddress,
        server_type: FeatureType,
    ) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        feature_mut(&mut state, local)?.add_binding(remote.clone())?;
        let request = management_request(local, remote, server_type);
        let payload = Value::Sequence(vec![Some(request)]);
        let cmd = Command::with_data(Function::NodeManagementBindingRequestCall, payload);
        send_call(&self.shared, &mut state, ski, remote, cmd)
    }

    pub fn unbind_from_remote(&self, local: &FeatureAddress, remote: &FeatureAddress) -> Result<MsgCounter, EebusError> {
        let mut state = lock(&self.shared.state);
        let ski = remote_ski_for(&state, remote)?;
        feature_mut(&mut state, local)?.remove_binding(remote)?;
        let delete = management_delete(local, remote);
        let payload = Value::Sequence(vec![Some(delete)]);
        let cmd = Command::with_data(Function::NodeManagementBindingDeleteCall, payload);
        send_call(&self.shared, &mut state, ski, remote, cmd)
    }

    // Use-case advertisement

    pub fn add_use_case_support(
        &self,
        entity: &EntityAddress,
        actor: UseCaseActor,
        support: UseCaseSupport,
    ) -> Result<(), EebusError> {
        self.with_use_case_cache(|cache| use_case::add_support(cache, entity, actor, support))
    }

    pub fn remove_use_case_supports(
        &self,
        entity: &EntityAddress,
        filters: &[UseCaseFilter],
    ) -> Result<(), EebusError> {
        self.with_use_case_cache(|cache| use_case::remove_with_filters(cache, entity, filters))
    }

    pub fn remove_use_cases_for_entity(&self, entity: &EntityAddress) -> Result<(), EebusError> {
        self.with_use_case_cache(|cache| use_case::remove_for_address(cache, entity))
    }

    pub fn set_use_case_available(
        &self,
        entity: &EntityAddress,
        actor: UseCaseActor,
        name: UseCaseName,
        available: bool,
    ) -> Result<(), EebusError> {
        self.with_use_case_cache(|cache| use_case::set_available(cache, entity, actor, name, available))
    }

    pub fn has_use_case_support(&self, entity: &EntityAddress, actor: UseCaseActor, name: UseCaseName) -> bool {
        let state = lock(&self.shared.state);
        let nm = node_management::node_management_address(None);
        let cache = find_feature(&state, &nm.entity, nm.feature)
            .and_then(|feature| feature.data_copy(Function::NodeManagementUseCaseData));
        use_case::has_support(&cache, entity, actor, name)
    }

    fn with_use_case_cache(
        &self,
        apply: impl FnOnce(&mut Option<Value>) -> Result<(), EebusError>,
    ) -> Result<(), EebusError> {
        let nm = self.node_management_address();
        {
            let mut state = lock(&self.shared.state);
            let feature = feature_mut(&mut state, &nm)?;
            let mut cache = feature.data_copy(Function::NodeManagementUseCaseData);
            apply(&mut cache)?;
            if let Some(cache) = cache {
                feature.set_data(Function::NodeManagementUseCaseData, cache)?;
            }
            notify_subscribers(&self.shared, &mut state, &nm, Function::NodeManagementUseCaseData);
        }
        Ok(())
    }

    // Remote device lifecycle

    /// Attach a remote device for a completed SHIP connection, returning
    /// the reader its frames must be fed into. Detailed discovery of the
    /// peer starts immediately.
    pub fn setup_remote_device(
        &self,
        ski: Ski,
        writer: Arc<dyn SpineDataWriter>,
    ) -> Result<Arc<dyn SpineDataReader>, EebusError> {
        let local_nm = self.node_management_address();
        let remote_nm = node_management::node_management_address(None);
        {
            let mut state = lock(&self.shared.state);
            if state.remotes.contains_key(&ski) {
                return Err(EebusError::init(format!("remote device for {} already attached", ski)));
            }
            state.remotes.insert(ski, DeviceRemote::new(ski, writer));
            let cmd = Command::read(Function::NodeManagementDetailedDiscoveryData);
            send_request(
                &self.shared,
                &mut state,
                ski,
                &local_nm,
                &remote_nm,
                CmdClassifier::Read,
                cmd,
                None,
            )?;
        }
        Ok(Arc::new(DeviceReader {
            device: self.clone(),
            ski,
        }))
    }

    /// Detach a remote device: evict its pending requests, drop every
    /// subscription and binding involving it and discard the mirror.
    pub fn remove_remote_device(&self, ski: &Ski) {
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            let remote = match state.remotes.remove(ski) {
                Some(remote) => remote,
                None => return,
            };
            let remote_address = remote.address().cloned();
            for entity in &mut state.entities {
                for feature in entity.features_mut() {
                    for (counter, callback) in feature.pending().take_for_ski(ski) {
                        let datagram = synthetic_result(
                            feature.address(),
                            MsgCounter(counter),
                            ResultData::error(ResultData::GENERAL_ERROR, "remote device detached"),
                        );
                        deferred.push(Deferred::Response(callback, ResponseMessage { ski: *ski, datagram }));
                    }
                    if let Some(address) = &remote_address {
                        feature.forget_remote_device(address);
                    }
                }
            }
            state.subscriptions.remove_for_ski(ski);
            state.bindings.remove_for_ski(ski);
            state.pending_writes.retain(|(pending_ski, _), _| pending_ski != ski);
            deferred.push(Deferred::Event(SpineEvent {
                ski: Some(*ski),
                kind: SpineEventKind::DeviceChange,
                change: ElementChange::Remove,
                entity: None,
                feature: None,
                local_feature: None,
                function: None,
                classifier: None,
            }));
        }
        run_deferred(&self.shared, deferred);
    }

    /// Drop the cached payloads mirrored from a peer so the next request
    /// fetches fresh data.
    pub fn clean_remote_caches(&self, ski: &Ski) {
        let mut state = lock(&self.shared.state);
        if let Some(remote) = state.remotes.get_mut(ski) {
            remote.flush_caches();
        }
    }

    // Housekeeping

    /// Evict timed-out pending requests and unanswered write approvals.
    /// Driven by a periodic task owned by the service.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            let mut timed_out: Vec<(FeatureAddress, u64, Ski, ResponseCallback)> = Vec::new();
            for entity in &mut state.entities {
                for feature in entity.features_mut() {
                    let address = feature.address().clone();
                    for (counter, ski, callback) in feature.pending().take_expired(now) {
                        timed_out.push((address.clone(), counter, ski, callback));
                    }
                }
            }
            for (address, counter, ski, callback) in timed_out {
                let datagram = synthetic_result(
                    &address,
                    MsgCounter(counter),
                    ResultData::error(ResultData::TIMEOUT, "max response delay exceeded"),
                );
                deferred.push(Deferred::Response(callback, ResponseMessage { ski, datagram }));
            }

            let expired: Vec<(Ski, u64)> = state
                .pending_writes
                .iter()
                .filter(|(_, pending)| pending.expires_at <= now)
                .map(|(key, _)| *key)
                .collect();
            for key in expired {
                if let Some(pending) = state.pending_writes.remove(&key) {
                    send_result(
                        &self.shared,
                        &mut state,
                        key.0,
                        &pending.datagram,
                        ResultData::error(ResultData::TIMEOUT, "write approval timed out"),
                    );
                }
            }
        }
        run_deferred(&self.shared, deferred);
    }

    /// Publish a heartbeat on a device-diagnosis server feature and notify
    /// its subscribers.
    pub fn beat_heartbeat(&self, feature: &FeatureAddress, timeout: Duration) -> Result<(), EebusError> {
        let shape = Function::DeviceDiagnosisHeartbeatData.shape();
        {
            let mut state = lock(&self.shared.state);
            let target = feature_mut(&mut state, feature)?;
            let counter = target
                .data(Function::DeviceDiagnosisHeartbeatData)
                .and_then(|data| data.field(shape, "heartbeatCounter"))
                .and_then(Value::as_unsigned)
                .unwrap_or(0);
            let mut data = Value::empty(shape);
            data.set_field(shape, "timestamp", Value::Simple(Leaf::Timestamp(chrono::Utc::now())))?;
            data.set_field(shape, "heartbeatCounter", Value::Simple(Leaf::Unsigned(counter + 1)))?;
            data.set_field(
                shape,
                "heartbeatTimeout",
                Value::Simple(Leaf::Duration(chrono::Duration::milliseconds(timeout.as_millis() as i64))),
            )?;
            target.set_data(Function::DeviceDiagnosisHeartbeatData, data)?;
            notify_subscribers(&self.shared, &mut state, feature, Function::DeviceDiagnosisHeartbeatData);
        }
        Ok(())
    }

    /// Feed one parsed inbound datagram through the dispatcher.
    pub fn process_datagram(&self, ski: Ski, datagram: Datagram) {
        let mut deferred = Vec::new();
        {
            let mut state = lock(&self.shared.state);
            dispatch(&self.shared, &mut state, ski, datagram, &mut deferred);
        }
        run_deferred(&self.shared, deferred);
    }

    /// Push a fresh detailed discovery to every peer subscribed to node
    /// management, so it can refresh its mirror.
    fn notify_discovery_change(&self) {
        let nm = self.node_management_address();
        let mut state = lock(&self.shared.state);
        if state.remotes.is_empty() {
            return;
        }
        let data = node_management::detailed_discovery::build(
            &self.shared.address,
            self.shared.device_type.tag_index(),
            NetworkFeatureSet::Simple.tag_index(),
            &state.entities,
        );
        let subscribers: Vec<(Ski, FeatureAddress)> = state
            .subscriptions
            .subscribers_of(&nm)
            .map(|entry| (entry.ski, entry.client.clone()))
            .collect();
        for (ski, client) in subscribers {
            let cmd = Command::with_data(Function::NodeManagementDetailedDiscoveryData, data.clone());
            if let Err(e) = send(&self.shared, &mut state, ski, &nm, &client, CmdClassifier::Notify, None, None, cmd) {
                warn!(target: LOG_TARGET, "Failed to notify discovery change to {}: {}", ski, e);
            }
        }
    }
}

/// Reader handed to the SHIP connection on attach.
struct DeviceReader {
    device: DeviceLocal,
    ski: Ski,
}

impl SpineDataReader for DeviceReader {
    fn handle_incoming(&self, payload: &[u8]) -> Result<(), EebusError> {
        let datagram = self.device.shared.codec.parse(payload)?;
        trace!(
            target: LOG_TARGET,
            "[{}] {} {} -> {}",
            self.ski,
            datagram.header.cmd_classifier,
            datagram.header.address_source,
            datagram.header.address_destination
        );
        self.device.process_datagram(self.ski, datagram);
        Ok(())
    }
}

// Lookup helpers

fn find_feature<'a>(state: &'a DeviceState, entity: &[u32], feature: u32) -> Option<&'a FeatureLocal> {
    state
        .entities
        .iter()
        .find(|candidate| candidate.address().entity == entity)
        .and_then(|candidate| candidate.feature(feature))
}

fn find_feature_mut<'a>(state: &'a mut DeviceState, entity: &[u32], feature: u32) -> Option<&'a mut FeatureLocal> {
    state
        .entities
        .iter_mut()
        .find(|candidate| candidate.address().entity == entity)
        .and_then(|candidate| candidate.feature_mut(feature))
}

fn feature_mut<'a>(state: &'a mut DeviceState, address: &FeatureAddress) -> Result<&'a mut FeatureLocal, EebusError> {
    find_feature_mut(state, &address.entity, address.feature)
        .ok_or_else(|| EebusError::input(format!("unknown local feature {}", address)))
}

/// The peer a remote feature address belongs to.
fn remote_ski_for(state: &DeviceState, remote: &FeatureAddress) -> Result<Ski, EebusError> {
    match &remote.device {
        Some(device) => state
            .remotes
            .values()
            .find(|candidate| candidate.address() == Some(device))
            .map(|candidate| *candidate.ski())
            .ok_or_else(|| EebusError::init(format!("no attached device at {}", device))),
        None if state.remotes.len() == 1 => Ok(*state.remotes.values().next().expect("len checked").ski()),
        None => Err(EebusError::input("remote feature address carries no device")),
    }
}

fn management_request(local: &FeatureAddress, remote: &FeatureAddress, server_type: FeatureType) -> Value {
    Value::Sequence(vec![
        Some(local.to_value()),
        Some(remote.to_value()),
        Some(Value::Simple(Leaf::Tag(server_type.tag_index()))),
    ])
}

fn management_delete(local: &FeatureAddress, remote: &FeatureAddress) -> Value {
    Value::Sequence(vec![None, Some(local.to_value()), Some(remote.to_value())])
}

/// A result datagram fabricated locally, e.g. for timeouts and detach.
fn synthetic_result(local: &FeatureAddress, reference: MsgCounter, result: ResultData) -> Datagram {
    let header = Header {
        specification_version: SPECIFICATION_VERSION.to_string(),
        address_source: local.clone(),
        address_destination: local.clone(),
        msg_counter: MsgCounter(0),
        msg_counter_reference: Some(reference),
        cmd_classifier: CmdClassifier::Result,
        ack_request: None,
    };
    Datagram::new(header, Command::result(result))
}

// Outbound plumbing. The msgCounter is assigned under the device lock and
// frames are enqueued in the same critical section, so the counter a
// caller observes is exactly the one the peer will see.

#[allow(clippy::too_many_arguments)]
fn send(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    source: &FeatureAddress,
    destination: &FeatureAddress,
    classifier: CmdClassifier,
    reference: Option<MsgCounter>,
    ack_request: Option<bool>,
    cmd: Command,
) -> Result<MsgCounter, EebusError> {
    let writer = state
        .remotes
        .get(&ski)
        .map(|remote| remote.writer().clone())
        .ok_or_else(|| EebusError::init(format!("no attached device for {}", ski)))?;
    state.msg_counter += 1;
    let counter = MsgCounter(state.msg_counter);
    let mut source = source.clone();
    if source.device.is_none() {
        source.device = Some(shared.address.clone());
    }
    let header = Header {
        specification_version: SPECIFICATION_VERSION.to_string(),
        address_source: source,
        address_destination: destination.clone(),
        msg_counter: counter,
        msg_counter_reference: reference,
        cmd_classifier: classifier,
        ack_request,
    };
    let bytes = shared.codec.serialise(&Datagram::new(header, cmd))?;
    writer.write(bytes)?;
    Ok(counter)
}

/// Send a read or write, registering the response callback first so a
/// fast reply cannot race it.
#[allow(clippy::too_many_arguments)]
fn send_request(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    local: &FeatureAddress,
    remote: &FeatureAddress,
    classifier: CmdClassifier,
    cmd: Command,
    callback: Option<ResponseCallback>,
) -> Result<MsgCounter, EebusError> {
    let counter = MsgCounter(state.msg_counter + 1);
    // Requests without an interested caller still occupy a pending entry,
    // so the eventual reply is matched instead of flagged as a violation
    let callback = callback.unwrap_or_else(|| Box::new(|_| {}));
    let max_delay = shared.max_response_delay;
    feature_mut(state, local)?
        .pending()
        .register(counter.0, ski, callback, max_delay)?;
    match send(shared, state, ski, local, remote, classifier, None, None, cmd) {
        Ok(sent) => {
            debug_assert_eq!(sent, counter);
            Ok(sent)
        },
        Err(e) => {
            // The frame never left; the registration must not linger
            if let Ok(feature) = feature_mut(state, local) {
                let _ = feature.pending().take(counter.0);
            }
            Err(e)
        },
    }
}

/// Management calls always travel between the two node-management
/// features, whichever local feature initiated them.
fn send_call(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    remote: &FeatureAddress,
    cmd: Command,
) -> Result<MsgCounter, EebusError> {
    let remote_nm = node_management::node_management_address(remote.device.clone());
    let local_nm = node_management::node_management_address(Some(shared.address.clone()));
    send(shared, state, ski, &local_nm, &remote_nm, CmdClassifier::Call, None, None, cmd)
}

fn send_result(shared: &Arc<DeviceShared>, state: &mut DeviceState, ski: Ski, inbound: &Datagram, result: ResultData) {
    let source = inbound.header.address_destination.clone();
    let destination = inbound.header.address_source.clone();
    if let Err(e) = send(
        shared,
        state,
        ski,
        &source,
        &destination,
        CmdClassifier::Result,
        Some(inbound.header.msg_counter),
        None,
        Command::result(result),
    ) {
        debug!(target: LOG_TARGET, "Failed to answer {} with a result: {}", ski, e);
    }
}

/// Serialise the current cache of a server feature to every subscriber.
fn notify_subscribers(shared: &Arc<DeviceShared>, state: &mut DeviceState, feature: &FeatureAddress, function: Function) {
    let mut server = feature.clone();
    if server.device.is_none() {
        server.device = Some(shared.address.clone());
    }
    let data = match find_feature(state, &server.entity, server.feature).and_then(|f| f.data_copy(function)) {
        Some(data) => data,
        None => return,
    };
    let subscribers: Vec<(Ski, FeatureAddress)> = state
        .subscriptions
        .subscribers_of(&server)
        .map(|entry| (entry.ski, entry.client.clone()))
        .collect();
    for (ski, client) in subscribers {
        let cmd = Command::with_data(function, data.clone());
        if let Err(e) = send(shared, state, ski, &server, &client, CmdClassifier::Notify, None, None, cmd) {
            warn!(target: LOG_TARGET, "Failed to notify {} about {}: {}", ski, function, e);
        }
    }
}

// Inbound dispatch

fn dispatch(shared: &Arc<DeviceShared>, state: &mut DeviceState, ski: Ski, datagram: Datagram, deferred: &mut Vec<Deferred>) {
    let classifier = datagram.header.cmd_classifier;
    let destination = &datagram.header.address_destination;

    let device_matches = destination
        .device
        .as_ref()
        .map(|device| device == &shared.address)
        .unwrap_or(true);
    let resolved = device_matches && find_feature(state, &destination.entity, destination.feature).is_some();
    if !resolved {
        debug!(
            target: LOG_TARGET,
            "[{}] {} addressed to unknown feature {}", ski, classifier, destination
        );
        if classifier != CmdClassifier::Result {
            send_result(
                shared,
                state,
                ski,
                &datagram,
                ResultData::error(ResultData::DESTINATION_UNKNOWN, "unknown destination feature"),
            );
        }
        return;
    }

    match classifier {
        CmdClassifier::Read => handle_read(shared, state, ski, &datagram),
        CmdClassifier::Write => handle_write(shared, state, ski, datagram, deferred),
        CmdClassifier::Notify => handle_notify(shared, state, ski, &datagram, deferred),
        CmdClassifier::Reply => handle_reply(shared, state, ski, &datagram, deferred),
        CmdClassifier::Result => handle_result(state, ski, &datagram, deferred),
        CmdClassifier::Call => handle_call(shared, state, ski, &datagram, deferred),
    }
}

fn handle_read(shared: &Arc<DeviceShared>, state: &mut DeviceState, ski: Ski, datagram: &Datagram) {
    let destination = &datagram.header.address_destination;
    let function = datagram.cmd.function;
    let feature = find_feature(state, &destination.entity, destination.feature).expect("resolved by dispatch");

    let operations = match feature.operations(function) {
        Some(operations) => operations,
        None => {
            send_result(
                shared,
                state,
                ski,
                datagram,
                ResultData::error(ResultData::COMMAND_NOT_SUPPORTED, "function not supported"),
            );
            return;
        },
    };
    let filter = datagram.cmd.filter_partial();
    if !operations.can_read() || (filter.is_some() && !operations.contains(Operations::READ_PARTIAL)) {
        send_result(
            shared,
            state,
            ski,
            datagram,
            ResultData::error(ResultData::COMMAND_REJECTED, "read not permitted"),
        );
        return;
    }
    if datagram.cmd.filter_delete().is_some() {
        send_result(
            shared,
            state,
            ski,
            datagram,
            ResultData::error(ResultData::COMMAND_REJECTED, "a read cannot carry a delete filter"),
        );
        return;
    }

    // Node-management inventories are materialised on demand
    let cache = match function {
        Function::NodeManagementDetailedDiscoveryData => Some(node_management::detailed_discovery::build(
            &shared.address,
            shared.device_type.tag_index(),
            NetworkFeatureSet::Simple.tag_index(),
            &state.entities,
        )),
        Function::NodeManagementSubscriptionData => Some(state.subscriptions.to_value()),
        Function::NodeManagementBindingData => Some(state.bindings.to_value()),
        Function::NodeManagementDestinationListData => Some(build_destination_list(shared, state)),
        _ => feature.data_copy(function),
    };
    let cache = cache.unwrap_or_else(|| Value::empty(function.shape()));

    let payload = match crate::model::update::apply_read_filter(function, &cache, filter) {
        Ok(payload) => payload,
        Err(e) => {
            send_result(shared, state, ski, datagram, ResultData::error(ResultData::GENERAL_ERROR, e.to_string()));
            return;
        },
    };

    let source = datagram.header.address_destination.clone();
    let destination = datagram.header.address_source.clone();
    let cmd = Command::with_data(function, payload);
    if let Err(e) = send(
        shared,
        state,
        ski,
        &source,
        &destination,
        CmdClassifier::Reply,
        Some(datagram.header.msg_counter),
        None,
        cmd,
    ) {
        warn!(target: LOG_TARGET, "Failed to reply to read from {}: {}", ski, e);
    }
}

fn handle_write(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let destination = datagram.header.address_destination.clone();
    let function = datagram.cmd.function;
    let feature = find_feature(state, &destination.entity, destination.feature).expect("resolved by dispatch");

    let operations = match feature.operations(function) {
        Some(operations) => operations,
        None => {
            send_result(
                shared,
                state,
                ski,
                &datagram,
                ResultData::error(ResultData::COMMAND_NOT_SUPPORTED, "function not supported"),
            );
            return;
        },
    };
    let wants_partial = datagram.cmd.filter_partial().is_some() || datagram.cmd.filter_delete().is_some();
    if !operations.can_write() || (wants_partial && !operations.contains(Operations::WRITE_PARTIAL)) {
        send_result(
            shared,
            state,
            ski,
            &datagram,
            ResultData::error(ResultData::COMMAND_REJECTED, "write not permitted"),
        );
        return;
    }

    if let Some(callback) = feature.write_approval().cloned() {
        let counter = datagram.header.msg_counter.0;
        let request = WriteApprovalRequest {
            ski,
            local_feature: destination,
            remote_feature: datagram.header.address_source.clone(),
            function,
            datagram: datagram.clone(),
            approval: WriteApproval {
                shared: shared.clone(),
                ski,
                msg_counter: counter,
            },
        };
        state.pending_writes.insert((ski, counter), PendingWrite {
            datagram,
            expires_at: Instant::now() + shared.max_response_delay,
        });
        deferred.push(Deferred::Approval(callback, request));
        return;
    }

    apply_write(shared, state, ski, &datagram, deferred);
}

/// The actual mutation of a write, run directly or after approval.
fn apply_write(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let destination = &datagram.header.address_destination;
    let function = datagram.cmd.function;
    let feature = match find_feature_mut(state, &destination.entity, destination.feature) {
        Some(feature) => feature,
        None => return,
    };
    let outcome = feature.update_data(function, datagram.cmd.payload.data(), &datagram.cmd.filters);
    match outcome {
        Ok(()) => {},
        Err(EebusError::NoChange) => {},
        Err(e) => {
            send_result(shared, state, ski, datagram, ResultData::error(ResultData::GENERAL_ERROR, e.to_string()));
            return;
        },
    }
    deferred.push(Deferred::Event(SpineEvent::data_change(
        Some(ski),
        ElementChange::Update,
        Some(destination.clone()),
        Some(datagram.header.address_source.clone()),
        function,
        Some(CmdClassifier::Write),
    )));
    notify_subscribers(shared, state, destination, function);
    if datagram.header.ack_request == Some(true) {
        send_result(shared, state, ski, datagram, ResultData::ok());
    }
}

/// Replies and notifies describe the state of the *remote* feature that
/// sent them; they land in its mirror cache.
fn update_remote_cache(
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let source = &datagram.header.address_source;
    let function = datagram.cmd.function;
    let remote = match state.remotes.get_mut(&ski) {
        Some(remote) => remote,
        None => {
            debug!(target: LOG_TARGET, "[{}] data frame without an attached device", ski);
            return;
        },
    };
    let feature = match remote.feature_mut(source) {
        Some(feature) => feature,
        None => {
            debug!(target: LOG_TARGET, "[{}] data from undiscovered feature {}", ski, source);
            return;
        },
    };
    let had_data = feature.data(function).is_some();
    match feature.update_data(function, datagram.cmd.payload.data(), &datagram.cmd.filters) {
        Ok(()) => {
            deferred.push(Deferred::Event(SpineEvent::data_change(
                Some(ski),
                if had_data { ElementChange::Update } else { ElementChange::Add },
                Some(datagram.header.address_destination.clone()),
                Some(source.clone()),
                function,
                Some(datagram.header.cmd_classifier),
            )));
        },
        Err(EebusError::NoChange) => {},
        Err(e) => {
            warn!(target: LOG_TARGET, "[{}] dropping malformed {} update: {}", ski, function, e);
        },
    }
}

fn handle_notify(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let _ = shared;
    update_remote_cache(state, ski, datagram, deferred);
}

fn handle_reply(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    // Discovery replies (re)build the mirrored device tree before anything
    // else looks at it
    if datagram.cmd.function == Function::NodeManagementDetailedDiscoveryData {
        apply_discovery_reply(shared, state, ski, datagram, deferred);
    } else {
        update_remote_cache(state, ski, datagram, deferred);
    }

    let reference = match datagram.header.msg_counter_reference {
        Some(reference) => reference,
        None => {
            send_result(
                shared,
                state,
                ski,
                datagram,
                ResultData::error(ResultData::GENERAL_ERROR, "reply without msgCounterReference"),
            );
            return;
        },
    };
    let destination = &datagram.header.address_destination;
    let feature = find_feature_mut(state, &destination.entity, destination.feature).expect("resolved by dispatch");
    match feature.pending().take(reference.0) {
        Some(callback) => deferred.push(Deferred::Response(callback, ResponseMessage {
            ski,
            datagram: datagram.clone(),
        })),
        None => {
            // A reply nothing waits for is a protocol violation
            send_result(
                shared,
                state,
                ski,
                datagram,
                ResultData::error(ResultData::GENERAL_ERROR, "unmatched reply"),
            );
        },
    }
}

fn apply_discovery_reply(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let data = match datagram.cmd.payload.data() {
        Some(data) => data,
        None => return,
    };
    let discovered = match node_management::detailed_discovery::parse(data) {
        Ok(discovered) => discovered,
        Err(e) => {
            warn!(target: LOG_TARGET, "[{}] discarding malformed discovery data: {}", ski, e);
            return;
        },
    };
    let remote = match state.remotes.get_mut(&ski) {
        Some(remote) => remote,
        None => return,
    };
    let first = remote.apply_discovery(discovered);
    let entity_addresses: Vec<EntityAddress> = remote
        .entities()
        .iter()
        .map(|entity| entity.address().clone())
        .collect();
    deferred.push(Deferred::Event(SpineEvent {
        ski: Some(ski),
        kind: SpineEventKind::DeviceChange,
        change: if first { ElementChange::Add } else { ElementChange::Update },
        entity: None,
        feature: None,
        local_feature: None,
        function: Some(Function::NodeManagementDetailedDiscoveryData),
        classifier: Some(CmdClassifier::Reply),
    }));
    for entity in entity_addresses {
        deferred.push(Deferred::Event(SpineEvent {
            ski: Some(ski),
            kind: SpineEventKind::EntityChange,
            change: if first { ElementChange::Add } else { ElementChange::Update },
            entity: Some(entity),
            feature: None,
            local_feature: None,
            function: None,
            classifier: None,
        }));
    }

    // Follow up with the peer's use-case advertisement
    if first {
        let local_nm = node_management::node_management_address(Some(shared.address.clone()));
        let remote_nm = node_management::node_management_address(
            state.remotes.get(&ski).and_then(|remote| remote.address().cloned()),
        );
        let cmd = Command::read(Function::NodeManagementUseCaseData);
        if let Err(e) = send_request(shared, state, ski, &local_nm, &remote_nm, CmdClassifier::Read, cmd, None) {
            debug!(target: LOG_TARGET, "Failed to request use-case data from {}: {}", ski, e);
        }
    }
}

fn handle_result(state: &mut DeviceState, ski: Ski, datagram: &Datagram, deferred: &mut Vec<Deferred>) {
    let destination = &datagram.header.address_destination;
    let message = ResponseMessage {
        ski,
        datagram: datagram.clone(),
    };
    let feature = find_feature_mut(state, &destination.entity, destination.feature).expect("resolved by dispatch");
    for callback in feature.result_callbacks() {
        deferred.push(Deferred::Result(callback.clone(), message.clone()));
    }
    if let Some(reference) = datagram.header.msg_counter_reference {
        if let Some(callback) = feature.pending().take(reference.0) {
            deferred.push(Deferred::Response(callback, message));
        }
    }
}

fn handle_call(
    shared: &Arc<DeviceShared>,
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    deferred: &mut Vec<Deferred>,
) {
    let function = datagram.cmd.function;
    let outcome = match function {
        Function::NodeManagementSubscriptionRequestCall => {
            handle_management_request(state, ski, datagram, "subscriptionRequest", true, deferred)
        },
        Function::NodeManagementSubscriptionDeleteCall => {
            handle_management_delete(state, ski, datagram, "subscriptionDelete", true, deferred)
        },
        Function::NodeManagementBindingRequestCall => {
            handle_management_request(state, ski, datagram, "bindingRequest", false, deferred)
        },
        Function::NodeManagementBindingDeleteCall => {
            handle_management_delete(state, ski, datagram, "bindingDelete", false, deferred)
        },
        _ => Err(ResultData::error(ResultData::COMMAND_NOT_SUPPORTED, "unknown call")),
    };
    let result = match outcome {
        Ok(()) => ResultData::ok(),
        Err(result) => result,
    };
    send_result(shared, state, ski, datagram, result);
}

fn handle_management_request(
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    field: &str,
    subscription: bool,
    deferred: &mut Vec<Deferred>,
) -> Result<(), ResultData> {
    let data = datagram
        .cmd
        .payload
        .data()
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "call without payload"))?;
    let request = data
        .field(datagram.cmd.function.shape(), field)
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "malformed management call"))?;
    let request_shape = if subscription {
        &shapes::SUBSCRIPTION_MANAGEMENT_REQUEST
    } else {
        &shapes::BINDING_MANAGEMENT_REQUEST
    };
    let mut client = request
        .field(request_shape, "clientAddress")
        .and_then(FeatureAddress::from_value)
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "management call without client address"))?;
    let server = request
        .field(request_shape, "serverAddress")
        .and_then(FeatureAddress::from_value)
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "management call without server address"))?;

    let target = find_feature(state, &server.entity, server.feature)
        .ok_or_else(|| ResultData::error(ResultData::DESTINATION_UNKNOWN, "unknown server feature"))?;
    if target.role() != Role::Server && target.role() != Role::Special {
        return Err(ResultData::error(ResultData::COMMAND_REJECTED, "target feature is not a server"));
    }
    let server = target.address().clone();

    if client.device.is_none() {
        client.device = state.remotes.get(&ski).and_then(|remote| remote.address().cloned());
    }

    let (kind, outcome) = if subscription {
        (SpineEventKind::SubscriptionChange, state.subscriptions.add(ski, client.clone(), server.clone()))
    } else {
        (SpineEventKind::BindingChange, state.bindings.add(ski, client.clone(), server.clone()))
    };
    match outcome {
        Ok(_) => {
            deferred.push(Deferred::Event(SpineEvent {
                ski: Some(ski),
                kind,
                change: ElementChange::Add,
                entity: None,
                feature: Some(client),
                local_feature: Some(server),
                function: Some(datagram.cmd.function),
                classifier: Some(CmdClassifier::Call),
            }));
            Ok(())
        },
        // Repeating an existing registration is answered as success
        Err(EebusError::NoChange) => Ok(()),
        Err(e) => Err(ResultData::error(ResultData::GENERAL_ERROR, e.to_string())),
    }
}

fn handle_management_delete(
    state: &mut DeviceState,
    ski: Ski,
    datagram: &Datagram,
    field: &str,
    subscription: bool,
    deferred: &mut Vec<Deferred>,
) -> Result<(), ResultData> {
    let data = datagram
        .cmd
        .payload
        .data()
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "call without payload"))?;
    let delete = data
        .field(datagram.cmd.function.shape(), field)
        .ok_or_else(|| ResultData::error(ResultData::GENERAL_ERROR, "malformed management call"))?;
    let delete_shape = if subscription {
        &shapes::SUBSCRIPTION_MANAGEMENT_DELETE
    } else {
        &shapes::BINDING_MANAGEMENT_DELETE
    };
    let id_field = if subscription { "subscriptionId" } else { "bindingId" };
    let id = delete.field(delete_shape, id_field).and_then(Value::as_unsigned);
    let client = delete.field(delete_shape, "clientAddress").and_then(FeatureAddress::from_value);
    let server = delete.field(delete_shape, "serverAddress").and_then(FeatureAddress::from_value);

    let removed = if subscription {
        match id {
            Some(id) => state.subscriptions.remove_by_id(id).map(|entry| vec![entry]).unwrap_or_default(),
            None => state.subscriptions.remove_matching(client.as_ref(), server.as_ref()),
        }
        .into_iter()
        .map(|entry| (entry.client, entry.server))
        .collect::<Vec<_>>()
    } else {
        match id {
            Some(id) => state.bindings.remove_by_id(id).map(|entry| vec![entry]).unwrap_or_default(),
            None => state.bindings.remove_matching(client.as_ref(), server.as_ref()),
        }
        .into_iter()
        .map(|entry| (entry.client, entry.server))
        .collect::<Vec<_>>()
    };

    if removed.is_empty() {
        return Err(ResultData::error(ResultData::GENERAL_ERROR, "no matching registration"));
    }
    for (client, server) in removed {
        deferred.push(Deferred::Event(SpineEvent {
            ski: Some(ski),
            kind: if subscription {
                SpineEventKind::SubscriptionChange
            } else {
                SpineEventKind::BindingChange
            },
            change: ElementChange::Remove,
            entity: None,
            feature: Some(client),
            local_feature: Some(server),
            function: Some(datagram.cmd.function),
            classifier: Some(CmdClassifier::Call),
        }));
    }
    Ok(())
}

fn build_destination_list(shared: &Arc<DeviceShared>, state: &DeviceState) -> Value {
    let own = node_management::destination::device_description(
        &shared.address,
        Some(shared.device_type.tag_index()),
        Some(NetworkFeatureSet::Simple.tag_index()),
    );
    let remotes = state.remotes.values().filter_map(|remote| {
        remote
            .address()
            .map(|address| node_management::destination::device_description(address, remote.device_type(), None))
    });
    node_management::destination::build(std::iter::once(own).chain(remotes))
}
