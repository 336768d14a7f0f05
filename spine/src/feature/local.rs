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

//! The local feature record. All mutation happens under the device lock;
//! the public entry points live on the device handles.

use std::collections::BTreeMap;

use eebus_common::EebusError;

use crate::{
    device::WriteApprovalRequest,
    feature::{functions_for, FeatureType, Operations, PendingRequests, ResultCallback, Role},
    model::{update, FeatureAddress, Filter, Function, Value},
};

/// Invoked for inbound writes when registered; the receiver must resolve
/// the carried approval exactly once. Shared so it can be invoked after
/// the device lock is released.
pub type WriteApprovalCallback = std::sync::Arc<dyn Fn(WriteApprovalRequest) + Send + Sync>;

/// One registered function of a local feature: its operation flags and its
/// payload cache.
pub struct FunctionEntry {
    pub operations: Operations,
    pub data: Option<Value>,
}

/// A role-typed endpoint within a local entity. The address is immutable
/// after creation.
pub struct FeatureLocal {
    address: FeatureAddress,
    feature_type: FeatureType,
    role: Role,
    description: Option<String>,
    functions: BTreeMap<Function, FunctionEntry>,
    subscriptions: Vec<FeatureAddress>,
    bindings: Vec<FeatureAddress>,
    pending: PendingRequests,
    result_callbacks: Vec<ResultCallback>,
    write_approval: Option<WriteApprovalCallback>,
}

impl FeatureLocal {
    pub fn new(address: FeatureAddress, feature_type: FeatureType, role: Role) -> Self {
        Self {
            address,
            feature_type,
            role,
            description: None,
            functions: BTreeMap::new(),
            subscriptions: Vec::new(),
            bindings: Vec::new(),
            pending: PendingRequests::new(),
            result_callbacks: Vec::new(),
            write_approval: None,
        }
    }

    pub fn address(&self) -> &FeatureAddress {
        &self.address
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<T: Into<String>>(&mut self, description: T) {
        self.description = Some(description.into());
    }

    /// Register a function with its operation flags. Only functions the
    /// feature type declares are accepted.
    pub fn add_function(&mut self, function: Function, operations: Operations) -> Result<(), EebusError> {
        if !functions_for(self.feature_type).contains(&function) {
            return Err(EebusError::NotSupported(format!(
                "{} features do not expose {}",
                self.feature_type,
                function.wire_name()
            )));
        }
        self.functions.insert(function, FunctionEntry { operations, data: None });
        Ok(())
    }

    pub fn has_function(&self, function: Function) -> bool {
        self.functions.contains_key(&function)
    }

    pub fn operations(&self, function: Function) -> Option<Operations> {
        self.functions.get(&function).map(|entry| entry.operations)
    }

    /// Iterate the registered functions in stable order.
    pub fn functions(&self) -> impl Iterator<Item = (Function, &FunctionEntry)> {
        self.functions.iter().map(|(function, entry)| (*function, entry))
    }

    pub fn data(&self, function: Function) -> Option<&Value> {
        self.functions.get(&function).and_then(|entry| entry.data.as_ref())
    }

    pub fn data_copy(&self, function: Function) -> Option<Value> {
        self.data(function).cloned()
    }

    /// Replace the cache wholesale.
    pub fn set_data(&mut self, function: Function, data: Value) -> Result<(), EebusError> {
        let entry = self
            .functions
            .get_mut(&function)
            .ok_or_else(|| EebusError::NotSupported(format!("{} is not registered", function.wire_name())))?;
        entry.data = Some(data);
        Ok(())
    }

    /// Apply a filtered update to the cache.
    pub fn update_data(
        &mut self,
        function: Function,
        incoming: Option<&Value>,
        filters: &[Filter],
    ) -> Result<(), EebusError> {
        let entry = self
            .functions
            .get_mut(&function)
            .ok_or_else(|| EebusError::NotSupported(format!("{} is not registered", function.wire_name())))?;
        update::apply_update(function, &mut entry.data, incoming, filters)
    }

    // Subscriptions this feature (as client) holds on remote servers

    pub fn has_subscription_to(&self, remote: &FeatureAddress) -> bool {
        self.subscriptions.contains(remote)
    }

    pub fn add_subscription(&mut self, remote: FeatureAddress) -> Result<(), EebusError> {
        if self.subscriptions.contains(&remote) {
            return Err(EebusError::NoChange);
        }
        self.subscriptions.push(remote);
        Ok(())
    }

    pub fn remove_subscription(&mut self, remote: &FeatureAddress) -> Result<(), EebusError> {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|address| address != remote);
        if self.subscriptions.len() == before {
            return Err(EebusError::NoChange);
        }
        Ok(())
    }

    pub fn subscriptions(&self) -> &[FeatureAddress] {
        &self.subscriptions
    }

    // Bindings this feature (as client) holds on remote servers

    pub fn has_binding_to(&self, remote: &FeatureAddress) -> bool {
        self.bindings.contains(remote)
    }

    pub fn add_binding(&mut self, remote: FeatureAddress) -> Result<(), EebusError> {
        if self.bindings.contains(&remote) {
            return Err(EebusError::NoChange);
        }
        self.bindings.push(remote);
        Ok(())
    }

    pub fn remove_binding(&mut self, remote: &FeatureAddress) -> Result<(), EebusError> {
        let before = self.bindings.len();
        self.bindings.retain(|address| address != remote);
        if self.bindings.len() == before {
            return Err(EebusError::NoChange);
        }
        Ok(())
    }

    pub fn bindings(&self) -> &[FeatureAddress] {
        &self.bindings
    }

    /// Drop every subscription and binding held towards features of the
    /// given remote device.
    pub fn forget_remote_device(&mut self, device: &crate::model::DeviceAddress) {
        self.subscriptions.retain(|address| address.device.as_ref() != Some(device));
        self.bindings.retain(|address| address.device.as_ref() != Some(device));
    }

    pub fn pending(&mut self) -> &mut PendingRequests {
        &mut self.pending
    }

    pub fn add_result_callback(&mut self, callback: ResultCallback) {
        self.result_callbacks.push(callback);
    }

    pub fn result_callbacks(&self) -> &[ResultCallback] {
        &self.result_callbacks
    }

    pub fn set_write_approval(&mut self, callback: WriteApprovalCallback) {
        self.write_approval = Some(callback);
    }

    pub fn write_approval(&self) -> Option<&WriteApprovalCallback> {
        self.write_approval.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceAddress;

    fn feature() -> FeatureLocal {
        FeatureLocal::new(
            FeatureAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1], 1),
            FeatureType::Measurement,
            Role::Server,
        )
    }

    #[test]
    fn functions_outside_the_feature_type_are_rejected() {
        let mut feature = feature();
        let err = feature
            .add_function(Function::LoadControlLimitListData, Operations::read())
            .unwrap_err();
        assert!(matches!(err, EebusError::NotSupported(_)));
        feature.add_function(Function::MeasurementListData, Operations::read()).unwrap();
        assert!(feature.has_function(Function::MeasurementListData));
    }

    #[test]
    fn duplicate_subscriptions_report_no_change() {
        let mut feature = feature();
        let remote = FeatureAddress::new(Some(DeviceAddress::new("d:_n:b_2")), vec![1], 4);
        feature.add_subscription(remote.clone()).unwrap();
        assert!(feature.add_subscription(remote.clone()).unwrap_err().is_no_change());
        feature.remove_subscription(&remote).unwrap();
        assert!(feature.remove_subscription(&remote).unwrap_err().is_no_change());
    }

    #[test]
    fn forgetting_a_device_drops_its_subscriptions_and_bindings() {
        let mut feature = feature();
        let gone = DeviceAddress::new("d:_n:b_2");
        let kept = DeviceAddress::new("d:_n:c_3");
        feature.add_subscription(FeatureAddress::new(Some(gone.clone()), vec![1], 4)).unwrap();
        feature.add_binding(FeatureAddress::new(Some(gone.clone()), vec![1], 4)).unwrap();
        feature.add_subscription(FeatureAddress::new(Some(kept.clone()), vec![1], 4)).unwrap();
        feature.forget_remote_device(&gone);
        assert_eq!(feature.subscriptions().len(), 1);
        assert!(feature.bindings().is_empty());
        assert_eq!(feature.subscriptions()[0].device, Some(kept));
    }
}
