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

//! The mirror of a feature learned from a peer's detailed discovery, with
//! the payload caches fed by its replies and notifies.

use std::collections::BTreeMap;

use eebus_common::EebusError;

use crate::{
    feature::{FeatureType, Operations, Role},
    model::{update, FeatureAddress, Filter, Function, Value},
};

pub struct FeatureRemote {
    address: FeatureAddress,
    feature_type: FeatureType,
    role: Role,
    operations: BTreeMap<Function, Operations>,
    data: BTreeMap<Function, Value>,
}

impl FeatureRemote {
    pub fn new(address: FeatureAddress, feature_type: FeatureType, role: Role) -> Self {
        Self {
            address,
            feature_type,
            role,
            operations: BTreeMap::new(),
            data: BTreeMap::new(),
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

    /// Record the operations the peer advertised for a function.
    pub fn set_operations(&mut self, function: Function, operations: Operations) {
        self.operations.insert(function, operations);
    }

    pub fn operations(&self, function: Function) -> Option<Operations> {
        self.operations.get(&function).copied()
    }

    pub fn functions(&self) -> impl Iterator<Item = (Function, Operations)> + '_ {
        self.operations.iter().map(|(function, operations)| (*function, *operations))
    }

    pub fn data(&self, function: Function) -> Option<&Value> {
        self.data.get(&function)
    }

    pub fn data_copy(&self, function: Function) -> Option<Value> {
        self.data(function).cloned()
    }

    /// Apply an inbound reply or notify payload to the cache.
    pub fn update_data(
        &mut self,
        function: Function,
        incoming: Option<&Value>,
        filters: &[Filter],
    ) -> Result<(), EebusError> {
        let mut cache = self.data.remove(&function);
        let outcome = update::apply_update(function, &mut cache, incoming, filters);
        if let Some(cache) = cache {
            self.data.insert(function, cache);
        }
        outcome
    }

    /// Drop every cached payload, e.g. when a use case asks for a fresh
    /// read of the remote state.
    pub fn flush_caches(&mut self) {
        self.data.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{shapes, DeviceAddress, Leaf};

    fn remote() -> FeatureRemote {
        FeatureRemote::new(
            FeatureAddress::new(Some(DeviceAddress::new("d:_n:b_2")), vec![1], 1),
            FeatureType::Measurement,
            Role::Server,
        )
    }

    fn measurement(id: u64) -> Value {
        let mut element = Value::empty(&shapes::MEASUREMENT_DATA);
        element
            .set_field(&shapes::MEASUREMENT_DATA, "measurementId", Value::Simple(Leaf::Unsigned(id)))
            .unwrap();
        element
    }

    #[test]
    fn replies_replace_the_cache_wholesale() {
        let mut remote = remote();
        remote
            .update_data(
                Function::MeasurementListData,
                Some(&Value::Container(vec![measurement(1), measurement(2)])),
                &[],
            )
            .unwrap();
        remote
            .update_data(Function::MeasurementListData, Some(&Value::Container(vec![measurement(3)])), &[])
            .unwrap();
        assert_eq!(remote.data(Function::MeasurementListData).unwrap().elements().unwrap().len(), 1);
    }

    #[test]
    fn flushing_clears_every_cache() {
        let mut remote = remote();
        remote
            .update_data(Function::MeasurementListData, Some(&Value::Container(vec![measurement(1)])), &[])
            .unwrap();
        remote.flush_caches();
        assert!(remote.data(Function::MeasurementListData).is_none());
    }
}
