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

//! A device mirrored from a peer: the entity/feature tree learned through
//! detailed discovery and the sender wired to its SHIP connection.

use std::sync::Arc;

use eebus_common::{Ski, SpineDataWriter};

use crate::{
    entity::EntityRemote,
    feature::FeatureRemote,
    model::{DeviceAddress, FeatureAddress},
    node_management::DiscoveredDevice,
};

pub struct DeviceRemote {
    ski: Ski,
    address: Option<DeviceAddress>,
    device_type: Option<u32>,
    entities: Vec<EntityRemote>,
    writer: Arc<dyn SpineDataWriter>,
}

impl DeviceRemote {
    pub fn new(ski: Ski, writer: Arc<dyn SpineDataWriter>) -> Self {
        Self {
            ski,
            address: None,
            device_type: None,
            entities: Vec::new(),
            writer,
        }
    }

    pub fn ski(&self) -> &Ski {
        &self.ski
    }

    pub fn address(&self) -> Option<&DeviceAddress> {
        self.address.as_ref()
    }

    pub fn device_type(&self) -> Option<u32> {
        self.device_type
    }

    pub fn writer(&self) -> &Arc<dyn SpineDataWriter> {
        &self.writer
    }

    pub fn entities(&self) -> &[EntityRemote] {
        &self.entities
    }

    /// Rebuild the mirrored tree from a discovery payload. Returns whether
    /// this was the first discovery for the device.
    pub fn apply_discovery(&mut self, discovered: DiscoveredDevice) -> bool {
        let first = self.entities.is_empty();
        if discovered.address.is_some() {
            self.address = discovered.address;
        }
        if discovered.device_type.is_some() {
            self.device_type = discovered.device_type;
        }
        let mut entities: Vec<EntityRemote> = discovered
            .entities
            .into_iter()
            .map(|entity| {
                let mut address = entity.address;
                if address.device.is_none() {
                    address.device = self.address.clone();
                }
                EntityRemote::new(address, entity.entity_type)
            })
            .collect();
        for feature in discovered.features {
            let mut address = feature.address;
            if address.device.is_none() {
                address.device = self.address.clone();
            }
            let entity = match entities.iter_mut().find(|entity| entity.address().entity == address.entity) {
                Some(entity) => entity,
                None => continue,
            };
            let mut remote = FeatureRemote::new(
                address,
                feature.feature_type.unwrap_or(crate::feature::FeatureType::Generic),
                feature.role,
            );
            for (function, operations) in feature.functions {
                remote.set_operations(function, operations);
            }
            entity.add_feature(remote);
        }
        self.entities = entities;
        first
    }

    pub fn feature(&self, address: &FeatureAddress) -> Option<&FeatureRemote> {
        self.entities
            .iter()
            .find(|entity| entity.address().entity == address.entity)
            .and_then(|entity| entity.feature(address.feature))
    }

    pub fn feature_mut(&mut self, address: &FeatureAddress) -> Option<&mut FeatureRemote> {
        self.entities
            .iter_mut()
            .find(|entity| entity.address().entity == address.entity)
            .and_then(|entity| entity.feature_mut(address.feature))
    }

    /// The first remote feature of the given type and role.
    pub fn feature_of_type(
        &self,
        feature_type: crate::feature::FeatureType,
        role: crate::feature::Role,
    ) -> Option<&FeatureRemote> {
        self.entities
            .iter()
            .flat_map(|entity| entity.features().iter())
            .find(|feature| feature.feature_type() == feature_type && feature.role() == role)
    }

    pub fn flush_caches(&mut self) {
        for entity in &mut self.entities {
            for feature in entity.features_mut() {
                feature.flush_caches();
            }
        }
    }
}
