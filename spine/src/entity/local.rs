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

use crate::{
    entity::EntityType,
    feature::{FeatureLocal, FeatureType, Role},
    model::{EntityAddress, FeatureAddress},
};

/// A local entity owning its features exclusively. Feature ids are unique
/// within the entity and never reused; the root entity allocates from 0,
/// every other entity from 1.
pub struct EntityLocal {
    address: EntityAddress,
    entity_type: EntityType,
    features: Vec<FeatureLocal>,
    next_feature_id: u32,
}

impl EntityLocal {
    pub fn new(address: EntityAddress, entity_type: EntityType) -> Self {
        let next_feature_id = if address.is_root() { 0 } else { 1 };
        Self {
            address,
            entity_type,
            features: Vec::new(),
            next_feature_id,
        }
    }

    pub fn address(&self) -> &EntityAddress {
        &self.address
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Create a feature of the given type and role, returning its stable
    /// address.
    pub fn add_feature(&mut self, feature_type: FeatureType, role: Role) -> FeatureAddress {
        let address = self.address.feature(self.next_feature_id);
        self.next_feature_id += 1;
        self.features.push(FeatureLocal::new(address.clone(), feature_type, role));
        address
    }

    pub fn feature(&self, feature_id: u32) -> Option<&FeatureLocal> {
        self.features.iter().find(|feature| feature.address().feature == feature_id)
    }

    pub fn feature_mut(&mut self, feature_id: u32) -> Option<&mut FeatureLocal> {
        self.features
            .iter_mut()
            .find(|feature| feature.address().feature == feature_id)
    }

    /// The first feature of the given type and role, the common lookup for
    /// use cases.
    pub fn feature_of_type(&self, feature_type: FeatureType, role: Role) -> Option<&FeatureLocal> {
        self.features
            .iter()
            .find(|feature| feature.feature_type() == feature_type && feature.role() == role)
    }

    pub fn feature_of_type_mut(&mut self, feature_type: FeatureType, role: Role) -> Option<&mut FeatureLocal> {
        self.features
            .iter_mut()
            .find(|feature| feature.feature_type() == feature_type && feature.role() == role)
    }

    pub fn features(&self) -> &[FeatureLocal] {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut [FeatureLocal] {
        &mut self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceAddress;

    #[test]
    fn root_entities_allocate_feature_ids_from_zero() {
        let mut root = EntityLocal::new(
            EntityAddress::root(Some(DeviceAddress::new("d:_n:a_1"))),
            EntityType::DeviceInformation,
        );
        let first = root.add_feature(FeatureType::NodeManagement, Role::Special);
        let second = root.add_feature(FeatureType::DeviceClassification, Role::Server);
        assert_eq!(first.feature, 0);
        assert_eq!(second.feature, 1);
    }

    #[test]
    fn non_root_entities_allocate_feature_ids_from_one() {
        let mut entity = EntityLocal::new(
            EntityAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1]),
            EntityType::HeatPumpAppliance,
        );
        let first = entity.add_feature(FeatureType::Measurement, Role::Server);
        assert_eq!(first.feature, 1);
    }

    #[test]
    fn feature_addresses_are_stable_after_creation() {
        let mut entity = EntityLocal::new(
            EntityAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1]),
            EntityType::HeatPumpAppliance,
        );
        let address = entity.add_feature(FeatureType::Measurement, Role::Server);
        entity.add_feature(FeatureType::LoadControl, Role::Server);
        assert_eq!(entity.feature(address.feature).unwrap().address(), &address);
    }
}
