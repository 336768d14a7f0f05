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
    feature::FeatureRemote,
    model::EntityAddress,
};

/// An entity mirrored from a peer's detailed discovery.
pub struct EntityRemote {
    address: EntityAddress,
    entity_type: Option<EntityType>,
    features: Vec<FeatureRemote>,
}

impl EntityRemote {
    pub fn new(address: EntityAddress, entity_type: Option<EntityType>) -> Self {
        Self {
            address,
            entity_type,
            features: Vec::new(),
        }
    }

    pub fn address(&self) -> &EntityAddress {
        &self.address
    }

    pub fn entity_type(&self) -> Option<EntityType> {
        self.entity_type
    }

    pub fn add_feature(&mut self, feature: FeatureRemote) {
        self.features.push(feature);
    }

    pub fn feature(&self, feature_id: u32) -> Option<&FeatureRemote> {
        self.features.iter().find(|feature| feature.address().feature == feature_id)
    }

    pub fn feature_mut(&mut self, feature_id: u32) -> Option<&mut FeatureRemote> {
        self.features
            .iter_mut()
            .find(|feature| feature.address().feature == feature_id)
    }

    pub fn features(&self) -> &[FeatureRemote] {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut [FeatureRemote] {
        &mut self.features
    }
}
