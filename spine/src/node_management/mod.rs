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

//! Node management: detailed discovery, use-case advertisement,
//! subscription/binding inventories and the destination list — all
//! expressed as ordinary SPINE functions on a well-known feature.

pub mod binding;
pub mod destination;
pub mod detailed_discovery;
pub mod subscription;
pub mod use_case;

pub use binding::{BindingEntry, BindingManager};
pub use detailed_discovery::{DiscoveredDevice, DiscoveredEntity, DiscoveredFeature};
pub use subscription::{SubscriptionEntry, SubscriptionManager};
pub use use_case::{UseCaseActor, UseCaseFilter, UseCaseName, UseCaseSupport};

use crate::model::{DeviceAddress, FeatureAddress};

/// Node management is always feature 0 of the root entity.
pub const NODE_MANAGEMENT_FEATURE_ID: u32 = 0;

pub fn node_management_address(device: Option<DeviceAddress>) -> FeatureAddress {
    FeatureAddress::new(device, Vec::new(), NODE_MANAGEMENT_FEATURE_ID)
}
