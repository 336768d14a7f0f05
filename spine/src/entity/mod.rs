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

//! Entities: the logical units within a device that own features.

mod local;
mod remote;

use std::fmt::{Display, Error, Formatter};

pub use local::EntityLocal;
pub use remote::EntityRemote;

use crate::model::shapes;

/// The type of an entity (e.g. one compressor inside a heat-pump
/// appliance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    DeviceInformation = 0,
    Cem = 1,
    HeatPumpAppliance = 2,
    Compressor = 3,
    DomesticHotWater = 4,
    Battery = 5,
    Pv = 6,
    Evse = 7,
    Ev = 8,
    SubMeterElectricity = 9,
    GridConnectionPointOfPremises = 10,
}

impl EntityType {
    pub const ALL: &'static [EntityType] = &[
        EntityType::DeviceInformation,
        EntityType::Cem,
        EntityType::HeatPumpAppliance,
        EntityType::Compressor,
        EntityType::DomesticHotWater,
        EntityType::Battery,
        EntityType::Pv,
        EntityType::Evse,
        EntityType::Ev,
        EntityType::SubMeterElectricity,
        EntityType::GridConnectionPointOfPremises,
    ];

    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn from_tag_index(index: u32) -> Option<EntityType> {
        EntityType::ALL.get(index as usize).copied()
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::ENTITY_TYPE_NAMES[*self as usize]
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_indices_align_with_the_tag_table() {
        assert_eq!(EntityType::ALL.len(), shapes::ENTITY_TYPE_NAMES.len());
        for entity_type in EntityType::ALL {
            assert_eq!(EntityType::from_tag_index(entity_type.tag_index()), Some(*entity_type));
        }
    }
}
