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

//! The local device tree with its dispatcher, and the mirrored remote
//! devices.

mod local;
mod remote;
#[cfg(test)]
mod tests;

use std::fmt::{Display, Error, Formatter};

pub use local::{DeviceLocal, WriteApproval, WriteApprovalRequest};
pub use remote::DeviceRemote;

use crate::model::shapes;

/// The EEBUS device type announced in discovery data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Generic = 0,
    HeatPumpAppliance = 1,
    ChargingStation = 2,
    EnergyManagementSystem = 3,
    ElectricitySupplySystem = 4,
    Inverter = 5,
    SubMeterElectricity = 6,
}

impl DeviceType {
    pub const ALL: &'static [DeviceType] = &[
        DeviceType::Generic,
        DeviceType::HeatPumpAppliance,
        DeviceType::ChargingStation,
        DeviceType::EnergyManagementSystem,
        DeviceType::ElectricitySupplySystem,
        DeviceType::Inverter,
        DeviceType::SubMeterElectricity,
    ];

    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn from_tag_index(index: u32) -> Option<DeviceType> {
        DeviceType::ALL.get(index as usize).copied()
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::DEVICE_TYPE_NAMES[*self as usize]
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

/// How the device participates in network management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFeatureSet {
    Simple = 0,
    Smart = 1,
    Router = 2,
}

impl NetworkFeatureSet {
    pub fn tag_index(&self) -> u32 {
        *self as u32
    }
}

