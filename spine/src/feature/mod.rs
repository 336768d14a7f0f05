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

//! Feature tables: role-typed endpoints exposing sets of functions.

mod functions;
mod local;
mod operations;
mod pending;
mod remote;

use std::fmt::{Display, Error, Formatter};

pub use functions::functions_for;
pub use local::{FeatureLocal, FunctionEntry, WriteApprovalCallback};
pub use operations::Operations;
pub use pending::{PendingRequests, ResponseCallback, ResponseMessage, ResultCallback};
pub use remote::FeatureRemote;

use crate::model::shapes;

/// Whether a feature consumes (client) or provides (server) its functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client = 0,
    Server = 1,
    Special = 2,
}

impl Role {
    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn from_tag_index(index: u32) -> Option<Role> {
        Some(match index {
            0 => Role::Client,
            1 => Role::Server,
            2 => Role::Special,
            _ => return None,
        })
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::ROLE_NAMES[*self as usize]
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

/// The type of a feature; decides which functions it may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureType {
    NodeManagement = 0,
    DeviceClassification = 1,
    DeviceConfiguration = 2,
    DeviceDiagnosis = 3,
    ElectricalConnection = 4,
    LoadControl = 5,
    Measurement = 6,
    Generic = 7,
}

impl FeatureType {
    pub const ALL: &'static [FeatureType] = &[
        FeatureType::NodeManagement,
        FeatureType::DeviceClassification,
        FeatureType::DeviceConfiguration,
        FeatureType::DeviceDiagnosis,
        FeatureType::ElectricalConnection,
        FeatureType::LoadControl,
        FeatureType::Measurement,
        FeatureType::Generic,
    ];

    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn from_tag_index(index: u32) -> Option<FeatureType> {
        FeatureType::ALL.get(index as usize).copied()
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::FEATURE_TYPE_NAMES[*self as usize]
    }

    pub fn from_wire_name(name: &str) -> Option<FeatureType> {
        FeatureType::ALL.iter().copied().find(|t| t.wire_name() == name)
    }
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_indices_align_with_the_tag_table() {
        for role in [Role::Client, Role::Server, Role::Special] {
            assert_eq!(shapes::ROLE_NAMES[role.tag_index() as usize], role.wire_name());
            assert_eq!(Role::from_tag_index(role.tag_index()), Some(role));
        }
    }

    #[test]
    fn feature_type_indices_align_with_the_tag_table() {
        assert_eq!(FeatureType::ALL.len(), shapes::FEATURE_TYPE_NAMES.len());
        for feature_type in FeatureType::ALL {
            assert_eq!(FeatureType::from_tag_index(feature_type.tag_index()), Some(*feature_type));
            assert_eq!(FeatureType::from_wire_name(feature_type.wire_name()), Some(*feature_type));
        }
    }
}
