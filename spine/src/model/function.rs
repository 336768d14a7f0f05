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

//! The function catalogue. Each function names a typed data item or call;
//! its payload shape, element key and selector semantics live in the
//! read-only tables of [`crate::model::shapes`].

use std::fmt::{Display, Error, Formatter};

use crate::model::{shape::Shape, shapes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    DeviceClassificationManufacturerData,
    DeviceConfigurationKeyValueDescriptionListData,
    DeviceConfigurationKeyValueListData,
    DeviceDiagnosisHeartbeatData,
    DeviceDiagnosisStateData,
    ElectricalConnectionCharacteristicListData,
    ElectricalConnectionDescriptionListData,
    ElectricalConnectionParameterDescriptionListData,
    ElectricalConnectionPermittedValueSetListData,
    LoadControlLimitDescriptionListData,
    LoadControlLimitListData,
    MeasurementConstraintsListData,
    MeasurementDescriptionListData,
    MeasurementListData,
    NodeManagementBindingData,
    NodeManagementBindingDeleteCall,
    NodeManagementBindingRequestCall,
    NodeManagementDestinationListData,
    NodeManagementDetailedDiscoveryData,
    NodeManagementSubscriptionData,
    NodeManagementSubscriptionDeleteCall,
    NodeManagementSubscriptionRequestCall,
    NodeManagementUseCaseData,
    ResultData,
}

impl Function {
    pub const ALL: &'static [Function] = &[
        Function::DeviceClassificationManufacturerData,
        Function::DeviceConfigurationKeyValueDescriptionListData,
        Function::DeviceConfigurationKeyValueListData,
        Function::DeviceDiagnosisHeartbeatData,
        Function::DeviceDiagnosisStateData,
        Function::ElectricalConnectionCharacteristicListData,
        Function::ElectricalConnectionDescriptionListData,
        Function::ElectricalConnectionParameterDescriptionListData,
        Function::ElectricalConnectionPermittedValueSetListData,
        Function::LoadControlLimitDescriptionListData,
        Function::LoadControlLimitListData,
        Function::MeasurementConstraintsListData,
        Function::MeasurementDescriptionListData,
        Function::MeasurementListData,
        Function::NodeManagementBindingData,
        Function::NodeManagementBindingDeleteCall,
        Function::NodeManagementBindingRequestCall,
        Function::NodeManagementDestinationListData,
        Function::NodeManagementDetailedDiscoveryData,
        Function::NodeManagementSubscriptionData,
        Function::NodeManagementSubscriptionDeleteCall,
        Function::NodeManagementSubscriptionRequestCall,
        Function::NodeManagementUseCaseData,
        Function::ResultData,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            Function::DeviceClassificationManufacturerData => "deviceClassificationManufacturerData",
            Function::DeviceConfigurationKeyValueDescriptionListData => {
                "deviceConfigurationKeyValueDescriptionListData"
            },
            Function::DeviceConfigurationKeyValueListData => "deviceConfigurationKeyValueListData",
            Function::DeviceDiagnosisHeartbeatData => "deviceDiagnosisHeartbeatData",
            Function::DeviceDiagnosisStateData => "deviceDiagnosisStateData",
            Function::ElectricalConnectionCharacteristicListData => "electricalConnectionCharacteristicListData",
            Function::ElectricalConnectionDescriptionListData => "electricalConnectionDescriptionListData",
            Function::ElectricalConnectionParameterDescriptionListData => {
                "electricalConnectionParameterDescriptionListData"
            },
            Function::ElectricalConnectionPermittedValueSetListData => "electricalConnectionPermittedValueSetListData",
            Function::LoadControlLimitDescriptionListData => "loadControlLimitDescriptionListData",
            Function::LoadControlLimitListData => "loadControlLimitListData",
            Function::MeasurementConstraintsListData => "measurementConstraintsListData",
            Function::MeasurementDescriptionListData => "measurementDescriptionListData",
            Function::MeasurementListData => "measurementListData",
            Function::NodeManagementBindingData => "nodeManagementBindingData",
            Function::NodeManagementBindingDeleteCall => "nodeManagementBindingDeleteCall",
            Function::NodeManagementBindingRequestCall => "nodeManagementBindingRequestCall",
            Function::NodeManagementDestinationListData => "nodeManagementDestinationListData",
            Function::NodeManagementDetailedDiscoveryData => "nodeManagementDetailedDiscoveryData",
            Function::NodeManagementSubscriptionData => "nodeManagementSubscriptionData",
            Function::NodeManagementSubscriptionDeleteCall => "nodeManagementSubscriptionDeleteCall",
            Function::NodeManagementSubscriptionRequestCall => "nodeManagementSubscriptionRequestCall",
            Function::NodeManagementUseCaseData => "nodeManagementUseCaseData",
            Function::ResultData => "resultData",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Function> {
        Function::ALL.iter().copied().find(|f| f.wire_name() == name)
    }

    /// The declared payload shape.
    pub fn shape(&self) -> &'static Shape {
        shapes::shape_of(*self)
    }

    /// The element shape and key of list/container functions.
    pub fn element(&self) -> Option<(&'static Shape, &'static [&'static str])> {
        self.shape().element()
    }

    /// Calls are routed to the node-management handler rather than the
    /// data-update path.
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Function::NodeManagementBindingDeleteCall |
                Function::NodeManagementBindingRequestCall |
                Function::NodeManagementSubscriptionDeleteCall |
                Function::NodeManagementSubscriptionRequestCall
        )
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip() {
        for function in Function::ALL {
            assert_eq!(Function::from_wire_name(function.wire_name()), Some(*function));
        }
        assert_eq!(Function::from_wire_name("noSuchFunction"), None);
    }

    #[test]
    fn every_function_declares_a_shape() {
        for function in Function::ALL {
            // A panic here means the shape table is missing an entry
            let _ = function.shape();
        }
    }
}
