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

//! The static table mapping each feature type to the functions it may
//! expose.

use crate::{feature::FeatureType, model::Function};

static DEVICE_CLASSIFICATION_FUNCTIONS: &[Function] = &[Function::DeviceClassificationManufacturerData];

static DEVICE_CONFIGURATION_FUNCTIONS: &[Function] = &[
    Function::DeviceConfigurationKeyValueDescriptionListData,
    Function::DeviceConfigurationKeyValueListData,
];

static DEVICE_DIAGNOSIS_FUNCTIONS: &[Function] =
    &[Function::DeviceDiagnosisHeartbeatData, Function::DeviceDiagnosisStateData];

static ELECTRICAL_CONNECTION_FUNCTIONS: &[Function] = &[
    Function::ElectricalConnectionCharacteristicListData,
    Function::ElectricalConnectionDescriptionListData,
    Function::ElectricalConnectionParameterDescriptionListData,
    Function::ElectricalConnectionPermittedValueSetListData,
];

static LOAD_CONTROL_FUNCTIONS: &[Function] =
    &[Function::LoadControlLimitDescriptionListData, Function::LoadControlLimitListData];

static MEASUREMENT_FUNCTIONS: &[Function] = &[
    Function::MeasurementConstraintsListData,
    Function::MeasurementDescriptionListData,
    Function::MeasurementListData,
];

static NODE_MANAGEMENT_FUNCTIONS: &[Function] = &[
    Function::NodeManagementBindingData,
    Function::NodeManagementBindingDeleteCall,
    Function::NodeManagementBindingRequestCall,
    Function::NodeManagementDestinationListData,
    Function::NodeManagementDetailedDiscoveryData,
    Function::NodeManagementSubscriptionData,
    Function::NodeManagementSubscriptionDeleteCall,
    Function::NodeManagementSubscriptionRequestCall,
    Function::NodeManagementUseCaseData,
];

/// The functions a feature of the given type may register. Generic
/// features may expose any data function.
pub fn functions_for(feature_type: FeatureType) -> &'static [Function] {
    match feature_type {
        FeatureType::NodeManagement => NODE_MANAGEMENT_FUNCTIONS,
        FeatureType::DeviceClassification => DEVICE_CLASSIFICATION_FUNCTIONS,
        FeatureType::DeviceConfiguration => DEVICE_CONFIGURATION_FUNCTIONS,
        FeatureType::DeviceDiagnosis => DEVICE_DIAGNOSIS_FUNCTIONS,
        FeatureType::ElectricalConnection => ELECTRICAL_CONNECTION_FUNCTIONS,
        FeatureType::LoadControl => LOAD_CONTROL_FUNCTIONS,
        FeatureType::Measurement => MEASUREMENT_FUNCTIONS,
        FeatureType::Generic => Function::ALL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_feature_type_has_functions() {
        for feature_type in FeatureType::ALL {
            assert!(!functions_for(*feature_type).is_empty());
        }
    }

    #[test]
    fn measurement_features_expose_measurement_list_data() {
        assert!(functions_for(FeatureType::Measurement).contains(&Function::MeasurementListData));
        assert!(!functions_for(FeatureType::Measurement).contains(&Function::LoadControlLimitListData));
    }
}
