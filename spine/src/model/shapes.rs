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

//! The schema tables: one `static` shape per declared function payload.
//!
//! Shapes reference each other directly so the whole schema is resolved at
//! compile time and lives in read-only storage.

use crate::model::{
    function::Function,
    shape::{ContainerShape, Field, LeafKind, ListShape, Shape},
};

// Scalar building blocks

pub static BOOL: Shape = Shape::Simple(LeafKind::Bool);
pub static NUMBER: Shape = Shape::Simple(LeafKind::Number);
pub static UNSIGNED: Shape = Shape::Simple(LeafKind::Unsigned);
pub static TEXT: Shape = Shape::Simple(LeafKind::Text);
pub static DURATION: Shape = Shape::Simple(LeafKind::Duration);
pub static TIMESTAMP: Shape = Shape::Simple(LeafKind::Timestamp);

/// Presence-only marker (`{}` on the wire).
pub static EMPTY: Shape = Shape::Sequence(&[]);

// Shared enumeration tag tables. The order of these tables is load-bearing:
// typed enums in the feature layer use the same ordering for their tag
// indices.

pub static ROLE_NAMES: &[&str] = &["client", "server", "special"];
pub static ROLE: Shape = Shape::Simple(LeafKind::Tag(ROLE_NAMES));

pub static FEATURE_TYPE_NAMES: &[&str] = &[
    "NodeManagement",
    "DeviceClassification",
    "DeviceConfiguration",
    "DeviceDiagnosis",
    "ElectricalConnection",
    "LoadControl",
    "Measurement",
    "Generic",
];
pub static FEATURE_TYPE: Shape = Shape::Simple(LeafKind::Tag(FEATURE_TYPE_NAMES));

pub static ENTITY_TYPE_NAMES: &[&str] = &[
    "DeviceInformation",
    "CEM",
    "HeatPumpAppliance",
    "Compressor",
    "DomesticHotWater",
    "Battery",
    "PV",
    "EVSE",
    "EV",
    "SubMeterElectricity",
    "GridConnectionPointOfPremises",
];
pub static ENTITY_TYPE: Shape = Shape::Simple(LeafKind::Tag(ENTITY_TYPE_NAMES));

pub static DEVICE_TYPE_NAMES: &[&str] = &[
    "Generic",
    "HeatPumpAppliance",
    "ChargingStation",
    "EnergyManagementSystem",
    "ElectricitySupplySystem",
    "Inverter",
    "SubMeterElectricity",
];
pub static DEVICE_TYPE: Shape = Shape::Simple(LeafKind::Tag(DEVICE_TYPE_NAMES));

pub static USE_CASE_ACTOR_NAMES: &[&str] = &[
    "CEM",
    "ControllableSystem",
    "EnergyGuard",
    "MonitoredUnit",
    "MonitoringAppliance",
    "Battery",
    "HeatPump",
    "EVSE",
    "EV",
    "Inverter",
];
pub static USE_CASE_ACTOR: Shape = Shape::Simple(LeafKind::Tag(USE_CASE_ACTOR_NAMES));

pub static USE_CASE_NAME_NAMES: &[&str] = &[
    "limitationOfPowerConsumption",
    "limitationOfPowerProduction",
    "monitoringAppliance",
    "monitoringOfPowerConsumption",
    "optimizationOfSelfConsumptionDuringEvCharging",
    "visualizationOfAggregatedBatteryData",
    "visualizationOfAggregatedPhotovoltaicData",
];
pub static USE_CASE_NAME: Shape = Shape::Simple(LeafKind::Tag(USE_CASE_NAME_NAMES));

pub static UNIT_NAMES: &[&str] = &["W", "Wh", "A", "V", "Hz", "%", "C", "s"];
pub static UNIT: Shape = Shape::Simple(LeafKind::Tag(UNIT_NAMES));

pub static NETWORK_FEATURE_SET_NAMES: &[&str] = &["simple", "smart", "router"];
pub static NETWORK_FEATURE_SET: Shape = Shape::Simple(LeafKind::Tag(NETWORK_FEATURE_SET_NAMES));

// Common aggregates

pub static SCALED_NUMBER: Shape = Shape::Sequence(&[
    Field { name: "number", shape: &NUMBER },
    Field { name: "scale", shape: &NUMBER },
]);

pub static SCALED_NUMBER_RANGE: Shape = Shape::Sequence(&[
    Field { name: "min", shape: &SCALED_NUMBER },
    Field { name: "max", shape: &SCALED_NUMBER },
]);

pub static TIME_PERIOD: Shape = Shape::Sequence(&[
    Field { name: "startTime", shape: &TIMESTAMP },
    Field { name: "endTime", shape: &TIMESTAMP },
]);

static ENTITY_ID_LIST: Shape = Shape::List(ListShape { element: &UNSIGNED, key: &[] });

pub static DEVICE_ADDRESS: Shape = Shape::Sequence(&[Field { name: "device", shape: &TEXT }]);

pub static ENTITY_ADDRESS: Shape = Shape::Sequence(&[
    Field { name: "device", shape: &TEXT },
    Field { name: "entity", shape: &ENTITY_ID_LIST },
]);

pub static FEATURE_ADDRESS: Shape = Shape::Sequence(&[
    Field { name: "device", shape: &TEXT },
    Field { name: "entity", shape: &ENTITY_ID_LIST },
    Field { name: "feature", shape: &UNSIGNED },
]);

// Measurement

pub static MEASUREMENT_VALUE_TYPE_NAMES: &[&str] =
    &["value", "averageValue", "minValue", "maxValue", "standardDeviation"];
static MEASUREMENT_VALUE_TYPE: Shape = Shape::Simple(LeafKind::Tag(MEASUREMENT_VALUE_TYPE_NAMES));
static MEASUREMENT_VALUE_SOURCE: Shape =
    Shape::Simple(LeafKind::Tag(&["measuredValue", "calculatedValue", "empiricalValue"]));
static MEASUREMENT_VALUE_STATE: Shape = Shape::Simple(LeafKind::Tag(&["normal", "outOfRange", "error"]));

pub static MEASUREMENT_DATA: Shape = Shape::Sequence(&[
    Field { name: "measurementId", shape: &UNSIGNED },
    Field { name: "valueType", shape: &MEASUREMENT_VALUE_TYPE },
    Field { name: "timestamp", shape: &TIMESTAMP },
    Field { name: "value", shape: &SCALED_NUMBER },
    Field { name: "valueSource", shape: &MEASUREMENT_VALUE_SOURCE },
    Field { name: "valueState", shape: &MEASUREMENT_VALUE_STATE },
]);

static MEASUREMENT_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "measurementData",
    element: &MEASUREMENT_DATA,
    key: &["measurementId"],
});

static MEASUREMENT_TYPE: Shape = Shape::Simple(LeafKind::Tag(&[
    "power",
    "energy",
    "current",
    "voltage",
    "frequency",
    "percentage",
    "temperature",
]));
static COMMODITY_TYPE: Shape = Shape::Simple(LeafKind::Tag(&["electricity", "heat", "domesticHotWater", "water"]));
pub static SCOPE_TYPE_NAMES: &[&str] = &[
    "acPower",
    "acPowerTotal",
    "acEnergyConsumed",
    "acEnergyProduced",
    "acCurrent",
    "acVoltage",
    "acFrequency",
    "stateOfCharge",
    "activePowerLimit",
];
static SCOPE_TYPE: Shape = Shape::Simple(LeafKind::Tag(SCOPE_TYPE_NAMES));

pub static MEASUREMENT_DESCRIPTION_DATA: Shape = Shape::Sequence(&[
    Field { name: "measurementId", shape: &UNSIGNED },
    Field { name: "measurementType", shape: &MEASUREMENT_TYPE },
    Field { name: "commodityType", shape: &COMMODITY_TYPE },
    Field { name: "unit", shape: &UNIT },
    Field { name: "scopeType", shape: &SCOPE_TYPE },
]);

static MEASUREMENT_DESCRIPTION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "measurementDescriptionData",
    element: &MEASUREMENT_DESCRIPTION_DATA,
    key: &["measurementId"],
});

pub static MEASUREMENT_CONSTRAINTS_DATA: Shape = Shape::Sequence(&[
    Field { name: "measurementId", shape: &UNSIGNED },
    Field { name: "valueRangeMin", shape: &SCALED_NUMBER },
    Field { name: "valueRangeMax", shape: &SCALED_NUMBER },
    Field { name: "valueStepSize", shape: &SCALED_NUMBER },
]);

static MEASUREMENT_CONSTRAINTS_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "measurementConstraintsData",
    element: &MEASUREMENT_CONSTRAINTS_DATA,
    key: &["measurementId"],
});

// Load control

static LIMIT_TYPE: Shape =
    Shape::Simple(LeafKind::Tag(&["minValueLimit", "maxValueLimit", "signDependentAbsValueLimit"]));
static LIMIT_CATEGORY: Shape = Shape::Simple(LeafKind::Tag(&["obligation", "recommendation", "optimization"]));
static ENERGY_DIRECTION: Shape = Shape::Simple(LeafKind::Tag(&["consume", "produce"]));

pub static LOAD_CONTROL_LIMIT_DATA: Shape = Shape::Sequence(&[
    Field { name: "limitId", shape: &UNSIGNED },
    Field { name: "isLimitChangeable", shape: &BOOL },
    Field { name: "isLimitActive", shape: &BOOL },
    Field { name: "timePeriod", shape: &TIME_PERIOD },
    Field { name: "value", shape: &SCALED_NUMBER },
]);

static LOAD_CONTROL_LIMIT_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "loadControlLimitData",
    element: &LOAD_CONTROL_LIMIT_DATA,
    key: &["limitId"],
});

pub static LOAD_CONTROL_LIMIT_DESCRIPTION_DATA: Shape = Shape::Sequence(&[
    Field { name: "limitId", shape: &UNSIGNED },
    Field { name: "limitType", shape: &LIMIT_TYPE },
    Field { name: "limitCategory", shape: &LIMIT_CATEGORY },
    Field { name: "limitDirection", shape: &ENERGY_DIRECTION },
    Field { name: "measurementId", shape: &UNSIGNED },
    Field { name: "unit", shape: &UNIT },
    Field { name: "scopeType", shape: &SCOPE_TYPE },
]);

static LOAD_CONTROL_LIMIT_DESCRIPTION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "loadControlLimitDescriptionData",
    element: &LOAD_CONTROL_LIMIT_DESCRIPTION_DATA,
    key: &["limitId"],
});

// Device configuration

static KEY_VALUE_VALUE: Shape = Shape::Sequence(&[
    Field { name: "boolean", shape: &BOOL },
    Field { name: "scaledNumber", shape: &SCALED_NUMBER },
    Field { name: "string", shape: &TEXT },
    Field { name: "duration", shape: &DURATION },
]);

pub static DEVICE_CONFIGURATION_KEY_VALUE_DATA: Shape = Shape::Sequence(&[
    Field { name: "keyId", shape: &UNSIGNED },
    Field { name: "value", shape: &KEY_VALUE_VALUE },
    Field { name: "isValueChangeable", shape: &BOOL },
]);

static DEVICE_CONFIGURATION_KEY_VALUE_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "deviceConfigurationKeyValueData",
    element: &DEVICE_CONFIGURATION_KEY_VALUE_DATA,
    key: &["keyId"],
});

pub static KEY_NAME_NAMES: &[&str] = &[
    "peakPowerOfPvSystem",
    "pvCurtailmentLimitFactor",
    "failsafeConsumptionActivePowerLimit",
    "failsafeProductionActivePowerLimit",
    "failsafeDurationMinimum",
];
static KEY_NAME: Shape = Shape::Simple(LeafKind::Tag(KEY_NAME_NAMES));
static KEY_VALUE_TYPE: Shape = Shape::Simple(LeafKind::Tag(&[
    "boolean",
    "date",
    "dateTime",
    "duration",
    "string",
    "time",
    "scaledNumber",
]));

pub static DEVICE_CONFIGURATION_KEY_VALUE_DESCRIPTION_DATA: Shape = Shape::Sequence(&[
    Field { name: "keyId", shape: &UNSIGNED },
    Field { name: "keyName", shape: &KEY_NAME },
    Field { name: "valueType", shape: &KEY_VALUE_TYPE },
    Field { name: "unit", shape: &UNIT },
]);

static DEVICE_CONFIGURATION_KEY_VALUE_DESCRIPTION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "deviceConfigurationKeyValueDescriptionData",
    element: &DEVICE_CONFIGURATION_KEY_VALUE_DESCRIPTION_DATA,
    key: &["keyId"],
});

// Electrical connection

static POWER_SUPPLY_TYPE: Shape = Shape::Simple(LeafKind::Tag(&["ac", "dc"]));

pub static ELECTRICAL_CONNECTION_DESCRIPTION_DATA: Shape = Shape::Sequence(&[
    Field { name: "electricalConnectionId", shape: &UNSIGNED },
    Field { name: "powerSupplyType", shape: &POWER_SUPPLY_TYPE },
    Field { name: "acConnectedPhases", shape: &UNSIGNED },
    Field { name: "positiveEnergyDirection", shape: &ENERGY_DIRECTION },
]);

static ELECTRICAL_CONNECTION_DESCRIPTION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "electricalConnectionDescriptionData",
    element: &ELECTRICAL_CONNECTION_DESCRIPTION_DATA,
    key: &["electricalConnectionId"],
});

static AC_MEASURED_PHASES: Shape = Shape::Simple(LeafKind::Tag(&["a", "b", "c", "abc", "neutral"]));
static AC_MEASUREMENT_TYPE: Shape =
    Shape::Simple(LeafKind::Tag(&["real", "reactive", "apparent", "phase", "frequency"]));

pub static ELECTRICAL_CONNECTION_PARAMETER_DESCRIPTION_DATA: Shape = Shape::Sequence(&[
    Field { name: "electricalConnectionId", shape: &UNSIGNED },
    Field { name: "parameterId", shape: &UNSIGNED },
    Field { name: "measurementId", shape: &UNSIGNED },
    Field { name: "voltageType", shape: &POWER_SUPPLY_TYPE },
    Field { name: "acMeasuredPhases", shape: &AC_MEASURED_PHASES },
    Field { name: "acMeasurementType", shape: &AC_MEASUREMENT_TYPE },
    Field { name: "scopeType", shape: &SCOPE_TYPE },
]);

static ELECTRICAL_CONNECTION_PARAMETER_DESCRIPTION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "electricalConnectionParameterDescriptionData",
    element: &ELECTRICAL_CONNECTION_PARAMETER_DESCRIPTION_DATA,
    key: &["electricalConnectionId", "parameterId"],
});

static SCALED_NUMBER_LIST: Shape = Shape::List(ListShape { element: &SCALED_NUMBER, key: &[] });
static SCALED_NUMBER_RANGE_LIST: Shape = Shape::List(ListShape { element: &SCALED_NUMBER_RANGE, key: &[] });

static PERMITTED_VALUE_SET: Shape = Shape::Sequence(&[
    Field { name: "value", shape: &SCALED_NUMBER_LIST },
    Field { name: "range", shape: &SCALED_NUMBER_RANGE_LIST },
]);

static PERMITTED_VALUE_SET_LIST: Shape = Shape::List(ListShape { element: &PERMITTED_VALUE_SET, key: &[] });

pub static ELECTRICAL_CONNECTION_PERMITTED_VALUE_SET_DATA: Shape = Shape::Sequence(&[
    Field { name: "electricalConnectionId", shape: &UNSIGNED },
    Field { name: "parameterId", shape: &UNSIGNED },
    Field { name: "permittedValueSet", shape: &PERMITTED_VALUE_SET_LIST },
]);

static ELECTRICAL_CONNECTION_PERMITTED_VALUE_SET_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "electricalConnectionPermittedValueSetData",
    element: &ELECTRICAL_CONNECTION_PERMITTED_VALUE_SET_DATA,
    key: &["electricalConnectionId", "parameterId"],
});

static CHARACTERISTIC_CONTEXT: Shape = Shape::Simple(LeafKind::Tag(&["entity", "inverter", "pvString", "battery"]));
static CHARACTERISTIC_TYPE: Shape = Shape::Simple(LeafKind::Tag(&[
    "powerConsumptionMax",
    "powerProductionMax",
    "energyCapacityNominalMax",
    "contractualConsumptionNominalMax",
    "contractualProductionNominalMax",
]));

pub static ELECTRICAL_CONNECTION_CHARACTERISTIC_DATA: Shape = Shape::Sequence(&[
    Field { name: "electricalConnectionId", shape: &UNSIGNED },
    Field { name: "parameterId", shape: &UNSIGNED },
    Field { name: "characteristicId", shape: &UNSIGNED },
    Field { name: "characteristicContext", shape: &CHARACTERISTIC_CONTEXT },
    Field { name: "characteristicType", shape: &CHARACTERISTIC_TYPE },
    Field { name: "value", shape: &SCALED_NUMBER },
    Field { name: "unit", shape: &UNIT },
]);

static ELECTRICAL_CONNECTION_CHARACTERISTIC_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "electricalConnectionCharacteristicData",
    element: &ELECTRICAL_CONNECTION_CHARACTERISTIC_DATA,
    key: &["electricalConnectionId", "parameterId", "characteristicId"],
});

// Device classification / diagnosis

static POWER_SOURCE: Shape =
    Shape::Simple(LeafKind::Tag(&["unknown", "mainsSinglePhase", "mains3Phase", "battery", "dc"]));

static DEVICE_CLASSIFICATION_MANUFACTURER_DATA: Shape = Shape::Sequence(&[
    Field { name: "deviceName", shape: &TEXT },
    Field { name: "deviceCode", shape: &TEXT },
    Field { name: "serialNumber", shape: &TEXT },
    Field { name: "softwareRevision", shape: &TEXT },
    Field { name: "hardwareRevision", shape: &TEXT },
    Field { name: "vendorName", shape: &TEXT },
    Field { name: "vendorCode", shape: &TEXT },
    Field { name: "brandName", shape: &TEXT },
    Field { name: "powerSource", shape: &POWER_SOURCE },
]);

static DEVICE_DIAGNOSIS_HEARTBEAT_DATA: Shape = Shape::Sequence(&[
    Field { name: "timestamp", shape: &TIMESTAMP },
    Field { name: "heartbeatCounter", shape: &UNSIGNED },
    Field { name: "heartbeatTimeout", shape: &DURATION },
]);

static OPERATING_STATE: Shape = Shape::Simple(LeafKind::Tag(&[
    "normalOperation",
    "standby",
    "failure",
    "serviceNeeded",
    "overrideDetected",
    "inAlarm",
    "notReachable",
]));

static DEVICE_DIAGNOSIS_STATE_DATA: Shape = Shape::Sequence(&[
    Field { name: "operatingState", shape: &OPERATING_STATE },
    Field { name: "lastErrorCode", shape: &TEXT },
]);

// Node management

static OPERATIONS_PARTIAL: Shape = Shape::Sequence(&[Field { name: "partial", shape: &EMPTY }]);

pub static POSSIBLE_OPERATIONS: Shape = Shape::Sequence(&[
    Field { name: "read", shape: &OPERATIONS_PARTIAL },
    Field { name: "write", shape: &OPERATIONS_PARTIAL },
]);

pub static FUNCTION_PROPERTY: Shape = Shape::Sequence(&[
    Field { name: "function", shape: &TEXT },
    Field { name: "possibleOperations", shape: &POSSIBLE_OPERATIONS },
]);

static FUNCTION_PROPERTY_LIST: Shape = Shape::List(ListShape {
    element: &FUNCTION_PROPERTY,
    key: &["function"],
});

pub static DEVICE_DESCRIPTION: Shape = Shape::Sequence(&[
    Field { name: "deviceAddress", shape: &DEVICE_ADDRESS },
    Field { name: "deviceType", shape: &DEVICE_TYPE },
    Field { name: "networkFeatureSet", shape: &NETWORK_FEATURE_SET },
]);

pub static DEVICE_INFORMATION: Shape = Shape::Sequence(&[Field { name: "description", shape: &DEVICE_DESCRIPTION }]);

pub static ENTITY_DESCRIPTION: Shape = Shape::Sequence(&[
    Field { name: "entityAddress", shape: &ENTITY_ADDRESS },
    Field { name: "entityType", shape: &ENTITY_TYPE },
    Field { name: "description", shape: &TEXT },
]);

pub static ENTITY_INFORMATION: Shape = Shape::Sequence(&[Field { name: "description", shape: &ENTITY_DESCRIPTION }]);

static ENTITY_INFORMATION_LIST: Shape = Shape::List(ListShape {
    element: &ENTITY_INFORMATION,
    key: &["description.entityAddress"],
});

pub static FEATURE_DESCRIPTION: Shape = Shape::Sequence(&[
    Field { name: "featureAddress", shape: &FEATURE_ADDRESS },
    Field { name: "featureType", shape: &FEATURE_TYPE },
    Field { name: "role", shape: &ROLE },
    Field { name: "supportedFunction", shape: &FUNCTION_PROPERTY_LIST },
    Field { name: "description", shape: &TEXT },
]);

pub static FEATURE_INFORMATION: Shape = Shape::Sequence(&[Field { name: "description", shape: &FEATURE_DESCRIPTION }]);

static FEATURE_INFORMATION_LIST: Shape = Shape::List(ListShape {
    element: &FEATURE_INFORMATION,
    key: &["description.featureAddress"],
});

static SPECIFICATION_VERSION_LIST: Shape = Shape::List(ListShape { element: &TEXT, key: &[] });

static SPECIFICATION_VERSION_LIST_DATA: Shape =
    Shape::Sequence(&[Field { name: "specificationVersion", shape: &SPECIFICATION_VERSION_LIST }]);

static NODE_MANAGEMENT_DETAILED_DISCOVERY_DATA: Shape = Shape::Sequence(&[
    Field { name: "specificationVersionList", shape: &SPECIFICATION_VERSION_LIST_DATA },
    Field { name: "deviceInformation", shape: &DEVICE_INFORMATION },
    Field { name: "entityInformation", shape: &ENTITY_INFORMATION_LIST },
    Field { name: "featureInformation", shape: &FEATURE_INFORMATION_LIST },
]);

static SCENARIO_SUPPORT_LIST: Shape = Shape::List(ListShape { element: &UNSIGNED, key: &[] });

pub static USE_CASE_SUPPORT: Shape = Shape::Sequence(&[
    Field { name: "useCaseName", shape: &USE_CASE_NAME },
    Field { name: "useCaseVersion", shape: &TEXT },
    Field { name: "useCaseDocumentSubRevision", shape: &TEXT },
    Field { name: "useCaseAvailable", shape: &BOOL },
    Field { name: "scenarioSupport", shape: &SCENARIO_SUPPORT_LIST },
]);

static USE_CASE_SUPPORT_LIST: Shape = Shape::List(ListShape {
    element: &USE_CASE_SUPPORT,
    key: &["useCaseName"],
});

pub static USE_CASE_INFORMATION: Shape = Shape::Sequence(&[
    Field { name: "address", shape: &ENTITY_ADDRESS },
    Field { name: "actor", shape: &USE_CASE_ACTOR },
    Field { name: "useCaseSupport", shape: &USE_CASE_SUPPORT_LIST },
]);

static NODE_MANAGEMENT_USE_CASE_DATA: Shape = Shape::Container(ContainerShape {
    field: "useCaseInformation",
    element: &USE_CASE_INFORMATION,
    key: &["address", "actor"],
});

pub static SUBSCRIPTION_ENTRY: Shape = Shape::Sequence(&[
    Field { name: "subscriptionId", shape: &UNSIGNED },
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
]);

static NODE_MANAGEMENT_SUBSCRIPTION_DATA: Shape = Shape::Container(ContainerShape {
    field: "subscriptionEntry",
    element: &SUBSCRIPTION_ENTRY,
    key: &["subscriptionId"],
});

pub static BINDING_ENTRY: Shape = Shape::Sequence(&[
    Field { name: "bindingId", shape: &UNSIGNED },
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
]);

static NODE_MANAGEMENT_BINDING_DATA: Shape = Shape::Container(ContainerShape {
    field: "bindingEntry",
    element: &BINDING_ENTRY,
    key: &["bindingId"],
});

pub static SUBSCRIPTION_MANAGEMENT_REQUEST: Shape = Shape::Sequence(&[
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverFeatureType", shape: &FEATURE_TYPE },
]);

static NODE_MANAGEMENT_SUBSCRIPTION_REQUEST_CALL: Shape =
    Shape::Sequence(&[Field { name: "subscriptionRequest", shape: &SUBSCRIPTION_MANAGEMENT_REQUEST }]);

pub static SUBSCRIPTION_MANAGEMENT_DELETE: Shape = Shape::Sequence(&[
    Field { name: "subscriptionId", shape: &UNSIGNED },
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
]);

static NODE_MANAGEMENT_SUBSCRIPTION_DELETE_CALL: Shape =
    Shape::Sequence(&[Field { name: "subscriptionDelete", shape: &SUBSCRIPTION_MANAGEMENT_DELETE }]);

pub static BINDING_MANAGEMENT_REQUEST: Shape = Shape::Sequence(&[
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverFeatureType", shape: &FEATURE_TYPE },
]);

static NODE_MANAGEMENT_BINDING_REQUEST_CALL: Shape =
    Shape::Sequence(&[Field { name: "bindingRequest", shape: &BINDING_MANAGEMENT_REQUEST }]);

pub static BINDING_MANAGEMENT_DELETE: Shape = Shape::Sequence(&[
    Field { name: "bindingId", shape: &UNSIGNED },
    Field { name: "clientAddress", shape: &FEATURE_ADDRESS },
    Field { name: "serverAddress", shape: &FEATURE_ADDRESS },
]);

static NODE_MANAGEMENT_BINDING_DELETE_CALL: Shape =
    Shape::Sequence(&[Field { name: "bindingDelete", shape: &BINDING_MANAGEMENT_DELETE }]);

pub static DESTINATION_DATA: Shape = Shape::Sequence(&[Field { name: "deviceDescription", shape: &DEVICE_DESCRIPTION }]);

static NODE_MANAGEMENT_DESTINATION_LIST_DATA: Shape = Shape::Container(ContainerShape {
    field: "nodeManagementDestinationData",
    element: &DESTINATION_DATA,
    key: &["deviceDescription.deviceAddress"],
});

static RESULT_DATA: Shape = Shape::Sequence(&[
    Field { name: "errorNumber", shape: &UNSIGNED },
    Field { name: "description", shape: &TEXT },
]);

/// The payload shape declared for a function.
pub fn shape_of(function: Function) -> &'static Shape {
    match function {
        Function::DeviceClassificationManufacturerData => &DEVICE_CLASSIFICATION_MANUFACTURER_DATA,
        Function::DeviceConfigurationKeyValueDescriptionListData => {
            &DEVICE_CONFIGURATION_KEY_VALUE_DESCRIPTION_LIST_DATA
        },
        Function::DeviceConfigurationKeyValueListData => &DEVICE_CONFIGURATION_KEY_VALUE_LIST_DATA,
        Function::DeviceDiagnosisHeartbeatData => &DEVICE_DIAGNOSIS_HEARTBEAT_DATA,
        Function::DeviceDiagnosisStateData => &DEVICE_DIAGNOSIS_STATE_DATA,
        Function::ElectricalConnectionCharacteristicListData => &ELECTRICAL_CONNECTION_CHARACTERISTIC_LIST_DATA,
        Function::ElectricalConnectionDescriptionListData => &ELECTRICAL_CONNECTION_DESCRIPTION_LIST_DATA,
        Function::ElectricalConnectionParameterDescriptionListData => {
            &ELECTRICAL_CONNECTION_PARAMETER_DESCRIPTION_LIST_DATA
        },
        Function::ElectricalConnectionPermittedValueSetListData => &ELECTRICAL_CONNECTION_PERMITTED_VALUE_SET_LIST_DATA,
        Function::LoadControlLimitDescriptionListData => &LOAD_CONTROL_LIMIT_DESCRIPTION_LIST_DATA,
        Function::LoadControlLimitListData => &LOAD_CONTROL_LIMIT_LIST_DATA,
        Function::MeasurementConstraintsListData => &MEASUREMENT_CONSTRAINTS_LIST_DATA,
        Function::MeasurementDescriptionListData => &MEASUREMENT_DESCRIPTION_LIST_DATA,
        Function::MeasurementListData => &MEASUREMENT_LIST_DATA,
        Function::NodeManagementBindingData => &NODE_MANAGEMENT_BINDING_DATA,
        Function::NodeManagementBindingDeleteCall => &NODE_MANAGEMENT_BINDING_DELETE_CALL,
        Function::NodeManagementBindingRequestCall => &NODE_MANAGEMENT_BINDING_REQUEST_CALL,
        Function::NodeManagementDestinationListData => &NODE_MANAGEMENT_DESTINATION_LIST_DATA,
        Function::NodeManagementDetailedDiscoveryData => &NODE_MANAGEMENT_DETAILED_DISCOVERY_DATA,
        Function::NodeManagementSubscriptionData => &NODE_MANAGEMENT_SUBSCRIPTION_DATA,
        Function::NodeManagementSubscriptionDeleteCall => &NODE_MANAGEMENT_SUBSCRIPTION_DELETE_CALL,
        Function::NodeManagementSubscriptionRequestCall => &NODE_MANAGEMENT_SUBSCRIPTION_REQUEST_CALL,
        Function::NodeManagementUseCaseData => &NODE_MANAGEMENT_USE_CASE_DATA,
        Function::ResultData => &RESULT_DATA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_functions_declare_their_keys() {
        let (_, key) = shape_of(Function::MeasurementListData).element().unwrap();
        assert_eq!(key, &["measurementId"]);
        let (_, key) = shape_of(Function::LoadControlLimitListData).element().unwrap();
        assert_eq!(key, &["limitId"]);
        let (_, key) = shape_of(Function::DeviceConfigurationKeyValueListData).element().unwrap();
        assert_eq!(key, &["keyId"]);
    }

    #[test]
    fn list_keys_resolve_within_their_element_shapes() {
        for function in Function::ALL {
            if let Some((element, key)) = shape_of(*function).element() {
                for path in key {
                    assert!(
                        element.lookup_path(path).is_some(),
                        "key `{}` of {} does not resolve",
                        path,
                        function.wire_name()
                    );
                }
            }
        }
    }

    #[test]
    fn sequence_functions_have_no_element_key() {
        assert!(shape_of(Function::DeviceDiagnosisHeartbeatData).element().is_none());
        assert!(shape_of(Function::ResultData).element().is_none());
    }
}
