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

//! Build and parse `nodeManagementDetailedDiscoveryData`: the complete
//! description of a device's entities and features a peer uses to mirror
//! it.

use eebus_common::EebusError;

use crate::{
    entity::{EntityLocal, EntityType},
    feature::{FeatureType, Operations, Role},
    model::{shapes, DeviceAddress, EntityAddress, FeatureAddress, Function, Leaf, Value, SPECIFICATION_VERSION},
};

/// A device tree parsed from a discovery payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub address: Option<DeviceAddress>,
    pub device_type: Option<u32>,
    pub entities: Vec<DiscoveredEntity>,
    pub features: Vec<DiscoveredFeature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredEntity {
    pub address: EntityAddress,
    pub entity_type: Option<EntityType>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredFeature {
    pub address: FeatureAddress,
    pub feature_type: Option<FeatureType>,
    pub role: Role,
    pub functions: Vec<(Function, Operations)>,
}

/// Render the local device tree as a discovery payload.
pub fn build(
    device_address: &DeviceAddress,
    device_type: u32,
    network_feature_set: u32,
    entities: &[EntityLocal],
) -> Value {
    let device_description = Value::Sequence(vec![
        Some(Value::Sequence(vec![Some(Value::Simple(Leaf::Text(
            device_address.as_str().to_string(),
        )))])),
        Some(Value::Simple(Leaf::Tag(device_type))),
        Some(Value::Simple(Leaf::Tag(network_feature_set))),
    ]);

    let entity_information = entities
        .iter()
        .map(|entity| {
            let description = Value::Sequence(vec![
                Some(entity.address().to_value()),
                Some(Value::Simple(Leaf::Tag(entity.entity_type().tag_index()))),
                None,
            ]);
            Value::Sequence(vec![Some(description)])
        })
        .collect();

    let feature_information = entities
        .iter()
        .flat_map(|entity| entity.features().iter())
        .map(|feature| {
            let supported = feature
                .functions()
                .map(|(function, entry)| {
                    Value::Sequence(vec![
                        Some(Value::Simple(Leaf::Text(function.wire_name().to_string()))),
                        Some(entry.operations.to_value()),
                    ])
                })
                .collect();
            let description = Value::Sequence(vec![
                Some(feature.address().to_value()),
                Some(Value::Simple(Leaf::Tag(feature.feature_type().tag_index()))),
                Some(Value::Simple(Leaf::Tag(feature.role().tag_index()))),
                Some(Value::List(supported)),
                feature
                    .description()
                    .map(|text| Value::Simple(Leaf::Text(text.to_string()))),
            ]);
            Value::Sequence(vec![Some(description)])
        })
        .collect();

    let version_list = Value::Sequence(vec![Some(Value::List(vec![Value::Simple(Leaf::Text(
        SPECIFICATION_VERSION.to_string(),
    ))]))]);

    Value::Sequence(vec![
        Some(version_list),
        Some(Value::Sequence(vec![Some(device_description)])),
        Some(Value::List(entity_information)),
        Some(Value::List(feature_information)),
    ])
}

/// Parse a peer's discovery payload into a device tree description.
pub fn parse(data: &Value) -> Result<DiscoveredDevice, EebusError> {
    let shape = Function::NodeManagementDetailedDiscoveryData.shape();
    let bad = |what: &str| EebusError::parse(format!("malformed detailed discovery: {}", what));

    let device_description = data
        .field(shape, "deviceInformation")
        .and_then(|info| info.field(&shapes::DEVICE_INFORMATION, "description"));
    let (address, device_type) = match device_description {
        Some(description) => {
            let address = description
                .field(&shapes::DEVICE_DESCRIPTION, "deviceAddress")
                .and_then(|a| a.field(&shapes::DEVICE_ADDRESS, "device"))
                .and_then(Value::as_text)
                .map(DeviceAddress::new);
            let device_type = description
                .field(&shapes::DEVICE_DESCRIPTION, "deviceType")
                .and_then(Value::as_tag);
            (address, device_type)
        },
        None => (None, None),
    };

    let mut entities = Vec::new();
    if let Some(items) = data.field(shape, "entityInformation").and_then(Value::elements) {
        for item in items {
            let description = item
                .field(&shapes::ENTITY_INFORMATION, "description")
                .ok_or_else(|| bad("entity without description"))?;
            let entity_address = description
                .field(&shapes::ENTITY_DESCRIPTION, "entityAddress")
                .and_then(EntityAddress::from_value)
                .ok_or_else(|| bad("entity without address"))?;
            let entity_type = description
                .field(&shapes::ENTITY_DESCRIPTION, "entityType")
                .and_then(Value::as_tag)
                .and_then(EntityType::from_tag_index);
            entities.push(DiscoveredEntity {
                address: entity_address,
                entity_type,
            });
        }
    }

    let mut features = Vec::new();
    if let Some(items) = data.field(shape, "featureInformation").and_then(Value::elements) {
        for item in items {
            let description = item
                .field(&shapes::FEATURE_INFORMATION, "description")
                .ok_or_else(|| bad("feature without description"))?;
            let feature_address = description
                .field(&shapes::FEATURE_DESCRIPTION, "featureAddress")
                .and_then(FeatureAddress::from_value)
                .ok_or_else(|| bad("feature without address"))?;
            let feature_type = description
                .field(&shapes::FEATURE_DESCRIPTION, "featureType")
                .and_then(Value::as_tag)
                .and_then(FeatureType::from_tag_index);
            let role = description
                .field(&shapes::FEATURE_DESCRIPTION, "role")
                .and_then(Value::as_tag)
                .and_then(Role::from_tag_index)
                .ok_or_else(|| bad("feature without role"))?;
            let mut functions = Vec::new();
            if let Some(supported) = description
                .field(&shapes::FEATURE_DESCRIPTION, "supportedFunction")
                .and_then(Value::elements)
            {
                for property in supported {
                    let function = property
                        .field(&shapes::FUNCTION_PROPERTY, "function")
                        .and_then(Value::as_text)
                        .and_then(Function::from_wire_name);
                    // Functions this implementation does not model are skipped
                    let function = match function {
                        Some(function) => function,
                        None => continue,
                    };
                    let operations = property
                        .field(&shapes::FUNCTION_PROPERTY, "possibleOperations")
                        .map(Operations::from_value)
                        .unwrap_or_else(Operations::empty);
                    functions.push((function, operations));
                }
            }
            features.push(DiscoveredFeature {
                address: feature_address,
                feature_type,
                role,
                functions,
            });
        }
    }

    Ok(DiscoveredDevice {
        address,
        device_type,
        entities,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityLocal;

    #[test]
    fn a_built_tree_parses_back() {
        let device_address = DeviceAddress::new("d:_n:Demo_123456");
        let mut root = EntityLocal::new(
            EntityAddress::root(Some(device_address.clone())),
            EntityType::DeviceInformation,
        );
        root.add_feature(FeatureType::NodeManagement, Role::Special);
        let mut appliance = EntityLocal::new(
            EntityAddress::new(Some(device_address.clone()), vec![1]),
            EntityType::HeatPumpAppliance,
        );
        let measurement = appliance.add_feature(FeatureType::Measurement, Role::Server);
        appliance
            .feature_mut(measurement.feature)
            .unwrap()
            .add_function(Function::MeasurementListData, Operations::read())
            .unwrap();

        let data = build(&device_address, 1, 0, &[root, appliance]);
        let parsed = parse(&data).unwrap();

        assert_eq!(parsed.address, Some(device_address));
        assert_eq!(parsed.device_type, Some(1));
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.features.len(), 2);
        let feature = parsed.features.iter().find(|f| f.address == measurement).unwrap();
        assert_eq!(feature.feature_type, Some(FeatureType::Measurement));
        assert_eq!(feature.role, Role::Server);
        assert_eq!(feature.functions, vec![(Function::MeasurementListData, Operations::read())]);
    }
}
