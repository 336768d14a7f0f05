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

//! Operations on the `nodeManagementUseCaseData` payload: the list of
//! `{entity address, actor, supported use cases}` records a device
//! advertises.

use std::fmt::{Display, Error, Formatter};

use eebus_common::EebusError;

use crate::model::{shapes, value, EntityAddress, Function, Leaf, Value};

/// The role an entity plays within a use case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCaseActor {
    Cem = 0,
    ControllableSystem = 1,
    EnergyGuard = 2,
    MonitoredUnit = 3,
    MonitoringAppliance = 4,
    Battery = 5,
    HeatPump = 6,
    Evse = 7,
    Ev = 8,
    Inverter = 9,
}

impl UseCaseActor {
    pub const ALL: &'static [UseCaseActor] = &[
        UseCaseActor::Cem,
        UseCaseActor::ControllableSystem,
        UseCaseActor::EnergyGuard,
        UseCaseActor::MonitoredUnit,
        UseCaseActor::MonitoringAppliance,
        UseCaseActor::Battery,
        UseCaseActor::HeatPump,
        UseCaseActor::Evse,
        UseCaseActor::Ev,
        UseCaseActor::Inverter,
    ];

    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::USE_CASE_ACTOR_NAMES[*self as usize]
    }
}

impl Display for UseCaseActor {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

/// The registered use-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseCaseName {
    LimitationOfPowerConsumption = 0,
    LimitationOfPowerProduction = 1,
    MonitoringAppliance = 2,
    MonitoringOfPowerConsumption = 3,
    OptimizationOfSelfConsumptionDuringEvCharging = 4,
    VisualizationOfAggregatedBatteryData = 5,
    VisualizationOfAggregatedPhotovoltaicData = 6,
}

impl UseCaseName {
    pub const ALL: &'static [UseCaseName] = &[
        UseCaseName::LimitationOfPowerConsumption,
        UseCaseName::LimitationOfPowerProduction,
        UseCaseName::MonitoringAppliance,
        UseCaseName::MonitoringOfPowerConsumption,
        UseCaseName::OptimizationOfSelfConsumptionDuringEvCharging,
        UseCaseName::VisualizationOfAggregatedBatteryData,
        UseCaseName::VisualizationOfAggregatedPhotovoltaicData,
    ];

    pub fn tag_index(&self) -> u32 {
        *self as u32
    }

    pub fn wire_name(&self) -> &'static str {
        shapes::USE_CASE_NAME_NAMES[*self as usize]
    }
}

impl Display for UseCaseName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

/// One advertised use case: name, version, revision, availability and the
/// supported scenario numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseSupport {
    pub name: UseCaseName,
    pub version: String,
    pub sub_revision: String,
    pub available: bool,
    pub scenarios: Vec<u32>,
}

impl UseCaseSupport {
    fn to_value(&self) -> Value {
        Value::Sequence(vec![
            Some(Value::Simple(Leaf::Tag(self.name.tag_index()))),
            Some(Value::Simple(Leaf::Text(self.version.clone()))),
            Some(Value::Simple(Leaf::Text(self.sub_revision.clone()))),
            Some(Value::Simple(Leaf::Bool(self.available))),
            Some(Value::List(
                self.scenarios
                    .iter()
                    .map(|scenario| Value::Simple(Leaf::Unsigned(u64::from(*scenario))))
                    .collect(),
            )),
        ])
    }
}

/// Selects use-case records for removal: the actor always, the name only
/// when given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UseCaseFilter {
    pub actor: UseCaseActor,
    pub name: Option<UseCaseName>,
}

fn info_matches(info: &Value, address: Option<&EntityAddress>, actor: Option<UseCaseActor>) -> bool {
    let shape = &shapes::USE_CASE_INFORMATION;
    if let Some(address) = address {
        match info.field(shape, "address").and_then(EntityAddress::from_value) {
            Some(info_address) if info_address.entity == address.entity => {},
            _ => return false,
        }
    }
    if let Some(actor) = actor {
        if info.field(shape, "actor").and_then(Value::as_tag) != Some(actor.tag_index()) {
            return false;
        }
    }
    true
}

fn info_has_name(info: &Value, name: UseCaseName) -> bool {
    info.field(&shapes::USE_CASE_INFORMATION, "useCaseSupport")
        .and_then(Value::elements)
        .map(|supports| {
            supports.iter().any(|support| {
                support.field(&shapes::USE_CASE_SUPPORT, "useCaseName").and_then(Value::as_tag) ==
                    Some(name.tag_index())
            })
        })
        .unwrap_or(false)
}

/// Merge a use-case support into the cache; an existing record for the
/// same entity address and actor absorbs it.
pub fn add_support(
    cache: &mut Option<Value>,
    address: &EntityAddress,
    actor: UseCaseActor,
    support: UseCaseSupport,
) -> Result<(), EebusError> {
    let shape = Function::NodeManagementUseCaseData.shape();
    let data = cache.get_or_insert_with(|| Value::empty(shape));
    let items = data
        .elements_mut()
        .ok_or_else(|| EebusError::input("use-case cache is not a list"))?;
    match items
        .iter_mut()
        .find(|info| info_matches(info, Some(address), Some(actor)))
    {
        Some(info) => {
            let supports = info
                .field(&shapes::USE_CASE_INFORMATION, "useCaseSupport")
                .cloned()
                .unwrap_or(Value::List(Vec::new()));
            let mut supports = supports;
            let support_value = support.to_value();
            match supports.elements_mut().and_then(|elements| {
                elements.iter_mut().find(|existing| {
                    existing.field(&shapes::USE_CASE_SUPPORT, "useCaseName").and_then(Value::as_tag) ==
                        Some(support.name.tag_index())
                })
            }) {
                Some(existing) => *existing = support_value,
                None => supports.elements_mut().expect("is a list").push(support_value),
            }
            info.set_field(&shapes::USE_CASE_INFORMATION, "useCaseSupport", supports)?;
        },
        None => {
            let info = Value::Sequence(vec![
                Some(address.to_value()),
                Some(Value::Simple(Leaf::Tag(actor.tag_index()))),
                Some(Value::List(vec![support.to_value()])),
            ]);
            items.push(info);
        },
    }
    Ok(())
}

/// Remove every record for the given entity address (device-wide filter).
pub fn remove_for_address(cache: &mut Option<Value>, address: &EntityAddress) -> Result<(), EebusError> {
    let data = cache.as_mut().ok_or(EebusError::NoChange)?;
    let items = data.elements_mut().ok_or(EebusError::NoChange)?;
    let before = items.len();
    items.retain(|info| !info_matches(info, Some(address), None));
    if items.len() == before {
        return Err(EebusError::NoChange);
    }
    Ok(())
}

/// Remove the records matching any of the `{actor, name}` filters.
pub fn remove_with_filters(
    cache: &mut Option<Value>,
    address: &EntityAddress,
    filters: &[UseCaseFilter],
) -> Result<(), EebusError> {
    let data = cache.as_mut().ok_or(EebusError::NoChange)?;
    let items = data.elements_mut().ok_or(EebusError::NoChange)?;
    let before = items.len();
    items.retain(|info| {
        !filters.iter().any(|filter| {
            info_matches(info, Some(address), Some(filter.actor)) &&
                filter.name.map(|name| info_has_name(info, name)).unwrap_or(true)
        })
    });
    if items.len() == before {
        return Err(EebusError::NoChange);
    }
    Ok(())
}

/// Flip the availability flag of one advertised use case.
pub fn set_available(
    cache: &mut Option<Value>,
    address: &EntityAddress,
    actor: UseCaseActor,
    name: UseCaseName,
    available: bool,
) -> Result<(), EebusError> {
    let data = cache.as_mut().ok_or(EebusError::NoChange)?;
    let items = data.elements_mut().ok_or(EebusError::NoChange)?;
    for info in items.iter_mut().filter(|info| info_matches(info, Some(address), Some(actor))) {
        let mut supports = match info.field(&shapes::USE_CASE_INFORMATION, "useCaseSupport") {
            Some(supports) => supports.clone(),
            None => continue,
        };
        if let Some(elements) = supports.elements_mut() {
            for support in elements.iter_mut() {
                if support.field(&shapes::USE_CASE_SUPPORT, "useCaseName").and_then(Value::as_tag) ==
                    Some(name.tag_index())
                {
                    support.set_field(&shapes::USE_CASE_SUPPORT, "useCaseAvailable", Value::Simple(Leaf::Bool(available)))?;
                    info.set_field(&shapes::USE_CASE_INFORMATION, "useCaseSupport", supports)?;
                    return Ok(());
                }
            }
        }
    }
    Err(EebusError::NoChange)
}

/// Whether a use case is advertised for the entity address and actor.
pub fn has_support(cache: &Option<Value>, address: &EntityAddress, actor: UseCaseActor, name: UseCaseName) -> bool {
    let data = match cache {
        Some(data) => data,
        None => return false,
    };
    value::list_match_iter(Function::NodeManagementUseCaseData.shape(), data, &Value::Sequence(vec![None, None, None]))
        .any(|info| info_matches(info, Some(address), Some(actor)) && info_has_name(info, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceAddress;

    fn entity() -> EntityAddress {
        EntityAddress::new(Some(DeviceAddress::new("d:_n:a_1")), vec![1])
    }

    fn support(name: UseCaseName, scenarios: &[u32]) -> UseCaseSupport {
        UseCaseSupport {
            name,
            version: "1.0.0".into(),
            sub_revision: "release".into(),
            available: true,
            scenarios: scenarios.to_vec(),
        }
    }

    #[test]
    fn adding_twice_merges_into_one_record() {
        let mut cache = None;
        add_support(
            &mut cache,
            &entity(),
            UseCaseActor::MonitoredUnit,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1, 2]),
        )
        .unwrap();
        add_support(
            &mut cache,
            &entity(),
            UseCaseActor::MonitoredUnit,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1, 2, 3]),
        )
        .unwrap();
        let items = cache.as_ref().unwrap().elements().unwrap();
        assert_eq!(items.len(), 1);
        let supports = items[0]
            .field(&shapes::USE_CASE_INFORMATION, "useCaseSupport")
            .unwrap()
            .elements()
            .unwrap();
        assert_eq!(supports.len(), 1);
    }

    #[test]
    fn removal_by_actor_filter_keeps_other_actors() {
        let mut cache = None;
        add_support(
            &mut cache,
            &entity(),
            UseCaseActor::MonitoredUnit,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1]),
        )
        .unwrap();
        add_support(
            &mut cache,
            &entity(),
            UseCaseActor::MonitoringAppliance,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1]),
        )
        .unwrap();
        remove_with_filters(&mut cache, &entity(), &[UseCaseFilter {
            actor: UseCaseActor::MonitoredUnit,
            name: None,
        }])
        .unwrap();
        let items = cache.as_ref().unwrap().elements().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].field(&shapes::USE_CASE_INFORMATION, "actor").and_then(Value::as_tag),
            Some(UseCaseActor::MonitoringAppliance.tag_index())
        );
    }

    #[test]
    fn availability_can_be_toggled() {
        let mut cache = None;
        let address = entity();
        add_support(
            &mut cache,
            &address,
            UseCaseActor::MonitoredUnit,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1]),
        )
        .unwrap();
        set_available(&mut cache, &address, UseCaseActor::MonitoredUnit, UseCaseName::MonitoringOfPowerConsumption, false)
            .unwrap();
        assert!(has_support(
            &cache,
            &address,
            UseCaseActor::MonitoredUnit,
            UseCaseName::MonitoringOfPowerConsumption
        ));
    }

    #[test]
    fn device_wide_removal_empties_the_entity() {
        let mut cache = None;
        add_support(
            &mut cache,
            &entity(),
            UseCaseActor::MonitoredUnit,
            support(UseCaseName::MonitoringOfPowerConsumption, &[1]),
        )
        .unwrap();
        remove_for_address(&mut cache, &entity()).unwrap();
        assert!(cache.as_ref().unwrap().elements().unwrap().is_empty());
        assert!(remove_for_address(&mut cache, &entity()).unwrap_err().is_no_change());
    }
}
