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

//! The filtered update algebra applied to function data caches, shared by
//! local features (inbound writes, local mutations) and remote features
//! (inbound replies and notifies).

use eebus_common::EebusError;

use crate::model::{
    datagram::{Filter, FilterControl},
    function::Function,
    value::{self, Value},
};

/// Apply a payload with its filters to a function cache.
///
/// With no filters the cache is replaced wholesale. Filters are applied in
/// order: delete filters evaluate their selectors over the current cache
/// and remove whole elements or clear named sub-fields; partial filters
/// deep-merge the incoming payload, restricted to elements matching their
/// selectors. The merge is idempotent.
pub fn apply_update(
    function: Function,
    cache: &mut Option<Value>,
    incoming: Option<&Value>,
    filters: &[Filter],
) -> Result<(), EebusError> {
    let shape = function.shape();
    if filters.is_empty() {
        let incoming = incoming.ok_or_else(|| EebusError::input("replace update without a payload"))?;
        *cache = Some(incoming.clone());
        return Ok(());
    }

    for filter in filters {
        match filter.control {
            FilterControl::Delete => {
                let cached = match cache.as_mut() {
                    Some(cached) => cached,
                    None => return Err(EebusError::NoChange),
                };
                match (shape.element(), &filter.selectors, &filter.elements) {
                    // Remove whole matching elements
                    (Some(_), Some(selectors), None) => {
                        value::list_remove_matching(shape, cached, selectors);
                    },
                    // Clear named sub-fields within matching elements
                    (Some((element_shape, _)), Some(selectors), Some(elements)) => {
                        if let Some(items) = cached.elements_mut() {
                            for item in items.iter_mut().filter(|item| item.matches(element_shape, selectors)) {
                                value::delete_elements(element_shape, item, elements);
                            }
                        }
                    },
                    // Sequence payloads have no selectors; elements name the
                    // sub-fields to clear
                    (None, None, Some(elements)) => {
                        value::delete_elements(shape, cached, elements);
                    },
                    _ => {
                        return Err(EebusError::input(format!(
                            "invalid delete filter for {}",
                            function.wire_name()
                        )))
                    },
                }
            },
            FilterControl::Partial => {
                let incoming = incoming.ok_or_else(|| EebusError::input("partial update without a payload"))?;
                let cached = cache.get_or_insert_with(|| Value::empty(shape));
                match (&filter.selectors, shape.element()) {
                    (Some(selectors), Some((element_shape, _))) => {
                        let elements = incoming.elements().unwrap_or(&[]);
                        for element in elements {
                            if element.matches(element_shape, selectors) {
                                value::list_upsert(shape, cached, element.clone())?;
                            }
                        }
                    },
                    _ => cached.merge_from(shape, incoming),
                }
            },
        }
    }
    Ok(())
}

/// Produce the payload answering a read: the full cache, or only the
/// elements/sub-fields a partial filter selects.
pub fn apply_read_filter(function: Function, cache: &Value, filter: Option<&Filter>) -> Result<Value, EebusError> {
    let shape = function.shape();
    let filter = match filter {
        None => return Ok(cache.clone()),
        Some(filter) => filter,
    };
    if filter.is_delete() {
        return Err(EebusError::input("a read cannot carry a delete filter"));
    }
    match shape.element() {
        Some((element_shape, _)) => {
            let mut selected: Vec<Value> = match &filter.selectors {
                Some(selectors) => value::list_match_iter(shape, cache, selectors).cloned().collect(),
                None => cache.elements().unwrap_or(&[]).to_vec(),
            };
            if let Some(elements) = &filter.elements {
                selected = selected
                    .into_iter()
                    .map(|element| {
                        let mut projected = Value::empty(element_shape);
                        value::read_elements(element_shape, &element, &mut projected, elements);
                        projected
                    })
                    .collect();
            }
            Ok(match cache {
                Value::List(_) => Value::List(selected),
                _ => Value::Container(selected),
            })
        },
        None => match &filter.elements {
            Some(elements) => {
                let mut projected = Value::empty(shape);
                value::read_elements(shape, cache, &mut projected, elements);
                Ok(projected)
            },
            None => Ok(cache.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        shapes,
        value::{Leaf, Selection},
    };

    fn scaled(number: i64, scale: i64) -> Value {
        Value::Sequence(vec![
            Some(Value::Simple(Leaf::Number(number))),
            Some(Value::Simple(Leaf::Number(scale))),
        ])
    }

    fn limit(limit_id: u64, value: Option<Value>) -> Value {
        let mut element = Value::empty(&shapes::LOAD_CONTROL_LIMIT_DATA);
        element
            .set_field(&shapes::LOAD_CONTROL_LIMIT_DATA, "limitId", Value::Simple(Leaf::Unsigned(limit_id)))
            .unwrap();
        if let Some(value) = value {
            element.set_field(&shapes::LOAD_CONTROL_LIMIT_DATA, "value", value).unwrap();
        }
        element
    }

    fn limit_selector(limit_id: u64) -> Value {
        let mut selector = Value::empty(&shapes::LOAD_CONTROL_LIMIT_DATA);
        selector
            .set_field(&shapes::LOAD_CONTROL_LIMIT_DATA, "limitId", Value::Simple(Leaf::Unsigned(limit_id)))
            .unwrap();
        selector
    }

    fn seeded_cache() -> Option<Value> {
        Some(Value::Container(vec![
            limit(10, Some(scaled(40, 0))),
            limit(25, Some(scaled(60, 0))),
            limit(113, Some(scaled(80, 0))),
        ]))
    }

    #[test]
    fn partial_update_preserves_other_elements() {
        let mut cache = seeded_cache();
        let incoming = Value::Container(vec![limit(113, Some(scaled(95, 1)))]);
        let filter = Filter::partial_with_selectors(limit_selector(113));
        apply_update(Function::LoadControlLimitListData, &mut cache, Some(&incoming), &[filter]).unwrap();

        let items = cache.as_ref().unwrap().elements().unwrap();
        assert_eq!(items.len(), 3);
        let updated = &items[2];
        assert_eq!(
            updated.field(&shapes::LOAD_CONTROL_LIMIT_DATA, "value"),
            Some(&scaled(95, 1))
        );
        assert_eq!(items[0].field(&shapes::LOAD_CONTROL_LIMIT_DATA, "value"), Some(&scaled(40, 0)));
        assert_eq!(items[1].field(&shapes::LOAD_CONTROL_LIMIT_DATA, "value"), Some(&scaled(60, 0)));
    }

    #[test]
    fn delete_by_element_descriptor_clears_only_the_named_subfield() {
        let mut cache = seeded_cache();
        let elements = Selection::from_paths(&shapes::LOAD_CONTROL_LIMIT_DATA, &["value.number"]).unwrap();
        let filter = Filter::delete(Some(limit_selector(10)), Some(elements));
        apply_update(Function::LoadControlLimitListData, &mut cache, None, &[filter]).unwrap();

        let items = cache.as_ref().unwrap().elements().unwrap();
        assert_eq!(items.len(), 3);
        let value = items[0].field(&shapes::LOAD_CONTROL_LIMIT_DATA, "value").unwrap();
        assert_eq!(value.field(&shapes::SCALED_NUMBER, "number"), None);
        assert_eq!(
            value.field(&shapes::SCALED_NUMBER, "scale"),
            Some(&Value::Simple(Leaf::Number(0)))
        );
    }

    #[test]
    fn delete_with_selector_removes_whole_elements() {
        let mut cache = seeded_cache();
        let filter = Filter::delete_with_selectors(limit_selector(25));
        apply_update(Function::LoadControlLimitListData, &mut cache, None, &[filter]).unwrap();
        let items = cache.as_ref().unwrap().elements().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|item| item.field(&shapes::LOAD_CONTROL_LIMIT_DATA, "limitId") !=
                Some(&Value::Simple(Leaf::Unsigned(25)))));
    }

    #[test]
    fn delete_cancels_partial() {
        let elements = Selection::from_paths(&shapes::LOAD_CONTROL_LIMIT_DATA, &["value", "isLimitActive"]).unwrap();
        let partial_filter = Filter::partial_with_selectors(limit_selector(113));
        let delete_filter = Filter::delete(Some(limit_selector(113)), Some(elements));
        let incoming = Value::Container(vec![limit(113, Some(scaled(95, 1)))]);

        let mut with_partial = seeded_cache();
        apply_update(
            Function::LoadControlLimitListData,
            &mut with_partial,
            Some(&incoming),
            &[partial_filter],
        )
        .unwrap();
        apply_update(Function::LoadControlLimitListData, &mut with_partial, None, &[delete_filter.clone()]).unwrap();

        let mut without_partial = seeded_cache();
        apply_update(Function::LoadControlLimitListData, &mut without_partial, None, &[delete_filter]).unwrap();

        assert_eq!(with_partial, without_partial);
    }

    #[test]
    fn no_two_elements_share_a_key_after_any_update_sequence() {
        let mut cache = seeded_cache();
        for _ in 0..3 {
            let incoming = Value::Container(vec![limit(10, Some(scaled(1, 0))), limit(99, None)]);
            apply_update(Function::LoadControlLimitListData, &mut cache, Some(&incoming), &[Filter::partial()])
                .unwrap();
        }
        let items = cache.as_ref().unwrap().elements().unwrap();
        let mut ids: Vec<u64> = items
            .iter()
            .map(|item| {
                item.field(&shapes::LOAD_CONTROL_LIMIT_DATA, "limitId")
                    .and_then(Value::as_unsigned)
                    .unwrap()
            })
            .collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }

    #[test]
    fn read_filter_projects_selected_elements() {
        let cache = seeded_cache().unwrap();
        let filter = Filter::partial_with_selectors(limit_selector(25));
        let reply = apply_read_filter(Function::LoadControlLimitListData, &cache, Some(&filter)).unwrap();
        assert_eq!(reply.elements().unwrap().len(), 1);
    }

    #[test]
    fn delete_without_selectors_or_elements_is_invalid() {
        let mut cache = seeded_cache();
        let filter = Filter::delete(None, None);
        let err = apply_update(Function::LoadControlLimitListData, &mut cache, None, &[filter]).unwrap_err();
        assert!(matches!(err, EebusError::InputArgument(_)));
    }
}
