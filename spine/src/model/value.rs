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

//! The discriminated value tree and the generic record operations.
//!
//! A [`Value`] is only meaningful together with its [`Shape`]: sequences
//! store their fields positionally (parallel to the shape's field table)
//! with `None` marking an absent field — absence is always distinct from a
//! zero value and survives every operation here.

use chrono::{DateTime, Duration, Utc};
use eebus_common::EebusError;

use crate::model::shape::Shape;

/// A leaf scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Bool(bool),
    Number(i64),
    Unsigned(u64),
    /// Index into the shape's declared tag name table.
    Tag(u32),
    Text(String),
    Bytes(Vec<u8>),
    Duration(Duration),
    Timestamp(DateTime<Utc>),
}

/// One node of a record tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Simple(Leaf),
    /// Fields positionally parallel to the sequence shape; `None` = absent.
    Sequence(Vec<Option<Value>>),
    List(Vec<Value>),
    Container(Vec<Value>),
}

impl Value {
    /// A value of the given shape with every optional part absent.
    pub fn empty(shape: &Shape) -> Value {
        match shape {
            Shape::Simple(_) => Value::Sequence(Vec::new()),
            Shape::Sequence(fields) => Value::Sequence(vec![None; fields.len()]),
            Shape::List(_) => Value::List(Vec::new()),
            Shape::Container(_) => Value::Container(Vec::new()),
        }
    }

    pub fn sequence(fields: Vec<Option<Value>>) -> Value {
        Value::Sequence(fields)
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Value::Simple(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self.as_leaf() {
            Some(Leaf::Unsigned(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self.as_leaf() {
            Some(Leaf::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self.as_leaf() {
            Some(Leaf::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<u32> {
        match self.as_leaf() {
            Some(Leaf::Tag(t)) => Some(*t),
            _ => None,
        }
    }

    /// The elements of a list or container node.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Container(items) => Some(items),
            _ => None,
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) | Value::Container(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a field of a sequence value by name via the shape.
    pub fn field<'a>(&'a self, shape: &Shape, name: &str) -> Option<&'a Value> {
        let index = shape.field_index(name)?;
        match self {
            Value::Sequence(fields) => fields.get(index)?.as_ref(),
            _ => None,
        }
    }

    /// Set a field of a sequence value by name, growing the positional
    /// vector if the value was created against an older shape.
    pub fn set_field(&mut self, shape: &Shape, name: &str, value: Value) -> Result<(), EebusError> {
        let index = shape
            .field_index(name)
            .ok_or_else(|| EebusError::input(format!("unknown field `{}`", name)))?;
        match self {
            Value::Sequence(fields) => {
                if fields.len() < shape.fields().len() {
                    fields.resize(shape.fields().len(), None);
                }
                fields[index] = Some(value);
                Ok(())
            },
            _ => Err(EebusError::input(format!("`{}` is not a sequence field", name))),
        }
    }

    /// Resolve a dotted path through nested sequences.
    pub fn lookup_path<'a>(&'a self, shape: &'static Shape, path: &str) -> Option<&'a Value> {
        let mut value = self;
        let mut shape = shape;
        for segment in path.split('.') {
            let field = shape.field(segment)?;
            value = value.field(shape, segment)?;
            shape = field.shape;
        }
        Some(value)
    }

    /// Deep partial merge: fields present in `incoming` overwrite or merge
    /// into `self`; fields absent from `incoming` are preserved. List
    /// elements merge by key identity. Applying the same merge twice leaves
    /// the value unchanged.
    pub fn merge_from(&mut self, shape: &'static Shape, incoming: &Value) {
        match (shape, incoming) {
            (Shape::Sequence(fields), Value::Sequence(new_fields)) => {
                let own = match self {
                    Value::Sequence(own) => own,
                    other => {
                        *other = incoming.clone();
                        return;
                    },
                };
                if own.len() < fields.len() {
                    own.resize(fields.len(), None);
                }
                for (index, field) in fields.iter().enumerate() {
                    let new_value = match new_fields.get(index).and_then(|v| v.as_ref()) {
                        Some(v) => v,
                        None => continue,
                    };
                    match own[index].as_mut() {
                        Some(existing) => existing.merge_from(field.shape, new_value),
                        None => own[index] = Some(new_value.clone()),
                    }
                }
            },
            (Shape::List(_), _) | (Shape::Container(_), _) => {
                let (element_shape, key) = shape.element().expect("list-like shape");
                // Keyless elements have no identity to merge on, so the
                // incoming list replaces the cached one wholesale.
                if key.is_empty() {
                    *self = incoming.clone();
                    return;
                }
                let incoming_elements = match incoming.elements() {
                    Some(elements) => elements,
                    None => return,
                };
                for element in incoming_elements {
                    list_upsert_inner(self, element_shape, key, element.clone());
                }
            },
            (_, _) => *self = incoming.clone(),
        }
    }

    /// True when every field present in `selector` equals the corresponding
    /// field of `self`; absent selector fields mean "don't care".
    pub fn matches(&self, shape: &'static Shape, selector: &Value) -> bool {
        match (shape, selector) {
            (Shape::Sequence(fields), Value::Sequence(selector_fields)) => {
                let own = match self {
                    Value::Sequence(own) => own,
                    _ => return false,
                };
                for (index, field) in fields.iter().enumerate() {
                    let wanted = match selector_fields.get(index).and_then(|v| v.as_ref()) {
                        Some(v) => v,
                        None => continue,
                    };
                    match own.get(index).and_then(|v| v.as_ref()) {
                        Some(actual) if actual.matches(field.shape, wanted) => {},
                        _ => return false,
                    }
                }
                true
            },
            _ => self == selector,
        }
    }
}

/// Marks the sub-fields an operation targets within a record.
///
/// This is the parsed form of the wire's `...Elements` descriptors: a tree
/// whose marked leaves name the fields to read or clear.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The whole node is marked.
    All,
    /// Marked sub-fields of a sequence, by field index.
    Fields(Vec<(usize, Selection)>),
}

impl Selection {
    /// Build a selection from dotted paths resolved against the shape.
    pub fn from_paths(shape: &'static Shape, paths: &[&str]) -> Result<Selection, EebusError> {
        let mut selection = Selection::Fields(Vec::new());
        for path in paths {
            selection.mark_path(shape, path)?;
        }
        Ok(selection)
    }

    fn mark_path(&mut self, shape: &'static Shape, path: &str) -> Result<(), EebusError> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let index = shape
            .field_index(head)
            .ok_or_else(|| EebusError::input(format!("element descriptor names unknown field `{}`", head)))?;
        let field_shape = shape.fields()[index].shape;
        let fields = match self {
            Selection::Fields(fields) => fields,
            Selection::All => return Ok(()),
        };
        let entry = match fields.iter_mut().find(|(i, _)| *i == index) {
            Some((_, entry)) => entry,
            None => {
                let default = if rest.is_some() {
                    Selection::Fields(Vec::new())
                } else {
                    Selection::All
                };
                fields.push((index, default));
                &mut fields.last_mut().expect("just pushed").1
            },
        };
        match rest {
            Some(rest) => entry.mark_path(field_shape, rest),
            None => {
                *entry = Selection::All;
                Ok(())
            },
        }
    }
}

/// Copy only the marked sub-fields of `src` into `dst`, preserving the
/// fields of `dst` that are not marked. A marked field that is absent in
/// `src` becomes absent in `dst`.
pub fn read_elements(shape: &'static Shape, src: &Value, dst: &mut Value, selection: &Selection) {
    match selection {
        Selection::All => *dst = src.clone(),
        Selection::Fields(marked) => {
            let fields = shape.fields();
            let src_fields = match src {
                Value::Sequence(fields) => fields,
                _ => return,
            };
            if !matches!(dst, Value::Sequence(_)) {
                *dst = Value::empty(shape);
            }
            let dst_fields = match dst {
                Value::Sequence(fields) => fields,
                _ => unreachable!(),
            };
            if dst_fields.len() < fields.len() {
                dst_fields.resize(fields.len(), None);
            }
            for (index, sub) in marked {
                let field_shape = match fields.get(*index) {
                    Some(field) => field.shape,
                    None => continue,
                };
                match src_fields.get(*index).and_then(|v| v.as_ref()) {
                    Some(src_value) => match sub {
                        Selection::All => dst_fields[*index] = Some(src_value.clone()),
                        Selection::Fields(_) => {
                            let slot = dst_fields[*index].get_or_insert_with(|| Value::empty(field_shape));
                            read_elements(field_shape, src_value, slot, sub);
                        },
                    },
                    None => dst_fields[*index] = None,
                }
            }
        },
    }
}

/// Clear only the marked sub-fields, leaving siblings untouched.
pub fn delete_elements(shape: &'static Shape, value: &mut Value, selection: &Selection) {
    match selection {
        Selection::All => *value = Value::empty(shape),
        Selection::Fields(marked) => {
            let fields = shape.fields();
            let own = match value {
                Value::Sequence(own) => own,
                _ => return,
            };
            for (index, sub) in marked {
                match sub {
                    Selection::All => {
                        if let Some(slot) = own.get_mut(*index) {
                            *slot = None;
                        }
                    },
                    Selection::Fields(_) => {
                        if let (Some(field), Some(Some(slot))) = (fields.get(*index), own.get_mut(*index)) {
                            delete_elements(field.shape, slot, sub);
                        }
                    },
                }
            }
        },
    }
}

/// True when two elements agree on every declared key path. Paths absent on
/// both sides compare equal.
pub fn keys_equal(element_shape: &'static Shape, key: &[&str], a: &Value, b: &Value) -> bool {
    !key.is_empty() && key.iter().all(|path| a.lookup_path(element_shape, path) == b.lookup_path(element_shape, path))
}

fn list_upsert_inner(list: &mut Value, element_shape: &'static Shape, key: &'static [&'static str], element: Value) {
    let items = match list.elements_mut() {
        Some(items) => items,
        None => return,
    };
    if let Some(existing) = items.iter_mut().find(|e| keys_equal(element_shape, key, e, &element)) {
        existing.merge_from(element_shape, &element);
    } else {
        items.push(element);
    }
}

/// Append or merge an element into a list-like value by key identity.
pub fn list_upsert(shape: &'static Shape, list: &mut Value, element: Value) -> Result<(), EebusError> {
    let (element_shape, key) = shape
        .element()
        .ok_or_else(|| EebusError::input("not a list or container shape"))?;
    list_upsert_inner(list, element_shape, key, element);
    Ok(())
}

/// Remove every element matching the selector, returning how many were
/// removed.
pub fn list_remove_matching(shape: &'static Shape, list: &mut Value, selector: &Value) -> usize {
    let element_shape = match shape.element() {
        Some((element_shape, _)) => element_shape,
        None => return 0,
    };
    let items = match list.elements_mut() {
        Some(items) => items,
        None => return 0,
    };
    let before = items.len();
    items.retain(|element| !element.matches(element_shape, selector));
    before - items.len()
}

/// Iterate over the elements matching the selector, in container order.
pub fn list_match_iter<'a>(
    shape: &'static Shape,
    list: &'a Value,
    selector: &'a Value,
) -> impl Iterator<Item = &'a Value> + 'a {
    let element_shape = shape.element().map(|(element_shape, _)| element_shape);
    list.elements()
        .unwrap_or(&[])
        .iter()
        .filter(move |element| match element_shape {
            Some(element_shape) => element.matches(element_shape, selector),
            None => false,
        })
}

/// The single element matching the selector. "No match" is `Ok(None)`;
/// more than one match is an error the caller must treat as a protocol
/// violation.
pub fn find_unique<'a>(
    shape: &'static Shape,
    list: &'a Value,
    selector: &'a Value,
) -> Result<Option<&'a Value>, EebusError> {
    let mut iter = list_match_iter(shape, list, selector);
    let first = iter.next();
    if iter.next().is_some() {
        return Err(EebusError::input("selector matches more than one element"));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::shape::{Field, LeafKind};

    static UNSIGNED: Shape = Shape::Simple(LeafKind::Unsigned);
    static NUMBER: Shape = Shape::Simple(LeafKind::Number);
    static SCALED: Shape = Shape::Sequence(&[
        Field { name: "number", shape: &NUMBER },
        Field { name: "scale", shape: &NUMBER },
    ]);
    static ELEMENT: Shape = Shape::Sequence(&[
        Field { name: "id", shape: &UNSIGNED },
        Field { name: "value", shape: &SCALED },
    ]);
    static LIST: Shape = Shape::Container(crate::model::shape::ContainerShape {
        field: "data",
        element: &ELEMENT,
        key: &["id"],
    });

    fn scaled(number: i64, scale: i64) -> Value {
        Value::Sequence(vec![
            Some(Value::Simple(Leaf::Number(number))),
            Some(Value::Simple(Leaf::Number(scale))),
        ])
    }

    fn element(id: u64, value: Option<Value>) -> Value {
        Value::Sequence(vec![Some(Value::Simple(Leaf::Unsigned(id))), value])
    }

    fn selector(id: u64) -> Value {
        Value::Sequence(vec![Some(Value::Simple(Leaf::Unsigned(id))), None])
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut cache = element(7, Some(scaled(100, -2)));
        let incoming = element(7, None);
        cache.merge_from(&ELEMENT, &incoming);
        assert_eq!(cache.field(&ELEMENT, "value"), Some(&scaled(100, -2)));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut cache = Value::Container(vec![element(1, Some(scaled(5, 0)))]);
        let incoming = Value::Container(vec![element(1, Some(scaled(9, 1))), element(2, None)]);
        cache.merge_from(&LIST, &incoming);
        let once = cache.clone();
        cache.merge_from(&LIST, &incoming);
        assert_eq!(cache, once);
        assert_eq!(cache.elements().unwrap().len(), 2);
    }

    #[test]
    fn upsert_merges_by_key_identity() {
        let mut list = Value::Container(vec![element(1, Some(scaled(5, 0)))]);
        list_upsert(&LIST, &mut list, element(1, Some(scaled(8, 0)))).unwrap();
        assert_eq!(list.elements().unwrap().len(), 1);
        let value = list.elements().unwrap()[0].field(&ELEMENT, "value").unwrap();
        assert_eq!(value, &scaled(8, 0));
    }

    #[test]
    fn selector_matching_ignores_absent_fields() {
        let item = element(3, Some(scaled(1, 0)));
        assert!(item.matches(&ELEMENT, &selector(3)));
        assert!(!item.matches(&ELEMENT, &selector(4)));
    }

    #[test]
    fn find_unique_rejects_multiple_matches() {
        let list = Value::Container(vec![element(1, None), element(1, None)]);
        let all = Value::Sequence(vec![None, None]);
        assert!(find_unique(&LIST, &list, &all).is_err());
        let sel = selector(9);
        let none = find_unique(&LIST, &list, &sel).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn delete_elements_clears_only_named_subfields() {
        let mut item = element(3, Some(scaled(95, 1)));
        let selection = Selection::from_paths(&ELEMENT, &["value.number"]).unwrap();
        delete_elements(&ELEMENT, &mut item, &selection);
        let value = item.field(&ELEMENT, "value").unwrap();
        assert_eq!(value.field(&SCALED, "number"), None);
        assert_eq!(value.field(&SCALED, "scale"), Some(&Value::Simple(Leaf::Number(1))));
        assert_eq!(item.field(&ELEMENT, "id"), Some(&Value::Simple(Leaf::Unsigned(3))));
    }

    #[test]
    fn read_elements_projects_marked_fields() {
        let src = element(3, Some(scaled(95, 1)));
        let mut dst = Value::empty(&ELEMENT);
        dst.set_field(&ELEMENT, "id", Value::Simple(Leaf::Unsigned(3))).unwrap();
        let selection = Selection::from_paths(&ELEMENT, &["value.scale"]).unwrap();
        read_elements(&ELEMENT, &src, &mut dst, &selection);
        let value = dst.field(&ELEMENT, "value").unwrap();
        assert_eq!(value.field(&SCALED, "scale"), Some(&Value::Simple(Leaf::Number(1))));
        assert_eq!(value.field(&SCALED, "number"), None);
        // unmarked fields of dst survive
        assert_eq!(dst.field(&ELEMENT, "id"), Some(&Value::Simple(Leaf::Unsigned(3))));
    }

    #[test]
    fn selection_rejects_unknown_paths() {
        assert!(Selection::from_paths(&ELEMENT, &["nope"]).is_err());
    }
}
