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

//! Shape metadata for the data-model runtime.
//!
//! A [`Shape`] describes one node of a record tree. Shapes are declared as
//! `static` items referencing each other, so the whole schema lives in
//! read-only storage and a value can always be interpreted against its
//! shape without allocation.

/// The scalar kind of a simple (leaf) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Bool,
    /// Signed integer, also used for scale exponents.
    Number,
    /// Unsigned integer: ids, counters, scenario numbers.
    Unsigned,
    /// Enumeration tag; the value indexes into the declared name table.
    Tag(&'static [&'static str]),
    Text,
    /// Octet string.
    Bytes,
    /// ISO 8601 duration on the wire.
    Duration,
    /// Absolute timestamp on the wire (RFC 3339).
    Timestamp,
}

/// A named field of a sequence shape.
#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub shape: &'static Shape,
}

/// A homogeneous vector whose element identity is the declared key subset.
/// Key entries are dotted paths into the element shape; an empty key means
/// elements have no identity and are replaced wholesale.
#[derive(Debug)]
pub struct ListShape {
    pub element: &'static Shape,
    pub key: &'static [&'static str],
}

/// A thin wrapper holding exactly one named list, used by functions whose
/// payload is `{"xListData": {"xData": [...]}}`.
#[derive(Debug)]
pub struct ContainerShape {
    pub field: &'static str,
    pub element: &'static Shape,
    pub key: &'static [&'static str],
}

/// One node of a record schema.
#[derive(Debug)]
pub enum Shape {
    Simple(LeafKind),
    Sequence(&'static [Field]),
    List(ListShape),
    Container(ContainerShape),
}

impl Shape {
    pub fn is_list_like(&self) -> bool {
        matches!(self, Shape::List(_) | Shape::Container(_))
    }

    /// The fields of a sequence shape; empty for every other kind.
    pub fn fields(&self) -> &'static [Field] {
        match self {
            Shape::Sequence(fields) => fields,
            _ => &[],
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields().iter().position(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// The element shape and key of a list or container.
    pub fn element(&self) -> Option<(&'static Shape, &'static [&'static str])> {
        match self {
            Shape::List(list) => Some((list.element, list.key)),
            Shape::Container(container) => Some((container.element, container.key)),
            _ => None,
        }
    }

    /// Resolve a dotted path (e.g. `value.number`) through nested sequence
    /// shapes.
    pub fn lookup_path(&'static self, path: &str) -> Option<&'static Shape> {
        let mut shape = self;
        for segment in path.split('.') {
            shape = shape.field(segment)?.shape;
        }
        Some(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static NUMBER: Shape = Shape::Simple(LeafKind::Number);
    static INNER: Shape = Shape::Sequence(&[
        Field { name: "number", shape: &NUMBER },
        Field { name: "scale", shape: &NUMBER },
    ]);
    static OUTER: Shape = Shape::Sequence(&[Field { name: "value", shape: &INNER }]);

    #[test]
    fn it_resolves_dotted_paths() {
        let shape = OUTER.lookup_path("value.number").unwrap();
        assert!(matches!(shape, Shape::Simple(LeafKind::Number)));
        assert!(OUTER.lookup_path("value.missing").is_none());
    }

    #[test]
    fn it_indexes_fields_by_name() {
        assert_eq!(INNER.field_index("scale"), Some(1));
        assert_eq!(INNER.field_index("absent"), None);
    }
}
