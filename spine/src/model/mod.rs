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

//! The SPINE data model: addresses, shapes, values, datagrams and the
//! filtered-update algebra.
//!
//! Every function payload is a tree of four record kinds (simple, sequence,
//! list, container). The *shape* of each tree is immutable metadata held in
//! read-only `static` tables; the *value* is a discriminated tree whose
//! nodes carry typed leaves. All generic operations (copy, compare, merge,
//! element projection and deletion) are driven by the shape, so no function
//! needs a hand-written copy routine.

pub mod address;
pub mod datagram;
pub mod function;
pub mod shape;
pub mod shapes;
pub mod update;
pub mod value;

pub use address::{DeviceAddress, EntityAddress, FeatureAddress};
pub use datagram::{
    CmdClassifier,
    Command,
    CommandPayload,
    Datagram,
    Filter,
    FilterControl,
    Header,
    MsgCounter,
    ResultData,
    SPECIFICATION_VERSION,
};
pub use function::Function;
pub use shape::{ContainerShape, Field, LeafKind, ListShape, Shape};
pub use value::{Leaf, Selection, Value};
