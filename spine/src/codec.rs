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

//! The codec collaborator seam.
//!
//! The core is codec-agnostic: it hands complete [`Datagram`]s to a
//! [`SpineCodec`] and receives parsed ones back. The default
//! implementation is the embedder's responsibility; the optional `json`
//! feature supplies [`json::JsonCodec`], which the test suite uses.

use eebus_common::EebusError;

use crate::model::{Datagram, Shape, Value};

/// Parse and serialise SPINE datagrams and, for diagnostics and embedder
/// tooling, standalone shaped values.
pub trait SpineCodec: Send + Sync {
    fn serialise(&self, datagram: &Datagram) -> Result<Vec<u8>, EebusError>;
    fn parse(&self, bytes: &[u8]) -> Result<Datagram, EebusError>;
    /// Render a shaped value as a compact string.
    fn print_unformatted(&self, shape: &'static Shape, value: &Value) -> Result<String, EebusError>;
    /// Parse a compact string into a shaped value.
    fn parse_unformatted(&self, shape: &'static Shape, text: &str) -> Result<Value, EebusError>;
}

#[cfg(any(test, feature = "json"))]
pub mod json;
