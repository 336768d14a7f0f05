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

//! The SPINE layer of the EEBUS stack.
//!
//! SPINE models a premises as a graph of devices, entities and features.
//! Features expose typed functions whose payloads are trees of data
//! records; peers read, write, subscribe to and bind against them with
//! correlated datagrams. This crate provides:
//!
//! * the reflective data-model runtime (`model`): shapes, values, filters
//!   and the partial-update algebra,
//! * local and remote feature tables with operations, caches and the
//!   pending-request registry (`feature`),
//! * the local/remote device and entity trees plus the inbound dispatcher
//!   (`device`, `entity`),
//! * node management expressed as ordinary features (`node_management`),
//! * the codec collaborator seam (`codec`) and change events (`events`).

pub mod codec;
pub mod device;
pub mod entity;
pub mod events;
pub mod feature;
pub mod heartbeat;
pub mod model;
pub mod node_management;

pub use events::{ElementChange, SpineEvent, SpineEventKind};
