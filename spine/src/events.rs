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

//! Change events published by the local device; use cases subscribe to
//! these instead of polling feature caches.

use eebus_common::Ski;

use crate::model::{CmdClassifier, EntityAddress, FeatureAddress, Function};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementChange {
    Add,
    Update,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpineEventKind {
    /// A remote device appeared or changed after detailed discovery.
    DeviceChange,
    /// A remote entity appeared or disappeared.
    EntityChange,
    /// A remote peer subscribed to or unsubscribed from a local feature.
    SubscriptionChange,
    /// A remote peer bound to or unbound from a local feature.
    BindingChange,
    /// A function cache changed, locally or on a mirrored remote feature.
    DataChange,
}

#[derive(Debug, Clone)]
pub struct SpineEvent {
    /// The peer involved; absent for purely local mutations.
    pub ski: Option<Ski>,
    pub kind: SpineEventKind,
    pub change: ElementChange,
    pub entity: Option<EntityAddress>,
    /// The remote feature involved, when any.
    pub feature: Option<FeatureAddress>,
    /// The local feature involved, when any.
    pub local_feature: Option<FeatureAddress>,
    pub function: Option<Function>,
    /// Set for data changes triggered by an inbound frame.
    pub classifier: Option<CmdClassifier>,
}

impl SpineEvent {
    pub fn data_change(
        ski: Option<Ski>,
        change: ElementChange,
        local_feature: Option<FeatureAddress>,
        feature: Option<FeatureAddress>,
        function: Function,
        classifier: Option<CmdClassifier>,
    ) -> Self {
        Self {
            ski,
            kind: SpineEventKind::DataChange,
            change,
            entity: None,
            feature,
            local_feature,
            function: Some(function),
            classifier,
        }
    }
}
