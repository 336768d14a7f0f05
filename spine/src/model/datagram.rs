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

//! The SPINE datagram envelope: header, classifier, command and filters.

use std::fmt::{Display, Error, Formatter};

use crate::model::{address::FeatureAddress, function::Function, value::Selection, value::Value};

/// The SPINE specification version this implementation speaks.
pub const SPECIFICATION_VERSION: &str = "1.3.0";

/// Correlation id assigned by the sender's device; strictly increasing per
/// local device, echoed back in replies and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MsgCounter(pub u64);

impl Display for MsgCounter {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "{}", self.0)
    }
}

/// How the receiver must treat the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdClassifier {
    Read,
    Reply,
    Notify,
    Write,
    Call,
    Result,
}

impl CmdClassifier {
    pub fn wire_name(&self) -> &'static str {
        match self {
            CmdClassifier::Read => "read",
            CmdClassifier::Reply => "reply",
            CmdClassifier::Notify => "notify",
            CmdClassifier::Write => "write",
            CmdClassifier::Call => "call",
            CmdClassifier::Result => "result",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<CmdClassifier> {
        Some(match name {
            "read" => CmdClassifier::Read,
            "reply" => CmdClassifier::Reply,
            "notify" => CmdClassifier::Notify,
            "write" => CmdClassifier::Write,
            "call" => CmdClassifier::Call,
            "result" => CmdClassifier::Result,
            _ => return None,
        })
    }
}

impl Display for CmdClassifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str(self.wire_name())
    }
}

/// Exactly one of partial or delete; a filter carrying both or neither is
/// rejected at the codec seam, so the invalid combinations are
/// unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterControl {
    Partial,
    Delete,
}

/// A modifier on a command selecting which elements (selectors) and which
/// sub-fields within them (elements) an operation targets.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub control: FilterControl,
    /// Partial value of the function's element shape; its non-absent
    /// fields identify the targeted list elements.
    pub selectors: Option<Value>,
    /// Marked sub-fields within the targeted elements.
    pub elements: Option<Selection>,
}

impl Filter {
    pub fn partial() -> Self {
        Filter {
            control: FilterControl::Partial,
            selectors: None,
            elements: None,
        }
    }

    pub fn partial_with_selectors(selectors: Value) -> Self {
        Filter {
            control: FilterControl::Partial,
            selectors: Some(selectors),
            elements: None,
        }
    }

    pub fn delete_with_selectors(selectors: Value) -> Self {
        Filter {
            control: FilterControl::Delete,
            selectors: Some(selectors),
            elements: None,
        }
    }

    pub fn delete(selectors: Option<Value>, elements: Option<Selection>) -> Self {
        Filter {
            control: FilterControl::Delete,
            selectors,
            elements,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.control == FilterControl::Partial
    }

    pub fn is_delete(&self) -> bool {
        self.control == FilterControl::Delete
    }
}

/// The outcome descriptor carried by `result` commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultData {
    pub error_number: u32,
    pub description: Option<String>,
}

impl ResultData {
    pub const NO_ERROR: u32 = 0;
    pub const GENERAL_ERROR: u32 = 1;
    pub const TIMEOUT: u32 = 2;
    pub const OVERLOAD: u32 = 3;
    pub const DESTINATION_UNKNOWN: u32 = 4;
    pub const DESTINATION_UNREACHABLE: u32 = 5;
    pub const COMMAND_NOT_SUPPORTED: u32 = 6;
    pub const COMMAND_REJECTED: u32 = 7;

    pub fn ok() -> Self {
        ResultData {
            error_number: Self::NO_ERROR,
            description: None,
        }
    }

    pub fn error<T: Into<String>>(error_number: u32, description: T) -> Self {
        ResultData {
            error_number,
            description: Some(description.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error_number == Self::NO_ERROR
    }
}

/// The body of a command: either a payload of the function's declared
/// shape or a result descriptor. A `read` carries neither.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    None,
    Data(Value),
    Result(ResultData),
}

impl CommandPayload {
    pub fn data(&self) -> Option<&Value> {
        match self {
            CommandPayload::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ResultData> {
        match self {
            CommandPayload::Result(result) => Some(result),
            _ => None,
        }
    }
}

/// One command: a function, its filters and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub function: Function,
    pub filters: Vec<Filter>,
    pub payload: CommandPayload,
}

impl Command {
    pub fn read(function: Function) -> Self {
        Command {
            function,
            filters: Vec::new(),
            payload: CommandPayload::None,
        }
    }

    pub fn with_data(function: Function, data: Value) -> Self {
        Command {
            function,
            filters: Vec::new(),
            payload: CommandPayload::Data(data),
        }
    }

    pub fn with_filters(function: Function, filters: Vec<Filter>, payload: CommandPayload) -> Self {
        Command {
            function,
            filters,
            payload,
        }
    }

    pub fn result(result: ResultData) -> Self {
        Command {
            function: Function::ResultData,
            filters: Vec::new(),
            payload: CommandPayload::Result(result),
        }
    }

    pub fn filter_partial(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| f.is_partial())
    }

    pub fn filter_delete(&self) -> Option<&Filter> {
        self.filters.iter().find(|f| f.is_delete())
    }
}

/// The datagram header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub specification_version: String,
    pub address_source: FeatureAddress,
    pub address_destination: FeatureAddress,
    pub msg_counter: MsgCounter,
    pub msg_counter_reference: Option<MsgCounter>,
    pub cmd_classifier: CmdClassifier,
    pub ack_request: Option<bool>,
}

/// A complete SPINE datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub header: Header,
    pub cmd: Command,
}

impl Datagram {
    pub fn new(header: Header, cmd: Command) -> Self {
        Self { header, cmd }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_wire_names_round_trip() {
        for classifier in [
            CmdClassifier::Read,
            CmdClassifier::Reply,
            CmdClassifier::Notify,
            CmdClassifier::Write,
            CmdClassifier::Call,
            CmdClassifier::Result,
        ] {
            assert_eq!(CmdClassifier::from_wire_name(classifier.wire_name()), Some(classifier));
        }
        assert_eq!(CmdClassifier::from_wire_name("nope"), None);
    }

    #[test]
    fn command_filter_accessors_pick_by_control() {
        let cmd = Command::with_filters(
            Function::MeasurementListData,
            vec![Filter::partial(), Filter::delete(None, None)],
            CommandPayload::None,
        );
        assert!(cmd.filter_partial().unwrap().is_partial());
        assert!(cmd.filter_delete().unwrap().is_delete());
    }
}
