use std::fmt;

use facet::Facet;

use crate::SignatureClassification;

/// The call shape of an operation.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationType {
    Unary,
    ClientStreaming,
    ServerStreaming,
    DuplexStreaming,
}

impl OperationType {
    /// The four shapes are mutually exclusive by construction.
    pub fn derive(request_streamed: bool, response_streamed: bool) -> Self {
        match (response_streamed, request_streamed) {
            (false, false) => OperationType::Unary,
            (false, true) => OperationType::ClientStreaming,
            (true, false) => OperationType::ServerStreaming,
            (true, true) => OperationType::DuplexStreaming,
        }
    }

    pub fn of(classification: &SignatureClassification) -> Self {
        Self::derive(
            classification.stream_param.is_some(),
            classification.response.is_streamed(),
        )
    }

    /// Whether the request side is a stream.
    pub fn streams_request(self) -> bool {
        matches!(
            self,
            OperationType::ClientStreaming | OperationType::DuplexStreaming
        )
    }

    /// Whether the response side is a stream.
    pub fn streams_response(self) -> bool {
        matches!(
            self,
            OperationType::ServerStreaming | OperationType::DuplexStreaming
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Unary => "Unary",
            OperationType::ClientStreaming => "ClientStreaming",
            OperationType::ServerStreaming => "ServerStreaming",
            OperationType::DuplexStreaming => "DuplexStreaming",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
