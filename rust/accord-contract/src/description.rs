use std::sync::Arc;

use accord_envelope::EnvelopeType;
use accord_hash::OperationId;
use accord_schema::{MethodSignature, TypeRef};
use facet::Facet;

use crate::{MessageLayout, OperationType, naming};

/// Everything a renderer needs to bind one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescription {
    pub service_name: String,
    pub operation_name: String,
    pub operation_type: OperationType,
    pub id: OperationId,
    pub method: MethodSignature,
    /// The interface declaring the method (attached interfaces included).
    pub interface_type: TypeRef,
    pub request: Arc<EnvelopeType>,
    pub request_input: Vec<usize>,
    pub header_request: Option<Arc<EnvelopeType>>,
    pub header_request_input: Vec<usize>,
    pub response: Arc<EnvelopeType>,
    pub header_response: Option<Arc<EnvelopeType>>,
    pub header_response_input: Vec<usize>,
    pub response_stream_index: Option<usize>,
    pub context_input: Vec<usize>,
    pub is_async: bool,
}

impl OperationDescription {
    pub(crate) fn new(
        service_name: String,
        operation_name: String,
        operation_type: OperationType,
        method: MethodSignature,
        interface_type: TypeRef,
        layout: MessageLayout,
        is_async: bool,
    ) -> Self {
        let id = accord_hash::operation_id(
            &service_name,
            &operation_name,
            layout.request.elements(),
            layout.response.elements(),
        );
        Self {
            service_name,
            operation_name,
            operation_type,
            id,
            method,
            interface_type,
            request: layout.request,
            request_input: layout.request_input,
            header_request: layout.header_request,
            header_request_input: layout.header_request_input,
            response: layout.response,
            header_response: layout.header_response,
            header_response_input: layout.header_response_input,
            response_stream_index: layout.response_stream_index,
            context_input: layout.context_input,
            is_async,
        }
    }

    /// Wire path, `/{service}/{operation}`.
    pub fn path(&self) -> String {
        naming::operation_path(&self.service_name, &self.operation_name)
    }

    /// Case-insensitive uniqueness key.
    pub(crate) fn collision_key(&self) -> (String, String) {
        (
            self.service_name.to_lowercase(),
            self.operation_name.to_lowercase(),
        )
    }

    /// Same request, response and header envelopes.
    pub fn same_envelopes(&self, other: &OperationDescription) -> bool {
        fn same(a: &Option<Arc<EnvelopeType>>, b: &Option<Arc<EnvelopeType>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        Arc::ptr_eq(&self.request, &other.request)
            && Arc::ptr_eq(&self.response, &other.response)
            && same(&self.header_request, &other.header_request)
            && same(&self.header_response, &other.header_response)
    }

    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            service: self.service_name.clone(),
            operation: self.operation_name.clone(),
            path: self.path(),
            kind: self.operation_type,
            id: self.id.0,
            request: self.request.key().to_string(),
            response: self.response.key().to_string(),
            header_request: self.header_request.as_ref().map(|e| e.key().to_string()),
            header_response: self.header_response.as_ref().map(|e| e.key().to_string()),
            is_async: self.is_async,
        }
    }
}

/// A method that was seen but cannot be called over the wire.
///
/// Renderers must emit a stub that fails with `error`, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotSupportedOperation {
    pub method: MethodSignature,
    pub error: String,
}

/// Operations, rejections and plain members grouped by declaring interface.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDescription {
    pub interface_type: TypeRef,
    /// Wire service name; `None` for interfaces outside any service.
    pub service_name: Option<String>,
    /// The service an attached interface was attached to.
    pub attached_to: Option<TypeRef>,
    pub operations: Vec<OperationDescription>,
    /// Sync methods served by an async operation with the same path.
    pub sync_over_async: Vec<OperationDescription>,
    pub not_supported_operations: Vec<NotSupportedOperation>,
    /// Members that are not operations at all.
    pub methods: Vec<MethodSignature>,
}

impl InterfaceDescription {
    pub(crate) fn new(interface_type: TypeRef) -> Self {
        Self {
            interface_type,
            service_name: None,
            attached_to: None,
            operations: Vec::new(),
            sync_over_async: Vec::new(),
            not_supported_operations: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached_to.is_some()
    }
}

/// The analysis result for one root type. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDescription {
    pub service_type: TypeRef,
    /// Service contracts and the plain interfaces attached to them.
    pub services: Vec<InterfaceDescription>,
    /// Every other interface in the hierarchy.
    pub interfaces: Vec<InterfaceDescription>,
    pub base_class_name: String,
    pub client_class_name: String,
    pub contract_class_name: String,
    pub client_builder_class_name: String,
    pub endpoint_class_name: String,
}

impl ContractDescription {
    /// Every bound operation, in discovery order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationDescription> {
        self.services.iter().flat_map(|s| s.operations.iter())
    }

    /// Every rejected method across services.
    pub fn not_supported(&self) -> impl Iterator<Item = &NotSupportedOperation> {
        self.services
            .iter()
            .flat_map(|s| s.not_supported_operations.iter())
    }

    /// Look up an operation by wire name, case-insensitively.
    pub fn find_operation(&self, operation_name: &str) -> Option<&OperationDescription> {
        self.operations()
            .find(|op| op.operation_name.eq_ignore_ascii_case(operation_name))
    }

    pub fn summary(&self) -> ContractSummary {
        ContractSummary {
            service_type: self.service_type.to_string(),
            client_class_name: self.client_class_name.clone(),
            operations: self.operations().map(OperationDescription::summary).collect(),
            not_supported: self
                .not_supported()
                .map(|n| NotSupportedSummary {
                    method: n.method.to_string(),
                    error: n.error.clone(),
                })
                .collect(),
        }
    }
}

/// A flat, reflectable view of one operation.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct OperationSummary {
    pub service: String,
    pub operation: String,
    pub path: String,
    pub kind: OperationType,
    pub id: u64,
    pub request: String,
    pub response: String,
    pub header_request: Option<String>,
    pub header_response: Option<String>,
    pub is_async: bool,
}

#[derive(Facet, Debug, Clone, PartialEq)]
pub struct NotSupportedSummary {
    pub method: String,
    pub error: String,
}

/// A flat, reflectable view of a whole contract.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ContractSummary {
    pub service_type: String,
    pub client_class_name: String,
    pub operations: Vec<OperationSummary>,
    pub not_supported: Vec<NotSupportedSummary>,
}
