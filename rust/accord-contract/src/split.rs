use std::sync::Arc;

use accord_envelope::{EnvelopeRegistry, EnvelopeType};
use accord_schema::{MethodSignature, TypeRef};

use crate::{OperationType, ResponseShape, SignatureClassification};

/// Which values travel in which envelope, and in what order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageLayout {
    /// Per-call request envelope, or per-item envelope when the request streams.
    pub request: Arc<EnvelopeType>,
    /// Parameter index behind each request envelope position.
    pub request_input: Vec<usize>,
    /// Sent once before the request stream. Absent when nothing needs sending.
    pub header_request: Option<Arc<EnvelopeType>>,
    pub header_request_input: Vec<usize>,
    /// Per-call response envelope, or per-item envelope when the response streams.
    pub response: Arc<EnvelopeType>,
    /// Sent once before the response stream.
    pub header_response: Option<Arc<EnvelopeType>>,
    /// Tuple position behind each header response envelope position.
    pub header_response_input: Vec<usize>,
    /// Position of the stream within a returned header+stream tuple.
    pub response_stream_index: Option<usize>,
    pub context_input: Vec<usize>,
}

/// Split a classified method into its request, response and header envelopes.
pub fn split(
    method: &MethodSignature,
    classification: &SignatureClassification,
    op_type: OperationType,
    envelopes: &EnvelopeRegistry,
) -> MessageLayout {
    let param_type = |i: usize| method.params[i].ty.clone();
    let data = classification.data_params();

    let (request, request_input, header_request, header_request_input) =
        match classification.stream_param {
            Some(stream) if op_type.streams_request() => {
                let item = method.params[stream]
                    .ty
                    .as_stream()
                    .cloned()
                    .unwrap_or(TypeRef::Unit);
                let request = envelopes.get_or_create(&[item]);
                let header = if data.is_empty() {
                    None
                } else {
                    let types: Vec<TypeRef> = data.iter().map(|&i| param_type(i)).collect();
                    Some(envelopes.get_or_create(&types))
                };
                (request, vec![stream], header, data)
            }
            _ => {
                let types: Vec<TypeRef> = data.iter().map(|&i| param_type(i)).collect();
                (envelopes.get_or_create(&types), data, None, Vec::new())
            }
        };

    let mut header_response = None;
    let mut header_response_input = Vec::new();
    let mut response_stream_index = None;

    let response = match &classification.response {
        ResponseShape::Unit => envelopes.get_or_create(&[]),
        ResponseShape::Value(ty) => envelopes.get_or_create(std::slice::from_ref(ty)),
        ResponseShape::Stream { item } => envelopes.get_or_create(std::slice::from_ref(item)),
        ResponseShape::HeaderedStream {
            header,
            stream_index,
            item,
        } => {
            if !header.is_empty() {
                let types: Vec<TypeRef> = header.iter().map(|(_, ty)| ty.clone()).collect();
                header_response = Some(envelopes.get_or_create(&types));
                header_response_input = header.iter().map(|(pos, _)| *pos).collect();
                response_stream_index = Some(*stream_index);
            }
            envelopes.get_or_create(std::slice::from_ref(item))
        }
    };

    MessageLayout {
        request,
        request_input,
        header_request,
        header_request_input,
        response,
        header_response,
        header_response_input,
        response_stream_index,
        context_input: classification.context_params(),
    }
}
