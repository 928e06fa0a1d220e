//! Signature classification.
//!
//! Decides, for one method, which parameters are marshalled data, which are
//! call context, which one (if any) is a streamed sequence, and what the
//! method produces once its async wrapper is peeled off.

use accord_schema::{ContextKind, MethodSignature, ParamMode, TypeRef};

use crate::{ClassifyError, ClassifyErrorKind, TypeError};

/// How one parameter takes part in a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterClass {
    /// Marshalled into a request envelope.
    Data,
    /// Call metadata; never marshalled.
    Context(ContextKind),
    /// The request-side stream. At most one per method.
    Stream,
}

/// What a method produces, with the async wrapper removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `()`.
    Unit,
    /// A single plain value.
    Value(TypeRef),
    /// `Stream<T>`.
    Stream { item: TypeRef },
    /// A tuple holding exactly one `Stream<T>` plus plain header values.
    HeaderedStream {
        /// `(tuple position, type)` of every non-stream element.
        header: Vec<(usize, TypeRef)>,
        stream_index: usize,
        item: TypeRef,
    },
}

impl ResponseShape {
    pub fn is_streamed(&self) -> bool {
        matches!(
            self,
            ResponseShape::Stream { .. } | ResponseShape::HeaderedStream { .. }
        )
    }
}

/// The outcome of classifying a method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureClassification {
    /// One entry per declared parameter, in order.
    pub params: Vec<ParameterClass>,
    /// Index of the stream parameter, if any.
    pub stream_param: Option<usize>,
    pub response: ResponseShape,
    /// Declared `async fn`, or returns a `Future`.
    pub is_async: bool,
}

impl SignatureClassification {
    /// Indices of parameters with the given class.
    fn indices(&self, pred: impl Fn(&ParameterClass) -> bool) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, class)| pred(class))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn data_params(&self) -> Vec<usize> {
        self.indices(|c| *c == ParameterClass::Data)
    }

    pub fn context_params(&self) -> Vec<usize> {
        self.indices(|c| matches!(c, ParameterClass::Context(_)))
    }
}

/// Classify `method`, or explain why it cannot be an operation.
pub fn classify(method: &MethodSignature) -> Result<SignatureClassification, ClassifyError> {
    let fail = |kind| ClassifyError::new(method.to_string(), kind);

    if !method.generic_params.is_empty() {
        return Err(fail(ClassifyErrorKind::GenericMethod {
            params: method.generic_params.clone(),
        }));
    }

    let mut params = Vec::with_capacity(method.params.len());
    let mut stream_param: Option<usize> = None;

    for (index, param) in method.params.iter().enumerate() {
        if param.mode != ParamMode::In {
            return Err(fail(ClassifyErrorKind::ByRefParameter {
                name: param.name.clone(),
                mode: param.mode,
            }));
        }

        let class = classify_param(&param.ty).map_err(|source| {
            fail(ClassifyErrorKind::Parameter {
                name: param.name.clone(),
                source,
            })
        })?;

        if class == ParameterClass::Stream {
            if let Some(first) = stream_param {
                return Err(fail(ClassifyErrorKind::SecondStream {
                    first: method.params[first].name.clone(),
                    second: param.name.clone(),
                }));
            }
            stream_param = Some(index);
        }
        params.push(class);
    }

    let (response, is_async) = classify_return(method).map_err(fail)?;

    tracing::trace!(method = %method, ?params, ?response, "classified");

    Ok(SignatureClassification {
        params,
        stream_param,
        response,
        is_async,
    })
}

fn classify_param(ty: &TypeRef) -> Result<ParameterClass, TypeError> {
    if let Some(kind) = ty.as_context() {
        return Ok(ParameterClass::Context(kind));
    }
    match ty {
        TypeRef::ByteChannel(name) => Err(TypeError::ByteChannel(name.clone())),
        TypeRef::Stream(item) => {
            check_stream_item(ty, item)?;
            Ok(ParameterClass::Stream)
        }
        _ => {
            check_data(ty)?;
            Ok(ParameterClass::Data)
        }
    }
}

fn classify_return(method: &MethodSignature) -> Result<(ResponseShape, bool), ClassifyErrorKind> {
    let ret = |source| ClassifyErrorKind::Return { source };
    let declared = &method.return_type;

    let (ty, is_async) = match declared {
        TypeRef::Async(_) if method.is_async => {
            return Err(ret(TypeError::NestedAsync(declared.to_string())));
        }
        TypeRef::Async(inner) => (inner.as_ref(), true),
        other => (other, method.is_async),
    };

    if let TypeRef::Async(_) = ty {
        return Err(ret(TypeError::NestedAsync(declared.to_string())));
    }
    if ty.as_context().is_some() {
        return Err(ret(TypeError::Context(ty.to_string())));
    }

    let shape = match ty {
        TypeRef::Unit => ResponseShape::Unit,
        TypeRef::ByteChannel(name) => return Err(ret(TypeError::ByteChannel(name.clone()))),
        TypeRef::Stream(item) => {
            check_stream_item(ty, item).map_err(ret)?;
            ResponseShape::Stream {
                item: item.as_ref().clone(),
            }
        }
        TypeRef::Tuple(elements) if elements.iter().any(TypeRef::is_stream) => {
            let streams: Vec<usize> = elements
                .iter()
                .enumerate()
                .filter(|(_, t)| t.is_stream())
                .map(|(i, _)| i)
                .collect();
            if streams.len() > 1 {
                return Err(ret(TypeError::MultipleStreams(ty.to_string())));
            }
            let stream_index = streams[0];
            let stream = &elements[stream_index];
            let item = stream.as_stream().cloned().unwrap_or(TypeRef::Unit);
            check_stream_item(stream, &item).map_err(ret)?;

            let mut header = Vec::with_capacity(elements.len() - 1);
            for (i, element) in elements.iter().enumerate() {
                if i != stream_index {
                    check_data(element).map_err(ret)?;
                    header.push((i, element.clone()));
                }
            }
            if header.is_empty() {
                // `(Stream<T>,)` carries nothing besides the stream
                return Ok((ResponseShape::Stream { item }, is_async));
            }
            if !is_async {
                return Err(ClassifyErrorKind::HeaderedStreamNotAsync);
            }
            ResponseShape::HeaderedStream {
                header,
                stream_index,
                item,
            }
        }
        other => {
            check_data(other).map_err(ret)?;
            ResponseShape::Value(other.clone())
        }
    };
    Ok((shape, is_async))
}

fn check_stream_item(stream: &TypeRef, item: &TypeRef) -> Result<(), TypeError> {
    match item {
        TypeRef::Stream(_) => Err(TypeError::NestedStream(stream.to_string())),
        TypeRef::Async(_) => Err(TypeError::NestedAsync(stream.to_string())),
        _ => check_data(item),
    }
}

/// Plain data: nothing inside it streams, awaits, carries context or is open.
fn check_data(ty: &TypeRef) -> Result<(), TypeError> {
    let offending = ty.find(&|t| {
        t.as_context().is_some()
            || matches!(
                t,
                TypeRef::Stream(_) | TypeRef::Async(_) | TypeRef::ByteChannel(_) | TypeRef::Param(_)
            )
    });
    let Some(offending) = offending else {
        return Ok(());
    };
    Err(match offending {
        TypeRef::Stream(_) => TypeError::NestedStream(ty.to_string()),
        TypeRef::Async(_) => TypeError::NestedAsync(ty.to_string()),
        TypeRef::ByteChannel(name) => TypeError::ByteChannel(name.clone()),
        TypeRef::Param(name) => TypeError::OpenGeneric(name.clone()),
        other => TypeError::Context(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_chain;
    use accord_schema::TypeName;

    fn method(name: &str) -> MethodSignature {
        let mut m = MethodSignature::new(name).operation();
        m.declaring_type = TypeName::new("Demo", "IDemoService");
        m
    }

    fn rejection(m: &MethodSignature) -> String {
        render_chain(&classify(m).unwrap_err())
    }

    #[test]
    fn context_parameters_are_recognized() {
        let m = method("concat")
            .param("a", TypeRef::string())
            .param(
                "ctx",
                TypeRef::option(TypeRef::context(ContextKind::CallContext)),
            )
            .returns(TypeRef::string());
        let c = classify(&m).unwrap();
        assert_eq!(
            c.params,
            [
                ParameterClass::Data,
                ParameterClass::Context(ContextKind::CallContext)
            ]
        );
        assert_eq!(c.data_params(), [0]);
        assert_eq!(c.context_params(), [1]);
        assert_eq!(c.response, ResponseShape::Value(TypeRef::string()));
        assert!(!c.is_async);
    }

    #[test]
    fn future_return_counts_as_async() {
        let m = method("count").returns(TypeRef::future(TypeRef::i32()));
        let c = classify(&m).unwrap();
        assert!(c.is_async);
        assert_eq!(c.response, ResponseShape::Value(TypeRef::i32()));
    }

    #[test]
    fn headered_stream_response() {
        let m = method("download")
            .asynchronous()
            .returns(TypeRef::tuple(vec![
                TypeRef::string(),
                TypeRef::stream(TypeRef::bytes()),
                TypeRef::i64(),
            ]));
        let c = classify(&m).unwrap();
        assert_eq!(
            c.response,
            ResponseShape::HeaderedStream {
                header: vec![(0, TypeRef::string()), (2, TypeRef::i64())],
                stream_index: 1,
                item: TypeRef::bytes(),
            }
        );
    }

    #[test]
    fn lone_stream_in_tuple_is_a_plain_stream() {
        let m = method("watch")
            .asynchronous()
            .returns(TypeRef::tuple(vec![TypeRef::stream(TypeRef::i32())]));
        let c = classify(&m).unwrap();
        assert_eq!(c.response, ResponseShape::Stream { item: TypeRef::i32() });
        assert!(c.response.is_streamed());

        let sync = method("watch").returns(TypeRef::tuple(vec![TypeRef::stream(TypeRef::i32())]));
        assert_eq!(
            classify(&sync).unwrap().response,
            ResponseShape::Stream { item: TypeRef::i32() }
        );
    }

    #[test]
    fn headered_stream_requires_async() {
        let m = method("download").returns(TypeRef::tuple(vec![
            TypeRef::string(),
            TypeRef::stream(TypeRef::bytes()),
        ]));
        insta::assert_snapshot!(
            rejection(&m),
            @"cannot bind `Demo.IDemoService::download() -> (String, Stream<Bytes>)` as an operation: returning a header together with a stream requires an async method"
        );
    }

    #[test]
    fn rejects_generic_methods() {
        let m = method("echo")
            .generic_param("T")
            .param("value", TypeRef::param("T"))
            .returns(TypeRef::param("T"));
        insta::assert_snapshot!(
            rejection(&m),
            @"cannot bind `Demo.IDemoService::echo<T>(value: T) -> T` as an operation: generic methods are not supported (type parameters: T)"
        );
    }

    #[test]
    fn rejects_by_ref_and_out() {
        let m = method("swap").param_with_mode("a", TypeRef::i32(), ParamMode::Ref);
        assert!(rejection(&m).contains("`a` is a by-reference parameter"));

        let m = method("fill").param_with_mode("b", TypeRef::i32(), ParamMode::Out);
        assert!(rejection(&m).contains("`b` is an out parameter"));
    }

    #[test]
    fn rejects_second_stream_naming_both() {
        let m = method("merge")
            .asynchronous()
            .param("left", TypeRef::stream(TypeRef::i32()))
            .param("right", TypeRef::stream(TypeRef::i32()));
        insta::assert_snapshot!(
            rejection(&m),
            @"cannot bind `async Demo.IDemoService::merge(left: Stream<i32>, right: Stream<i32>)` as an operation: only one streamed parameter is allowed, found `left` and `right`"
        );
    }

    #[test]
    fn rejects_byte_channels() {
        let m = method("upload").param("data", TypeRef::ByteChannel("Read".into()));
        insta::assert_snapshot!(
            rejection(&m),
            @"cannot bind `Demo.IDemoService::upload(data: Read)` as an operation: parameter `data`: `Read` is a raw byte channel and cannot be marshalled; use Stream<Bytes>"
        );
    }

    #[test]
    fn rejects_deep_nesting() {
        let nested_future = method("a").returns(TypeRef::future(TypeRef::future(TypeRef::i32())));
        assert!(rejection(&nested_future).contains("nests an async wrapper"));

        let async_future = method("b")
            .asynchronous()
            .returns(TypeRef::future(TypeRef::i32()));
        assert!(rejection(&async_future).contains("nests an async wrapper"));

        let nested_stream = method("c").returns(TypeRef::stream(TypeRef::stream(TypeRef::i32())));
        assert!(rejection(&nested_stream).contains("nests a stream"));

        let stream_of_future =
            method("d").returns(TypeRef::stream(TypeRef::future(TypeRef::i32())));
        assert!(rejection(&stream_of_future).contains("nests an async wrapper"));

        let stream_in_list =
            method("e").param("xs", TypeRef::list(TypeRef::stream(TypeRef::i32())));
        assert!(rejection(&stream_in_list).contains("parameter `xs`"));
    }

    #[test]
    fn rejects_context_return_and_open_generics() {
        let m = method("ctx").returns(TypeRef::context(ContextKind::CallOptions));
        assert!(rejection(&m).contains("call context `CallOptions`"));

        let m = method("open").param("x", TypeRef::list(TypeRef::param("T")));
        assert!(rejection(&m).contains("generic parameter `T`"));
    }

    #[test]
    fn every_rejection_names_the_method() {
        let rejected = [
            method("generic").generic_param("T"),
            method("by_ref").param_with_mode("a", TypeRef::i32(), ParamMode::Ref),
            method("two_streams")
                .param("a", TypeRef::stream(TypeRef::i32()))
                .param("b", TypeRef::stream(TypeRef::i32())),
            method("channel").param("w", TypeRef::ByteChannel("Write".into())),
        ];
        for m in &rejected {
            assert!(rejection(m).contains(&m.name), "{m}");
        }
    }
}
