//! Human-readable operation table.
//!
//! The manifest lists every service the root exposes, the wire path, id and
//! envelopes of each operation, and the diagnostic of every method that could
//! not be bound. It is meant for review and diffing, not for parsing.

use accord_contract::{ContractDescription, InterfaceDescription, OperationDescription};
use heck::ToSnakeCase;

use crate::code_writer::CodeWriter;
use crate::render::hex_u64;
use crate::{GeneratedArtifact, RenderError, Renderer, cw_writeln};

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestRenderer;

impl Renderer for ManifestRenderer {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn render(&self, contract: &ContractDescription) -> Result<GeneratedArtifact, RenderError> {
        let mut contents = String::new();
        let mut w = CodeWriter::with_indent_spaces(&mut contents, 4);

        cw_writeln!(w, "# {}", contract.service_type)?;
        cw_writeln!(w, "client:   {}", contract.client_class_name)?;
        cw_writeln!(w, "builder:  {}", contract.client_builder_class_name)?;
        cw_writeln!(w, "contract: {}", contract.contract_class_name)?;
        cw_writeln!(w, "endpoint: {}", contract.endpoint_class_name)?;

        for service in &contract.services {
            w.blank_line()?;
            let mut header = format!(
                "service {} ({}",
                service.service_name.as_deref().unwrap_or_default(),
                service.interface_type
            );
            if let Some(owner) = &service.attached_to {
                header.push_str(&format!(", attached to {owner}"));
            }
            header.push(')');
            w.block(&header, |w| write_interface(w, service))?;
        }

        for interface in &contract.interfaces {
            w.blank_line()?;
            w.block(&format!("interface {}", interface.interface_type), |w| {
                write_interface(w, interface)
            })?;
        }

        tracing::debug!(
            service_type = %contract.service_type,
            bytes = contents.len(),
            "rendered manifest"
        );
        Ok(GeneratedArtifact {
            file_name: format!("{}.manifest", contract.base_class_name.to_snake_case()),
            contents,
        })
    }
}

fn write_interface(
    w: &mut CodeWriter<&mut String>,
    interface: &InterfaceDescription,
) -> std::fmt::Result {
    for op in &interface.operations {
        write_operation(w, op)?;
    }
    for op in &interface.sync_over_async {
        cw_writeln!(w, "{}: sync over async {}", op.method.name, op.path())?;
    }
    for rejected in &interface.not_supported_operations {
        cw_writeln!(w, "not supported: {}", rejected.error)?;
    }
    for method in &interface.methods {
        cw_writeln!(w, "member {method}")?;
    }
    Ok(())
}

fn write_operation(w: &mut CodeWriter<&mut String>, op: &OperationDescription) -> std::fmt::Result {
    cw_writeln!(
        w,
        "{}: {} {} {}",
        op.operation_name,
        op.operation_type,
        op.path(),
        hex_u64(op.id.0)
    )?;
    let _indent = w.indent();
    if let Some(header) = &op.header_request {
        cw_writeln!(w, "header request:  {}", header.type_name())?;
    }
    cw_writeln!(w, "request:         {}", op.request.type_name())?;
    if let Some(header) = &op.header_response {
        cw_writeln!(w, "header response: {}", header.type_name())?;
    }
    cw_writeln!(w, "response:        {}", op.response.type_name())?;
    Ok(())
}
