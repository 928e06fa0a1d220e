use std::collections::{HashMap, HashSet, VecDeque};

use accord_envelope::EnvelopeRegistry;
use accord_schema::{MethodSignature, ResolvedType, TypeKind, TypeRef, TypeUniverse};

use crate::{
    AnalyzerOptions, ClassifyError, ContractDescription, ContractError, InterfaceDescription,
    NotSupportedOperation, OperationDescription, OperationType, classify, naming, render_chain,
    split,
};

/// One type in the expanded hierarchy.
struct Node {
    resolved: ResolvedType,
    key: String,
    /// Indices of direct bases, in declaration order.
    bases: Vec<usize>,
}

impl Node {
    fn is_interface(&self) -> bool {
        self.resolved.def.kind == TypeKind::Interface
    }

    fn is_service(&self) -> bool {
        self.is_interface() && self.resolved.def.is_service_contract()
    }

    fn declares_operations(&self) -> bool {
        self.resolved.methods.iter().any(MethodSignature::is_operation)
    }
}

pub(crate) struct Walker<'a> {
    universe: &'a TypeUniverse,
    envelopes: &'a EnvelopeRegistry,
    options: &'a AnalyzerOptions,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(
        universe: &'a TypeUniverse,
        envelopes: &'a EnvelopeRegistry,
        options: &'a AnalyzerOptions,
    ) -> Self {
        Self {
            universe,
            envelopes,
            options,
        }
    }

    pub(crate) fn walk(&self, root: &TypeRef) -> Result<ContractDescription, ContractError> {
        let nodes = self.discover(root)?;
        if let Some(cycle) = find_cycle(&nodes) {
            return Err(ContractError::CyclicHierarchy { cycle });
        }
        let ancestors: Vec<HashSet<usize>> = (0..nodes.len())
            .map(|i| transitive_bases(&nodes, i))
            .collect();
        let attachments = attach(&nodes, &ancestors);

        let mut services = Vec::new();
        let mut interfaces = Vec::new();
        for (index, node) in nodes.iter().enumerate() {
            if !node.is_interface() {
                continue;
            }
            if node.is_service() {
                services.push(self.describe_service(node));
            } else if let Some(&owner) = attachments.get(&index) {
                services.push(self.describe_attached(node, &nodes[owner]));
            } else {
                interfaces.push(describe_plain(node));
            }
        }

        resolve_collisions(&mut services, self.options.sync_over_async);

        let root_type = &nodes[0].resolved;
        let base = naming::base_class_name(&root_type.def, &root_type.args);
        let contract = ContractDescription {
            service_type: root_type.type_ref(),
            services,
            interfaces,
            client_class_name: naming::client_class_name(&base),
            contract_class_name: naming::contract_class_name(&base),
            client_builder_class_name: naming::client_builder_class_name(&base),
            endpoint_class_name: naming::endpoint_class_name(&base),
            base_class_name: base,
        };

        tracing::debug!(
            root = %contract.service_type,
            operations = contract.operations().count(),
            not_supported = contract.not_supported().count(),
            "analyzed contract"
        );
        Ok(contract)
    }

    /// Breadth-first expansion of `root` and everything it implements.
    fn discover(&self, root: &TypeRef) -> Result<Vec<Node>, ContractError> {
        let resolve = |ty: &TypeRef| {
            self.universe
                .resolve(ty)
                .map_err(|source| ContractError::Resolve {
                    ty: ty.to_string(),
                    source,
                })
        };

        let root = resolve(root)?;
        let mut index: HashMap<String, usize> = HashMap::new();
        index.insert(root.key(), 0);
        let mut nodes = vec![Node {
            key: root.key(),
            resolved: root,
            bases: Vec::new(),
        }];
        let mut queue = VecDeque::from([0]);

        while let Some(current) = queue.pop_front() {
            let bases = nodes[current].resolved.bases.clone();
            for base in &bases {
                let resolved = resolve(base)?;
                if resolved.def.kind != TypeKind::Interface {
                    return Err(ContractError::BaseNotInterface {
                        ty: nodes[current].key.clone(),
                        base: resolved.key(),
                    });
                }
                let key = resolved.key();
                let next = match index.get(&key) {
                    Some(&existing) => existing,
                    None => {
                        let next = nodes.len();
                        index.insert(key.clone(), next);
                        nodes.push(Node {
                            resolved,
                            key,
                            bases: Vec::new(),
                        });
                        queue.push_back(next);
                        next
                    }
                };
                if !nodes[current].bases.contains(&next) {
                    nodes[current].bases.push(next);
                }
            }
        }

        tracing::trace!(types = nodes.len(), "expanded hierarchy");
        Ok(nodes)
    }

    fn describe_service(&self, node: &Node) -> InterfaceDescription {
        let resolved = &node.resolved;
        let service_name = naming::service_name(&resolved.def, &resolved.args);
        let interface_type = resolved.type_ref();

        let mut desc = InterfaceDescription::new(interface_type.clone());
        for method in &resolved.methods {
            if !method.is_operation() {
                desc.not_supported_operations.push(NotSupportedOperation {
                    method: method.clone(),
                    error: format!(
                        "`{method}` is not a service operation: it carries no #[operation] attribute"
                    ),
                });
                continue;
            }
            self.bind_into(&mut desc, method, &service_name, &interface_type);
        }
        desc.service_name = Some(service_name);
        desc
    }

    fn describe_attached(&self, node: &Node, owner: &Node) -> InterfaceDescription {
        let owner_type = &owner.resolved;
        let service_name = naming::service_name(&owner_type.def, &owner_type.args);
        let interface_type = node.resolved.type_ref();

        let mut desc = InterfaceDescription::new(interface_type.clone());
        for method in &node.resolved.methods {
            if method.is_operation() {
                self.bind_into(&mut desc, method, &service_name, &interface_type);
            } else {
                desc.methods.push(method.clone());
            }
        }
        desc.service_name = Some(service_name);
        desc.attached_to = Some(owner_type.type_ref());
        desc
    }

    fn bind_into(
        &self,
        desc: &mut InterfaceDescription,
        method: &MethodSignature,
        service_name: &str,
        interface_type: &TypeRef,
    ) {
        match self.bind(method, service_name, interface_type) {
            Ok(op) => desc.operations.push(op),
            Err(err) => {
                let error = render_chain(&err);
                tracing::debug!(%error, "operation not supported");
                desc.not_supported_operations.push(NotSupportedOperation {
                    method: method.clone(),
                    error,
                });
            }
        }
    }

    fn bind(
        &self,
        method: &MethodSignature,
        service_name: &str,
        interface_type: &TypeRef,
    ) -> Result<OperationDescription, ClassifyError> {
        let classification = classify(method)?;
        let op_type = OperationType::of(&classification);
        let layout = split(method, &classification, op_type, self.envelopes);
        Ok(OperationDescription::new(
            service_name.to_string(),
            naming::operation_name(method),
            op_type,
            method.clone(),
            interface_type.clone(),
            layout,
            classification.is_async,
        ))
    }
}

fn describe_plain(node: &Node) -> InterfaceDescription {
    let mut desc = InterfaceDescription::new(node.resolved.type_ref());
    desc.methods = node.resolved.methods.clone();
    desc
}

fn transitive_bases(nodes: &[Node], start: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = nodes[start].bases.clone();
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(&nodes[i].bases);
        }
    }
    seen
}

/// Returns the keys along a cycle, first key repeated at the end.
fn find_cycle(nodes: &[Node]) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        nodes: &[Node],
        i: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        marks[i] = Mark::Active;
        path.push(i);
        for &next in &nodes[i].bases {
            match marks[next] {
                Mark::Active => {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|&p| nodes[p].key.clone()).collect();
                    cycle.push(nodes[next].key.clone());
                    return Some(cycle);
                }
                Mark::New => {
                    if let Some(cycle) = visit(nodes, next, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        path.pop();
        marks[i] = Mark::Done;
        None
    }

    let mut marks = vec![Mark::New; nodes.len()];
    let mut path = Vec::new();
    (0..nodes.len()).find_map(|i| {
        if marks[i] == Mark::New {
            visit(nodes, i, &mut marks, &mut path)
        } else {
            None
        }
    })
}

/// Map each attachable plain interface to the service that owns it.
///
/// The owner is the most derived service that transitively implements the
/// interface. Between unrelated candidates the first one discovered wins.
fn attach(nodes: &[Node], ancestors: &[HashSet<usize>]) -> HashMap<usize, usize> {
    let services: Vec<usize> = (0..nodes.len()).filter(|&i| nodes[i].is_service()).collect();
    let mut attachments = HashMap::new();

    for (plain, node) in nodes.iter().enumerate() {
        if !node.is_interface() || node.is_service() || !node.declares_operations() {
            continue;
        }
        let owners: Vec<usize> = services
            .iter()
            .copied()
            .filter(|&s| ancestors[s].contains(&plain))
            .collect();
        // drop any owner that a more derived owner also implements
        let most_derived: Vec<usize> = owners
            .iter()
            .copied()
            .filter(|&s| !owners.iter().any(|&o| o != s && ancestors[o].contains(&s)))
            .collect();

        let Some(&owner) = most_derived.first() else {
            continue;
        };
        if most_derived.len() > 1 {
            tracing::debug!(
                interface = %node.key,
                owner = %nodes[owner].key,
                candidates = most_derived.len(),
                "ambiguous attachment, using first discovered service"
            );
        }
        attachments.insert(plain, owner);
    }
    attachments
}

/// Demote every group of operations sharing a wire path, except sync/async
/// pairs when those are allowed.
fn resolve_collisions(services: &mut [InterfaceDescription], allow_sync_over_async: bool) {
    let mut order: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut groups: HashMap<(String, String), usize> = HashMap::new();
    for (si, service) in services.iter().enumerate() {
        for (oi, op) in service.operations.iter().enumerate() {
            let slot = *groups.entry(op.collision_key()).or_insert_with(|| {
                order.push(Vec::new());
                order.len() - 1
            });
            order[slot].push((si, oi));
        }
    }

    let mut demoted: HashMap<(usize, usize), String> = HashMap::new();
    let mut paired: HashSet<(usize, usize)> = HashSet::new();

    for members in order.iter().filter(|m| m.len() > 1) {
        let op = |&(si, oi): &(usize, usize)| &services[si].operations[oi];

        if allow_sync_over_async {
            if let Some(sync) = sync_partner(members, op) {
                tracing::debug!(path = %op(&sync).path(), "sync-over-async pair");
                paired.insert(sync);
                continue;
            }
        }

        let signatures: Vec<String> = members
            .iter()
            .map(|m| format!("`{}`", op(m).method))
            .collect();
        let error = format!(
            "operation `{}` is declared {} times: {}",
            op(&members[0]).path(),
            members.len(),
            signatures.join(", ")
        );
        tracing::warn!(%error, "operation name collision");
        for &member in members {
            demoted.insert(member, error.clone());
        }
    }

    if demoted.is_empty() && paired.is_empty() {
        return;
    }

    for (si, service) in services.iter_mut().enumerate() {
        let operations = std::mem::take(&mut service.operations);
        for (oi, op) in operations.into_iter().enumerate() {
            if let Some(error) = demoted.remove(&(si, oi)) {
                service.not_supported_operations.push(NotSupportedOperation {
                    method: op.method,
                    error,
                });
            } else if paired.contains(&(si, oi)) {
                service.sync_over_async.push(op);
            } else {
                service.operations.push(op);
            }
        }
    }
}

/// For a group of exactly one sync and one async unary operation with the
/// same envelopes, the position of the sync one.
fn sync_partner<'s>(
    members: &[(usize, usize)],
    op: impl Fn(&(usize, usize)) -> &'s OperationDescription,
) -> Option<(usize, usize)> {
    let [a, b] = members else {
        return None;
    };
    let (op_a, op_b) = (op(a), op(b));
    if op_a.operation_type != OperationType::Unary || op_b.operation_type != OperationType::Unary {
        return None;
    }
    if op_a.is_async == op_b.is_async || !op_a.same_envelopes(op_b) {
        return None;
    }
    Some(if op_a.is_async { *b } else { *a })
}
