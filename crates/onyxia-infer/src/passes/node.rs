//! Per-node resolution, validation and inference shared by the passes.
//!
//! A node moves through `Unresolved → SchemaResolved → AttributesValidated →
//! TypesConstrained` and then, when inference is requested, into one of the
//! terminal states. The report keeps the furthest state reached; its
//! diagnostics say why the node stopped there.

use crate::options::{ErrorPolicy, InferenceOptions, MissingSchemaPolicy};
use onyxia_onnx::{DataType, Graph, Node, NodeId, normalize_domain};
use onyxia_schema::{
    AttributeValidator, Diagnostic, DiagnosticKind, Error, FrozenRegistry, InferenceContext,
    InferenceOutcome, NodeRef, NodeReport, NodeState, OperatorId, Result, TensorType,
    TypeConstraintResolver, check_arity,
};

/// How far a pass takes each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Depth {
    /// Stop at `TypesConstrained`.
    Validate,
    /// Run the inference function.
    Infer,
}

pub(crate) struct NodeAnalysis {
    pub report: NodeReport,
    /// Output descriptors to write back, one per node output. Only set when
    /// the inference function returned successfully.
    pub staged: Option<Vec<TensorType>>,
}

pub(crate) fn analyze_node(
    graph: &Graph,
    index: NodeId,
    node: &Node,
    registry: &FrozenRegistry,
    options: &InferenceOptions,
    depth: Depth,
) -> NodeAnalysis {
    let _span = tracing::trace_span!("node", index, op_type = %node.op_type).entered();
    let mut tracker = Tracker {
        report: NodeReport::new(index),
        node: NodeRef::new(index, node),
    };

    let Some(version) = graph.opset_version_for(node) else {
        let domain = normalize_domain(&node.domain).to_string();
        return tracker.unresolved(DiagnosticKind::MissingOpsetImport { domain }, options);
    };
    let schema = match registry.lookup(&node.domain, &node.op_type, version) {
        Ok(schema) => schema,
        Err(not_found) => return tracker.unresolved(not_found.into(), options),
    };
    tracker.report.op = Some(schema.id().clone());
    tracker.advance(NodeState::SchemaResolved);

    let problems: Vec<DiagnosticKind> = check_arity(schema, node)
        .into_iter()
        .map(DiagnosticKind::from)
        .chain(
            AttributeValidator::new(schema)
                .validate(&node.attributes)
                .into_iter()
                .map(DiagnosticKind::from),
        )
        .collect();
    if !problems.is_empty() {
        return tracker.rejected(problems);
    }
    tracker.advance(NodeState::AttributesValidated);

    let inputs: Vec<Option<TensorType>> = node
        .inputs
        .iter()
        .map(|name| (!name.is_empty()).then(|| descriptor(graph, name)))
        .collect();
    let outputs: Vec<TensorType> = node
        .outputs
        .iter()
        .map(|name| {
            if name.is_empty() {
                TensorType::default()
            } else {
                descriptor(graph, name)
            }
        })
        .collect();

    let resolver = TypeConstraintResolver::new(schema);
    let input_types: Vec<Option<DataType>> = inputs
        .iter()
        .map(|input| input.as_ref().and_then(|t| t.dtype))
        .collect();
    let mut bindings = match resolver.resolve(&input_types, &element_types(&outputs)) {
        Ok(bindings) => bindings,
        Err(violation) => return tracker.rejected(vec![violation.into()]),
    };
    tracker.advance(NodeState::TypesConstrained);

    if depth == Depth::Validate {
        return tracker.finish(None);
    }

    let Some(function) = schema.inference_function() else {
        tracker.advance(NodeState::NoInferenceFunction);
        return tracker.finish(None);
    };

    let mut ctx = InferenceContext::new(node, schema, &bindings, inputs, outputs);
    let result = function.infer(&mut ctx);
    let staged = ctx.into_outputs();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(failure) => return tracker.failed(failure.into()),
    };
    if let Err(violation) = resolver.check_outputs(&mut bindings, &element_types(&staged)) {
        return tracker.failed(violation.into());
    }

    tracker.advance(match outcome {
        InferenceOutcome::Inferred => NodeState::ShapeInferred,
        InferenceOutcome::Deferred => NodeState::InferenceSkipped,
    });
    tracker.finish(Some(staged))
}

/// Write staged output descriptors into the graph.
pub(crate) fn commit(graph: &mut Graph, node: &Node, staged: Vec<TensorType>) -> Result<()> {
    for (name, output) in node.outputs.iter().zip(staged) {
        if name.is_empty() {
            continue;
        }
        let id = graph.ensure_tensor(name);
        let info = graph.tensor_mut(id)?;
        info.dtype = output.dtype;
        info.shape = output.shape;
    }
    Ok(())
}

/// Turn the node's first diagnostic into an error under fail-fast.
pub(crate) fn enforce_policy(options: &InferenceOptions, report: &NodeReport) -> Result<()> {
    match report.diagnostics.first() {
        Some(diagnostic) if options.error_policy == ErrorPolicy::FailFast => {
            Err(Error::Node(Box::new(diagnostic.clone())))
        }
        _ => Ok(()),
    }
}

fn descriptor(graph: &Graph, name: &str) -> TensorType {
    graph
        .tensor_by_name(name)
        .map(TensorType::from)
        .unwrap_or_default()
}

fn element_types(types: &[TensorType]) -> Vec<Option<DataType>> {
    types.iter().map(|t| t.dtype).collect()
}

struct Tracker {
    report: NodeReport,
    node: NodeRef,
}

impl Tracker {
    fn advance(&mut self, state: NodeState) {
        tracing::trace!(node = self.report.node, %state, "node state");
        self.report.state = state;
    }

    fn diagnostic(&self, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic::new(self.node.clone(), self.op(), kind)
    }

    fn op(&self) -> Option<OperatorId> {
        self.report.op.clone()
    }

    fn unresolved(mut self, kind: DiagnosticKind, options: &InferenceOptions) -> NodeAnalysis {
        match options.missing_schema {
            MissingSchemaPolicy::Skip => {
                tracing::warn!(node = %self.node, reason = %kind, "skipping unresolved node");
            }
            MissingSchemaPolicy::Error => {
                let diagnostic = self.diagnostic(kind);
                self.report.diagnostics.push(diagnostic);
            }
        }
        self.finish(None)
    }

    fn rejected(mut self, kinds: Vec<DiagnosticKind>) -> NodeAnalysis {
        for kind in kinds {
            let diagnostic = self.diagnostic(kind);
            tracing::debug!(%diagnostic, "node rejected");
            self.report.diagnostics.push(diagnostic);
        }
        self.finish(None)
    }

    fn failed(mut self, kind: DiagnosticKind) -> NodeAnalysis {
        let diagnostic = self.diagnostic(kind);
        tracing::warn!(%diagnostic, "inference failed");
        self.report.diagnostics.push(diagnostic);
        self.advance(NodeState::InferenceFailed);
        self.finish(None)
    }

    fn finish(self, staged: Option<Vec<TensorType>>) -> NodeAnalysis {
        NodeAnalysis {
            report: self.report,
            staged,
        }
    }
}
