//! Graph representation for ONNX models.
//!
//! This module defines the structured graph that schema validation and
//! shape/type inference operate on. Nodes are expected in topological order;
//! building and ordering the graph is the caller's job.

use crate::{OnnxError, Result, normalize_domain};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Unique identifier for a node in the graph.
pub type NodeId = usize;

/// Unique identifier for a tensor in the graph.
pub type TensorId = usize;

/// Internal graph representation of an ONNX model.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    /// All nodes (operations) in the graph, in topological order.
    pub nodes: Vec<Node>,

    /// All tensors in the graph, indexed by name.
    pub tensors: HashMap<String, TensorId>,

    /// Tensor metadata.
    pub tensor_info: Vec<TensorInfo>,

    /// Names of input tensors.
    pub inputs: Vec<String>,

    /// Names of output tensors.
    pub outputs: Vec<String>,

    /// Names of constant tensors available before the first node runs.
    pub initializers: Vec<String>,

    /// Opset version imported per (normalized) domain.
    pub opset_imports: HashMap<String, i64>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            tensors: HashMap::new(),
            tensor_info: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            initializers: Vec::new(),
            opset_imports: HashMap::new(),
        }
    }

    /// Get tensor ID by name.
    pub fn tensor_id(&self, name: &str) -> Result<TensorId> {
        self.tensors
            .get(name)
            .copied()
            .ok_or_else(|| OnnxError::MissingTensor(name.to_string()))
    }

    /// Get tensor info by ID.
    pub fn tensor(&self, id: TensorId) -> Result<&TensorInfo> {
        self.tensor_info
            .get(id)
            .ok_or_else(|| OnnxError::InvalidGraph(format!("Invalid tensor ID: {}", id)))
    }

    /// Get mutable tensor info by ID.
    pub fn tensor_mut(&mut self, id: TensorId) -> Result<&mut TensorInfo> {
        self.tensor_info
            .get_mut(id)
            .ok_or_else(|| OnnxError::InvalidGraph(format!("Invalid tensor ID: {}", id)))
    }

    /// Get tensor info by name.
    pub fn tensor_by_name(&self, name: &str) -> Result<&TensorInfo> {
        let id = self.tensor_id(name)?;
        self.tensor(id)
    }

    /// Add a tensor to the graph.
    ///
    /// Adding a tensor whose name already exists replaces the previous entry's
    /// metadata and keeps its ID.
    pub fn add_tensor(&mut self, info: TensorInfo) -> TensorId {
        if let Some(&id) = self.tensors.get(&info.name) {
            self.tensor_info[id] = info;
            return id;
        }
        let id = self.tensor_info.len();
        let name = info.name.clone();
        self.tensor_info.push(info);
        self.tensors.insert(name, id);
        id
    }

    /// Declare a graph input.
    pub fn add_input(&mut self, info: TensorInfo) -> TensorId {
        let name = info.name.clone();
        let id = self.add_tensor(info);
        if !self.inputs.contains(&name) {
            self.inputs.push(name);
        }
        id
    }

    /// Declare a constant tensor.
    pub fn add_initializer(&mut self, info: TensorInfo) -> TensorId {
        let name = info.name.clone();
        let id = self.add_tensor(info);
        if !self.initializers.contains(&name) {
            self.initializers.push(name);
        }
        id
    }

    /// Get the ID of a tensor, creating an empty descriptor if it is missing.
    pub fn ensure_tensor(&mut self, name: &str) -> TensorId {
        match self.tensors.get(name) {
            Some(&id) => id,
            None => self.add_tensor(TensorInfo::new(name)),
        }
    }

    /// Add a node to the graph.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Declare the opset version imported for a domain.
    pub fn set_opset_import(&mut self, domain: &str, version: i64) -> &mut Self {
        self.opset_imports
            .insert(normalize_domain(domain).to_string(), version);
        self
    }

    /// Opset version a node is checked against.
    ///
    /// A version set on the node itself wins over the graph's import for the
    /// node's domain.
    pub fn opset_version_for(&self, node: &Node) -> Option<i64> {
        node.opset_version.or_else(|| {
            self.opset_imports
                .get(normalize_domain(&node.domain))
                .copied()
        })
    }

    /// Validate graph structure.
    ///
    /// Every node input must be a graph input, an initializer, or the output
    /// of an earlier node. Descriptors left behind by a previous inference
    /// run do not count, so out-of-order nodes are caught on every run.
    pub fn validate(&self) -> Result<()> {
        for name in self
            .inputs
            .iter()
            .chain(&self.outputs)
            .chain(&self.initializers)
        {
            self.tensor_id(name)?;
        }

        let mut available: HashSet<&str> = self
            .inputs
            .iter()
            .chain(&self.initializers)
            .map(String::as_str)
            .collect();
        for node in &self.nodes {
            // Empty names mark absent optional inputs
            if let Some(input) = node
                .inputs
                .iter()
                .find(|input| !input.is_empty() && !available.contains(input.as_str()))
            {
                return Err(OnnxError::InvalidGraph(format!(
                    "Node '{}' ({}) reads tensor '{}' before any input, initializer or earlier node provides it",
                    node.name, node.op_type, input
                )));
            }
            available.extend(node.outputs.iter().map(String::as_str));
        }

        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// A node (operation) in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node name (may be empty).
    pub name: String,

    /// Operation type (e.g., "Scale", "GivenTensorFill").
    pub op_type: String,

    /// Input tensor names. An empty name marks an absent optional input.
    pub inputs: Vec<String>,

    /// Output tensor names.
    pub outputs: Vec<String>,

    /// Node attributes.
    pub attributes: HashMap<String, AttributeValue>,

    /// Operator domain ("" is the default ONNX domain).
    pub domain: String,

    /// Requested opset version, overriding the graph's import for the domain.
    pub opset_version: Option<i64>,
}

impl Node {
    /// Create a new node.
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: HashMap::new(),
            domain: String::new(),
            opset_version: None,
        }
    }

    /// Set the node name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the operator domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Pin the opset version this node is checked against.
    pub fn with_opset_version(mut self, version: i64) -> Self {
        self.opset_version = Some(version);
        self
    }

    /// Append an input tensor name.
    pub fn with_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(name.into());
        self
    }

    /// Append an output tensor name.
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    /// Set an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Display label used in diagnostics: the name, or the op type if unnamed.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.op_type
        } else {
            &self.name
        }
    }
}

/// Declared kind of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Float,
    Int,
    String,
    Tensor,
    Graph,
    Floats,
    Ints,
    Strings,
    Tensors,
    Graphs,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Float => "FLOAT",
            AttributeType::Int => "INT",
            AttributeType::String => "STRING",
            AttributeType::Tensor => "TENSOR",
            AttributeType::Graph => "GRAPH",
            AttributeType::Floats => "FLOATS",
            AttributeType::Ints => "INTS",
            AttributeType::Strings => "STRINGS",
            AttributeType::Tensors => "TENSORS",
            AttributeType::Graphs => "GRAPHS",
        };
        f.write_str(name)
    }
}

/// Tensor-valued attribute payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeTensor {
    pub dtype: DataType,
    pub dims: Vec<usize>,
    /// Little-endian element bytes.
    pub raw_data: Vec<u8>,
}

/// Attribute value types.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Tensor(AttributeTensor),
    Graph(Box<Graph>),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
    Tensors(Vec<AttributeTensor>),
    Graphs(Vec<Graph>),
}

impl AttributeValue {
    /// The runtime kind of this value.
    pub fn kind(&self) -> AttributeType {
        match self {
            AttributeValue::Float(_) => AttributeType::Float,
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Tensor(_) => AttributeType::Tensor,
            AttributeValue::Graph(_) => AttributeType::Graph,
            AttributeValue::Floats(_) => AttributeType::Floats,
            AttributeValue::Ints(_) => AttributeType::Ints,
            AttributeValue::Strings(_) => AttributeType::Strings,
            AttributeValue::Tensors(_) => AttributeType::Tensors,
            AttributeValue::Graphs(_) => AttributeType::Graphs,
        }
    }
}

/// Information about a tensor.
///
/// Both the element type and the shape may be unknown until inference fills
/// them in.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    /// Tensor name.
    pub name: String,

    /// Element type, if known.
    pub dtype: Option<DataType>,

    /// Tensor shape.
    pub shape: TensorShape,
}

impl TensorInfo {
    /// Create a descriptor with unknown element type and shape.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            shape: TensorShape::Unknown,
        }
    }

    /// Set the element type.
    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    /// Set the shape.
    pub fn with_shape(mut self, shape: TensorShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Element types supported by ONNX tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    BF16,
    F32,
    F64,
    String,
}

impl DataType {
    /// Every element type, in declaration order.
    pub const ALL: [DataType; 14] = [
        DataType::Bool,
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::U8,
        DataType::U16,
        DataType::U32,
        DataType::U64,
        DataType::F16,
        DataType::BF16,
        DataType::F32,
        DataType::F64,
        DataType::String,
    ];

    /// ONNX element type name (e.g. "float", "int64").
    pub fn onnx_name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::I8 => "int8",
            DataType::I16 => "int16",
            DataType::I32 => "int32",
            DataType::I64 => "int64",
            DataType::U8 => "uint8",
            DataType::U16 => "uint16",
            DataType::U32 => "uint32",
            DataType::U64 => "uint64",
            DataType::F16 => "float16",
            DataType::BF16 => "bfloat16",
            DataType::F32 => "float",
            DataType::F64 => "double",
            DataType::String => "string",
        }
    }

    /// ONNX tensor type string (e.g. "tensor(float)").
    pub fn type_str(&self) -> String {
        format!("tensor({})", self.onnx_name())
    }

    /// Parse an ONNX tensor type string such as "tensor(int64)".
    pub fn from_type_str(s: &str) -> Result<Self> {
        let inner = s
            .trim()
            .strip_prefix("tensor(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| OnnxError::UnsupportedDataType(s.to_string()))?;

        DataType::ALL
            .into_iter()
            .find(|dtype| dtype.onnx_name() == inner)
            .ok_or_else(|| OnnxError::UnsupportedDataType(s.to_string()))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.onnx_name())
    }
}

/// Every tensor type string, usable as a constraint's allowed set.
pub fn all_tensor_types() -> Vec<String> {
    DataType::ALL.iter().map(DataType::type_str).collect()
}

/// Tensor shape representation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TensorShape {
    /// Rank is known; each dimension may still be symbolic or unknown.
    Ranked(Vec<Dimension>),

    /// Nothing is known about the shape, not even its rank.
    #[default]
    Unknown,
}

impl TensorShape {
    /// Shape with every dimension known.
    pub fn fixed(dims: &[usize]) -> Self {
        TensorShape::Ranked(dims.iter().map(|&d| Dimension::Static(d)).collect())
    }

    /// Check if the rank is known.
    pub fn is_ranked(&self) -> bool {
        matches!(self, TensorShape::Ranked(_))
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TensorShape::Unknown => f.write_str("?"),
            TensorShape::Ranked(dims) => {
                f.write_str("[")?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", dim)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A single dimension in a tensor shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Static dimension with known size.
    Static(usize),

    /// Named symbolic dimension (e.g., "batch", "sequence", "N").
    Named(String),

    /// Dimension exists but its size is not known.
    Unknown,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Static(n) => write!(f, "{}", n),
            Dimension::Named(name) => f.write_str(name),
            Dimension::Unknown => f.write_str("?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_creation() {
        let mut graph = Graph::new();

        let tensor = TensorInfo::new("input")
            .with_dtype(DataType::F32)
            .with_shape(TensorShape::fixed(&[1, 3, 224, 224]));

        let id = graph.add_tensor(tensor);
        assert_eq!(id, 0);
        assert_eq!(graph.tensor_id("input").unwrap(), 0);
        assert_eq!(graph.ensure_tensor("input"), 0);
        assert_eq!(graph.ensure_tensor("fresh"), 1);
        assert_eq!(graph.tensor(1).unwrap().dtype, None);
    }

    #[test]
    fn test_attribute_kinds() {
        let node = Node::new("GivenTensorFill")
            .with_attr("extra_shape", AttributeValue::Ints(vec![2, 5]))
            .with_attr("input_as_shape", AttributeValue::Int(0));

        assert_eq!(node.attributes["extra_shape"].kind(), AttributeType::Ints);
        assert_eq!(node.attributes["input_as_shape"].kind(), AttributeType::Int);
        assert_eq!(AttributeType::Floats.to_string(), "FLOATS");
        assert_eq!(node.label(), "GivenTensorFill");
    }

    #[test]
    fn test_type_strings() {
        assert_eq!(DataType::from_type_str("tensor(float)").unwrap(), DataType::F32);
        assert_eq!(DataType::from_type_str("tensor(float16)").unwrap(), DataType::F16);
        assert_eq!(DataType::from_type_str("tensor(int64)").unwrap(), DataType::I64);
        assert_eq!(DataType::F64.type_str(), "tensor(double)");
        assert!(DataType::from_type_str("tensor(float128)").is_err());
        assert!(DataType::from_type_str("float").is_err());
        assert_eq!(all_tensor_types().len(), DataType::ALL.len());
    }

    #[test]
    fn test_opset_resolution() {
        let mut graph = Graph::new();
        graph.set_opset_import("ai.onnx", 7);

        let node = Node::new("Scale");
        assert_eq!(graph.opset_version_for(&node), Some(7));

        let pinned = Node::new("Scale").with_opset_version(3);
        assert_eq!(graph.opset_version_for(&pinned), Some(3));

        let custom = Node::new("Foo").with_domain("com.example");
        assert_eq!(graph.opset_version_for(&custom), None);
    }

    #[test]
    fn test_validate_rejects_unknown_input() {
        let mut graph = Graph::new();
        graph.add_node(Node::new("Scale").with_input("x").with_output("y"));
        assert!(graph.validate().is_err());

        // A bare descriptor is not an input
        graph.add_tensor(TensorInfo::new("x"));
        assert!(graph.validate().is_err());

        graph.add_input(TensorInfo::new("x"));
        assert!(graph.validate().is_ok());
        assert_eq!(graph.inputs, vec!["x".to_string()]);

        // Produced by an earlier node, no declaration needed
        graph.add_node(Node::new("Scale").with_input("y").with_output("z"));
        assert!(graph.validate().is_ok());

        // Initializers are available from the start
        graph.add_initializer(TensorInfo::new("w"));
        graph.add_node(Node::new("Scale").with_input("w").with_output("v"));
        assert!(graph.validate().is_ok());

        // Read before it is produced
        graph.nodes.insert(0, Node::new("Scale").with_input("z").with_output("u"));
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_ignores_descriptors_of_later_outputs() {
        let mut graph = Graph::new();
        graph.add_input(TensorInfo::new("x"));
        graph.add_node(Node::new("Scale").with_input("a").with_output("b"));
        graph.add_node(Node::new("Scale").with_input("x").with_output("a"));

        // As left behind by an earlier inference run
        graph.ensure_tensor("a");
        graph.ensure_tensor("b");

        assert!(matches!(graph.validate(), Err(OnnxError::InvalidGraph(msg)) if msg.contains("'a'")));
    }

    #[test]
    fn test_tensor_shape() {
        let static_shape = TensorShape::fixed(&[1, 2, 3]);
        assert!(static_shape.is_ranked());
        assert_eq!(static_shape.to_string(), "[1, 2, 3]");

        let dynamic_shape = TensorShape::Ranked(vec![
            Dimension::Named("batch".to_string()),
            Dimension::Unknown,
            Dimension::Static(512),
        ]);
        assert_eq!(dynamic_shape.to_string(), "[batch, ?, 512]");

        assert!(!TensorShape::Unknown.is_ranked());
        assert_eq!(TensorShape::Unknown.to_string(), "?");
    }
}
