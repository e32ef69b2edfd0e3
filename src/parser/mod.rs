//! Parsing pipeline for the textual IR.
//!
//! Two stages. The grammar stage ([`grammar`]) turns source text into a
//! [`SyntaxTree`] whose nodes carry [`Production`] labels and ordered,
//! already-reduced children. The transform stage here folds that tree bottom
//! up into the typed AST: one [`reduce`] step per production, each consuming
//! fully-built child values. Structural surprises (wrong child count, wrong
//! child kind) and literal decode failures abort the whole transformation;
//! there is no partial result.

pub mod grammar;
pub mod syntax;

pub use grammar::{ParseError, parse_syntax};

use crate::ast;
use syntax::{Production, SyntaxElement, SyntaxTree};

// ============================================================================
// Errors
// ============================================================================

/// Fault raised while folding a syntax tree into the AST.
///
/// `Malformed` and `Mismatch` are structural faults: the tree shape
/// disagrees with what the grammar guarantees. `Literal` is a decode fault:
/// a lexeme refused to become its target primitive. Both families indicate an
/// internal inconsistency rather than a user error, and abort the parse.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum TransformError {
    #[display("malformed {production:?} node: expected {expected}")]
    Malformed {
        production: Production,
        expected: &'static str,
    },

    #[display("{production:?} node: expected {expected}, found {found}")]
    Mismatch {
        production: Production,
        expected: &'static str,
        found: &'static str,
    },

    #[display("cannot decode {lexeme:?} as {target} in {production:?}")]
    Literal {
        production: Production,
        lexeme: String,
        target: &'static str,
    },

    #[display("duplicate attribute name {name:?}")]
    DuplicateAttribute { name: String },

    #[display("operation {name:?} has {operands} operands but its type lists {inputs} inputs")]
    OperandCount {
        name: String,
        operands: usize,
        inputs: usize,
    },

    #[display("unlabeled block at position {index} is not the region entry")]
    AnonymousBlock { index: usize },
}

// ============================================================================
// Intermediate values
// ============================================================================

/// Value produced by reducing one production. Leaf productions yield
/// primitives, list productions yield `List`, and everything else yields the
/// finished AST node for that production.
#[derive(Debug, PartialEq)]
enum Node {
    Token(String),
    Int(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<Node>),
    SsaId(ast::SsaId),
    SymbolRef(ast::SymbolRefId),
    BlockId(ast::BlockId),
    TypeAlias(ast::TypeAlias),
    MapOrSetId(ast::MapOrSetId),
    FloatKind(ast::FloatKind),
    Dimension(ast::Dimension),
    StridedLayout(ast::StridedLayout),
    Type(ast::Type),
    Attribute(ast::Attribute),
    Entry(ast::AttributeEntry),
    Dict(ast::AttributeDict),
    OpResult(ast::OpResult),
    Location(ast::FileLineColLoc),
    Operation(ast::Operation),
    BlockLabel(ast::BlockLabel),
    Block(ast::Block),
    Region(ast::Region),
    SsaIdAndType(ast::SsaIdAndType),
    NamedArgument(ast::NamedArgument),
    Function(ast::Function),
    Module(ast::Module),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Token(_) => "token",
            Node::Int(_) => "integer",
            Node::Float(_) => "float",
            Node::Bool(_) => "boolean",
            Node::Text(_) => "text",
            Node::List(_) => "list",
            Node::SsaId(_) => "ssa id",
            Node::SymbolRef(_) => "symbol reference",
            Node::BlockId(_) => "block id",
            Node::TypeAlias(_) => "type alias",
            Node::MapOrSetId(_) => "map or set id",
            Node::FloatKind(_) => "float kind",
            Node::Dimension(_) => "dimension",
            Node::StridedLayout(_) => "strided layout",
            Node::Type(_) => "type",
            Node::Attribute(_) => "attribute",
            Node::Entry(_) => "attribute entry",
            Node::Dict(_) => "attribute dictionary",
            Node::OpResult(_) => "op result",
            Node::Location(_) => "location",
            Node::Operation(_) => "operation",
            Node::BlockLabel(_) => "block label",
            Node::Block(_) => "block",
            Node::Region(_) => "region",
            Node::SsaIdAndType(_) => "ssa id and type",
            Node::NamedArgument(_) => "named argument",
            Node::Function(_) => "function",
            Node::Module(_) => "module",
        }
    }

    fn mismatch(self, production: Production, expected: &'static str) -> TransformError {
        TransformError::Mismatch {
            production,
            expected,
            found: self.kind(),
        }
    }

    fn into_text(self, production: Production) -> Result<String, TransformError> {
        match self {
            Node::Token(text) | Node::Text(text) => Ok(text),
            other => Err(other.mismatch(production, "text")),
        }
    }

    fn into_int(self, production: Production) -> Result<u64, TransformError> {
        match self {
            Node::Int(value) => Ok(value),
            other => Err(other.mismatch(production, "integer")),
        }
    }

    fn into_float(self, production: Production) -> Result<f64, TransformError> {
        match self {
            Node::Float(value) => Ok(value),
            other => Err(other.mismatch(production, "float")),
        }
    }

    fn into_bool(self, production: Production) -> Result<bool, TransformError> {
        match self {
            Node::Bool(value) => Ok(value),
            other => Err(other.mismatch(production, "boolean")),
        }
    }

    fn into_list(self, production: Production) -> Result<Vec<Node>, TransformError> {
        match self {
            Node::List(items) => Ok(items),
            other => Err(other.mismatch(production, "list")),
        }
    }

    fn into_type(self, production: Production) -> Result<ast::Type, TransformError> {
        match self {
            Node::Type(ty) => Ok(ty),
            Node::TypeAlias(alias) => Ok(ast::Type::Alias(alias)),
            other => Err(other.mismatch(production, "type")),
        }
    }

    fn into_attribute(self, production: Production) -> Result<ast::Attribute, TransformError> {
        match self {
            Node::Attribute(attr) => Ok(attr),
            other => Err(other.mismatch(production, "attribute")),
        }
    }

    fn into_entry(self, production: Production) -> Result<ast::AttributeEntry, TransformError> {
        match self {
            Node::Entry(entry) => Ok(entry),
            other => Err(other.mismatch(production, "attribute entry")),
        }
    }

    fn into_dict(self, production: Production) -> Result<ast::AttributeDict, TransformError> {
        match self {
            Node::Dict(dict) => Ok(dict),
            other => Err(other.mismatch(production, "attribute dictionary")),
        }
    }

    fn into_ssa_id(self, production: Production) -> Result<ast::SsaId, TransformError> {
        match self {
            Node::SsaId(id) => Ok(id),
            other => Err(other.mismatch(production, "ssa id")),
        }
    }

    fn into_symbol_ref(self, production: Production) -> Result<ast::SymbolRefId, TransformError> {
        match self {
            Node::SymbolRef(id) => Ok(id),
            other => Err(other.mismatch(production, "symbol reference")),
        }
    }

    fn into_block_id(self, production: Production) -> Result<ast::BlockId, TransformError> {
        match self {
            Node::BlockId(id) => Ok(id),
            other => Err(other.mismatch(production, "block id")),
        }
    }

    fn into_map_or_set(self, production: Production) -> Result<ast::MapOrSetId, TransformError> {
        match self {
            Node::MapOrSetId(id) => Ok(id),
            other => Err(other.mismatch(production, "map or set id")),
        }
    }

    fn into_float_kind(self, production: Production) -> Result<ast::FloatKind, TransformError> {
        match self {
            Node::FloatKind(kind) => Ok(kind),
            other => Err(other.mismatch(production, "float kind")),
        }
    }

    /// Vector shapes arrive as plain integers, tensor/memref shapes as
    /// dimension nodes; both are extents.
    fn into_dimension(self, production: Production) -> Result<ast::Dimension, TransformError> {
        match self {
            Node::Dimension(dim) => Ok(dim),
            Node::Int(value) => Ok(ast::Dimension::Known(value)),
            other => Err(other.mismatch(production, "dimension")),
        }
    }

    fn into_strided_layout(
        self,
        production: Production,
    ) -> Result<ast::StridedLayout, TransformError> {
        match self {
            Node::StridedLayout(layout) => Ok(layout),
            other => Err(other.mismatch(production, "strided layout")),
        }
    }

    fn into_op_result(self, production: Production) -> Result<ast::OpResult, TransformError> {
        match self {
            Node::OpResult(result) => Ok(result),
            other => Err(other.mismatch(production, "op result")),
        }
    }

    fn into_ssa_id_and_type(
        self,
        production: Production,
    ) -> Result<ast::SsaIdAndType, TransformError> {
        match self {
            Node::SsaIdAndType(arg) => Ok(arg),
            other => Err(other.mismatch(production, "ssa id and type")),
        }
    }

    fn into_named_argument(
        self,
        production: Production,
    ) -> Result<ast::NamedArgument, TransformError> {
        match self {
            Node::NamedArgument(arg) => Ok(arg),
            other => Err(other.mismatch(production, "named argument")),
        }
    }

    fn into_block(self, production: Production) -> Result<ast::Block, TransformError> {
        match self {
            Node::Block(block) => Ok(block),
            other => Err(other.mismatch(production, "block")),
        }
    }
}

// ============================================================================
// Reduction helpers
// ============================================================================

/// List-shaped productions all reduce the same way: keep the children as an
/// ordered sequence.
fn collect(children: Vec<Node>) -> Node {
    Node::List(children)
}

fn only_child(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    let mut children = children.into_iter();
    match (children.next(), children.next()) {
        (Some(node), None) => Ok(node),
        _ => Err(TransformError::Malformed {
            production,
            expected: "exactly one child",
        }),
    }
}

/// Optional parenthesized lists: the single child when present, an empty
/// sequence when absent.
fn child_or_empty(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    let mut children = children.into_iter();
    match (children.next(), children.next()) {
        (None, None) => Ok(Node::List(Vec::new())),
        (Some(node), None) => Ok(node),
        _ => Err(TransformError::Malformed {
            production,
            expected: "at most one child",
        }),
    }
}

fn marker(production: Production, children: Vec<Node>, node: Node) -> Result<Node, TransformError> {
    if children.is_empty() {
        Ok(node)
    } else {
        Err(TransformError::Malformed {
            production,
            expected: "no children",
        })
    }
}

/// Lexical fragments may arrive one per character or as longer runs; either
/// way they concatenate with no separator.
fn concat_text(production: Production, children: Vec<Node>) -> Result<String, TransformError> {
    let mut joined = String::new();
    for child in children {
        joined.push_str(&child.into_text(production)?);
    }
    Ok(joined)
}

fn pair(production: Production, children: Vec<Node>) -> Result<(Node, Node), TransformError> {
    let mut children = children.into_iter();
    match (children.next(), children.next(), children.next()) {
        (Some(first), Some(second), None) => Ok((first, second)),
        _ => Err(TransformError::Malformed {
            production,
            expected: "exactly two children",
        }),
    }
}

fn triple(
    production: Production,
    children: Vec<Node>,
) -> Result<(Node, Node, Node), TransformError> {
    let mut children = children.into_iter();
    match (
        children.next(),
        children.next(),
        children.next(),
        children.next(),
    ) {
        (Some(first), Some(second), Some(third), None) => Ok((first, second, third)),
        _ => Err(TransformError::Malformed {
            production,
            expected: "exactly three children",
        }),
    }
}

/// A type list, normalizing a bare single type to a one-element sequence.
fn into_type_list(production: Production, node: Node) -> Result<Vec<ast::Type>, TransformError> {
    match node {
        Node::List(items) => items
            .into_iter()
            .map(|item| item.into_type(production))
            .collect(),
        other => Ok(vec![other.into_type(production)?]),
    }
}

fn into_dimensions(
    production: Production,
    node: Node,
) -> Result<Vec<ast::Dimension>, TransformError> {
    node.into_list(production)?
        .into_iter()
        .map(|item| item.into_dimension(production))
        .collect()
}

/// Assemble dictionary entries, preserving order. A repeated name is
/// rejected as malformed input.
fn build_dict(
    production: Production,
    children: Vec<Node>,
) -> Result<ast::AttributeDict, TransformError> {
    let mut dict: ast::AttributeDict = Vec::with_capacity(children.len());
    for child in children {
        let entry = child.into_entry(production)?;
        if dict.iter().any(|existing| existing.name == entry.name) {
            return Err(TransformError::DuplicateAttribute { name: entry.name });
        }
        dict.push(entry);
    }
    Ok(dict)
}

// ============================================================================
// The fold
// ============================================================================

fn fold(tree: SyntaxTree) -> Result<Node, TransformError> {
    let mut reduced = Vec::with_capacity(tree.children.len());
    for child in tree.children {
        match child {
            SyntaxElement::Token(lexeme) => reduced.push(Node::Token(lexeme)),
            SyntaxElement::Node(node) => reduced.push(fold(node)?),
        }
    }
    reduce(tree.production, reduced)
}

/// Reduce one production from its already-reduced children. This is the
/// whole grammar-to-AST mapping in one place: every production has exactly
/// one arm, and an arm that receives children the grammar should never give
/// it fails loudly instead of guessing.
fn reduce(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    match production {
        // ---- lexical fragments -------------------------------------------
        Production::Digit
        | Production::HexDigit
        | Production::Letter
        | Production::IdPunct
        | Production::Underscore
        | Production::IdChars => concat_text(production, children).map(Node::Text),

        Production::True => marker(production, children, Node::Bool(true)),
        Production::False => marker(production, children, Node::Bool(false)),

        Production::BoolLiteral | Production::IntegerLiteral | Production::ConstantLiteral => {
            only_child(production, children)
        }

        // An empty digit concatenation fails the integer parse below.
        Production::DecimalLiteral => {
            let lexeme = concat_text(production, children)?;
            let value = lexeme
                .parse::<u64>()
                .map_err(|_| TransformError::Literal {
                    production,
                    lexeme,
                    target: "u64",
                })?;
            Ok(Node::Int(value))
        }

        // Hex stays textual so constants wider than the native integer
        // round-trip unchanged.
        Production::HexadecimalLiteral => {
            let digits = concat_text(production, children)?;
            Ok(Node::Text(format!("0x{}", digits)))
        }

        Production::FloatLiteral => {
            let lexeme = only_child(production, children)?.into_text(production)?;
            let value = lexeme
                .parse::<f64>()
                .map_err(|_| TransformError::Literal {
                    production,
                    lexeme,
                    target: "f64",
                })?;
            Ok(Node::Float(value))
        }

        // Strip the quotes and decode the one escape this layer knows.
        Production::StringLiteral => {
            let lexeme = only_child(production, children)?.into_text(production)?;
            let inner = lexeme
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .ok_or_else(|| TransformError::Literal {
                    production,
                    lexeme: lexeme.clone(),
                    target: "quoted string",
                })?;
            Ok(Node::Text(inner.replace("\\\"", "\"")))
        }

        Production::BareId | Production::SuffixId => {
            concat_text(production, children).map(Node::Text)
        }

        // ---- dimensions --------------------------------------------------
        Production::Dimension => {
            let mut children = children.into_iter();
            match (children.next(), children.next()) {
                (None, None) => Ok(Node::Dimension(ast::Dimension::Unknown)),
                (Some(extent), None) => Ok(Node::Dimension(ast::Dimension::Known(
                    extent.into_int(production)?,
                ))),
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "at most one extent",
                }),
            }
        }

        Production::StaticDimensionList
        | Production::DimensionListRanked
        | Production::DimensionList
        | Production::StrideList => Ok(collect(children)),

        // ---- identifiers -------------------------------------------------
        Production::SsaId => {
            let mut children = children.into_iter();
            match (children.next(), children.next(), children.next()) {
                (Some(name), None, None) => Ok(Node::SsaId(ast::SsaId {
                    name: name.into_text(production)?,
                    index: None,
                })),
                (Some(name), Some(index), None) => Ok(Node::SsaId(ast::SsaId {
                    name: name.into_text(production)?,
                    index: Some(index.into_int(production)?),
                })),
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "a name with an optional index",
                }),
            }
        }

        Production::SymbolRefId => {
            let name = only_child(production, children)?.into_text(production)?;
            Ok(Node::SymbolRef(ast::SymbolRefId::new(name)))
        }

        Production::BlockId => {
            let name = only_child(production, children)?.into_text(production)?;
            Ok(Node::BlockId(ast::BlockId::new(name)))
        }

        Production::TypeAlias => {
            let name = only_child(production, children)?.into_text(production)?;
            Ok(Node::TypeAlias(ast::TypeAlias::new(name)))
        }

        Production::MapOrSetId => {
            let name = only_child(production, children)?.into_text(production)?;
            Ok(Node::MapOrSetId(ast::MapOrSetId::new(name)))
        }

        // ---- types -------------------------------------------------------
        Production::NoneType => marker(production, children, Node::Type(ast::Type::None)),
        Production::IndexType => marker(production, children, Node::Type(ast::Type::Index)),

        Production::F16 => marker(production, children, Node::FloatKind(ast::FloatKind::F16)),
        Production::Bf16 => marker(production, children, Node::FloatKind(ast::FloatKind::BF16)),
        Production::F32 => marker(production, children, Node::FloatKind(ast::FloatKind::F32)),
        Production::F64 => marker(production, children, Node::FloatKind(ast::FloatKind::F64)),

        Production::FloatType => {
            let kind = only_child(production, children)?.into_float_kind(production)?;
            Ok(Node::Type(ast::Type::Float(kind)))
        }

        Production::IntegerType => {
            let lexeme = only_child(production, children)?.into_text(production)?;
            let (signedness, width) = if let Some(rest) = lexeme.strip_prefix("si") {
                (ast::Signedness::Signed, rest)
            } else if let Some(rest) = lexeme.strip_prefix("ui") {
                (ast::Signedness::Unsigned, rest)
            } else if let Some(rest) = lexeme.strip_prefix('i') {
                (ast::Signedness::Signless, rest)
            } else {
                return Err(TransformError::Literal {
                    production,
                    lexeme,
                    target: "integer type",
                });
            };
            let width = width.parse::<u32>().map_err(|_| TransformError::Literal {
                production,
                lexeme: lexeme.clone(),
                target: "integer width",
            })?;
            Ok(Node::Type(ast::Type::Integer { signedness, width }))
        }

        Production::ComplexType => {
            let element = only_child(production, children)?.into_type(production)?;
            Ok(Node::Type(ast::Type::Complex(Box::new(element))))
        }

        Production::TupleType => {
            let items = only_child(production, children)?;
            Ok(Node::Type(ast::Type::Tuple(into_type_list(
                production, items,
            )?)))
        }

        Production::VectorType => {
            let (dimensions, element) = pair(production, children)?;
            Ok(Node::Type(ast::Type::Vector {
                dimensions: into_dimensions(production, dimensions)?,
                element: Box::new(element.into_type(production)?),
            }))
        }

        Production::RankedTensorType => {
            let (dimensions, element) = pair(production, children)?;
            Ok(Node::Type(ast::Type::RankedTensor {
                dimensions: into_dimensions(production, dimensions)?,
                element: Box::new(element.into_type(production)?),
            }))
        }

        Production::UnrankedTensorType => {
            let element = only_child(production, children)?.into_type(production)?;
            Ok(Node::Type(ast::Type::UnrankedTensor {
                element: Box::new(element),
            }))
        }

        Production::RankedMemrefType => {
            let mut children = children.into_iter();
            match (
                children.next(),
                children.next(),
                children.next(),
                children.next(),
            ) {
                (Some(dimensions), Some(element), layout, None) => {
                    let layout = match layout {
                        Some(node) => Some(node.into_strided_layout(production)?),
                        None => None,
                    };
                    Ok(Node::Type(ast::Type::RankedMemref {
                        dimensions: into_dimensions(production, dimensions)?,
                        element: Box::new(element.into_type(production)?),
                        layout,
                    }))
                }
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "shape, element type, and optional layout",
                }),
            }
        }

        Production::UnrankedMemrefType => {
            let element = only_child(production, children)?.into_type(production)?;
            Ok(Node::Type(ast::Type::UnrankedMemref {
                element: Box::new(element),
            }))
        }

        Production::OpaqueDialectItem => {
            let (dialect, contents) = pair(production, children)?;
            Ok(Node::Type(ast::Type::OpaqueDialect {
                dialect: dialect.into_text(production)?,
                contents: contents.into_text(production)?,
            }))
        }

        Production::PrettyDialectItem => {
            let (dialect, name, body) = triple(production, children)?;
            let body = body
                .into_list(production)?
                .into_iter()
                .map(|item| item.into_text(production))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Type(ast::Type::PrettyDialect {
                dialect: dialect.into_text(production)?,
                name: name.into_text(production)?,
                body,
            }))
        }

        Production::PrettyDialectItemBody => Ok(collect(children)),

        Production::FunctionType => {
            let (inputs, results) = pair(production, children)?;
            Ok(Node::Type(ast::Type::Function {
                inputs: into_type_list(production, inputs)?,
                results: into_type_list(production, results)?,
            }))
        }

        Production::StridedLayout => {
            let (offset, strides) = pair(production, children)?;
            Ok(Node::StridedLayout(ast::StridedLayout {
                offset: offset.into_dimension(production)?,
                strides: into_dimensions(production, strides)?,
            }))
        }

        Production::VectorElementType
        | Production::TensorMemrefElementType
        | Production::TensorType
        | Production::MemrefType
        | Production::StandardType
        | Production::DialectType
        | Production::NonFunctionType
        | Production::Type
        | Production::FunctionResultType => only_child(production, children),

        Production::TypeListNoParens | Production::FunctionResultListNoParens => {
            Ok(collect(children))
        }

        Production::TypeListParens | Production::FunctionResultListParens => {
            child_or_empty(production, children)
        }

        // ---- attributes --------------------------------------------------
        Production::ArrayAttribute => {
            let values = children
                .into_iter()
                .map(|child| child.into_attribute(production))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::Attribute(ast::Attribute::Array(values)))
        }

        Production::BoolAttribute => {
            let value = only_child(production, children)?.into_bool(production)?;
            Ok(Node::Attribute(ast::Attribute::Bool(value)))
        }

        Production::DictionaryAttribute => {
            let dict = build_dict(production, children)?;
            Ok(Node::Attribute(ast::Attribute::Dictionary(dict)))
        }

        Production::DenseElementsAttribute => {
            let (values, ty) = pair(production, children)?;
            Ok(Node::Attribute(ast::Attribute::DenseElements {
                values: Box::new(values.into_attribute(production)?),
                ty: ty.into_type(production)?,
            }))
        }

        Production::OpaqueElementsAttribute => {
            let (dialect, contents, ty) = triple(production, children)?;
            Ok(Node::Attribute(ast::Attribute::OpaqueElements {
                dialect: dialect.into_text(production)?,
                contents: contents.into_text(production)?,
                ty: ty.into_type(production)?,
            }))
        }

        Production::SparseElementsAttribute => {
            let (indices, values, ty) = triple(production, children)?;
            Ok(Node::Attribute(ast::Attribute::SparseElements {
                indices: Box::new(indices.into_attribute(production)?),
                values: Box::new(values.into_attribute(production)?),
                ty: ty.into_type(production)?,
            }))
        }

        Production::FloatAttribute => {
            let mut children = children.into_iter();
            match (children.next(), children.next(), children.next()) {
                (Some(value), ty, None) => Ok(Node::Attribute(ast::Attribute::Float {
                    value: value.into_float(production)?,
                    ty: ty.map(|node| node.into_type(production)).transpose()?,
                })),
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "a value with an optional type",
                }),
            }
        }

        Production::IntegerAttribute => {
            let mut children = children.into_iter();
            match (children.next(), children.next(), children.next()) {
                (Some(value), ty, None) => {
                    let value = match value {
                        Node::Int(value) => ast::IntegerLiteral::Decimal(value),
                        Node::Text(text) => ast::IntegerLiteral::Hexadecimal(text),
                        other => return Err(other.mismatch(production, "integer literal")),
                    };
                    Ok(Node::Attribute(ast::Attribute::Integer {
                        value,
                        ty: ty.map(|node| node.into_type(production)).transpose()?,
                    }))
                }
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "a value with an optional type",
                }),
            }
        }

        Production::IntegerSetAttribute => {
            let id = only_child(production, children)?.into_map_or_set(production)?;
            Ok(Node::Attribute(ast::Attribute::IntegerSet(id)))
        }

        Production::StringAttribute => {
            let value = only_child(production, children)?.into_text(production)?;
            Ok(Node::Attribute(ast::Attribute::String(value)))
        }

        Production::SymbolRefAttribute => {
            let path = children
                .into_iter()
                .map(|child| child.into_symbol_ref(production))
                .collect::<Result<Vec<_>, _>>()?;
            if path.is_empty() {
                return Err(TransformError::Malformed {
                    production,
                    expected: "at least one symbol",
                });
            }
            Ok(Node::Attribute(ast::Attribute::SymbolRef(path)))
        }

        Production::TypeAttribute => {
            let ty = only_child(production, children)?.into_type(production)?;
            Ok(Node::Attribute(ast::Attribute::Type(ty)))
        }

        Production::UnitAttribute => {
            marker(production, children, Node::Attribute(ast::Attribute::Unit))
        }

        Production::StandardAttribute
        | Production::AttributeValue
        | Production::DialectAttribute
        | Production::AttributeEntry => only_child(production, children),

        Production::DependentAttributeEntry => {
            let (name, value) = pair(production, children)?;
            Ok(Node::Entry(ast::AttributeEntry {
                name: name.into_text(production)?,
                value: value.into_attribute(production)?,
            }))
        }

        // Dialect-qualified entries keep the namespace in the name.
        Production::DialectAttributeEntry => {
            let (namespace, name, value) = triple(production, children)?;
            Ok(Node::Entry(ast::AttributeEntry {
                name: format!(
                    "{}.{}",
                    namespace.into_text(production)?,
                    name.into_text(production)?
                ),
                value: value.into_attribute(production)?,
            }))
        }

        Production::AttributeDict => build_dict(production, children).map(Node::Dict),

        // ---- operations --------------------------------------------------
        Production::OpResult => {
            let mut children = children.into_iter();
            match (children.next(), children.next(), children.next()) {
                (Some(id), count, None) => Ok(Node::OpResult(ast::OpResult {
                    id: id.into_ssa_id(production)?,
                    count: count.map(|node| node.into_int(production)).transpose()?,
                })),
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "an ssa id with an optional count",
                }),
            }
        }

        Production::OpResultList
        | Production::SsaUseList
        | Production::SsaIdList
        | Production::SsaIdAndTypeList
        | Production::SsaUseAndTypeList
        | Production::SuccessorList => Ok(collect(children)),

        Production::SsaUse | Production::TrailingType | Production::TrailingLocation => {
            only_child(production, children)
        }

        Production::Location => {
            let (file, line, col) = triple(production, children)?;
            Ok(Node::Location(ast::FileLineColLoc {
                file: file.into_text(production)?,
                line: line.into_int(production)?,
                col: col.into_int(production)?,
            }))
        }

        Production::GenericOperation => reduce_generic_operation(production, children),
        Production::CustomOperation => reduce_custom_operation(production, children),
        Production::Operation => reduce_operation(production, children),

        // ---- blocks, regions, functions, modules -------------------------
        Production::SsaIdAndType => {
            let (id, ty) = pair(production, children)?;
            Ok(Node::SsaIdAndType(ast::SsaIdAndType {
                id: id.into_ssa_id(production)?,
                ty: ty.into_type(production)?,
            }))
        }

        Production::BlockLabel => {
            let mut children = children.into_iter();
            match (children.next(), children.next(), children.next()) {
                (Some(id), args, None) => {
                    let args = match args {
                        Some(node) => node
                            .into_list(production)?
                            .into_iter()
                            .map(|arg| arg.into_ssa_id_and_type(production))
                            .collect::<Result<Vec<_>, _>>()?,
                        None => Vec::new(),
                    };
                    Ok(Node::BlockLabel(ast::BlockLabel {
                        id: id.into_block_id(production)?,
                        args,
                    }))
                }
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "a block id with an optional argument list",
                }),
            }
        }

        Production::BlockArgList | Production::ArgumentList | Production::BareIdList => {
            Ok(collect(children))
        }

        Production::Block => {
            let mut label = None;
            let mut operations = Vec::new();
            for child in children {
                match child {
                    Node::BlockLabel(found) if label.is_none() && operations.is_empty() => {
                        label = Some(found);
                    }
                    Node::Operation(op) => operations.push(op),
                    other => return Err(other.mismatch(production, "operation")),
                }
            }
            Ok(Node::Block(ast::Block { label, operations }))
        }

        Production::Region => {
            let blocks = children
                .into_iter()
                .map(|child| child.into_block(production))
                .collect::<Result<Vec<_>, _>>()?;
            for (index, block) in blocks.iter().enumerate() {
                if index > 0 && block.label.is_none() {
                    return Err(TransformError::AnonymousBlock { index });
                }
            }
            Ok(Node::Region(blocks))
        }

        Production::FunctionBody => Ok(collect(children)),

        Production::NamedArgument => {
            let mut children = children.into_iter();
            match (
                children.next(),
                children.next(),
                children.next(),
                children.next(),
            ) {
                (Some(id), Some(ty), attributes, None) => {
                    Ok(Node::NamedArgument(ast::NamedArgument {
                        id: id.into_ssa_id(production)?,
                        ty: ty.into_type(production)?,
                        attributes: attributes
                            .map(|node| node.into_dict(production))
                            .transpose()?,
                    }))
                }
                _ => Err(TransformError::Malformed {
                    production,
                    expected: "an id, a type, and optional attributes",
                }),
            }
        }

        Production::Function => reduce_function(production, children),
        Production::ModuleBody => Ok(collect(children)),
        Production::Module => reduce_module(production, children),

        // ---- affine glue -------------------------------------------------
        Production::AffineConstraintConjunction
        | Production::DimIdList
        | Production::SymbolIdList => Ok(collect(children)),

        Production::SymbolOrConst
        | Production::AffineMap
        | Production::SemiAffineMap
        | Production::IntegerSet => only_child(production, children),

        // ---- dialect extension hooks -------------------------------------
        // Externally supplied dialect payloads pass through unchanged.
        Production::DialectOps | Production::DialectTypes => only_child(production, children),
    }
}

/// Generic form. The trailing function type is split: its inputs must pair
/// with the operand list one to one, and its results become the operation's
/// result types, so both spellings of an operation meet in the same shape.
fn reduce_generic_operation(
    production: Production,
    children: Vec<Node>,
) -> Result<Node, TransformError> {
    let mut children = children.into_iter();
    let name = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "an operation name",
        })?
        .into_text(production)?;
    let operands = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "an operand list",
        })?
        .into_list(production)?
        .into_iter()
        .map(|operand| operand.into_ssa_id(production))
        .collect::<Result<Vec<_>, _>>()?;

    let mut successors = Vec::new();
    let mut regions = Vec::new();
    let mut attributes = None;
    let mut trailing = None;
    for child in children {
        match child {
            Node::List(items) => {
                successors = items
                    .into_iter()
                    .map(|successor| successor.into_block_id(production))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Node::Region(blocks) => regions.push(blocks),
            Node::Dict(dict) => attributes = Some(dict),
            Node::Type(ty) => trailing = Some(ty),
            other => {
                return Err(other.mismatch(production, "successors, a region, attributes, or a type"));
            }
        }
    }

    let (inputs, result_types) = match trailing {
        Some(ast::Type::Function { inputs, results }) => (inputs, results),
        _ => {
            return Err(TransformError::Malformed {
                production,
                expected: "a trailing function type",
            });
        }
    };
    if operands.len() != inputs.len() {
        return Err(TransformError::OperandCount {
            name,
            operands: operands.len(),
            inputs: inputs.len(),
        });
    }

    Ok(Node::Operation(ast::Operation {
        results: Vec::new(),
        name,
        operands,
        successors,
        regions,
        attributes,
        result_types,
        location: None,
    }))
}

/// Custom form: `ns.op %operands : types`. Both optional lists reduce to
/// `List`, so they are told apart by their first element.
fn reduce_custom_operation(
    production: Production,
    children: Vec<Node>,
) -> Result<Node, TransformError> {
    let mut children = children.into_iter();
    let namespace = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "a dialect namespace",
        })?
        .into_text(production)?;
    let name = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "an operation name",
        })?
        .into_text(production)?;

    let mut operands = Vec::new();
    let mut result_types = Vec::new();
    for child in children {
        let items = child.into_list(production)?;
        if matches!(items.first(), Some(Node::SsaId(_))) {
            if !operands.is_empty() {
                return Err(TransformError::Malformed {
                    production,
                    expected: "a single operand list",
                });
            }
            operands = items
                .into_iter()
                .map(|operand| operand.into_ssa_id(production))
                .collect::<Result<Vec<_>, _>>()?;
        } else {
            if !result_types.is_empty() {
                return Err(TransformError::Malformed {
                    production,
                    expected: "a single result type list",
                });
            }
            result_types = items
                .into_iter()
                .map(|ty| ty.into_type(production))
                .collect::<Result<Vec<_>, _>>()?;
        }
    }

    Ok(Node::Operation(ast::Operation {
        results: Vec::new(),
        name: format!("{}.{}", namespace, name),
        operands,
        successors: Vec::new(),
        regions: Vec::new(),
        attributes: None,
        result_types,
        location: None,
    }))
}

fn reduce_operation(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    let mut results = Vec::new();
    let mut operation = None;
    let mut location = None;
    for child in children {
        match child {
            Node::List(items) => {
                results = items
                    .into_iter()
                    .map(|result| result.into_op_result(production))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Node::Operation(op) => operation = Some(op),
            Node::Location(loc) => location = Some(loc),
            other => {
                return Err(other.mismatch(production, "a result list, an operation, or a location"));
            }
        }
    }
    let mut operation = operation.ok_or(TransformError::Malformed {
        production,
        expected: "an operation body",
    })?;
    operation.results = results;
    operation.location = location;
    Ok(Node::Operation(operation))
}

fn reduce_function(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    let mut children = children.into_iter();
    let name = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "a function name",
        })?
        .into_symbol_ref(production)?;
    let arguments = children
        .next()
        .ok_or(TransformError::Malformed {
            production,
            expected: "an argument list",
        })?
        .into_list(production)?
        .into_iter()
        .map(|arg| arg.into_named_argument(production))
        .collect::<Result<Vec<_>, _>>()?;

    let mut result_types = Vec::new();
    let mut attributes = None;
    let mut body = None;
    let mut location = None;
    for child in children {
        match child {
            Node::Type(ty) => result_types = vec![ty],
            // A bare list is either the result types or the wrapped body
            // region; only the body ever contains a region.
            Node::List(items) => {
                if matches!(items.first(), Some(Node::Region(_))) {
                    let mut items = items.into_iter();
                    match (items.next(), items.next()) {
                        (Some(Node::Region(blocks)), None) => body = Some(blocks),
                        _ => {
                            return Err(TransformError::Malformed {
                                production,
                                expected: "a single body region",
                            });
                        }
                    }
                } else {
                    result_types = items
                        .into_iter()
                        .map(|ty| ty.into_type(production))
                        .collect::<Result<Vec<_>, _>>()?;
                }
            }
            Node::Dict(dict) => attributes = Some(dict),
            Node::Location(loc) => location = Some(loc),
            other => {
                return Err(
                    other.mismatch(production, "results, attributes, a body, or a location")
                );
            }
        }
    }

    Ok(Node::Function(ast::Function {
        name,
        arguments,
        result_types,
        attributes,
        body,
        location,
    }))
}

fn reduce_module(production: Production, children: Vec<Node>) -> Result<Node, TransformError> {
    let mut name = None;
    let mut attributes = None;
    let mut body = None;
    let mut location = None;
    for child in children {
        match child {
            Node::SymbolRef(sym) => name = Some(sym),
            Node::Dict(dict) => attributes = Some(dict),
            Node::List(items) => body = Some(items),
            Node::Location(loc) => location = Some(loc),
            other => {
                return Err(
                    other.mismatch(production, "a name, attributes, a body, or a location")
                );
            }
        }
    }
    let body = body.ok_or(TransformError::Malformed {
        production,
        expected: "a module body",
    })?;
    let mut items = Vec::with_capacity(body.len());
    for child in body {
        match child {
            Node::Function(function) => items.push(ast::ModuleItem::Function(function)),
            Node::Operation(operation) => items.push(ast::ModuleItem::Operation(operation)),
            other => return Err(other.mismatch(production, "a function or an operation")),
        }
    }
    Ok(Node::Module(ast::Module {
        name,
        attributes,
        items,
        location,
    }))
}

// ============================================================================
// Public API
// ============================================================================

/// Fold a syntax tree into a [`Module`](ast::Module).
///
/// The tree root must be a [`Production::Module`] node, which is what
/// [`parse_syntax`] always returns.
pub fn transform_module(tree: SyntaxTree) -> Result<ast::Module, TransformError> {
    let root = tree.production;
    match fold(tree)? {
        Node::Module(module) => Ok(module),
        other => Err(other.mismatch(root, "a module")),
    }
}

/// Parse IR text all the way to a [`Module`](ast::Module).
pub fn parse_module(input: &str) -> Result<ast::Module, crate::Error> {
    let tree = parse_syntax(input)?;
    let module = transform_module(tree)?;
    tracing::debug!("parsed module with {} top-level items", module.items.len());
    Ok(module)
}

// ============================================================================
// Tests
// ============================================================================
