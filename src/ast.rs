//! AST node definitions for the textual IR.
//!
//! Plain owned data: every node is built exactly once by the parser and never
//! mutated afterwards. Symbol references and block labels used as branch
//! targets are back-references by name; resolving them is a consumer concern,
//! not handled here.

use serde::{Deserialize, Serialize};

/// An attribute dictionary: named entries in source order, names unique.
pub type AttributeDict = Vec<AttributeEntry>;

/// A region is the ordered block list, nothing more.
pub type Region = Vec<Block>;

// ============================================================================
// Identifiers
// ============================================================================

/// SSA value name: `%v`, `%0`, or `%v#1` selecting one result of a
/// multi-result operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SsaId {
    pub name: String,
    pub index: Option<u64>,
}

impl SsaId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }
}

/// Symbol reference: `@main` or `@"quoted name"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolRefId {
    pub name: String,
}

impl SymbolRefId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Block label: `^bb0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub name: String,
}

impl BlockId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Type alias reference: `!my_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeAlias {
    pub name: String,
}

impl TypeAlias {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Affine map or integer set reference: `#map0`, `#set0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapOrSetId {
    pub name: String,
}

impl MapOrSetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ============================================================================
// Types
// ============================================================================

/// One extent of a shaped type: a known size or the `?` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Known(u64),
    Unknown,
}

/// Fixed-width float type markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    F16,
    BF16,
    F32,
    F64,
}

/// Integer type signedness, from the `i`/`si`/`ui` lexeme prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

/// Strided memref layout: `offset: ?, strides: [4, ?, 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StridedLayout {
    pub offset: Dimension,
    pub strides: Vec<Dimension>,
}

/// The type algebra.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    None,
    Index,
    Float(FloatKind),
    Integer {
        signedness: Signedness,
        width: u32,
    },
    Complex(Box<Type>),
    Tuple(Vec<Type>),
    Vector {
        dimensions: Vec<Dimension>,
        element: Box<Type>,
    },
    RankedTensor {
        dimensions: Vec<Dimension>,
        element: Box<Type>,
    },
    UnrankedTensor {
        element: Box<Type>,
    },
    RankedMemref {
        dimensions: Vec<Dimension>,
        element: Box<Type>,
        layout: Option<StridedLayout>,
    },
    UnrankedMemref {
        element: Box<Type>,
    },
    Function {
        inputs: Vec<Type>,
        results: Vec<Type>,
    },
    Alias(TypeAlias),
    /// Dialect type with uninterpreted contents: `!dialect<"contents">`.
    /// The contents are kept verbatim, byte for byte.
    OpaqueDialect { dialect: String, contents: String },
    /// Dialect type in pretty form: `!dialect.name<body, items>`. Body items
    /// are kept as raw text with nested brackets preserved.
    PrettyDialect {
        dialect: String,
        name: String,
        body: Vec<String>,
    },
}

impl From<FloatKind> for Type {
    fn from(kind: FloatKind) -> Self {
        Type::Float(kind)
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Integer literal payload: decimal decodes to a machine integer, while
/// hexadecimal stays textual so wide constants round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegerLiteral {
    Decimal(u64),
    Hexadecimal(String),
}

/// One `name = value` dictionary entry. Dialect-qualified entries keep their
/// `dialect.` prefix in `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub name: String,
    pub value: Attribute,
}

/// The attribute algebra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Array(Vec<Attribute>),
    Bool(bool),
    Dictionary(AttributeDict),
    DenseElements {
        values: Box<Attribute>,
        ty: Type,
    },
    OpaqueElements {
        dialect: String,
        contents: String,
        ty: Type,
    },
    SparseElements {
        indices: Box<Attribute>,
        values: Box<Attribute>,
        ty: Type,
    },
    Float {
        value: f64,
        ty: Option<Type>,
    },
    Integer {
        value: IntegerLiteral,
        ty: Option<Type>,
    },
    IntegerSet(MapOrSetId),
    String(String),
    /// Possibly nested symbol path: `@outer::@inner`. Never empty.
    SymbolRef(Vec<SymbolRefId>),
    Type(Type),
    Unit,
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<u64> for Attribute {
    fn from(value: u64) -> Self {
        Attribute::Integer {
            value: IntegerLiteral::Decimal(value),
            ty: None,
        }
    }
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Attribute::Float { value, ty: None }
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_owned())
    }
}

impl From<Type> for Attribute {
    fn from(ty: Type) -> Self {
        Attribute::Type(ty)
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Source location tag: `loc("file.mlir":4:10)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLineColLoc {
    pub file: String,
    pub line: u64,
    pub col: u64,
}

/// One result binding: `%sum` or `%parts:2` with an explicit result count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpResult {
    pub id: SsaId,
    pub count: Option<u64>,
}

/// A single operation. The generic and custom spellings both build this one
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub results: Vec<OpResult>,
    pub name: String,
    pub operands: Vec<SsaId>,
    pub successors: Vec<BlockId>,
    pub regions: Vec<Region>,
    pub attributes: Option<AttributeDict>,
    /// One type per result. A generic operation's trailing function type is
    /// split here, so both spellings of the same operation compare equal.
    pub result_types: Vec<Type>,
    pub location: Option<FileLineColLoc>,
}

// ============================================================================
// Structure
// ============================================================================

/// An SSA id paired with its type: `%x : i32`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SsaIdAndType {
    pub id: SsaId,
    pub ty: Type,
}

/// Block label with declared arguments: `^bb1(%x: i32, %y: f64):`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockLabel {
    pub id: BlockId,
    pub args: Vec<SsaIdAndType>,
}

/// A straight-line operation sequence. A block without a label is anonymous
/// and must be the first block of its region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub label: Option<BlockLabel>,
    pub operations: Vec<Operation>,
}

/// Function argument: `%input: tensor<4xf32>`, optionally with its own
/// attribute dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArgument {
    pub id: SsaId,
    pub ty: Type,
    pub attributes: Option<AttributeDict>,
}

/// A named top-level unit with a signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: SymbolRefId,
    pub arguments: Vec<NamedArgument>,
    pub result_types: Vec<Type>,
    pub attributes: Option<AttributeDict>,
    /// `None` is an external declaration; `Some(vec![])` a defined body that
    /// happens to be empty.
    pub body: Option<Region>,
    pub location: Option<FileLineColLoc>,
}

/// One top-level item of a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModuleItem {
    Function(Function),
    Operation(Operation),
}

/// The root node. A source file without an explicit `module` wrapper parses
/// to an unnamed module holding the bare items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: Option<SymbolRefId>,
    pub attributes: Option<AttributeDict>,
    pub items: Vec<ModuleItem>,
    pub location: Option<FileLineColLoc>,
}
