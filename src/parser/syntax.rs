//! Production-labeled syntax trees, the grammar stage's output.
//!
//! Every node names the grammar production that matched and holds its
//! children in source order. Children are either nested nodes or raw token
//! text; the fold in the parent module turns this tree into AST nodes one
//! production at a time.

// ============================================================================
// Productions
// ============================================================================

/// Every production the grammar can emit. The set is closed: the tree fold
/// matches on this exhaustively, so adding a variant forces a dispatch arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
    // Lexical fragments
    Digit,
    HexDigit,
    Letter,
    IdPunct,
    Underscore,
    IdChars,
    True,
    False,

    // Literals
    DecimalLiteral,
    HexadecimalLiteral,
    FloatLiteral,
    StringLiteral,
    BareId,
    SuffixId,
    BoolLiteral,
    IntegerLiteral,
    ConstantLiteral,

    // Dimensions
    Dimension,
    StaticDimensionList,
    DimensionListRanked,
    DimensionList,

    // Identifiers
    SsaId,
    SymbolRefId,
    BlockId,
    TypeAlias,
    MapOrSetId,

    // Types
    NoneType,
    F16,
    Bf16,
    F32,
    F64,
    FloatType,
    IndexType,
    IntegerType,
    ComplexType,
    TupleType,
    VectorType,
    RankedTensorType,
    UnrankedTensorType,
    RankedMemrefType,
    UnrankedMemrefType,
    OpaqueDialectItem,
    PrettyDialectItem,
    PrettyDialectItemBody,
    FunctionType,
    StridedLayout,
    StrideList,
    VectorElementType,
    TensorMemrefElementType,
    TensorType,
    MemrefType,
    StandardType,
    DialectType,
    NonFunctionType,
    Type,
    TypeListNoParens,
    TypeListParens,
    FunctionResultType,
    FunctionResultListNoParens,
    FunctionResultListParens,

    // Attributes
    ArrayAttribute,
    BoolAttribute,
    DictionaryAttribute,
    DenseElementsAttribute,
    OpaqueElementsAttribute,
    SparseElementsAttribute,
    FloatAttribute,
    IntegerAttribute,
    IntegerSetAttribute,
    StringAttribute,
    SymbolRefAttribute,
    TypeAttribute,
    UnitAttribute,
    StandardAttribute,
    AttributeValue,
    DialectAttribute,
    AttributeEntry,
    DependentAttributeEntry,
    DialectAttributeEntry,
    AttributeDict,

    // Operations
    OpResult,
    OpResultList,
    Location,
    TrailingLocation,
    Operation,
    GenericOperation,
    CustomOperation,
    SsaUse,
    SsaUseList,
    SsaIdList,
    SsaIdAndType,
    SsaIdAndTypeList,
    SsaUseAndTypeList,
    SuccessorList,
    TrailingType,

    // Blocks, regions, modules, functions
    BlockLabel,
    BlockArgList,
    Block,
    Region,
    Module,
    ModuleBody,
    Function,
    FunctionBody,
    NamedArgument,
    ArgumentList,
    BareIdList,

    // Affine maps and integer sets (referenced, not interpreted)
    AffineConstraintConjunction,
    DimIdList,
    SymbolIdList,
    SymbolOrConst,
    AffineMap,
    SemiAffineMap,
    IntegerSet,

    // Dialect extension hooks
    DialectOps,
    DialectTypes,
}

// ============================================================================
// Trees
// ============================================================================

/// One matched production and its children in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    pub production: Production,
    pub children: Vec<SyntaxElement>,
}

/// A child of a syntax node: a nested production or raw token text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxElement {
    Node(SyntaxTree),
    Token(String),
}

impl SyntaxTree {
    pub fn new(production: Production) -> Self {
        Self {
            production,
            children: Vec::new(),
        }
    }

    pub fn with_children(production: Production, children: Vec<SyntaxElement>) -> Self {
        Self {
            production,
            children,
        }
    }

    /// A node holding a single token, e.g. a literal's matched lexeme.
    pub fn leaf(production: Production, lexeme: impl Into<String>) -> Self {
        Self {
            production,
            children: vec![SyntaxElement::Token(lexeme.into())],
        }
    }

    pub fn push_node(&mut self, node: SyntaxTree) {
        self.children.push(SyntaxElement::Node(node));
    }

    pub fn push_token(&mut self, lexeme: impl Into<String>) {
        self.children.push(SyntaxElement::Token(lexeme.into()));
    }
}

impl From<SyntaxTree> for SyntaxElement {
    fn from(node: SyntaxTree) -> Self {
        SyntaxElement::Node(node)
    }
}
