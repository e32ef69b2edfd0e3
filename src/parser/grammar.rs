//! Winnow combinators producing production-labeled syntax trees from IR text.
//!
//! This is the "stage 1" parser: text in, [`SyntaxTree`] out. Nothing here is
//! interpreted beyond tokenization and shape; literal decoding, structural
//! checks, and AST construction happen in the tree fold one module up.

use winnow::combinator::{alt, delimited, not, opt, preceded, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use super::syntax::{Production, SyntaxTree};

// ============================================================================
// Error type
// ============================================================================

/// Parse error for IR text, with a byte offset into the original input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Lexical layer
// ============================================================================

fn ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn suffix_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '.' | '_' | '-')
}

/// Skip whitespace and `//` line comments.
fn ws(input: &mut &str) -> ModalResult<()> {
    loop {
        take_while(0.., |c: char| c.is_ascii_whitespace())
            .void()
            .parse_next(input)?;
        if input.starts_with("//") {
            take_while(0.., |c: char| c != '\n')
                .void()
                .parse_next(input)?;
        } else {
            return Ok(());
        }
    }
}

/// Match a bare keyword, rejecting when identifier characters continue past
/// it (`index` but not `index0`).
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, &'a str, ErrMode<ContextError>> {
    terminated(word, not(one_of(|c: char| ident_char(c))))
}

/// Parse an identifier: [a-zA-Z_][a-zA-Z0-9_$]*
fn bare_id<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., ident_char),
    )
        .take()
        .parse_next(input)
}

/// Parse the name part after a sigil: digits, or [a-zA-Z$._-]+ with digits.
fn suffix_id<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    alt((
        take_while(1.., |c: char| c.is_ascii_digit()),
        (
            one_of(|c: char| c.is_ascii_alphabetic() || matches!(c, '$' | '.' | '_' | '-')),
            take_while(0.., suffix_char),
        )
            .take(),
    ))
    .parse_next(input)
}

fn digits<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)
}

fn decimal_literal(input: &mut &str) -> ModalResult<SyntaxTree> {
    digits
        .map(|lexeme| SyntaxTree::leaf(Production::DecimalLiteral, lexeme))
        .parse_next(input)
}

/// The stored lexeme is the digit run without the `0x` prefix; the fold puts
/// the prefix back when it assembles the literal.
fn hexadecimal_literal(input: &mut &str) -> ModalResult<SyntaxTree> {
    preceded("0x", take_while(1.., |c: char| c.is_ascii_hexdigit()))
        .map(|lexeme| SyntaxTree::leaf(Production::HexadecimalLiteral, lexeme))
        .parse_next(input)
}

/// Parse a float literal that MUST contain a decimal point, with optional
/// sign and exponent: `3.14`, `-1.e10`, `+2.5E-3`. The full lexeme is kept.
fn float_literal(input: &mut &str) -> ModalResult<SyntaxTree> {
    (
        opt(one_of(['+', '-'])),
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(0.., |c: char| c.is_ascii_digit()),
        opt((
            one_of(['e', 'E']),
            opt(one_of(['+', '-'])),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )),
    )
        .take()
        .map(|lexeme: &str| SyntaxTree::leaf(Production::FloatLiteral, lexeme))
        .parse_next(input)
}

/// Consume string content up to (not including) the closing quote. `\"` is
/// the only escape pair recognized; any other character stands for itself.
fn string_body(input: &mut &str) -> ModalResult<()> {
    loop {
        if input.starts_with("\\\"") {
            "\\\"".void().parse_next(input)?;
            continue;
        }
        match input.chars().next() {
            Some('"') | None => return Ok(()),
            Some(_) => any.void().parse_next(input)?,
        }
    }
}

/// Parse a string literal, keeping the quotes in the stored lexeme. The fold
/// strips them and decodes `\"`.
fn string_literal(input: &mut &str) -> ModalResult<SyntaxTree> {
    ('"', string_body, '"')
        .take()
        .map(|lexeme: &str| SyntaxTree::leaf(Production::StringLiteral, lexeme))
        .parse_next(input)
}

fn bool_literal(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((
        keyword("true").value(SyntaxTree::new(Production::True)),
        keyword("false").value(SyntaxTree::new(Production::False)),
    ))
    .map(|flag| SyntaxTree::with_children(Production::BoolLiteral, vec![flag.into()]))
    .parse_next(input)
}

// ============================================================================
// Identifiers
// ============================================================================

/// Parse an SSA value use: `%name`, `%0`, or `%name#2`.
fn ssa_id(input: &mut &str) -> ModalResult<SyntaxTree> {
    '%'.parse_next(input)?;
    let name = suffix_id.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::SsaId);
    node.push_node(SyntaxTree::leaf(Production::SuffixId, name));
    if let Some(index) = opt(preceded('#', digits)).parse_next(input)? {
        node.push_node(SyntaxTree::leaf(Production::DecimalLiteral, index));
    }
    Ok(node)
}

/// Parse a symbol reference: `@name`, `@nested.name`, or `@"quoted name"`.
fn symbol_ref_id(input: &mut &str) -> ModalResult<SyntaxTree> {
    '@'.parse_next(input)?;
    let name = if input.starts_with('"') {
        string_literal.parse_next(input)?
    } else {
        suffix_id
            .map(|lexeme| SyntaxTree::leaf(Production::SuffixId, lexeme))
            .parse_next(input)?
    };
    Ok(SyntaxTree::with_children(
        Production::SymbolRefId,
        vec![name.into()],
    ))
}

/// Parse a block label reference: `^bb0`.
fn block_id(input: &mut &str) -> ModalResult<SyntaxTree> {
    preceded('^', suffix_id)
        .map(|name| {
            SyntaxTree::with_children(
                Production::BlockId,
                vec![SyntaxTree::leaf(Production::SuffixId, name).into()],
            )
        })
        .parse_next(input)
}

/// Parse an affine map or integer set reference: `#map0`.
fn map_or_set_id(input: &mut &str) -> ModalResult<SyntaxTree> {
    preceded('#', suffix_id)
        .map(|name| {
            SyntaxTree::with_children(
                Production::MapOrSetId,
                vec![SyntaxTree::leaf(Production::SuffixId, name).into()],
            )
        })
        .parse_next(input)
}

// ============================================================================
// Types
// ============================================================================

/// Parse one shape extent: a decimal size or the `?` unknown marker.
fn dimension(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((
        '?'.value(SyntaxTree::new(Production::Dimension)),
        decimal_literal
            .map(|lit| SyntaxTree::with_children(Production::Dimension, vec![lit.into()])),
    ))
    .parse_next(input)
}

/// The `x` separating shape extents from each other and from the element
/// type; whitespace on either side is allowed.
fn shape_sep(input: &mut &str) -> ModalResult<()> {
    (ws, 'x', ws).void().parse_next(input)
}

/// Parse `(dimension "x")*` for tensor/memref shapes; zero dimensions is a
/// rank-0 shape.
fn dimension_list_ranked(input: &mut &str) -> ModalResult<SyntaxTree> {
    let mut list = SyntaxTree::new(Production::DimensionListRanked);
    while let Some(dim) = opt(terminated(dimension, shape_sep)).parse_next(input)? {
        list.push_node(dim);
    }
    Ok(list)
}

/// Parse `(decimal "x")+` for vector shapes; vectors always have rank.
fn static_dimension_list(input: &mut &str) -> ModalResult<SyntaxTree> {
    let mut list = SyntaxTree::new(Production::StaticDimensionList);
    let first = terminated(decimal_literal, shape_sep).parse_next(input)?;
    list.push_node(first);
    while let Some(dim) = opt(terminated(decimal_literal, shape_sep)).parse_next(input)? {
        list.push_node(dim);
    }
    Ok(list)
}

/// Parse `i32`, `si8`, `ui64`, ... keeping the whole lexeme for the fold to
/// split into signedness and width.
fn integer_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    terminated(
        (
            alt(("si", "ui", "i")),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )
            .take(),
        not(one_of(|c: char| ident_char(c))),
    )
    .map(|lexeme: &str| SyntaxTree::leaf(Production::IntegerType, lexeme))
    .parse_next(input)
}

fn float_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((
        keyword("f16").value(SyntaxTree::new(Production::F16)),
        keyword("bf16").value(SyntaxTree::new(Production::Bf16)),
        keyword("f32").value(SyntaxTree::new(Production::F32)),
        keyword("f64").value(SyntaxTree::new(Production::F64)),
    ))
    .map(|kind| SyntaxTree::with_children(Production::FloatType, vec![kind.into()]))
    .parse_next(input)
}

fn complex_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("complex").void().parse_next(input)?;
    ws.parse_next(input)?;
    let element = delimited(('<', ws), type_node, (ws, '>')).parse_next(input)?;
    Ok(SyntaxTree::with_children(
        Production::ComplexType,
        vec![element.into()],
    ))
}

fn tuple_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("tuple").void().parse_next(input)?;
    ws.parse_next(input)?;
    let list = delimited(('<', ws), opt(type_list_no_parens), (ws, '>')).parse_next(input)?;
    let list = list.unwrap_or_else(|| SyntaxTree::new(Production::TypeListNoParens));
    Ok(SyntaxTree::with_children(
        Production::TupleType,
        vec![list.into()],
    ))
}

fn vector_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("vector").void().parse_next(input)?;
    ws.parse_next(input)?;
    '<'.parse_next(input)?;
    ws.parse_next(input)?;
    let dims = static_dimension_list.parse_next(input)?;
    let element = type_node.parse_next(input)?;
    ws.parse_next(input)?;
    '>'.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::VectorType);
    node.push_node(dims);
    node.push_node(element);
    Ok(node)
}

fn tensor_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("tensor").void().parse_next(input)?;
    ws.parse_next(input)?;
    '<'.parse_next(input)?;
    ws.parse_next(input)?;
    if opt(terminated('*', shape_sep)).parse_next(input)?.is_some() {
        let element = type_node.parse_next(input)?;
        ws.parse_next(input)?;
        '>'.parse_next(input)?;
        return Ok(SyntaxTree::with_children(
            Production::UnrankedTensorType,
            vec![element.into()],
        ));
    }
    let dims = dimension_list_ranked.parse_next(input)?;
    let element = type_node.parse_next(input)?;
    ws.parse_next(input)?;
    '>'.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::RankedTensorType);
    node.push_node(dims);
    node.push_node(element);
    Ok(node)
}

fn memref_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("memref").void().parse_next(input)?;
    ws.parse_next(input)?;
    '<'.parse_next(input)?;
    ws.parse_next(input)?;
    if opt(terminated('*', shape_sep)).parse_next(input)?.is_some() {
        let element = type_node.parse_next(input)?;
        ws.parse_next(input)?;
        '>'.parse_next(input)?;
        return Ok(SyntaxTree::with_children(
            Production::UnrankedMemrefType,
            vec![element.into()],
        ));
    }
    let dims = dimension_list_ranked.parse_next(input)?;
    let element = type_node.parse_next(input)?;
    let layout = opt(preceded((ws, ',', ws), strided_layout)).parse_next(input)?;
    ws.parse_next(input)?;
    '>'.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::RankedMemrefType);
    node.push_node(dims);
    node.push_node(element);
    if let Some(layout) = layout {
        node.push_node(layout);
    }
    Ok(node)
}

/// Parse a memref layout: `offset: ?, strides: [4, ?, 1]`.
fn strided_layout(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("offset").void().parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let offset = dimension.parse_next(input)?;
    (ws, ',', ws).void().parse_next(input)?;
    keyword("strides").void().parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let strides: Vec<SyntaxTree> = delimited(
        ('[', ws),
        separated(0.., (ws, dimension, ws).map(|(_, d, _)| d), ','),
        (ws, ']'),
    )
    .parse_next(input)?;
    let mut list = SyntaxTree::new(Production::StrideList);
    for stride in strides {
        list.push_node(stride);
    }
    let mut node = SyntaxTree::new(Production::StridedLayout);
    node.push_node(offset);
    node.push_node(list);
    Ok(node)
}

/// Parse a dotted name after a dialect namespace: `bar` or `bar.baz`.
fn pretty_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    separated(1.., bare_id, '.')
        .map(|_: Vec<&str>| ())
        .take()
        .parse_next(input)
}

/// Capture the `<...>` body of a pretty dialect type, splitting on top-level
/// commas only. Nested bracket groups and string literals keep their commas
/// and are preserved verbatim for round-tripping.
fn pretty_body(input: &mut &str) -> ModalResult<Vec<String>> {
    let text = *input;
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, '<')) => {}
        _ => return Err(ErrMode::Backtrack(ContextError::new())),
    }
    let mut items = Vec::new();
    let mut item_start = 1;
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    for (at, c) in chars {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    if c != '>' {
                        return Err(ErrMode::Backtrack(ContextError::new()));
                    }
                    let item = text[item_start..at].trim();
                    if !item.is_empty() {
                        items.push(item.to_owned());
                    }
                    *input = &text[at + 1..];
                    return Ok(items);
                }
            }
            ',' if depth == 1 => {
                let item = text[item_start..at].trim();
                if !item.is_empty() {
                    items.push(item.to_owned());
                }
                item_start = at + 1;
            }
            _ => {}
        }
    }
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Parse the `!` type family: `!ns.name<body>` pretty dialect types,
/// `!ns<"contents">` opaque dialect types, and `!alias` references.
fn dialect_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    '!'.parse_next(input)?;
    let dialect = bare_id.parse_next(input)?;
    if input.starts_with('.') {
        '.'.parse_next(input)?;
        let name = pretty_name.parse_next(input)?;
        let mut body = SyntaxTree::new(Production::PrettyDialectItemBody);
        if input.starts_with('<') {
            for item in pretty_body.parse_next(input)? {
                body.push_token(item);
            }
        }
        let mut node = SyntaxTree::new(Production::PrettyDialectItem);
        node.push_token(dialect);
        node.push_token(name);
        node.push_node(body);
        return Ok(node);
    }
    if input.starts_with('<') {
        '<'.parse_next(input)?;
        '"'.parse_next(input)?;
        let contents = take_while(0.., |c: char| c != '"').parse_next(input)?;
        '"'.parse_next(input)?;
        '>'.parse_next(input)?;
        let mut node = SyntaxTree::new(Production::OpaqueDialectItem);
        node.push_token(dialect);
        node.push_token(contents);
        return Ok(node);
    }
    Ok(SyntaxTree::with_children(
        Production::TypeAlias,
        vec![SyntaxTree::leaf(Production::BareId, dialect).into()],
    ))
}

fn non_function_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((
        complex_type,
        tuple_type,
        vector_type,
        tensor_type,
        memref_type,
        float_type,
        keyword("index").value(SyntaxTree::new(Production::IndexType)),
        keyword("none").value(SyntaxTree::new(Production::NoneType)),
        integer_type,
        dialect_type,
    ))
    .parse_next(input)
}

/// Parse `(T, ...) -> R` where R is a parenthesized list or a single
/// non-function type.
fn function_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    let inputs = type_list_parens.parse_next(input)?;
    (ws, "->", ws).void().parse_next(input)?;
    let results = if input.starts_with('(') {
        type_list_parens.parse_next(input)?
    } else {
        non_function_type.parse_next(input)?
    };
    let mut node = SyntaxTree::new(Production::FunctionType);
    node.push_node(inputs);
    node.push_node(results);
    Ok(node)
}

/// Any type. Function types are the only ones starting with `(`.
fn type_node(input: &mut &str) -> ModalResult<SyntaxTree> {
    if input.starts_with('(') {
        function_type.parse_next(input)
    } else {
        non_function_type.parse_next(input)
    }
}

fn type_list_no_parens(input: &mut &str) -> ModalResult<SyntaxTree> {
    let types: Vec<SyntaxTree> =
        separated(1.., (ws, type_node, ws).map(|(_, t, _)| t), ',').parse_next(input)?;
    let mut list = SyntaxTree::new(Production::TypeListNoParens);
    for ty in types {
        list.push_node(ty);
    }
    Ok(list)
}

/// Parenthesized type list; `()` yields a node with no children.
fn type_list_parens(input: &mut &str) -> ModalResult<SyntaxTree> {
    let inner = delimited(('(', ws), opt(type_list_no_parens), (ws, ')')).parse_next(input)?;
    let mut node = SyntaxTree::new(Production::TypeListParens);
    if let Some(list) = inner {
        node.push_node(list);
    }
    Ok(node)
}

fn function_result_list_no_parens(input: &mut &str) -> ModalResult<SyntaxTree> {
    let types: Vec<SyntaxTree> =
        separated(1.., (ws, type_node, ws).map(|(_, t, _)| t), ',').parse_next(input)?;
    let mut list = SyntaxTree::new(Production::FunctionResultListNoParens);
    for ty in types {
        list.push_node(ty);
    }
    Ok(list)
}

fn function_result_list_parens(input: &mut &str) -> ModalResult<SyntaxTree> {
    let inner =
        delimited(('(', ws), opt(function_result_list_no_parens), (ws, ')')).parse_next(input)?;
    let mut node = SyntaxTree::new(Production::FunctionResultListParens);
    if let Some(list) = inner {
        node.push_node(list);
    }
    Ok(node)
}

// ============================================================================
// Attributes
// ============================================================================

fn attribute_value(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((
        array_attribute,
        dictionary_attribute,
        keyword("unit").value(SyntaxTree::new(Production::UnitAttribute)),
        bool_attribute,
        dense_elements_attribute,
        opaque_elements_attribute,
        sparse_elements_attribute,
        float_attribute,
        integer_attribute,
        string_attribute,
        symbol_ref_attribute,
        integer_set_attribute,
        type_attribute,
    ))
    .parse_next(input)
}

fn array_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    let values: Vec<SyntaxTree> = delimited(
        ('[', ws),
        separated(0.., (ws, attribute_value, ws).map(|(_, v, _)| v), ','),
        (ws, ']'),
    )
    .parse_next(input)?;
    let mut node = SyntaxTree::new(Production::ArrayAttribute);
    for value in values {
        node.push_node(value);
    }
    Ok(node)
}

fn bool_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    bool_literal
        .map(|lit| SyntaxTree::with_children(Production::BoolAttribute, vec![lit.into()]))
        .parse_next(input)
}

fn dense_elements_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("dense").void().parse_next(input)?;
    ws.parse_next(input)?;
    let values = delimited(('<', ws), attribute_value, (ws, '>')).parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let ty = type_node.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::DenseElementsAttribute);
    node.push_node(values);
    node.push_node(ty);
    Ok(node)
}

fn opaque_elements_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("opaque").void().parse_next(input)?;
    ws.parse_next(input)?;
    '<'.parse_next(input)?;
    ws.parse_next(input)?;
    let dialect = if input.starts_with('"') {
        string_literal.parse_next(input)?
    } else {
        bare_id
            .map(|lexeme| SyntaxTree::leaf(Production::BareId, lexeme))
            .parse_next(input)?
    };
    (ws, ',', ws).void().parse_next(input)?;
    let contents = string_literal.parse_next(input)?;
    (ws, '>', ws, ':', ws).void().parse_next(input)?;
    let ty = type_node.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::OpaqueElementsAttribute);
    node.push_node(dialect);
    node.push_node(contents);
    node.push_node(ty);
    Ok(node)
}

fn sparse_elements_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("sparse").void().parse_next(input)?;
    ws.parse_next(input)?;
    '<'.parse_next(input)?;
    ws.parse_next(input)?;
    let indices = attribute_value.parse_next(input)?;
    (ws, ',', ws).void().parse_next(input)?;
    let values = attribute_value.parse_next(input)?;
    (ws, '>', ws, ':', ws).void().parse_next(input)?;
    let ty = type_node.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::SparseElementsAttribute);
    node.push_node(indices);
    node.push_node(values);
    node.push_node(ty);
    Ok(node)
}

fn float_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    let value = float_literal.parse_next(input)?;
    let ty = opt(preceded((ws, ':', ws), float_type)).parse_next(input)?;
    let mut node = SyntaxTree::new(Production::FloatAttribute);
    node.push_node(value);
    if let Some(ty) = ty {
        node.push_node(ty);
    }
    Ok(node)
}

fn integer_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    let value = alt((hexadecimal_literal, decimal_literal)).parse_next(input)?;
    let ty = opt(preceded(
        (ws, ':', ws),
        alt((
            integer_type,
            keyword("index").value(SyntaxTree::new(Production::IndexType)),
        )),
    ))
    .parse_next(input)?;
    let mut node = SyntaxTree::new(Production::IntegerAttribute);
    node.push_node(value);
    if let Some(ty) = ty {
        node.push_node(ty);
    }
    Ok(node)
}

fn string_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    string_literal
        .map(|lit| SyntaxTree::with_children(Production::StringAttribute, vec![lit.into()]))
        .parse_next(input)
}

/// Parse `@root` or a nested path `@outer::@inner`.
fn symbol_ref_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    let refs: Vec<SyntaxTree> = separated(1.., symbol_ref_id, "::").parse_next(input)?;
    let mut node = SyntaxTree::new(Production::SymbolRefAttribute);
    for sym in refs {
        node.push_node(sym);
    }
    Ok(node)
}

fn integer_set_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    map_or_set_id
        .map(|id| SyntaxTree::with_children(Production::IntegerSetAttribute, vec![id.into()]))
        .parse_next(input)
}

fn type_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    type_node
        .map(|ty| SyntaxTree::with_children(Production::TypeAttribute, vec![ty.into()]))
        .parse_next(input)
}

/// Parse `{key = value, ...}` entries shared by both dictionary spellings.
fn attribute_entries(input: &mut &str) -> ModalResult<Vec<SyntaxTree>> {
    delimited(
        ('{', ws),
        separated(0.., (ws, attribute_entry, ws).map(|(_, e, _)| e), ','),
        (ws, '}'),
    )
    .parse_next(input)
}

/// One `name = value` or `dialect.name = value` entry.
fn attribute_entry(input: &mut &str) -> ModalResult<SyntaxTree> {
    let name = bare_id.parse_next(input)?;
    if input.starts_with('.') {
        '.'.parse_next(input)?;
        let attr_name = bare_id.parse_next(input)?;
        (ws, '=', ws).void().parse_next(input)?;
        let value = attribute_value.parse_next(input)?;
        let mut node = SyntaxTree::new(Production::DialectAttributeEntry);
        node.push_node(SyntaxTree::leaf(Production::BareId, name));
        node.push_node(SyntaxTree::leaf(Production::BareId, attr_name));
        node.push_node(value);
        return Ok(node);
    }
    (ws, '=', ws).void().parse_next(input)?;
    let value = attribute_value.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::DependentAttributeEntry);
    node.push_node(SyntaxTree::leaf(Production::BareId, name));
    node.push_node(value);
    Ok(node)
}

/// Dictionary in attribute-value position.
fn dictionary_attribute(input: &mut &str) -> ModalResult<SyntaxTree> {
    attribute_entries
        .map(|entries| {
            let mut node = SyntaxTree::new(Production::DictionaryAttribute);
            for entry in entries {
                node.push_node(entry);
            }
            node
        })
        .parse_next(input)
}

/// Dictionary attached to an operation, function, or module.
fn attribute_dict(input: &mut &str) -> ModalResult<SyntaxTree> {
    attribute_entries
        .map(|entries| {
            let mut node = SyntaxTree::new(Production::AttributeDict);
            for entry in entries {
                node.push_node(entry);
            }
            node
        })
        .parse_next(input)
}

// ============================================================================
// Operations
// ============================================================================

/// One result binding: `%r` or `%r:2`.
fn op_result(input: &mut &str) -> ModalResult<SyntaxTree> {
    let id = ssa_id.parse_next(input)?;
    let count = opt(preceded((ws, ':', ws), decimal_literal)).parse_next(input)?;
    let mut node = SyntaxTree::new(Production::OpResult);
    node.push_node(id);
    if let Some(count) = count {
        node.push_node(count);
    }
    Ok(node)
}

/// Result bindings up to and including the `=`.
fn op_result_list(input: &mut &str) -> ModalResult<SyntaxTree> {
    let results: Vec<SyntaxTree> =
        separated(1.., (ws, op_result, ws).map(|(_, r, _)| r), ',').parse_next(input)?;
    '='.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::OpResultList);
    for result in results {
        node.push_node(result);
    }
    Ok(node)
}

fn ssa_use_list(input: &mut &str) -> ModalResult<SyntaxTree> {
    let uses: Vec<SyntaxTree> =
        separated(1.., (ws, ssa_id, ws).map(|(_, u, _)| u), ',').parse_next(input)?;
    let mut node = SyntaxTree::new(Production::SsaUseList);
    for used in uses {
        node.push_node(used);
    }
    Ok(node)
}

/// Parse a successor list: `[^bb0, ^bb1]`.
fn successor_list(input: &mut &str) -> ModalResult<SyntaxTree> {
    let successors: Vec<SyntaxTree> = delimited(
        ('[', ws),
        separated(1.., (ws, block_id, ws).map(|(_, b, _)| b), ','),
        (ws, ']'),
    )
    .parse_next(input)?;
    let mut node = SyntaxTree::new(Production::SuccessorList);
    for successor in successors {
        node.push_node(successor);
    }
    Ok(node)
}

/// Parse `loc("file.mlir":4:10)`.
fn location(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("loc").void().parse_next(input)?;
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let file = string_literal.parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let line = decimal_literal.parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let col = decimal_literal.parse_next(input)?;
    ws.parse_next(input)?;
    ')'.parse_next(input)?;
    Ok(SyntaxTree::with_children(
        Production::Location,
        vec![file.into(), line.into(), col.into()],
    ))
}

/// Parse the generic form:
/// `"ns.op"(%operands)[^successors]({regions}) {attrs} : (T) -> R`.
///
/// The operand list child is always present, even when empty, so the fold can
/// rely on its position.
fn generic_operation(input: &mut &str) -> ModalResult<SyntaxTree> {
    let name = string_literal.parse_next(input)?;
    ws.parse_next(input)?;
    '('.parse_next(input)?;
    ws.parse_next(input)?;
    let operands = opt(ssa_use_list)
        .parse_next(input)?
        .unwrap_or_else(|| SyntaxTree::new(Production::SsaUseList));
    ws.parse_next(input)?;
    ')'.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::GenericOperation);
    node.push_node(name);
    node.push_node(operands);
    if let Some(successors) = opt(preceded(ws, successor_list)).parse_next(input)? {
        node.push_node(successors);
    }
    ws.parse_next(input)?;
    if input.starts_with('(') {
        '('.parse_next(input)?;
        let regions: Vec<SyntaxTree> =
            separated(1.., (ws, region, ws).map(|(_, r, _)| r), ',').parse_next(input)?;
        ')'.parse_next(input)?;
        for nested in regions {
            node.push_node(nested);
        }
    }
    if let Some(attrs) = opt(preceded(ws, attribute_dict)).parse_next(input)? {
        node.push_node(attrs);
    }
    (ws, ':', ws).void().parse_next(input)?;
    let ty = function_type.parse_next(input)?;
    node.push_node(ty);
    Ok(node)
}

/// Parse the custom form: `ns.op %operands : result-types`.
///
/// An operand list followed by `=` belongs to the next operation's result
/// bindings, so it is given back rather than consumed.
fn custom_operation(input: &mut &str) -> ModalResult<SyntaxTree> {
    let namespace = bare_id.parse_next(input)?;
    '.'.parse_next(input)?;
    let name = bare_id.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::CustomOperation);
    node.push_node(SyntaxTree::leaf(Production::BareId, namespace));
    node.push_node(SyntaxTree::leaf(Production::BareId, name));
    let before_operands = *input;
    if let Some(operands) = opt(preceded(ws, ssa_use_list)).parse_next(input)? {
        if input.starts_with('=') {
            *input = before_operands;
        } else {
            node.push_node(operands);
        }
    }
    if let Some(types) = opt(preceded((ws, ':', ws), type_list_no_parens)).parse_next(input)? {
        node.push_node(types);
    }
    Ok(node)
}

/// Parse one operation: optional result bindings, the generic or custom
/// form, optional trailing location.
fn operation(input: &mut &str) -> ModalResult<SyntaxTree> {
    let mut node = SyntaxTree::new(Production::Operation);
    if let Some(results) = opt(op_result_list).parse_next(input)? {
        node.push_node(results);
    }
    ws.parse_next(input)?;
    let inner = if input.starts_with('"') {
        generic_operation.parse_next(input)?
    } else {
        custom_operation.parse_next(input)?
    };
    node.push_node(inner);
    if let Some(loc) = opt(preceded(ws, location)).parse_next(input)? {
        node.push_node(loc);
    }
    Ok(node)
}

// ============================================================================
// Blocks, regions, functions, modules
// ============================================================================

fn ssa_id_and_type(input: &mut &str) -> ModalResult<SyntaxTree> {
    let id = ssa_id.parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let ty = type_node.parse_next(input)?;
    Ok(SyntaxTree::with_children(
        Production::SsaIdAndType,
        vec![id.into(), ty.into()],
    ))
}

/// Parse `^bb1(%x: i32, %y: f64):` up to and including the colon.
fn block_label(input: &mut &str) -> ModalResult<SyntaxTree> {
    let id = block_id.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::BlockLabel);
    node.push_node(id);
    ws.parse_next(input)?;
    if input.starts_with('(') {
        let args: Vec<SyntaxTree> = delimited(
            ('(', ws),
            separated(0.., (ws, ssa_id_and_type, ws).map(|(_, a, _)| a), ','),
            (ws, ')'),
        )
        .parse_next(input)?;
        let mut list = SyntaxTree::new(Production::BlockArgList);
        for arg in args {
            list.push_node(arg);
        }
        node.push_node(list);
    }
    (ws, ':').void().parse_next(input)?;
    Ok(node)
}

/// Parse a labeled block: label, then operations until the next label or the
/// region's closing brace. A block holds at least one operation.
fn block(input: &mut &str) -> ModalResult<SyntaxTree> {
    let label = block_label.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::Block);
    node.push_node(label);
    loop {
        ws.parse_next(input)?;
        if input.starts_with('^') || input.starts_with('}') || input.is_empty() {
            break;
        }
        let op = operation.parse_next(input)?;
        node.push_node(op);
    }
    if node.children.len() == 1 {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(node)
}

/// Parse `{ blocks }`. Operations before the first label form an anonymous
/// entry block; `{}` is an empty region.
fn region(input: &mut &str) -> ModalResult<SyntaxTree> {
    '{'.parse_next(input)?;
    ws.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::Region);
    if !input.starts_with('^') && !input.starts_with('}') {
        let mut entry = SyntaxTree::new(Production::Block);
        loop {
            ws.parse_next(input)?;
            if input.starts_with('^') || input.starts_with('}') || input.is_empty() {
                break;
            }
            let op = operation.parse_next(input)?;
            entry.push_node(op);
        }
        if !entry.children.is_empty() {
            node.push_node(entry);
        }
    }
    loop {
        ws.parse_next(input)?;
        if input.starts_with('}') || input.is_empty() {
            break;
        }
        let labeled = block.parse_next(input)?;
        node.push_node(labeled);
    }
    '}'.parse_next(input)?;
    Ok(node)
}

/// Parse `%arg: type` with an optional per-argument attribute dictionary.
fn named_argument(input: &mut &str) -> ModalResult<SyntaxTree> {
    let id = ssa_id.parse_next(input)?;
    (ws, ':', ws).void().parse_next(input)?;
    let ty = type_node.parse_next(input)?;
    let mut node = SyntaxTree::new(Production::NamedArgument);
    node.push_node(id);
    node.push_node(ty);
    if let Some(attrs) = opt(preceded(ws, attribute_dict)).parse_next(input)? {
        node.push_node(attrs);
    }
    Ok(node)
}

/// Parse a function:
/// `func @name(args) -> results attributes {..} { body } loc(..)`.
///
/// The argument list child is always present; the body region is wrapped so
/// a present-but-empty body stays distinct from an absent one.
fn function(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("func").void().parse_next(input)?;
    ws.parse_next(input)?;
    let name = symbol_ref_id.parse_next(input)?;
    ws.parse_next(input)?;
    let args: Vec<SyntaxTree> = delimited(
        ('(', ws),
        separated(0.., (ws, named_argument, ws).map(|(_, a, _)| a), ','),
        (ws, ')'),
    )
    .parse_next(input)?;
    let mut node = SyntaxTree::new(Production::Function);
    node.push_node(name);
    let mut list = SyntaxTree::new(Production::ArgumentList);
    for arg in args {
        list.push_node(arg);
    }
    node.push_node(list);
    if opt((ws, "->")).parse_next(input)?.is_some() {
        ws.parse_next(input)?;
        let results = if input.starts_with('(') {
            function_result_list_parens.parse_next(input)?
        } else {
            non_function_type.parse_next(input)?
        };
        node.push_node(results);
    }
    if opt(preceded(ws, keyword("attributes")))
        .parse_next(input)?
        .is_some()
    {
        ws.parse_next(input)?;
        let attrs = attribute_dict.parse_next(input)?;
        node.push_node(attrs);
    }
    ws.parse_next(input)?;
    if input.starts_with('{') {
        let body = region.parse_next(input)?;
        node.push_node(SyntaxTree::with_children(
            Production::FunctionBody,
            vec![body.into()],
        ));
    }
    if let Some(loc) = opt(preceded(ws, location)).parse_next(input)? {
        node.push_node(loc);
    }
    Ok(node)
}

fn module_item(input: &mut &str) -> ModalResult<SyntaxTree> {
    alt((function, operation)).parse_next(input)
}

/// Parse `module @name attributes {..} { items } loc(..)`.
fn module(input: &mut &str) -> ModalResult<SyntaxTree> {
    keyword("module").void().parse_next(input)?;
    let mut node = SyntaxTree::new(Production::Module);
    if let Some(name) = opt(preceded(ws, symbol_ref_id)).parse_next(input)? {
        node.push_node(name);
    }
    if opt(preceded(ws, keyword("attributes")))
        .parse_next(input)?
        .is_some()
    {
        ws.parse_next(input)?;
        let attrs = attribute_dict.parse_next(input)?;
        node.push_node(attrs);
    }
    ws.parse_next(input)?;
    '{'.parse_next(input)?;
    let mut body = SyntaxTree::new(Production::ModuleBody);
    loop {
        ws.parse_next(input)?;
        if input.starts_with('}') || input.is_empty() {
            break;
        }
        let item = module_item.parse_next(input)?;
        body.push_node(item);
    }
    '}'.parse_next(input)?;
    node.push_node(body);
    if let Some(loc) = opt(preceded(ws, location)).parse_next(input)? {
        node.push_node(loc);
    }
    Ok(node)
}

/// A source file without the `module` wrapper: one or more bare items.
fn implicit_module(input: &mut &str) -> ModalResult<SyntaxTree> {
    let mut body = SyntaxTree::new(Production::ModuleBody);
    loop {
        ws.parse_next(input)?;
        if input.is_empty() {
            break;
        }
        match opt(module_item).parse_next(input)? {
            Some(item) => body.push_node(item),
            None => break,
        }
    }
    if body.children.is_empty() {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    Ok(SyntaxTree::with_children(
        Production::Module,
        vec![body.into()],
    ))
}

// ============================================================================
// Public API
// ============================================================================

/// Parse IR text into a production-labeled syntax tree.
///
/// The result is always a [`Production::Module`] node: either the explicit
/// `module {...}` wrapper or an implicit module around bare top-level items.
pub fn parse_syntax(input: &str) -> Result<SyntaxTree, ParseError> {
    let mut remaining = input;
    let tree = preceded(ws, alt((module, implicit_module)))
        .parse_next(&mut remaining)
        .map_err(|e| ParseError {
            message: format!("expected a module or top-level operations: {}", e),
            offset: input.len() - remaining.len(),
        })?;

    // Reject trailing input
    ws.parse_next(&mut remaining).map_err(|e| ParseError {
        message: format!("lexer error: {}", e),
        offset: input.len() - remaining.len(),
    })?;
    if !remaining.is_empty() {
        return Err(ParseError {
            message: "trailing input after top-level module".to_string(),
            offset: input.len() - remaining.len(),
        });
    }

    tracing::debug!(
        "parse_syntax: root {:?} with {} children",
        tree.production,
        tree.children.len()
    );
    Ok(tree)
}

// ============================================================================
// Tests (pure combinator tests)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::syntax::SyntaxElement;
    use proptest::prelude::*;

    fn nodes(tree: &SyntaxTree) -> Vec<&SyntaxTree> {
        tree.children
            .iter()
            .filter_map(|child| match child {
                SyntaxElement::Node(node) => Some(node),
                SyntaxElement::Token(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_ssa_id_with_index() {
        let mut input = "%result#2";
        let id = ssa_id.parse_next(&mut input).expect("should parse ssa id");
        assert_eq!(id.production, Production::SsaId);
        assert_eq!(id.children.len(), 2);
        assert_eq!(
            nodes(&id)[1],
            &SyntaxTree::leaf(Production::DecimalLiteral, "2")
        );
    }

    #[test]
    fn test_parse_suffix_id_forms() {
        let mut input = "0";
        assert_eq!(suffix_id.parse_next(&mut input).expect("digits"), "0");

        let mut input = "a.b-c$d";
        assert_eq!(
            suffix_id.parse_next(&mut input).expect("punctuated"),
            "a.b-c$d"
        );
    }

    #[test]
    fn test_parse_symbol_ref_suffix_names() {
        // Symbols take the same suffix lexemes as the other sigils.
        for (text, lexeme) in [("@foo.bar", "foo.bar"), ("@0", "0"), ("@a-b$c", "a-b$c")] {
            let mut input = text;
            let sym = symbol_ref_id
                .parse_next(&mut input)
                .expect("should parse symbol");
            assert_eq!(sym.production, Production::SymbolRefId);
            assert_eq!(nodes(&sym)[0], &SyntaxTree::leaf(Production::SuffixId, lexeme));
            assert_eq!(input, "");
        }

        // `::` is not suffix material, so nested paths split cleanly.
        let mut input = "@outer::@inner";
        let sym = symbol_ref_id
            .parse_next(&mut input)
            .expect("should parse symbol");
        assert_eq!(nodes(&sym)[0], &SyntaxTree::leaf(Production::SuffixId, "outer"));
        assert_eq!(input, "::@inner");
    }

    #[test]
    fn test_parse_integer_type_boundary() {
        let mut input = "si32";
        let ty = integer_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty, SyntaxTree::leaf(Production::IntegerType, "si32"));

        // `index` is not an integer type even though it starts with `i`.
        let mut input = "index";
        assert!(integer_type.parse_next(&mut input).is_err());

        // No boundary: trailing identifier characters reject the match.
        let mut input = "i32x";
        assert!(integer_type.parse_next(&mut input).is_err());
    }

    #[test]
    fn test_parse_float_literal_exponent() {
        for (text, lexeme) in [
            ("3.25", "3.25"),
            ("-1.0e10", "-1.0e10"),
            ("+2.5E-3", "+2.5E-3"),
            ("1.", "1."),
        ] {
            let mut input = text;
            let lit = float_literal.parse_next(&mut input).expect("should parse");
            assert_eq!(lit, SyntaxTree::leaf(Production::FloatLiteral, lexeme));
        }

        // No dot, no float.
        let mut input = "42";
        assert!(float_literal.parse_next(&mut input).is_err());
    }

    #[test]
    fn test_parse_string_literal_keeps_lexeme() {
        let mut input = r#""he said \"hi\"" rest"#;
        let lit = string_literal
            .parse_next(&mut input)
            .expect("should parse string");
        assert_eq!(
            lit,
            SyntaxTree::leaf(Production::StringLiteral, r#""he said \"hi\"""#)
        );
        assert_eq!(input, " rest");
    }

    #[test]
    fn test_parse_tensor_dimensions() {
        let mut input = "tensor<2x?x4xf32>";
        let ty = tensor_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::RankedTensorType);
        let dims = nodes(&ty)[0];
        assert_eq!(dims.production, Production::DimensionListRanked);
        assert_eq!(dims.children.len(), 3);
        // The `?` extent has no children, known extents have one.
        assert!(nodes(dims)[1].children.is_empty());

        let mut input = "tensor<*xf32>";
        let ty = tensor_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::UnrankedTensorType);
    }

    #[test]
    fn test_parse_spaced_shape_separators() {
        let mut input = "tensor<2 x ? x 4 x f32>";
        let ty = tensor_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::RankedTensorType);
        assert_eq!(nodes(&ty)[0].children.len(), 3);

        let mut input = "vector<2x i32>";
        let ty = vector_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::VectorType);

        let mut input = "memref<* x f32>";
        let ty = memref_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::UnrankedMemrefType);

        // A separator still needs the `x`; space alone does not split extents.
        let mut input = "tensor<2 4xf32>";
        assert!(tensor_type.parse_next(&mut input).is_err());
    }

    #[test]
    fn test_parse_memref_strided_layout() {
        let mut input = "memref<2x4xf32, offset: ?, strides: [4, 1]>";
        let ty = memref_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::RankedMemrefType);
        assert_eq!(ty.children.len(), 3);
        let layout = nodes(&ty)[2];
        assert_eq!(layout.production, Production::StridedLayout);
        let strides = nodes(layout)[1];
        assert_eq!(strides.production, Production::StrideList);
        assert_eq!(strides.children.len(), 2);
    }

    #[test]
    fn test_parse_function_type_results() {
        let mut input = "(i32, i32) -> i32";
        let ty = function_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::FunctionType);
        assert_eq!(nodes(&ty)[1].production, Production::IntegerType);

        let mut input = "() -> (i32, f32)";
        let ty = function_type.parse_next(&mut input).expect("should parse");
        assert!(nodes(&ty)[0].children.is_empty());
        assert_eq!(nodes(&ty)[1].production, Production::TypeListParens);
    }

    #[test]
    fn test_parse_pretty_dialect_body_nesting() {
        let mut input = r#"!foo.bar<a, b<c, d>, "x, y">"#;
        let ty = dialect_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::PrettyDialectItem);
        let body = nodes(&ty)[0];
        assert_eq!(body.production, Production::PrettyDialectItemBody);
        assert_eq!(
            body.children,
            vec![
                SyntaxElement::Token("a".to_owned()),
                SyntaxElement::Token("b<c, d>".to_owned()),
                SyntaxElement::Token(r#""x, y""#.to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_opaque_dialect_contents_verbatim() {
        let mut input = r#"!spv<"arbitrary { tokens }">"#;
        let ty = dialect_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::OpaqueDialectItem);
        assert_eq!(
            ty.children,
            vec![
                SyntaxElement::Token("spv".to_owned()),
                SyntaxElement::Token("arbitrary { tokens }".to_owned()),
            ]
        );
    }

    #[test]
    fn test_parse_type_alias() {
        let mut input = "!my_type";
        let ty = dialect_type.parse_next(&mut input).expect("should parse");
        assert_eq!(ty.production, Production::TypeAlias);
    }

    #[test]
    fn test_parse_generic_operation_shape() {
        let mut input = r#""std.addi"(%a, %b) : (i32, i32) -> i32"#;
        let op = generic_operation
            .parse_next(&mut input)
            .expect("should parse");
        assert_eq!(op.production, Production::GenericOperation);
        let children = nodes(&op);
        assert_eq!(children[0].production, Production::StringLiteral);
        assert_eq!(children[1].production, Production::SsaUseList);
        assert_eq!(children[1].children.len(), 2);
        assert_eq!(children[2].production, Production::FunctionType);
    }

    #[test]
    fn test_parse_generic_operation_empty_operands() {
        let mut input = r#""foo.const"() {value = 4} : () -> i32"#;
        let op = generic_operation
            .parse_next(&mut input)
            .expect("should parse");
        let children = nodes(&op);
        assert_eq!(children[1].production, Production::SsaUseList);
        assert!(children[1].children.is_empty());
        assert_eq!(children[2].production, Production::AttributeDict);
    }

    #[test]
    fn test_parse_successor_list() {
        let mut input = r#""std.br"()[^bb1, ^exit] : () -> ()"#;
        let op = generic_operation
            .parse_next(&mut input)
            .expect("should parse");
        let successors = nodes(&op)[2];
        assert_eq!(successors.production, Production::SuccessorList);
        assert_eq!(successors.children.len(), 2);
    }

    #[test]
    fn test_custom_operation_gives_back_result_bindings() {
        // `%0` binds the second operation's result; `std.return` has no
        // operands here.
        let text = "func @f() { std.return\n%0 = \"k.c\"() : () -> i32 }";
        let tree = parse_syntax(text).expect("should parse");
        let body = nodes(&tree)[0];
        let func = nodes(body)[0];
        let func_body = nodes(func)[2];
        let region_node = nodes(func_body)[0];
        let entry = nodes(region_node)[0];
        assert_eq!(entry.children.len(), 2, "expected two operations");
    }

    #[test]
    fn test_parse_block_label_args() {
        let mut input = "^bb1(%x: i32, %y: f64):";
        let label = block_label.parse_next(&mut input).expect("should parse");
        assert_eq!(label.production, Production::BlockLabel);
        let args = nodes(&label)[1];
        assert_eq!(args.production, Production::BlockArgList);
        assert_eq!(args.children.len(), 2);
    }

    #[test]
    fn test_parse_function_declaration_vs_empty_body() {
        let mut input = "func @decl(%x: i32) -> i32";
        let decl = function.parse_next(&mut input).expect("should parse");
        assert!(
            nodes(&decl)
                .iter()
                .all(|child| child.production != Production::FunctionBody)
        );

        let mut input = "func @defined() { }";
        let defined = function.parse_next(&mut input).expect("should parse");
        let body = nodes(&defined)
            .into_iter()
            .find(|child| child.production == Production::FunctionBody)
            .expect("body should be present");
        assert!(nodes(body)[0].children.is_empty(), "empty region");
    }

    #[test]
    fn test_parse_module_with_attributes_and_location() {
        let text = r#"module @mod attributes {note = "x"} {
            func @f() { }
        } loc("mod.mlir":1:1)"#;
        let tree = parse_syntax(text).expect("should parse");
        assert_eq!(tree.production, Production::Module);
        let children = nodes(&tree);
        assert_eq!(children[0].production, Production::SymbolRefId);
        assert_eq!(children[1].production, Production::AttributeDict);
        assert_eq!(children[2].production, Production::ModuleBody);
        assert_eq!(children[3].production, Production::Location);
    }

    #[test]
    fn test_parse_implicit_module() {
        let text = "%0 = \"k.c\"() : () -> i32\n%1 = \"k.d\"(%0) : (i32) -> i32";
        let tree = parse_syntax(text).expect("should parse");
        assert_eq!(tree.production, Production::Module);
        let body = nodes(&tree)[0];
        assert_eq!(body.production, Production::ModuleBody);
        assert_eq!(body.children.len(), 2);
    }

    #[test]
    fn test_comments_are_skipped() {
        let text = "// header\nmodule { } // trailing";
        let tree = parse_syntax(text).expect("should parse");
        assert_eq!(tree.production, Production::Module);
    }

    #[test]
    fn test_trailing_input_is_rejected() {
        let text = "module { } garbage";
        let err = parse_syntax(text).expect_err("should fail");
        assert!(err.message.contains("trailing input"));
        assert_eq!(err.offset, 11);
    }

    #[test]
    fn test_operation_trailing_location() {
        let text = r#""foo.op"() : () -> () loc("f.mlir":4:10)"#;
        let tree = parse_syntax(text).expect("should parse");
        let body = nodes(&tree)[0];
        let op = nodes(body)[0];
        assert_eq!(op.production, Production::Operation);
        let last = nodes(op).pop().expect("operation has children");
        assert_eq!(last.production, Production::Location);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// The type combinator must fail cleanly on malformed input.
        #[test]
        fn type_parser_never_panics(input in "[a-z0-9!<>x?.,*() -]{0,80}") {
            let mut rest = input.as_str();
            let _ = type_node.parse_next(&mut rest);
        }

        /// The attribute combinator must fail cleanly on malformed input.
        #[test]
        fn attr_parser_never_panics(input in "[a-z0-9_.@\"\\[\\]{}<>:,=# -]{0,60}") {
            let mut rest = input.as_str();
            let _ = attribute_value.parse_next(&mut rest);
        }
    }
}
