//! The compiled form of a selector: a closed tree of steps run by one
//! interpreter ([`super::eval`]).

use crate::types::ShapeType;

/// A sequence of steps applied left to right.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Expr {
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// `*`
    Identity,
    /// `string`, `structure`, ...
    Type(ShapeType),
    /// `number`, `simpleType`, `collection`
    Category(Category),
    /// `[path]` or `[path op values]`
    Attribute(Attribute),
    /// `[@path: assertion && ...]`
    Scoped(ScopedAttribute),
    /// `>`, `<`, `-[rel]->`, `<-[rel]-`
    Neighbor(Neighbor),
    /// `~>`
    RecursiveNeighbor,
    Not(Box<Expr>),
    Test(Vec<Expr>),
    Is(Vec<Expr>),
    In(Box<Expr>),
    /// `:root(...)`; `index` keys the per-evaluation result cache.
    Root { index: usize, expr: Box<Expr> },
    Recursive(Box<Expr>),
    TopDown {
        qualifier: Box<Expr>,
        disqualifier: Option<Box<Expr>>,
    },
    /// `$name(...)`
    VariableStore { name: String, expr: Box<Expr> },
    /// `${name}`
    VariableGet(String),
    /// An unknown function; matches nothing.
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Category {
    Number,
    SimpleType,
    Collection,
}

impl Category {
    pub fn matches(self, shape_type: ShapeType) -> bool {
        match self {
            Category::Number => shape_type.is_number(),
            Category::SimpleType => shape_type.is_simple(),
            Category::Collection => shape_type.is_collection(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Forward,
    Reverse,
}

/// An empty label list means any non-trait relationship.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Neighbor {
    pub direction: Direction,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attribute {
    pub path: Vec<String>,
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comparison {
    pub comparator: Comparator,
    pub values: Vec<String>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    Exists,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    SetEqual,
    SetNotEqual,
    Subset,
    ProperSubset,
}

impl Comparator {
    /// Tokens in the order the parser must try them (longest first).
    pub const TOKENS: [(&'static str, Comparator); 14] = [
        ("{<<}", Comparator::ProperSubset),
        ("{!=}", Comparator::SetNotEqual),
        ("{=}", Comparator::SetEqual),
        ("{<}", Comparator::Subset),
        ("!=", Comparator::NotEqual),
        ("^=", Comparator::StartsWith),
        ("$=", Comparator::EndsWith),
        ("*=", Comparator::Contains),
        ("?=", Comparator::Exists),
        (">=", Comparator::GreaterEqual),
        ("<=", Comparator::LessEqual),
        ("=", Comparator::Equal),
        (">", Comparator::Greater),
        ("<", Comparator::Less),
    ];

    pub fn is_projection(self) -> bool {
        matches!(
            self,
            Comparator::SetEqual | Comparator::SetNotEqual | Comparator::Subset | Comparator::ProperSubset
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScopedAttribute {
    /// Empty when the scope is the shape itself (`[@: ...]`).
    pub path: Vec<String>,
    pub assertions: Vec<ScopedAssertion>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScopedAssertion {
    pub lhs: ScopedValue,
    pub comparator: Comparator,
    pub rhs: Vec<ScopedValue>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ScopedValue {
    /// `@{a|b}` relative to the scoped value.
    Path(Vec<String>),
    Literal(String),
}
