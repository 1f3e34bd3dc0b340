//! The typed predicate AST.
//!
//! Predicates are a closed sum type built through constructor helpers, so
//! the resolver is exhaustive pattern matching rather than open-ended node
//! dispatch. Member paths use dot notation ("School.SchoolName"); path
//! depth is the segment count.

use crate::value::Value;

/// A member-access path rooted at the query's entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPath {
    segments: Vec<String>,
}

impl MemberPath {
    /// Parse a dot-notation path.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Path segments in root-to-leaf order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The root segment.
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// The leaf segment.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Render back to dot notation for error messages.
    pub fn display(&self) -> String {
        self.segments.join(".")
    }
}

impl From<&str> for MemberPath {
    fn from(path: &str) -> Self {
        MemberPath::parse(path)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl CompareOp {
    /// The SQL operator text.
    pub fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// String-matching methods lowered to LIKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMethod {
    /// Substring match: `%arg%`.
    Contains,
    /// Prefix match: `arg%`.
    StartsWith,
    /// Suffix match: `%arg`.
    EndsWith,
}

impl LikeMethod {
    /// Wrap the argument with the wildcards this method implies.
    pub fn pattern(self, argument: &str) -> String {
        match self {
            LikeMethod::Contains => format!("%{argument}%"),
            LikeMethod::StartsWith => format!("{argument}%"),
            LikeMethod::EndsWith => format!("%{argument}"),
        }
    }
}

/// A predicate expression over one entity (and its single-hop navigations).
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Both operands must hold.
    And(Box<Expr>, Box<Expr>),
    /// Either operand must hold.
    Or(Box<Expr>, Box<Expr>),
    /// Negation; supported over boolean member accesses and literals.
    Not(Box<Expr>),
    /// Binary comparison.
    Compare {
        /// The operator.
        op: CompareOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A member access; as a clause it reads as "the flag is set".
    Member(MemberPath),
    /// A string-matching call on a member.
    Like {
        /// The matched column.
        member: MemberPath,
        /// Which wildcard shape to apply.
        method: LikeMethod,
        /// The raw argument, always bound as a parameter.
        argument: String,
    },
    /// A literal; captured locals and constants arrive here already
    /// evaluated.
    Literal(Value),
}

impl Expr {
    /// Bare member access (`s.IsActive`).
    pub fn member(path: impl Into<MemberPath>) -> Self {
        Expr::Member(path.into())
    }

    /// Literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// `path = value`.
    pub fn eq(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, path, value)
    }

    /// `path <> value`.
    pub fn ne(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ne, path, value)
    }

    /// `path > value`.
    pub fn gt(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Gt, path, value)
    }

    /// `path >= value`.
    pub fn ge(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Ge, path, value)
    }

    /// `path < value`.
    pub fn lt(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Lt, path, value)
    }

    /// `path <= value`.
    pub fn le(path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Le, path, value)
    }

    /// `path IS NULL`.
    pub fn is_null(path: impl Into<MemberPath>) -> Self {
        Self::compare(CompareOp::Eq, path, Value::Null)
    }

    /// `path IS NOT NULL`.
    pub fn is_not_null(path: impl Into<MemberPath>) -> Self {
        Self::compare(CompareOp::Ne, path, Value::Null)
    }

    /// `path LIKE %arg%`.
    pub fn contains(path: impl Into<MemberPath>, argument: impl Into<String>) -> Self {
        Expr::Like {
            member: path.into(),
            method: LikeMethod::Contains,
            argument: argument.into(),
        }
    }

    /// `path LIKE arg%`.
    pub fn starts_with(path: impl Into<MemberPath>, argument: impl Into<String>) -> Self {
        Expr::Like {
            member: path.into(),
            method: LikeMethod::StartsWith,
            argument: argument.into(),
        }
    }

    /// `path LIKE %arg`.
    pub fn ends_with(path: impl Into<MemberPath>, argument: impl Into<String>) -> Self {
        Expr::Like {
            member: path.into(),
            method: LikeMethod::EndsWith,
            argument: argument.into(),
        }
    }

    /// Conjunction.
    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    /// Disjunction.
    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    /// Negation.
    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    fn compare(op: CompareOp, path: impl Into<MemberPath>, value: impl Into<Value>) -> Self {
        Expr::Compare {
            op,
            left: Box::new(Expr::Member(path.into())),
            right: Box::new(Expr::Literal(value.into())),
        }
    }
}
