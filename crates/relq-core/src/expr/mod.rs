//! Typed predicate and projection expressions and their resolvers.

mod ast;
mod condition;
mod projection;

pub use ast::{CompareOp, Expr, LikeMethod, MemberPath};
pub use condition::{ConditionResolveResult, ConditionResolver, ResolveScope};
pub use projection::{member_names, resolve_projection, SelectBinding, SelectExpr};
