//! Assignment-style projection resolution.
//!
//! Projections walk only member-access and member-init shapes: either a
//! single member (`s.Name`, `s.School.SchoolName`) or a list of named
//! bindings onto a target type. Anything else is rejected — this resolver
//! does not understand boolean logic at all.

use crate::error::Error;

use super::ast::MemberPath;

/// A typed projection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    /// Project a single member.
    Member(MemberPath),
    /// Initialize a named target: `(target member, source path)` pairs.
    Init(Vec<(String, MemberPath)>),
}

impl SelectExpr {
    /// Project one member path.
    pub fn member(path: impl Into<MemberPath>) -> Self {
        SelectExpr::Member(path.into())
    }

    /// Project into a named target type.
    pub fn init<I, S, P>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<MemberPath>,
    {
        SelectExpr::Init(
            bindings
                .into_iter()
                .map(|(member, path)| (member.into(), path.into()))
                .collect(),
        )
    }
}

/// One resolved projection binding.
///
/// `nested` is empty when the source is a root property; otherwise
/// `property` names the navigation and `nested` the member on its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectBinding {
    /// Member name on the projection target.
    pub member: String,
    /// First-level source property (root member or navigation name).
    pub property: String,
    /// Member on the navigation target, or empty for root properties.
    pub nested: String,
}

/// Resolve a projection into its bindings.
pub fn resolve_projection(expr: &SelectExpr) -> Result<Vec<SelectBinding>, Error> {
    match expr {
        SelectExpr::Member(path) => Ok(vec![binding_for(path.leaf(), path)?]),
        SelectExpr::Init(bindings) => {
            if bindings.is_empty() {
                return Err(Error::UnsupportedExpression(
                    "projection initializes no members".to_string(),
                ));
            }
            bindings
                .iter()
                .map(|(member, path)| binding_for(member, path))
                .collect()
        }
    }
}

/// Extract plain root member names from a projection shape, for update
/// include/except lists. Navigated paths are rejected — member lists name
/// direct members only.
pub fn member_names(expr: &SelectExpr) -> Result<Vec<String>, Error> {
    let collect = |path: &MemberPath| -> Result<String, Error> {
        match path.segments() {
            [member] => Ok(member.clone()),
            _ => Err(Error::UnsupportedExpression(format!(
                "member lists name direct members only; '{}' is navigated",
                path.display()
            ))),
        }
    };

    match expr {
        SelectExpr::Member(path) => Ok(vec![collect(path)?]),
        SelectExpr::Init(bindings) => bindings.iter().map(|(_, path)| collect(path)).collect(),
    }
}

fn binding_for(member: &str, path: &MemberPath) -> Result<SelectBinding, Error> {
    match path.segments() {
        [property] => Ok(SelectBinding {
            member: member.to_string(),
            property: property.clone(),
            nested: String::new(),
        }),
        [property, nested] => Ok(SelectBinding {
            member: member.to_string(),
            property: property.clone(),
            nested: nested.clone(),
        }),
        _ => Err(Error::UnsupportedExpression(format!(
            "projection path '{}' exceeds the maximum navigation depth of 2",
            path.display()
        ))),
    }
}
