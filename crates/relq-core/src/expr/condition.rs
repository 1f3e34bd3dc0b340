//! Predicate resolution: typed AST to SQL text plus parameters.

use crate::catalog::EntityDescriptor;
use crate::error::Error;
use crate::params::ParameterCollection;
use crate::value::Value;

use super::ast::{CompareOp, Expr, MemberPath};

/// Result of resolving one predicate; created and discarded per query.
#[derive(Debug)]
pub struct ConditionResolveResult {
    /// SQL fragment with sigil-prefixed placeholder references.
    pub condition: String,
    /// Ordered parameters referenced by the fragment.
    pub parameters: ParameterCollection,
    /// Navigation property names touched by the predicate, so the query
    /// builder can add the joins even when `include` was never called.
    pub navigations: Vec<String>,
}

/// How deep member paths may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveScope {
    /// Query predicates: root members plus single-hop navigations.
    Query,
    /// Mutation predicates: root members only.
    Mutation,
}

impl ResolveScope {
    fn max_depth(self) -> usize {
        match self {
            ResolveScope::Query => 2,
            ResolveScope::Mutation => 1,
        }
    }
}

/// Recursive-descent resolver over the predicate AST.
///
/// Operand order: at every `And`/`Or` the right operand is resolved before
/// the left (the emitted text still reads `(left OP right)`), while
/// comparison operands resolve left-to-right. This only affects parameter
/// numbering and is pinned by tests.
pub struct ConditionResolver<'a> {
    entity: &'a EntityDescriptor,
    prefix: &'a str,
    scope: ResolveScope,
    parameters: ParameterCollection,
    navigations: Vec<String>,
    parameter_index: usize,
}

impl<'a> ConditionResolver<'a> {
    /// Resolver for query predicates (single-hop navigation allowed).
    pub fn for_query(entity: &'a EntityDescriptor, prefix: &'a str) -> Self {
        Self::new(entity, prefix, ResolveScope::Query)
    }

    /// Resolver for mutation predicates (root members only).
    pub fn for_mutation(entity: &'a EntityDescriptor, prefix: &'a str) -> Self {
        Self::new(entity, prefix, ResolveScope::Mutation)
    }

    fn new(entity: &'a EntityDescriptor, prefix: &'a str, scope: ResolveScope) -> Self {
        Self {
            entity,
            prefix,
            scope,
            parameters: ParameterCollection::new(),
            navigations: Vec::new(),
            parameter_index: 0,
        }
    }

    /// Resolve a predicate to SQL text, parameters, and navigation refs.
    pub fn resolve(mut self, expr: &Expr) -> Result<ConditionResolveResult, Error> {
        let condition = self.clause(expr)?;
        Ok(ConditionResolveResult {
            condition,
            parameters: self.parameters,
            navigations: self.navigations,
        })
    }

    /// Resolve an expression in clause position (it must read as a
    /// boolean condition).
    fn clause(&mut self, expr: &Expr) -> Result<String, Error> {
        match expr {
            Expr::And(left, right) => self.connective(left, right, "AND"),
            Expr::Or(left, right) => self.connective(left, right, "OR"),
            Expr::Not(inner) => match inner.as_ref() {
                Expr::Member(path) => Ok(format!("{}=0", self.field(path)?)),
                Expr::Literal(Value::Bool(b)) => Ok(tautology(!*b)),
                other => Err(unsupported("NOT", other)),
            },
            Expr::Member(path) => Ok(format!("{}=1", self.field(path)?)),
            Expr::Literal(Value::Bool(b)) => Ok(tautology(*b)),
            Expr::Literal(other) => Err(Error::UnsupportedExpression(format!(
                "literal {other:?} is not a boolean clause"
            ))),
            Expr::Like {
                member,
                method,
                argument,
            } => {
                let field = self.field(member)?;
                let placeholder = self.bind(Value::String(method.pattern(argument)));
                Ok(format!("{field} LIKE {placeholder}"))
            }
            Expr::Compare { op, left, right } => self.comparison(*op, left, right),
        }
    }

    /// Right operand first, then left; text reads `(left OP right)`.
    fn connective(&mut self, left: &Expr, right: &Expr, op: &str) -> Result<String, Error> {
        let right_sql = self.clause(right)?;
        let left_sql = self.clause(left)?;
        Ok(format!("({left_sql} {op} {right_sql})"))
    }

    fn comparison(&mut self, op: CompareOp, left: &Expr, right: &Expr) -> Result<String, Error> {
        // Equality against a null literal lowers to IS [NOT] NULL with no
        // bound parameter.
        if matches!(op, CompareOp::Eq | CompareOp::Ne) {
            if let Expr::Literal(Value::Null) = right {
                let operand = self.operand(left)?;
                return Ok(match op {
                    CompareOp::Eq => format!("{operand} IS NULL"),
                    _ => format!("{operand} IS NOT NULL"),
                });
            }
        }

        let left_sql = self.operand(left)?;
        let right_sql = self.operand(right)?;
        Ok(format!("{left_sql} {} {right_sql}", op.sql()))
    }

    /// Resolve an expression in operand position (a column reference or a
    /// bound value).
    fn operand(&mut self, expr: &Expr) -> Result<String, Error> {
        match expr {
            Expr::Member(path) => self.field(path),
            Expr::Literal(value) => Ok(self.bind(value.clone())),
            other => Err(unsupported("comparison operand", other)),
        }
    }

    /// Translate a member path to a bracketed column reference, recording
    /// navigation references along the way.
    fn field(&mut self, path: &MemberPath) -> Result<String, Error> {
        if path.depth() > self.scope.max_depth() {
            return Err(self.depth_error(path));
        }

        match path.segments() {
            [member] => {
                let property = self.entity.require_property(member)?;
                if property.is_navigation() {
                    return Err(Error::UnsupportedExpression(format!(
                        "navigation '{member}' cannot be used as a column; reference one of its fields"
                    )));
                }
                Ok(format!(
                    "[{}].[{}]",
                    self.entity.table_name, property.column
                ))
            }
            [root, nested] => {
                let property = self.entity.require_property(root)?;
                let nav = property.navigation.as_ref().ok_or_else(|| {
                    Error::UnsupportedExpression(format!(
                        "'{root}' is not a navigation property of entity '{}'",
                        self.entity.entity_name
                    ))
                })?;
                let target = nav.target()?;
                let nested_property = target.require_property(nested)?;
                if !self.navigations.iter().any(|n| n == root) {
                    self.navigations.push(root.clone());
                }
                Ok(format!("[{root}].[{}]", nested_property.column))
            }
            _ => Err(self.depth_error(path)),
        }
    }

    fn depth_error(&self, path: &MemberPath) -> Error {
        match self.scope {
            ResolveScope::Query => Error::UnsupportedExpression(format!(
                "member path '{}' exceeds the maximum navigation depth of 2; \
                 rewrite multi-hop references through a foreign-key member",
                path.display()
            )),
            ResolveScope::Mutation => Error::UnsupportedExpression(format!(
                "member path '{}' exceeds the maximum depth of 1 allowed in mutation predicates",
                path.display()
            )),
        }
    }

    /// Bind a value under the next `__p_N` name; returns the sigil-prefixed
    /// placeholder for the SQL text.
    fn bind(&mut self, value: Value) -> String {
        let name = format!("__p_{}", self.parameter_index);
        self.parameter_index += 1;
        self.parameters.add(name.clone(), value);
        format!("{}{name}", self.prefix)
    }
}

fn tautology(value: bool) -> String {
    if value { "1=1" } else { "1=0" }.to_string()
}

fn unsupported(position: &str, expr: &Expr) -> Error {
    Error::UnsupportedExpression(format!("{expr:?} is not supported as a {position}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropertyDescriptor, ScalarType};
    use crate::catalog::{Entity, EntityDescriptor, RowTarget};

    #[derive(Default)]
    struct School {
        id: i64,
        school_name: String,
    }

    impl RowTarget for School {
        fn assign(&mut self, member: &str, value: Value) {
            match member {
                "Id" => self.id = value.as_i64().unwrap_or_default(),
                "SchoolName" => {
                    self.school_name = value.as_str().unwrap_or_default().to_string();
                }
                _ => {}
            }
        }
    }

    impl Entity for School {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("School")
                .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
                .with_property(PropertyDescriptor::new("SchoolName", ScalarType::String))
        }

        fn key(&self) -> i64 {
            self.id
        }

        fn assign_key(&mut self, key: i64) {
            self.id = key;
        }

        fn read(&self, member: &str) -> Value {
            match member {
                "Id" => Value::Int64(self.id),
                "SchoolName" => Value::String(self.school_name.clone()),
                _ => Value::Null,
            }
        }
    }

    fn student_descriptor() -> EntityDescriptor {
        EntityDescriptor::new("Student")
            .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
            .with_property(PropertyDescriptor::new("Name", ScalarType::String))
            .with_property(PropertyDescriptor::new("Age", ScalarType::Int32))
            .with_property(PropertyDescriptor::new("IsActive", ScalarType::Bool))
            .with_property(PropertyDescriptor::optional("Nickname", ScalarType::String))
            .with_property(PropertyDescriptor::new("SchoolId", ScalarType::Int64))
            .with_property(PropertyDescriptor::navigation::<School>("School", "SchoolId"))
    }

    fn resolve_query(expr: &Expr) -> ConditionResolveResult {
        let entity = student_descriptor();
        ConditionResolver::for_query(&entity, "@")
            .resolve(expr)
            .unwrap()
    }

    #[test]
    fn test_simple_comparison_binds_one_parameter() {
        let result = resolve_query(&Expr::gt("Age", 18));

        assert_eq!(result.condition, "[Student].[Age] > @__p_0");
        assert_eq!(result.parameters.len(), 1);
        assert_eq!(
            result.parameters.get("__p_0").unwrap().value,
            Value::Int32(18)
        );
        assert!(result.navigations.is_empty());
    }

    #[test]
    fn test_null_comparison_binds_nothing() {
        let result = resolve_query(&Expr::is_null("Nickname"));
        assert_eq!(result.condition, "[Student].[Nickname] IS NULL");
        assert!(result.parameters.is_empty());

        let result = resolve_query(&Expr::is_not_null("Nickname"));
        assert_eq!(result.condition, "[Student].[Nickname] IS NOT NULL");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_bare_boolean_member() {
        let result = resolve_query(&Expr::member("IsActive"));
        assert_eq!(result.condition, "[Student].[IsActive]=1");
        assert!(result.parameters.is_empty());
    }

    #[test]
    fn test_negated_boolean_member() {
        let result = resolve_query(&Expr::not(Expr::member("IsActive")));
        assert_eq!(result.condition, "[Student].[IsActive]=0");
    }

    #[test]
    fn test_captured_boolean_literal_short_circuits() {
        let result = resolve_query(&Expr::literal(true));
        assert_eq!(result.condition, "1=1");
        assert!(result.parameters.is_empty());

        let result = resolve_query(&Expr::literal(false));
        assert_eq!(result.condition, "1=0");
    }

    #[test]
    fn test_like_methods() {
        let result = resolve_query(&Expr::contains("Name", "an"));
        assert_eq!(result.condition, "[Student].[Name] LIKE @__p_0");
        assert_eq!(
            result.parameters.get("__p_0").unwrap().value,
            Value::String("%an%".into())
        );

        let result = resolve_query(&Expr::starts_with("Name", "an"));
        assert_eq!(
            result.parameters.get("__p_0").unwrap().value,
            Value::String("an%".into())
        );

        let result = resolve_query(&Expr::ends_with("Name", "an"));
        assert_eq!(
            result.parameters.get("__p_0").unwrap().value,
            Value::String("%an".into())
        );
    }

    #[test]
    fn test_navigation_reference_and_alias() {
        let result = resolve_query(&Expr::eq("School.SchoolName", "No.1 Middle School"));

        assert_eq!(result.condition, "[School].[SchoolName] = @__p_0");
        assert_eq!(result.navigations, vec!["School".to_string()]);
    }

    #[test]
    fn test_connectives_number_right_subtree_first() {
        let expr = Expr::and(Expr::eq("Age", 1), Expr::eq("Name", "n"));
        let result = resolve_query(&expr);

        // Right operand resolves first, so the right literal takes __p_0.
        assert_eq!(
            result.condition,
            "([Student].[Age] = @__p_1 AND [Student].[Name] = @__p_0)"
        );
        assert_eq!(
            result.parameters.get("__p_0").unwrap().value,
            Value::String("n".into())
        );
        assert_eq!(
            result.parameters.get("__p_1").unwrap().value,
            Value::Int32(1)
        );
    }

    #[test]
    fn test_nested_connectives() {
        let expr = Expr::or(
            Expr::and(Expr::gt("Age", 18), Expr::member("IsActive")),
            Expr::eq("Name", "x"),
        );
        let result = resolve_query(&expr);

        assert_eq!(
            result.condition,
            "(([Student].[Age] > @__p_1 AND [Student].[IsActive]=1) OR [Student].[Name] = @__p_0)"
        );
    }

    #[test]
    fn test_depth_three_fails_in_queries() {
        let err = ConditionResolver::for_query(&student_descriptor(), "@")
            .resolve(&Expr::gt("School.City.Id", 0))
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedExpression(_)));
        assert!(err.to_string().contains("depth of 2"));
    }

    #[test]
    fn test_depth_two_fails_in_mutations() {
        let entity = student_descriptor();
        let err = ConditionResolver::for_mutation(&entity, "@")
            .resolve(&Expr::eq("School.Id", 1))
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedExpression(_)));
        assert!(err.to_string().contains("depth of 1"));
    }

    #[test]
    fn test_unknown_member_is_a_schema_error() {
        let err = ConditionResolver::for_query(&student_descriptor(), "@")
            .resolve(&Expr::eq("Missing", 1))
            .unwrap_err();

        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_bare_navigation_rejected() {
        let err = ConditionResolver::for_query(&student_descriptor(), "@")
            .resolve(&Expr::member("School"))
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedExpression(_)));
    }

    #[test]
    fn test_custom_prefix() {
        let entity = student_descriptor();
        let result = ConditionResolver::for_query(&entity, ":")
            .resolve(&Expr::eq("Age", 3))
            .unwrap();

        assert_eq!(result.condition, "[Student].[Age] = :__p_0");
        assert!(result.parameters.get("__p_0").is_some());
    }
}
