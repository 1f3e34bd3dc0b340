//! The fluent query builder: one instance per logical query.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::catalog::{descriptor_of, Entity, EntityDescriptor, RowTarget};
use crate::db::Db;
use crate::dialect::RECORD_COUNT_PARAM;
use crate::error::Error;
use crate::exec::{Connection, Driver, RowCursor};
use crate::expr::{resolve_projection, ConditionResolver, Expr, MemberPath, SelectExpr};
use crate::params::ParameterCollection;
use crate::row::{materialize, plan_for, NAV_SEPARATOR};

use super::select::ProjectedQuery;
use super::{IncludeSpec, JoinKind, OrderDirection, PagingResult};

/// A query against one root entity.
///
/// State machine: `include*` then at most one `filter`, `order_by` before
/// any `then_order_by`, an optional terminal `select` transform, and one
/// terminal operation (`to_list` / `first` / `to_page`). Instances are not
/// reusable across queries — every terminal consumes the builder.
pub struct Query<'a, T: Entity, D: Driver> {
    db: &'a Db<D>,
    entity: Arc<EntityDescriptor>,
    includes: Vec<IncludeSpec>,
    condition: String,
    condition_navigations: Vec<String>,
    parameters: ParameterCollection,
    order: String,
    filtered: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<'a, T: Entity, D: Driver> std::fmt::Debug for Query<'a, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("entity", &self.entity)
            .field("includes", &self.includes)
            .field("condition", &self.condition)
            .field("condition_navigations", &self.condition_navigations)
            .field("parameters", &self.parameters)
            .field("order", &self.order)
            .field("filtered", &self.filtered)
            .finish()
    }
}

impl<'a, T: Entity, D: Driver> Query<'a, T, D> {
    pub(crate) fn new(db: &'a Db<D>) -> Result<Self, Error> {
        Ok(Self {
            db,
            entity: descriptor_of::<T>()?,
            includes: Vec::new(),
            condition: String::new(),
            condition_navigations: Vec::new(),
            parameters: ParameterCollection::new(),
            order: String::new(),
            filtered: false,
            _entity: PhantomData,
        })
    }

    /// Eagerly join a navigation and project all of its mapped members.
    pub fn include(self, navigation: &str) -> Result<Self, Error> {
        self.register_include(navigation, Vec::new())
    }

    /// Eagerly join a navigation, projecting only the listed members.
    pub fn include_fields(self, navigation: &str, fields: &[&str]) -> Result<Self, Error> {
        self.register_include(navigation, fields.iter().map(|f| f.to_string()).collect())
    }

    fn register_include(mut self, navigation: &str, fields: Vec<String>) -> Result<Self, Error> {
        let property = self.entity.require_property(navigation)?;
        if !property.is_navigation() {
            return Err(Error::Schema(format!(
                "'{navigation}' is not a navigation property of entity '{}'",
                self.entity.entity_name
            )));
        }

        // Replace-by-name: the latest registration wins.
        self.includes.retain(|i| i.property != navigation);
        self.includes.push(IncludeSpec {
            property: navigation.to_string(),
            fields,
            join: JoinKind::Left,
        });
        Ok(self)
    }

    /// Apply the query predicate. May be called at most once; a second
    /// call is a programming error and fails immediately.
    pub fn filter(mut self, expr: &Expr) -> Result<Self, Error> {
        if self.filtered {
            return Err(Error::InvalidOperation(
                "filter may only be applied once per query".to_string(),
            ));
        }
        self.filtered = true;

        let resolved =
            ConditionResolver::for_query(&self.entity, self.db.dialect().prefix.as_str())
                .resolve(expr)?;
        self.condition = resolved.condition;
        self.parameters.merge(resolved.parameters);
        self.condition_navigations = resolved.navigations;
        Ok(self)
    }

    /// Set the primary sort member (root member or single-hop navigation
    /// path).
    pub fn order_by(mut self, path: &str, direction: OrderDirection) -> Result<Self, Error> {
        let mut order = self.order_field(&MemberPath::parse(path))?;
        if direction == OrderDirection::Desc {
            order.push_str(" DESC");
        }
        self.order = order;
        Ok(self)
    }

    /// Append a secondary sort member; requires `order_by` first.
    pub fn then_order_by(mut self, path: &str, direction: OrderDirection) -> Result<Self, Error> {
        if self.order.is_empty() {
            return Err(Error::InvalidOperation(
                "then_order_by requires order_by to be applied first".to_string(),
            ));
        }
        let field = self.order_field(&MemberPath::parse(path))?;
        self.order.push(',');
        self.order.push_str(&field);
        if direction == OrderDirection::Desc {
            self.order.push_str(" DESC");
        }
        Ok(self)
    }

    /// Terminal transform: replace the field list with an explicit
    /// projection into `P`. Accumulated includes are cleared — the
    /// projection owns field selection from here on.
    pub fn select<P: RowTarget + Default>(
        self,
        projection: &SelectExpr,
    ) -> Result<ProjectedQuery<'a, P, D>, Error> {
        let bindings = resolve_projection(projection)?;

        let mut fields = Vec::with_capacity(bindings.len());
        let mut navigations: Vec<String> = Vec::new();
        for binding in &bindings {
            let property = self.entity.require_property(&binding.property)?;
            if binding.nested.is_empty() {
                if property.is_navigation() {
                    return Err(Error::UnsupportedExpression(format!(
                        "cannot project navigation '{}' itself; project one of its members",
                        binding.property
                    )));
                }
                fields.push(format!(
                    "[{}].[{}] AS [{}]",
                    self.entity.table_name, property.column, binding.member
                ));
            } else {
                let nav = property.navigation.as_ref().ok_or_else(|| {
                    Error::UnsupportedExpression(format!(
                        "'{}' is not a navigation property of entity '{}'",
                        binding.property, self.entity.entity_name
                    ))
                })?;
                let target = nav.target()?;
                let nested = target.require_property(&binding.nested)?;
                if !navigations.contains(&binding.property) {
                    navigations.push(binding.property.clone());
                }
                fields.push(format!(
                    "[{}].[{}] AS [{}]",
                    binding.property, nested.column, binding.member
                ));
            }
        }

        // The projection's navigations and the predicate's navigations
        // both need joins; the cleared includes do not.
        for nav in &self.condition_navigations {
            if !navigations.contains(nav) {
                navigations.push(nav.clone());
            }
        }
        let from = self.join_clause(&navigations)?;

        Ok(ProjectedQuery::new(
            self.db,
            fields.join(","),
            from,
            self.condition,
            self.parameters,
            self.order,
        ))
    }

    /// Execute and materialize every row.
    pub fn to_list(self) -> Result<Vec<T>, Error> {
        let sql = self.db.dialect().select(
            &self.from_clause()?,
            &self.field_list()?,
            &self.condition,
            &self.order,
        );
        self.fetch_rows(&sql)
    }

    /// Execute limited to the first row.
    pub fn first(self) -> Result<Option<T>, Error> {
        let sql = self.db.dialect().select_top(
            &self.from_clause()?,
            &self.field_list()?,
            &self.condition,
            &self.order,
            1,
        );
        Ok(self.fetch_rows(&sql)?.into_iter().next())
    }

    /// Execute one page plus the total matching row count.
    ///
    /// Without an explicit order the root key column orders the page (a
    /// deterministic order is required for paging to be stable).
    pub fn to_page(mut self, page_index: u64, page_size: u64) -> Result<PagingResult<T>, Error> {
        let order = if self.order.is_empty() {
            format!(
                "[{}].[{}]",
                self.entity.table_name,
                self.entity.require_key()?.column
            )
        } else {
            self.order.clone()
        };

        let sql = self.db.dialect().paging_select(
            &self.from_clause()?,
            &self.field_list()?,
            &self.condition,
            &order,
            page_index,
            page_size,
        )?;
        self.parameters.add_output(RECORD_COUNT_PARAM, 0i64);

        debug!(target: "relq::query", sql = %sql, "executing paged select");
        let mut connection = self.db.driver().connect()?;
        let output = connection.query(&sql, &self.parameters)?;
        let record_count = output
            .output(RECORD_COUNT_PARAM)
            .and_then(|v| v.as_i64())
            .unwrap_or_default();

        let included = self.included_names();
        let mut rows = output.rows;
        let plan = plan_for::<T>(rows.columns(), &included)?;
        let mut items = Vec::new();
        while rows.advance()? {
            items.push(materialize(&plan, &rows)?);
        }

        Ok(PagingResult {
            record_count,
            items,
        })
    }

    fn fetch_rows(self, sql: &str) -> Result<Vec<T>, Error> {
        debug!(target: "relq::query", sql = %sql, "executing select");
        let mut connection = self.db.driver().connect()?;
        let output = connection.query(sql, &self.parameters)?;

        let included = self.included_names();
        let mut rows = output.rows;
        let plan = plan_for::<T>(rows.columns(), &included)?;
        let mut items = Vec::new();
        while rows.advance()? {
            items.push(materialize(&plan, &rows)?);
        }
        Ok(items)
    }

    fn included_names(&self) -> Vec<String> {
        self.includes.iter().map(|i| i.property.clone()).collect()
    }

    /// Field list: all mapped root columns aliased to their member names,
    /// then per include the target's columns aliased `Nav__Member`.
    fn field_list(&self) -> Result<String, Error> {
        let mut fields: Vec<String> = self
            .entity
            .mapped_properties()
            .map(|p| {
                format!(
                    "[{}].[{}] AS [{}]",
                    self.entity.table_name, p.column, p.name
                )
            })
            .collect();

        for include in &self.includes {
            let property = self.entity.require_property(&include.property)?;
            let nav = property.navigation.as_ref().ok_or_else(|| {
                Error::Schema(format!(
                    "'{}' is not a navigation property of entity '{}'",
                    include.property, self.entity.entity_name
                ))
            })?;
            let target = nav.target()?;
            for target_property in target.mapped_properties() {
                if !include.fields.is_empty()
                    && !include.fields.iter().any(|f| *f == target_property.name)
                {
                    continue;
                }
                fields.push(format!(
                    "[{alias}].[{column}] AS [{alias}{sep}{member}]",
                    alias = include.property,
                    column = target_property.column,
                    member = target_property.name,
                    sep = NAV_SEPARATOR,
                ));
            }
        }

        Ok(fields.join(","))
    }

    /// FROM clause: the root table plus one join per distinct navigation
    /// referenced by an include or the predicate, aliased by the
    /// navigation's logical name.
    fn from_clause(&self) -> Result<String, Error> {
        let mut navigations: Vec<String> = self.included_names();
        for nav in &self.condition_navigations {
            if !navigations.contains(nav) {
                navigations.push(nav.clone());
            }
        }
        self.join_clause(&navigations)
    }

    fn join_clause(&self, navigations: &[String]) -> Result<String, Error> {
        let mut from = format!("[{}]", self.entity.table_name);
        for name in navigations {
            let property = self.entity.require_property(name)?;
            let nav = property.navigation.as_ref().ok_or_else(|| {
                Error::Schema(format!(
                    "'{name}' is not a navigation property of entity '{}'",
                    self.entity.entity_name
                ))
            })?;
            let target = nav.target()?;
            let principal_key = nav.principal_key(&target)?;
            let join = self
                .includes
                .iter()
                .find(|i| i.property == *name)
                .map_or(JoinKind::Left, |i| i.join);

            from.push_str(&format!(
                " {join} [{target_table}] AS [{alias}] ON [{root}].[{fk}]=[{alias}].[{pk}]",
                join = join.sql(),
                target_table = target.table_name,
                alias = name,
                root = self.entity.table_name,
                fk = nav.foreign_key,
                pk = principal_key,
            ));
        }
        Ok(from)
    }

    /// Resolve an order path to a column reference (depth ≤ 2, no join
    /// inference — ordering by a navigation requires including it).
    fn order_field(&self, path: &MemberPath) -> Result<String, Error> {
        match path.segments() {
            [member] => {
                let property = self.entity.require_property(member)?;
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
                Ok(format!("[{root}].[{}]", nested_property.column))
            }
            _ => Err(Error::UnsupportedExpression(format!(
                "order path '{}' exceeds the maximum navigation depth of 2",
                path.display()
            ))),
        }
    }
}
