//! The data-access facade: CRUD convenience over the engine.

use tracing::{debug, warn};

use crate::catalog::{descriptor_of, Entity, EntityDescriptor};
use crate::dialect::SqlDialect;
use crate::error::Error;
use crate::exec::{Connection, Driver};
use crate::expr::{ConditionResolver, Expr};
use crate::params::ParameterCollection;
use crate::query::{OrderDirection, PagingResult, Query};
use crate::value::Value;

/// The data-access entry point.
///
/// Holds a driver (the external collaborator) and the SQL dialect. All
/// operations acquire a connection immediately before use and release it
/// on every exit path; batch operations run inside a single transaction
/// and report zero rows after a rollback. Nothing here retries.
pub struct Db<D: Driver> {
    driver: D,
    dialect: SqlDialect,
}

impl<D: Driver> Db<D> {
    /// Create a facade with the default dialect (`@` sigil, offset/fetch
    /// paging).
    pub fn new(driver: D) -> Self {
        Self::with_dialect(driver, SqlDialect::default())
    }

    /// Create a facade with an explicit dialect.
    pub fn with_dialect(driver: D, dialect: SqlDialect) -> Self {
        Self { driver, dialect }
    }

    /// The active dialect.
    pub fn dialect(&self) -> &SqlDialect {
        &self.dialect
    }

    pub(crate) fn driver(&self) -> &D {
        &self.driver
    }

    /// Start a fluent query against `T`.
    pub fn query<T: Entity>(&self) -> Result<Query<'_, T, D>, Error> {
        Query::new(self)
    }

    /// Load one entity by key.
    pub fn load<T: Entity>(&self, id: i64) -> Result<Option<T>, Error> {
        let descriptor = descriptor_of::<T>()?;
        let key = descriptor.require_key()?.name.clone();
        self.query::<T>()?.filter(&Expr::eq(key.as_str(), id))?.first()
    }

    /// Load the first entity matching an optional predicate and order.
    pub fn load_first<T: Entity>(
        &self,
        filter: Option<&Expr>,
        order: Option<(&str, OrderDirection)>,
    ) -> Result<Option<T>, Error> {
        self.build_query::<T>(filter, order)?.first()
    }

    /// Load every entity matching an optional predicate and order.
    pub fn fetch<T: Entity>(
        &self,
        filter: Option<&Expr>,
        order: Option<(&str, OrderDirection)>,
    ) -> Result<Vec<T>, Error> {
        self.build_query::<T>(filter, order)?.to_list()
    }

    /// Load one page plus the total matching row count.
    pub fn page_list<T: Entity>(
        &self,
        page_index: u64,
        page_size: u64,
        filter: Option<&Expr>,
        order: Option<(&str, OrderDirection)>,
    ) -> Result<PagingResult<T>, Error> {
        self.build_query::<T>(filter, order)?
            .to_page(page_index, page_size)
    }

    fn build_query<T: Entity>(
        &self,
        filter: Option<&Expr>,
        order: Option<(&str, OrderDirection)>,
    ) -> Result<Query<'_, T, D>, Error> {
        let mut query = self.query::<T>()?;
        if let Some(expr) = filter {
            query = query.filter(expr)?;
        }
        if let Some((path, direction)) = order {
            query = query.order_by(path, direction)?;
        }
        Ok(query)
    }

    /// Count rows matching an optional predicate (root members only).
    pub fn count<T: Entity>(&self, filter: Option<&Expr>) -> Result<i64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let from = format!("[{}]", descriptor.table_name);

        let (condition, parameters) = match filter {
            Some(expr) => {
                let resolved = ConditionResolver::for_mutation(&descriptor, &self.dialect.prefix)
                    .resolve(expr)?;
                (resolved.condition, resolved.parameters)
            }
            None => (String::new(), ParameterCollection::new()),
        };

        let sql = self.dialect.count(&from, &condition);
        debug!(target: "relq::db", sql = %sql, "executing count");
        let mut connection = self.driver.connect()?;
        let value = connection.query_scalar(&sql, &parameters)?;
        Ok(value.as_i64().unwrap_or_default())
    }

    /// Insert one entity; the generated key is written back onto it.
    /// Returns the key, or 0 when the store yields no identity.
    pub fn insert<T: Entity>(&self, entity: &mut T) -> Result<i64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let sql = self.dialect.insert(&descriptor);

        let mut parameters = ParameterCollection::new();
        parameters.add_entity(entity)?;

        debug!(target: "relq::db", sql = %sql, "executing insert");
        let mut connection = self.driver.connect()?;
        let scalar = connection.query_scalar(&sql, &parameters)?;
        Ok(bind_identity(entity, &scalar))
    }

    /// Insert a batch inside one transaction. Any per-row failure rolls
    /// the whole batch back and reports zero rows.
    pub fn insert_many<T: Entity>(&self, entities: &mut [T]) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let sql = self.dialect.insert(&descriptor);

        let mut connection = self.driver.connect()?;
        connection.begin()?;

        let mut count = 0u64;
        for entity in entities.iter_mut() {
            let mut parameters = ParameterCollection::new();
            parameters.add_entity(entity)?;
            match connection.query_scalar(&sql, &parameters) {
                Ok(scalar) => {
                    bind_identity(entity, &scalar);
                    count += 1;
                }
                Err(error) => {
                    warn!(target: "relq::db", %error, "batch insert failed; rolling back");
                    connection.rollback()?;
                    return Ok(0);
                }
            }
        }

        connection.commit()?;
        Ok(count)
    }

    /// Insert unless the guard condition already matches a row; a blocked
    /// insert yields key 0 and leaves the entity untouched.
    pub fn insert_if_not_exists<T: Entity>(
        &self,
        entity: &mut T,
        guard: &Expr,
    ) -> Result<i64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let resolved =
            ConditionResolver::for_mutation(&descriptor, &self.dialect.prefix).resolve(guard)?;

        let sql = self
            .dialect
            .insert_if_not_exists(&descriptor, &resolved.condition);
        let mut parameters = resolved.parameters;
        parameters.add_entity(entity)?;

        debug!(target: "relq::db", sql = %sql, "executing guarded insert");
        let mut connection = self.driver.connect()?;
        let scalar = connection.query_scalar(&sql, &parameters)?;
        Ok(bind_identity(entity, &scalar))
    }

    /// Update one entity by key.
    pub fn update<T: Entity>(&self, entity: &T) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let sql = self.dialect.update(&descriptor, "")?;

        let mut parameters = ParameterCollection::new();
        parameters.add_entity(entity)?;

        debug!(target: "relq::db", sql = %sql, "executing update");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }

    /// Update a batch inside one transaction; rollback reports zero rows.
    pub fn update_many<T: Entity>(&self, entities: &[T]) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let sql = self.dialect.update(&descriptor, "")?;

        let mut connection = self.driver.connect()?;
        connection.begin()?;

        let mut count = 0u64;
        for entity in entities {
            let mut parameters = ParameterCollection::new();
            parameters.add_entity(entity)?;
            match connection.execute(&sql, &parameters) {
                Ok(affected) => count += affected,
                Err(error) => {
                    warn!(target: "relq::db", %error, "batch update failed; rolling back");
                    connection.rollback()?;
                    return Ok(0);
                }
            }
        }

        connection.commit()?;
        Ok(count)
    }

    /// Update unless the guard condition matches an existing row
    /// (duplicate-prevention updates: `name == new_name && id != my_id`).
    pub fn update_if_not_exists<T: Entity>(&self, entity: &T, guard: &Expr) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let resolved =
            ConditionResolver::for_mutation(&descriptor, &self.dialect.prefix).resolve(guard)?;

        let extra = format!(
            "NOT EXISTS (SELECT 1 FROM [{}] WHERE {})",
            descriptor.table_name, resolved.condition
        );
        let sql = self.dialect.update(&descriptor, &extra)?;

        let mut parameters = resolved.parameters;
        parameters.add_entity(entity)?;

        debug!(target: "relq::db", sql = %sql, "executing guarded update");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }

    /// Set specific members on the row with the given key. Assignments to
    /// the key member are dropped; an empty effective set updates nothing.
    pub fn update_columns<T: Entity>(
        &self,
        id: i64,
        assignments: &[(&str, Value)],
    ) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let key = descriptor.require_key()?.clone();

        let mut sets = Vec::new();
        let mut parameters = ParameterCollection::new();
        for (member, value) in assignments {
            if *member == key.name {
                continue;
            }
            let property = descriptor.require_property(member)?;
            sets.push((property.column.clone(), property.name.clone()));
            parameters.add(property.name.clone(), value.clone());
        }
        if sets.is_empty() {
            return Ok(0);
        }

        let condition = format!("[{}]={}", key.column, self.dialect.parameter(&key.name));
        parameters.add(key.name.clone(), id);

        let sql = self.dialect.update_assignments(&descriptor, &sets, &condition);
        debug!(target: "relq::db", sql = %sql, "executing column update");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }

    /// Set specific members on every row matching the predicate (root
    /// members only).
    pub fn update_columns_where<T: Entity>(
        &self,
        filter: &Expr,
        assignments: &[(&str, Value)],
    ) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let resolved =
            ConditionResolver::for_mutation(&descriptor, &self.dialect.prefix).resolve(filter)?;

        let mut sets = Vec::new();
        let mut parameters = resolved.parameters;
        for (member, value) in assignments {
            let property = descriptor.require_property(member)?;
            if property.is_key {
                continue;
            }
            sets.push((property.column.clone(), property.name.clone()));
            parameters.add(property.name.clone(), value.clone());
        }
        if sets.is_empty() {
            return Ok(0);
        }

        let sql = self
            .dialect
            .update_assignments(&descriptor, &sets, &resolved.condition);
        debug!(target: "relq::db", sql = %sql, "executing predicate column update");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }

    /// Update only the listed members of the entity. With `honor_ignore`
    /// set, members flagged `update_ignore` are dropped from the list.
    pub fn update_only<T: Entity>(
        &self,
        entity: &T,
        members: &[&str],
        honor_ignore: bool,
    ) -> Result<u64, Error> {
        self.update_members(entity, |name| members.contains(&name), honor_ignore)
    }

    /// Update every mapped member except the listed ones. With
    /// `honor_ignore` set, members flagged `update_ignore` are excluded
    /// too.
    pub fn update_except<T: Entity>(
        &self,
        entity: &T,
        members: &[&str],
        honor_ignore: bool,
    ) -> Result<u64, Error> {
        self.update_members(entity, |name| !members.contains(&name), honor_ignore)
    }

    fn update_members<T: Entity>(
        &self,
        entity: &T,
        selected: impl Fn(&str) -> bool,
        honor_ignore: bool,
    ) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let key = descriptor.require_key()?;

        let mut sets = Vec::new();
        let mut parameters = ParameterCollection::new();
        for property in descriptor.mapped_properties() {
            if property.is_key
                || !selected(&property.name)
                || (honor_ignore && property.update_ignore)
            {
                continue;
            }
            sets.push((property.column.clone(), property.name.clone()));
            parameters.add(property.name.clone(), entity.read(&property.name));
        }
        if sets.is_empty() {
            return Ok(0);
        }

        let condition = format!("[{}]={}", key.column, self.dialect.parameter(&key.name));
        parameters.add(key.name.clone(), entity.key());

        let sql = self.dialect.update_assignments(&descriptor, &sets, &condition);
        debug!(target: "relq::db", sql = %sql, "executing member update");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }

    /// Delete one row by key. Soft-delete entities are tombstoned unless
    /// `force` is set.
    pub fn delete<T: Entity>(&self, id: i64, force: bool) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let key = descriptor.require_key()?;

        let condition = format!("[{}]={}", key.column, self.dialect.parameter(&key.name));
        let mut parameters = ParameterCollection::new();
        parameters.add(key.name.clone(), id);

        self.run_delete(&descriptor, &condition, parameters, force)
    }

    /// Delete rows by key list. Keys bind as individual parameters.
    pub fn delete_many<T: Entity>(&self, ids: &[i64], force: bool) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let descriptor = descriptor_of::<T>()?;
        let key = descriptor.require_key()?;

        let mut parameters = ParameterCollection::new();
        let mut placeholders = Vec::with_capacity(ids.len());
        for (index, id) in ids.iter().enumerate() {
            let name = format!("__p_{index}");
            placeholders.push(self.dialect.parameter(&name));
            parameters.add(name, *id);
        }
        let condition = format!("[{}] IN ({})", key.column, placeholders.join(","));

        self.run_delete(&descriptor, &condition, parameters, force)
    }

    /// Delete rows matching a predicate (root members only).
    pub fn delete_where<T: Entity>(&self, filter: &Expr, force: bool) -> Result<u64, Error> {
        let descriptor = descriptor_of::<T>()?;
        let resolved =
            ConditionResolver::for_mutation(&descriptor, &self.dialect.prefix).resolve(filter)?;

        self.run_delete(&descriptor, &resolved.condition, resolved.parameters, force)
    }

    fn run_delete(
        &self,
        descriptor: &EntityDescriptor,
        condition: &str,
        parameters: ParameterCollection,
        force: bool,
    ) -> Result<u64, Error> {
        let sql = if force || !descriptor.soft_delete {
            self.dialect.delete_where(descriptor, condition)
        } else {
            self.dialect.soft_delete_where(descriptor, condition)
        };

        debug!(target: "relq::db", sql = %sql, "executing delete");
        let mut connection = self.driver.connect()?;
        connection.execute(&sql, &parameters)
    }
}

/// Write a generated key back onto the entity; a null or non-positive
/// scalar (a guarded insert that did not run) leaves it untouched.
fn bind_identity<T: Entity>(entity: &mut T, scalar: &Value) -> i64 {
    match scalar.as_i64() {
        Some(key) if key > 0 => {
            entity.assign_key(key);
            key
        }
        _ => 0,
    }
}
