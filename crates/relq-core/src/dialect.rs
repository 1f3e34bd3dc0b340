//! SQL text generation.
//!
//! Pure, stateless string building: every function takes resolved inputs
//! (FROM clause, field list, condition text, order text) and returns one
//! statement. Identifiers are bracket-delimited; parameter references carry
//! the configured sigil.

use crate::catalog::EntityDescriptor;
use crate::error::Error;

/// Name of the output parameter both paging strategies populate with the
/// total matching row count.
pub const RECORD_COUNT_PARAM: &str = "RecordCount";

/// Column used to tombstone rows of soft-delete entities.
pub const SOFT_DELETE_COLUMN: &str = "IsDel";

/// How paged selects are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStrategy {
    /// Native `OFFSET … FETCH NEXT` paging.
    OffsetFetch,
    /// Ranking-window subquery for dialect versions without native
    /// offset/limit. Same result content, different text.
    RowNumber,
}

/// The SQL dialect: parameter sigil plus paging strategy.
#[derive(Debug, Clone)]
pub struct SqlDialect {
    /// Sigil prepended to parameter names in statement text.
    pub prefix: String,
    /// Active paging strategy.
    pub paging: PagingStrategy,
}

impl Default for SqlDialect {
    fn default() -> Self {
        Self {
            prefix: "@".to_string(),
            paging: PagingStrategy::OffsetFetch,
        }
    }
}

impl SqlDialect {
    /// Dialect with the legacy row-number paging strategy.
    pub fn legacy_paging() -> Self {
        Self {
            paging: PagingStrategy::RowNumber,
            ..Self::default()
        }
    }

    /// Sigil-prefixed reference to a named parameter.
    pub fn parameter(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// Plain select.
    pub fn select(&self, from: &str, fields: &str, condition: &str, order: &str) -> String {
        let mut sql = format!("SELECT {fields} FROM {from}");
        append_where(&mut sql, condition);
        append_order(&mut sql, order);
        sql
    }

    /// Select limited to the first `top` rows.
    pub fn select_top(
        &self,
        from: &str,
        fields: &str,
        condition: &str,
        order: &str,
        top: u64,
    ) -> String {
        let mut sql = format!("SELECT TOP {top} {fields} FROM {from}");
        append_where(&mut sql, condition);
        append_order(&mut sql, order);
        sql
    }

    /// Count matching rows.
    pub fn count(&self, from: &str, condition: &str) -> String {
        let mut sql = format!("SELECT COUNT(0) FROM {from}");
        append_where(&mut sql, condition);
        sql
    }

    /// Paged select per the active strategy.
    ///
    /// Both strategies populate the [`RECORD_COUNT_PARAM`] output parameter
    /// with the total matching row count before streaming the page.
    /// `page_index` is 1-based; `order` must be non-empty.
    pub fn paging_select(
        &self,
        from: &str,
        fields: &str,
        condition: &str,
        order: &str,
        page_index: u64,
        page_size: u64,
    ) -> Result<String, Error> {
        if order.is_empty() {
            return Err(Error::InvalidOperation(
                "paged selects require an ORDER BY clause".to_string(),
            ));
        }
        let page_index = page_index.max(1);

        match self.paging {
            PagingStrategy::OffsetFetch => {
                Ok(self.paging_offset_fetch(from, fields, condition, order, page_index, page_size))
            }
            PagingStrategy::RowNumber => {
                Ok(self.paging_row_number(from, fields, condition, order, page_index, page_size))
            }
        }
    }

    fn paging_offset_fetch(
        &self,
        from: &str,
        fields: &str,
        condition: &str,
        order: &str,
        page_index: u64,
        page_size: u64,
    ) -> String {
        let offset = (page_index - 1) * page_size;
        let mut sql = self.record_count_statement(from, condition);
        sql.push_str(&format!("SELECT {fields} FROM {from}"));
        append_where(&mut sql, condition);
        sql.push_str(&format!(
            " ORDER BY {order} OFFSET {offset} ROWS FETCH NEXT {page_size} ROWS ONLY;"
        ));
        sql
    }

    fn paging_row_number(
        &self,
        from: &str,
        fields: &str,
        condition: &str,
        order: &str,
        page_index: u64,
        page_size: u64,
    ) -> String {
        let first = (page_index - 1) * page_size + 1;
        let last = page_index * page_size;
        let mut sql = self.record_count_statement(from, condition);
        sql.push_str(&format!(
            "SELECT * FROM (SELECT {fields}, ROW_NUMBER() OVER (ORDER BY {order}) AS [__RowNum] FROM {from}"
        ));
        append_where(&mut sql, condition);
        sql.push_str(&format!(
            ") AS [__Paged] WHERE [__RowNum] BETWEEN {first} AND {last};"
        ));
        sql
    }

    fn record_count_statement(&self, from: &str, condition: &str) -> String {
        let mut sql = format!(
            "SELECT {} = COUNT(0) FROM {from}",
            self.parameter(RECORD_COUNT_PARAM)
        );
        append_where(&mut sql, condition);
        sql.push(';');
        sql
    }

    /// Insert a new row and return the generated key as a scalar.
    pub fn insert(&self, entity: &EntityDescriptor) -> String {
        let (columns, values) = self.insert_lists(entity);
        format!(
            "INSERT INTO [{}] ({columns}) VALUES ({values});SELECT SCOPE_IDENTITY();",
            entity.table_name
        )
    }

    /// Insert guarded by a condition; yields scalar 0 when the guard
    /// blocks the insert.
    pub fn insert_if_not_exists(&self, entity: &EntityDescriptor, condition: &str) -> String {
        let (columns, values) = self.insert_lists(entity);
        format!(
            "IF NOT EXISTS (SELECT 1 FROM [{table}] WHERE {condition}) \
             BEGIN INSERT INTO [{table}] ({columns}) VALUES ({values});SELECT SCOPE_IDENTITY(); END \
             ELSE BEGIN SELECT 0 END",
            table = entity.table_name
        )
    }

    fn insert_lists(&self, entity: &EntityDescriptor) -> (String, String) {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for property in entity.insert_properties() {
            columns.push(format!("[{}]", property.column));
            values.push(self.parameter(&property.name));
        }
        (columns.join(","), values.join(","))
    }

    /// Update one row by key; `extra_condition` is appended with AND when
    /// present.
    pub fn update(
        &self,
        entity: &EntityDescriptor,
        extra_condition: &str,
    ) -> Result<String, Error> {
        let key = entity.require_key()?;
        let sets: Vec<String> = entity
            .update_properties()
            .map(|p| format!("[{}]={}", p.column, self.parameter(&p.name)))
            .collect();

        let mut sql = format!(
            "UPDATE [{}] SET {} WHERE [{}]={}",
            entity.table_name,
            sets.join(","),
            key.column,
            self.parameter(&key.name)
        );
        if !extra_condition.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(extra_condition);
        }
        Ok(sql)
    }

    /// Update an explicit set of `column = parameter` assignments under a
    /// condition.
    pub fn update_assignments(
        &self,
        entity: &EntityDescriptor,
        assignments: &[(String, String)],
        condition: &str,
    ) -> String {
        let sets: Vec<String> = assignments
            .iter()
            .map(|(column, parameter)| format!("[{column}]={}{parameter}", self.prefix))
            .collect();
        format!(
            "UPDATE [{}] SET {} WHERE {condition}",
            entity.table_name,
            sets.join(",")
        )
    }

    /// Hard delete under a condition.
    pub fn delete_where(&self, entity: &EntityDescriptor, condition: &str) -> String {
        format!("DELETE FROM [{}] WHERE {condition}", entity.table_name)
    }

    /// Soft delete (tombstone) under a condition.
    pub fn soft_delete_where(&self, entity: &EntityDescriptor, condition: &str) -> String {
        format!(
            "UPDATE [{}] SET [{SOFT_DELETE_COLUMN}]=1 WHERE {condition}",
            entity.table_name
        )
    }
}

fn append_where(sql: &mut String, condition: &str) {
    if !condition.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
}

fn append_order(sql: &mut String, order: &str) {
    if !order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
}
