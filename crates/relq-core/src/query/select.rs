//! Projected queries: explicit field lists into named target types.

use std::marker::PhantomData;

use tracing::debug;

use crate::catalog::RowTarget;
use crate::db::Db;
use crate::dialect::RECORD_COUNT_PARAM;
use crate::error::Error;
use crate::exec::{Connection, Driver, RowCursor};
use crate::params::ParameterCollection;
use crate::row::materialize_plain;

use super::PagingResult;

/// The terminal form of a query after `select`: the projection owns the
/// field list, and rows materialize into the named target type by alias.
pub struct ProjectedQuery<'a, P: RowTarget + Default, D: Driver> {
    db: &'a Db<D>,
    fields: String,
    from: String,
    condition: String,
    parameters: ParameterCollection,
    order: String,
    _target: PhantomData<fn() -> P>,
}

impl<'a, P: RowTarget + Default, D: Driver> std::fmt::Debug for ProjectedQuery<'a, P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectedQuery")
            .field("fields", &self.fields)
            .field("from", &self.from)
            .field("condition", &self.condition)
            .field("parameters", &self.parameters)
            .field("order", &self.order)
            .finish()
    }
}

impl<'a, P: RowTarget + Default, D: Driver> ProjectedQuery<'a, P, D> {
    pub(crate) fn new(
        db: &'a Db<D>,
        fields: String,
        from: String,
        condition: String,
        parameters: ParameterCollection,
        order: String,
    ) -> Self {
        Self {
            db,
            fields,
            from,
            condition,
            parameters,
            order,
            _target: PhantomData,
        }
    }

    /// Execute and materialize every row.
    pub fn to_list(self) -> Result<Vec<P>, Error> {
        let sql =
            self.db
                .dialect()
                .select(&self.from, &self.fields, &self.condition, &self.order);
        self.fetch_rows(&sql)
    }

    /// Execute limited to the first row.
    pub fn first(self) -> Result<Option<P>, Error> {
        let sql = self.db.dialect().select_top(
            &self.from,
            &self.fields,
            &self.condition,
            &self.order,
            1,
        );
        Ok(self.fetch_rows(&sql)?.into_iter().next())
    }

    /// Execute one page plus the total matching row count. Projected
    /// paging requires an explicit order.
    pub fn to_page(mut self, page_index: u64, page_size: u64) -> Result<PagingResult<P>, Error> {
        let sql = self.db.dialect().paging_select(
            &self.from,
            &self.fields,
            &self.condition,
            &self.order,
            page_index,
            page_size,
        )?;
        self.parameters.add_output(RECORD_COUNT_PARAM, 0i64);

        debug!(target: "relq::query", sql = %sql, "executing paged projected select");
        let mut connection = self.db.driver().connect()?;
        let output = connection.query(&sql, &self.parameters)?;
        let record_count = output
            .output(RECORD_COUNT_PARAM)
            .and_then(|v| v.as_i64())
            .unwrap_or_default();

        let mut rows = output.rows;
        let mut items = Vec::new();
        while rows.advance()? {
            items.push(materialize_plain(&rows)?);
        }

        Ok(PagingResult {
            record_count,
            items,
        })
    }

    fn fetch_rows(self, sql: &str) -> Result<Vec<P>, Error> {
        debug!(target: "relq::query", sql = %sql, "executing projected select");
        let mut connection = self.db.driver().connect()?;
        let output = connection.query(sql, &self.parameters)?;

        let mut rows = output.rows;
        let mut items = Vec::new();
        while rows.advance()? {
            items.push(materialize_plain(&rows)?);
        }
        Ok(items)
    }
}
