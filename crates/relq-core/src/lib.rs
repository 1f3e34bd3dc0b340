//! RELQ Core - Entity catalog, predicate resolution, SQL generation, and
//! row materialization.
//!
//! This crate is the engine: typed predicate and projection expressions
//! written against registered entity types are compiled to parameterized
//! SQL, executed through the [`exec`] driver boundary, and result rows are
//! materialized back into typed objects — including one level of joined
//! navigation entities.

pub mod catalog;
pub mod db;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod expr;
pub mod params;
pub mod query;
pub mod row;
pub mod value;

pub use catalog::{
    descriptor_of, Entity, EntityDescriptor, FieldType, NavigationDescriptor,
    PropertyDescriptor, RowTarget, ScalarType,
};
pub use db::Db;
pub use dialect::{PagingStrategy, SqlDialect, RECORD_COUNT_PARAM, SOFT_DELETE_COLUMN};
pub use error::Error;
pub use exec::{Connection, Driver, QueryOutput, RowCursor};
pub use expr::{
    member_names, resolve_projection, CompareOp, ConditionResolveResult, ConditionResolver, Expr,
    LikeMethod, MemberPath, ResolveScope, SelectBinding, SelectExpr,
};
pub use params::{Parameter, ParameterCollection, ParameterDirection};
pub use query::{IncludeSpec, JoinKind, OrderDirection, PagingResult, ProjectedQuery, Query};
pub use row::{materialize, materialize_plain, plan_for, RowPlan};
pub use value::Value;
