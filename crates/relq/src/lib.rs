//! RELQ - A typed predicate-to-SQL mapping engine with navigation joins.
//!
//! This umbrella crate re-exports the public surface of `relq-core`:
//! declare entities with [`Entity`] and the catalog builders, compose
//! predicates with [`Expr`], and run queries and CRUD operations through
//! [`Db`] over any [`Driver`] implementation.
//!
//! ```no_run
//! use relq::{Db, Expr, OrderDirection};
//! # use relq::{Driver, Error};
//! # fn demo<D: Driver, S: relq::Entity>(db: Db<D>) -> Result<(), Error> {
//! let adults = db
//!     .query::<S>()?
//!     .include("School")?
//!     .filter(&Expr::and(Expr::gt("Age", 18), Expr::member("IsActive")))?
//!     .order_by("Id", OrderDirection::Desc)?
//!     .to_list()?;
//! # Ok(())
//! # }
//! ```

pub use relq_core::*;
