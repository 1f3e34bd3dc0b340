//! Row materialization: cursor rows back into typed objects.
//!
//! A [`RowPlan`] maps cursor ordinals onto member assignments. Plans are
//! compiled once per `(type, sorted included navigations)` from the first
//! cursor seen for that key and cached for the process lifetime — the
//! schema is assumed stable, so plans are never invalidated. Applying a
//! plan closes over no per-query state and is safe for concurrent reuse.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::debug;

use crate::catalog::{descriptor_of, Entity, RowTarget};
use crate::error::Error;
use crate::exec::RowCursor;

/// Separator between a navigation alias and the member name in projected
/// column names (`School__SchoolName`). Load-bearing: the query builder
/// emits it and this module parses it back apart.
pub const NAV_SEPARATOR: &str = "__";

/// One column-to-member assignment.
#[derive(Debug)]
struct ColumnBinding {
    ordinal: usize,
    member: String,
}

/// Assignments routed into one nested navigation object.
#[derive(Debug)]
struct NavigationPlan {
    name: String,
    fields: Vec<ColumnBinding>,
}

/// A compiled mapping from a cursor's column layout onto one target type.
#[derive(Debug)]
pub struct RowPlan {
    scalars: Vec<ColumnBinding>,
    navigations: Vec<NavigationPlan>,
}

/// Process-wide plan cache. Intentional global: populate-once per key,
/// never evicted, sharded locking via dashmap.
static PLANS: LazyLock<DashMap<(TypeId, Vec<String>), Arc<RowPlan>>> = LazyLock::new(DashMap::new);

/// Get or build the plan for materializing `T` from the given column
/// layout with the given included navigations.
///
/// The cache key is `(TypeId, sorted distinct navigation names)`; the
/// column layout of the first cursor seen for a key is the one compiled.
/// Cache hits return the same `Arc` (observable via `Arc::ptr_eq`).
pub fn plan_for<T: Entity>(columns: &[String], includes: &[String]) -> Result<Arc<RowPlan>, Error> {
    let mut sorted: Vec<String> = includes.to_vec();
    sorted.sort();
    sorted.dedup();

    let key = (TypeId::of::<T>(), sorted);
    if let Some(existing) = PLANS.get(&key) {
        return Ok(existing.clone());
    }

    let plan = Arc::new(build_plan::<T>(columns, &key.1)?);
    debug!(
        target: "relq::row",
        entity = %std::any::type_name::<T>(),
        columns = columns.len(),
        "compiled row plan"
    );
    Ok(PLANS.entry(key).or_insert(plan).clone())
}

fn build_plan<T: Entity>(columns: &[String], includes: &[String]) -> Result<RowPlan, Error> {
    let descriptor = descriptor_of::<T>()?;
    let mut scalars = Vec::new();
    let mut navigations: Vec<NavigationPlan> = includes
        .iter()
        .map(|name| NavigationPlan {
            name: name.clone(),
            fields: Vec::new(),
        })
        .collect();

    for (ordinal, column) in columns.iter().enumerate() {
        if let Some((navigation, member)) = column.split_once(NAV_SEPARATOR) {
            // Columns under an unincluded prefix (or synthetic columns
            // such as the ranking window's row number) are not routed.
            if let Some(plan) = navigations.iter_mut().find(|n| n.name == navigation) {
                plan.fields.push(ColumnBinding {
                    ordinal,
                    member: member.to_string(),
                });
            }
            continue;
        }

        let property = descriptor.require_property(column)?;
        if !property.is_mapped_scalar() {
            continue;
        }
        scalars.push(ColumnBinding {
            ordinal,
            member: property.name.clone(),
        });
    }

    navigations.retain(|n| !n.fields.is_empty());
    Ok(RowPlan {
        scalars,
        navigations,
    })
}

/// Build one entity from the cursor's current row.
///
/// Database nulls leave the member at its `Default` zero value rather than
/// invoking the typed assignment. Each nested navigation object is
/// constructed once, populated from its `prefix__member` columns, and
/// attached to the parent afterwards.
pub fn materialize<T: Entity, R: RowCursor>(plan: &RowPlan, row: &R) -> Result<T, Error> {
    let mut entity = T::default();

    for binding in &plan.scalars {
        let value = row.value(binding.ordinal)?;
        if !value.is_null() {
            entity.assign(&binding.member, value);
        }
    }

    for navigation in &plan.navigations {
        let mut values = Vec::with_capacity(navigation.fields.len());
        for binding in &navigation.fields {
            values.push((binding.member.as_str(), row.value(binding.ordinal)?));
        }
        entity.hydrate_navigation(&navigation.name, &mut |target| {
            for (member, value) in &values {
                if !value.is_null() {
                    target.assign(member, value.clone());
                }
            }
        });
    }

    Ok(entity)
}

/// Build one projection target from the cursor's current row, assigning
/// every column by its alias. Used for explicit projections, whose aliases
/// are target member names and never carry the navigation separator.
pub fn materialize_plain<T: RowTarget + Default, R: RowCursor>(row: &R) -> Result<T, Error> {
    let mut target = T::default();
    let columns: Vec<String> = row.columns().to_vec();
    for (ordinal, column) in columns.iter().enumerate() {
        let value = row.value(ordinal)?;
        if !value.is_null() {
            target.assign(column, value);
        }
    }
    Ok(target)
}
