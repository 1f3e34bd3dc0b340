//! The entity traits and the process-wide descriptor registry.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::debug;

use super::entity::EntityDescriptor;
use crate::error::Error;
use crate::value::Value;

/// A type that can receive member assignments from a result row.
///
/// Implementations match on the logical member name and ignore names they
/// do not recognize; the materializer never assigns a database null, so
/// unassigned members keep the `Default` zero value.
pub trait RowTarget: Send + Sync + 'static {
    /// Assign one member from a row value.
    fn assign(&mut self, member: &str, value: Value);
}

/// A mapped entity: declarative metadata plus member access.
///
/// `descriptor()` is the registration-time replacement for reflection: it
/// runs once per type, the result is validated and cached for the process
/// lifetime (see [`descriptor_of`]).
pub trait Entity: RowTarget + Default {
    /// Build this type's schema descriptor.
    fn descriptor() -> EntityDescriptor;

    /// The primary-key value.
    fn key(&self) -> i64;

    /// Write a database-generated key back onto the entity.
    fn assign_key(&mut self, key: i64);

    /// Read one mapped member for parameter binding. Unknown members
    /// read as `Value::Null`.
    fn read(&self, member: &str) -> Value;

    /// Construct the navigation object for `member`, let `fill` populate
    /// it, then attach it. Entities without navigations keep the default
    /// no-op.
    fn hydrate_navigation(&mut self, member: &str, fill: &mut dyn FnMut(&mut dyn RowTarget)) {
        let _ = (member, fill);
    }
}

/// Global read-through descriptor cache.
///
/// Intentional process-wide state: the schema is static for the process
/// lifetime, entries are populated once per key and never evicted. Dashmap
/// shards keep first-time population on distinct keys from contending.
static REGISTRY: LazyLock<DashMap<TypeId, Arc<EntityDescriptor>>> = LazyLock::new(DashMap::new);

/// Get the cached descriptor for `T`, building and validating it on first
/// reference.
///
/// Fails with [`Error::Schema`] if the type declares more than one key
/// property or a malformed navigation. Racing first callers may both build
/// the descriptor; a single equivalent copy is published.
pub fn descriptor_of<T: Entity>() -> Result<Arc<EntityDescriptor>, Error> {
    let type_id = TypeId::of::<T>();
    if let Some(existing) = REGISTRY.get(&type_id) {
        return Ok(existing.clone());
    }

    let descriptor = T::descriptor();
    descriptor.validate()?;
    debug!(
        target: "relq::catalog",
        entity = %descriptor.entity_name,
        table = %descriptor.table_name,
        "registered entity descriptor"
    );

    let entry = REGISTRY
        .entry(type_id)
        .or_insert_with(|| Arc::new(descriptor));
    Ok(entry.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PropertyDescriptor, ScalarType};

    #[derive(Default)]
    struct Widget {
        id: i64,
        label: String,
    }

    impl RowTarget for Widget {
        fn assign(&mut self, member: &str, value: Value) {
            match member {
                "Id" => self.id = value.as_i64().unwrap_or_default(),
                "Label" => self.label = value.as_str().unwrap_or_default().to_string(),
                _ => {}
            }
        }
    }

    impl Entity for Widget {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("Widget")
                .with_property(PropertyDescriptor::key("Id", ScalarType::Int64))
                .with_property(PropertyDescriptor::new("Label", ScalarType::String))
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
                "Label" => Value::String(self.label.clone()),
                _ => Value::Null,
            }
        }
    }

    #[derive(Default)]
    struct TwoKeys;

    impl RowTarget for TwoKeys {
        fn assign(&mut self, _member: &str, _value: Value) {}
    }

    impl Entity for TwoKeys {
        fn descriptor() -> EntityDescriptor {
            EntityDescriptor::new("TwoKeys")
                .with_property(PropertyDescriptor::key("A", ScalarType::Int64))
                .with_property(PropertyDescriptor::key("B", ScalarType::Int64))
        }

        fn key(&self) -> i64 {
            0
        }

        fn assign_key(&mut self, _key: i64) {}

        fn read(&self, _member: &str) -> Value {
            Value::Null
        }
    }

    #[test]
    fn test_descriptor_cached_by_identity() {
        let first = descriptor_of::<Widget>().unwrap();
        let second = descriptor_of::<Widget>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.entity_name, "Widget");
    }

    #[test]
    fn test_ambiguous_key_fails_at_first_use() {
        let err = descriptor_of::<TwoKeys>().unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert!(err.to_string().contains("TwoKeys"));
    }

    #[test]
    fn test_concurrent_first_population() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| descriptor_of::<Widget>().unwrap()))
            .collect();

        let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for d in &descriptors[1..] {
            assert!(Arc::ptr_eq(&descriptors[0], d));
        }
    }
}
