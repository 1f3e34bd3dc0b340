//! Property definitions for mapped entities.

use std::sync::Arc;

use super::entity::EntityDescriptor;
use super::registry::{descriptor_of, Entity};
use super::types::{FieldType, ScalarType};
use crate::error::Error;

/// Navigation metadata for an entity-typed property.
///
/// Present only on properties whose type is itself a mapped entity. The
/// target descriptor is resolved lazily through the registry so that an
/// unresolvable target still fails at first use rather than at declaration.
#[derive(Debug, Clone)]
pub struct NavigationDescriptor {
    /// Foreign-key column on the owning (declaring) side.
    pub foreign_key: String,
    /// Column on the principal side; `None` defaults to the principal's
    /// key column.
    pub principal_key: Option<String>,
    /// Thunk resolving the target entity's descriptor.
    pub target: fn() -> Result<Arc<EntityDescriptor>, Error>,
}

impl NavigationDescriptor {
    /// Resolve the target entity's descriptor.
    pub fn target(&self) -> Result<Arc<EntityDescriptor>, Error> {
        (self.target)()
    }

    /// The principal-side join column, defaulting to the target's key.
    pub fn principal_key(&self, target: &EntityDescriptor) -> Result<String, Error> {
        if let Some(key) = &self.principal_key {
            return Ok(key.clone());
        }
        target.key_column().map(str::to_string).ok_or_else(|| {
            Error::Schema(format!(
                "navigation target '{}' has no key column to join on",
                target.entity_name
            ))
        })
    }
}

/// A property definition within a mapped entity.
///
/// The logical `name` is what expressions and parameters use; `column` is
/// the physical identifier emitted into SQL. They are always kept distinct.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// Logical member name.
    pub name: String,
    /// Physical column name.
    pub column: String,
    /// Declared type; `None` for navigation properties.
    pub field_type: Option<FieldType>,
    /// Whether this is the primary-key property.
    pub is_key: bool,
    /// Whether the key is database-generated.
    pub autoincrement: bool,
    /// Participates in SELECT/INSERT/UPDATE statements.
    pub mapped: bool,
    /// Excluded from INSERT column lists.
    pub insert_ignore: bool,
    /// Excluded from UPDATE set lists.
    pub update_ignore: bool,
    /// Navigation metadata, present only for entity-typed properties.
    pub navigation: Option<NavigationDescriptor>,
}

impl PropertyDescriptor {
    /// Create a required scalar property. The column defaults to the
    /// member name until overridden.
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            field_type: Some(FieldType::Scalar(scalar)),
            is_key: false,
            autoincrement: false,
            mapped: true,
            insert_ignore: false,
            update_ignore: false,
            navigation: None,
        }
    }

    /// Create a nullable scalar property.
    pub fn optional(name: impl Into<String>, scalar: ScalarType) -> Self {
        let mut prop = Self::new(name, scalar);
        prop.field_type = Some(FieldType::OptionalScalar(scalar));
        prop
    }

    /// Create the primary-key property (autoincrement by default).
    pub fn key(name: impl Into<String>, scalar: ScalarType) -> Self {
        let mut prop = Self::new(name, scalar);
        prop.is_key = true;
        prop.autoincrement = true;
        prop
    }

    /// Create a navigation property targeting another mapped entity.
    ///
    /// `foreign_key` is the column on this entity holding the reference;
    /// the principal-side column defaults to the target's key column.
    pub fn navigation<T: Entity>(
        name: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            field_type: None,
            is_key: false,
            autoincrement: false,
            mapped: false,
            insert_ignore: true,
            update_ignore: true,
            navigation: Some(NavigationDescriptor {
                foreign_key: foreign_key.into(),
                principal_key: None,
                target: descriptor_of::<T>,
            }),
        }
    }

    /// Override the physical column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Override the principal-side join column of a navigation.
    pub fn with_principal_key(mut self, key: impl Into<String>) -> Self {
        if let Some(nav) = &mut self.navigation {
            nav.principal_key = Some(key.into());
        }
        self
    }

    /// Mark the key as not database-generated.
    pub fn without_autoincrement(mut self) -> Self {
        self.autoincrement = false;
        self
    }

    /// Exclude the property from all generated statements.
    pub fn unmapped(mut self) -> Self {
        self.mapped = false;
        self
    }

    /// Exclude the property from INSERT column lists.
    pub fn insert_ignored(mut self) -> Self {
        self.insert_ignore = true;
        self
    }

    /// Exclude the property from UPDATE set lists.
    pub fn update_ignored(mut self) -> Self {
        self.update_ignore = true;
        self
    }

    /// Whether this property is a navigation.
    pub fn is_navigation(&self) -> bool {
        self.navigation.is_some()
    }

    /// Whether this property is a mapped scalar (SELECT/INSERT/UPDATE
    /// candidate).
    pub fn is_mapped_scalar(&self) -> bool {
        self.mapped && self.navigation.is_none()
    }
}
