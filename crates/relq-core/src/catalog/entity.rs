//! Entity descriptors: the schema metadata for one mapped type.

use super::property::PropertyDescriptor;
use crate::error::Error;

/// Schema metadata for one mapped type; immutable after registration.
///
/// Built by [`Entity::descriptor`](super::registry::Entity::descriptor) at
/// registration time and cached process-wide, so construction cost is paid
/// once per type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Logical type name.
    pub entity_name: String,
    /// Physical table identifier; defaults to the entity name.
    pub table_name: String,
    /// Property definitions in declaration order.
    pub properties: Vec<PropertyDescriptor>,
    /// Rows are tombstoned through `IsDel` instead of deleted.
    pub soft_delete: bool,
    /// Carries creation audit members.
    pub create_audit: bool,
    /// Carries update audit members.
    pub update_audit: bool,
}

impl EntityDescriptor {
    /// Create a descriptor; the table name defaults to the entity name.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        Self {
            table_name: entity_name.clone(),
            entity_name,
            properties: Vec::new(),
            soft_delete: false,
            create_audit: false,
            update_audit: false,
        }
    }

    /// Override the physical table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table_name = table.into();
        self
    }

    /// Add a property.
    pub fn with_property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Add multiple properties.
    pub fn with_properties(
        mut self,
        properties: impl IntoIterator<Item = PropertyDescriptor>,
    ) -> Self {
        self.properties.extend(properties);
        self
    }

    /// Enable soft delete.
    pub fn with_soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    /// Flag creation audit members.
    pub fn with_create_audit(mut self) -> Self {
        self.create_audit = true;
        self
    }

    /// Flag update audit members.
    pub fn with_update_audit(mut self) -> Self {
        self.update_audit = true;
        self
    }

    /// Get a property by logical member name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Get a property by name, or a schema error naming the entity.
    pub fn require_property(&self, name: &str) -> Result<&PropertyDescriptor, Error> {
        self.property(name).ok_or_else(|| {
            Error::Schema(format!(
                "'{}' is not a property of entity '{}'",
                name, self.entity_name
            ))
        })
    }

    /// The key property, if declared.
    pub fn key_property(&self) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.is_key)
    }

    /// The key property, or a schema error for key-requiring operations.
    pub fn require_key(&self) -> Result<&PropertyDescriptor, Error> {
        self.key_property().ok_or_else(|| {
            Error::Schema(format!(
                "entity '{}' declares no key property",
                self.entity_name
            ))
        })
    }

    /// Physical key column, if a key is declared.
    pub fn key_column(&self) -> Option<&str> {
        self.key_property().map(|p| p.column.as_str())
    }

    /// Mapped scalar properties (the SELECT surface).
    pub fn mapped_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.is_mapped_scalar())
    }

    /// Properties that appear in INSERT column lists: mapped scalars,
    /// minus autoincrement keys and insert-ignored members.
    pub fn insert_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| {
            p.is_mapped_scalar() && !p.insert_ignore && !(p.is_key && p.autoincrement)
        })
    }

    /// Properties that appear in UPDATE set lists: mapped scalars, minus
    /// the key and update-ignored members.
    pub fn update_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|p| p.is_mapped_scalar() && !p.is_key && !p.update_ignore)
    }

    /// Navigation properties.
    pub fn navigations(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.is_navigation())
    }

    /// Validate invariants before the descriptor is published.
    ///
    /// A type has at most one key property, and every navigation must name
    /// a foreign-key column.
    pub fn validate(&self) -> Result<(), Error> {
        let keys: Vec<&str> = self
            .properties
            .iter()
            .filter(|p| p.is_key)
            .map(|p| p.name.as_str())
            .collect();
        if keys.len() > 1 {
            return Err(Error::Schema(format!(
                "entity '{}' declares more than one key property ({})",
                self.entity_name,
                keys.join(", ")
            )));
        }

        for prop in &self.properties {
            if let Some(nav) = &prop.navigation {
                if nav.foreign_key.is_empty() {
                    return Err(Error::Schema(format!(
                        "navigation '{}' on entity '{}' declares no foreign-key column",
                        prop.name, self.entity_name
                    )));
                }
            }
        }

        Ok(())
    }
}
