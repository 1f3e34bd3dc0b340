//! Scalar and field type definitions for the catalog.

/// Scalar types a mapped column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Boolean column (bit).
    Bool,
    /// 32-bit integer column.
    Int32,
    /// 64-bit integer column.
    Int64,
    /// Floating point or decimal column.
    Float64,
    /// Text column.
    String,
    /// Date/time column (microseconds since Unix epoch at runtime).
    Timestamp,
    /// UUID column.
    Uuid,
}

/// The declared type of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Required scalar.
    Scalar(ScalarType),
    /// Nullable scalar; database nulls leave the member at its zero value.
    OptionalScalar(ScalarType),
}

impl FieldType {
    /// Create a required scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a nullable scalar field type.
    pub fn optional(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// The underlying scalar type.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            FieldType::Scalar(s) | FieldType::OptionalScalar(s) => *s,
        }
    }

    /// Whether the field accepts database nulls.
    pub fn is_optional(&self) -> bool {
        matches!(self, FieldType::OptionalScalar(_))
    }
}
