use std::collections::HashMap;
use std::fmt;

/// Field or collection resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    UnknownField { entity: String, field: String },
    UnknownEntity(String),
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingError::UnknownField { entity, field } => {
                write!(f, "entity {entity} does not declare field {field}")
            }
            MappingError::UnknownEntity(entity) => write!(f, "unknown entity {entity}"),
        }
    }
}

impl std::error::Error for MappingError {}

/// Maps entity types to collection names and logical field names to their
/// stored paths.
///
/// Entity types are string keys; whatever schema registry sits behind this
/// trait (annotation scanning, static tables, …) is the caller's concern.
pub trait EntityResolver {
    /// Resolve a logical field name to its physical storage path.
    ///
    /// Must fail with [`MappingError`] when `validate` is true and the
    /// field is not declared by the entity.
    fn resolve_path(
        &self,
        entity: &str,
        field: &str,
        validate: bool,
    ) -> Result<String, MappingError>;

    /// Resolve an entity type to its collection name.
    fn collection_name(&self, entity: &str) -> Result<String, MappingError>;
}

/// Identity mapping: every field is its own path, every entity its own
/// collection name. Used when no mapping layer is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl EntityResolver for PassthroughResolver {
    fn resolve_path(
        &self,
        _entity: &str,
        field: &str,
        _validate: bool,
    ) -> Result<String, MappingError> {
        Ok(field.to_string())
    }

    fn collection_name(&self, entity: &str) -> Result<String, MappingError> {
        Ok(entity.to_string())
    }
}

#[derive(Debug, Clone, Default)]
struct EntityMapping {
    collection: String,
    fields: HashMap<String, String>,
}

/// Resolver backed by explicit entity/field tables.
///
/// Fields not present in the table pass through unchanged unless `validate`
/// is requested, in which case they are a [`MappingError`].
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entities: HashMap<String, EntityMapping>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity and its collection name.
    pub fn entity(mut self, name: &str, collection: &str) -> Self {
        self.entities
            .entry(name.to_string())
            .or_default()
            .collection = collection.to_string();
        self
    }

    /// Register a logical-to-stored field mapping for an entity.
    pub fn field(mut self, entity: &str, logical: &str, stored: &str) -> Self {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .fields
            .insert(logical.to_string(), stored.to_string());
        self
    }
}

impl EntityResolver for StaticResolver {
    fn resolve_path(
        &self,
        entity: &str,
        field: &str,
        validate: bool,
    ) -> Result<String, MappingError> {
        let Some(mapping) = self.entities.get(entity) else {
            if validate {
                return Err(MappingError::UnknownEntity(entity.to_string()));
            }
            return Ok(field.to_string());
        };
        match mapping.fields.get(field) {
            Some(stored) => Ok(stored.clone()),
            None if validate => Err(MappingError::UnknownField {
                entity: entity.to_string(),
                field: field.to_string(),
            }),
            None => Ok(field.to_string()),
        }
    }

    fn collection_name(&self, entity: &str) -> Result<String, MappingError> {
        match self.entities.get(entity) {
            Some(mapping) if !mapping.collection.is_empty() => Ok(mapping.collection.clone()),
            _ => Err(MappingError::UnknownEntity(entity.to_string())),
        }
    }
}
