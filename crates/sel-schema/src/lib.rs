//! Entity schema registry for SEL
//!
//! Maps each [`EntityKind`] to its physical layout: backing SQL table,
//! default alias, the properties exposed for `prop`/`orderBy` access,
//! the valid `field` contexts, relations to other entities, and the
//! scope filters a query-builder UI may pre-lock to a fixed value.
//!
//! The registry is built once at startup and never mutated afterwards,
//! so it can be shared by reference across concurrent compiles.

use sel_ast::EntityKind;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no schema registered for entity {0}")]
    UnknownEntity(EntityKind),
}

/// Value type of an entity property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyKind {
    String,
    Int,
    Long,
    Boolean,
    Timestamp,
}

/// A queryable/orderable property of an entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityProperty {
    /// Key used in SEL queries (e.g. "noteId").
    pub sel_key: &'static str,
    /// Backing SQL column (e.g. "note_id").
    pub sql_column: &'static str,
    pub kind: PropertyKind,
}

/// A valid `field` context for entities with field_value storage.
#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
    /// Key used in SEL queries (e.g. "changes").
    pub sel_key: &'static str,
    /// Value stored in the field_value.context column.
    pub sql_value: &'static str,
}

/// A relation from one entity to another, joining source property to
/// target property. Consumed by the query-builder UI to offer subquery
/// correlations.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRelation {
    pub target: EntityKind,
    pub source_property: &'static str,
    pub target_property: &'static str,
}

/// A scope filter the surrounding UI can pre-lock to a fixed value
/// (e.g. restrict a whole query to one deck or session), excluding it
/// from user editing.
#[derive(Debug, Clone, Serialize)]
pub struct LockedScope {
    pub sel_key: &'static str,
    /// The property the locked value is compared against.
    pub property: &'static str,
}

/// Complete entity definition for SQL generation.
#[derive(Debug, Clone, Serialize)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub sql_table: &'static str,
    pub sql_alias: &'static str,
    pub properties: Vec<EntityProperty>,
    pub field_contexts: Vec<FieldContext>,
    pub relations: Vec<EntityRelation>,
    pub locked_scopes: Vec<LockedScope>,
    /// Foreign key column in the field_value table pointing at this
    /// entity, or `None` if the entity has no field storage.
    pub field_value_fk: Option<&'static str>,
}

impl EntitySchema {
    pub fn property(&self, sel_key: &str) -> Option<&EntityProperty> {
        self.properties.iter().find(|p| p.sel_key == sel_key)
    }

    pub fn field_context(&self, sel_key: &str) -> Option<&FieldContext> {
        self.field_contexts.iter().find(|c| c.sel_key == sel_key)
    }

    /// The context used when a `field` access names no context.
    pub fn default_field_context(&self) -> Option<&FieldContext> {
        self.field_contexts.first()
    }

    pub fn relation_to(&self, target: EntityKind) -> Option<&EntityRelation> {
        self.relations.iter().find(|r| r.target == target)
    }

    pub fn property_keys(&self) -> Vec<&'static str> {
        self.properties.iter().map(|p| p.sel_key).collect()
    }

    pub fn field_context_keys(&self) -> Vec<&'static str> {
        self.field_contexts.iter().map(|c| c.sel_key).collect()
    }
}

/// Registry of all entity schemas, keyed by [`EntityKind`].
pub struct EntityRegistry {
    schemas: HashMap<EntityKind, EntitySchema>,
}

impl EntityRegistry {
    /// Build the registry with the built-in schemas registered.
    pub fn new() -> Self {
        let mut registry = Self {
            schemas: HashMap::new(),
        };
        registry.register(note_schema());
        registry.register(suggestion_schema());
        registry.register(session_schema());
        registry.register(history_entry_schema());
        registry
    }

    fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.kind, schema);
    }

    pub fn schema(&self, kind: EntityKind) -> Result<&EntitySchema, SchemaError> {
        self.schemas
            .get(&kind)
            .ok_or(SchemaError::UnknownEntity(kind))
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Built-in schemas ====================

fn note_schema() -> EntitySchema {
    EntitySchema {
        kind: EntityKind::Note,
        sql_table: "cached_note",
        sql_alias: "note",
        properties: vec![
            EntityProperty { sel_key: "id", sql_column: "id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "deckId", sql_column: "deck_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "deckName", sql_column: "deck_name", kind: PropertyKind::String },
            EntityProperty { sel_key: "modelName", sql_column: "model_name", kind: PropertyKind::String },
            EntityProperty { sel_key: "tags", sql_column: "tags", kind: PropertyKind::String },
            EntityProperty { sel_key: "mod", sql_column: "mod", kind: PropertyKind::Long },
            EntityProperty { sel_key: "estimatedTokens", sql_column: "estimated_tokens", kind: PropertyKind::Int },
            EntityProperty { sel_key: "createdAt", sql_column: "created_at", kind: PropertyKind::Timestamp },
            EntityProperty { sel_key: "updatedAt", sql_column: "updated_at", kind: PropertyKind::Timestamp },
        ],
        field_contexts: vec![FieldContext { sel_key: "fields", sql_value: "note_fields" }],
        relations: vec![],
        locked_scopes: vec![LockedScope { sel_key: "deck", property: "deckId" }],
        field_value_fk: Some("note_id"),
    }
}

fn suggestion_schema() -> EntitySchema {
    EntitySchema {
        kind: EntityKind::Suggestion,
        sql_table: "suggestion",
        sql_alias: "sugg",
        properties: vec![
            EntityProperty { sel_key: "id", sql_column: "id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "noteId", sql_column: "note_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "sessionId", sql_column: "session_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "reasoning", sql_column: "reasoning", kind: PropertyKind::String },
            EntityProperty { sel_key: "status", sql_column: "status", kind: PropertyKind::String },
            EntityProperty { sel_key: "createdAt", sql_column: "created_at", kind: PropertyKind::Timestamp },
            EntityProperty { sel_key: "decidedAt", sql_column: "decided_at", kind: PropertyKind::Timestamp },
            EntityProperty { sel_key: "skippedAt", sql_column: "skipped_at", kind: PropertyKind::Timestamp },
        ],
        field_contexts: vec![
            FieldContext { sel_key: "original", sql_value: "sugg_original" },
            FieldContext { sel_key: "changes", sql_value: "sugg_changes" },
            FieldContext { sel_key: "edited", sql_value: "sugg_edited" },
        ],
        relations: vec![
            EntityRelation { target: EntityKind::Note, source_property: "noteId", target_property: "id" },
            EntityRelation { target: EntityKind::Session, source_property: "sessionId", target_property: "id" },
        ],
        locked_scopes: vec![LockedScope { sel_key: "session", property: "sessionId" }],
        field_value_fk: Some("suggestion_id"),
    }
}

fn session_schema() -> EntitySchema {
    EntitySchema {
        kind: EntityKind::Session,
        sql_table: "session",
        sql_alias: "sess",
        properties: vec![
            EntityProperty { sel_key: "id", sql_column: "id", kind: PropertyKind::String },
            EntityProperty { sel_key: "deckId", sql_column: "deck_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "status", sql_column: "status", kind: PropertyKind::String },
            EntityProperty { sel_key: "createdAt", sql_column: "created_at", kind: PropertyKind::Timestamp },
        ],
        field_contexts: vec![],
        relations: vec![],
        locked_scopes: vec![LockedScope { sel_key: "deck", property: "deckId" }],
        field_value_fk: None,
    }
}

fn history_entry_schema() -> EntitySchema {
    EntitySchema {
        kind: EntityKind::HistoryEntry,
        sql_table: "history_entry",
        sql_alias: "hist",
        properties: vec![
            EntityProperty { sel_key: "id", sql_column: "id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "noteId", sql_column: "note_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "suggestionId", sql_column: "suggestion_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "sessionId", sql_column: "session_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "deckId", sql_column: "deck_id", kind: PropertyKind::Long },
            EntityProperty { sel_key: "deckName", sql_column: "deck_name", kind: PropertyKind::String },
            EntityProperty { sel_key: "action", sql_column: "action", kind: PropertyKind::String },
            EntityProperty { sel_key: "reasoning", sql_column: "reasoning", kind: PropertyKind::String },
            EntityProperty { sel_key: "timestamp", sql_column: "timestamp", kind: PropertyKind::Timestamp },
        ],
        field_contexts: vec![
            FieldContext { sel_key: "original", sql_value: "hist_original" },
            FieldContext { sel_key: "aiChanges", sql_value: "hist_ai_changes" },
            FieldContext { sel_key: "applied", sql_value: "hist_applied" },
            FieldContext { sel_key: "userEdits", sql_value: "hist_edited" },
        ],
        relations: vec![
            EntityRelation { target: EntityKind::Note, source_property: "noteId", target_property: "id" },
            EntityRelation { target: EntityKind::Suggestion, source_property: "suggestionId", target_property: "id" },
        ],
        locked_scopes: vec![LockedScope { sel_key: "deck", property: "deckId" }],
        field_value_fk: Some("history_id"),
    }
}
