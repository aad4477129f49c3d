//! # Schema Model
//!
//! A component's typed field set. Every field has a default, a current
//! value and a flag recording whether the most recent wire token named it.
//!
//! `serialize()` emits a field when its value differs from the default, or
//! when the latest token carried it. The first rule keeps untouched
//! properties off the wire. The second round-trips values another client set
//! to their default on purpose.

use serde_json::{Map, Value};
use log::{trace, warn};

use scenesync_shared::field::{FieldType, FieldValue};
use scenesync_shared::error::{SyncError, SyncResult};

pub mod catalog;

pub use catalog::ComponentCatalog;

/// One named, typed property of a schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    wire_name: String,
    field_type: FieldType,
    default_value: FieldValue,
    current_value: FieldValue,
    explicitly_present: bool,
}

impl Field {
    pub fn new(wire_name: &str, field_type: FieldType, default_value: FieldValue) -> Self {
        Self {
            wire_name: wire_name.to_string(),
            field_type,
            current_value: default_value.clone(),
            default_value,
            explicitly_present: false,
        }
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn default_value(&self) -> &FieldValue {
        &self.default_value
    }

    pub fn value(&self) -> &FieldValue {
        &self.current_value
    }

    /// Whether the latest wire token contained this field
    pub fn is_explicit(&self) -> bool {
        self.explicitly_present
    }

    /// Exact comparison against the default; no float tolerance, and
    /// `-0.0` counts as a change from `0.0`
    pub fn is_changed(&self) -> bool {
        !self.current_value.same_repr(&self.default_value)
    }
}

/// What a call to [`SchemaModel::apply_from_wire`] did, field by field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Known fields whose value was taken from the token
    pub applied: Vec<String>,
    /// Known fields whose token value did not decode; they kept their value
    pub rejected: Vec<String>,
    /// Keys the schema does not declare; kept in the extension bag
    pub unknown: Vec<String>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Ordered set of uniquely named fields plus the last raw wire token
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    fields: Vec<Field>,
    raw_token: Option<Map<String, Value>>,
    extensions: Map<String, Value>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. Redeclaring a name replaces the earlier definition.
    pub fn with_field(mut self, wire_name: &str, field_type: FieldType, default_value: impl Into<FieldValue>) -> Self {
        let default_value = default_value.into();
        debug_assert!(
            field_type.accepts(&default_value),
            "default for '{}' does not match its type",
            wire_name
        );

        let field = Field::new(wire_name, field_type, default_value);
        match self.fields.iter_mut().find(|f| f.wire_name == wire_name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn field(&self, wire_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Current value of a field
    pub fn get(&self, wire_name: &str) -> Option<&FieldValue> {
        self.field(wire_name).map(Field::value)
    }

    pub fn is_explicit(&self, wire_name: &str) -> bool {
        self.field(wire_name).map_or(false, Field::is_explicit)
    }

    /// The most recently applied wire token, if any
    pub fn raw_token(&self) -> Option<&Map<String, Value>> {
        self.raw_token.as_ref()
    }

    /// Fields received from the wire that this schema does not declare
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// Set a field from local code. Presence metadata is left alone.
    ///
    /// Returns whether the stored value actually changed.
    pub fn set_local(&mut self, wire_name: &str, value: impl Into<FieldValue>) -> SyncResult<bool> {
        let value = value.into();
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.wire_name == wire_name)
            .ok_or_else(|| SyncError::UnknownField {
                component: String::new(),
                field: wire_name.to_string(),
            })?;

        if !field.field_type.accepts(&value) {
            return Err(SyncError::TypeMismatch {
                field: wire_name.to_string(),
                expected: field.field_type.name(),
                actual: value.type_name(),
            });
        }

        if field.current_value.same_repr(&value) {
            return Ok(false);
        }
        field.current_value = value;
        Ok(true)
    }

    /// Set a field from a JSON value, decoded with the field's own type
    pub fn set_local_json(&mut self, wire_name: &str, value: &Value) -> SyncResult<bool> {
        let decoded = {
            let field = self.field(wire_name).ok_or_else(|| SyncError::UnknownField {
                component: String::new(),
                field: wire_name.to_string(),
            })?;
            field.field_type.decode(wire_name, value, &field.current_value)?
        };
        self.set_local(wire_name, decoded)
    }

    /// Merge a wire token into the schema.
    ///
    /// Present fields take the token's value; a field whose value does not
    /// decode keeps its previous value and is reported as rejected. Presence
    /// flags are recomputed against this token alone, and the token becomes
    /// the new `raw_token`. Unknown keys land in the extension bag.
    pub fn apply_from_wire(&mut self, token: &Map<String, Value>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for field in self.fields.iter_mut() {
            field.explicitly_present = token.contains_key(&field.wire_name);

            let Some(raw) = token.get(&field.wire_name) else {
                continue;
            };

            match field.field_type.decode(&field.wire_name, raw, &field.current_value) {
                Ok(value) => {
                    trace!("Field '{}' <- {}", field.wire_name, raw);
                    field.current_value = value;
                    report.applied.push(field.wire_name.clone());
                }
                Err(e) => {
                    warn!("Ignoring field update: {}", e);
                    report.rejected.push(field.wire_name.clone());
                }
            }
        }

        for (key, value) in token {
            if self.fields.iter().all(|f| &f.wire_name != key) {
                self.extensions.insert(key.clone(), value.clone());
                report.unknown.push(key.clone());
            }
        }

        self.raw_token = Some(token.clone());
        report
    }

    /// Sparse wire form: changed or explicitly present fields, plus extensions.
    ///
    /// Always returns a map, empty when nothing qualifies.
    pub fn serialize(&self) -> Map<String, Value> {
        let mut out = self.extensions.clone();
        for field in &self.fields {
            if field.is_changed() || field.explicitly_present {
                out.insert(field.wire_name.clone(), field.current_value.to_json());
            }
        }
        out
    }

    /// Every field's current value, for render appliers
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut out = self.extensions.clone();
        for field in &self.fields {
            out.insert(field.wire_name.clone(), field.current_value.to_json());
        }
        out
    }
}
