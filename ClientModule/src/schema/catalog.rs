//! # Component Catalog
//!
//! Maps component wire names to schema prototypes. Incoming keys found here
//! are routed to a controller. Anything else under `data` is treated as
//! opaque extension data.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use log::{debug, warn};

use scenesync_shared::constants::component;
use scenesync_shared::constants::wire;
use scenesync_shared::field::{FieldType, FieldValue};
use scenesync_shared::types::{Quat, Vector3};

use super::SchemaModel;

const SIDES: &[&str] = &["front", "back", "double"];
const SHADERS: &[&str] = &["flat", "standard"];
const LIGHT_TYPES: &[&str] = &["ambient", "directional", "hemisphere", "point", "spot"];
const ALIGNMENTS: &[&str] = &["left", "center", "right"];
const LOOP_MODES: &[&str] = &["once", "repeat", "pingpong"];

fn color(hex: &str) -> FieldValue {
    FieldValue::Color(hex.to_string())
}

fn choice(value: &str) -> FieldValue {
    FieldValue::Enum(value.to_string())
}

/// Built-in component prototypes, shared by every catalog
static BUILTIN_SCHEMAS: Lazy<HashMap<&'static str, SchemaModel>> = Lazy::new(|| {
    let mut schemas = HashMap::new();

    schemas.insert(
        "material",
        SchemaModel::new()
            .with_field("color", FieldType::Color, color("#ffffff"))
            .with_field("opacity", FieldType::Number, 1.0)
            .with_field("transparent", FieldType::Bool, false)
            .with_field("visible", FieldType::Bool, true)
            .with_field("shader", FieldType::Enum(SHADERS), choice("standard"))
            .with_field("side", FieldType::Enum(SIDES), choice("front"))
            .with_field("wireframe", FieldType::Bool, false)
            .with_field("src", FieldType::String, FieldValue::String(String::new())),
    );

    schemas.insert(
        "light",
        SchemaModel::new()
            .with_field("type", FieldType::Enum(LIGHT_TYPES), choice("directional"))
            .with_field("color", FieldType::Color, color("#ffffff"))
            .with_field("intensity", FieldType::Number, 1.0)
            .with_field("distance", FieldType::Number, 0.0)
            .with_field("decay", FieldType::Number, 1.0)
            .with_field("angle", FieldType::Number, 60.0)
            .with_field("penumbra", FieldType::Number, 0.0)
            .with_field("castShadow", FieldType::Bool, false)
            .with_field("groundColor", FieldType::Color, color("#ffffff")),
    );

    schemas.insert(
        "text",
        SchemaModel::new()
            .with_field("value", FieldType::String, FieldValue::String(String::new()))
            .with_field("color", FieldType::Color, color("#ffffff"))
            .with_field("align", FieldType::Enum(ALIGNMENTS), choice("left"))
            .with_field("font", FieldType::String, FieldValue::String("roboto".to_string()))
            .with_field("width", FieldType::Number, 0.0)
            .with_field("wrapCount", FieldType::Int, 40i64),
    );

    schemas.insert(
        "animation-mixer",
        SchemaModel::new()
            .with_field("clip", FieldType::String, FieldValue::String("*".to_string()))
            .with_field("loop", FieldType::Enum(LOOP_MODES), choice("repeat"))
            .with_field("repetitions", FieldType::Int, -1i64)
            .with_field("timeScale", FieldType::Number, 1.0)
            .with_field("crossFadeDuration", FieldType::Number, 0.0)
            .with_field("clampWhenFinished", FieldType::Bool, false),
    );

    schemas
});

/// Schema of the built-in transform component
pub fn transform_schema() -> SchemaModel {
    SchemaModel::new()
        .with_field(wire::POSITION, FieldType::Vector3, Vector3::zero())
        .with_field(wire::ROTATION, FieldType::Quat, Quat::identity())
        .with_field(wire::SCALE, FieldType::Vector3, Vector3::one())
}

/// Component name → schema prototype lookup for one session
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    schemas: HashMap<String, SchemaModel>,
}

impl ComponentCatalog {
    /// Catalog with no components at all
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Catalog seeded with the built-in component kinds
    pub fn with_builtins() -> Self {
        let schemas = BUILTIN_SCHEMAS
            .iter()
            .map(|(name, schema)| (name.to_string(), schema.clone()))
            .collect();
        Self { schemas }
    }

    /// Register a component kind.
    ///
    /// Returns false if the name is taken or reserved for a data key.
    pub fn register(&mut self, name: &str, schema: SchemaModel) -> bool {
        if is_reserved(name) {
            warn!("Component name '{}' is reserved", name);
            return false;
        }
        if self.schemas.contains_key(name) {
            return false;
        }

        debug!("Registered component '{}' with {} fields", name, schema.len());
        self.schemas.insert(name.to_string(), schema);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Fresh schema instance for a component kind
    pub fn instantiate(&self, name: &str) -> Option<SchemaModel> {
        self.schemas.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Names that can never be component keys under `data`
pub fn is_reserved(name: &str) -> bool {
    name == component::TRANSFORM || name == wire::OBJECT_TYPE || wire::TRANSFORM_KEYS.contains(&name)
}
