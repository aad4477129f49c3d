mod common;

use serde_json::{json, Value};

use scenesync_client::{
    AllowAll, FieldValue, MessageOutcome, NullPublisher, SceneRegistry, SchemaModel, SyncConfig,
};
use scenesync_client::component::ComponentController;
use scenesync_client::schema::ComponentCatalog;

use common::{init_logging, CountingApplier, PermissionSwitch, RecordingPublisher};

fn create(id: &str, data: Value) -> String {
    json!({"object_id": id, "action": "create", "type": "object", "persist": true, "data": data}).to_string()
}

fn update(id: &str, data: Value) -> String {
    json!({"object_id": id, "action": "update", "type": "object", "data": data}).to_string()
}

fn delete(id: &str) -> String {
    json!({"object_id": id, "action": "delete", "type": "object"}).to_string()
}

fn recording_registry() -> (SceneRegistry, RecordingPublisher) {
    init_logging();
    let publisher = RecordingPublisher::new();
    let registry = SceneRegistry::new(SyncConfig::default(), publisher.clone(), AllowAll);
    (registry, publisher)
}

fn material(registry: &SceneRegistry, id: &str) -> SchemaModel {
    registry
        .object(id)
        .and_then(|o| o.component("material"))
        .map(|c| c.schema().clone())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Selective serialization
// ---------------------------------------------------------------------------

#[test]
fn explicit_defaults_round_trip() {
    let catalog = ComponentCatalog::with_builtins();
    for name in ["material", "light", "text", "animation-mixer"] {
        let prototype = catalog.instantiate(name).unwrap();
        for field in prototype.fields() {
            let mut schema = prototype.clone();
            let token = json!({ field.wire_name(): field.default_value().to_json() });
            schema.apply_from_wire(token.as_object().unwrap());

            let out = schema.serialize();
            assert_eq!(
                out.get(field.wire_name()),
                Some(&field.default_value().to_json()),
                "{}.{}",
                name,
                field.wire_name()
            );
            assert_eq!(out.len(), 1);
        }
    }
}

#[test]
fn explicit_default_survives_a_hop() {
    let (mut registry, publisher) = recording_registry();
    registry.handle_message(&create(
        "box1",
        json!({"object_type": "cube", "material": {"color": "#ffffff", "opacity": 0.5}}),
    ));
    registry.tick();

    registry.set_field("box1", "material", "opacity", 0.75).unwrap();
    registry.tick();

    let sent = publisher.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "update");
    assert_eq!(sent[0]["data"], json!({"material": {"color": "#ffffff", "opacity": 0.75}}));
}

#[test]
fn fresh_objects_are_sparse() {
    let (mut registry, publisher) = recording_registry();
    let id = registry.create_object("box1", "cube", true).unwrap();
    registry.add_component(&id, "material").unwrap();
    registry.add_component(&id, "light").unwrap();
    registry.tick();

    let sent = publisher.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["action"], "create");
    assert_eq!(sent[0]["persist"], true);
    assert_eq!(
        sent[0]["data"],
        json!({"object_type": "cube", "material": {}, "light": {}})
    );
}

// ---------------------------------------------------------------------------
// Publishing
// ---------------------------------------------------------------------------

#[test]
fn repeated_edits_publish_once() {
    let (mut registry, publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {}})));
    registry.tick();

    registry.set_field("box1", "material", "opacity", 0.5).unwrap();
    registry.set_field("box1", "material", "opacity", 0.5).unwrap();
    registry.tick();
    assert_eq!(publisher.take().len(), 1);

    registry.tick();
    registry.set_field("box1", "material", "opacity", 0.5).unwrap();
    registry.tick();
    assert_eq!(publisher.count(), 0);
}

#[test]
fn edits_to_several_components_share_one_envelope() {
    let (mut registry, publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {}, "light": {}})));

    registry.set_field("box1", "material", "wireframe", true).unwrap();
    registry.set_field("box1", "light", "intensity", 2.0).unwrap();
    registry.set_position("box1", scenesync_client::Vector3::new(0.0, 1.0, 0.0)).unwrap();
    let report = registry.tick();
    assert_eq!(report.published, 1);

    let sent = publisher.take();
    assert_eq!(
        sent[0]["data"],
        json!({
            "position": {"x": 0.0, "y": 1.0, "z": 0.0},
            "material": {"wireframe": true},
            "light": {"intensity": 2.0}
        })
    );
}

#[test]
fn no_permission_never_publishes() {
    init_logging();
    let publisher = RecordingPublisher::new();
    let switch = PermissionSwitch::new(false);
    let mut registry = SceneRegistry::new(SyncConfig::default(), publisher.clone(), switch.provider());

    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {}})));
    for i in 0..5 {
        registry.set_field("box1", "material", "opacity", 0.1 * i as f64).unwrap();
        registry.set_field("box1", "material", "wireframe", i % 2 == 0).unwrap();
        registry.tick();
    }
    registry.remove_component("box1", "material").unwrap();
    registry.tick();
    registry.remove_object("box1").unwrap();
    registry.tick();

    assert_eq!(publisher.count(), 0);
    assert!(!registry.contains("box1"));
}

// ---------------------------------------------------------------------------
// Receiving
// ---------------------------------------------------------------------------

#[test]
fn echo_does_not_reapply() {
    let (mut registry, publisher) = recording_registry();
    let applier = CountingApplier::new();
    registry.register_applier("material", applier.clone());

    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {"opacity": 0.5}})));
    registry.tick();
    assert_eq!(applier.apply_count(), 1);

    registry.set_field("box1", "material", "color", FieldValue::Color("#00ff00".into())).unwrap();
    registry.tick();
    let applied_before = applier.apply_count();

    let payload = publisher.take_raw().pop().unwrap();
    match registry.handle_message(&payload) {
        MessageOutcome::Updated(summary) => {
            assert_eq!(summary.echoed, 1);
            assert_eq!(summary.applied, 0);
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let report = registry.tick();
    assert_eq!(report.applied, 0);
    assert_eq!(report.published, 0);
    assert_eq!(applier.apply_count(), applied_before);
}

#[test]
fn bad_field_is_isolated() {
    let (mut registry, _publisher) = recording_registry();
    registry.handle_message(&create("lamp", json!({"object_type": "light", "light": {}})));

    let outcome = registry.handle_message(&update(
        "lamp",
        json!({"light": {"intensity": 5, "distance": "not-a-number"}}),
    ));
    match outcome {
        MessageOutcome::Updated(summary) => assert_eq!(summary.rejected_fields, 1),
        other => panic!("unexpected outcome {:?}", other),
    }

    let light = registry.object("lamp").unwrap().component("light").unwrap().schema();
    assert_eq!(light.get("intensity"), Some(&FieldValue::Number(5.0)));
    assert_eq!(light.get("distance"), Some(&FieldValue::Number(0.0)));
}

#[test]
fn euler_triple_on_the_wire_is_rejected() {
    let (mut registry, _publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube"})));
    registry.handle_message(&update(
        "box1",
        json!({"position": {"x": 2, "y": 0, "z": 0}, "rotation": {"x": 0, "y": 90, "z": 0}}),
    ));

    let obj = registry.object("box1").unwrap();
    assert_eq!(obj.position().x, 2.0);
    assert_eq!(obj.rotation(), scenesync_client::Quat::identity());
}

#[test]
fn malformed_component_payload_is_skipped() {
    let (mut registry, _publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {"opacity": 0.5}})));

    let outcome = registry.handle_message(&update(
        "box1",
        json!({"material": "red", "position": {"x": 1, "y": 1, "z": 1}}),
    ));
    match outcome {
        MessageOutcome::Updated(summary) => {
            assert_eq!(summary.malformed, 1);
            assert_eq!(summary.applied, 1);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(material(&registry, "box1").get("opacity"), Some(&FieldValue::Number(0.5)));
}

#[test]
fn unknown_data_is_carried_forward() {
    let (mut registry, publisher) = recording_registry();
    registry.handle_message(&create(
        "box1",
        json!({
            "object_type": "cube",
            "particle-system": {"preset": "snow"},
            "material": {"opacity": 0.5, "emissiveIntensity": 3}
        }),
    ));

    registry.set_field("box1", "material", "opacity", 0.25).unwrap();
    registry.tick();

    let sent = publisher.take();
    assert_eq!(
        sent[0]["data"],
        json!({
            "particle-system": {"preset": "snow"},
            "material": {"opacity": 0.25, "emissiveIntensity": 3}
        })
    );
}

#[test]
fn null_component_is_removed() {
    let (mut registry, _publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube", "material": {}, "light": {}})));
    registry.handle_message(&update("box1", json!({"light": null})));

    let obj = registry.object("box1").unwrap();
    assert!(obj.has_component("material"));
    assert!(!obj.has_component("light"));
}

#[test]
fn update_can_attach_catalog_components() {
    let (mut registry, _publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube"})));
    registry.handle_message(&update("box1", json!({"text": {"value": "hello"}})));

    let text = registry.object("box1").unwrap().component("text").unwrap();
    assert_eq!(text.schema().get("value"), Some(&FieldValue::String("hello".into())));
}

#[test]
fn late_registration_replaces_opaque_value() {
    let (mut registry, publisher) = recording_registry();
    registry.handle_message(&create("box1", json!({"object_type": "cube", "sparkles": {"rate": 1}})));
    assert_eq!(registry.object("box1").unwrap().extensions()["sparkles"], json!({"rate": 1}));

    let schema = SchemaModel::new().with_field("rate", scenesync_client::FieldType::Number, 0.0);
    assert!(registry.register_component("sparkles", schema));
    registry.handle_message(&update("box1", json!({"sparkles": {"rate": 9}})));
    assert!(registry.object("box1").unwrap().extensions().is_empty());

    registry.set_position("box1", scenesync_client::Vector3::new(1.0, 0.0, 0.0)).unwrap();
    registry.tick();

    let sent = publisher.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["data"], json!({"position": {"x": 1.0, "y": 0.0, "z": 0.0}}));
}

#[test]
fn custom_components_can_be_registered() {
    let (mut registry, publisher) = recording_registry();
    let schema = SchemaModel::new()
        .with_field("enabled", scenesync_client::FieldType::Bool, true)
        .with_field("radius", scenesync_client::FieldType::Number, 1.0);
    assert!(registry.register_component("grabbable", schema));

    registry.handle_message(&create("box1", json!({"object_type": "cube", "grabbable": {"radius": 2}})));
    registry.set_field("box1", "grabbable", "enabled", false).unwrap();
    registry.tick();

    assert_eq!(publisher.take()[0]["data"], json!({"grabbable": {"enabled": false, "radius": 2.0}}));
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[test]
fn box1_create_update_delete() {
    init_logging();
    let mut registry = SceneRegistry::new(SyncConfig::default(), NullPublisher, AllowAll);

    let outcome = registry.handle_message(&create(
        "box1",
        json!({"object_type": "cube", "position": {"x": 0, "y": 0, "z": 0}, "material": {"color": "#ff0000"}}),
    ));
    assert!(matches!(outcome, MessageOutcome::Created(_)));
    assert_eq!(registry.len(), 1);

    let schema = material(&registry, "box1");
    assert_eq!(schema.get("color"), Some(&FieldValue::Color("#ff0000".into())));
    assert!(schema.is_explicit("color"));

    let outcome = registry.handle_message(&update("box1", json!({"material": {"opacity": 0.5}})));
    assert!(matches!(outcome, MessageOutcome::Updated(_)));

    let schema = material(&registry, "box1");
    assert!(schema.is_explicit("opacity"));
    assert_eq!(schema.get("opacity"), Some(&FieldValue::Number(0.5)));
    let out = schema.serialize();
    assert_eq!(out.get("color"), Some(&json!("#ff0000")));
    assert_eq!(out.get("opacity"), Some(&json!(0.5)));

    assert_eq!(registry.handle_message(&delete("box1")), MessageOutcome::Deleted);
    assert!(!registry.contains("box1"));

    assert_eq!(
        registry.handle_message(&update("box1", json!({"material": {"opacity": 0.7}}))),
        MessageOutcome::UnknownObject
    );
    assert!(registry.is_empty());
}

#[test]
fn transform_controller_uses_the_same_rules() {
    let mut transform = ComponentController::transform();
    transform.receive_remote(&json!({"scale": {"x": 1, "y": 1, "z": 1}}));
    assert_eq!(
        Value::Object(transform.schema().serialize()),
        json!({"scale": {"x": 1.0, "y": 1.0, "z": 1.0}})
    );
}
