use super::*;

fn missing(layer: &str) -> ResolveWarning {
    ResolveWarning::ComponentMissing {
        layer_id: layer.to_string(),
        component_id: "card".to_string(),
    }
}

#[test]
fn recording_log_keeps_arrival_order() {
    let log = RecordingLog::new();
    log.warn(missing("a"));
    log.warn(missing("b"));
    assert_eq!(log.warnings(), vec![missing("a"), missing("b")]);
}

#[test]
fn take_drains_the_buffer() {
    let log = RecordingLog::new();
    log.warn(missing("a"));
    assert_eq!(log.take().len(), 1);
    assert!(log.warnings().is_empty());
}

#[test]
fn warnings_serialize_with_kind_tag() {
    let v = serde_json::to_value(missing("a")).unwrap();
    assert_eq!(v["kind"], "component_missing");
    assert_eq!(v["layer_id"], "a");
}
