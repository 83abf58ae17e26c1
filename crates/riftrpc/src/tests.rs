use std::collections::BTreeMap;

use riftpack::Encoder;

use crate::*;

fn roundtrip_request(frame: RequestFrame) -> RequestFrame {
    let bytes = frame.to_bytes().unwrap();
    match Frame::decode(&bytes).unwrap() {
        Frame::Request(decoded) => decoded,
        _ => panic!("expected request frame"),
    }
}

fn roundtrip_reply(frame: ReplyFrame) -> ReplyFrame {
    let bytes = frame.to_bytes().unwrap();
    match Frame::decode(&bytes).unwrap() {
        Frame::Reply(decoded) => decoded,
        _ => panic!("expected reply frame"),
    }
}

#[test]
fn test_call_roundtrip() {
    let frame = RequestFrame::new(
        7,
        Request::Call {
            module: ModuleId(1234),
            symbol: "set_position".into(),
            args: vec![
                WireValue::Reference(ResourceId::new("Block:Prop", "prop-a")),
                WireValue::Value(Value::List(vec![
                    Value::Float(0.0),
                    Value::Float(1.5),
                    Value::Float(-2.0),
                ])),
            ],
        },
    );

    let decoded = roundtrip_request(frame.clone());
    assert_eq!(decoded, frame);
}

#[test]
fn test_add_remove_module_roundtrip() {
    let add = RequestFrame::new(
        1,
        Request::AddModule {
            source: "create\nrename as relabel\n".into(),
        },
    );
    assert_eq!(roundtrip_request(add.clone()), add);

    let remove = RequestFrame::new(
        2,
        Request::RemoveModule {
            module: ModuleId(99),
        },
    );
    assert_eq!(roundtrip_request(remove.clone()), remove);
}

#[test]
fn test_bare_ops_roundtrip() {
    for request in [
        Request::EnableGc,
        Request::DisableGc,
        Request::CollectGarbage,
        Request::ShutDown,
        Request::Release {
            resource: ResourceId::new("Block:Scene", "stage"),
        },
    ] {
        let frame = RequestFrame::new(3, request);
        assert_eq!(roundtrip_request(frame.clone()), frame);
    }
}

#[test]
fn test_reply_ok_roundtrip() {
    let mut fields = BTreeMap::new();
    fields.insert("width".to_string(), Value::Int(1920));
    fields.insert("title".to_string(), Value::Str("untitled".into()));

    let frame = ReplyFrame::ok(11, WireValue::Value(Value::Map(fields)));
    assert_eq!(roundtrip_reply(frame.clone()), frame);
}

#[test]
fn test_reply_reference_roundtrip() {
    let frame = ReplyFrame::ok(
        12,
        WireValue::Reference(ResourceId::new("Block:Prop:Camera", "camera-main")),
    );
    assert_eq!(roundtrip_reply(frame.clone()), frame);
}

#[test]
fn test_reply_error_payload_is_opaque() {
    let diagnostic = "Traceback (most recent)\n  boom: mesh has no vertices";
    let frame = ReplyFrame::ok(13, WireValue::Error(diagnostic.into()));

    let decoded = roundtrip_reply(frame);
    match decoded.status {
        Ok(WireValue::Error(text)) => assert_eq!(text, diagnostic),
        other => panic!("expected error wire value, got {:?}", other),
    }
}

#[test]
fn test_reply_fault_roundtrip() {
    for fault in [
        Fault::NotFound("module-7".into()),
        Fault::Protocol("error tag in arguments".into()),
        Fault::Execution("sweep failed for 2 resources".into()),
    ] {
        let frame = ReplyFrame::fault(21, fault.clone());
        let decoded = roundtrip_reply(frame);
        assert_eq!(decoded.status, Err(fault));
    }
}

#[test]
fn test_unknown_operation_rejected() {
    let mut enc = Encoder::new();
    enc.variant_begin("request").unwrap();
    enc.map_begin().unwrap();
    enc.variant_begin("seq").unwrap();
    enc.u64(1).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("op").unwrap();
    enc.variant_begin("warp-reality").unwrap();
    enc.unit().unwrap();
    enc.variant_end().unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    assert!(matches!(
        Frame::decode(&bytes),
        Err(Error::UnknownVariant(_))
    ));
}

#[test]
fn test_unknown_fields_skipped() {
    // A request with an extra header field a future revision might add.
    let mut enc = Encoder::new();
    enc.variant_begin("request").unwrap();
    enc.map_begin().unwrap();
    enc.variant_begin("deadline-ms").unwrap();
    enc.u64(5000).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("seq").unwrap();
    enc.u64(8).unwrap();
    enc.variant_end().unwrap();
    enc.variant_begin("op").unwrap();
    enc.variant_begin("collect-garbage").unwrap();
    enc.unit().unwrap();
    enc.variant_end().unwrap();
    enc.variant_end().unwrap();
    enc.map_end().unwrap();
    enc.variant_end().unwrap();
    let bytes = enc.into_bytes().unwrap();

    match Frame::decode(&bytes).unwrap() {
        Frame::Request(frame) => {
            assert_eq!(frame.seq, 8);
            assert_eq!(frame.request, Request::CollectGarbage);
        }
        _ => panic!("expected request frame"),
    }
}

#[test]
fn test_malformed_bytes_rejected() {
    assert!(Frame::decode(&[0xFF, 0x01, 0x02]).is_err());
    assert!(Frame::decode(&[]).is_err());
}

#[test]
fn test_value_nesting_is_untagged() {
    // A nested list round-trips as plain data; references cannot nest by
    // construction, so the type system carries the top-level-only rule.
    let value = Value::List(vec![
        Value::Int(1),
        Value::List(vec![Value::Str("inner".into())]),
    ]);
    let frame = ReplyFrame::ok(30, WireValue::Value(value.clone()));
    match roundtrip_reply(frame).status {
        Ok(WireValue::Value(decoded)) => assert_eq!(decoded, value),
        other => panic!("expected plain value, got {:?}", other),
    }
}

#[test]
fn test_every_value_shape_roundtrips() {
    let mut fields = BTreeMap::new();
    fields.insert("flag".to_string(), Value::Bool(false));
    fields.insert("nothing".to_string(), Value::Unit);

    for value in [
        Value::Unit,
        Value::Bool(true),
        Value::Int(i64::MIN),
        Value::Float(2.5),
        Value::Str("ça va ✺".into()),
        Value::List(vec![Value::Int(1), Value::Float(0.5), Value::Str("x".into())]),
        Value::Map(fields),
    ] {
        let frame = ReplyFrame::ok(40, WireValue::Value(value.clone()));
        match roundtrip_reply(frame).status {
            Ok(WireValue::Value(decoded)) => assert_eq!(decoded, value),
            other => panic!("expected plain value, got {:?}", other),
        }
    }
}

#[test]
fn test_resource_id_base() {
    let id = ResourceId::new("Block:Prop:Camera", "cam");
    assert_eq!(id.base(), "Block");

    let custom = ResourceId::new("Scene", "stage");
    assert_eq!(custom.base(), "Scene");
}
