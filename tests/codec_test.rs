use oxid_provider::cty::{json, msgpack};
use oxid_provider::{CodecError, RawState, Type, Value};

fn instance_type() -> Type {
    Type::object([
        ("ami", Type::String),
        ("count", Type::Number),
        ("tags", Type::map(Type::String)),
        ("extra", Type::Dynamic),
    ])
}

fn instance(extra: Value) -> Value {
    Value::object([
        ("ami", Value::from("ami-0c55b159")),
        ("count", Value::from(2i64)),
        ("tags", Value::map([("env", Value::from("prod"))])),
        ("extra", extra),
    ])
}

// ─── Type expressions ────────────────────────────────────────────────────────

#[test]
fn test_type_expression_with_optional_attributes() -> anyhow::Result<()> {
    let ty = Type::from_json_bytes(br#"["object",{"name":"string","port":"number"},["port"]]"#)?;
    assert_eq!(Type::from_json_bytes(&ty.to_json_bytes())?, ty);
    Ok(())
}

#[test]
fn test_type_expression_rejects_undeclared_optional() {
    let err = Type::from_json_bytes(br#"["object",{"name":"string"},["port"]]"#).unwrap_err();
    assert!(matches!(err, CodecError::InvalidType(msg) if msg.contains("port")));
}

#[test]
fn test_type_expression_rejects_unknown_kind() {
    assert!(Type::from_json_bytes(br#"["bag","string"]"#).is_err());
    assert!(Type::from_json_bytes(br#""float""#).is_err());
}

// ─── MessagePack ─────────────────────────────────────────────────────────────

#[test]
fn test_msgpack_dynamic_and_unknown() -> anyhow::Result<()> {
    let value = Value::object([
        ("ami", Value::Unknown),
        ("count", Value::from(2i64)),
        ("tags", Value::Null),
        ("extra", Value::from(true)),
    ]);
    let bytes = msgpack::marshal(&value, &instance_type())?;
    assert_eq!(msgpack::unmarshal(&bytes, &instance_type())?, value);
    Ok(())
}

#[test]
fn test_msgpack_refined_unknown() -> anyhow::Result<()> {
    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, &rmpv::Value::Ext(12, vec![0x81, 0x01, 0xc3]))?;
    assert_eq!(msgpack::unmarshal(&bytes, &Type::String)?, Value::Unknown);
    Ok(())
}

#[test]
fn test_msgpack_trailing_bytes() {
    let mut bytes = msgpack::marshal(&Value::from("x"), &Type::String).unwrap();
    bytes.push(0xc0);
    assert!(matches!(
        msgpack::unmarshal(&bytes, &Type::String),
        Err(CodecError::Msgpack(_))
    ));
}

#[test]
fn test_msgpack_type_mismatch() {
    assert!(msgpack::marshal(&Value::from("eight"), &Type::Number).is_err());
}

// ─── JSON ────────────────────────────────────────────────────────────────────

#[test]
fn test_json_dynamic_wrapper() -> anyhow::Result<()> {
    let decoded = json::unmarshal(br#"{"value":["a","b"],"type":["list","string"]}"#, &Type::Dynamic)?;
    assert_eq!(
        decoded,
        Value::List(vec![Value::from("a"), Value::from("b")])
    );
    Ok(())
}

#[test]
fn test_json_rejects_unknown() {
    let err = json::marshal(&instance(Value::Unknown), &instance_type()).unwrap_err();
    assert!(err.to_string().contains("not known"));
}

// ─── Raw state ───────────────────────────────────────────────────────────────

#[test]
fn test_raw_state_from_value() -> anyhow::Result<()> {
    let value = instance(Value::from("anything"));
    let state = RawState::from_value(&value, &instance_type())?;
    assert!(state.flatmap.is_empty());

    let parsed: serde_json::Value = serde_json::from_slice(&state.json)?;
    assert_eq!(parsed["ami"], "ami-0c55b159");
    assert_eq!(parsed["tags"]["env"], "prod");
    assert_eq!(parsed["extra"]["type"], "string");

    assert_eq!(json::unmarshal(&state.json, &instance_type())?, value);
    Ok(())
}

#[test]
fn test_raw_state_rejects_unknown() {
    assert!(RawState::from_value(&instance(Value::Unknown), &instance_type()).is_err());
}
