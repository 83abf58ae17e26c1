use crate::*;
use std::f64::consts::PI;

// ============================================================================
//  SCALARS
// ============================================================================

#[test]
fn test_scalar_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.unit()?;
    enc.bool(true)?;
    enc.bool(false)?;
    enc.u64(0)?;
    enc.u64(u64::MAX)?;
    enc.s64(i64::MIN)?;
    enc.s64(-1)?;
    enc.f64(PI)?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);

    dec.unit()?;
    assert_eq!(dec.bool()?, true);
    assert_eq!(dec.bool()?, false);
    assert_eq!(dec.u64()?, 0);
    assert_eq!(dec.u64()?, u64::MAX);
    assert_eq!(dec.s64()?, i64::MIN);
    assert_eq!(dec.s64()?, -1);
    assert_eq!(dec.f64()?, PI);
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[test]
fn test_strings() -> Result<()> {
    let mut enc = Encoder::new();
    enc.str("hello")?;
    enc.str("")?;
    enc.str("mèsh ✺")?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);

    assert_eq!(dec.str()?, "hello");
    assert_eq!(dec.str()?, "");
    assert_eq!(dec.str()?, "mèsh ✺");
    Ok(())
}

// ============================================================================
//  CONTAINERS
// ============================================================================

#[test]
fn test_list_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list_begin()?;
    enc.u64(1)?;
    enc.str("two")?;
    enc.list_begin()?;
    enc.bool(true)?;
    enc.list_end()?;
    enc.list_end()?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    let mut list = dec.list()?;

    assert_eq!(list.next()?.unwrap().u64()?, 1);
    assert_eq!(list.next()?.unwrap().str()?, "two");
    let mut nested = list.next()?.unwrap().list()?;
    assert_eq!(nested.next()?.unwrap().bool()?, true);
    assert!(nested.next()?.is_none());
    assert!(list.next()?.is_none());
    Ok(())
}

#[test]
fn test_empty_list() -> Result<()> {
    let mut enc = Encoder::new();
    enc.list_begin()?;
    enc.list_end()?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    let mut list = dec.list()?;
    assert!(list.next()?.is_none());
    Ok(())
}

#[test]
fn test_map_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.map_begin()?;
    enc.variant_begin("name")?;
    enc.str("camera-main")?;
    enc.variant_end()?;
    enc.variant_begin("users")?;
    enc.u64(3)?;
    enc.variant_end()?;
    enc.map_end()?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    let mut map = dec.map()?;

    let (key, mut val) = map.next()?.unwrap();
    assert_eq!(key, "name");
    assert_eq!(val.str()?, "camera-main");

    let (key, mut val) = map.next()?.unwrap();
    assert_eq!(key, "users");
    assert_eq!(val.u64()?, 3);

    assert!(map.next()?.is_none());
    Ok(())
}

#[test]
fn test_variant_roundtrip() -> Result<()> {
    let mut enc = Encoder::new();
    enc.variant_begin("reference")?;
    enc.list_begin()?;
    enc.str("Block:Prop")?;
    enc.str("prop.007")?;
    enc.list_end()?;
    enc.variant_end()?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    let (name, mut payload) = dec.variant()?;

    assert_eq!(name, "reference");
    let mut list = payload.list()?;
    assert_eq!(list.next()?.unwrap().str()?, "Block:Prop");
    assert_eq!(list.next()?.unwrap().str()?, "prop.007");
    Ok(())
}

// ============================================================================
//  SKIPPING
// ============================================================================

#[test]
fn test_skip_over_unknown_entries() -> Result<()> {
    let mut enc = Encoder::new();
    enc.map_begin()?;
    enc.variant_begin("future-field")?;
    enc.list_begin()?;
    enc.u64(9)?;
    enc.str("ignored")?;
    enc.list_end()?;
    enc.variant_end()?;
    enc.variant_begin("seq")?;
    enc.u64(42)?;
    enc.variant_end()?;
    enc.map_end()?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    let mut map = dec.map()?;

    let mut seq = None;
    while let Some((key, mut val)) = map.next()? {
        match key {
            "seq" => seq = Some(val.u64()?),
            _ => val.skip()?,
        }
    }
    assert_eq!(seq, Some(42));
    Ok(())
}

#[test]
fn test_skip_scalars() -> Result<()> {
    let mut enc = Encoder::new();
    enc.bool(true)?;
    enc.f64(1.5)?;
    enc.str("x")?;
    enc.u64(7)?;

    let bytes = enc.into_bytes()?;
    let mut dec = Decoder::new(&bytes);
    dec.skip()?;
    dec.skip()?;
    dec.skip()?;
    assert_eq!(dec.u64()?, 7);
    Ok(())
}

// ============================================================================
//  STRUCTURAL ERRORS
// ============================================================================

#[test]
fn test_open_scope_rejected() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert_eq!(enc.into_bytes().unwrap_err(), Error::ScopeStillOpen);
}

#[test]
fn test_scope_mismatch_rejected() {
    let mut enc = Encoder::new();
    enc.list_begin().unwrap();
    assert!(matches!(enc.map_end(), Err(Error::ScopeMismatch { .. })));
}

#[test]
fn test_underflow_rejected() {
    let mut enc = Encoder::new();
    assert_eq!(enc.list_end().unwrap_err(), Error::ScopeUnderflow);
}

#[test]
fn test_bare_map_entry_rejected() {
    let mut enc = Encoder::new();
    enc.map_begin().unwrap();
    assert_eq!(enc.u64(1).unwrap_err(), Error::BareMapEntry);
}

#[test]
fn test_variant_arity_enforced() {
    let mut enc = Encoder::new();
    enc.variant_begin("empty").unwrap();
    assert_eq!(enc.variant_end().unwrap_err(), Error::VariantArity);

    let mut enc = Encoder::new();
    enc.variant_begin("double").unwrap();
    enc.u64(1).unwrap();
    assert_eq!(enc.u64(2).unwrap_err(), Error::VariantArity);
}

// ============================================================================
//  MALFORMED INPUT
// ============================================================================

#[test]
fn test_invalid_tag_rejected() {
    let mut dec = Decoder::new(&[0xFF, 0x00]);
    assert_eq!(dec.peek_tag().unwrap_err(), Error::InvalidTag(0xFF));
}

#[test]
fn test_truncated_scalar_rejected() {
    // U64 tag with only four bytes of payload.
    let mut dec = Decoder::new(&[Tag::U64 as u8, 1, 2, 3, 4]);
    assert_eq!(dec.u64().unwrap_err(), Error::UnexpectedEnd);
}

#[test]
fn test_truncated_container_rejected() {
    // List claiming an 8-byte body with nothing behind it.
    let mut dec = Decoder::new(&[Tag::List as u8, 8, 0, 0, 0]);
    assert_eq!(dec.list().unwrap_err(), Error::UnexpectedEnd);
}

#[test]
fn test_invalid_utf8_rejected() {
    let mut dec = Decoder::new(&[Tag::Str as u8, 2, 0, 0, 0, 0xC3, 0x28]);
    assert_eq!(dec.str().unwrap_err(), Error::InvalidUtf8);
}

#[test]
fn test_wrong_tag_does_not_advance() {
    let mut enc = Encoder::new();
    enc.str("still here").unwrap();
    let bytes = enc.into_bytes().unwrap();

    let mut dec = Decoder::new(&bytes);
    assert!(dec.u64().is_err());
    assert_eq!(dec.str().unwrap(), "still here");
}
