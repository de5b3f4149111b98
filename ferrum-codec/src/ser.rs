//! Encoder
//!
//! Values are written with the smallest encoding that fits unless a code is requested with
//! [`encode_as`]. Compound values are written as constructor, size, count and then the
//! concatenated encodings of their elements.

use std::mem::discriminant;

use bytes::{BufMut, BytesMut};

use crate::{
    described::Descriptor,
    error::Error,
    format_code::EncodingCodes,
    primitives::{Array, OrderedMap},
    value::Value,
};

/// Serialize a value into a new vector with the compact encoding
pub fn to_vec(value: &Value) -> Result<Vec<u8>, Error> {
    let mut buf = BytesMut::new();
    encode(value, &mut buf)?;
    Ok(buf.to_vec())
}

/// Append the compact encoding of a value to the buffer
pub fn encode(value: &Value, buf: &mut BytesMut) -> Result<(), Error> {
    match value {
        Value::Described(described) => {
            buf.put_u8(EncodingCodes::DescribedType as u8);
            encode(&descriptor_value(&described.descriptor), buf)?;
            encode(&described.value, buf)
        }
        Value::List(items) => encode_list(items, None, buf),
        Value::Map(map) => encode_map(map, None, buf),
        Value::Array(array) => encode_array(array, None, buf),
        _ => {
            let code = scalar_code(value)?;
            buf.put_u8(code as u8);
            write_scalar(value, code, buf)
        }
    }
}

/// Append the encoding of a value using the given encoding code
///
/// Fails with [`Error::EncodingMismatch`] if the code belongs to another type or cannot hold
/// the value, eg. `SmallUint` for `UInt(256)`.
pub fn encode_as(value: &Value, code: EncodingCodes, buf: &mut BytesMut) -> Result<(), Error> {
    use EncodingCodes::*;
    match (value, code) {
        (Value::Described(_), DescribedType) => encode(value, buf),
        (Value::List(items), List0 | List8 | List32) => encode_list(items, Some(code), buf),
        (Value::Map(map), Map8 | Map32) => encode_map(map, Some(code), buf),
        (Value::Array(array), Array8 | Array32) => encode_array(array, Some(code), buf),
        (Value::Described(_) | Value::List(_) | Value::Map(_) | Value::Array(_), _) => {
            Err(Error::EncodingMismatch { code })
        }
        _ => {
            let mut body = BytesMut::new();
            write_scalar(value, code, &mut body)?;
            buf.put_u8(code as u8);
            buf.put_slice(&body);
            Ok(())
        }
    }
}

/// The code chosen by [`encode`] for a value
pub(crate) fn compact_code(value: &Value) -> EncodingCodes {
    match value {
        Value::Described(_) => EncodingCodes::DescribedType,
        Value::List(_) | Value::Map(_) | Value::Array(_) => {
            let mut buf = BytesMut::new();
            let fallback = match value {
                Value::List(_) => EncodingCodes::List32,
                Value::Map(_) => EncodingCodes::Map32,
                _ => EncodingCodes::Array32,
            };
            match encode(value, &mut buf) {
                Ok(()) => buf
                    .first()
                    .and_then(|b| EncodingCodes::try_from(*b).ok())
                    .unwrap_or(fallback),
                Err(_) => fallback,
            }
        }
        _ => scalar_code(value).unwrap_or(EncodingCodes::Null),
    }
}

pub(crate) fn descriptor_value(descriptor: &Descriptor) -> Value {
    match descriptor {
        Descriptor::Name(name) => Value::Symbol(name.clone()),
        Descriptor::Code(code) => Value::ULong(*code),
    }
}

fn scalar_code(value: &Value) -> Result<EncodingCodes, Error> {
    use EncodingCodes::*;
    let code = match value {
        Value::Null => Null,
        Value::Bool(true) => BooleanTrue,
        Value::Bool(false) => BooleanFalse,
        Value::UByte(_) => UByte,
        Value::UShort(_) => UShort,
        Value::UInt(0) => Uint0,
        Value::UInt(n) if *n <= u8::MAX as u32 => SmallUint,
        Value::UInt(_) => UInt,
        Value::ULong(0) => Ulong0,
        Value::ULong(n) if *n <= u8::MAX as u64 => SmallUlong,
        Value::ULong(_) => ULong,
        Value::Byte(_) => Byte,
        Value::Short(_) => Short,
        Value::Int(n) if i8::try_from(*n).is_ok() => SmallInt,
        Value::Int(_) => Int,
        Value::Long(n) if i8::try_from(*n).is_ok() => SmallLong,
        Value::Long(_) => Long,
        Value::Float(_) => Float,
        Value::Double(_) => Double,
        Value::Decimal32(_) => Decimal32,
        Value::Decimal64(_) => Decimal64,
        Value::Decimal128(_) => Decimal128,
        Value::Char(_) => Char,
        Value::Timestamp(_) => Timestamp,
        Value::Uuid(_) => Uuid,
        Value::Binary(b) => variable_code(b.len(), VBin8, VBin32)?,
        Value::String(s) => variable_code(s.len(), Str8, Str32)?,
        Value::Symbol(s) => variable_code(s.len(), Sym8, Sym32)?,
        Value::Described(_) | Value::List(_) | Value::Map(_) | Value::Array(_) => {
            return Err(Error::InvalidValue)
        }
    };
    Ok(code)
}

fn variable_code(
    len: usize,
    small: EncodingCodes,
    large: EncodingCodes,
) -> Result<EncodingCodes, Error> {
    if len <= u8::MAX as usize {
        Ok(small)
    } else if len <= u32::MAX as usize {
        Ok(large)
    } else {
        Err(Error::TooLong)
    }
}

/// Write the payload of a scalar without its constructor
fn write_scalar(value: &Value, code: EncodingCodes, buf: &mut BytesMut) -> Result<(), Error> {
    use EncodingCodes as C;
    match (value, code) {
        (Value::Null, C::Null) => {}
        (Value::Bool(b), C::Boolean) => buf.put_u8(*b as u8),
        (Value::Bool(true), C::BooleanTrue) | (Value::Bool(false), C::BooleanFalse) => {}
        (Value::UByte(n), C::UByte) => buf.put_u8(*n),
        (Value::UShort(n), C::UShort) => buf.put_u16(*n),
        (Value::UInt(n), C::UInt) => buf.put_u32(*n),
        (Value::UInt(n), C::SmallUint) if *n <= u8::MAX as u32 => buf.put_u8(*n as u8),
        (Value::UInt(0), C::Uint0) => {}
        (Value::ULong(n), C::ULong) => buf.put_u64(*n),
        (Value::ULong(n), C::SmallUlong) if *n <= u8::MAX as u64 => buf.put_u8(*n as u8),
        (Value::ULong(0), C::Ulong0) => {}
        (Value::Byte(n), C::Byte) => buf.put_i8(*n),
        (Value::Short(n), C::Short) => buf.put_i16(*n),
        (Value::Int(n), C::Int) => buf.put_i32(*n),
        (Value::Int(n), C::SmallInt) if i8::try_from(*n).is_ok() => buf.put_i8(*n as i8),
        (Value::Long(n), C::Long) => buf.put_i64(*n),
        (Value::Long(n), C::SmallLong) if i8::try_from(*n).is_ok() => buf.put_i8(*n as i8),
        (Value::Float(n), C::Float) => buf.put_f32(n.into_inner()),
        (Value::Double(n), C::Double) => buf.put_f64(n.into_inner()),
        (Value::Decimal32(d), C::Decimal32) => buf.put_slice(&d.0),
        (Value::Decimal64(d), C::Decimal64) => buf.put_slice(&d.0),
        (Value::Decimal128(d), C::Decimal128) => buf.put_slice(&d.0),
        (Value::Char(c), C::Char) => buf.put_u32(*c as u32),
        (Value::Timestamp(t), C::Timestamp) => buf.put_i64(t.milliseconds()),
        (Value::Uuid(u), C::Uuid) => buf.put_slice(u.as_bytes()),
        (Value::Binary(b), C::VBin8 | C::VBin32) => write_variable(b, code, buf)?,
        (Value::String(s), C::Str8 | C::Str32) => write_variable(s.as_bytes(), code, buf)?,
        (Value::Symbol(s), C::Sym8 | C::Sym32) => write_variable(s.as_bytes(), code, buf)?,
        _ => return Err(Error::EncodingMismatch { code }),
    }
    Ok(())
}

fn write_variable(bytes: &[u8], code: EncodingCodes, buf: &mut BytesMut) -> Result<(), Error> {
    match code {
        EncodingCodes::VBin8 | EncodingCodes::Str8 | EncodingCodes::Sym8 => {
            let len = u8::try_from(bytes.len()).map_err(|_| Error::EncodingMismatch { code })?;
            buf.put_u8(len);
        }
        _ => {
            let len = u32::try_from(bytes.len()).map_err(|_| Error::TooLong)?;
            buf.put_u32(len);
        }
    }
    buf.put_slice(bytes);
    Ok(())
}

fn encode_list(
    items: &[Value],
    forced: Option<EncodingCodes>,
    buf: &mut BytesMut,
) -> Result<(), Error> {
    match (items.is_empty(), forced) {
        (true, None | Some(EncodingCodes::List0)) => {
            buf.put_u8(EncodingCodes::List0 as u8);
            return Ok(());
        }
        (false, Some(EncodingCodes::List0)) => {
            return Err(Error::EncodingMismatch {
                code: EncodingCodes::List0,
            })
        }
        _ => {}
    }
    let (count, body) = list_parts(items)?;
    let code = compound_code(count, body.len(), EncodingCodes::List8, EncodingCodes::List32, forced)?;
    buf.put_u8(code as u8);
    write_compound_header(code, count, body.len(), buf)?;
    buf.put_slice(&body);
    Ok(())
}

fn encode_map(
    map: &OrderedMap<Value, Value>,
    forced: Option<EncodingCodes>,
    buf: &mut BytesMut,
) -> Result<(), Error> {
    let (count, body) = map_parts(map)?;
    let code = compound_code(count, body.len(), EncodingCodes::Map8, EncodingCodes::Map32, forced)?;
    buf.put_u8(code as u8);
    write_compound_header(code, count, body.len(), buf)?;
    buf.put_slice(&body);
    Ok(())
}

fn encode_array(
    array: &Array,
    forced: Option<EncodingCodes>,
    buf: &mut BytesMut,
) -> Result<(), Error> {
    let (count, body) = array_parts(array)?;
    let code = compound_code(
        count,
        body.len(),
        EncodingCodes::Array8,
        EncodingCodes::Array32,
        forced,
    )?;
    buf.put_u8(code as u8);
    write_compound_header(code, count, body.len(), buf)?;
    buf.put_slice(&body);
    Ok(())
}

fn list_parts(items: &[Value]) -> Result<(usize, BytesMut), Error> {
    let mut body = BytesMut::new();
    for item in items {
        encode(item, &mut body)?;
    }
    Ok((items.len(), body))
}

fn map_parts(map: &OrderedMap<Value, Value>) -> Result<(usize, BytesMut), Error> {
    let mut body = BytesMut::new();
    for (key, value) in map {
        encode(key, &mut body)?;
        encode(value, &mut body)?;
    }
    Ok((map.len() * 2, body))
}

fn array_parts(array: &Array) -> Result<(usize, BytesMut), Error> {
    let mut body = BytesMut::new();
    let elements: Vec<&Value> = array.iter().collect();
    write_array_elements(&elements, &mut body)?;
    Ok((elements.len(), body))
}

fn fits_small(count: usize, body_len: usize) -> bool {
    count <= u8::MAX as usize && body_len < u8::MAX as usize
}

fn compound_code(
    count: usize,
    body_len: usize,
    small: EncodingCodes,
    large: EncodingCodes,
    forced: Option<EncodingCodes>,
) -> Result<EncodingCodes, Error> {
    match forced {
        None if fits_small(count, body_len) => Ok(small),
        None => Ok(large),
        Some(code) if code == small && fits_small(count, body_len) => Ok(small),
        Some(code) if code == large => Ok(large),
        Some(code) => Err(Error::EncodingMismatch { code }),
    }
}

/// Write size and count of a compound value. The size covers the count field and the body.
fn write_compound_header(
    code: EncodingCodes,
    count: usize,
    body_len: usize,
    buf: &mut BytesMut,
) -> Result<(), Error> {
    use EncodingCodes::*;
    match code {
        List0 => {}
        List8 | Map8 | Array8 => {
            buf.put_u8((body_len + 1) as u8);
            buf.put_u8(count as u8);
        }
        _ => {
            let size = u32::try_from(body_len + 4).map_err(|_| Error::TooLong)?;
            let count = u32::try_from(count).map_err(|_| Error::TooLong)?;
            buf.put_u32(size);
            buf.put_u32(count);
        }
    }
    Ok(())
}

/// Write the shared element constructor followed by the element payloads
fn write_array_elements(elements: &[&Value], buf: &mut BytesMut) -> Result<(), Error> {
    let first = match elements.first() {
        Some(first) => *first,
        None => {
            buf.put_u8(EncodingCodes::Null as u8);
            return Ok(());
        }
    };
    let kind = discriminant(first);
    if elements.iter().any(|e| discriminant(*e) != kind) {
        return Err(Error::NotHomogeneous);
    }

    match first {
        Value::Described(described) => {
            let mut inner = Vec::with_capacity(elements.len());
            for element in elements {
                match element {
                    Value::Described(d) if d.descriptor == described.descriptor => {
                        inner.push(&d.value)
                    }
                    _ => return Err(Error::NotHomogeneous),
                }
            }
            buf.put_u8(EncodingCodes::DescribedType as u8);
            encode(&descriptor_value(&described.descriptor), buf)?;
            write_array_elements(&inner, buf)
        }
        Value::List(_) | Value::Map(_) | Value::Array(_) => {
            let parts = elements
                .iter()
                .map(|e| match e {
                    Value::List(items) => list_parts(items),
                    Value::Map(map) => map_parts(map),
                    Value::Array(array) => array_parts(array),
                    _ => Err(Error::NotHomogeneous),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let all_small = parts.iter().all(|(count, body)| fits_small(*count, body.len()));
            let code = match first {
                Value::List(_) if all_small => EncodingCodes::List8,
                Value::List(_) => EncodingCodes::List32,
                Value::Map(_) if all_small => EncodingCodes::Map8,
                Value::Map(_) => EncodingCodes::Map32,
                _ if all_small => EncodingCodes::Array8,
                _ => EncodingCodes::Array32,
            };
            buf.put_u8(code as u8);
            for (count, body) in parts {
                write_compound_header(code, count, body.len(), buf)?;
                buf.put_slice(&body);
            }
            Ok(())
        }
        _ => {
            let code = array_scalar_code(elements)?;
            buf.put_u8(code as u8);
            for element in elements {
                write_scalar(element, code, buf)?;
            }
            Ok(())
        }
    }
}

/// Pick the one constructor that can hold every scalar element
fn array_scalar_code(elements: &[&Value]) -> Result<EncodingCodes, Error> {
    use EncodingCodes::*;

    fn longest(elements: &[&Value]) -> usize {
        elements
            .iter()
            .map(|e| match e {
                Value::Binary(b) => b.len(),
                Value::String(s) => s.len(),
                Value::Symbol(s) => s.len(),
                _ => 0,
            })
            .max()
            .unwrap_or(0)
    }

    let code = match elements[0] {
        Value::Bool(_) => Boolean,
        Value::UInt(_) => {
            let max = elements.iter().filter_map(|e| e.as_uint()).max().unwrap_or(0);
            match max {
                n if n <= u8::MAX as u32 => SmallUint,
                _ => UInt,
            }
        }
        Value::ULong(_) => {
            let max = elements.iter().filter_map(|e| e.as_ulong()).max().unwrap_or(0);
            match max {
                n if n <= u8::MAX as u64 => SmallUlong,
                _ => ULong,
            }
        }
        Value::Int(_) => {
            let small = elements.iter().all(|e| match e {
                Value::Int(n) => i8::try_from(*n).is_ok(),
                _ => false,
            });
            if small {
                SmallInt
            } else {
                Int
            }
        }
        Value::Long(_) => {
            let small = elements.iter().all(|e| match e {
                Value::Long(n) => i8::try_from(*n).is_ok(),
                _ => false,
            });
            if small {
                SmallLong
            } else {
                Long
            }
        }
        Value::Binary(_) => variable_code(longest(elements), VBin8, VBin32)?,
        Value::String(_) => variable_code(longest(elements), Str8, Str32)?,
        Value::Symbol(_) => variable_code(longest(elements), Sym8, Sym32)?,
        // a zero-width element constructor cannot carry a count
        Value::Null => return Err(Error::EncodingMismatch { code: Null }),
        other => scalar_code(other)?,
    };
    Ok(code)
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::{encode_as, to_vec};
    use crate::{
        described::Descriptor,
        format_code::EncodingCodes,
        primitives::{Array, Binary, Symbol},
        value::Value,
        Error,
    };

    #[test]
    fn serialize_compact_uint() {
        assert_eq!(to_vec(&Value::UInt(0)).unwrap(), [0x43]);
        assert_eq!(to_vec(&Value::UInt(5)).unwrap(), [0x52, 0x05]);
        assert_eq!(to_vec(&Value::UInt(1000)).unwrap(), [0x70, 0x00, 0x00, 0x03, 0xe8]);
    }

    #[test]
    fn serialize_bool() {
        assert_eq!(to_vec(&Value::Bool(true)).unwrap(), [0x41]);
        assert_eq!(to_vec(&Value::Bool(false)).unwrap(), [0x42]);

        let mut buf = BytesMut::new();
        encode_as(&Value::Bool(true), EncodingCodes::Boolean, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x56, 0x01]);
    }

    #[test]
    fn serialize_str_falls_back_to_str32() {
        let short = to_vec(&Value::from("1234")).unwrap();
        assert_eq!(short, [0xa1, 0x04, b'1', b'2', b'3', b'4']);

        let long = to_vec(&Value::from("a".repeat(300))).unwrap();
        assert_eq!(&long[..5], &[0xb1, 0x00, 0x00, 0x01, 0x2c]);
        assert_eq!(long.len(), 5 + 300);
    }

    #[test]
    fn encode_as_rejects_values_that_do_not_fit() {
        let mut buf = BytesMut::new();
        let err = encode_as(&Value::UInt(256), EncodingCodes::SmallUint, &mut buf).unwrap_err();
        assert_eq!(
            err,
            Error::EncodingMismatch {
                code: EncodingCodes::SmallUint
            }
        );
        assert!(encode_as(&Value::UInt(1), EncodingCodes::Str8, &mut buf).is_err());
        assert!(buf.is_empty());

        encode_as(&Value::UInt(1), EncodingCodes::UInt, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0x70, 0, 0, 0, 1]);
    }

    #[test]
    fn serialize_list() {
        assert_eq!(to_vec(&Value::List(vec![])).unwrap(), [0x45]);

        let list = Value::List(vec![Value::Null, Value::UInt(0), Value::Bool(true)]);
        assert_eq!(to_vec(&list).unwrap(), [0xc0, 0x04, 0x03, 0x40, 0x43, 0x41]);

        let mut buf = BytesMut::new();
        encode_as(&list, EncodingCodes::List32, &mut buf).unwrap();
        assert_eq!(
            &buf[..],
            &[0xd0, 0, 0, 0, 7, 0, 0, 0, 3, 0x40, 0x43, 0x41]
        );
    }

    #[test]
    fn serialize_map() {
        let map = [(Value::from(Symbol::from("a")), Value::UByte(1))]
            .into_iter()
            .collect();
        let buf = to_vec(&Value::Map(map)).unwrap();
        assert_eq!(buf, [0xc1, 0x06, 0x02, 0xa3, 0x01, b'a', 0x50, 0x01]);
    }

    #[test]
    fn serialize_array_shares_constructor() {
        let array = Array::from(vec![Value::UInt(1), Value::UInt(300)]);
        let buf = to_vec(&Value::Array(array)).unwrap();
        assert_eq!(
            buf,
            [0xe0, 0x0a, 0x02, 0x70, 0, 0, 0, 1, 0, 0, 0x01, 0x2c]
        );

        let symbols = Array::from(vec![
            Value::Symbol(Symbol::from("ab")),
            Value::Symbol(Symbol::from("c")),
        ]);
        let buf = to_vec(&Value::Array(symbols)).unwrap();
        assert_eq!(buf, [0xe0, 0x07, 0x02, 0xa3, 0x02, b'a', b'b', 0x01, b'c']);
    }

    #[test]
    fn serialize_array_of_described() {
        let element = |n: u32| Value::described(Descriptor::code(0x24), Value::UInt(n));
        let array = Array::from(vec![element(1), element(2)]);
        let buf = to_vec(&Value::Array(array)).unwrap();
        assert_eq!(buf, [0xe0, 0x07, 0x02, 0x00, 0x53, 0x24, 0x52, 0x01, 0x02]);
    }

    #[test]
    fn serialize_heterogeneous_array_fails() {
        let array = Array::from(vec![Value::UInt(1), Value::from("x")]);
        assert_eq!(to_vec(&Value::Array(array)), Err(Error::NotHomogeneous));
    }

    #[test]
    fn array_elements_always_carry_a_payload() {
        let zeros = Array::from(vec![Value::UInt(0), Value::UInt(0)]);
        let buf = to_vec(&Value::Array(zeros)).unwrap();
        assert_eq!(buf, [0xe0, 0x04, 0x02, 0x52, 0x00, 0x00]);

        let empties = Array::from(vec![Value::List(vec![])]);
        let buf = to_vec(&Value::Array(empties)).unwrap();
        assert_eq!(buf, [0xe0, 0x04, 0x01, 0xc0, 0x01, 0x00]);

        let nulls = Array::from(vec![Value::Null, Value::Null]);
        assert_eq!(
            to_vec(&Value::Array(nulls)),
            Err(Error::EncodingMismatch {
                code: EncodingCodes::Null
            })
        );
    }

    #[test]
    fn serialize_described() {
        let value = Value::described(Descriptor::code(0x24), Value::List(vec![]));
        assert_eq!(to_vec(&value).unwrap(), [0x00, 0x53, 0x24, 0x45]);

        let value = Value::described(Descriptor::name("x:y"), Value::Null);
        assert_eq!(
            to_vec(&value).unwrap(),
            [0x00, 0xa3, 0x03, b'x', b':', b'y', 0x40]
        );
    }

    #[test]
    fn serialize_binary() {
        let value = Value::Binary(Binary::from_static(&[1, 2, 3]));
        assert_eq!(to_vec(&value).unwrap(), [0xa0, 0x03, 1, 2, 3]);
    }
}
