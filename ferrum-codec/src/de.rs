//! Decoder

use std::convert::TryFrom;

use bytes::Bytes;
use ordered_float::OrderedFloat;

use crate::{
    described::{Described, Descriptor},
    error::Error,
    format_code::{EncodingCodes, Width},
    primitives::{Array, Dec128, Dec32, Dec64, OrderedMap, Symbol, Timestamp, Uuid},
    read::SliceReader,
    value::Value,
};

/// Deepest nesting of described and compound values the decoder follows
pub const MAX_NESTING_DEPTH: usize = 128;

/// Decode one value from the front of the slice
///
/// Returns the value, the encoding code of its outermost constructor and the number of
/// bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(Value, EncodingCodes, usize), Error> {
    let mut reader = SliceReader::new(bytes);
    let (value, code) = read_value(&mut reader, 0)?;
    Ok((value, code, reader.position()))
}

/// Decode one value from the front of the slice, ignoring trailing bytes
pub fn from_slice(bytes: &[u8]) -> Result<Value, Error> {
    decode(bytes).map(|(value, _, _)| value)
}

/// Number of bytes taken by the value at the front of the slice, without decoding it
pub fn value_len(bytes: &[u8]) -> Result<usize, Error> {
    let mut reader = SliceReader::new(bytes);
    skip_value(&mut reader, 0)?;
    Ok(reader.position())
}

fn enter(depth: usize) -> Result<usize, Error> {
    if depth >= MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
    }
    Ok(depth + 1)
}

fn skip_value(reader: &mut SliceReader<'_>, depth: usize) -> Result<(), Error> {
    let code = EncodingCodes::try_from(reader.next()?)?;
    if code == EncodingCodes::DescribedType {
        let depth = enter(depth)?;
        skip_value(reader, depth)?;
        return skip_value(reader, depth);
    }
    skip_body(code, reader)
}

fn skip_body(code: EncodingCodes, reader: &mut SliceReader<'_>) -> Result<(), Error> {
    match code.width() {
        Width::Fixed(n) => reader.read_bytes(n).map(|_| ()),
        Width::Variable8 => {
            let len = reader.read_len(false)?;
            reader.read_bytes(len).map(|_| ())
        }
        Width::Variable32 => {
            let len = reader.read_len(true)?;
            reader.read_bytes(len).map(|_| ())
        }
    }
}

fn read_value(
    reader: &mut SliceReader<'_>,
    depth: usize,
) -> Result<(Value, EncodingCodes), Error> {
    let code = EncodingCodes::try_from(reader.next()?)?;
    let value = match code {
        EncodingCodes::DescribedType => {
            let depth = enter(depth)?;
            let descriptor = read_descriptor(reader, depth)?;
            let (value, _) = read_value(reader, depth)?;
            Value::Described(Box::new(Described { descriptor, value }))
        }
        _ => read_body(code, reader, depth)?,
    };
    Ok((value, code))
}

fn read_descriptor(reader: &mut SliceReader<'_>, depth: usize) -> Result<Descriptor, Error> {
    match read_value(reader, depth)? {
        (Value::ULong(code), _) => Ok(Descriptor::Code(code)),
        (Value::Symbol(name), _) => Ok(Descriptor::Name(name)),
        _ => Err(Error::InvalidDescriptor),
    }
}

/// Read the payload that follows a non-described constructor
fn read_body(code: EncodingCodes, reader: &mut SliceReader<'_>, depth: usize) -> Result<Value, Error> {
    use EncodingCodes as C;
    let value = match code {
        C::DescribedType => return Err(Error::InvalidFormatCode(code as u8)),
        C::Null => Value::Null,
        C::Boolean => match reader.next()? {
            0x00 => Value::Bool(false),
            0x01 => Value::Bool(true),
            _ => return Err(Error::InvalidValue),
        },
        C::BooleanTrue => Value::Bool(true),
        C::BooleanFalse => Value::Bool(false),
        C::UByte => Value::UByte(reader.next()?),
        C::UShort => Value::UShort(u16::from_be_bytes(reader.read_const_bytes()?)),
        C::UInt => Value::UInt(u32::from_be_bytes(reader.read_const_bytes()?)),
        C::SmallUint => Value::UInt(reader.next()? as u32),
        C::Uint0 => Value::UInt(0),
        C::ULong => Value::ULong(u64::from_be_bytes(reader.read_const_bytes()?)),
        C::SmallUlong => Value::ULong(reader.next()? as u64),
        C::Ulong0 => Value::ULong(0),
        C::Byte => Value::Byte(reader.next()? as i8),
        C::Short => Value::Short(i16::from_be_bytes(reader.read_const_bytes()?)),
        C::Int => Value::Int(i32::from_be_bytes(reader.read_const_bytes()?)),
        C::SmallInt => Value::Int(reader.next()? as i8 as i32),
        C::Long => Value::Long(i64::from_be_bytes(reader.read_const_bytes()?)),
        C::SmallLong => Value::Long(reader.next()? as i8 as i64),
        C::Float => Value::Float(OrderedFloat(f32::from_be_bytes(reader.read_const_bytes()?))),
        C::Double => Value::Double(OrderedFloat(f64::from_be_bytes(reader.read_const_bytes()?))),
        C::Decimal32 => Value::Decimal32(Dec32(reader.read_const_bytes()?)),
        C::Decimal64 => Value::Decimal64(Dec64(reader.read_const_bytes()?)),
        C::Decimal128 => Value::Decimal128(Dec128(reader.read_const_bytes()?)),
        C::Char => {
            let n = u32::from_be_bytes(reader.read_const_bytes()?);
            Value::Char(char::from_u32(n).ok_or(Error::InvalidValue)?)
        }
        C::Timestamp => Value::Timestamp(Timestamp::from_milliseconds(i64::from_be_bytes(
            reader.read_const_bytes()?,
        ))),
        C::Uuid => Value::Uuid(Uuid::from(reader.read_const_bytes::<16>()?)),
        C::VBin8 | C::VBin32 => {
            let bytes = read_variable(code, reader)?;
            Value::Binary(Bytes::copy_from_slice(bytes))
        }
        C::Str8 | C::Str32 => {
            let bytes = read_variable(code, reader)?;
            Value::String(std::str::from_utf8(bytes)?.to_string())
        }
        C::Sym8 | C::Sym32 => {
            let bytes = read_variable(code, reader)?;
            let s = std::str::from_utf8(bytes).map_err(|_| Error::InvalidSymbol)?;
            Value::Symbol(Symbol::try_new(s)?)
        }
        C::List0 => Value::List(Vec::new()),
        C::List8 | C::List32 => {
            let four = code == C::List32;
            let depth = enter(depth)?;
            with_compound(four, reader, |count, body| {
                let mut items = Vec::with_capacity(count.min(body.remaining()));
                for _ in 0..count {
                    items.push(read_value(body, depth)?.0);
                }
                Ok(Value::List(items))
            })?
        }
        C::Map8 | C::Map32 => {
            let four = code == C::Map32;
            let depth = enter(depth)?;
            with_compound(four, reader, |count, body| {
                if count % 2 != 0 {
                    return Err(Error::InvalidLength);
                }
                let mut map = OrderedMap::new();
                for _ in 0..count / 2 {
                    let (key, _) = read_value(body, depth)?;
                    let (value, _) = read_value(body, depth)?;
                    if map.insert(key, value).is_some() {
                        return Err(Error::DuplicateMapKey);
                    }
                }
                Ok(Value::Map(map))
            })?
        }
        C::Array8 | C::Array32 => {
            let four = code == C::Array32;
            let depth = enter(depth)?;
            with_compound(four, reader, |count, body| {
                read_array_elements(count, body, depth).map(|elements| Value::Array(Array(elements)))
            })?
        }
    };
    Ok(value)
}

fn read_variable<'s>(code: EncodingCodes, reader: &mut SliceReader<'s>) -> Result<&'s [u8], Error> {
    let len = reader.read_len(code.width() == Width::Variable32)?;
    reader.read_bytes(len)
}

/// Split off the declared size of a compound value and decode its elements from exactly
/// that many bytes
fn with_compound<'s, F>(four: bool, reader: &mut SliceReader<'s>, f: F) -> Result<Value, Error>
where
    F: FnOnce(usize, &mut SliceReader<'s>) -> Result<Value, Error>,
{
    let size = reader.read_len(four)?;
    let slice = reader.read_bytes(size)?;
    let mut body = SliceReader::new(slice);
    let count = body.read_len(four).map_err(|_| Error::InvalidLength)?;
    let value = f(count, &mut body).map_err(|err| match err {
        Error::UnexpectedEof => Error::LengthMismatch {
            declared: size,
            consumed: body.position(),
        },
        err => err,
    })?;
    if body.remaining() != 0 {
        return Err(Error::LengthMismatch {
            declared: size,
            consumed: body.position(),
        });
    }
    Ok(value)
}

fn read_array_elements(
    count: usize,
    body: &mut SliceReader<'_>,
    depth: usize,
) -> Result<Vec<Value>, Error> {
    let code = EncodingCodes::try_from(body.next()?)?;
    match code {
        EncodingCodes::DescribedType => {
            let depth = enter(depth)?;
            let descriptor = read_descriptor(body, depth)?;
            let inner = read_array_elements(count, body, depth)?;
            Ok(inner
                .into_iter()
                .map(|value| {
                    Value::Described(Box::new(Described {
                        descriptor: descriptor.clone(),
                        value,
                    }))
                })
                .collect())
        }
        _ => {
            check_element_count(code, count, body.remaining())?;
            let mut elements = Vec::with_capacity(count.min(body.remaining()));
            for _ in 0..count {
                elements.push(read_body(code, body, depth)?);
            }
            Ok(elements)
        }
    }
}

/// The element payloads must be able to fill the bytes left after the constructor
fn check_element_count(code: EncodingCodes, count: usize, remaining: usize) -> Result<(), Error> {
    match code.width() {
        Width::Fixed(0) if count > 0 => Err(Error::InvalidLength),
        Width::Fixed(0) => Ok(()),
        Width::Fixed(n) => match count.checked_mul(n) {
            Some(len) if len == remaining => Ok(()),
            len => Err(Error::LengthMismatch {
                declared: len.unwrap_or(usize::MAX),
                consumed: remaining,
            }),
        },
        Width::Variable8 if count > remaining => Err(Error::InvalidLength),
        Width::Variable32 if count > remaining / 4 => Err(Error::InvalidLength),
        Width::Variable8 | Width::Variable32 => Ok(()),
    }
}
