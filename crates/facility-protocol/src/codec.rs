//! Schema-less binary marshalling.
//!
//! Payloads are described by a [`Shape`] and carried as a [`Value`]. The
//! encoding never transmits field names or type tags: both sides must agree
//! on the shape, and field order inside a [`Shape::Record`] is the whole
//! contract.
//!
//! ```text
//! i16            2 bytes BE
//! i32 / f32      4 bytes BE (floats as IEEE-754 bits)
//! i64 / f64      8 bytes BE
//! bool           1 byte, 0 or 1
//! string         u32 byte length BE, UTF-8 bytes
//! optional<T>    presence byte (0 = absent, 1 = present), then T if present
//! list<T>        u32 element count BE, then each element
//! record(..)     fields back to back, in declared order
//! ```
//!
//! Rust types opt in through [`Marshal`]. Structs declare their field order
//! with [`wire_record!`](crate::wire_record), which generates the struct and
//! its shape from one declaration.

use std::fmt;

use crate::MAX_DATAGRAM_SIZE;
use crate::error::{ProtocolError, ProtocolResult};

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

/// Layout of an encoded value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Str,
    /// Nullable form of the inner shape, preceded by a presence byte.
    Optional(Box<Shape>),
    /// Count-prefixed sequence.
    List(Box<Shape>),
    /// Fixed sequence of fields.
    Record(Vec<Shape>),
}

impl Shape {
    pub fn optional(inner: Shape) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(element: Shape) -> Self {
        Self::List(Box::new(element))
    }

    /// Smallest number of bytes any value of this shape encodes to.
    pub fn min_width(&self) -> usize {
        match self {
            Self::I16 => 2,
            Self::I32 | Self::F32 | Self::Str | Self::List(_) => 4,
            Self::I64 | Self::F64 => 8,
            Self::Bool | Self::Optional(_) => 1,
            Self::Record(fields) => fields.iter().map(Shape::min_width).sum(),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I16 => f.write_str("i16"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::F32 => f.write_str("f32"),
            Self::F64 => f.write_str("f64"),
            Self::Bool => f.write_str("bool"),
            Self::Str => f.write_str("string"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Record(fields) => {
                f.write_str("record(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A decoded value, structurally matching some [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Str(String),
    Optional(Option<Box<Value>>),
    List(Vec<Value>),
    Record(Vec<Value>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Bool(_) => "bool",
            Self::Str(_) => "string",
            Self::Optional(_) => "optional",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Unwraps a record with exactly `arity` fields.
    pub fn into_record(self, arity: usize) -> ProtocolResult<std::vec::IntoIter<Value>> {
        match self {
            Self::Record(fields) if fields.len() == arity => Ok(fields.into_iter()),
            Self::Record(fields) => Err(ProtocolError::mismatch(
                format!("record of {arity} fields"),
                format!("record of {} fields", fields.len()),
            )),
            other => Err(ProtocolError::mismatch("record", other.kind())),
        }
    }
}

/// Encodes `value` as `shape` into a fresh buffer.
pub fn encode(shape: &Shape, value: &Value) -> ProtocolResult<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.write(shape, value)?;
    encoder.finish()
}

/// Decodes exactly one value of `shape` from `bytes`.
///
/// Fails if the input is short or has bytes left over.
pub fn decode(bytes: &[u8], shape: &Shape) -> ProtocolResult<Value> {
    let mut decoder = Decoder::new(bytes);
    let value = decoder.read(shape)?;
    decoder.finish()?;
    Ok(value)
}

/// Appends values to a datagram buffer.
#[derive(Debug, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` encoded as `shape`.
    pub fn write(&mut self, shape: &Shape, value: &Value) -> ProtocolResult<()> {
        match (shape, value) {
            (Shape::I16, Value::I16(v)) => self.buffer.extend_from_slice(&v.to_be_bytes()),
            (Shape::I32, Value::I32(v)) => self.buffer.extend_from_slice(&v.to_be_bytes()),
            (Shape::I64, Value::I64(v)) => self.buffer.extend_from_slice(&v.to_be_bytes()),
            (Shape::F32, Value::F32(v)) => {
                self.buffer.extend_from_slice(&v.to_bits().to_be_bytes())
            }
            (Shape::F64, Value::F64(v)) => {
                self.buffer.extend_from_slice(&v.to_bits().to_be_bytes())
            }
            (Shape::Bool, Value::Bool(v)) => self.buffer.push(u8::from(*v)),
            (Shape::Str, Value::Str(s)) => {
                self.write_len(s.len())?;
                self.buffer.extend_from_slice(s.as_bytes());
            }
            (Shape::Optional(_), Value::Optional(None)) => self.buffer.push(ABSENT),
            (Shape::Optional(inner), Value::Optional(Some(v))) => {
                self.buffer.push(PRESENT);
                self.write(inner, v)?;
            }
            (Shape::List(element), Value::List(items)) => {
                self.write_len(items.len())?;
                for item in items {
                    self.write(element, item)?;
                }
            }
            (Shape::Record(fields), Value::Record(values)) if fields.len() == values.len() => {
                for (field, value) in fields.iter().zip(values) {
                    self.write(field, value)?;
                }
            }
            (shape, value) => return Err(ProtocolError::mismatch(shape, value.kind())),
        }
        Ok(())
    }

    /// Returns the buffer, failing if it exceeds one datagram.
    pub fn finish(self) -> ProtocolResult<Vec<u8>> {
        if self.buffer.len() > MAX_DATAGRAM_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: self.buffer.len(),
                max: MAX_DATAGRAM_SIZE,
            });
        }
        Ok(self.buffer)
    }

    fn write_len(&mut self, len: usize) -> ProtocolResult<()> {
        let len = u32::try_from(len).map_err(|_| ProtocolError::MessageTooLarge {
            size: len,
            max: u32::MAX as usize,
        })?;
        self.buffer.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }
}

/// Reads values sequentially from a received datagram.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads one value of `shape`.
    pub fn read(&mut self, shape: &Shape) -> ProtocolResult<Value> {
        let value = match shape {
            Shape::I16 => Value::I16(i16::from_be_bytes(self.take_array()?)),
            Shape::I32 => Value::I32(i32::from_be_bytes(self.take_array()?)),
            Shape::I64 => Value::I64(i64::from_be_bytes(self.take_array()?)),
            Shape::F32 => Value::F32(f32::from_bits(u32::from_be_bytes(self.take_array()?))),
            Shape::F64 => Value::F64(f64::from_bits(u64::from_be_bytes(self.take_array()?))),
            Shape::Bool => match self.take_byte()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(ProtocolError::InvalidBool(other)),
            },
            Shape::Str => {
                let len = self.read_len()?;
                let bytes = self.take(len)?;
                Value::Str(String::from_utf8(bytes.to_vec())?)
            }
            Shape::Optional(inner) => match self.take_byte()? {
                ABSENT => Value::Optional(None),
                PRESENT => Value::Optional(Some(Box::new(self.read(inner)?))),
                other => return Err(ProtocolError::InvalidPresence(other)),
            },
            Shape::List(element) => {
                let count = self.read_len()?;
                let limit = match element.min_width() {
                    0 => MAX_DATAGRAM_SIZE,
                    width => self.remaining() / width,
                };
                if count > limit {
                    return Err(ProtocolError::ListTooLong { count });
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read(element)?);
                }
                Value::List(items)
            }
            Shape::Record(fields) => Value::Record(
                fields
                    .iter()
                    .map(|field| self.read(field))
                    .collect::<ProtocolResult<_>>()?,
            ),
        };
        Ok(value)
    }

    /// Succeeds only if every byte has been consumed.
    pub fn finish(self) -> ProtocolResult<()> {
        match self.remaining() {
            0 => Ok(()),
            count => Err(ProtocolError::TrailingBytes { count }),
        }
    }

    fn take(&mut self, n: usize) -> ProtocolResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn take_byte(&mut self) -> ProtocolResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_len(&mut self) -> ProtocolResult<usize> {
        Ok(u32::from_be_bytes(self.take_array()?) as usize)
    }
}

/// A Rust type with a fixed wire shape.
pub trait Marshal: Sized {
    /// The shape every value of this type encodes as.
    fn shape() -> Shape;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> ProtocolResult<Self>;

    /// Encodes into a standalone datagram payload.
    fn marshal(&self) -> ProtocolResult<Vec<u8>> {
        encode(&Self::shape(), &self.to_value())
    }

    /// Decodes a standalone payload, rejecting trailing bytes.
    fn unmarshal(bytes: &[u8]) -> ProtocolResult<Self> {
        Self::from_value(decode(bytes, &Self::shape())?)
    }

    fn write_to(&self, encoder: &mut Encoder) -> ProtocolResult<()> {
        encoder.write(&Self::shape(), &self.to_value())
    }

    fn read_from(decoder: &mut Decoder<'_>) -> ProtocolResult<Self> {
        Self::from_value(decoder.read(&Self::shape())?)
    }
}

macro_rules! marshal_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Marshal for $ty {
                fn shape() -> Shape {
                    Shape::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant(self.clone())
                }

                fn from_value(value: Value) -> ProtocolResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ProtocolError::mismatch(Shape::$variant, other.kind())),
                    }
                }
            }
        )*
    };
}

marshal_primitive! {
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Str,
}

impl<T: Marshal> Marshal for Option<T> {
    fn shape() -> Shape {
        Shape::optional(T::shape())
    }

    fn to_value(&self) -> Value {
        Value::Optional(self.as_ref().map(|v| Box::new(v.to_value())))
    }

    fn from_value(value: Value) -> ProtocolResult<Self> {
        match value {
            Value::Optional(inner) => inner.map(|v| T::from_value(*v)).transpose(),
            other => Err(ProtocolError::mismatch(Self::shape(), other.kind())),
        }
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn shape() -> Shape {
        Shape::list(T::shape())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Marshal::to_value).collect())
    }

    fn from_value(value: Value) -> ProtocolResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(ProtocolError::mismatch(Self::shape(), other.kind())),
        }
    }
}

/// Pulls the next field out of a record iterator obtained from
/// [`Value::into_record`].
#[doc(hidden)]
pub fn next_field(fields: &mut std::vec::IntoIter<Value>) -> ProtocolResult<Value> {
    fields
        .next()
        .ok_or_else(|| ProtocolError::mismatch("another record field", "end of record"))
}

/// Declares a struct whose fields are marshalled in declaration order.
///
/// ```rust
/// use facility_protocol::codec::Marshal;
///
/// facility_protocol::wire_record! {
///     #[derive(Debug, PartialEq)]
///     pub struct Probe {
///         pub label: String,
///         pub hops: Vec<i16>,
///     }
/// }
///
/// let probe = Probe { label: "lt1".into(), hops: vec![1, 2] };
/// let bytes = probe.marshal().unwrap();
/// assert_eq!(Probe::unmarshal(&bytes).unwrap(), probe);
/// ```
#[macro_export]
macro_rules! wire_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::codec::Marshal for $name {
            fn shape() -> $crate::codec::Shape {
                $crate::codec::Shape::Record(vec![
                    $(<$ty as $crate::codec::Marshal>::shape()),*
                ])
            }

            fn to_value(&self) -> $crate::codec::Value {
                $crate::codec::Value::Record(vec![
                    $($crate::codec::Marshal::to_value(&self.$field)),*
                ])
            }

            fn from_value(value: $crate::codec::Value) -> $crate::ProtocolResult<Self> {
                let arity = <[&str]>::len(&[$(stringify!($field)),*]);
                #[allow(unused_mut, unused_variables)]
                let mut fields = value.into_record(arity)?;
                Ok(Self {
                    $(
                        $field: <$ty as $crate::codec::Marshal>::from_value(
                            $crate::codec::next_field(&mut fields)?,
                        )?,
                    )*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    crate::wire_record! {
        #[derive(Debug, Clone, PartialEq)]
        struct Everything {
            integer_list: Vec<i32>,
            nested_list: Vec<Vec<i32>>,
            boxed_int: Option<i32>,
            int: i32,
            long: i64,
            string: String,
            null_string: Option<String>,
            boxed_bool: Option<bool>,
            boolean: bool,
            boxed_short: Option<i16>,
            short: i16,
            boxed_float: Option<f32>,
            float: f32,
            boxed_double: Option<f64>,
            double: f64,
            null_list: Option<Vec<i32>>,
            empty_list: Option<Vec<i32>>,
        }
    }

    fn everything() -> Everything {
        Everything {
            integer_list: vec![6, 7, 8],
            nested_list: vec![vec![29, 4, 96], vec![8, 71, 21], vec![]],
            boxed_int: Some(123),
            int: 8346,
            long: -9_000_000_000,
            string: "book room".to_string(),
            null_string: None,
            boxed_bool: Some(true),
            boolean: false,
            boxed_short: Some(64),
            short: 90,
            boxed_float: Some(3.14),
            float: 6.18,
            boxed_double: Some(42.8),
            double: 1.08,
            null_list: None,
            empty_list: Some(vec![]),
        }
    }

    #[test]
    fn record_roundtrip() {
        let value = everything();
        let bytes = value.marshal().unwrap();
        assert_eq!(Everything::unmarshal(&bytes).unwrap(), value);
    }

    #[test]
    fn null_and_empty_list_differ() {
        let none = Option::<Vec<i32>>::None.marshal().unwrap();
        let empty = Some(Vec::<i32>::new()).marshal().unwrap();
        assert_eq!(hex(&none), "00");
        assert_eq!(hex(&empty), "0100000000");
    }

    #[test]
    fn absent_string_has_no_length_bytes() {
        let bytes = Option::<String>::None.marshal().unwrap();
        assert_eq!(bytes, vec![0]);
        let bytes = Some(String::new()).marshal().unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn integer_boundaries_roundtrip() {
        for v in [i16::MIN, -1, 0, 1, i16::MAX] {
            assert_eq!(i16::unmarshal(&v.marshal().unwrap()).unwrap(), v);
        }
        for v in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(i32::unmarshal(&v.marshal().unwrap()).unwrap(), v);
        }
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(i64::unmarshal(&v.marshal().unwrap()).unwrap(), v);
        }
    }

    #[test]
    fn float_boundaries_roundtrip_bit_exact() {
        for v in [
            0.0f32,
            -0.0,
            f32::MIN,
            f32::MAX,
            f32::MIN_POSITIVE,
            f32::EPSILON,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ] {
            let back = f32::unmarshal(&v.marshal().unwrap()).unwrap();
            assert_eq!(back.to_bits(), v.to_bits());
        }
        for v in [
            0.0f64,
            -0.0,
            f64::MIN,
            f64::MAX,
            f64::MIN_POSITIVE,
            f64::EPSILON,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
        ] {
            let back = f64::unmarshal(&v.marshal().unwrap()).unwrap();
            assert_eq!(back.to_bits(), v.to_bits());
        }
    }

    #[test]
    fn fixed_widths_are_big_endian() {
        assert_eq!(hex(&(-2i16).marshal().unwrap()), "fffe");
        assert_eq!(hex(&258i32.marshal().unwrap()), "00000102");
        assert_eq!(hex(&1i64.marshal().unwrap()), "0000000000000001");
        assert_eq!(hex(&1.0f32.marshal().unwrap()), "3f800000");
        assert_eq!(hex(&1.0f64.marshal().unwrap()), "3ff0000000000000");
        assert_eq!(hex(&true.marshal().unwrap()), "01");
    }

    #[test]
    fn dynamic_value_layout() {
        let shape = Shape::Record(vec![
            Shape::optional(Shape::I16),
            Shape::optional(Shape::I16),
            Shape::list(Shape::Str),
        ]);
        let value = Value::Record(vec![
            Value::Optional(None),
            Value::Optional(Some(Box::new(Value::I16(-2)))),
            Value::List(vec![]),
        ]);
        let bytes = encode(&shape, &value).unwrap();
        insta::assert_snapshot!(hex(&bytes), @"0001fffe00000000");
        assert_eq!(decode(&bytes, &shape).unwrap(), value);
    }

    #[test]
    fn typed_and_dynamic_encodings_agree() {
        let value = everything();
        let typed = value.marshal().unwrap();
        let dynamic = encode(&Everything::shape(), &value.to_value()).unwrap();
        assert_eq!(typed, dynamic);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = 7i32.marshal().unwrap();
        bytes.push(0);
        assert!(matches!(
            i32::unmarshal(&bytes),
            Err(ProtocolError::TrailingBytes { count: 1 })
        ));
    }

    #[test]
    fn every_truncation_rejected() {
        let bytes = everything().marshal().unwrap();
        for len in 0..bytes.len() {
            assert!(
                Everything::unmarshal(&bytes[..len]).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn invalid_markers_rejected() {
        assert!(matches!(
            Option::<i32>::unmarshal(&[2, 0, 0, 0, 1]),
            Err(ProtocolError::InvalidPresence(2))
        ));
        assert!(matches!(
            bool::unmarshal(&[7]),
            Err(ProtocolError::InvalidBool(7))
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let bytes = [0, 0, 0, 2, 0xc3, 0x28];
        assert!(matches!(
            String::unmarshal(&bytes),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn oversized_list_count_rejected_before_allocating() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0, 0, 0, 1];
        assert!(matches!(
            Vec::<i32>::unmarshal(&bytes),
            Err(ProtocolError::ListTooLong { .. })
        ));
    }

    #[test]
    fn encoding_mismatched_value_fails() {
        let result = encode(&Shape::I32, &Value::Str("x".into()));
        assert!(matches!(result, Err(ProtocolError::ShapeMismatch { .. })));

        let result = encode(
            &Shape::Record(vec![Shape::I32, Shape::I32]),
            &Value::Record(vec![Value::I32(1)]),
        );
        assert!(matches!(result, Err(ProtocolError::ShapeMismatch { .. })));
    }

    #[test]
    fn oversized_payload_rejected() {
        let big = "x".repeat(MAX_DATAGRAM_SIZE);
        assert!(matches!(
            big.marshal(),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn decoder_reads_consecutive_shapes() {
        let mut encoder = Encoder::new();
        5i32.write_to(&mut encoder).unwrap();
        "tail".to_string().write_to(&mut encoder).unwrap();
        let bytes = encoder.finish().unwrap();

        let mut decoder = Decoder::new(&bytes);
        assert_eq!(i32::read_from(&mut decoder).unwrap(), 5);
        assert_eq!(decoder.remaining(), 8);
        assert_eq!(String::read_from(&mut decoder).unwrap(), "tail");
        decoder.finish().unwrap();
    }

    #[test]
    fn shape_display() {
        assert_eq!(
            <Option<Vec<Vec<i32>>>>::shape().to_string(),
            "optional<list<list<i32>>>"
        );
        assert_eq!(
            Shape::Record(vec![Shape::Str, Shape::Bool]).to_string(),
            "record(string, bool)"
        );
    }
}
