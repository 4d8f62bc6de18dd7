//! Dataset values
//!
//! Values are fully self-describing (shape + type + decoded payload) so
//! that any consumer can render them without backend-specific knowledge.
//! The binary transport yields typed buffers reinterpreted from raw
//! bytes; the structured transport yields JSON values flattened into one
//! contiguous row-major sequence.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::dtype::{DType, Endianness};
use crate::error::{ImviewError, ImviewResult};

/// A typed buffer produced by the binary transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NumericArray {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! for_each_variant {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            NumericArray::I8($v) => $body,
            NumericArray::I16($v) => $body,
            NumericArray::I32($v) => $body,
            NumericArray::I64($v) => $body,
            NumericArray::U8($v) => $body,
            NumericArray::U16($v) => $body,
            NumericArray::U32($v) => $body,
            NumericArray::U64($v) => $body,
            NumericArray::F32($v) => $body,
            NumericArray::F64($v) => $body,
        }
    };
}

impl NumericArray {
    /// Number of elements
    pub fn len(&self) -> usize {
        for_each_variant!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` as JSON
    pub fn json_at(&self, index: usize) -> Option<JsonValue> {
        if index >= self.len() {
            return None;
        }
        Some(match self {
            NumericArray::I8(v) => JsonValue::from(v[index]),
            NumericArray::I16(v) => JsonValue::from(v[index]),
            NumericArray::I32(v) => JsonValue::from(v[index]),
            NumericArray::I64(v) => JsonValue::from(v[index]),
            NumericArray::U8(v) => JsonValue::from(v[index]),
            NumericArray::U16(v) => JsonValue::from(v[index]),
            NumericArray::U32(v) => JsonValue::from(v[index]),
            NumericArray::U64(v) => JsonValue::from(v[index]),
            NumericArray::F32(v) => JsonValue::from(v[index]),
            NumericArray::F64(v) => JsonValue::from(v[index]),
        })
    }

    /// Convert to f64 values
    pub fn to_f64(&self) -> Vec<f64> {
        for_each_variant!(self, v => v.iter().map(|&x| x as f64).collect())
    }

    /// Subset at the given flat indices, preserving the element type
    pub fn take_indices(&self, indices: &[usize]) -> ImviewResult<NumericArray> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(ImviewError::InvalidFormat(format!(
                "element index {bad} out of bounds for buffer of {} elements",
                self.len()
            )));
        }
        Ok(for_each_variant!(self, v => {
            NumericArray::from(indices.iter().map(|&i| v[i]).collect::<Vec<_>>())
        }))
    }

    /// Reinterpret a raw byte buffer as a typed array
    ///
    /// The buffer length must be an exact multiple of the element width.
    pub fn from_bytes(bytes: &[u8], dtype: &DType) -> ImviewResult<NumericArray> {
        match dtype {
            DType::Integer {
                size,
                signed,
                endianness,
            } => match (*size, *signed) {
                (8, true) => decode_elems(bytes, *endianness, i8::from_le_bytes, i8::from_be_bytes, i8::from_ne_bytes).map(NumericArray::I8),
                (16, true) => decode_elems(bytes, *endianness, i16::from_le_bytes, i16::from_be_bytes, i16::from_ne_bytes).map(NumericArray::I16),
                (32, true) => decode_elems(bytes, *endianness, i32::from_le_bytes, i32::from_be_bytes, i32::from_ne_bytes).map(NumericArray::I32),
                (64, true) => decode_elems(bytes, *endianness, i64::from_le_bytes, i64::from_be_bytes, i64::from_ne_bytes).map(NumericArray::I64),
                (8, false) => decode_elems(bytes, *endianness, u8::from_le_bytes, u8::from_be_bytes, u8::from_ne_bytes).map(NumericArray::U8),
                (16, false) => decode_elems(bytes, *endianness, u16::from_le_bytes, u16::from_be_bytes, u16::from_ne_bytes).map(NumericArray::U16),
                (32, false) => decode_elems(bytes, *endianness, u32::from_le_bytes, u32::from_be_bytes, u32::from_ne_bytes).map(NumericArray::U32),
                (64, false) => decode_elems(bytes, *endianness, u64::from_le_bytes, u64::from_be_bytes, u64::from_ne_bytes).map(NumericArray::U64),
                _ => Err(ImviewError::UnsupportedType(format!(
                    "{size}-bit integer has no binary form"
                ))),
            },
            DType::Float { size, endianness } => match *size {
                32 => decode_elems(bytes, *endianness, f32::from_le_bytes, f32::from_be_bytes, f32::from_ne_bytes).map(NumericArray::F32),
                64 => decode_elems(bytes, *endianness, f64::from_le_bytes, f64::from_be_bytes, f64::from_ne_bytes).map(NumericArray::F64),
                _ => Err(ImviewError::UnsupportedType(format!(
                    "{size}-bit float has no binary form"
                ))),
            },
            _ => Err(ImviewError::UnsupportedType(
                "only fixed-width numeric types have a binary form".to_string(),
            )),
        }
    }
}

macro_rules! numeric_array_from {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(impl From<Vec<$elem>> for NumericArray {
            fn from(v: Vec<$elem>) -> Self {
                NumericArray::$variant(v)
            }
        })*
    };
}

numeric_array_from! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    f32 => F32, f64 => F64,
}

fn decode_elems<T, const W: usize>(
    bytes: &[u8],
    endianness: Endianness,
    from_le: fn([u8; W]) -> T,
    from_be: fn([u8; W]) -> T,
    from_ne: fn([u8; W]) -> T,
) -> ImviewResult<Vec<T>> {
    if bytes.len() % W != 0 {
        return Err(ImviewError::ShapeMismatch {
            expected: bytes.len().div_ceil(W),
            actual: bytes.len() / W,
        });
    }

    let from = match endianness {
        Endianness::Little => from_le,
        Endianness::Big => from_be,
        Endianness::Native | Endianness::None => from_ne,
    };

    Ok(bytes
        .chunks_exact(W)
        .map(|chunk| {
            let mut buf = [0u8; W];
            buf.copy_from_slice(chunk);
            from(buf)
        })
        .collect())
}

/// A fetched dataset value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Single element of a scalar-shaped dataset
    Scalar(JsonValue),
    /// Typed buffer from the binary transport
    Numeric(NumericArray),
    /// Row-major flattened structured value
    Structured {
        shape: Vec<usize>,
        elems: Vec<JsonValue>,
    },
}

/// Flatten a nested structured value into one contiguous row-major
/// sequence for the given shape
///
/// Fails loudly with [`ImviewError::ShapeMismatch`] when the flattened
/// length disagrees with the shape product.
pub fn flatten_value(value: JsonValue, shape: &[usize]) -> ImviewResult<Vec<JsonValue>> {
    let expected: usize = shape.iter().product();
    let mut elems = Vec::with_capacity(expected);
    collect_elems(value, shape.len().max(1), &mut elems);

    if elems.len() != expected {
        return Err(ImviewError::ShapeMismatch {
            expected,
            actual: elems.len(),
        });
    }
    Ok(elems)
}

fn collect_elems(value: JsonValue, depth: usize, out: &mut Vec<JsonValue>) {
    if depth == 0 {
        out.push(value);
        return;
    }
    match value {
        JsonValue::Array(items) => {
            for item in items {
                collect_elems(item, depth - 1, out);
            }
        }
        // Already flat; the length check catches ragged input
        other => out.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::decode_dtype;
    use serde_json::json;

    #[test]
    fn test_from_bytes_little_endian_floats() {
        let bytes: Vec<u8> = [1.5f64, -2.0, 0.25]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let array = NumericArray::from_bytes(&bytes, &decode_dtype("<f8").unwrap()).unwrap();
        assert_eq!(array, NumericArray::F64(vec![1.5, -2.0, 0.25]));
    }

    #[test]
    fn test_from_bytes_big_endian_integers() {
        let bytes: Vec<u8> = [258i16, -3].iter().flat_map(|x| x.to_be_bytes()).collect();
        let array = NumericArray::from_bytes(&bytes, &decode_dtype(">i2").unwrap()).unwrap();
        assert_eq!(array, NumericArray::I16(vec![258, -3]));
    }

    #[test]
    fn test_from_bytes_rejects_partial_elements() {
        let err = NumericArray::from_bytes(&[0u8; 7], &decode_dtype("<f4").unwrap()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_from_bytes_rejects_non_numeric() {
        let err = NumericArray::from_bytes(&[0u8; 8], &decode_dtype("|S8").unwrap()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_take_indices() {
        let array = NumericArray::F64(vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(
            array.take_indices(&[3, 1]).unwrap(),
            NumericArray::F64(vec![3.0, 1.0])
        );
        assert!(array.take_indices(&[4]).is_err());
    }

    #[test]
    fn test_flatten_nested() {
        let value = json!([[1, 2, 3], [4, 5, 6]]);
        let elems = flatten_value(value, &[2, 3]).unwrap();
        assert_eq!(elems, vec![json!(1), json!(2), json!(3), json!(4), json!(5), json!(6)]);
    }

    #[test]
    fn test_flatten_keeps_innermost_elements() {
        // Complex elements stay intact: only ndim-1 levels are flattened
        let value = json!([[[1.0, 0.5], [2.0, 0.0]]]);
        let elems = flatten_value(value, &[1, 2]).unwrap();
        assert_eq!(elems, vec![json!([1.0, 0.5]), json!([2.0, 0.0])]);
    }

    #[test]
    fn test_flatten_shape_mismatch_is_loud() {
        let err = flatten_value(json!([[1, 2], [3]]), &[2, 2]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_flatten_accepts_already_flat_input() {
        let elems = flatten_value(json!([1, 2, 3, 4]), &[2, 2]).unwrap();
        assert_eq!(elems.len(), 4);
    }
}
