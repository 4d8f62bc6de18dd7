//! Binary type descriptors and their semantic decoding
//!
//! Backends describe dataset element types with numpy-style descriptor
//! strings (`<f8`, `|b1`, `<c16`, ...). This module decodes them into a
//! closed semantic model so that no other code has to look at raw
//! descriptors. Decoding is a total, deterministic function of the
//! descriptor string: the same input always yields the same `DType` or
//! the same `UnsupportedType` error.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ImviewError, ImviewResult};

lazy_static! {
    // Optional byte-order marker, one kind letter, optional byte length.
    static ref DESCRIPTOR_RE: Regex = Regex::new(r"^([<>=|])?([A-Za-z])([0-9]*)$").unwrap();
}

/// Byte order of a stored numeric type
///
/// Follows the numpy byteorder convention: an absent or `=` marker means
/// native order, `|` means byte order does not apply (single-byte types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
    Native,
    None,
}

/// Character set of a string type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharSet {
    Ascii,
    Utf8,
}

/// Length of a string type in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrLength {
    Fixed(usize),
    Variable,
}

/// A named field of a compound type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundField {
    pub name: String,
    pub dtype: DType,
}

/// A named member of an enum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

/// Semantic element type of a dataset or attribute
///
/// Sizes are in bits. Complex numbers are represented as a compound of
/// `real`/`imag` floats that split the total byte width evenly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DType {
    Integer {
        size: u32,
        signed: bool,
        endianness: Endianness,
    },
    Float {
        size: u32,
        endianness: Endianness,
    },
    String {
        charset: CharSet,
        length: StrLength,
    },
    Compound {
        fields: Vec<CompoundField>,
    },
    Enum {
        base: Box<DType>,
        mapping: Vec<EnumMember>,
    },
}

impl DType {
    /// Whether values of this type travel on the binary transport
    ///
    /// Only fixed-width integers and floats can be reinterpreted from a
    /// raw byte buffer; everything else (strings, compounds, enums) uses
    /// the structured transport.
    pub fn is_binary_fetchable(&self) -> bool {
        matches!(self, DType::Integer { .. } | DType::Float { .. })
    }

    /// Whether this is the boolean-byte enum produced by `|b1`
    pub fn is_bool_enum(&self) -> bool {
        match self {
            DType::Enum { mapping, .. } => {
                mapping.len() == 2
                    && mapping.iter().any(|m| m.name == "FALSE" && m.value == 0)
                    && mapping.iter().any(|m| m.name == "TRUE" && m.value == 1)
            }
            _ => false,
        }
    }
}

fn bool_enum() -> DType {
    DType::Enum {
        base: Box::new(DType::Integer {
            size: 8,
            signed: true,
            endianness: Endianness::None,
        }),
        mapping: vec![
            EnumMember {
                name: "FALSE".to_string(),
                value: 0,
            },
            EnumMember {
                name: "TRUE".to_string(),
                value: 1,
            },
        ],
    }
}

fn convert_endianness(marker: Option<&str>) -> Endianness {
    match marker {
        Some("<") => Endianness::Little,
        Some(">") => Endianness::Big,
        Some("|") => Endianness::None,
        // "=" or no marker
        _ => Endianness::Native,
    }
}

/// Decode a numpy-style type descriptor into a [`DType`]
///
/// Unknown kind letters and inconsistent lengths fail with
/// [`ImviewError::UnsupportedType`]; a failure here must never abort the
/// resolution of unrelated entities (callers degrade the affected entity
/// instead).
pub fn decode_dtype(descriptor: &str) -> ImviewResult<DType> {
    // Booleans are stored as a single byte and exposed as an enum,
    // matching how h5py writes them.
    if descriptor == "|b1" {
        return Ok(bool_enum());
    }

    let unsupported = || ImviewError::UnsupportedType(descriptor.to_string());

    let caps = DESCRIPTOR_RE.captures(descriptor).ok_or_else(unsupported)?;
    let endianness = convert_endianness(caps.get(1).map(|m| m.as_str()));
    let kind = caps.get(2).map(|m| m.as_str()).ok_or_else(unsupported)?;
    let length: usize = match caps.get(3).map(|m| m.as_str()) {
        Some("") | None => 0,
        Some(digits) => digits.parse().map_err(|_| unsupported())?,
    };

    match kind {
        "f" if length > 0 => Ok(DType::Float {
            size: (length * 8) as u32,
            endianness,
        }),
        "i" if length > 0 => Ok(DType::Integer {
            size: (length * 8) as u32,
            signed: true,
            endianness,
        }),
        "u" if length > 0 => Ok(DType::Integer {
            size: (length * 8) as u32,
            signed: false,
            endianness,
        }),
        // Bytes are split evenly between the real and imaginary parts
        "c" if length > 0 && length % 2 == 0 => {
            let part = DType::Float {
                size: (length * 4) as u32,
                endianness,
            };
            Ok(DType::Compound {
                fields: vec![
                    CompoundField {
                        name: "real".to_string(),
                        dtype: part.clone(),
                    },
                    CompoundField {
                        name: "imag".to_string(),
                        dtype: part,
                    },
                ],
            })
        }
        "S" => Ok(DType::String {
            charset: CharSet::Ascii,
            length: if length > 0 {
                StrLength::Fixed(length)
            } else {
                StrLength::Variable
            },
        }),
        // Objects are considered as strings
        "U" | "O" => Ok(DType::String {
            charset: CharSet::Utf8,
            length: if length > 0 {
                StrLength::Fixed(length)
            } else {
                StrLength::Variable
            },
        }),
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_decode_float() {
        assert_eq!(
            decode_dtype("<f8").unwrap(),
            DType::Float {
                size: 64,
                endianness: Endianness::Little,
            }
        );
        assert_eq!(
            decode_dtype(">f4").unwrap(),
            DType::Float {
                size: 32,
                endianness: Endianness::Big,
            }
        );
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(
            decode_dtype("<i4").unwrap(),
            DType::Integer {
                size: 32,
                signed: true,
                endianness: Endianness::Little,
            }
        );
        assert_eq!(
            decode_dtype("|u1").unwrap(),
            DType::Integer {
                size: 8,
                signed: false,
                endianness: Endianness::None,
            }
        );
        // "=" and no marker both mean native order
        assert_eq!(
            decode_dtype("=i8").unwrap(),
            decode_dtype("i8").unwrap()
        );
    }

    #[test]
    fn test_decode_boolean_byte() {
        let dtype = decode_dtype("|b1").unwrap();
        assert!(dtype.is_bool_enum());
        match dtype {
            DType::Enum { base, mapping } => {
                assert_eq!(
                    *base,
                    DType::Integer {
                        size: 8,
                        signed: true,
                        endianness: Endianness::None,
                    }
                );
                assert_eq!(mapping.len(), 2);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_complex() {
        let part = DType::Float {
            size: 64,
            endianness: Endianness::Little,
        };
        assert_eq!(
            decode_dtype("<c16").unwrap(),
            DType::Compound {
                fields: vec![
                    CompoundField {
                        name: "real".to_string(),
                        dtype: part.clone(),
                    },
                    CompoundField {
                        name: "imag".to_string(),
                        dtype: part,
                    },
                ],
            }
        );
    }

    #[test]
    fn test_decode_strings() {
        assert_eq!(
            decode_dtype("|S10").unwrap(),
            DType::String {
                charset: CharSet::Ascii,
                length: StrLength::Fixed(10),
            }
        );
        // Length 0 is the variable-length sentinel
        assert_eq!(
            decode_dtype("|S").unwrap(),
            DType::String {
                charset: CharSet::Ascii,
                length: StrLength::Variable,
            }
        );
        assert_eq!(
            decode_dtype("|O").unwrap(),
            DType::String {
                charset: CharSet::Utf8,
                length: StrLength::Variable,
            }
        );
    }

    #[test_case("<x9"; "unknown kind letter")]
    #[test_case("<f"; "float without length")]
    #[test_case("<c7"; "odd complex width")]
    #[test_case(""; "empty descriptor")]
    #[test_case("<<f8"; "double marker")]
    fn test_decode_unsupported(descriptor: &str) {
        let err = decode_dtype(descriptor).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_decode_is_deterministic() {
        for descriptor in ["<f8", "|b1", ">u2", "<c8", "|S5"] {
            assert_eq!(
                decode_dtype(descriptor).unwrap(),
                decode_dtype(descriptor).unwrap()
            );
        }
    }

    #[test]
    fn test_binary_fetchable() {
        assert!(decode_dtype("<f4").unwrap().is_binary_fetchable());
        assert!(decode_dtype(">i2").unwrap().is_binary_fetchable());
        assert!(!decode_dtype("|b1").unwrap().is_binary_fetchable());
        assert!(!decode_dtype("<c16").unwrap().is_binary_fetchable());
        assert!(!decode_dtype("|S10").unwrap().is_binary_fetchable());
    }
}
