//! Control point value type and fixed-width bit-string codec.
//!
//! # Responsibility
//! - Encode one control point as a fixed-width `'0'/'1'` string.
//! - Concatenate/segment ordered point sequences for curve storage.
//!
//! # Invariants
//! - Every encoding is exactly [`ENCODED_WIDTH`] characters long.
//! - Encoded sequences preserve point order.
//! - Decoding is the exact inverse of encoding (bit-level, including `-0.0`).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const COORD_BITS: usize = 32;
const FLAG_BITS: usize = 8;

/// Width of one encoded control point, in characters.
pub const ENCODED_WIDTH: usize = COORD_BITS * 2 + FLAG_BITS;

/// One point of a curve: canvas coordinates plus per-point flags.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub flags: u8,
}

impl ControlPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, flags: 0 }
    }

    pub fn with_flags(x: f32, y: f32, flags: u8) -> Self {
        Self { x, y, flags }
    }
}

/// Control-point codec failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Length is not a multiple of the encoding width, or a chunk is cut short.
    MalformedLength { length: usize, width: usize },
    /// A character other than `0` or `1` was found.
    InvalidDigit { offset: usize, found: char },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedLength { length, width } => write!(
                f,
                "malformed control point encoding: length {length} is not a multiple of {width}"
            ),
            Self::InvalidDigit { offset, found } => write!(
                f,
                "malformed control point encoding: `{found}` at offset {offset}"
            ),
        }
    }
}

impl Error for CodecError {}

/// Encodes one point as x bits, y bits, flag bits (MSB first).
pub fn encode(point: &ControlPoint) -> String {
    let mut out = String::with_capacity(ENCODED_WIDTH);
    push_bits(&mut out, u64::from(point.x.to_bits()), COORD_BITS);
    push_bits(&mut out, u64::from(point.y.to_bits()), COORD_BITS);
    push_bits(&mut out, u64::from(point.flags), FLAG_BITS);
    out
}

/// Decodes one point starting at `offset`.
///
/// Returns the decoded point and the offset of the next chunk.
pub fn decode(encoded: &str, offset: usize) -> Result<(ControlPoint, usize), CodecError> {
    let malformed = CodecError::MalformedLength {
        length: encoded.len(),
        width: ENCODED_WIDTH,
    };
    let end = offset.checked_add(ENCODED_WIDTH).ok_or(malformed.clone())?;
    let chunk = encoded.as_bytes().get(offset..end).ok_or(malformed)?;

    let x = read_bits(chunk, 0, COORD_BITS, offset)?;
    let y = read_bits(chunk, COORD_BITS, COORD_BITS, offset)?;
    let flags = read_bits(chunk, COORD_BITS * 2, FLAG_BITS, offset)?;

    let point = ControlPoint {
        x: f32::from_bits(x as u32),
        y: f32::from_bits(y as u32),
        flags: flags as u8,
    };
    Ok((point, end))
}

/// Ordered concatenation of [`encode`] over `points`.
pub fn encode_sequence(points: &[ControlPoint]) -> String {
    let mut out = String::with_capacity(points.len() * ENCODED_WIDTH);
    for point in points {
        out.push_str(&encode(point));
    }
    out
}

/// Splits `encoded` into fixed-width chunks and decodes each.
pub fn decode_sequence(encoded: &str) -> Result<Vec<ControlPoint>, CodecError> {
    validate_encoded(encoded)?;
    let mut points = Vec::with_capacity(encoded.len() / ENCODED_WIDTH);
    let mut offset = 0;
    while offset < encoded.len() {
        let (point, next) = decode(encoded, offset)?;
        points.push(point);
        offset = next;
    }
    Ok(points)
}

/// Checks the length invariant without decoding.
pub fn validate_encoded(encoded: &str) -> Result<(), CodecError> {
    if encoded.len() % ENCODED_WIDTH != 0 {
        return Err(CodecError::MalformedLength {
            length: encoded.len(),
            width: ENCODED_WIDTH,
        });
    }
    if let Some((offset, found)) = encoded.char_indices().find(|(_, ch)| *ch != '0' && *ch != '1')
    {
        return Err(CodecError::InvalidDigit { offset, found });
    }
    Ok(())
}

fn push_bits(out: &mut String, value: u64, bits: usize) {
    for shift in (0..bits).rev() {
        out.push(if (value >> shift) & 1 == 1 { '1' } else { '0' });
    }
}

fn read_bits(chunk: &[u8], start: usize, bits: usize, base: usize) -> Result<u64, CodecError> {
    let mut value = 0u64;
    for (index, byte) in chunk[start..start + bits].iter().enumerate() {
        let bit = match byte {
            b'0' => 0,
            b'1' => 1,
            other => {
                return Err(CodecError::InvalidDigit {
                    offset: base + start + index,
                    found: char::from(*other),
                });
            }
        };
        value = (value << 1) | bit;
    }
    Ok(value)
}
