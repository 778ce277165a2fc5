//! Byte-stream primitives.
//!
//! Wire layout: the string table (count, then length-prefixed UTF-8 entries
//! in rank order) followed by one top-level node encoding. Node codes `0`,
//! `1`, and `2` are reserved for subtree references, template references,
//! and raw single-character identifiers; registered node types start at `3`.
//! Primitive values use the single-byte tag space below.
//!
//! ```text
//! 0x00        end marker
//! 0x01        null
//! 0x02 0x03   false, true
//! 0x04..0x0F  nano int, value -1..+10 (code = value + 5)
//! 0x10..0x13  tagged int, low 2 bits = byte count - 1, LE bytes follow
//! 0x14..0x17  tagged string-table id, same size encoding
//! 0x20..0x27  short array, low 3 bits = length 0..6
//! 0x28..0x2B  long array, tagged length >= 7
//! 0x30        float as packed decimal digits
//! ```

use crate::errors::{PackError, PackResult};
use crate::schema::{RAW_IDENT_TYPE_CODE, SUBTREE_REF_CODE, TEMPLATE_REF_CODE};
use crate::strings::{is_inline_identifier, StringTable};
use crate::tree::Node;
use crate::value::FieldValue;

pub const END_MARKER: u8 = 0x00;
pub const NULL_TAG: u8 = 0x01;
pub const FALSE_TAG: u8 = 0x02;
pub const TRUE_TAG: u8 = 0x03;
pub const INT_TAG: u8 = 0x10;
pub const STR_TAG: u8 = 0x14;
pub const SHORT_ARR_TAG: u8 = 0x20;
pub const LONG_ARR_TAG: u8 = 0x28;
pub const FLOAT_TAG: u8 = 0x30;

const NANO_INT_MIN: i64 = -1;
const NANO_INT_MAX: i64 = 10;
const NANO_INT_BIAS: i64 = 5;
const SHORT_ARR_MAX: usize = 6;

/// Terminates the cut list of a subtree reference.
pub const CUT_LIST_END: u8 = 0xFF;

/// 4-bit alphabet for float-as-digits packing.
const DIGIT_MINUS: u8 = 10;
const DIGIT_PLUS: u8 = 11;
const DIGIT_DOT: u8 = 12;
const DIGIT_EXP: u8 = 13;
const DIGIT_END: u8 = 15;

/// Append-only byte buffer with the wire primitives.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Unsigned LEB128, little-endian septets. Values above 32 bits are
    /// rejected.
    pub fn write_var_uint(&mut self, v: u64) -> PackResult<()> {
        if v > u64::from(u32::MAX) {
            return Err(PackError::VarUintOverflow { value: v });
        }
        let mut rest = v;
        loop {
            let septet = (rest & 0x7F) as u8;
            rest >>= 7;
            if rest == 0 {
                self.write_u8(septet);
                return Ok(());
            }
            self.write_u8(septet | 0x80);
        }
    }

    /// Writes the finalized table: count, then each entry in rank order as
    /// a byte-length prefix plus UTF-8 bytes.
    pub fn write_string_table(&mut self, table: &StringTable) -> PackResult<()> {
        let entries = table.entries();
        self.write_var_uint(entries.len() as u64)?;
        for entry in entries {
            self.write_var_uint(entry.len() as u64)?;
            self.write_bytes(entry.as_bytes());
        }
        Ok(())
    }

    /// Encodes a node's own bytes: type code plus each declared field value.
    /// Children are emitted by the driver's traversal, not here.
    pub fn write_direct_node(&mut self, node: &Node, table: &StringTable) -> PackResult<()> {
        if node.ty.name == "Identifier" {
            if let Some(name) = node.field("name").and_then(FieldValue::as_str) {
                if is_inline_identifier(name) {
                    self.write_var_uint(u64::from(RAW_IDENT_TYPE_CODE))?;
                    self.write_u8(name.as_bytes()[0]);
                    return Ok(());
                }
            }
        }
        self.write_var_uint(u64::from(node.ty.code))?;
        for descr in &node.ty.fields {
            if descr.deleted {
                continue;
            }
            match node.field(descr.name) {
                Some(value) => self.write_value(value, table)?,
                // Absent optional fields hold their place with a null.
                None => self.write_u8(NULL_TAG),
            }
        }
        Ok(())
    }

    /// Subtree reference: code 0, depth delta, reverse index, one byte per
    /// cut position, terminator.
    pub fn write_subtree_ref(
        &mut self,
        delta: i64,
        reverse_index: u8,
        cut_nums: &[u32],
    ) -> PackResult<()> {
        self.write_var_uint(u64::from(SUBTREE_REF_CODE))?;
        self.write_ref_params(delta, reverse_index)?;
        for &num in cut_nums {
            if num >= u32::from(CUT_LIST_END) {
                return Err(PackError::RefOutOfRange {
                    what: "cut position",
                    value: i64::from(num),
                });
            }
            self.write_u8(num as u8);
        }
        self.write_u8(CUT_LIST_END);
        Ok(())
    }

    /// Template reference: code 1, depth delta, reverse index. The cut
    /// positions are implicit in the referenced template.
    pub fn write_template_ref(&mut self, delta: i64, reverse_index: u8) -> PackResult<()> {
        self.write_var_uint(u64::from(TEMPLATE_REF_CODE))?;
        self.write_ref_params(delta, reverse_index)
    }

    fn write_ref_params(&mut self, delta: i64, reverse_index: u8) -> PackResult<()> {
        if !(-63..=63).contains(&delta) {
            return Err(PackError::RefOutOfRange {
                what: "depth delta",
                value: delta,
            });
        }
        self.write_u8(delta as i8 as u8);
        self.write_u8(reverse_index);
        Ok(())
    }

    /// Array header shared by field-value arrays and child arrays.
    pub fn write_array_header(&mut self, len: usize) -> PackResult<()> {
        if len <= SHORT_ARR_MAX {
            self.write_u8(SHORT_ARR_TAG | len as u8);
            Ok(())
        } else {
            self.write_tagged_num(LONG_ARR_TAG, len as u32)
        }
    }

    /// Dispatches a field value onto the tag table.
    pub fn write_value(&mut self, value: &FieldValue, table: &StringTable) -> PackResult<()> {
        match value {
            FieldValue::Null => {
                self.write_u8(NULL_TAG);
                Ok(())
            }
            FieldValue::Bool(false) => {
                self.write_u8(FALSE_TAG);
                Ok(())
            }
            FieldValue::Bool(true) => {
                self.write_u8(TRUE_TAG);
                Ok(())
            }
            FieldValue::Int(i) => self.write_int(*i),
            FieldValue::Float(f) => self.write_float(*f),
            FieldValue::Str(s) => {
                let id = table.lookup(s)?;
                self.write_tagged_num(STR_TAG, id)
            }
            FieldValue::Array(items) => {
                self.write_array_header(items.len())?;
                for item in items {
                    self.write_value(item, table)?;
                }
                Ok(())
            }
            FieldValue::Map(_) => Err(PackError::UnsupportedValue {
                what: "map value".to_string(),
            }),
        }
    }

    fn write_int(&mut self, i: i64) -> PackResult<()> {
        if (NANO_INT_MIN..=NANO_INT_MAX).contains(&i) {
            self.write_u8((i + NANO_INT_BIAS) as u8);
            return Ok(());
        }
        // Negative values ride as their 32-bit two's-complement image.
        let image = if i >= 0 {
            u32::try_from(i).map_err(|_| PackError::UnsupportedValue {
                what: format!("integer {i} outside the 32-bit range"),
            })?
        } else {
            i32::try_from(i)
                .map_err(|_| PackError::UnsupportedValue {
                    what: format!("integer {i} outside the 32-bit range"),
                })? as u32
        };
        self.write_tagged_num(INT_TAG, image)
    }

    /// Tag byte with the minimum byte width in the low bits, then that many
    /// little-endian bytes.
    fn write_tagged_num(&mut self, tag: u8, v: u32) -> PackResult<()> {
        let width = byte_width(v);
        self.write_u8(tag | (width - 1));
        for i in 0..width {
            self.write_u8((v >> (8 * i)) as u8);
        }
        Ok(())
    }

    /// Finite floats ride as their decimal text packed two 4-bit digits per
    /// byte, low nibble first, terminated by the end nibble.
    fn write_float(&mut self, f: f64) -> PackResult<()> {
        if !f.is_finite() {
            return Err(PackError::UnsupportedValue {
                what: format!("non-finite number {f}"),
            });
        }
        self.write_u8(FLOAT_TAG);
        let text = format!("{f}");
        let mut nibbles: Vec<u8> = text.bytes().map(digit_nibble).collect();
        nibbles.push(DIGIT_END);
        if nibbles.len() % 2 != 0 {
            nibbles.push(DIGIT_END);
        }
        for pair in nibbles.chunks(2) {
            self.write_u8(pair[0] | (pair[1] << 4));
        }
        Ok(())
    }
}

fn byte_width(v: u32) -> u8 {
    match v {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn digit_nibble(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'-' => DIGIT_MINUS,
        b'+' => DIGIT_PLUS,
        b'.' => DIGIT_DOT,
        b'e' | b'E' => DIGIT_EXP,
        // format! of a finite f64 emits no other byte.
        other => unreachable!("unexpected float digit {other}"),
    }
}
