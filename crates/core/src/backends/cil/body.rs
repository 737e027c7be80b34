//! CIL method body decoding (ECMA-335 II.25.4).
//!
//! Bodies are scanned, not interpreted: the walk needs the local variable
//! signature token and every inline metadata token an instruction carries.
//! Operand widths come from a shape table covering the full opcode space;
//! an undefined opcode or a truncated stream rejects the whole body.

use super::read::Cursor;

/// A decoded body before signature and token resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawBody {
    /// StandAloneSig token from a fat header, 0 when absent.
    pub local_sig_token: u32,
    /// Inline tokens in instruction order.
    pub tokens: Vec<u32>,
}

/// Decode a tiny or fat body header and scan the instruction stream.
pub(crate) fn parse(bytes: &[u8]) -> Option<RawBody> {
    let mut cur = Cursor::new(bytes);
    let first = cur.u8()?;
    match first & 0x3 {
        // Tiny: size in the upper six bits, no locals.
        0x2 => {
            let code = cur.bytes((first >> 2) as usize)?;
            Some(RawBody { local_sig_token: 0, tokens: scan(code)? })
        }
        // Fat: 12-bit flags, 4-bit header size in dwords.
        0x3 => {
            let flags_and_size = u16::from(first) | (u16::from(cur.u8()?) << 8);
            let header_dwords = usize::from(flags_and_size >> 12);
            if header_dwords < 3 {
                return None;
            }
            let _max_stack = cur.u16()?;
            let code_size = cur.u32()? as usize;
            let local_sig_token = cur.u32()?;
            cur.skip(header_dwords * 4 - 12)?;
            let code = cur.bytes(code_size)?;
            Some(RawBody { local_sig_token, tokens: scan(code)? })
        }
        _ => None,
    }
}

/// What follows an opcode in the instruction stream.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Fixed-width operand with nothing to collect.
    Skip(usize),
    /// A 4-byte metadata token worth collecting.
    Token,
    /// Jump table: 4-byte count, then count 4-byte targets.
    Switch,
}

fn scan(code: &[u8]) -> Option<Vec<u32>> {
    let mut cur = Cursor::new(code);
    let mut tokens = Vec::new();
    while cur.remaining() > 0 {
        let op = cur.u8()?;
        let shape = if op == 0xFE { wide_shape(cur.u8()?)? } else { base_shape(op)? };
        match shape {
            Shape::Skip(width) => {
                cur.skip(width)?;
            }
            Shape::Token => tokens.push(cur.u32()?),
            Shape::Switch => {
                let count = cur.u32()? as usize;
                cur.skip(count.checked_mul(4)?)?;
            }
        }
    }
    Some(tokens)
}

/// Operand shapes for the single-byte opcode page.
fn base_shape(op: u8) -> Option<Shape> {
    Some(match op {
        // nop through stloc.3, ldnull through ldc.i4.8, dup, pop.
        0x00..=0x0D | 0x14..=0x1E | 0x25 | 0x26 => Shape::Skip(0),
        // Short-form variable and constant operands.
        0x0E..=0x13 | 0x1F => Shape::Skip(1),
        0x20 | 0x22 => Shape::Skip(4),
        0x21 | 0x23 => Shape::Skip(8),
        // jmp, call.
        0x27 | 0x28 => Shape::Token,
        // calli carries a call-site signature, not a member.
        0x29 => Shape::Skip(4),
        0x2A => Shape::Skip(0),
        // Short and long branches.
        0x2B..=0x37 => Shape::Skip(1),
        0x38..=0x44 => Shape::Skip(4),
        0x45 => Shape::Switch,
        // Loads, stores, arithmetic, conversions.
        0x46..=0x6E => Shape::Skip(0),
        0x6F => Shape::Token,
        // cpobj/ldobj type operands and ldstr.
        0x70..=0x72 => Shape::Skip(4),
        0x73 => Shape::Token,
        0x74 | 0x75 => Shape::Skip(4),
        0x76 => Shape::Skip(0),
        0x79 => Shape::Skip(4),
        0x7A => Shape::Skip(0),
        // Field access group.
        0x7B..=0x80 => Shape::Token,
        0x81 => Shape::Skip(4),
        0x82..=0x8B => Shape::Skip(0),
        // box, newarr.
        0x8C | 0x8D => Shape::Skip(4),
        0x8E => Shape::Skip(0),
        0x8F => Shape::Skip(4),
        0x90..=0xA2 => Shape::Skip(0),
        // ldelem, stelem, unbox.any.
        0xA3..=0xA5 => Shape::Skip(4),
        0xB3..=0xBA => Shape::Skip(0),
        0xC2 => Shape::Skip(4),
        0xC3 => Shape::Skip(0),
        0xC6 => Shape::Skip(4),
        0xD0 => Shape::Token,
        0xD1..=0xDC => Shape::Skip(0),
        // leave, leave.s.
        0xDD => Shape::Skip(4),
        0xDE => Shape::Skip(1),
        0xDF | 0xE0 => Shape::Skip(0),
        _ => return None,
    })
}

/// Operand shapes for the 0xFE-prefixed page.
fn wide_shape(op: u8) -> Option<Shape> {
    Some(match op {
        // arglist, comparisons.
        0x00..=0x05 => Shape::Skip(0),
        // ldftn, ldvirtftn.
        0x06 | 0x07 => Shape::Token,
        // Long-form variable operands.
        0x09..=0x0E => Shape::Skip(2),
        // localloc, endfilter.
        0x0F | 0x11 => Shape::Skip(0),
        0x12 => Shape::Skip(1),
        0x13 | 0x14 => Shape::Skip(0),
        // initobj, constrained.
        0x15 | 0x16 => Shape::Skip(4),
        0x17 | 0x18 => Shape::Skip(0),
        0x19 => Shape::Skip(1),
        0x1A => Shape::Skip(0),
        0x1C => Shape::Skip(4),
        0x1D | 0x1E => Shape::Skip(0),
        _ => return None,
    })
}
