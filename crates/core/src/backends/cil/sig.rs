//! Signature blob decoding (ECMA-335 II.23.2).
//!
//! Signatures are only mined for the types they mention, so decoding
//! reduces every Type term to at most one TypeDef/TypeRef/TypeSpec token:
//! pointers, arrays and generic instantiations collapse to their element
//! type, primitives and generic parameters to nothing.

use super::read::Cursor;
use super::tables;

/// Element-type bytes and signature kinds (ECMA-335 II.23.1.16).
mod elem {
    pub const VOID: u8 = 0x01;
    pub const STRING: u8 = 0x0E;
    pub const PTR: u8 = 0x0F;
    pub const BYREF: u8 = 0x10;
    pub const VALUETYPE: u8 = 0x11;
    pub const CLASS: u8 = 0x12;
    pub const VAR: u8 = 0x13;
    pub const ARRAY: u8 = 0x14;
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    pub const NATIVE_INT: u8 = 0x18;
    pub const NATIVE_UINT: u8 = 0x19;
    pub const FNPTR: u8 = 0x1B;
    pub const OBJECT: u8 = 0x1C;
    pub const SZARRAY: u8 = 0x1D;
    pub const MVAR: u8 = 0x1E;
    pub const CMOD_REQD: u8 = 0x1F;
    pub const CMOD_OPT: u8 = 0x20;
    pub const SENTINEL: u8 = 0x41;
    pub const PINNED: u8 = 0x45;

    pub const FIELD_SIG: u8 = 0x06;
    pub const LOCAL_SIG: u8 = 0x07;
    pub const PROPERTY_SIG: u8 = 0x08;
}

const MAX_TYPE_DEPTH: u32 = 64;

/// Return and parameter tokens of a method signature.
#[derive(Debug, Clone, Default)]
pub(crate) struct MethodSig {
    pub return_type: Option<u32>,
    pub params: Vec<Option<u32>>,
}

/// A MemberRef signature is either a field or a method; the distinction
/// decides how an instruction operand gets decomposed.
#[derive(Debug, Clone)]
pub(crate) enum MemberSig {
    Field { field_type: Option<u32> },
    Method(MethodSig),
}

/// FieldSig: the declared type's token, or `None` for primitives and
/// unreadable blobs alike.
pub(crate) fn field_type(blob: &[u8]) -> Option<u32> {
    let mut cur = Cursor::new(blob);
    if cur.u8()? & 0x0F != elem::FIELD_SIG {
        return None;
    }
    parse_type(&mut cur, 0)?
}

/// PropertySig: the property type's token. Index parameters are not
/// decoded here; the accessor methods carry them.
pub(crate) fn property_type(blob: &[u8]) -> Option<u32> {
    let mut cur = Cursor::new(blob);
    if cur.u8()? & 0x0F != elem::PROPERTY_SIG {
        return None;
    }
    let _param_count = cur.compressed_u32()?;
    parse_type(&mut cur, 0)?
}

/// MethodDefSig/MethodRefSig: return and parameter type tokens. `None`
/// when the blob cannot be decoded at all.
pub(crate) fn method_types(blob: &[u8]) -> Option<MethodSig> {
    let mut cur = Cursor::new(blob);
    let (return_type, params) = parse_method(&mut cur, 0)?;
    Some(MethodSig { return_type, params })
}

/// LocalVarSig: one token slot per local variable.
pub(crate) fn local_types(blob: &[u8]) -> Option<Vec<Option<u32>>> {
    let mut cur = Cursor::new(blob);
    if cur.u8()? != elem::LOCAL_SIG {
        return None;
    }
    let count = cur.compressed_u32()?;
    let mut locals = Vec::with_capacity(count.min(256) as usize);
    for _ in 0..count {
        locals.push(parse_type(&mut cur, 0)?);
    }
    Some(locals)
}

/// TypeSpec blob: the underlying def-or-ref token, if one is present.
pub(crate) fn type_spec(blob: &[u8]) -> Option<u32> {
    let mut cur = Cursor::new(blob);
    parse_type(&mut cur, 0)?
}

/// Classify a MemberRef signature as field or method.
pub(crate) fn member_sig(blob: &[u8]) -> Option<MemberSig> {
    let mut cur = Cursor::new(blob);
    if cur.peek_u8()? == elem::FIELD_SIG {
        cur.u8()?;
        let field_type = parse_type(&mut cur, 0)?;
        return Some(MemberSig::Field { field_type });
    }
    let (return_type, params) = parse_method(&mut cur, 0)?;
    Some(MemberSig::Method(MethodSig { return_type, params }))
}

/// Decode a custom-attribute value blob whose first fixed argument is a
/// string. Returns `None` for unreadable blobs, null strings, and
/// arguments of any other type.
pub(crate) fn attribute_string_arg(blob: &[u8]) -> Option<String> {
    let mut cur = Cursor::new(blob);
    if cur.u16()? != 0x0001 {
        return None;
    }
    if cur.peek_u8()? == 0xFF {
        return None;
    }
    let len = cur.compressed_u32()? as usize;
    let bytes = cur.bytes(len)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Decode one Type term. The outer `Option` is `None` when the blob is
/// malformed; the inner value is the single token the term reduces to.
fn parse_type(cur: &mut Cursor<'_>, depth: u32) -> Option<Option<u32>> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    let kind = cur.u8()?;
    match kind {
        elem::VOID..=elem::STRING
        | elem::TYPEDBYREF
        | elem::NATIVE_INT
        | elem::NATIVE_UINT
        | elem::OBJECT => Some(None),
        elem::VALUETYPE | elem::CLASS => def_or_ref(cur).map(Some),
        elem::PTR | elem::BYREF | elem::SZARRAY | elem::PINNED => parse_type(cur, depth + 1),
        elem::CMOD_REQD | elem::CMOD_OPT => {
            // The modifier's own token is noise; the modified type wins.
            def_or_ref(cur)?;
            parse_type(cur, depth + 1)
        }
        elem::ARRAY => {
            let element = parse_type(cur, depth + 1)?;
            let _rank = cur.compressed_u32()?;
            let sizes = cur.compressed_u32()?;
            for _ in 0..sizes {
                cur.compressed_u32()?;
            }
            let bounds = cur.compressed_u32()?;
            for _ in 0..bounds {
                cur.compressed_u32()?;
            }
            Some(element)
        }
        elem::GENERICINST => {
            let _class_or_value = cur.u8()?;
            let element = def_or_ref(cur)?;
            let arg_count = cur.compressed_u32()?;
            for _ in 0..arg_count {
                parse_type(cur, depth + 1)?;
            }
            Some(Some(element))
        }
        elem::VAR | elem::MVAR => {
            cur.compressed_u32()?;
            Some(None)
        }
        elem::FNPTR => {
            parse_method(cur, depth + 1)?;
            Some(None)
        }
        _ => None,
    }
}

/// Decode a method signature body: calling convention, counts, return
/// type, parameters. Vararg sentinels are consumed, not counted.
fn parse_method(cur: &mut Cursor<'_>, depth: u32) -> Option<(Option<u32>, Vec<Option<u32>>)> {
    if depth > MAX_TYPE_DEPTH {
        return None;
    }
    let convention = cur.u8()?;
    if convention & 0x10 != 0 {
        cur.compressed_u32()?;
    }
    let count = cur.compressed_u32()?;
    let return_type = parse_type(cur, depth)?;
    let mut params = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        if cur.peek_u8() == Some(elem::SENTINEL) {
            cur.u8()?;
        }
        params.push(parse_type(cur, depth)?);
    }
    Some((return_type, params))
}

/// TypeDefOrRefEncoded (ECMA-335 II.23.2.8): 2-bit table tag, row shifted
/// left. Row 0 and tag 3 are malformed.
fn def_or_ref(cur: &mut Cursor<'_>) -> Option<u32> {
    let raw = cur.compressed_u32()?;
    let row = raw >> 2;
    if row == 0 {
        return None;
    }
    let table = match raw & 0x3 {
        0 => tables::TYPE_DEF,
        1 => tables::TYPE_REF,
        2 => tables::TYPE_SPEC,
        _ => return None,
    };
    Some(tables::token(table, row))
}
