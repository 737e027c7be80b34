//! The `#~` table stream.
//!
//! Row layouts are declared as column schemas; index widths (2 or 4 bytes)
//! are computed from the heap-size flags and row counts exactly as ECMA-335
//! II.24.2.6 prescribes. Only the tables the surface walk and resolution
//! need are materialized; everything else is measured and skipped.

use crate::metadata::LoadError;

use super::read::Cursor;

pub(crate) const TABLE_COUNT: usize = 0x2D;

pub(crate) const MODULE: usize = 0x00;
pub(crate) const TYPE_REF: usize = 0x01;
pub(crate) const TYPE_DEF: usize = 0x02;
pub(crate) const FIELD_PTR: usize = 0x03;
pub(crate) const FIELD: usize = 0x04;
pub(crate) const METHOD_PTR: usize = 0x05;
pub(crate) const METHOD_DEF: usize = 0x06;
pub(crate) const PARAM_PTR: usize = 0x07;
pub(crate) const PARAM: usize = 0x08;
pub(crate) const INTERFACE_IMPL: usize = 0x09;
pub(crate) const MEMBER_REF: usize = 0x0A;
pub(crate) const CONSTANT: usize = 0x0B;
pub(crate) const CUSTOM_ATTRIBUTE: usize = 0x0C;
pub(crate) const FIELD_MARSHAL: usize = 0x0D;
pub(crate) const DECL_SECURITY: usize = 0x0E;
pub(crate) const CLASS_LAYOUT: usize = 0x0F;
pub(crate) const FIELD_LAYOUT: usize = 0x10;
pub(crate) const STAND_ALONE_SIG: usize = 0x11;
pub(crate) const EVENT_MAP: usize = 0x12;
pub(crate) const EVENT_PTR: usize = 0x13;
pub(crate) const EVENT: usize = 0x14;
pub(crate) const PROPERTY_MAP: usize = 0x15;
pub(crate) const PROPERTY_PTR: usize = 0x16;
pub(crate) const PROPERTY: usize = 0x17;
pub(crate) const METHOD_SEMANTICS: usize = 0x18;
pub(crate) const METHOD_IMPL: usize = 0x19;
pub(crate) const MODULE_REF: usize = 0x1A;
pub(crate) const TYPE_SPEC: usize = 0x1B;
pub(crate) const IMPL_MAP: usize = 0x1C;
pub(crate) const FIELD_RVA: usize = 0x1D;
pub(crate) const ENC_LOG: usize = 0x1E;
pub(crate) const ENC_MAP: usize = 0x1F;
pub(crate) const ASSEMBLY: usize = 0x20;
pub(crate) const ASSEMBLY_PROCESSOR: usize = 0x21;
pub(crate) const ASSEMBLY_OS: usize = 0x22;
pub(crate) const ASSEMBLY_REF: usize = 0x23;
pub(crate) const ASSEMBLY_REF_PROCESSOR: usize = 0x24;
pub(crate) const ASSEMBLY_REF_OS: usize = 0x25;
pub(crate) const FILE: usize = 0x26;
pub(crate) const EXPORTED_TYPE: usize = 0x27;
pub(crate) const MANIFEST_RESOURCE: usize = 0x28;
pub(crate) const NESTED_CLASS: usize = 0x29;
pub(crate) const GENERIC_PARAM: usize = 0x2A;
pub(crate) const METHOD_SPEC: usize = 0x2B;
pub(crate) const GENERIC_PARAM_CONSTRAINT: usize = 0x2C;

/// Marks coded-index tag slots the standard leaves unused.
const UNUSED: usize = usize::MAX;

/// Build a metadata token from table id and 1-based row.
pub(crate) fn token(table: usize, row: u32) -> u32 {
    ((table as u32) << 24) | (row & 0x00FF_FFFF)
}

pub(crate) fn token_table(token: u32) -> usize {
    (token >> 24) as usize
}

pub(crate) fn token_row(token: u32) -> u32 {
    token & 0x00FF_FFFF
}

/// Column kinds a row can be assembled from.
#[derive(Debug, Clone, Copy)]
enum Col {
    U16,
    U32,
    /// Index into `#Strings`.
    Str,
    /// Index into `#GUID`.
    Guid,
    /// Index into `#Blob`.
    Blob,
    /// Simple index into one table.
    Table(usize),
    /// Tagged index into one of several tables.
    Coded(CodedKind),
}

/// The coded-index families of ECMA-335 II.24.2.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodedKind {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedKind {
    fn bits(self) -> u32 {
        match self {
            CodedKind::CustomAttributeType | CodedKind::MemberRefParent => 3,
            CodedKind::HasCustomAttribute => 5,
            CodedKind::HasFieldMarshal
            | CodedKind::HasSemantics
            | CodedKind::MethodDefOrRef
            | CodedKind::MemberForwarded
            | CodedKind::TypeOrMethodDef => 1,
            _ => 2,
        }
    }

    fn members(self) -> &'static [usize] {
        match self {
            CodedKind::TypeDefOrRef => &[TYPE_DEF, TYPE_REF, TYPE_SPEC],
            CodedKind::HasConstant => &[FIELD, PARAM, PROPERTY],
            CodedKind::HasCustomAttribute => &[
                METHOD_DEF,
                FIELD,
                TYPE_REF,
                TYPE_DEF,
                PARAM,
                INTERFACE_IMPL,
                MEMBER_REF,
                MODULE,
                DECL_SECURITY,
                PROPERTY,
                EVENT,
                STAND_ALONE_SIG,
                MODULE_REF,
                TYPE_SPEC,
                ASSEMBLY,
                ASSEMBLY_REF,
                FILE,
                EXPORTED_TYPE,
                MANIFEST_RESOURCE,
                GENERIC_PARAM,
                GENERIC_PARAM_CONSTRAINT,
                METHOD_SPEC,
            ],
            CodedKind::HasFieldMarshal => &[FIELD, PARAM],
            CodedKind::HasDeclSecurity => &[TYPE_DEF, METHOD_DEF, ASSEMBLY],
            CodedKind::MemberRefParent => &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC],
            CodedKind::HasSemantics => &[EVENT, PROPERTY],
            CodedKind::MethodDefOrRef => &[METHOD_DEF, MEMBER_REF],
            CodedKind::MemberForwarded => &[FIELD, METHOD_DEF],
            CodedKind::Implementation => &[FILE, ASSEMBLY_REF, EXPORTED_TYPE],
            CodedKind::CustomAttributeType => &[UNUSED, UNUSED, METHOD_DEF, MEMBER_REF, UNUSED],
            CodedKind::ResolutionScope => &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF],
            CodedKind::TypeOrMethodDef => &[TYPE_DEF, METHOD_DEF],
        }
    }
}

/// Row layout per table, in table-id order. Every table defined by the
/// standard gets a schema so any valid image can at least be skipped over.
fn schema(table: usize) -> Option<&'static [Col]> {
    use CodedKind::*;
    Some(match table {
        MODULE => &[Col::U16, Col::Str, Col::Guid, Col::Guid, Col::Guid],
        TYPE_REF => &[Col::Coded(ResolutionScope), Col::Str, Col::Str],
        TYPE_DEF => &[
            Col::U32,
            Col::Str,
            Col::Str,
            Col::Coded(TypeDefOrRef),
            Col::Table(FIELD),
            Col::Table(METHOD_DEF),
        ],
        FIELD_PTR => &[Col::Table(FIELD)],
        FIELD => &[Col::U16, Col::Str, Col::Blob],
        METHOD_PTR => &[Col::Table(METHOD_DEF)],
        METHOD_DEF => &[Col::U32, Col::U16, Col::U16, Col::Str, Col::Blob, Col::Table(PARAM)],
        PARAM_PTR => &[Col::Table(PARAM)],
        PARAM => &[Col::U16, Col::U16, Col::Str],
        INTERFACE_IMPL => &[Col::Table(TYPE_DEF), Col::Coded(TypeDefOrRef)],
        MEMBER_REF => &[Col::Coded(MemberRefParent), Col::Str, Col::Blob],
        CONSTANT => &[Col::U16, Col::Coded(HasConstant), Col::Blob],
        CUSTOM_ATTRIBUTE => &[Col::Coded(HasCustomAttribute), Col::Coded(CustomAttributeType), Col::Blob],
        FIELD_MARSHAL => &[Col::Coded(HasFieldMarshal), Col::Blob],
        DECL_SECURITY => &[Col::U16, Col::Coded(HasDeclSecurity), Col::Blob],
        CLASS_LAYOUT => &[Col::U16, Col::U32, Col::Table(TYPE_DEF)],
        FIELD_LAYOUT => &[Col::U32, Col::Table(FIELD)],
        STAND_ALONE_SIG => &[Col::Blob],
        EVENT_MAP => &[Col::Table(TYPE_DEF), Col::Table(EVENT)],
        EVENT_PTR => &[Col::Table(EVENT)],
        EVENT => &[Col::U16, Col::Str, Col::Coded(TypeDefOrRef)],
        PROPERTY_MAP => &[Col::Table(TYPE_DEF), Col::Table(PROPERTY)],
        PROPERTY_PTR => &[Col::Table(PROPERTY)],
        PROPERTY => &[Col::U16, Col::Str, Col::Blob],
        METHOD_SEMANTICS => &[Col::U16, Col::Table(METHOD_DEF), Col::Coded(HasSemantics)],
        METHOD_IMPL => &[Col::Table(TYPE_DEF), Col::Coded(MethodDefOrRef), Col::Coded(MethodDefOrRef)],
        MODULE_REF => &[Col::Str],
        TYPE_SPEC => &[Col::Blob],
        IMPL_MAP => &[Col::U16, Col::Coded(MemberForwarded), Col::Str, Col::Table(MODULE_REF)],
        FIELD_RVA => &[Col::U32, Col::Table(FIELD)],
        ENC_LOG => &[Col::U32, Col::U32],
        ENC_MAP => &[Col::U32],
        ASSEMBLY => &[
            Col::U32,
            Col::U16,
            Col::U16,
            Col::U16,
            Col::U16,
            Col::U32,
            Col::Blob,
            Col::Str,
            Col::Str,
        ],
        ASSEMBLY_PROCESSOR => &[Col::U32],
        ASSEMBLY_OS => &[Col::U32, Col::U32, Col::U32],
        ASSEMBLY_REF => &[
            Col::U16,
            Col::U16,
            Col::U16,
            Col::U16,
            Col::U32,
            Col::Blob,
            Col::Str,
            Col::Str,
            Col::Blob,
        ],
        ASSEMBLY_REF_PROCESSOR => &[Col::U32, Col::Table(ASSEMBLY_REF)],
        ASSEMBLY_REF_OS => &[Col::U32, Col::U32, Col::U32, Col::Table(ASSEMBLY_REF)],
        FILE => &[Col::U32, Col::Str, Col::Blob],
        EXPORTED_TYPE => &[Col::U32, Col::U32, Col::Str, Col::Str, Col::Coded(Implementation)],
        MANIFEST_RESOURCE => &[Col::U32, Col::U32, Col::Str, Col::Coded(Implementation)],
        NESTED_CLASS => &[Col::Table(TYPE_DEF), Col::Table(TYPE_DEF)],
        GENERIC_PARAM => &[Col::U16, Col::U16, Col::Coded(TypeOrMethodDef), Col::Str],
        METHOD_SPEC => &[Col::Coded(MethodDefOrRef), Col::Blob],
        GENERIC_PARAM_CONSTRAINT => &[Col::Table(GENERIC_PARAM), Col::Coded(TypeDefOrRef)],
        _ => return None,
    })
}

/// A decoded coded index: target table and 1-based row. Row 0 is the null
/// reference whatever the tag says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodedIndex {
    pub table: usize,
    pub row: u32,
}

impl CodedIndex {
    pub const NULL: CodedIndex = CodedIndex { table: UNUSED, row: 0 };

    pub fn is_null(&self) -> bool {
        self.row == 0
    }
}

fn decode_coded(kind: CodedKind, raw: u32) -> Option<CodedIndex> {
    if raw == 0 {
        return Some(CodedIndex::NULL);
    }
    let bits = kind.bits();
    let tag = (raw & ((1 << bits) - 1)) as usize;
    let row = raw >> bits;
    let table = *kind.members().get(tag)?;
    if table == UNUSED {
        return None;
    }
    Some(CodedIndex { table, row })
}

/// Index widths for the current image.
struct Widths {
    wide_strings: bool,
    wide_guids: bool,
    wide_blobs: bool,
    rows: [u32; TABLE_COUNT],
}

impl Widths {
    fn table_wide(&self, table: usize) -> bool {
        self.rows.get(table).is_some_and(|&count| count >= 0x1_0000)
    }

    fn coded_wide(&self, kind: CodedKind) -> bool {
        let limit = 1u32 << (16 - kind.bits());
        kind.members()
            .iter()
            .filter(|&&table| table != UNUSED)
            .any(|&table| self.rows[table] >= limit)
    }

    fn col_size(&self, col: Col) -> usize {
        match col {
            Col::U16 => 2,
            Col::U32 => 4,
            Col::Str => index_size(self.wide_strings),
            Col::Guid => index_size(self.wide_guids),
            Col::Blob => index_size(self.wide_blobs),
            Col::Table(table) => index_size(self.table_wide(table)),
            Col::Coded(kind) => index_size(self.coded_wide(kind)),
        }
    }

    fn row_size(&self, cols: &[Col]) -> usize {
        cols.iter().map(|&col| self.col_size(col)).sum()
    }
}

fn index_size(wide: bool) -> usize {
    if wide {
        4
    } else {
        2
    }
}

/// Column-by-column reader for one table's rows.
struct RowReader<'c, 'a> {
    cur: &'c mut Cursor<'a>,
    widths: &'c Widths,
}

impl RowReader<'_, '_> {
    fn idx(&mut self, wide: bool) -> Option<u32> {
        if wide {
            self.cur.u32()
        } else {
            self.cur.u16().map(u32::from)
        }
    }

    fn u16(&mut self) -> Option<u16> {
        self.cur.u16()
    }

    fn u32(&mut self) -> Option<u32> {
        self.cur.u32()
    }

    fn str_idx(&mut self) -> Option<u32> {
        let wide = self.widths.wide_strings;
        self.idx(wide)
    }

    fn blob_idx(&mut self) -> Option<u32> {
        let wide = self.widths.wide_blobs;
        self.idx(wide)
    }

    fn table_idx(&mut self, table: usize) -> Option<u32> {
        let wide = self.widths.table_wide(table);
        self.idx(wide)
    }

    fn coded(&mut self, kind: CodedKind) -> Option<CodedIndex> {
        let wide = self.widths.coded_wide(kind);
        let raw = self.idx(wide)?;
        decode_coded(kind, raw)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeRefRow {
    pub scope: CodedIndex,
    pub name: u32,
    pub namespace: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeDefRow {
    pub name: u32,
    pub namespace: u32,
    pub field_list: u32,
    pub method_list: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldRow {
    pub signature: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MethodDefRow {
    pub rva: u32,
    pub signature: u32,
    pub param_list: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ParamRow {
    pub sequence: u16,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MemberRefRow {
    pub class: CodedIndex,
    pub signature: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct CustomAttributeRow {
    pub parent: CodedIndex,
    pub ctor: CodedIndex,
    pub value: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StandAloneSigRow {
    pub signature: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EventMapRow {
    pub parent: u32,
    pub event_list: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EventRow {
    pub event_type: CodedIndex,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyMapRow {
    pub parent: u32,
    pub property_list: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyRow {
    pub signature: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MethodSemanticsRow {
    pub semantics: u16,
    pub method: u32,
    pub association: CodedIndex,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TypeSpecRow {
    pub signature: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AssemblyRow {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
    pub revision: u16,
    pub public_key: u32,
    pub name: u32,
    pub culture: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AssemblyRefRow {
    pub name: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct NestedClassRow {
    pub nested: u32,
    pub enclosing: u32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MethodSpecRow {
    pub method: CodedIndex,
}

/// Materialized rows of the tables the reader consumes.
#[derive(Debug, Clone)]
pub(crate) struct Tables {
    pub rows: [u32; TABLE_COUNT],
    pub type_ref: Vec<TypeRefRow>,
    pub type_def: Vec<TypeDefRow>,
    pub field: Vec<FieldRow>,
    pub method_def: Vec<MethodDefRow>,
    pub param: Vec<ParamRow>,
    pub member_ref: Vec<MemberRefRow>,
    pub custom_attribute: Vec<CustomAttributeRow>,
    pub stand_alone_sig: Vec<StandAloneSigRow>,
    pub event_map: Vec<EventMapRow>,
    pub event: Vec<EventRow>,
    pub property_map: Vec<PropertyMapRow>,
    pub property: Vec<PropertyRow>,
    pub method_semantics: Vec<MethodSemanticsRow>,
    pub type_spec: Vec<TypeSpecRow>,
    pub assembly: Vec<AssemblyRow>,
    pub assembly_ref: Vec<AssemblyRefRow>,
    pub nested_class: Vec<NestedClassRow>,
    pub method_spec: Vec<MethodSpecRow>,
}

impl Tables {
    pub(crate) fn parse(stream: &[u8]) -> Result<Tables, LoadError> {
        let mut cur = Cursor::new(stream);

        let _reserved = cur.u32().ok_or_else(truncated)?;
        let _major = cur.u8().ok_or_else(truncated)?;
        let _minor = cur.u8().ok_or_else(truncated)?;
        let heap_sizes = cur.u8().ok_or_else(truncated)?;
        let _padding = cur.u8().ok_or_else(truncated)?;
        let valid = cur.u64().ok_or_else(truncated)?;
        let _sorted = cur.u64().ok_or_else(truncated)?;

        let mut rows = [0u32; TABLE_COUNT];
        for table in 0..64 {
            if valid & (1u64 << table) == 0 {
                continue;
            }
            let count = cur.u32().ok_or_else(truncated)?;
            if table >= TABLE_COUNT {
                return Err(LoadError::Failed(format!("unsupported metadata table 0x{table:02X}")));
            }
            rows[table] = count;
        }
        // Extra-data flag: one spare dword between row counts and rows.
        if heap_sizes & 0x40 != 0 {
            cur.u32().ok_or_else(truncated)?;
        }

        let widths = Widths {
            wide_strings: heap_sizes & 0x01 != 0,
            wide_guids: heap_sizes & 0x02 != 0,
            wide_blobs: heap_sizes & 0x04 != 0,
            rows,
        };

        let mut tables = Tables::empty(rows);
        for table in 0..TABLE_COUNT {
            let count = rows[table] as usize;
            if count == 0 {
                continue;
            }
            let mut reader = RowReader { cur: &mut cur, widths: &widths };
            let materialized = match table {
                TYPE_REF => read_rows(&mut reader, count, &mut tables.type_ref, |r| {
                    Some(TypeRefRow {
                        scope: r.coded(CodedKind::ResolutionScope)?,
                        name: r.str_idx()?,
                        namespace: r.str_idx()?,
                    })
                }),
                TYPE_DEF => read_rows(&mut reader, count, &mut tables.type_def, |r| {
                    let _flags = r.u32()?;
                    let name = r.str_idx()?;
                    let namespace = r.str_idx()?;
                    let _extends = r.coded(CodedKind::TypeDefOrRef)?;
                    let field_list = r.table_idx(FIELD)?;
                    let method_list = r.table_idx(METHOD_DEF)?;
                    Some(TypeDefRow { name, namespace, field_list, method_list })
                }),
                FIELD => read_rows(&mut reader, count, &mut tables.field, |r| {
                    let _flags = r.u16()?;
                    let _name = r.str_idx()?;
                    Some(FieldRow { signature: r.blob_idx()? })
                }),
                METHOD_DEF => read_rows(&mut reader, count, &mut tables.method_def, |r| {
                    let rva = r.u32()?;
                    let _impl_flags = r.u16()?;
                    let _flags = r.u16()?;
                    let _name = r.str_idx()?;
                    let signature = r.blob_idx()?;
                    let param_list = r.table_idx(PARAM)?;
                    Some(MethodDefRow { rva, signature, param_list })
                }),
                PARAM => read_rows(&mut reader, count, &mut tables.param, |r| {
                    let _flags = r.u16()?;
                    let sequence = r.u16()?;
                    let _name = r.str_idx()?;
                    Some(ParamRow { sequence })
                }),
                MEMBER_REF => read_rows(&mut reader, count, &mut tables.member_ref, |r| {
                    let class = r.coded(CodedKind::MemberRefParent)?;
                    let _name = r.str_idx()?;
                    Some(MemberRefRow { class, signature: r.blob_idx()? })
                }),
                CUSTOM_ATTRIBUTE => read_rows(&mut reader, count, &mut tables.custom_attribute, |r| {
                    Some(CustomAttributeRow {
                        parent: r.coded(CodedKind::HasCustomAttribute)?,
                        ctor: r.coded(CodedKind::CustomAttributeType)?,
                        value: r.blob_idx()?,
                    })
                }),
                STAND_ALONE_SIG => read_rows(&mut reader, count, &mut tables.stand_alone_sig, |r| {
                    Some(StandAloneSigRow { signature: r.blob_idx()? })
                }),
                EVENT_MAP => read_rows(&mut reader, count, &mut tables.event_map, |r| {
                    Some(EventMapRow { parent: r.table_idx(TYPE_DEF)?, event_list: r.table_idx(EVENT)? })
                }),
                EVENT => read_rows(&mut reader, count, &mut tables.event, |r| {
                    let _flags = r.u16()?;
                    let _name = r.str_idx()?;
                    Some(EventRow { event_type: r.coded(CodedKind::TypeDefOrRef)? })
                }),
                PROPERTY_MAP => read_rows(&mut reader, count, &mut tables.property_map, |r| {
                    Some(PropertyMapRow {
                        parent: r.table_idx(TYPE_DEF)?,
                        property_list: r.table_idx(PROPERTY)?,
                    })
                }),
                PROPERTY => read_rows(&mut reader, count, &mut tables.property, |r| {
                    let _flags = r.u16()?;
                    let _name = r.str_idx()?;
                    Some(PropertyRow { signature: r.blob_idx()? })
                }),
                METHOD_SEMANTICS => read_rows(&mut reader, count, &mut tables.method_semantics, |r| {
                    Some(MethodSemanticsRow {
                        semantics: r.u16()?,
                        method: r.table_idx(METHOD_DEF)?,
                        association: r.coded(CodedKind::HasSemantics)?,
                    })
                }),
                TYPE_SPEC => read_rows(&mut reader, count, &mut tables.type_spec, |r| {
                    Some(TypeSpecRow { signature: r.blob_idx()? })
                }),
                ASSEMBLY => read_rows(&mut reader, count, &mut tables.assembly, |r| {
                    let _hash_alg = r.u32()?;
                    let major = r.u16()?;
                    let minor = r.u16()?;
                    let build = r.u16()?;
                    let revision = r.u16()?;
                    let _flags = r.u32()?;
                    let public_key = r.blob_idx()?;
                    let name = r.str_idx()?;
                    let culture = r.str_idx()?;
                    Some(AssemblyRow { major, minor, build, revision, public_key, name, culture })
                }),
                ASSEMBLY_REF => read_rows(&mut reader, count, &mut tables.assembly_ref, |r| {
                    let _major = r.u16()?;
                    let _minor = r.u16()?;
                    let _build = r.u16()?;
                    let _revision = r.u16()?;
                    let _flags = r.u32()?;
                    let _public_key_or_token = r.blob_idx()?;
                    let name = r.str_idx()?;
                    let _culture = r.str_idx()?;
                    let _hash = r.blob_idx()?;
                    Some(AssemblyRefRow { name })
                }),
                NESTED_CLASS => read_rows(&mut reader, count, &mut tables.nested_class, |r| {
                    Some(NestedClassRow {
                        nested: r.table_idx(TYPE_DEF)?,
                        enclosing: r.table_idx(TYPE_DEF)?,
                    })
                }),
                METHOD_SPEC => read_rows(&mut reader, count, &mut tables.method_spec, |r| {
                    let method = r.coded(CodedKind::MethodDefOrRef)?;
                    let _instantiation = r.blob_idx()?;
                    Some(MethodSpecRow { method })
                }),
                _ => {
                    let cols = schema(table)
                        .ok_or_else(|| LoadError::Failed(format!("unknown table 0x{table:02X}")))?;
                    let size = widths.row_size(cols).checked_mul(count).ok_or_else(truncated)?;
                    cur.skip(size).is_some()
                }
            };
            if !materialized {
                return Err(LoadError::Failed(format!("table 0x{table:02X} truncated")));
            }
        }

        Ok(tables)
    }

    fn empty(rows: [u32; TABLE_COUNT]) -> Tables {
        Tables {
            rows,
            type_ref: Vec::new(),
            type_def: Vec::new(),
            field: Vec::new(),
            method_def: Vec::new(),
            param: Vec::new(),
            member_ref: Vec::new(),
            custom_attribute: Vec::new(),
            stand_alone_sig: Vec::new(),
            event_map: Vec::new(),
            event: Vec::new(),
            property_map: Vec::new(),
            property: Vec::new(),
            method_semantics: Vec::new(),
            type_spec: Vec::new(),
            assembly: Vec::new(),
            assembly_ref: Vec::new(),
            nested_class: Vec::new(),
            method_spec: Vec::new(),
        }
    }

    /// Fields declared by the given TypeDef row: `[start, end)` over 1-based
    /// Field rows.
    pub(crate) fn field_range(&self, type_row: u32) -> (u32, u32) {
        let idx = type_row as usize;
        if idx == 0 || idx > self.type_def.len() {
            return (1, 1);
        }
        let start = self.type_def[idx - 1].field_list;
        let next = self.type_def.get(idx).map(|t| t.field_list);
        list_range(self.rows[FIELD], start, next)
    }

    /// Methods declared by the given TypeDef row.
    pub(crate) fn method_range(&self, type_row: u32) -> (u32, u32) {
        let idx = type_row as usize;
        if idx == 0 || idx > self.type_def.len() {
            return (1, 1);
        }
        let start = self.type_def[idx - 1].method_list;
        let next = self.type_def.get(idx).map(|t| t.method_list);
        list_range(self.rows[METHOD_DEF], start, next)
    }

    /// Param rows belonging to the given MethodDef row.
    pub(crate) fn param_range(&self, method_row: u32) -> (u32, u32) {
        let idx = method_row as usize;
        if idx == 0 || idx > self.method_def.len() {
            return (1, 1);
        }
        let start = self.method_def[idx - 1].param_list;
        let next = self.method_def.get(idx).map(|m| m.param_list);
        list_range(self.rows[PARAM], start, next)
    }

    /// Event rows covered by the EventMap entry at `map_idx` (0-based).
    pub(crate) fn event_range(&self, map_idx: usize) -> (u32, u32) {
        let Some(entry) = self.event_map.get(map_idx) else { return (1, 1) };
        let next = self.event_map.get(map_idx + 1).map(|e| e.event_list);
        list_range(self.rows[EVENT], entry.event_list, next)
    }

    /// Property rows covered by the PropertyMap entry at `map_idx` (0-based).
    pub(crate) fn property_range(&self, map_idx: usize) -> (u32, u32) {
        let Some(entry) = self.property_map.get(map_idx) else { return (1, 1) };
        let next = self.property_map.get(map_idx + 1).map(|p| p.property_list);
        list_range(self.rows[PROPERTY], entry.property_list, next)
    }

    /// The TypeDef row declaring the given Field row. Member lists are
    /// stored as ascending range starts, so the owner is the last TypeDef
    /// whose range starts at or before the row.
    pub(crate) fn field_owner(&self, field_row: u32) -> Option<u32> {
        if field_row == 0 || field_row > self.rows[FIELD] {
            return None;
        }
        let idx = self.type_def.partition_point(|t| t.field_list <= field_row);
        if idx == 0 {
            None
        } else {
            Some(idx as u32)
        }
    }

    /// The TypeDef row declaring the given MethodDef row.
    pub(crate) fn method_owner(&self, method_row: u32) -> Option<u32> {
        if method_row == 0 || method_row > self.rows[METHOD_DEF] {
            return None;
        }
        let idx = self.type_def.partition_point(|t| t.method_list <= method_row);
        if idx == 0 {
            None
        } else {
            Some(idx as u32)
        }
    }
}

/// Clamp a `[start, next_start)` member list to the owning table's bounds.
fn list_range(total: u32, start: u32, next: Option<u32>) -> (u32, u32) {
    let limit = total + 1;
    let end = next.unwrap_or(limit).min(limit);
    if start == 0 || start > end {
        return (end, end);
    }
    (start, end)
}

fn read_rows<T>(
    reader: &mut RowReader<'_, '_>,
    count: usize,
    out: &mut Vec<T>,
    mut read: impl FnMut(&mut RowReader<'_, '_>) -> Option<T>,
) -> bool {
    out.reserve(count);
    for _ in 0..count {
        match read(reader) {
            Some(row) => out.push(row),
            None => return false,
        }
    }
    true
}

fn truncated() -> LoadError {
    LoadError::Failed("table stream truncated".into())
}
