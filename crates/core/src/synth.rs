//! Synthesizes minimal ECMA-335 images.
//!
//! [`AssemblyBuilder`] emits a complete PE32 file with one `.text` section
//! holding the CLR header, method bodies and metadata: enough for the
//! reader and for scan pipelines to treat it as a real assembly. Members
//! hang off a single carrier type; references to other assemblies are
//! declared by name and attached as field types, property and event types,
//! or call operands in method bodies.
//!
//! The emitted images use the compact encodings throughout: two-byte heap
//! and table indexes, single-byte compressed values where they fit.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

const SECTION_RVA: u32 = 0x2000;
const SECTION_FILE_OFFSET: u32 = 0x200;
const COR20_SIZE: u32 = 72;

/// Index of a declared assembly reference, in declaration order.
pub type RefIndex = usize;
/// Index of a declared type reference, in declaration order.
pub type TypeIndex = usize;

#[derive(Debug, Clone)]
struct TypeRefDecl {
    scope: RefIndex,
    namespace: String,
    name: String,
}

/// Declarative builder for one synthetic assembly.
#[derive(Debug, Clone)]
pub struct AssemblyBuilder {
    name: String,
    version: (u16, u16, u16, u16),
    culture: String,
    public_key: Vec<u8>,
    company: Option<String>,
    assembly_refs: Vec<String>,
    type_refs: Vec<TypeRefDecl>,
    field_types: Vec<TypeIndex>,
    property_type: Option<TypeIndex>,
    event_type: Option<TypeIndex>,
    nested_field_type: Option<TypeIndex>,
    body_calls: Vec<TypeIndex>,
    local_type: Option<TypeIndex>,
    raw_body: Option<Vec<u8>>,
}

impl AssemblyBuilder {
    pub fn new(name: &str) -> AssemblyBuilder {
        AssemblyBuilder {
            name: name.to_string(),
            version: (1, 0, 0, 0),
            culture: String::new(),
            public_key: Vec::new(),
            company: None,
            assembly_refs: Vec::new(),
            type_refs: Vec::new(),
            field_types: Vec::new(),
            property_type: None,
            event_type: None,
            nested_field_type: None,
            body_calls: Vec::new(),
            local_type: None,
            raw_body: None,
        }
    }

    pub fn version(mut self, major: u16, minor: u16, build: u16, revision: u16) -> Self {
        self.version = (major, minor, build, revision);
        self
    }

    pub fn culture(mut self, culture: &str) -> Self {
        self.culture = culture.to_string();
        self
    }

    /// Attach a public key; the identity then carries its derived token.
    pub fn public_key(mut self, key: &[u8]) -> Self {
        self.public_key = key.to_vec();
        self
    }

    /// Attach an assembly-level AssemblyCompanyAttribute with this value.
    pub fn company(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    /// Declare a reference to another assembly. Indexes are assigned in
    /// declaration order, starting at zero.
    pub fn assembly_ref(mut self, name: &str) -> Self {
        self.assembly_refs.push(name.to_string());
        self
    }

    /// Declare a reference to a type scoped to a declared assembly
    /// reference.
    pub fn type_ref(mut self, scope: RefIndex, namespace: &str, name: &str) -> Self {
        self.type_refs.push(TypeRefDecl {
            scope,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Give the carrier type a field of the referenced type.
    pub fn field_of(mut self, type_ref: TypeIndex) -> Self {
        self.field_types.push(type_ref);
        self
    }

    /// Give the carrier type a property of the referenced type, with a
    /// getter wired through MethodSemantics.
    pub fn property_of(mut self, type_ref: TypeIndex) -> Self {
        self.property_type = Some(type_ref);
        self
    }

    /// Give the carrier type an event whose handler is the referenced
    /// type.
    pub fn event_of(mut self, type_ref: TypeIndex) -> Self {
        self.event_type = Some(type_ref);
        self
    }

    /// Add a nested type holding a field of the referenced type.
    pub fn nested_field_of(mut self, type_ref: TypeIndex) -> Self {
        self.nested_field_type = Some(type_ref);
        self
    }

    /// Add a method whose body calls a static method on the referenced
    /// type.
    pub fn body_call(mut self, type_ref: TypeIndex) -> Self {
        self.body_calls.push(type_ref);
        self
    }

    /// Add a method with a fat body declaring one local of the referenced
    /// type.
    pub fn local_of(mut self, type_ref: TypeIndex) -> Self {
        self.local_type = Some(type_ref);
        self
    }

    /// Add a method with these exact body bytes, header included.
    pub fn raw_body(mut self, bytes: Vec<u8>) -> Self {
        self.raw_body = Some(bytes);
        self
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }

    /// Emit the image.
    pub fn build(&self) -> Vec<u8> {
        let mut strings = StringHeap::new();
        let mut blobs = BlobHeap::new();

        // Assembly references: declared ones first, then mscorlib for the
        // attribute constructor when a company value needs one.
        let mut assembly_refs = self.assembly_refs.clone();
        let attr_scope_row = self.company.as_ref().map(|_| {
            assembly_refs.push("mscorlib".to_string());
            assembly_refs.len() as u32
        });

        // Type references: declared ones first, then the attribute type.
        let mut type_refs: Vec<(u32, u32, u32)> = self
            .type_refs
            .iter()
            .map(|decl| {
                (decl.scope as u32 + 1, strings.add(&decl.name), strings.add(&decl.namespace))
            })
            .collect();
        let attr_type_row = attr_scope_row.map(|scope_row| {
            type_refs.push((
                scope_row,
                strings.add("AssemblyCompanyAttribute"),
                strings.add("System.Reflection"),
            ));
            type_refs.len() as u32
        });

        // Member references: one call target per body call, then the
        // attribute constructor.
        let mut member_refs: Vec<(u32, u32, u32)> = self
            .body_calls
            .iter()
            .map(|&target| {
                let class = coded(1, target as u32 + 1, 3); // MemberRefParent: TypeRef
                (class, strings.add("Use"), blobs.add(&[0x00, 0x00, 0x01]))
            })
            .collect();
        let attr_ctor_row = attr_type_row.map(|type_row| {
            let class = coded(1, type_row, 3);
            // instance void .ctor(string)
            member_refs.push((class, strings.add(".ctor"), blobs.add(&[0x20, 0x01, 0x01, 0x0E])));
            member_refs.len() as u32
        });

        // Method bodies live between the CLR header and the metadata.
        let mut bodies = BodyArea::new();
        let mut methods: Vec<MethodDecl> = Vec::new();
        for (index, _) in self.body_calls.iter().enumerate() {
            let token = 0x0A00_0000 | (index as u32 + 1);
            let mut code = vec![0x28]; // call
            code.extend_from_slice(&token.to_le_bytes());
            code.push(0x2A); // ret
            methods.push(MethodDecl {
                name: strings.add(&format!("M{index}")),
                rva: bodies.push_tiny(&code),
                signature: blobs.add(&[0x00, 0x00, 0x01]),
            });
        }
        let mut stand_alone_sigs: Vec<u32> = Vec::new();
        if let Some(target) = self.local_type {
            stand_alone_sigs.push(blobs.add(&[0x07, 0x01, 0x12, encoded_type_ref(target)]));
            let token = 0x1100_0000 | stand_alone_sigs.len() as u32;
            methods.push(MethodDecl {
                name: strings.add("ML"),
                rva: bodies.push_fat(&[0x2A], token),
                signature: blobs.add(&[0x00, 0x00, 0x01]),
            });
        }
        if let Some(raw) = &self.raw_body {
            methods.push(MethodDecl {
                name: strings.add("MRaw"),
                rva: bodies.push_raw(raw),
                signature: blobs.add(&[0x00, 0x00, 0x01]),
            });
        }
        let getter_row = self.property_type.map(|target| {
            methods.push(MethodDecl {
                name: strings.add("get_P"),
                rva: bodies.push_tiny(&[0x2A]),
                signature: blobs.add(&[0x00, 0x00, 0x12, encoded_type_ref(target)]),
            });
            methods.len() as u32
        });

        // Carrier fields, then the nested type's field.
        let mut fields: Vec<(u32, u32)> = self
            .field_types
            .iter()
            .enumerate()
            .map(|(index, &target)| {
                (
                    strings.add(&format!("f{index}")),
                    blobs.add(&[0x06, 0x12, encoded_type_ref(target)]),
                )
            })
            .collect();
        let carrier_field_count = fields.len() as u32;
        let nested = self.nested_field_type.map(|target| {
            fields.push((strings.add("inner"), blobs.add(&[0x06, 0x12, encoded_type_ref(target)])));
            strings.add("Inner")
        });

        let module_name = strings.add(&format!("{}.dll", self.name));
        let assembly_name = strings.add(&self.name);
        let culture_name = strings.add(&self.culture);
        let public_key_blob = blobs.add(&self.public_key);
        let carrier_name = strings.add("Carrier");
        let carrier_namespace = strings.add("Synth");
        let module_type_name = strings.add("<Module>");
        let assembly_ref_rows: Vec<u32> =
            assembly_refs.iter().map(|name| strings.add(name)).collect();
        let event_names = self.event_type.map(|target| {
            (strings.add("E"), coded(1, target as u32 + 1, 2)) // TypeDefOrRef: TypeRef
        });
        let property_blob = self.property_type.map(|target| {
            (strings.add("P"), blobs.add(&[0x08, 0x00, 0x12, encoded_type_ref(target)]))
        });
        let attr_value_blob = self.company.as_ref().map(|company| {
            let mut value = vec![0x01, 0x00];
            push_compressed(&mut value, company.len() as u32);
            value.extend_from_slice(company.as_bytes());
            value.extend_from_slice(&[0x00, 0x00]); // no named arguments
            blobs.add(&value)
        });

        // Row counts drive the valid mask and the member list layout.
        let type_def_count: u32 = if nested.is_some() { 3 } else { 2 };
        let field_count = fields.len() as u32;
        let method_count = methods.len() as u32;

        let mut tables = Vec::new();
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        counts.insert(0x00, 1);
        if !type_refs.is_empty() {
            counts.insert(0x01, type_refs.len() as u32);
        }
        counts.insert(0x02, type_def_count);
        if field_count > 0 {
            counts.insert(0x04, field_count);
        }
        if method_count > 0 {
            counts.insert(0x06, method_count);
        }
        if !member_refs.is_empty() {
            counts.insert(0x0A, member_refs.len() as u32);
        }
        if attr_ctor_row.is_some() {
            counts.insert(0x0C, 1);
        }
        if !stand_alone_sigs.is_empty() {
            counts.insert(0x11, stand_alone_sigs.len() as u32);
        }
        if event_names.is_some() {
            counts.insert(0x12, 1);
            counts.insert(0x14, 1);
        }
        if property_blob.is_some() {
            counts.insert(0x15, 1);
            counts.insert(0x17, 1);
            counts.insert(0x18, 1);
        }
        counts.insert(0x20, 1);
        if !assembly_ref_rows.is_empty() {
            counts.insert(0x23, assembly_ref_rows.len() as u32);
        }
        if nested.is_some() {
            counts.insert(0x29, 1);
        }

        // Module.
        put_u16(&mut tables, 0);
        put_u16(&mut tables, module_name);
        put_u16(&mut tables, 0); // mvid
        put_u16(&mut tables, 0);
        put_u16(&mut tables, 0);
        // TypeRef.
        for &(scope_row, name, namespace) in &type_refs {
            put_u16(&mut tables, coded(2, scope_row, 2)); // ResolutionScope: AssemblyRef
            put_u16(&mut tables, name);
            put_u16(&mut tables, namespace);
        }
        // TypeDef: <Module>, Carrier, then the nested type. Field and
        // method lists are ascending range starts.
        let rows = [
            (0u32, module_type_name, 0u32, 1u32, 1u32),
            (0x0010_0001, carrier_name, carrier_namespace, 1, 1),
            (0x0010_0002, nested.unwrap_or(0), 0, carrier_field_count + 1, method_count + 1),
        ];
        for &(flags, name, namespace, field_list, method_list) in
            rows.iter().take(type_def_count as usize)
        {
            put_u32(&mut tables, flags);
            put_u16(&mut tables, name);
            put_u16(&mut tables, namespace);
            put_u16(&mut tables, 0); // extends
            put_u16(&mut tables, field_list);
            put_u16(&mut tables, method_list);
        }
        // Field.
        for &(name, signature) in &fields {
            put_u16(&mut tables, 0x0006);
            put_u16(&mut tables, name);
            put_u16(&mut tables, signature);
        }
        // MethodDef.
        for method in &methods {
            put_u32(&mut tables, method.rva);
            put_u16(&mut tables, 0); // impl flags
            put_u16(&mut tables, 0x0096);
            put_u16(&mut tables, method.name);
            put_u16(&mut tables, method.signature);
            put_u16(&mut tables, 1); // param list
        }
        // MemberRef.
        for &(class, name, signature) in &member_refs {
            put_u16(&mut tables, class);
            put_u16(&mut tables, name);
            put_u16(&mut tables, signature);
        }
        // CustomAttribute.
        if let (Some(ctor_row), Some(value)) = (attr_ctor_row, attr_value_blob) {
            put_u16(&mut tables, coded(14, 1, 5)); // HasCustomAttribute: Assembly
            put_u16(&mut tables, coded(3, ctor_row, 3)); // CustomAttributeType: MemberRef
            put_u16(&mut tables, value);
        }
        // StandAloneSig.
        for &signature in &stand_alone_sigs {
            put_u16(&mut tables, signature);
        }
        // EventMap and Event.
        if let Some((name, event_type)) = event_names {
            put_u16(&mut tables, 2); // carrier TypeDef
            put_u16(&mut tables, 1);
            put_u16(&mut tables, 0);
            put_u16(&mut tables, name);
            put_u16(&mut tables, event_type);
        }
        // PropertyMap, Property, MethodSemantics.
        if let Some((name, signature)) = property_blob {
            put_u16(&mut tables, 2);
            put_u16(&mut tables, 1);
            put_u16(&mut tables, 0);
            put_u16(&mut tables, name);
            put_u16(&mut tables, signature);
            put_u16(&mut tables, 0x0002); // getter
            put_u16(&mut tables, getter_row.unwrap_or(1));
            put_u16(&mut tables, coded(1, 1, 1)); // HasSemantics: Property
        }
        // Assembly.
        put_u32(&mut tables, 0x8004); // SHA-1
        put_u16(&mut tables, u32::from(self.version.0));
        put_u16(&mut tables, u32::from(self.version.1));
        put_u16(&mut tables, u32::from(self.version.2));
        put_u16(&mut tables, u32::from(self.version.3));
        put_u32(&mut tables, if self.public_key.is_empty() { 0 } else { 1 });
        put_u16(&mut tables, public_key_blob);
        put_u16(&mut tables, assembly_name);
        put_u16(&mut tables, culture_name);
        // AssemblyRef.
        for &name in &assembly_ref_rows {
            put_u16(&mut tables, 4);
            put_u16(&mut tables, 0);
            put_u16(&mut tables, 0);
            put_u16(&mut tables, 0);
            put_u32(&mut tables, 0);
            put_u16(&mut tables, 0); // public key or token
            put_u16(&mut tables, name);
            put_u16(&mut tables, 0); // culture
            put_u16(&mut tables, 0); // hash
        }
        // NestedClass.
        if nested.is_some() {
            put_u16(&mut tables, 3);
            put_u16(&mut tables, 2);
        }

        let metadata = metadata_root(&counts, &tables, &strings.bytes, &blobs.bytes);
        let section = section_content(&bodies.bytes, &metadata);
        emit_pe(&section, SECTION_RVA, COR20_SIZE)
    }
}

#[derive(Debug, Clone, Copy)]
struct MethodDecl {
    name: u32,
    rva: u32,
    signature: u32,
}

/// A PE image with no CLR data directory at all.
pub fn native_stub() -> Vec<u8> {
    emit_pe(&[0xC3, 0x00, 0x00, 0x00], 0, 0)
}

/// A PE image whose CLR header points at bytes that are not metadata.
pub fn corrupt_metadata_stub() -> Vec<u8> {
    let mut section = Vec::new();
    push_cor20(&mut section, SECTION_RVA + COR20_SIZE, 64);
    section.extend_from_slice(&[0xDE; 64]);
    emit_pe(&section, SECTION_RVA, COR20_SIZE)
}

/// Collects method bodies, handing out the RVA of each.
struct BodyArea {
    bytes: Vec<u8>,
}

impl BodyArea {
    fn new() -> BodyArea {
        BodyArea { bytes: Vec::new() }
    }

    fn align(&mut self) -> u32 {
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        SECTION_RVA + COR20_SIZE + self.bytes.len() as u32
    }

    fn push_tiny(&mut self, code: &[u8]) -> u32 {
        let rva = self.align();
        self.bytes.push((code.len() as u8) << 2 | 0x2);
        self.bytes.extend_from_slice(code);
        rva
    }

    fn push_fat(&mut self, code: &[u8], local_sig_token: u32) -> u32 {
        let rva = self.align();
        self.bytes.extend_from_slice(&0x3013u16.to_le_bytes()); // fat, init locals, 3 dwords
        self.bytes.extend_from_slice(&8u16.to_le_bytes()); // max stack
        self.bytes.extend_from_slice(&(code.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(&local_sig_token.to_le_bytes());
        self.bytes.extend_from_slice(code);
        rva
    }

    fn push_raw(&mut self, body: &[u8]) -> u32 {
        let rva = self.align();
        self.bytes.extend_from_slice(body);
        rva
    }
}

struct StringHeap {
    bytes: Vec<u8>,
    seen: BTreeMap<String, u32>,
}

impl StringHeap {
    fn new() -> StringHeap {
        StringHeap { bytes: vec![0], seen: BTreeMap::new() }
    }

    fn add(&mut self, value: &str) -> u32 {
        if value.is_empty() {
            return 0;
        }
        if let Some(&at) = self.seen.get(value) {
            return at;
        }
        let at = self.bytes.len() as u32;
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        self.seen.insert(value.to_string(), at);
        at
    }
}

struct BlobHeap {
    bytes: Vec<u8>,
}

impl BlobHeap {
    fn new() -> BlobHeap {
        BlobHeap { bytes: vec![0] }
    }

    fn add(&mut self, value: &[u8]) -> u32 {
        if value.is_empty() {
            return 0;
        }
        let at = self.bytes.len() as u32;
        push_compressed(&mut self.bytes, value.len() as u32);
        self.bytes.extend_from_slice(value);
        at
    }
}

fn push_compressed(out: &mut Vec<u8>, value: u32) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(0x80 | (value >> 8) as u8);
        out.push(value as u8);
    } else {
        out.push(0xC0 | (value >> 24) as u8);
        out.push((value >> 16) as u8);
        out.push((value >> 8) as u8);
        out.push(value as u8);
    }
}

/// TypeDefOrRefEncoded for a declared type reference (tag 1).
fn encoded_type_ref(index: TypeIndex) -> u8 {
    ((index as u8 + 1) << 2) | 1
}

fn coded(tag: u32, row: u32, bits: u32) -> u32 {
    (row << bits) | tag
}

fn put_u16(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&(value as u16).to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn align_to(bytes: &mut Vec<u8>, alignment: usize) {
    while bytes.len() % alignment != 0 {
        bytes.push(0);
    }
}

/// Assemble the metadata root: BSJB header, stream directory, `#~`,
/// `#Strings` and `#Blob`.
fn metadata_root(
    counts: &BTreeMap<usize, u32>,
    rows: &[u8],
    strings: &[u8],
    blobs: &[u8],
) -> Vec<u8> {
    let mut tables = Vec::new();
    put_u32(&mut tables, 0); // reserved
    tables.push(2); // major
    tables.push(0); // minor
    tables.push(0); // heap sizes: all narrow
    tables.push(1); // reserved
    let valid: u64 = counts.keys().fold(0, |mask, &table| mask | 1 << table);
    let sorted: u64 = (1 << 0x0C) | (1 << 0x18) | (1 << 0x29);
    tables.extend_from_slice(&valid.to_le_bytes());
    tables.extend_from_slice(&sorted.to_le_bytes());
    for &count in counts.values() {
        put_u32(&mut tables, count);
    }
    tables.extend_from_slice(rows);
    align_to(&mut tables, 4);

    let mut strings = strings.to_vec();
    align_to(&mut strings, 4);
    let mut blobs = blobs.to_vec();
    align_to(&mut blobs, 4);

    // Root header: 32 bytes fixed, then three stream headers of 12, 20
    // and 16 bytes.
    let header_len = 32 + 12 + 20 + 16;
    let mut out = Vec::new();
    put_u32(&mut out, 0x424A_5342);
    put_u16(&mut out, 1); // major
    put_u16(&mut out, 1); // minor
    put_u32(&mut out, 0);
    put_u32(&mut out, 12); // version string length
    out.extend_from_slice(b"v4.0.30319\0\0");
    put_u16(&mut out, 0); // flags
    put_u16(&mut out, 3); // stream count

    let tables_offset = header_len;
    let strings_offset = tables_offset + tables.len();
    let blobs_offset = strings_offset + strings.len();
    put_u32(&mut out, tables_offset as u32);
    put_u32(&mut out, tables.len() as u32);
    out.extend_from_slice(b"#~\0\0");
    put_u32(&mut out, strings_offset as u32);
    put_u32(&mut out, strings.len() as u32);
    out.extend_from_slice(b"#Strings\0\0\0\0");
    put_u32(&mut out, blobs_offset as u32);
    put_u32(&mut out, blobs.len() as u32);
    out.extend_from_slice(b"#Blob\0\0\0");

    out.extend_from_slice(&tables);
    out.extend_from_slice(&strings);
    out.extend_from_slice(&blobs);
    out
}

/// CLR header, bodies, then metadata, with the header patched to point at
/// the metadata.
fn section_content(bodies: &[u8], metadata: &[u8]) -> Vec<u8> {
    let mut section = Vec::new();
    let mut body_area = bodies.to_vec();
    align_to(&mut body_area, 4);
    let metadata_rva = SECTION_RVA + COR20_SIZE + body_area.len() as u32;
    push_cor20(&mut section, metadata_rva, metadata.len() as u32);
    section.extend_from_slice(&body_area);
    section.extend_from_slice(metadata);
    section
}

fn push_cor20(out: &mut Vec<u8>, metadata_rva: u32, metadata_size: u32) {
    put_u32(out, COR20_SIZE);
    put_u16(out, 2); // runtime major
    put_u16(out, 5); // runtime minor
    put_u32(out, metadata_rva);
    put_u32(out, metadata_size);
    put_u32(out, 1); // IL-only
    put_u32(out, 0); // entry point
    for _ in 0..12 {
        put_u32(out, 0); // resources through managed native header
    }
}

/// Wrap section content in a PE32 image with one `.text` section and the
/// CLR data directory pointing where told.
fn emit_pe(section: &[u8], clr_rva: u32, clr_size: u32) -> Vec<u8> {
    let virtual_size = section.len() as u32;
    let raw_size = virtual_size.div_ceil(SECTION_FILE_OFFSET) * SECTION_FILE_OFFSET;
    let image_size = (SECTION_RVA + virtual_size.max(1)).div_ceil(0x2000) * 0x2000;

    let mut out = Vec::new();
    // DOS header: magic and the offset of the PE signature.
    out.extend_from_slice(b"MZ");
    out.resize(0x3C, 0);
    put_u32(&mut out, 0x80);
    out.resize(0x80, 0);
    out.extend_from_slice(b"PE\0\0");
    // COFF header.
    put_u16(&mut out, 0x014C); // i386
    put_u16(&mut out, 1); // one section
    put_u32(&mut out, 0); // timestamp
    put_u32(&mut out, 0); // symbol table
    put_u32(&mut out, 0); // symbol count
    put_u16(&mut out, 0xE0); // optional header size
    put_u16(&mut out, 0x2102); // executable, 32-bit, dll
    // Optional header, PE32.
    put_u16(&mut out, 0x10B);
    out.push(8); // linker major
    out.push(0);
    put_u32(&mut out, raw_size); // size of code
    put_u32(&mut out, 0);
    put_u32(&mut out, 0);
    put_u32(&mut out, 0); // entry point
    put_u32(&mut out, SECTION_RVA); // base of code
    put_u32(&mut out, 0); // base of data
    put_u32(&mut out, 0x0040_0000); // image base
    put_u32(&mut out, 0x2000); // section alignment
    put_u32(&mut out, SECTION_FILE_OFFSET); // file alignment
    put_u16(&mut out, 4); // os major
    put_u16(&mut out, 0);
    put_u16(&mut out, 0); // image version
    put_u16(&mut out, 0);
    put_u16(&mut out, 4); // subsystem major
    put_u16(&mut out, 0);
    put_u32(&mut out, 0); // win32 version
    put_u32(&mut out, image_size);
    put_u32(&mut out, SECTION_FILE_OFFSET); // size of headers
    put_u32(&mut out, 0); // checksum
    put_u16(&mut out, 3); // console subsystem
    put_u16(&mut out, 0x0540); // nx, dynamic base, no seh
    put_u32(&mut out, 0x0010_0000); // stack reserve
    put_u32(&mut out, 0x1000);
    put_u32(&mut out, 0x0010_0000); // heap reserve
    put_u32(&mut out, 0x1000);
    put_u32(&mut out, 0); // loader flags
    put_u32(&mut out, 16); // data directory count
    for directory in 0..16 {
        if directory == 14 {
            put_u32(&mut out, clr_rva);
            put_u32(&mut out, clr_size);
        } else {
            put_u32(&mut out, 0);
            put_u32(&mut out, 0);
        }
    }
    // Section table.
    out.extend_from_slice(b".text\0\0\0");
    put_u32(&mut out, virtual_size);
    put_u32(&mut out, SECTION_RVA);
    put_u32(&mut out, raw_size);
    put_u32(&mut out, SECTION_FILE_OFFSET);
    put_u32(&mut out, 0); // relocations
    put_u32(&mut out, 0); // line numbers
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);
    put_u32(&mut out, 0x6000_0020); // code, readable, executable

    out.resize(SECTION_FILE_OFFSET as usize, 0);
    out.extend_from_slice(section);
    align_to(&mut out, SECTION_FILE_OFFSET as usize);
    out
}
