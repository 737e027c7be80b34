//! ECMA-335 backend.
//!
//! [`CilSource`] opens Windows PE images with goblin, reads the CLR
//! metadata streams with the in-crate readers, and exposes each file as a
//! [`LoadedAssembly`]: identity from the Assembly table, company from the
//! assembly-level AssemblyCompanyAttribute, a walkable surface built from
//! the definition tables, and per-slot resolution that follows resolution
//! scopes to sibling files in the scanned directory.

mod body;
mod heaps;
mod pe;
mod read;
mod sig;
mod tables;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::debug;

use crate::identity::AssemblyId;
use crate::metadata::{
    AssemblySource, AssemblySurface, BodySurface, FieldSurface, LoadError, LoadedAssembly,
    MethodSurface, ModuleSurface, OperandRef, ParamSurface, PropertySurface, ResolveError,
    ResolvedType, TypeSlot, TypeSurface,
};

use self::tables::{CodedIndex, Tables};

/// Nested-type recursion guard; compilers stay far below this.
const MAX_NEST_DEPTH: u32 = 64;
/// TypeSpec and enclosing-type chains are finite in valid images; this
/// bounds the malformed ones.
const MAX_RESOLVE_DEPTH: u32 = 64;

/// Reads ECMA-335 assemblies from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct CilSource;

impl AssemblySource for CilSource {
    fn load(&self, path: &Path) -> Result<Box<dyn LoadedAssembly>, LoadError> {
        Ok(Box::new(CilAssembly::open(path)?))
    }

    fn name(&self) -> &'static str {
        "cil"
    }
}

/// One opened assembly plus a cache of the sibling files its references
/// have been resolved against.
struct CilAssembly {
    id: AssemblyId,
    company: Option<String>,
    surface: AssemblySurface,
    image: Image,
    base_dir: PathBuf,
    siblings: RefCell<BTreeMap<String, SiblingEntry>>,
}

#[derive(Debug, Clone)]
enum SiblingEntry {
    Resolved { id: AssemblyId, company: Option<String> },
    Missing,
    Failed(String),
}

impl CilAssembly {
    fn open(path: &Path) -> Result<CilAssembly, LoadError> {
        let bytes =
            fs::read(path).map_err(|err| LoadError::Failed(format!("read failed: {err}")))?;
        let image = Image::parse(bytes)?;
        let id = image_identity(&image)?;
        let company = image_company(&image);
        let surface = build_surface(&image);
        let base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(CilAssembly {
            id,
            company,
            surface,
            image,
            base_dir,
            siblings: RefCell::new(BTreeMap::new()),
        })
    }

    fn resolve_slot(&self, slot: TypeSlot, depth: u32) -> Result<ResolvedType, ResolveError> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(ResolveError::Malformed("resolution chain too deep".into()));
        }
        let row = tables::token_row(slot.0);
        match tables::token_table(slot.0) {
            tables::TYPE_DEF => Ok(self.self_resolution()),
            tables::TYPE_REF => self.resolve_type_ref(row, depth),
            tables::TYPE_SPEC => {
                let spec = row_index(row)
                    .and_then(|index| self.image.tables.type_spec.get(index))
                    .ok_or_else(|| {
                        ResolveError::Malformed(format!("TypeSpec row {row} out of range"))
                    })?;
                let blob = self.image.blob(spec.signature).ok_or_else(|| {
                    ResolveError::Malformed("TypeSpec signature unreadable".into())
                })?;
                let inner = sig::type_spec(blob).ok_or_else(|| {
                    ResolveError::Malformed("TypeSpec has no underlying type".into())
                })?;
                self.resolve_slot(TypeSlot(inner), depth + 1)
            }
            _ => Err(ResolveError::Malformed(format!("token 0x{:08X} is not a type", slot.0))),
        }
    }

    fn resolve_type_ref(&self, row: u32, depth: u32) -> Result<ResolvedType, ResolveError> {
        let type_ref = row_index(row)
            .and_then(|index| self.image.tables.type_ref.get(index))
            .ok_or_else(|| ResolveError::Malformed(format!("TypeRef row {row} out of range")))?;
        let scope = type_ref.scope;
        if scope.is_null() {
            return Err(ResolveError::Malformed("null resolution scope".into()));
        }
        match scope.table {
            // Types in this module, or in another module of this assembly.
            tables::MODULE | tables::MODULE_REF => Ok(self.self_resolution()),
            // Nested references: the enclosing TypeRef carries the scope.
            tables::TYPE_REF => {
                self.resolve_slot(TypeSlot(tables::token(tables::TYPE_REF, scope.row)), depth + 1)
            }
            tables::ASSEMBLY_REF => self.resolve_assembly_ref(scope.row),
            _ => Err(ResolveError::Malformed(format!(
                "unsupported resolution scope table 0x{:02X}",
                scope.table
            ))),
        }
    }

    fn resolve_assembly_ref(&self, row: u32) -> Result<ResolvedType, ResolveError> {
        let reference = row_index(row)
            .and_then(|index| self.image.tables.assembly_ref.get(index))
            .ok_or_else(|| {
                ResolveError::Malformed(format!("AssemblyRef row {row} out of range"))
            })?;
        let name = self
            .image
            .string(reference.name)
            .ok_or_else(|| ResolveError::Malformed("AssemblyRef name unreadable".into()))?;
        let mut cache = self.siblings.borrow_mut();
        let entry = cache
            .entry(name.to_lowercase())
            .or_insert_with(|| load_sibling(&self.base_dir, name));
        match entry {
            SiblingEntry::Resolved { id, company } => {
                Ok(ResolvedType { assembly: id.clone(), company: company.clone() })
            }
            SiblingEntry::Missing => Err(ResolveError::AssemblyNotFound(name.to_string())),
            SiblingEntry::Failed(message) => {
                Err(ResolveError::AssemblyLoad { name: name.to_string(), message: message.clone() })
            }
        }
    }

    fn self_resolution(&self) -> ResolvedType {
        ResolvedType { assembly: self.id.clone(), company: self.company.clone() }
    }
}

impl LoadedAssembly for CilAssembly {
    fn id(&self) -> &AssemblyId {
        &self.id
    }

    fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    fn surface(&self) -> &AssemblySurface {
        &self.surface
    }

    fn resolve(&self, slot: TypeSlot) -> Result<ResolvedType, ResolveError> {
        self.resolve_slot(slot, 0)
    }
}

/// Identify a referenced assembly by probing the scan directory for
/// `Name.dll`/`Name.exe`. Only the manifest is of interest; the sibling's
/// own references are left to its own scan.
fn load_sibling(base_dir: &Path, name: &str) -> SiblingEntry {
    let Some(path) = find_sibling(base_dir, name) else {
        return SiblingEntry::Missing;
    };
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => return SiblingEntry::Failed(format!("read failed: {err}")),
    };
    let image = match Image::parse(bytes) {
        Ok(image) => image,
        Err(err) => return SiblingEntry::Failed(err.to_string()),
    };
    match image_identity(&image) {
        Ok(id) => SiblingEntry::Resolved { id, company: image_company(&image) },
        Err(err) => SiblingEntry::Failed(err.to_string()),
    }
}

fn find_sibling(base_dir: &Path, name: &str) -> Option<PathBuf> {
    for ext in ["dll", "exe"] {
        let candidate = base_dir.join(format!("{name}.{ext}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    // Case-sensitive filesystems still need to find `foo.DLL`.
    let wanted_dll = format!("{name}.dll").to_lowercase();
    let wanted_exe = format!("{name}.exe").to_lowercase();
    for entry in fs::read_dir(base_dir).ok()?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let lower = file_name.to_lowercase();
        if lower == wanted_dll || lower == wanted_exe {
            return Some(path);
        }
    }
    None
}

/// Parsed image: file bytes plus the heap spans and tables carved out of
/// them.
struct Image {
    bytes: Vec<u8>,
    sections: Vec<pe::SectionSpan>,
    strings: pe::Span,
    blobs: pe::Span,
    tables: Tables,
}

impl Image {
    fn parse(bytes: Vec<u8>) -> Result<Image, LoadError> {
        let layout = pe::parse_layout(&bytes)?;
        let metadata = layout
            .metadata
            .slice(&bytes)
            .ok_or_else(|| LoadError::Failed("metadata span out of bounds".into()))?;
        let dir = heaps::parse_streams(metadata)?;
        let stream = dir
            .tables
            .slice(metadata)
            .ok_or_else(|| LoadError::Failed("table stream out of bounds".into()))?;
        let parsed = Tables::parse(stream)?;
        // Stream spans come back relative to the metadata root.
        let rebase = |span: pe::Span| pe::Span {
            offset: layout.metadata.offset + span.offset,
            len: span.len,
        };
        Ok(Image {
            bytes,
            sections: layout.sections,
            strings: rebase(dir.strings),
            blobs: rebase(dir.blobs),
            tables: parsed,
        })
    }

    fn string(&self, index: u32) -> Option<&str> {
        heaps::heap_string(self.strings.slice(&self.bytes)?, index)
    }

    fn blob(&self, index: u32) -> Option<&[u8]> {
        heaps::heap_blob(self.blobs.slice(&self.bytes)?, index)
    }

    fn body_bytes(&self, rva: u32) -> Option<&[u8]> {
        let offset = pe::rva_to_offset(&self.sections, rva)?;
        self.bytes.get(offset..)
    }
}

/// Display identity from the Assembly manifest row:
/// `Name, Version=a.b.c.d, Culture=x, PublicKeyToken=y`.
fn image_identity(image: &Image) -> Result<AssemblyId, LoadError> {
    let Some(row) = image.tables.assembly.first() else {
        return Err(LoadError::Failed("no assembly manifest".into()));
    };
    let name = image
        .string(row.name)
        .ok_or_else(|| LoadError::Failed("assembly name unreadable".into()))?;
    let culture = image.string(row.culture).unwrap_or("");
    let culture = if culture.is_empty() { "neutral" } else { culture };
    let token = match image.blob(row.public_key) {
        Some(key) if !key.is_empty() => public_key_token(key),
        _ => "null".to_string(),
    };
    Ok(AssemblyId::new(format!(
        "{name}, Version={}.{}.{}.{}, Culture={culture}, PublicKeyToken={token}",
        row.major, row.minor, row.build, row.revision
    )))
}

/// A public key token is the low eight bytes of the key's SHA-1, reversed,
/// in lowercase hex.
fn public_key_token(key: &[u8]) -> String {
    let digest = Sha1::digest(key);
    digest[12..20].iter().rev().map(|byte| format!("{byte:02x}")).collect()
}

/// Value of the first assembly-level attribute whose type is named
/// `AssemblyCompanyAttribute`, decoded as a string argument. The match is
/// by simple name, whatever the namespace.
fn image_company(image: &Image) -> Option<String> {
    let parent = CodedIndex { table: tables::ASSEMBLY, row: 1 };
    let attr = image.tables.custom_attribute.iter().find(|attr| {
        attr.parent == parent
            && attribute_type_name(image, attr.ctor) == Some("AssemblyCompanyAttribute")
    })?;
    sig::attribute_string_arg(image.blob(attr.value)?)
}

/// Simple name of the type declaring a CustomAttribute constructor.
fn attribute_type_name(image: &Image, ctor: CodedIndex) -> Option<&str> {
    let t = &image.tables;
    match ctor.table {
        tables::METHOD_DEF => {
            let owner = t.method_owner(ctor.row)?;
            image.string(t.type_def.get(owner as usize - 1)?.name)
        }
        tables::MEMBER_REF => {
            let member = t.member_ref.get(row_index(ctor.row)?)?;
            match member.class.table {
                tables::TYPE_DEF => image.string(t.type_def.get(row_index(member.class.row)?)?.name),
                tables::TYPE_REF => image.string(t.type_ref.get(row_index(member.class.row)?)?.name),
                _ => None,
            }
        }
        _ => None,
    }
}

/// The attribute's own type, as a slot the walker can resolve.
fn attribute_slot(image: &Image, ctor: CodedIndex) -> Option<TypeSlot> {
    match ctor.table {
        tables::METHOD_DEF => {
            let owner = image.tables.method_owner(ctor.row)?;
            Some(TypeSlot(tables::token(tables::TYPE_DEF, owner)))
        }
        tables::MEMBER_REF => {
            let member = image.tables.member_ref.get(row_index(ctor.row)?)?;
            slot_from_coded(member.class)
        }
        _ => None,
    }
}

/// Slot for a coded index that names a type, if it does.
fn slot_from_coded(coded: CodedIndex) -> Option<TypeSlot> {
    if coded.is_null() {
        return None;
    }
    match coded.table {
        tables::TYPE_DEF | tables::TYPE_REF | tables::TYPE_SPEC => {
            Some(TypeSlot(tables::token(coded.table, coded.row)))
        }
        _ => None,
    }
}

fn row_index(row: u32) -> Option<usize> {
    (row as usize).checked_sub(1)
}

fn build_surface(image: &Image) -> AssemblySurface {
    let cx = SurfaceCx::new(image);
    let mut types = Vec::new();
    for row in 1..=image.tables.type_def.len() as u32 {
        if cx.nested_rows.contains(&row) {
            continue;
        }
        types.push(cx.build_type(row, 0));
    }
    AssemblySurface {
        attributes: cx.attrs_for(tables::ASSEMBLY, 1),
        modules: vec![ModuleSurface { attributes: cx.attrs_for(tables::MODULE, 1), types }],
    }
}

/// Precomputed lookups shared across the surface build.
struct SurfaceCx<'a> {
    image: &'a Image,
    /// Attribute type slots grouped by parent row.
    attrs: BTreeMap<(usize, u32), Vec<TypeSlot>>,
    /// Enclosing TypeDef row to its nested rows, plus the set of all rows
    /// that are nested somewhere.
    nested_children: BTreeMap<u32, Vec<u32>>,
    nested_rows: std::collections::BTreeSet<u32>,
    /// TypeDef row to EventMap/PropertyMap entry index.
    event_maps: BTreeMap<u32, usize>,
    property_maps: BTreeMap<u32, usize>,
    /// Property row to its accessor MethodDef rows.
    accessors: BTreeMap<u32, Vec<u32>>,
}

impl<'a> SurfaceCx<'a> {
    fn new(image: &'a Image) -> SurfaceCx<'a> {
        let t = &image.tables;

        let mut attrs: BTreeMap<(usize, u32), Vec<TypeSlot>> = BTreeMap::new();
        for attr in &t.custom_attribute {
            if attr.parent.is_null() {
                continue;
            }
            let Some(slot) = attribute_slot(image, attr.ctor) else { continue };
            attrs.entry((attr.parent.table, attr.parent.row)).or_default().push(slot);
        }

        let total_types = t.type_def.len() as u32;
        let mut nested_children: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        let mut nested_rows = std::collections::BTreeSet::new();
        for entry in &t.nested_class {
            if entry.nested == 0 || entry.nested > total_types {
                continue;
            }
            nested_children.entry(entry.enclosing).or_default().push(entry.nested);
            nested_rows.insert(entry.nested);
        }

        let mut event_maps = BTreeMap::new();
        for (index, map) in t.event_map.iter().enumerate() {
            event_maps.entry(map.parent).or_insert(index);
        }
        let mut property_maps = BTreeMap::new();
        for (index, map) in t.property_map.iter().enumerate() {
            property_maps.entry(map.parent).or_insert(index);
        }

        let mut accessors: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for semantic in &t.method_semantics {
            if semantic.association.table != tables::PROPERTY || semantic.association.is_null() {
                continue;
            }
            // Setter, getter and other accessor bits.
            if semantic.semantics & 0x0007 == 0 {
                continue;
            }
            accessors.entry(semantic.association.row).or_default().push(semantic.method);
        }

        SurfaceCx {
            image,
            attrs,
            nested_children,
            nested_rows,
            event_maps,
            property_maps,
            accessors,
        }
    }

    fn attrs_for(&self, table: usize, row: u32) -> Vec<TypeSlot> {
        self.attrs.get(&(table, row)).cloned().unwrap_or_default()
    }

    fn build_type(&self, type_row: u32, depth: u32) -> TypeSurface {
        let t = &self.image.tables;
        let mut surface =
            TypeSurface { attributes: self.attrs_for(tables::TYPE_DEF, type_row), ..Default::default() };

        if let Some(&map_index) = self.event_maps.get(&type_row) {
            let (start, end) = t.event_range(map_index);
            for row in start..end {
                let Some(event) = row_index(row).and_then(|index| t.event.get(index)) else {
                    continue;
                };
                if let Some(slot) = slot_from_coded(event.event_type) {
                    surface.events.push(slot);
                }
            }
        }

        let (start, end) = t.field_range(type_row);
        for row in start..end {
            surface.fields.push(self.build_field(row));
        }

        if let Some(&map_index) = self.property_maps.get(&type_row) {
            let (start, end) = t.property_range(map_index);
            for row in start..end {
                surface.properties.push(self.build_property(row));
            }
        }

        let (start, end) = t.method_range(type_row);
        for row in start..end {
            surface.methods.push(self.build_method(row));
        }

        if let Some(children) = self.nested_children.get(&type_row) {
            if depth < MAX_NEST_DEPTH {
                for &child in children {
                    surface.nested.push(self.build_type(child, depth + 1));
                }
            } else {
                debug!(type_row, "nested type chain too deep, pruning");
            }
        }

        surface
    }

    fn build_field(&self, field_row: u32) -> FieldSurface {
        let field_type = row_index(field_row)
            .and_then(|index| self.image.tables.field.get(index))
            .and_then(|row| self.image.blob(row.signature))
            .and_then(sig::field_type)
            .map(TypeSlot);
        FieldSurface { attributes: self.attrs_for(tables::FIELD, field_row), field_type }
    }

    fn build_property(&self, property_row: u32) -> PropertySurface {
        let property_type = row_index(property_row)
            .and_then(|index| self.image.tables.property.get(index))
            .and_then(|row| self.image.blob(row.signature))
            .and_then(sig::property_type)
            .map(TypeSlot);
        let accessors = self
            .accessors
            .get(&property_row)
            .into_iter()
            .flatten()
            .map(|&method_row| self.build_method(method_row))
            .collect();
        PropertySurface {
            attributes: self.attrs_for(tables::PROPERTY, property_row),
            property_type,
            accessors,
        }
    }

    fn build_method(&self, method_row: u32) -> MethodSurface {
        let t = &self.image.tables;
        let Some(row) = row_index(method_row).and_then(|index| t.method_def.get(index)) else {
            return MethodSurface::default();
        };

        let types = self.image.blob(row.signature).and_then(sig::method_types).unwrap_or_default();
        let mut method = MethodSurface {
            attributes: self.attrs_for(tables::METHOD_DEF, method_row),
            return_type: types.return_type.map(TypeSlot),
            ..Default::default()
        };

        // One parameter per signature entry; Param rows attach attributes,
        // and sequence zero targets the return value.
        method.params = types
            .params
            .iter()
            .map(|ty| ParamSurface { attributes: Vec::new(), param_type: ty.map(TypeSlot) })
            .collect();
        let (start, end) = t.param_range(method_row);
        for param_row in start..end {
            let Some(param) = row_index(param_row).and_then(|index| t.param.get(index)) else {
                continue;
            };
            let attrs = self.attrs_for(tables::PARAM, param_row);
            if param.sequence == 0 {
                method.return_attributes.extend(attrs);
            } else if let Some(target) = method.params.get_mut(param.sequence as usize - 1) {
                target.attributes = attrs;
            }
        }

        if row.rva != 0 {
            method.body = self.build_body(row.rva);
        }
        method
    }

    fn build_body(&self, rva: u32) -> Option<BodySurface> {
        let bytes = self.image.body_bytes(rva)?;
        let Some(raw) = body::parse(bytes) else {
            debug!(rva, "method body unreadable, skipping");
            return None;
        };

        let mut surface = BodySurface::default();
        if raw.local_sig_token != 0 {
            let Some(locals) = self.local_slots(raw.local_sig_token) else {
                debug!(rva, "local variable signature unreadable, skipping body");
                return None;
            };
            surface.locals = locals;
        }
        for token in raw.tokens {
            match self.operand(token) {
                TokenUse::Walked(operand) => surface.operands.push(operand),
                TokenUse::Ignored => {}
                TokenUse::Malformed => {
                    debug!(rva, token, "unresolvable operand token, skipping body");
                    return None;
                }
            }
        }
        Some(surface)
    }

    fn local_slots(&self, token: u32) -> Option<Vec<TypeSlot>> {
        if tables::token_table(token) != tables::STAND_ALONE_SIG {
            return None;
        }
        let row = row_index(tables::token_row(token))
            .and_then(|index| self.image.tables.stand_alone_sig.get(index))?;
        let blob = self.image.blob(row.signature)?;
        Some(sig::local_types(blob)?.into_iter().flatten().map(TypeSlot).collect())
    }

    /// Classify an inline token the way the walk consumes operands: field
    /// and method definitions and method references are walked, type
    /// tokens and field references are not.
    fn operand(&self, token: u32) -> TokenUse {
        let t = &self.image.tables;
        let row = tables::token_row(token);
        match tables::token_table(token) {
            tables::FIELD => {
                let Some(field) = row_index(row).and_then(|index| t.field.get(index)) else {
                    return TokenUse::Malformed;
                };
                let field_type =
                    self.image.blob(field.signature).and_then(sig::field_type).map(TypeSlot);
                let declaring_type = t
                    .field_owner(row)
                    .map(|owner| TypeSlot(tables::token(tables::TYPE_DEF, owner)));
                TokenUse::Walked(OperandRef::Field { field_type, declaring_type })
            }
            tables::METHOD_DEF => self.method_def_operand(row),
            tables::MEMBER_REF => self.member_ref_operand(row),
            tables::METHOD_SPEC => {
                let Some(spec) = row_index(row).and_then(|index| t.method_spec.get(index)) else {
                    return TokenUse::Malformed;
                };
                if spec.method.is_null() {
                    return TokenUse::Malformed;
                }
                match spec.method.table {
                    tables::METHOD_DEF => self.method_def_operand(spec.method.row),
                    tables::MEMBER_REF => self.member_ref_operand(spec.method.row),
                    _ => TokenUse::Malformed,
                }
            }
            // ldtoken on a type names no member; nothing to walk.
            tables::TYPE_DEF | tables::TYPE_REF | tables::TYPE_SPEC => TokenUse::Ignored,
            _ => TokenUse::Malformed,
        }
    }

    fn method_def_operand(&self, row: u32) -> TokenUse {
        let t = &self.image.tables;
        let Some(method) = row_index(row).and_then(|index| t.method_def.get(index)) else {
            return TokenUse::Malformed;
        };
        let types = self.image.blob(method.signature).and_then(sig::method_types).unwrap_or_default();
        let declaring_type =
            t.method_owner(row).map(|owner| TypeSlot(tables::token(tables::TYPE_DEF, owner)));
        TokenUse::Walked(OperandRef::Method {
            return_type: types.return_type.map(TypeSlot),
            declaring_type,
        })
    }

    fn member_ref_operand(&self, row: u32) -> TokenUse {
        let t = &self.image.tables;
        let Some(member) = row_index(row).and_then(|index| t.member_ref.get(index)) else {
            return TokenUse::Malformed;
        };
        let Some(blob) = self.image.blob(member.signature) else {
            return TokenUse::Malformed;
        };
        match sig::member_sig(blob) {
            // A field reference is not a field definition; the walk skips
            // it, matching how operands are classified.
            Some(sig::MemberSig::Field { .. }) => TokenUse::Ignored,
            Some(sig::MemberSig::Method(method)) => {
                let declaring_type = self.member_parent_slot(member.class);
                TokenUse::Walked(OperandRef::Method {
                    return_type: method.return_type.map(TypeSlot),
                    declaring_type,
                })
            }
            None => TokenUse::Malformed,
        }
    }

    /// Declaring-type slot of a MemberRef parent. Module-scoped members
    /// have none.
    fn member_parent_slot(&self, class: CodedIndex) -> Option<TypeSlot> {
        if class.is_null() {
            return None;
        }
        match class.table {
            tables::TYPE_DEF | tables::TYPE_REF | tables::TYPE_SPEC => slot_from_coded(class),
            tables::METHOD_DEF => self
                .image
                .tables
                .method_owner(class.row)
                .map(|owner| TypeSlot(tables::token(tables::TYPE_DEF, owner))),
            _ => None,
        }
    }
}

enum TokenUse {
    Walked(OperandRef),
    Ignored,
    Malformed,
}
