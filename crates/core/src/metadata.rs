//! The metadata oracle boundary.
//!
//! Everything the walker needs from an assembly file is expressed here as
//! plain data ([`AssemblySurface`] and friends) plus two traits: an
//! [`AssemblySource`] that loads files, and the [`LoadedAssembly`] it
//! produces, which can resolve type slots to their declaring assemblies.
//! The shipped implementation lives in [`crate::backends`]; tests substitute
//! scripted fakes.

use std::path::Path;

use thiserror::Error;

use crate::identity::AssemblyId;

/// Opaque handle to one type reference somewhere in an assembly's metadata.
///
/// Slots are only meaningful to the assembly that produced them; the walker
/// treats them as resolution keys and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeSlot(pub u32);

#[derive(Debug, Error)]
pub enum LoadError {
    /// The file is not a managed assembly at all (not a PE image, or a PE
    /// image without CLR metadata). Expected when scanning mixed
    /// directories; skipped without a diagnostic.
    #[error("not a managed assembly")]
    NotApplicable,
    /// The file looks managed but could not be loaded; reported once on the
    /// error stream and skipped.
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced assembly is not present next to the one under
    /// analysis.
    #[error("referenced assembly '{0}' not found")]
    AssemblyNotFound(String),
    /// The referenced assembly exists but failed to load.
    #[error("referenced assembly '{name}' failed to load: {message}")]
    AssemblyLoad { name: String, message: String },
    /// The slot or its resolution chain is not something a type reference
    /// can point at.
    #[error("malformed type reference: {0}")]
    Malformed(String),
}

/// Loads managed assemblies from disk.
pub trait AssemblySource {
    fn load(&self, path: &Path) -> Result<Box<dyn LoadedAssembly>, LoadError>;
    fn name(&self) -> &'static str;
}

/// One loaded assembly: its identity, its company attribute, the metadata
/// surface to walk, and per-slot resolution.
pub trait LoadedAssembly {
    fn id(&self) -> &AssemblyId;

    /// Text of the assembly's company attribute, if one is present and
    /// readable.
    fn company(&self) -> Option<&str>;

    fn surface(&self) -> &AssemblySurface;

    /// Resolve a type slot to the assembly that declares the referenced
    /// type. Failures are scoped to the single slot; the caller logs and
    /// moves on.
    fn resolve(&self, slot: TypeSlot) -> Result<ResolvedType, ResolveError>;
}

/// Declaring-assembly information for a resolved type slot.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub assembly: AssemblyId,
    /// Company attribute of the declaring assembly, used to decide whether
    /// the edge target is vendor-valid.
    pub company: Option<String>,
}

/// The full metadata surface of one assembly, shaped the way the walker
/// visits it. Attribute entries are the attribute's type slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblySurface {
    pub attributes: Vec<TypeSlot>,
    pub modules: Vec<ModuleSurface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSurface {
    pub attributes: Vec<TypeSlot>,
    /// Top-level types; nested types hang off their declaring type.
    pub types: Vec<TypeSurface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSurface {
    pub attributes: Vec<TypeSlot>,
    /// The handler type of each event declared on the type.
    pub events: Vec<TypeSlot>,
    pub fields: Vec<FieldSurface>,
    pub properties: Vec<PropertySurface>,
    pub methods: Vec<MethodSurface>,
    pub nested: Vec<TypeSurface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSurface {
    pub attributes: Vec<TypeSlot>,
    /// `None` when the field type carries no resolvable token (primitives
    /// and generic parameters).
    pub field_type: Option<TypeSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySurface {
    pub attributes: Vec<TypeSlot>,
    pub property_type: Option<TypeSlot>,
    /// Getter, setter and any other accessors, each visited as a full
    /// method. Accessors also appear in the type's method list; the edge
    /// set collapses the duplicate visit.
    pub accessors: Vec<MethodSurface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSurface {
    pub attributes: Vec<TypeSlot>,
    /// Attributes attached to the return value.
    pub return_attributes: Vec<TypeSlot>,
    pub return_type: Option<TypeSlot>,
    pub params: Vec<ParamSurface>,
    /// `None` for bodiless methods (abstract, extern) and for bodies that
    /// failed to decode.
    pub body: Option<BodySurface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSurface {
    pub attributes: Vec<TypeSlot>,
    pub param_type: Option<TypeSlot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodySurface {
    /// Declared types of the body's local variables.
    pub locals: Vec<TypeSlot>,
    /// Field and method operands of the body's instructions.
    pub operands: Vec<OperandRef>,
}

/// An instruction operand that references a field or a method, already
/// decomposed into the type slots the walker visits. The kind is decided at
/// the oracle boundary, never by inspecting operands downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRef {
    Field { field_type: Option<TypeSlot>, declaring_type: Option<TypeSlot> },
    Method { return_type: Option<TypeSlot>, declaring_type: Option<TypeSlot> },
}
