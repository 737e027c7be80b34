//! asmtree-core
//!
//! Core library for building dependency trees from managed (.NET) assemblies.
//!
//! The pipeline: load each input file through an [`metadata::AssemblySource`],
//! keep the assemblies whose company attribute matches the vendor family
//! ([`vendor::VendorFilter`]), walk every type reference reachable from each
//! kept assembly's metadata surface ([`walker::ReferenceWalker`]) into a
//! [`graph::DependencyGraph`], then derive roots and build one renderable
//! [`tree::TreeNode`] per root.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends.

pub mod backends;
pub mod graph;
pub mod identity;
pub mod metadata;
pub mod render;
pub mod scan;
pub mod synth;
pub mod tree;
pub mod vendor;
pub mod walker;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
