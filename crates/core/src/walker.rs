//! Reference walking: metadata surface to graph edges.

use tracing::debug;

use crate::graph::DependencyGraph;
use crate::metadata::{LoadedAssembly, MethodSurface, OperandRef, TypeSlot, TypeSurface};
use crate::vendor::VendorFilter;

/// Walks one loaded assembly's full metadata surface and records a
/// dependency edge for every type reference that resolves into a different,
/// vendor-valid assembly.
///
/// Resolution failures are scoped to the single reference being resolved:
/// they are logged at debug level and the walk continues.
pub struct ReferenceWalker<'a> {
    filter: &'a VendorFilter,
}

impl<'a> ReferenceWalker<'a> {
    pub fn new(filter: &'a VendorFilter) -> Self {
        Self { filter }
    }

    /// Visit everything in `assembly`'s surface, adding edges to `graph`.
    pub fn record_references(&self, assembly: &dyn LoadedAssembly, graph: &mut DependencyGraph) {
        let surface = assembly.surface();

        self.check_slots(assembly, &surface.attributes, graph);
        for module in &surface.modules {
            self.check_slots(assembly, &module.attributes, graph);
            for ty in &module.types {
                self.check_type(assembly, ty, graph);
            }
        }
    }

    fn check_type(&self, assembly: &dyn LoadedAssembly, ty: &TypeSurface, graph: &mut DependencyGraph) {
        self.check_slots(assembly, &ty.attributes, graph);
        self.check_slots(assembly, &ty.events, graph);

        for nested in &ty.nested {
            self.check_type(assembly, nested, graph);
        }

        for field in &ty.fields {
            self.check_slots(assembly, &field.attributes, graph);
            self.check_slot_opt(assembly, field.field_type, graph);
        }

        for property in &ty.properties {
            self.check_slots(assembly, &property.attributes, graph);
            self.check_slot_opt(assembly, property.property_type, graph);
            for accessor in &property.accessors {
                self.check_method(assembly, accessor, graph);
            }
        }

        for method in &ty.methods {
            self.check_method(assembly, method, graph);
        }
    }

    fn check_method(&self, assembly: &dyn LoadedAssembly, method: &MethodSurface, graph: &mut DependencyGraph) {
        self.check_slots(assembly, &method.attributes, graph);
        self.check_slots(assembly, &method.return_attributes, graph);
        self.check_slot_opt(assembly, method.return_type, graph);

        for param in &method.params {
            self.check_slots(assembly, &param.attributes, graph);
            self.check_slot_opt(assembly, param.param_type, graph);
        }

        let Some(body) = &method.body else { return };
        self.check_slots(assembly, &body.locals, graph);
        for operand in &body.operands {
            match *operand {
                OperandRef::Field { field_type, declaring_type } => {
                    self.check_slot_opt(assembly, field_type, graph);
                    self.check_slot_opt(assembly, declaring_type, graph);
                }
                OperandRef::Method { return_type, declaring_type } => {
                    self.check_slot_opt(assembly, return_type, graph);
                    self.check_slot_opt(assembly, declaring_type, graph);
                }
            }
        }
    }

    fn check_slots(&self, assembly: &dyn LoadedAssembly, slots: &[TypeSlot], graph: &mut DependencyGraph) {
        for &slot in slots {
            self.check_slot(assembly, slot, graph);
        }
    }

    fn check_slot_opt(&self, assembly: &dyn LoadedAssembly, slot: Option<TypeSlot>, graph: &mut DependencyGraph) {
        if let Some(slot) = slot {
            self.check_slot(assembly, slot, graph);
        }
    }

    /// Resolve one slot; record an edge if it lands in a different,
    /// vendor-valid assembly.
    fn check_slot(&self, assembly: &dyn LoadedAssembly, slot: TypeSlot, graph: &mut DependencyGraph) {
        let resolved = match assembly.resolve(slot) {
            Ok(resolved) => resolved,
            Err(err) => {
                debug!(assembly = %assembly.id(), slot = slot.0, "reference skipped: {err}");
                return;
            }
        };

        if resolved.assembly == *assembly.id() {
            return;
        }
        if !self.filter.is_valid(resolved.company.as_deref()) {
            return;
        }
        graph.add_edge(assembly.id().clone(), resolved.assembly);
    }
}
