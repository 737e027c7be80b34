use std::collections::BTreeMap;

use asmtree_core::graph::DependencyGraph;
use asmtree_core::identity::AssemblyId;
use asmtree_core::metadata::{
    AssemblySurface, BodySurface, FieldSurface, LoadedAssembly, MethodSurface, ModuleSurface,
    OperandRef, ParamSurface, PropertySurface, ResolveError, ResolvedType, TypeSlot, TypeSurface,
};
use asmtree_core::vendor::VendorFilter;
use asmtree_core::walker::ReferenceWalker;

/// Where a scripted slot resolves.
enum Target {
    /// Another assembly inside the vendor family.
    Vendor(String),
    /// Another assembly with a non-vendor company attribute.
    Outside(String),
    /// Another assembly with no company attribute at all.
    Unattributed(String),
    /// The assembly under analysis itself.
    SelfRef,
    /// Resolution fails.
    Fail,
}

/// A hand-scripted assembly: a fixed surface plus a slot-to-target table.
struct ScriptedAssembly {
    id: AssemblyId,
    surface: AssemblySurface,
    slots: BTreeMap<u32, Target>,
}

impl ScriptedAssembly {
    fn new(name: &str, surface: AssemblySurface, slots: BTreeMap<u32, Target>) -> Self {
        Self { id: AssemblyId::new(name), surface, slots }
    }
}

impl LoadedAssembly for ScriptedAssembly {
    fn id(&self) -> &AssemblyId {
        &self.id
    }

    fn company(&self) -> Option<&str> {
        Some("IQVIA Solutions")
    }

    fn surface(&self) -> &AssemblySurface {
        &self.surface
    }

    fn resolve(&self, slot: TypeSlot) -> Result<ResolvedType, ResolveError> {
        match self.slots.get(&slot.0) {
            Some(Target::Vendor(name)) => Ok(ResolvedType {
                assembly: AssemblyId::new(name.clone()),
                company: Some("IQVIA Solutions".to_string()),
            }),
            Some(Target::Outside(name)) => Ok(ResolvedType {
                assembly: AssemblyId::new(name.clone()),
                company: Some("Contoso".to_string()),
            }),
            Some(Target::Unattributed(name)) => {
                Ok(ResolvedType { assembly: AssemblyId::new(name.clone()), company: None })
            }
            Some(Target::SelfRef) => Ok(ResolvedType {
                assembly: self.id.clone(),
                company: Some("IQVIA Solutions".to_string()),
            }),
            Some(Target::Fail) | None => {
                Err(ResolveError::Malformed(format!("slot 0x{:08X}", slot.0)))
            }
        }
    }
}

fn walk(surface: AssemblySurface, slots: BTreeMap<u32, Target>) -> DependencyGraph {
    let assembly = ScriptedAssembly::new("App", surface, slots);
    let filter = VendorFilter::vendor_family();
    let walker = ReferenceWalker::new(&filter);
    let mut graph = DependencyGraph::new();
    walker.record_references(&assembly, &mut graph);
    graph
}

fn one_type(ty: TypeSurface) -> AssemblySurface {
    AssemblySurface {
        attributes: Vec::new(),
        modules: vec![ModuleSurface { attributes: Vec::new(), types: vec![ty] }],
    }
}

/// Every position of the surface contributes references: assembly, module
/// and member attributes, events, field types, property types, accessor and
/// method signatures, parameter types, body locals and body operands, plus
/// nested types.
#[test]
fn every_surface_position_is_visited() {
    let surface = AssemblySurface {
        attributes: vec![TypeSlot(1)],
        modules: vec![ModuleSurface {
            attributes: vec![TypeSlot(2)],
            types: vec![TypeSurface {
                attributes: vec![TypeSlot(3)],
                events: vec![TypeSlot(4)],
                fields: vec![FieldSurface {
                    attributes: vec![TypeSlot(5)],
                    field_type: Some(TypeSlot(6)),
                }],
                properties: vec![PropertySurface {
                    attributes: vec![TypeSlot(7)],
                    property_type: Some(TypeSlot(8)),
                    accessors: vec![MethodSurface {
                        return_type: Some(TypeSlot(9)),
                        ..Default::default()
                    }],
                }],
                methods: vec![MethodSurface {
                    attributes: vec![TypeSlot(10)],
                    return_attributes: vec![TypeSlot(11)],
                    return_type: Some(TypeSlot(12)),
                    params: vec![ParamSurface {
                        attributes: vec![TypeSlot(13)],
                        param_type: Some(TypeSlot(14)),
                    }],
                    body: Some(BodySurface {
                        locals: vec![TypeSlot(15)],
                        operands: vec![
                            OperandRef::Field {
                                field_type: Some(TypeSlot(16)),
                                declaring_type: Some(TypeSlot(17)),
                            },
                            OperandRef::Method {
                                return_type: Some(TypeSlot(18)),
                                declaring_type: Some(TypeSlot(19)),
                            },
                        ],
                    }),
                }],
                nested: vec![TypeSurface {
                    fields: vec![FieldSurface {
                        attributes: Vec::new(),
                        field_type: Some(TypeSlot(20)),
                    }],
                    ..Default::default()
                }],
            }],
        }],
    };

    let slots: BTreeMap<u32, Target> =
        (1..=20).map(|n| (n, Target::Vendor(format!("Dep{n:02}")))).collect();

    let graph = walk(surface, slots);
    assert_eq!(graph.edge_count(), 20);

    let targets: Vec<&str> =
        graph.neighbors(&AssemblyId::new("App")).map(AssemblyId::full_name).collect();
    let expected: Vec<String> = (1..=20).map(|n| format!("Dep{n:02}")).collect();
    assert_eq!(targets, expected);
}

#[test]
fn references_back_to_the_same_assembly_are_skipped() {
    let surface = one_type(TypeSurface {
        fields: vec![FieldSurface { attributes: Vec::new(), field_type: Some(TypeSlot(1)) }],
        ..Default::default()
    });
    let graph = walk(surface, BTreeMap::from([(1, Target::SelfRef)]));
    assert!(graph.is_empty());
}

#[test]
fn targets_outside_the_vendor_family_are_skipped() {
    let surface = one_type(TypeSurface {
        fields: vec![
            FieldSurface { attributes: Vec::new(), field_type: Some(TypeSlot(1)) },
            FieldSurface { attributes: Vec::new(), field_type: Some(TypeSlot(2)) },
            FieldSurface { attributes: Vec::new(), field_type: Some(TypeSlot(3)) },
        ],
        ..Default::default()
    });
    let slots = BTreeMap::from([
        (1, Target::Outside("ThirdParty".to_string())),
        (2, Target::Unattributed("Bare".to_string())),
        (3, Target::Vendor("Ours".to_string())),
    ]);

    let graph = walk(surface, slots);
    assert_eq!(graph.edge_count(), 1);
    assert!(graph.contains(&AssemblyId::new("App")));
    let targets: Vec<&str> =
        graph.neighbors(&AssemblyId::new("App")).map(AssemblyId::full_name).collect();
    assert_eq!(targets, vec!["Ours"]);
}

/// A failing resolution is scoped to its own slot; the rest of the surface
/// still contributes edges.
#[test]
fn resolution_failures_skip_only_that_reference() {
    let surface = one_type(TypeSurface {
        events: vec![TypeSlot(1), TypeSlot(2)],
        ..Default::default()
    });
    let slots =
        BTreeMap::from([(1, Target::Fail), (2, Target::Vendor("Handlers".to_string()))]);

    let graph = walk(surface, slots);
    assert_eq!(graph.edge_count(), 1);
    let targets: Vec<&str> =
        graph.neighbors(&AssemblyId::new("App")).map(AssemblyId::full_name).collect();
    assert_eq!(targets, vec!["Handlers"]);
}

#[test]
fn repeated_references_collapse_to_one_edge() {
    let surface = one_type(TypeSurface {
        events: vec![TypeSlot(1), TypeSlot(1)],
        fields: vec![FieldSurface { attributes: vec![TypeSlot(1)], field_type: Some(TypeSlot(1)) }],
        ..Default::default()
    });
    let graph = walk(surface, BTreeMap::from([(1, Target::Vendor("Shared".to_string()))]));
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn empty_surface_contributes_nothing() {
    let graph = walk(AssemblySurface::default(), BTreeMap::new());
    assert!(graph.is_empty());
}

#[test]
fn bodiless_methods_contribute_only_their_signature() {
    let surface = one_type(TypeSurface {
        methods: vec![MethodSurface {
            return_type: Some(TypeSlot(1)),
            body: None,
            ..Default::default()
        }],
        ..Default::default()
    });
    let graph = walk(surface, BTreeMap::from([(1, Target::Vendor("RetDep".to_string()))]));
    assert_eq!(graph.edge_count(), 1);
}

/// Several assemblies walked into the same graph accumulate edges the way
/// the scan pipeline does.
#[test]
fn multiple_assemblies_share_one_graph() {
    let filter = VendorFilter::vendor_family();
    let walker = ReferenceWalker::new(&filter);
    let mut graph = DependencyGraph::new();

    let first = ScriptedAssembly::new(
        "App",
        one_type(TypeSurface { events: vec![TypeSlot(1)], ..Default::default() }),
        BTreeMap::from([(1, Target::Vendor("Core".to_string()))]),
    );
    let second = ScriptedAssembly::new(
        "Core",
        one_type(TypeSurface { events: vec![TypeSlot(1)], ..Default::default() }),
        BTreeMap::from([(1, Target::Vendor("Util".to_string()))]),
    );

    walker.record_references(&first, &mut graph);
    walker.record_references(&second, &mut graph);

    assert_eq!(graph.edge_count(), 2);
    let roots = graph.roots();
    let names: Vec<&str> = roots.iter().map(AssemblyId::full_name).collect();
    assert_eq!(names, vec!["App"]);
}
