#![cfg(feature = "cil-backend")]

use std::path::{Path, PathBuf};

use asmtree_core::backends::CilSource;
use asmtree_core::graph::DependencyGraph;
use asmtree_core::identity::AssemblyId;
use asmtree_core::metadata::{
    AssemblySource, LoadError, LoadedAssembly, OperandRef, ResolveError, TypeSlot,
};
use asmtree_core::render::render_forest;
use asmtree_core::scan::{scan_files, FileStatus};
use asmtree_core::synth::{self, AssemblyBuilder};
use asmtree_core::tree::build_forest;
use asmtree_core::vendor::VendorFilter;
use asmtree_core::walker::ReferenceWalker;
use tempfile::tempdir;

/// Full name of the standard sibling fixture.
const LIB: &str = "Lib, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null";

/// Token of the first declared type reference.
const FIRST_TYPE_REF: TypeSlot = TypeSlot(0x0100_0001);

fn write_lib(dir: &Path, name: &str, company: Option<&str>) {
    let mut builder = AssemblyBuilder::new(name);
    if let Some(company) = company {
        builder = builder.company(company);
    }
    builder.write_to(&dir.join(format!("{name}.dll"))).expect("write sibling fixture");
}

fn load(path: &Path) -> Box<dyn LoadedAssembly> {
    CilSource.load(path).expect("load fixture")
}

fn edges_of(assembly: &dyn LoadedAssembly) -> Vec<String> {
    let filter = VendorFilter::vendor_family();
    let walker = ReferenceWalker::new(&filter);
    let mut graph = DependencyGraph::new();
    walker.record_references(assembly, &mut graph);
    graph.neighbors(assembly.id()).map(|id| id.full_name().to_string()).collect()
}

/// An app fixture with one reference to `Lib` and one type in it, ready for
/// member declarations.
fn vendor_app() -> AssemblyBuilder {
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("Lib")
        .type_ref(0, "Lib.Types", "Widget")
}

#[test]
fn identity_formats_the_manifest_row() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("Fixture.dll");
    AssemblyBuilder::new("Fixture").version(2, 3, 4, 5).write_to(&path).expect("write fixture");

    let assembly = load(&path);
    assert_eq!(
        assembly.id().full_name(),
        "Fixture, Version=2.3.4.5, Culture=neutral, PublicKeyToken=null"
    );
    assert_eq!(assembly.id().display_label(), "Fixture");
}

#[test]
fn identity_includes_culture_and_key_token() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("Signed.dll");
    AssemblyBuilder::new("Signed")
        .culture("en-US")
        .public_key(b"0123456789abcdef")
        .write_to(&path)
        .expect("write fixture");

    let assembly = load(&path);
    assert_eq!(
        assembly.id().full_name(),
        "Signed, Version=1.0.0.0, Culture=en-US, PublicKeyToken=298eff6db14bd769"
    );
}

#[test]
fn company_attribute_is_read_by_name() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("Branded.dll");
    AssemblyBuilder::new("Branded").company("IQVIA Inc").write_to(&path).expect("write fixture");

    let assembly = load(&path);
    assert_eq!(assembly.company(), Some("IQVIA Inc"));
}

#[test]
fn assemblies_without_company_report_none() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("Plain.dll");
    AssemblyBuilder::new("Plain").write_to(&path).expect("write fixture");

    assert_eq!(load(&path).company(), None);
}

#[test]
fn native_images_are_not_applicable() {
    let dir = tempdir().expect("tempdir");
    let native = dir.path().join("native.dll");
    std::fs::write(&native, synth::native_stub()).expect("write native stub");
    let junk = dir.path().join("junk.dll");
    std::fs::write(&junk, b"definitely not a pe image").expect("write junk");

    assert!(matches!(CilSource.load(&native), Err(LoadError::NotApplicable)));
    assert!(matches!(CilSource.load(&junk), Err(LoadError::NotApplicable)));
}

#[test]
fn corrupt_metadata_reports_a_load_failure() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("Broken.dll");
    std::fs::write(&path, synth::corrupt_metadata_stub()).expect("write corrupt stub");

    match CilSource.load(&path) {
        Err(LoadError::Failed(message)) => assert_eq!(message, "metadata signature mismatch"),
        other => panic!("expected a load failure, got {:?}", other.map(|a| a.id().clone())),
    }
}

#[test]
fn field_types_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().field_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn property_types_and_getters_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().property_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    assert_eq!(carrier.properties.len(), 1);
    assert_eq!(carrier.properties[0].property_type, Some(FIRST_TYPE_REF));
    assert_eq!(carrier.properties[0].accessors.len(), 1, "getter should attach to the property");
    assert_eq!(carrier.properties[0].accessors[0].return_type, Some(FIRST_TYPE_REF));

    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn event_handler_types_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().event_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    assert_eq!(carrier.events, vec![FIRST_TYPE_REF]);
    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn nested_type_members_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().nested_field_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    assert!(carrier.fields.is_empty(), "the field belongs to the nested type");
    assert_eq!(carrier.nested.len(), 1);
    assert_eq!(carrier.nested[0].fields.len(), 1);
    assert_eq!(carrier.nested[0].fields[0].field_type, Some(FIRST_TYPE_REF));

    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn call_operands_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().body_call(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    let body = carrier.methods[0].body.as_ref().expect("call method should have a body");
    assert_eq!(
        body.operands,
        vec![OperandRef::Method { return_type: None, declaring_type: Some(FIRST_TYPE_REF) }]
    );

    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn local_variable_types_link_assemblies() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app().local_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    let body = carrier.methods[0].body.as_ref().expect("fat body should decode");
    assert_eq!(body.locals, vec![FIRST_TYPE_REF]);

    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn members_referencing_one_assembly_collapse_to_one_edge() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    vendor_app()
        .field_of(0)
        .property_of(0)
        .event_of(0)
        .nested_field_of(0)
        .body_call(0)
        .local_of(0)
        .write_to(&path)
        .expect("write app");

    let assembly = load(&path);
    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn distinct_references_fan_out() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "LibA", Some("IMS Health"));
    write_lib(dir.path(), "LibB", Some("Cegedim Group"));
    let path = dir.path().join("App.dll");
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("LibA")
        .assembly_ref("LibB")
        .type_ref(0, "A", "Alpha")
        .type_ref(1, "B", "Beta")
        .field_of(0)
        .field_of(1)
        .write_to(&path)
        .expect("write app");

    let assembly = load(&path);
    assert_eq!(
        edges_of(assembly.as_ref()),
        vec![
            "LibA, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null".to_string(),
            "LibB, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null".to_string(),
        ]
    );
}

#[test]
fn missing_sibling_reports_not_found() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("App.dll");
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("Ghost")
        .type_ref(0, "G", "Gone")
        .field_of(0)
        .write_to(&path)
        .expect("write app");

    let assembly = load(&path);
    match assembly.resolve(FIRST_TYPE_REF) {
        Err(ResolveError::AssemblyNotFound(name)) => assert_eq!(name, "Ghost"),
        other => panic!("expected a not-found error, got {other:?}"),
    }
    assert!(edges_of(assembly.as_ref()).is_empty(), "unresolved references add no edges");
}

#[test]
fn broken_sibling_reports_load_failure() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("Lib.dll"), b"junk bytes").expect("write junk sibling");
    let path = dir.path().join("App.dll");
    vendor_app().field_of(0).write_to(&path).expect("write app");

    let assembly = load(&path);
    match assembly.resolve(FIRST_TYPE_REF) {
        Err(ResolveError::AssemblyLoad { name, message }) => {
            assert_eq!(name, "Lib");
            assert_eq!(message, "not a managed assembly");
        }
        other => panic!("expected a sibling load error, got {other:?}"),
    }
    assert!(edges_of(assembly.as_ref()).is_empty());
}

#[test]
fn sibling_probe_is_case_insensitive() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    let path = dir.path().join("App.dll");
    AssemblyBuilder::new("App")
        .company("IQVIA Solutions")
        .assembly_ref("LIB")
        .type_ref(0, "Lib.Types", "Widget")
        .field_of(0)
        .write_to(&path)
        .expect("write app");

    // The file on disk is `Lib.dll`; the reference says `LIB`. The edge
    // carries the identity from the sibling's own manifest.
    let assembly = load(&path);
    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn type_def_tokens_resolve_to_the_assembly_itself() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("App.dll");
    AssemblyBuilder::new("App").company("IQVIA Solutions").write_to(&path).expect("write app");

    let assembly = load(&path);
    // TypeDef row 2 is the carrier type.
    let resolved = assembly.resolve(TypeSlot(0x0200_0002)).expect("self resolution");
    assert_eq!(&resolved.assembly, assembly.id());
    assert_eq!(resolved.company.as_deref(), Some("IQVIA Solutions"));
}

/// A switch operand's jump table must be stepped over exactly, or every
/// token after it is misread.
#[test]
fn switch_operands_are_stepped_over() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));

    // switch (2 targets), call MemberRef #1, ret
    let mut code = vec![0x45, 0x02, 0x00, 0x00, 0x00];
    code.extend_from_slice(&[0x05, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00]);
    code.extend_from_slice(&[0x28, 0x01, 0x00, 0x00, 0x0A]);
    code.push(0x2A);
    let mut body = vec![(code.len() as u8) << 2 | 0x2];
    body.extend_from_slice(&code);

    let path = dir.path().join("App.dll");
    vendor_app().body_call(0).raw_body(body).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    let raw_method = carrier.methods[1].body.as_ref().expect("switch body should decode");
    assert_eq!(
        raw_method.operands,
        vec![OperandRef::Method { return_type: None, declaring_type: Some(FIRST_TYPE_REF) }]
    );
}

/// An opcode outside the instruction set drops that body alone; the file
/// still loads and other bodies still contribute.
#[test]
fn unknown_opcode_drops_only_that_body() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));

    let code = [0x24, 0x2A];
    let mut body = vec![(code.len() as u8) << 2 | 0x2];
    body.extend_from_slice(&code);

    let path = dir.path().join("App.dll");
    vendor_app().body_call(0).raw_body(body).write_to(&path).expect("write app");

    let assembly = load(&path);
    let carrier = &assembly.surface().modules[0].types[1];
    assert!(carrier.methods[0].body.is_some(), "the ordinary call body still decodes");
    assert!(carrier.methods[1].body.is_none(), "the undecodable body is dropped");
    assert_eq!(edges_of(assembly.as_ref()), vec![LIB.to_string()]);
}

#[test]
fn scan_reports_statuses_and_builds_the_tree() {
    let dir = tempdir().expect("tempdir");
    write_lib(dir.path(), "Lib", Some("IQVIA Solutions"));
    write_lib(dir.path(), "Other", Some("Contoso"));
    vendor_app().field_of(0).write_to(&dir.path().join("App.dll")).expect("write app");
    std::fs::write(dir.path().join("native.dll"), synth::native_stub()).expect("write native");
    std::fs::write(dir.path().join("Broken.dll"), synth::corrupt_metadata_stub())
        .expect("write corrupt");

    let files: Vec<PathBuf> = ["App.dll", "Broken.dll", "Lib.dll", "Other.dll", "native.dll"]
        .iter()
        .map(|name| dir.path().join(name))
        .collect();

    let outcome = scan_files(&CilSource, &VendorFilter::vendor_family(), &files);

    let statuses: Vec<&FileStatus> = outcome.reports.iter().map(|r| &r.status).collect();
    assert_eq!(
        statuses[0],
        &FileStatus::Analyzed {
            id: AssemblyId::new("App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"),
        }
    );
    assert_eq!(
        statuses[1],
        &FileStatus::LoadFailed { message: "metadata signature mismatch".to_string() }
    );
    assert_eq!(statuses[2], &FileStatus::Analyzed { id: AssemblyId::new(LIB) });
    assert_eq!(
        statuses[3],
        &FileStatus::NotVendor {
            id: AssemblyId::new("Other, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null"),
        }
    );
    assert_eq!(statuses[4], &FileStatus::NotManaged);

    let forest = build_forest(&outcome.graph);
    assert_eq!(render_forest(&forest), "App\n└── Lib\n");
}
