use std::fs;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use stylc::{compile_file, MemoryModuleLoader, OsFileSystem, Stylable, StylableConfig};
use tempfile::TempDir;

#[test]
fn test_on_disk_cache_invalidation() {
    let dir = TempDir::new().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let comp = root.join("comp.st.css");
    let entry = root.join("entry.st.css");
    fs::write(&comp, ".root {}\n.icon {}").unwrap();
    fs::write(
        &entry,
        ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; }\nComp::icon {}",
    )
    .unwrap();

    let config = StylableConfig {
        namespace_hash: false,
        ..Default::default()
    };
    let stylable = Stylable::new(Rc::new(OsFileSystem), Rc::new(MemoryModuleLoader::new()), config);

    let first = stylable.process(&comp).unwrap();
    let again = stylable.process(&comp).unwrap();
    assert!(Rc::ptr_eq(&first, &again));

    let result = stylable.transform_file(&entry).unwrap();
    assert!(result.ast.to_string().contains(".entry--root .comp--root .comp--icon {}"));

    // outlast coarse modification-time resolution
    thread::sleep(Duration::from_millis(1100));
    fs::write(&comp, "@namespace \"Renamed\";\n.root {}\n.icon {}").unwrap();

    let changed = stylable.process(&comp).unwrap();
    assert!(!Rc::ptr_eq(&first, &changed));
    assert_eq!(changed.namespace, "Renamed");

    let result = stylable.transform_file(&entry).unwrap();
    assert!(result.ast.to_string().contains(".entry--root .Renamed--root .Renamed--icon {}"));
}

#[test]
fn test_compile_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("button.st.css");
    fs::write(&input, ".root { -st-states: on; }\n.root:on { color: red; }\n.label { -st-extends: Nope; }").unwrap();

    let result = compile_file(&input, StylableConfig::default()).unwrap();
    let namespace = &result.meta.namespace;
    assert!(namespace.starts_with("button"));
    assert_eq!(namespace.len(), "button".len() + 6);
    assert!(result
        .ast
        .to_string()
        .contains(&format!(".{ns}--root[data-{ns}-on]", ns = namespace)));
    assert!(result.diagnostics.has_errors());
}
