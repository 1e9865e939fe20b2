//! Transformation performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::fs;
use std::rc::Rc;
use stylc::custom_selector::CustomSelectorExpander;
use stylc::*;
use tempfile::TempDir;

fn bench_custom_selector_expansion(c: &mut Criterion) {
    let macros: HashMap<String, String> = [
        (":--controls", ".button, .input, .select"),
        (":--states", ":hover, :focus, :active"),
        (":--nested", ":--controls:--states"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let list = parse_selector(":--nested :--controls > :--nested").unwrap();
    let location = SourceLocation::new("/bench.st.css", 1);

    c.bench_function("custom_selector_expansion", |b| {
        b.iter(|| {
            let mut diagnostics = Diagnostics::new();
            CustomSelectorExpander::new(&macros).expand_list(black_box(&list), &location, &mut diagnostics)
        })
    });
}

fn bench_full_transform(c: &mut Criterion) {
    let fs = MemoryFileSystem::new();
    fs.add(
        "/bench/base.st.css",
        ":vars { color: red; }\n.root { -st-states: active; }\n.label { color: value(color); }\n.label:hover { color: blue; }",
    );

    let mut entry = String::from(":import { -st-from: \"./base.st.css\"; -st-default: Base; -st-named: label; }\n");
    for i in 0..200 {
        entry.push_str(&format!(
            ".item{i} {{ -st-extends: Base; -st-mixin: label; }}\n.item{i}:active::label {{ margin: {i}px; }}\n"
        ));
    }
    fs.add("/bench/entry.st.css", entry);

    let stylable = Stylable::new(Rc::new(fs), Rc::new(MemoryModuleLoader::new()), StylableConfig::default());
    let meta = stylable.process("/bench/entry.st.css").unwrap();

    c.bench_function("full_transform", |b| b.iter(|| stylable.transform(black_box(&meta)).unwrap()));
}

fn bench_compile_from_disk(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("large.st.css");

    let mut content = String::from(":vars { gap: 4px; }\n@keyframes spin { from { opacity: 0; } }\n");
    for i in 0..1000 {
        content.push_str(&format!(".c{i} {{ margin: value(gap); animation: spin 1s; }}\n"));
    }
    fs::write(&input_path, content).unwrap();

    c.bench_function("compile_large_file", |b| {
        b.iter(|| compile_file(black_box(&input_path), StylableConfig::default()).unwrap())
    });
}

criterion_group!(
    benches,
    bench_custom_selector_expansion,
    bench_full_transform,
    bench_compile_from_disk
);
criterion_main!(benches);
