use std::rc::Rc;
use stylc::ast::CssNode;
use stylc::script::{MemoryModuleLoader, ScriptModule, ScriptReturn, ScriptValue};
use stylc::{MemoryFileSystem, Stylable, StylableConfig, TransformResult};

fn stylable(files: &[(&str, &str)], loader: MemoryModuleLoader) -> Stylable {
    let fs = MemoryFileSystem::new();
    for (path, content) in files {
        fs.add(*path, *content);
    }
    let config = StylableConfig {
        namespace_hash: false,
        ..Default::default()
    };
    Stylable::new(Rc::new(fs), Rc::new(loader), config)
}

fn transform(files: &[(&str, &str)]) -> TransformResult {
    stylable(files, MemoryModuleLoader::new())
        .transform_file("/p/entry.st.css")
        .unwrap()
}

/// Top-level rule selectors in output order
fn selectors(result: &TransformResult) -> Vec<String> {
    result
        .ast
        .nodes
        .iter()
        .filter_map(|node| match node {
            CssNode::Rule(rule) => Some(rule.selector.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_plain_class_scoping() {
    let result = transform(&[("/p/entry.st.css", ".item {}\n.item:hover {}")]);
    assert_eq!(
        selectors(&result),
        vec![".entry--root .entry--item", ".entry--root .entry--item:hover"]
    );
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_root_is_not_prefixed_twice() {
    let result = transform(&[("/p/entry.st.css", ".root {}\n.root .x {}\n.root > .y {}\n:global(.body) .z {}")]);
    assert_eq!(
        selectors(&result),
        vec![
            ".entry--root",
            ".entry--root .entry--x",
            ".entry--root > .entry--y",
            ".body .entry--z",
        ]
    );
}

#[test]
fn test_global_root_prefix() {
    let result = transform(&[("/p/entry.st.css", ".root { -st-global: \".app\"; }\n.x {}")]);
    assert_eq!(selectors(&result), vec![".app", ".app .entry--x"]);
    assert_eq!(result.exports.classes["root"], "app");
}

#[test]
fn test_pseudo_element_through_default_import() {
    let result = transform(&[
        ("/p/comp.st.css", ".root {}\n.icon {}\n.root > .icon {}"),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; }\nComp::icon { color: blue; }",
        ),
    ]);
    assert_eq!(selectors(&result), vec![".entry--root .comp--root .comp--icon"]);
}

#[test]
fn test_pseudo_element_custom_selector() {
    let result = transform(&[
        (
            "/p/comp.st.css",
            "@custom-selector :--icon .root > .icon;\n.root {}\n.icon {}\n.root > .icon {}",
        ),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; }\nComp::icon { color: blue; }",
        ),
    ]);
    assert_eq!(selectors(&result), vec![".entry--root .comp--root > .comp--icon"]);
}

#[test]
fn test_pseudo_element_macro_with_alternatives() {
    let result = transform(&[
        ("/p/comp.st.css", "@custom-selector :--part .a, .b;\n.a {}\n.b {}"),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./comp.st.css\"; -st-default: Comp; }\nComp::part {}",
        ),
    ]);
    assert_eq!(
        selectors(&result),
        vec![".entry--root .comp--root .comp--a, .entry--root .comp--root .comp--b"]
    );
}

#[test]
fn test_pseudo_element_through_extends() {
    let result = transform(&[
        ("/p/base.st.css", ".root {}\n.label {}"),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./base.st.css\"; -st-default: Base; }\n.btn { -st-extends: Base; }\n.btn::label {}",
        ),
    ]);
    assert_eq!(selectors(&result)[1], ".entry--root .entry--btn .base--label");
    assert_eq!(result.exports.classes["btn"], "entry--btn");
}

#[test]
fn test_custom_selector_odometer() {
    let result = transform(&[(
        "/p/entry.st.css",
        "@custom-selector :--ab .a, .b;\n:--ab :--ab {}",
    )]);
    assert_eq!(
        selectors(&result),
        vec![
            ".entry--root .entry--a .entry--a, .entry--root .entry--a .entry--b, \
             .entry--root .entry--b .entry--a, .entry--root .entry--b .entry--b"
        ]
    );
}

#[test]
fn test_boolean_state_namespace_is_lowercased() {
    let result = transform(&[(
        "/p/entry.st.css",
        "@namespace \"MyComp\";\n.a { -st-states: disabled; }\n.a:disabled {}",
    )]);
    assert_eq!(selectors(&result)[1], ".MyComp--root .MyComp--a[data-mycomp-disabled]");
}

#[test]
fn test_typed_state() {
    let result = transform(&[(
        "/p/entry.st.css",
        ".a { -st-states: size(enum); }\n.a:size(\"big\") {}\n.a:size {}",
    )]);
    let selectors = selectors(&result);
    assert_eq!(selectors[1], ".entry--root .entry--a[data-entry-size=\"big\"]");
    assert_eq!(selectors[2], ".entry--root .entry--a[data-entry-size]");
    assert_eq!(result.diagnostics.matching("expects a enum argument").len(), 1);
}

#[test]
fn test_unknown_extends_reports_once() {
    let result = transform(&[("/p/entry.st.css", ".a { -st-extends: Missing; }\n.a {}\n.a:hover {}")]);
    assert_eq!(
        selectors(&result),
        vec![
            ".entry--root .entry--a",
            ".entry--root .entry--a",
            ".entry--root .entry--a:hover",
        ]
    );
    assert_eq!(result.diagnostics.matching("Missing").len(), 1);
}

#[test]
fn test_import_chain_lands_on_same_class() {
    let base = ("/p/base.st.css", ".x { color: red; }");
    let one = (
        "/p/one.st.css",
        ":import { -st-from: \"./base.st.css\"; -st-named: x; }",
    );
    let two = (
        "/p/two.st.css",
        ":import { -st-from: \"./one.st.css\"; -st-named: x; }",
    );
    let direct = transform(&[
        base,
        ("/p/entry.st.css", ":import { -st-from: \"./base.st.css\"; -st-named: x; }\n.x {}"),
    ]);
    let chained = transform(&[
        base,
        one,
        two,
        ("/p/entry.st.css", ":import { -st-from: \"./two.st.css\"; -st-named: x; }\n.x {}"),
    ]);

    assert_eq!(selectors(&direct), vec![".entry--root .base--x"]);
    assert_eq!(selectors(&direct), selectors(&chained));
    assert_eq!(direct.exports.classes["x"], chained.exports.classes["x"]);
}

#[test]
fn test_import_cycle_terminates() {
    let result = transform(&[
        ("/p/other.st.css", ":import { -st-from: \"./entry.st.css\"; -st-named: x; }"),
        ("/p/entry.st.css", ":import { -st-from: \"./other.st.css\"; -st-named: x; }\n.x {}"),
    ]);
    assert_eq!(selectors(&result), vec![".entry--root .entry--x"]);
    assert_eq!(result.diagnostics.matching("cannot resolve imported class").len(), 1);
}

#[test]
fn test_cyclic_var_falls_back() {
    let result = transform(&[(
        "/p/entry.st.css",
        ":vars { a: value(b); b: value(a); }\n.x { color: value(a); }",
    )]);
    let css = result.ast.to_string();
    assert!(css.contains("color: value(a);"));
    assert!(!result.diagnostics.matching("cyclic value definition detected").is_empty());
}

#[test]
fn test_imported_vars_and_keyframes() {
    let result = transform(&[
        (
            "/p/theme.st.css",
            ":vars { brand: purple; }\n@keyframes slide { from { left: 0; } }",
        ),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./theme.st.css\"; -st-named: brand, keyframes(slide); }\n.x { color: value(brand); animation-name: slide; }",
        ),
    ]);
    let css = result.ast.to_string();
    assert!(css.contains("color: purple;"));
    assert!(css.contains("animation-name: theme--slide;"));
}

#[test]
fn test_formatter() {
    let mut loader = MemoryModuleLoader::new();
    loader.register(
        "/p/format.js",
        ScriptModule::new().with_named(
            "px",
            ScriptValue::function(|args| Ok(ScriptReturn::Text(format!("{}px", args.join(""))))),
        ),
    );
    let result = stylable(
        &[(
            "/p/entry.st.css",
            ":import { -st-from: \"./format.js\"; -st-named: px; }\n:vars { size: 4; }\n.x { width: px(value(size)); }",
        )],
        loader,
    )
    .transform_file("/p/entry.st.css")
    .unwrap();
    assert!(result.ast.to_string().contains("width: 4px;"));
}

#[test]
fn test_exports() {
    let result = transform(&[
        ("/p/base.st.css", ".base {}"),
        (
            "/p/entry.st.css",
            ":import { -st-from: \"./base.st.css\"; -st-named: base; }\n:vars { gap: 2px; }\n.btn { -st-extends: base; }\n.plain {}\n@keyframes fade {}",
        ),
    ]);
    let exports = &result.exports;
    assert_eq!(exports.root, "entry--root");
    assert_eq!(exports.classes["btn"], "entry--btn base--base");
    assert_eq!(exports.classes["plain"], "entry--plain");
    assert_eq!(exports.vars["gap"], "2px");
    assert_eq!(exports.keyframes["fade"], "entry--fade");

    let json = serde_json::to_value(exports).unwrap();
    assert_eq!(json["classes"]["plain"], "entry--plain");
}

#[test]
fn test_directives_do_not_reach_output() {
    let result = transform(&[(
        "/p/entry.st.css",
        "@namespace \"Entry\";\n:vars { a: 1px; }\n@custom-selector :--x .x;\n.x { -st-states: on; margin: value(a); }",
    )]);
    let css = result.ast.to_string();
    assert!(!css.contains("@namespace"));
    assert!(!css.contains(":vars"));
    assert!(!css.contains("@custom-selector"));
    assert!(!css.contains("-st-"));
    assert!(css.contains("margin: 1px;"));
}

#[test]
fn test_circular_custom_selectors_expand_the_same_in_any_order() {
    let macros = "@custom-selector :--a :--b .x;\n@custom-selector :--b :--a .y;\n";
    let forward_source = format!("{}:--a, :--b {{}}", macros);
    let backward_source = format!("{}:--b, :--a {{}}", macros);
    let forward = transform(&[("/p/entry.st.css", forward_source.as_str())]);
    let backward = transform(&[("/p/entry.st.css", backward_source.as_str())]);

    assert_eq!(
        selectors(&forward),
        vec![".entry--root :--a .entry--y .entry--x, .entry--root :--b .entry--x .entry--y"]
    );
    assert_eq!(
        selectors(&backward),
        vec![".entry--root :--b .entry--x .entry--y, .entry--root :--a .entry--y .entry--x"]
    );
    assert_eq!(forward.diagnostics.matching("circular custom selector").len(), 2);
    assert_eq!(backward.diagnostics.matching("circular custom selector").len(), 2);
}

#[test]
fn test_nested_rules_are_not_root_prefixed() {
    let result = transform(&[("/p/entry.st.css", ".a { color: red; .b { color: blue; } &:hover {} }")]);
    let outer = result
        .ast
        .nodes
        .iter()
        .find_map(|node| match node {
            CssNode::Rule(rule) => Some(rule),
            _ => None,
        })
        .unwrap();
    assert_eq!(outer.selector, ".entry--root .entry--a");

    let nested: Vec<&str> = outer
        .nodes
        .iter()
        .filter_map(|node| match node {
            CssNode::Rule(rule) => Some(rule.selector.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(nested, vec![".entry--b", "&:hover"]);
}
