// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use chartopts::*;
use serde_json::json;
use std::path::Path as FsPath;
use test_generator::test_resources;

const FIXTURES: &str = "tests/fixtures";

// tests/fixtures/series/pie/error-01.js is checked against `series.pie`.
fn root_for(path: &FsPath) -> Result<String> {
    let dir = match path.strip_prefix(FIXTURES)?.parent() {
        Some(dir) => dir,
        None => bail!("fixture {path:?} is not inside a definition directory"),
    };
    let segments: Vec<_> = dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Ok(segments.join("."))
}

fn check_fixture(file: &str) -> Result<Vec<Diagnostic>> {
    let path = FsPath::new(file);
    let root = root_for(path)?;
    let text = std::fs::read_to_string(path)?;
    let checker = Checker::with_builtin_schemas()?;
    Ok(checker.check(&root, file, &text)?)
}

fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.to_string()).collect()
}

fn fixture_test(file: &str) -> Result<()> {
    let diagnostics = check_fixture(file)?;
    let expect_errors = FsPath::new(file)
        .file_name()
        .map(|name| name.to_string_lossy().starts_with("error-"))
        .unwrap_or(false);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();

    match (expect_errors, errors) {
        (true, 0) => bail!("{file}: expected at least one error"),
        (false, n) if n > 0 => bail!(
            "{file}: unexpected errors\n{}",
            messages(&diagnostics).join("\n")
        ),
        _ => Ok(()),
    }
}

#[test_resources("tests/fixtures/**/*.js")]
fn fixture(path: &str) {
    if let Err(e) = fixture_test(path) {
        panic!("{}", e);
    }
}

#[test]
fn pie_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/series/pie/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 3:5 ('data[0]'): expected number or pie point, got string",
            "error at 155:22 ('ignoreHiddenPoint'): expected boolean, got identifier `True`",
            "error at 156:14 ('innerSize'): expected number or percentage string, got string",
        ]
    );
    Ok(())
}

#[test]
fn arcdiagram_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/series/arcdiagram/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "warning at 14:8 ('data[0].color'): duplicate key 'color' overrides the value defined at 4:8",
            "warning at 43:8 ('data[1].color'): duplicate key 'color' overrides the value defined at 33:8",
            "error at 62:15 ('linkWeight'): expected number, got string",
            "error at 97:11 ('offset'): expected number or percentage string, got string",
        ]
    );
    Ok(())
}

#[test]
fn drilldown_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/drilldown/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 2:27 ('activeAxisLabelStyle'): expected object, got string",
            "error at 17:17 ('breadcrumbs.floating'): expected boolean, got identifier `True`",
            "error at 21:12 ('breadcrumbs.rtl'): expected boolean, got identifier `False`",
            "error at 28:16 ('breadcrumbs.useHTML'): expected boolean, got identifier `False`",
        ]
    );
    Ok(())
}

#[test]
fn navigation_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/navigation/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            r#"error at 3:12 ('buttonOptions.align'): value "middle" is not in allowed enum values: ["left","center","right"]"#,
            "error at 4:14 ('buttonOptions.enabled'): expected boolean, got string",
            "error at 6:3 ('iconsUrl'): unknown property 'iconsUrl'",
        ]
    );
    Ok(())
}

#[test]
fn map_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/series/map/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 2:13 ('allAreas'): expected boolean, got string",
            "error at 3:16 ('borderWidth'): value -1 is out of range: must be at least 0",
            "error at 5:5 ('data[0]'): expected number, [name, value] pair or map point, got array",
            "error at 6:5 ('data[1]'): expected number, [name, value] pair or map point, got object",
            "error at 11:11 ('joinBy'): expected key or pair of keys, got array",
            "error at 12:20 ('nullInteraction'): expected boolean, got identifier `False`",
        ]
    );
    Ok(())
}

#[test]
fn flowmap_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/series/flowmap/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 3:5 ('data[0]'): expected [from, to, weight] triple or flowmap point, got array",
            "error at 4:5 ('data[1]'): expected [from, to, weight] triple or flowmap point, got array",
            "error at 5:5 ('data[2]'): expected [from, to, weight] triple or flowmap point, got object",
            "error at 11:16 ('fillOpacity'): value -0.5 is out of range: must be at least 0",
            r#"error at 13:17 ('markerEnd.markerType'): value "Arrow" is not in allowed enum values: ["arrow","mushroom"]"#,
        ]
    );
    Ok(())
}

#[test]
fn map_navigation_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/mapNavigation/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 2:12 ('enabled'): expected boolean, got string",
            r#"error at 4:14 ('buttonOptions.alignTo'): value "chart" is not in allowed enum values: ["plotBox","spacingBox"]"#,
            "error at 9:5 ('buttons.reset'): unknown property 'reset'",
            "error at 11:26 ('mouseWheelSensitivity'): expected number, got string",
        ]
    );
    Ok(())
}

#[test]
fn map_view_errors() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/mapView/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        [
            "error at 2:11 ('center'): expected 2 items, got 3",
            "error at 3:9 ('zoom'): value -1 is out of range: must be at least 0",
            "error at 6:16 ('projection.parallels'): expected array of number, got string",
            r#"error at 10:12 ('insets[0].units'): value "meters" is not in allowed enum values: ["percent","pixels"]"#,
        ]
    );
    Ok(())
}

#[test]
fn syntax_error_is_single_diagnostic() -> Result<()> {
    let diagnostics = check_fixture("tests/fixtures/series/mapbubble/error-01.js")?;
    assert_eq!(
        messages(&diagnostics),
        ["error at 4:5 ('data'): expecting `,` or `]` in array, found `{`"]
    );
    assert!(diagnostics[0].kind.is_fatal());
    Ok(())
}

#[test]
fn diagnostics_serialize() -> Result<()> {
    let checker = Checker::with_builtin_schemas()?;
    let diagnostics = checker.check("drilldown", "d.js", "{ breadcrumbs: { rtl: False } }")?;
    assert_eq!(
        serde_json::to_value(&diagnostics)?,
        json!([{
            "severity": "error",
            "kind": "typeMismatch",
            "expected": "boolean",
            "actual": "identifier `False`",
            "message": "expected boolean, got identifier `False`",
            "path": ["breadcrumbs", "rtl"],
            "position": { "line": 1, "col": 23, "offset": 22 }
        }])
    );
    Ok(())
}

#[test]
fn unknown_root() -> Result<()> {
    let checker = Checker::with_builtin_schemas()?;
    match checker.check("series.nosuchtype", "x.js", "{}") {
        Err(SchemaError::UnresolvedReference { name, .. }) => {
            assert_eq!(name.as_ref(), "series.nosuchtype");
        }
        other => bail!("expected unresolved root, got {other:?}"),
    }
    Ok(())
}

#[test]
fn nested_root() -> Result<()> {
    let checker = Checker::with_builtin_schemas()?;
    let diagnostics = checker.check("drilldown.breadcrumbs", "b.js", "{ floating: 1 }")?;
    assert_eq!(
        messages(&diagnostics),
        ["error at 1:13 ('floating'): expected boolean, got number"]
    );
    Ok(())
}

#[test]
fn resource_limits() -> Result<()> {
    let mut checker = Checker::with_builtin_schemas()?;
    checker.set_limits(Limits {
        max_depth: 3,
        ..Limits::default()
    });

    // Too deep to parse.
    let diagnostics = checker.check("navigation", "deep.js", "{ bindings: { a: { b: { c: 1 } } } }")?;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind.name(), "resourceLimitExceeded");

    // Parses within budget, but the union around `symbolFill` revisits its
    // subtree. Parse warnings are kept.
    checker.set_limits(Limits {
        max_nodes: 9,
        ..Limits::default()
    });
    let diagnostics = checker.check(
        "navigation",
        "wide.js",
        "{ bindingsClassName: 'a', bindingsClassName: 'b', buttonOptions: { symbolFill: { stops: [[0, 'x']] } } }",
    )?;
    let kinds: Vec<_> = diagnostics.iter().map(|d| d.kind.name()).collect();
    assert_eq!(kinds, ["duplicateKey", "resourceLimitExceeded"]);
    Ok(())
}

#[test]
fn batch() -> Result<()> {
    let checker = Checker::with_builtin_schemas()?;
    let documents = vec![
        ("a.js".to_string(), "{ floating: true }".to_string()),
        ("b.js".to_string(), "{ floating: yes }".to_string()),
        ("c.js".to_string(), "{ floating: ".to_string()),
    ];
    let results = checker.check_batch("drilldown.breadcrumbs", &documents)?;
    assert_eq!(results.len(), 3);
    assert!(results[0].is_empty());
    assert_eq!(
        messages(&results[1]),
        ["error at 1:13 ('floating'): expected boolean, got identifier `yes`"]
    );
    assert_eq!(results[2].len(), 1);
    assert_eq!(results[2][0].kind.name(), "parseError");

    assert!(checker.check_batch("nope", &documents).is_err());
    Ok(())
}
