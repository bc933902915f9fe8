// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use chartopts::ast::*;
use chartopts::lexer::Source;
use chartopts::parser::Parser;
use chartopts::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use test_generator::test_resources;

// Plain JSON view of a tree. Identifiers and functions have no JSON form and
// are tagged instead.
fn to_json(node: &Node) -> Value {
    match node {
        Node::Scalar { value, .. } => match value {
            Scalar::String(s) => json!(s.as_ref()),
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => json!(*n as i64),
            Scalar::Number(n) => json!(n),
            Scalar::Bool(b) => json!(b),
            Scalar::Null => Value::Null,
        },
        Node::Identifier { name, .. } => json!({ "$ident": name.as_ref() }),
        Node::Function { .. } => json!("$function"),
        Node::Array { items, .. } => Value::Array(items.iter().map(to_json).collect()),
        Node::Object(obj) => Value::Object(
            obj.fields
                .iter()
                .map(|(k, f)| (k.to_string(), to_json(&f.value)))
                .collect(),
        ),
    }
}

fn parse(text: &str) -> Result<Document> {
    let source = Source::from_contents("case.js".to_string(), text.to_string())?;
    Ok(Parser::new(&source)?.parse()?)
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    note: String,
    text: String,
    expected: Option<Value>,
    keys: Option<Vec<String>>,
    #[serde(default)]
    warnings: Vec<String>,
    error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn check_round_trip(document: &Document) -> Result<()> {
    let text = document.root.to_string();
    let reparsed = parse(&text)?;
    if reparsed.root != document.root {
        bail!("canonical text `{text}` does not parse back to the same tree");
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", &case.note);

        match (parse(&case.text), &case.error) {
            (Ok(document), None) => {
                if let Some(expected) = &case.expected {
                    let actual = to_json(&document.root);
                    if actual != *expected {
                        bail!("mismatch:\nleft  = {actual}\nright = {expected}");
                    }
                }
                if let Some(keys) = &case.keys {
                    let actual: Vec<String> = match document.root_object() {
                        Some(obj) => obj.keys().map(|k| k.to_string()).collect(),
                        None => bail!("root is not an object"),
                    };
                    assert_eq!(&actual, keys, "key order");
                }
                let warnings: Vec<String> =
                    document.warnings.iter().map(|w| w.to_string()).collect();
                assert_eq!(warnings, case.warnings, "warnings");
                check_round_trip(&document)?;
            }
            (Ok(document), Some(expected)) => {
                bail!("expected error `{expected}`, parsed `{}`", document.root)
            }
            (Err(actual), Some(expected)) => {
                let actual = actual.to_string();
                if !actual.contains(expected) {
                    bail!(
                        "Error message\n`{}\n`\ndoes not contain `{}`",
                        actual,
                        expected
                    );
                }
            }
            (Err(actual), None) => return Err(actual),
        }

        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "intended for running a single yaml file passed on the command line"]
fn one_yaml() -> Result<()> {
    let mut file = String::default();
    for a in env::args() {
        if a.ends_with(".yaml") {
            file = a;
            break;
        }
    }

    if file.is_empty() {
        bail!("missing yaml test file");
    }

    yaml_test(file.as_str())
}

#[test_resources("tests/parser/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn spans_cover_containers() -> Result<()> {
    let text = "{\n  data: [1, { y: 2 }],\n  name: 'x'\n}";
    let document = parse(text)?;

    assert_eq!(document.root.span().text(), text);
    let data = document
        .root
        .lookup(&Path::root().child("data"))
        .ok_or_else(|| anyhow::anyhow!("missing data"))?;
    assert_eq!(data.span().text(), "[1, { y: 2 }]");
    assert_eq!(data.position().line, 2);
    assert_eq!(data.position().col, 9);

    let y = document
        .root
        .lookup(&Path::root().child("data").child(1usize).child("y"))
        .ok_or_else(|| anyhow::anyhow!("missing y"))?;
    assert_eq!(y.describe(), "number");
    assert_eq!(y.to_string(), "2");
    Ok(())
}

#[test]
fn error_path_points_into_tree() -> Result<()> {
    let text = "{ series: [{ data: [1, 2 }] }";
    let err = match parse(text) {
        Ok(document) => bail!("unexpected success {}", document.root),
        Err(err) => err.downcast::<DocumentError>()?,
    };
    assert_eq!(err.path().to_string(), "series[0].data");
    assert_eq!(err.position().col, 26);

    let diagnostic = err.to_diagnostic();
    assert!(diagnostic.kind.is_fatal());
    assert_eq!(
        diagnostic.to_string(),
        "error at 1:26 ('series[0].data'): expecting `,` or `]` in array, found `}`"
    );
    Ok(())
}

#[test]
fn depth_limit() -> Result<()> {
    let text = format!("{}{}", "{ a: [".repeat(40), "]}".repeat(40));
    let source = Source::from_contents("deep.js".to_string(), text)?;
    let mut parser = Parser::new(&source)?;
    parser.set_limits(Limits {
        max_depth: 16,
        ..Limits::default()
    });
    match parser.parse() {
        Err(DocumentError::Limit { error, .. }) => {
            assert!(matches!(
                error,
                LimitError::DepthLimitExceeded { limit: 16, .. }
            ));
        }
        other => bail!("expected depth limit error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn node_limit() -> Result<()> {
    let items = vec!["1"; 100].join(", ");
    let source = Source::from_contents("wide.js".to_string(), format!("{{ data: [{items}] }}"))?;
    let mut parser = Parser::new(&source)?;
    parser.set_limits(Limits {
        max_nodes: 50,
        ..Limits::default()
    });
    match parser.parse() {
        Err(err @ DocumentError::Limit { .. }) => {
            assert_eq!(err.to_diagnostic().kind.name(), "resourceLimitExceeded");
        }
        other => bail!("expected node limit error, got {other:?}"),
    }
    Ok(())
}
