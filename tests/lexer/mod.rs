// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use chartopts::lexer::*;
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    Ok(Lexer::new(source).tokenize()?)
}

// The caret printed by `Source::message` must point at the first character of the token.
fn check_loc(tok: &Token) -> Result<()> {
    let msg = tok.1.message("", "");
    let lines: Vec<&str> = msg.split('\n').collect();
    let source_line: Vec<char> = lines[3].chars().collect();
    let Some(caret) = lines[4].find('^') else {
        bail!("could not find caret for {tok:#?} {msg}");
    };

    let rest: String = source_line.iter().skip(caret).collect();
    if tok.0 == TokenKind::Eof {
        assert!(rest.trim().is_empty(), "eof not at end of line {msg}");
        return Ok(());
    }

    let span_str = tok.1.text().split('\n').next().unwrap_or_default();
    assert!(
        rest.starts_with(span_str),
        "location mismatch for {tok:#?} {msg}\n{span_str}\n{rest}"
    );
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    pub note: String,
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    pub kinds: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        let source = Source::from_contents("case.js".to_string(), case.text.clone())?;

        print!("case {} ", &case.note);

        match get_tokens(&source) {
            Ok(tokens) => {
                if let Some(expected) = &case.error {
                    bail!("expected error `{expected}`, lexed {tokens:?}");
                }
                for (idx, tok) in tokens.iter().enumerate() {
                    if idx >= case.tokens.len() {
                        break;
                    }
                    assert_eq!(
                        tok.1.text(),
                        case.tokens[idx],
                        "{} Expected token `{}` not found",
                        tok.1.message("mismatch-error", &case.tokens[idx]),
                        &case.tokens[idx]
                    );

                    if let Some(k) = &case.kinds {
                        if idx < k.len() {
                            assert_eq!(
                                format!("{:?}", tok.0),
                                k[idx],
                                "{}",
                                tok.1.message("mismatch-error", "token kind mismatch")
                            );
                        }
                    }

                    check_loc(tok)?;
                }
                assert_eq!(
                    tokens.len(),
                    case.tokens.len(),
                    "\n. Token count mismatch.\nLexed tokens:{:?}",
                    tokens
                );
                if let Some(k) = &case.kinds {
                    assert_eq!(
                        tokens.len(),
                        k.len(),
                        "\n. Kind count mismatch.\nLexed tokens:{:?}",
                        tokens
                    );
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                }
                _ => return Err(actual.into()),
            },
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

#[test_resources("tests/lexer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn debug() -> Result<()> {
    let text = "abcdefghijklmnopqrstuvwxyz0123456789 short";
    let source = Source::from_contents("case.js".to_string(), text.to_string())?;

    let mut lexer = Lexer::new(&source);
    let tok = lexer.next_token()?;
    check_loc(&tok)?;

    assert_eq!(
        format!("{:?}", tok.1),
        "1:1:0:36, \"abcdefghijklmnopqrstuvwxyz012345...\"",
        "long span not truncated correctly"
    );

    let tok = lexer.next_token()?;
    check_loc(&tok)?;
    assert_eq!(format!("{:?}", tok.1), "1:38:37:42, \"short\"");

    Ok(())
}

#[test]
fn multiline_positions() -> Result<()> {
    let text = "{\n  formatter: function () {\n    return 1;\n  },\n  y: 2\n}";
    let source = Source::from_contents("case.js".to_string(), text.to_string())?;
    let tokens = get_tokens(&source)?;

    let function = &tokens[3];
    assert_eq!(function.0, TokenKind::Function);
    assert_eq!((function.1.line, function.1.col), (2, 14));

    let y = &tokens[5];
    assert_eq!(y.1.text(), "y");
    assert_eq!((y.1.line, y.1.col), (5, 3));

    for tok in &tokens {
        check_loc(tok)?;
    }
    Ok(())
}

#[test]
fn error_position() -> Result<()> {
    let text = "{\n  a: 'open\n}";
    let source = Source::from_contents("case.js".to_string(), text.to_string())?;
    let err = match get_tokens(&source) {
        Ok(tokens) => bail!("expected an error, lexed {tokens:?}"),
        Err(err) => err,
    };
    let err = err.downcast::<chartopts::DocumentError>()?;
    assert_eq!(err.position().line, 2);
    assert_eq!(err.position().col, 6);
    assert_eq!(err.to_string(), "case.js:2:6: unterminated string");
    Ok(())
}

#[test]
fn invalid_line() -> Result<()> {
    let source = Source::from_contents("case.js".to_string(), String::new())?;

    assert_eq!(
        source.message(2, 0, "", ""),
        "case.js: invalid line 2 specified"
    );

    Ok(())
}
