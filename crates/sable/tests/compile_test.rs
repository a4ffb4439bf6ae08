//! End-to-end compilation tests.
//!
//! Each test runs source text through the whole pipeline and checks the
//! rendered CSS or the error that ends the compile.

use sable::{ErrorCode, OutputStyle, SableError, Syntax, config::Options};

fn scss(style: OutputStyle) -> Options {
    Options::default()
        .with_syntax(Syntax::Scss)
        .with_style(style)
        .with_quiet(true)
}

fn compile_scss(source: &str) -> String {
    sable::compile(source, &scss(OutputStyle::Nested))
        .unwrap_or_else(|err| panic!("failed to compile {source:?}: {err}"))
}

fn error_code(err: &SableError) -> Option<ErrorCode> {
    err.syntax_error()
        .and_then(|err| err.primary())
        .and_then(|diag| diag.code())
}

/// Normalize CSS so that output in different styles can be compared by
/// content: whitespace runs collapse and disappear around punctuation and
/// combinators, and the optional last semicolon of a block is dropped.
fn declarations(css: &str) -> String {
    let collapsed = css.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let next = chars.peek().copied();
            let prev = out.chars().last();
            let tight = |c: Option<char>| {
                matches!(c, Some('{' | '}' | ';' | ':' | ',' | '>' | '+' | '~'))
            };
            if tight(prev) || tight(next) {
                continue;
            }
        }
        out.push(c);
    }
    out.replace(";}", "}")
}

#[test]
fn test_adding_numbers_with_the_same_unit() {
    let css = compile_scss(".a { width: 1px + 2px; height: 1.5em + 2em; }");
    assert_eq!(css, ".a {\n  width: 3px;\n  height: 3.5em; }\n");
}

#[test]
fn test_adding_incompatible_units_fails() {
    let err = sable::compile(".a { width: 1px + 2em; }", &scss(OutputStyle::Nested))
        .expect_err("px and em do not convert");
    assert_eq!(error_code(&err), Some(ErrorCode::E303));
    assert!(err.to_string().contains("Incompatible units"), "{err}");
}

#[test]
fn test_color_functions() {
    let css = compile_scss(
        ".a { mixed: mix(#f00, #00f); light: lighten(#000000, 20%); l: lightness(lighten(#000000, 20%)); }",
    );
    assert_eq!(
        css,
        ".a {\n  mixed: #7f007f;\n  light: #333333;\n  l: 20%; }\n"
    );
}

#[test]
fn test_extend_merges_into_one_rule() {
    let css = compile_scss(".a { color: red; } .b { @extend .a; }");
    assert_eq!(css, ".a, .b {\n  color: red; }\n");
}

#[test]
fn test_unmatched_extend_is_a_warning() {
    let output = sable::Compiler::new(scss(OutputStyle::Nested))
        .compile_output(".a { color: red; } .b { @extend .missing; }")
        .expect("compiles");
    assert_eq!(output.css, ".a {\n  color: red; }\n");
    assert_eq!(output.warnings.len(), 1);
    assert_eq!(output.warnings[0].code(), Some(ErrorCode::E401));
}

#[test]
fn test_compressed_and_expanded_declare_the_same() {
    let source = r#"
        $gutter: 10px;
        @mixin spaced($n) { margin: $gutter * $n; padding: $gutter / 2; }
        .grid {
          @include spaced(2);
          .cell, .row > .cell { float: left; width: 100% / 3; }
          &:hover { color: red; }
        }
        @media print { .grid { display: none; } }
    "#;
    let compressed = sable::compile(source, &scss(OutputStyle::Compressed)).expect("compiles");
    let expanded = sable::compile(source, &scss(OutputStyle::Expanded)).expect("compiles");

    assert!(!compressed.trim_end().contains('\n'));
    assert!(!compressed.contains(": "));
    assert!(!compressed.contains(" {"));
    assert_eq!(declarations(&compressed), declarations(&expanded));
    assert!(declarations(&expanded).contains(".grid{margin:20px;padding:5px}"));
}

#[test]
fn test_every_style_renders_nested_rules() {
    let source = ".a { x: 1; .b { y: 2; } }";
    let render = |style| sable::compile(source, &scss(style)).expect("compiles");
    assert_eq!(
        render(OutputStyle::Nested),
        ".a {\n  x: 1; }\n  .a .b {\n    y: 2; }\n"
    );
    assert_eq!(
        render(OutputStyle::Expanded),
        ".a {\n  x: 1;\n}\n.a .b {\n  y: 2;\n}\n"
    );
    assert_eq!(render(OutputStyle::Compact), ".a { x: 1; }\n.a .b { y: 2; }\n");
    assert_eq!(render(OutputStyle::Compressed), ".a{x:1}.a .b{y:2}\n");
}

#[test]
fn test_include_loop_is_reported() {
    let err = sable::compile(
        "@mixin a { @include a; }\n.x { @include a; }",
        &scss(OutputStyle::Nested),
    )
    .expect_err("self inclusion");
    assert_eq!(error_code(&err), Some(ErrorCode::E304));
    assert!(err.to_string().contains("a includes itself"), "{err}");

    let err = sable::compile(
        "@mixin a { @include b; }\n@mixin b { @include a; }\n.x { @include a; }",
        &scss(OutputStyle::Nested),
    )
    .expect_err("mutual inclusion");
    assert_eq!(error_code(&err), Some(ErrorCode::E304));
    let message = err.to_string();
    assert!(message.contains("a includes b"), "{message}");
    assert!(message.contains("b includes a"), "{message}");
}

#[test]
fn test_runaway_loop_is_an_error() {
    let options = scss(OutputStyle::Nested).with_max_loop_iterations(50);
    let err = sable::compile("$i: 0;\n@while $i < 1 { .a { x: $i; } }", &options)
        .expect_err("never terminates");
    assert_eq!(error_code(&err), Some(ErrorCode::E305));
}

#[test]
fn test_for_bounds_beyond_integer_range() {
    let options = scss(OutputStyle::Nested).with_max_loop_iterations(50);
    let err = sable::compile(
        ".a { @for $i from -10000000000000000000 through 10000000000000000000 { x: $i; } }",
        &options,
    )
    .expect_err("too many iterations");
    assert_eq!(error_code(&err), Some(ErrorCode::E305));

    let css = sable::compile(
        "@for $i from 1 to -10000000000000000000 { .a { x: $i; } }",
        &options,
    )
    .expect("empty range");
    assert_eq!(css, "");
}

#[test]
fn test_parent_suffix_is_rejected() {
    let err = sable::compile(".a { &-b { c: d } }", &scss(OutputStyle::Nested))
        .expect_err("not a selector");
    assert_eq!(error_code(&err), Some(ErrorCode::E104));
}

#[test]
fn test_runaway_recursion_is_an_error() {
    let options = scss(OutputStyle::Nested).with_max_call_depth(8);
    let err = sable::compile(
        "@function f($n) { @return f($n + 1); }\n.a { x: f(0); }",
        &options,
    )
    .expect_err("never returns");
    assert_eq!(error_code(&err), Some(ErrorCode::E305));
}

#[test]
fn test_undefined_variable() {
    let err = sable::compile(".a {\n  color: $missing;\n}", &scss(OutputStyle::Nested))
        .expect_err("undefined");
    assert_eq!(error_code(&err), Some(ErrorCode::E300));
    let diag = err
        .syntax_error()
        .and_then(|err| err.primary())
        .expect("has a diagnostic");
    assert_eq!(diag.line(), Some(2));
}

#[test]
fn test_nesting_errors_are_all_reported() {
    let err = sable::compile(
        ".a { @mixin m { x: 1; } }\n.b { @function f() { @return 1; } }",
        &scss(OutputStyle::Nested),
    )
    .expect_err("definitions must be at the root");
    let diagnostics = err.syntax_error().expect("compile error").diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.code() == Some(ErrorCode::E202)));
}

#[test]
fn test_indented_syntax() {
    let source = "$w: 4px\n\n.nav\n  border:\n    width: $w\n    style: solid\n  a\n    color: red\n";
    let css = sable::compile(source, &Options::default().with_style(OutputStyle::Compact))
        .expect("compiles");
    assert_eq!(
        css,
        ".nav { border-width: 4px; border-style: solid; }\n.nav a { color: red; }\n"
    );
}

#[test]
fn test_convert_round_trip() {
    let source = r#"
        $c: red;
        @mixin box($w) { width: $w; border: 1px solid $c; }
        .panel {
          @include box(10px);
          h1 { font-size: 2em; }
          &:hover { color: $c; }
        }
        @media screen { .panel { display: block; } }
        /* kept */
        .a { color: blue; }
    "#;
    let compiler = sable::Compiler::new(scss(OutputStyle::Nested));
    let stylesheet = compiler.compile_to_stylesheet(source).expect("compiles");
    let css = stylesheet.to_css(OutputStyle::Nested, false);

    for syntax in [Syntax::Scss, Syntax::Indented] {
        let converted = stylesheet.to_source(syntax);
        let options = Options::default().with_syntax(syntax).with_quiet(true);
        let recompiled = sable::compile(&converted, &options)
            .unwrap_or_else(|err| panic!("converted {syntax} does not compile: {err}\n{converted}"));
        assert_eq!(
            declarations(&recompiled),
            declarations(&css),
            "{syntax} source:\n{converted}"
        );

        // Converting the recompiled tree again changes nothing.
        let again = sable::Compiler::new(options)
            .compile_to_stylesheet(&converted)
            .expect("compiles")
            .to_source(syntax);
        assert_eq!(again, converted);
    }
}

#[test]
fn test_non_ascii_output_gets_a_charset() {
    let css = compile_scss(".a { content: \"café\"; }");
    assert_eq!(css, "@charset \"UTF-8\";\n.a {\n  content: \"café\"; }\n");
}

#[test]
fn test_parse_error() {
    let err = sable::compile(".a { color: red", &scss(OutputStyle::Nested)).expect_err("unclosed");
    assert!(matches!(err, SableError::Compile { .. }));
    let code = error_code(&err).expect("has a code");
    assert!(code.as_str().starts_with("E0") || code.as_str().starts_with("E1"));
}
