//! Tests for the public parsing entry points over both syntaxes.

use crate::{Node, NodeKind, Syntax, SyntaxError, parse, parse_expression};

fn parse_source(source: &str, syntax: Syntax) -> Result<Node, SyntaxError> {
    parse(source, syntax, Some("test"))
}

fn assert_parses_successfully(source: &str, syntax: Syntax) -> Node {
    match parse_source(source, syntax) {
        Ok(root) => root,
        Err(err) => panic!("Expected parsing to succeed, but got error: {err}"),
    }
}

fn assert_parse_fails(source: &str, syntax: Syntax) -> SyntaxError {
    match parse_source(source, syntax) {
        Ok(_) => panic!("Expected parsing to fail, but it succeeded"),
        Err(err) => err,
    }
}

/// Kinds of the root's children, by description.
fn kinds(root: &Node) -> Vec<&'static str> {
    root.children.iter().map(|n| n.kind.describe()).collect()
}

mod scss_tests {
    use super::*;

    #[test]
    fn test_empty_stylesheet() {
        let root = assert_parses_successfully("", Syntax::Scss);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_plain_css() {
        let root = assert_parses_successfully(
            "a { color: red; }\n.b, .c > d { margin: 0 auto }",
            Syntax::Scss,
        );
        assert_eq!(kinds(&root), ["rule", "rule"]);
    }

    #[test]
    fn test_every_directive() {
        let source = r#"
@charset "UTF-8";
@import "a", "b.css";
$x: 1px !default;
@mixin m($a, $b: 2) { width: $a; }
@function f($a) { @return $a * 2; }
@media screen { a { @include m(1px, $b: 3); } }
@font-face { font-family: x; }
.a { @extend .b; }
@if $x == 1 { a { b: c } } @else { a { b: d } }
@for $i from 1 through 3 { .i-#{$i} { w: $i } }
@each $n in a, b { .#{$n} { c: d } }
@while $x < 3 { $x: $x + 1; }
@debug $x;
@warn "careful";
"#;
        let root = assert_parses_successfully(source, Syntax::Scss);
        assert_eq!(
            kinds(&root),
            [
                "@charset",
                "@import",
                "@import",
                "variable declaration",
                "@mixin",
                "@function",
                "@media",
                "directive",
                "rule",
                "@if",
                "@for",
                "@each",
                "@while",
                "@debug",
                "@warn",
            ]
        );
    }

    #[test]
    fn test_filename_is_recorded() {
        let root = assert_parses_successfully("a { b: c }", Syntax::Scss);
        assert_eq!(root.children[0].children[0].filename.as_deref(), Some("test"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = assert_parse_fails("a { b: c", Syntax::Scss);
        let diag = err.primary().expect("has a diagnostic");
        assert_eq!(diag.filename(), Some("test"));
        assert_eq!(diag.line(), Some(1));
    }

    #[test]
    fn test_error_reports_line() {
        let err = assert_parse_fails("a {\n  b: c;\n}\nd { e: (1 + }", Syntax::Scss);
        assert_eq!(err.primary().and_then(|d| d.line()), Some(4));
    }

    #[test]
    fn test_stray_else() {
        let err = assert_parse_fails("a { b: c } @else { d: e }", Syntax::Scss);
        assert_eq!(
            err.primary().map(|d| d.message()),
            Some("@else must come after @if.")
        );
    }
}

mod indented_tests {
    use super::*;

    #[test]
    fn test_nested_rules() {
        let root = assert_parses_successfully(
            "a\n  color: red\n  b\n    margin: 0\n",
            Syntax::Indented,
        );
        assert_eq!(kinds(&root), ["rule"]);
        assert_eq!(root.children[0].children.len(), 2);
    }

    #[test]
    fn test_mixin_shorthand() {
        let root = assert_parses_successfully(
            "=box($w)\n  width: $w\n.a\n  +box(1px)\n",
            Syntax::Indented,
        );
        assert_eq!(kinds(&root), ["@mixin", "rule"]);
        assert!(matches!(
            root.children[1].children[0].kind,
            NodeKind::MixinInclude { .. }
        ));
    }

    #[test]
    fn test_same_tree_as_scss() {
        let indented = assert_parses_successfully(
            "$x: 1\n@if $x\n  a\n    b: c\n@else\n  d\n    e: f\n",
            Syntax::Indented,
        );
        let scss = assert_parses_successfully(
            "$x: 1;\n@if $x { a { b: c } }\n@else { d { e: f } }\n",
            Syntax::Scss,
        );
        assert_eq!(kinds(&indented), kinds(&scss));
    }

    #[test]
    fn test_mixed_indentation_fails() {
        let err = assert_parse_fails("a\n  b: c\n\td: e\n", Syntax::Indented);
        assert_eq!(err.primary().and_then(|d| d.line()), Some(3));
    }

    #[test]
    fn test_leading_indentation_fails() {
        assert_parse_fails("  a\n    b: c\n", Syntax::Indented);
    }
}

mod selector_tests {
    use crate::{ErrorCode, parse_selector};

    #[test]
    fn test_parent_followed_by_identifier_fails() {
        let err = parse_selector("&-suffix", 4).expect_err("not a selector");
        assert_eq!(err.code(), Some(ErrorCode::E104));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn test_parent_with_descendant() {
        let selector = parse_selector("& b", 1).expect("parses");
        assert_eq!(selector.to_string(), "& b");
    }
}

mod expression_tests {
    use super::*;

    #[test]
    fn test_standalone_expression() {
        let expr = parse_expression("1px + $x").expect("parses");
        assert_eq!(expr.to_string(), "1px + $x");
    }

    #[test]
    fn test_trailing_garbage() {
        assert!(parse_expression("1px )").is_err());
    }
}

mod property_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn test_both_syntaxes_agree_on_simple_rules(
            class in "[a-z][a-z0-9-]{0,8}",
            prop in "[a-z][a-z-]{0,8}",
            n in 0u32..10_000,
        ) {
            let scss = format!(".{class} {{ {prop}: {n}px; }}");
            let indented = format!(".{class}\n  {prop}: {n}px\n");
            let scss = parse_source(&scss, Syntax::Scss);
            let indented = parse_source(&indented, Syntax::Indented);
            prop_assert!(scss.is_ok(), "{:?}", scss.err());
            prop_assert!(indented.is_ok(), "{:?}", indented.err());
            if let (Ok(scss), Ok(indented)) = (scss, indented) {
                prop_assert_eq!(kinds(&scss), kinds(&indented));
                prop_assert_eq!(kinds(&scss.children[0]), vec!["property"]);
            }
        }

        #[test]
        fn test_sums_display_as_written(a in 0u32..10_000, b in 0u32..10_000) {
            let source = format!("{a}px + {b}px");
            let expr = parse_expression(&source);
            prop_assert!(expr.is_ok());
            if let Ok(expr) = expr {
                prop_assert_eq!(expr.to_string(), source);
            }
        }
    }
}
