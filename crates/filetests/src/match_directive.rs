/// Look for a directive in a comment string.
/// The directive is of the form "foo:" and should follow the leading `;` in the comment:
///
/// ; error: block does not end in a terminator
///
/// Return the comment text following the directive.
pub fn match_directive<'a>(comment: &'a str, directive: &str) -> Option<&'a str> {
    debug_assert!(
        directive.ends_with(':'),
        "Directive must include trailing colon"
    );
    comment
        .trim_start_matches(';')
        .trim_start()
        .strip_prefix(directive)
        .map(str::trim)
}

#[test]
fn test_match_directive() {
    assert_eq!(match_directive("; foo: bar ", "foo:"), Some("bar"));
    assert_eq!(match_directive(" foo:bar", "foo:"), Some("bar"));
    assert_eq!(match_directive(";;foo:", "foo:"), Some(""));
    assert_eq!(match_directive("; error: 3", "foo:"), None);
    assert_eq!(match_directive("; run: %f()", "error:"), None);
}
