use super::{Diag, ErrorKind};
use span::{FileName, SourceMap, Span};

#[test]
fn resolve_error_with_location() {
    let mut map = SourceMap::default();
    let file = map.add_str("app.main", "X: i64 = 1\nfoo = 2\n");
    let start = map[file].global(11);

    let error = Diag::error()
        .message("undefined variable 'foo'")
        .unlabeled_span(Span::with_length(start, 3))
        .resolve(&map);

    assert_eq!(error.kind, ErrorKind::Error);
    assert_eq!(error.message, "undefined variable 'foo'");
    assert_eq!(error.file, Some(FileName::Module("app.main".into())));
    assert_eq!(error.line, 2);
    assert_eq!(error.column, 0);
    assert_eq!(error.to_string(), "undefined variable 'foo'");
}

#[test]
fn resolve_bug_without_location() {
    let map = SourceMap::default();

    let error = Diag::bug()
        .message("unexpected statement")
        .unlabeled_span(Span::default())
        .resolve(&map);

    assert!(error.is_internal());
    assert_eq!(error.line, 0);
    assert_eq!(error.file, None);
    assert_eq!(error.to_string(), "internal error: unexpected statement");
}

#[test]
fn fallback_span_does_not_overwrite() {
    let first = span::span(3, 4);
    let diag = Diag::error()
        .unlabeled_span(first)
        .fallback_span(span::span(8, 9));

    assert_eq!(diag.span(), Some(first));
}

#[test]
fn notes_are_kept() {
    let error = Diag::error()
        .message("pure trait method 'run' is not implemented")
        .note("the trait is 'app.main.Runner'")
        .resolve(&SourceMap::default());

    assert_eq!(error.notes, vec!["the trait is 'app.main.Runner'".to_owned()]);
}
