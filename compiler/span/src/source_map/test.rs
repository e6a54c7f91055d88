use super::{FileName::Anonymous, LineWithHighlight, SourceMap};
use crate::{span, ByteIndex};

/// Letting the first proper offset be `1` frees up `0` to mean _unknown location_ in [`Span::default`].
#[test]
fn first_next_offset_is_one() {
    let map = SourceMap::default();

    assert_eq!(map.next_offset(), ByteIndex::new(1));
}

#[test]
fn spacing_between_files() {
    let mut map = SourceMap::default();

    let file0 = map.add_str(Anonymous, "abc");
    let file1 = map.add_str(Anonymous, "defgh");

    assert_eq!(map[file0].span, span(1, 4));
    assert_eq!(map.snippet(map[file0].span), Some("abc"));
    assert_eq!(map[file1].span, span(5, 10));
    assert_eq!(map.snippet(map[file1].span), Some("defgh"));
}

#[test]
fn unknown_span_has_no_location() {
    let mut map = SourceMap::default();
    map.add_str(Anonymous, "abc");

    assert_eq!(map.location(crate::Span::default()), None);
}

#[test]
fn location_is_one_based_line_and_zero_based_column() {
    let mut map = SourceMap::default();
    map.add_str(Anonymous, "def f():\n    return 1\n");

    // `return` starts at local offset 13
    let location = map.location(span(14, 20)).unwrap();
    assert_eq!(location.line, 2);
    assert_eq!(location.column, 4);
}

#[test]
fn location_in_second_file() {
    let mut map = SourceMap::default();
    map.add_str(Anonymous, "xyz\n");
    let file = map.add_str("lib", "a\nbb\nccc");

    let start = map[file].global(5);
    let location = map.location(crate::Span::with_length(start, 3)).unwrap();
    assert_eq!(location.file, "lib".into());
    assert_eq!(location.line, 3);
    assert_eq!(location.column, 0);
}

#[test]
fn single_line_highlight() {
    let mut map = SourceMap::default();
    map.add_str(Anonymous, "abcdefghijklmnopq\n");

    assert_eq!(
        map.line_with_highlight(span(4, 7)),
        Some(LineWithHighlight {
            number: 1,
            content: "abcdefghijklmnopq",
            prefix_width: 3,
            width: 3,
        })
    );
}

#[test]
fn multi_line_highlight_is_cut_off() {
    let mut map = SourceMap::default();
    map.add_str(Anonymous, "first\nsecond line\nthird\n");

    assert_eq!(
        map.line_with_highlight(span(8, 22)),
        Some(LineWithHighlight {
            number: 2,
            content: "second line",
            prefix_width: 1,
            width: 10,
        })
    );
}
