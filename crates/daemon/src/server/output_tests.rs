// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn complete_lines_are_delivered_and_partial_kept() {
    let mut buf = LineBuffer::default();
    assert_eq!(buf.push(b"hello\nwor"), vec!["hello".to_string()]);
    assert_eq!(buf.pending(), b"wor");
    assert_eq!(buf.push(b"ld\n"), vec!["world".to_string()]);
    assert!(buf.pending().is_empty());
}

#[test]
fn multiple_lines_in_one_push() {
    let mut buf = LineBuffer::default();
    assert_eq!(
        buf.push(b"a\nb\nc\n"),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn crlf_endings_are_stripped() {
    let mut buf = LineBuffer::default();
    assert_eq!(buf.push(b"done\r\n"), vec!["done".to_string()]);
}

#[test]
fn overflow_keeps_only_trailing_bytes() {
    let mut buf = LineBuffer::with_capacity(8);
    assert!(buf.push(b"0123456789abcdef").is_empty());
    assert_eq!(buf.pending(), b"89abcdef");

    // The eventual newline completes only what survived.
    assert_eq!(buf.push(b"\n"), vec!["89abcdef".to_string()]);
}

#[test]
fn non_utf8_bytes_are_replaced_not_dropped() {
    let mut buf = LineBuffer::default();
    let lines = buf.push(&[0xff, 0xfe, b'o', b'k', b'\n']);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("ok"));
}
