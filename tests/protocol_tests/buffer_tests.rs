//! Buffer Tests
//!
//! Tests for cursor movement and compaction.

use redlink::Buffer;

#[test]
fn test_new_buffer_is_empty() {
    let buf = Buffer::new();
    assert!(buf.is_empty());
    assert_eq!(buf.len(), 0);
    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.write_offset(), 0);
}

#[test]
fn test_append_then_consume() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"hello world");
    assert_eq!(buf.len(), 11);

    buf.consume(6);
    assert_eq!(buf.unread(), b"world");
    assert_eq!(buf.read_offset(), 6);
    assert_eq!(buf.write_offset(), 11);
}

#[test]
fn test_consume_is_clamped() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"abc");
    buf.consume(100);
    assert!(buf.is_empty());
}

#[test]
fn test_full_consume_rewinds_cursors() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"abc");
    buf.consume(3);

    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.write_offset(), 0);

    buf.extend_from_slice(b"de");
    assert_eq!(buf.unread(), b"de");
}

#[test]
fn test_compact_keeps_unread_bytes() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"0123456789");
    buf.consume(4);
    buf.compact();

    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.write_offset(), 6);
    assert_eq!(buf.unread(), b"456789");
}

#[test]
fn test_automatic_compaction_past_threshold() {
    let mut buf = Buffer::new();
    buf.set_compact_threshold(8);

    buf.extend_from_slice(b"0123456789ab");
    buf.consume(10);
    assert_eq!(buf.read_offset(), 10);

    // Consumed prefix is past the threshold and most of the data
    buf.extend_from_slice(b"cd");
    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.unread(), b"abcd");
}

#[test]
fn test_no_compaction_below_threshold() {
    let mut buf = Buffer::new();
    buf.set_compact_threshold(64);

    buf.extend_from_slice(b"0123456789ab");
    buf.consume(10);
    buf.extend_from_slice(b"cd");

    assert_eq!(buf.read_offset(), 10);
    assert_eq!(buf.unread(), b"abcd");
}

#[test]
fn test_long_lived_buffer_stays_bounded() {
    let mut buf = Buffer::new();
    buf.set_compact_threshold(1024);
    let chunk = [b'x'; 100];

    for _ in 0..10_000 {
        buf.extend_from_slice(&chunk);
        // Leave a partial tail behind each time
        buf.consume(99);
    }

    assert_eq!(buf.len(), 10_000);
    assert!(buf.read_offset() <= buf.write_offset());
    assert!(buf.write_offset() < 10_000 * 100);
}

#[test]
fn test_clear() {
    let mut buf = Buffer::with_capacity(32);
    buf.extend_from_slice(b"abc");
    buf.consume(1);
    buf.clear();

    assert!(buf.is_empty());
    assert_eq!(buf.read_offset(), 0);
    assert!(buf.capacity() >= 32);
}

#[test]
fn test_split_unread_shares_storage() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"$5\r\nhello\r\nrest");
    buf.consume(4);
    let start = buf.unread().as_ptr();

    let payload = buf.split_unread(5);
    assert_eq!(&payload[..], b"hello");
    assert_eq!(payload.as_ptr(), start);

    // The consumed prefix went with the payload
    assert_eq!(buf.read_offset(), 0);
    assert_eq!(buf.unread(), b"\r\nrest");
}

#[test]
fn test_split_unread_is_clamped() {
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"abc");

    let payload = buf.split_unread(10);
    assert_eq!(&payload[..], b"abc");
    assert!(buf.is_empty());

    buf.extend_from_slice(b"de");
    assert_eq!(buf.unread(), b"de");
}
