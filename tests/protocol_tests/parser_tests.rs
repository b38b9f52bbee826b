//! Parser Tests
//!
//! Tests for incremental reply parsing: every reply type, arbitrary chunk
//! boundaries, resource limits and error poisoning.

use bytes::Bytes;
use redlink::protocol::{ParseOptions, Parser, ProtocolVersion, ReplyReader, Value};
use redlink::{Buffer, ProtocolError};

fn parse_one(version: ProtocolVersion, input: &[u8]) -> Result<Option<Value>, ProtocolError> {
    let mut parser = Parser::new(version, ParseOptions::default());
    let mut buf = Buffer::new();
    buf.extend_from_slice(input);
    parser.parse(&mut buf)
}

fn resp2(input: &[u8]) -> Value {
    parse_one(ProtocolVersion::Resp2, input).unwrap().unwrap()
}

fn resp3(input: &[u8]) -> Value {
    parse_one(ProtocolVersion::Resp3, input).unwrap().unwrap()
}

/// Feed `input` in pieces of `chunk` bytes, collecting every reply
fn parse_chunked(version: ProtocolVersion, input: &[u8], chunk: usize) -> Vec<Value> {
    let mut reader = ReplyReader::new(version, ParseOptions::default());
    let mut replies = Vec::new();
    for piece in input.chunks(chunk) {
        replies.extend(reader.feed_and_drain(piece).unwrap());
    }
    assert!(!reader.is_mid_reply());
    replies
}

// =============================================================================
// RESP2 Scalar Tests
// =============================================================================

#[test]
fn test_parse_status() {
    assert_eq!(resp2(b"+OK\r\n"), Value::status("OK"));
    assert!(resp2(b"+OK\r\n").is_ok());
}

#[test]
fn test_parse_error_reply_is_a_value() {
    let value = resp2(b"-ERR unknown command 'FOO'\r\n");
    assert!(value.is_error());
    assert_eq!(value.as_error(), Some(&b"ERR unknown command 'FOO'"[..]));
}

#[test]
fn test_parse_integers() {
    assert_eq!(resp2(b":0\r\n"), Value::Integer(0));
    assert_eq!(resp2(b":1000\r\n"), Value::Integer(1000));
    assert_eq!(resp2(b":-42\r\n"), Value::Integer(-42));
    assert_eq!(
        resp2(b":9223372036854775807\r\n"),
        Value::Integer(i64::MAX)
    );
    assert_eq!(
        resp2(b":-9223372036854775808\r\n"),
        Value::Integer(i64::MIN)
    );
}

#[test]
fn test_parse_bulk_string() {
    assert_eq!(resp2(b"$6\r\nfoobar\r\n"), Value::bulk("foobar"));
    assert_eq!(resp2(b"$0\r\n\r\n"), Value::bulk(""));
}

#[test]
fn test_parse_bulk_string_is_binary_safe() {
    let value = resp2(b"$8\r\na\r\nb\0c\r\n\r\n");
    assert_eq!(value.as_bytes(), Some(&b"a\r\nb\0c\r\n"[..]));
}

#[test]
fn test_parse_null_bulk_and_null_array() {
    assert_eq!(resp2(b"$-1\r\n"), Value::Null);
    assert_eq!(resp2(b"*-1\r\n"), Value::Null);
}

// =============================================================================
// RESP2 Composite Tests
// =============================================================================

#[test]
fn test_parse_array() {
    let value = resp2(b"*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n");
    assert_eq!(
        value,
        Value::Array(vec![Value::bulk("foo"), Value::bulk("bar")])
    );
}

#[test]
fn test_parse_empty_array() {
    assert_eq!(resp2(b"*0\r\n"), Value::Array(vec![]));
}

#[test]
fn test_parse_mixed_array() {
    let value = resp2(b"*5\r\n:1\r\n:2\r\n:3\r\n:4\r\n$6\r\nfoobar\r\n");
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Integer(1),
            Value::Integer(2),
            Value::Integer(3),
            Value::Integer(4),
            Value::bulk("foobar"),
        ])
    );
}

#[test]
fn test_parse_nested_arrays() {
    let value = resp2(b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Foo\r\n-Bar\r\n");
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Array(vec![
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3)
            ]),
            Value::Array(vec![Value::status("Foo"), Value::error("Bar")]),
        ])
    );
}

#[test]
fn test_parse_array_with_null_elements() {
    let value = resp2(b"*3\r\n$3\r\nfoo\r\n$-1\r\n$3\r\nbar\r\n");
    assert_eq!(
        value,
        Value::Array(vec![Value::bulk("foo"), Value::Null, Value::bulk("bar")])
    );
}

#[test]
fn test_parse_trailing_empty_composite_closes_parent() {
    let value = resp2(b"*2\r\n:1\r\n*0\r\n");
    assert_eq!(
        value,
        Value::Array(vec![Value::Integer(1), Value::Array(vec![])])
    );
}

// =============================================================================
// RESP3 Tests
// =============================================================================

#[test]
fn test_parse_resp3_scalars() {
    assert_eq!(resp3(b"_\r\n"), Value::Null);
    assert_eq!(resp3(b",1.25\r\n"), Value::Double(1.25));
    assert_eq!(resp3(b",-1\r\n"), Value::Double(-1.0));
    assert_eq!(resp3(b"#t\r\n"), Value::Boolean(true));
    assert_eq!(resp3(b"#f\r\n"), Value::Boolean(false));
    assert_eq!(
        resp3(b"(3492890328409238509324850943850943825024385\r\n"),
        Value::BigNumber(Bytes::from_static(
            b"3492890328409238509324850943850943825024385"
        ))
    );
}

#[test]
fn test_parse_resp3_special_doubles() {
    assert_eq!(resp3(b",inf\r\n"), Value::Double(f64::INFINITY));
    assert_eq!(resp3(b",-inf\r\n"), Value::Double(f64::NEG_INFINITY));
    assert!(resp3(b",nan\r\n").as_double().unwrap().is_nan());
}

#[test]
fn test_parse_verbatim_string() {
    let value = resp3(b"=15\r\ntxt:Some string\r\n");
    assert_eq!(
        value,
        Value::VerbatimString {
            format: *b"txt",
            data: Bytes::from_static(b"Some string"),
        }
    );
    assert_eq!(value.as_str(), Some("Some string"));
}

#[test]
fn test_parse_bulk_error() {
    let value = resp3(b"!21\r\nSYNTAX invalid syntax\r\n");
    assert_eq!(value, Value::error("SYNTAX invalid syntax"));
}

#[test]
fn test_parse_map() {
    let value = resp3(b"%2\r\n+first\r\n:1\r\n+second\r\n:2\r\n");
    assert_eq!(
        value,
        Value::Map(vec![
            (Value::status("first"), Value::Integer(1)),
            (Value::status("second"), Value::Integer(2)),
        ])
    );
}

#[test]
fn test_parse_set_and_push() {
    assert_eq!(
        resp3(b"~2\r\n:1\r\n:2\r\n"),
        Value::Set(vec![Value::Integer(1), Value::Integer(2)])
    );

    let push = resp3(b">3\r\n$7\r\nmessage\r\n$4\r\nchan\r\n$5\r\nhello\r\n");
    assert!(push.is_push());
    assert_eq!(push.as_array().map(|items| items.len()), Some(3));
}

#[test]
fn test_parse_empty_resp3_composites() {
    assert_eq!(resp3(b"%0\r\n"), Value::Map(vec![]));
    assert_eq!(resp3(b"~0\r\n"), Value::Set(vec![]));
}

#[test]
fn test_parse_map_with_nested_values() {
    let value = resp3(b"%1\r\n$4\r\nkeys\r\n*2\r\n$1\r\na\r\n$1\r\nb\r\n");
    let pairs = value.as_map().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].0, Value::bulk("keys"));
    assert_eq!(
        pairs[0].1,
        Value::Array(vec![Value::bulk("a"), Value::bulk("b")])
    );
}

#[test]
fn test_resp2_rejects_resp3_prefixes() {
    for input in [
        &b"_\r\n"[..],
        b",1.5\r\n",
        b"#t\r\n",
        b"(1\r\n",
        b"=5\r\ntxt:a\r\n",
        b"!3\r\nERR\r\n",
        b"%0\r\n",
        b"~0\r\n",
        b">0\r\n",
    ] {
        let err = parse_one(ProtocolVersion::Resp2, input).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidPrefix(input[0]));
    }
}

// =============================================================================
// Incremental Parsing Tests
// =============================================================================

#[test]
fn test_incomplete_input_returns_none() {
    for input in [
        &b""[..],
        b"+OK",
        b"+OK\r",
        b"$6\r\nfoo",
        b"$6\r\nfoobar",
        b"$6\r\nfoobar\r",
        b"*2\r\n$3\r\nfoo\r\n",
        b"*2\r\n*1\r\n:1\r\n",
    ] {
        assert_eq!(parse_one(ProtocolVersion::Resp2, input).unwrap(), None);
    }
}

#[test]
fn test_every_split_point_yields_same_reply() {
    let input = b"*3\r\n$3\r\nfoo\r\n*2\r\n:42\r\n$-1\r\n+OK\r\n";
    let expected = resp2(input);

    for split in 0..=input.len() {
        let mut reader = ReplyReader::new(ProtocolVersion::Resp2, ParseOptions::default());
        let mut replies = reader.feed_and_drain(&input[..split]).unwrap();
        replies.extend(reader.feed_and_drain(&input[split..]).unwrap());
        assert_eq!(replies, vec![expected.clone()], "split at {}", split);
    }
}

#[test]
fn test_byte_at_a_time_resp3() {
    let input = b"%2\r\n+a\r\n#t\r\n+b\r\n=8\r\ntxt:c\r\nd\r\n>2\r\n,2.5\r\n_\r\n";
    let replies = parse_chunked(ProtocolVersion::Resp3, input, 1);
    assert_eq!(replies.len(), 2);
    assert_eq!(
        replies[0],
        Value::Map(vec![
            (Value::status("a"), Value::Boolean(true)),
            (
                Value::status("b"),
                Value::VerbatimString {
                    format: *b"txt",
                    data: Bytes::from_static(b"c\r\nd"),
                }
            ),
        ])
    );
    assert_eq!(
        replies[1],
        Value::Push(vec![Value::Double(2.5), Value::Null])
    );
}

#[test]
fn test_partial_state_survives_between_calls() {
    let mut parser = Parser::default();
    let mut buf = Buffer::new();

    buf.extend_from_slice(b"*2\r\n*2\r\n:1\r\n");
    assert_eq!(parser.parse(&mut buf).unwrap(), None);
    assert_eq!(parser.depth(), 2);
    assert!(!parser.is_idle());
    assert!(buf.is_empty());

    buf.extend_from_slice(b":2\r\n:3");
    assert_eq!(parser.parse(&mut buf).unwrap(), None);
    assert_eq!(parser.depth(), 1);
    assert_eq!(buf.unread(), b":3");

    buf.extend_from_slice(b"\r\n");
    let value = parser.parse(&mut buf).unwrap().unwrap();
    assert_eq!(
        value,
        Value::Array(vec![
            Value::Array(vec![Value::Integer(1), Value::Integer(2)]),
            Value::Integer(3),
        ])
    );
    assert!(parser.is_idle());
}

#[test]
fn test_multiple_replies_in_one_feed_keep_order() {
    let mut reader = ReplyReader::default();
    let replies = reader
        .feed_and_drain(b"+OK\r\n:1\r\n$3\r\nfoo\r\n-ERR x\r\n")
        .unwrap();
    assert_eq!(
        replies,
        vec![
            Value::status("OK"),
            Value::Integer(1),
            Value::bulk("foo"),
            Value::error("ERR x"),
        ]
    );
    assert_eq!(reader.buffered(), 0);
}

#[test]
fn test_trailing_partial_reply_stays_buffered() {
    let mut reader = ReplyReader::default();
    let replies = reader.feed_and_drain(b":1\r\n$5\r\nhel").unwrap();
    assert_eq!(replies, vec![Value::Integer(1)]);
    assert_eq!(reader.buffered(), 8);
    assert!(reader.is_mid_reply());

    let replies = reader.feed_and_drain(b"lo\r\n").unwrap();
    assert_eq!(replies, vec![Value::bulk("hello")]);
}

#[test]
fn test_bulk_payload_is_not_copied() {
    let mut parser = Parser::new(ProtocolVersion::Resp3, ParseOptions::default());
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"$5\r\nhello\r\n=8\r\ntxt:abcd\r\n");
    let bulk_at = buf.unread()[4..].as_ptr();
    let verbatim_at = buf.unread()[19..].as_ptr();

    let bulk = parser.parse(&mut buf).unwrap().unwrap();
    assert_eq!(bulk, Value::bulk("hello"));
    assert_eq!(bulk.as_bytes().unwrap().as_ptr(), bulk_at);

    let verbatim = parser.parse(&mut buf).unwrap().unwrap();
    assert_eq!(verbatim.as_bytes(), Some(&b"abcd"[..]));
    assert_eq!(verbatim.as_bytes().unwrap().as_ptr(), verbatim_at);
    assert!(buf.is_empty());
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_unknown_prefix() {
    let err = parse_one(ProtocolVersion::Resp3, b"?what\r\n").unwrap_err();
    assert_eq!(err, ProtocolError::InvalidPrefix(b'?'));
}

#[test]
fn test_invalid_integers() {
    for input in [&b":\r\n"[..], b":12a\r\n", b":-\r\n", b":+5\r\n", b":99999999999999999999\r\n"] {
        let err = parse_one(ProtocolVersion::Resp2, input).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidInteger(_)), "{:?}", err);
    }
}

#[test]
fn test_negative_lengths_below_null() {
    assert_eq!(
        parse_one(ProtocolVersion::Resp2, b"$-2\r\n").unwrap_err(),
        ProtocolError::InvalidLength(-2)
    );
    assert_eq!(
        parse_one(ProtocolVersion::Resp2, b"*-5\r\n").unwrap_err(),
        ProtocolError::InvalidLength(-5)
    );
}

#[test]
fn test_bulk_missing_terminator() {
    let err = parse_one(ProtocolVersion::Resp2, b"$3\r\nfooXY").unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}

#[test]
fn test_invalid_resp3_scalars() {
    assert_eq!(
        parse_one(ProtocolVersion::Resp3, b"#x\r\n").unwrap_err(),
        ProtocolError::InvalidBoolean
    );
    assert!(matches!(
        parse_one(ProtocolVersion::Resp3, b",abc\r\n").unwrap_err(),
        ProtocolError::InvalidDouble(_)
    ));
    assert!(matches!(
        parse_one(ProtocolVersion::Resp3, b"(12x\r\n").unwrap_err(),
        ProtocolError::InvalidBigNumber(_)
    ));
    assert!(matches!(
        parse_one(ProtocolVersion::Resp3, b"_x\r\n").unwrap_err(),
        ProtocolError::Malformed(_)
    ));
    assert_eq!(
        parse_one(ProtocolVersion::Resp3, b"=3\r\ntxt\r\n").unwrap_err(),
        ProtocolError::InvalidVerbatimFormat
    );
}

// =============================================================================
// Limit Tests
// =============================================================================

#[test]
fn test_bulk_length_limit() {
    let mut parser = Parser::new(
        ProtocolVersion::Resp2,
        ParseOptions::new().max_bulk_len(4),
    );
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"$5\r\n");

    assert_eq!(
        parser.parse(&mut buf).unwrap_err(),
        ProtocolError::BulkStringTooLong { len: 5, max: 4 }
    );
}

#[test]
fn test_bulk_length_limit_rejects_before_payload_arrives() {
    // Default limit is 512 MB; the header alone is enough to fail
    let err = parse_one(ProtocolVersion::Resp2, b"$1000000000\r\n").unwrap_err();
    assert!(matches!(err, ProtocolError::BulkStringTooLong { .. }));
}

#[test]
fn test_element_count_limit() {
    let mut parser = Parser::new(
        ProtocolVersion::Resp3,
        ParseOptions::new().max_elements(2),
    );
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"*3\r\n");

    assert_eq!(
        parser.parse(&mut buf).unwrap_err(),
        ProtocolError::CollectionTooLarge { len: 3, max: 2 }
    );
}

#[test]
fn test_depth_limit() {
    let options = ParseOptions::new().max_depth(3);

    let ok = b"*1\r\n*1\r\n*1\r\n:1\r\n";
    let mut parser = Parser::new(ProtocolVersion::Resp2, options);
    let mut buf = Buffer::new();
    buf.extend_from_slice(ok);
    assert!(parser.parse(&mut buf).unwrap().is_some());

    let too_deep = b"*1\r\n*1\r\n*1\r\n*1\r\n:1\r\n";
    let mut parser = Parser::new(ProtocolVersion::Resp2, options);
    let mut buf = Buffer::new();
    buf.extend_from_slice(too_deep);
    assert_eq!(
        parser.parse(&mut buf).unwrap_err(),
        ProtocolError::NestingTooDeep(4)
    );
}

#[test]
fn test_deep_nesting_within_limit_does_not_recurse() {
    let depth = 10_000;
    let options = ParseOptions::new().max_depth(depth);
    let mut input = Vec::new();
    for _ in 0..depth {
        input.extend_from_slice(b"*1\r\n");
    }
    input.extend_from_slice(b":7\r\n");

    let mut parser = Parser::new(ProtocolVersion::Resp2, options);
    let mut buf = Buffer::new();
    buf.extend_from_slice(&input);
    let mut value = parser.parse(&mut buf).unwrap().unwrap();

    let mut levels = 0;
    while let Value::Array(mut items) = value {
        levels += 1;
        value = items.pop().unwrap();
    }
    assert_eq!(levels, depth);
    assert_eq!(value, Value::Integer(7));
}

#[test]
fn test_unterminated_line_limit() {
    let mut parser = Parser::new(
        ProtocolVersion::Resp2,
        ParseOptions::new().max_inline_len(16),
    );
    let mut buf = Buffer::new();

    buf.extend_from_slice(b"+0123456789");
    assert_eq!(parser.parse(&mut buf).unwrap(), None);

    buf.extend_from_slice(b"0123456789");
    assert!(matches!(
        parser.parse(&mut buf).unwrap_err(),
        ProtocolError::LineTooLong { max: 16, .. }
    ));
}

// =============================================================================
// Poisoning Tests
// =============================================================================

#[test]
fn test_error_poisons_parser() {
    let mut parser = Parser::default();
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"?bad\r\n");

    let first = parser.parse(&mut buf).unwrap_err();
    assert_eq!(parser.error(), Some(&first));

    // Valid bytes after the failure are not parsed
    buf.clear();
    buf.extend_from_slice(b"+OK\r\n");
    assert_eq!(parser.parse(&mut buf).unwrap_err(), first);
    assert_eq!(buf.unread(), b"+OK\r\n");
}

#[test]
fn test_reset_clears_poison_and_partial_state() {
    let mut parser = Parser::default();
    let mut buf = Buffer::new();
    buf.extend_from_slice(b"*2\r\n:1\r\n");
    assert_eq!(parser.parse(&mut buf).unwrap(), None);
    assert_eq!(parser.depth(), 1);

    parser.reset();
    assert!(parser.is_idle());
    assert!(parser.error().is_none());

    buf.extend_from_slice(b"+OK\r\n");
    assert_eq!(parser.parse(&mut buf).unwrap(), Some(Value::status("OK")));
}

#[test]
fn test_version_switch_enables_resp3() {
    let mut reader = ReplyReader::new(ProtocolVersion::Resp2, ParseOptions::default());
    assert_eq!(reader.feed_and_drain(b"+OK\r\n").unwrap(), vec![Value::status("OK")]);

    reader.set_version(ProtocolVersion::Resp3);
    assert_eq!(
        reader.feed_and_drain(b"#t\r\n").unwrap(),
        vec![Value::Boolean(true)]
    );
    assert_eq!(reader.parser().version(), ProtocolVersion::Resp3);
}
