//! Command codec
//!
//! Encoding of commands into the wire format.
//!
//! ## Wire Format
//! A command is always an array of bulk strings, never inline text:
//! ```text
//! *<argc>\r\n
//! $<len(arg0)>\r\n<arg0>\r\n
//! $<len(arg1)>\r\n<arg1>\r\n
//! ...
//! ```
//! Length prefixes make every argument binary-safe: arguments may contain
//! NUL bytes or CRLF without escaping.

use bytes::{BufMut, BytesMut};

use crate::buffer::Buffer;
use crate::error::{RedlinkError, Result};

/// Frame terminator
pub const CRLF: &[u8] = b"\r\n";

/// Encode an argument vector, appending the frame to `out`
///
/// Returns the number of bytes appended. An empty vector is rejected since a
/// command must name at least one token.
pub fn encode_command<A: AsRef<[u8]>>(argv: &[A], out: &mut Buffer) -> Result<usize> {
    if argv.is_empty() {
        return Err(RedlinkError::EmptyCommand);
    }

    let total = encoded_len(argv);
    let buf = out.writer();
    let start = buf.len();
    buf.reserve(total);

    buf.put_u8(b'*');
    push_decimal(buf, argv.len());
    buf.extend_from_slice(CRLF);

    for arg in argv {
        let arg = arg.as_ref();
        buf.put_u8(b'$');
        push_decimal(buf, arg.len());
        buf.extend_from_slice(CRLF);
        buf.extend_from_slice(arg);
        buf.extend_from_slice(CRLF);
    }

    debug_assert_eq!(buf.len() - start, total);
    Ok(total)
}

/// Size of the frame `encode_command` would produce
pub fn encoded_len<A: AsRef<[u8]>>(argv: &[A]) -> usize {
    let header = 1 + decimal_len(argv.len()) + 2;
    argv.iter().fold(header, |acc, arg| {
        let len = arg.as_ref().len();
        acc + 1 + decimal_len(len) + 2 + len + 2
    })
}

fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn push_decimal(buf: &mut BytesMut, mut n: usize) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}
