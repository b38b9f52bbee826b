//! Protocol Module
//!
//! RESP wire protocol: command encoding and incremental reply parsing.
//!
//! ## Request Format
//! ```text
//! *<argc>\r\n  ( $<len>\r\n <bytes> \r\n ) × argc
//! ```
//!
//! ## Reply Lead Bytes
//! | byte | type            | protocol |
//! |------|-----------------|----------|
//! | `+`  | status          | RESP2    |
//! | `-`  | error           | RESP2    |
//! | `:`  | integer         | RESP2    |
//! | `$`  | bulk string     | RESP2    |
//! | `*`  | array           | RESP2    |
//! | `_`  | null            | RESP3    |
//! | `,`  | double          | RESP3    |
//! | `#`  | boolean         | RESP3    |
//! | `(`  | big number      | RESP3    |
//! | `=`  | verbatim string | RESP3    |
//! | `!`  | bulk error      | RESP3    |
//! | `%`  | map             | RESP3    |
//! | `~`  | set             | RESP3    |
//! | `>`  | push            | RESP3    |

mod codec;
mod command;
mod parser;
mod reader;
mod value;

pub use codec::{encode_command, encoded_len, CRLF};
pub use command::{Command, ToArg};
pub use parser::{
    ParseOptions, Parser, ProtocolVersion, DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_ELEMENTS, DEFAULT_MAX_INLINE_LEN,
};
pub use reader::ReplyReader;
pub use value::Value;
