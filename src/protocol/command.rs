//! Command definitions
//!
//! A command is an ordered list of binary-safe arguments, the first being the
//! command name. Nothing here interprets command names.

use bytes::Bytes;

use crate::buffer::Buffer;
use crate::error::Result;

use super::codec::{encode_command, encoded_len};

/// Conversion into a single binary-safe command argument
pub trait ToArg {
    fn to_arg(&self) -> Bytes;
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> ToArg for [u8; N] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

macro_rules! numeric_to_arg {
    ($($t:ty),*) => {
        $(
            impl ToArg for $t {
                fn to_arg(&self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

numeric_to_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// A command ready to be encoded
///
/// ```
/// use redlink::protocol::Command;
///
/// let cmd = Command::new("SET").arg("bar").arg(&b"hel\0lo"[..]);
/// assert_eq!(cmd.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start a command with its name
    pub fn new(name: impl ToArg) -> Self {
        Self {
            args: vec![name.to_arg()],
        }
    }

    /// Build a command from an argument vector
    pub fn from_argv<I, A>(argv: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: ToArg,
    {
        Self {
            args: argv.into_iter().map(|a| a.to_arg()).collect(),
        }
    }

    /// Build a command by splitting a line on ASCII whitespace
    ///
    /// Arguments containing spaces cannot be expressed this way; use
    /// [`Command::arg`] for those.
    pub fn from_line(line: &str) -> Self {
        Self::from_argv(line.split_ascii_whitespace())
    }

    /// Append an argument (builder style)
    pub fn arg(mut self, arg: impl ToArg) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Append an argument in place
    pub fn push_arg(&mut self, arg: impl ToArg) {
        self.args.push(arg.to_arg());
    }

    /// The command name (first argument)
    pub fn name(&self) -> Option<&[u8]> {
        self.args.first().map(|a| a.as_ref())
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Size of the encoded frame in bytes
    pub fn encoded_len(&self) -> usize {
        encoded_len(&self.args)
    }

    /// Append the encoded frame to `out`, returning the bytes written
    pub fn encode(&self, out: &mut Buffer) -> Result<usize> {
        encode_command(&self.args, out)
    }
}
