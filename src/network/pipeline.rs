//! Pipeline
//!
//! Batches commands into one write and reads their replies back in order.

use crate::error::{RedlinkError, Result};
use crate::protocol::{Command, Value};

use super::connection::Connection;

/// An ordered batch of commands
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command (builder style)
    pub fn cmd(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Add a command in place
    pub fn add(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Enqueue every command, flush once, then read one reply per command
    ///
    /// Replies are returned in command order. Server error replies are
    /// ordinary entries in the result.
    pub fn execute(&self, conn: &mut Connection) -> Result<Vec<Value>> {
        if conn.pending_replies() > 0 {
            return Err(RedlinkError::PipelineBusy {
                pending: conn.pending_replies(),
            });
        }
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }

        for command in &self.commands {
            conn.enqueue(command)?;
        }
        conn.flush()?;

        let mut replies = Vec::with_capacity(self.commands.len());
        for _ in 0..self.commands.len() {
            replies.push(conn.read_reply()?);
        }
        Ok(replies)
    }
}
