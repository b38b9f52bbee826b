//! Shared Connection
//!
//! A connection's buffers, parser and pending count change together, so
//! sharing one across threads means locking the whole connection for each
//! operation.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::Result;
use crate::protocol::{Command, Value};

use super::connection::{CloseSummary, Connection};
use super::pipeline::Pipeline;

/// A connection usable from several threads, one operation at a time
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Send one command and wait for its reply while holding the lock
    pub fn command(&self, command: &Command) -> Result<Value> {
        self.inner.lock().command(command)
    }

    /// Run a whole pipeline while holding the lock
    pub fn pipeline(&self, pipeline: &Pipeline) -> Result<Vec<Value>> {
        let mut conn = self.inner.lock();
        pipeline.execute(&mut conn)
    }

    /// Lock the connection for a multi-step operation
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.inner.lock()
    }

    pub fn close(&self) -> CloseSummary {
        self.inner.lock().close()
    }
}
