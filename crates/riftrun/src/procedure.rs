//! # Procedure Table
//!
//! Native code that modules can bind and the control process can invoke.
//!
//! The original bridge executed arbitrary submitted source server-side.
//! This rendition narrows the contract: the host registers a fixed table
//! of named procedures at construction time, and module manifests select
//! from it (see [`crate::registry`]). What survives unchanged is the
//! calling convention — every procedure receives the engine root plus the
//! demarshalled operands, and answers with one operand.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use riftrpc::Value;

use crate::directory::ResourceHandle;

/// One demarshalled argument or result of a procedure call.
///
/// Plain data travels by copy; resources travel as live handles that the
/// dispatcher has already resolved (arguments) or will identify and
/// activate (results).
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Resource(ResourceHandle),
}

impl Operand {
    /// The unit value, for procedures with nothing to return.
    pub fn unit() -> Self {
        Operand::Value(Value::Unit)
    }

    pub fn expect_value(self) -> anyhow::Result<Value> {
        match self {
            Operand::Value(v) => Ok(v),
            Operand::Resource(h) => Err(anyhow!("expected a plain value, got resource {}", h)),
        }
    }

    pub fn expect_resource(self) -> anyhow::Result<ResourceHandle> {
        match self {
            Operand::Resource(h) => Ok(h),
            Operand::Value(v) => Err(anyhow!("expected a resource, got value {:?}", v)),
        }
    }

    pub fn expect_str(self) -> anyhow::Result<String> {
        match self.expect_value()? {
            Value::Str(s) => Ok(s),
            other => Err(anyhow!("expected a string, got {:?}", other)),
        }
    }

    pub fn expect_int(self) -> anyhow::Result<i64> {
        match self.expect_value()? {
            Value::Int(n) => Ok(n),
            other => Err(anyhow!("expected an integer, got {:?}", other)),
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<ResourceHandle> for Operand {
    fn from(h: ResourceHandle) -> Self {
        Operand::Resource(h)
    }
}

/// A registered procedure: engine root in, operands in, one operand out.
///
/// Failures are ordinary `anyhow` errors; the dispatcher formats them into
/// the diagnostic text of an `error`-tagged wire result.
pub type Procedure<E> = Arc<dyn Fn(&mut E, Vec<Operand>) -> anyhow::Result<Operand> + Send + Sync>;

/// The host's fixed table of invocable procedures, keyed by name.
///
/// Built once at host construction and immutable afterwards; module
/// namespaces borrow bindings from it.
pub struct ProcedureTable<E> {
    entries: HashMap<String, Procedure<E>>,
}

impl<E> ProcedureTable<E> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a procedure under a name. A repeated name replaces the
    /// earlier registration.
    pub fn define<F>(&mut self, name: impl Into<String>, procedure: F)
    where
        F: Fn(&mut E, Vec<Operand>) -> anyhow::Result<Operand> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Arc::new(procedure));
    }

    /// Installs every procedure of a set.
    pub fn install(&mut self, set: &dyn ProcedureSet<E>) -> anyhow::Result<()> {
        set.install(self)
    }

    pub fn get(&self, name: &str) -> Option<&Procedure<E>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for ProcedureTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A bundle of procedures that installs itself into a table.
///
/// The seam for embedders: scene tooling, asset import, diagnostics — each
/// ships as a set and is installed at host construction.
pub trait ProcedureSet<E>: Send + Sync {
    fn install(&self, table: &mut ProcedureTable<E>) -> anyhow::Result<()>;
}
