//! # Module Registry
//!
//! Holds module namespaces and resolves `(module, symbol)` pairs to
//! procedures.
//!
//! A module is created from *manifest text*: one directive per line,
//! either a registered procedure name or `name as alias`, with `#`
//! starting a comment. Each directive binds a symbol in the module's
//! namespace to a procedure from the host table. Later directives shadow
//! earlier ones, the way re-defined names shadow in executed source.
//!
//! Module ids are random, regenerated on collision, and never reused
//! while the module lives.

use std::collections::HashMap;

use rand::Rng;
use riftrpc::ModuleId;
use tracing::info;

use crate::procedure::Procedure;
use crate::procedure::ProcedureTable;

/// Module ids are drawn below this bound, like the original bridge's.
const MODULE_ID_SPAN: u32 = 1 << 30;

/// A failure to assemble a module from manifest text.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest line {line}: cannot parse {text:?}")]
    Syntax { line: usize, text: String },
    #[error("manifest line {line}: no procedure named {name:?} is registered")]
    UnknownProcedure { line: usize, name: String },
}

/// One module: an isolated namespace binding symbols to procedures.
pub struct Module<E> {
    symbols: HashMap<String, Procedure<E>>,
}

impl<E> Module<E> {
    /// Assembles a namespace by evaluating manifest text against the
    /// host's procedure table.
    fn assemble(table: &ProcedureTable<E>, source: &str) -> Result<Self, ManifestError> {
        let mut symbols = HashMap::new();

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw.split('#').next().unwrap_or("").trim();
            if text.is_empty() {
                continue;
            }

            let mut tokens = text.split_whitespace();
            let Some(name) = tokens.next() else { continue };
            let symbol = match (tokens.next(), tokens.next(), tokens.next()) {
                (None, None, None) => name,
                (Some("as"), Some(alias), None) => alias,
                _ => {
                    return Err(ManifestError::Syntax {
                        line,
                        text: text.to_string(),
                    });
                }
            };

            let procedure = table.get(name).ok_or_else(|| ManifestError::UnknownProcedure {
                line,
                name: name.to_string(),
            })?;
            symbols.insert(symbol.to_string(), procedure.clone());
        }

        Ok(Self { symbols })
    }

    pub fn symbol(&self, name: &str) -> Option<&Procedure<E>> {
        self.symbols.get(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// All live modules, keyed by id.
pub struct ModuleRegistry<E> {
    modules: HashMap<ModuleId, Module<E>>,
}

impl<E> ModuleRegistry<E> {
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Creates a module from manifest text and returns its generated id.
    pub fn add(
        &mut self,
        table: &ProcedureTable<E>,
        source: &str,
    ) -> Result<ModuleId, ManifestError> {
        let module = Module::assemble(table, source)?;
        let id = self.vacant_id();
        info!(%id, symbols = module.len(), "module added");
        self.modules.insert(id, module);
        Ok(id)
    }

    /// Deletes a module namespace. Unknown ids are a no-op, not an error.
    pub fn remove(&mut self, id: ModuleId) {
        if self.modules.remove(&id).is_some() {
            info!(%id, "module removed");
        }
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module<E>> {
        self.modules.get(&id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn vacant_id(&self) -> ModuleId {
        let mut rng = rand::thread_rng();
        loop {
            let id = ModuleId(rng.gen_range(0..MODULE_ID_SPAN));
            if !self.modules.contains_key(&id) {
                return id;
            }
        }
    }
}

impl<E> Default for ModuleRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
