//! Mirror registry.
//!
//! Registration happens in two phases:
//!
//! 1. While the host's setup window is open, mirrors are registered into a
//!    [`MirrorRegistryBuilder`] and their whitelists extended.
//! 2. [`MirrorRegistryBuilder::finalize`] consumes the builder and yields an
//!    immutable [`CommittedRegistry`], the only form accepted by the
//!    synthesizer and the query rewriter.
//!
//! The window itself belongs to the host: it is closed when the host signals
//! that initialization is complete, after which the builder refuses any
//! further mutation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::MetaTableCatalog;
use crate::error::MirrorError;
use crate::mirror::{MirrorDefinition, MirrorId};

/// Handle to the host's registration window.
///
/// Clones share the same state, so the host can keep one handle and close
/// it from its own lifecycle hook.
#[derive(Debug, Clone)]
pub struct SetupWindow {
    open: Arc<AtomicBool>,
}

impl Default for SetupWindow {
    fn default() -> Self {
        Self::open()
    }
}

impl SetupWindow {
    /// A window that accepts registrations.
    pub fn open() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the window. Irreversible for this handle and all its clones.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::debug!("Mirror setup window closed");
        }
    }
}

/// Accepts mirror registrations while the setup window is open.
#[derive(Debug)]
pub struct MirrorRegistryBuilder {
    catalog: MetaTableCatalog,
    window: SetupWindow,
    mirrors: Vec<MirrorDefinition>,
    index: HashMap<MirrorId, usize>,
}

impl MirrorRegistryBuilder {
    pub fn new(catalog: MetaTableCatalog, window: SetupWindow) -> Self {
        Self {
            catalog,
            window,
            mirrors: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &MetaTableCatalog {
        &self.catalog
    }

    pub fn window(&self) -> &SetupWindow {
        &self.window
    }

    /// Define and register a mirror in one step.
    pub fn register<I, S>(
        &mut self,
        source_table: &str,
        value_type: &str,
        type_args: I,
    ) -> Result<MirrorId, MirrorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_open("registering a mirror")?;
        let definition =
            MirrorDefinition::parse(&self.catalog, source_table, value_type, type_args)?;
        self.add(definition)
    }

    /// Register a prebuilt definition.
    pub fn add(&mut self, definition: MirrorDefinition) -> Result<MirrorId, MirrorError> {
        self.ensure_open("registering a mirror")?;

        let id = definition.id().clone();
        if self.index.contains_key(&id) {
            return Err(MirrorError::DuplicateMirror { id: id.to_string() });
        }

        tracing::debug!(
            mirror = %id,
            source = definition.source_table(),
            keys = definition.whitelist().len(),
            "Registered mirror"
        );

        self.index.insert(id.clone(), self.mirrors.len());
        self.mirrors.push(definition);
        Ok(id)
    }

    /// Whitelist another key pattern on a registered mirror.
    pub fn add_key(&mut self, id: &MirrorId, like_pattern: &str) -> Result<(), MirrorError> {
        self.ensure_open("whitelisting a key")?;

        let position = *self
            .index
            .get(id)
            .ok_or_else(|| MirrorError::UnknownMirror { id: id.to_string() })?;
        self.mirrors[position].add_key(like_pattern)
    }

    pub fn lookup(&self, id: &MirrorId) -> Option<&MirrorDefinition> {
        self.index.get(id).map(|&i| &self.mirrors[i])
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorDefinition> {
        self.mirrors.iter()
    }

    /// Drop every registration. Intended for test harnesses and
    /// administrative tooling.
    pub fn reset(&mut self) {
        self.mirrors.clear();
        self.index.clear();
    }

    /// Freeze the registrations.
    pub fn finalize(self) -> CommittedRegistry {
        tracing::info!(mirrors = self.mirrors.len(), "Mirror registry finalized");
        CommittedRegistry {
            catalog: self.catalog,
            mirrors: self.mirrors,
            index: self.index,
        }
    }

    fn ensure_open(&self, operation: &str) -> Result<(), MirrorError> {
        if self.window.is_open() {
            Ok(())
        } else {
            Err(MirrorError::LifecycleViolation {
                operation: operation.to_string(),
            })
        }
    }
}

/// Immutable set of mirrors, in registration order.
#[derive(Debug, Clone)]
pub struct CommittedRegistry {
    catalog: MetaTableCatalog,
    mirrors: Vec<MirrorDefinition>,
    index: HashMap<MirrorId, usize>,
}

impl CommittedRegistry {
    pub fn catalog(&self) -> &MetaTableCatalog {
        &self.catalog
    }

    pub fn lookup(&self, id: &MirrorId) -> Option<&MirrorDefinition> {
        self.index.get(id).map(|&i| &self.mirrors[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MirrorDefinition> {
        self.mirrors.iter()
    }

    pub fn mirrors(&self) -> &[MirrorDefinition] {
        &self.mirrors
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// Distinct source tables, in order of first registration.
    pub fn source_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for mirror in &self.mirrors {
            if !tables.contains(&mirror.source_table()) {
                tables.push(mirror.source_table());
            }
        }
        tables
    }

    /// Mirrors of one source table, in registration order.
    pub fn mirrors_for<'a>(
        &'a self,
        source_table: &'a str,
    ) -> impl Iterator<Item = &'a MirrorDefinition> + 'a {
        self.mirrors
            .iter()
            .filter(move |m| m.source_table() == source_table)
    }
}
