//! Bounded, name-indexed command cache.
//!
//! A fixed-capacity arena of at most [`MAX_COMMANDS`] entries with unique
//! names. Lookup and removal are O(n) scans — acceptable at 30 entries and
//! free of allocation. The store performs no I/O: persistence is the
//! caller's concern (the retained definition channel is the source of
//! truth; this cache only mirrors it in RAM).

use log::{debug, info};

use crate::command::{CommandName, CommandPayload, StoredCommand, MAX_COMMANDS, MAX_NAME_BYTES};
use crate::error::StoreError;

/// Outcome discriminant for a successful [`CommandStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new slot was appended.
    Added,
    /// An existing slot was overwritten in place (order preserved).
    Updated,
}

/// Bounded command cache.
#[derive(Debug, Default)]
pub struct CommandStore {
    entries: heapless::Vec<StoredCommand, MAX_COMMANDS>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a command by exact name.
    pub fn lookup(&self, name: &str) -> Option<&StoredCommand> {
        self.entries.iter().find(|c| c.name.as_str() == name)
    }

    /// Insert or overwrite a command.
    ///
    /// Overwrites preserve the entry's slot. Validation happens before any
    /// mutation: an over-long name or a full cache leaves the store
    /// byte-for-byte unchanged.
    pub fn upsert(&mut self, name: &str, payload: CommandPayload) -> Result<Upsert, StoreError> {
        if name.len() > MAX_NAME_BYTES {
            return Err(StoreError::NameTooLong);
        }

        if let Some(existing) = self.entries.iter_mut().find(|c| c.name.as_str() == name) {
            debug!("store: updating '{}'", name);
            existing.payload = payload;
            return Ok(Upsert::Updated);
        }

        let name = CommandName::try_from(name).map_err(|()| StoreError::NameTooLong)?;
        self.entries
            .push(StoredCommand { name, payload })
            .map_err(|_| StoreError::CacheFull)?;
        debug!(
            "store: added '{}' ({}/{})",
            self.entries.last().map_or("", |c| c.name.as_str()),
            self.entries.len(),
            MAX_COMMANDS
        );
        Ok(Upsert::Added)
    }

    /// Remove a command by name, compacting the remaining entries so the
    /// order of untouched entries is preserved. Returns `false` (and changes
    /// nothing) if the name is absent.
    pub fn delete(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|c| c.name.as_str() == name) {
            Some(idx) => {
                self.entries.remove(idx);
                info!("store: deleted '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Iterate cached commands in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredCommand> {
        self.entries.iter()
    }
}
