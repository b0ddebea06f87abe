//! Command classification
//!
//! Every command id belongs to exactly one tier. Ids absent from both tables
//! are `AccessTier::None` and always allowed.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Built-in reader-tier command ids.
pub const BUILTIN_READER_COMMANDS: &[&str] = &[
    "app.list",
    "app.logs",
    "app.status",
    "app.problems",
    "database.list",
    "database.info",
    "database.views.list",
    "database.views.run",
    "container.list",
    "container.logs",
    "container.status",
    "containergroup.list",
    "service.list",
    "space.get",
    "space.list",
    "space.service.list",
    "space.set",
    "vm.list",
    "classifier.status",
    "classifier.list",
    "storage.container.list",
    "storage.container.details",
    "function.list",
    "function.namespace.list",
    "function.namespace.get",
    "function.namespace.set",
    "feed.list",
];

/// Built-in power-tier command ids.
pub const BUILTIN_POWER_COMMANDS: &[&str] = &[
    "app.remove",
    "app.restage",
    "app.scale",
    "app.start",
    "app.stop",
    "app.restart",
    "database.create",
    "database.permissions.set",
    "container.remove",
    "container.start",
    "container.stop",
    "containergroup.remove",
    "containergroup.scale",
    "service.bind",
    "service.create",
    "service.remove",
    "service.unbind",
    "vm.destroy",
    "vm.reboot",
    "vm.start",
    "vm.stop",
    "repo.deploy",
    "classifier.train",
    "classifier.auto.approve",
    "storage.object.retrieve",
    "function.invoke",
    "feed.monitoring.enable",
    "feed.monitoring.disable",
    "feed.edit",
];

/// Tier a command requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    /// Unclassified - always allowed
    None,
    /// Reader-tier; power membership also satisfies it
    Reader,
    /// Power-tier
    Power,
}

impl AccessTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::None => "none",
            AccessTier::Reader => "reader",
            AccessTier::Power => "power",
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static command id → tier tables.
#[derive(Debug, Clone)]
pub struct PolicyTables {
    reader: HashSet<String>,
    power: HashSet<String>,
}

impl PolicyTables {
    /// Build tables from explicit id lists.
    ///
    /// An id listed in both is treated as power-tier.
    pub fn new<R, P>(reader: R, power: P) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            reader: reader.into_iter().map(Into::into).collect(),
            power: power.into_iter().map(Into::into).collect(),
        }
    }

    /// Tables holding the built-in command families.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_READER_COMMANDS.iter().copied(),
            BUILTIN_POWER_COMMANDS.iter().copied(),
        )
    }

    /// Classify a command id by exact match.
    pub fn classify(&self, command_id: &str) -> AccessTier {
        if self.power.contains(command_id) {
            AccessTier::Power
        } else if self.reader.contains(command_id) {
            AccessTier::Reader
        } else {
            AccessTier::None
        }
    }

    pub fn is_reader_command(&self, command_id: &str) -> bool {
        self.classify(command_id) == AccessTier::Reader
    }

    pub fn is_power_command(&self, command_id: &str) -> bool {
        self.classify(command_id) == AccessTier::Power
    }
}

impl Default for PolicyTables {
    fn default() -> Self {
        Self::builtin()
    }
}
