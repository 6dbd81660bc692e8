//! Core types for resource orchestration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result of one upsert against the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    /// Identifier of the saved resource (comma-joined when the file held an array)
    pub resource_id: String,
    /// Whether the resource existed before the call
    pub existed_before: bool,
    /// Whether the resource exists after the call
    pub exists_now: bool,
    /// Raw response body, if the server sent one
    pub response: Option<String>,
}

impl SaveReceipt {
    /// Receipt for a resource that did not exist and was created
    pub fn created(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            existed_before: false,
            exists_now: true,
            response: None,
        }
    }

    /// Receipt for a resource that existed and was updated in place
    pub fn updated(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            existed_before: true,
            exists_now: true,
            response: None,
        }
    }

    /// Attach the raw server response
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Check if the call created a new resource
    pub fn is_created(&self) -> bool {
        !self.existed_before && self.exists_now
    }
}

/// Result of one delete against the management API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Identifier of the resource
    pub resource_id: String,
    /// Whether something was actually deleted
    pub deleted: bool,
    /// Raw response body, if the server sent one
    pub response: Option<String>,
}

impl DeleteOutcome {
    /// The resource existed and was removed
    pub fn deleted(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            deleted: true,
            response: None,
        }
    }

    /// There was nothing to delete
    pub fn not_found(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            deleted: false,
            response: None,
        }
    }

    /// Attach the raw server response
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }
}

/// A resource-definition file read from the configuration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// Where the file lives
    pub path: PathBuf,
    /// Raw file content, passed to the management API unmodified
    pub content: String,
}

impl ResourceFile {
    /// File name without directories, for logging and filtering
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Remote collection a command addresses
///
/// Kinds scoped to a database (CPF, flexible replication) carry the
/// database name; flexrep targets also carry their owning config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Group,
    Privilege,
    Role,
    User,
    Database,
    Forest,
    AppServer,
    CpfDomain { database: String },
    CpfPipeline { database: String },
    CpfConfig { database: String },
    FlexrepConfig { database: String },
    FlexrepTarget { database: String, config: String },
}

impl ResourceKind {
    /// Name of the payload field that identifies a resource of this kind
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Group => "group-name",
            Self::Privilege => "privilege-name",
            Self::Role => "role-name",
            Self::User => "user-name",
            Self::Database => "database-name",
            Self::Forest => "forest-name",
            Self::AppServer => "server-name",
            Self::CpfDomain { .. } => "domain-name",
            Self::CpfPipeline { .. } => "pipeline-name",
            // CPF configs are keyed by the domain they apply to
            Self::CpfConfig { .. } => "domain-name",
            Self::FlexrepConfig { .. } => "domain-name",
            Self::FlexrepTarget { .. } => "target-name",
        }
    }

    /// Short label for logs and plans
    pub fn label(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Privilege => "privilege",
            Self::Role => "role",
            Self::User => "user",
            Self::Database => "database",
            Self::Forest => "forest",
            Self::AppServer => "app server",
            Self::CpfDomain { .. } => "CPF domain",
            Self::CpfPipeline { .. } => "CPF pipeline",
            Self::CpfConfig { .. } => "CPF config",
            Self::FlexrepConfig { .. } => "flexrep config",
            Self::FlexrepTarget { .. } => "flexrep target",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpfDomain { database }
            | Self::CpfPipeline { database }
            | Self::CpfConfig { database }
            | Self::FlexrepConfig { database } => write!(f, "{} ({})", self.label(), database),
            Self::FlexrepTarget { database, config } => {
                write!(f, "{} ({}/{})", self.label(), database, config)
            }
            _ => write!(f, "{}", self.label()),
        }
    }
}

/// Counters for what one command did during a phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSummary {
    /// Files handed to the resource manager
    pub files: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Deletes that reported nothing to delete
    pub not_found: usize,
    /// Delete failures that were logged and swallowed
    pub tolerated_failures: usize,
}

impl CommandSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Record the effect of one upsert
    pub fn add_receipt(&mut self, receipt: &SaveReceipt) {
        self.files += 1;
        if receipt.existed_before {
            self.updated += 1;
        } else {
            self.created += 1;
        }
    }

    /// Record the effect of one delete
    pub fn add_outcome(&mut self, outcome: &DeleteOutcome) {
        self.files += 1;
        if outcome.deleted {
            self.deleted += 1;
        } else {
            self.not_found += 1;
        }
    }

    /// Record a delete failure that was logged and swallowed
    pub fn add_tolerated_failure(&mut self) {
        self.files += 1;
        self.tolerated_failures += 1;
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &CommandSummary) {
        self.files += other.files;
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.not_found += other.not_found;
        self.tolerated_failures += other.tolerated_failures;
    }
}

/// Commands that ran to completion during one phase, in run order
#[derive(Debug, Clone, Default)]
pub struct PhaseReport {
    pub commands: Vec<(String, CommandSummary)>,
}

impl PhaseReport {
    /// Names of the commands that ran, in order
    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Summary across every command in the phase
    pub fn total(&self) -> CommandSummary {
        let mut total = CommandSummary::default();
        for (_, summary) in &self.commands {
            total.merge(summary);
        }
        total
    }
}
