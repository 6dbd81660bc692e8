//! Standard commands and their ranks
//!
//! Ranks are spaced by ten so a custom command can slot in between two
//! standard ones without renumbering. Deploy runs ascending by execute rank;
//! undo runs descending by undo rank, so dependents are removed before what
//! they depend on (app servers before databases, users before roles).

use crate::command::{BoxedCommand, FileResourceCommand, ResourceCommand, ResourceLayout};
use crate::config::{AppConfig, CommandSettings, RankOverride};
use crate::scanner::{ExcludeFilenames, IncludeFilenames};
use crate::types::ResourceKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const GROUPS: &str = "groups";
pub const PRIVILEGES: &str = "privileges";
pub const ROLES: &str = "roles";
pub const USERS: &str = "users";
pub const TRIGGERS_DATABASE: &str = "triggers-database";
pub const SCHEMAS_DATABASE: &str = "schemas-database";
pub const CONTENT_DATABASES: &str = "content-databases";
pub const OTHER_DATABASES: &str = "other-databases";
pub const FORESTS: &str = "forests";
pub const APP_SERVERS: &str = "app-servers";
pub const CPF_PIPELINES: &str = "cpf-pipelines";
pub const CPF_DOMAINS: &str = "cpf-domains";
pub const CPF_CONFIGS: &str = "cpf-configs";
pub const FLEXREP_CONFIGS: &str = "flexrep-configs";
pub const FLEXREP_TARGETS: &str = "flexrep-targets";

pub const TRIGGERS_DATABASE_FILE: &str = "triggers-database.json";
pub const SCHEMAS_DATABASE_FILE: &str = "schemas-database.json";

/// (command, execute rank, undo rank)
pub const STANDARD_RANKS: &[(&str, i32, i32)] = &[
    (GROUPS, 10, 10),
    (PRIVILEGES, 20, 20),
    (ROLES, 30, 30),
    (USERS, 40, 40),
    (TRIGGERS_DATABASE, 50, 50),
    (SCHEMAS_DATABASE, 60, 60),
    (CONTENT_DATABASES, 70, 70),
    (OTHER_DATABASES, 80, 80),
    (FORESTS, 90, 90),
    (APP_SERVERS, 100, 100),
    (CPF_PIPELINES, 110, 110),
    (CPF_DOMAINS, 120, 120),
    (CPF_CONFIGS, 130, 130),
    (FLEXREP_CONFIGS, 140, 140),
    (FLEXREP_TARGETS, 150, 150),
];

/// Explicit command-name to rank mapping
///
/// An entry overrides the ranks a command declares; either half of an entry
/// may be left unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankTable {
    entries: BTreeMap<String, RankOverride>,
}

impl RankTable {
    /// An empty table: every command keeps its declared ranks
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard ranks
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (name, execute, undo) in STANDARD_RANKS {
            table.set(*name, *execute, *undo);
        }
        table
    }

    /// Standard ranks with configured overrides applied on top
    pub fn from_config(config: &AppConfig) -> Self {
        let mut table = Self::standard();
        for (name, ranks) in &config.ranks {
            table.apply(name, ranks);
        }
        table
    }

    pub fn set(&mut self, name: impl Into<String>, execute: i32, undo: i32) {
        self.entries.insert(
            name.into(),
            RankOverride {
                execute: Some(execute),
                undo: Some(undo),
            },
        );
    }

    /// Merge a partial override into the entry for `name`
    pub fn apply(&mut self, name: &str, ranks: &RankOverride) {
        let entry = self.entries.entry(name.to_string()).or_default();
        if ranks.execute.is_some() {
            entry.execute = ranks.execute;
        }
        if ranks.undo.is_some() {
            entry.undo = ranks.undo;
        }
    }

    pub fn execute_rank(&self, command: &dyn ResourceCommand) -> i32 {
        self.entries
            .get(command.name())
            .and_then(|r| r.execute)
            .unwrap_or_else(|| command.execute_rank())
    }

    pub fn undo_rank(&self, command: &dyn ResourceCommand) -> i32 {
        self.entries
            .get(command.name())
            .and_then(|r| r.undo)
            .unwrap_or_else(|| command.undo_rank())
    }
}

fn standard_ranks(name: &str) -> (i32, i32) {
    STANDARD_RANKS
        .iter()
        .find(|(n, _, _)| *n == name)
        .map_or((0, 0), |(_, e, u)| (*e, *u))
}

/// A file command with its standard ranks and the configured overrides
fn file_command(
    config: &AppConfig,
    name: &str,
    layout: ResourceLayout,
    settings: CommandSettings,
) -> FileResourceCommand {
    let (execute, undo) = standard_ranks(name);
    let command = FileResourceCommand::new(name, layout)
        .with_ranks(execute, undo)
        .with_settings(settings);
    match config.command_overrides(name) {
        Some(overrides) => command.with_overrides(overrides),
        None => command,
    }
}

/// The standard set of resource commands for `config`
///
/// Database-scoped kinds (CPF on the triggers database, flexible replication
/// on the content database) take their database names from the config.
pub fn standard_commands(config: &AppConfig) -> Vec<BoxedCommand> {
    let defaults = CommandSettings::default;
    let triggers_db = config.triggers_database_name();
    let content_db = config.content_database_name();

    let security = PathBuf::from("security");
    let databases = PathBuf::from("databases");
    let cpf = PathBuf::from("cpf");
    let flexrep = PathBuf::from("flexrep");

    let content_files = config.content_database_files.clone();
    let mut claimed = ExcludeFilenames::new(content_files.iter().cloned());
    claimed.add(TRIGGERS_DATABASE_FILE);
    claimed.add(SCHEMAS_DATABASE_FILE);

    let targets_db = content_db.clone();
    let flexrep_targets = ResourceLayout::Subdirectories {
        root: flexrep.join("targets"),
        kind: Arc::new(move |config_name| ResourceKind::FlexrepTarget {
            database: targets_db.clone(),
            config: config_name.to_string(),
        }),
    };

    let commands = vec![
        file_command(
            config,
            GROUPS,
            ResourceLayout::directory("groups", ResourceKind::Group),
            defaults(),
        ),
        file_command(
            config,
            PRIVILEGES,
            ResourceLayout::directory(security.join("privileges"), ResourceKind::Privilege),
            defaults(),
        ),
        file_command(
            config,
            ROLES,
            ResourceLayout::directory(security.join("roles"), ResourceKind::Role),
            defaults(),
        ),
        file_command(
            config,
            USERS,
            ResourceLayout::directory(security.join("users"), ResourceKind::User),
            defaults(),
        ),
        file_command(
            config,
            TRIGGERS_DATABASE,
            ResourceLayout::directory(&databases, ResourceKind::Database),
            defaults(),
        )
        .with_filter(Arc::new(IncludeFilenames::new([TRIGGERS_DATABASE_FILE]))),
        file_command(
            config,
            SCHEMAS_DATABASE,
            ResourceLayout::directory(&databases, ResourceKind::Database),
            defaults(),
        )
        .with_filter(Arc::new(IncludeFilenames::new([SCHEMAS_DATABASE_FILE]))),
        file_command(
            config,
            CONTENT_DATABASES,
            ResourceLayout::directory(&databases, ResourceKind::Database),
            defaults(),
        )
        .with_filter(Arc::new(IncludeFilenames::new(content_files))),
        // Deploy only: undo leaves databases it did not claim alone
        file_command(
            config,
            OTHER_DATABASES,
            ResourceLayout::directory(&databases, ResourceKind::Database),
            defaults().delete_resources_on_undo(false),
        )
        .with_filter(Arc::new(claimed)),
        file_command(
            config,
            FORESTS,
            ResourceLayout::subdirectories_of(FORESTS, ResourceKind::Forest),
            defaults()
                .async_enabled(true)
                .delete_resources_on_undo(false),
        ),
        file_command(
            config,
            APP_SERVERS,
            ResourceLayout::directory("servers", ResourceKind::AppServer),
            defaults()
                .restart_after_delete(true)
                .catch_exception_on_delete_failure(true),
        ),
        file_command(
            config,
            CPF_PIPELINES,
            ResourceLayout::directory(
                cpf.join("pipelines"),
                ResourceKind::CpfPipeline {
                    database: triggers_db.clone(),
                },
            ),
            defaults(),
        ),
        file_command(
            config,
            CPF_DOMAINS,
            ResourceLayout::directory(
                cpf.join("domains"),
                ResourceKind::CpfDomain {
                    database: triggers_db.clone(),
                },
            ),
            defaults(),
        ),
        file_command(
            config,
            CPF_CONFIGS,
            ResourceLayout::directory(
                cpf.join("cpf-configs"),
                ResourceKind::CpfConfig {
                    database: triggers_db,
                },
            ),
            defaults(),
        ),
        file_command(
            config,
            FLEXREP_CONFIGS,
            ResourceLayout::directory(
                flexrep.join("configs"),
                ResourceKind::FlexrepConfig {
                    database: content_db,
                },
            ),
            defaults(),
        ),
        file_command(config, FLEXREP_TARGETS, flexrep_targets, defaults()),
    ];

    commands
        .into_iter()
        .map(|c| Box::new(c) as BoxedCommand)
        .collect()
}
