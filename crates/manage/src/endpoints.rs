//! REST paths for each resource kind

use crate::error::Result;
use crate::payload;
use orchestration::ResourceKind;

const MANAGE: &str = "/manage/v2";

/// Admin API path answering with the server's last startup time
pub const TIMESTAMP_PATH: &str = "/admin/v1/timestamp";

/// Collection path for `kind`, where new resources are created
pub fn collection_path(kind: &ResourceKind) -> String {
    match kind {
        ResourceKind::Group => format!("{MANAGE}/groups"),
        ResourceKind::Privilege => format!("{MANAGE}/privileges"),
        ResourceKind::Role => format!("{MANAGE}/roles"),
        ResourceKind::User => format!("{MANAGE}/users"),
        ResourceKind::Database => format!("{MANAGE}/databases"),
        ResourceKind::Forest => format!("{MANAGE}/forests"),
        ResourceKind::AppServer => format!("{MANAGE}/servers"),
        ResourceKind::CpfDomain { database } => {
            format!("{MANAGE}/databases/{}/domains", encode_segment(database))
        }
        ResourceKind::CpfPipeline { database } => {
            format!("{MANAGE}/databases/{}/pipelines", encode_segment(database))
        }
        ResourceKind::CpfConfig { database } => {
            format!("{MANAGE}/databases/{}/cpf-configs", encode_segment(database))
        }
        ResourceKind::FlexrepConfig { database } => {
            format!("{MANAGE}/databases/{}/flexrep/configs", encode_segment(database))
        }
        ResourceKind::FlexrepTarget { database, config } => format!(
            "{MANAGE}/databases/{}/flexrep/configs/{}/targets",
            encode_segment(database),
            encode_segment(config)
        ),
    }
}

/// Path of one resource
pub fn resource_path(kind: &ResourceKind, id: &str) -> String {
    format!("{}/{}", collection_path(kind), encode_segment(id))
}

/// Path of one resource's properties, used for existence checks and updates
pub fn properties_path(kind: &ResourceKind, id: &str) -> String {
    format!("{}/properties", resource_path(kind, id))
}

/// Query parameter that scopes a resource, read from its payload
///
/// App servers are addressed within a group and privileges by kind.
pub fn scope_query(kind: &ResourceKind, payload: &str) -> Result<Option<(&'static str, String)>> {
    Ok(match kind {
        ResourceKind::AppServer => {
            let group = payload::field(payload, "group-name")?.unwrap_or_else(|| "Default".into());
            Some(("group-id", group))
        }
        ResourceKind::Privilege => {
            let kind = payload::field(payload, "kind")?.unwrap_or_else(|| "execute".into());
            Some(("kind", kind))
        }
        _ => None,
    })
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
