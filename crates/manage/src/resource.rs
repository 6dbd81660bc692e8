//! REST resource manager
//!
//! One manager per resource kind. Saving checks existence with a GET on the
//! properties endpoint, then either creates (POST to the collection) or
//! updates (PUT to the properties endpoint). Deleting is a DELETE on the
//! resource; a 404 means there was nothing to delete.

use crate::endpoints;
use crate::error::Result;
use crate::payload::{self, PayloadFormat};
use crate::transport::{Request, Transport};
use orchestration::{DeleteOutcome, ResourceKind, ResourceManager, SaveReceipt};
use std::sync::Arc;

pub struct HttpResourceManager {
    transport: Arc<dyn Transport>,
    kind: ResourceKind,
}

impl HttpResourceManager {
    pub fn new(transport: Arc<dyn Transport>, kind: ResourceKind) -> Self {
        Self { transport, kind }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    fn exists(&self, id: &str, scope: Option<(&'static str, String)>) -> Result<bool> {
        let request =
            Request::get(endpoints::properties_path(&self.kind, id)).with_optional_query(scope);
        let response = self.transport.send(&request)?;
        if response.is_not_found() {
            return Ok(false);
        }
        response.error_for_status(&request)?;
        Ok(true)
    }

    fn save_one(&self, payload: &str) -> Result<SaveReceipt> {
        let format = PayloadFormat::detect(payload)?;
        let id = payload::resource_id(payload, self.kind.id_field())?;
        let scope = endpoints::scope_query(&self.kind, payload)?;

        if self.exists(&id, scope.clone())? {
            log::info!("Updating {} {id}", self.kind);
            let request = Request::put(
                endpoints::properties_path(&self.kind, &id),
                payload,
                format.content_type(),
            )
            .with_optional_query(scope);
            let response = self.transport.send(&request)?.error_for_status(&request)?;
            Ok(SaveReceipt::updated(id).with_response(response.body))
        } else {
            log::info!("Creating {} {id}", self.kind);
            let request = Request::post(
                endpoints::collection_path(&self.kind),
                payload,
                format.content_type(),
            )
            .with_optional_query(scope);
            let response = self.transport.send(&request)?.error_for_status(&request)?;
            Ok(SaveReceipt::created(id).with_response(response.body))
        }
    }

    fn delete_one(&self, payload: &str) -> Result<DeleteOutcome> {
        let id = payload::resource_id(payload, self.kind.id_field())?;
        let scope = endpoints::scope_query(&self.kind, payload)?;
        let request =
            Request::delete(endpoints::resource_path(&self.kind, &id)).with_optional_query(scope);

        let response = self.transport.send(&request)?;
        if response.is_not_found() {
            log::info!("{} {id} does not exist, nothing to delete", self.kind);
            return Ok(DeleteOutcome::not_found(id));
        }
        let response = response.error_for_status(&request)?;
        log::info!("Deleted {} {id}", self.kind);
        Ok(DeleteOutcome::deleted(id).with_response(response.body))
    }
}

/// Combine per-element results of an array payload into one
fn combine_receipts(receipts: Vec<SaveReceipt>) -> SaveReceipt {
    let existed_before = receipts.iter().all(|r| r.existed_before);
    let ids: Vec<String> = receipts.into_iter().map(|r| r.resource_id).collect();
    SaveReceipt {
        resource_id: ids.join(","),
        existed_before,
        exists_now: true,
        response: None,
    }
}

fn combine_outcomes(outcomes: Vec<DeleteOutcome>) -> DeleteOutcome {
    let deleted = outcomes.iter().any(|o| o.deleted);
    let ids: Vec<String> = outcomes.into_iter().map(|o| o.resource_id).collect();
    DeleteOutcome {
        resource_id: ids.join(","),
        deleted,
        response: None,
    }
}

impl ResourceManager for HttpResourceManager {
    fn save(&self, payload: &str) -> orchestration::Result<SaveReceipt> {
        let mut parts = payload::split(payload)?;
        if parts.len() == 1
            && let Some(part) = parts.pop()
        {
            return Ok(self.save_one(&part)?);
        }
        let receipts = parts
            .iter()
            .map(|part| self.save_one(part))
            .collect::<Result<Vec<_>>>()?;
        Ok(combine_receipts(receipts))
    }

    fn delete(&self, payload: &str) -> orchestration::Result<DeleteOutcome> {
        let mut parts = payload::split(payload)?;
        if parts.len() == 1
            && let Some(part) = parts.pop()
        {
            return Ok(self.delete_one(&part)?);
        }
        let outcomes = parts
            .iter()
            .map(|part| self.delete_one(part))
            .collect::<Result<Vec<_>>>()?;
        Ok(combine_outcomes(outcomes))
    }
}

impl std::fmt::Debug for HttpResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResourceManager")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockTransport};

    fn manager(kind: ResourceKind) -> (HttpResourceManager, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        (HttpResourceManager::new(mock.clone(), kind), mock)
    }

    #[test]
    fn test_save_creates_when_missing() {
        let (manager, mock) = manager(ResourceKind::User);
        mock.respond(Method::Post, "/manage/v2/users", 201, "");

        let payload = r#"{"user-name":"alice","password":"secret"}"#;
        let receipt = manager.save(payload).unwrap();

        assert!(receipt.is_created());
        assert_eq!(receipt.resource_id, "alice");
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0], Request::get("/manage/v2/users/alice/properties"));
        assert_eq!(
            requests[1],
            Request::post("/manage/v2/users", payload, "application/json")
        );
    }

    #[test]
    fn test_save_updates_when_present() {
        let (manager, mock) = manager(ResourceKind::Role);
        mock.respond(Method::Get, "/manage/v2/roles/reader/properties", 200, "{}");
        mock.respond(Method::Put, "/manage/v2/roles/reader/properties", 204, "");

        let payload = "<role-properties><role-name>reader</role-name></role-properties>";
        let receipt = manager.save(payload).unwrap();

        assert!(receipt.existed_before);
        assert_eq!(
            mock.requests()[1],
            Request::put(
                "/manage/v2/roles/reader/properties",
                payload,
                "application/xml"
            )
        );
    }

    #[test]
    fn test_save_surfaces_rejection() {
        let (manager, mock) = manager(ResourceKind::User);
        mock.respond(Method::Post, "/manage/v2/users", 400, "XDMP-BAD");

        let err = manager.save(r#"{"user-name":"x"}"#).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("HTTP 400"));
    }

    #[test]
    fn test_save_without_id_is_invalid_payload() {
        let (manager, mock) = manager(ResourceKind::User);
        let err = manager.save(r#"{"role-name":"x"}"#).unwrap_err();
        assert!(matches!(err, orchestration::Error::InvalidPayload(_)));
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_array_payload_saves_each_element() {
        let (manager, mock) = manager(ResourceKind::Role);
        mock.respond(Method::Get, "/manage/v2/roles/a/properties", 200, "{}");
        mock.respond(Method::Put, "/manage/v2/roles/a/properties", 204, "");
        mock.respond(Method::Post, "/manage/v2/roles", 201, "");

        let receipt = manager
            .save(r#"[{"role-name":"a"},{"role-name":"b"}]"#)
            .unwrap();

        assert_eq!(receipt.resource_id, "a,b");
        assert!(!receipt.existed_before);
        assert_eq!(mock.requests().len(), 4);
    }

    #[test]
    fn test_single_element_array_is_one_resource() {
        let (manager, mock) = manager(ResourceKind::Role);
        mock.respond(Method::Post, "/manage/v2/roles", 201, "");
        mock.respond(Method::Delete, "/manage/v2/roles/a", 204, "");

        let receipt = manager.save(r#"[{"role-name":"a"}]"#).unwrap();
        assert_eq!(receipt.resource_id, "a");
        assert!(receipt.is_created());
        assert_eq!(
            mock.requests()[1],
            Request::post("/manage/v2/roles", r#"{"role-name":"a"}"#, "application/json")
        );

        let outcome = manager.delete(r#"[{"role-name":"a"}]"#).unwrap();
        assert!(outcome.deleted);
        assert_eq!(outcome.resource_id, "a");
    }

    #[test]
    fn test_delete_found_and_not_found() {
        let (manager, mock) = manager(ResourceKind::Database);
        mock.respond(Method::Delete, "/manage/v2/databases/app-content", 204, "");

        let outcome = manager.delete(r#"{"database-name":"app-content"}"#).unwrap();
        assert!(outcome.deleted);

        let outcome = manager.delete(r#"{"database-name":"gone"}"#).unwrap();
        assert!(!outcome.deleted);
        assert_eq!(outcome.resource_id, "gone");
    }

    #[test]
    fn test_app_server_requests_are_scoped_to_group() {
        let (manager, mock) = manager(ResourceKind::AppServer);
        mock.respond(
            Method::Delete,
            "/manage/v2/servers/app?group-id=Default",
            202,
            "",
        );

        let outcome = manager.delete(r#"{"server-name":"app"}"#).unwrap();
        assert!(outcome.deleted);
    }

    #[test]
    fn test_group_scope_is_passed_as_query_parameter() {
        let (manager, mock) = manager(ResourceKind::AppServer);
        mock.respond(
            Method::Get,
            "/manage/v2/servers/my%20app/properties?group-id=QA%20Group",
            200,
            "{}",
        );
        mock.respond(
            Method::Put,
            "/manage/v2/servers/my%20app/properties?group-id=QA%20Group",
            204,
            "",
        );

        let payload = r#"{"server-name":"my app","group-name":"QA Group"}"#;
        let receipt = manager.save(payload).unwrap();

        assert!(receipt.existed_before);
        let requests = mock.requests();
        assert_eq!(requests[1].path, "/manage/v2/servers/my%20app/properties");
        assert_eq!(requests[1].query, vec![("group-id", "QA Group".to_string())]);
    }

    #[test]
    fn test_network_failure_is_transport_error() {
        let (manager, mock) = manager(ResourceKind::Group);
        mock.fail(Method::Delete, "/manage/v2/groups/g", "connection refused");

        let err = manager.delete(r#"{"group-name":"g"}"#).unwrap_err();
        assert!(err.is_transport());
    }
}
