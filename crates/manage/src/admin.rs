//! Admin API restart probe

use crate::endpoints::TIMESTAMP_PATH;
use crate::transport::{Request, Transport};
use orchestration::RestartProbe;
use std::sync::Arc;

/// Reads the server's last startup time from the admin API
///
/// The timestamp changes on every restart. While the server is restarting the
/// request fails, which the restart coordinator treats as "not back yet".
pub struct AdminClient {
    transport: Arc<dyn Transport>,
}

impl AdminClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl RestartProbe for AdminClient {
    fn last_restart(&self) -> orchestration::Result<String> {
        let request = Request::get(TIMESTAMP_PATH);
        let response = self
            .transport
            .send(&request)?
            .error_for_status(&request)?;
        Ok(response.body.trim().to_string())
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient").finish_non_exhaustive()
    }
}
