//! Store operations for `teams`.

use super::postgrest::{PostgrestClient, Query};
use crate::error::AppResult;
use crate::models::Team;

const RELATION: &str = "teams";

/// All teams ordered by name.
pub async fn list(client: &PostgrestClient) -> AppResult<Vec<Team>> {
    client
        .select(&Query::from(RELATION).order("name"))
        .await
}
