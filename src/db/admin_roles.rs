//! Store operations for `admin_roles`.

use super::IdRow;
use super::postgrest::{PostgrestClient, Query};
use crate::error::AppResult;

const RELATION: &str = "admin_roles";

/// An identity is an admin iff it has at least one row here.
pub async fn exists_for_user(client: &PostgrestClient, user_id: &str) -> AppResult<bool> {
    let rows: Vec<IdRow> = client
        .select(
            &Query::from(RELATION)
                .select("id")
                .eq("user_id", user_id)
                .limit(1),
        )
        .await?;
    Ok(!rows.is_empty())
}
