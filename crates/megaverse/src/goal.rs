//! Goal grid retrieval.

use crate::client::MegaverseClient;
use crate::types::{GoalMatrix, GoalResponse, MegaverseError, MegaverseResult};

/// Fetch the goal matrix with a single GET. Not retried.
pub async fn fetch_goal(client: &MegaverseClient, goal_url: &str) -> MegaverseResult<GoalMatrix> {
    tracing::info!("Fetching goal from {goal_url}");

    let r = client
        .http()
        .get(goal_url)
        .send()
        .await
        .map_err(|e| MegaverseError::GoalFetch(format!("request to {goal_url} failed: {e}")))?;

    let status = r.status();
    if !status.is_success() {
        return Err(MegaverseError::GoalFetch(format!(
            "{goal_url} returned status {}",
            status.as_u16()
        )));
    }

    let response: GoalResponse = r
        .json()
        .await
        .map_err(|e| MegaverseError::GoalFetch(format!("invalid goal body: {e}")))?;
    let goal = response.goal;

    let ragged = goal.ragged_rows();
    if !ragged.is_empty() {
        tracing::warn!(
            "goal matrix is not rectangular: rows {ragged:?} differ from width {}",
            goal.width()
        );
    }

    tracing::info!("Goal is {}x{}", goal.height(), goal.width());
    Ok(goal)
}
