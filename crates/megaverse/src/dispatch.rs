//! Grid traversal and per-cell dispatch.
//!
//! Cells are walked in row-major order and sent one at a time; each request
//! is fully resolved (including retries) before the next cell is built.

use serde::Serialize;

use crate::classify::{classify, is_recognized};
use crate::client::MegaverseClient;
use crate::config::MegaverseConfig;
use crate::goal::fetch_goal;
use crate::types::{CellAction, Category, GoalMatrix, MegaverseResult, RequestPayload};

/// A request the dispatcher will send for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRequest {
    pub category: Category,
    pub url: String,
    pub payload: RequestPayload,
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    FetchingGoal,
    Dispatching { row: usize, column: usize },
    Done,
    Failed,
}

/// Routes goal cells to the action endpoints.
pub struct Dispatcher {
    client: MegaverseClient,
    base_url: String,
    candidate_id: String,
}

impl Dispatcher {
    pub fn new(client: MegaverseClient, base_url: &str, candidate_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            candidate_id: candidate_id.to_string(),
        }
    }

    pub fn from_config(client: MegaverseClient, config: &MegaverseConfig) -> Self {
        Self::new(client, &config.base_url, &config.candidate_id)
    }

    /// Build the request for one cell, or `None` if the cell is skipped.
    pub fn plan_cell(&self, row: usize, column: usize, label: &str) -> Option<PlannedRequest> {
        match classify(label) {
            CellAction::Skip => None,
            CellAction::Place { category, modifier } => Some(PlannedRequest {
                category,
                url: format!("{}/{}", self.base_url, category.path()),
                payload: RequestPayload::for_cell(
                    row,
                    column,
                    &self.candidate_id,
                    category,
                    modifier,
                ),
            }),
        }
    }

    /// Every request a run over `matrix` would send, in send order.
    pub fn plan(&self, matrix: &GoalMatrix) -> Vec<PlannedRequest> {
        matrix
            .cells()
            .filter_map(|(i, j, label)| self.plan_cell(i, j, label))
            .collect()
    }

    /// Send one request per actionable cell. A failed cell is logged and
    /// traversal moves on.
    pub async fn run(&self, matrix: &GoalMatrix) {
        for (i, j, label) in matrix.cells() {
            tracing::debug!(
                "phase {:?} label {label}",
                RunPhase::Dispatching { row: i, column: j }
            );

            let Some(request) = self.plan_cell(i, j, label) else {
                if !is_recognized(label) {
                    tracing::warn!("skipping unrecognized label {label:?} at ({i}, {j})");
                }
                continue;
            };

            if let Err(e) = self.client.execute(&request.url, &request.payload).await {
                tracing::error!("Request Failed for ({i}, {j}) {label}: {e}");
            }
        }
        tracing::debug!("phase {:?}", RunPhase::Done);
    }
}

/// Fetch the goal, then dispatch every cell. Only the goal fetch can fail.
pub async fn run(config: &MegaverseConfig) -> MegaverseResult<()> {
    let client = MegaverseClient::new(config.retry, config.timeout);
    tracing::debug!("phase {:?}", RunPhase::Idle);

    tracing::debug!("phase {:?}", RunPhase::FetchingGoal);
    let goal = match fetch_goal(&client, &config.goal_url).await {
        Ok(goal) => goal,
        Err(e) => {
            tracing::debug!("phase {:?}", RunPhase::Failed);
            return Err(e);
        }
    };

    Dispatcher::from_config(client, config).run(&goal).await;
    Ok(())
}
