//! Core data types for goal grids, request payloads, and errors.

use serde::{Deserialize, Serialize};

/// The desired final state of the map, one label per cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalMatrix(Vec<Vec<String>>);

impl GoalMatrix {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self(rows)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.0.len()
    }

    /// Length of the first row, or 0 for an empty matrix.
    pub fn width(&self) -> usize {
        self.0.first().map(Vec::len).unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Get the label at a position.
    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.0.get(row)?.get(column).map(String::as_str)
    }

    /// Iterate cells in row-major order. Each row is walked by its own length.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.0.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(move |(j, label)| (i, j, label.as_str()))
        })
    }

    /// Indices of rows whose length differs from the first row.
    pub fn ragged_rows(&self) -> Vec<usize> {
        let width = self.width();
        self.0
            .iter()
            .enumerate()
            .filter(|(_, row)| row.len() != width)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Body returned by the goal source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalResponse {
    pub goal: GoalMatrix,
}

/// Kind of entity placed on the map. Each has its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Polyanets,
    Soloons,
    Comeths,
}

impl Category {
    /// Endpoint path segment under the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Category::Polyanets => "polyanets",
            Category::Soloons => "soloons",
            Category::Comeths => "comeths",
        }
    }
}

/// What to do with a single cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellAction {
    Skip,
    Place {
        category: Category,
        /// Lower-cased prefix of a compound label (`BLUE_SOLOON` → `blue`).
        modifier: Option<String>,
    },
}

/// JSON body sent to an action endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    pub row: usize,
    pub column: usize,
    pub candidate_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<String>,
}

impl RequestPayload {
    /// Build the payload for a placed cell. The modifier lands in `direction`
    /// for comeths and in `color` for soloons; polyanets carry neither.
    pub fn for_cell(
        row: usize,
        column: usize,
        candidate_id: &str,
        category: Category,
        modifier: Option<String>,
    ) -> Self {
        let (direction, color) = match category {
            Category::Comeths => (modifier, None),
            Category::Soloons => (None, modifier),
            Category::Polyanets => (None, None),
        };
        Self {
            row,
            column,
            candidate_id: candidate_id.to_string(),
            direction,
            color,
        }
    }
}

/// Errors that can occur while fetching the goal or placing cells.
#[derive(thiserror::Error, Debug)]
pub enum MegaverseError {
    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Max retries reached after {attempts} attempts. Request failed: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<MegaverseError>,
    },

    #[error("Goal fetch failed: {0}")]
    GoalFetch(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type MegaverseResult<T> = Result<T, MegaverseError>;
