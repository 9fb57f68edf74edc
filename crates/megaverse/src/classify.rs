//! Cell label classification.

use crate::types::{CellAction, Category};

/// Label for an empty cell.
pub const SPACE: &str = "SPACE";

const POLYANET: &str = "POLYANET";
const COMETH: &str = "COMETH";
const SOLOON: &str = "SOLOON";

/// Classify a goal label into the action it calls for.
///
/// `COMETH` is checked before `SOLOON`, and `POLYANET` must match exactly.
/// `SPACE` and any unrecognized label are skipped.
pub fn classify(label: &str) -> CellAction {
    if label.contains(COMETH) {
        CellAction::Place {
            category: Category::Comeths,
            modifier: Some(modifier(label)),
        }
    } else if label.contains(SOLOON) {
        CellAction::Place {
            category: Category::Soloons,
            modifier: Some(modifier(label)),
        }
    } else if label == POLYANET {
        CellAction::Place {
            category: Category::Polyanets,
            modifier: None,
        }
    } else {
        CellAction::Skip
    }
}

/// Whether a label is one of the known kinds (including `SPACE`).
pub fn is_recognized(label: &str) -> bool {
    label == SPACE || classify(label) != CellAction::Skip
}

/// Text before the first underscore, lower-cased. A label without an
/// underscore yields the whole label.
fn modifier(label: &str) -> String {
    label
        .split('_')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}
