//! Rendering for the `goal` and `plan` commands.

use serde_json::{json, Value};

use megaverse::classify::SPACE;
use megaverse::{classify, CellAction, Category, GoalMatrix, PlannedRequest};

/// One character per cell: `P` polyanet, `S` soloon, `C` cometh,
/// `.` space, `?` anything else.
pub fn render_goal(goal: &GoalMatrix) -> String {
    let mut out = String::new();
    for row in goal.rows() {
        for label in row {
            out.push(cell_glyph(label));
        }
        out.push('\n');
    }
    out
}

fn cell_glyph(label: &str) -> char {
    match classify(label) {
        CellAction::Place { category, .. } => match category {
            Category::Polyanets => 'P',
            Category::Soloons => 'S',
            Category::Comeths => 'C',
        },
        CellAction::Skip if label == SPACE => '.',
        CellAction::Skip => '?',
    }
}

/// The plan as a JSON document with per-category counts.
pub fn plan_json(plan: &[PlannedRequest]) -> Value {
    let count = |c: Category| plan.iter().filter(|r| r.category == c).count();
    json!({
        "requests": plan,
        "total": plan.len(),
        "polyanets": count(Category::Polyanets),
        "soloons": count(Category::Soloons),
        "comeths": count(Category::Comeths),
    })
}
