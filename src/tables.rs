use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::optimizer::{DispatchReport, demo::DemoSolution};

pub fn build_dispatch_table(report: &DispatchReport, capacity: f64) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec!["Time", "Price", "Charge", "Power", "Storage", "Revenue"]);
    for row in &report.rows {
        table.add_row(vec![
            Cell::new(row.time_step).add_attribute(Attribute::Dim),
            Cell::new(format!("{:.2}", row.price)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.2}", row.charge_rate)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", row.power))
                .set_alignment(CellAlignment::Right)
                .fg(if row.power > 0.0 { Color::Green } else { Color::Reset }),
            Cell::new(format!("{:.1}", row.storage)).set_alignment(CellAlignment::Right).fg(
                if row.storage >= capacity { Color::DarkYellow } else { Color::Reset },
            ),
            Cell::new(format!("{:.2}", row.revenue())).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn build_demo_table(solution: &DemoSolution) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec!["x1", "x2", "Objective"]);
    table.add_row(vec![
        Cell::new(format!("{:.3}", solution.x1)),
        Cell::new(format!("{:.3}", solution.x2)),
        Cell::new(format!("{:.3}", solution.objective_value)).add_attribute(Attribute::Bold),
    ]);
    table
}
