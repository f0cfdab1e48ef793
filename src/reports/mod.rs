use crate::error::AcResult;
use crate::optimizer::population::Population;
use crate::optimizer::runner::CalibrationOutcome;
use crate::space::ParameterSpace;
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::io::Write;

/// Writes `rank,<param...>,objective` rows, best first.
pub fn write_population_csv<W: Write>(
    population: &Population,
    space: &ParameterSpace,
    writer: W,
) -> AcResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["rank".to_string()];
    header.extend(space.names().map(str::to_string));
    header.push("objective".to_string());
    wtr.write_record(&header)?;

    for (i, p) in population.iter().enumerate() {
        let mut row = Vec::with_capacity(header.len());
        row.push((i + 1).to_string());
        row.extend(p.values().iter().map(|v| v.to_string()));
        row.push(p.objective().to_string());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// ASCII table of the best `limit` points.
pub fn population_table(population: &Population, space: &ParameterSpace, limit: usize) -> String {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Rank").add_attribute(Attribute::Bold)];
    header.extend(space.names().map(Cell::new));
    header.push(Cell::new("Objective").fg(Color::Cyan));
    table.set_header(header);

    for i in 1..=space.len() + 1 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for (i, p) in population.iter().take(limit).enumerate() {
        let mut row = vec![Cell::new(i + 1)];
        row.extend(p.values().iter().map(|v| Cell::new(format!("{:.4}", v))));
        row.push(Cell::new(format!("{:.4}", p.objective())).fg(Color::Cyan));
        table.add_row(row);
    }

    table.to_string()
}

/// One-line summary of a finished run.
pub fn summary(outcome: &CalibrationOutcome) -> String {
    format!(
        "{} after {} rounds, {} evaluations, best objective {:.6}",
        outcome.termination,
        outcome.rounds,
        outcome.evaluations,
        outcome.best.objective()
    )
}
