//! Writing optimisation models in CPLEX LP format for inspection.
use super::{OptimisationModel, Sense, Variable, VariableKey};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// The maximum number of terms written on one line
const TERMS_PER_LINE: usize = 8;

/// The name of a variable in the LP file
fn column_name(model: &OptimisationModel, var: Variable) -> String {
    match model.variables().key(var) {
        VariableKey::Site(_) => format!("y{}", var.index()),
        VariableKey::DemandCoverage { .. } => format!("x{}", var.index()),
    }
}

/// Write the terms of a linear expression, wrapping long lines
fn write_terms<W: Write>(
    out: &mut W,
    model: &OptimisationModel,
    terms: &[(Variable, f64)],
) -> Result<()> {
    if terms.is_empty() {
        write!(out, " 0")?;
        return Ok(());
    }

    for (i, (var, coeff)) in terms.iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            write!(out, "\n   ")?;
        }

        let sign = if *coeff < 0.0 { '-' } else { '+' };
        if i == 0 && sign == '+' {
            write!(out, " {} {}", coeff.abs(), column_name(model, *var))?;
        } else {
            write!(out, " {sign} {} {}", coeff.abs(), column_name(model, *var))?;
        }
    }

    Ok(())
}

/// Write the model to `out` in CPLEX LP format
pub fn write_lp_to<W: Write>(out: &mut W, model: &OptimisationModel) -> Result<()> {
    writeln!(out, "\\ Variables:")?;
    for (key, var) in model.variables().iter() {
        writeln!(out, "\\   {}: {key}", column_name(model, var))?;
    }

    let sense = match model.sense() {
        Sense::Minimise => "Minimize",
        Sense::Maximise => "Maximize",
    };
    writeln!(out, "{sense}")?;
    let objective: Vec<_> = model
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, col)| col.objective != 0.0)
        .map(|(i, col)| (Variable(i), col.objective))
        .collect();
    write!(out, " obj:")?;
    if objective.is_empty() && !model.columns().is_empty() {
        // Some readers reject an objective with no terms
        write!(out, " 0 {}", column_name(model, Variable(0)))?;
    } else {
        write_terms(out, model, &objective)?;
    }
    writeln!(out)?;

    writeln!(out, "Subject To")?;
    let mut row_count = 0;
    for row in model.rows() {
        writeln!(out, "\\ {}", row.key)?;
        let mut write_row = |op: &str, rhs: f64| -> Result<()> {
            write!(out, " c{row_count}:")?;
            write_terms(out, model, &row.terms)?;
            writeln!(out, " {op} {rhs}")?;
            row_count += 1;
            Ok(())
        };

        if row.is_equality() {
            write_row("=", row.lower)?;
            continue;
        }
        if row.lower.is_finite() {
            write_row(">=", row.lower)?;
        }
        if row.upper.is_finite() {
            write_row("<=", row.upper)?;
        }
    }

    writeln!(out, "Bounds")?;
    for (i, col) in model.columns().iter().enumerate() {
        let name = column_name(model, Variable(i));
        match (col.lower.is_finite(), col.upper.is_finite()) {
            (true, true) => writeln!(out, " {} <= {name} <= {}", col.lower, col.upper)?,
            (true, false) => writeln!(out, " {name} >= {}", col.lower)?,
            (false, true) => writeln!(out, " -inf <= {name} <= {}", col.upper)?,
            (false, false) => writeln!(out, " {name} free")?,
        }
    }

    if model.has_integer_columns() {
        let binary = |lower: f64, upper: f64| lower == 0.0 && upper == 1.0;
        let (binaries, generals): (Vec<_>, Vec<_>) = model
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, col)| col.integer)
            .partition(|(_, col)| binary(col.lower, col.upper));

        for (title, cols) in [("Binaries", binaries), ("Generals", generals)] {
            if cols.is_empty() {
                continue;
            }
            writeln!(out, "{title}")?;
            for (i, _) in cols {
                writeln!(out, " {}", column_name(model, Variable(i)))?;
            }
        }
    }

    writeln!(out, "End")?;

    Ok(())
}

/// Write the model to the given path in CPLEX LP format
pub fn write_lp(model: &OptimisationModel, file_path: &Path) -> Result<()> {
    let file = File::create(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    let mut out = BufWriter::new(file);
    write_lp_to(&mut out, model)?;
    out.flush()?;

    Ok(())
}
