//! Component tables for fitted mixtures

use crate::io::error::{Result, invalid_parameter};
use crate::mixture::model::Gmm;
use std::collections::HashMap;

/// Names given to components in display order
pub const COMPONENT_NAMES: [&str; 5] = [
    "Stationary halo",
    "Prograde halo",
    "GS/E 1",
    "GS/E 2",
    "Thick Disc",
];

const HEADERS: [&str; 8] = [
    "Component",
    "Weights (%)",
    "v_R",
    "sigma_R",
    "v_phi",
    "sigma_phi",
    "v_Z",
    "sigma_Z",
];

/// Display name of the component at position `index`
pub fn component_name(index: usize) -> String {
    COMPONENT_NAMES
        .get(index)
        .map_or_else(|| format!("Component {}", index + 1), ToString::to_string)
}

/// One row of the component table
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSummary {
    /// Display name
    pub name: String,
    /// Index of the component inside the mixture
    pub index: usize,
    /// Share of the total amplitude in percent
    pub weight_percent: f64,
    /// Mean `(v_R, v_phi, v_Z)`
    pub mean: [f64; 3],
    /// Square roots of the covariance diagonal
    pub sigma: [f64; 3],
}

fn display_order(gmm: &Gmm, assignments: Option<&HashMap<String, usize>>) -> Result<Vec<usize>> {
    let Some(assignments) = assignments else {
        let mut order: Vec<usize> = (0..gmm.k()).collect();
        order.sort_by(|&a, &b| {
            let phi = |i: usize| gmm.mean.get(i).map_or(f64::NAN, |m| m.y);
            phi(a).total_cmp(&phi(b))
        });
        return Ok(order);
    };

    (0..gmm.k())
        .map(|position| {
            let name = component_name(position);
            let index = *assignments.get(&name).ok_or_else(|| {
                invalid_parameter("assignments", &name, &"no component assigned to this name")
            })?;
            if index >= gmm.k() {
                return Err(invalid_parameter(
                    "assignments",
                    &index,
                    &format!("mixture has only {} components", gmm.k()),
                ));
            }
            Ok(index)
        })
        .collect()
}

/// Tabulate every component in display order
///
/// Without `assignments` components are ordered by increasing mean `v_phi`;
/// otherwise each displayed name maps to the given component index.
///
/// # Errors
///
/// Returns an error if an assignment is missing or out of range
pub fn summarize_components(
    gmm: &Gmm,
    assignments: Option<&HashMap<String, usize>>,
) -> Result<Vec<ComponentSummary>> {
    let weights = gmm.weight_percentages();
    let order = display_order(gmm, assignments)?;

    Ok(order
        .into_iter()
        .enumerate()
        .filter_map(|(position, index)| {
            let mean = gmm.mean.get(index)?;
            let covar = gmm.covar.get(index)?;
            Some(ComponentSummary {
                name: component_name(position),
                index,
                weight_percent: weights.get(index).copied().unwrap_or(f64::NAN),
                mean: [mean.x, mean.y, mean.z],
                sigma: [
                    covar.m11.sqrt(),
                    covar.m22.sqrt(),
                    covar.m33.sqrt(),
                ],
            })
        })
        .collect())
}

/// Formatted component table headed by `label` and the star count
///
/// # Errors
///
/// Returns an error if an assignment is missing or out of range
pub fn extract_gmm_parameters(
    gmm: &Gmm,
    num_stars: usize,
    label: &str,
    assignments: Option<&HashMap<String, usize>>,
) -> Result<String> {
    let rows: Vec<[String; 8]> = summarize_components(gmm, assignments)?
        .into_iter()
        .map(|c| {
            [
                c.name,
                format!("{:.1}", c.weight_percent),
                format!("{:.2}", c.mean[0]),
                format!("{:.2}", c.sigma[0]),
                format!("{:.2}", c.mean[1]),
                format!("{:.2}", c.sigma[1]),
                format!("{:.2}", c.mean[2]),
                format!("{:.2}", c.sigma[2]),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut output = format!("\n{label} ({num_stars} stars)\n");
    let header: Vec<String> = HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{h:^w$}"))
        .collect();
    output.push_str(header.join(" ").trim_end());

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:^w$}"))
            .collect();
        output.push('\n');
        output.push_str(cells.join(" ").trim_end());
    }

    Ok(output)
}
