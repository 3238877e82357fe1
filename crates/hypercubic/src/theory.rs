//! Ordered rule sets built from the final cubes of an extraction.
//!
//! Rules are matched first to last. A constraint is only emitted for a dimension the cube
//! actually restricts; dimensions spanning the whole training range are left out.
//!
//! Theories from nested partitions (CREAM and CReEPy) are order-dependent: a remainder cube
//! keeps its parent's bounds and overlaps the cubes carved out of it, so its rule only holds
//! for rows no earlier rule matched. Reordering or evaluating such rules independently changes
//! their meaning. GridEx, ITER and DiViNE cubes are disjoint, apart from ITER's final
//! catch-all.

use crate::hypercube::{CubeOutput, HyperCube};
use crate::interval::Interval;
use crate::schema::{Discretization, Normalization};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indicator columns are split at this value when read back as symbolic constraints.
const INDICATOR_CUT: f64 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Within { feature: String, interval: Interval },
    Equals { feature: String, value: String },
    NotEquals { feature: String, value: String },
}

impl Constraint {
    pub fn feature(&self) -> &str {
        match self {
            Constraint::Within { feature, .. }
            | Constraint::Equals { feature, .. }
            | Constraint::NotEquals { feature, .. } => feature,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Within { feature, interval } => {
                if interval.low.is_finite() && interval.high.is_finite() {
                    write!(f, "{} in {}", feature, interval)
                } else if interval.high.is_finite() {
                    let op = if interval.upper_closed { "=<" } else { "<" };
                    write!(f, "{} {} {:.4}", feature, op, interval.high)
                } else {
                    let op = if interval.lower_closed { ">=" } else { ">" };
                    write!(f, "{} {} {:.4}", feature, op, interval.low)
                }
            }
            Constraint::Equals { feature, value } => write!(f, "{} = '{}'", feature, value),
            Constraint::NotEquals { feature, value } => write!(f, "{} \\= '{}'", feature, value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub constraints: Vec<Constraint>,
    pub output: CubeOutput,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theory {
    pub output_name: String,
    pub features: Vec<String>,
    pub rules: Vec<Rule>,
}

impl Theory {
    /// One rule per cube with an output, in the given order.
    ///
    /// `bounds` is the cube spanning the training data; intervals covering it on a
    /// dimension produce no constraint.
    pub fn from_cubes(
        cubes: &[HyperCube],
        output_name: &str,
        bounds: Option<&HyperCube>,
        discretization: Option<&Discretization>,
        normalization: Option<&Normalization>,
    ) -> Self {
        let features = cubes
            .first()
            .or(bounds)
            .map(|c| c.features().to_vec())
            .unwrap_or_default();
        let rules = cubes
            .iter()
            .filter_map(|cube| {
                let output = cube.output()?.clone();
                let constraints = cube
                    .dimensions()
                    .enumerate()
                    .filter(|(j, (_, interval))| !spans(interval, bounds.map(|b| b.interval(*j))))
                    .filter_map(|(_, (name, interval))| {
                        constraint_for(name, interval, discretization, normalization)
                    })
                    .collect();
                Some(Rule {
                    constraints,
                    output: denormalize_output(output, output_name, cube.features(), normalization),
                })
            })
            .collect();
        Self {
            output_name: output_name.to_string(),
            features,
            rules,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn spans(interval: &Interval, bounds: Option<&Interval>) -> bool {
    if interval.low == f64::NEG_INFINITY && interval.high == f64::INFINITY {
        return true;
    }
    match bounds {
        Some(b) => interval.low <= b.low && interval.high >= b.high,
        None => false,
    }
}

fn constraint_for(
    name: &str,
    interval: &Interval,
    discretization: Option<&Discretization>,
    normalization: Option<&Normalization>,
) -> Option<Constraint> {
    if let Some((feature, value)) = discretization.and_then(|d| d.lookup(name)) {
        let (feature, value) = (feature.to_string(), value.to_string());
        return if interval.low >= INDICATOR_CUT {
            Some(Constraint::Equals { feature, value })
        } else if interval.high < INDICATOR_CUT
            || (interval.high == INDICATOR_CUT && !interval.upper_closed)
        {
            Some(Constraint::NotEquals { feature, value })
        } else {
            None
        };
    }
    let interval = match normalization {
        Some(n) => n.denormalize(name, interval),
        None => *interval,
    };
    Some(Constraint::Within {
        feature: name.to_string(),
        interval,
    })
}

/// Class labels are left alone; they are not measured in output units.
fn denormalize_output(
    output: CubeOutput,
    output_name: &str,
    features: &[String],
    normalization: Option<&Normalization>,
) -> CubeOutput {
    match (output, normalization) {
        (CubeOutput::Constant(v), Some(n)) => CubeOutput::Constant(n.denormalize_value(output_name, v)),
        (CubeOutput::Linear(model), Some(n)) => {
            CubeOutput::Linear(n.denormalize_model(output_name, features, &model))
        }
        (output, _) => output,
    }
}

impl fmt::Display for Theory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            write!(f, "{} = ", self.output_name)?;
            match &rule.output {
                CubeOutput::Linear(model) => {
                    write!(f, "{:.4}", model.intercept)?;
                    for (name, c) in self.features.iter().zip(model.coefficients.iter()) {
                        write!(f, " + {:.4} * {}", c, name)?;
                    }
                }
                other => write!(f, "{}", other)?,
            }
            if rule.constraints.is_empty() {
                writeln!(f, ".")?;
            } else {
                let body: Vec<String> = rule.constraints.iter().map(|c| c.to_string()).collect();
                writeln!(f, " :- {}.", body.join(", "))?;
            }
        }
        Ok(())
    }
}
