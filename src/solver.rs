// 🧮 LP Solver - the linear programming collaborator
//
// The optimizer only talks to the `LpSolver` trait. A model is a list of
// weighted variables (non-negative integers, maximised) and a list of
// bounded linear constraints. `MicroLpSolver` is the default backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpVariable {
    pub id: String,
    /// Objective coefficient
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpConstraint {
    pub name: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// (variable id, coefficient)
    pub coefficients: Vec<(String, f64)>,
}

impl LpConstraint {
    /// `Σ coefficients <= upper`
    pub fn at_most(name: impl Into<String>, upper: f64, coefficients: Vec<(String, f64)>) -> Self {
        LpConstraint {
            name: name.into(),
            lower: None,
            upper: Some(upper),
            coefficients,
        }
    }

    pub fn coefficient(&self, variable_id: &str) -> f64 {
        self.coefficients
            .iter()
            .filter(|(id, _)| id == variable_id)
            .map(|(_, c)| c)
            .sum()
    }

    /// Left-hand side for the given assignment
    pub fn evaluate(&self, values: &HashMap<String, f64>) -> f64 {
        self.coefficients
            .iter()
            .map(|(id, c)| c * values.get(id).copied().unwrap_or(0.0))
            .sum()
    }
}

/// Maximisation model over non-negative integer variables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearProgram {
    pub variables: Vec<LpVariable>,
    pub constraints: Vec<LpConstraint>,
}

impl LinearProgram {
    pub fn constraint(&self, name: &str) -> Option<&LpConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }
}

// ============================================================================
// RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpSolution {
    pub status: LpStatus,
    /// Variable id → value
    pub values: HashMap<String, f64>,
    pub objective: f64,
}

impl LpSolution {
    pub fn failed(status: LpStatus) -> Self {
        LpSolution {
            status,
            values: HashMap::new(),
            objective: 0.0,
        }
    }
}

pub trait LpSolver {
    fn solve(&self, program: &LinearProgram) -> LpSolution;
}

// ============================================================================
// MICROLP BACKEND
// ============================================================================

/// Branch-and-bound integer solver from the `microlp` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl LpSolver for MicroLpSolver {
    fn solve(&self, program: &LinearProgram) -> LpSolution {
        let mut problem = microlp::Problem::new(microlp::OptimizationDirection::Maximize);

        let mut handles = HashMap::with_capacity(program.variables.len());
        for variable in &program.variables {
            let handle = problem.add_integer_var(variable.weight, (0, i32::MAX));
            handles.insert(variable.id.as_str(), handle);
        }

        for constraint in &program.constraints {
            let mut terms = Vec::with_capacity(constraint.coefficients.len());
            for (id, coefficient) in &constraint.coefficients {
                match handles.get(id.as_str()) {
                    Some(handle) => terms.push((*handle, *coefficient)),
                    None => {
                        return LpSolution::failed(LpStatus::Error(format!(
                            "constraint {} uses unknown variable {}",
                            constraint.name, id
                        )))
                    }
                }
            }
            let expression = || {
                let mut expr = microlp::LinearExpr::empty();
                for (handle, coefficient) in &terms {
                    expr.add(*handle, *coefficient);
                }
                expr
            };
            if let Some(upper) = constraint.upper {
                problem.add_constraint(expression(), microlp::ComparisonOp::Le, upper);
            }
            if let Some(lower) = constraint.lower {
                problem.add_constraint(expression(), microlp::ComparisonOp::Ge, lower);
            }
        }

        debug!(
            "Solving LP: {} variable(s), {} constraint(s)",
            program.variables.len(),
            program.constraints.len()
        );

        match problem.solve() {
            Ok(solution) => LpSolution {
                status: LpStatus::Optimal,
                values: program
                    .variables
                    .iter()
                    .map(|v| (v.id.clone(), solution[handles[v.id.as_str()]]))
                    .collect(),
                objective: solution.objective(),
            },
            Err(microlp::Error::Infeasible) => LpSolution::failed(LpStatus::Infeasible),
            Err(err) => LpSolution::failed(LpStatus::Error(err.to_string())),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
