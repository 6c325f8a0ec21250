// 📈 Optimization Engine - revenue-maximizing ticket quantities
//
// Two separate steps:
//   build_model()  pure: festival state → LinearProgram
//   optimize()     solve, check the whole plan, then write it back
//
// Model:
//   maximize   Σ price(t) * q(t)                      over ticket classes t
//   subject to Σ rate(b) * q(t(b)) <= quantity(s)     for every fixed stock s
//              Σ area_per_person * q(t) <= festival area
//              q(t) integer, q(t) >= 0
//
// Nothing is written unless every proposed quantity fits every fixed stock
// and the area budget.

use crate::config::{AreaCharging, PlannerConfig};
use crate::entities::TicketClass;
use crate::error::OptimizationError;
use crate::festival::{exceeds, stock_load, Festival};
use crate::solver::{LinearProgram, LpConstraint, LpSolver, LpStatus, LpVariable, MicroLpSolver};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Name of the area constraint in built models
pub const AREA_CONSTRAINT: &str = "area";

/// Prefix of fixed-stock constraint names ("stock:Gobelet")
pub const STOCK_CONSTRAINT_PREFIX: &str = "stock:";

/// How far a solver value may sit from the nearest integer
const INTEGRALITY_TOLERANCE: f64 = 1e-6;

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedQuantity {
    pub type_name: String,
    pub quantity: u32,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Total ticket revenue of the committed plan
    pub objective: f64,
    pub quantities: Vec<PlannedQuantity>,
    /// Square meters used by the plan, as charged by the area constraint
    pub area_used: f64,
}

impl OptimizationOutcome {
    pub fn quantity_of(&self, type_name: &str) -> Option<u32> {
        self.quantities
            .iter()
            .find(|q| q.type_name == type_name)
            .map(|q| q.quantity)
    }

    pub fn summary(&self) -> String {
        format!(
            "Optimal plan: {} ticket class(es), revenue {:.2}, area used {:.1} m2",
            self.quantities.len(),
            self.objective,
            self.area_used
        )
    }
}

// ============================================================================
// MODEL BUILDER
// ============================================================================

/// Pure translation of festival state into a `LinearProgram`
pub struct ModelBuilder<'a> {
    config: &'a PlannerConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(config: &'a PlannerConfig) -> Self {
        ModelBuilder { config }
    }

    pub fn build(&self, festival: &Festival) -> LinearProgram {
        let ticket_classes = festival.ticket_classes();

        let variables = ticket_classes
            .iter()
            .map(|t| LpVariable {
                id: t.id().to_string(),
                weight: t.price(),
            })
            .collect();

        let mut constraints: Vec<LpConstraint> = festival
            .stocks()
            .iter()
            .filter(|s| s.is_fixed())
            .map(|stock| {
                let coefficients = stock
                    .benefits()
                    .iter()
                    .filter(|b| festival.ticket_class_by_id(b.ticket_class_id()).is_some())
                    .map(|b| (b.ticket_class_id().to_string(), b.rate()))
                    .collect();
                LpConstraint::at_most(
                    format!("{}{}", STOCK_CONSTRAINT_PREFIX, stock.name()),
                    f64::from(stock.quantity()),
                    coefficients,
                )
            })
            .collect();

        let area_coefficients = ticket_classes
            .iter()
            .map(|t| (t.id().to_string(), self.area_coefficient(t)))
            .filter(|(_, c)| *c > 0.0)
            .collect();
        constraints.push(LpConstraint::at_most(
            AREA_CONSTRAINT,
            festival.area(),
            area_coefficients,
        ));

        LinearProgram {
            variables,
            constraints,
        }
    }

    fn area_coefficient(&self, ticket_class: &TicketClass) -> f64 {
        match self.config.area_charging {
            AreaCharging::PerTicketClass => self.config.area_per_person,
            AreaCharging::PerBenefit => {
                self.config.area_per_person * ticket_class.benefits().len() as f64
            }
        }
    }
}

// ============================================================================
// OPTIMIZER
// ============================================================================

pub struct Optimizer<S: LpSolver = MicroLpSolver> {
    config: PlannerConfig,
    solver: S,
}

impl Default for Optimizer<MicroLpSolver> {
    fn default() -> Self {
        Optimizer::new(PlannerConfig::default(), MicroLpSolver)
    }
}

impl<S: LpSolver> Optimizer<S> {
    pub fn new(config: PlannerConfig, solver: S) -> Self {
        Optimizer { config, solver }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Linear program for the festival's current state
    pub fn build_model(&self, festival: &Festival) -> LinearProgram {
        ModelBuilder::new(&self.config).build(festival)
    }

    /// Solve and commit. On any error the festival is left untouched.
    pub fn optimize(&self, festival: &mut Festival) -> Result<OptimizationOutcome, OptimizationError> {
        let program = self.build_model(festival);
        if program.variables.is_empty() {
            return Ok(OptimizationOutcome {
                objective: 0.0,
                quantities: Vec::new(),
                area_used: 0.0,
            });
        }

        info!(
            "Optimizing {}: {} ticket class(es), {} constraint(s)",
            festival.name(),
            program.variables.len(),
            program.constraints.len()
        );
        let solution = self.solver.solve(&program);
        match solution.status {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => {
                warn!("Optimization of {} is infeasible", festival.name());
                return Err(OptimizationError::Infeasible);
            }
            LpStatus::Error(reason) => {
                warn!("Solver failed on {}: {}", festival.name(), reason);
                return Err(OptimizationError::Solver(reason));
            }
        }

        let plan = read_plan(festival, &solution.values)?;
        let area_used = check_plan(festival, &program, &plan)?;

        let assignment: Vec<(String, u32)> = plan
            .iter()
            .map(|(id, quantity)| (id.clone(), *quantity))
            .collect();
        festival.commit_quantities(&assignment);

        let quantities: Vec<PlannedQuantity> = festival
            .ticket_classes()
            .iter()
            .map(|t| PlannedQuantity {
                type_name: t.type_name().to_string(),
                quantity: t.quantity(),
                revenue: t.revenue(),
            })
            .collect();
        let outcome = OptimizationOutcome {
            objective: quantities.iter().map(|q| q.revenue).sum(),
            quantities,
            area_used,
        };
        info!("{}", outcome.summary());
        Ok(outcome)
    }
}

/// Integer quantity per ticket class id, from raw solver values
fn read_plan(
    festival: &Festival,
    values: &HashMap<String, f64>,
) -> Result<HashMap<String, u32>, OptimizationError> {
    let mut plan = HashMap::with_capacity(festival.ticket_classes().len());

    for ticket in festival.ticket_classes() {
        let value = *values
            .get(ticket.id())
            .ok_or_else(|| OptimizationError::MissingValue(ticket.type_name().to_string()))?;

        let rounded = value.round();
        let usable = value.is_finite()
            && rounded >= 0.0
            && rounded <= f64::from(u32::MAX)
            && (value - rounded).abs() <= INTEGRALITY_TOLERANCE;
        if !usable {
            return Err(OptimizationError::InvalidValue {
                ticket_class: ticket.type_name().to_string(),
                value,
            });
        }
        plan.insert(ticket.id().to_string(), rounded as u32);
    }

    Ok(plan)
}

/// Check the full plan against every fixed stock and the area budget.
/// Returns the area it uses.
fn check_plan(
    festival: &Festival,
    program: &LinearProgram,
    plan: &HashMap<String, u32>,
) -> Result<f64, OptimizationError> {
    let quantity_of = |t: &TicketClass| plan.get(t.id()).copied().unwrap_or(0);

    for stock in festival.stocks().iter().filter(|s| s.is_fixed()) {
        let load = stock_load(stock, festival.ticket_classes(), quantity_of);
        if exceeds(load, stock.quantity()) {
            return Err(OptimizationError::CapacityExceeded {
                stock: stock.name().to_string(),
                load,
                capacity: stock.quantity(),
            });
        }
    }

    let values: HashMap<String, f64> = plan
        .iter()
        .map(|(id, quantity)| (id.clone(), f64::from(*quantity)))
        .collect();
    let area_used = program
        .constraint(AREA_CONSTRAINT)
        .map(|c| c.evaluate(&values))
        .unwrap_or(0.0);
    if area_used > festival.area() + INTEGRALITY_TOLERANCE {
        return Err(OptimizationError::AreaExceeded {
            required: area_used,
            available: festival.area(),
        });
    }

    Ok(area_used)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Stock;
    use crate::solver::LpSolution;
    use chrono::{Duration, Utc};

    /// Returns canned values keyed by ticket type name
    struct FakeSolver {
        status: LpStatus,
        by_type: Vec<(&'static str, f64)>,
        festival_ids: HashMap<String, String>,
    }

    impl FakeSolver {
        fn returning(festival: &Festival, by_type: Vec<(&'static str, f64)>) -> Self {
            FakeSolver {
                status: LpStatus::Optimal,
                by_type,
                festival_ids: festival
                    .ticket_classes()
                    .iter()
                    .map(|t| (t.type_name().to_string(), t.id().to_string()))
                    .collect(),
            }
        }

        fn failing(status: LpStatus) -> Self {
            FakeSolver {
                status,
                by_type: Vec::new(),
                festival_ids: HashMap::new(),
            }
        }
    }

    impl LpSolver for FakeSolver {
        fn solve(&self, _program: &LinearProgram) -> LpSolution {
            if self.status != LpStatus::Optimal {
                return LpSolution::failed(self.status.clone());
            }
            LpSolution {
                status: LpStatus::Optimal,
                values: self
                    .by_type
                    .iter()
                    .map(|(name, value)| (self.festival_ids[*name].clone(), *value))
                    .collect(),
                objective: 0.0,
            }
        }
    }

    /// Gobelet 8000 fixed, Parking 3000 fixed; VIP takes one of each,
    /// Non-VIP takes two gobelets
    fn festival(area: f64) -> Festival {
        let mut f = Festival::new(
            "Les Vieilles Charrues",
            Utc::now() + Duration::days(1),
            100.0,
            area,
            "Carhaix",
        )
        .unwrap();
        f.add_ticket_class(TicketClass::new("VIP", 0, 150.0).unwrap()).unwrap();
        f.add_ticket_class(TicketClass::new("Non-VIP", 0, 60.0).unwrap()).unwrap();
        f.add_stock(Stock::new("Gobelet", 8000, 1.0, true).unwrap()).unwrap();
        f.add_stock(Stock::new("Parking", 3000, 5.0, true).unwrap()).unwrap();
        f.add_benefit("VIP", "Gobelet", 1.0).unwrap();
        f.add_benefit("VIP", "Parking", 1.0).unwrap();
        f.add_benefit("Non-VIP", "Gobelet", 2.0).unwrap();
        f
    }

    fn id_of(f: &Festival, type_name: &str) -> String {
        f.ticket_class(type_name).unwrap().id().to_string()
    }

    #[test]
    fn test_model_has_one_constraint_per_fixed_stock_plus_area() {
        let mut f = festival(14000.0);
        f.add_stock(Stock::new("Bracelet", 100, 0.2, false).unwrap()).unwrap();
        f.add_benefit("VIP", "Bracelet", 1.0).unwrap();

        let program = ModelBuilder::new(&PlannerConfig::default()).build(&f);
        assert_eq!(program.variables.len(), 2);
        assert_eq!(program.constraints.len(), 3);
        assert!(program.constraint("stock:Bracelet").is_none());

        let cups = program.constraint("stock:Gobelet").unwrap();
        assert_eq!(cups.upper, Some(8000.0));
        assert_eq!(cups.coefficient(&id_of(&f, "VIP")), 1.0);
        assert_eq!(cups.coefficient(&id_of(&f, "Non-VIP")), 2.0);

        let vip = program.variables.iter().find(|v| v.id == id_of(&f, "VIP")).unwrap();
        assert_eq!(vip.weight, 150.0);
    }

    #[test]
    fn test_area_is_charged_once_per_ticket_class() {
        // VIP carries two benefits, Non-VIP one: both pay the same area per ticket
        let f = festival(14000.0);
        let program = ModelBuilder::new(&PlannerConfig::default()).build(&f);
        let area = program.constraint(AREA_CONSTRAINT).unwrap();

        assert_eq!(area.upper, Some(14000.0));
        assert_eq!(area.coefficient(&id_of(&f, "VIP")), 0.42);
        assert_eq!(area.coefficient(&id_of(&f, "Non-VIP")), 0.42);
    }

    #[test]
    fn test_per_benefit_area_charging_is_opt_in() {
        let f = festival(14000.0);
        let config = PlannerConfig {
            area_charging: AreaCharging::PerBenefit,
            ..PlannerConfig::default()
        };
        let program = ModelBuilder::new(&config).build(&f);
        let area = program.constraint(AREA_CONSTRAINT).unwrap();

        assert!((area.coefficient(&id_of(&f, "VIP")) - 0.84).abs() < 1e-12);
        assert_eq!(area.coefficient(&id_of(&f, "Non-VIP")), 0.42);
    }

    #[test]
    fn test_optimize_scenario_with_real_solver() {
        let mut f = festival(14000.0);

        let outcome = f.optimize().unwrap();

        let vip = outcome.quantity_of("VIP").unwrap();
        let non_vip = outcome.quantity_of("Non-VIP").unwrap();
        // VIP earns 150 per gobelet, Non-VIP 30: parking caps VIP first
        assert_eq!(vip, 3000);
        assert_eq!(non_vip, 2500);
        assert_eq!(outcome.objective, 3000.0 * 150.0 + 2500.0 * 60.0);

        assert!(f64::from(vip) + 2.0 * f64::from(non_vip) <= 8000.0);
        assert!(vip <= 3000);
        assert!(outcome.area_used <= f.area());

        assert_eq!(f.ticket_class("VIP").unwrap().quantity(), 3000);
        assert_eq!(f.ticket_class("Non-VIP").unwrap().quantity(), 2500);
        f.validate().unwrap();
    }

    #[test]
    fn test_optimize_respects_a_tight_area() {
        // 0.42 * (v + n) <= 1050.21  →  v + n <= 2500
        let mut f = festival(1050.21);

        let outcome = f.optimize().unwrap();
        let total = outcome.quantity_of("VIP").unwrap() + outcome.quantity_of("Non-VIP").unwrap();
        assert!(total <= 2500);
        assert_eq!(outcome.quantity_of("VIP"), Some(2500));
        assert!(outcome.area_used <= 1050.21);
    }

    #[test]
    fn test_fake_solver_plan_is_committed() {
        let mut f = festival(14000.0);
        let solver = FakeSolver::returning(&f, vec![("VIP", 1000.0), ("Non-VIP", 1999.9999999)]);

        let outcome = Optimizer::new(PlannerConfig::default(), solver)
            .optimize(&mut f)
            .unwrap();

        assert_eq!(f.ticket_class("Non-VIP").unwrap().quantity(), 2000);
        assert_eq!(outcome.objective, 1000.0 * 150.0 + 2000.0 * 60.0);
    }

    #[test]
    fn test_plan_over_capacity_writes_nothing() {
        let mut f = festival(14000.0);
        f.set_ticket_quantity("VIP", 10).unwrap();
        let before = f.clone();

        // VIP fits parking but the pair needs 3000 + 2 * 2600 gobelets
        let solver = FakeSolver::returning(&f, vec![("VIP", 3000.0), ("Non-VIP", 2600.0)]);
        let result = Optimizer::new(PlannerConfig::default(), solver).optimize(&mut f);

        assert!(matches!(
            result,
            Err(OptimizationError::CapacityExceeded { ref stock, .. }) if stock == "Gobelet"
        ));
        assert_eq!(f, before);
    }

    #[test]
    fn test_plan_over_area_writes_nothing() {
        let mut f = festival(100.0);
        let before = f.clone();

        let solver = FakeSolver::returning(&f, vec![("VIP", 200.0), ("Non-VIP", 100.0)]);
        let result = Optimizer::new(PlannerConfig::default(), solver).optimize(&mut f);

        assert!(matches!(result, Err(OptimizationError::AreaExceeded { .. })));
        assert_eq!(f, before);
    }

    #[test]
    fn test_bad_solver_values_are_rejected() {
        let mut f = festival(14000.0);
        let before = f.clone();

        let fractional = FakeSolver::returning(&f, vec![("VIP", 10.5), ("Non-VIP", 0.0)]);
        assert!(matches!(
            Optimizer::new(PlannerConfig::default(), fractional).optimize(&mut f),
            Err(OptimizationError::InvalidValue { .. })
        ));

        let negative = FakeSolver::returning(&f, vec![("VIP", -3.0), ("Non-VIP", 0.0)]);
        assert!(matches!(
            Optimizer::new(PlannerConfig::default(), negative).optimize(&mut f),
            Err(OptimizationError::InvalidValue { .. })
        ));

        let missing = FakeSolver::returning(&f, vec![("VIP", 3.0)]);
        assert!(matches!(
            Optimizer::new(PlannerConfig::default(), missing).optimize(&mut f),
            Err(OptimizationError::MissingValue(ref name)) if name == "Non-VIP"
        ));

        assert_eq!(f, before);
    }

    #[test]
    fn test_solver_failures_surface_as_errors() {
        let mut f = festival(14000.0);
        let before = f.clone();

        let infeasible = FakeSolver::failing(LpStatus::Infeasible);
        assert_eq!(
            Optimizer::new(PlannerConfig::default(), infeasible).optimize(&mut f),
            Err(OptimizationError::Infeasible)
        );

        let broken = FakeSolver::failing(LpStatus::Error("unbounded".to_string()));
        assert_eq!(
            Optimizer::new(PlannerConfig::default(), broken).optimize(&mut f),
            Err(OptimizationError::Solver("unbounded".to_string()))
        );
        assert_eq!(f, before);
    }

    #[test]
    fn test_empty_festival_optimizes_to_nothing() {
        let mut f = Festival::new("Empty", Utc::now() + Duration::days(2), 0.0, 10.0, "Nowhere").unwrap();
        let outcome = f.optimize().unwrap();
        assert!(outcome.quantities.is_empty());
        assert_eq!(outcome.objective, 0.0);
    }
}
