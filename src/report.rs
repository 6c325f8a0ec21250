// 💶 Financial Report - what the current plan earns and costs
//
// Costs:
//   artists      Σ artist price
//   location     festival location price
//   fixed stock  bought in full: quantity * price
//   other stock  bought as consumed: Σ rate * ticket quantity * price

use crate::festival::Festival;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

// ============================================================================
// REPORT LINES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketLine {
    #[serde(rename = "type")]
    pub type_name: String,
    pub quantity: u32,
    pub price: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub name: String,
    pub fixed: bool,
    /// Units paid for
    pub units: f64,
    pub unit_price: f64,
    pub cost: f64,
}

// ============================================================================
// FINANCIAL REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialReport {
    pub festival: String,
    pub tickets: Vec<TicketLine>,
    pub stocks: Vec<StockLine>,
    pub ticket_revenue: f64,
    pub artist_fees: f64,
    pub location_price: f64,
    pub stock_costs: f64,
    pub total_cost: f64,
    pub balance: f64,
    pub generated_at: DateTime<Utc>,
}

impl FinancialReport {
    pub fn for_festival(festival: &Festival) -> Self {
        let tickets: Vec<TicketLine> = festival
            .ticket_classes()
            .iter()
            .map(|t| TicketLine {
                type_name: t.type_name().to_string(),
                quantity: t.quantity(),
                price: t.price(),
                revenue: t.revenue(),
            })
            .collect();

        let stocks: Vec<StockLine> = festival
            .stocks()
            .iter()
            .map(|s| {
                let units = if s.is_fixed() {
                    f64::from(s.quantity())
                } else {
                    festival.stock_load(s)
                };
                StockLine {
                    name: s.name().to_string(),
                    fixed: s.is_fixed(),
                    units,
                    unit_price: s.price(),
                    cost: units * s.price(),
                }
            })
            .collect();

        let ticket_revenue = tickets.iter().map(|t| t.revenue).sum();
        let artist_fees = festival.artists().iter().map(|a| a.price()).sum::<f64>();
        let stock_costs = stocks.iter().map(|s| s.cost).sum::<f64>();
        let total_cost = artist_fees + festival.location_price() + stock_costs;

        FinancialReport {
            festival: festival.name().to_string(),
            tickets,
            stocks,
            ticket_revenue,
            artist_fees,
            location_price: festival.location_price(),
            stock_costs,
            total_cost,
            balance: ticket_revenue - total_cost,
            generated_at: Utc::now(),
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.balance >= 0.0
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: revenue ${:.2}, costs ${:.2} (artists ${:.2}, location ${:.2}, stocks ${:.2}), balance ${:.2}",
            self.festival,
            self.ticket_revenue,
            self.total_cost,
            self.artist_fees,
            self.location_price,
            self.stock_costs,
            self.balance
        )
    }
}

/// Ticket plan as CSV (type, quantity, price, revenue). Returns the row count.
pub fn write_ticket_plan_csv<W: Write>(festival: &Festival, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let report = FinancialReport::for_festival(festival);

    for line in &report.tickets {
        wtr.serialize(line)
            .with_context(|| format!("Failed to write ticket class {}", line.type_name))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;

    Ok(report.tickets.len())
}

// ============================================================================
// TESTS
// ============================================================================
