// Festival Planner - command line shell
//
//   festival-planner show <file>
//   festival-planner optimize <file> [--save]
//   festival-planner report <file>
//   festival-planner export-csv <file> <out>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use festival_planner::{
    write_ticket_plan_csv, Festival, FinancialReport, MicroLpSolver, Optimizer, PlannerConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "festival-planner",
    version,
    about = "Plan a festival's tickets, stocks and line-up"
)]
struct Cli {
    /// Planner configuration (TOML). Falls back to $FESTIVAL_PLANNER_CONFIG, then defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the festival, its line-up, tickets and stocks
    Show { file: PathBuf },

    /// Compute revenue-maximizing ticket quantities
    Optimize {
        file: PathBuf,

        /// Write the optimized quantities back to the file
        #[arg(long)]
        save: bool,
    },

    /// Print revenue, costs and balance
    Report { file: PathBuf },

    /// Export the ticket plan as CSV
    ExportCsv { file: PathBuf, out: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PlannerConfig::resolve(cli.config.as_deref()).context("Failed to load planner configuration")?;
    init_tracing(&config);

    match cli.command {
        Command::Show { file } => run_show(&file),
        Command::Optimize { file, save } => run_optimize(&file, save, config),
        Command::Report { file } => run_report(&file),
        Command::ExportCsv { file, out } => run_export(&file, &out),
    }
}

/// RUST_LOG wins over the configured filter
fn init_tracing(config: &PlannerConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(file: &Path) -> Result<Festival> {
    Festival::load_from(file).with_context(|| format!("Failed to load festival from {}", file.display()))
}

fn run_show(file: &Path) -> Result<()> {
    let festival = load(file)?;

    println!("🎪 {} @ {}", festival.name(), festival.location());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Starts   : {}", festival.start());
    println!("Area     : {:.1} m2", festival.area());
    println!("Location : ${:.2}", festival.location_price());

    println!("\n🎤 Program ({} slot(s))", festival.schedule().len());
    for entry in festival.program() {
        println!(
            "  {} → {}  {:<20} {}",
            entry.starts_at.format("%a %H:%M"),
            entry.ends_at.format("%H:%M"),
            entry.scene,
            entry.artist
        );
    }

    println!("\n🎟️  Ticket classes");
    for ticket in festival.ticket_classes() {
        println!(
            "  {:<20} {:>8} x ${:>8.2}  ({} benefit(s))",
            ticket.type_name(),
            ticket.quantity(),
            ticket.price(),
            ticket.benefits().len()
        );
    }

    println!("\n📦 Stocks");
    for stock in festival.stocks() {
        println!(
            "  {:<20} {:>8} x ${:>8.2}  {}  load {:.1}",
            stock.name(),
            stock.quantity(),
            stock.price(),
            if stock.is_fixed() { "fixed" } else { "     " },
            festival.stock_load(stock)
        );
    }

    Ok(())
}

fn run_optimize(file: &Path, save: bool, config: PlannerConfig) -> Result<()> {
    let mut festival = load(file)?;

    let optimizer = Optimizer::new(config, MicroLpSolver);
    let outcome = optimizer
        .optimize(&mut festival)
        .with_context(|| format!("Failed to optimize {}", festival.name()))?;

    println!("📈 {}", outcome.summary());
    for planned in &outcome.quantities {
        println!(
            "  {:<20} {:>8}  ${:>12.2}",
            planned.type_name, planned.quantity, planned.revenue
        );
    }

    if save {
        festival.save().context("Failed to save optimized festival")?;
        info!("Optimized quantities written to {}", file.display());
        println!("\n✓ Saved to {}", file.display());
    }

    Ok(())
}

fn run_report(file: &Path) -> Result<()> {
    let festival = load(file)?;
    let report = FinancialReport::for_festival(&festival);

    println!("💶 {}", report.summary());
    for line in &report.tickets {
        println!("  + {:<20} {:>8} x ${:>8.2} = ${:>12.2}", line.type_name, line.quantity, line.price, line.revenue);
    }
    for line in &report.stocks {
        println!("  - {:<20} {:>8.1} x ${:>8.2} = ${:>12.2}", line.name, line.units, line.unit_price, line.cost);
    }
    if !report.is_profitable() {
        println!("\n⚠️  Festival runs at a loss");
    }

    Ok(())
}

fn run_export(file: &Path, out: &Path) -> Result<()> {
    let festival = load(file)?;
    let writer = File::create(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let rows = write_ticket_plan_csv(&festival, writer)?;
    println!("✓ Exported {} ticket class(es) to {}", rows, out.display());
    Ok(())
}
