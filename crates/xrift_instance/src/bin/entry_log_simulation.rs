//! # Entry Log Convergence Simulation
//!
//! Clients join and leave at random while their stores duplicate and
//! reorder updates. Checks that every online replica ends with the same log
//! and that no entry ID appears twice.
//!
//! Usage: `entry_log_simulation [config.toml]`
//! Log level: `RUST_LOG=xrift_instance=debug`

use std::process::ExitCode;
use std::time::Instant;

use tracing::error;
use tracing_subscriber::EnvFilter;
use xrift_instance::simulation::ConvergenceSimulation;
use xrift_instance::{InstanceResult, SimulationConfig};

fn load_config() -> InstanceResult<SimulationConfig> {
    match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_path(path),
        None => Ok(SimulationConfig::default()),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "Could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║         XRIFT ENTRY LOG - CONVERGENCE SIMULATION                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    println!("┌─ CONFIGURATION ──────────────────────────────────────────────────┐");
    println!("│ Clients:            {}", config.clients);
    println!("│ Churn Events:       {}", config.churn_events);
    println!("│ Duplicate Notices:  {}%", config.duplicate_percent);
    println!("│ Redelivered Writes: {}%", config.redeliver_percent);
    println!("│ Stale Rosters:      {}%", config.stale_roster_percent);
    println!("│ Reorder:            {}", config.reorder);
    println!("│ Max Entries:        {}", config.entry_log.max_entries);
    println!("│ Seed:               {:#x}", config.seed);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let start = Instant::now();
    let report = match ConvergenceSimulation::new(config).and_then(|mut sim| sim.run()) {
        Ok(report) => report,
        Err(err) => {
            error!(%err, "Simulation aborted");
            return ExitCode::FAILURE;
        }
    };
    let elapsed = start.elapsed();

    println!("┌─ CHURN ──────────────────────────────────────────────────────────┐");
    println!("│ Steps:              {}", report.steps);
    println!("│ Joins / Leaves:     {} / {}", report.joins, report.leaves);
    println!("│ Duplicate Notices:  {}", report.duplicate_notifications);
    println!("│ Online At End:      {}", report.online_clients);
    println!("│ Real Time:          {:.2} ms", elapsed.as_secs_f64() * 1000.0);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ WRITERS ────────────────────────────────────────────────────────┐");
    println!("│ Entries Written:    {}", report.trackers.authored);
    println!("│ Already Logged:     {}", report.trackers.absorbed);
    println!("│ Deferred:           {}", report.trackers.deferred);
    println!("│ Repairs Persisted:  {}", report.trackers.repaired);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ STORE ──────────────────────────────────────────────────────────┐");
    println!("│ Writes:             {}", report.store_writes);
    println!("│ Relayed:            {}", report.updates_delivered);
    println!("│ Redelivered:        {}", report.updates_redelivered);
    println!("│ Superseded:         {}", report.updates_superseded);
    println!("│ Settle Rounds:      {}", report.settle_rounds);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ FINAL LOG ──────────────────────────────────────────────────────┐");
    println!("│ Entries:            {}", report.final_log_len);
    println!("│ Duplicate IDs:      {}", report.duplicate_ids);
    println!("│ Duplicate Rows:     {}", report.duplicate_rows);
    println!("│ Fallback Names:     {}", report.fallback_entries);
    if report.converged {
        println!("│ Status:             ✓ ALL REPLICAS AGREE");
    } else {
        println!("│ Status:             ✗ REPLICAS DIVERGED");
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let passed = report.converged && report.duplicate_ids == 0 && report.duplicate_rows == 0;
    println!("╔══════════════════════════════════════════════════════════════════╗");
    if passed {
        println!("║  ✓ CONVERGED                                                     ║");
    } else {
        println!("║  ✗ NOT CONVERGED                                                 ║");
    }
    println!("╚══════════════════════════════════════════════════════════════════╝");

    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
