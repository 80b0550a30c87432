//! Output formatting for tables and JSON

use std::collections::BTreeMap;

use uuid::Uuid;

use slab_core::dispatch::{DispatchBatch, UNKNOWN_DISPATCH_ID};
use slab_core::errors::{DispatchError, DispatchResult};
use slab_core::measure::SlabMeasurement;
use slab_core::reports::GroupStats;
use slab_core::session::DispatchSession;

use crate::cli::OutputFormat;

pub fn print_records(
    format: OutputFormat,
    entries: &[(Uuid, SlabMeasurement)],
) -> DispatchResult<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = entries
                .iter()
                .map(|(id, record)| serde_json::json!({ "id": id, "record": record }))
                .collect();
            print_json(&rows)
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No records.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<24} {:>5}  {:<24} {:>10}  {}",
                "ID", "DISPATCH", "SLAB", "DIMENSIONS", "NET SQFT", "PARTY"
            );
            for (id, record) in entries {
                println!(
                    "{:<36}  {:<24} {:>5}  {:<24} {:>10.4}  {}",
                    id,
                    dispatch_label(record),
                    record.slab_number,
                    record.dimensions_display(),
                    record.net_area.value(),
                    record.party_name
                );
            }
            println!();
            println!("{} records", entries.len());
            Ok(())
        }
    }
}

pub fn print_batch(format: OutputFormat, batch: &DispatchBatch) -> DispatchResult<()> {
    match format {
        OutputFormat::Json => print_json(batch),
        OutputFormat::Table => {
            banner(&format!("DISPATCH {}", batch.dispatch_id));
            println!();
            println!("Party:       {}", batch.party_name);
            println!("Material:    {}", batch.material);
            println!("Lot:         {}", batch.lot_number);
            if !batch.vehicle_number.is_empty() {
                println!("Vehicle:     {}", batch.vehicle_number);
            }
            if !batch.supervisor.is_empty() {
                println!("Supervisor:  {}", batch.supervisor);
            }
            println!(
                "Dispatched:  {}",
                batch.timestamp.format("%Y-%m-%d %H:%M UTC")
            );
            println!();
            print_slab_rows(&batch.slabs);
            println!();
            print_totals(
                batch.slab_count(),
                batch.total_gross_area().value(),
                batch.total_deduction_area().value(),
                batch.total_net_area.value(),
            );
            Ok(())
        }
    }
}

pub fn print_report(
    format: OutputFormat,
    title: &str,
    stats: &BTreeMap<String, GroupStats>,
) -> DispatchResult<()> {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table => {
            banner(&format!("REPORT BY {}", title.to_uppercase()));
            println!();
            if stats.is_empty() {
                println!("No records.");
                return Ok(());
            }
            println!(
                "{:<28} {:>6} {:>10} {:>12} {:>12} {:>12}",
                title.to_uppercase(),
                "SLABS",
                "DISPATCHES",
                "GROSS",
                "DEDUCT",
                "NET"
            );
            let mut slabs = 0usize;
            let mut gross = 0.0;
            let mut deduction = 0.0;
            let mut net = 0.0;
            for (key, group) in stats {
                println!(
                    "{:<28} {:>6} {:>10} {:>12.4} {:>12.4} {:>12.4}",
                    key,
                    group.slab_count,
                    group.dispatch_count,
                    group.total_gross_area.value(),
                    group.total_deduction_area.value(),
                    group.total_net_area.value()
                );
                slabs += group.slab_count;
                gross += group.total_gross_area.value();
                deduction += group.total_deduction_area.value();
                net += group.total_net_area.value();
            }
            println!();
            println!(
                "{:<28} {:>6} {:>10} {:>12.4} {:>12.4} {:>12.4}",
                "TOTAL", slabs, "", gross, deduction, net
            );
            Ok(())
        }
    }
}

pub fn print_session_summary(session: &DispatchSession) {
    banner(&format!("DISPATCH SUMMARY - {}", session.meta.lot_number));
    println!();
    println!("Party:       {}", session.meta.party_name);
    println!("Material:    {}", session.meta.material);
    if !session.meta.vehicle_number.is_empty() {
        println!("Vehicle:     {}", session.meta.vehicle_number);
    }
    if !session.meta.supervisor.is_empty() {
        println!("Supervisor:  {}", session.meta.supervisor);
    }
    println!();
    print_slab_rows(session.slabs());
    println!();

    let slabs = session.slabs();
    let gross: f64 = slabs.iter().map(|s| s.gross_area.value()).sum();
    let deduction: f64 = slabs.iter().map(|s| s.total_deduction_area.value()).sum();
    print_totals(
        session.slab_count(),
        gross,
        deduction,
        session.total_net_area().value(),
    );
    println!();
}

// ============================================================================
// Helpers
// ============================================================================

fn banner(title: &str) {
    println!("{}", "═".repeat(60));
    println!("  {}", title);
    println!("{}", "═".repeat(60));
}

fn print_slab_rows(slabs: &[SlabMeasurement]) {
    println!(
        " {:>4}  {:<26} {:>10} {:>10} {:>10}",
        "SLAB", "DIMENSIONS", "GROSS", "DEDUCT", "NET"
    );
    for slab in slabs {
        println!(
            " {:>4}  {:<26} {:>10.4} {:>10.4} {:>10.4}",
            slab.slab_number,
            slab.dimensions_display(),
            slab.gross_area.value(),
            slab.total_deduction_area.value(),
            slab.net_area.value()
        );
    }
}

fn print_totals(count: usize, gross: f64, deduction: f64, net: f64) {
    println!(
        "Total: {} slabs, gross {:.4}, deductions {:.4}, net {:.4} sq ft",
        count, gross, deduction, net
    );
}

fn dispatch_label(record: &SlabMeasurement) -> &str {
    if record.dispatch_id.trim().is_empty() {
        UNKNOWN_DISPATCH_ID
    } else {
        &record.dispatch_id
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> DispatchResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| DispatchError::SerializationError {
        reason: e.to_string(),
    })?;
    println!("{}", text);
    Ok(())
}
