//! Command handlers

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use uuid::Uuid;

use slab_core::deductions::MAX_CORNER_DEDUCTIONS;
use slab_core::dispatch::{group_by_dispatch, DispatchBatch, NumberDirection};
use slab_core::errors::{DispatchError, DispatchResult};
use slab_core::ledger::{DispatchLedger, RecordFilter};
use slab_core::pdf::{render_dispatch_note, render_dispatch_register};
use slab_core::reports;
use slab_core::session::{DispatchMeta, DispatchSession, SlabDraft};
use slab_core::store::{load_ledger, load_or_create_ledger, save_ledger, FileLock};
use slab_core::units::MeasurementUnit;

use crate::cli::{Cli, Commands, OutputFormat, ReportKind};
use crate::output;

/// Execute CLI command
pub fn execute(cli: Cli) -> DispatchResult<()> {
    match &cli.command {
        Commands::Record {
            lot,
            party,
            material,
            vehicle,
            supervisor,
            unit,
            descending,
        } => cmd_record(
            &cli.ledger,
            RecordArgs {
                lot: lot.clone(),
                party: party.clone(),
                material: material.clone(),
                vehicle: vehicle.clone(),
                supervisor: supervisor.clone(),
                unit: unit.clone(),
                descending: *descending,
            },
        ),

        Commands::List {
            lot,
            party,
            supervisor,
            from,
            to,
            limit,
        } => cmd_list(
            &cli.ledger,
            cli.format,
            RecordFilter {
                lot_number: lot.clone(),
                party_name: party.clone(),
                supervisor: supervisor.clone(),
                from: *from,
                to: *to,
                ..Default::default()
            },
            *limit,
        ),

        Commands::Show { dispatch_id } => cmd_show(&cli.ledger, cli.format, dispatch_id),

        Commands::Report { by, from, to } => cmd_report(&cli.ledger, cli.format, *by, *from, *to),

        Commands::Note {
            dispatch_id,
            output,
        } => cmd_note(&cli.ledger, dispatch_id, output.clone()),

        Commands::Register { from, to, output } => {
            cmd_register(&cli.ledger, *from, *to, output.clone())
        }

        Commands::Correct { id, length, height } => {
            cmd_correct(&cli.ledger, id, *length, *height)
        }
    }
}

struct RecordArgs {
    lot: Option<String>,
    party: Option<String>,
    material: Option<String>,
    vehicle: Option<String>,
    supervisor: Option<String>,
    unit: Option<String>,
    descending: bool,
}

// ============================================================================
// record
// ============================================================================

fn cmd_record(path: &Path, args: RecordArgs) -> DispatchResult<()> {
    // Hold the lock for the whole entry session; two gantries writing the
    // same ledger at once is exactly what this prevents.
    let _lock = FileLock::acquire(path, current_user())?;

    let mut ledger = if path.exists() {
        load_ledger(path)?
    } else {
        let company = prompt_line("New ledger - company name [SlabTally Yard]: ", "SlabTally Yard");
        DispatchLedger::new(company)
    };

    let lot = match args.lot {
        Some(lot) => lot,
        None => prompt_line("Lot number: ", ""),
    };
    let last = ledger.find_last_by_lot(&lot).cloned();
    if let Some(ref last) = last {
        println!(
            "Continuing lot {} (last slab #{}, party {})",
            lot, last.slab_number, last.party_name
        );
    }

    let party = args
        .party
        .or_else(|| last.as_ref().map(|r| r.party_name.clone()))
        .unwrap_or_else(|| prompt_line("Party name: ", ""));
    let material = args
        .material
        .or_else(|| last.as_ref().map(|r| r.material.clone()))
        .unwrap_or_else(|| prompt_line("Material: ", ""));
    let vehicle = args
        .vehicle
        .or_else(|| last.as_ref().map(|r| r.vehicle_number.clone()))
        .unwrap_or_else(|| prompt_line("Vehicle number (optional): ", ""));
    let supervisor = args
        .supervisor
        .or_else(|| last.as_ref().map(|r| r.supervisor.clone()))
        .unwrap_or_else(|| prompt_line("Supervisor (optional): ", ""));

    let unit = match args.unit {
        Some(ref s) => MeasurementUnit::parse(s).ok_or_else(|| {
            let known: Vec<&str> = MeasurementUnit::ALL.iter().map(|u| u.abbreviation()).collect();
            DispatchError::invalid_input(
                "unit",
                s.clone(),
                format!("Expected one of: {}", known.join(", ")),
            )
        })?,
        None => ledger.settings.default_unit,
    };
    let direction = if args.descending {
        NumberDirection::Descending
    } else {
        ledger.settings.default_direction
    };

    let meta = DispatchMeta::new(party, material, lot.clone())
        .with_vehicle(vehicle)
        .with_supervisor(supervisor);
    let mut session = DispatchSession::new(meta, unit, direction);
    session.seed_slab_numbers(&ledger.slab_numbers_for_lot(&lot));

    println!();
    println!(
        "Measuring in {} ({} numbering). Dimensions entered as {}.",
        unit.display_name(),
        direction.display_name().to_lowercase(),
        unit.abbreviation()
    );
    println!();

    loop {
        let suggested = session.suggest_slab_number();
        let number = prompt_i32(&format!("Slab number [{}]: ", suggested), suggested);
        let length = prompt_f64("  Length: ", 0.0);
        let height = prompt_f64("  Height: ", 0.0);
        let thickness = prompt_f64("  Thickness: ", 0.0);

        let mut draft = SlabDraft::new(number, length, height, thickness);
        while draft.deductions.len() < MAX_CORNER_DEDUCTIONS
            && prompt_yes("  Corner deduction? [y/N]: ", false)
        {
            let l = prompt_f64("    Deduction length: ", 0.0);
            let h = prompt_f64("    Deduction height: ", 0.0);
            draft = draft.with_deduction(l, h);
        }

        match session.add_slab(draft) {
            Ok(n) => {
                if let Some(slab) = session.slab(n) {
                    println!(
                        "  Slab #{}: gross {:.4}, deductions {:.4}, net {:.4} sq ft",
                        n,
                        slab.gross_area.value(),
                        slab.total_deduction_area.value(),
                        slab.net_area.value()
                    );
                }
            }
            Err(e) => println!("  Rejected: {}", e),
        }

        if !prompt_yes("Add another slab? [Y/n]: ", true) {
            break;
        }
    }

    if session.is_empty() {
        println!("Nothing recorded.");
        return Ok(());
    }

    println!();
    output::print_session_summary(&session);
    session.validate()?;

    if !prompt_yes("Finalize and save dispatch? [Y/n]: ", true) {
        println!("Discarded.");
        return Ok(());
    }

    let total_net = session.total_net_area();
    let dispatch = session.finalize()?;
    let dispatch_id = dispatch.dispatch_id.clone();
    let count = dispatch.slabs.len();

    ledger.add_records(dispatch.slabs);
    save_ledger(&ledger, path)?;

    println!(
        "Saved dispatch {} ({} slabs, {:.4} sq ft net) to {}",
        dispatch_id,
        count,
        total_net.value(),
        path.display()
    );

    if prompt_yes("Write dispatch note PDF? [y/N]: ", false) {
        let batch = find_batch(&ledger, &dispatch_id)?;
        let bytes = render_dispatch_note(&batch)?;
        let out = PathBuf::from(format!("{}.pdf", dispatch_id));
        write_file(&out, &bytes)?;
        println!("Wrote dispatch note to {}", out.display());
    }
    Ok(())
}

// ============================================================================
// list / show / report
// ============================================================================

fn cmd_list(
    path: &Path,
    format: OutputFormat,
    filter: RecordFilter,
    limit: usize,
) -> DispatchResult<()> {
    let ledger = open_ledger(path)?;
    let mut entries = ledger.query_entries(&filter);
    entries.truncate(limit);
    output::print_records(format, &entries)
}

fn cmd_show(path: &Path, format: OutputFormat, dispatch_id: &str) -> DispatchResult<()> {
    let batch = find_batch(&open_ledger(path)?, dispatch_id)?;
    output::print_batch(format, &batch)
}

fn cmd_report(
    path: &Path,
    format: OutputFormat,
    by: ReportKind,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> DispatchResult<()> {
    let ledger = open_ledger(path)?;
    let records = ledger.query(&RecordFilter {
        from,
        to,
        ..Default::default()
    });

    let (title, stats) = match by {
        ReportKind::Party => ("party", reports::party_breakdown(&records)),
        ReportKind::Material => ("material", reports::material_breakdown(&records)),
        ReportKind::Supervisor => ("supervisor", reports::supervisor_breakdown(&records)),
        ReportKind::Day => (
            "day",
            reports::daily_breakdown(&records)
                .into_iter()
                .map(|(date, stats)| (date.to_string(), stats))
                .collect(),
        ),
    };
    output::print_report(format, title, &stats)
}

// ============================================================================
// note / register / correct
// ============================================================================

fn cmd_note(path: &Path, dispatch_id: &str, output: Option<PathBuf>) -> DispatchResult<()> {
    let batch = find_batch(&open_ledger(path)?, dispatch_id)?;
    let bytes = render_dispatch_note(&batch)?;

    let out = output.unwrap_or_else(|| PathBuf::from(format!("{}.pdf", batch.dispatch_id)));
    write_file(&out, &bytes)?;

    println!(
        "Wrote dispatch note for {} ({} slabs) to {}",
        batch.dispatch_id,
        batch.slab_count(),
        out.display()
    );
    Ok(())
}

fn cmd_register(
    path: &Path,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    output: PathBuf,
) -> DispatchResult<()> {
    let ledger = open_ledger(path)?;
    let records = ledger.query(&RecordFilter {
        from,
        to,
        ..Default::default()
    });
    let batches = group_by_dispatch(&records);

    let company = if ledger.meta.company.is_empty() {
        "SlabTally"
    } else {
        &ledger.meta.company
    };
    let bytes = render_dispatch_register(&batches, company)?;
    write_file(&output, &bytes)?;

    println!(
        "Wrote register of {} dispatches to {}",
        batches.len(),
        output.display()
    );
    Ok(())
}

fn cmd_correct(path: &Path, id: &str, length: f64, height: f64) -> DispatchResult<()> {
    let id = Uuid::parse_str(id)
        .map_err(|e| DispatchError::invalid_input("id", id, e.to_string()))?;

    let _lock = FileLock::acquire(path, current_user())?;
    let mut ledger = load_ledger(path)?;
    ledger.correct_record(&id, length, height)?;
    save_ledger(&ledger, path)?;

    if let Some(record) = ledger.get_record(&id) {
        println!(
            "Corrected slab #{}: gross {:.4}, deductions {:.4}, net {:.4} sq ft",
            record.slab_number,
            record.gross_area.value(),
            record.total_deduction_area.value(),
            record.net_area.value()
        );
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn open_ledger(path: &Path) -> DispatchResult<DispatchLedger> {
    let ledger = load_or_create_ledger(path, "SlabTally Yard")?;
    if let Some(lock) = FileLock::check(path) {
        eprintln!(
            "note: {} is locked by {} ({}); reading a snapshot",
            path.display(),
            lock.user_id,
            lock.machine
        );
    }
    Ok(ledger)
}

fn find_batch(ledger: &DispatchLedger, dispatch_id: &str) -> DispatchResult<DispatchBatch> {
    let records = ledger.query(&RecordFilter {
        dispatch_id: Some(dispatch_id.to_string()),
        ..Default::default()
    });
    group_by_dispatch(&records)
        .into_iter()
        .next()
        .ok_or_else(|| DispatchError::record_not_found(format!("dispatch {}", dispatch_id)))
}

fn write_file(path: &Path, bytes: &[u8]) -> DispatchResult<()> {
    fs::write(path, bytes).map_err(|e| {
        DispatchError::file_error("write", path.display().to_string(), e.to_string())
    })
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "slabtally".to_string())
}

fn prompt_line(prompt: &str, default: &str) -> String {
    print!("{}", prompt);
    if io::stdout().flush().is_err() {
        return default.to_string();
    }

    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return default.to_string();
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn prompt_f64(prompt: &str, default: f64) -> f64 {
    prompt_line(prompt, "").parse().unwrap_or(default)
}

fn prompt_i32(prompt: &str, default: i32) -> i32 {
    prompt_line(prompt, "").parse().unwrap_or(default)
}

fn prompt_yes(prompt: &str, default: bool) -> bool {
    match prompt_line(prompt, "").to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}
