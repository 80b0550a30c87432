//! CLI definition using clap

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Which field a report groups by
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportKind {
    Party,
    Material,
    Supervisor,
    Day,
}

#[derive(Parser)]
#[command(name = "slabtally")]
#[command(version)]
#[command(about = "Slab measurement and dispatch tracking for stone processing yards")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Ledger file to operate on
    #[arg(long, global = true, default_value = "dispatch.slt")]
    pub ledger: PathBuf,

    /// Output format (table, json)
    #[arg(long, short = 'f', global = true, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a dispatch interactively: measure slabs, then finalize
    Record {
        /// Lot number; continuing a known lot pre-fills party/material
        /// and reserves its already-used slab numbers
        #[arg(long, short = 'l')]
        lot: Option<String>,

        /// Receiving party (prompted if not given)
        #[arg(long)]
        party: Option<String>,

        /// Material name (prompted if not given)
        #[arg(long)]
        material: Option<String>,

        /// Vehicle number
        #[arg(long)]
        vehicle: Option<String>,

        /// Supervisor recording the measurements
        #[arg(long)]
        supervisor: Option<String>,

        /// Measurement unit: in, cm or mm (ledger default if not given)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// Number slabs downward from the highest existing number
        #[arg(long)]
        descending: bool,
    },

    /// List recorded slabs, most recent first
    List {
        /// Filter by lot number
        #[arg(long, short = 'l')]
        lot: Option<String>,

        /// Filter by party
        #[arg(long)]
        party: Option<String>,

        /// Filter by supervisor
        #[arg(long)]
        supervisor: Option<String>,

        /// Only records on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only records on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Limit number of rows shown
        #[arg(long, short = 'n', default_value = "50")]
        limit: usize,
    },

    /// Show one dispatch in full
    Show {
        /// Dispatch identifier (or "unknown" for unassigned records)
        dispatch_id: String,
    },

    /// Aggregate totals by party, material, supervisor or day
    Report {
        /// Field to group by
        #[arg(long, short = 'b', value_enum, default_value_t = ReportKind::Party)]
        by: ReportKind,

        /// Only records on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only records on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Render a dispatch note PDF for one dispatch
    Note {
        /// Dispatch identifier
        dispatch_id: String,

        /// Output file (defaults to <dispatch_id>.pdf)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Render a register PDF covering several dispatches
    Register {
        /// Only dispatches on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Only dispatches on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output file
        #[arg(long, short = 'o', default_value = "dispatch_register.pdf")]
        output: PathBuf,
    },

    /// Correct a persisted record's length/height (areas recompute)
    Correct {
        /// Record UUID (see `list --format json`)
        id: String,

        /// New length, in the record's stored unit
        #[arg(long)]
        length: f64,

        /// New height, in the record's stored unit
        #[arg(long)]
        height: f64,
    },
}
