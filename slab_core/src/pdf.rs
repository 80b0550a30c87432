//! # PDF Generation Module
//!
//! Generates dispatch documents from aggregated slab data using Typst.
//!
//! ## Architecture
//!
//! - Typst templates are embedded as string constants
//! - Data is injected via string formatting before compilation
//! - Output is raw PDF bytes (`Vec<u8>`)
//!
//! All area values arrive pre-computed and pre-rounded from the measurement
//! engine; this module formats and lays out, it never recalculates.
//!
//! ## Example
//!
//! ```rust,no_run
//! use slab_core::dispatch::group_by_dispatch;
//! use slab_core::pdf::render_dispatch_note;
//!
//! let records = Vec::new();
//! let batches = group_by_dispatch(&records);
//! let pdf_bytes = render_dispatch_note(&batches[0]).unwrap();
//! std::fs::write("dispatch_note.pdf", pdf_bytes).unwrap();
//! ```

use chrono::Utc;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::dispatch::DispatchBatch;
use crate::errors::{DispatchError, DispatchResult};
use crate::measure::SlabMeasurement;
use crate::units::SqFt;

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A minimal Typst world for compiling documents without external files.
struct PdfWorld {
    /// The main source document
    main: Source,
    /// Font book
    book: LazyHash<FontBook>,
    /// Available fonts
    fonts: Vec<Font>,
    /// Library (standard functions)
    library: LazyHash<Library>,
}

impl PdfWorld {
    fn new(source: String) -> Self {
        let fonts = Self::load_fonts();
        let book = FontBook::from_fonts(&fonts);

        PdfWorld {
            main: Source::detached(source),
            book: LazyHash::new(book),
            fonts,
            library: LazyHash::new(Library::default()),
        }
    }

    fn load_fonts() -> Vec<Font> {
        // Bundled fonts from typst-assets (includes DejaVu Sans Mono)
        let mut fonts = Vec::new();
        for font_bytes in typst_assets::fonts() {
            let buffer = Bytes::new(font_bytes.to_vec());
            for font in Font::iter(buffer) {
                fonts.push(font);
            }
        }
        fonts
    }
}

impl World for PdfWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// PDF Templates
// ============================================================================

/// Typst template for a single dispatch note
const NOTE_TEMPLATE: &str = r##"
#set page(
  paper: "a4",
  margin: (top: 1in, bottom: 1in, left: 0.8in, right: 0.8in),
  header: align(right)[
    #text(size: 9pt, fill: gray)[SlabTally Dispatch Records]
  ],
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[Dispatch: {{DISPATCH_ID}}]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{{PRINT_DATE}}]],
    )
  ]
)

#set text(font: "DejaVu Sans Mono", size: 10pt)

// Title Block
#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 18pt, weight: "bold")[Dispatch Note]
    #v(4pt)
    #text(size: 13pt)[{{DISPATCH_ID}}]
  ]
]

#v(12pt)

#grid(
  columns: (1fr, 1fr),
  gutter: 20pt,
  [
    *Consignment*
    #v(4pt)
    #table(
      columns: (auto, 1fr),
      stroke: none,
      row-gutter: 4pt,
      [Party:], [{{PARTY}}],
      [Material:], [{{MATERIAL}}],
      [Lot No.:], [{{LOT}}],
    )
  ],
  [
    *Transport*
    #v(4pt)
    #table(
      columns: (auto, 1fr),
      stroke: none,
      row-gutter: 4pt,
      [Vehicle:], [{{VEHICLE}}],
      [Supervisor:], [{{SUPERVISOR}}],
      [Dispatched:], [{{DISPATCH_DATE}}],
    )
  ]
)

#v(16pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

== Slab Measurements

#table(
  columns: (auto, 1fr, auto, auto, auto),
  inset: 7pt,
  stroke: 0.5pt,
  align: (right, left, right, right, right),
  table.header([*No.*], [*Dimensions*], [*Gross (sq ft)*], [*Deduction (sq ft)*], [*Net (sq ft)*]),
{{SLAB_ROWS}}
)

#v(16pt)

#align(right)[
  #block(fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #table(
      columns: (auto, auto),
      stroke: none,
      row-gutter: 4pt,
      align: (left, right),
      [Total slabs:], [{{SLAB_COUNT}}],
      [Total gross:], [{{TOTAL_GROSS}} sq ft],
      [Total deductions:], [{{TOTAL_DEDUCTION}} sq ft],
      [*Total net:*], [*{{TOTAL_NET}} sq ft*],
    )
  ]
]

#v(48pt)

#grid(
  columns: (1fr, 1fr),
  gutter: 40pt,
  [
    #line(length: 100%, stroke: 0.5pt)
    #v(2pt)
    #text(size: 9pt)[Supervisor: {{SUPERVISOR}}]
  ],
  [
    #line(length: 100%, stroke: 0.5pt)
    #v(2pt)
    #text(size: 9pt)[Received by (party)]
  ],
)

#v(24pt)
#line(length: 100%, stroke: 0.5pt)
#v(8pt)

#text(size: 9pt, fill: gray)[
  Generated by SlabTally \
  Areas are in square feet, rounded to four decimal places per slab.
]
"##;

// ============================================================================
// PDF Rendering Functions
// ============================================================================

/// Render a single dispatch note to PDF.
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - PDF file as bytes
/// * `Err(DispatchError)` - If the batch is empty or rendering fails
pub fn render_dispatch_note(batch: &DispatchBatch) -> DispatchResult<Vec<u8>> {
    if batch.slabs.is_empty() {
        return Err(DispatchError::invalid_input(
            "slabs",
            "empty",
            "A dispatch note needs at least one slab",
        ));
    }
    compile_pdf(note_source(batch))
}

/// Render a register of several dispatches to a single PDF: a summary
/// table up front, then one page per dispatch.
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - PDF file as bytes
/// * `Err(DispatchError)` - If there are no batches or rendering fails
pub fn render_dispatch_register(batches: &[DispatchBatch], company: &str) -> DispatchResult<Vec<u8>> {
    if batches.is_empty() {
        return Err(DispatchError::invalid_input(
            "batches",
            "empty",
            "The register needs at least one dispatch",
        ));
    }
    compile_pdf(register_source(batches, company))
}

/// Fill the note template for one batch.
fn note_source(batch: &DispatchBatch) -> String {
    NOTE_TEMPLATE
        .replace("{{DISPATCH_ID}}", &escape_typst(&batch.dispatch_id))
        .replace("{{PRINT_DATE}}", &Utc::now().format("%Y-%m-%d").to_string())
        .replace("{{PARTY}}", &escape_typst(&batch.party_name))
        .replace("{{MATERIAL}}", &escape_typst(&batch.material))
        .replace("{{LOT}}", &escape_typst(&batch.lot_number))
        .replace("{{VEHICLE}}", &escape_typst(&batch.vehicle_number))
        .replace("{{SUPERVISOR}}", &escape_typst(&batch.supervisor))
        .replace(
            "{{DISPATCH_DATE}}",
            &batch.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        )
        .replace("{{SLAB_ROWS}}", &build_slab_rows(&batch.slabs))
        .replace("{{SLAB_COUNT}}", &batch.slab_count().to_string())
        .replace("{{TOTAL_GROSS}}", &fmt_area(batch.total_gross_area()))
        .replace("{{TOTAL_DEDUCTION}}", &fmt_area(batch.total_deduction_area()))
        .replace("{{TOTAL_NET}}", &fmt_area(batch.total_net_area))
}

/// Build the full register source: cover summary plus per-dispatch pages.
fn register_source(batches: &[DispatchBatch], company: &str) -> String {
    let mut source = format!(
        r##"
#set page(
  paper: "a4",
  margin: (top: 1in, bottom: 1in, left: 0.8in, right: 0.8in),
  header: align(right)[
    #text(size: 9pt, fill: gray)[SlabTally Dispatch Records]
  ],
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[{company}]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{date}]],
    )
  ]
)

#set text(font: "DejaVu Sans Mono", size: 10pt)

// Cover / Summary
#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 20pt, radius: 4pt)[
    #text(size: 22pt, weight: "bold")[Dispatch Register]
    #v(8pt)
    #text(size: 15pt)[{company}]
  ]
]

#v(24pt)

== Dispatch Summary

#table(
  columns: (auto, auto, 1fr, 1fr, auto, auto),
  inset: 7pt,
  stroke: 0.5pt,
  align: (left, left, left, left, right, right),
  table.header([*Dispatch*], [*Date*], [*Party*], [*Material*], [*Slabs*], [*Net (sq ft)*]),
{summary_rows}
)

#v(12pt)

#align(right)[
  #text(weight: "bold")[Grand total: {grand_total} sq ft across {dispatch_count} dispatches]
]
"##,
        company = escape_typst(company),
        date = Utc::now().format("%Y-%m-%d"),
        summary_rows = build_register_rows(batches),
        grand_total = fmt_area(batches.iter().fold(SqFt(0.0), |acc, b| acc + b.total_net_area)),
        dispatch_count = batches.len(),
    );

    // One page per dispatch
    for batch in batches {
        source.push_str(&format!(
            r##"
#pagebreak()

#align(center)[
  #block(width: 100%, fill: rgb("#f0f0f0"), inset: 12pt, radius: 4pt)[
    #text(size: 16pt, weight: "bold")[Dispatch {dispatch_id}]
    #v(4pt)
    #text(size: 11pt)[{party} / {material}]
  ]
]

#v(8pt)

#grid(
  columns: (1fr, 1fr, 1fr),
  gutter: 12pt,
  [Lot No.: {lot}],
  [Vehicle: {vehicle}],
  [Dispatched: {dispatch_date}],
)

#v(8pt)

#table(
  columns: (auto, 1fr, auto, auto, auto),
  inset: 7pt,
  stroke: 0.5pt,
  align: (right, left, right, right, right),
  table.header([*No.*], [*Dimensions*], [*Gross (sq ft)*], [*Deduction (sq ft)*], [*Net (sq ft)*]),
{slab_rows}
)

#v(8pt)

#align(right)[
  #text(weight: "bold")[{slab_count} slabs, net {total_net} sq ft]
]
"##,
            dispatch_id = escape_typst(&batch.dispatch_id),
            party = escape_typst(&batch.party_name),
            material = escape_typst(&batch.material),
            lot = escape_typst(&batch.lot_number),
            vehicle = escape_typst(&batch.vehicle_number),
            dispatch_date = batch.timestamp.format("%Y-%m-%d %H:%M"),
            slab_rows = build_slab_rows(&batch.slabs),
            slab_count = batch.slab_count(),
            total_net = fmt_area(batch.total_net_area),
        ));
    }

    source
}

/// Compile Typst source and render it to PDF bytes.
fn compile_pdf(source: String) -> DispatchResult<Vec<u8>> {
    let world = PdfWorld::new(source);
    let warned = typst::compile(&world);

    let document = warned.output.map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        DispatchError::pdf_error(format!("Typst compilation failed: {}", error_msgs.join("; ")))
    })?;

    let pdf_bytes = typst_pdf::pdf(&document, &PdfOptions::default()).map_err(|errors| {
        let error_msgs: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
        DispatchError::pdf_error(format!("PDF rendering failed: {}", error_msgs.join("; ")))
    })?;

    Ok(pdf_bytes)
}

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// Format an area for document output (4 decimal places)
fn fmt_area(area: SqFt) -> String {
    format!("{:.4}", area.value())
}

/// Build measurement table rows for a batch's slabs
fn build_slab_rows(slabs: &[SlabMeasurement]) -> String {
    slabs
        .iter()
        .map(|slab| {
            format!(
                "  [{}], [{}], [{}], [{}], [{}],",
                slab.slab_number,
                escape_typst(&slab.dimensions_display()),
                fmt_area(slab.gross_area),
                fmt_area(slab.total_deduction_area),
                fmt_area(slab.net_area),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build summary table rows for the register cover page
fn build_register_rows(batches: &[DispatchBatch]) -> String {
    batches
        .iter()
        .map(|batch| {
            format!(
                "  [{}], [{}], [{}], [{}], [{}], [{}],",
                escape_typst(&batch.dispatch_id),
                batch.timestamp.format("%Y-%m-%d"),
                escape_typst(&batch.party_name),
                escape_typst(&batch.material),
                batch.slab_count(),
                fmt_area(batch.total_net_area),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
