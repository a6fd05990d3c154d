use std::io::Write;
use std::net::IpAddr;

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::location::{LocationRecord, SENTINEL};

const REMOTE_HEADER: [&str; 5] = ["IP", "Country", "City", "Lat/Lng", "TZ"];

const COMPARE_HEADER: [&str; 9] = [
    "IP",
    "Country (F)",
    "Country (M)",
    "City (F)",
    "City (M)",
    "Lat/Lng (F)",
    "Lat/Lng (M)",
    "TZ (F)",
    "TZ (M)",
];

/// Which lookup produced a group of columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The Fastah API, suffixed "(F)" when comparing.
    Remote,
    /// The local MaxMind database, suffixed "(M)".
    Local,
}

/// The column schema of the output table.
///
/// Both layouts share one fixed field order (country, city, lat/lng,
/// timezone); comparison interleaves the two sources so each field's
/// remote and local values sit side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Remote results only.
    Remote,
    /// Remote and local results in alternating columns.
    Compare,
}

impl Layout {
    pub fn header(self) -> &'static [&'static str] {
        match self {
            Layout::Remote => &REMOTE_HEADER,
            Layout::Compare => &COMPARE_HEADER,
        }
    }

    #[inline]
    pub fn width(self) -> usize {
        self.header().len()
    }

    #[inline]
    fn stride(self) -> usize {
        match self {
            Layout::Remote => 1,
            Layout::Compare => 2,
        }
    }

    /// Column index of `field` (0..4) for `source`, if this layout has one.
    #[inline]
    pub fn column(self, source: Source, field: usize) -> Option<usize> {
        debug_assert!(field < LocationRecord::FIELD_COUNT);
        let offset = match (self, source) {
            (_, Source::Remote) => 0,
            (Layout::Compare, Source::Local) => 1,
            (Layout::Remote, Source::Local) => return None,
        };
        Some(1 + field * self.stride() + offset)
    }
}

/// One rendered table row for one input address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    cells: Vec<String>,
}

impl ResultRow {
    /// A row sized to `layout` with the canonical address in column 0.
    pub fn new(layout: Layout, ip: IpAddr) -> Self {
        let mut cells = vec![String::new(); layout.width()];
        cells[0] = ip.to_string();
        Self { cells }
    }

    /// Write `record`'s display fields into `source`'s columns.
    pub fn fill(&mut self, layout: Layout, source: Source, record: &LocationRecord) {
        for (field, value) in record.display_fields().into_iter().enumerate() {
            if let Some(col) = layout.column(source, field) {
                self.cells[col] = value;
            }
        }
    }

    /// Write the sentinel marker into every column of `source`.
    pub fn mark_failed(&mut self, layout: Layout, source: Source) {
        for field in 0..LocationRecord::FIELD_COUNT {
            if let Some(col) = layout.column(source, field) {
                self.cells[col] = SENTINEL.to_string();
            }
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// Accumulates rows and renders them as an aligned text table.
#[derive(Debug, Clone)]
pub struct ResultTable {
    layout: Layout,
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn push(&mut self, row: ResultRow) {
        debug_assert_eq!(row.cells.len(), self.layout.width());
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn render(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.layout.header().iter().map(|h| h.to_string()));
        for row in &self.rows {
            builder.push_record(row.cells.iter().cloned());
        }
        builder.build().with(Style::rounded()).to_string()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "{}", self.render())
    }
}
