//! The batch lookup loop.
//!
//! Addresses are read one per line and resolved strictly in order: each
//! line finishes its remote round trip (and local lookup, when comparing)
//! before the next line is read, so rows come out in input order.

use std::io::Read;
use std::net::IpAddr;

use bstr::ByteSlice;
use ripline::{
    line_buffer::{LineBufferBuilder, LineBufferReader},
    lines::LineIter,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::input::{parse_line, ParsedLine};
use crate::local::LocalLookup;
use crate::remote::{RemoteLookup, RemoteOutcome};
use crate::table::{Layout, ResultRow, ResultTable, Source};

/// Counters collected over one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows appended to the table.
    pub rows: usize,
    /// Non-blank lines that were not valid IP addresses.
    pub skipped_invalid: usize,
    /// Rows whose remote columns hold the sentinel.
    pub remote_failures: usize,
    /// Rows whose local columns hold the sentinel.
    pub local_failures: usize,
}

/// The rendered-to-be table plus what happened while filling it.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub table: ResultTable,
    pub summary: BatchSummary,
}

/// Resolves a stream of addresses against the remote API and, optionally,
/// a local database.
pub struct BatchLookup<'a> {
    remote: &'a dyn RemoteLookup,
    local: Option<&'a dyn LocalLookup>,
    report_invalid: bool,
}

impl<'a> BatchLookup<'a> {
    /// Comparison columns are used iff `local` is present.
    pub fn new(remote: &'a dyn RemoteLookup, local: Option<&'a dyn LocalLookup>) -> Self {
        Self {
            remote,
            local,
            report_invalid: false,
        }
    }

    /// Log a warning for every line that is not a valid IP address
    /// instead of dropping it silently.
    pub fn report_invalid(mut self, yes: bool) -> Self {
        self.report_invalid = yes;
        self
    }

    pub fn layout(&self) -> Layout {
        if self.local.is_some() {
            Layout::Compare
        } else {
            Layout::Remote
        }
    }

    /// Read `input` to end-of-stream and build one row per valid address.
    ///
    /// A read error or a fatal remote error aborts the batch; per-row
    /// lookup failures are recorded as sentinel values instead.
    pub fn run<R: Read>(&self, input: R) -> Result<BatchReport> {
        let layout = self.layout();
        let mut table = ResultTable::new(layout);
        let mut summary = BatchSummary::default();

        let mut line_buffer = LineBufferBuilder::new().capacity(8192).build();
        let mut lb_reader = LineBufferReader::new(input, &mut line_buffer);
        let mut lineno = 0usize;

        while lb_reader.fill().map_err(Error::Input)? {
            for line in LineIter::new(b'\n', lb_reader.buffer()) {
                lineno += 1;
                let ip = match parse_line(line) {
                    ParsedLine::Address(ip) => ip,
                    ParsedLine::Blank => continue,
                    ParsedLine::Invalid => {
                        summary.skipped_invalid += 1;
                        if self.report_invalid {
                            warn!(line = lineno, input = %line.trim().as_bstr(), "skipping invalid IP address");
                        } else {
                            debug!(line = lineno, "skipping invalid IP address");
                        }
                        continue;
                    }
                };

                let row = self.lookup_row(layout, ip, &mut summary)?;
                table.push(row);
                summary.rows += 1;
            }
            lb_reader.consume_all();
        }

        info!(
            rows = summary.rows,
            skipped = summary.skipped_invalid,
            remote_failures = summary.remote_failures,
            local_failures = summary.local_failures,
            "batch complete"
        );
        Ok(BatchReport { table, summary })
    }

    fn lookup_row(
        &self,
        layout: Layout,
        ip: IpAddr,
        summary: &mut BatchSummary,
    ) -> Result<ResultRow> {
        let mut row = ResultRow::new(layout, ip);

        if let Some(local) = self.local {
            match local.lookup(ip) {
                Ok(Some(record)) => row.fill(layout, Source::Local, &record),
                Ok(None) => {
                    debug!(%ip, "no local database record");
                    summary.local_failures += 1;
                    row.mark_failed(layout, Source::Local);
                }
                Err(err) => {
                    warn!(%ip, error = &err as &dyn std::error::Error, "local lookup failed");
                    summary.local_failures += 1;
                    row.mark_failed(layout, Source::Local);
                }
            }
        }

        match self.remote.lookup(ip)? {
            RemoteOutcome::Found(record) => row.fill(layout, Source::Remote, &record),
            RemoteOutcome::Rejected(rejection) => {
                match &rejection.message {
                    Some(message) => warn!(
                        %ip,
                        status = rejection.status,
                        "problem with Fastah API call: {}",
                        message
                    ),
                    None => warn!(
                        %ip,
                        status = rejection.status,
                        "problem with Fastah API call: unreadable error body"
                    ),
                }
                summary.remote_failures += 1;
                row.mark_failed(layout, Source::Remote);
            }
        }

        Ok(row)
    }
}
