//! Read-only text dumps of provider state, shared by the HTTP API and the command line.

use crate::context::Context;
use crate::dispatch::{Dispatcher, ProviderRecords};
use crate::error::Error;
use crate::provider::{ProviderError, ZoneSource};
use std::fmt::Write;

/// A rendered dump and the provider errors met while producing it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub out: String,
    pub errors: Vec<String>,
}

impl Report {
    fn note(&mut self, provider: &str, what: &str, err: &ProviderError) {
        if err.is_cancelled() {
            tracing::debug!("{provider}: {what} cancelled");
            return;
        }
        tracing::error!("{provider}: error {what}: {err}");
        self.errors.push(format!("{provider}: error {what}: {err}"));
    }

    /// The dump followed by its errors, one per line.
    #[must_use]
    pub fn into_body(self) -> String {
        let mut body = self.out;
        for err in self.errors {
            body.push_str(&err);
            body.push('\n');
        }
        body
    }
}

/// Providers and their zones, as a tree per provider sorted by name.
///
/// ```text
/// • primary
/// ├─ example.com
/// └─ example.org
/// ```
///
/// # Errors
///
/// Returns [`Error::ThrottleClosed`] if the listing couldn't be fanned out.
pub async fn zones(dispatcher: &Dispatcher, ctx: &Context, names: &[String]) -> Result<Report, Error> {
    let mut selected = dispatcher.select(names);
    let listing = dispatcher.list_zones_of(ctx, &selected).await?;

    let mut report = Report::default();
    for (provider, err) in listing.failures() {
        report.note(provider, "listing zones", err);
    }

    let providers = dispatcher.providers();
    selected.sort_by(|a, b| providers[*a].name().cmp(providers[*b].name()));
    for idx in selected {
        let Some(zones) = listing.zones_of(idx) else {
            continue;
        };
        let _ = writeln!(report.out, "• {}", providers[idx].name());
        for (pos, zone) in zones.iter().enumerate() {
            let prefix = if pos + 1 == zones.len() { "└─ " } else { "├─ " };
            let _ = writeln!(report.out, "{prefix}{zone}");
        }
    }
    Ok(report)
}

/// Every record of every selected provider, one box-drawn table per provider sorted by name.
///
/// # Errors
///
/// Returns [`Error::ThrottleClosed`] if the fetch couldn't be fanned out.
pub async fn records(dispatcher: &Dispatcher, ctx: &Context, names: &[String]) -> Result<Report, Error> {
    let selected = dispatcher.select(names);
    let mut report = Report::default();
    let mut tables = Vec::new();
    for (provider, res) in dispatcher.fetch_records(ctx, &selected).await? {
        match res {
            Ok(records) if records.zones.iter().any(|(_, items)| !items.is_empty()) => {
                tables.push(records);
            }
            Ok(_) => {}
            Err(err) => report.note(&provider, "fetching records", &err),
        }
    }
    tables.sort_by(|a, b| a.provider.cmp(&b.provider));
    report.out = RecordTable::new(&mut tables).render();
    Ok(report)
}

/// Data of every `rtype` record named `hostname`, one per line, in provider order.
///
/// # Errors
///
/// Returns [`Error::ThrottleClosed`] if the lookup couldn't be fanned out.
pub async fn lookup(
    dispatcher: &Dispatcher,
    ctx: &Context,
    rtype: &str,
    hostname: &str,
) -> Result<Report, Error> {
    let mut report = Report::default();
    for (provider, res) in dispatcher.lookup(ctx, rtype, hostname).await? {
        match res {
            Ok(records) => {
                for record in records {
                    report.out.push_str(&record.data);
                    report.out.push('\n');
                }
            }
            Err(err) => report.note(&provider, "looking up records", &err),
        }
    }
    Ok(report)
}

/// Identity, plugin and zone source of each selected provider.
#[must_use]
pub fn inspect(dispatcher: &Dispatcher, names: &[String]) -> String {
    let mut out = String::new();
    for idx in dispatcher.select(names) {
        let provider = &dispatcher.providers()[idx];
        let zones = match provider.zone_source() {
            ZoneSource::Dynamic => "dynamic".to_string(),
            ZoneSource::Static(zones) => format!("static ({})", zones.join(", ")),
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "  Provider  {}", provider.name());
        let _ = writeln!(out, "  Plugin    {}", provider.plugin());
        let _ = writeln!(out, "  Zones     {zones}");
    }
    out.push('\n');
    out
}

const HEADERS: [&str; 4] = ["Name", "Type", "TTL", "Data"];

struct RecordTable<'a> {
    // (provider, rows)
    sections: Vec<(&'a str, Vec<[String; 4]>)>,
    widths: [usize; 4],
}

impl<'a> RecordTable<'a> {
    fn new(tables: &'a mut [ProviderRecords]) -> Self {
        let mut widths = HEADERS.map(|h| h.chars().count());
        let mut title = 0;
        let mut sections = Vec::with_capacity(tables.len());
        for table in tables.iter_mut() {
            table.zones.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
            title = title.max(table.provider.chars().count());
            let mut rows = Vec::new();
            for (zone, items) in &table.zones {
                title = title.max(zone.name.chars().count() + 3);
                for record in items {
                    let row = [
                        record.fqdn(&zone.name),
                        record.rtype.to_string(),
                        format!("{}s", record.ttl.as_secs()),
                        record.data.clone(),
                    ];
                    for (width, cell) in widths.iter_mut().zip(&row) {
                        *width = (*width).max(cell.chars().count());
                    }
                    rows.push(row);
                }
            }
            sections.push((table.provider.as_str(), rows));
        }
        let total: usize = widths.iter().sum();
        if total < title {
            widths[0] += title - total;
        }
        RecordTable { sections, widths }
    }

    fn bar(&self, out: &mut String, left: &str, divider: &str, right: &str) {
        out.push_str(left);
        for (pos, width) in self.widths.iter().enumerate() {
            if pos > 0 {
                out.push_str(divider);
            }
            out.push_str(&"─".repeat(width + 2));
        }
        out.push_str(right);
        out.push('\n');
    }

    fn row(&self, out: &mut String, cells: [&str; 4]) {
        out.push('│');
        for (cell, width) in cells.iter().zip(self.widths) {
            let _ = write!(out, " {cell:<width$} │");
        }
        out.push('\n');
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let inner = self.widths.iter().sum::<usize>() + 10;
        for (provider, rows) in &self.sections {
            self.bar(&mut out, "┌", "─", "┐");
            let _ = writeln!(out, "│ {provider:<inner$}│");
            self.bar(&mut out, "├", "┬", "┤");
            self.row(&mut out, HEADERS);
            self.bar(&mut out, "├", "┼", "┤");
            for row in rows {
                self.row(&mut out, [row[0].as_str(), row[1].as_str(), row[2].as_str(), row[3].as_str()]);
            }
            self.bar(&mut out, "└", "┴", "┘");
        }
        out
    }
}
