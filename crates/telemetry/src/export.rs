use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use uxlab_core_types::Variant;

use crate::errors::{TelemetryError, TelemetryErrorKind};
use crate::model::Event;

/// Fixed column order of the exported report.
pub const CSV_HEADER: [&str; 11] = [
    "ts",
    "type",
    "session",
    "variant",
    "theme",
    "userAgent",
    "viewport",
    "id",
    "name",
    "code",
    "extra",
];

/// Default report filename embedding the detected variant and the ISO date.
pub fn default_export_name(variant: Variant, now_ms: u64) -> String {
    let date = chrono::DateTime::from_timestamp_millis(now_ms as i64)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown-date".to_string());
    format!("metrics_{}_{}.csv", variant, date)
}

/// Renders the flattened report: one row per event, every field quoted,
/// embedded quotes doubled, the extra payload JSON-stringified verbatim.
pub fn render(events: &[Event]) -> Result<String, TelemetryError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
    for event in events {
        let extra = serde_json::to_string(&event.extra)
            .map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
        let row = [
            event.timestamp.to_string(),
            event.kind.as_str().to_string(),
            event.session.0.clone(),
            event.variant.as_str().to_string(),
            event.theme.as_str().to_string(),
            event.user_agent.clone(),
            event.viewport.clone(),
            event.id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
            event.name.clone().unwrap_or_default(),
            event.code.clone().unwrap_or_default(),
            extra,
        ];
        writer
            .write_record(&row)
            .map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()).into())
}

/// Writes the report through a temp file and rename so a failed export never
/// leaves a truncated file where a good one was expected.
pub fn write_report(path: &Path, events: &[Event]) -> Result<(), TelemetryError> {
    let body = render(events)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| TelemetryErrorKind::ExportUnavailable(err.to_string()))?;
    }
    let tmp = path.with_extension("tmp");
    let write = |p: &Path| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(p)?;
        file.write_all(body.as_bytes())?;
        file.sync_all()
    };
    write(&tmp).map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
    fs::rename(&tmp, path).map_err(|err| TelemetryErrorKind::CsvWriteFailed(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use uxlab_core_types::{SessionId, SpanId, Theme, Variant};

    use crate::model::{extra, EventKind, Extra};

    fn event(kind: EventKind) -> Event {
        Event {
            timestamp: 1_700_000_000_000,
            kind,
            session: SessionId("session-1".into()),
            variant: Variant::Bulma,
            theme: Theme::Dark,
            user_agent: "uxlab-sim/0.1 (bulma)".into(),
            viewport: "1280x720".into(),
            id: None,
            name: None,
            code: None,
            extra: Extra::new(),
            duration_ms: None,
            success: None,
        }
    }

    #[test]
    fn header_plus_one_row_per_event() {
        let mut click = event(EventKind::Click);
        click.name = Some("auto:loginBtn".into());
        let mut err = event(EventKind::Error);
        err.code = Some("html5_invalid".into());
        let out = render(&[click, err]).unwrap();
        assert_eq!(out.lines().count(), 3);
        let header = out.lines().next().unwrap();
        assert!(header.starts_with("\"ts\",\"type\",\"session\""));
    }

    #[test]
    fn every_field_is_quoted() {
        let out = render(&[event(EventKind::Mark)]).unwrap();
        for line in out.lines() {
            assert!(line.starts_with('"') && line.ends_with('"'));
            assert_eq!(line.split("\",\"").count(), 11, "line: {line}");
        }
    }

    #[test]
    fn comma_and_quote_payloads_survive_a_csv_reader() {
        let mut ev = event(EventKind::Click);
        ev.id = Some(SpanId("span-1".into()));
        ev.name = Some("tricky".into());
        ev.extra = extra([("note", json!("hello, \"world\""))]);
        let out = render(&[ev]).unwrap();

        let mut reader = csv::Reader::from_reader(out.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        let extra_field = rows[0].get(10).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(extra_field).unwrap();
        assert_eq!(parsed["note"], json!("hello, \"world\""));
    }

    #[test]
    fn default_name_embeds_variant_and_date() {
        let name = default_export_name(Variant::Bootstrap, 1_700_000_000_000);
        assert!(name.starts_with("metrics_bootstrap_2023-11-"));
        assert!(name.ends_with(".csv"));
    }

    #[test]
    fn report_lands_on_disk_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports/report.csv");
        write_report(&path, &[event(EventKind::Mark)]).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(!path.with_extension("tmp").exists());
    }
}
