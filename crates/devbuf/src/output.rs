use std::io::{IsTerminal, Write};

use bytes::Bytes;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use devbuf_registry::SlotStat;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatOutput {
    pub allocated: bool,
    pub capacity: usize,
    pub read_cursor: usize,
    pub write_cursor: usize,
    pub available: usize,
    pub remaining: usize,
}

impl From<SlotStat> for StatOutput {
    fn from(stat: SlotStat) -> Self {
        Self {
            allocated: stat.allocated,
            capacity: stat.capacity,
            read_cursor: stat.read_cursor,
            write_cursor: stat.write_cursor,
            available: stat.available,
            remaining: stat.remaining,
        }
    }
}

/// Outcome of one script step.
#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub schema_id: &'static str,
    pub line: usize,
    pub op: &'static str,
    pub minor: u32,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<StatOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub raw: Option<Bytes>,
}

pub const STEP_SCHEMA_ID: &str = "https://schemas.3leaps.dev/devbuf/cli/v1/step-result.schema.json";

impl StepRecord {
    pub fn new(line: usize, op: &'static str, minor: u32) -> Self {
        Self {
            schema_id: STEP_SCHEMA_ID,
            line,
            op,
            minor,
            ok: true,
            count: None,
            data: None,
            data_hex: None,
            command: None,
            stat: None,
            error_code: None,
            error: None,
            raw: None,
        }
    }

    pub fn with_data(mut self, data: Bytes) -> Self {
        self.count = Some(data.len());
        self.data = Some(payload_preview(data.as_ref()));
        self.data_hex = Some(hex::encode(data.as_ref()));
        self.raw = Some(data);
        self
    }

    fn detail(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{} {}", self.error_code.unwrap_or("ERROR"), error);
        }
        if let Some(stat) = &self.stat {
            return format!(
                "allocated={} read={} write={} available={} remaining={}",
                stat.allocated, stat.read_cursor, stat.write_cursor, stat.available, stat.remaining
            );
        }
        if let Some(data) = &self.data {
            return format!("{data:?}");
        }
        if let Some(command) = self.command {
            return command.to_string();
        }
        String::new()
    }
}

pub fn print_step(record: &StepRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Pretty => {
            let status = if record.ok { "ok" } else { "err" };
            let count = record
                .count
                .map(|c| format!(" count={c}"))
                .unwrap_or_default();
            println!(
                "line={} {} minor={} {}{} {}",
                record.line,
                record.op,
                record.minor,
                status,
                count,
                record.detail()
            );
        }
        OutputFormat::Raw => {
            if let Some(raw) = &record.raw {
                print_raw(raw.as_ref());
            }
        }
        // Collected and printed once by `print_step_table`.
        OutputFormat::Table => {}
    }
}

pub fn print_step_table(records: &[StepRecord]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["LINE", "OP", "MINOR", "STATUS", "COUNT", "DETAIL"]);
    for record in records {
        table.add_row(vec![
            record.line.to_string(),
            record.op.to_string(),
            record.minor.to_string(),
            if record.ok { "ok" } else { "err" }.to_string(),
            record.count.map(|c| c.to_string()).unwrap_or_default(),
            record.detail(),
        ]);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_record_serializes_data() {
        let record = StepRecord::new(2, "read", 3).with_data(Bytes::from_static(b"HELLO"));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["count"], 5);
        assert_eq!(json["data"], "HELLO");
        assert_eq!(json["data_hex"], "48454c4c4f");
        assert!(json.get("error").is_none());
        assert!(json.get("raw").is_none());
    }

    #[test]
    fn binary_payload_is_previewed() {
        let record = StepRecord::new(1, "read", 0).with_data(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(record.data.as_deref(), Some("<binary 2 bytes>"));
        assert_eq!(record.data_hex.as_deref(), Some("fffe"));
    }

    #[test]
    fn error_detail_leads_with_code() {
        let mut record = StepRecord::new(4, "write", 1);
        record.ok = false;
        record.error_code = Some("OUT_OF_SPACE");
        record.error = Some("no space".to_string());
        assert_eq!(record.detail(), "OUT_OF_SPACE no space");
    }
}
