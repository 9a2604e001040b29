//! Log sink setup

use serde_json::{Map, Value};
use std::fmt;
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event: `time`, `level`, `msg` and the event fields
    Json,
    /// Human readable, for local runs
    Text,
}

/// Installs the global subscriber writing to stdout.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout);
    let res = match format {
        LogFormat::Json => builder.event_format(JsonRecord).try_init(),
        LogFormat::Text => builder.try_init(),
    };
    res.map_err(anyhow::Error::msg)
}

/// Formats each event as a single-line JSON object.
/// Span context is not included.
pub struct JsonRecord;

impl<S, N> FormatEvent<S, N> for JsonRecord
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = FieldVisitor::default();
        event.record(&mut fields);

        let mut record = fields.values;
        record.insert(
            "time".to_string(),
            Value::String(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            ),
        );
        record.insert(
            "level".to_string(),
            Value::String(event.metadata().level().to_string()),
        );
        record.insert(
            "msg".to_string(),
            Value::String(fields.message.unwrap_or_default()),
        );
        writeln!(writer, "{}", Value::Object(record))
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    values: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.values.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.insert(field, Value::String(value));
        }
    }
}

#[cfg(test)]
pub(crate) mod capture {
    //! JSON records written to memory instead of stdout

    use super::JsonRecord;
    use serde_json::Value;
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use tracing::subscriber::DefaultGuard;

    #[derive(Clone, Default)]
    pub(crate) struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        pub(crate) fn records(&self) -> Vec<Value> {
            let raw = self.0.lock().unwrap().clone();
            String::from_utf8(raw)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    /// Routes this thread's events into the returned buffer
    /// until the guard is dropped.
    pub(crate) fn json_records() -> (DefaultGuard, Buffer) {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .event_format(JsonRecord)
            .finish();
        (tracing::subscriber::set_default(subscriber), buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn record_has_time_level_msg_and_fields() {
        let (guard, buffer) = capture::json_records();
        tracing::info!(stale = false, loaded = true, "retrieved metrics");
        tracing::error!(error = %"connection refused", "cycle failed");
        drop(guard);

        let records = buffer.records();
        assert_eq!(records.len(), 2);

        let info = records[0].as_object().unwrap();
        let mut keys = info.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort_unstable();
        assert_eq!(keys, ["level", "loaded", "msg", "stale", "time"]);
        assert_eq!(info["level"], "INFO");
        assert_eq!(info["msg"], "retrieved metrics");
        assert_eq!(info["loaded"], true);
        assert_eq!(info["stale"], false);
        assert!(chrono::DateTime::parse_from_rfc3339(info["time"].as_str().unwrap()).is_ok());

        assert_eq!(records[1]["level"], "ERROR");
        assert_eq!(records[1]["error"], "connection refused");
    }
}
