//! Human-readable console sink.
//!
//! Colour goes through `termcolor`, so a piped or redirected stderr gets plain
//! text.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::level::Level;
use crate::record::Record;
use crate::sink::Sink;

const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Formatting switches for [`ConsoleSink`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    pub no_color: bool,
    /// strftime format; `None` uses `%H:%M:%S%.3f`.
    pub time_format: Option<String>,
}

impl ConsoleOptions {
    /// Colour only when allowed and stderr is a terminal.
    pub fn color_choice(&self) -> ColorChoice {
        if self.no_color || !io::stderr().is_terminal() {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        }
    }
}

/// Writes `TIME LVL caller > message key=value ...` lines.
pub struct ConsoleSink {
    out: Mutex<Box<dyn WriteColor + Send>>,
    options: ConsoleOptions,
}

impl ConsoleSink {
    /// Console sink on stderr.
    pub fn new(options: ConsoleOptions) -> Self {
        let stream = StandardStream::stderr(options.color_choice());
        Self::with_writer(stream, options)
    }

    /// Console sink on an arbitrary colour-aware writer.
    pub fn with_writer(out: impl WriteColor + Send + 'static, options: ConsoleOptions) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
            options,
        }
    }

    /// Render a record as one plain console line (with trailing newline).
    pub fn format(&self, record: &Record) -> String {
        let mut buf = Buffer::no_color();
        // Writes into an in-memory buffer do not fail.
        let _ = self.render(&mut buf, record);
        String::from_utf8_lossy(buf.as_slice()).into_owned()
    }

    /// Write one line to `out`, coloured as far as `out` supports it.
    pub fn render<W: WriteColor + ?Sized>(&self, out: &mut W, record: &Record) -> io::Result<()> {
        if let Some(time) = record.time() {
            let fmt = self
                .options
                .time_format
                .as_deref()
                .unwrap_or(DEFAULT_TIME_FORMAT);
            let mut stamp = String::new();
            // chrono reports bad format strings as fmt errors
            if write!(stamp, "{}", time.format(fmt)).is_err() {
                stamp = time.to_rfc3339();
            }
            out.set_color(ColorSpec::new().set_dimmed(true))?;
            write!(out, "{stamp}")?;
            out.reset()?;
            write!(out, " ")?;
        }

        out.set_color(&level_spec(record.level()))?;
        write!(out, "{}", record.level().short())?;
        out.reset()?;
        write!(out, " ")?;

        if let Some(caller) = record.caller() {
            out.set_color(ColorSpec::new().set_bold(true))?;
            write!(out, "{caller}")?;
            out.reset()?;
            write!(out, " > ")?;
        }

        write!(out, "{}", record.message())?;

        for (key, value) in record.fields() {
            write!(out, " ")?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            write!(out, "{key}=")?;
            out.reset()?;
            match value {
                Value::String(s) => write!(out, "{s}")?,
                other => write!(out, "{other}")?,
            }
        }

        writeln!(out)
    }
}

impl Sink for ConsoleSink {
    fn write(&self, record: &Record) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        self.render(&mut **out, record)
    }

    fn flush(&self) -> io::Result<()> {
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

fn level_spec(level: Level) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        Level::Trace => spec.set_fg(Some(Color::Magenta)),
        Level::Debug => spec.set_fg(Some(Color::Yellow)),
        Level::Info => spec.set_fg(Some(Color::Green)),
        Level::Warn => spec.set_fg(Some(Color::Red)),
        Level::Error | Level::Fatal | Level::Panic => {
            spec.set_fg(Some(Color::Red)).set_bold(true)
        }
    };
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_plain_format() {
        let sink = ConsoleSink::with_writer(
            Buffer::no_color(),
            ConsoleOptions {
                no_color: true,
                time_format: Some("%Y".into()),
            },
        );
        let mut record = Record::new(Level::Info);
        record.set_time(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        record.set_message("hello world");
        record.push("user", "ada");
        record.push("count", 3);

        assert_eq!(sink.format(&record), "2024 INF hello world user=ada count=3\n");
    }

    #[test]
    fn test_color_and_caller() {
        let sink = ConsoleSink::with_writer(Buffer::no_color(), ConsoleOptions::default());
        let mut record = Record::new(Level::Error);
        record.set_caller("src/lib.rs:1");
        record.set_message("boom");

        let mut colored = Buffer::ansi();
        sink.render(&mut colored, &record).unwrap();
        let line = String::from_utf8(colored.into_inner()).unwrap();
        assert!(line.contains("\x1b["));
        assert!(line.contains("src/lib.rs:1"));
        assert!(line.ends_with("boom\n"));

        assert_eq!(sink.format(&record), "ERR src/lib.rs:1 > boom\n");
    }

    #[test]
    fn test_no_color_never_colors() {
        let options = ConsoleOptions {
            no_color: true,
            time_format: None,
        };
        assert_eq!(options.color_choice(), ColorChoice::Never);

        let mut record = Record::new(Level::Warn);
        record.set_message("plain");
        record.push("k", "v");

        let sink = ConsoleSink::with_writer(Buffer::no_color(), options);
        let mut out = Buffer::no_color();
        sink.render(&mut out, &record).unwrap();
        let line = String::from_utf8(out.into_inner()).unwrap();
        assert!(!line.contains('\x1b'));
        assert_eq!(line, "WRN plain k=v\n");
    }

    #[test]
    fn test_bad_time_format_falls_back() {
        let sink = ConsoleSink::with_writer(
            Buffer::no_color(),
            ConsoleOptions {
                no_color: true,
                time_format: Some("%Q".into()),
            },
        );
        let mut record = Record::new(Level::Info);
        record.set_time(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
        assert!(sink.format(&record).starts_with("2024-05-01T12:00:00"));
    }
}
