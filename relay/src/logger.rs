use std::fmt::Write;

use jiff::{Zoned, tz::TimeZone};
use log::{Level, Record};
use logforth::{
    append::Stdout,
    layout::{JsonLayout, Layout},
};

use crate::args::{Args, LogStyle};

/// `<utc timestamp> <level>  <module>: <message>`, optionally with ANSI colored levels.
#[derive(Debug, Clone, Copy)]
struct TextLayout {
    colored: bool,
}

fn ansi_color(level: Level) -> &'static str {
    match level {
        Level::Error => "31",
        Level::Warn => "33",
        Level::Info => "32",
        Level::Debug => "34",
        Level::Trace => "35",
    }
}

impl Layout for TextLayout {
    fn format(
        &self,
        record: &Record<'_>,
        _diagnostics: &[Box<dyn logforth::diagnostic::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let mut output = String::new();
        let now = Zoned::now().with_time_zone(TimeZone::UTC);

        write!(output, "{} ", now.strftime("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = record.level();

        if self.colored {
            write!(output, "\x1b[{}m{level:>5}\x1b[0m  ", ansi_color(level))?;
        } else {
            write!(output, "{level:>5}  ")?;
        }

        if let Some(module) = record.module_path() {
            write!(output, "{module}: ")?;
        }

        write!(output, "{}", record.args())?;

        Ok(output.into_bytes())
    }
}

pub(super) fn init(args: &Args) {
    logforth::builder()
        .dispatch(|d| {
            let d = d.filter(args.log_level.env_filter());

            match args.log_style {
                LogStyle::Color => d.append(Stdout::default().with_layout(TextLayout { colored: true })),
                LogStyle::Text => d.append(Stdout::default().with_layout(TextLayout { colored: false })),
                LogStyle::Json => d.append(Stdout::default().with_layout(JsonLayout::default())),
            }
        })
        .apply();
}
