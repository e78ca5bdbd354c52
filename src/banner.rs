//! Run header and result summary printed by the CLI.

use std::path::Path;

use crate::config::{Backoff, PollPolicy};
use crate::consts::format_number;
use crate::orchestrator::{Outcome, Strategy};
use crate::task::Language;

/// What is about to be run, for display before submission.
pub struct RunInfo<'a> {
    pub source: &'a Path,
    pub language: Language,
    pub base_url: &'a str,
    pub strategy: Strategy,
    pub poll: &'a PollPolicy,
}

pub fn render_header(info: &RunInfo) -> String {
    let strategy = match info.strategy {
        Strategy::Plot => "plot final Ux value".to_string(),
        Strategy::Samples { count } => format!("sample last ValueID ({count} samples)"),
    };
    let backoff = match info.poll.backoff {
        Backoff::Fixed => "fixed".to_string(),
        Backoff::Exponential {
            factor,
            max_interval,
        } => format!("x{factor} up to {}ms", max_interval.as_millis()),
    };
    format!(
        "uxplot {}\n  source    {} ({})\n  service   {}\n  strategy  {}\n  polling   every {}ms, {}, at most {} checks\n",
        env!("CARGO_PKG_VERSION"),
        info.source.display(),
        info.language,
        info.base_url,
        strategy,
        format_number(info.poll.interval.as_millis() as u64),
        backoff,
        info.poll.max_attempts,
    )
}

pub fn print_header(info: &RunInfo) {
    eprintln!("{}", render_header(info));
}

/// Result lines. The plot URL or the samples go to stdout so they can be piped.
pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Plot(plot) => println!("{}", plot.url),
        Outcome::Samples(samples) => {
            eprintln!(
                "value {}: {} samples",
                samples.value_id,
                samples.samples.len()
            );
            for sample in &samples.samples {
                println!("{sample}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn header_lists_run_settings() {
        let poll = PollPolicy {
            interval: Duration::from_millis(5000),
            max_attempts: 12,
            ..PollPolicy::default()
        };
        let source = PathBuf::from("model.c");
        let header = render_header(&RunInfo {
            source: &source,
            language: Language::C,
            base_url: "https://api.signaloid.io",
            strategy: Strategy::Plot,
            poll: &poll,
        });
        assert!(header.contains("model.c (C)"));
        assert!(header.contains("every 5,000ms, fixed, at most 12 checks"));
        assert!(header.contains("plot final Ux value"));
    }

    #[test]
    fn header_describes_exponential_sampling_run() {
        let poll = PollPolicy {
            interval: Duration::from_millis(500),
            backoff: Backoff::Exponential {
                factor: 2,
                max_interval: Duration::from_secs(8),
            },
            ..PollPolicy::default()
        };
        let source = PathBuf::from("m.cpp");
        let header = render_header(&RunInfo {
            source: &source,
            language: Language::Cpp,
            base_url: "http://localhost",
            strategy: Strategy::Samples { count: 10 },
            poll: &poll,
        });
        assert!(header.contains("(C++)"));
        assert!(header.contains("x2 up to 8000ms"));
        assert!(header.contains("10 samples"));
    }
}
