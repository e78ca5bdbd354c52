use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use uxplot::api::http::SignaloidClient;
use uxplot::banner::{RunInfo, print_header, print_outcome};
use uxplot::config::{Backoff, ClientConfig, PollPolicy};
use uxplot::consts::{
    BASE_URL_ENV_VAR, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MAX_POLL_INTERVAL_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SAMPLE_COUNT, DEFAULT_STDOUT_RETRIES, TOKEN_ENV_VAR,
    format_number,
};
use uxplot::events::{Event, EventBus};
use uxplot::extract;
use uxplot::orchestrator::{Orchestrator, Strategy};
use uxplot::spinner::Spinner;
use uxplot::task::{AnalysisRequest, Language, TraceVariable};

#[derive(Parser)]
#[command(
    name = "uxplot",
    version,
    about = "Run a C/C++ program on Signaloid and plot the distribution it prints last."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// API token (defaults to $SIGNALOID_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Service base URL (defaults to $SIGNALOID_BASE_URL, then the public API)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a source file, wait for it, and print the plot URL
    Run(RunArgs),
    /// Print the current status of a task
    Status {
        /// Task identifier returned at submission
        task_id: String,
    },
    /// Extract Ux values (or ValueID tags) from a saved stdout file
    Extract {
        /// File holding a task's stdout
        file: PathBuf,

        /// Print every match instead of only the last
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Look for <ValueID> tags instead of Ux values
        #[arg(long, default_value_t = false)]
        value_ids: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// C or C++ source file
    source: PathBuf,

    /// Source language (inferred from the file extension when omitted)
    #[arg(short, long, value_enum)]
    language: Option<LanguageArg>,

    /// Command-line arguments passed to the program
    #[arg(short, long, default_value = "", allow_hyphen_values = true)]
    args: String,

    /// Execution core override
    #[arg(long)]
    core: Option<String>,

    /// Trace an expression, as FILE:LINE:EXPRESSION (repeatable)
    #[arg(long = "trace")]
    traces: Vec<TraceVariable>,

    /// What to do with the finished task's output
    #[arg(short, long, value_enum, default_value_t = StrategyArg::Plot)]
    strategy: StrategyArg,

    /// Samples to request with --strategy samples
    #[arg(long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    samples: usize,

    /// Delay between status checks, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Status checks before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_POLL_ATTEMPTS)]
    max_polls: u32,

    /// How the delay between status checks evolves
    #[arg(long, value_enum, default_value_t = BackoffArg::Fixed)]
    backoff: BackoffArg,

    /// Upper bound on the delay with --backoff exponential, in milliseconds
    #[arg(long, default_value_t = DEFAULT_MAX_POLL_INTERVAL_MS)]
    max_interval_ms: u64,

    /// Extra fetches of an empty stdout before giving up
    #[arg(long, default_value_t = DEFAULT_STDOUT_RETRIES)]
    stdout_retries: u32,

    /// Skip the run header and the spinner
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LanguageArg {
    C,
    #[value(name = "cpp", alias = "c++")]
    Cpp,
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::C => Language::C,
            LanguageArg::Cpp => Language::Cpp,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Plot,
    Samples,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackoffArg {
    Fixed,
    Exponential,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => run(cli.token, cli.base_url, args).await,
        Command::Status { task_id } => {
            let config = load_config(cli.token, cli.base_url)?;
            let api = Arc::new(SignaloidClient::new(&config)?);
            let status = Orchestrator::new(api, config.poll)
                .task_status(&task_id)
                .await?;
            println!("{status}");
            Ok(())
        }
        Command::Extract {
            file,
            all,
            value_ids,
        } => extract_file(&file, all, value_ids),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "uxplot=warn",
        1 => "uxplot=info",
        _ => "uxplot=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Flags win over the environment, the environment over defaults.
fn load_config(token: Option<String>, base_url: Option<String>) -> Result<ClientConfig> {
    let config = ClientConfig::from_lookup(|key| match key {
        TOKEN_ENV_VAR => token.clone().or_else(|| std::env::var(key).ok()),
        BASE_URL_ENV_VAR => base_url.clone().or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?;
    Ok(config)
}

async fn run(token: Option<String>, base_url: Option<String>, args: RunArgs) -> Result<()> {
    let code = std::fs::read_to_string(&args.source)
        .with_context(|| format!("failed to read {}", args.source.display()))?;
    let language = match args.language {
        Some(language) => language.into(),
        None => Language::from_path(&args.source).with_context(|| {
            format!(
                "cannot tell the language of {}; pass --language",
                args.source.display()
            )
        })?,
    };

    let mut request = AnalysisRequest::new(language, code).with_arguments(args.args);
    if let Some(core) = args.core {
        request = request.with_core(core);
    }
    for trace in args.traces {
        request = request.with_trace_variable(trace);
    }

    let strategy = match args.strategy {
        StrategyArg::Plot => Strategy::Plot,
        StrategyArg::Samples => Strategy::Samples {
            count: args.samples,
        },
    };
    let poll = PollPolicy {
        interval: Duration::from_millis(args.poll_interval_ms),
        max_attempts: args.max_polls,
        backoff: match args.backoff {
            BackoffArg::Fixed => Backoff::Fixed,
            BackoffArg::Exponential => Backoff::Exponential {
                factor: 2,
                max_interval: Duration::from_millis(args.max_interval_ms),
            },
        },
        stdout_retries: args.stdout_retries,
    };
    let config = load_config(token, base_url)?.with_poll(poll);
    config.validate()?;

    if !args.quiet {
        print_header(&RunInfo {
            source: &args.source,
            language,
            base_url: &config.base_url,
            strategy,
            poll: &config.poll,
        });
    }

    let api = Arc::new(SignaloidClient::new(&config)?);
    let events = Arc::new(EventBus::default());
    let orchestrator = Orchestrator::new(api, config.poll).with_events(Arc::clone(&events));

    let mut rx = events.subscribe();
    let spinner = (!args.quiet).then(|| Spinner::start("submitting task"));

    // Ctrl+C abandons the run; the remote task keeps going.
    let run = orchestrator.run(&request, strategy);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(run, ctrl_c);
    let result = loop {
        tokio::select! {
            result = &mut run => break Some(result),
            event = rx.recv() => {
                if let (Ok(event), Some(spinner)) = (event, &spinner) {
                    spinner.set_label(describe(&event));
                }
            }
            _ = &mut ctrl_c => break None,
        }
    };

    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    match result {
        Some(Ok(outcome)) => {
            print_outcome(&outcome);
            Ok(())
        }
        Some(Err(e)) => Err(e.into()),
        None => bail!("interrupted"),
    }
}

fn describe(event: &Event) -> String {
    let detail = match event {
        Event::Submitted { status, .. } => status.to_string(),
        Event::StatusChecked {
            status, attempt, ..
        } => format!("{status} (check {attempt})"),
        Event::StdoutFetched { bytes, .. } => {
            format!("read {} bytes of output", format_number(*bytes as u64))
        }
        Event::ValueSelected { value, .. } => format!("requesting {value}"),
        Event::Finished { .. } => "done".to_string(),
    };
    format!("task {}: {detail}", event.task_id())
}

fn extract_file(path: &Path, all: bool, value_ids: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if value_ids {
        if all {
            let ids = extract::extract_value_ids(&text);
            if ids.is_empty() {
                bail!("no ValueID tags in {}", path.display());
            }
            for id in ids {
                println!("{id}");
            }
        } else {
            println!("{}", extract::last_value_id(&text)?);
        }
        return Ok(());
    }

    if all {
        let values = extract::extract_ux_values(&text);
        if values.is_empty() {
            bail!("no Ux values in {}", path.display());
        }
        for value in values {
            println!("{}\t{}", value.value, value.ux_string);
        }
    } else {
        let value = extract::last_ux_value(&text)?;
        println!("{}\t{}", value.value, value.ux_string);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uxplot::consts::DEFAULT_POLL_INTERVAL;
    use uxplot::task::TaskStatus;

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["uxplot", "run", "model.c"].into_iter().chain(extra.iter().copied());
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
            _ => panic!("expected the run subcommand"),
        }
    }

    #[test]
    fn run_defaults_follow_library_constants() {
        let args = run_args(&[]);
        assert_eq!(
            args.poll_interval_ms,
            DEFAULT_POLL_INTERVAL.as_millis() as u64
        );
        assert_eq!(args.max_interval_ms, DEFAULT_MAX_POLL_INTERVAL_MS);
        assert_eq!(args.max_polls, DEFAULT_MAX_POLL_ATTEMPTS);
        assert_eq!(args.stdout_retries, DEFAULT_STDOUT_RETRIES);
    }

    #[test]
    fn poll_interval_flag_overrides_default() {
        let args = run_args(&["--poll-interval-ms", "250"]);
        assert_eq!(args.poll_interval_ms, 250);
    }

    #[test]
    fn spinner_label_names_the_task() {
        let label = describe(&Event::StatusChecked {
            task_id: "t-3".to_string(),
            status: TaskStatus::Running,
            attempt: 2,
        });
        assert_eq!(label, "task t-3: Running (check 2)");

        let label = describe(&Event::StdoutFetched {
            task_id: "t-3".to_string(),
            bytes: 12_345,
        });
        assert_eq!(label, "task t-3: read 12,345 bytes of output");
    }
}
