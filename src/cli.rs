use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::{Config, ConfigStore, ResolveOptions};
use crate::prompt::{Prompt, Terminal};
use crate::report::{DEFAULT_LIMIT, format_report};
use crate::shodan::{ShodanClient, ShodanError};
use crate::translate::translate;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout; the model request has its own, shorter bound.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const EXAMPLES: &str = "\
Examples:
  shodan-ai \"cuantos dispositivos cisco hay en argentina\"
  shodan-ai \"camaras ip en chile con puerto 80 abierto\"
  shodan-ai --no-ai servidores apache en españa

Keys are read from SHODAN_API_KEY / OPENAI_API_KEY, then from
~/.shodan_ai_config.json, then asked for (and optionally saved).
Without an OpenAI key a built-in keyword translation is used.
Shodan errors are shown exactly as the API returned them.";

const PATH_GUIDE: &str = r#"
Running shodan-ai from anywhere (optional):

1) Build an optimized binary:
   cargo build --release
   The binary is target/release/shodan-ai (shodan-ai.exe on Windows).

2) Options:

   a) Alias on Linux/macOS (bash/zsh):
      - Add to ~/.bashrc or ~/.zshrc:
          alias shodan-ai='/full/path/to/target/release/shodan-ai'
      - Reload it:
          source ~/.bashrc
        or:
          source ~/.zshrc
      - Then run:
          shodan-ai "camaras ip en chile"

   b) Add to PATH on Linux/macOS:
      - Create a directory for your tools if it does not exist:
          mkdir -p $HOME/bin
      - Copy the binary there:
          cp target/release/shodan-ai $HOME/bin/
      - Add to ~/.bashrc or ~/.zshrc:
          export PATH="$HOME/bin:$PATH"
      - Reload the file as above.

   c) Windows (CMD / PowerShell):
      - Copy the binary to a folder, for example:
          C:\tools\shodan-ai\shodan-ai.exe
      - Add that folder to the system or user PATH:
          Control Panel → System → Advanced system settings →
          Environment Variables → Edit PATH
      - Then run:
          shodan-ai "camaras ip en chile"

This option (--variable) changes nothing on your system; it only explains
how to do it yourself.
"#;

/// Search Shodan with natural-language questions.
#[derive(Parser, Debug)]
#[command(name = "shodan-ai", version, after_help = EXAMPLES)]
pub struct Cli {
    /// Question in natural language (quoted or as separate words)
    #[arg(required_unless_present = "variable", num_args = 1..)]
    pub question: Vec<String>,

    /// Never use OpenAI, even when a key is configured
    #[arg(long)]
    pub no_ai: bool,

    /// Fail instead of asking for missing API keys
    #[arg(long)]
    pub no_prompt: bool,

    /// OpenAI model used for translation (default: $OPENAI_MODEL or gpt-4o-mini)
    #[arg(long)]
    pub model: Option<String>,

    /// Seconds to wait for the OpenAI translation before falling back
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Number of matches to print
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Key file location (default: $SHODAN_AI_CONFIG or ~/.shodan_ai_config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Explain how to run shodan-ai from any directory, then exit
    #[arg(long)]
    pub variable: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn question(&self) -> String {
        self.question.join(" ").trim().to_string()
    }

    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "shodan_ai=warn",
            1 => "shodan_ai=info",
            _ => "shodan_ai=debug",
        }
    }

    /// `RUST_LOG` when set, otherwise the `-v` level. An explicit `-v` still
    /// overrides whatever `RUST_LOG` says about this crate.
    pub fn log_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, ParseError> {
        let from_env = rust_log
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| EnvFilter::try_new(s).ok());
        match from_env {
            Some(filter) if self.verbose == 0 => Ok(filter),
            Some(filter) => Ok(filter.add_directive(self.log_directive().parse()?)),
            None => EnvFilter::try_new(self.log_directive()),
        }
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if cli.variable {
        print!("{PATH_GUIDE}");
        return Ok(ExitCode::SUCCESS);
    }

    let question = cli.question();
    if question.is_empty() {
        return Err("question must not be empty".into());
    }

    let store = match &cli.config {
        Some(path) => ConfigStore::at(path),
        None => ConfigStore::from_env(env_var)?,
    };
    let options = ResolveOptions {
        no_ai: cli.no_ai,
        model: cli.model.clone(),
        timeout: Some(Duration::from_secs(cli.timeout)),
    };
    let interactive = !cli.no_prompt && std::io::stdin().is_terminal();
    let mut terminal = interactive.then(Terminal::stdio);
    let prompt = terminal.as_mut().map(|t| t as &mut dyn Prompt);
    let config = Config::resolve(&options, env_var, &store, prompt)?;

    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;

    info!(question = %question, "processing question");
    let translation = translate(&http, &question, &config.model_credential, &config.model).await;
    info!(query = %translation.result.query, "translated");

    let shodan = ShodanClient::new(http, &config.search_credential)?;
    let outcome = shodan.search(&translation.result.query).await;
    if let Err(ShodanError::Api { code, .. }) = &outcome {
        info!(code, "Shodan rejected the search");
    }

    print!("{}", format_report(&question, &translation, &outcome, cli.limit));

    Ok(if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
