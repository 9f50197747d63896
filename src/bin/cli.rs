//! fxcal CLI
//!
//! Local driver for the selection flow, calendar fetches and the analysis job.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fxcal::{
    collaborators::{
        AnalysisOutput, AnalysisRunner, CommandAnalysisRunner, FileActivityLog,
        GoogleTranslator, record_activity, translate_result,
    },
    conversation::{self, MenuPrompt, Selection, Step},
    error::{AppError, Result},
    models::{
        Config, Currency, DEFAULT_EVENT_TEMPLATE, FilterCriteria, ImpactLevel, PeriodKey,
    },
    services::CalendarFetcher,
};
use serde_json::json;

/// fxcal - Economic Calendar Fetcher
#[derive(Parser, Debug)]
#[command(
    name = "fxcal",
    version,
    about = "Filtered economic-calendar events through a stateless selection flow"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Conversation id for the activity log (e.g. "<chat id>_<username>")
    #[arg(long)]
    conversation: Option<String>,

    /// Translate the week label and event names (locale defaults to collaborators.translate_locale)
    #[arg(long, value_name = "LOCALE")]
    translate: Option<Option<String>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a menu, or advance the conversation by one choice
    Menu {
        /// Token of the current stage (omit to start over)
        #[arg(long)]
        token: Option<String>,

        /// Option label or key to pick at the current stage
        #[arg(long)]
        choice: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fetch events for an explicit selection
    Fetch {
        #[arg(long)]
        currency: Currency,

        /// high | medium
        #[arg(long)]
        impact: ImpactLevel,

        /// today, tomorrow, thisweek, nextweek, thismonth, nextmonth,
        /// yesterday, lastweek, lastmonth
        #[arg(long)]
        period: PeriodKey,

        #[arg(long)]
        json: bool,
    },

    /// Resume from a token; a complete token triggers a fetch
    Resume {
        token: String,

        #[arg(long)]
        json: bool,
    },

    /// Run the technical-analysis job
    Analysis,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Per-invocation state shared by the subcommands.
struct Context<'a> {
    config: Arc<Config>,
    activity: FileActivityLog,
    conversation_id: Option<&'a str>,
    translate: Option<&'a str>,
}

impl Context<'_> {
    /// Append to the activity log when a conversation id was given.
    async fn log(&self, action: &str, details: serde_json::Value) {
        if let Some(id) = self.conversation_id {
            record_activity(&self.activity, id, action, details).await;
        }
    }

    async fn step(&self, step: Step, json: bool) -> Result<()> {
        match step {
            Step::Prompt(prompt) => print_prompt(&prompt, json),
            Step::Complete(selection) => self.fetch(&selection, json).await,
        }
    }

    async fn fetch(&self, selection: &Selection, json: bool) -> Result<()> {
        self.config.validate()?;
        self.log("Fetch", selection_details(selection, None)).await;

        let fetched = match CalendarFetcher::with_chromium(Arc::clone(&self.config)) {
            Ok(fetcher) => fetcher.fetch_selection(selection).await,
            Err(e) => Err(e),
        };
        let mut result = match fetched {
            Ok(result) => result,
            Err(e) => {
                if e.is_retryable() {
                    log::error!("Fetch failed, a later retry may succeed: {}", e);
                }
                self.log("Fetch failed", selection_details(selection, Some(&e)))
                    .await;
                return Err(e);
            }
        };

        if let Some(locale) = self.translate {
            let translator = GoogleTranslator::new(&self.config.collaborators)?;
            translate_result(&translator, &mut result, locale).await;
        }

        self.log(
            "Fetched events",
            json!({ "weekLabel": result.week_label, "count": result.count }),
        )
        .await;

        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!(
                "{}",
                result.to_message(&selection.criteria, DEFAULT_EVENT_TEMPLATE)
            );
        }
        Ok(())
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = cli.config.exists();
    let mut config = if config_found {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    config.apply_env();
    init_logging(cli.verbose, &config.logging.level);

    if !config_found {
        log::warn!("{} not found, using defaults", cli.config.display());
    }

    let locale = cli
        .translate
        .clone()
        .map(|locale| locale.unwrap_or_else(|| config.collaborators.translate_locale.clone()));

    let ctx = Context {
        activity: FileActivityLog::new(&config.collaborators.activity_log_dir),
        config: Arc::new(config),
        conversation_id: cli.conversation.as_deref(),
        translate: locale.as_deref(),
    };

    match cli.command {
        Command::Menu {
            token,
            choice,
            json,
        } => {
            let step = match (token, choice) {
                (token, Some(choice)) => {
                    let step = conversation::advance(token.as_deref(), &choice)?;
                    ctx.log("Menu choice", json!({ "from": token, "choice": choice }))
                        .await;
                    step
                }
                (Some(token), None) => conversation::resume(&token)?,
                (None, None) => {
                    ctx.log("Started", json!({})).await;
                    Step::Prompt(conversation::start())
                }
            };
            ctx.step(step, json).await?;
        }

        Command::Fetch {
            currency,
            impact,
            period,
            json,
        } => {
            let selection = Selection {
                criteria: FilterCriteria::from_selection(impact, currency),
                period,
            };
            ctx.fetch(&selection, json).await?;
        }

        Command::Resume { token, json } => {
            ctx.step(conversation::resume(&token)?, json).await?;
        }

        Command::Analysis => {
            let runner = CommandAnalysisRunner::from_config(&ctx.config.collaborators);
            ctx.log("Requested analysis", json!({})).await;
            let outcome = runner.run().await;
            for (action, details) in analysis_entries(&outcome) {
                ctx.log(action, details).await;
            }
            print!("{}", outcome?.stdout);
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = ctx.config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

/// Activity details for a fetch, with the error when it failed.
fn selection_details(selection: &Selection, error: Option<&AppError>) -> serde_json::Value {
    let mut details = json!({
        "currency": selection.criteria.currency,
        "impact": selection.criteria.impact_label,
        "period": selection.period.key(),
    });
    if let Some(e) = error {
        details["error"] = json!(e.to_string());
    }
    details
}

/// Activity entries describing how an analysis run ended.
fn analysis_entries(outcome: &Result<AnalysisOutput>) -> Vec<(&'static str, serde_json::Value)> {
    match outcome {
        Ok(output) => {
            let mut entries = Vec::with_capacity(2);
            if let Some(warnings) = output.warnings() {
                entries.push(("Analysis stderr", json!({ "stderr": warnings })));
            }
            entries.push(("Analysis completed", json!({ "output": output.stdout })));
            entries
        }
        Err(e) => vec![("Analysis failed", json!({ "error": e.to_string() }))],
    }
}

fn print_prompt(prompt: &MenuPrompt, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(prompt)?);
        return Ok(());
    }

    println!("{}", prompt.text);
    for option in &prompt.options {
        println!("  {:<14} {}", option.label, option.token);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection() -> Selection {
        Selection {
            criteria: FilterCriteria::from_selection(ImpactLevel::High, Currency::USD),
            period: PeriodKey::ThisWeek,
        }
    }

    #[test]
    fn test_fetch_failure_details_carry_error_and_selection() {
        let err = AppError::timeout("navigate", 180_000);
        let details = selection_details(&selection(), Some(&err));

        assert_eq!(details["currency"], "USD");
        assert_eq!(details["impact"], "High Impact Expected");
        assert_eq!(details["period"], "thisweek");
        assert_eq!(details["error"], err.to_string());

        assert!(selection_details(&selection(), None).get("error").is_none());
    }

    #[test]
    fn test_analysis_entries() {
        let ok = Ok(AnalysisOutput {
            stdout: "EURUSD: bullish\n".to_string(),
            stderr: "stale quotes\n".to_string(),
        });
        let entries = analysis_entries(&ok);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "Analysis stderr");
        assert_eq!(entries[0].1["stderr"], "stale quotes");
        assert_eq!(entries[1].0, "Analysis completed");
        assert_eq!(entries[1].1["output"], "EURUSD: bullish\n");

        let quiet = Ok(AnalysisOutput {
            stdout: "ok".to_string(),
            stderr: String::new(),
        });
        let entries = analysis_entries(&quiet);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "Analysis completed");

        let failed = Err(AppError::collaborator("analysis", "exited with 3"));
        let entries = analysis_entries(&failed);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "Analysis failed");
        assert_eq!(entries[0].1["error"], "analysis failed: exited with 3");
    }
}
