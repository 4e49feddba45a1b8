//! Sentinel gateway CLI - operator tooling for config validation and
//! local request inspection. HTTP transport is out of scope here; this
//! exercises the [`sentinel_core::Gateway`] facade directly against a
//! local registry database.

use clap::Parser;
use sentinel_core::decision::ContextKind;
use sentinel_core::{Gateway, GatewayConfig};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "AI Security Gateway - operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Validate configuration from the environment and exit.
    Check,
    /// Run the detector pipeline against a piece of text and print the
    /// resulting decision.
    Inspect {
        /// Text to analyze.
        text: String,
        /// Where in the request flow this text sits.
        #[arg(long, default_value = "input")]
        context: String,
    },
    /// Report the gateway's configured rate limits and detector mode.
    Status,
}

fn parse_context(value: &str) -> anyhow::Result<ContextKind> {
    match value.to_lowercase().as_str() {
        "input" => Ok(ContextKind::Input),
        "system_prompt" | "system-prompt" => Ok(ContextKind::SystemPrompt),
        "output" => Ok(ContextKind::Output),
        other => anyhow::bail!("unknown context: {other} (expected input, system_prompt, or output)"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check) => {
            let config = GatewayConfig::from_env()?;
            println!("configuration valid");
            println!("database: {}", config.database_path.display());
            println!("prompt injection detector: {:?}", config.prompt_injection_detector);
        }
        Some(Commands::Inspect { text, context }) => {
            let context = parse_context(&context)?;
            let config = GatewayConfig::from_env().unwrap_or_default();
            let gateway = Gateway::new(config)?;
            let who = sentinel_core::Principal {
                id: "cli".to_string(),
                rate_limit_per_minute: 0,
                rate_limit_per_hour: 0,
            };
            let now = chrono::Utc::now().timestamp();
            let assessment = gateway.inspect(&text, context, &who, now)?;

            println!("decision: {:?}", assessment.decision());
            println!("risk: {:.2}", assessment.risk);
            for threat in &assessment.threats {
                println!("  - {:?} ({:?}, confidence {:.2}): {}", threat.threat_type, threat.severity, threat.confidence, threat.description);
            }
        }
        Some(Commands::Status) => {
            let config = GatewayConfig::from_env().unwrap_or_default();
            println!("rate limit: {}/min, {}/hour", config.rate_limit_per_minute, config.rate_limit_per_hour);
            println!("prompt injection detector: {:?}", config.prompt_injection_detector);
            println!("prompt injection threshold: {:.2}", config.prompt_injection_threshold);
        }
        None => {
            println!("Sentinel Gateway CLI - use --help for commands");
        }
    }

    Ok(())
}
