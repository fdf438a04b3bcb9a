//! devpilot: a DevOps agent with human approval for sensitive commands.
//!
//! Threads persist under `--state-dir`, so a paused call can be decided
//! from a later invocation.
//!
//! Usage:
//!   devpilot chat --thread ops-1 "why is the web deployment crash looping?"
//!   devpilot decide --thread ops-1 YES
//!   devpilot show --thread ops-1
//!   devpilot scenario run-all

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use devpilot_adapters::{
    builtin_registry,
    model::OpenAiChatModel,
    scenarios::{self, approve_delete, compaction, deny_delete, retrieval_summary, ScenarioSummary},
    AdapterSettings,
};
use devpilot_checkpoint::{FileCheckpointStore, TracingBroadcaster};
use devpilot_contracts::{
    error::{DevpilotError, DevpilotResult},
    execution::{RunOutcome, ThreadId, ThreadStatus},
    message::{Decision, Message, Role},
    state::AutoApprove,
};
use devpilot_core::{AgentConfig, GraphEngine};
use devpilot_policy::CatalogApprovalPolicy;
use devpilot_verify::SchemaArgumentVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "devpilot",
    about = "DevOps agent with approval-gated tool execution",
    long_about = "Chats with a tool-using DevOps assistant. Calls to sensitive tools\n\
                  pause until an operator answers YES or NO."
)]
struct Cli {
    /// Agent configuration TOML. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tool catalog TOML. The built-in DevOps catalog is used when omitted.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Directory holding one checkpoint file per thread.
    #[arg(long, global = true, default_value = ".devpilot")]
    state_dir: PathBuf,

    /// Root of the retrieval corpora (docker/, bigquery/, confluence/, aws/).
    /// Falls back to DEVPILOT_CORPUS_DIR.
    #[arg(long, global = true)]
    corpus_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message to a thread.
    Chat {
        #[arg(long)]
        thread: String,
        /// Run approval-gated tools without asking.
        #[arg(long)]
        auto_approve: bool,
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Answer a paused tool call.
    Decide {
        #[arg(long)]
        thread: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Print a thread's transcript, summary and progress log.
    Show {
        #[arg(long)]
        thread: String,
        /// Dump the raw checkpoint as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a demo scenario against fixture tools and a scripted model.
    Scenario {
        #[arg(value_enum)]
        name: ScenarioName,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    #[value(name = "YES")]
    Yes,
    #[value(name = "NO")]
    No,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioName {
    RunAll,
    DenyDelete,
    ApproveDelete,
    RetrievalSummary,
    Compaction,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for node-by-node output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("devpilot error: {}", e);
        std::process::exit(if e.is_structural() { 2 } else { 1 });
    }
}

async fn run(cli: Cli) -> DevpilotResult<()> {
    match cli.command {
        Command::Chat {
            ref thread,
            auto_approve,
            ref message,
        } => {
            let engine = build_engine(&cli)?;
            let thread = ThreadId::from(thread.as_str());
            if auto_approve {
                engine.set_auto_approve(&thread, AutoApprove::Yes).await?;
            }
            let outcome = engine.invoke(&thread, Message::human(message.join(" "))).await?;
            report(&thread, &outcome);
            Ok(())
        }
        Command::Decide { ref thread, decision } => {
            let engine = build_engine(&cli)?;
            let thread = ThreadId::from(thread.as_str());
            let decision = match decision {
                DecisionArg::Yes => Decision::Yes,
                DecisionArg::No => Decision::No,
            };
            let outcome = engine.decide(&thread, decision).await?;
            report(&thread, &outcome);
            Ok(())
        }
        Command::Show { ref thread, json } => show(&cli, &ThreadId::from(thread.as_str()), json),
        Command::Scenario { name } => run_scenarios(name).await,
    }
}

// ── Wiring ────────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> DevpilotResult<AgentConfig> {
    let config = match &cli.config {
        Some(path) => AgentConfig::from_file(path)?,
        None => AgentConfig::default(),
    }
    .with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn load_policy(cli: &Cli) -> DevpilotResult<CatalogApprovalPolicy> {
    match &cli.catalog {
        Some(path) => CatalogApprovalPolicy::from_file(path),
        None => CatalogApprovalPolicy::builtin(),
    }
}

fn build_engine(cli: &Cli) -> DevpilotResult<GraphEngine> {
    let config = load_config(cli)?;
    let policy = load_policy(cli)?;
    let mut settings = AdapterSettings::from_env();
    if let Some(dir) = &cli.corpus_dir {
        settings.corpus_dir = Some(dir.clone());
    }
    let registry = builtin_registry(policy.specs(), &settings)?;
    let store = FileCheckpointStore::open(&cli.state_dir)?;
    let model = OpenAiChatModel::from_env()?;

    info!(
        tools = registry.len(),
        state_dir = %cli.state_dir.display(),
        model = %model.settings().model,
        "engine ready"
    );

    Ok(GraphEngine::new(
        Arc::new(model),
        registry,
        Arc::new(policy),
        Arc::new(SchemaArgumentVerifier::new()),
        Arc::new(store),
        Arc::new(TracingBroadcaster),
        config,
    ))
}

// ── Output ────────────────────────────────────────────────────────────────────

fn report(thread: &ThreadId, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { state } => {
            let answer = state
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            println!("{answer}");
        }
        RunOutcome::AwaitingApproval { call, reason, .. } => {
            println!("Approval required: {reason}");
            println!(
                "  {} {}",
                call.name,
                serde_json::Value::Object(call.arguments.clone())
            );
            println!("Answer with: devpilot decide --thread {thread} YES|NO");
        }
        RunOutcome::Denied { call, .. } => {
            println!("Declined {} (call {}). Send a new message to continue.", call.name, call.id);
        }
        RunOutcome::TimedOut { stage, .. } => {
            println!("Timed out in {stage}; see `devpilot show --thread {thread}` for the log.");
        }
        RunOutcome::Ignored { reason, .. } => {
            println!("Ignored: {reason}");
        }
    }
}

fn show(cli: &Cli, thread: &ThreadId, json: bool) -> DevpilotResult<()> {
    use devpilot_core::traits::CheckpointStore;

    let store = FileCheckpointStore::open(&cli.state_dir)?;
    let checkpoint = store.load(thread)?.ok_or_else(|| DevpilotError::ConfigError {
        reason: format!("no thread '{thread}' under '{}'", cli.state_dir.display()),
    })?;

    if json {
        let body = serde_json::to_string_pretty(&checkpoint).map_err(|e| DevpilotError::CheckpointFailed {
            reason: format!("checkpoint is not serializable: {e}"),
        })?;
        println!("{body}");
        return Ok(());
    }

    let status = match &checkpoint.status {
        ThreadStatus::Terminal => "idle".to_string(),
        ThreadStatus::Running => format!("interrupted before {}", checkpoint.next.map(|n| n.to_string()).unwrap_or_default()),
        ThreadStatus::AwaitingApproval { tool_name, call_id } => {
            format!("awaiting approval for {tool_name} ({call_id})")
        }
    };
    let state = &checkpoint.state;
    println!("Thread {thread} (version {}, {status})", checkpoint.version);
    println!("Auto-approve: {:?}", state.auto_approve);
    if !state.summary.is_empty() {
        println!("Summary: {}", state.summary);
    }
    println!();
    for message in &state.messages {
        let role = format!("{:?}", message.role).to_lowercase();
        if message.has_tool_calls() {
            for call in &message.tool_calls {
                println!(
                    "[{role}] -> {} {}",
                    call.name,
                    serde_json::Value::Object(call.arguments.clone())
                );
            }
        } else {
            println!("[{role}] {}", message.content);
        }
    }
    if !state.logs.is_empty() {
        println!();
        println!("Progress log:");
        for entry in &state.logs {
            println!(
                "  [{}] {} {}",
                if entry.done { "done" } else { "...." },
                entry.message,
                entry.command
            );
        }
    }
    Ok(())
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

async fn run_scenarios(name: ScenarioName) -> DevpilotResult<()> {
    println!();
    println!("devpilot approval-gated agent demo");
    println!("==================================");
    println!();

    let summaries: Vec<ScenarioSummary> = match name {
        ScenarioName::RunAll => scenarios::run_all().await?,
        ScenarioName::DenyDelete => vec![deny_delete::run_scenario().await?],
        ScenarioName::ApproveDelete => vec![approve_delete::run_scenario().await?],
        ScenarioName::RetrievalSummary => vec![retrieval_summary::run_scenario().await?],
        ScenarioName::Compaction => vec![compaction::run_scenario().await?],
    };

    for summary in &summaries {
        println!(
            "  {:<18} {:<10} kubectl calls: {}  chain: {}",
            summary.name,
            summary.outcome,
            summary.kubectl_invocations,
            if summary.chain_verified { "ok" } else { "BROKEN" }
        );
    }
    println!();
    println!("All selected scenarios completed.");
    Ok(())
}
