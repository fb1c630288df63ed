use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use triage_assist::agent::{LlmPlanner, ReactAgent, RunContext};
use triage_assist::config::{AgentConfig, TriageConfig, validate_threshold};
use triage_assist::llm::{LlmConfig, LlmProvider, create_provider};
use triage_assist::pipeline::{
    EmailInput, EmailPipeline, Evaluator, LlmClassifier, RuleClassifier, TriageRouter,
};
use triage_assist::tools::{ContactDirectory, MockCalendar, ToolRegistry};

#[derive(Debug, Parser)]
#[command(
    name = "triage-assist",
    version,
    about = "Email triage routing and ReAct follow-up suggestions",
    after_help = "Examples:\n  triage-assist triage --subject \"Invoice\" --body \"Your bill is due\"\n  \
                  triage-assist react\n  triage-assist eval --dataset data/golden_emails.json"
)]
struct Cli {
    /// When to use the LLM tier.
    #[arg(long, value_enum, global = true, default_value_t = LlmMode::Auto)]
    llm: LlmMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LlmMode {
    /// Use the LLM when an API key is configured.
    Auto,
    /// Never call the LLM.
    Off,
    /// Fail unless an API key is configured.
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlannerKind {
    Heuristic,
    Llm,
}

#[derive(Debug, Args)]
struct EmailArgs {
    #[arg(long, default_value = "Meeting request")]
    subject: String,
    #[arg(long, default_value = "Can we schedule for tomorrow?")]
    body: String,
    #[arg(long, default_value = "manager@company.com")]
    sender: String,
}

impl EmailArgs {
    fn to_input(&self) -> EmailInput {
        EmailInput::new(&self.subject, &self.body, &self.sender)
    }
}

#[derive(Debug, Args)]
struct TriageArgs {
    /// Rule confidence at or above which the LLM is skipped.
    #[arg(long)]
    threshold: Option<f32>,
    /// TOML rule set replacing the built-in keyword rules.
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AgentArgs {
    #[arg(long)]
    max_steps: Option<usize>,
    /// Let scheduling runs finish once the calendar has offered slots.
    #[arg(long)]
    finish_on_slots: bool,
    #[arg(long, value_enum, default_value_t = PlannerKind::Heuristic)]
    planner: PlannerKind,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Classify one email")]
    Triage {
        #[command(flatten)]
        email: EmailArgs,
        #[command(flatten)]
        triage: TriageArgs,
    },
    #[command(about = "Run the ReAct loop on one email and print its trace")]
    React {
        #[command(flatten)]
        email: EmailArgs,
        #[command(flatten)]
        agent: AgentArgs,
    },
    #[command(about = "Triage then run the ReAct loop, for one email or a JSON batch")]
    Process {
        #[command(flatten)]
        email: EmailArgs,
        #[command(flatten)]
        triage: TriageArgs,
        #[command(flatten)]
        agent: AgentArgs,
        /// JSON array of emails; replaces --subject/--body/--sender.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = triage_assist::pipeline::processor::DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },
    #[command(about = "Score triage against a human-labeled dataset")]
    Eval {
        #[arg(long)]
        dataset: PathBuf,
        /// Enable the LLM fallback (requires an API key).
        #[arg(long)]
        use_llm: bool,
        #[command(flatten)]
        triage: TriageArgs,
        /// Print the report as JSON instead of tables.
        #[arg(long)]
        json: bool,
        /// Also write the JSON report to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    #[command(about = "Look up a contact in the mock directory")]
    Contact { query: String },
    #[command(about = "Read the mock calendar")]
    Calendar {
        #[arg(long, default_value = "me")]
        user_id: String,
        #[arg(long)]
        date_hint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Triage { email, triage } => {
            let llm = load_llm(cli.llm)?;
            let router = build_router(&triage, llm)?;
            print_json(&router.route(&email.to_input()).await)
        }
        Command::React { email, agent } => {
            let llm = load_llm(cli.llm)?;
            let agent = build_agent(&agent, llm).await?;
            let context = RunContext::new().with_sender(&email.sender);
            let trace = agent.run(&email.subject, &email.body, context).await;
            print_json(&trace)
        }
        Command::Process {
            email,
            triage,
            agent,
            input,
            concurrency,
        } => {
            let llm = load_llm(cli.llm)?;
            let router = build_router(&triage, llm.clone())?;
            let agent = build_agent(&agent, llm).await?;
            let pipeline = EmailPipeline::new(Arc::new(router), Arc::new(agent))
                .with_concurrency(concurrency);

            match input {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let emails: Vec<EmailInput> = serde_json::from_str(&raw)
                        .with_context(|| format!("parsing {}", path.display()))?;
                    print_json(&pipeline.process_batch(emails).await)
                }
                None => print_json(&pipeline.process(email.to_input()).await),
            }
        }
        Command::Eval {
            dataset,
            use_llm,
            triage,
            json,
            output,
        } => {
            let mode = if use_llm { LlmMode::Required } else { LlmMode::Off };
            let router = build_router(&triage, load_llm(mode)?)?;
            let report = Evaluator::new(router).evaluate_file(&dataset).await?;

            if json {
                print_json(&report)?;
            } else {
                println!("{}", report.render_confusion_matrix());
                println!("{}", report.render_summary());
            }
            if let Some(path) = output {
                report.write_json(&path)?;
                eprintln!("Report written to {}", path.display());
            }
            Ok(())
        }
        Command::Contact { query } => print_json(&ContactDirectory::mock().lookup(&query)),
        Command::Calendar { user_id, date_hint } => {
            print_json(&MockCalendar::new().read_calendar(&user_id, date_hint.as_deref()))
        }
    }
}

fn load_llm(mode: LlmMode) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let config = match mode {
        LlmMode::Off => return Ok(None),
        LlmMode::Auto => LlmConfig::from_env()?,
        LlmMode::Required => Some(LlmConfig::require_from_env()?),
    };

    match config {
        Some(config) => {
            let provider = create_provider(&config)?;
            tracing::info!(model = provider.model_name(), "LLM tier enabled");
            Ok(Some(provider))
        }
        None => {
            tracing::info!("No LLM API key configured, running rule-only");
            Ok(None)
        }
    }
}

fn build_router(
    args: &TriageArgs,
    llm: Option<Arc<dyn LlmProvider>>,
) -> anyhow::Result<TriageRouter> {
    let mut config = TriageConfig::from_env()?;
    if let Some(threshold) = args.threshold {
        validate_threshold(threshold)?;
        config.threshold = threshold;
    }
    if let Some(path) = &args.rules {
        config.rules_path = Some(path.clone());
    }

    let rules = config.load_rules()?;
    let mut router = TriageRouter::new(RuleClassifier::new(rules)).with_threshold(config.threshold);
    if let Some(llm) = llm {
        router = router.with_fallback(Arc::new(LlmClassifier::new(llm)));
    }
    Ok(router)
}

async fn build_agent(
    args: &AgentArgs,
    llm: Option<Arc<dyn LlmProvider>>,
) -> anyhow::Result<ReactAgent> {
    let mut config = AgentConfig::from_env()?;
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }
    if args.finish_on_slots {
        config.finish_on_slots = true;
    }

    let tools = Arc::new(ToolRegistry::with_mock_tools(
        MockCalendar::new(),
        ContactDirectory::mock(),
    ));
    let agent = ReactAgent::new(Arc::clone(&tools), &config);

    match args.planner {
        PlannerKind::Heuristic => Ok(agent),
        PlannerKind::Llm => {
            let Some(llm) = llm else {
                bail!("--planner llm needs an LLM API key (OPENAI_API_KEY or ANTHROPIC_API_KEY)");
            };
            let planner = LlmPlanner::new(llm, tools.tool_definitions().await, &config);
            Ok(agent.with_planner(Arc::new(planner)))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
