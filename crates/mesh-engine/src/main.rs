//! `mindmesh` command line
//!
//! Runs plans against an in-memory canvas: `run` executes (and optionally
//! rolls back) a plan, `check` validates one without executing it.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mesh_core::{tables, ActorId, EngineConfig, Plan, Row, WorkspaceId};
use mesh_engine::{check_plan, MeshEngine};
use mesh_store::{MemoryDatastore, MemoryLockService, SystemClock};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let plan = Arg::new("plan")
        .long("plan")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Plan file (JSON)");
    let workspace = Arg::new("workspace")
        .long("workspace")
        .required(true)
        .help("Workspace the plan targets");
    let config = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Engine configuration (TOML or JSON)");

    Command::new("mindmesh")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mind Mesh plan execution and rollback engine")
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a plan against an in-memory canvas")
                .arg(plan.clone())
                .arg(workspace.clone())
                .arg(config.clone())
                .arg(
                    Arg::new("actor")
                        .long("actor")
                        .required(true)
                        .help("Actor that takes the canvas lock"),
                )
                .arg(
                    Arg::new("lock-ttl")
                        .long("lock-ttl")
                        .default_value("300")
                        .value_parser(value_parser!(i64))
                        .help("Lock lifetime in seconds"),
                )
                .arg(
                    Arg::new("rollback")
                        .long("rollback")
                        .action(ArgAction::SetTrue)
                        .help("Roll the plan back after executing it"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate a plan without executing it")
                .arg(plan)
                .arg(workspace)
                .arg(config),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_plan(path: &Path) -> anyhow::Result<Plan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing plan {}", path.display()))
}

fn load_config(args: &ArgMatches) -> anyhow::Result<EngineConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a String> {
    args.get_one::<String>(name)
        .with_context(|| format!("--{name} is required"))
}

fn workspace_row(workspace_id: &WorkspaceId) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(workspace_id));
    row.insert("grid_visible".to_string(), json!(true));
    row.insert("snap_to_grid".to_string(), json!(false));
    row.insert("show_minimap".to_string(), json!(false));
    row.insert("read_only".to_string(), json!(false));
    row
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(args: &ArgMatches) -> anyhow::Result<bool> {
    let plan_path = args
        .get_one::<PathBuf>("plan")
        .context("--plan is required")?;
    let plan = load_plan(plan_path)?;
    let config = load_config(args)?;
    let workspace_id = WorkspaceId::new(required(args, "workspace")?.as_str());
    let actor_id = ActorId::new(required(args, "actor")?.as_str());
    let ttl = args.get_one::<i64>("lock-ttl").copied().unwrap_or(300);

    let store = MemoryDatastore::new();
    for table in [
        &config.tables.containers,
        &config.tables.nodes,
        &config.tables.workspaces,
    ] {
        store.register_table(table);
    }
    if tables::is_canvas_table(&config.tables.workspaces) {
        store.seed(
            &config.tables.workspaces,
            workspace_id.as_str(),
            workspace_row(&workspace_id),
        )?;
    }

    let clock = Arc::new(SystemClock);
    let locks = Arc::new(MemoryLockService::new(clock.clone()));
    locks.acquire(&workspace_id, &actor_id, chrono::Duration::seconds(ttl))?;

    let engine = MeshEngine::builder()
        .config(config)
        .datastore(Arc::new(store))
        .locks(locks)
        .clock(clock)
        .build()?;

    let executed = engine.execute_plan(plan, &workspace_id, &actor_id).await;
    print_json(&executed)?;
    if !executed.success || !args.get_flag("rollback") {
        return Ok(executed.success);
    }

    let rolled_back = engine.rollback_last_plan(&workspace_id, &actor_id).await;
    print_json(&rolled_back)?;
    Ok(rolled_back.success)
}

fn check(args: &ArgMatches) -> anyhow::Result<bool> {
    let plan_path = args
        .get_one::<PathBuf>("plan")
        .context("--plan is required")?;
    let plan = load_plan(plan_path)?;
    let config = load_config(args)?;
    let workspace_id = WorkspaceId::new(required(args, "workspace")?.as_str());

    let problems = check_plan(&plan, &workspace_id, &config);
    let report: Vec<_> = problems
        .iter()
        .map(|err| json!({ "category": err.category(), "message": err.to_string() }))
        .collect();
    print_json(&json!({
        "plan": plan.id.to_string(),
        "mutations": plan.len(),
        "valid": report.is_empty(),
        "problems": report,
    }))?;
    Ok(problems.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let ok = match matches.subcommand() {
        Some(("run", args)) => run(args).await?,
        Some(("check", args)) => check(args)?,
        _ => {
            cli().print_help()?;
            true
        }
    };

    std::process::exit(if ok { 0 } else { 1 });
}
