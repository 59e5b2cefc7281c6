//! Binary entrypoint for the worldlink CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and the `data/` directory
//! - `validate` - check the configuration, world data and loot tables
//! - `inspect <id>` - print one world object's definition
//! - `simulate --level <n> [--step kind:id:state]...` - enter a level as a
//!   scripted player and print every packet the server would send
//!
//! See the library crate docs for module-level details: `worldlink::`.
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;

use worldlink::config::Config;
use worldlink::interactions::{
    InteractionManager, Packet, PlayerSession, QueueSink, RequestOutcome,
};
use worldlink::metrics;

#[derive(Parser)]
#[command(name = "worldlink")]
#[command(about = "World-object interaction engine for an emulated game server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration
    Init,
    /// Check configuration, world data and loot tables
    Validate,
    /// Print a world object's definition
    Inspect {
        /// World object id
        id: String,
    },
    /// Enter a level as a scripted player and print the outgoing packets
    Simulate {
        /// Level to enter
        #[arg(short, long)]
        level: i32,
        /// Account id of the simulated player
        #[arg(short, long, default_value = "simulator")]
        account: String,
        /// Steps to run in order: request:<id>:<state>, interact:<id>:<state>
        /// or finish:<id>:<state>
        #[arg(short, long = "step", value_parser = parse_step)]
        steps: Vec<Step>,
        /// Seed for the session RNG (random spawn behaviour, command 29, loot)
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Request,
    Interact,
    Finish,
}

#[derive(Debug, Clone)]
struct Step {
    kind: StepKind,
    id: String,
    state: i32,
}

fn parse_step(raw: &str) -> Result<Step, String> {
    let (kind, rest) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected kind:id:state, got '{}'", raw))?;
    let (id, state) = rest
        .rsplit_once(':')
        .ok_or_else(|| format!("expected kind:id:state, got '{}'", raw))?;
    let kind = match kind {
        "request" => StepKind::Request,
        "interact" => StepKind::Interact,
        "finish" => StepKind::Finish,
        other => return Err(format!("unknown step kind '{}'", other)),
    };
    if id.is_empty() {
        return Err(format!("missing object id in '{}'", raw));
    }
    let state = state
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("state '{}' is not an integer", state))?;
    Ok(Step {
        kind,
        id: id.to_string(),
        state,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            if Path::new(&cli.config).exists() {
                warn!("{} already exists; leaving it untouched", cli.config);
            } else {
                Config::create_default(&cli.config).await?;
                info!("Wrote default configuration to {}", cli.config);
            }
            tokio::fs::create_dir_all("data")
                .await
                .context("creating data directory")?;
            println!("Configuration ready. Put world data in data/world_objects.json");
        }
        Commands::Validate => {
            let config = load_config(&cli.config, cli.verbose).await?;
            config.validate()?;
            let manager = InteractionManager::from_config(&config)?;
            let world = manager.registry().ensure_loaded()?;
            println!(
                "OK: {} objects, {} collections, {} levels",
                world.objects.len(),
                world.collections.len(),
                world.levels.len()
            );
            let behaviour = manager.active_spawn_behaviour();
            println!("Spawn behaviour: {}", behaviour.identifier());
        }
        Commands::Inspect { id } => {
            let config = load_config(&cli.config, cli.verbose).await?;
            let manager = InteractionManager::from_config(&config)?;
            let object = manager.registry().resolve(&id)?;
            println!("{}", object.id);
            println!(
                "  type {} def {}",
                object.primary_info.kind, object.primary_info.def_id
            );
            let position = object.location_info.position;
            println!(
                "  position ({}, {}, {})",
                position.x, position.y, position.z
            );
            if let Some(group) = manager.registry().group_of(&id) {
                println!("  group {} (type {})", group.id, group.kind);
            }
            if object.states.is_empty() {
                println!("  no states");
            }
            for (key, commands) in &object.states {
                let codes: Vec<String> = commands.iter().map(|c| c.code.to_string()).collect();
                println!("  state {}: [{}]", key, codes.join(", "));
            }
        }
        Commands::Simulate {
            level,
            account,
            steps,
            seed,
        } => {
            let config = load_config(&cli.config, cli.verbose).await?;
            let manager = InteractionManager::from_config(&config)?;
            simulate(&manager, level, &account, &steps, seed)?;
        }
    }

    Ok(())
}

async fn load_config(path: &str, verbosity: u8) -> Result<Config> {
    let config = match Config::load(path).await {
        Ok(config) => config,
        Err(e) => {
            init_logging(&None, verbosity);
            warn!("{}; using defaults", e);
            return Ok(Config::default());
        }
    };
    init_logging(&Some(config.clone()), verbosity);
    Ok(config)
}

fn simulate(
    manager: &InteractionManager,
    level: i32,
    account: &str,
    steps: &[Step],
    seed: Option<u64>,
) -> Result<()> {
    let (sink, mut rx) = QueueSink::channel();
    let mut session = PlayerSession::new(account, Box::new(sink));
    if let Some(seed) = seed {
        session = session.with_seed(seed);
    }

    let mut drain = |label: &str| {
        println!("# {}", label);
        while let Ok(packet) = rx.try_recv() {
            print_packet(&packet);
        }
    };

    manager
        .init_interactions_for(&mut session, level)
        .map_err(|e| anyhow!("entering level {}: {}", level, e))?;
    drain(&format!("enter level {}", level));

    for step in steps {
        let object = match manager.registry().resolve(&step.id) {
            Ok(object) => object,
            Err(e) => {
                warn!("Skipping step: {}", e);
                continue;
            }
        };
        let label = match step.kind {
            StepKind::Request => {
                let outcome =
                    manager.handle_interaction_data_request(&mut session, &step.id, &object, step.state);
                format!("request {} {} -> {}", step.id, step.state, describe(outcome))
            }
            StepKind::Interact => {
                let destroy =
                    manager.handle_interaction(&mut session, &step.id, &object, step.state, false);
                format!("interact {} {} -> destroy={}", step.id, step.state, destroy)
            }
            StepKind::Finish => {
                manager.handle_action_finished(&mut session, &step.id, step.state);
                format!("finish {} {}", step.id, step.state)
            }
        };
        drain(&label);
    }

    for grant in &session.rewards {
        println!(
            "# reward {}x item {} (table {})",
            grant.count, grant.item_def_id, grant.table_id
        );
    }
    if let Some(shop) = session.open_shop {
        println!("# open shop {}", shop);
    }
    let mut inspirations: Vec<i32> = session.inspirations.iter().copied().collect();
    inspirations.sort_unstable();
    for def_id in inspirations {
        println!("# inspiration {}", def_id);
    }
    let mut lockpicks: Vec<(&String, &u32)> = session.lockpicks.iter().collect();
    lockpicks.sort();
    for (group, count) in lockpicks {
        println!("# lockpicks {} x{}", group, count);
    }
    let stats = metrics::snapshot();
    println!(
        "# requests={} denied={} retries={} commands={} failed={} unhandled={} guard_trips={}",
        stats.data_requests,
        stats.denied_requests,
        stats.snapshot_retries,
        stats.commands_executed,
        stats.failed_commands,
        stats.unhandled_commands,
        stats.guard_trips
    );
    Ok(())
}

fn describe(outcome: RequestOutcome) -> String {
    match outcome {
        RequestOutcome::Denied => "denied".to_string(),
        RequestOutcome::NoSnapshot => "no state".to_string(),
        RequestOutcome::NoMatch { retried } => format!("no match (retried={})", retried),
        RequestOutcome::Executed { commands, retried } => {
            format!("{} commands (retried={})", commands, retried)
        }
    }
}

fn print_packet(packet: &Packet) {
    println!("{:<22} {}", packet.name(), packet.encode());
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when someone is watching
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
