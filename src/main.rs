//! Gantry Config CLI
//!
//! Entry point for the `gantry-config` command-line tool.

use clap::{Parser, Subcommand};
use gantry_config::{
    merge, merge_patch, publish, ConfigPatch, ConfigSnapshot, ConfigStore, DeploymentExecutor,
    MockExecutor, Namespace, NamespaceMap, PatchOp, ReleaseTrigger, Settings, StateFile,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gantry-config")]
#[command(about = "Versioned application config engine", version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a config patch against the namespace grammars without committing
    Validate {
        /// Restrict the check to one namespace (values, memory, cpu, tags, registry)
        #[arg(long, short = 'n')]
        namespace: Option<String>,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        /// Path to the patch JSON ("-" reads stdin)
        patch: PathBuf,
    },

    /// Show the merged config a patch would produce, without committing
    Render {
        /// Path to a platform state file
        #[arg(long, short = 'b')]
        base: PathBuf,

        /// Application id
        #[arg(long, short = 'a')]
        app: String,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,

        /// Path to the patch JSON ("-" reads stdin)
        patch: PathBuf,
    },

    /// Republish stored platform state to the scheduler
    Sync {
        /// Path to a platform state file
        #[arg(long, short = 's')]
        state: PathBuf,

        /// Validate the stored state only, deploy nothing
        #[arg(long)]
        dry_run: bool,

        /// Path to an engine settings file
        #[arg(long, short = 'c')]
        settings: Option<PathBuf>,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Validate {
            namespace,
            human,
            patch,
        } => run_validate(namespace, human, patch),
        Commands::Render {
            base,
            app,
            human,
            patch,
        } => run_render(base, &app, human, patch),
        Commands::Sync {
            state,
            dry_run,
            settings,
            human,
        } => run_sync(state, dry_run, settings, human),
    }
}

/// Read a patch body from a file, or stdin for "-".
fn read_patch(path: &Path) -> Result<ConfigPatch, String> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?
    };
    let body: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| format!("patch is not valid JSON: {}", e))?;
    ConfigPatch::from_body(&body).map_err(|e| e.to_string())
}

fn run_validate(namespace: Option<String>, human: bool, patch_path: PathBuf) {
    let only = match namespace {
        Some(ref name) => match Namespace::parse(name) {
            Some(ns) => Some(ns),
            None => {
                eprintln!(
                    "Unknown namespace '{}'. Valid: values, memory, cpu, tags, registry",
                    name
                );
                process::exit(1);
            }
        },
        None => None,
    };

    let patch = match read_patch(&patch_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Merging over an empty base exercises exactly the grammar checks a
    // commit would run, and yields the canonical form of every set key.
    let mut set = BTreeMap::new();
    let mut unset: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (ns, ops) in patch.namespaces() {
        if only.is_some_and(|wanted| wanted != ns) {
            continue;
        }
        match merge::apply(ns, &NamespaceMap::new(), ops) {
            Ok(accepted) => {
                set.insert(ns.as_str(), accepted);
                let removed: Vec<String> = ops
                    .iter()
                    .filter(|(_, op)| **op == PatchOp::Unset)
                    .map(|(key, _)| key.clone())
                    .collect();
                if !removed.is_empty() {
                    unset.insert(ns.as_str(), removed);
                }
            }
            Err(e) => {
                if human {
                    println!("rejected: {}", e);
                } else {
                    let doc = serde_json::json!({
                        "accepted": false,
                        "error": {
                            "namespace": e.namespace.as_str(),
                            "key": e.key,
                            "reason": e.reason,
                        },
                    });
                    println!("{}", doc);
                }
                process::exit(1);
            }
        }
    }

    if human {
        println!("accepted");
        for (ns, entries) in &set {
            for (key, value) in entries {
                println!("  {}: set {}={}", ns, key, value);
            }
        }
        for (ns, keys) in &unset {
            for key in keys {
                println!("  {}: unset {}", ns, key);
            }
        }
    } else {
        let doc = serde_json::json!({"accepted": true, "set": set, "unset": unset});
        match serde_json::to_string_pretty(&doc) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_render(base: PathBuf, app: &str, human: bool, patch_path: PathBuf) {
    let store = match StateFile::load_store(&base) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading state file: {}", e);
            process::exit(1);
        }
    };

    let record = match store.get_app(app) {
        Ok(Some(record)) => record,
        Ok(None) => {
            eprintln!("Application '{}' not found in state file", app);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let current = match store.current_config(app) {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => ConfigSnapshot::empty(app, &record.owner),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let patch = match read_patch(&patch_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let merged = match merge_patch(&current, &record.owner, &patch) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("rejected: {}", e);
            process::exit(1);
        }
    };

    if human {
        println!("{} (base {})", app, current.id);
        for ns in Namespace::ALL {
            let entries = merged.namespace(ns);
            if entries.is_empty() {
                continue;
            }
            println!("  [{}]", ns);
            for (key, value) in entries {
                println!("    {}={}", key, value);
            }
        }
    } else {
        let doc = serde_json::json!({
            "app": app,
            "base": current.id,
            "values": merged.values,
            "memory": merged.memory,
            "cpu": merged.cpu,
            "tags": merged.tags,
            "registry": merged.registry,
        });
        match serde_json::to_string_pretty(&doc) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_sync(state: PathBuf, dry_run: bool, settings_path: Option<PathBuf>, human: bool) {
    let settings = match settings_path {
        Some(ref path) => match Settings::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings: {}", e);
                process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let store = match StateFile::load_store(&state) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading state file: {}", e);
            process::exit(1);
        }
    };

    let report = if dry_run {
        publish::check_state(&store)
    } else {
        let trigger = ReleaseTrigger::with_timeout(
            Arc::new(MockExecutor::new()) as Arc<dyn DeploymentExecutor>,
            settings.deploy_timeout(),
        );
        publish::publish_state(&store, &trigger)
    };

    let report = match report {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if human {
        let verb = if dry_run { "Would publish" } else { "Published" };
        println!("{} {} application(s)", verb, report.published.len());
        for app in &report.published {
            println!("  {}", app);
        }
        if !report.skipped.is_empty() {
            println!("Skipped {} (nothing deployable)", report.skipped.len());
            for app in &report.skipped {
                println!("  {}", app);
            }
        }
        if !report.errors.is_empty() {
            println!("Errors {}", report.errors.len());
            for failure in &report.errors {
                println!("  {}: {}", failure.app, failure.detail);
            }
        }
    } else {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    }

    if report.is_clean() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}
