use anyhow::{Context, Result};
use news_admin::config::Config;
use news_admin::controller::{AdminCommand, Controller};
use news_admin::feeds::FeedChecker;
use news_admin::store::{memory::MemoryStore, rest::SupabaseRest, AdminStore};
use news_admin::tui::{self, state::AppState};
use news_admin::workflow::WorkflowClient;
use news_admin::auth;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

struct Args {
    demo: bool,
    config: PathBuf,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args { demo: false, config: PathBuf::from("config.toml") };
    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--demo" => parsed.demo = true,
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config = PathBuf::from(path);
            }
            other => anyhow::bail!("unknown argument: {} (expected --demo or --config <path>)", other),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("news-admin.log")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_admin=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let args = parse_args(std::env::args())?;

    let config = if args.demo {
        Config::load_or_default(&args.config)?
    } else {
        Config::load(&args.config)?
    };

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    println!();
    println!("  News Automation Admin v{}", env!("CARGO_PKG_VERSION"));
    println!("  ============================");
    println!();
    if args.demo {
        println!("  ** DEMO MODE ** (in-memory sample data, nothing is written remotely)");
        println!();
    }

    match Config::app_password() {
        Some(expected) => {
            auth::gate(&expected, |attempt| {
                auth::read_masked(&format!("Password ({}/{})", attempt, auth::MAX_ATTEMPTS))
            })?;
        }
        None if args.demo => tracing::info!("no APP_PASSWORD set, demo mode skips the password gate"),
        None => anyhow::bail!("APP_PASSWORD is not set (env var or .env)"),
    }

    let store: Arc<dyn AdminStore> = if args.demo {
        Arc::new(MemoryStore::seeded()?)
    } else {
        let supabase = config
            .supabase
            .as_ref()
            .context("[supabase] section with `url` is required (or run with --demo)")?;
        let key = Config::supabase_key()?;
        let rest = SupabaseRest::new(&supabase.url, key, supabase.schema.clone())?;
        println!("  Connecting to {} ...", supabase.url);
        rest.ping().await?;
        Arc::new(rest)
    };

    let feeds = FeedChecker::new(&config.feeds)?;
    let workflow = match &config.workflow {
        Some(wf) => Some(WorkflowClient::new(wf, config.workflow_credentials())?),
        None => {
            tracing::info!("no [workflow] section; manual trigger disabled");
            None
        }
    };

    println!("  Connected. Starting dashboard...");
    tracing::info!(demo = args.demo, "starting dashboard");

    let (state_tx, state_rx) = watch::channel({
        let mut s = AppState::new(config.queue.default_statuses.clone());
        s.demo_mode = args.demo;
        s
    });
    let (cmd_tx, cmd_rx) = mpsc::channel::<AdminCommand>(16);

    let controller = Controller::new(store, feeds, workflow, &config.queue, state_tx);
    let controller_task = tokio::spawn(controller.run(cmd_rx));

    let result = tui::run_tui(state_rx, cmd_tx, config.ui.tick_ms).await;

    // The TUI sent Quit (or dropped its sender); let an in-flight command finish.
    if let Err(e) = controller_task.await {
        tracing::error!(error = %e, "controller task failed");
    }
    tracing::info!("dashboard closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        std::iter::once("news-admin".to_string())
            .chain(list.iter().map(|s| s.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_args_defaults() {
        let parsed = parse_args(args(&[])).unwrap();
        assert!(!parsed.demo);
        assert_eq!(parsed.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_parse_args_demo_and_config() {
        let parsed = parse_args(args(&["--config", "/etc/news.toml", "--demo"])).unwrap();
        assert!(parsed.demo);
        assert_eq!(parsed.config, PathBuf::from("/etc/news.toml"));
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_missing_path() {
        assert!(parse_args(args(&["--simulate"])).is_err());
        assert!(parse_args(args(&["--config"])).is_err());
    }
}
