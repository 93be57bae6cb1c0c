mod backend;
mod cache;
mod cli;
mod config;
mod controller;
mod error;
mod kits;
mod model;
mod output;
mod price_watch;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::{AppConfig, CliOverrides};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::backend::{HttpBackend, SearchBackend};
use crate::cache::{Cache, CachedBackend};
use crate::controller::{SearchController, SearchOutcome};
use crate::model::CountryCode;
use crate::price_watch::PriceWatch;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "unfluffed=debug"
    } else {
        "unfluffed=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AppConfig::load(CliOverrides {
        backend_url: cli.backend_url.clone(),
        country: cli.country.clone(),
        no_cache: cli.no_cache,
    })?;
    tracing::debug!("Using backend {}", config.backend_url);

    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted.");
        std::process::exit(130);
    })
    .context("Failed to set Ctrl+C handler")?;

    let filters = cli.command.search_filters();

    match &cli.command {
        Commands::Search {
            query,
            advanced,
            limit,
            ..
        } => {
            let advanced = *advanced || !filters.is_empty();
            cmd_search(&config, query, advanced, &filters, *limit).await?;
        }
        Commands::Suggest { text } => cmd_suggest(&config, text).await?,
        Commands::Categories => cmd_categories(&config).await?,
        Commands::Kits => print!("{}", output::format_kits(kits::KITS)),
        Commands::Watch {
            asin,
            interval_secs,
            count,
        } => {
            let interval = interval_secs
                .map(Duration::from_secs)
                .unwrap_or(config.price_refresh);
            cmd_watch(&config, asin, interval, *count).await?;
        }
        Commands::Interactive => cmd_interactive(&config).await?,
    }

    Ok(())
}

fn http_backend(config: &AppConfig) -> Result<HttpBackend> {
    HttpBackend::new(config.backend_url.clone(), config.request_timeout)
        .context("Failed to create HTTP client")
}

fn new_controller(config: &AppConfig) -> Result<SearchController<CachedBackend<HttpBackend>>> {
    let cache = Cache::new(config.cache_dir.clone(), config.no_cache);
    let backend = CachedBackend::new(http_backend(config)?, cache);
    let mut controller = SearchController::new(backend, config.debounce);
    controller.set_country(config.country);
    Ok(controller)
}

async fn cmd_search(
    config: &AppConfig,
    query: &str,
    advanced: bool,
    filters: &[(&str, &str)],
    limit: usize,
) -> Result<()> {
    let mut controller = new_controller(config)?;

    if filters.iter().any(|(name, _)| *name == "category") {
        if let Err(e) = controller.load_categories().await {
            tracing::warn!("Could not load categories, skipping category check: {}", e);
        }
    }
    for (name, value) in filters {
        controller
            .set_filter(name, value)
            .with_context(|| format!("Invalid value for {}", name))?;
    }

    controller.set_query(query);
    match controller.search(advanced).await {
        SearchOutcome::Completed => {
            print!(
                "{}",
                output::format_search_results(query, controller.state(), limit)
            );
            Ok(())
        }
        SearchOutcome::Skipped => anyhow::bail!("Search query must not be empty"),
        SearchOutcome::Failed(message) => anyhow::bail!("Search failed: {}", message),
        SearchOutcome::Stale => anyhow::bail!("Search was superseded"),
    }
}

async fn cmd_suggest(config: &AppConfig, text: &str) -> Result<()> {
    let mut controller = new_controller(config)?;
    controller.set_query(text);
    if !controller.flush_suggestions().await {
        anyhow::bail!(
            "Type at least {} characters to get suggestions",
            crate::controller::MIN_SUGGESTION_CHARS
        );
    }
    print!(
        "{}",
        output::format_suggestions(&controller.state().suggestions)
    );
    Ok(())
}

async fn cmd_categories(config: &AppConfig) -> Result<()> {
    let mut controller = new_controller(config)?;
    let categories = controller
        .load_categories()
        .await
        .context("Failed to load categories")?;
    print!("{}", output::format_categories(categories));
    Ok(())
}

async fn cmd_watch(
    config: &AppConfig,
    asin: &str,
    interval: Duration,
    count: Option<u64>,
) -> Result<()> {
    let backend = Arc::new(http_backend(config)?);
    let (watch, mut ticks) = PriceWatch::spawn(backend, asin, config.country, interval)
        .context("Failed to start price watch")?;

    eprintln!(
        "Watching {} every {}s (Ctrl+C to stop)",
        asin,
        interval.as_secs()
    );
    while let Some(tick) = ticks.recv().await {
        print!("{}", output::format_price_tick(&tick));
        if count.is_some_and(|limit| tick.sequence >= limit) {
            break;
        }
    }

    watch.stop().await;
    Ok(())
}

async fn cmd_interactive(config: &AppConfig) -> Result<()> {
    let mut controller = new_controller(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Type to search, `:help` for commands.");
    loop {
        let pending = controller.has_pending_suggestion();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if !handle_line(&mut controller, line.trim()).await {
                    break;
                }
            }
            fetched = controller.flush_suggestions(), if pending => {
                if fetched && controller.suggestions_visible() {
                    print!("{}", output::format_suggestions(&controller.state().suggestions));
                }
            }
        }
    }

    Ok(())
}

const INTERACTIVE_HELP: &str = "\
:go                search in the current mode
:search            run a basic search for the current query
:advanced          run an advanced search with the current filters
:mode basic|advanced  choose the mode used by :go and :pick
:filter NAME [V]   set a filter (min_price, max_price, min_rating, category, sort_by); no value clears it
:filters           show active filters
:status            show query, store, mode and last error
:clear             reset all filters
:pick N            search for suggestion N
:country CC        switch store (us, uk, ca)
:categories        list categories
:kits              list tested kits
:kit NAME          show one kit by slug or title
:quit              leave
anything else      becomes the query
";

/// Returns false when the session should end.
async fn handle_line<B: SearchBackend>(controller: &mut SearchController<B>, line: &str) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    match command {
        "" => {}
        ":quit" | ":q" => return false,
        ":help" => print!("{}", INTERACTIVE_HELP),
        ":go" => {
            let outcome = controller.search(controller.advanced()).await;
            print_outcome(controller, outcome);
        }
        ":mode" => match rest {
            "basic" => controller.set_advanced(false),
            "advanced" => controller.set_advanced(true),
            _ => eprintln!("Mode is either basic or advanced"),
        },
        ":search" => {
            let outcome = controller.search(false).await;
            print_outcome(controller, outcome);
        }
        ":advanced" => {
            let outcome = controller.search(true).await;
            print_outcome(controller, outcome);
        }
        ":filter" => {
            let (name, value) = rest.split_once(' ').unwrap_or((rest, ""));
            match controller.set_filter(name, value) {
                Ok(()) => print!("{}", output::format_filters(controller.filters())),
                Err(e) => eprintln!("{}", e),
            }
        }
        ":filters" => print!("{}", output::format_filters(controller.filters())),
        ":status" => print!("{}", status_line(controller)),
        ":clear" => {
            controller.clear_filters();
            println!("Filters cleared.");
        }
        ":pick" => {
            let picked = rest
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| controller.state().suggestions.get(i).cloned());
            match picked {
                Some(text) => {
                    let outcome = controller.select_suggestion(&text).await;
                    print_outcome(controller, outcome);
                }
                None => eprintln!("No suggestion '{}'", rest),
            }
        }
        ":country" => match rest.parse::<CountryCode>() {
            Ok(country) => {
                controller.set_country(country);
                println!("Store set to {}.", country);
            }
            Err(e) => eprintln!("{}", e),
        },
        ":categories" => match controller.load_categories().await {
            Ok(categories) => print!("{}", output::format_categories(categories)),
            Err(e) => eprintln!("Failed to load categories: {}", e),
        },
        ":kits" => print!("{}", output::format_kits(kits::KITS)),
        ":kit" => match kits::find(rest) {
            Some(kit) => print!("{}", output::format_kits(std::slice::from_ref(kit))),
            None => eprintln!("No kit named '{}'", rest),
        },
        _ if command.starts_with(':') => eprintln!("Unknown command {}, try :help", command),
        _ => controller.set_query(line),
    }
    true
}

fn status_line<B: SearchBackend>(controller: &SearchController<B>) -> String {
    let mode = if controller.advanced() {
        "advanced"
    } else {
        "basic"
    };
    let mut out = format!(
        "query: \"{}\" | store: {} | mode: {} | filters: {} | loading: {}\n",
        controller.query(),
        controller.country(),
        mode,
        if controller.has_active_filters() {
            "active"
        } else {
            "none"
        },
        controller.state().is_loading
    );
    if let Some(error) = controller.error() {
        out.push_str(&format!("last error: {}\n", error));
    }
    out
}

fn print_outcome<B: SearchBackend>(controller: &SearchController<B>, outcome: SearchOutcome) {
    match outcome {
        SearchOutcome::Completed => print!(
            "{}",
            output::format_search_results(controller.query(), controller.state(), usize::MAX)
        ),
        SearchOutcome::Skipped => eprintln!("Type a query first."),
        SearchOutcome::Failed(message) => eprintln!("Search failed: {}", message),
        SearchOutcome::Stale => {}
    }
}
