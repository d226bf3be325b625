use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{DashboardApi, FetchPhase, ListFetchController, ResourceFetcher};
use serde::Serialize;
use shared::{
    domain::{StoryFeed, UserId},
    protocol::PageQuery,
};

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    limit: Option<u32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Stories {
        #[arg(long, default_value = "fresh")]
        feed: String,
    },
    Categories,
    Comments {
        user_id: i64,
    },
    Likes {
        user_id: i64,
    },
    Replies {
        user_id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let settings = load_settings();

    let base_url = cli.api_base_url.unwrap_or(settings.api_base_url);
    let api = DashboardApi::new(&base_url, Duration::from_secs(settings.request_timeout_secs))?;
    let query = PageQuery::new(cli.page, cli.limit.unwrap_or(settings.page_limit));

    match cli.command {
        Command::Stories { feed } => {
            let feed = parse_feed(&feed)?;
            print_page(Arc::new(api.stories(feed)), query).await
        }
        Command::Categories => print_page(Arc::new(api.categories()), query).await,
        Command::Comments { user_id } => {
            print_page(Arc::new(api.user_comments(UserId(user_id))), query).await
        }
        Command::Likes { user_id } => {
            print_page(Arc::new(api.user_likes(UserId(user_id))), query).await
        }
        Command::Replies { user_id } => {
            print_page(Arc::new(api.user_replies(UserId(user_id))), query).await
        }
    }
}

fn parse_feed(raw: &str) -> Result<StoryFeed> {
    if raw.eq_ignore_ascii_case("fresh") {
        Ok(StoryFeed::Fresh)
    } else if raw.eq_ignore_ascii_case("top") {
        Ok(StoryFeed::Top)
    } else if raw.eq_ignore_ascii_case("popular") {
        Ok(StoryFeed::Popular)
    } else {
        anyhow::bail!("unknown feed '{raw}', expected fresh, top or popular")
    }
}

async fn print_page<T, F>(fetcher: Arc<F>, query: PageQuery) -> Result<()>
where
    T: Clone + Send + Sync + Serialize + 'static,
    F: ResourceFetcher<T> + 'static,
{
    let controller = ListFetchController::new(fetcher as Arc<dyn ResourceFetcher<T>>, query)?;
    let mut updates = controller.subscribe();
    controller.refresh();

    loop {
        updates.changed().await?;
        let snapshot = updates.borrow_and_update().clone();
        match snapshot.phase {
            FetchPhase::Success => {
                println!("{}", serde_json::to_string_pretty(&snapshot.items)?);
                return Ok(());
            }
            FetchPhase::Error => {
                let failure = snapshot
                    .error
                    .map(|failure| failure.message)
                    .unwrap_or_else(|| "unrecorded failure".to_string());
                anyhow::bail!("fetch failed: {failure}");
            }
            FetchPhase::Idle | FetchPhase::Loading => {}
        }
    }
}
