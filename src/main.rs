use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use story_client::aggregate::{AuthAggregator, FeedRequest, StoryAggregator};
use story_client::feed::{FeedConfig, FeedPaginator};
use story_client::format::format_created_at;
use story_client::location::{LocationResolver, NoopGeocoder};
use story_client::model::StoryItem;
use story_client::notify::{NotificationPresenter, StoryNotification, StoryNotifier};
use story_client::remote::{HttpStoryApi, StoryApi};
use story_client::state::{Database, FavoriteStore, Preferences, SessionStore, ViewState};
use story_client::Config;

/// Command line front end for the story client
#[derive(Debug, Parser)]
#[command(name = "story-client", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session
    Login { email: String, password: String },
    /// Create an account
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Show the story feed
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show one story
    Detail { id: String },
    /// List favorited stories
    Favorites,
    /// Favorite a story, or un-favorite it if it already is
    Favorite { id: String },
    /// Stories with a location
    Map,
    /// Post a new story
    Post {
        description: String,
        photo: PathBuf,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },
    /// Announce the newest story if it is new
    Notify,
    /// Forget the stored session
    Logout,
}

/// Prints notifications to the terminal
struct TerminalPresenter;

impl NotificationPresenter for TerminalPresenter {
    fn show(&self, notification: &StoryNotification) {
        println!("🔔 {}\n   {}", notification.title, notification.preview);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("story_client=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    // Composition root: every store is built once here and passed down
    let db = Database::open(&config.db_path).context("Failed to open database")?;
    let prefs = Preferences::new(db.clone());
    let session = SessionStore::new(prefs.clone())?;
    let favorites = FavoriteStore::new(db)?;

    let api: Arc<dyn StoryApi> = Arc::new(HttpStoryApi::new(
        &config.base_url,
        config.http_timeout,
        session.clone(),
    )?);
    let resolver = Arc::new(LocationResolver::new(Arc::new(NoopGeocoder)));
    let feed = FeedPaginator::new(
        api.clone(),
        FeedConfig {
            page_size: config.page_size,
            with_location: false,
        },
    );

    let auth = AuthAggregator::new(api.clone(), session.clone());
    let stories = StoryAggregator::new(
        api.clone(),
        feed,
        favorites,
        resolver,
        Some(config.cache_dir.clone()),
    );

    info!(splash = ?auth.splash_state(), "Client ready");

    match cli.command {
        Command::Login { email, password } => {
            auth.on_email_change(&email);
            auth.on_password_change(&password);
            auth.login().await;
            match auth.state().auth {
                ViewState::Success(session) => println!("✅ Logged in as {}", session.name),
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Register { name, email, password } => {
            auth.on_name_change(&name);
            auth.on_email_change(&email);
            auth.on_password_change(&password);
            auth.register().await;
            match auth.state().register {
                ViewState::Success(response) => println!("✅ {}", response.message),
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Feed { pages } => {
            stories.load_feed(FeedRequest::Refresh).await;
            for _ in 1..pages {
                if stories.state().feed.data().map_or(true, |feed| feed.complete) {
                    break;
                }
                stories.load_feed(FeedRequest::NextPage).await;
            }
            stories.settle().await;

            match stories.state().feed {
                ViewState::Success(feed) => {
                    feed.items.iter().for_each(print_item);
                    if feed.complete {
                        println!("(end of feed)");
                    }
                }
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Detail { id } => {
            stories.load_detail(&id).await;
            match stories.state().detail {
                ViewState::Success(item) => {
                    print_item(&item);
                    if let Some(url) = &item.story.photo_url {
                        println!("   {}", url);
                    }
                }
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Favorites => {
            let items = stories.favorite_items();
            if items.is_empty() {
                println!("No favorites yet.");
            }
            items.iter().for_each(print_item);
        }
        Command::Favorite { id } => {
            stories.load_detail(&id).await;
            let item = match stories.state().detail {
                ViewState::Success(item) => item,
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => bail!("Story not loaded"),
            };

            let currently = stories.is_favorite(&id).get();
            stories.toggle_favorite(&item.story, currently)?;
            if currently {
                println!("💔 Removed {} from favorites", id);
            } else {
                println!("❤️  Added {} to favorites", id);
            }
        }
        Command::Map => {
            stories.load_for_map().await;
            match stories.state().map {
                ViewState::Success(list) => {
                    for story in list {
                        if let Some((lat, lon)) = story.coordinates() {
                            println!("📍 {:>10.5} {:>11.5}  {} ({})", lat, lon, story.name, story.id);
                        }
                    }
                }
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Post { description, photo, lat, lon } => {
            let coordinates = lat.zip(lon);
            stories.submit_story(&description, Some(&photo), coordinates).await;
            match stories.state().add_story {
                ViewState::Success(response) => println!("✅ {}", response.message),
                ViewState::Error(message) => bail!(message),
                ViewState::Idle | ViewState::Loading => {}
            }
        }
        Command::Notify => {
            let notifier = StoryNotifier::new(api, prefs, Arc::new(TerminalPresenter));
            if notifier.check_latest().await?.is_none() {
                println!("No new stories.");
            }
        }
        Command::Logout => {
            auth.logout()?;
            println!("👋 Logged out");
        }
    }

    Ok(())
}

fn print_item(item: &StoryItem) {
    let story = &item.story;
    println!("• {} ({})", story.name, format_created_at(&story.created_at));
    println!("  {}", story.description);
    if let Some(place) = &item.location_name {
        println!("  📍 {}", place);
    }
}
