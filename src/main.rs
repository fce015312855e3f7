use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hearsay::api::ApiClient;
use hearsay::config::Config;
use hearsay::state::{AppState, SessionManager, Story};
use hearsay::storage::CredentialStore;

/// Get the config directory path (~/.config/hearsay/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("hearsay"))
}

#[derive(Parser, Debug)]
#[command(name = "hearsay", about = "A terminal client for a shared story service")]
struct Args {
    /// Override the service base URL from config
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in
    Signup {
        username: String,
        password: String,
        /// Display name shown on your profile
        name: String,
    },
    /// Sign in to an existing account
    Login { username: String, password: String },
    /// Sign out and forget the stored credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the story feed (fetches up to two pages)
    Stories {
        /// Only show stories you submitted
        #[arg(long)]
        mine: bool,
    },
    /// Fetch one more page of the feed at the given offset
    More { offset: usize },
    /// Submit a new story
    Submit {
        title: String,
        author: String,
        url: String,
    },
    /// Delete one of your stories by id
    Delete { id: String },
    /// Toggle a story's favorite status
    Fav { id: String },
    /// List your favorite story ids
    Favs,
    /// Remove all favorites
    ClearFavs,
    /// Search the loaded feed by title, author, poster, or hostname
    Search { query: String },
}

fn print_story(story: &Story, favorited: bool) {
    let marker = if favorited { "*" } else { " " };
    let host = story
        .hostname()
        .map(|h| format!(" ({h})"))
        .unwrap_or_default();
    println!(
        "{marker} [{id}] {title}{host} by {author}, posted by {owner}",
        id = story.id,
        title = story.title,
        author = story.author,
        owner = story.owner,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // The directory holds a bearer credential: user-only access on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&config_dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;
    let base_url = args.api_url.unwrap_or(config.api_base_url);

    let http = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    let api = ApiClient::with_http(http, base_url);

    let store = CredentialStore::new(config_dir.join("credentials.toml"));
    let mut app = AppState::new(SessionManager::new(store));

    match args.command {
        Command::Signup {
            username,
            password,
            name,
        } => {
            app.signup(&api, &username, &password, &name).await?;
            println!("Welcome, {name}! Signed in as {username}.");
        }
        Command::Login { username, password } => {
            app.login(&api, &username, &password).await?;
            if let Some(session) = app.session.current() {
                println!("Signed in as {} ({}).", session.username, session.display_name);
            }
        }
        Command::Logout => {
            app.logout();
            println!("Signed out.");
        }
        Command::Whoami => {
            app.restore(&api).await;
            match app.session.current() {
                Some(session) => println!("{} ({})", session.username, session.display_name),
                None => println!("Not signed in."),
            }
        }
        Command::Stories { mine } => {
            app.restore(&api).await;
            app.load_feed(&api).await?;
            if mine {
                for story in app.own_stories().to_vec() {
                    print_story(&story, app.favorites.contains(&story.id));
                }
            } else {
                for story in app.feed.snapshot() {
                    print_story(&story, app.favorites.contains(&story.id));
                }
            }
        }
        Command::More { offset } => {
            app.restore(&api).await;
            let added = app.load_more(&api, offset).await?;
            println!("Fetched {added} more stories.");
            for story in app.feed.snapshot() {
                print_story(&story, app.favorites.contains(&story.id));
            }
        }
        Command::Submit { title, author, url } => {
            app.restore(&api).await;
            let story = app.submit_story(&api, &title, &author, &url).await?;
            println!("Submitted story {}.", story.id);
        }
        Command::Delete { id } => {
            app.restore(&api).await;
            // Ownership is checked against the local feed entry.
            app.load_feed(&api).await?;
            app.delete_story(&api, &id).await?;
            println!("Deleted story {id}.");
        }
        Command::Fav { id } => {
            app.restore(&api).await;
            let favorited = app.toggle_favorite(&api, &id).await?;
            if favorited {
                println!("Story {id} favorited.");
            } else {
                println!("Story {id} unfavorited.");
            }
        }
        Command::Favs => {
            if !app.restore(&api).await {
                anyhow::bail!("sign in required");
            }
            if app.favorites.is_empty() {
                println!("No favorites.");
            } else {
                let mut ids: Vec<&str> = app.favorites.ids().collect();
                ids.sort_unstable();
                for id in ids {
                    println!("{id}");
                }
            }
        }
        Command::ClearFavs => {
            app.restore(&api).await;
            app.clear_favorites(&api).await?;
            println!("All favorites removed.");
        }
        Command::Search { query } => {
            // Empty queries are rejected here, upstream of the filter engine.
            if query.trim().is_empty() {
                anyhow::bail!("search query must not be empty");
            }
            app.restore(&api).await;
            app.load_feed(&api).await?;
            let hits: Vec<Story> = app.search(&query).into_iter().cloned().collect();
            if hits.is_empty() {
                println!("No matches.");
            } else {
                for story in hits {
                    print_story(&story, app.favorites.contains(&story.id));
                }
            }
        }
    }

    Ok(())
}
