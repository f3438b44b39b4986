//! iPost Feed Example
//!
//! Walks through the feed data layer:
//! - Opening a record store (in memory, or on disk when a directory is given)
//! - Seeding the default users on first load
//! - Reading the feed newest first
//! - Posting as the selected user and reconciling the refresh
//! - Watching an older response get discarded
//!
//! Run with: cargo run -p rust_feed [-- <store-dir>]
//! Set RUST_LOG=debug to see the coordinator at work.

use ipost_core::{
    CoordinatorConfig, Delivery, FeedConfig, FeedRepository, FeedScreen, InMemoryPreferences,
    JsonFilePreferences, PostSnapshot, PreferenceStore, StoreCoordinator,
};
use ipost_store::RecordStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("iPost Feed Example");
    println!("==================\n");

    match std::env::args().nth(1).map(PathBuf::from) {
        Some(dir) => {
            let store = RecordStore::open(&dir)?;
            let prefs = JsonFilePreferences::open(dir.join("preferences.json"))?;
            println!("[OK] Store opened at {}", dir.display());
            run(store, prefs).await
        }
        None => {
            let store = RecordStore::open_in_memory()?;
            println!("[OK] In-memory store opened");
            run(store, InMemoryPreferences::new()).await
        }
    }
}

async fn run<P: PreferenceStore>(
    store: RecordStore,
    prefs: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = StoreCoordinator::with_store(store, CoordinatorConfig::default())?;
    let repository = FeedRepository::new(coordinator.clone(), prefs, FeedConfig::default());
    let mut screen = FeedScreen::new(repository);

    screen.load_initial().await?;
    println!("\n[*] Users:");
    for user in screen.users() {
        println!("  {} {} ({})", user.icon, user.name, user.handle);
    }
    if let Some(user) = screen.selected_user() {
        println!("[OK] Posting as {}", user.handle);
    }

    println!("\n[*] Feed:");
    print_feed(screen.state().posts());

    // an older refresh still in flight when a post is made
    let stale = screen.issue_refresh();
    let (post, refresh) = screen
        .submit_post("Hello from the Rust feed demo!", None)
        .await?;
    println!("\n[+] Posted {} (shown before the refresh returns)", post.id);

    let refreshed = refresh.response().await;
    let older = stale.response().await;
    let applied = screen.deliver(refreshed);
    let discarded = screen.deliver(older);
    println!("[OK] Refresh: {applied:?}, older refresh: {discarded:?}");
    debug_assert_eq!(discarded, Delivery::Stale);

    println!("\n[*] Feed:");
    print_feed(screen.state().posts());

    let store = coordinator.detach().await?;
    println!(
        "\n[#] {} users, {} posts, last commit #{}",
        store.users().len(),
        store.posts().len(),
        store.committed_seq()
    );
    Ok(())
}

fn print_feed(posts: &[PostSnapshot]) {
    for post in posts {
        let author = post.author.as_ref().map_or("?", |a| a.handle.as_str());
        let image = post.image.as_deref().map(|i| format!(" [{i}]")).unwrap_or_default();
        println!(
            "  {} {}: {}{}",
            post.timestamp.format("%H:%M:%S"),
            author,
            post.text,
            image
        );
    }
}
