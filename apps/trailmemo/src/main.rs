use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{HttpMemoStore, SyncCoordinator};
use map_controller::{DeleteStep, MapSession, MapStyle, SyncRequest};
use shared::{
    domain::{Coordinates, MemoId, UserId},
    format::{format_coordinates, format_relative_time},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bridge;
mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(about = "Browse and place geotagged memos on the trail map")]
struct Args {
    /// Memo store base URL, e.g. http://127.0.0.1:8000/api/v1
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    /// Signed-in user; only their memos can be moved or deleted.
    #[arg(long)]
    user: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the initial camera, the author directory and the visible markers.
    Markers {
        /// Show only these authors (repeatable).
        #[arg(long = "author")]
        authors: Vec<String>,
        #[arg(long, value_enum, default_value_t = StyleArg::Outdoors)]
        style: StyleArg,
    },
    Show {
        memo_id: String,
    },
    /// Place a text memo at a map position.
    Create {
        #[arg(long)]
        text: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        park: Option<String>,
    },
    /// Relocate one of your memos.
    Move {
        memo_id: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    Delete {
        memo_id: String,
        /// Without this flag the delete is only armed.
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Outdoors,
    Satellite,
    Streets,
}

impl From<StyleArg> for MapStyle {
    fn from(value: StyleArg) -> Self {
        match value {
            StyleArg::Outdoors => MapStyle::Outdoors,
            StyleArg::Satellite => MapStyle::Satellite,
            StyleArg::Streets => MapStyle::Streets,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(token) = args.token {
        settings.auth_token = Some(token);
    }
    if let Some(user) = args.user {
        settings.user_id = Some(UserId::new(user));
    }

    let mut store = HttpMemoStore::new(&settings.server_url)
        .with_context(|| format!("failed to configure memo store at '{}'", settings.server_url))?;
    if let Some(token) = settings.auth_token.clone() {
        store = store.with_bearer_token(token);
    }
    let coordinator = SyncCoordinator::new(Arc::new(store));
    let mut session = MapSession::new(settings.session_config());
    info!(server_url = %settings.server_url, limit = settings.load_limit, "map session starting");

    let request = session.refresh();
    run(&mut session, &coordinator, request).await?;
    if session.load_banner().is_some() {
        bail!("memo collection unavailable");
    }

    match args.command {
        Command::Markers { authors, style } => {
            for author in &authors {
                session.toggle_filter(&UserId::from(author.as_str()));
            }
            session.set_style(style.into());
            print_map(&mut session);
        }
        Command::Show { memo_id } => {
            let memo = coordinator
                .memo(&MemoId::new(memo_id))
                .await
                .context("failed to fetch memo")?;
            println!("{} by {}", memo.title.as_deref().unwrap_or("Untitled memo"), memo.user_name);
            println!("  {}", memo.text);
            if let Some(position) = memo.map_position() {
                println!("  at {}", format_coordinates(position));
            }
            if let Some(park) = &memo.park_name {
                println!("  in {park}");
            }
            println!("  {}", format_relative_time(memo.created_at, Utc::now()));
        }
        Command::Create {
            text,
            lat,
            lng,
            title,
            park,
        } => {
            session.start_new_memo()?;
            session.map_clicked(Coordinates::new(lat, lng))?;
            let request = session.submit_new_memo(&text, title.as_deref(), park.as_deref())?;
            run(&mut session, &coordinator, request).await?;
            println!("{}", session.memo_count_label());
        }
        Command::Move { memo_id, lat, lng } => {
            let memo_id = MemoId::new(memo_id);
            session.edit_location(Some(&memo_id))?;
            session.marker_drag_ended(&memo_id, Coordinates::new(lat, lng))?;
            let request = session.save_location()?;
            run(&mut session, &coordinator, request).await?;
            if let Some(position) = session.memo(&memo_id).and_then(|m| m.map_position()) {
                println!("{memo_id} now at {}", format_coordinates(position));
            }
        }
        Command::Delete { memo_id, confirm } => {
            let memo_id = MemoId::new(memo_id);
            session.request_delete(&memo_id)?;
            if !confirm {
                println!("Delete of {memo_id} armed; re-run with --confirm to delete.");
                return Ok(());
            }
            match session.request_delete(&memo_id)? {
                DeleteStep::Commit(request) => run(&mut session, &coordinator, request).await?,
                DeleteStep::Armed => bail!("delete of {memo_id} was not committed"),
            }
            println!("{}", session.memo_count_label());
        }
    }

    Ok(())
}

/// Executes a request, feeds every outcome back and fails on the first alert.
async fn run(
    session: &mut MapSession,
    coordinator: &SyncCoordinator,
    request: SyncRequest,
) -> Result<()> {
    for outcome in bridge::execute(coordinator, request).await {
        session.apply(outcome);
    }
    if let Some(alert) = session.take_alerts().into_iter().next() {
        bail!("{}: {}", alert.headline(), alert.message());
    }
    if let Some(banner) = session.load_banner() {
        eprintln!("{}: {}", banner.headline(), banner.message());
    }
    Ok(())
}

fn print_map(session: &mut MapSession) {
    let camera = session.mount_camera();
    let style = session.style();
    println!(
        "{} | {} | map centre {} zoom {}",
        session.memo_count_label(),
        session.filter().summary().label(),
        format_coordinates(camera.center),
        camera.zoom
    );
    println!("style: {} ({})", style.name(), style.description());

    println!("authors:");
    for author in session.authors() {
        let mark = if author.selected { "x" } else { " " };
        println!(
            "  [{mark}] {:<3} {} <{}> {}",
            author.initials, author.display_name, author.user_id, author.color
        );
    }

    println!("markers:");
    for marker in session.markers().iter() {
        println!(
            "  {:<3} {} at {} ({})",
            marker.initials,
            marker.memo_id,
            format_coordinates(marker.position),
            marker.color
        );
    }
}
