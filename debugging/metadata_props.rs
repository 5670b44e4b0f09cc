//! Fetch one movie from the metadata service and print what the app derives from it.
//! Usage:
//!   cargo run --bin metadata_props -- <tmdb_id>
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cineview::config::Config;
use cineview::tmdb::{
    pick_trailer_url, pick_trailer_url_with, to_internal_movie, MetadataApi, TmdbClient,
    TrailerPolicy,
};
use dotenvy::dotenv;
use serde_json::json;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run --bin metadata_props -- <tmdb_id>");
        std::process::exit(1);
    }
    let tmdb_id: i64 = args[1].parse().context("tmdb_id must be an integer")?;

    let config = Config::from_env()?;
    let client = TmdbClient::from_config(&config)?;

    let (detail, videos) = tokio::try_join!(client.movie(tmdb_id), client.videos(tmdb_id))?;

    println!("Raw detail:");
    println!("{}", serde_json::to_string_pretty(&detail)?);

    println!("\nVideos ({}):", videos.len());
    for v in &videos {
        println!("  {:<10} {:<10} {}", v.site, v.video_type, v.key);
    }

    let mut internal = to_internal_movie(&detail.movie);
    internal.trailer_url = pick_trailer_url_with(&videos, config.trailer_policy);

    let mapped = json!({
        "internal_movie": internal,
        "genres": detail.genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
        "trailer_strict": pick_trailer_url(&videos),
        "trailer_with_teasers": pick_trailer_url_with(&videos, TrailerPolicy::TrailerOrTeaser),
    });
    println!("\nMapped:");
    println!("{}", serde_json::to_string_pretty(&mapped)?);

    Ok(())
}
