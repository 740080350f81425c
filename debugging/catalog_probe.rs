//! Drive the catalog data-fetch layer against a running gateway and print
//! what comes back.
//! Usage:
//!   cargo run --bin catalog_probe -- trending [day|week]
//!   cargo run --bin catalog_probe -- popular [page]
//!   cargo run --bin catalog_probe -- details <movie|tv> <id>
//!   cargo run --bin catalog_probe -- search <query>
//!   cargo run --bin catalog_probe -- discover-all <movie|tv> [genre_id] [max_pages]
//! CATALOG_URL overrides the gateway (default http://localhost:3000/api/catalog).

use anyhow::{anyhow, Context, Result};
use cinecatalog::client::{
    genres, movies, search, tv, DiscoverMovieParams, DiscoverTvParams, HttpTransport,
    InfiniteQuery, Lookup, QueryClient, TimeWindow,
};
use cinecatalog::models::CatalogItem;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

const DEFAULT_CATALOG_URL: &str = "http://localhost:3000/api/catalog";

#[derive(Debug, Clone, Copy, PartialEq)]
enum MediaKind {
    Movie,
    Tv,
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            _ => Err(anyhow!("media kind must be 'movie' or 'tv'")),
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin catalog_probe -- trending [day|week]");
    eprintln!("       cargo run --bin catalog_probe -- popular [page]");
    eprintln!("       cargo run --bin catalog_probe -- details <movie|tv> <id>");
    eprintln!("       cargo run --bin catalog_probe -- search <query>");
    eprintln!("       cargo run --bin catalog_probe -- discover-all <movie|tv> [genre_id] [max_pages]");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let base = env::var("CATALOG_URL").unwrap_or_else(|_| DEFAULT_CATALOG_URL.to_string());
    let client = QueryClient::new(Arc::new(HttpTransport::new(base)?));

    match args[1].as_str() {
        "trending" => {
            let window = match args.get(2) {
                Some(w) => TimeWindow::from_str(w)?,
                None => TimeWindow::default(),
            };
            let page = client.fetch(&movies::trending(window, 1)).await?;
            for m in &page.results {
                println!("{:>8}  {:<40} {:.1}", m.id, m.title, m.vote_average);
            }
        }
        "popular" => {
            let page_no: u32 = match args.get(2) {
                Some(p) => p.parse().context("page must be a positive integer")?,
                None => 1,
            };
            let page = client.fetch(&movies::popular(page_no)).await?;
            println!("page {}/{}", page.page, page.total_pages);
            for m in &page.results {
                println!("{:>8}  {}", m.id, m.title);
            }
        }
        "details" => {
            let kind = MediaKind::from_str(args.get(2).map(String::as_str).unwrap_or_else(|| usage()))?;
            let id: i32 = args
                .get(3)
                .unwrap_or_else(|| usage())
                .parse()
                .context("id must be an integer")?;
            print_details(&client, kind, id).await?;
        }
        "search" => {
            let query = args[2..].join(" ");
            if !search::is_searchable(&query) {
                return Err(anyhow!(
                    "query must be at least {} characters",
                    search::MIN_QUERY_CHARS
                ));
            }
            let page = client.fetch(&search::multi(&query, 1)).await?;
            println!("{} results", page.total_results);
            for item in &page.results {
                let kind = match item {
                    CatalogItem::Movie(_) => "movie",
                    CatalogItem::Tv(_) => "tv",
                    CatalogItem::Person(_) => "person",
                };
                println!("{:>8}  {:<7} {}", item.id(), kind, item.display_name());
            }
        }
        "discover-all" => {
            let kind = MediaKind::from_str(args.get(2).map(String::as_str).unwrap_or_else(|| usage()))?;
            let genre: Option<i32> = args
                .get(3)
                .map(|g| g.parse().context("genre id must be an integer"))
                .transpose()?;
            let max_pages: usize = match args.get(4) {
                Some(m) => m.parse().context("max_pages must be an integer")?,
                None => 5,
            };
            discover_all(&client, kind, genre, max_pages).await?;
        }
        _ => usage(),
    }

    Ok(())
}

async fn print_details(client: &QueryClient, kind: MediaKind, id: i32) -> Result<()> {
    match kind {
        MediaKind::Movie => {
            let detail_spec = movies::details(id);
            let credits_spec = movies::credits(id);
            let (detail, credits) = tokio::join!(
                client.details_or_not_found(&detail_spec),
                client.fetch(&credits_spec),
            );
            let Lookup::Found(detail) = detail else {
                println!("movie {id} not found");
                return Ok(());
            };
            println!("{} ({})", detail.title, detail.release_date.unwrap_or_default());
            println!("runtime: {:?} min", detail.runtime);
            let genre_names: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
            println!("genres: {}", genre_names.join(", "));
            if let Ok(credits) = credits {
                println!("director: {}", credits.directors().join(", "));
                for c in credits.billed_cast().into_iter().take(10) {
                    println!("  {} as {}", c.name, c.character);
                }
            }
        }
        MediaKind::Tv => {
            let detail_spec = tv::details(id);
            let Lookup::Found(detail) = client.details_or_not_found(&detail_spec).await else {
                println!("tv show {id} not found");
                return Ok(());
            };
            println!(
                "{} ({} seasons, {} episodes)",
                detail.name, detail.number_of_seasons, detail.number_of_episodes
            );
            println!("status: {}", detail.status.unwrap_or_default());
        }
    }
    Ok(())
}

async fn discover_all(
    client: &QueryClient,
    kind: MediaKind,
    genre: Option<i32>,
    max_pages: usize,
) -> Result<()> {
    let genre_ids: Vec<i32> = genre.into_iter().collect();
    match kind {
        MediaKind::Movie => {
            let known = genres::movie_genres(client).await?;
            if let Some(g) = known.iter().find(|g| Some(g.id) == genre) {
                println!("genre: {}", g.name);
            }
            let query = InfiniteQuery::new(
                client.clone(),
                movies::discover_pages(&DiscoverMovieParams::default().genres(&genre_ids)),
            );
            let snapshot = query.fetch_all(Some(max_pages)).await;
            if let Some(err) = snapshot.error.as_ref() {
                return Err(anyhow!("discover failed: {}", err));
            }
            for m in snapshot.items() {
                println!("{:>8}  {}", m.id, m.title);
            }
            println!(
                "{} pages fetched, more available: {}",
                snapshot.pages.len(),
                snapshot.has_next_page
            );
        }
        MediaKind::Tv => {
            let known = genres::tv_genres(client).await?;
            if let Some(g) = known.iter().find(|g| Some(g.id) == genre) {
                println!("genre: {}", g.name);
            }
            let query = InfiniteQuery::new(
                client.clone(),
                tv::discover_pages(&DiscoverTvParams::default().genres(&genre_ids)),
            );
            let snapshot = query.fetch_all(Some(max_pages)).await;
            if let Some(err) = snapshot.error.as_ref() {
                return Err(anyhow!("discover failed: {}", err));
            }
            for show in snapshot.items() {
                println!("{:>8}  {}", show.id, show.name);
            }
            println!(
                "{} pages fetched, more available: {}",
                snapshot.pages.len(),
                snapshot.has_next_page
            );
        }
    }
    Ok(())
}
