use super::keys::{canonical_params, QueryKey};
use super::observer::PageSource;
use super::params::{DiscoverMovieParams, TimeWindow};
use super::{Freshness, QuerySpec};
use crate::models::{Credits, Movie, MovieDetails, Paged};

pub const SCOPE: &str = "movies";

/// Prefix shared by every movie query, for bulk invalidation.
pub fn all() -> QueryKey {
    QueryKey::root(SCOPE)
}

pub fn trending(window: TimeWindow, page: u32) -> QuerySpec<Paged<Movie>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("trending").and(window.as_str()).and(page),
        format!("trending/movie/{}", window.as_str()),
        Freshness::List,
    )
    .param("page", page)
}

pub fn popular(page: u32) -> QuerySpec<Paged<Movie>> {
    list("popular", "movie/popular", page)
}

pub fn top_rated(page: u32) -> QuerySpec<Paged<Movie>> {
    list("top-rated", "movie/top_rated", page)
}

pub fn upcoming(page: u32) -> QuerySpec<Paged<Movie>> {
    list("upcoming", "movie/upcoming", page)
}

pub fn now_playing(page: u32) -> QuerySpec<Paged<Movie>> {
    list("now-playing", "movie/now_playing", page)
}

pub fn details(id: i32) -> QuerySpec<MovieDetails> {
    QuerySpec::new(
        all().and("details").and(id),
        format!("movie/{id}"),
        Freshness::Detail,
    )
    .enabled_if(id != 0)
}

pub fn credits(id: i32) -> QuerySpec<Credits> {
    QuerySpec::new(
        all().and("credits").and(id),
        format!("movie/{id}/credits"),
        Freshness::Detail,
    )
    .enabled_if(id != 0)
}

pub fn recommendations(id: i32, page: u32) -> QuerySpec<Paged<Movie>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("recommendations").and(id).and(page),
        format!("movie/{id}/recommendations"),
        Freshness::List,
    )
    .param("page", page)
    .enabled_if(id != 0)
}

pub fn similar(id: i32, page: u32) -> QuerySpec<Paged<Movie>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("similar").and(id).and(page),
        format!("movie/{id}/similar"),
        Freshness::List,
    )
    .param("page", page)
    .enabled_if(id != 0)
}

pub fn discover(params: &DiscoverMovieParams) -> QuerySpec<Paged<Movie>> {
    let query = params.to_query();
    QuerySpec::new(
        all().and("discover").and(canonical_params(&query)),
        "discover/movie",
        Freshness::List,
    )
    .params(query)
}

/// Discover results page by page under fixed filters; any `page` in
/// `params` is ignored.
pub fn discover_pages(params: &DiscoverMovieParams) -> PageSource<Movie> {
    let base = DiscoverMovieParams {
        page: None,
        ..params.clone()
    };
    let key = all()
        .and("discover-infinite")
        .and(canonical_params(&base.to_query()));
    PageSource::new(key, move |page| discover(&base.clone().page(page)))
}

pub fn popular_pages() -> PageSource<Movie> {
    PageSource::new(all().and("popular"), popular)
}

fn list(name: &str, path: &str, page: u32) -> QuerySpec<Paged<Movie>> {
    let page = page.max(1);
    QuerySpec::new(all().and(name).and(page), path, Freshness::List).param("page", page)
}
