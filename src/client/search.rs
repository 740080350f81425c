use super::keys::QueryKey;
use super::observer::PageSource;
use super::{Freshness, QuerySpec};
use crate::models::{CatalogItem, Movie, Paged, TvShow};

pub const SCOPE: &str = "search";

/// Shorter queries never reach the network.
pub const MIN_QUERY_CHARS: usize = 2;

pub fn all() -> QueryKey {
    QueryKey::root(SCOPE)
}

pub fn is_searchable(query: &str) -> bool {
    query.chars().count() >= MIN_QUERY_CHARS
}

pub fn multi(query: &str, page: u32) -> QuerySpec<Paged<CatalogItem>> {
    search("multi", "search/multi", query, page)
}

pub fn movies(query: &str, page: u32) -> QuerySpec<Paged<Movie>> {
    search("movies", "search/movie", query, page)
}

pub fn tv_shows(query: &str, page: u32) -> QuerySpec<Paged<TvShow>> {
    search("tv-shows", "search/tv", query, page)
}

pub fn multi_pages(query: &str) -> PageSource<CatalogItem> {
    let owned = query.to_string();
    PageSource::new(all().and("multi-infinite").and(query), move |page| {
        multi(&owned, page)
    })
    .enabled_if(is_searchable(query))
}

fn search<T>(name: &str, path: &str, query: &str, page: u32) -> QuerySpec<Paged<T>> {
    let page = page.max(1);
    QuerySpec::new(all().and(name).and(query).and(page), path, Freshness::List)
        .param("query", query)
        .param("page", page)
        .enabled_if(is_searchable(query))
}
