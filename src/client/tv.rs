use super::keys::{canonical_params, QueryKey};
use super::observer::PageSource;
use super::params::{DiscoverTvParams, TimeWindow};
use super::{Freshness, QuerySpec};
use crate::models::{Credits, Paged, TvShow, TvShowDetails};

pub const SCOPE: &str = "tv-shows";

pub fn all() -> QueryKey {
    QueryKey::root(SCOPE)
}

pub fn trending(window: TimeWindow, page: u32) -> QuerySpec<Paged<TvShow>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("trending").and(window.as_str()).and(page),
        format!("trending/tv/{}", window.as_str()),
        Freshness::List,
    )
    .param("page", page)
}

pub fn popular(page: u32) -> QuerySpec<Paged<TvShow>> {
    list("popular", "tv/popular", page)
}

pub fn top_rated(page: u32) -> QuerySpec<Paged<TvShow>> {
    list("top-rated", "tv/top_rated", page)
}

pub fn on_the_air(page: u32) -> QuerySpec<Paged<TvShow>> {
    list("on-the-air", "tv/on_the_air", page)
}

pub fn airing_today(page: u32) -> QuerySpec<Paged<TvShow>> {
    list("airing-today", "tv/airing_today", page)
}

pub fn details(id: i32) -> QuerySpec<TvShowDetails> {
    QuerySpec::new(all().and("details").and(id), format!("tv/{id}"), Freshness::Detail)
        .enabled_if(id != 0)
}

pub fn credits(id: i32) -> QuerySpec<Credits> {
    QuerySpec::new(
        all().and("credits").and(id),
        format!("tv/{id}/credits"),
        Freshness::Detail,
    )
    .enabled_if(id != 0)
}

pub fn recommendations(id: i32, page: u32) -> QuerySpec<Paged<TvShow>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("recommendations").and(id).and(page),
        format!("tv/{id}/recommendations"),
        Freshness::List,
    )
    .param("page", page)
    .enabled_if(id != 0)
}

pub fn similar(id: i32, page: u32) -> QuerySpec<Paged<TvShow>> {
    let page = page.max(1);
    QuerySpec::new(
        all().and("similar").and(id).and(page),
        format!("tv/{id}/similar"),
        Freshness::List,
    )
    .param("page", page)
    .enabled_if(id != 0)
}

pub fn discover(params: &DiscoverTvParams) -> QuerySpec<Paged<TvShow>> {
    let query = params.to_query();
    QuerySpec::new(
        all().and("discover").and(canonical_params(&query)),
        "discover/tv",
        Freshness::List,
    )
    .params(query)
}

pub fn discover_pages(params: &DiscoverTvParams) -> PageSource<TvShow> {
    let base = DiscoverTvParams {
        page: None,
        ..params.clone()
    };
    let key = all()
        .and("discover-infinite")
        .and(canonical_params(&base.to_query()));
    PageSource::new(key, move |page| discover(&base.clone().page(page)))
}

fn list(name: &str, path: &str, page: u32) -> QuerySpec<Paged<TvShow>> {
    let page = page.max(1);
    QuerySpec::new(all().and(name).and(page), path, Freshness::List).param("page", page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tv_keys_live_under_their_own_scope() {
        assert_eq!(popular(1).key().to_string(), "tv-shows/popular/1");
        assert_ne!(
            popular(1).key(),
            crate::client::movies::popular(1).key()
        );
        assert_eq!(airing_today(1).path(), "tv/airing_today");
        assert_eq!(trending(TimeWindow::Week, 1).path(), "trending/tv/week");
    }

    #[test]
    fn zero_id_disables_detail_operations() {
        assert!(!details(0).is_enabled());
        assert!(!similar(0, 1).is_enabled());
        assert_eq!(credits(1399).path(), "tv/1399/credits");
    }

    #[test]
    fn page_zero_is_sent_as_first_page() {
        assert_eq!(on_the_air(0).key(), on_the_air(1).key());
        assert_eq!(
            recommendations(1399, 0).query(),
            &[("page".to_string(), "1".to_string())]
        );
        assert_eq!(
            crate::client::search::tv_shows("dark", 0).key().to_string(),
            "search/tv-shows/dark/1"
        );
    }

    #[test]
    fn discover_uses_first_air_date_year() {
        let spec = discover(&DiscoverTvParams {
            first_air_date_year: Some(2011),
            ..Default::default()
        });
        assert_eq!(
            spec.query(),
            &[("first_air_date_year".to_string(), "2011".to_string())]
        );
        assert_eq!(spec.key().to_string(), "tv-shows/discover/first_air_date_year=2011");
    }
}
