use super::keys::QueryKey;
use super::{FetchError, Freshness, QueryClient, QuerySpec};
use crate::models::{Genre, GenreList};

pub const SCOPE: &str = "genres";

pub fn all() -> QueryKey {
    QueryKey::root(SCOPE)
}

pub fn movie() -> QuerySpec<GenreList> {
    QuerySpec::new(all().and("movie"), "genre/movie/list", Freshness::Taxonomy)
}

pub fn tv() -> QuerySpec<GenreList> {
    QuerySpec::new(all().and("tv"), "genre/tv/list", Freshness::Taxonomy)
}

pub async fn movie_genres(client: &QueryClient) -> Result<Vec<Genre>, FetchError> {
    Ok(client.fetch(&movie()).await?.genres)
}

pub async fn tv_genres(client: &QueryClient) -> Result<Vec<Genre>, FetchError> {
    Ok(client.fetch(&tv()).await?.genres)
}
