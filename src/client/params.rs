use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            _ => Err(anyhow!("time window must be 'day' or 'week'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortBy {
    PopularityAsc,
    PopularityDesc,
    VoteAverageAsc,
    VoteAverageDesc,
    ReleaseDateAsc,
    ReleaseDateDesc,
    PrimaryReleaseDateAsc,
    PrimaryReleaseDateDesc,
    FirstAirDateAsc,
    FirstAirDateDesc,
}

/// Vote floor applied to rating sorts so single-vote titles don't top the list.
pub const RATING_SORT_MIN_VOTES: u32 = 100;

impl SortBy {
    pub fn is_vote_average(&self) -> bool {
        matches!(self, SortBy::VoteAverageAsc | SortBy::VoteAverageDesc)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::PopularityAsc => "popularity.asc",
            SortBy::PopularityDesc => "popularity.desc",
            SortBy::VoteAverageAsc => "vote_average.asc",
            SortBy::VoteAverageDesc => "vote_average.desc",
            SortBy::ReleaseDateAsc => "release_date.asc",
            SortBy::ReleaseDateDesc => "release_date.desc",
            SortBy::PrimaryReleaseDateAsc => "primary_release_date.asc",
            SortBy::PrimaryReleaseDateDesc => "primary_release_date.desc",
            SortBy::FirstAirDateAsc => "first_air_date.asc",
            SortBy::FirstAirDateDesc => "first_air_date.desc",
        }
    }
}

impl FromStr for SortBy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        let sort = match s {
            "popularity.asc" => SortBy::PopularityAsc,
            "popularity.desc" => SortBy::PopularityDesc,
            "vote_average.asc" => SortBy::VoteAverageAsc,
            "vote_average.desc" => SortBy::VoteAverageDesc,
            "release_date.asc" => SortBy::ReleaseDateAsc,
            "release_date.desc" => SortBy::ReleaseDateDesc,
            "primary_release_date.asc" => SortBy::PrimaryReleaseDateAsc,
            "primary_release_date.desc" => SortBy::PrimaryReleaseDateDesc,
            "first_air_date.asc" => SortBy::FirstAirDateAsc,
            "first_air_date.desc" => SortBy::FirstAirDateDesc,
            other => return Err(anyhow!("unknown sort order '{}'", other)),
        };
        Ok(sort)
    }
}

/// Recognized discover-movie filters. Unset fields are left off the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DiscoverMovieParams {
    pub page: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub year: Option<i32>,
    pub primary_release_year: Option<i32>,
    /// Comma-separated genre ids, as the upstream expects.
    pub with_genres: Option<String>,
    /// Sent as `vote_count.gte`.
    pub vote_count_gte: Option<u32>,
}

impl DiscoverMovieParams {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    /// A rating sort also sets the vote floor unless one is already set.
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort);
        if sort.is_vote_average() && self.vote_count_gte.is_none() {
            self.vote_count_gte = Some(RATING_SORT_MIN_VOTES);
        }
        self
    }

    pub fn vote_count_gte(mut self, votes: u32) -> Self {
        self.vote_count_gte = Some(votes);
        self
    }

    pub fn genres(mut self, ids: &[i32]) -> Self {
        self.with_genres = genre_filter(ids);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        push_opt(&mut out, "page", self.page);
        push_opt(&mut out, "sort_by", self.sort_by.map(|s| s.as_str()));
        push_opt(&mut out, "year", self.year);
        push_opt(&mut out, "primary_release_year", self.primary_release_year);
        push_opt(&mut out, "with_genres", self.with_genres.as_deref());
        push_opt(&mut out, "vote_count.gte", self.vote_count_gte);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DiscoverTvParams {
    pub page: Option<u32>,
    pub sort_by: Option<SortBy>,
    pub first_air_date_year: Option<i32>,
    pub with_genres: Option<String>,
    pub vote_count_gte: Option<u32>,
}

impl DiscoverTvParams {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page.max(1));
        self
    }

    /// A rating sort also sets the vote floor unless one is already set.
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort);
        if sort.is_vote_average() && self.vote_count_gte.is_none() {
            self.vote_count_gte = Some(RATING_SORT_MIN_VOTES);
        }
        self
    }

    pub fn vote_count_gte(mut self, votes: u32) -> Self {
        self.vote_count_gte = Some(votes);
        self
    }

    pub fn genres(mut self, ids: &[i32]) -> Self {
        self.with_genres = genre_filter(ids);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        push_opt(&mut out, "page", self.page);
        push_opt(&mut out, "sort_by", self.sort_by.map(|s| s.as_str()));
        push_opt(&mut out, "first_air_date_year", self.first_air_date_year);
        push_opt(&mut out, "with_genres", self.with_genres.as_deref());
        push_opt(&mut out, "vote_count.gte", self.vote_count_gte);
        out
    }
}

fn genre_filter(ids: &[i32]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    Some(
        ids.iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(","),
    )
}

// Empty strings count as unset.
fn push_opt<V: ToString>(out: &mut Vec<(String, String)>, key: &str, value: Option<V>) {
    if let Some(v) = value {
        let v = v.to_string();
        if !v.is_empty() {
            out.push((key.to_string(), v));
        }
    }
}
