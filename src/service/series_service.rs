//! Series catalogue: lookup, fuzzy matching and release bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use log::info;

use crate::feed::FeedEntry;
use crate::model::SeriesChange;
use crate::model::SeriesModel;
use crate::repository::Repository;
use crate::service::error::ServiceError;
use crate::service::fuzzy;

/// Score given to an exact shortname hit.
pub const EXACT_SCORE: u8 = 100;

/// Fuzzy matches scoring below this are treated as no match.
pub const MATCH_CUTOFF: u8 = 60;

/// Result of resolving user input to a series.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesMatch {
    pub title: String,
    pub score: u8,
}

pub struct SeriesService {
    db: Arc<Repository>,
}

impl SeriesService {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Resolves free-form input to a series title.
    ///
    /// A case-insensitive shortname hit scores [`EXACT_SCORE`]; anything else
    /// is fuzzy-matched against the titles, and scores under [`MATCH_CUTOFF`]
    /// count as no match.
    pub async fn match_series(&self, term: &str) -> Result<Option<SeriesMatch>, ServiceError> {
        let pairs = self.db.series.shortnames().await?;
        Ok(match_in(term, &pairs))
    }

    pub async fn get(&self, title: &str) -> Result<Option<SeriesModel>, ServiceError> {
        Ok(self.db.series.select_by_title(title).await?)
    }

    pub async fn get_by_shortname(&self, shortname: &str) -> Result<Option<SeriesModel>, ServiceError> {
        Ok(self.db.series.select(shortname).await?)
    }

    pub async fn all(&self) -> Result<Vec<SeriesModel>, ServiceError> {
        Ok(self.db.series.select_all().await?)
    }

    pub async fn titles(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.db.series.titles().await?)
    }

    /// Shortname to title map.
    pub async fn shortname_map(&self) -> Result<HashMap<String, String>, ServiceError> {
        Ok(self.db.series.shortnames().await?.into_iter().collect())
    }

    /// Adds a series. Shortname and title must both be unused.
    pub async fn add(&self, model: &SeriesModel) -> Result<(), ServiceError> {
        validate_shortname(&model.shortname)?;
        if model.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput {
                message: "Title cannot be empty.".to_string(),
            });
        }
        if self.db.series.select(&model.shortname).await?.is_some() {
            return Err(ServiceError::InvalidInput {
                message: format!("Shortname `{}` is already in use.", model.shortname),
            });
        }
        if self.db.series.select_by_title(&model.title).await?.is_some() {
            return Err(ServiceError::InvalidInput {
                message: format!("`{}` already exists.", model.title),
            });
        }
        self.db.series.insert(model).await?;
        info!("Added series {} ({})", model.title, model.shortname);
        Ok(())
    }

    pub async fn edit_by_title(&self, title: &str, change: &SeriesChange) -> Result<(), ServiceError> {
        if let Some(shortname) = &change.shortname {
            validate_shortname(shortname)?;
        }
        match self.db.series.update_by_title(title, change).await? {
            0 if !change.is_empty() => Err(ServiceError::NotFound {
                what: format!("Series `{title}`"),
            }),
            _ => Ok(()),
        }
    }

    pub async fn edit_by_shortname(
        &self,
        shortname: &str,
        change: &SeriesChange,
    ) -> Result<(), ServiceError> {
        match self.db.series.update(shortname, change).await? {
            0 if !change.is_empty() => Err(ServiceError::NotFound {
                what: format!("Series `{shortname}`"),
            }),
            _ => Ok(()),
        }
    }

    pub async fn search_genre(&self, genre: &str) -> Result<Vec<SeriesModel>, ServiceError> {
        if genre.trim().chars().count() < 3 {
            return Err(ServiceError::InvalidInput {
                message: "Search term must have 3 letters or more.".to_string(),
            });
        }
        Ok(self.db.series.search_genre(genre.trim()).await?)
    }

    /// Records an entry's chapter and time as the latest release of its series.
    ///
    /// The series is resolved like [`Self::match_series`]. Returns `false`
    /// when nothing in the catalogue matches the entry's series title.
    pub async fn apply_entry(&self, entry: &FeedEntry) -> Result<bool, ServiceError> {
        let pairs = self.db.series.shortnames().await?;
        let Some(title) = entry_series_title(entry, &pairs) else {
            debug!("No series matches feed title `{}`", entry.series_title());
            return Ok(false);
        };

        let change = SeriesChange {
            latest_chapter: Some(Some(entry.chapter().to_string())),
            updated: Some(Some(entry.updated)),
            ..Default::default()
        };
        self.db.series.update_by_title(&title, &change).await?;
        Ok(true)
    }
}

/// Pure part of [`SeriesService::match_series`] over `(shortname, title)` pairs.
pub fn match_in(term: &str, pairs: &[(String, String)]) -> Option<SeriesMatch> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    if let Some((_, title)) = pairs.iter().find(|(s, _)| s.eq_ignore_ascii_case(term)) {
        return Some(SeriesMatch {
            title: title.clone(),
            score: EXACT_SCORE,
        });
    }
    fuzzy::best_match(term, pairs.iter().map(|(_, t)| t.as_str()))
        .filter(|(_, score)| *score >= MATCH_CUTOFF)
        .map(|(title, score)| SeriesMatch {
            title: title.to_string(),
            score,
        })
}

/// Catalogue title of the series a feed entry belongs to.
pub fn entry_series_title(entry: &FeedEntry, pairs: &[(String, String)]) -> Option<String> {
    match_in(entry.series_title(), pairs).map(|found| found.title)
}

fn validate_shortname(shortname: &str) -> Result<(), ServiceError> {
    if shortname.is_empty() || shortname.chars().any(char::is_whitespace) {
        return Err(ServiceError::InvalidInput {
            message: "Shortname must be a single non-empty word.".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<(String, String)> {
        [("kd", "Kingdom"), ("ff", "Fire Force"), ("tdg", "Tales of Demons and Gods")]
            .into_iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_shortname_is_exact() {
        let m = match_in("FF", &pairs()).unwrap();
        assert_eq!(m.title, "Fire Force");
        assert_eq!(m.score, EXACT_SCORE);
    }

    #[test]
    fn test_fuzzy_title() {
        let m = match_in("kingdon", &pairs()).unwrap();
        assert_eq!(m.title, "Kingdom");
        assert!(m.score < EXACT_SCORE);
    }

    #[test]
    fn test_unrelated_title_is_no_match() {
        assert_eq!(match_in("One Piece", &pairs()), None);
        assert_eq!(match_in("Hero Killer", &pairs()), None);
        assert_eq!(match_in("Solo Leveling", &pairs()), None);
    }

    #[test]
    fn test_partial_title_above_cutoff() {
        let m = match_in("demons and gods", &pairs()).unwrap();
        assert_eq!(m.title, "Tales of Demons and Gods");
        assert!(m.score >= MATCH_CUTOFF);
    }

    fn entry(title: &str) -> FeedEntry {
        let link = "http://hatigarmscans.net/manga/series/12".to_string();
        FeedEntry {
            item_id: link.clone(),
            title: title.to_string(),
            link,
            author: None,
            summary: None,
            content: None,
            updated: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_entry_series_title_variants() {
        let pairs = pairs();
        assert_eq!(
            entry_series_title(&entry("Tales of Demon and Gods #230"), &pairs).as_deref(),
            Some("Tales of Demons and Gods")
        );
        assert_eq!(
            entry_series_title(&entry("KD #596"), &pairs).as_deref(),
            Some("Kingdom")
        );
        assert_eq!(
            entry_series_title(&entry("kingdom #596"), &pairs).as_deref(),
            Some("Kingdom")
        );
        assert_eq!(entry_series_title(&entry("One Piece #1000"), &pairs), None);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(match_in("  ", &pairs()), None);
        assert_eq!(match_in("kingdom", &[]), None);
    }

    #[test]
    fn test_validate_shortname() {
        assert!(validate_shortname("kd").is_ok());
        assert!(validate_shortname("two words").is_err());
        assert!(validate_shortname("").is_err());
    }
}
