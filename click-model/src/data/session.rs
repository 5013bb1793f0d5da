//! Observed search sessions.

use std::convert::TryFrom;

use derive_more::{Display, From};
use displaydoc::Display as DisplayDoc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that could happen when constructing a [`SearchResult`].
#[derive(Clone, Debug, DisplayDoc, Error, PartialEq)]
pub enum SessionError {
    /// Satisfaction observed without a click on document {document}
    SatisfactionWithoutClick { document: DocumentId },
    /// Missing satisfaction for the clicked document {document}
    MissingSatisfaction { document: DocumentId },
    /// Invalid observation flag {value}, expected 0 or 1
    InvalidFlag { value: u8 },
}

/// Unique identifier of a ranked document.
#[repr(transparent)]
#[derive(
    Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The query a session was issued for.
#[repr(transparent)]
#[derive(
    Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct Query(pub String);

impl From<&str> for Query {
    fn from(query: &str) -> Self {
        Self(query.to_string())
    }
}

/// A ranked result together with the observed user feedback on it.
///
/// Satisfaction is defined exactly for the clicked results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSearchResult", into = "RawSearchResult")]
pub struct SearchResult {
    id: DocumentId,
    click: bool,
    satisfied: Option<bool>,
}

impl SearchResult {
    /// Creates a result from its observations.
    ///
    /// # Errors
    /// Fails if satisfaction is given for a result without a click or is missing for a clicked one.
    pub fn new(
        id: impl Into<DocumentId>,
        click: bool,
        satisfied: Option<bool>,
    ) -> Result<Self, SessionError> {
        let id = id.into();
        match (click, satisfied) {
            (false, Some(_)) => Err(SessionError::SatisfactionWithoutClick { document: id }),
            (true, None) => Err(SessionError::MissingSatisfaction { document: id }),
            _ => Ok(Self {
                id,
                click,
                satisfied,
            }),
        }
    }

    /// A result the user didn't click.
    pub fn skipped(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            click: false,
            satisfied: None,
        }
    }

    /// A clicked result with the observed satisfaction.
    pub fn clicked(id: impl Into<DocumentId>, satisfied: bool) -> Self {
        Self {
            id: id.into(),
            click: true,
            satisfied: Some(satisfied),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn click(&self) -> bool {
        self.click
    }

    /// The observed satisfaction, undefined if the result wasn't clicked.
    pub fn satisfied(&self) -> Option<bool> {
        self.satisfied
    }

    /// Whether the result was clicked and satisfied the user.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied == Some(true)
    }
}

/// The line-delimited record shape of a [`SearchResult`].
#[derive(Clone, Deserialize, Serialize)]
struct RawSearchResult {
    id: DocumentId,
    click: u8,
    sat: Option<u8>,
}

fn flag(value: u8) -> Result<bool, SessionError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(SessionError::InvalidFlag { value }),
    }
}

impl TryFrom<RawSearchResult> for SearchResult {
    type Error = SessionError;

    fn try_from(raw: RawSearchResult) -> Result<Self, Self::Error> {
        let click = flag(raw.click)?;
        let satisfied = raw.sat.map(flag).transpose()?;
        Self::new(raw.id, click, satisfied)
    }
}

impl From<SearchResult> for RawSearchResult {
    fn from(result: SearchResult) -> Self {
        Self {
            id: result.id,
            click: result.click.into(),
            sat: result.satisfied.map(Into::into),
        }
    }
}

/// A query with its ranked results, rank being the position in `results`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    query: Query,
    #[serde(rename = "web_results")]
    results: Vec<SearchResult>,
}

impl SearchSession {
    pub fn new(query: impl Into<Query>, results: Vec<SearchResult>) -> Self {
        Self {
            query: query.into(),
            results,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The rank of the last clicked result, or the number of results if nothing was clicked.
    pub fn last_click_rank(&self) -> usize {
        self.results
            .iter()
            .rposition(SearchResult::click)
            .unwrap_or_else(|| self.len())
    }

    /// Whether any result ranked below `rank` was clicked.
    pub fn has_click_after(&self, rank: usize) -> bool {
        self.results
            .iter()
            .skip(rank + 1)
            .any(SearchResult::click)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::tests::session;

    #[rstest]
    #[case(Some(true))]
    #[case(Some(false))]
    fn test_satisfaction_without_click_is_rejected(#[case] satisfied: Option<bool>) {
        let result = SearchResult::new("d", false, satisfied);
        assert_eq!(
            result.unwrap_err(),
            SessionError::SatisfactionWithoutClick {
                document: "d".into()
            },
        );
    }

    #[test]
    fn test_click_without_satisfaction_is_rejected() {
        let result = SearchResult::new("d", true, None);
        assert_eq!(
            result.unwrap_err(),
            SessionError::MissingSatisfaction {
                document: "d".into()
            },
        );
    }

    #[test]
    fn test_valid_observations() {
        assert_eq!(
            SearchResult::new("d", false, None).unwrap(),
            SearchResult::skipped("d"),
        );
        assert_eq!(
            SearchResult::new("d", true, Some(false)).unwrap(),
            SearchResult::clicked("d", false),
        );
        assert!(SearchResult::clicked("d", true).is_satisfied());
        assert!(!SearchResult::skipped("d").is_satisfied());
    }

    #[test]
    fn test_last_click_rank() {
        let no_clicks = session("q", &[(false, None), (false, None)]);
        assert_eq!(no_clicks.last_click_rank(), 2);

        let clicks = session("q", &[(true, Some(true)), (true, Some(false)), (false, None)]);
        assert_eq!(clicks.last_click_rank(), 1);
    }

    #[test]
    fn test_has_click_after() {
        let session = session("q", &[(false, None), (true, Some(false)), (false, None)]);
        assert!(session.has_click_after(0));
        assert!(!session.has_click_after(1));
        assert!(!session.has_click_after(2));
    }

    #[test]
    fn test_deserialize_session() {
        let line = r#"{"query": "shoes", "web_results": [
            {"id": "a", "click": 1, "sat": 1},
            {"id": "b", "click": 0, "sat": null},
            {"id": "c", "click": 1, "sat": 0}
        ]}"#;
        let session = serde_json::from_str::<SearchSession>(line).unwrap();

        assert_eq!(session.query(), &Query::from("shoes"));
        assert_eq!(
            session.results(),
            &[
                SearchResult::clicked("a", true),
                SearchResult::skipped("b"),
                SearchResult::clicked("c", false),
            ],
        );
    }

    #[test]
    fn test_deserialize_rejects_invalid_observations() {
        let satisfied_skip = r#"{"query": "q", "web_results": [{"id": "a", "click": 0, "sat": 1}]}"#;
        assert!(serde_json::from_str::<SearchSession>(satisfied_skip).is_err());

        let unsatisfied_skip = r#"{"query": "q", "web_results": [{"id": "a", "click": 0, "sat": 0}]}"#;
        assert!(serde_json::from_str::<SearchSession>(unsatisfied_skip).is_err());

        let missing_satisfaction = r#"{"query": "q", "web_results": [{"id": "a", "click": 1, "sat": null}]}"#;
        assert!(serde_json::from_str::<SearchSession>(missing_satisfaction).is_err());

        let invalid_flag = r#"{"query": "q", "web_results": [{"id": "a", "click": 2, "sat": null}]}"#;
        assert!(serde_json::from_str::<SearchSession>(invalid_flag).is_err());
    }

    #[test]
    fn test_serialize_keeps_record_shape() {
        let session = SearchSession::new("q", vec![SearchResult::clicked("a", false)]);
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "query": "q",
                "web_results": [{"id": "a", "click": 1, "sat": 0}],
            }),
        );
    }
}
