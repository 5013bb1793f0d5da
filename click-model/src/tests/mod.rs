use crate::data::session::{SearchResult, SearchSession};

/// Creates a session with documents named `d0`, `d1`, ... after their rank.
///
/// Each result is given as its click and satisfaction flags.
pub(crate) fn session(query: &str, results: &[(bool, Option<bool>)]) -> SearchSession {
    let results = results
        .iter()
        .enumerate()
        .map(|(rank, &(click, satisfied))| {
            SearchResult::new(format!("d{}", rank), click, satisfied).unwrap()
        })
        .collect();

    SearchSession::new(query, results)
}
