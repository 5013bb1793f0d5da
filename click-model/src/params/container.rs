use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    data::session::{DocumentId, Query},
    params::{ParamContainer, ParamEm},
};

/// A parameter with one value per (query, document) pair.
///
/// Entries are created on first accumulation and start from the prior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryDocumentParams {
    prior: f64,
    params: HashMap<Query, HashMap<DocumentId, ParamEm>>,
}

impl QueryDocumentParams {
    pub(crate) fn new(prior: f64) -> Self {
        Self {
            prior,
            params: HashMap::new(),
        }
    }

    /// An empty container with the same prior.
    pub(crate) fn empty_like(&self) -> Self {
        Self::new(self.prior)
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// The parameter for the query and document, if it was ever accumulated.
    pub fn get(&self, query: &Query, document: &DocumentId) -> Option<&ParamEm> {
        self.params.get(query)?.get(document)
    }

    /// The number of stored (query, document) pairs.
    pub fn len(&self) -> usize {
        self.params.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.params.values().all(HashMap::is_empty)
    }

    fn entry(&mut self, query: &Query, document: &DocumentId) -> &mut ParamEm {
        let prior = self.prior;
        self.params
            .entry(query.clone())
            .or_default()
            .entry(document.clone())
            .or_insert_with(|| ParamEm::new(prior))
    }
}

impl ParamContainer for QueryDocumentParams {
    fn get_value(&self, query: &Query, document: &DocumentId) -> f64 {
        self.get(query, document)
            .map_or(self.prior, ParamEm::value)
    }

    fn accumulate(
        &mut self,
        query: &Query,
        document: &DocumentId,
        numerator: f64,
        denominator: f64,
    ) {
        self.entry(query, document).add(numerator, denominator);
    }

    fn merge(&mut self, other: Self) {
        for (query, documents) in other.params {
            for (document, param) in documents {
                self.entry(&query, &document).absorb(&param);
            }
        }
    }

    fn finalize(&mut self) {
        self.params
            .values_mut()
            .flat_map(HashMap::values_mut)
            .for_each(ParamEm::finalize);
    }
}

/// A parameter shared by the whole corpus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleParam {
    prior: f64,
    param: ParamEm,
}

impl SingleParam {
    pub(crate) fn new(prior: f64) -> Self {
        Self {
            prior,
            param: ParamEm::new(prior),
        }
    }

    /// An empty container with the same prior.
    pub(crate) fn empty_like(&self) -> Self {
        Self::new(self.prior)
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn value(&self) -> f64 {
        self.param.value()
    }

    #[cfg(test)]
    pub(crate) fn param(&self) -> &ParamEm {
        &self.param
    }
}

impl ParamContainer for SingleParam {
    fn get_value(&self, _query: &Query, _document: &DocumentId) -> f64 {
        self.value()
    }

    fn accumulate(
        &mut self,
        _query: &Query,
        _document: &DocumentId,
        numerator: f64,
        denominator: f64,
    ) {
        self.param.add(numerator, denominator);
    }

    fn merge(&mut self, other: Self) {
        self.param.absorb(&other.param);
    }

    fn finalize(&mut self) {
        self.param.finalize();
    }
}
