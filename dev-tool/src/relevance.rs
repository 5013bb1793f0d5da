use std::path::PathBuf;

use anyhow::Error;
use click_model::{DocumentId, Query};
use structopt::StructOpt;

use crate::{exit_code::NO_ERROR, utils::load_model};

/// Prints the predicted relevance of documents for a query.
#[derive(StructOpt, Debug)]
pub struct RelevanceCmd {
    /// File containing trained parameters.
    #[structopt(long)]
    params: PathBuf,

    /// The query the documents were shown for.
    #[structopt(long)]
    query: String,

    /// The documents to predict the relevance of.
    #[structopt(long, required = true)]
    document: Vec<String>,
}

impl RelevanceCmd {
    pub fn run(self) -> Result<i32, Error> {
        let Self {
            params,
            query,
            document,
        } = self;

        let model = load_model(params)?;
        let query = Query::from(query);
        for document in document.into_iter().map(DocumentId::from) {
            println!(
                "{}\t{:.6}",
                document,
                model.predict_relevance(&query, &document)
            );
        }

        Ok(NO_ERROR)
    }
}
