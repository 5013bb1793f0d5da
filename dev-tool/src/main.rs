use std::process::exit;

use anyhow::Error;
use structopt::StructOpt;

use crate::exit_code::FATAL_ERROR;

mod evaluate;
mod exit_code;
mod feedback;
mod relevance;
mod sessions;
mod train;
mod utils;

/// Tooling for the developers of the click model.
#[derive(StructOpt, Debug)]
enum CommandArgs {
    Train(train::TrainCmd),
    Relevance(relevance::RelevanceCmd),
    Evaluate(evaluate::EvaluateCmd),
}

impl CommandArgs {
    fn run(self) -> Result<i32, Error> {
        match self {
            CommandArgs::Train(cmd) => cmd.run(),
            CommandArgs::Relevance(cmd) => cmd.run(),
            CommandArgs::Evaluate(cmd) => cmd.run(),
        }
    }
}

fn main() {
    env_logger::init();

    let exit_code = match CommandArgs::from_args().run() {
        Ok(exit_code) => exit_code,
        Err(error) => {
            eprintln!("{:?}", error);
            FATAL_ERROR
        }
    };

    exit(exit_code);
}
