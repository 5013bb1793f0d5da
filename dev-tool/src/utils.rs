use std::{fs, path::Path};

use anyhow::{Context, Error};
use click_model::{ClickModel, Config};
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) fn progress_spin_until_done<R>(msg: &'static str, func: impl FnOnce() -> R) -> R {
    let progress_bar = ProgressBar::new_spinner()
        .with_style(ProgressStyle::default_bar().template("{msg}: {elapsed:>10} {spinner:.green}"));
    progress_bar.set_message(msg);
    progress_bar.enable_steady_tick(100);
    let res = func();
    progress_bar.finish();
    res
}

/// Loads a model from a file written by the `train` command.
pub(crate) fn load_model(path: impl AsRef<Path>) -> Result<ClickModel, Error> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .with_context(|| format!("Reading parameters from {} failed.", path.display()))?;
    if bytes.is_empty() {
        anyhow::bail!("Parameter file {} is empty.", path.display());
    }

    ClickModel::deserialize(Config::default(), &bytes)
}
