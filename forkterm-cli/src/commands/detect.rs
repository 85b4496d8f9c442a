//! `forkterm detect`: which terminal a launch would use here.

use anyhow::Result;
use clap::Args;

use forkterm_detector::PlatformDetector;

use super::Env;
use crate::output::Outcome;

#[derive(Args, Debug)]
pub struct DetectArgs {}

impl DetectArgs {
    pub fn run(self, env: &Env) -> Result<Outcome> {
        let report = PlatformDetector::system()
            .with_preferred(env.config.preferred_terminal.clone())
            .report();
        Outcome::success(report)
    }
}
