pub mod json;
pub mod progress;
pub mod terminal;

use crate::run::Report;

pub trait Reporter {
    fn report(&self, report: &Report) -> String;
}
