// ABOUTME: Command module aggregator for the tagflip CLI.
// ABOUTME: Re-exports the update, rollback, handle and history handlers.

mod backends;
mod history;
mod run;

pub use history::history;
pub use run::{handle, rollback, update};
