pub mod app;
pub mod domain;
pub mod infra;
pub mod runtime;

/// Install logging for the CLI.
pub fn init(verbose: bool) {
    infra::logging::init(verbose);
}
