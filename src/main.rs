//! Convoy binary entry point.
//!
//! All real work happens in [`convoy::cli::run`]; this shim only maps the
//! top-level error into an exit code.

fn main() {
    if let Err(err) = convoy::cli::run() {
        // `{:#}` prints the full anyhow context chain on one line.
        convoy::ui::output::error(format!("{err:#}"));
        std::process::exit(1);
    }
}
