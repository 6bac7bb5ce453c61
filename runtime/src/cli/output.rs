//! Output mode shared by every subcommand (`--json`, `--quiet`).

use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default)]
struct OutputFlags {
    json: bool,
    quiet: bool,
}

static FLAGS: OnceLock<OutputFlags> = OnceLock::new();

/// Record the global flags. Later calls are ignored.
pub fn init(json: bool, quiet: bool) {
    let _ = FLAGS.set(OutputFlags { json, quiet });
}

fn flags() -> OutputFlags {
    FLAGS.get().copied().unwrap_or_default()
}

/// Whether machine-readable JSON output was requested.
pub fn is_json() -> bool {
    flags().json
}

/// Whether non-essential output should be suppressed.
pub fn is_quiet() -> bool {
    flags().quiet
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: failed to encode output: {e}"),
    }
}
