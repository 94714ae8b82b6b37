//! Main entry point for the volume watcher library
//!
//! This file exists to satisfy Cargo's requirement for a main.rs file
//! when building a library crate. The actual binaries are in:
//! - src/daemon/main.rs (volwatchd daemon)
//! - src/cli/main.rs (volwatch-cli query tool)

fn main() {
    eprintln!("This is a library crate. Use one of the following binaries:");
    eprintln!("  cargo run --bin volwatchd    # Start the volume watcher daemon");
    eprintln!("  cargo run --bin volwatch-cli # Query volume state");
    eprintln!();
    eprintln!("Or install the binaries:");
    eprintln!("  cargo install --path .");
    eprintln!("  volwatchd --help");
    eprintln!("  volwatch-cli --help");

    std::process::exit(1);
}
