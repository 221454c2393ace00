//! Pretty-print how the command-line is interpreted.

use arrrg::CommandLine;

use sst::Options;

fn main() {
    let (options, free) = Options::from_command_line("USAGE: sst-options [OPTIONS]");
    if !free.is_empty() {
        eprintln!("expected no positional arguments");
        std::process::exit(1);
    }
    println!("{options:#?}");
}
