//! Show the size of each sst listed on the command-line.

use arrrg::CommandLine;

use sst::Sst;

#[derive(arrrg_derive::CommandLine, Debug, Default, Eq, PartialEq)]
struct SstStatOptions {}

fn main() {
    let (_, args) = SstStatOptions::from_command_line("Usage: sst-stat [SSTs]");
    for path in args {
        let sst = Sst::new(&path).unwrap_or_else(|err| panic!("could not open {path}: {err}"));
        println!("{} file_size={}", path, sst.file_size());
    }
}
