//! Dump key-value pairs from one or more ssts to stdout.

use arrrg::CommandLine;

use sst::{Cursor, Sst};

#[derive(arrrg_derive::CommandLine, Debug, Default, Eq, PartialEq)]
struct SstDumpOptions {}

fn main() {
    let (_, args) = SstDumpOptions::from_command_line("Usage: sst-dump [SSTs]");
    for path in args {
        let sst = Sst::new(&path).unwrap_or_else(|err| panic!("could not open {path}: {err}"));
        let mut cursor = sst.cursor();
        cursor.seek_to_first().expect("could not seek to first");
        while cursor.valid() {
            let key = String::from_utf8_lossy(cursor.key().unwrap());
            let value = String::from_utf8_lossy(cursor.value().unwrap());
            println!("{key} -> {value}");
            cursor.next().expect("cursor::next");
        }
    }
}
