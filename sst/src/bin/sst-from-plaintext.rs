//! Build an sst from a plaintext `"<KEY> <VALUE>\n"` file, sorting and deduplicating as needed.

use std::fs::File;
use std::io::{BufRead, BufReader};

use arrrg::CommandLine;
use arrrg_derive::CommandLine;

use sst::{Options, TableBuilder};

#[derive(CommandLine, Debug, Eq, PartialEq)]
struct SstFromPlaintextOptions {
    #[arrrg(required, "Input file in plaintext \"<KEY> <VALUE>\\n\" formatting.")]
    plaintext: String,
    #[arrrg(required, "Output file in SST format.")]
    output: String,
    #[arrrg(nested)]
    sst: Options,
}

impl Default for SstFromPlaintextOptions {
    fn default() -> Self {
        Self {
            plaintext: "/dev/stdin".to_string(),
            output: "plaintext.sst".to_string(),
            sst: Options::default(),
        }
    }
}

fn main() {
    let (cmdline, _) = SstFromPlaintextOptions::from_command_line(
        "Usage: sst-from-plaintext --plaintext <FILE> --output <FILE>",
    );
    let plaintext = File::open(cmdline.plaintext).expect("could not open plaintext");
    let plaintext = BufReader::new(plaintext);

    let mut lines: Vec<(String, String)> = Vec::new();
    for line in plaintext.lines() {
        let line = line.expect("could not read line");
        let split: Vec<&str> = line.split_whitespace().collect();
        if split.len() != 2 {
            panic!("invalid line: {line}");
        }
        lines.push((split[0].to_string(), split[1].to_string()));
    }
    lines.sort();
    lines.dedup_by(|a, b| a.0 == b.0);

    let mut builder =
        TableBuilder::new(cmdline.output, cmdline.sst.into()).expect("could not open output sst");
    for (key, value) in lines {
        builder
            .add(key.as_bytes(), value.as_bytes())
            .expect("could not add key-value pair");
    }
    builder.finish().expect("could not finish sst");
}
