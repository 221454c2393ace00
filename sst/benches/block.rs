use std::sync::Arc;

use guacamole::combinators::*;
use guacamole::Guacamole;
use statslicer::{benchmark, black_box, statslicer_main, Bencher, Parameter, Parameters};

use sst::block::{Block, BlockBuilder, BlockBuilderOptions};
use sst::comparator::{BytewiseComparator, Comparator};
use sst::Cursor;

const RESTART_INTERVALS: &[usize] = &[1, 4, 16, 64];

#[derive(Debug, Default, Eq, PartialEq)]
struct BlockParameters {
    restart_interval: usize,
}

impl Parameters for BlockParameters {
    fn params(&self) -> Vec<(&'static str, Parameter)> {
        vec![(
            "restart_interval",
            Parameter::Integer(self.restart_interval as u64),
        )]
    }
}

fn comparator() -> Arc<dyn Comparator> {
    Arc::new(BytewiseComparator)
}

fn build_block(params: &BlockParameters, guac: &mut Guacamole, size: usize) -> (Block, Vec<Vec<u8>>) {
    let mut suffix = string(uniform(4, 16), to_charset(CHAR_SET_ALNUM));
    let mut value = string(uniform(0, 32), to_charset(CHAR_SET_ALNUM));
    let mut builder = BlockBuilder::new(
        comparator(),
        BlockBuilderOptions::default().block_restart_interval(params.restart_interval),
    );
    let mut keys = Vec::with_capacity(size);
    for i in 0..size {
        let key = format!("{i:08}-{}", suffix(guac)).into_bytes();
        builder.add(&key, value(guac).as_bytes()).unwrap();
        keys.push(key);
    }
    let bytes = builder.finish().to_vec();
    let block = Block::new(comparator(), bytes).unwrap();
    (block, keys)
}

fn bench_seek(params: &BlockParameters, b: &mut Bencher) {
    let mut guac = Guacamole::new(b.seed());
    let (block, keys) = build_block(params, &mut guac, b.size());
    b.run(|| {
        for key in &keys {
            let mut cursor = block.cursor();
            cursor.seek(key).unwrap();
            black_box(cursor.value());
        }
    });
}

fn bench_forward_iteration(params: &BlockParameters, b: &mut Bencher) {
    let mut guac = Guacamole::new(b.seed());
    let (block, _keys) = build_block(params, &mut guac, b.size());
    b.run(|| {
        let mut cursor = block.cursor();
        cursor.seek_to_first().unwrap();
        while cursor.valid() {
            black_box(cursor.value());
            cursor.next().unwrap();
        }
    });
}

benchmark! {
    name = block_seek;
    BlockParameters {
        restart_interval in RESTART_INTERVALS,
    }
    bench_seek
}

benchmark! {
    name = block_forward_iteration;
    BlockParameters {
        restart_interval in RESTART_INTERVALS,
    }
    bench_forward_iteration
}

statslicer_main! {
    block_seek
    block_forward_iteration
}
