#![no_main]
use libfuzzer_sys::fuzz_target;
use natsbench_proto::prelude::*;

fuzz_target!(|data: &[u8]| {
    let mut rest = data;
    while let Ok((_, used)) = Op::parse(rest) {
        rest = &rest[used..];
    }
});
