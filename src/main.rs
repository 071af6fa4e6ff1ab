use std::env;
use std::fs::File;
use std::io::{self, BufReader};

use unitfile::{KeyProcessors, SectionProcessors};

fn main() {
    tracing_subscriber::fmt::init();

    let path = env::args()
        .nth(1)
        .expect("expected path to a unit file as first argument");
    let file = File::open(&path).expect("failed to open file");
    let config = unitfile::from_reader(
        BufReader::new(file),
        &SectionProcessors::new(),
        &KeyProcessors::new(),
    )
    .expect("failed to parse unit file");

    let mut stdout = io::stdout().lock();
    unitfile::dump(&mut stdout, &config).expect("failed to write to stdout");
}
