//! Inserts a small fixed set of keys and prints the resulting tree shape
//! as Graphviz DOT on stdout (`cargo run --example dot_export | dot -Tpng
//! -o tree.png`). Purely a visualization aid; consumes only
//! [`ebst::ConcurrentSet::to_dot`].

use anyhow::Result;

use ebst::ConcurrentSet;

const SENTINEL1: i64 = i64::MAX - 1;
const SENTINEL2: i64 = i64::MAX;

fn main() -> Result<()> {
    env_logger::init();
    let set = ConcurrentSet::new(SENTINEL1, SENTINEL2).expect("sentinels are ordered by construction");
    for key in [5, 3, 7, 1, 9, 4, 6] {
        set.insert(key)?;
    }
    print!("{}", set.to_dot());
    Ok(())
}
