//! M-Tree Benchmark Library
//!
//! Data generators and metrics shared by the split and tree benchmarks.

pub mod data_gen;

/// Installs `env_logger` once; set `RUST_LOG` to see split decisions.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
