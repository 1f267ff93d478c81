// mod.rs
pub mod dump;

pub use dump::DumpSink;
