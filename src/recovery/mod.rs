pub mod sink;

pub use sink::{
    artifact_name, ensure_writable_dir, shell_quote, DirectorySink, FragmentSink, WrittenFragment,
};
