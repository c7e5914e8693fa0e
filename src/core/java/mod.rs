mod runtime;

pub use runtime::{
    detect_candidates, major_version_of, parse_java_major, requirement_for, select_runtime,
    JavaRequirement, RuntimeDescriptor, Selection,
};
