mod artifact;
mod resolver;

pub use artifact::MavenArtifact;
pub use resolver::{classpath_for, resolve_all, resolve_entry, ArtifactDescriptor};
