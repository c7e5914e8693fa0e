use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

/// A parsed Maven coordinate.
///
/// Accepted forms:
///   `group:artifact:version`
///   `group:artifact:version:classifier`
/// either optionally followed by `@packaging` (defaults to `jar`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group: String,
    pub artifact: String,
    pub version: String,
    pub classifier: Option<String>,
    pub packaging: String,
}

impl MavenArtifact {
    pub fn parse(coordinate: &str) -> LauncherResult<Self> {
        let (coordinate, packaging) = match coordinate.rfind('@') {
            Some(at) => (&coordinate[..at], &coordinate[at + 1..]),
            None => (coordinate, "jar"),
        };

        let mut parts = coordinate.split(':');
        let (group, artifact, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(g), Some(a), Some(v)) if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                (g, a, v)
            }
            _ => return Err(LauncherError::InvalidMavenCoordinate(coordinate.to_string())),
        };
        let classifier = parts.next().map(ToString::to_string);
        if parts.next().is_some() {
            return Err(LauncherError::InvalidMavenCoordinate(coordinate.to_string()));
        }

        Ok(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
            classifier,
            packaging: packaging.to_string(),
        })
    }

    /// `artifact-version[-classifier].packaging`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!("{}-{}-{}.{}", self.artifact, self.version, c, self.packaging),
            None => format!("{}-{}.{}", self.artifact, self.version, self.packaging),
        }
    }

    /// Repository-relative path in the Maven local layout, `/`-separated:
    /// `group/with/slashes/artifact/version/filename`.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version,
            self.filename()
        )
    }

    /// Download URL under the given repository base.
    pub fn url(&self, repo_base: &str) -> String {
        format!("{}/{}", repo_base.trim_end_matches('/'), self.relative_path())
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.packaging != "jar" {
            write!(f, "@{}", self.packaging)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_coordinate() {
        let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
        assert_eq!(a.group, "net.sf.jopt-simple");
        assert_eq!(a.artifact, "jopt-simple");
        assert_eq!(a.version, "5.0.4");
        assert_eq!(a.classifier, None);
        assert_eq!(a.packaging, "jar");
    }

    #[test]
    fn parse_classifier_and_packaging() {
        let a = MavenArtifact::parse("org.lwjgl:lwjgl:3.3.1:natives-linux").unwrap();
        assert_eq!(a.classifier.as_deref(), Some("natives-linux"));

        let b = MavenArtifact::parse("de.oceanlabs.mcp:mcp_config:1.20.1@zip").unwrap();
        assert_eq!(b.packaging, "zip");
        assert_eq!(b.filename(), "mcp_config-1.20.1.zip");
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(MavenArtifact::parse("only:two").is_err());
        assert!(MavenArtifact::parse("a:b:c:d:e").is_err());
        assert!(MavenArtifact::parse("::1.0").is_err());
    }

    #[test]
    fn relative_path_is_deterministic() {
        let a = MavenArtifact::parse("g.h:artifact:1.0").unwrap();
        assert_eq!(a.relative_path(), "g/h/artifact/1.0/artifact-1.0.jar");
    }

    #[test]
    fn url_joins_base_without_double_slash() {
        let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
        assert_eq!(
            a.url("https://libraries.minecraft.net/"),
            "https://libraries.minecraft.net/net/sf/jopt-simple/jopt-simple/5.0.4/jopt-simple-5.0.4.jar"
        );
    }

    #[test]
    fn display_round_trips() {
        for coord in [
            "a.b:c:1.0",
            "a.b:c:1.0:natives-linux",
            "a.b:c:1.0@zip",
            "a.b:c:1.0:sources@zip",
        ] {
            let parsed = MavenArtifact::parse(coord).unwrap();
            assert_eq!(parsed.to_string(), coord);
        }
    }
}
