// ─── Launch Session ───
// Mutable state of one running game: the child handle, the sticky failure
// flags its output readers maintain, and the pre-built direct plan the
// supervisor re-spawns from on a recognized failure.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::process::Child;

use crate::core::loaders::LoaderKind;

use super::signatures::SignatureFlags;

/// Fully materialized command for a from-scratch launch: explicit classpath,
/// pinned JVM flags and an already-sanitized game argument list.
#[derive(Debug, Clone)]
pub struct DirectLaunchPlan {
    pub java_bin: PathBuf,
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    pub working_dir: PathBuf,
}

impl DirectLaunchPlan {
    pub fn command_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.jvm_args.len() + 1 + self.game_args.len());
        args.extend(self.jvm_args.iter().cloned());
        args.push(self.main_class.clone());
        args.extend(self.game_args.iter().cloned());
        args
    }
}

pub struct LaunchSession {
    pub version_id: String,
    pub loader: LoaderKind,
    /// The direct plan runs at most once per session; set up front when the
    /// first spawn already is the direct one.
    pub fallback_attempted: bool,
    pub child: Child,
    pub signatures: Arc<SignatureFlags>,
    pub direct_plan: DirectLaunchPlan,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_args_order_is_jvm_then_main_then_game() {
        let plan = DirectLaunchPlan {
            java_bin: PathBuf::from("/usr/bin/java"),
            main_class: "net.minecraft.client.main.Main".into(),
            jvm_args: vec!["-Xmx2G".into(), "-cp".into(), "/inst/client.jar".into()],
            game_args: vec!["--version".into(), "1.20.1".into()],
            working_dir: PathBuf::from("/inst"),
        };
        assert_eq!(
            plan.command_args(),
            vec![
                "-Xmx2G",
                "-cp",
                "/inst/client.jar",
                "net.minecraft.client.main.Main",
                "--version",
                "1.20.1",
            ]
        );
    }
}
