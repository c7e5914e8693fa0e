// ─── Launch Orchestrator ───
// Drives a whole launch: runtime selection, loader install, artifact
// prefetch, argument assembly, the primary spawn and the one-shot direct
// fallback. Holds at most one session at a time; a background supervisor
// watches the child and decides what its exit means.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::assets::AssetIndex;
use crate::core::auth::LaunchProfile;
use crate::core::downloader::{BatchStats, DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventSink;
use crate::core::http::build_http_client;
use crate::core::java::{self, RuntimeDescriptor};
use crate::core::loaders::{ForgeInstaller, InstallContext, Installer, LoaderKind};
use crate::core::maven;
use crate::core::state::LauncherSettings;
use crate::core::version::{
    ensure_required_game_args, GameArgContext, ManifestStore, ResolvedManifest,
};

use super::arguments::{
    classpath_separator, clean_game_args, sanitize_duplicates, TokenContext, TokenTable,
};
use super::session::{DirectLaunchPlan, LaunchSession};
use super::task::spawn_game;

const LIBRARY_POOL: usize = 8;
const ASSET_POOL: usize = 16;
const SUPERVISOR_POLL: Duration = Duration::from_millis(200);

const VANILLA_MAIN_CLASS: &str = "net.minecraft.client.main.Main";
const FABRIC_MAIN_CLASS: &str = "net.fabricmc.loader.impl.launch.knot.KnotClient";
const FORGE_MAIN_CLASS: &str = "cpw.mods.bootstraplauncher.BootstrapLauncher";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub username: String,
    pub minecraft_version: String,
    pub loader: LoaderKind,
}

/// Thin acknowledgement the UI collaborator receives for launch/stop calls;
/// everything else arrives over the event channel.
#[derive(Debug, Clone, Serialize)]
pub struct RequestAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestAck {
    pub fn from_result<T>(result: &LauncherResult<T>) -> Self {
        match result {
            Ok(_) => Self {
                ok: true,
                error: None,
            },
            Err(e) => Self {
                ok: false,
                error: Some(e.to_string()),
            },
        }
    }
}

pub struct Orchestrator {
    settings: std::sync::Mutex<LauncherSettings>,
    client: reqwest::Client,
    downloader: Downloader,
    events: EventSink,
    session: Arc<Mutex<Option<LaunchSession>>>,
}

impl Orchestrator {
    pub fn new(settings: LauncherSettings, events: EventSink) -> LauncherResult<Self> {
        let client = build_http_client()?;
        let downloader = Downloader::new(events.clone())?;
        Ok(Self {
            settings: std::sync::Mutex::new(settings),
            client,
            downloader,
            events,
            session: Arc::new(Mutex::new(None)),
        })
    }

    pub fn settings(&self) -> LauncherSettings {
        self.settings.lock().expect("settings lock").clone()
    }

    pub async fn is_running(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Run the whole launch pipeline and leave a supervised session behind.
    pub async fn launch(&self, request: LaunchRequest) -> LauncherResult<()> {
        self.claim_session_slot().await?;

        let minecraft_version = request.minecraft_version.clone();
        let loader = request.loader;
        let instance_dir = self.remember_selection(&request);
        std::fs::create_dir_all(&instance_dir).map_err(|e| LauncherError::Io {
            path: instance_dir.clone(),
            source: e,
        })?;
        let store = ManifestStore::new(&instance_dir);

        let java_bin = self.select_java(&minecraft_version).await?;
        let ctx = InstallContext {
            store: &store,
            client: &self.client,
            downloader: &self.downloader,
            events: &self.events,
            java_bin: &java_bin,
            minecraft_version: &minecraft_version,
        };

        let installer = Installer::new(loader);
        let outcome = installer.ensure_installed(&ctx).await?;
        let version_id = outcome
            .version_id
            .clone()
            .unwrap_or_else(|| minecraft_version.clone());

        if loader == LoaderKind::Forge {
            self.prepare_forge_manifest(&ctx, &version_id).await?;
        }

        let resolved = store.resolve_chain(store.load(&version_id)?);
        let merged = resolved.merge_arguments();

        if loader == LoaderKind::Forge {
            ForgeInstaller
                .ensure_module_jars(&ctx, &version_id, &merged.game)
                .await?;
        }

        // Libraries gate the launch; assets stream in behind it.
        let descriptors = maven::resolve_all(resolved.all_libraries());
        let libraries_dir = store.libraries_dir();
        let entries: Vec<DownloadEntry> = descriptors
            .iter()
            .map(|d| DownloadEntry {
                url: d.url.clone(),
                dest: libraries_dir.join(&d.relative_path),
                sha1: d.sha1.clone(),
                size: d.size,
            })
            .collect();
        let stats = self.downloader.fetch_batch(entries, LIBRARY_POOL).await;
        self.report_batch("Libraries", stats);
        self.prefetch_assets(&resolved, store.assets_dir());

        let natives_dir = store.natives_dir(&version_id);
        std::fs::create_dir_all(&natives_dir).map_err(|e| LauncherError::Io {
            path: natives_dir.clone(),
            source: e,
        })?;

        // Argument assembly.
        let profile = LaunchProfile::offline(&request.username);
        let version_type = resolved
            .target()
            .version_type
            .clone()
            .unwrap_or_else(|| "release".to_string());
        let assets_index_name = resolved.assets_id().unwrap_or_default().to_string();
        let assets_dir = store.assets_dir();

        let mut classpath = maven::classpath_for(&descriptors, &libraries_dir);
        let client_jar = store.jar_path(resolved.jar_id());
        if client_jar.is_file() {
            classpath.push(client_jar);
        } else {
            warn!("Client jar missing at {:?}", client_jar);
        }
        let classpath_string = join_classpath(&classpath);

        let mut table = TokenTable::new(&TokenContext {
            profile: &profile,
            version_id: &version_id,
            version_type: &version_type,
            game_dir: &instance_dir,
            assets_dir: &assets_dir,
            assets_index_name: &assets_index_name,
            libraries_dir: &libraries_dir,
        });
        table.set("classpath", classpath_string.clone());
        table.set("natives_directory", natives_dir.display().to_string());
        table.set("launcher_name", env!("CARGO_PKG_NAME"));
        table.set("launcher_version", env!("CARGO_PKG_VERSION"));

        let game_dir_str = instance_dir.display().to_string();
        let assets_dir_str = assets_dir.display().to_string();
        let mut game_args = clean_game_args(&table.apply_all(&merged.game));
        ensure_required_game_args(
            &mut game_args,
            &GameArgContext {
                version_id: &version_id,
                access_token: &profile.access_token,
                game_dir: &game_dir_str,
                assets_dir: &assets_dir_str,
                asset_index: (!assets_index_name.is_empty())
                    .then_some(assets_index_name.as_str()),
                uuid: &profile.uuid,
                user_type: &profile.user_type,
                version_type: &version_type,
            },
        );
        let game_args = sanitize_duplicates(&game_args);

        let jvm_primary = table.apply_all(&merged.jvm);
        let main_class = resolved
            .main_class()
            .map(ToString::to_string)
            .unwrap_or_else(|| default_main_class(loader).to_string());

        let direct_plan = DirectLaunchPlan {
            java_bin: java_bin.clone(),
            main_class: main_class.clone(),
            jvm_args: direct_jvm_args(&jvm_primary, &classpath_string, &natives_dir),
            game_args: game_args.clone(),
            working_dir: instance_dir.clone(),
        };

        // The bootstrap loader never survives a profile-trusting spawn, so
        // it skips straight to the direct command.
        let use_primary = primary_eligible(loader, resolved.main_class().is_some());
        let spawned = if use_primary {
            self.events
                .log(format!("Launching {} ({})", version_id, loader));
            let mut args = jvm_primary;
            args.push(main_class);
            args.extend(game_args.iter().cloned());
            spawn_game(&java_bin, &args, &instance_dir, &self.events)?
        } else {
            self.events.log(format!("Launching {} directly", version_id));
            spawn_game(
                &direct_plan.java_bin,
                &direct_plan.command_args(),
                &direct_plan.working_dir,
                &self.events,
            )?
        };

        *self.session.lock().await = Some(LaunchSession {
            version_id,
            loader,
            fallback_attempted: !use_primary,
            child: spawned.child,
            signatures: spawned.signatures,
            direct_plan,
        });
        self.events.launched();

        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        tokio::spawn(async move {
            supervise(session, events).await;
        });
        Ok(())
    }

    /// Ask the running game to exit. The supervisor observes the exit and
    /// clears the session.
    pub async fn stop(&self) -> LauncherResult<()> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(LauncherError::NotRunning);
        };
        // A deliberately stopped session never falls back.
        session.fallback_attempted = true;
        session
            .child
            .start_kill()
            .map_err(|e| LauncherError::Other(format!("Could not stop the game: {}", e)))
    }

    // ── Pipeline pieces ─────────────────────────────────

    async fn claim_session_slot(&self) -> LauncherResult<()> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_mut() {
            match session.child.try_wait() {
                Ok(Some(_)) => *guard = None,
                _ => return Err(LauncherError::AlreadyRunning),
            }
        }
        Ok(())
    }

    fn remember_selection(&self, request: &LaunchRequest) -> PathBuf {
        let mut settings = self.settings.lock().expect("settings lock");
        settings.username = request.username.clone();
        settings.game_version = request.minecraft_version.clone();
        settings.loader = request.loader;
        if let Err(e) = settings.save() {
            warn!("Could not persist launch selection: {}", e);
        }
        settings.instance_dir.clone()
    }

    /// Keep the configured runtime when it satisfies the game's threshold,
    /// otherwise probe the machine for one that does and persist the switch.
    async fn select_java(&self, minecraft_version: &str) -> LauncherResult<PathBuf> {
        let configured = self.settings.lock().expect("settings lock").java_path.clone();
        let version = minecraft_version.to_string();
        let selection = tokio::task::spawn_blocking(move || {
            let current = configured.map(|path| {
                let major = java::major_version_of(&path);
                RuntimeDescriptor { path, major }
            });
            let candidates = java::detect_candidates();
            java::select_runtime(&version, current.as_ref(), &candidates)
        })
        .await
        .map_err(|e| LauncherError::Other(e.to_string()))??;

        if selection.switched {
            self.events.log(format!(
                "Using Java {} at {}",
                selection.runtime.major,
                selection.runtime.path.display()
            ));
            let mut settings = self.settings.lock().expect("settings lock");
            settings.java_path = Some(selection.runtime.path.clone());
            if let Err(e) = settings.save() {
                warn!("Could not persist runtime selection: {}", e);
            }
        }
        Ok(selection.runtime.path)
    }

    async fn prepare_forge_manifest(
        &self,
        ctx: &InstallContext<'_>,
        version_id: &str,
    ) -> LauncherResult<()> {
        let base = ctx
            .store
            .ensure_base_version(ctx.client, ctx.downloader, ctx.minecraft_version)
            .await?;
        let mut doc = ctx.store.load(version_id)?;
        let mut changed = ForgeInstaller::apply_compat_fixes(&mut doc);
        changed |= ForgeInstaller::enrich_with_base(&mut doc, &base, ctx.minecraft_version);
        if changed {
            ctx.store.write(version_id, &doc)?;
            info!("Updated Forge manifest {}", version_id);
        }

        // Only profiles that run against their own jar get jar repair; an
        // enriched profile borrows the base jar instead.
        let expects_own_jar = doc.jar.as_deref().map_or(true, |j| j == doc.id);
        if expects_own_jar
            && !ForgeInstaller::repair_broken_jar(
                ctx.store.instance_dir(),
                version_id,
                ctx.minecraft_version,
            )
        {
            warn!("Forge jar for {} could not be validated or repaired", version_id);
        }
        Ok(())
    }

    /// Best-effort background asset fetch; the launch never waits on it.
    /// Always reports aggregate numbers when it finishes.
    fn prefetch_assets(&self, resolved: &ResolvedManifest, assets_dir: PathBuf) {
        let Some(index_info) = resolved.asset_index().cloned() else {
            warn!("No asset index in the manifest chain, skipping asset prefetch");
            return;
        };
        let client = self.client.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let downloader = match Downloader::new(events.clone()) {
                Ok(d) => d,
                Err(e) => {
                    warn!("Asset prefetch unavailable: {}", e);
                    return;
                }
            };
            match AssetIndex::ensure(&client, &index_info, &assets_dir).await {
                Ok(index) => {
                    let entries = index.object_entries(&assets_dir);
                    let stats = downloader.fetch_batch(entries, ASSET_POOL).await;
                    info!(
                        "Assets: {} checked, {} downloaded, {} skipped",
                        stats.checked, stats.downloaded, stats.skipped
                    );
                    events.log(format!(
                        "Assets ready: {} checked, {} downloaded",
                        stats.checked, stats.downloaded
                    ));
                }
                Err(e) => warn!("Asset prefetch failed: {}", e),
            }
        });
    }

    fn report_batch(&self, what: &str, stats: BatchStats) {
        info!(
            "{}: {} checked, {} downloaded, {} skipped",
            what, stats.checked, stats.downloaded, stats.skipped
        );
        self.events.log(format!(
            "{}: {} checked, {} downloaded",
            what, stats.checked, stats.downloaded
        ));
    }
}

// ─── Supervisor ───

/// Poll the session's child until it exits. A nonzero exit with a recognized
/// failure signature — or any nonzero first exit of a transforming-loader
/// profile — gets one direct relaunch; everything else ends the session.
async fn supervise(sessions: Arc<Mutex<Option<LaunchSession>>>, events: EventSink) {
    loop {
        tokio::time::sleep(SUPERVISOR_POLL).await;
        let mut guard = sessions.lock().await;
        let Some(session) = guard.as_mut() else {
            return;
        };
        let status = match session.child.try_wait() {
            Ok(Some(status)) => status,
            Ok(None) => continue,
            Err(e) => {
                warn!("Lost track of the game process: {}", e);
                *guard = None;
                events.stopped(-1);
                return;
            }
        };

        let code = status.code().unwrap_or(-1);
        if !should_fall_back(
            code,
            session.fallback_attempted,
            session.signatures.any(),
            session.loader == LoaderKind::Fabric,
        ) {
            info!("Game {} exited with code {}", session.version_id, code);
            *guard = None;
            events.stopped(code);
            return;
        }

        events.log(format!(
            "Launch failed with code {}, retrying with a direct command",
            code
        ));
        let plan = session.direct_plan.clone();
        match spawn_game(&plan.java_bin, &plan.command_args(), &plan.working_dir, &events) {
            Ok(spawned) => {
                session.child = spawned.child;
                session.signatures = spawned.signatures;
                session.fallback_attempted = true;
                events.launched();
            }
            Err(e) => {
                warn!("Direct relaunch failed to spawn: {}", e);
                *guard = None;
                events.stopped(code);
                return;
            }
        }
    }
}

// ─── Decisions ───

fn primary_eligible(loader: LoaderKind, has_main_class: bool) -> bool {
    loader != LoaderKind::Forge && has_main_class
}

fn should_fall_back(
    exit_code: i32,
    fallback_attempted: bool,
    signature_matched: bool,
    transforming_loader: bool,
) -> bool {
    exit_code != 0 && !fallback_attempted && (signature_matched || transforming_loader)
}

fn default_main_class(loader: LoaderKind) -> &'static str {
    match loader {
        LoaderKind::Vanilla => VANILLA_MAIN_CLASS,
        LoaderKind::Fabric => FABRIC_MAIN_CLASS,
        LoaderKind::Forge => FORGE_MAIN_CLASS,
    }
}

fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

/// JVM arguments for a from-scratch launch: the substituted manifest list
/// with any manifest-supplied classpath pair replaced by ours, plus pinned
/// memory, natives and log4j settings.
fn direct_jvm_args(merged_jvm: &[String], classpath: &str, natives_dir: &Path) -> Vec<String> {
    let mut jvm = Vec::with_capacity(merged_jvm.len() + 8);
    let mut i = 0;
    while i < merged_jvm.len() {
        let arg = &merged_jvm[i];
        if arg == "-cp" || arg == "-classpath" {
            i += 2;
            continue;
        }
        jvm.push(arg.clone());
        i += 1;
    }
    if !jvm.iter().any(|a| a.starts_with("-Xmx")) {
        jvm.push("-Xmx2G".to_string());
    }
    if !jvm.iter().any(|a| a.starts_with("-Xms")) {
        jvm.push("-Xms1G".to_string());
    }
    if !jvm.iter().any(|a| a.starts_with("-Djava.library.path=")) {
        jvm.push(format!("-Djava.library.path={}", natives_dir.display()));
    }
    if !jvm.iter().any(|a| a.starts_with("-Dlog4j2.formatMsgNoLookups")) {
        jvm.push("-Dlog4j2.formatMsgNoLookups=true".to_string());
    }
    jvm.push("-cp".to_string());
    jvm.push(classpath.to_string());
    jvm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_loader_never_enters_the_primary_path() {
        assert!(!primary_eligible(LoaderKind::Forge, true));
        assert!(!primary_eligible(LoaderKind::Forge, false));
        assert!(primary_eligible(LoaderKind::Fabric, true));
        assert!(primary_eligible(LoaderKind::Vanilla, true));
        assert!(!primary_eligible(LoaderKind::Vanilla, false));
    }

    #[test]
    fn fallback_requires_failure_plus_evidence_and_runs_once() {
        // Clean exit never falls back, whatever was flagged.
        assert!(!should_fall_back(0, false, true, true));
        // Failure with a recognized signature does.
        assert!(should_fall_back(1, false, true, false));
        // Any first failure of a transforming-loader profile does too,
        // signature or not.
        assert!(should_fall_back(1, false, false, true));
        // Unexplained failure elsewhere does not.
        assert!(!should_fall_back(1, false, false, false));
        // Never a second time.
        assert!(!should_fall_back(1, true, true, true));
    }

    #[test]
    fn direct_jvm_args_replace_manifest_classpath_and_pin_defaults() {
        let merged: Vec<String> = [
            "-Djava.library.path=${natives_directory}",
            "-cp",
            "${classpath}",
            "-XX:+UseG1GC",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let jvm = direct_jvm_args(&merged, "/inst/a.jar", Path::new("/inst/natives/1.20.1"));
        assert_eq!(jvm.iter().filter(|a| *a == "-cp").count(), 1);
        assert_eq!(jvm.last().unwrap(), "/inst/a.jar");
        assert!(jvm.contains(&"-Xmx2G".to_string()));
        assert!(jvm.contains(&"-Xms1G".to_string()));
        assert!(jvm.contains(&"-XX:+UseG1GC".to_string()));
        assert!(jvm.contains(&"-Dlog4j2.formatMsgNoLookups=true".to_string()));
        // The manifest's own natives property survives; no duplicate is added.
        assert_eq!(
            jvm.iter()
                .filter(|a| a.starts_with("-Djava.library.path="))
                .count(),
            1
        );
    }

    // A transforming-loader profile gets its one direct relaunch on the
    // first non-zero exit even when no output line matched a signature.
    #[cfg(unix)]
    #[tokio::test]
    async fn transforming_loader_failure_falls_back_without_a_signature() {
        use crate::core::events::LauncherEvent;

        let dir = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventSink::channel();
        let sh = PathBuf::from("/bin/sh");

        let spawned = spawn_game(
            &sh,
            &["-c".to_string(), "exit 1".to_string()],
            dir.path(),
            &events,
        )
        .unwrap();
        assert!(!spawned.signatures.any());

        let session = LaunchSession {
            version_id: "fabric-loader-0.15.11-1.20.1".into(),
            loader: LoaderKind::Fabric,
            fallback_attempted: false,
            child: spawned.child,
            signatures: spawned.signatures,
            direct_plan: DirectLaunchPlan {
                java_bin: sh,
                main_class: "-c".into(),
                jvm_args: vec![],
                game_args: vec!["exit 0".into()],
                working_dir: dir.path().to_path_buf(),
            },
        };
        let sessions = Arc::new(Mutex::new(Some(session)));
        supervise(Arc::clone(&sessions), events).await;

        assert!(sessions.lock().await.is_none());
        let mut relaunched = false;
        let mut final_code = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                LauncherEvent::Launched => relaunched = true,
                LauncherEvent::Stopped { code } => final_code = Some(code),
                _ => {}
            }
        }
        assert!(relaunched);
        assert_eq!(final_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unexplained_failure_ends_the_session_without_retry() {
        use crate::core::events::LauncherEvent;

        let dir = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventSink::channel();
        let sh = PathBuf::from("/bin/sh");

        let spawned = spawn_game(
            &sh,
            &["-c".to_string(), "exit 3".to_string()],
            dir.path(),
            &events,
        )
        .unwrap();

        let session = LaunchSession {
            version_id: "1.20.1".into(),
            loader: LoaderKind::Vanilla,
            fallback_attempted: false,
            child: spawned.child,
            signatures: spawned.signatures,
            direct_plan: DirectLaunchPlan {
                java_bin: sh,
                main_class: "-c".into(),
                jvm_args: vec![],
                game_args: vec!["exit 0".into()],
                working_dir: dir.path().to_path_buf(),
            },
        };
        let sessions = Arc::new(Mutex::new(Some(session)));
        supervise(Arc::clone(&sessions), events).await;

        assert!(sessions.lock().await.is_none());
        let mut launches = 0;
        let mut final_code = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                LauncherEvent::Launched => launches += 1,
                LauncherEvent::Stopped { code } => final_code = Some(code),
                _ => {}
            }
        }
        assert_eq!(launches, 0);
        assert_eq!(final_code, Some(3));
    }
}
