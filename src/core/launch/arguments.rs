// ─── Argument Substitution ───
// Manifest arguments are templates full of `${token}` placeholders. The
// token table is built once per launch from the identity, the instance
// layout and the resolved version; spawn-time values (classpath, natives)
// are inserted on top of it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::core::auth::LaunchProfile;

/// Flags that take a value and are safe to drop wholesale when their value
/// never substituted.
const VALUE_BEARING_FLAGS: &[&str] = &[
    "--width",
    "--height",
    "--quickPlayPath",
    "--quickPlaySingleplayer",
    "--quickPlayMultiplayer",
    "--quickPlayRealms",
];

/// Flags the game rejects when they appear more than once.
const SINGLE_USE_FLAGS: &[&str] = &[
    "--launchTarget",
    "--fml.forgeVersion",
    "--fml.mcVersion",
    "--fml.forgeGroup",
    "--fml.mcpVersion",
];

/// Inputs for the static half of the token table.
pub struct TokenContext<'a> {
    pub profile: &'a LaunchProfile,
    pub version_id: &'a str,
    pub version_type: &'a str,
    pub game_dir: &'a Path,
    pub assets_dir: &'a Path,
    pub assets_index_name: &'a str,
    pub libraries_dir: &'a Path,
}

/// Placeholder-name → replacement map consulted during substitution.
/// Unknown placeholders stay untouched so the downstream cleanup can decide
/// what to do with them.
pub struct TokenTable {
    values: HashMap<String, String>,
}

impl TokenTable {
    pub fn new(ctx: &TokenContext<'_>) -> Self {
        let mut values = HashMap::new();
        let mut put = |key: &str, value: String| {
            values.insert(key.to_string(), value);
        };

        put("auth_player_name", ctx.profile.username.clone());
        put("version_name", ctx.version_id.to_string());
        put("game_directory", path_string(ctx.game_dir));
        put("assets_root", path_string(ctx.assets_dir));
        put("assets_index_name", ctx.assets_index_name.to_string());
        put("auth_uuid", ctx.profile.uuid.clone());
        put("auth_access_token", ctx.profile.access_token.clone());
        put("user_type", ctx.profile.user_type.clone());
        put("version_type", ctx.version_type.to_string());
        put("auth_xuid", String::new());
        put("clientid", String::new());
        put("auth_session", ctx.profile.access_token.clone());
        put("library_directory", path_string(ctx.libraries_dir));
        put("classpath_separator", classpath_separator().to_string());

        Self { values }
    }

    /// Spawn-time values such as `classpath` and `natives_directory`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Single left-to-right pass replacing every known `${key}`.
    pub fn apply(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.values.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // Unterminated placeholder, keep it verbatim.
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    pub fn apply_all(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|a| self.apply(a)).collect()
    }
}

pub fn classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn is_unresolved(arg: &str) -> bool {
    arg.contains("${")
}

/// Drop game arguments that never substituted cleanly.
///
/// `--demo` is dropped unconditionally. A value-bearing flag whose value is
/// unresolved (or missing) is dropped together with the value; any other
/// stray unresolved token is dropped alone. JVM arguments are never fed
/// through this — an unresolved JVM token is left for the runtime to reject.
pub fn clean_game_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if arg == "--demo" {
            i += 1;
            continue;
        }
        if VALUE_BEARING_FLAGS.contains(&arg.as_str()) {
            match args.get(i + 1) {
                Some(value) if !is_unresolved(value) => {
                    out.push(arg.clone());
                    out.push(value.clone());
                }
                _ => {}
            }
            i += 2;
            continue;
        }
        if is_unresolved(arg) {
            i += 1;
            continue;
        }
        out.push(arg.clone());
        i += 1;
    }
    out
}

/// Collapse repeated single-use flags, keeping the first occurrence and the
/// value that follows it.
pub fn sanitize_duplicates(args: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if SINGLE_USE_FLAGS.contains(&arg.as_str()) {
            if seen.insert(arg.as_str()) {
                out.push(arg.clone());
                if let Some(value) = args.get(i + 1) {
                    out.push(value.clone());
                }
            }
            i += 2;
            continue;
        }
        out.push(arg.clone());
        i += 1;
    }
    out
}
