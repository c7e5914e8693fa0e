mod arguments;
mod orchestrator;
mod session;
mod signatures;
mod task;

pub use arguments::{
    classpath_separator, clean_game_args, sanitize_duplicates, TokenContext, TokenTable,
};
pub use orchestrator::{LaunchRequest, Orchestrator, RequestAck};
pub use session::{DirectLaunchPlan, LaunchSession};
pub use signatures::{match_line, FailureSignature, SignatureFlags};
pub use task::{spawn_game, SpawnedChild};
