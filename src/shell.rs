//! Shell command worker used by the `fanout` binary.
//!
//! Each work item is a command line run through `sh -c`. A command fails if
//! it cannot be spawned or exits non-zero.

use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Run one command line to completion.
///
/// `item` is exported to the child as `FANOUT_ITEM` so scripts can tell
/// which work item they are; `payload`, if any, as `FANOUT_PAYLOAD`.
pub async fn run_command(item: &str, command: &str, payload: Option<&str>) -> Result<()> {
    debug!(item, command, "running command");

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .env("FANOUT_ITEM", item)
        .kill_on_drop(true);
    if let Some(payload) = payload {
        cmd.env("FANOUT_PAYLOAD", payload);
    }

    let status = cmd.status().await?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Other(match status.code() {
            Some(code) => format!("command exited with status {code}"),
            None => "command terminated by signal".to_string(),
        }))
    }
}
