//! Display power via external commands
//!
//! Raspberry Pi firmware exposes `vcgencmd display_power`; X11 desktops fall
//! back to DPMS through `xset`.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

use super::DisplayPower;
use crate::{CoreError, Result};

/// Upper bound for a single power command
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// A power command: program, fixed args, and the args for ON/OFF
#[derive(Debug, Clone)]
pub struct CommandDisplayPower {
    label: String,
    program: String,
    args: Vec<String>,
    on_arg: Vec<String>,
    off_arg: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandDisplayPower {
    /// `vcgencmd display_power 1|0`
    pub fn vcgencmd() -> Self {
        Self {
            label: "vcgencmd".to_string(),
            program: "vcgencmd".to_string(),
            args: vec!["display_power".to_string()],
            on_arg: vec!["1".to_string()],
            off_arg: vec!["0".to_string()],
            env: Vec::new(),
        }
    }

    /// `DISPLAY=:0 xset dpms force on|off`
    pub fn xset() -> Self {
        Self {
            label: "xset".to_string(),
            program: "xset".to_string(),
            args: vec!["dpms".to_string(), "force".to_string()],
            on_arg: vec!["on".to_string()],
            off_arg: vec!["off".to_string()],
            env: vec![("DISPLAY".to_string(), ":0".to_string())],
        }
    }

    /// Arbitrary program; `on`/`off` are appended to `args`
    pub fn custom(program: impl Into<String>, args: &[&str], on: &[&str], off: &[&str]) -> Self {
        let program = program.into();
        let to_owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            label: program.clone(),
            program,
            args: to_owned(args),
            on_arg: to_owned(on),
            off_arg: to_owned(off),
            env: Vec::new(),
        }
    }

    /// Full argument list for a power state
    pub fn args_for(&self, on: bool) -> Vec<String> {
        let state = if on { &self.on_arg } else { &self.off_arg };
        self.args.iter().chain(state.iter()).cloned().collect()
    }
}

#[async_trait]
impl DisplayPower for CommandDisplayPower {
    async fn set_power(&self, on: bool) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(on)).kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let output = tokio::time::timeout(COMMAND_TIMEOUT, cmd.output())
            .await
            .map_err(|_| CoreError::Display(format!("{} timed out", self.label)))?
            .map_err(|e| CoreError::Display(format!("{} not runnable: {}", self.label, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::Display(format!(
                "{} exited with {}: {}",
                self.label,
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!("{} {:?} ok", self.label, self.args_for(on));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcgencmd_args() {
        let power = CommandDisplayPower::vcgencmd();
        assert_eq!(power.args_for(true), vec!["display_power", "1"]);
        assert_eq!(power.args_for(false), vec!["display_power", "0"]);
    }

    #[test]
    fn test_xset_args_and_env() {
        let power = CommandDisplayPower::xset();
        assert_eq!(power.args_for(true), vec!["dpms", "force", "on"]);
        assert_eq!(power.args_for(false), vec!["dpms", "force", "off"]);
        assert_eq!(power.env, vec![("DISPLAY".to_string(), ":0".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_program_is_display_error() {
        let power = CommandDisplayPower::custom("definitely-not-a-real-binary-xyz", &[], &[], &[]);
        let err = power.set_power(true).await.unwrap_err();
        assert!(matches!(err, CoreError::Display(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_checked() {
        let ok = CommandDisplayPower::custom("true", &[], &[], &[]);
        assert!(ok.set_power(false).await.is_ok());

        let failing = CommandDisplayPower::custom("false", &[], &[], &[]);
        assert!(failing.set_power(false).await.is_err());
    }
}
