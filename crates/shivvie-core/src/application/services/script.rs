//! Shell execution for script actions.

use tokio::process::Command;
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::ScriptContext;
use crate::error::ShivvieResult;

impl ScriptContext {
    /// Run one command line through the configured shell in `cwd`.
    ///
    /// Output is inherited so the user sees it live. `FORCE_COLOR=1` keeps
    /// colour in tools that would otherwise detect a non-TTY parent.
    ///
    /// # Errors
    ///
    /// [`ApplicationError::ScriptFailed`] if the shell cannot be spawned or
    /// the command exits unsuccessfully.
    pub async fn run(&self, line: &str) -> ShivvieResult<()> {
        debug!(shell = %self.shell.display(), cwd = %self.cwd.display(), "$ {line}");

        let failed = |reason: String| ApplicationError::ScriptFailed {
            command: line.to_string(),
            reason,
        };

        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(line)
            .current_dir(&self.cwd)
            .env("FORCE_COLOR", "1")
            .status()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !status.success() {
            return Err(failed(format!("exited with {status}")).into());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::ShivvieError;

    fn ctx(cwd: PathBuf) -> ScriptContext {
        ScriptContext {
            cwd,
            shell: PathBuf::from("/bin/sh"),
        }
    }

    #[tokio::test]
    async fn runs_in_the_scoped_directory() {
        let dir = tempfile::tempdir().unwrap();
        let before = std::env::current_dir().unwrap();

        ctx(dir.path().to_path_buf())
            .run("pwd > where.txt && printf %s \"$FORCE_COLOR\" > color.txt")
            .await
            .unwrap();

        let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            PathBuf::from(recorded.trim()).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("color.txt")).unwrap(), "1");
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    async fn non_zero_exit_is_script_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = ctx(dir.path().to_path_buf()).run("exit 3").await.unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Application(ApplicationError::ScriptFailed { .. })
        ));
    }
}
