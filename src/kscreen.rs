use anyhow::{bail, Context};
use tracing::{debug, info};

use std::process::{Command, Output};

pub trait DisplayTool {
    /// Raw text describing every output the display server knows about.
    fn query_outputs(&mut self) -> anyhow::Result<String>;

    /// Applies the given `output.<name>.<action>` arguments in one go.
    fn apply(&mut self, args: &[String]) -> anyhow::Result<()>;
}

pub struct KscreenDoctor {
    command: String,
    dry_run: bool,
}

impl KscreenDoctor {
    pub fn new(command: &str, dry_run: bool) -> Self {
        Self {
            command: command.to_string(),
            dry_run,
        }
    }

    fn run(&self, args: &[String]) -> anyhow::Result<Output> {
        debug!("Running {} {}", self.command, args.join(" "));

        let output = Command::new(&self.command)
            .args(args)
            .output()
            .with_context(|| format!("Couldn't run {}", self.command))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(output)
    }
}

impl DisplayTool for KscreenDoctor {
    fn query_outputs(&mut self) -> anyhow::Result<String> {
        let output = self.run(&["-o".to_string()])?;

        String::from_utf8(output.stdout)
            .context("kscreen-doctor printed invalid UTF-8")
    }

    fn apply(&mut self, args: &[String]) -> anyhow::Result<()> {
        if self.dry_run {
            println!("{} {}", self.command, args.join(" "));
            return Ok(());
        }

        self.run(args)?;
        info!("Applied {} directives", args.len());

        Ok(())
    }
}
