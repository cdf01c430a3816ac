//! External provisioning procedures (the setup scripts shipped with fiber)

use crate::common::command_utils::execute_streaming;
use crate::error::ProvisionError;
use log::info;
use std::path::PathBuf;

/// An opaque procedure that prepares part of the analysis environment
pub trait EnvironmentProvisioner {
    fn name(&self) -> &str;

    fn setup(&self) -> Result<(), ProvisionError>;
}

/// Runs a shell script found in the checkout, with the checkout as cwd
pub struct ScriptProvisioner {
    shell: String,
    script: String,
    workdir: PathBuf,
}

impl ScriptProvisioner {
    pub fn new(shell: impl Into<String>, script: impl Into<String>, workdir: PathBuf) -> Self {
        Self {
            shell: shell.into(),
            script: script.into(),
            workdir,
        }
    }
}

impl EnvironmentProvisioner for ScriptProvisioner {
    fn name(&self) -> &str {
        &self.script
    }

    fn setup(&self) -> Result<(), ProvisionError> {
        let script_path = self.workdir.join(&self.script);
        if !script_path.is_file() {
            return Err(ProvisionError::MissingScript(
                script_path.display().to_string(),
            ));
        }

        info!("Running {} {} in {}", self.shell, self.script, self.workdir.display());
        let status = execute_streaming(&self.shell, &[self.script.as_str()], Some(&self.workdir))
            .map_err(|source| ProvisionError::Launch {
                script: self.script.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProvisionError::Failed {
                script: self.script.clone(),
                code: status.code(),
            })
        }
    }
}
