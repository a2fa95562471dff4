//! Backend deployment artifact.
//!
//! The package directory is rebuilt from scratch on every run: third-party
//! dependencies are installed by a container matching the serverless runtime,
//! then the project's own sources and data files are copied next to them and
//! the whole tree is zipped into the artifact.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::BackendSettings;
use crate::error::{DeployError, ErrorCode, Result};
use crate::subprocess::{ProcessCommandBuilder, SubprocessManager};

/// Mount point of the backend directory inside the build container
const CONTAINER_WORKDIR: &str = "/var/task";

fn is_build_debris(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == "__pycache__")
        || path.extension().is_some_and(|ext| ext == "pyc")
}

pub struct BackendPackager<'a> {
    subprocess: &'a SubprocessManager,
    settings: &'a BackendSettings,
    backend_dir: PathBuf,
}

impl<'a> BackendPackager<'a> {
    pub fn new(
        subprocess: &'a SubprocessManager,
        settings: &'a BackendSettings,
        backend_dir: PathBuf,
    ) -> Self {
        Self {
            subprocess,
            settings,
            backend_dir,
        }
    }

    pub fn package_dir(&self) -> PathBuf {
        self.backend_dir.join(&self.settings.package_dir)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.backend_dir.join(&self.settings.artifact)
    }

    /// Build the artifact and return its path
    pub async fn build(&self) -> Result<PathBuf> {
        self.create_virtualenv().await?;
        self.reset_package_dir()?;
        self.install_runtime_dependencies().await?;
        let copied = self.stage_sources()?;
        debug!("Copied {} project files into the package", copied);

        let artifact = self.artifact_path();
        let entries = self.write_archive(&artifact)?;
        info!("Wrote {} ({} entries)", artifact.display(), entries);
        Ok(artifact)
    }

    /// Isolated interpreter environment with the requirements installed
    async fn create_virtualenv(&self) -> Result<()> {
        let venv = self.settings.venv_dir.display().to_string();
        let requirements = self.settings.requirements.display().to_string();

        let create = ProcessCommandBuilder::new(&self.settings.python)
            .args(["-m", "venv", venv.as_str()])
            .current_dir(&self.backend_dir)
            .build();
        self.subprocess
            .run_checked(create)
            .await
            .map_err(|e| DeployError::from(e).with_context("create virtual environment"))?;

        let pip = self
            .backend_dir
            .join(&self.settings.venv_dir)
            .join("bin")
            .join("pip");
        let install = ProcessCommandBuilder::new(&pip.display().to_string())
            .args(["install", "-r", requirements.as_str()])
            .current_dir(&self.backend_dir)
            .build();
        self.subprocess
            .run_checked(install)
            .await
            .map_err(|e| DeployError::from(e).with_context("install requirements"))?;
        Ok(())
    }

    fn reset_package_dir(&self) -> Result<()> {
        let package_dir = self.package_dir();
        if package_dir.exists() {
            fs::remove_dir_all(&package_dir).map_err(|e| {
                DeployError::storage_with_code(
                    ErrorCode::STORAGE_IO_ERROR,
                    "cannot remove previous package directory",
                    Some(package_dir.clone()),
                )
                .with_source(e)
            })?;
        }
        fs::create_dir_all(&package_dir)?;
        Ok(())
    }

    /// Install dependencies with binaries built for the runtime platform
    async fn install_runtime_dependencies(&self) -> Result<()> {
        let mount = format!("{}:{}", self.backend_dir.display(), CONTAINER_WORKDIR);
        let requirements = self.settings.requirements.display().to_string();
        let target = self.settings.package_dir.display().to_string();

        let command = ProcessCommandBuilder::new(&self.settings.container_program)
            .args(["run", "--rm", "--platform"])
            .arg(&self.settings.runtime_platform)
            .args(["-v", mount.as_str(), "-w", CONTAINER_WORKDIR])
            .arg(&self.settings.runtime_image)
            .args(["pip", "install", "-r", requirements.as_str(), "-t", target.as_str()])
            .current_dir(&self.backend_dir)
            .build();
        self.subprocess
            .run_checked(command)
            .await
            .map_err(|e| DeployError::from(e).with_context("install runtime dependencies"))?;
        Ok(())
    }

    /// Copy configured sources and data files into the package directory,
    /// preserving their paths relative to the backend directory
    fn stage_sources(&self) -> Result<usize> {
        let package_dir = self.package_dir();
        let mut copied = 0;

        for item in self.settings.sources.iter().chain(&self.settings.data_files) {
            let source = self.backend_dir.join(item);
            if !source.exists() {
                return Err(DeployError::storage_with_code(
                    ErrorCode::STORAGE_NOT_FOUND,
                    format!("package input '{}' does not exist", item.display()),
                    Some(source),
                ));
            }

            for entry in WalkDir::new(&source)
                .into_iter()
                .filter_entry(|e| !is_build_debris(e.path()))
            {
                let entry = entry?;
                let relative = entry
                    .path()
                    .strip_prefix(&self.backend_dir)
                    .map_err(|_| {
                        DeployError::storage(format!(
                            "'{}' is outside the backend directory",
                            entry.path().display()
                        ))
                    })?;
                let destination = package_dir.join(relative);

                if entry.file_type().is_dir() {
                    fs::create_dir_all(&destination)?;
                } else {
                    if let Some(parent) = destination.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(entry.path(), &destination)?;
                    copied += 1;
                }
            }
        }

        Ok(copied)
    }

    /// Zip the package directory into `artifact`, replacing any previous one
    fn write_archive(&self, artifact: &Path) -> Result<usize> {
        let package_dir = self.package_dir();
        if artifact.exists() {
            fs::remove_file(artifact)?;
        }

        let file = File::create(artifact).map_err(|e| {
            DeployError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                "cannot create artifact",
                Some(artifact.to_path_buf()),
            )
            .with_source(e)
        })?;
        let mut zip = ZipWriter::new(file);
        let mut entries = 0;

        for entry in WalkDir::new(&package_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let name = archive_name(entry.path(), &package_dir);
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(file_mode(entry.path(), entry.file_type().is_dir()));

            if entry.file_type().is_dir() {
                zip.add_directory(name, options)?;
            } else {
                zip.start_file(name, options)?;
                let mut source = File::open(entry.path())?;
                io::copy(&mut source, &mut zip)?;
            }
            entries += 1;
        }

        zip.finish()?.flush()?;
        Ok(entries)
    }
}

/// Entry name with `/` separators regardless of platform
fn archive_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(path: &Path, is_dir: bool) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    let fallback = if is_dir { 0o755 } else { 0o644 };
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(fallback)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path, is_dir: bool) -> u32 {
    if is_dir {
        0o755
    } else {
        0o644
    }
}
