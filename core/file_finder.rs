use crate::{Config, CoreError, FileList};
use clap::{Parser, Subcommand};
use ignore::overrides::{Override, OverrideBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    about = "Rule-based batch image manipulation (main arguments)",
    long_about = "These are the main arguments for running the configured manipulation rules."
)]
pub struct ImanipArgs {
    #[clap(
        long,
        short,
        value_name = "FILE",
        default_value = "imanip.toml",
        help = "Rule configuration file"
    )]
    pub config: PathBuf,

    #[clap(
        long,
        value_name = "DIR",
        help = "Base directory for relative folder paths [default: directory of the config file]"
    )]
    pub base_dir: Option<PathBuf>,

    #[clap(long, help = "Print the commands that would run without running them")]
    pub dry_run: bool,
    #[clap(long, help = "Skip the confirmation prompt")]
    pub no_confirm: bool,
    #[clap(
        long,
        help = "Check that every configured command and folder can be resolved"
    )]
    pub check_dependencies: bool,
    #[clap(long, short, help = "Enable debug logging")]
    pub verbose: bool,
}

impl ImanipArgs {
    pub fn resolved_base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.base_dir {
            return dir.clone();
        }
        match self.config.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl Default for ImanipArgs {
    fn default() -> Self {
        ImanipArgs {
            config: PathBuf::from("imanip.toml"),
            base_dir: None,
            dry_run: false,
            no_confirm: false,
            check_dependencies: false,
            verbose: false,
        }
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    #[clap(about = "Generate shell completion scripts")]
    Completion(CompletionArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct CompletionArgs {
    #[clap(value_parser = clap::value_parser!(clap_complete::Shell))]
    pub shell: clap_complete::Shell,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    name = "imanip",
    version = "0.1.0",
    about = "Rule-based batch image manipulation",
    long_about = "Applies exclusion rules to the images of configured folders and runs an external\ncommand on every image that remains.",
    propagate_version = true
)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Option<Command>,

    #[clap(flatten)]
    pub main_opts: ImanipArgs,
}

/// Where the images of a folder alias live and how they are listed.
pub trait ImageStore {
    fn resolve_folder(&self, alias: &str) -> Result<PathBuf, CoreError>;

    /// Ordered snapshot of the images in `folder`.
    fn list_ordered_files(&self, folder: &Path) -> Result<FileList, CoreError>;
}

/// Folder aliases mapped onto local directories.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    folders: BTreeMap<String, PathBuf>,
    base_dir: PathBuf,
    include: Option<Override>,
}

impl DirectoryStore {
    pub fn new(folders: BTreeMap<String, PathBuf>, base_dir: impl Into<PathBuf>) -> Self {
        DirectoryStore {
            folders,
            base_dir: base_dir.into(),
            include: None,
        }
    }

    pub fn from_config(config: &Config, base_dir: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Self::new(config.folders.clone(), base_dir).with_include(&config.listing.include)
    }

    /// Restricts listings to file names matching `patterns` (gitignore glob
    /// syntax, `!` negates).
    pub fn with_include(mut self, patterns: &[String]) -> Result<Self, CoreError> {
        if patterns.is_empty() {
            self.include = None;
            return Ok(self);
        }
        let mut o = OverrideBuilder::new(&self.base_dir);
        for p in patterns {
            o.add(p).map_err(|e| CoreError::Config {
                path: "[listing] include".to_string(),
                message: format!("{}: {}", p, e),
            })?;
        }
        let built = o.build().map_err(|e| CoreError::Config {
            path: "[listing] include".to_string(),
            message: e.to_string(),
        })?;
        self.include = Some(built);
        Ok(self)
    }

    fn is_included(&self, file_name: &Path) -> bool {
        match &self.include {
            Some(include) => !include.matched(file_name, false).is_ignore(),
            None => true,
        }
    }
}

impl ImageStore for DirectoryStore {
    fn resolve_folder(&self, alias: &str) -> Result<PathBuf, CoreError> {
        let configured = self
            .folders
            .get(alias)
            .ok_or_else(|| CoreError::FolderResolution {
                folder: alias.to_string(),
                reason: "no directory is configured for this folder".to_string(),
            })?;
        let path = if configured.is_absolute() {
            configured.clone()
        } else {
            self.base_dir.join(configured)
        };
        if !path.is_dir() {
            return Err(CoreError::FolderResolution {
                folder: alias.to_string(),
                reason: format!("{} is not a directory", path.display()),
            });
        }
        Ok(path)
    }

    fn list_ordered_files(&self, folder: &Path) -> Result<FileList, CoreError> {
        let mut f = Vec::new();
        let w = WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name();
        for i in w {
            let e = match i {
                Ok(e) => e,
                // Only the folder itself failing is fatal; an unreadable entry
                // such as a dangling symlink is left out of the listing.
                Err(err) if err.depth() > 0 => {
                    tracing::warn!(folder = %folder.display(), error = %err, "skipping entry");
                    continue;
                }
                Err(err) => {
                    return Err(CoreError::FolderResolution {
                        folder: folder.display().to_string(),
                        reason: err.to_string(),
                    });
                }
            };
            if e.file_type().is_file() && self.is_included(Path::new(e.file_name())) {
                f.push(e.into_path());
            }
        }
        Ok(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, names: &[&str]) {
        for n in names {
            fs::write(dir.join(n), b"").unwrap();
        }
    }

    fn file_names(list: &FileList) -> Vec<String> {
        list.iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    fn store_for(root: &Path) -> DirectoryStore {
        let mut folders = BTreeMap::new();
        folders.insert("media".to_string(), PathBuf::from("media"));
        folders.insert("master".to_string(), root.join("master"));
        DirectoryStore::new(folders, root)
    }

    #[test]
    fn resolves_relative_and_absolute_aliases() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("media")).unwrap();
        fs::create_dir(root.path().join("master")).unwrap();
        let store = store_for(root.path());

        assert_eq!(store.resolve_folder("media").unwrap(), root.path().join("media"));
        assert_eq!(store.resolve_folder("master").unwrap(), root.path().join("master"));
    }

    #[test]
    fn unknown_or_missing_folders_fail() {
        let root = tempfile::tempdir().unwrap();
        let store = store_for(root.path());

        assert!(matches!(
            store.resolve_folder("ocr"),
            Err(CoreError::FolderResolution { .. })
        ));
        assert!(matches!(
            store.resolve_folder("media"),
            Err(CoreError::FolderResolution { .. })
        ));
    }

    #[test]
    fn lists_files_sorted_by_name_without_subdirectories() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("media");
        fs::create_dir(&media).unwrap();
        touch(&media, &["00000003.tif", "00000001.tif", "00000002.tif"]);
        fs::create_dir(media.join("thumbs")).unwrap();
        touch(&media.join("thumbs"), &["00000001.jpg"]);

        let store = store_for(root.path());
        let listed = store.list_ordered_files(&media).unwrap();
        assert_eq!(
            file_names(&listed),
            ["00000001.tif", "00000002.tif", "00000003.tif"]
        );
        assert!(listed.iter().all(|p| p.starts_with(&media)));
    }

    #[test]
    fn include_patterns_filter_by_file_name() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("media");
        fs::create_dir(&media).unwrap();
        touch(&media, &["a.tif", "b.xml", "c.jpg", "d.tif"]);

        let store = store_for(root.path())
            .with_include(&["*.tif".to_string(), "*.jpg".to_string()])
            .unwrap();
        let listed = store.list_ordered_files(&media).unwrap();
        assert_eq!(file_names(&listed), ["a.tif", "c.jpg", "d.tif"]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("media");
        fs::create_dir(&media).unwrap();
        touch(&media, &["a.tif", "b.tif"]);
        std::os::unix::fs::symlink(root.path().join("missing.tif"), media.join("a2.tif")).unwrap();
        std::os::unix::fs::symlink(media.join("b.tif"), media.join("b2.tif")).unwrap();

        let store = store_for(root.path());
        let listed = store.list_ordered_files(&media).unwrap();
        assert_eq!(file_names(&listed), ["a.tif", "b.tif", "b2.tif"]);
    }

    #[test]
    fn listing_a_missing_folder_fails() {
        let root = tempfile::tempdir().unwrap();
        let store = store_for(root.path());
        let err = store
            .list_ordered_files(&root.path().join("gone"))
            .unwrap_err();
        assert!(matches!(err, CoreError::FolderResolution { .. }));
    }

    #[test]
    fn base_dir_defaults_to_config_directory() {
        let args = ImanipArgs {
            config: PathBuf::from("/srv/goobi/rules.toml"),
            ..ImanipArgs::default()
        };
        assert_eq!(args.resolved_base_dir(), PathBuf::from("/srv/goobi"));
        assert_eq!(ImanipArgs::default().resolved_base_dir(), PathBuf::from("."));

        let explicit = ImanipArgs {
            base_dir: Some(PathBuf::from("/data")),
            ..args
        };
        assert_eq!(explicit.resolved_base_dir(), PathBuf::from("/data"));
    }
}
