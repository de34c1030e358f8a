//! Sequential review of every eligible file under a root directory

use super::{
    extract, Extraction, ExtractionWarning, FileOutcome, FileReport, ReviewError, ReviewStage,
    ReviewTask, RunError, RunOutcome, RunSummary,
};
use crate::config::{build_ignore_set, is_ignored, Config, DEFAULT_ALLOWED_EXTENSIONS};
use crate::llm::LlmClient;
use crate::prompt::build_review_prompt;
use anyhow::Result;
use globset::GlobSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What to do with a reply that did not follow the fenced-block format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Leave the file untouched
    #[default]
    Skip,
    /// Write the raw reply
    Write,
}

#[derive(Debug, Clone)]
pub struct ReviewOptions {
    /// Lowercase extensions with leading dot
    allowed_extensions: Vec<String>,
    ignore_set: Option<GlobSet>,
    fallback: FallbackPolicy,
    dry_run: bool,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore_set: None,
            fallback: FallbackPolicy::Skip,
            dry_run: false,
        }
    }
}

impl ReviewOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let ignore_set = if config.ignore.is_empty() {
            None
        } else {
            Some(build_ignore_set(&config.ignore)?)
        };
        let fallback = if config.fallback_writes() {
            FallbackPolicy::Write
        } else {
            FallbackPolicy::Skip
        };

        Ok(Self {
            allowed_extensions: config.get_allowed_extensions(),
            ignore_set,
            fallback,
            dry_run: false,
        })
    }

    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    /// Run every stage except backup and write
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn ignore(mut self, ignore_set: GlobSet) -> Self {
        self.ignore_set = Some(ignore_set);
        self
    }

    fn is_allowed(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        let Some(ref set) = self.ignore_set else {
            return false;
        };
        let relative = path.strip_prefix(root).unwrap_or(path);
        is_ignored(relative, set) || is_ignored(path, set)
    }
}

/// `<path>.bak`, next to the original
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Drives one file at a time through read → prompt → reply → extract →
/// backup → write. A failure on one file never stops the walk.
pub struct ReviewPipeline<'a> {
    client: &'a dyn LlmClient,
    options: ReviewOptions,
}

impl<'a> ReviewPipeline<'a> {
    pub fn new(client: &'a dyn LlmClient, options: ReviewOptions) -> Self {
        Self { client, options }
    }

    /// Review every eligible file under `root`.
    pub fn run(&self, root: &Path) -> Result<RunOutcome, RunError> {
        if !root.exists() {
            return Err(RunError::RootNotFound(root.to_path_buf()));
        }

        log::info!(
            "Processing files in '{}' with {}",
            root.display(),
            self.client.vendor()
        );

        let (files, skipped) = self.collect_files(root);
        if files.is_empty() {
            log::info!("No allowed files found in '{}' to process", root.display());
            return Ok(RunOutcome::NothingToDo {
                root: root.to_path_buf(),
                skipped,
            });
        }

        let reports: Vec<FileReport> = files.iter().map(|path| self.process_file(path)).collect();

        let summary = RunSummary {
            root: root.to_path_buf(),
            files: reports,
            skipped,
        };
        log::info!(
            "Finished processing {} files ({} written, {} failed)",
            summary.attempted(),
            summary.written(),
            summary.failed()
        );
        Ok(RunOutcome::Completed(summary))
    }

    /// Eligible files in walk order, plus the number of files passed over
    fn collect_files(&self, root: &Path) -> (Vec<PathBuf>, usize) {
        let mut files = Vec::new();
        let mut skipped = 0;

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under '{}': {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if self.options.is_allowed(path) && !self.options.is_ignored(root, path) {
                files.push(path.to_path_buf());
            } else {
                log::trace!("Skipping {}", path.display());
                skipped += 1;
            }
        }

        (files, skipped)
    }

    /// Run a single file through every stage.
    pub fn process_file(&self, path: &Path) -> FileReport {
        log::info!("Analyzing file: {}", path.display());

        let mut warnings = Vec::new();
        let outcome = match self.review(path, &mut warnings) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!(
                    "{}: {} failed, file not modified: {}",
                    path.display(),
                    e.stage(),
                    e
                );
                FileOutcome::Failed(e)
            }
        };

        FileReport {
            path: path.to_path_buf(),
            outcome,
            warnings,
        }
    }

    fn review(
        &self,
        path: &Path,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Result<FileOutcome, ReviewError> {
        let content = fs::read_to_string(path).map_err(ReviewError::Read)?;
        let task = ReviewTask::new(path, content);
        log::debug!("{}: {}", path.display(), ReviewStage::Read);

        let prompt = build_review_prompt(&task.path, task.extension_hint(), &task.content);
        log::debug!("{}: {}", path.display(), ReviewStage::Prompted);

        let reply = self.client.send(&prompt)?;
        log::debug!(
            "{}: {} ({} chars)",
            path.display(),
            ReviewStage::Replied,
            reply.len()
        );

        let result = extract(&reply, &task.extension);
        for warning in &result.warnings {
            log::warn!("{}: {}", path.display(), warning);
        }
        warnings.extend(result.warnings);

        let (new_content, fallback) = match result.extraction {
            Extraction::Success(content) => (content, false),
            Extraction::Fallback(content) => match self.options.fallback {
                FallbackPolicy::Write => (content, true),
                FallbackPolicy::Skip => {
                    log::warn!(
                        "{}: reply did not follow the code block format; file not modified \
                         (enable fallback writes to write it anyway)",
                        path.display()
                    );
                    return Ok(FileOutcome::Rejected);
                }
            },
            Extraction::Failed(failure) => return Err(failure.into()),
        };
        let changed = new_content != task.content;

        if self.options.dry_run {
            log::info!(
                "{}: would write ({})",
                path.display(),
                if changed { "changed" } else { "unchanged" }
            );
            return Ok(FileOutcome::WouldWrite { fallback, changed });
        }

        // Never overwrite without a backup
        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|source| ReviewError::Backup {
            path: backup.clone(),
            source,
        })?;
        log::info!("Created backup: {}", backup.display());

        fs::write(path, &new_content).map_err(ReviewError::Write)?;
        log::info!("File '{}' updated successfully", path.display());

        Ok(FileOutcome::Written {
            backup,
            fallback,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{RemoteServiceError, Vendor};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies with a fixed script, one entry per call
    struct ScriptedClient {
        replies: Mutex<Vec<Result<String, RemoteServiceError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, RemoteServiceError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmClient for ScriptedClient {
        fn vendor(&self) -> Vendor {
            Vendor::Gemini
        }

        fn send(&self, prompt: &str) -> Result<String, RemoteServiceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(RemoteServiceError::EmptyReply {
                    vendor: Vendor::Gemini,
                }))
        }
    }

    fn ok(reply: &str) -> Result<String, RemoteServiceError> {
        Ok(reply.to_string())
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("src/app.py")),
            PathBuf::from("src/app.py.bak")
        );
    }

    #[test]
    fn test_is_allowed_case_insensitive() {
        let options = ReviewOptions::default();
        assert!(options.is_allowed(Path::new("README.MD")));
        assert!(options.is_allowed(Path::new("a/b/c.json")));
        assert!(!options.is_allowed(Path::new("a.py.bak")));
        assert!(!options.is_allowed(Path::new("tool.exe")));
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        let client = ScriptedClient::new(vec![]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());

        let result = pipeline.run(&dir.path().join("nope"));
        assert!(matches!(result, Err(RunError::RootNotFound(_))));
    }

    #[test]
    fn test_prompt_carries_file_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("style.css");
        fs::write(&path, "p { color: red }").unwrap();

        let client = ScriptedClient::new(vec![ok("```css\np { color: blue }\n```")]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());
        let report = pipeline.process_file(&path);

        assert!(matches!(
            report.outcome,
            FileOutcome::Written { changed: true, .. }
        ));
        let prompts = client.prompts.lock().unwrap();
        assert!(prompts[0].contains("```css\np { color: red }"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "p { color: blue }");
    }

    #[test]
    fn test_fallback_skipped_by_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "original").unwrap();

        let client = ScriptedClient::new(vec![ok("Sure! Here are my thoughts.")]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());
        let report = pipeline.process_file(&path);

        assert!(matches!(report.outcome, FileOutcome::Rejected));
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_fallback_written_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "original").unwrap();

        let client = ScriptedClient::new(vec![ok("rewritten without fences")]);
        let options = ReviewOptions::default().fallback(FallbackPolicy::Write);
        let pipeline = ReviewPipeline::new(&client, options);
        let report = pipeline.process_file(&path);

        assert!(matches!(
            report.outcome,
            FileOutcome::Written { fallback: true, .. }
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "rewritten without fences");
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "original");
    }

    #[test]
    fn test_blank_reply_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x=1").unwrap();

        // A client that lets whitespace through still hits the extractor's empty check
        let client = ScriptedClient::new(vec![ok("  \n ")]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());
        let report = pipeline.process_file(&path);

        match report.outcome {
            FileOutcome::Failed(e) => assert_eq!(e.stage(), ReviewStage::Extracted),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=1");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_invalid_utf8_fails_at_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let client = ScriptedClient::new(vec![]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());
        let report = pipeline.process_file(&path);

        match report.outcome {
            FileOutcome::Failed(e) => assert_eq!(e.stage(), ReviewStage::Read),
            other => panic!("expected read failure, got {:?}", other),
        }
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_backup_failure_prevents_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x=1").unwrap();
        // A directory where the backup file should go makes the copy fail
        fs::create_dir(backup_path(&path)).unwrap();

        let client = ScriptedClient::new(vec![ok("```python\nx=2\n```")]);
        let pipeline = ReviewPipeline::new(&client, ReviewOptions::default());
        let report = pipeline.process_file(&path);

        match report.outcome {
            FileOutcome::Failed(e) => assert_eq!(e.stage(), ReviewStage::BackedUp),
            other => panic!("expected backup failure, got {:?}", other),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=1");
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "x=1").unwrap();

        let client = ScriptedClient::new(vec![ok("```python\nx = 1\n```")]);
        let options = ReviewOptions::default().dry_run(true);
        let pipeline = ReviewPipeline::new(&client, options);

        let outcome = pipeline.run(dir.path()).unwrap();
        let RunOutcome::Completed(summary) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.would_write(), 1);
        assert!(matches!(
            summary.files[0].outcome,
            FileOutcome::WouldWrite { changed: true, fallback: false }
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "x=1");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_ignore_patterns_skip_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("main.js"), "let a = 1;").unwrap();

        let client = ScriptedClient::new(vec![ok("```javascript\nlet a = 1;\n```")]);
        let options = ReviewOptions::default()
            .ignore(build_ignore_set(&["node_modules/**".to_string()]).unwrap());
        let pipeline = ReviewPipeline::new(&client, options);

        let RunOutcome::Completed(summary) = pipeline.run(dir.path()).unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.attempted(), 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.files[0].path.ends_with("main.js"));
    }

    #[test]
    fn test_options_from_config() {
        let config: Config = serde_json::from_str(
            r#"{ "fallbackWrites": true, "allowedExtensions": [".rs"], "ignore": ["target/**"] }"#,
        )
        .unwrap();
        let options = ReviewOptions::from_config(&config).unwrap();

        assert_eq!(options.fallback, FallbackPolicy::Write);
        assert!(options.is_allowed(Path::new("src/lib.rs")));
        assert!(!options.is_allowed(Path::new("app.py")));
        assert!(options.is_ignored(Path::new("/w"), Path::new("/w/target/debug/x.rs")));
    }

    #[test]
    fn test_cli_override_enables_fallback_writes() {
        let config: Config = serde_json::from_str(r#"{ "fallbackWrites": false }"#).unwrap();
        let config = config.merge_with_cli(crate::config::CliOverrides {
            fallback_writes: Some(true),
            ..Default::default()
        });

        let options = ReviewOptions::from_config(&config).unwrap();
        assert_eq!(options.fallback, FallbackPolicy::Write);
    }
}
