use crate::adapters::spreadsheet::is_spreadsheet;
use crate::domain::ports::SourceProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Source files named explicitly in the configuration or on the command line.
#[derive(Debug, Clone)]
pub struct StaticSources {
    files: Vec<PathBuf>,
}

impl StaticSources {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl SourceProvider for StaticSources {
    async fn source_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.files.clone())
    }
}

/// Download folder the mail fetcher drops attachments into.
///
/// Each zip archive is unpacked into a folder named after it (spreadsheet
/// entries only) and then deleted. When archives were delivered, only their
/// entries are returned; otherwise the loose spreadsheets in the folder are.
/// Returned paths are sorted by file name.
#[derive(Debug, Clone)]
pub struct InboxSources {
    dir: PathBuf,
}

impl InboxSources {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn extract_archive(&self, archive_path: &Path) -> Result<Vec<PathBuf>> {
        let mut archive = ZipArchive::new(File::open(archive_path)?)?;
        let folder = archive_path
            .file_stem()
            .map(|stem| self.dir.join(stem))
            .unwrap_or_else(|| self.dir.join("archive"));
        let mut extracted = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }

            // enclosed_name 會擋掉 ../ 之類的路徑
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!("Skipping unsafe archive entry: {}", entry.name());
                continue;
            };
            if !is_spreadsheet(&relative) {
                tracing::debug!("Skipping non-spreadsheet entry: {}", relative.display());
                continue;
            }

            let target = folder.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            extracted.push(target);
        }

        tracing::info!(
            "📦 Archive {} unpacked into {} ({} spreadsheet(s))",
            archive_path.display(),
            folder.display(),
            extracted.len()
        );
        Ok(extracted)
    }
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

#[async_trait]
impl SourceProvider for InboxSources {
    async fn source_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        entries.sort();

        let (archives, loose): (Vec<PathBuf>, Vec<PathBuf>) =
            entries.into_iter().partition(|path| is_zip(path));

        let mut files = Vec::new();
        if archives.is_empty() {
            files.extend(loose.into_iter().filter(|path| is_spreadsheet(path)));
        } else {
            for archive in &archives {
                files.extend(self.extract_archive(archive)?);
                fs::remove_file(archive)?;
            }
            // 已有新的附件，資料夾裡舊的檔案不再使用
            let ignored = loose.iter().filter(|path| is_spreadsheet(path)).count();
            if ignored > 0 {
                tracing::debug!("Ignoring {} loose spreadsheet(s) in {}", ignored, self.dir.display());
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files.dedup();

        tracing::debug!("Inbox {} delivered {} file(s)", self.dir.display(), files.len());
        Ok(files)
    }
}
