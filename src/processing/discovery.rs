//! Directory walking and task discovery

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, ResizeError};
use crate::processing::formats::has_supported_extension;
use crate::processing::task::ResizeTask;

/// Lazy iterator over the resize tasks found below an input root.
///
/// Entries are visited in file-name order. Unreadable entries below the root
/// are logged and skipped. Symlinks to files are included; symlinked
/// directories are not entered. If the output root lives inside the input
/// root, that subtree is never entered.
pub struct TaskWalker {
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    input_root: PathBuf,
    output_root: PathBuf,
    target_widths: Arc<[u32]>,
}

impl TaskWalker {
    /// Start walking `input_root`.
    ///
    /// Fails with `NotFound` when the root does not exist and with a
    /// configuration error when it is not a directory, or when the output
    /// root is the input root or one of its ancestors.
    pub fn new<P, Q>(input_root: P, output_root: Q, target_widths: &[u32]) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input_root = input_root.as_ref().to_path_buf();
        let output_root = output_root.as_ref().to_path_buf();

        let metadata = match std::fs::metadata(&input_root) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ResizeError::not_found(input_root));
            }
            Err(e) => return Err(ResizeError::Io(e)),
        };
        if !metadata.is_dir() {
            return Err(ResizeError::config(format!(
                "Input folder is not a directory: {}",
                input_root.display()
            )));
        }

        check_output_root(&input_root, &output_root)?;

        let excluded = nested_output_root(&input_root, &output_root);
        if let Some(ref excluded) = excluded {
            debug!("Skipping nested output directory {:?}", excluded);
        }

        let entries = WalkDir::new(&input_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| match &excluded {
                Some(excluded) => !(entry.file_type().is_dir() && entry.path() == excluded),
                None => true,
            });

        Ok(Self {
            entries: Box::new(entries),
            input_root,
            output_root,
            target_widths: Arc::from(target_widths),
        })
    }

    fn task_for(&self, entry: &DirEntry) -> Option<ResizeTask> {
        if !has_supported_extension(entry.path()) {
            return None;
        }
        // walkdir reports the link itself; follow it for files only
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file {
            return None;
        }

        let relative = entry.path().strip_prefix(&self.input_root).ok()?;
        Some(ResizeTask::new(
            entry.path().to_path_buf(),
            self.output_root.join(relative),
            Arc::clone(&self.target_widths),
        ))
    }
}

impl Iterator for TaskWalker {
    type Item = ResizeTask;

    fn next(&mut self) -> Option<ResizeTask> {
        loop {
            match self.entries.next()? {
                Ok(entry) => {
                    if let Some(task) = self.task_for(&entry) {
                        debug!("Discovered {:?}", task.source());
                        return Some(task);
                    }
                }
                Err(e) => warn!("Skipping unreadable entry: {}", ResizeError::from(e)),
            }
        }
    }
}

/// Collect every task below `input_root` into a list
pub fn discover_tasks<P, Q>(input_root: P, output_root: Q, target_widths: &[u32]) -> Result<Vec<ResizeTask>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    Ok(TaskWalker::new(input_root, output_root, target_widths)?.collect())
}

/// Mirrored destinations must never land on a source file.
///
/// An output root equal to the input root would copy every image onto
/// itself; an output root above the input root can map one source onto
/// another. A missing output root cannot alias anything.
fn check_output_root(input_root: &Path, output_root: &Path) -> Result<()> {
    let (Ok(input), Ok(output)) = (input_root.canonicalize(), output_root.canonicalize()) else {
        return Ok(());
    };

    if input == output {
        return Err(ResizeError::config(format!(
            "Output folder {} is the input folder",
            output_root.display()
        )));
    }
    if input.starts_with(&output) {
        return Err(ResizeError::config(format!(
            "Output folder {} contains the input folder {}",
            output_root.display(),
            input_root.display()
        )));
    }
    Ok(())
}

/// The output root's path as the walker will see it, if it sits below the input root
fn nested_output_root(input_root: &Path, output_root: &Path) -> Option<PathBuf> {
    let input = input_root.canonicalize().ok()?;
    let output = output_root.canonicalize().ok()?;
    let relative = output.strip_prefix(&input).ok()?;
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(input_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really an image").unwrap();
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = discover_tasks(dir.path().join("missing"), dir.path().join("out"), &[100])
            .unwrap_err();
        assert!(matches!(err, ResizeError::NotFound { .. }));
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "single.png");
        let err = discover_tasks(dir.path().join("single.png"), dir.path().join("out"), &[100])
            .unwrap_err();
        assert!(matches!(err, ResizeError::Config { .. }));
    }

    #[test]
    fn test_empty_root_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let tasks = discover_tasks(dir.path(), "out", &[100]).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_filters_and_mirrors_paths() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "a/b/img.png");
        touch(input.path(), "top.JPG");
        touch(input.path(), "c/photo.jpeg");
        touch(input.path(), "c/anim.gif");
        touch(input.path(), "c/scan.bmp");
        touch(input.path(), "c/notes.txt");
        touch(input.path(), "c/photopng");

        let tasks = discover_tasks(input.path(), Path::new("/out"), &[100, 300]).unwrap();
        let destinations: Vec<_> = tasks.iter().map(|t| t.destination().to_path_buf()).collect();

        assert_eq!(
            destinations,
            vec![
                PathBuf::from("/out/a/b/img.png"),
                PathBuf::from("/out/c/photo.jpeg"),
                PathBuf::from("/out/top.JPG"),
            ]
        );
        assert!(tasks.iter().all(|t| t.target_widths() == [100, 300]));
        assert_eq!(tasks[0].source(), input.path().join("a/b/img.png"));
    }

    #[test]
    fn test_nested_output_is_skipped() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "img.png");
        touch(input.path(), "resized/img.png");
        touch(input.path(), "resized/img_100px.png");

        let output = input.path().join("resized");
        let tasks = discover_tasks(input.path(), &output, &[100]).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].destination(), output.join("img.png"));
    }

    #[test]
    fn test_output_root_equal_to_input_is_rejected() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "img.png");

        let err = discover_tasks(input.path(), input.path(), &[100]).unwrap_err();
        assert!(matches!(err, ResizeError::Config { .. }));

        // Same directory spelled differently
        let err = discover_tasks(input.path(), input.path().join("."), &[100]).unwrap_err();
        assert!(matches!(err, ResizeError::Config { .. }));
        assert_eq!(fs::read(input.path().join("img.png")).unwrap(), b"not really an image");
    }

    #[test]
    fn test_output_root_above_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "photos/img.png");

        let err = discover_tasks(dir.path().join("photos"), dir.path(), &[100]).unwrap_err();
        assert!(matches!(err, ResizeError::Config { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_included() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "real/a.png");
        touch(dir.path(), "real/nested/b.png");
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/a.png"), input.join("link.png")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/nested"), input.join("dirlink")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/missing.png"), input.join("dangling.png"))
            .unwrap();

        let tasks = discover_tasks(&input, dir.path().join("out"), &[100]).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].source(), input.join("link.png"));
        assert_eq!(tasks[0].destination(), dir.path().join("out/link.png"));
    }

    #[test]
    fn test_walker_is_lazy() {
        let input = TempDir::new().unwrap();
        touch(input.path(), "1.png");
        touch(input.path(), "2.png");

        let mut walker = TaskWalker::new(input.path(), "out", &[]).unwrap();
        assert!(walker.next().is_some());
        assert!(walker.next().is_some());
        assert!(walker.next().is_none());
    }
}
