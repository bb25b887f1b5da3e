//! Poll-based file picker
//!
//! `open_dialog` starts the native dialog on a background thread and returns
//! immediately. The render loop calls `check` once per frame; when the user has
//! picked (or cancelled), the stored callback runs exactly once on the calling
//! thread with the chosen paths and the caller's context.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

/// A named set of file extensions offered by the dialog.
#[derive(Debug, Clone, Copy)]
pub struct FileFilter {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
}

pub const IMAGE_FILTER: FileFilter = FileFilter {
    name: "Images",
    extensions: &["png", "jpg", "jpeg", "bmp"],
};

/// Blocking dialog implementation run off the render thread.
pub type Picker = Arc<dyn Fn(&FileFilter, Option<&Path>) -> Vec<PathBuf> + Send + Sync>;

type Completion<C> = Box<dyn FnOnce(&mut C, Vec<PathBuf>)>;

/// An open dialog: its result channel and the callback waiting on it.
struct PendingDialog<C> {
    receiver: Receiver<Vec<PathBuf>>,
    callback: Completion<C>,
}

pub struct FileLoader<C> {
    pending: Option<PendingDialog<C>>,
    picker: Picker,
    start_dir: Option<PathBuf>,
}

impl<C> Default for FileLoader<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FileLoader<C> {
    /// Loader backed by the native file dialog.
    pub fn new() -> Self {
        Self::with_picker(Arc::new(native_dialog))
    }

    pub fn with_picker(picker: Picker) -> Self {
        Self {
            pending: None,
            picker,
            start_dir: None,
        }
    }

    /// Directory the next dialog opens in.
    pub fn set_start_dir(&mut self, dir: Option<PathBuf>) {
        self.start_dir = dir;
    }

    /// Directory of the most recent pick, or the one set explicitly.
    pub fn start_dir(&self) -> Option<&Path> {
        self.start_dir.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Open a dialog unless one is already pending. Returns false if rejected.
    pub fn open_dialog(&mut self, filter: FileFilter, callback: impl FnOnce(&mut C, Vec<PathBuf>) + 'static) -> bool {
        if self.pending.is_some() {
            tracing::warn!("A file dialog is already open");
            return false;
        }
        let (sender, receiver) = mpsc::channel();
        self.pending = Some(PendingDialog {
            receiver,
            callback: Box::new(callback),
        });

        let picker = self.picker.clone();
        let start_dir = self.start_dir.clone();
        std::thread::spawn(move || {
            let paths = picker(&filter, start_dir.as_deref());
            let _ = sender.send(paths);
        });
        true
    }

    /// Run the pending callback if its dialog finished. Returns true if it ran.
    pub fn check(&mut self, context: &mut C) -> bool {
        let Some(dialog) = &self.pending else {
            return false;
        };
        let paths = match dialog.receiver.try_recv() {
            Ok(paths) => paths,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("File dialog thread exited without a result");
                self.pending = None;
                return false;
            }
        };
        let Some(PendingDialog { callback, .. }) = self.pending.take() else {
            return false;
        };
        tracing::debug!("File dialog returned {} path(s)", paths.len());
        if let Some(dir) = paths
            .first()
            .and_then(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            self.start_dir = Some(dir.to_path_buf());
        }
        callback(context, paths);
        true
    }
}

fn native_dialog(filter: &FileFilter, start_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dialog = rfd::AsyncFileDialog::new()
        .add_filter(filter.name, filter.extensions)
        .add_filter("All Files", &["*"]);
    if let Some(dir) = start_dir {
        dialog = dialog.set_directory(dir);
    }
    pollster::block_on(dialog.pick_files())
        .map(|files| files.into_iter().map(|file| file.path().to_path_buf()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn fixed_picker(paths: &'static [&'static str]) -> Picker {
        Arc::new(move |_: &FileFilter, _: Option<&Path>| paths.iter().map(PathBuf::from).collect())
    }

    fn wait_for(loader: &mut FileLoader<Vec<PathBuf>>, context: &mut Vec<PathBuf>) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if loader.check(context) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_callback_runs_once() {
        let mut loader = FileLoader::with_picker(fixed_picker(&["a.png", "b.jpg"]));
        let mut received = Vec::new();

        assert!(loader.open_dialog(IMAGE_FILTER, |received: &mut Vec<PathBuf>, paths| received.extend(paths)));
        assert!(loader.is_pending());
        assert!(wait_for(&mut loader, &mut received));

        assert_eq!(received, vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]);
        assert!(!loader.is_pending());
        assert!(!loader.check(&mut received));
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn test_second_open_is_rejected_while_pending() {
        let mut loader = FileLoader::with_picker(fixed_picker(&["only.png"]));
        let mut received = Vec::new();

        assert!(loader.open_dialog(IMAGE_FILTER, |received: &mut Vec<PathBuf>, paths| received.extend(paths)));
        assert!(!loader.open_dialog(IMAGE_FILTER, |_, _| panic!("rejected dialog must not complete")));
        assert!(wait_for(&mut loader, &mut received));
        assert_eq!(received, vec![PathBuf::from("only.png")]);

        // A new dialog is accepted once the first has completed.
        assert!(loader.open_dialog(IMAGE_FILTER, |received: &mut Vec<PathBuf>, _| received.clear()));
        assert!(wait_for(&mut loader, &mut received));
        assert!(received.is_empty());
    }

    #[test]
    fn test_picked_directory_becomes_start_dir() {
        let mut loader = FileLoader::with_picker(fixed_picker(&["/images/sky.png"]));
        let mut received = Vec::new();
        assert!(loader.start_dir().is_none());

        loader.open_dialog(IMAGE_FILTER, |received: &mut Vec<PathBuf>, paths| received.extend(paths));
        assert!(wait_for(&mut loader, &mut received));
        assert_eq!(loader.start_dir(), Some(Path::new("/images")));
    }

    #[test]
    fn test_crashed_picker_releases_dialog() {
        let picker: Picker = Arc::new(|_: &FileFilter, _: Option<&Path>| -> Vec<PathBuf> { panic!("dialog backend failed") });
        let mut loader = FileLoader::with_picker(picker);
        let mut received = Vec::new();

        assert!(loader.open_dialog(IMAGE_FILTER, |_: &mut Vec<PathBuf>, _| panic!("callback must not run")));
        let deadline = Instant::now() + Duration::from_secs(5);
        while loader.is_pending() && Instant::now() < deadline {
            assert!(!loader.check(&mut received));
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!loader.is_pending());

        loader.picker = fixed_picker(&["after.png"]);
        assert!(loader.open_dialog(IMAGE_FILTER, |received: &mut Vec<PathBuf>, paths| received.extend(paths)));
        assert!(wait_for(&mut loader, &mut received));
        assert_eq!(received, vec![PathBuf::from("after.png")]);
    }

    #[test]
    fn test_check_without_dialog() {
        let mut loader: FileLoader<Vec<PathBuf>> = FileLoader::with_picker(fixed_picker(&[]));
        assert!(!loader.check(&mut Vec::new()));
    }
}
