//! Media selection and downloads.
//!
//! Files are picked out of posts by [`Category`] and written into an output
//! directory, either one after another or through a fixed pool of workers.
//!
//! Output paths are decided before any byte is fetched, so a
//! [`DownloadReport`] always lists them in selection order, whichever worker
//! finishes first.

use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    error::Error,
    file::File,
    result::Result,
    session::Session,
    thread::Post,
};
use log::{debug, info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
};

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 10;

/// Time allowed for a single file transfer, body included.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// A named set of file type labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category<'a> {
    labels: &'a [&'a str],
    all: bool,
}

impl Category<'static> {
    /// JPEG images.
    pub const JPEG: Self = Self::from_labels(&["jpeg"]);
    /// PNG images.
    pub const PNG: Self = Self::from_labels(&["png"]);
    /// GIF animations.
    pub const GIF: Self = Self::from_labels(&["gif"]);
    /// WebM videos.
    pub const WEBM: Self = Self::from_labels(&["webm"]);
    /// MP4 videos.
    pub const MP4: Self = Self::from_labels(&["mp4"]);
    /// Anything that moves.
    pub const VIDEO: Self = Self::from_labels(&["mp4", "gif", "webm"]);
    /// Still images.
    pub const IMAGES: Self = Self::from_labels(&["jpeg", "png"]);
    /// Every file, whatever its type.
    pub const ALL: Self = Self {
        labels: &[],
        all: true,
    };

    /// Looks up a predefined category by name, ignoring case.
    pub fn named(name: &str) -> Option<Self> {
        let category = match name.to_ascii_lowercase().as_str() {
            "jpeg" => Self::JPEG,
            "png" => Self::PNG,
            "gif" => Self::GIF,
            "webm" => Self::WEBM,
            "mp4" => Self::MP4,
            "video" => Self::VIDEO,
            "images" => Self::IMAGES,
            "all" => Self::ALL,
            _ => return None,
        };
        Some(category)
    }
}

impl<'a> Category<'a> {
    /// A category made of `labels`.
    pub const fn from_labels(labels: &'a [&'a str]) -> Self {
        Self { labels, all: false }
    }

    /// Returns the labels of the category. Empty for [`Category::ALL`].
    pub fn labels(&self) -> &[&'a str] {
        self.labels
    }

    /// Returns true if the category selects every file.
    ///
    /// A category without labels selects everything as well.
    pub fn is_all(&self) -> bool {
        self.all || self.labels.is_empty()
    }

    /// Returns true if `label` belongs to the category.
    pub fn contains(&self, label: &str) -> bool {
        self.all || self.labels.contains(&label)
    }

    /// Returns true if the type of `file` belongs to the category.
    ///
    /// Files with an unknown type code only match [`Category::ALL`].
    pub fn matches(&self, file: &File) -> bool {
        self.is_all() || file.kind().is_some_and(|label| self.contains(label))
    }
}

impl Display for Category<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            write!(f, "ALL")
        } else {
            write!(f, "{}", self.labels.join("|"))
        }
    }
}

/// Keeps the files matching `category`, in order.
///
/// `None` keeps everything.
pub fn select<'f>(
    files: impl IntoIterator<Item = &'f File>,
    category: Option<Category<'_>>,
) -> Vec<File> {
    files
        .into_iter()
        .filter(|file| category.map_or(true, |c| c.matches(file)))
        .cloned()
        .collect()
}

/// Flattens the files of `posts` in post order, then keeps those matching
/// `category`.
pub fn collect(posts: &[Post], category: Option<Category<'_>>) -> Vec<File> {
    select(posts.iter().flat_map(Post::files), category)
}

/// The outcome of a batch of downloads.
///
/// Every intended path is listed, in selection order, even when its
/// download failed. Failures are listed separately.
#[derive(Debug, Default)]
pub struct DownloadReport {
    paths: Vec<PathBuf>,
    failures: Vec<(PathBuf, Error)>,
    // indices into `paths`, ascending, one per failure
    failed: Vec<usize>,
}

impl DownloadReport {
    /// Returns every output path, in selection order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns the downloads that failed, in selection order.
    pub fn failures(&self) -> &[(PathBuf, Error)] {
        &self.failures
    }

    /// Returns true if every file was downloaded.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the paths of the files that were written.
    ///
    /// Two files sharing a name are told apart by position, so a failed
    /// one never hides a successful one.
    pub fn downloaded(&self) -> impl Iterator<Item = &Path> {
        self.paths
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.failed.binary_search(idx).is_err())
            .map(|(_, path)| path.as_path())
    }

    /// Returns the paths if every download succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first failure as an [`Error::Download`].
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        match self.failures.into_iter().next() {
            None => Ok(self.paths),
            Some((path, Error::Download { source, .. })) => Err(Error::Download { path, source }),
            Some((path, source)) => Err(Error::Download {
                path,
                source: Box::new(source),
            }),
        }
    }
}

/// Writes files into a directory over a shared [`Session`].
#[derive(Debug, Clone)]
pub struct Downloader {
    session: Session,
    concurrent: bool,
    workers: usize,
    timeout: Duration,
}

impl Downloader {
    /// A downloader using `session`.
    ///
    /// With `concurrent` set, batches go through a pool of `workers` tasks.
    /// A worker count of zero is treated as one.
    pub fn new(session: Session, concurrent: bool, workers: usize) -> Self {
        Self {
            session,
            concurrent,
            workers: workers.max(1),
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Sets the time allowed for each file transfer.
    ///
    /// Unlike API calls, downloads default to [`DEFAULT_DOWNLOAD_TIMEOUT`].
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the time allowed for each file transfer.
    pub fn download_timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true if batches are downloaded through the worker pool.
    pub fn concurrent(&self) -> bool {
        self.concurrent
    }

    /// Returns the size of the worker pool.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Downloads the files of `post` that match `category` into `out_dir`.
    ///
    /// Returns `None` without touching the filesystem when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if `out_dir` cannot be created. Failed downloads are
    /// listed in the report instead.
    pub async fn download_post(
        &self,
        post: &Post,
        out_dir: impl AsRef<Path>,
        category: Category<'_>,
    ) -> Result<Option<DownloadReport>> {
        if post.files().is_empty() {
            debug!("post {} has no files", post.num());
            return Ok(None);
        }
        self.download_selected(select(post.files(), Some(category)), out_dir)
            .await
    }

    /// Downloads `files` into `out_dir`.
    ///
    /// Returns `None` without touching the filesystem if `files` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `out_dir` cannot be created.
    pub async fn download_selected(
        &self,
        files: Vec<File>,
        out_dir: impl AsRef<Path>,
    ) -> Result<Option<DownloadReport>> {
        if files.is_empty() {
            return Ok(None);
        }
        let out_dir = out_dir.as_ref();
        tokio::fs::create_dir_all(out_dir).await?;

        let paths: Vec<PathBuf> = files
            .iter()
            .map(|file| out_dir.join(file.local_name()))
            .collect();

        info!(
            "downloading {} files into {} ({})",
            files.len(),
            out_dir.display(),
            if self.concurrent {
                "pooled"
            } else {
                "sequential"
            }
        );

        let mut failed = if self.concurrent {
            self.run_pool(files, out_dir).await?
        } else {
            self.run_sequential(&files, out_dir).await
        };
        failed.sort_by_key(|(idx, _)| *idx);

        let (failed, failures): (Vec<usize>, Vec<(PathBuf, Error)>) = failed
            .into_iter()
            .map(|(idx, err)| (idx, (paths[idx].clone(), err)))
            .unzip();

        info!(
            "downloaded {}/{} files into {}",
            paths.len() - failures.len(),
            paths.len(),
            out_dir.display()
        );
        Ok(Some(DownloadReport {
            paths,
            failures,
            failed,
        }))
    }

    /// Downloads a single file into `out_dir` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] on any network, status, or disk error.
    pub async fn download_file(&self, file: &File, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = out_dir.as_ref().join(file.local_name());
        match self.fetch_into(file, &path).await {
            Ok(()) => Ok(path),
            Err(source) => Err(Error::Download {
                path,
                source: Box::new(source),
            }),
        }
    }

    async fn fetch_into(&self, file: &File, path: &Path) -> Result<()> {
        let url = self.session.build_url(file.path())?;
        info!("downloading: {}", url);
        let bytes = self.session.fetch_bytes(url.as_str(), self.timeout).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn run_sequential(&self, files: &[File], out_dir: &Path) -> Vec<(usize, Error)> {
        let mut failed = Vec::new();
        for (idx, file) in files.iter().enumerate() {
            if let Err(err) = self.download_file(file, out_dir).await {
                warn!("{}", err);
                failed.push((idx, err));
            }
        }
        failed
    }

    async fn run_pool(&self, files: Vec<File>, out_dir: &Path) -> Result<Vec<(usize, Error)>> {
        let total = files.len();
        let (job_tx, job_rx) = mpsc::unbounded_channel::<(usize, File)>();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(usize, Result<PathBuf>)>();

        for job in files.into_iter().enumerate() {
            job_tx
                .send(job)
                .map_err(|_| Error::Worker("job queue closed".into()))?;
        }
        // workers stop once the queue is empty
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut pool = JoinSet::new();
        for worker in 0..self.workers.min(total) {
            let jobs = Arc::clone(&job_rx);
            let done = done_tx.clone();
            let this = self.clone();
            let out_dir = out_dir.to_path_buf();
            pool.spawn(async move {
                loop {
                    let job = jobs.lock().await.recv().await;
                    let Some((idx, file)) = job else { break };
                    let outcome = this.download_file(&file, &out_dir).await;
                    if done.send((idx, outcome)).is_err() {
                        break;
                    }
                }
                debug!("download worker {} drained", worker);
            });
        }
        drop(done_tx);

        // drain barrier: every worker has exited before results are read
        let mut crashed = None;
        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                warn!("download worker stopped: {}", err);
                crashed = Some(err.to_string());
            }
        }

        let mut outcomes = HashMap::with_capacity(total);
        while let Some((idx, outcome)) = done_rx.recv().await {
            outcomes.insert(idx, outcome);
        }

        let mut failed = Vec::new();
        for idx in 0..total {
            match outcomes.remove(&idx) {
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!("{}", err);
                    failed.push((idx, err));
                }
                None => failed.push((
                    idx,
                    Error::Worker(
                        crashed
                            .clone()
                            .unwrap_or_else(|| "job was never picked up".into()),
                    ),
                )),
            }
        }
        Ok(failed)
    }
}
