use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    board::{Board, Boards},
    error::Error,
    file::File,
    media::{self, Category, DownloadReport, Downloader, DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_WORKERS},
    message::Message,
    rank,
    result::Result,
    session::{Request, Session, DEFAULT_BASE_URL, DEFAULT_TIMEOUT},
    thread::{Post, Thread, ThreadCatalog, ThreadRef, ThreadWrapper},
};
use log::debug;
use serde::Deserialize;

/// Board selected when none is configured.
pub const DEFAULT_BOARD: &str = "b";

/// Configuration of a [`Client`].
///
/// Every value is fixed once the client is built, except for the active
/// board and the passcode hash.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    board: String,
    passcode: Option<String>,
    proxies: Vec<(String, String)>,
    concurrent: bool,
    workers: usize,
    debug: bool,
    timeout: Duration,
    download_timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            board: DEFAULT_BOARD.to_string(),
            passcode: None,
            proxies: Vec::new(),
            concurrent: false,
            workers: DEFAULT_WORKERS,
            debug: false,
            timeout: DEFAULT_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }
}

impl ClientBuilder {
    /// Sets the base URL every path is joined to.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the board selected after construction.
    #[must_use]
    pub fn board(mut self, board: impl Into<String>) -> Self {
        self.board = board.into();
        self
    }

    /// Sets the passcode used by [`Client::auth_passcode`].
    #[must_use]
    pub fn passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = Some(passcode.into());
        self
    }

    /// Routes requests for `scheme` (`http`, `https`, or `all`) through `proxy`.
    #[must_use]
    pub fn proxy(mut self, scheme: impl Into<String>, proxy: impl Into<String>) -> Self {
        self.proxies.push((scheme.into(), proxy.into()));
        self
    }

    /// Downloads batches through a worker pool instead of one by one.
    #[must_use]
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Sets the size of the download worker pool.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Logs request and response details at `info` instead of `debug`.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the timeout of every API request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the time allowed for each file download, body included.
    #[must_use]
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Builds the client: opens the session, loads every board, and selects
    /// the configured board.
    ///
    /// # Errors
    ///
    /// [`Error::CatalogUnavailable`] if the boards cannot be loaded,
    /// [`Error::BoardNotFound`] if the configured board does not exist.
    pub async fn build(self) -> Result<Client> {
        let session = Session::new(&self.base_url, &self.proxies, self.timeout, self.debug)?;
        let boards = Boards::load(&session).await?;
        let board = boards
            .get(&self.board)
            .cloned()
            .ok_or_else(|| Error::BoardNotFound(self.board.clone()))?;
        let downloader = Downloader::new(session.clone(), self.concurrent, self.workers)
            .timeout(self.download_timeout);

        debug!("client ready on /{}/ with {} boards", board.id(), boards.len());
        Ok(Client {
            session,
            downloader,
            boards,
            board,
            passcode: self.passcode,
            passcode_hash: None,
        })
    }
}

/// Filters for [`Client::threads`].
///
/// Only one filter applies: `tag` wins over `subject`. The limit only
/// applies when a filter does; an unfiltered listing is returned whole.
#[derive(Debug, Clone, Copy)]
pub struct ThreadQuery<'a> {
    board: Option<&'a str>,
    tag: Option<&'a str>,
    subject: Option<&'a str>,
    limit: usize,
}

impl Default for ThreadQuery<'_> {
    fn default() -> Self {
        Self {
            board: None,
            tag: None,
            subject: None,
            limit: 1,
        }
    }
}

impl<'a> ThreadQuery<'a> {
    /// An unfiltered query on the active board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `board` instead of the active board, if it exists.
    #[must_use]
    pub fn board(mut self, board: &'a str) -> Self {
        self.board = Some(board);
        self
    }

    /// Keeps threads tagged with `tag`.
    #[must_use]
    pub fn tag(mut self, tag: &'a str) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Keeps threads whose subject contains `subject`.
    #[must_use]
    pub fn subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Caps a filtered result at `limit` threads.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Applies the filters to `threads`, keeping their order.
    pub fn apply(&self, threads: Vec<Thread>) -> Vec<Thread> {
        if self.tag.is_none() && self.subject.is_none() {
            return threads;
        }
        let keep = |t: &Thread| match (self.tag, self.subject) {
            (Some(tag), _) => t.opening_post().has_tag(tag),
            (None, Some(subject)) => t.subject().contains(subject),
            (None, None) => true,
        };
        threads
            .into_iter()
            .filter(|t| keep(t))
            .take(self.limit)
            .collect()
    }
}

/// A session with the imageboard.
///
/// ```no_run
/// # type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
/// use makaba::{media::Category, ClientBuilder};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = ClientBuilder::default().board("pr").build().await?;
///
///     let top = client.top_threads(None, "views", 1).await?;
///     if let Some(thread) = top.first() {
///         let videos = client.collect_media(thread, Some(Category::VIDEO)).await?;
///         println!("{} has {} videos", thread.subject(), videos.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    session: Session,
    downloader: Downloader,
    boards: Boards,
    board: Board,
    passcode: Option<String>,
    passcode_hash: Option<String>,
}

impl Client {
    /// Builds a client with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub async fn new() -> Result<Client> {
        Self::builder().build().await
    }

    /// Returns a builder with the default configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Returns the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the downloader used for media.
    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Returns every known board.
    pub fn boards(&self) -> &Boards {
        &self.boards
    }

    /// Returns the active board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Makes `id` the active board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoardNotFound`] if no board has that id. The active
    /// board is left unchanged.
    pub fn set_board(&mut self, id: &str) -> Result<&Board> {
        let board = self
            .boards
            .get(id)
            .ok_or_else(|| Error::BoardNotFound(id.to_string()))?;
        self.board = board.clone();
        Ok(&self.board)
    }

    /// Picks `board` if it exists, the active board otherwise.
    fn resolve_board<'a>(&'a self, board: Option<&'a str>) -> &'a str {
        match board {
            Some(id) if self.boards.contains(id) => id,
            Some(id) => {
                debug!("unknown board {}, using /{}/", id, self.board.id());
                self.board.id()
            }
            None => self.board.id(),
        }
    }

    /// Lists the threads of a board, filtered by `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched or decoded.
    pub async fn threads(&self, query: ThreadQuery<'_>) -> Result<Vec<Thread>> {
        let board = self.resolve_board(query.board);
        let catalog: ThreadCatalog = self
            .session
            .get_json(&format!("/{board}/catalog.json"))
            .await?;
        let threads = query.apply(catalog.threads);
        debug!("listed {} threads on /{}/", threads.len(), board);
        Ok(threads)
    }

    /// Returns every post of a thread, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be fetched or the response does
    /// not contain it.
    pub async fn thread_posts(
        &self,
        thread: impl ThreadRef,
        board: Option<&str>,
    ) -> Result<Vec<Post>> {
        let board = self.resolve_board(board);
        let num = thread.thread_num();
        let wrapper: ThreadWrapper = self
            .session
            .get_json(&format!("/{board}/res/{num}.json"))
            .await?;
        wrapper
            .threads
            .into_iter()
            .next()
            .map(|thread| thread.posts)
            .ok_or(Error::UnexpectedBody("a thread with posts"))
    }

    /// Ranks the threads of a board by `metric` and keeps the first `limit`.
    ///
    /// An unknown metric yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be fetched.
    pub async fn top_threads(
        &self,
        board: Option<&str>,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<Thread>> {
        let mut query = ThreadQuery::new();
        if let Some(board) = board {
            query = query.board(board);
        }
        let threads = self.threads(query).await?;
        Ok(rank::top_threads(threads, metric, limit))
    }

    /// Returns the files of every post of a thread on the active board,
    /// filtered by `category`. `None` keeps every file.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be fetched.
    pub async fn collect_media(
        &self,
        thread: impl ThreadRef,
        category: Option<Category<'_>>,
    ) -> Result<Vec<File>> {
        let posts = self.thread_posts(thread, None).await?;
        Ok(media::collect(&posts, category))
    }

    /// Downloads the files of `post` matching `category` into `out_dir`.
    ///
    /// Returns `None` if nothing matches. Failed files are listed in the
    /// report; they do not stop the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns an error if `out_dir` cannot be created.
    pub async fn download_from_post(
        &self,
        post: &Post,
        out_dir: impl AsRef<Path>,
        category: Category<'_>,
    ) -> Result<Option<DownloadReport>> {
        self.downloader.download_post(post, out_dir, category).await
    }

    /// Downloads every file of a thread matching `category` into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be fetched or `out_dir` cannot
    /// be created.
    pub async fn download_thread_media(
        &self,
        thread: impl ThreadRef,
        out_dir: impl AsRef<Path>,
        category: Category<'_>,
    ) -> Result<Option<DownloadReport>> {
        let files = self.collect_media(thread, Some(category)).await?;
        self.downloader.download_selected(files, out_dir).await
    }

    /// Downloads a single file into `out_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Download`] if the file cannot be fetched or written.
    pub async fn download_file(&self, file: &File, out_dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.downloader.download_file(file, out_dir).await
    }

    /// Authenticates a passcode and keeps the returned hash.
    ///
    /// A non-empty configured passcode takes precedence over `passcode`.
    ///
    /// # Errors
    ///
    /// [`Error::PasscodeMissing`] if there is no passcode at all, or the
    /// request error if authentication fails.
    pub async fn auth_passcode(&mut self, passcode: Option<&str>) -> Result<String> {
        #[derive(Deserialize)]
        struct Auth {
            hash: Option<String>,
        }

        let passcode = self
            .passcode
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(passcode)
            .filter(|p| !p.is_empty())
            .ok_or(Error::PasscodeMissing)?
            .to_string();

        let form = vec![
            ("task".to_string(), "auth".to_string()),
            ("usercode".to_string(), passcode),
            ("json".to_string(), "1".to_string()),
        ];
        let auth: Auth = self
            .session
            .request(Request::get("/makaba/makaba.fcgi").form(form))
            .await?
            .into_json()?;
        let hash = auth
            .hash
            .ok_or(Error::UnexpectedBody("a passcode hash"))?;

        debug!("passcode authenticated");
        self.passcode_hash = Some(hash.clone());
        Ok(hash)
    }

    /// Returns the hash of the last successful passcode authentication.
    pub fn passcode_hash(&self) -> Option<&str> {
        self.passcode_hash.as_deref()
    }

    /// Checks `message` against the limits that apply to this session.
    ///
    /// # Errors
    ///
    /// See [`Message::validate`].
    pub fn validate_message(&self, message: &Message) -> Result<()> {
        message.validate(self.passcode_hash.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn threads() -> Vec<Thread> {
        serde_json::from_value(json!([
            { "num": 1, "subject": "Rust general", "tags": "prog" },
            { "num": 2, "subject": "Go general", "tags": "prog" },
            { "num": 3, "subject": "Cooking", "tags": "food" },
            { "num": 4, "subject": "Rust jobs", "tags": "" },
            { "num": 5, "subject": "Linux", "tags": "prog" }
        ]))
        .unwrap()
    }

    fn nums(threads: &[Thread]) -> Vec<u64> {
        threads.iter().map(Thread::num).collect()
    }

    #[test]
    fn unfiltered_ignores_limit() {
        let all = ThreadQuery::new().limit(2).apply(threads());
        assert_eq!(nums(&all), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn tag_filter_keeps_order_and_limit() {
        let tagged = ThreadQuery::new().tag("prog").limit(2).apply(threads());
        assert_eq!(nums(&tagged), vec![1, 2]);

        let tagged = ThreadQuery::new().tag("prog").limit(10).apply(threads());
        assert_eq!(nums(&tagged), vec![1, 2, 5]);
    }

    #[test]
    fn default_limit_is_one() {
        let tagged = ThreadQuery::new().tag("prog").apply(threads());
        assert_eq!(nums(&tagged), vec![1]);
    }

    #[test]
    fn subject_is_a_substring_match() {
        let rust = ThreadQuery::new().subject("Rust").limit(5).apply(threads());
        assert_eq!(nums(&rust), vec![1, 4]);
    }

    #[test]
    fn tag_wins_over_subject() {
        let found = ThreadQuery::new()
            .tag("food")
            .subject("Rust")
            .limit(5)
            .apply(threads());
        assert_eq!(nums(&found), vec![3]);
    }

    #[test]
    fn no_match_is_empty() {
        assert!(ThreadQuery::new().tag("nope").limit(5).apply(threads()).is_empty());
    }
}
