//! Threads and posts.
//!
//! A board catalog lists [`Thread`]s; the posts of one thread are fetched
//! with [`crate::Client::thread_posts`].

use crate::models::{de_flag, de_float, de_num, de_tags, de_text, file::File};
use chrono::{DateTime, TimeZone, Utc};
use serde::{ser, Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Anything that identifies a thread by its number.
pub trait ThreadRef {
    /// Returns the number of the thread.
    fn thread_num(&self) -> u64;
}

impl ThreadRef for u64 {
    fn thread_num(&self) -> u64 {
        *self
    }
}

impl ThreadRef for Thread {
    fn thread_num(&self) -> u64 {
        self.num
    }
}

impl<T: ThreadRef + ?Sized> ThreadRef for &T {
    fn thread_num(&self) -> u64 {
        (**self).thread_num()
    }
}

/// A thread as listed in a board's catalog.
///
/// The catalog entry doubles as the opening post, so the same object is
/// decoded twice: once for the thread counters, once as a [`Post`].
/// It serializes back into that single flat object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Value")]
pub struct Thread {
    num: u64,
    subject: String,
    comment: String,
    views: u64,
    score: f64,
    posts_count: u64,
    lasthit: u64,
    timestamp: u64,
    opening_post: Post,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ThreadCounters {
    #[serde(deserialize_with = "de_num")]
    num: u64,
    #[serde(deserialize_with = "de_text")]
    subject: String,
    #[serde(deserialize_with = "de_text")]
    comment: String,
    #[serde(deserialize_with = "de_num")]
    views: u64,
    #[serde(deserialize_with = "de_float")]
    score: f64,
    #[serde(deserialize_with = "de_num")]
    posts_count: u64,
    #[serde(deserialize_with = "de_num")]
    lasthit: u64,
    #[serde(deserialize_with = "de_num")]
    timestamp: u64,
}

impl TryFrom<Value> for Thread {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let counters = ThreadCounters::deserialize(&value)?;
        let opening_post = Post::deserialize(value)?;
        Ok(Self {
            num: counters.num,
            subject: counters.subject,
            comment: counters.comment,
            views: counters.views,
            score: counters.score,
            posts_count: counters.posts_count,
            lasthit: counters.lasthit,
            timestamp: counters.timestamp,
            opening_post,
        })
    }
}

impl Serialize for Thread {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut value = serde_json::to_value(&self.opening_post).map_err(ser::Error::custom)?;
        let Value::Object(fields) = &mut value else {
            return Err(ser::Error::custom("post did not serialize to an object"));
        };
        fields.insert("num".into(), self.num.into());
        fields.insert("subject".into(), self.subject.clone().into());
        fields.insert("comment".into(), self.comment.clone().into());
        fields.insert("views".into(), self.views.into());
        fields.insert("score".into(), self.score.into());
        fields.insert("posts_count".into(), self.posts_count.into());
        fields.insert("lasthit".into(), self.lasthit.into());
        fields.insert("timestamp".into(), self.timestamp.into());
        value.serialize(serializer)
    }
}

impl Thread {
    /// Returns the thread number.
    pub fn num(&self) -> u64 {
        self.num
    }

    /// Returns the subject of the thread.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the comment of the opening post.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the view counter.
    pub fn views(&self) -> u64 {
        self.views
    }

    /// Returns the score of the thread. The server reports it as a
    /// fractional, possibly negative, number.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Returns the number of posts in the thread.
    pub fn posts_count(&self) -> u64 {
        self.posts_count
    }

    /// Returns the UNIX timestamp of the last bump.
    pub fn lasthit(&self) -> u64 {
        self.lasthit
    }

    /// Returns the UNIX timestamp of the thread's creation.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the time of the last bump, if the timestamp is valid.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.lasthit).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    /// Returns the opening post.
    pub fn opening_post(&self) -> &Post {
        &self.opening_post
    }
}

/// A single post of a thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    /// Post number, unique per board.
    #[serde(deserialize_with = "de_num")]
    num: u64,

    /// Position of the post inside its thread.
    #[serde(deserialize_with = "de_num")]
    number: u64,

    /// Number of the thread this post replies to, `0` for opening posts.
    #[serde(deserialize_with = "de_num")]
    parent: u64,

    #[serde(deserialize_with = "de_text")]
    comment: String,

    #[serde(deserialize_with = "de_text")]
    name: String,

    #[serde(deserialize_with = "de_text")]
    trip: String,

    #[serde(deserialize_with = "de_text")]
    email: String,

    #[serde(deserialize_with = "de_text")]
    subject: String,

    /// Formatted post date.
    #[serde(deserialize_with = "de_text")]
    date: String,

    #[serde(deserialize_with = "de_num")]
    timestamp: u64,

    #[serde(deserialize_with = "de_num")]
    lasthit: u64,

    #[serde(deserialize_with = "de_tags")]
    tags: Vec<String>,

    #[serde(deserialize_with = "de_flag")]
    sticky: bool,

    #[serde(deserialize_with = "de_flag")]
    closed: bool,

    #[serde(deserialize_with = "de_flag")]
    banned: bool,

    /// Endless threads never sink.
    #[serde(deserialize_with = "de_flag")]
    endless: bool,

    #[serde(deserialize_with = "de_flag")]
    op: bool,

    #[serde(deserialize_with = "de_files")]
    files: Vec<File>,
}

// `files` is `null` on posts without attachments.
fn de_files<'de, D>(d: D) -> Result<Vec<File>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<File>>::deserialize(d)?.unwrap_or_default())
}

impl Post {
    /// Returns the post number.
    pub fn num(&self) -> u64 {
        self.num
    }

    /// Returns the position of the post in its thread.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the number of the parent thread, `0` for opening posts.
    pub fn parent(&self) -> u64 {
        self.parent
    }

    /// Returns the HTML comment.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the poster's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the poster's tripcode.
    pub fn trip(&self) -> &str {
        &self.trip
    }

    /// Returns the email field (`mailto:sage` for saged posts).
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the formatted post date.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Returns the UNIX timestamp of the post.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Returns the UNIX timestamp of the last bump of the thread.
    pub fn lasthit(&self) -> u64 {
        self.lasthit
    }

    /// Returns the thread tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns true if `tag` is one of the thread tags.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Returns true if the thread is pinned.
    pub fn sticky(&self) -> bool {
        self.sticky
    }

    /// Returns true if the thread is closed to replies.
    pub fn closed(&self) -> bool {
        self.closed
    }

    /// Returns true if the poster was banned for this post.
    pub fn banned(&self) -> bool {
        self.banned
    }

    /// Returns true if the thread never sinks.
    pub fn endless(&self) -> bool {
        self.endless
    }

    /// Returns true if the post was written by the thread's author.
    pub fn op(&self) -> bool {
        self.op
    }

    /// Returns the attached files in upload order.
    pub fn files(&self) -> &[File] {
        &self.files
    }
}

/// `/{board}/res/{num}.json` wraps the posts in a one-element `threads` list.
#[derive(Debug, Deserialize)]
pub(crate) struct ThreadWrapper {
    #[serde(default)]
    pub(crate) threads: Vec<PostList>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostList {
    #[serde(default)]
    pub(crate) posts: Vec<Post>,
}

/// `/{board}/catalog.json` carries the threads under `threads`.
#[derive(Debug, Deserialize)]
pub(crate) struct ThreadCatalog {
    #[serde(default)]
    pub(crate) threads: Vec<Thread>,
}
