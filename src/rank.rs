//! Thread ranking.

use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::thread::Thread;

/// Number of threads [`top_threads`] keeps by default.
pub const DEFAULT_TOP: usize = 5;

/// What to rank threads by.
///
/// Each metric breaks ties with a second counter:
///
/// | metric  | primary       | tie-break |
/// |---------|---------------|-----------|
/// | `views` | `views`       | `score`   |
/// | `posts` | `posts_count` | `views`   |
/// | `score` | `score`       | `views`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Most viewed first.
    Views,
    /// Most posts first.
    Posts,
    /// Highest score first.
    Score,
}

impl Metric {
    /// Orders `a` against `b`, ascending, by primary then tie-break key.
    fn compare(self, a: &Thread, b: &Thread) -> Ordering {
        match self {
            Metric::Views => a
                .views()
                .cmp(&b.views())
                .then_with(|| a.score().total_cmp(&b.score())),
            Metric::Posts => a
                .posts_count()
                .cmp(&b.posts_count())
                .then_with(|| a.views().cmp(&b.views())),
            Metric::Score => a
                .score()
                .total_cmp(&b.score())
                .then_with(|| a.views().cmp(&b.views())),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "views" => Ok(Metric::Views),
            "posts" => Ok(Metric::Posts),
            "score" => Ok(Metric::Score),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Views => "views",
            Metric::Posts => "posts",
            Metric::Score => "score",
        };
        write!(f, "{name}")
    }
}

/// Ranks `threads` by the metric called `metric` and keeps the first `limit`.
///
/// An unknown metric name ranks nothing and returns an empty list.
pub fn top_threads(threads: Vec<Thread>, metric: &str, limit: usize) -> Vec<Thread> {
    match metric.parse() {
        Ok(metric) => top_threads_by(threads, metric, limit),
        Err(err) => {
            log::debug!("{}", err);
            Vec::new()
        }
    }
}

/// Ranks `threads` by `metric`, descending, and keeps the first `limit`.
///
/// Threads with equal keys keep their original order.
pub fn top_threads_by(mut threads: Vec<Thread>, metric: Metric, limit: usize) -> Vec<Thread> {
    threads.sort_by(|a, b| metric.compare(b, a));
    threads.truncate(limit);
    threads
}
