//! Board settings and the merged board lookup.

use std::collections::{hash_map, HashMap};

use crate::{
    error::Error,
    models::{de_flag, de_num, de_text},
    result::Result,
    session::Session,
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BOARD_SETTINGS: &str = "/makaba/mobile.fcgi?task=get_boards";
const USER_BOARDS: &str = "/userboards.json";

/// Every board known to the server, keyed by board id.
///
/// Built from the global board settings and the user board listing.
/// A user board replaces a global board with the same id.
#[derive(Debug, Clone, Default)]
pub struct Boards {
    boards: HashMap<String, Board>,
}

impl Boards {
    /// Fetches both board listings and merges them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogUnavailable`] if either listing cannot be
    /// fetched or parsed.
    pub async fn load(session: &Session) -> Result<Self> {
        let global = fetch_listing(session, BOARD_SETTINGS).await?;
        let user = fetch_listing(session, USER_BOARDS).await?;
        Self::from_sources(global, user)
    }

    /// Merges two already decoded listings.
    ///
    /// Both are objects mapping a grouping key to a list of boards. The
    /// `is_index` key of the user listing is a flag and is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogUnavailable`] if a listing is not shaped as above.
    pub fn from_sources(global: Value, user: Value) -> Result<Self> {
        let mut boards = HashMap::new();
        merge_into(&mut boards, global, |_| true)?;
        merge_into(&mut boards, user, |key| key != "is_index")?;
        debug!("loaded {} boards", boards.len());
        Ok(Self { boards })
    }

    /// Returns the board with `id`.
    pub fn get(&self, id: &str) -> Option<&Board> {
        self.boards.get(id)
    }

    /// Returns true if a board with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.boards.contains_key(id)
    }

    /// Returns the number of boards.
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Returns true if no boards were loaded.
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Iterates over the boards in no particular order.
    pub fn iter(&self) -> hash_map::Values<'_, String, Board> {
        self.boards.values()
    }
}

async fn fetch_listing(session: &Session, path: &str) -> Result<Value> {
    session
        .get_json(path)
        .await
        .map_err(|e| Error::CatalogUnavailable(Box::new(e)))
}

fn merge_into(
    boards: &mut HashMap<String, Board>,
    source: Value,
    keep: impl Fn(&str) -> bool,
) -> Result<()> {
    let Value::Object(groups) = source else {
        return Err(Error::CatalogUnavailable(Box::new(Error::UnexpectedBody(
            "an object of board groups",
        ))));
    };
    for (key, group) in groups {
        if !keep(&key) {
            continue;
        }
        let group: Vec<Board> = serde_json::from_value(group)
            .map_err(|e| Error::CatalogUnavailable(Box::new(e.into())))?;
        debug!("merging {} boards from group {}", group.len(), key);
        for board in group {
            boards.insert(board.id.clone(), board);
        }
    }
    Ok(())
}

/// A named icon a poster can attach on boards with icons enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Icon {
    #[serde(deserialize_with = "de_text")]
    name: String,
    #[serde(deserialize_with = "de_num")]
    num: u64,
    #[serde(deserialize_with = "de_text")]
    url: String,
}

impl Icon {
    /// Returns the icon name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the icon number sent with a post.
    pub fn num(&self) -> u64 {
        self.num
    }

    /// Returns the icon image path.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Settings and counters of a single board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Board {
    /// Short id, used in URLs.
    #[serde(deserialize_with = "de_text")]
    id: String,

    /// Human readable name.
    #[serde(deserialize_with = "de_text")]
    name: String,

    /// Section of the board list this board is shown in.
    #[serde(deserialize_with = "de_text")]
    category: String,

    /// Short description.
    #[serde(deserialize_with = "de_text")]
    info: String,

    /// Name shown for anonymous posters.
    #[serde(deserialize_with = "de_text")]
    default_name: String,

    /// Replies after which a thread stops bumping.
    #[serde(deserialize_with = "de_num")]
    bump_limit: u64,

    /// Number of the most recent post.
    #[serde(deserialize_with = "de_num")]
    last_num: u64,

    /// Posts per hour.
    #[serde(deserialize_with = "de_num")]
    speed: u64,

    #[serde(deserialize_with = "de_num")]
    threads: u64,

    #[serde(deserialize_with = "de_num")]
    unique_posters: u64,

    #[serde(deserialize_with = "de_num")]
    pages: u64,

    #[serde(deserialize_with = "de_flag")]
    enable_posting: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_thread_tags: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_names: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_sage: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_dices: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_flags: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_icons: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_likes: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_oekaki: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_shield: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_subject: bool,

    #[serde(deserialize_with = "de_flag")]
    enable_trips: bool,

    #[serde(deserialize_with = "de_icons")]
    icons: Vec<Icon>,
}

fn de_icons<'de, D>(d: D) -> std::result::Result<Vec<Icon>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Icon>>::deserialize(d)?.unwrap_or_default())
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Board {}

impl Board {
    /// Returns the board id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the readable name of the board.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the section the board is listed in.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the short description of the board.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Returns the name shown for anonymous posters.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Returns the number of replies after which a thread stops bumping.
    pub fn bump_limit(&self) -> u64 {
        self.bump_limit
    }

    /// Returns the number of the latest post on the board.
    pub fn last_num(&self) -> u64 {
        self.last_num
    }

    /// Returns the posting speed in posts per hour.
    pub fn speed(&self) -> u64 {
        self.speed
    }

    /// Returns the number of live threads.
    pub fn threads(&self) -> u64 {
        self.threads
    }

    /// Returns the number of unique posters.
    pub fn unique_posters(&self) -> u64 {
        self.unique_posters
    }

    /// Returns the number of index pages.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Returns true if posting is enabled.
    pub fn enable_posting(&self) -> bool {
        self.enable_posting
    }

    /// Returns true if threads can be tagged.
    pub fn enable_thread_tags(&self) -> bool {
        self.enable_thread_tags
    }

    /// Returns true if posters can set a name.
    pub fn enable_names(&self) -> bool {
        self.enable_names
    }

    /// Returns true if posts can be saged.
    pub fn enable_sage(&self) -> bool {
        self.enable_sage
    }

    /// Returns true if dice rolls are enabled.
    pub fn enable_dices(&self) -> bool {
        self.enable_dices
    }

    /// Returns true if country flags are shown.
    pub fn enable_flags(&self) -> bool {
        self.enable_flags
    }

    /// Returns true if poster icons are enabled.
    pub fn enable_icons(&self) -> bool {
        self.enable_icons
    }

    /// Returns true if likes are enabled.
    pub fn enable_likes(&self) -> bool {
        self.enable_likes
    }

    /// Returns true if oekaki drawings are enabled.
    pub fn enable_oekaki(&self) -> bool {
        self.enable_oekaki
    }

    /// Returns true if the shield is enabled.
    pub fn enable_shield(&self) -> bool {
        self.enable_shield
    }

    /// Returns true if posts can carry a subject.
    pub fn enable_subject(&self) -> bool {
        self.enable_subject
    }

    /// Returns true if tripcodes are enabled.
    pub fn enable_trips(&self) -> bool {
        self.enable_trips
    }

    /// Returns the icons posters can choose from.
    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn global() -> Value {
        json!({
            "Разное": [
                { "id": "b", "name": "Бред", "category": "Разное", "bump_limit": 500, "enable_posting": 1 },
                { "id": "po", "name": "Politics", "category": "Разное", "speed": 90 }
            ],
            "Техника": [
                { "id": "pr", "name": "Programming", "category": "Техника", "enable_thread_tags": true }
            ]
        })
    }

    #[test]
    fn merges_both_sources() {
        let user = json!({
            "is_index": true,
            "boards": [{ "id": "rust", "name": "Rust", "category": "Пользовательские" }]
        });
        let boards = Boards::from_sources(global(), user).unwrap();

        assert_eq!(boards.len(), 4);
        assert!(boards.contains("b"));
        assert!(boards.contains("rust"));
        assert!(!boards.contains("is_index"));

        let b = boards.get("b").unwrap();
        assert_eq!(b.bump_limit(), 500);
        assert!(b.enable_posting());
        assert!(boards.get("pr").unwrap().enable_thread_tags());
    }

    #[test]
    fn user_boards_win_on_collision() {
        let user = json!({
            "boards": [{ "id": "po", "name": "User politics", "speed": 3 }]
        });
        let boards = Boards::from_sources(global(), user).unwrap();
        let po = boards.get("po").unwrap();
        assert_eq!(po.name(), "User politics");
        assert_eq!(po.speed(), 3);
        assert_eq!(boards.len(), 3);
    }

    #[test]
    fn is_index_is_only_skipped_in_user_listing() {
        let global = json!({ "is_index": [{ "id": "idx" }] });
        let boards = Boards::from_sources(global, json!({})).unwrap();
        assert!(boards.contains("idx"));
    }

    #[test]
    fn malformed_listing_is_catalog_error() {
        let err = Boards::from_sources(json!([1, 2]), json!({})).unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));

        let err = Boards::from_sources(global(), json!({ "boards": true })).unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
    }

    #[test]
    fn boards_compare_by_id() {
        let a: Board = serde_json::from_value(json!({ "id": "b", "speed": 1 })).unwrap();
        let b: Board = serde_json::from_value(json!({ "id": "b", "speed": 2 })).unwrap();
        assert_eq!(a, b);
    }
}
