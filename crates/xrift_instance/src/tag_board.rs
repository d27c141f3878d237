//! # Tag Board
//!
//! Users pick status tags ("want to talk", "working", ...) on a shared
//! board. Each user's selection is instance state under
//! `tag-{board_key}-{user_id}`, so every client can show every user's tags.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::InstanceResult;
use crate::store::{InstanceState, SyncedState};

/// Columns a board lays its tags out in unless told otherwise.
pub const DEFAULT_COLUMNS: usize = 3;

/// One selectable tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Stable identifier, stored in selections.
    pub id: String,
    /// Text shown on the tag.
    pub label: String,
    /// CSS color.
    pub color: String,
}

impl Tag {
    /// Creates a tag.
    pub fn new(id: impl Into<String>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Stock tags as `(id, label, color)`.
pub const DEFAULT_TAGS: [(&str, &str, &str); 10] = [
    ("want-talk", "話したい", "#2ECC71"),
    ("want-listen", "聞きたい", "#3498DB"),
    ("silent", "無言", "#95A5A6"),
    ("developer", "開発者", "#1ABC9C"),
    ("student", "学生", "#2980B9"),
    ("beginner", "初心者", "#F1C40F"),
    ("dont-know", "なんもわからん", "#9B59B6"),
    ("working", "作業中", "#8BC34A"),
    ("away", "離席中", "#BF7B41"),
    ("cat", "ねこ", "#FF9800"),
];

/// The stock tag set.
#[must_use]
pub fn default_tags() -> Vec<Tag> {
    DEFAULT_TAGS
        .iter()
        .map(|(id, label, color)| Tag::new(*id, *label, *color))
        .collect()
}

/// Splits `tags` into `columns` columns in order, as evenly as possible.
/// The first `len % columns` columns get one extra tag.
///
/// Returns no columns when `columns` is zero or `tags` is empty.
#[must_use]
pub fn split_into_columns(tags: &[Tag], columns: usize) -> Vec<Vec<Tag>> {
    if columns == 0 || tags.is_empty() {
        return Vec::new();
    }
    let base = tags.len() / columns;
    let remainder = tags.len() % columns;

    let mut rest = tags;
    (0..columns)
        .map(|col| {
            let count = base + usize::from(col < remainder);
            let (column, tail) = rest.split_at(count);
            rest = tail;
            column.to_vec()
        })
        .collect()
}

/// Toggles `tag_id` in `selected` and returns the result in board order.
/// IDs not on the board sort first.
#[must_use]
pub fn toggle_tag_selection(selected: &[String], tag_id: &str, flat_tags: &[Tag]) -> Vec<String> {
    let mut next: Vec<String> = if selected.iter().any(|id| id == tag_id) {
        selected.iter().filter(|id| *id != tag_id).cloned().collect()
    } else {
        let mut seen = HashSet::with_capacity(selected.len() + 1);
        selected
            .iter()
            .map(String::as_str)
            .chain([tag_id])
            .filter(|id| seen.insert(*id))
            .map(str::to_owned)
            .collect()
    };
    next.sort_by_key(|id| flat_tags.iter().position(|tag| tag.id == *id));
    next
}

/// Resolves selected IDs to tags, dropping duplicates and unknown IDs.
#[must_use]
pub fn selected_tags(selected: &[String], flat_tags: &[Tag]) -> Vec<Tag> {
    let mut seen = HashSet::with_capacity(selected.len());
    let mut tags = Vec::with_capacity(selected.len());
    for id in selected {
        if !seen.insert(id.as_str()) {
            continue;
        }
        if let Some(tag) = flat_tags.iter().find(|tag| tag.id == *id) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// Groups `selected` by the column each tag sits in, columns ascending.
/// Tags on no column are dropped.
#[must_use]
pub fn group_tags_by_column(selected: &[Tag], columns: &[Vec<Tag>]) -> Vec<(usize, Vec<Tag>)> {
    let mut grouped: BTreeMap<usize, Vec<Tag>> = BTreeMap::new();
    for tag in selected {
        if let Some(column) = columns.iter().position(|col| col.iter().any(|t| t.id == tag.id)) {
            grouped.entry(column).or_default().push(tag.clone());
        }
    }
    grouped.into_iter().collect()
}

/// Shared tag selections for one board.
pub struct TagBoard {
    board_key: String,
    tags: Vec<Tag>,
    columns: Vec<Vec<Tag>>,
    store: Arc<dyn SyncedState>,
}

impl TagBoard {
    /// Creates a board with `tags` laid out in `columns` columns.
    pub fn new(store: Arc<dyn SyncedState>, board_key: impl Into<String>, tags: Vec<Tag>, columns: usize) -> Self {
        let columns = split_into_columns(&tags, columns);
        Self {
            board_key: board_key.into(),
            tags,
            columns,
            store,
        }
    }

    /// Creates a board with the stock tags in three columns.
    pub fn with_defaults(store: Arc<dyn SyncedState>, board_key: impl Into<String>) -> Self {
        Self::new(store, board_key, default_tags(), DEFAULT_COLUMNS)
    }

    /// Every tag on the board.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Column layout.
    #[must_use]
    pub fn columns(&self) -> &[Vec<Tag>] {
        &self.columns
    }

    /// State key holding `user_id`'s selection.
    #[must_use]
    pub fn state_key(&self, user_id: &str) -> String {
        format!("tag-{}-{user_id}", self.board_key)
    }

    fn selection(&self, user_id: &str) -> InstanceState<Vec<String>> {
        InstanceState::new(self.store.clone(), self.state_key(user_id), Vec::new())
    }

    /// Selected tag IDs for `user_id`, as stored.
    ///
    /// # Errors
    ///
    /// Propagates store decode failures.
    pub fn selected_ids(&self, user_id: &str) -> InstanceResult<Vec<String>> {
        self.selection(user_id).get()
    }

    /// Toggles one tag for the local user and returns the new selection.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn toggle(&self, user_id: &str, tag_id: &str) -> InstanceResult<Vec<String>> {
        let next = self
            .selection(user_id)
            .update(|prev| toggle_tag_selection(prev, tag_id, &self.tags))?;
        debug!(user = user_id, tag = tag_id, selected = next.len(), "Tag selection changed");
        Ok(next)
    }

    /// Clears the local user's selection.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn clear(&self, user_id: &str) -> InstanceResult<()> {
        self.selection(user_id).set(&Vec::new())
    }

    /// Tags to show above `user_id`'s avatar, grouped by column.
    ///
    /// # Errors
    ///
    /// Propagates store decode failures.
    pub fn display(&self, user_id: &str) -> InstanceResult<Vec<(usize, Vec<Tag>)>> {
        let ids = self.selected_ids(user_id)?;
        let tags = selected_tags(&ids, &self.tags);
        Ok(group_tags_by_column(&tags, &self.columns))
    }
}

impl fmt::Debug for TagBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagBoard")
            .field("board_key", &self.board_key)
            .field("tags", &self.tags.len())
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}
