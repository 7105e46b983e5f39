//! Wave wizard session module: per-operator conversation state and the store
//! that owns it.

use std::collections::HashMap;

use teloxide::types::{ChatId, MessageId, UserId};

use crate::catalog::{absolute_week_number, Week};
use crate::storage::{SavedWaves, MAX_WAVES, SPAWNS_PER_WAVE};

/// Week, map and modifiers resolved from the catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekSelection {
    pub code: String,
    pub slug: String,
    pub map_name: String,
    pub mod1: String,
    pub mod2: String,
}

impl WeekSelection {
    pub fn from_week(week: &Week, map_name: &str) -> Self {
        Self {
            code: week.code.clone(),
            slug: week.map.clone(),
            map_name: map_name.to_string(),
            mod1: week.mod1.clone(),
            mod2: week.mod2.clone(),
        }
    }

    pub fn absolute_week(&self) -> Option<u32> {
        absolute_week_number(&self.code)
    }
}

/// Position of one spawn in the grid (both zero-based)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub wave: usize,
    pub slot: usize,
}

/// The 15×3 wave grid, filled row-major
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaveGrid {
    waves: Vec<Vec<String>>,
}

impl WaveGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_waves(waves: Vec<Vec<String>>) -> Self {
        Self { waves }
    }

    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn is_empty(&self) -> bool {
        self.waves.iter().all(|wave| wave.is_empty())
    }

    pub fn filled_count(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Exactly 15 waves of exactly 3 non-empty labels
    pub fn is_complete(&self) -> bool {
        self.waves.len() == MAX_WAVES
            && self.waves.iter().all(|wave| {
                wave.len() == SPAWNS_PER_WAVE && wave.iter().all(|label| !label.trim().is_empty())
            })
    }

    /// Next slot an append would fill, if any
    pub fn open_cell(&self) -> Option<Cell> {
        match self.waves.last() {
            Some(last) if last.len() < SPAWNS_PER_WAVE => Some(Cell {
                wave: self.waves.len() - 1,
                slot: last.len(),
            }),
            _ if self.waves.len() < MAX_WAVES => Some(Cell {
                wave: self.waves.len(),
                slot: 0,
            }),
            _ => None,
        }
    }

    /// Append to the open wave, opening a new one when the last is full
    ///
    /// Returns the filled cell, or `None` when the grid is already complete.
    pub fn push(&mut self, label: String) -> Option<Cell> {
        let cell = self.open_cell()?;
        if cell.slot == 0 {
            self.waves.push(Vec::with_capacity(SPAWNS_PER_WAVE));
        }
        self.waves[cell.wave].push(label);
        Some(cell)
    }

    pub fn get(&self, cell: Cell) -> Option<&str> {
        self.waves
            .get(cell.wave)
            .and_then(|wave| wave.get(cell.slot))
            .map(String::as_str)
    }

    /// Overwrite a filled cell; returns the previous label
    pub fn replace(&mut self, cell: Cell, label: String) -> Option<String> {
        let slot = self.waves.get_mut(cell.wave)?.get_mut(cell.slot)?;
        Some(std::mem::replace(slot, label))
    }

    pub fn clear(&mut self) {
        self.waves.clear();
    }
}

/// The week/map context plus the grid being built
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draft {
    pub part: u8,
    pub week: WeekSelection,
    pub grid: WaveGrid,
}

impl Draft {
    pub fn new(part: u8, week: WeekSelection) -> Self {
        Self {
            part,
            week,
            grid: WaveGrid::new(),
        }
    }

    /// Rebuild a draft from a saved configuration
    pub fn from_saved(saved: SavedWaves) -> Self {
        let part = crate::catalog::parse_week_code(&saved.week)
            .map(|(part, _)| part)
            .unwrap_or(1);
        Self {
            part,
            week: WeekSelection {
                code: saved.week,
                slug: saved.slug,
                map_name: saved.map,
                mod1: saved.mod1,
                mod2: saved.mod2,
            },
            grid: WaveGrid::from_waves(saved.waves),
        }
    }
}

/// A cell being edited and its value before the edit started
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditPointer {
    pub cell: Cell,
    pub original: String,
}

/// Wizard stage; each variant carries only the data valid for it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum WavesStage {
    #[default]
    Start,
    PartSelect,
    WeekSelect {
        part: u8,
    },
    Confirm {
        part: u8,
        week: WeekSelection,
    },
    /// Collecting spawns; `pending` holds a base spawn awaiting its variant
    Entry {
        draft: Draft,
        pending: Option<String>,
    },
    EditSelect {
        draft: Draft,
    },
    EditEntry {
        draft: Draft,
        edit: EditPointer,
        pending: Option<String>,
    },
}

impl WavesStage {
    pub fn draft(&self) -> Option<&Draft> {
        match self {
            WavesStage::Entry { draft, .. }
            | WavesStage::EditSelect { draft }
            | WavesStage::EditEntry { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn edit_pointer(&self) -> Option<&EditPointer> {
        match self {
            WavesStage::EditEntry { edit, .. } => Some(edit),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&str> {
        match self {
            WavesStage::Entry { pending, .. } | WavesStage::EditEntry { pending, .. } => {
                pending.as_deref()
            }
            _ => None,
        }
    }
}

/// Short-lived id → catalog key table, rebuilt on every render
///
/// Ids come from a counter that only grows for the life of the session, so an
/// id from an earlier render never resolves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MenuLookup {
    next_id: u32,
    entries: HashMap<String, String>,
}

impl MenuLookup {
    /// Drop every entry from the previous render
    pub fn begin_render(&mut self) {
        self.entries.clear();
    }

    /// Register the catalog key behind an option and return its fresh id
    pub fn register(&mut self, key: &str) -> String {
        self.next_id = self.next_id.wrapping_add(1);
        let id = self.next_id.to_string();
        self.entries.insert(id.clone(), key.to_string());
        id
    }

    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One operator's wizard run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavesSession {
    pub operator: UserId,
    pub chat_id: ChatId,
    pub message_id: Option<MessageId>,
    pub language_code: Option<String>,
    pub stage: WavesStage,
    pub lookup: MenuLookup,
}

impl WavesSession {
    pub fn new(operator: UserId, chat_id: ChatId) -> Self {
        Self {
            operator,
            chat_id,
            message_id: None,
            language_code: None,
            stage: WavesStage::Start,
            lookup: MenuLookup::default(),
        }
    }

    /// Whether an event coming from `message_id` targets this session's menu
    pub fn is_bound_to(&self, message_id: MessageId) -> bool {
        self.message_id == Some(message_id)
    }
}

/// Owner of all live sessions, at most one per operator
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, WavesSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the operator's live session, creating an unbound one if absent
    pub fn get_or_create(&mut self, operator: UserId, chat_id: ChatId) -> &mut WavesSession {
        self.sessions
            .entry(operator)
            .or_insert_with(|| WavesSession::new(operator, chat_id))
    }

    /// Discard any prior session and start a fresh one.
    ///
    /// Returns the replaced session so the caller can clean up its menu.
    pub fn start(&mut self, operator: UserId, chat_id: ChatId) -> (Option<WavesSession>, &mut WavesSession) {
        let previous = self.sessions.remove(&operator);
        let session = self
            .sessions
            .entry(operator)
            .or_insert_with(|| WavesSession::new(operator, chat_id));
        (previous, session)
    }

    /// Clear wizard fields; optionally also forget the bound message
    pub fn reset(session: &mut WavesSession, keep_binding: bool) {
        session.stage = WavesStage::Start;
        session.lookup.begin_render();
        if !keep_binding {
            session.message_id = None;
        }
    }

    pub fn remove(&mut self, operator: UserId) -> Option<WavesSession> {
        self.sessions.remove(&operator)
    }

    pub fn get(&self, operator: UserId) -> Option<&WavesSession> {
        self.sessions.get(&operator)
    }

    /// The operator's session, only if it is bound to `message_id`
    pub fn bound_session(&mut self, operator: UserId, message_id: MessageId) -> Option<&mut WavesSession> {
        self.sessions
            .get_mut(&operator)
            .filter(|session| session.is_bound_to(message_id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_fills_row_major() {
        let mut grid = WaveGrid::new();
        for i in 0..4 {
            grid.push(format!("spawn{i}"));
        }
        assert_eq!(grid.waves().len(), 2);
        assert_eq!(grid.waves()[0].len(), 3);
        assert_eq!(grid.open_cell(), Some(Cell { wave: 1, slot: 1 }));
    }

    #[test]
    fn test_grid_rejects_push_when_complete() {
        let mut grid = WaveGrid::new();
        for _ in 0..MAX_WAVES * SPAWNS_PER_WAVE {
            assert!(grid.push("Hut".to_string()).is_some());
        }
        assert!(grid.is_complete());
        assert_eq!(grid.open_cell(), None);
        assert_eq!(grid.push("Hut".to_string()), None);
        assert_eq!(grid.filled_count(), 45);
    }

    #[test]
    fn test_lookup_ids_never_repeat() {
        let mut lookup = MenuLookup::default();
        let first = lookup.register("spawn1");
        lookup.begin_render();
        let second = lookup.register("spawn1");

        assert_ne!(first, second);
        assert!(lookup.resolve(&first).is_none());
        assert_eq!(lookup.resolve(&second), Some("spawn1"));
    }

    #[test]
    fn test_start_replaces_previous_session() {
        let mut store = SessionStore::new();
        let operator = UserId(7);
        store.get_or_create(operator, ChatId(7)).message_id = Some(MessageId(10));

        let (previous, session) = store.start(operator, ChatId(7));
        assert_eq!(session.message_id, None);
        assert_eq!(previous.and_then(|s| s.message_id), Some(MessageId(10)));
        assert_eq!(store.len(), 1);
    }
}
