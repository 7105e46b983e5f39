//! Dialogue Manager module for wave wizard state transitions
//!
//! `WavesWizard` is the state machine behind the wave menus. It parses the
//! callback payload, validates it against the session's stage, computes the
//! next stage, and renders the next menu. A rejected event leaves the session
//! exactly as it was: transitions are computed from a borrowed stage and only
//! committed once the new menu rendered successfully.

use std::fmt;

use teloxide::types::{ChatId, MessageId, UserId};
use tracing::{debug, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

use crate::catalog::Catalog;
use crate::dialogue::{
    Cell, Draft, EditPointer, MenuLookup, SessionStore, WavesSession, WavesStage, WeekSelection,
};
use crate::errors::{MissingPiece, WizardError};
use crate::storage::{ConfigStore, SavedWaves};

use super::ui_builder::{render_menu, Menu};

/// Prefix of every callback payload owned by the wizard
pub const CALLBACK_PREFIX: &str = "waves";

/// A parsed menu selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardAction {
    ShowSaved,
    NewList,
    Part(u8),
    Week(String),
    Continue,
    BackToWeek,
    BackToPart,
    /// A base spawn, by lookup id
    Spawn(String),
    /// A type variant of the pending spawn, by lookup id
    Variant(String),
    BackFromVariant,
    Edit,
    EditSelect(Cell),
    EditCancel,
    Save,
    Reset,
    Cancel,
}

impl WizardAction {
    /// Callback payload for this action
    pub fn encode(&self) -> String {
        match self {
            WizardAction::ShowSaved => format!("{CALLBACK_PREFIX}:list"),
            WizardAction::NewList => format!("{CALLBACK_PREFIX}:new"),
            WizardAction::Part(part) => format!("{CALLBACK_PREFIX}:part:{part}"),
            WizardAction::Week(code) => format!("{CALLBACK_PREFIX}:week:{code}"),
            WizardAction::Continue => format!("{CALLBACK_PREFIX}:continue"),
            WizardAction::BackToWeek => format!("{CALLBACK_PREFIX}:back_week"),
            WizardAction::BackToPart => format!("{CALLBACK_PREFIX}:back_part"),
            WizardAction::Spawn(id) => format!("{CALLBACK_PREFIX}:spawn:{id}"),
            WizardAction::Variant(id) => format!("{CALLBACK_PREFIX}:spawn_type:{id}"),
            WizardAction::BackFromVariant => format!("{CALLBACK_PREFIX}:back"),
            WizardAction::Edit => format!("{CALLBACK_PREFIX}:edit"),
            WizardAction::EditSelect(cell) => {
                format!("{CALLBACK_PREFIX}:edit_select:{}:{}", cell.wave, cell.slot)
            }
            WizardAction::EditCancel => format!("{CALLBACK_PREFIX}:edit_cancel"),
            WizardAction::Save => format!("{CALLBACK_PREFIX}:save"),
            WizardAction::Reset => format!("{CALLBACK_PREFIX}:reset"),
            WizardAction::Cancel => format!("{CALLBACK_PREFIX}:cancel"),
        }
    }

    /// Parse a callback payload
    pub fn parse(data: &str) -> Result<Self, WizardError> {
        let malformed = || WizardError::Malformed(data.to_string());

        let mut parts = data.split(':');
        if parts.next() != Some(CALLBACK_PREFIX) {
            return Err(malformed());
        }
        let command = parts.next().ok_or_else(malformed)?;
        let args: Vec<&str> = parts.collect();

        let action = match (command, args.as_slice()) {
            ("list", []) => WizardAction::ShowSaved,
            ("new", []) => WizardAction::NewList,
            ("part", [part]) => match part.parse::<u8>() {
                Ok(part @ 1..=2) => WizardAction::Part(part),
                _ => return Err(malformed()),
            },
            ("week", [code]) if !code.is_empty() => WizardAction::Week(code.to_string()),
            ("continue", []) => WizardAction::Continue,
            ("back_week", []) => WizardAction::BackToWeek,
            ("back_part", []) => WizardAction::BackToPart,
            ("spawn", [id]) if !id.is_empty() => WizardAction::Spawn(id.to_string()),
            ("spawn_type", [id]) if !id.is_empty() => WizardAction::Variant(id.to_string()),
            ("back", []) => WizardAction::BackFromVariant,
            ("edit", []) => WizardAction::Edit,
            ("edit_select", [wave, slot]) => {
                let wave = wave.parse().map_err(|_| malformed())?;
                let slot = slot.parse().map_err(|_| malformed())?;
                WizardAction::EditSelect(Cell { wave, slot })
            }
            ("edit_cancel", []) => WizardAction::EditCancel,
            ("save", []) => WizardAction::Save,
            ("reset", []) => WizardAction::Reset,
            ("cancel", []) => WizardAction::Cancel,
            _ => return Err(malformed()),
        };
        Ok(action)
    }
}

impl fmt::Display for WizardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Short text shown when answering the callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    /// Shown as a modal alert instead of a toast
    pub alert: bool,
}

impl Notice {
    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: true,
        }
    }

    /// Localized alert describing a rejected event
    pub fn from_error(error: &WizardError, language_code: Option<&str>) -> Self {
        let text = match error.detail() {
            Some(detail) => t_args_lang(error.message_key(), &[("detail", &detail)], language_code),
            None => t_lang(error.message_key(), language_code),
        };
        Self::alert(text)
    }
}

/// What the gateway should do after an event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    /// No session is bound to the source message; drop silently
    Ignored,
    /// Answer with the notice; the menu and session are unchanged
    Rejected(Notice),
    /// Edit the bound message to show `menu`
    Redraw { menu: Menu, notice: Option<Notice> },
    /// The session was removed; delete its menu message
    Closed {
        chat_id: ChatId,
        message_id: Option<MessageId>,
    },
}

/// Next stage plus an optional notice
#[derive(Debug)]
struct Step {
    stage: WavesStage,
    notice: Option<Notice>,
}

impl Step {
    fn to(stage: WavesStage) -> Self {
        Self { stage, notice: None }
    }

    fn with_notice(stage: WavesStage, notice: Notice) -> Self {
        Self {
            stage,
            notice: Some(notice),
        }
    }
}

/// The wave wizard state machine
pub struct WavesWizard<'a> {
    catalog: &'a Catalog,
    store: &'a ConfigStore,
}

impl<'a> WavesWizard<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a ConfigStore) -> Self {
        Self { catalog, store }
    }

    /// Show the START menu on a freshly started session
    pub fn open(&self, session: &mut WavesSession) -> Result<Menu, WizardError> {
        SessionStore::reset(session, true);
        Ok(render_menu(session, self.catalog)?)
    }

    /// Process one selection event coming from `message_id`
    pub fn handle_event(
        &self,
        sessions: &mut SessionStore,
        operator: UserId,
        message_id: MessageId,
        data: &str,
    ) -> EventOutcome {
        let Some(session) = sessions.bound_session(operator, message_id) else {
            debug!(user_id = %operator, message_id = message_id.0, "Ignoring event for an unbound message");
            return EventOutcome::Ignored;
        };
        let lang = session.language_code.clone();

        let action = match WizardAction::parse(data) {
            Ok(action) => action,
            Err(e) => {
                warn!(user_id = %operator, error = %e, "Rejected wizard payload");
                return EventOutcome::Rejected(Notice::from_error(&e, lang.as_deref()));
            }
        };

        if action == WizardAction::Cancel {
            let removed = sessions.remove(operator);
            info!(user_id = %operator, "Wave wizard cancelled");
            return match removed {
                Some(session) => EventOutcome::Closed {
                    chat_id: session.chat_id,
                    message_id: session.message_id,
                },
                None => EventOutcome::Ignored,
            };
        }

        let step = match self.transition(&session.stage, &session.lookup, &action, lang.as_deref()) {
            Ok(step) => step,
            Err(e) => {
                warn!(user_id = %operator, action = %action, error = %e, "Wizard action rejected");
                return EventOutcome::Rejected(Notice::from_error(&e, lang.as_deref()));
            }
        };

        let previous = session.clone();
        session.stage = step.stage;
        match render_menu(session, self.catalog) {
            Ok(menu) => {
                debug!(user_id = %operator, action = %action, options = session.lookup.len(), "Wizard advanced");
                EventOutcome::Redraw {
                    menu,
                    notice: step.notice,
                }
            }
            Err(e) => {
                *session = previous;
                let e = WizardError::from(e);
                warn!(user_id = %operator, action = %action, error = %e, "Failed to render wizard menu");
                EventOutcome::Rejected(Notice::from_error(&e, lang.as_deref()))
            }
        }
    }

    fn transition(
        &self,
        stage: &WavesStage,
        lookup: &MenuLookup,
        action: &WizardAction,
        lang: Option<&str>,
    ) -> Result<Step, WizardError> {
        use WizardAction as A;

        match (stage, action) {
            (WavesStage::Start, A::ShowSaved) => self.load_saved(),
            (WavesStage::Start, A::NewList) => Ok(Step::to(WavesStage::PartSelect)),

            (WavesStage::PartSelect, A::Part(part)) => {
                if self.catalog.weeks_for_part(*part).is_empty() {
                    return Err(WizardError::NoWeeks(*part));
                }
                Ok(Step::to(WavesStage::WeekSelect { part: *part }))
            }

            (WavesStage::WeekSelect { part }, A::Week(code)) => {
                let week = self
                    .catalog
                    .weeks_for_part(*part)
                    .into_iter()
                    .find(|week| &week.code == code)
                    .ok_or_else(|| crate::errors::CatalogError::UnknownWeek(code.clone()))?;
                let map = self.catalog.spawn_config(&week.map)?;
                Ok(Step::to(WavesStage::Confirm {
                    part: *part,
                    week: WeekSelection::from_week(week, &map.name),
                }))
            }
            (WavesStage::WeekSelect { .. }, A::BackToPart) => Ok(Step::to(WavesStage::PartSelect)),

            (WavesStage::Confirm { part, .. }, A::BackToWeek) => {
                Ok(Step::to(WavesStage::WeekSelect { part: *part }))
            }
            (WavesStage::Confirm { part, week }, A::Continue) => {
                self.catalog.spawn_config(&week.slug)?;
                Ok(Step::to(WavesStage::Entry {
                    draft: Draft::new(*part, week.clone()),
                    pending: None,
                }))
            }

            (WavesStage::Entry { draft, pending: None }, A::Spawn(id)) => {
                self.pick_spawn(draft, None, lookup, id, lang)
            }
            (WavesStage::EditEntry { draft, edit, pending: None }, A::Spawn(id)) => {
                self.pick_spawn(draft, Some(edit), lookup, id, lang)
            }
            (WavesStage::Entry { draft, pending: Some(base) }, A::Variant(id)) => {
                self.pick_variant(draft, None, base, lookup, id, lang)
            }
            (WavesStage::EditEntry { draft, edit, pending: Some(base) }, A::Variant(id)) => {
                self.pick_variant(draft, Some(edit), base, lookup, id, lang)
            }
            (WavesStage::Entry { draft, pending: Some(_) }, A::BackFromVariant) => {
                Ok(Step::to(WavesStage::Entry {
                    draft: draft.clone(),
                    pending: None,
                }))
            }
            (WavesStage::EditEntry { draft, edit, pending: Some(_) }, A::BackFromVariant) => {
                Ok(Step::to(WavesStage::EditEntry {
                    draft: draft.clone(),
                    edit: edit.clone(),
                    pending: None,
                }))
            }

            (WavesStage::Entry { draft, pending: None }, A::Edit) => {
                if draft.grid.is_empty() {
                    return Err(WizardError::NothingToEdit);
                }
                Ok(Step::to(WavesStage::EditSelect { draft: draft.clone() }))
            }
            (WavesStage::EditSelect { draft }, A::EditSelect(cell)) => {
                let original = draft
                    .grid
                    .get(*cell)
                    .ok_or(WizardError::CellUnavailable {
                        wave: cell.wave,
                        slot: cell.slot,
                    })?
                    .to_string();
                Ok(Step::to(WavesStage::EditEntry {
                    draft: draft.clone(),
                    edit: EditPointer { cell: *cell, original },
                    pending: None,
                }))
            }
            (WavesStage::EditSelect { draft }, A::EditCancel) => Ok(Step::to(WavesStage::Entry {
                draft: draft.clone(),
                pending: None,
            })),
            (WavesStage::EditEntry { draft, edit, .. }, A::EditCancel) => {
                let mut draft = draft.clone();
                draft.grid.replace(edit.cell, edit.original.clone());
                Ok(Step::to(WavesStage::Entry { draft, pending: None }))
            }

            (WavesStage::Entry { draft, pending: None }, A::Save) => self.save(draft, lang),
            (WavesStage::Entry { draft, .. }, A::Reset) => {
                let mut draft = draft.clone();
                draft.grid.clear();
                Ok(Step::with_notice(
                    WavesStage::Entry { draft, pending: None },
                    Notice::toast(t_lang("notice-reset-ok", lang)),
                ))
            }

            _ => Err(WizardError::UnexpectedAction),
        }
    }

    /// Re-show the finish menu with an "already complete" notice
    fn already_complete(draft: &Draft, lang: Option<&str>) -> Step {
        Step::with_notice(
            WavesStage::Entry {
                draft: draft.clone(),
                pending: None,
            },
            Notice::alert(t_lang(WizardError::AlreadyComplete.message_key(), lang)),
        )
    }

    fn pick_spawn(
        &self,
        draft: &Draft,
        edit: Option<&EditPointer>,
        lookup: &MenuLookup,
        id: &str,
        lang: Option<&str>,
    ) -> Result<Step, WizardError> {
        if edit.is_none() && draft.grid.is_complete() {
            return Ok(Self::already_complete(draft, lang));
        }

        let key = lookup
            .resolve(id)
            .ok_or_else(|| WizardError::UnknownOption(id.to_string()))?;
        let map = self.catalog.spawn_config(&draft.week.slug)?;
        let spawn = map
            .spawn(key)
            .ok_or_else(|| WizardError::UnknownOption(id.to_string()))?;

        if spawn.has_variants() {
            let pending = Some(key.to_string());
            let stage = match edit {
                Some(edit) => WavesStage::EditEntry {
                    draft: draft.clone(),
                    edit: edit.clone(),
                    pending,
                },
                None => WavesStage::Entry {
                    draft: draft.clone(),
                    pending,
                },
            };
            return Ok(Step::to(stage));
        }

        Self::commit(draft, edit, spawn.label.clone())
    }

    fn pick_variant(
        &self,
        draft: &Draft,
        edit: Option<&EditPointer>,
        base_key: &str,
        lookup: &MenuLookup,
        id: &str,
        lang: Option<&str>,
    ) -> Result<Step, WizardError> {
        if edit.is_none() && draft.grid.is_complete() {
            return Ok(Self::already_complete(draft, lang));
        }

        let key = lookup
            .resolve(id)
            .ok_or_else(|| WizardError::UnknownOption(id.to_string()))?;
        let map = self.catalog.spawn_config(&draft.week.slug)?;
        let base = map
            .spawn(base_key)
            .ok_or_else(|| WizardError::UnknownOption(base_key.to_string()))?;
        let variant = base
            .variant(key)
            .ok_or_else(|| WizardError::UnknownOption(id.to_string()))?;

        Self::commit(draft, edit, base.combined_label(variant))
    }

    /// Append to the open slot, or overwrite the edited cell and end the edit
    fn commit(draft: &Draft, edit: Option<&EditPointer>, label: String) -> Result<Step, WizardError> {
        let mut draft = draft.clone();
        match edit {
            Some(edit) => {
                draft
                    .grid
                    .replace(edit.cell, label.clone())
                    .ok_or(WizardError::CellUnavailable {
                        wave: edit.cell.wave,
                        slot: edit.cell.slot,
                    })?;
            }
            None => {
                draft
                    .grid
                    .push(label.clone())
                    .ok_or(WizardError::AlreadyComplete)?;
            }
        }
        Ok(Step::with_notice(
            WavesStage::Entry { draft, pending: None },
            Notice::toast(label),
        ))
    }

    fn save(&self, draft: &Draft, lang: Option<&str>) -> Result<Step, WizardError> {
        let payload = saved_payload(draft)?;
        self.store.write(&payload)?;
        Ok(Step::with_notice(
            WavesStage::Start,
            Notice::alert(t_lang("notice-saved-ok", lang)),
        ))
    }

    fn load_saved(&self) -> Result<Step, WizardError> {
        let saved = self.store.read()?;
        self.catalog.spawn_config(&saved.slug)?;
        Ok(Step::to(WavesStage::Entry {
            draft: Draft::from_saved(saved),
            pending: None,
        }))
    }
}

/// Validate a draft and build the persisted payload
pub fn saved_payload(draft: &Draft) -> Result<SavedWaves, WizardError> {
    let week = &draft.week;
    if week.code.trim().is_empty() {
        return Err(WizardError::Incomplete(MissingPiece::Week));
    }
    if week.slug.is_empty() || week.map_name.is_empty() {
        return Err(WizardError::Incomplete(MissingPiece::Map));
    }
    if week.mod1.is_empty() || week.mod2.is_empty() {
        return Err(WizardError::Incomplete(MissingPiece::Modifiers));
    }
    if !draft.grid.is_complete() {
        return Err(WizardError::Incomplete(MissingPiece::Waves));
    }

    Ok(SavedWaves {
        week: week.code.clone(),
        absolute_week: week.absolute_week(),
        slug: week.slug.clone(),
        map: week.map_name.clone(),
        mod1: week.mod1.clone(),
        mod2: week.mod2.clone(),
        waves: draft.grid.waves().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_encode_and_parse() {
        let actions = [
            WizardAction::Part(2),
            WizardAction::Week("1.3".to_string()),
            WizardAction::Spawn("17".to_string()),
            WizardAction::Variant("18".to_string()),
            WizardAction::EditSelect(Cell { wave: 14, slot: 2 }),
            WizardAction::Cancel,
        ];
        for action in actions {
            assert_eq!(WizardAction::parse(&action.encode()).unwrap(), action);
        }
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        for data in [
            "",
            "waves",
            "other:list",
            "waves:part:3",
            "waves:part:x",
            "waves:spawn",
            "waves:spawn:",
            "waves:edit_select:1",
            "waves:edit_select:a:b",
            "waves:unknown",
            "waves:save:extra",
        ] {
            assert!(
                matches!(WizardAction::parse(data), Err(WizardError::Malformed(_))),
                "payload {data:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_payloads_fit_telegram_limit() {
        let longest = WizardAction::EditSelect(Cell { wave: 14, slot: 2 }).encode();
        assert!(longest.len() <= 64);
    }
}
