//! UI Builder module for creating wizard menus and formatting messages
//!
//! Rendering is a function of the session's stage. Every spawn option gets a
//! fresh id registered in the session lookup, so callback payloads carry only
//! the id and never the label text.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html::escape;

// Import localization
use crate::localization::{t_args_lang, t_lang};

use crate::catalog::{Catalog, MapConfig};
use crate::dialogue::{Cell, Draft, MenuLookup, WavesSession, WavesStage};
use crate::errors::CatalogError;
use crate::storage::SavedWaves;

use super::dialogue_manager::WizardAction;

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Waves are grouped in threes in the summary
const WAVE_GROUP: usize = 3;

/// Text and keyboard of one on-screen menu
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn button(text: impl Into<String>, action: WizardAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, action.encode())
}

fn exit_button(language_code: Option<&str>) -> InlineKeyboardButton {
    button(t_lang("btn-exit", language_code), WizardAction::Cancel)
}

/// Render the menu for the session's current stage.
///
/// Clears and refills the session lookup. Fails only when the stage needs a
/// map the catalog does not know.
pub fn render_menu(session: &mut WavesSession, catalog: &Catalog) -> Result<Menu, CatalogError> {
    session.lookup.begin_render();
    let lang = session.language_code.as_deref();

    let menu = match &session.stage {
        WavesStage::Start => Menu {
            text: t_lang("menu-title", lang),
            keyboard: create_start_keyboard(lang),
        },
        WavesStage::PartSelect => Menu {
            text: t_lang("part-prompt", lang),
            keyboard: create_part_keyboard(lang),
        },
        WavesStage::WeekSelect { part } => Menu {
            text: t_lang("week-prompt", lang),
            keyboard: create_week_keyboard(catalog, *part, lang),
        },
        WavesStage::Confirm { week, .. } => {
            let text = format!(
                "{}\n{}\n{}\n{}\n\n{}",
                format_week_heading(Some(&week.code), lang),
                t_args_lang("map-line", &[("map", &escape(&week.map_name))], lang),
                t_args_lang("mod1-line", &[("mod", &escape(&week.mod1))], lang),
                t_args_lang("mod2-line", &[("mod", &escape(&week.mod2))], lang),
                t_lang("confirm-prompt", lang)
            );
            Menu {
                text,
                keyboard: create_confirm_keyboard(lang),
            }
        }
        WavesStage::Entry { draft, pending } => {
            let map = catalog.spawn_config(&draft.week.slug)?;
            let progress = format_wave_progress(draft, None, lang);
            match pending {
                Some(base_key) => Menu {
                    text: format!("{progress}\n\n{}", variant_prompt(map, base_key, lang)),
                    keyboard: create_variant_keyboard(&mut session.lookup, map, base_key, false, lang),
                },
                None if draft.grid.is_complete() => Menu {
                    text: format!("{progress}\n\n{}", t_lang("finish-prompt", lang)),
                    keyboard: create_finish_keyboard(lang),
                },
                None => Menu {
                    text: progress,
                    keyboard: create_spawn_keyboard(
                        &mut session.lookup,
                        map,
                        SpawnNav::Collecting {
                            can_edit: !draft.grid.is_empty(),
                        },
                        lang,
                    ),
                },
            }
        }
        WavesStage::EditSelect { draft } => Menu {
            text: format!(
                "{}\n\n{}",
                format_wave_progress(draft, None, lang),
                t_lang("edit-select-prompt", lang)
            ),
            keyboard: create_edit_grid_keyboard(draft, lang),
        },
        WavesStage::EditEntry { draft, edit, pending } => {
            let map = catalog.spawn_config(&draft.week.slug)?;
            let progress = format_wave_progress(draft, Some(edit.cell), lang);
            match pending {
                Some(base_key) => Menu {
                    text: format!("{progress}\n\n{}", variant_prompt(map, base_key, lang)),
                    keyboard: create_variant_keyboard(&mut session.lookup, map, base_key, true, lang),
                },
                None => Menu {
                    text: progress,
                    keyboard: create_spawn_keyboard(&mut session.lookup, map, SpawnNav::Editing, lang),
                },
            }
        }
    };

    Ok(menu)
}

/// Navigation appended below the spawn rows
#[derive(Debug, Clone, Copy)]
enum SpawnNav {
    Collecting { can_edit: bool },
    Editing,
}

pub fn create_start_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t_lang("btn-saved-list", language_code), WizardAction::ShowSaved),
            button(t_lang("btn-new-list", language_code), WizardAction::NewList),
        ],
        vec![exit_button(language_code)],
    ])
}

pub fn create_part_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t_lang("btn-part-1", language_code), WizardAction::Part(1)),
            button(t_lang("btn-part-2", language_code), WizardAction::Part(2)),
        ],
        vec![exit_button(language_code)],
    ])
}

pub fn create_week_keyboard(catalog: &Catalog, part: u8, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = catalog
        .weeks_for_part(part)
        .into_iter()
        .map(|week| {
            let map_name = catalog
                .spawn_config(&week.map)
                .map(|map| map.name.as_str())
                .unwrap_or(week.map.as_str());
            vec![button(
                format!("{} - {}", week.code, map_name),
                WizardAction::Week(week.code.clone()),
            )]
        })
        .collect();

    rows.push(vec![
        button(t_lang("btn-back", language_code), WizardAction::BackToPart),
        exit_button(language_code),
    ]);
    InlineKeyboardMarkup::new(rows)
}

pub fn create_confirm_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(t_lang("btn-continue", language_code), WizardAction::Continue),
        button(t_lang("btn-back", language_code), WizardAction::BackToWeek),
        exit_button(language_code),
    ]])
}

/// Edit / save / reset / cancel, shown once the grid is complete
pub fn create_finish_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(t_lang("btn-edit", language_code), WizardAction::Edit),
            button(t_lang("btn-save", language_code), WizardAction::Save),
        ],
        vec![
            button(t_lang("btn-reset", language_code), WizardAction::Reset),
            exit_button(language_code),
        ],
    ])
}

fn create_spawn_keyboard(
    lookup: &mut MenuLookup,
    map: &MapConfig,
    nav: SpawnNav,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = map
        .rows()
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, label)| {
                    let id = lookup.register(key);
                    button(label, WizardAction::Spawn(id))
                })
                .collect()
        })
        .collect();

    let mut nav_row = Vec::new();
    match nav {
        SpawnNav::Editing => {
            nav_row.push(button(t_lang("btn-cancel-edit", language_code), WizardAction::EditCancel));
        }
        SpawnNav::Collecting { can_edit: true } => {
            nav_row.push(button(t_lang("btn-edit", language_code), WizardAction::Edit));
        }
        SpawnNav::Collecting { can_edit: false } => {}
    }
    nav_row.push(exit_button(language_code));
    rows.push(nav_row);

    InlineKeyboardMarkup::new(rows)
}

fn create_variant_keyboard(
    lookup: &mut MenuLookup,
    map: &MapConfig,
    base_key: &str,
    editing: bool,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = map
        .spawn(base_key)
        .map(|entry| {
            entry
                .variants()
                .map(|variant| {
                    let id = lookup.register(&variant.key);
                    vec![button(variant.label.clone(), WizardAction::Variant(id))]
                })
                .collect()
        })
        .unwrap_or_default();

    rows.push(vec![button(t_lang("btn-back", language_code), WizardAction::BackFromVariant)]);

    let mut cancel_row = Vec::new();
    if editing {
        cancel_row.push(button(t_lang("btn-cancel-edit", language_code), WizardAction::EditCancel));
    }
    cancel_row.push(exit_button(language_code));
    rows.push(cancel_row);

    InlineKeyboardMarkup::new(rows)
}

fn create_edit_grid_keyboard(draft: &Draft, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = draft
        .grid
        .waves()
        .iter()
        .enumerate()
        .filter(|(_, wave)| !wave.is_empty())
        .map(|(wave_idx, wave)| {
            (0..wave.len())
                .map(|slot_idx| {
                    button(
                        format!("{}.{}", wave_idx + 1, slot_idx + 1),
                        WizardAction::EditSelect(Cell {
                            wave: wave_idx,
                            slot: slot_idx,
                        }),
                    )
                })
                .collect()
        })
        .collect();

    rows.push(vec![
        button(t_lang("btn-cancel-edit", language_code), WizardAction::EditCancel),
        exit_button(language_code),
    ]);
    InlineKeyboardMarkup::new(rows)
}

fn variant_prompt(map: &MapConfig, base_key: &str, language_code: Option<&str>) -> String {
    let spawn = map.spawn(base_key).map(|entry| entry.label.as_str()).unwrap_or(base_key);
    t_args_lang("variant-prompt", &[("spawn", &escape(spawn))], language_code)
}

/// "Week: 1.3 (week 3)" style heading
pub fn format_week_heading(code: Option<&str>, language_code: Option<&str>) -> String {
    let Some(code) = code.filter(|code| !code.is_empty()) else {
        return t_lang("week-heading-empty", language_code);
    };
    match crate::catalog::absolute_week_number(code) {
        Some(absolute) => t_args_lang(
            "week-heading-absolute",
            &[("code", code), ("absolute", &absolute.to_string())],
            language_code,
        ),
        None => t_args_lang("week-heading", &[("code", code)], language_code),
    }
}

/// Progress text: week context followed by the numbered waves
pub fn format_wave_progress(draft: &Draft, editing: Option<Cell>, language_code: Option<&str>) -> String {
    let week = &draft.week;
    let mut lines = vec![
        format_week_heading(Some(&week.code), language_code),
        t_args_lang("map-line", &[("map", &escape(&week.map_name))], language_code),
        t_args_lang("mod1-line", &[("mod", &escape(&week.mod1))], language_code),
        t_args_lang("mod2-line", &[("mod", &escape(&week.mod2))], language_code),
        String::new(),
    ];

    for (wave_idx, wave) in draft.grid.waves().iter().enumerate() {
        let parts: Vec<String> = wave
            .iter()
            .enumerate()
            .map(|(slot_idx, label)| {
                if editing == Some(Cell { wave: wave_idx, slot: slot_idx }) {
                    t_lang("edit-marker", language_code)
                } else {
                    escape(label)
                }
            })
            .collect();
        if parts.is_empty() {
            lines.push(format!("{}.", wave_idx + 1));
        } else {
            lines.push(format!("{}. {}", wave_idx + 1, parts.join(", ")));
        }
    }

    if editing.is_none() {
        if let Some(Cell { wave, slot: 0 }) = draft.grid.open_cell() {
            lines.push(format!("{}.", wave + 1));
        }
    }

    lines.join("\n")
}

/// HTML summary of the saved configuration for group chats
pub fn format_saved_summary(saved: &SavedWaves, language_code: Option<&str>) -> String {
    let mut out = vec![
        SEPARATOR.to_string(),
        format_week_heading(Some(&saved.week), language_code),
        t_args_lang("summary-map-line", &[("map", &escape(&saved.map))], language_code),
        t_lang("summary-mods-title", language_code),
        format!("<b>{}</b>", escape(&saved.mod1)),
        format!("<b>{}</b>", escape(&saved.mod2)),
        SEPARATOR.to_string(),
    ];

    let total = saved.waves.len();
    for (idx, wave) in saved.waves.iter().enumerate() {
        let number = idx + 1;
        let emphasized = number % WAVE_GROUP == 0;
        let spawns: Vec<String> = wave
            .iter()
            .map(|spawn| {
                if emphasized {
                    format!("<u><b>{}</b></u>", escape(spawn))
                } else {
                    format!("<u>{}</u>", escape(spawn))
                }
            })
            .collect();
        out.push(format!("<i>{number}.</i> {}", spawns.join(", ")));

        if emphasized && number != total {
            out.push(String::new());
        }
    }

    out.push(SEPARATOR.to_string());
    out.join("\n")
}
