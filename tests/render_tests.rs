//! # Rendering Tests
//!
//! Menu text and the HTML summary of a saved configuration.

use teloxide::types::{ChatId, InlineKeyboardButtonKind, UserId};

use waves::bot::ui_builder::{format_saved_summary, format_wave_progress, render_menu};
use waves::catalog::Catalog;
use waves::dialogue::{Cell, Draft, WaveGrid, WavesSession, WavesStage, WeekSelection};
use waves::storage::SavedWaves;

fn catalog() -> Catalog {
    let (catalog, _) = Catalog::from_json(include_str!("../data/catalog.json")).expect("shipped catalog parses");
    catalog
}

fn coastal_draft(waves: Vec<Vec<&str>>) -> Draft {
    let mut draft = Draft::new(
        1,
        WeekSelection {
            code: "1.3".to_string(),
            slug: "coastal-reach".to_string(),
            map_name: "Coastal Reach".to_string(),
            mod1: "Fog".to_string(),
            mod2: "Double Spawn".to_string(),
        },
    );
    draft.grid = WaveGrid::from_waves(
        waves
            .into_iter()
            .map(|wave| wave.into_iter().map(str::to_string).collect())
            .collect(),
    );
    draft
}

#[test]
fn test_progress_lists_waves_and_next_slot() {
    let draft = coastal_draft(vec![vec!["North Gate", "Harbor", "South Ridge"]]);
    let text = format_wave_progress(&draft, None, None);

    assert!(text.starts_with("Week: 1.3 (week 3)\nMap: Coastal Reach\nModifier 1: Fog\nModifier 2: Double Spawn"));
    assert!(text.contains("1. North Gate, Harbor, South Ridge"));
    assert!(text.ends_with("\n2."));
}

#[test]
fn test_progress_marks_cell_under_edit() {
    let draft = coastal_draft(vec![vec!["North Gate", "Harbor"]]);
    let text = format_wave_progress(&draft, Some(Cell { wave: 0, slot: 1 }), None);

    assert!(text.contains("1. North Gate, <u><b>Replacing</b></u>"));
    assert!(!text.contains("Harbor"));
}

#[test]
fn test_spawn_menu_follows_layout_rows() {
    let catalog = catalog();
    let mut session = WavesSession::new(UserId(1), ChatId(1));
    session.stage = WavesStage::Entry {
        draft: coastal_draft(vec![]),
        pending: None,
    };

    let menu = render_menu(&mut session, &catalog).expect("menu renders");
    let rows: Vec<Vec<&str>> = menu
        .keyboard
        .inline_keyboard
        .iter()
        .map(|row| row.iter().map(|button| button.text.as_str()).collect())
        .collect();

    assert_eq!(rows[0], vec!["North Gate"]);
    assert_eq!(rows[1], vec!["Outer Wall"]);
    assert_eq!(rows[2], vec!["South Ridge", "Harbor"]);
    assert_eq!(rows[3], vec!["Lighthouse"]);
    assert_eq!(session.lookup.len(), 5);

    // Payloads carry ids, not labels
    for button in menu.keyboard.inline_keyboard.iter().flatten() {
        if let InlineKeyboardButtonKind::CallbackData(data) = &button.kind {
            assert!(!data.contains(' '), "{data}");
            assert!(data.len() <= 64);
        }
    }
}

#[test]
fn test_render_unknown_map_fails() {
    let catalog = catalog();
    let mut draft = coastal_draft(vec![]);
    draft.week.slug = "atlantis".to_string();
    let mut session = WavesSession::new(UserId(1), ChatId(1));
    session.stage = WavesStage::Entry { draft, pending: None };

    assert!(render_menu(&mut session, &catalog).is_err());
}

#[test]
fn test_summary_groups_waves_in_threes() {
    let saved = SavedWaves {
        week: "1.3".to_string(),
        absolute_week: Some(3),
        slug: "coastal-reach".to_string(),
        map: "Coastal <Reach>".to_string(),
        mod1: "Fog".to_string(),
        mod2: "Double Spawn".to_string(),
        waves: (1..=15)
            .map(|wave| vec![format!("S{wave}"), "Harbor".to_string(), "North Gate".to_string()])
            .collect(),
    };

    let summary = format_saved_summary(&saved, None);

    assert!(summary.contains("Coastal &lt;Reach&gt;"));
    assert!(summary.contains("<b>Fog</b>"));
    assert!(summary.contains("<i>1.</i> <u>S1</u>, <u>Harbor</u>, <u>North Gate</u>"));
    assert!(summary.contains("<i>3.</i> <u><b>S3</b></u>"));
    assert!(summary.contains("<u><b>North Gate</b></u>\n\n<i>4.</i>"));
    assert!(summary.contains("<i>12.</i> <u><b>S12</b></u>"));
    // No blank line after the last wave
    assert!(!summary.contains("\n\n━"));
}
