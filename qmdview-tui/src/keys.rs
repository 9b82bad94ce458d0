//! Keybinding definitions for the TUI.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Per-result display toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionToggle {
    Full,
    LineNumbers,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    SwitchView(usize),
    MoveUp,
    MoveDown,
    /// Explicit search trigger, or "use this" on the History/Collections views.
    Confirm,
    CycleMode,
    CycleCollection,
    Toggle(OptionToggle),
    StartEmbed,
    KillEmbed,
    ClearHistory,
    ClearQuery,
    Refresh,
    /// Any other key, forwarded to the query box.
    Edit(KeyEvent),
}

pub fn map_key(event: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = event;

    if modifiers.contains(KeyModifiers::CONTROL) {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('f') => Action::CycleCollection,
            KeyCode::Char('o') => Action::Toggle(OptionToggle::Full),
            KeyCode::Char('l') => Action::Toggle(OptionToggle::LineNumbers),
            KeyCode::Char('a') => Action::Toggle(OptionToggle::All),
            KeyCode::Char('e') => Action::StartEmbed,
            KeyCode::Char('k') => Action::KillEmbed,
            KeyCode::Char('d') => Action::ClearHistory,
            KeyCode::Char('u') => Action::ClearQuery,
            KeyCode::Char('r') => Action::Refresh,
            // Terminals report these as line feed and carriage return; the
            // query box is single-line.
            KeyCode::Char('j' | 'm') | KeyCode::Enter => Action::Confirm,
            _ => Action::Edit(event),
        };
    }

    match code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Enter => Action::Confirm,
        KeyCode::Tab => Action::CycleMode,
        KeyCode::Up => Action::MoveUp,
        KeyCode::Down => Action::MoveDown,
        KeyCode::F(n @ 1..=4) => Action::SwitchView(usize::from(n - 1)),
        _ => Action::Edit(event),
    }
}
