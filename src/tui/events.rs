// Terminal events mapped onto reader actions

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::controller::SelectionMode;

/// Rows/columns moved per scroll key or wheel notch
pub const SCROLL_STEP: i16 = 3;

/// Degrees per `[` / `]`
pub const ROTATE_STEP: f64 = 15.0;

/// All possible state mutations driven by input
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Pointer, in terminal cells
    PointerDown(u16, u16),
    PointerDrag(u16, u16),
    PointerUp(u16, u16),
    // Document
    OpenPrompt,
    SetMode(SelectionMode),
    NextPage,
    PrevPage,
    ZoomIn,
    ZoomOut,
    Scroll(i16, i16),
    // Panel
    ApiKeyPrompt,
    TogglePanel,
    RotateQuery(f64),
    ToggleLayer(VectorLayer),
    GradientStep,
    ToggleHelp,
    // Prompt editing
    Input(char),
    Backspace,
    Submit,
    Cancel,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorLayer {
    Dot,
    Softmax,
    Output,
}

/// Which keymap is live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// A text prompt (API key or file path) has focus
    Prompt,
    Help,
}

pub fn map_event(event: Event, mode: InputMode) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => match mode {
            InputMode::Normal => map_normal_key(key),
            InputMode::Prompt => map_prompt_key(key),
            InputMode::Help => match key.code {
                KeyCode::Char('q') => Some(Action::Quit),
                _ => Some(Action::ToggleHelp),
            },
        },
        Event::Mouse(mouse) if mode == InputMode::Normal => match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                Some(Action::PointerDown(mouse.column, mouse.row))
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                Some(Action::PointerDrag(mouse.column, mouse.row))
            }
            MouseEventKind::Up(MouseButton::Left) => {
                Some(Action::PointerUp(mouse.column, mouse.row))
            }
            MouseEventKind::ScrollDown => Some(Action::Scroll(0, SCROLL_STEP)),
            MouseEventKind::ScrollUp => Some(Action::Scroll(0, -SCROLL_STEP)),
            _ => None,
        },
        _ => None,
    }
}

fn map_normal_key(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('o') => Some(Action::OpenPrompt),
        KeyCode::Char('t') => Some(Action::SetMode(SelectionMode::Text)),
        KeyCode::Char('a') => Some(Action::SetMode(SelectionMode::Area)),
        KeyCode::Right | KeyCode::PageDown => Some(Action::NextPage),
        KeyCode::Left | KeyCode::PageUp => Some(Action::PrevPage),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Action::ZoomIn),
        KeyCode::Char('-') => Some(Action::ZoomOut),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::Scroll(0, SCROLL_STEP)),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::Scroll(0, -SCROLL_STEP)),
        KeyCode::Char('l') => Some(Action::Scroll(SCROLL_STEP, 0)),
        KeyCode::Char('h') => Some(Action::Scroll(-SCROLL_STEP, 0)),
        KeyCode::Char('K') => Some(Action::ApiKeyPrompt),
        KeyCode::Tab => Some(Action::TogglePanel),
        KeyCode::Char('[') => Some(Action::RotateQuery(-ROTATE_STEP)),
        KeyCode::Char(']') => Some(Action::RotateQuery(ROTATE_STEP)),
        KeyCode::Char('1') => Some(Action::ToggleLayer(VectorLayer::Dot)),
        KeyCode::Char('2') => Some(Action::ToggleLayer(VectorLayer::Softmax)),
        KeyCode::Char('3') => Some(Action::ToggleLayer(VectorLayer::Output)),
        KeyCode::Char('s') => Some(Action::GradientStep),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_prompt_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Cancel),
        KeyCode::Char(c) => Some(Action::Input(c)),
        _ => None,
    }
}
