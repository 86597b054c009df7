// Paper X-Ray terminal front-end
// Event loop, job spawning and prompt handling around a Session

pub mod events;
pub mod layout;
pub mod render;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Terminal,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::analysis::{AnalysisClient, GeminiTransport};
use crate::app::{run_job, AnalysisJob, AnalysisOutcome, AppState, Session};
use crate::config::XrayConfig;
use crate::controller::{SelectionMode, ViewerController};
use crate::credentials::{CredentialState, CredentialStore};
use crate::error::XrayResult;
use crate::geometry::{Bounds, Point};
use crate::viz::VizState;
use events::{map_event, Action, InputMode, VectorLayer};
use layout::ScreenLayout;

#[cfg(feature = "pdfium")]
pub type ViewerDocument = crate::document::PdfiumDocument;

#[cfg(not(feature = "pdfium"))]
pub type ViewerDocument = crate::document::MemoryDocument;

#[cfg(feature = "pdfium")]
fn open_document(path: &Path) -> XrayResult<ViewerDocument> {
    crate::document::open_path(path)
}

#[cfg(not(feature = "pdfium"))]
fn open_document(path: &Path) -> XrayResult<ViewerDocument> {
    Err(crate::error::XrayError::decode(format!(
        "{}: built without PDF support",
        path.display()
    )))
}

/// Everything the UI loop mutates
pub struct Reader {
    pub session: Session<ViewerDocument>,
    client: Arc<AnalysisClient<GeminiTransport>>,
    store: Box<dyn CredentialStore>,
    tx: UnboundedSender<AnalysisOutcome>,
    rx: UnboundedReceiver<AnalysisOutcome>,
    pub show_help: bool,
    pub open_prompt: bool,
    pub input: String,
    /// Virtual pixel size of one terminal cell
    pub cell: (f64, f64),
}

impl Reader {
    pub fn new(
        config: &XrayConfig,
        client: AnalysisClient<GeminiTransport>,
        store: Box<dyn CredentialStore>,
        credentials: CredentialState,
    ) -> Self {
        let viewer = ViewerController::new(config.viewer.clone(), config.capture.clone());
        let (tx, rx) = unbounded_channel();
        Self {
            session: Session::new(viewer, AppState::new(credentials)),
            client: Arc::new(client),
            store,
            tx,
            rx,
            show_help: false,
            open_prompt: false,
            input: String::new(),
            cell: (
                config.viewer.cell_width_px.max(1) as f64,
                config.viewer.cell_height_px.max(1) as f64,
            ),
        }
    }

    pub fn input_mode(&self) -> InputMode {
        if self.show_help {
            InputMode::Help
        } else if self.session.state.show_api_menu || self.open_prompt {
            InputMode::Prompt
        } else {
            InputMode::Normal
        }
    }

    /// Keep the controller's viewport in step with the terminal size
    pub fn sync_layout(&mut self, area: Rect) {
        let layout = ScreenLayout::new(area, self.session.state.sidebar_open);
        let pane = layout.document_inner();
        let (cw, ch) = self.cell;
        self.session.viewer.set_viewport(Bounds {
            left: pane.x as f64 * cw,
            top: pane.y as f64 * ch,
            width: pane.width as f64 * cw,
            height: pane.height as f64 * ch,
        });
    }

    /// Centre of a terminal cell in screen pixels
    fn screen_point(&self, column: u16, row: u16) -> Point {
        let (cw, ch) = self.cell;
        Point::new(
            column as f64 * cw + cw / 2.0,
            row as f64 * ch + ch / 2.0,
        )
    }

    pub fn open(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let opened = open_document(path).and_then(|doc| self.session.load_document(doc, &name));
        self.session.state.status_message = match opened {
            Ok(()) => format!("Opened {}", name),
            Err(e) => {
                error!("Failed to open {}: {}", path.display(), e);
                e.user_message()
            }
        };
    }

    fn spawn(&self, job: AnalysisJob) {
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = run_job(&client, job).await;
            if tx.send(outcome).is_err() {
                debug!("Reader closed before analysis finished");
            }
        });
    }

    /// Hand finished analyses to the session
    pub fn drain_results(&mut self) {
        while let Ok(outcome) = self.rx.try_recv() {
            self.session.complete(outcome);
        }
    }

    fn report(&mut self, result: XrayResult<bool>) {
        if let Err(e) = result {
            error!("Viewer error: {}", e);
            self.session.state.status_message = e.user_message();
        }
    }

    /// Apply one action; `true` means quit
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::PointerDown(column, row) => {
                let point = self.screen_point(column, row);
                self.session.viewer.pointer_down(point);
            }
            Action::PointerDrag(column, row) => {
                let point = self.screen_point(column, row);
                self.session.viewer.pointer_move(point);
            }
            Action::PointerUp(column, row) => {
                let point = self.screen_point(column, row);
                if let Some(job) = self.session.pointer_up(point) {
                    self.spawn(job);
                }
            }
            Action::OpenPrompt => {
                self.open_prompt = true;
                self.input.clear();
            }
            Action::SetMode(mode) => {
                let viewer = &mut self.session.viewer;
                if !viewer.set_mode(mode) && viewer.mode() != mode {
                    self.session.state.status_message =
                        "Finish the current selection first".to_string();
                } else if mode == SelectionMode::Area && viewer.loaded().is_none() {
                    self.session.state.status_message =
                        "Area selection needs a PDF; press o to open one".to_string();
                }
            }
            Action::NextPage => {
                let result = self.session.viewer.next_page();
                self.report(result);
            }
            Action::PrevPage => {
                let result = self.session.viewer.prev_page();
                self.report(result);
            }
            Action::ZoomIn => {
                let result = self.session.viewer.zoom_in();
                self.report(result);
            }
            Action::ZoomOut => {
                let result = self.session.viewer.zoom_out();
                self.report(result);
            }
            Action::Scroll(dx, dy) => {
                let (cw, ch) = self.cell;
                self.session.viewer.scroll_by(dx as f64 * cw, dy as f64 * ch);
            }
            Action::ApiKeyPrompt => {
                self.session.state.show_api_menu = true;
                self.input.clear();
            }
            Action::TogglePanel => {
                self.session.state.sidebar_open = !self.session.state.sidebar_open;
            }
            Action::RotateQuery(delta) => {
                if let Some(VizState::Vector(play)) = self.session.state.viz_mut() {
                    play.rotate(delta);
                }
            }
            Action::ToggleLayer(layer) => {
                if let Some(VizState::Vector(play)) = self.session.state.viz_mut() {
                    match layer {
                        VectorLayer::Dot => play.toggle_dot(),
                        VectorLayer::Softmax => play.toggle_softmax(),
                        VectorLayer::Output => play.toggle_output(),
                    }
                }
            }
            Action::GradientStep => {
                if let Some(VizState::Gradient(hill)) = self.session.state.viz_mut() {
                    hill.step();
                }
            }
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::Input(c) => self.input.push(c),
            Action::Backspace => {
                self.input.pop();
            }
            Action::Submit => self.submit(),
            Action::Cancel => {
                self.session.state.show_api_menu = false;
                self.open_prompt = false;
                self.input.clear();
            }
        }
        false
    }

    fn submit(&mut self) {
        let input = std::mem::take(&mut self.input);
        if self.session.state.show_api_menu {
            if let Err(e) = self.session.state.save_api_key(self.store.as_mut(), &input) {
                error!("Failed to save API key: {}", e);
                self.session.state.status_message = e.user_message();
            }
        } else if self.open_prompt {
            self.open_prompt = false;
            let path = PathBuf::from(input.trim());
            self.open(&path);
        }
    }
}

/// Run the reader until the user quits
pub async fn run(
    config: &XrayConfig,
    client: AnalysisClient<GeminiTransport>,
    store: Box<dyn CredentialStore>,
    credentials: CredentialState,
    initial: Option<PathBuf>,
) -> Result<()> {
    info!("Starting Paper X-Ray reader");

    let mut reader = Reader::new(config, client, store, credentials);
    if let Some(path) = initial {
        reader.open(&path);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_loop(&mut terminal, &mut reader).await;

    // Cleanup
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("Reader error: {:?}", err);
        return Err(err);
    }

    info!("Reader shut down");
    Ok(())
}

async fn run_loop<B: Backend>(terminal: &mut Terminal<B>, reader: &mut Reader) -> Result<()> {
    loop {
        reader.drain_results();
        reader.sync_layout(terminal.size()?);

        terminal.draw(|frame| render::draw(frame, reader))?;

        // Short poll keeps finished analyses flowing in
        if event::poll(Duration::from_millis(50))? {
            if let Some(action) = map_event(event::read()?, reader.input_mode()) {
                if reader.apply(action) {
                    break;
                }
            }
        } else {
            tokio::task::yield_now().await;
        }
    }
    Ok(())
}
