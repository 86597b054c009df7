use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisClient, AnalysisResult, AnalysisTransport};
use crate::bundle::ContextBundle;
use crate::controller::{PointerOutcome, ViewerController};
use crate::credentials::{Credential, CredentialSource, CredentialState, CredentialStore};
use crate::document::PageSource;
use crate::error::XrayResult;
use crate::geometry::Point;
use crate::viz::{select_renderer, RendererChoice, VizState};

/// An analysis the front-end should run off the UI loop
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub ticket: u64,
    pub bundle: ContextBundle,
    pub credential: Credential,
}

#[derive(Debug)]
pub enum SelectionDispatch {
    /// No key configured; the API-key prompt is now open
    PromptForCredential,
    Analyze(AnalysisJob),
}

/// A finished job, ready for [`AppState::complete_analysis`]
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub ticket: u64,
    pub result: AnalysisResult,
}

/// Run one job to completion. Never fails; errors become the fallback result.
pub async fn run_job<T: AnalysisTransport>(
    client: &AnalysisClient<T>,
    job: AnalysisJob,
) -> AnalysisOutcome {
    let result = client.analyze(&job.bundle, Some(&job.credential)).await;
    AnalysisOutcome {
        ticket: job.ticket,
        result,
    }
}

/// Application-level state above the viewer: result panel, credential and menus
pub struct AppState {
    result: Option<Arc<AnalysisResult>>,
    viz: Option<VizState>,
    in_flight: usize,
    next_ticket: u64,
    pub credentials: CredentialState,
    pub show_api_menu: bool,
    pub sidebar_open: bool,
    pub status_message: String,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(credentials: CredentialState) -> Self {
        let show_api_menu = credentials.source() == CredentialSource::Missing;
        Self {
            result: None,
            viz: None,
            in_flight: 0,
            next_ticket: 1,
            credentials,
            show_api_menu,
            sidebar_open: true,
            status_message: "Select text or switch to area mode (a) to analyze".to_string(),
            should_quit: false,
        }
    }

    pub fn result(&self) -> Option<Arc<AnalysisResult>> {
        self.result.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn renderer(&self) -> Option<RendererChoice> {
        self.result.as_ref().map(|r| select_renderer(r.viz_type))
    }

    pub fn viz(&self) -> Option<&VizState> {
        self.viz.as_ref()
    }

    pub fn viz_mut(&mut self) -> Option<&mut VizState> {
        self.viz.as_mut()
    }

    /// Gate a captured selection on the credential
    pub fn handle_selection(&mut self, bundle: ContextBundle) -> SelectionDispatch {
        let Some(credential) = self.credentials.resolve() else {
            info!("No API key configured; opening the key prompt");
            self.show_api_menu = true;
            self.status_message = "Set an API key to analyze selections (K)".to_string();
            return SelectionDispatch::PromptForCredential;
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight += 1;
        self.sidebar_open = true;
        self.status_message = if bundle.is_area() {
            "Analyzing selected area...".to_string()
        } else {
            "Analyzing selected text...".to_string()
        };
        debug!("Dispatching analysis #{}", ticket);

        SelectionDispatch::Analyze(AnalysisJob {
            ticket,
            bundle,
            credential,
        })
    }

    /// Show a finished result. Whichever job resolves last is what stays on screen.
    pub fn complete_analysis(&mut self, ticket: u64, result: AnalysisResult) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket + 1 < self.next_ticket {
            debug!("Analysis #{} resolved after a newer request was sent", ticket);
        }

        let choice = select_renderer(result.viz_type);
        self.status_message = if result.is_fallback() {
            "Analysis failed; select again to retry".to_string()
        } else {
            format!("Analysis ready ({})", result.viz_type)
        };
        self.viz = Some(VizState::for_choice(choice));
        self.result = Some(Arc::new(result));
    }

    /// A new document was opened; the old explanation no longer applies
    pub fn document_changed(&mut self) {
        self.result = None;
        self.viz = None;
    }

    pub fn save_api_key(&mut self, store: &mut dyn CredentialStore, key: &str) -> XrayResult<()> {
        self.credentials.save(store, key)?;
        self.show_api_menu = false;
        self.status_message = match self.credentials.source() {
            CredentialSource::Saved => "API key saved".to_string(),
            CredentialSource::Environment => "Saved key cleared; using environment key".to_string(),
            CredentialSource::Missing => "API key cleared".to_string(),
        };
        Ok(())
    }
}

/// Viewer plus application state, wired so selections turn into jobs
pub struct Session<D: PageSource> {
    pub viewer: ViewerController<D>,
    pub state: AppState,
    /// Ticket of the area capture holding the viewer in `Processing`
    area_ticket: Option<u64>,
}

impl<D: PageSource> Session<D> {
    pub fn new(viewer: ViewerController<D>, state: AppState) -> Self {
        Self {
            viewer,
            state,
            area_ticket: None,
        }
    }

    pub fn load_document(&mut self, source: D, name: impl Into<String>) -> XrayResult<()> {
        self.viewer.load_document(source, name)?;
        self.state.document_changed();
        Ok(())
    }

    /// Pointer release: capture, gate on the credential, maybe hand back a job
    pub fn pointer_up(&mut self, screen: Point) -> Option<AnalysisJob> {
        match self.viewer.pointer_up(screen) {
            PointerOutcome::Captured(bundle) => match self.state.handle_selection(bundle) {
                SelectionDispatch::Analyze(job) => {
                    self.area_ticket = Some(job.ticket);
                    Some(job)
                }
                SelectionDispatch::PromptForCredential => {
                    self.viewer.finish_processing();
                    None
                }
            },
            PointerOutcome::TextCaptured(bundle) => match self.state.handle_selection(bundle) {
                SelectionDispatch::Analyze(job) => Some(job),
                SelectionDispatch::PromptForCredential => None,
            },
            PointerOutcome::CaptureFailed(e) => {
                warn!("Selection dropped: {}", e);
                self.state.status_message = e.user_message();
                None
            }
            PointerOutcome::Discarded | PointerOutcome::Ignored => None,
        }
    }

    pub fn complete(&mut self, outcome: AnalysisOutcome) {
        if self.area_ticket == Some(outcome.ticket) {
            self.area_ticket = None;
            self.viewer.finish_processing();
        }
        self.state.complete_analysis(outcome.ticket, outcome.result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{MathSymbol, SymbolRole, VisualizationType};
    use crate::capture::capture_text;
    use crate::config::{CaptureConfig, ViewerConfig};
    use crate::controller::{AreaState, SelectionMode, ToolState};
    use crate::credentials::MemoryCredentialStore;
    use crate::document::MemoryDocument;
    use crate::geometry::Bounds;

    fn text_bundle(text: &str) -> ContextBundle {
        capture_text(text, 3).unwrap()
    }

    fn result(text: &str, viz: VisualizationType) -> AnalysisResult {
        AnalysisResult {
            original_text: text.to_string(),
            simplified_explanation: format!("About {}", text),
            symbols: vec![MathSymbol {
                symbol: "Q".to_string(),
                definition: "queries".to_string(),
                plain_english: "what we look for".to_string(),
                role: SymbolRole::Matrix,
            }],
            dimensions: Vec::new(),
            viz_type: viz,
        }
    }

    fn session(key: Option<&str>) -> Session<MemoryDocument> {
        let mut viewer = ViewerController::new(ViewerConfig::default(), CaptureConfig::default());
        viewer.set_viewport(Bounds {
            left: 0.0,
            top: 0.0,
            width: 800.0,
            height: 600.0,
        });
        let state = AppState::new(CredentialState::new(key.map(String::from), None));
        Session::new(viewer, state)
    }

    #[test]
    fn test_no_key_opens_prompt_and_produces_nothing() {
        let mut state = AppState::new(CredentialState::new(None, None));
        state.show_api_menu = false;

        let dispatch = state.handle_selection(text_bundle("softmax"));
        assert!(matches!(dispatch, SelectionDispatch::PromptForCredential));
        assert!(state.show_api_menu);
        assert!(!state.is_loading());
        assert!(state.result().is_none());
    }

    #[test]
    fn test_selection_with_key_issues_job() {
        let mut state = AppState::new(CredentialState::new(None, Some("env-key".into())));
        state.sidebar_open = false;

        let SelectionDispatch::Analyze(job) = state.handle_selection(text_bundle("softmax")) else {
            panic!("expected a job");
        };
        assert_eq!(job.ticket, 1);
        assert_eq!(job.credential.expose(), "env-key");
        assert!(state.is_loading());
        assert!(state.sidebar_open);
    }

    #[test]
    fn test_later_resolving_result_wins() {
        let mut state = AppState::new(CredentialState::new(Some("k".into()), None));
        let SelectionDispatch::Analyze(first) = state.handle_selection(text_bundle("first")) else {
            panic!("expected a job");
        };
        let SelectionDispatch::Analyze(second) = state.handle_selection(text_bundle("second"))
        else {
            panic!("expected a job");
        };

        // the newer request resolves first, the older one last
        state.complete_analysis(second.ticket, result("second", VisualizationType::Generic));
        assert!(state.is_loading());
        state.complete_analysis(
            first.ticket,
            result("first", VisualizationType::GradientDescent),
        );

        assert!(!state.is_loading());
        assert_eq!(state.result().unwrap().original_text, "first");
        assert_eq!(state.renderer(), Some(RendererChoice::GradientHill));
        assert!(matches!(state.viz(), Some(VizState::Gradient(_))));
    }

    #[test]
    fn test_results_are_replaced_not_mutated() {
        let mut state = AppState::new(CredentialState::new(Some("k".into()), None));
        state.complete_analysis(1, result("a", VisualizationType::Generic));
        let held = state.result().unwrap();

        state.complete_analysis(2, result("b", VisualizationType::VectorAlignment));
        assert_eq!(held.original_text, "a");
        assert_eq!(state.result().unwrap().original_text, "b");
    }

    #[test]
    fn test_document_change_clears_result() {
        let mut s = session(Some("k"));
        s.state
            .complete_analysis(1, result("old", VisualizationType::Generic));

        s.load_document(MemoryDocument::new(2, 300, 300), "new.pdf")
            .unwrap();
        assert!(s.state.result().is_none());
        assert!(s.state.viz().is_none());
    }

    #[test]
    fn test_result_arriving_after_document_change_is_shown() {
        let mut s = session(Some("k"));
        assert!(s.viewer.pointer_down(Point::new(32.0, 4.0)));
        let job = s.pointer_up(Point::new(104.0, 4.0)).unwrap();
        assert_eq!(job.bundle.text(), Some("Attention"));

        s.load_document(MemoryDocument::new(2, 300, 300), "other.pdf")
            .unwrap();
        assert!(s.state.result().is_none());

        s.complete(AnalysisOutcome {
            ticket: job.ticket,
            result: result("Attention", VisualizationType::VectorAlignment),
        });
        assert_eq!(s.state.result().unwrap().original_text, "Attention");
        assert_eq!(s.state.renderer(), Some(RendererChoice::VectorPlayground));
        assert!(!s.state.is_loading());
    }

    #[test]
    fn test_click_outside_pane_sends_nothing() {
        let mut s = session(Some("k"));
        assert!(s.viewer.pointer_down(Point::new(32.0, 4.0)));
        assert!(s.pointer_up(Point::new(104.0, 4.0)).is_some());

        assert!(!s.viewer.pointer_down(Point::new(1000.0, 300.0)));
        assert!(s.pointer_up(Point::new(1000.0, 300.0)).is_none());
    }

    #[test]
    fn test_save_api_key_closes_prompt() {
        let mut state = AppState::new(CredentialState::new(None, None));
        assert!(state.show_api_menu);

        let mut store = MemoryCredentialStore::default();
        state.save_api_key(&mut store, "  new-key ").unwrap();
        assert!(!state.show_api_menu);
        assert_eq!(state.credentials.saved_key(), Some("new-key"));
    }

    #[test]
    fn test_area_selection_without_key_returns_to_idle() {
        let mut s = session(None);
        s.load_document(MemoryDocument::new(2, 300, 300), "a.pdf")
            .unwrap();
        s.viewer.set_mode(SelectionMode::Area);

        assert!(s.viewer.pointer_down(Point::new(10.0, 10.0)));
        assert!(s.pointer_up(Point::new(90.0, 90.0)).is_none());

        assert!(s.state.show_api_menu);
        assert!(s.state.result().is_none());
        assert_eq!(s.viewer.tool(), ToolState::Area(AreaState::Idle));
    }

    #[test]
    fn test_area_job_holds_processing_until_complete() {
        let mut s = session(Some("k"));
        s.load_document(MemoryDocument::new(2, 300, 300), "a.pdf")
            .unwrap();
        s.viewer.set_mode(SelectionMode::Area);

        assert!(s.viewer.pointer_down(Point::new(10.0, 10.0)));
        let job = s.pointer_up(Point::new(90.0, 90.0)).unwrap();
        assert!(job.bundle.is_area());
        assert_eq!(s.viewer.tool(), ToolState::Area(AreaState::Processing));

        s.complete(AnalysisOutcome {
            ticket: job.ticket,
            result: AnalysisResult::fallback("[Image Analysis Error]"),
        });
        assert_eq!(s.viewer.tool(), ToolState::Area(AreaState::Idle));
        assert!(s.state.result().unwrap().is_fallback());
    }
}
