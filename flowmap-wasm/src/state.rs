use std::cell::RefCell;
use std::rc::Rc;

use flowmap_core::{
    FilterController, RenderCycle, TableSort, ViewerConfig, Viewport, ZoomState, ZoomTransition,
};
use web_sys::{Document, Window};

/// Viewer state shared across the WASM callbacks behind an `Rc<RefCell<_>>`.
pub struct App {
    pub window: Window,
    pub document: Document,
    pub config: ViewerConfig,
    pub controller: FilterController,
    /// Last successfully rendered payload; kept when a later request fails.
    pub cycle: Option<RenderCycle>,
    pub sort: TableSort,
    pub viewport: Viewport,
    pub zoom: ZoomState,
    pub transition: Option<ZoomTransition>,
    /// Last pointer position while dragging the diagram.
    pub drag: Option<(f64, f64)>,
}

impl App {
    pub fn new(window: Window, document: Document, config: ViewerConfig, viewport: Viewport) -> Self {
        let controller = FilterController::new(&config);
        App {
            window,
            document,
            config,
            controller,
            cycle: None,
            sort: TableSort::default(),
            viewport,
            zoom: ZoomState::new(viewport, (viewport.width, viewport.height)),
            transition: None,
            drag: None,
        }
    }
}

thread_local! {
    pub static STATE: RefCell<Option<Rc<RefCell<App>>>> = const { RefCell::new(None) };
}
