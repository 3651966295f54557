use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use flowmap_core::filter::{DATE_FORMAT, DatePreset};
use flowmap_core::{
    CycleOutcome, FetchRequest, TableColumn, ViewPhase, Viewport, ZoomState, apply_response,
    summary::sort_rows,
};
use flowmap_svg::{SvgSink, markup, render_standalone_svg};
use tracing::{error, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlInputElement, HtmlSelectElement, MouseEvent};

mod constants;
mod state;
mod utils;
mod view;

use constants::*;
use state::{App, STATE};
use utils::{asset_url, fetch_text, html_element, read_viewer_config, save_text_as_file, set_style};

fn container_viewport(document: &Document) -> Viewport {
    html_element(document, CONTAINER_ID)
        .map(|el| (el.offset_width() as f64, el.offset_height() as f64))
        .filter(|(w, h)| *w > 0.0 && *h > 0.0)
        .map(|(width, height)| Viewport { width, height })
        .unwrap_or_default()
}

/// Fade the page and show the overlay while a request is outstanding.
fn set_loading(document: &Document, loading: bool) {
    if let Some(overlay) = html_element(document, OVERLAY_ID) {
        set_style(&overlay, "display", if loading { "block" } else { "none" });
    }
    for id in DIMMED_IDS {
        if let Some(el) = html_element(document, id) {
            set_style(&el, "opacity", if loading { LOADING_OPACITY } else { "1" });
        }
    }
}

fn show_error(app: &App, message: &str) {
    let html = markup::error_overlay(&asset_url(&app.config.error_image), message);
    let content = app
        .document
        .get_elements_by_class_name(OVERLAY_CONTENT_CLASS)
        .item(0)
        .or_else(|| app.document.get_element_by_id(OVERLAY_ID));
    if let Some(el) = content {
        el.set_inner_html(&html);
    }
}

/// Issue a request and feed the answer back into the shared state.
fn dispatch(state: Rc<RefCell<App>>, req: FetchRequest) {
    let window = {
        let s = state.borrow();
        set_loading(&s.document, true);
        s.window.clone()
    };
    wasm_bindgen_futures::spawn_local(async move {
        let body = fetch_text(&window, &req.url).await;
        let mut s = state.borrow_mut();
        on_response(&mut s, req.generation, body);
    });
}

fn on_response(app: &mut App, generation: u64, body: Result<String, flowmap_core::LoadError>) {
    let mut sink = SvgSink::new();
    let App {
        controller,
        config,
        viewport,
        ..
    } = &mut *app;
    match apply_response(controller, generation, body, *viewport, config, &mut sink) {
        CycleOutcome::Stale => {}
        CycleOutcome::Failed(message) => {
            error!(%message, "render cycle failed");
            show_error(app, &message);
        }
        CycleOutcome::Rendered(cycle) => {
            if let Some(el) = app.document.get_element_by_id(CONTAINER_ID) {
                el.set_inner_html(&sink.finish());
            }
            app.zoom = ZoomState::new(app.viewport, cycle.scene.view_box);
            app.transition = None;
            app.cycle = Some(*cycle);
            render_panels(app);
            view::show_info(app, None);
            set_loading(&app.document, false);
        }
    }
}

fn render_table(app: &App) {
    let Some(cycle) = &app.cycle else {
        return;
    };
    if let Ok(Some(body)) = app.document.query_selector(TABLE_BODY_SELECTOR) {
        body.set_inner_html(&markup::table_body(&cycle.rows));
    }
}

fn render_panels(app: &mut App) {
    let sort = app.sort;
    if let Some(cycle) = app.cycle.as_mut() {
        sort_rows(&mut cycle.rows, sort);
    }
    render_table(app);
    let Some(cycle) = &app.cycle else {
        return;
    };
    let doc = &app.document;
    if let Some(el) = doc.get_element_by_id(LEGEND_ID) {
        el.set_inner_html(&markup::legend_items(&cycle.legend));
    }
    if let Some(el) = doc.get_element_by_id(DEPARTMENT_SELECT_ID) {
        el.set_inner_html(&markup::department_options(&cycle.departments));
    }
    for (class, text) in markup::statistics(&cycle.summary) {
        utils::set_text_by_class(doc, class, &text);
    }
    let bounds = app.controller.bounds();
    let filter = app.controller.state();
    for (id, value) in [(START_DATE_ID, filter.start), (END_DATE_ID, filter.end)] {
        let Some(input) = doc
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        else {
            continue;
        };
        if let Some((lo, hi)) = bounds {
            let _ = input.set_attribute("min", &lo.format(DATE_FORMAT).to_string());
            let _ = input.set_attribute("max", &hi.format(DATE_FORMAT).to_string());
        }
        if let Some(v) = value {
            input.set_value(&v.format(DATE_FORMAT).to_string());
        }
    }
}

fn input_date(document: &Document, id: &str) -> Option<NaiveDate> {
    let input: HtmlInputElement = document.get_element_by_id(id)?.dyn_into().ok()?;
    NaiveDate::parse_from_str(&input.value(), DATE_FORMAT).ok()
}

fn select_value(document: &Document, id: &str) -> Option<String> {
    let sel: HtmlSelectElement = document.get_element_by_id(id)?.dyn_into().ok()?;
    Some(sel.value())
}

fn grouping_key(document: &Document) -> String {
    document
        .get_element_by_id(GROUPING_KEY_ID)
        .and_then(|el| {
            el.clone()
                .dyn_into::<HtmlSelectElement>()
                .map(|s| s.value())
                .or_else(|_| el.dyn_into::<HtmlInputElement>().map(|i| i.value()))
                .ok()
        })
        .unwrap_or_default()
}

fn on_click(
    doc: &Document,
    id: &str,
    state: &Rc<RefCell<App>>,
    mut handler: impl FnMut(&Rc<RefCell<App>>) + 'static,
) -> Result<(), JsValue> {
    let Some(el) = html_element(doc, id) else {
        warn!(id, "control missing from page");
        return Ok(());
    };
    let st = state.clone();
    let cb = Closure::<dyn FnMut()>::wrap(Box::new(move || handler(&st)));
    el.set_onclick(Some(cb.as_ref().unchecked_ref()));
    cb.forget();
    Ok(())
}

fn on_change(
    doc: &Document,
    id: &str,
    state: &Rc<RefCell<App>>,
    mut handler: impl FnMut(&Rc<RefCell<App>>) + 'static,
) -> Result<(), JsValue> {
    let Some(el) = html_element(doc, id) else {
        warn!(id, "control missing from page");
        return Ok(());
    };
    let st = state.clone();
    let cb = Closure::<dyn FnMut()>::wrap(Box::new(move || handler(&st)));
    el.set_onchange(Some(cb.as_ref().unchecked_ref()));
    cb.forget();
    Ok(())
}

fn attach_ui(state: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();

    on_click(&doc, APPLY_BUTTON_ID, &state, |st| {
        let req = {
            let mut s = st.borrow_mut();
            let key = grouping_key(&s.document);
            s.controller.set_grouping_key(&key);
            s.controller.apply()
        };
        dispatch(st.clone(), req);
    })?;

    on_change(&doc, DEPARTMENT_SELECT_ID, &state, |st| {
        let req = {
            let mut s = st.borrow_mut();
            let value = select_value(&s.document, DEPARTMENT_SELECT_ID).unwrap_or_default();
            let key = grouping_key(&s.document);
            s.controller.set_grouping_key(&key);
            s.controller.select_department(&value)
        };
        dispatch(st.clone(), req);
    })?;

    for id in [START_DATE_ID, END_DATE_ID] {
        on_change(&doc, id, &state, |st| {
            let req = {
                let mut s = st.borrow_mut();
                let (Some(start), Some(end)) = (
                    input_date(&s.document, START_DATE_ID),
                    input_date(&s.document, END_DATE_ID),
                ) else {
                    return;
                };
                let key = grouping_key(&s.document);
                s.controller.set_grouping_key(&key);
                s.controller.set_date_range(start, end)
            };
            dispatch(st.clone(), req);
        })?;
    }

    if let Some(sel) = doc.get_element_by_id(PRESET_SELECT_ID) {
        sel.set_inner_html(&markup::preset_options());
    }
    on_change(&doc, PRESET_SELECT_ID, &state, |st| {
        let req = {
            let mut s = st.borrow_mut();
            let Some(preset) = select_value(&s.document, PRESET_SELECT_ID)
                .and_then(|v| DatePreset::from_label(&v))
            else {
                return;
            };
            let today = chrono::Local::now().date_naive();
            let key = grouping_key(&s.document);
            s.controller.set_grouping_key(&key);
            match s.controller.apply_preset(preset, today) {
                Some(req) => req,
                None => {
                    warn!(preset = preset.label(), "preset needs the data range, not loaded yet");
                    return;
                }
            }
        };
        dispatch(st.clone(), req);
    })?;

    on_click(&doc, ZOOM_IN_ID, &state, |st| {
        let mut s = st.borrow_mut();
        s.transition = None;
        s.zoom.zoom_in();
        view::apply_transform(&s);
    })?;
    on_click(&doc, ZOOM_OUT_ID, &state, |st| {
        let mut s = st.borrow_mut();
        s.transition = None;
        s.zoom.zoom_out();
        view::apply_transform(&s);
    })?;
    on_click(&doc, RESET_BUTTON_ID, &state, |st| {
        let mut s = st.borrow_mut();
        let now = utils::now_ms(&s.window);
        s.transition = Some(s.zoom.reset(now));
    })?;
    // Dismiss an error overlay; the previous diagram is still underneath
    on_click(&doc, OVERLAY_ID, &state, |st| {
        let s = st.borrow();
        if matches!(s.controller.phase(), ViewPhase::ErrorDisplayed(_)) {
            set_loading(&s.document, false);
        }
    })?;
    on_click(&doc, EXPORT_SVG_ID, &state, |st| {
        if let Err(e) = export_current(&st.borrow()) {
            warn!(?e, "svg export failed");
        }
    })?;

    // Header clicks re-sort the table
    if let Ok(Some(head)) = doc.query_selector(TABLE_HEAD_SELECTOR) {
        let st = state.clone();
        let onclick = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let Some(cell) = utils::closest(e.target(), "th") else {
                return;
            };
            let mut idx = 0;
            let mut prev = cell.previous_element_sibling();
            while let Some(p) = prev {
                idx += 1;
                prev = p.previous_element_sibling();
            }
            let Some(column) = TableColumn::from_index(idx) else {
                return;
            };
            let mut s = st.borrow_mut();
            s.sort = s.sort.toggled(column);
            let sort = s.sort;
            if let Some(cycle) = s.cycle.as_mut() {
                sort_rows(&mut cycle.rows, sort);
            }
            render_table(&s);
        }));
        head.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    view::attach_hover(state.clone())?;
    view::attach_zoom(state)?;
    Ok(())
}

fn export_current(app: &App) -> Result<(), JsValue> {
    let Some(cycle) = &app.cycle else {
        return Err(JsValue::from_str("nothing rendered yet"));
    };
    let svg = render_standalone_svg(&cycle.scene, app.zoom.transform);
    save_text_as_file(&app.document, EXPORT_FILE_NAME, &svg)
}

/// Download the current diagram, as shown, as an SVG file.
#[wasm_bindgen]
pub fn export_svg() -> Result<(), JsValue> {
    STATE.with(|st| match st.borrow().as_ref() {
        Some(app) => export_current(&app.borrow()),
        None => Err(JsValue::from_str("viewer not started")),
    })
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let config = read_viewer_config(&window);
    let viewport = container_viewport(&document);
    info!(
        root = %config.script_root,
        width = viewport.width,
        height = viewport.height,
        "starting flowmap viewer"
    );

    let state = Rc::new(RefCell::new(App::new(
        window,
        document,
        config,
        viewport,
    )));
    STATE.with(|st| st.replace(Some(state.clone())));

    view::show_info(&state.borrow(), None);
    attach_ui(state.clone())?;
    view::start_animation(state.clone());

    let req = state.borrow_mut().controller.initial_request();
    dispatch(state, req);
    Ok(())
}
