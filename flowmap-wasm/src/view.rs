use std::cell::RefCell;
use std::rc::Rc;

use flowmap_core::StyleChange;
use flowmap_core::zoom::wheel_factor;
use flowmap_svg::VIEWPORT_GROUP_ID;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MouseEvent, WheelEvent};

use crate::constants::{CONTAINER_ID, INFO_TEXT_ID, TABLE_BODY_SELECTOR};
use crate::state::App;
use crate::utils::{closest, edge_index, html_element, moved_within, now_ms, set_style};

fn apply_changes(app: &App, changes: &[StyleChange]) {
    for c in changes {
        match app.document.get_element_by_id(&c.element_id) {
            Some(el) => {
                if let Err(e) = el.set_attribute(c.attribute, &c.value) {
                    warn!(?e, id = %c.element_id, "could not restyle element");
                }
            }
            None => debug!(id = %c.element_id, "restyle target missing"),
        }
    }
}

pub fn show_info(app: &App, text: Option<&str>) {
    let Some(el) = html_element(&app.document, INFO_TEXT_ID) else {
        return;
    };
    match text {
        Some(t) => {
            el.set_text_content(Some(t));
            set_style(&el, "font-style", "normal");
        }
        None => {
            el.set_text_content(Some(&app.config.idle_info_text));
            set_style(&el, "font-style", "italic");
        }
    }
}

pub fn hover_edge(app: &mut App, edge: usize) {
    let Some(cycle) = app.cycle.as_mut() else {
        return;
    };
    let changes = cycle.scene.highlight(edge);
    let info = cycle.scene.edge_shape(edge).map(|e| e.info.clone());
    apply_changes(app, &changes);
    if let Some(info) = info {
        show_info(app, Some(&info));
    }
}

pub fn leave_edge(app: &mut App, edge: usize) {
    let Some(cycle) = app.cycle.as_mut() else {
        return;
    };
    let changes = cycle.scene.restore(edge);
    apply_changes(app, &changes);
    show_info(app, None);
}

pub fn apply_transform(app: &App) {
    if let Some(g) = app.document.get_element_by_id(VIEWPORT_GROUP_ID) {
        let _ = g.set_attribute("transform", &app.zoom.transform.to_string());
    }
}

/// Hover handlers on the diagram and on the table body. Both delegate on
/// `data-edge`, so they survive the containers being refilled each cycle.
pub fn attach_hover(state: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();
    let targets = [
        doc.get_element_by_id(CONTAINER_ID),
        doc.query_selector(TABLE_BODY_SELECTOR)?,
    ];
    for target in targets.into_iter().flatten() {
        let st = state.clone();
        let over = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let Some(el) = closest(e.target(), "[data-edge]") else {
                return;
            };
            if moved_within(&el, e.related_target()) {
                return;
            }
            if let Some(idx) = edge_index(&el) {
                hover_edge(&mut st.borrow_mut(), idx);
            }
        }));
        target.add_event_listener_with_callback("mouseover", over.as_ref().unchecked_ref())?;
        over.forget();

        let st = state.clone();
        let out = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let Some(el) = closest(e.target(), "[data-edge]") else {
                return;
            };
            if moved_within(&el, e.related_target()) {
                return;
            }
            if let Some(idx) = edge_index(&el) {
                leave_edge(&mut st.borrow_mut(), idx);
            }
        }));
        target.add_event_listener_with_callback("mouseout", out.as_ref().unchecked_ref())?;
        out.forget();
    }
    Ok(())
}

/// Wheel zoom around the pointer and drag to pan.
pub fn attach_zoom(state: Rc<RefCell<App>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();
    let Some(container) = html_element(&doc, CONTAINER_ID) else {
        warn!("diagram container missing, zoom disabled");
        return Ok(());
    };

    let st = state.clone();
    let cont = container.clone();
    let wheel = Closure::<dyn FnMut(WheelEvent)>::wrap(Box::new(move |e: WheelEvent| {
        e.prevent_default();
        let rect = cont.get_bounding_client_rect();
        let anchor = (
            e.client_x() as f64 - rect.left(),
            e.client_y() as f64 - rect.top(),
        );
        let mut s = st.borrow_mut();
        s.transition = None;
        let anchor = s.zoom.to_user(anchor);
        s.zoom.scale_at(wheel_factor(e.delta_y(), e.delta_mode()), anchor);
        apply_transform(&s);
    }));
    container.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
    wheel.forget();

    let st = state.clone();
    let mousedown = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
        let mut s = st.borrow_mut();
        s.transition = None;
        s.drag = Some((e.client_x() as f64, e.client_y() as f64));
    }));
    container.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
    mousedown.forget();

    let st = state.clone();
    let mousemove = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
        let mut s = st.borrow_mut();
        if let Some((x0, y0)) = s.drag {
            let (x, y) = (e.client_x() as f64, e.client_y() as f64);
            let (dx, dy) = s.zoom.to_user_delta((x - x0, y - y0));
            s.zoom.pan_by(dx, dy);
            s.drag = Some((x, y));
            apply_transform(&s);
        }
    }));
    doc.add_event_listener_with_callback("mousemove", mousemove.as_ref().unchecked_ref())?;
    mousemove.forget();

    let st = state.clone();
    let mouseup = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |_e: MouseEvent| {
        st.borrow_mut().drag = None;
    }));
    doc.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
    mouseup.forget();
    Ok(())
}

/// Advances the eased reset transition once per frame.
pub fn start_animation(state: Rc<RefCell<App>>) {
    type RafClosure = Closure<dyn FnMut(f64)>;
    let f: Rc<RefCell<Option<RafClosure>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    let window = state.borrow().window.clone();
    let win = window.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
        {
            let mut s = state.borrow_mut();
            if let Some(tr) = s.transition {
                let (t, done) = tr.sample(now_ms(&s.window));
                s.zoom.transform = t;
                if done {
                    s.transition = None;
                }
                apply_transform(&s);
            }
        }
        if let Some(cb) = f.borrow().as_ref() {
            let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(cb) = g.borrow().as_ref() {
        let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}
