use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Element, Event, EventTarget, HtmlElement, Window};

use crate::config::EngineConfig;
use crate::driver::{AnimationDriver, TaskHandle};
use crate::effects::mount_page;
use crate::layout::{Layout, Rect, TargetId, Viewport};
use crate::style::{Style, StyleSink};

/// Elements resolved per selector, shared by the layout and the sink so both
/// agree on what `TargetId { selector, index }` refers to.
type ElementCache = Rc<RefCell<HashMap<String, Vec<Element>>>>;

fn lookup(cache: &ElementCache, target: &TargetId) -> Option<Element> {
    cache
        .borrow()
        .get(&target.selector)
        .and_then(|list| list.get(target.index))
        .cloned()
}

enum ScrollSource {
    Window,
    Container(Element),
}

struct DomLayout {
    window: Window,
    document: Document,
    source: ScrollSource,
    elements: ElementCache,
}

impl DomLayout {
    fn scroll_offset(&self) -> f32 {
        match &self.source {
            ScrollSource::Window => self.window.scroll_y().unwrap_or(0.0) as f32,
            ScrollSource::Container(element) => element.scroll_top() as f32,
        }
    }

    fn scroll_target(&self) -> EventTarget {
        match &self.source {
            ScrollSource::Window => self.window.clone().into(),
            ScrollSource::Container(element) => element.clone().into(),
        }
    }

    fn can_hover(&self) -> bool {
        self.window
            .match_media("(hover: hover)")
            .ok()
            .flatten()
            .map(|query| query.matches())
            .unwrap_or(false)
    }
}

impl Layout for DomLayout {
    fn query(&self, selector: &str) -> Vec<TargetId> {
        let nodes = match self.document.query_selector_all(selector) {
            Ok(nodes) => nodes,
            Err(e) => {
                log::warn!("Invalid selector '{}': {:?}", selector, e);
                return Vec::new();
            }
        };
        let found: Vec<Element> = (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect();
        let targets = (0..found.len()).map(|i| TargetId::new(selector, i)).collect();
        self.elements.borrow_mut().insert(selector.to_string(), found);
        targets
    }

    fn rect(&self, target: &TargetId) -> Option<Rect> {
        lookup(&self.elements, target).map(|element| {
            let r = element.get_bounding_client_rect();
            Rect::new(r.top() as f32, r.left() as f32, r.width() as f32, r.height() as f32)
        })
    }

    fn content_width(&self, target: &TargetId) -> Option<f32> {
        lookup(&self.elements, target).map(|element| element.scroll_width() as f32)
    }

    fn content_height(&self, target: &TargetId) -> Option<f32> {
        lookup(&self.elements, target).map(|element| element.scroll_height() as f32)
    }

    fn viewport(&self) -> Viewport {
        let dimension = |value: Result<JsValue, JsValue>| {
            value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
        };
        Viewport {
            width: dimension(self.window.inner_width()),
            height: dimension(self.window.inner_height()),
            can_hover: self.can_hover(),
        }
    }

    fn content_loaded(&self) -> bool {
        self.document.ready_state() == "complete"
    }
}

struct DomSink {
    elements: ElementCache,
}

impl StyleSink for DomSink {
    fn apply(&mut self, target: &TargetId, style: &Style) {
        let Some(element) = lookup(&self.elements, target) else {
            return;
        };
        let Some(html) = element.dyn_ref::<HtmlElement>() else {
            return;
        };
        let css = html.style();
        if let Err(e) = css.set_property("transform", &style.transform_css()) {
            log::trace!("Failed to set transform on {}: {:?}", target, e);
        }
        if let Some(opacity) = style.opacity_css() {
            if let Err(e) = css.set_property("opacity", &opacity) {
                log::trace!("Failed to set opacity on {}: {:?}", target, e);
            }
        }
    }

    fn add_class(&mut self, target: &TargetId, class_name: &str) {
        if let Some(element) = lookup(&self.elements, target) {
            if let Err(e) = element.class_list().add_1(class_name) {
                log::warn!("Failed to add class '{}' to {}: {:?}", class_name, target, e);
            }
        }
    }
}

struct PageContext {
    driver: AnimationDriver,
    layout: DomLayout,
    sink: DomSink,
    handles: Vec<TaskHandle>,
    frame_id: Option<i32>,
    running: bool,
}

struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Running scroll effects on the current page. Call `cancel` on teardown.
#[wasm_bindgen]
pub struct ScrollEffects {
    inner: Rc<RefCell<PageContext>>,
    frame_loop: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Check a configuration document. Returns the error message, or None if it
/// is valid.
#[wasm_bindgen]
pub fn validate_config(config_json: &str) -> Option<String> {
    EngineConfig::from_json(config_json).err().map(|e| e.to_string())
}

#[wasm_bindgen]
impl ScrollEffects {
    pub fn is_running(&self) -> bool {
        self.inner.borrow().running
    }

    pub fn effect_count(&self) -> usize {
        self.inner.borrow().driver.task_count()
    }

    /// Names of the running effects as a JSON array.
    pub fn effect_names_json(&self) -> String {
        let inner = self.inner.borrow();
        let names: Vec<&str> = inner
            .handles
            .iter()
            .filter(|h| !h.is_cancelled())
            .map(|h| h.name())
            .collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    /// Stop the frame loop, detach every listener and drop all effects.
    pub fn cancel(&mut self) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.running {
                return;
            }
            inner.running = false;
            if let Some(id) = inner.frame_id.take() {
                if let Err(e) = inner.layout.window.cancel_animation_frame(id) {
                    log::warn!("Failed to cancel animation frame: {:?}", e);
                }
            }
            inner.driver.cancel_all();
        }
        for listener in self.listeners.drain(..) {
            if let Err(e) = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.callback.as_ref().unchecked_ref(),
            ) {
                log::warn!("Failed to remove '{}' listener: {:?}", listener.event, e);
            }
        }
        self.frame_loop.borrow_mut().take();
        log::info!("Scroll effects cancelled");
    }
}

/// Freeing the handle from JS without `cancel` must not leave listeners
/// pointing at dropped closures or a frame loop keeping itself alive.
impl Drop for ScrollEffects {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn listen(
    target: EventTarget,
    event: &'static str,
    ctx: &Rc<RefCell<PageContext>>,
    handler: fn(&mut PageContext),
) -> Result<Listener, JsValue> {
    let ctx = ctx.clone();
    let callback = Closure::wrap(Box::new(move |_event: Event| {
        let mut page = ctx.borrow_mut();
        if page.running {
            handler(&mut *page);
        }
    }) as Box<dyn FnMut(Event)>);

    let options = AddEventListenerOptions::new();
    options.set_passive(true);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.as_ref().unchecked_ref(),
        &options,
    )?;
    Ok(Listener {
        target,
        event,
        callback,
    })
}

/// Mount every configured effect on the current document and start the
/// frame loop.
#[wasm_bindgen]
pub fn create_scroll_effects(config_json: &str) -> Result<ScrollEffects, JsValue> {
    let config = if config_json.trim().is_empty() {
        EngineConfig::default()
    } else {
        EngineConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
    };

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;

    let source = match document.query_selector(&config.scroll_container_selector)? {
        Some(container) => ScrollSource::Container(container),
        None => {
            log::info!(
                "No scroll container '{}'; following the window",
                config.scroll_container_selector
            );
            ScrollSource::Window
        }
    };

    let elements: ElementCache = Rc::new(RefCell::new(HashMap::new()));
    let layout = DomLayout {
        window: window.clone(),
        document,
        source,
        elements: elements.clone(),
    };
    let mut sink = DomSink { elements };
    let mut driver = AnimationDriver::new(layout.scroll_offset());
    let handles = mount_page(&config, &mut driver, &layout, &mut sink)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let scroll_target = layout.scroll_target();
    let inner = Rc::new(RefCell::new(PageContext {
        driver,
        layout,
        sink,
        handles,
        frame_id: None,
        running: true,
    }));

    let listeners = vec![
        listen(scroll_target, "scroll", &inner, |page| {
            let offset = page.layout.scroll_offset();
            page.driver.scroll_to(offset, &page.layout, &mut page.sink);
        })?,
        listen(window.clone().into(), "resize", &inner, |page| {
            page.driver.resize(&page.layout, &mut page.sink);
        })?,
        listen(window.clone().into(), "load", &inner, |page| {
            page.driver.content_loaded(&page.layout, &mut page.sink);
        })?,
    ];

    // The callback re-registers itself each frame, so it has to be able to
    // reach its own closure.
    let frame_loop: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let self_ref = frame_loop.clone();
    let ctx = inner.clone();
    *frame_loop.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
        let mut guard = ctx.borrow_mut();
        let page = &mut *guard;
        if !page.running {
            return;
        }
        page.driver.frame(timestamp, &page.layout, &mut page.sink);
        if let Some(callback) = self_ref.borrow().as_ref() {
            page.frame_id = page
                .layout
                .window
                .request_animation_frame(callback.as_ref().unchecked_ref())
                .ok();
        }
    }) as Box<dyn FnMut(f64)>));

    let first_frame = match frame_loop.borrow().as_ref() {
        Some(callback) => window.request_animation_frame(callback.as_ref().unchecked_ref())?,
        None => return Err(JsValue::from_str("Frame loop not initialised")),
    };
    inner.borrow_mut().frame_id = Some(first_frame);

    log::info!("Scroll effects started");
    Ok(ScrollEffects {
        inner,
        frame_loop,
        listeners,
    })
}
