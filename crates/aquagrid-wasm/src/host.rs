//! Browser frame scheduling and event-listener ownership.
use std::cell::RefCell;
use std::rc::Rc;

use aquagrid_core::schedule::FrameHost;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Event, EventTarget, Window};

type FrameCallback = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` host. The callback is installed after the viewer
/// that owns this host exists, since the callback needs to reach it.
pub struct AnimationFrameHost {
    window: Window,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

impl AnimationFrameHost {
    pub fn new(window: Window) -> Self {
        Self { window, callback: Rc::new(RefCell::new(None)) }
    }

    /// Shared slot for the frame callback.
    pub fn callback_slot(&self) -> Rc<RefCell<Option<FrameCallback>>> {
        Rc::clone(&self.callback)
    }
}

impl FrameHost for AnimationFrameHost {
    /// `None` when the browser refused the request.
    type Handle = Option<i32>;

    fn request_frame(&mut self) -> Option<i32> {
        let slot = self.callback.borrow();
        let Some(cb) = slot.as_ref() else {
            log::warn!("frame requested before the callback was installed");
            return None;
        };
        match self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("requestAnimationFrame failed: {e:?}");
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: Option<i32>) {
        if let Some(id) = handle {
            let _ = self.window.cancel_animation_frame(id);
        }
    }
}

/// One registered listener; dropping it removes the listener.
pub struct ListenerGuard {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl ListenerGuard {
    pub fn attach(
        target: &EventTarget,
        kind: &'static str,
        passive: bool,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        let opts = AddEventListenerOptions::new();
        opts.set_passive(passive);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            kind,
            callback.as_ref().unchecked_ref(),
            &opts,
        )?;
        Ok(Self { target: target.clone(), kind, callback })
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}
