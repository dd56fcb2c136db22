use crate::dom;
use crate::input;
use crate::keymap::{self, KeyAction};
use crate::WebScene;
use glam::Vec2;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys as web;

pub fn apply_key_action(scene: &mut WebScene, action: KeyAction) {
    match action {
        KeyAction::ToggleMute => {
            let muted = scene.toggle_mute();
            log::info!("[keys] muted={}", muted);
        }
        KeyAction::Reset => scene.reset(),
        KeyAction::MorePopulation | KeyAction::FewerPopulation => {
            if let Some(n) = keymap::next_population(scene.population_count(), action) {
                let applied = scene.set_population_count(n);
                log::info!("[keys] population={}", applied);
            }
        }
        KeyAction::FreezePress => {
            scene.ensure_audio_started();
            scene.freeze_press();
        }
        KeyAction::FreezeRelease => scene.freeze_release(),
        KeyAction::ClearFreeze => scene.clear_freeze_buffer(),
    }
}

pub fn wire_keyboard(window: &web::Window, scene: Rc<RefCell<WebScene>>) {
    let scene_down = scene.clone();
    dom::add_listener(window, "keydown", move |ev: web::KeyboardEvent| {
        if let Some(action) = keymap::action_for_key_down(&ev.key(), ev.repeat()) {
            apply_key_action(&mut scene_down.borrow_mut(), action);
            ev.prevent_default();
        }
    });
    dom::add_listener(window, "keyup", move |ev: web::KeyboardEvent| {
        if let Some(action) = keymap::action_for_key_up(&ev.key()) {
            apply_key_action(&mut scene.borrow_mut(), action);
        }
    });
}

pub fn wire_pointer(canvas: &web::HtmlCanvasElement, scene: Rc<RefCell<WebScene>>) {
    let last_pos: Rc<RefCell<Option<Vec2>>> = Rc::new(RefCell::new(None));

    {
        let scene = scene.clone();
        let canvas_m = canvas.clone();
        let last_pos = last_pos.clone();
        dom::add_listener(canvas, "pointermove", move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_css(&ev, &canvas_m);
            let movement =
                input::movement_or_delta(input::pointer_movement(&ev), pos, *last_pos.borrow());
            *last_pos.borrow_mut() = Some(pos);
            scene.borrow_mut().pointer_move(pos.x, pos.y, movement);
        });
    }

    {
        let scene = scene.clone();
        let canvas_d = canvas.clone();
        dom::add_listener(canvas, "pointerdown", move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_css(&ev, &canvas_d);
            let _ = canvas_d.set_pointer_capture(ev.pointer_id());
            scene.borrow_mut().pointer_down(ev.button(), pos.x, pos.y);
            ev.prevent_default();
        });
    }

    for event in ["pointerup", "pointercancel"] {
        let scene = scene.clone();
        let canvas_u = canvas.clone();
        dom::add_listener(canvas, event, move |ev: web::PointerEvent| {
            let pos = input::pointer_canvas_css(&ev, &canvas_u);
            let _ = canvas_u.release_pointer_capture(ev.pointer_id());
            scene.borrow_mut().pointer_up(pos.x, pos.y);
        });
    }

    dom::add_listener(canvas, "pointerleave", move |_ev: web::PointerEvent| {
        *last_pos.borrow_mut() = None;
    });
}

pub fn wire_resize(window: &web::Window, canvas: &web::HtmlCanvasElement, scene: Rc<RefCell<WebScene>>) {
    let canvas = canvas.clone();
    dom::add_listener(window, "resize", move |_ev: web::Event| {
        let size = dom::sync_canvas_backing_size(&canvas);
        scene.borrow_mut().resize(size.css_width, size.css_height);
    });
}

pub fn wire_teardown(window: &web::Window, scene: Rc<RefCell<WebScene>>) {
    dom::add_listener(window, "pagehide", move |_ev: web::Event| {
        scene.borrow_mut().dispose();
    });
}
