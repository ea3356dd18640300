use zg_core::{EventSink, InputEvent, Modifiers};

/// Feeds keyboard and mouse input into the host event queue.
///
/// Mouse buttons: 0 = left, 1 = middle, 2 = right. Each method returns
/// `false` once the bridge has been torn down.
#[derive(Debug, Clone)]
pub struct InputSource {
    events: EventSink,
}

impl InputSource {
    pub fn new(events: EventSink) -> Self {
        Self { events }
    }

    pub fn mouse_down(&self, x: i32, y: i32, button: i32) -> bool {
        self.events.input(InputEvent::MouseDown { x, y, button })
    }

    pub fn mouse_up(&self, x: i32, y: i32, button: i32) -> bool {
        self.events.input(InputEvent::MouseUp { x, y, button })
    }

    pub fn mouse_motion(&self, x: i32, y: i32) -> bool {
        self.events.input(InputEvent::MouseMotion { x, y })
    }

    /// `scancode` is the host's raw key code; mapping it to the guest's key
    /// set is the guest's business.
    pub fn key_down(&self, scancode: u32, modifiers: Modifiers) -> bool {
        self.events.input(InputEvent::KeyDown {
            scancode,
            modifiers,
        })
    }

    pub fn key_up(&self, scancode: u32, modifiers: Modifiers) -> bool {
        self.events.input(InputEvent::KeyUp {
            scancode,
            modifiers,
        })
    }

    pub fn text_input(&self, codepoint: char, modifiers: Modifiers) -> bool {
        self.events.input(InputEvent::TextInput {
            codepoint,
            modifiers,
        })
    }
}
