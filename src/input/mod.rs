//! Host-to-terminal input encoding (C6).

pub mod generator;
pub mod key;
pub mod mouse;

pub use generator::InputGenerator;
pub use key::{Key, KeyMode, KeyboardEventType, Modifiers};
pub use mouse::{MouseButton, MouseEventType, MouseProtocol, MouseTransport, MouseWheelMode, PixelCoordinate};
