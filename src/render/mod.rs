//! Render buffer model and builder (C8): the flat, GPU-friendly draw-list
//! types that cross the core/display boundary (§6), and the grid-traversal
//! pass that produces them (§4.7).

pub mod buffer;
pub mod builder;

pub use buffer::{
    RenderAttributes, RenderBuffer, RenderCell, RenderCursor, RenderLine, TextAttrs,
};
pub use builder::RenderBufferBuilder;
