//! Canvas input engine and renderer for shared drawing rooms.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! client half of room synchronization: translating raw pointer input into
//! shape mutations, merging remote operations into the local shape list,
//! snapshot undo/redo, and camera state for pan/zoom. The host layer owns the
//! socket; it forwards every [`engine::Action::Send`] to the server and feeds
//! inbound envelopes back through [`engine::EngineCore::apply_remote`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Ordered, id-keyed shape store and remote merge |
//! | [`history`] | Snapshot undo/redo stacks |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Tools, input event types and the gesture state machine |
//! | [`hit`] | Hit-testing against shapes |
//! | [`render`] | Scene rendering onto a 2D context |
//! | [`consts`] | Shared numeric constants (zoom limits, hit slop, etc.) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod history;
pub mod hit;
pub mod input;
pub mod render;
