//! Stockpile measurement engine.
//!
//! The operator loads a photograph of a stockpile, marks a triangle over its
//! silhouette, and gets an estimate of the pile's volume and mass by treating
//! it as a cone. This crate is compiled to WebAssembly for the browser and as
//! a regular library for the `stockpile` CLI. It owns pan/zoom, vertex
//! placement and dragging, the cone estimate, and drawing the overlay. The
//! host layer only wires DOM events to the engine and reacts to the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine, testable [`engine::EngineCore`] and replayable commands |
//! | [`viewport`] | Source/view coordinate types and the pan/zoom mapping |
//! | [`triangle`] | Triangle editing and the cone estimate |
//! | [`geometry`] | Distance, area and height helpers |
//! | [`calibration`] | Pixel size and volume/density coefficients |
//! | [`input`] | Buttons, cursors and the drag state machine |
//! | [`hit`] | Hit-testing vertices in view space |
//! | [`render`] | Scene building and `Canvas2D` drawing |
//! | [`consts`] | Shared numeric constants (zoom limits, radii, calibration defaults) |

pub mod calibration;
pub mod consts;
pub mod engine;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod render;
pub mod triangle;
pub mod viewport;
