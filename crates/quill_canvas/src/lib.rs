//! Quill Canvas
//!
//! An immediate-mode 2D drawing surface that records its calls into a
//! compact command buffer for a separate renderer to replay.
//!
//! # Features
//!
//! - Canvas-style drawing API with a save/restore attribute stack
//! - Paths kept in device space with arcs and SVG path data
//! - Change-only attribute encoding
//! - Frame reset when an opaque fill covers the whole surface
//! - Whole-frame handoff to a renderer on another thread
//!
//! # Example
//!
//! ```
//! use quill_canvas::{QueueRenderer, Surface};
//! use quill_core::Color;
//!
//! let mut surface = Surface::new(200.0, 100.0);
//! let mut rec = surface.recorder();
//! rec.set_fill(Color::RED).unwrap();
//! rec.fill_rect(10.0, 10.0, 50.0, 30.0).unwrap();
//!
//! let mut renderer = QueueRenderer::new();
//! surface.pulse(&mut renderer);
//! assert_eq!(renderer.render().map(|cmds| cmds.len()), Some(2));
//! ```

pub mod arc;
pub mod buffer;
pub mod config;
pub mod error;
pub mod opcode;
pub mod path;
pub mod pixels;
pub mod recorder;
pub mod renderer;
pub mod state;
pub mod surface;
pub mod svg;

pub use buffer::{BufferObject, CommandBuffer};
pub use config::SurfaceConfig;
pub use error::{CanvasError, ConfigError, ReplayError, Result, SvgPathError};
pub use opcode::Opcode;
pub use path::{PathData, PathSegment};
pub use pixels::{PixelFormat, PixelWriter};
pub use recorder::CommandRecorder;
pub use renderer::{decode_frame, Bounds, Command, QueueRenderer, Renderer, TextRun};
pub use state::AttributeState;
pub use surface::Surface;
