//! Drawing surface
//!
//! A [`Surface`] owns the frame currently being recorded. Drawing goes
//! through a short-lived [`CommandRecorder`]; at each pulse the finished
//! frame is moved out whole and handed to a [`Renderer`], which may live
//! on another thread.

use crate::buffer::CommandBuffer;
use crate::config::SurfaceConfig;
use crate::error::Result;
use crate::recorder::{CommandRecorder, RecorderState};
use crate::renderer::Renderer;

/// Ring of recent handoff sizes used to pre-size the next buffer
#[derive(Debug)]
struct SizeHistory {
    entries: Vec<(usize, usize)>,
    next: usize,
}

impl SizeHistory {
    fn new(len: usize) -> Self {
        Self {
            entries: vec![(0, 0); len],
            next: 0,
        }
    }

    fn record(&mut self, values: usize, objects: usize) {
        if self.entries.is_empty() {
            return;
        }
        self.entries[self.next] = (values, objects);
        self.next = (self.next + 1) % self.entries.len();
    }

    fn max(&self) -> (usize, usize) {
        self.entries
            .iter()
            .fold((0, 0), |(v, o), &(ev, eo)| (v.max(ev), o.max(eo)))
    }
}

/// Everything the recorder writes into besides its own attribute state
#[derive(Debug)]
pub(crate) struct FrameTarget {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) right_to_left: bool,
    pub(crate) renderer_behind: bool,
    pub(crate) config: SurfaceConfig,
    buffer: Option<CommandBuffer>,
    history: SizeHistory,
}

impl FrameTarget {
    fn new(config: SurfaceConfig, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            right_to_left: false,
            renderer_behind: false,
            buffer: None,
            history: SizeHistory::new(config.size_history),
            config,
        }
    }

    /// The live buffer, allocated on first use
    pub(crate) fn buffer(&mut self) -> Result<&mut CommandBuffer> {
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => {
                let (values, objects) = self.next_capacity();
                CommandBuffer::with_capacity(values, objects)?
            }
        };
        Ok(self.buffer.insert(buffer))
    }

    pub(crate) fn pending(&self) -> Option<&CommandBuffer> {
        self.buffer.as_ref()
    }

    fn next_capacity(&self) -> (usize, usize) {
        let (values, objects) = self.history.max();
        (
            values.max(self.config.initial_value_capacity),
            objects.max(self.config.initial_object_capacity),
        )
    }
}

/// A recorded 2D drawing surface
#[derive(Debug)]
pub struct Surface {
    recording: RecorderState,
    target: FrameTarget,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(SurfaceConfig::default(), width, height)
    }

    /// Create a surface with explicit buffer tuning. Invalid dimensions
    /// start out as zero.
    pub fn with_config(config: SurfaceConfig, width: f64, height: f64) -> Self {
        let valid = |v: f64| if v.is_finite() && v >= 0.0 { v } else { 0.0 };
        Self {
            recording: RecorderState::new(),
            target: FrameTarget::new(config, valid(width), valid(height)),
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.target.config
    }

    pub fn width(&self) -> f64 {
        self.target.width
    }

    pub fn height(&self) -> f64 {
        self.target.height
    }

    /// Change the width; records SET_DIMS when it actually changes.
    /// Negative and non-finite widths are ignored.
    pub fn set_width(&mut self, width: f64) -> Result<()> {
        if !(width.is_finite() && width >= 0.0) || width == self.target.width {
            return Ok(());
        }
        self.target.width = width;
        self.recorder().update_dimensions()
    }

    pub fn set_height(&mut self, height: f64) -> Result<()> {
        if !(height.is_finite() && height >= 0.0) || height == self.target.height {
            return Ok(());
        }
        self.target.height = height;
        self.recorder().update_dimensions()
    }

    pub fn is_right_to_left(&self) -> bool {
        self.target.right_to_left
    }

    /// Text direction recorded with every subsequent text operation
    pub fn set_right_to_left(&mut self, rtl: bool) {
        self.target.right_to_left = rtl;
    }

    /// Start recording into the current frame
    pub fn recorder(&mut self) -> CommandRecorder<'_> {
        CommandRecorder::new(&mut self.recording, &mut self.target)
    }

    /// The frame recorded so far, if anything allocated it
    pub fn pending_buffer(&self) -> Option<&CommandBuffer> {
        self.target.pending()
    }

    /// Capacities the next fresh buffer will be created with
    pub fn next_buffer_capacity(&self) -> (usize, usize) {
        self.target.next_capacity()
    }

    /// Move the recorded frame out of the surface.
    ///
    /// Returns `None` when nothing has been recorded since the last
    /// handoff. The next drawing call starts a fresh buffer.
    pub fn take_buffer(&mut self) -> Option<CommandBuffer> {
        let buffer = self.target.buffer.take()?;
        if buffer.is_empty() {
            self.target.buffer = Some(buffer);
            return None;
        }
        let (values, objects) = (
            buffer.write_value_position(),
            buffer.write_object_position(),
        );
        self.target.history.record(values, objects);
        tracing::debug!(values, objects, "handing off frame");
        Some(buffer)
    }

    /// Hand the recorded frame, if any, to `renderer` and remember whether
    /// it reported falling behind
    pub fn pulse<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> bool {
        if let Some(frame) = self.take_buffer() {
            let behind = renderer.update_rendering(frame);
            if behind != self.target.renderer_behind {
                tracing::debug!(behind, "renderer backlog changed");
            }
            self.target.renderer_behind = behind;
        }
        self.target.renderer_behind
    }

    pub fn is_renderer_falling_behind(&self) -> bool {
        self.target.renderer_behind
    }

    pub fn set_renderer_falling_behind(&mut self, behind: bool) {
        self.target.renderer_behind = behind;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Opcode;

    #[test]
    fn test_no_buffer_until_first_write() {
        let mut surface = Surface::new(100.0, 50.0);
        assert!(surface.pending_buffer().is_none());
        assert!(surface.take_buffer().is_none());

        surface.recorder().set_global_alpha(0.5).unwrap();
        assert!(surface.pending_buffer().is_some());
        assert!(surface.take_buffer().is_some());
        assert!(surface.pending_buffer().is_none());
    }

    #[test]
    fn test_set_width_records_dimensions() {
        let mut surface = Surface::new(100.0, 50.0);
        surface.set_width(100.0).unwrap();
        assert!(surface.pending_buffer().is_none());

        surface.set_width(-1.0).unwrap();
        surface.set_width(f64::NAN).unwrap();
        assert_eq!(surface.width(), 100.0);
        assert!(surface.pending_buffer().is_none());

        surface.set_width(120.0).unwrap();
        let mut buf = surface.take_buffer().unwrap();
        assert_eq!(buf.get_byte().unwrap(), Opcode::SetDims as u8);
        assert_eq!(buf.get_float().unwrap(), 120.0);
        assert_eq!(buf.get_float().unwrap(), 50.0);
    }

    #[test]
    fn test_size_history_sizes_next_buffer() {
        let config = SurfaceConfig::default().with_initial_capacity(16, 2);
        let mut surface = Surface::with_config(config, 10.0, 10.0);
        assert_eq!(surface.next_buffer_capacity(), (16, 2));

        {
            let mut rec = surface.recorder();
            for i in 0..20 {
                rec.set_line_width(i as f64 + 2.0).unwrap();
            }
        }
        let frame = surface.take_buffer().unwrap();
        assert_eq!(frame.write_value_position(), 100);
        assert_eq!(surface.next_buffer_capacity(), (100, 2));
    }

    #[test]
    fn test_size_history_forgets_old_frames() {
        let config = SurfaceConfig::default()
            .with_initial_capacity(1, 1)
            .with_size_history(2);
        let mut surface = Surface::with_config(config, 10.0, 10.0);
        {
            let mut rec = surface.recorder();
            for i in 0..20 {
                rec.set_miter_limit(i as f64 + 11.0).unwrap();
            }
        }
        surface.take_buffer().unwrap();
        assert_eq!(surface.next_buffer_capacity().0, 100);

        for _ in 0..2 {
            surface.recorder().stroke_line(0.0, 0.0, 1.0, 1.0).unwrap();
            surface.take_buffer().unwrap();
        }
        // opcode plus four floats
        assert_eq!(surface.next_buffer_capacity().0, 17);
    }

    struct Behind;

    impl Renderer for Behind {
        fn update_rendering(&mut self, _frame: CommandBuffer) -> bool {
            true
        }
    }

    #[test]
    fn test_pulse_tracks_backlog() {
        let mut surface = Surface::new(10.0, 10.0);
        assert!(!surface.pulse(&mut Behind));
        surface.recorder().fill_rect(1.0, 1.0, 2.0, 2.0).unwrap();
        assert!(surface.pulse(&mut Behind));
        assert!(surface.is_renderer_falling_behind());
    }
}
