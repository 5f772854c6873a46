//! Record a few frames and replay them on a render thread
//!
//! Run with:
//! `RUST_LOG=quill_canvas=debug cargo run -p quill_canvas --example record_frame`

use std::sync::mpsc;
use std::thread;

use quill_canvas::{decode_frame, Command, CommandBuffer, Renderer, Result, Surface};
use quill_core::{ArcClosure, Color, Font, Paint, Point, TextAlign};
use tracing_subscriber::EnvFilter;

struct ThreadRenderer {
    tx: mpsc::SyncSender<CommandBuffer>,
}

impl Renderer for ThreadRenderer {
    fn update_rendering(&mut self, frame: CommandBuffer) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => false,
            Err(mpsc::TrySendError::Full(frame)) => {
                // block this once and report the backlog
                let _ = self.tx.send(frame);
                true
            }
            Err(mpsc::TrySendError::Disconnected(_)) => false,
        }
    }
}

fn draw_frame(surface: &mut Surface, frame: u32) -> Result<()> {
    let (w, h) = (surface.width(), surface.height());
    let mut rec = surface.recorder();

    rec.set_fill(Color::from_hex(0x1e1e2e))?;
    rec.fill_rect(0.0, 0.0, w, h)?;

    rec.save();
    rec.translate(w / 2.0, h / 2.0);
    rec.rotate(frame as f64 * 15.0);
    rec.set_fill(Paint::linear(
        Point::new(-40.0, 0.0),
        Point::new(40.0, 0.0),
        Color::RED,
        Color::BLUE,
    ))?;
    rec.fill_round_rect(-40.0, -20.0, 80.0, 40.0, 8.0, 8.0)?;
    rec.restore()?;

    rec.begin_path();
    rec.move_to(20.0, h - 20.0)?;
    rec.arc_to(w - 20.0, h - 20.0, w - 20.0, 20.0, 12.0)?;
    rec.append_svg_path("l 0 -40 h -30 z")?;
    rec.set_stroke(Color::WHITE)?;
    rec.set_line_width(2.0)?;
    rec.set_line_dashes(Some(&[6.0, 3.0]))?;
    rec.stroke()?;

    rec.set_font(Font::new("Sans", 18.0))?;
    rec.set_text_align(TextAlign::Center)?;
    rec.fill_text(&format!("frame {frame}"), w / 2.0, 30.0)?;
    rec.stroke_arc(10.0, 10.0, 30.0, 30.0, 0.0, 270.0, ArcClosure::Round)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (tx, rx) = mpsc::sync_channel::<CommandBuffer>(1);
    let render_thread = thread::spawn(move || {
        for mut frame in rx {
            match decode_frame(&mut frame) {
                Ok(commands) => {
                    let draws = commands
                        .iter()
                        .filter(|c| {
                            matches!(
                                c,
                                Command::FillRect(_)
                                    | Command::FillRoundRect { .. }
                                    | Command::StrokePath
                                    | Command::FillText(_)
                                    | Command::StrokeArc { .. }
                            )
                        })
                        .count();
                    tracing::info!(
                        bytes = frame.write_value_position(),
                        commands = commands.len(),
                        draws,
                        "replayed frame"
                    );
                }
                Err(err) => tracing::warn!(error = %err, "bad frame"),
            }
        }
    });

    let mut surface = Surface::new(320.0, 240.0);
    let mut renderer = ThreadRenderer { tx };
    for frame in 0..8 {
        draw_frame(&mut surface, frame)?;
        let behind = surface.pulse(&mut renderer);
        tracing::debug!(frame, behind, "pulse");
    }
    drop(renderer);

    if render_thread.join().is_err() {
        tracing::error!("render thread panicked");
    }
    Ok(())
}
