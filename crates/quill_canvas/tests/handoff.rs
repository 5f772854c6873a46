//! Frame handoff between a recording surface and renderers

use std::sync::mpsc;
use std::thread;

use quill_canvas::{decode_frame, Bounds, Command, CommandBuffer, QueueRenderer, Renderer, Surface};
use quill_core::Color;

/// Forwards every frame to a render thread
struct ChannelRenderer {
    tx: mpsc::Sender<CommandBuffer>,
}

impl Renderer for ChannelRenderer {
    fn update_rendering(&mut self, frame: CommandBuffer) -> bool {
        // a closed channel means the render thread is gone; nothing to report
        let _ = self.tx.send(frame);
        false
    }
}

fn assert_send<T: Send>() {}

#[test]
fn frames_and_surfaces_can_cross_threads() {
    assert_send::<CommandBuffer>();
    assert_send::<Surface>();
    assert_send::<QueueRenderer>();
}

#[test]
fn render_thread_sees_frames_whole_and_in_order() {
    let (tx, rx) = mpsc::channel::<CommandBuffer>();
    let consumer = thread::spawn(move || {
        let mut seen = Vec::new();
        for mut frame in rx {
            let commands = decode_frame(&mut frame).expect("frame should decode");
            let xs: Vec<f32> = commands
                .iter()
                .filter_map(|c| match c {
                    Command::FillRect(Bounds { x, .. }) => Some(*x),
                    _ => None,
                })
                .collect();
            seen.push(xs);
        }
        seen
    });

    let mut surface = Surface::new(640.0, 480.0);
    let mut renderer = ChannelRenderer { tx };
    for frame in 0..10 {
        let mut rec = surface.recorder();
        for i in 0..3 {
            rec.fill_rect((frame * 10 + i) as f64, 0.0, 1.0, 1.0).unwrap();
        }
        surface.pulse(&mut renderer);
        // nothing new recorded, nothing handed off
        surface.pulse(&mut renderer);
    }
    drop(renderer);

    let seen = consumer.join().unwrap();
    assert_eq!(seen.len(), 10);
    for (frame, xs) in seen.iter().enumerate() {
        let base = (frame * 10) as f32;
        assert_eq!(xs, &vec![base, base + 1.0, base + 2.0]);
    }
}

#[test]
fn queue_renderer_merges_frames_while_behind() {
    let mut surface = Surface::new(100.0, 100.0);
    let mut renderer = QueueRenderer::new();

    surface.recorder().stroke_line(0.0, 0.0, 5.0, 5.0).unwrap();
    assert!(!surface.pulse(&mut renderer));
    surface.recorder().set_fill(Color::RED).unwrap();
    assert!(surface.pulse(&mut renderer));
    assert!(surface.is_renderer_falling_behind());

    let commands = renderer.render().unwrap();
    assert_eq!(commands.len(), 2);
    assert!(matches!(commands[0], Command::StrokeLine { .. }));
    assert!(matches!(commands[1], Command::FillPaint(_)));
    assert_eq!(renderer.frames_received(), 2);
    assert_eq!(renderer.frames_coalesced(), 1);
}

#[test]
fn reset_frame_replaces_backlog() {
    let mut surface = Surface::new(100.0, 100.0);
    let mut renderer = QueueRenderer::new();

    surface.recorder().stroke_line(0.0, 0.0, 5.0, 5.0).unwrap();
    surface.pulse(&mut renderer);
    surface.recorder().stroke_line(1.0, 1.0, 5.0, 5.0).unwrap();
    assert!(surface.pulse(&mut renderer));

    // renderer is behind, so a covering fill starts the frame over
    let mut rec = surface.recorder();
    rec.stroke_line(2.0, 2.0, 5.0, 5.0).unwrap();
    rec.fill_rect(0.0, 0.0, 100.0, 100.0).unwrap();
    assert!(surface.pulse(&mut renderer));

    let commands = renderer.render().unwrap();
    assert_eq!(commands[0], Command::Reset);
    assert!(!commands
        .iter()
        .any(|c| matches!(c, Command::StrokeLine { .. })));
    assert!(matches!(commands.last(), Some(Command::FillRect(_))));
    assert!(renderer.render().is_none());
}

#[test]
fn undecodable_frame_is_dropped_without_touching_the_next() {
    let mut renderer = QueueRenderer::new();
    let mut bad = CommandBuffer::new();
    bad.put_byte(200).unwrap();
    renderer.update_rendering(bad);
    assert!(renderer.render().is_none());

    let mut surface = Surface::new(10.0, 10.0);
    surface.recorder().fill_oval(1.0, 1.0, 2.0, 2.0).unwrap();
    surface.pulse(&mut renderer);
    assert_eq!(
        renderer.render().unwrap(),
        vec![Command::FillOval(Bounds {
            x: 1.0,
            y: 1.0,
            w: 2.0,
            h: 2.0
        })]
    );
}
