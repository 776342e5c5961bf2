//! The demo scene and its event loop.

use devdraw_core::{
    Affine, Buffer, Button, Direction, DrawError, Drawer, Event, Op, Point, Rect, Screen,
    Texture, Uploader, Window,
};
use tracing::{debug, error, info};

use crate::config::SceneConfig;

/// A square premultiplied gradient: red across, green down, fading
/// alpha toward the bottom-right corner.
pub fn gradient(edge: i32) -> Buffer {
    let edge = edge.max(1);
    let mut buf = Buffer::new(Point::new(edge, edge));
    let scale = |v: i32| (v * 255 / edge.max(2).saturating_sub(1)).clamp(0, 255) as u32;
    for y in 0..edge {
        for x in 0..edge {
            let a = 255 - (scale(x) + scale(y)) / 4;
            let premul = |c: u32| (c * a / 255) as u8;
            buf.set_pixel(
                Point::new(x, y),
                [premul(scale(x)), premul(scale(y)), premul(0x80), a as u8],
            );
        }
    }
    buf
}

/// Draw one frame and publish it.
pub fn paint(window: &Window, texture: &Texture, cfg: &SceneConfig) -> Result<(), DrawError> {
    let bounds = window.bounds();
    window.fill(bounds, cfg.background, Op::Src)?;

    let sr = texture.bounds();
    window.copy(Point::new(16, 16), texture, sr, Op::Over)?;

    let centre = Point::new(bounds.dx() / 2, bounds.dy() / 2);
    let place = Affine::translation(
        (centre.x - sr.dx() / 2) as f64,
        (centre.y - sr.dy() / 2) as f64,
    );
    let spin = Affine::rotation_about(
        cfg.rotation_degrees.to_radians(),
        centre.x as f64,
        centre.y as f64,
    );
    window.draw(compose(&spin, &place), texture, sr, Op::Over)?;

    let band = Rect::new(0, 0, bounds.dx(), (bounds.dy() / 8).max(1));
    let tilt = Affine::rotation_about(-0.1, 0.0, 0.0);
    let offset = Affine::translation(0.0, (bounds.dy() - band.dy() * 2) as f64);
    window.draw_uniform(compose(&offset, &tilt), cfg.overlay, band, Op::Over)?;

    window.publish()
}

/// `outer` applied after `inner`.
fn compose(outer: &Affine, inner: &Affine) -> Affine {
    let [a, b, c, d, e, f] = outer.0;
    let [g, h, i, j, k, l] = inner.0;
    Affine([
        a * g + b * j,
        a * h + b * k,
        a * i + b * l + c,
        d * g + e * j,
        d * h + e * k,
        d * i + e * l + f,
    ])
}

fn wants_exit(event: &Event) -> bool {
    match event {
        Event::Key(k) => k.rune == 'q' && k.direction == Direction::None,
        Event::Mouse(m) => m.button == Button::Right && m.direction == Direction::Press,
        _ => false,
    }
}

/// Run the scene until the user asks to exit.
pub fn run_scene(screen: Screen, cfg: SceneConfig) {
    if let Err(e) = event_loop(&screen, &cfg) {
        error!("demo stopped: {e}");
    }
}

fn event_loop(screen: &Screen, cfg: &SceneConfig) -> Result<(), DrawError> {
    let texture = screen.new_texture(Point::new(cfg.texture_size, cfg.texture_size))?;
    let pixels = gradient(cfg.texture_size);
    texture.upload(Point::ZERO, &pixels, pixels.bounds())?;

    let window = screen.new_window()?;
    while let Some(event) = window.next_event() {
        if wants_exit(&event) {
            info!("exit requested");
            break;
        }
        match event {
            Event::Paint => paint(&window, &texture, cfg)?,
            Event::Size(size) => info!(?size, "window resized"),
            other => debug!(?other, "event"),
        }
    }

    texture.release();
    window.release();
    Ok(())
}
