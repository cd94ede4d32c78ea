use crate::console::Console;
use crate::keypad::Button;
use crate::screen::{FrameRenderer, SCREEN_HEIGHT, SCREEN_WIDTH};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::Canvas;
use sdl2::video::Window;

/// EventLoop manages the SDL2 window, keyboard input and frame presentation
/// for the frontend binary. It exits when Escape is pressed or the window is
/// closed.
pub struct EventLoop {
    sdl_context: sdl2::Sdl,
    canvas: Option<Canvas<Window>>,
    event_pump: sdl2::EventPump,
}

impl EventLoop {
    const MIN_SCALE: f32 = 1.0;
    const MAX_SCALE: f32 = 5.0;
    const TARGET_FRAME_SECONDS: f64 = 1.0 / 60.0;

    /// Create the event loop.
    ///
    /// With `headless` set, no window is created (useful for tests); the
    /// video scale is clamped to [1.0, 5.0] with a warning when out of range.
    pub fn new(headless: bool, video_scale: f32) -> Result<Self, String> {
        let clamped_scale = Self::clamp_scale(video_scale);
        let sdl_context = sdl2::init()?;
        let event_pump = sdl_context.event_pump()?;

        let canvas = if headless {
            None
        } else {
            Some(Self::create_window_and_canvas(&sdl_context, clamped_scale)?)
        };

        Ok(EventLoop {
            sdl_context,
            canvas,
            event_pump,
        })
    }

    /// The SDL context, shared with the audio subsystem
    pub fn sdl_context(&self) -> &sdl2::Sdl {
        &self.sdl_context
    }

    fn clamp_scale(scale: f32) -> f32 {
        if scale < Self::MIN_SCALE || scale > Self::MAX_SCALE {
            let clamped = scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE);
            eprintln!("Warning: Video scale {scale} out of range, clamping to {clamped}.");
            clamped
        } else {
            scale
        }
    }

    fn create_window_and_canvas(
        sdl_context: &sdl2::Sdl,
        scale: f32,
    ) -> Result<Canvas<Window>, String> {
        let video_subsystem = sdl_context.video()?;
        let window = video_subsystem
            .window(
                "famicore",
                (SCREEN_WIDTH as f32 * scale) as u32,
                (SCREEN_HEIGHT as f32 * scale) as u32,
            )
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        canvas.set_draw_color(sdl2::pixels::Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();
        Ok(canvas)
    }

    /// Map host keys onto the controller's button indices
    fn map_key(keycode: Keycode) -> Option<Button> {
        match keycode {
            Keycode::Z => Some(Button::A),
            Keycode::X => Some(Button::B),
            Keycode::RShift => Some(Button::Select),
            Keycode::Return => Some(Button::Start),
            Keycode::Up => Some(Button::Up),
            Keycode::Down => Some(Button::Down),
            Keycode::Left => Some(Button::Left),
            Keycode::Right => Some(Button::Right),
            _ => None,
        }
    }

    /// Drive the console frame by frame until the user quits
    pub fn run(&mut self, console: &mut Console) -> Result<(), String> {
        let mut renderer = FrameRenderer::new();

        let timer = self.sdl_context.timer()?;
        let performance_frequency = timer.performance_frequency() as f64;
        let mut last_frame_time = timer.performance_counter();

        let texture_creator = self.canvas.as_ref().map(|canvas| canvas.texture_creator());
        let mut texture = match &texture_creator {
            Some(creator) => Some(
                creator
                    .create_texture_streaming(PixelFormatEnum::RGB24, SCREEN_WIDTH, SCREEN_HEIGHT)
                    .map_err(|e| e.to_string())?,
            ),
            None => None,
        };

        loop {
            for event in self.event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => return Ok(()),
                    Event::KeyDown {
                        keycode: Some(keycode),
                        ..
                    } => {
                        if let Some(button) = Self::map_key(keycode) {
                            console.press(button);
                        }
                    }
                    Event::KeyUp {
                        keycode: Some(keycode),
                        ..
                    } => {
                        if let Some(button) = Self::map_key(keycode) {
                            console.release(button);
                        }
                    }
                    _ => {}
                }
            }

            let frame = console.frame();
            let pixels = renderer.render(&frame);

            if let (Some(canvas), Some(texture)) = (&mut self.canvas, &mut texture) {
                texture
                    .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                        let row_bytes = SCREEN_WIDTH as usize * 3;
                        if pitch == row_bytes {
                            buffer[..pixels.len()].copy_from_slice(pixels);
                        } else {
                            for y in 0..SCREEN_HEIGHT as usize {
                                let source = &pixels[y * row_bytes..(y + 1) * row_bytes];
                                buffer[y * pitch..y * pitch + row_bytes].copy_from_slice(source);
                            }
                        }
                    })
                    .map_err(|e| e.to_string())?;
                canvas.clear();
                canvas.copy(texture, None, None)?;
                canvas.present();
            }

            // Frame pacing: hold to ~60 fields per second
            let current_time = timer.performance_counter();
            let elapsed_seconds =
                (current_time - last_frame_time) as f64 / performance_frequency;
            last_frame_time = current_time;
            if elapsed_seconds < Self::TARGET_FRAME_SECONDS {
                std::thread::sleep(std::time::Duration::from_secs_f64(
                    Self::TARGET_FRAME_SECONDS - elapsed_seconds,
                ));
            }
        }
    }
}
