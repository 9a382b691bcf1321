use crate::config::RunConfig;
use dotmatrix_core::FrameBuffer;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Texture, TextureCreator, WindowCanvas};
use sdl2::video::{FullscreenType, Window, WindowContext};
use sdl2::IntegerOrSdlError;
use thiserror::Error;

const SCREEN_WIDTH: u32 = dotmatrix_core::ppu::SCREEN_WIDTH as u32;
const SCREEN_HEIGHT: u32 = dotmatrix_core::ppu::SCREEN_HEIGHT as u32;

#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("error setting fullscreen mode: {msg}")]
    Fullscreen { msg: String },
    #[error("error creating renderer: {source}")]
    CreateRenderer {
        #[from]
        source: IntegerOrSdlError,
    },
    #[error("error creating frame texture: {source}")]
    CreateTexture {
        #[from]
        source: sdl2::render::TextureValueError,
    },
    #[error("error updating frame texture: {msg}")]
    Texture { msg: String },
    #[error("error copying frame texture to renderer: {msg}")]
    CopyToCanvas { msg: String },
}

/// Create an SDL2 renderer from the given SDL2 window, honoring the
/// fullscreen and VSync settings, with the display area cleared to white.
pub fn create_renderer(
    mut window: Window,
    run_config: &RunConfig,
) -> Result<WindowCanvas, GraphicsError> {
    if run_config.launch_fullscreen {
        let fullscreen_mode = if run_config.borderless_fullscreen {
            FullscreenType::Desktop
        } else {
            FullscreenType::True
        };
        window
            .set_fullscreen(fullscreen_mode)
            .map_err(|msg| GraphicsError::Fullscreen { msg })?;
    }

    let mut canvas_builder = window.into_canvas();
    if run_config.vsync_enabled {
        canvas_builder = canvas_builder.present_vsync();
    }

    let mut canvas = canvas_builder.build()?;

    canvas.set_draw_color(Color::RGB(255, 255, 255));
    canvas.clear();
    canvas.present();

    Ok(canvas)
}

pub fn create_frame_texture(
    texture_creator: &TextureCreator<WindowContext>,
) -> Result<Texture<'_>, GraphicsError> {
    let texture = texture_creator.create_texture_streaming(
        PixelFormatEnum::RGBA32,
        SCREEN_WIDTH,
        SCREEN_HEIGHT,
    )?;
    Ok(texture)
}

/// Render the current frame to the SDL2 window, overwriting all previously
/// displayed data.
///
/// With VSync enabled this function will block until the next screen refresh.
pub fn render_frame(
    frame_buffer: &FrameBuffer,
    canvas: &mut WindowCanvas,
    texture: &mut Texture<'_>,
    run_config: &RunConfig,
) -> Result<(), GraphicsError> {
    let row_len = SCREEN_WIDTH as usize * 4;
    texture
        .with_lock(None, |pixels: &mut [u8], pitch: usize| {
            for (i, row) in frame_buffer.as_bytes().chunks_exact(row_len).enumerate() {
                pixels[i * pitch..i * pitch + row_len].copy_from_slice(row);
            }
        })
        .map_err(|msg| GraphicsError::Texture { msg })?;

    let dst_rect = if run_config.force_integer_scaling {
        let (w, h) = canvas.window().size();
        determine_integer_scale_rect(w, h)
    } else {
        None
    };

    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas.copy(texture, None, dst_rect).map_err(|msg| GraphicsError::CopyToCanvas { msg })?;
    canvas.present();

    Ok(())
}

fn determine_integer_scale_rect(w: u32, h: u32) -> Option<Rect> {
    let scale = (1..)
        .take_while(|&scale| scale * SCREEN_WIDTH <= w && scale * SCREEN_HEIGHT <= h)
        .last()?;

    let scaled_width = scale * SCREEN_WIDTH;
    let scaled_height = scale * SCREEN_HEIGHT;
    Some(Rect::new(
        ((w - scaled_width) / 2) as i32,
        ((h - scaled_height) / 2) as i32,
        scaled_width,
        scaled_height,
    ))
}

pub fn toggle_fullscreen(
    canvas: &mut WindowCanvas,
    run_config: &RunConfig,
) -> Result<(), GraphicsError> {
    let fullscreen_mode = if run_config.borderless_fullscreen {
        FullscreenType::Desktop
    } else {
        FullscreenType::True
    };

    let current_fullscreen = canvas.window().fullscreen_state();
    let new_fullscreen = match current_fullscreen {
        FullscreenType::Off => fullscreen_mode,
        FullscreenType::True | FullscreenType::Desktop => FullscreenType::Off,
    };
    canvas
        .window_mut()
        .set_fullscreen(new_fullscreen)
        .map_err(|msg| GraphicsError::Fullscreen { msg })
}
