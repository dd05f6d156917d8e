use anyhow::{anyhow, Result};
use clap::Parser;
use detview_app::{init_logging, load_adapter, UiController, ViewerConfig};
use detview_camera::providers::default_provider;
use image::RgbImage;
use sdl2::{
    event::Event,
    keyboard::Scancode,
    pixels::{Color, PixelFormatEnum},
    rect::Rect as SdlRect,
    render::Canvas,
    video::Window,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ================ CLI ================== //

#[derive(Parser)]
#[command(name = "detview", about = "Live object detection viewer")]
struct CliArgs {
    /// ONNX model, overrides the config file
    #[arg(long)]
    model: Option<PathBuf>,

    /// Extra model for the `M` key, may be repeated
    #[arg(long = "add-model")]
    add_model: Vec<PathBuf>,

    /// JSON viewer config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start this camera right away
    #[arg(long)]
    camera: Option<u32>,

    /// Start with an image, image folder or video instead of a camera
    #[arg(long, conflicts_with = "camera")]
    source: Option<PathBuf>,
}

// ================ DISPLAY ================== //

const WINDOW_W: u32 = 1280;
const WINDOW_H: u32 = 480;

fn init_sdl2() -> Result<(sdl2::Sdl, Canvas<Window>)> {
    let sdl_context = sdl2::init().map_err(|e| anyhow!("Failed to initialize SDL2: {}", e))?;
    let video_subsystem = sdl_context.video().map_err(|e| anyhow!("Failed to get SDL2 video subsystem: {}", e))?;
    let window = video_subsystem
        .window("detview", WINDOW_W, WINDOW_H)
        .position_centered()
        .resizable()
        .build()
        .map_err(|e| anyhow!("Failed to build SDL2 window: {}", e))?;

    let canvas = window
        .into_canvas()
        .accelerated()
        .build()
        .map_err(|e| anyhow!("Failed to build SDL2 canvas: {}", e))?;

    Ok((sdl_context, canvas))
}

/// Largest rect with the image's aspect ratio centred inside `area`.
fn fit(area: SdlRect, w: u32, h: u32) -> SdlRect {
    let scale = (area.width() as f32 / w as f32).min(area.height() as f32 / h as f32);
    let (dw, dh) = ((w as f32 * scale) as u32, (h as f32 * scale) as u32);
    SdlRect::new(
        area.x() + (area.width() - dw) as i32 / 2,
        area.y() + (area.height() - dh) as i32 / 2,
        dw.max(1),
        dh.max(1),
    )
}

fn blit(canvas: &mut Canvas<Window>, rgb_image: &RgbImage, area: SdlRect) -> Result<()> {
    let (width, height) = (rgb_image.width(), rgb_image.height());
    let creator = canvas.texture_creator();
    let mut texture = creator.create_texture_streaming(PixelFormatEnum::RGB24, width, height)?;

    texture
        .with_lock(None, |buffer: &mut [u8], pitch: usize| {
            let row_len = 3 * width as usize;
            for (y, row) in rgb_image.as_raw().chunks_exact(row_len).enumerate() {
                let start = y * pitch;
                buffer[start..start + row_len].copy_from_slice(row);
            }
        })
        .map_err(|e| anyhow!("texture lock failed: {e}"))?;

    canvas.copy(&texture, None, fit(area, width, height)).map_err(|e| anyhow!("texture copy failed: {e}"))?;
    Ok(())
}

/// Raw frame on the left, annotated on the right.
fn display_pair(canvas: &mut Canvas<Window>, raw: &RgbImage, annotated: &RgbImage) -> Result<()> {
    canvas.set_draw_color(Color::RGB(24, 24, 24));
    canvas.clear();
    let (win_w, win_h) = canvas.window().size();
    let half = (win_w / 2).max(1);
    blit(canvas, raw, SdlRect::new(0, 0, half, win_h.max(1)))?;
    blit(canvas, annotated, SdlRect::new(half as i32, 0, half, win_h.max(1)))?;
    canvas.present();
    Ok(())
}

// ================ MAIN LOOP ================== //

fn main() -> Result<()> {
    init_logging();
    let args = CliArgs::parse();

    let mut config = ViewerConfig::load_or_default(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model = model;
    }
    config.models.extend(args.add_model);
    if !config.models.is_empty() && !config.models.contains(&config.model) {
        config.models.insert(0, config.model.clone());
    }
    let adapter = load_adapter(&config)?;
    let provider = Arc::new(default_provider());
    let mut controller = UiController::new(provider, adapter, &config);

    let quit = Arc::new(AtomicBool::new(false));
    {
        let quit = Arc::clone(&quit);
        ctrlc::set_handler(move || quit.store(true, Ordering::SeqCst))?;
    }

    let (sdl_context, mut canvas) = init_sdl2()?;
    let mut event_pump = sdl_context.event_pump().map_err(|e| anyhow!("Failed to get event pump: {e}"))?;

    controller.refresh_devices();
    match (args.source, args.camera) {
        (Some(path), _) => {
            controller.open_media(&path);
        }
        (None, Some(index)) => {
            controller.start_camera(index);
        }
        (None, None) => {}
    }

    let mut shown: Option<(u64, u64)> = None;
    let mut title = String::new();
    while !quit.load(Ordering::SeqCst) {
        if let Some(event) = event_pump.wait_event_timeout(10) {
            for event in std::iter::once(event).chain(event_pump.poll_iter()) {
                match event {
                    Event::Quit { .. } | Event::KeyDown { scancode: Some(Scancode::Escape), .. } => {
                        quit.store(true, Ordering::SeqCst);
                    }
                    Event::KeyDown { scancode: Some(sc), repeat: false, .. } => handle_key(&mut controller, sc),
                    Event::DropFile { filename, .. } => {
                        controller.open_media(&PathBuf::from(filename));
                    }
                    _ => {}
                }
            }
        }

        if let Some(pair) = controller.poll() {
            let id = (pair.generation, pair.seq());
            if shown != Some(id) {
                display_pair(&mut canvas, pair.raw.image(), pair.annotated.image())?;
                shown = Some(id);
            }
        }

        let wanted = format!("detview - {}", controller.status());
        if wanted != title {
            canvas.window_mut().set_title(&wanted)?;
            title = wanted;
        }
    }

    // worker must be gone before the window is torn down
    controller.shutdown();
    log::info!("bye");
    Ok(())
}

fn handle_key(controller: &mut UiController, sc: Scancode) {
    let digit = match sc {
        Scancode::Num0 => Some(0),
        Scancode::Num1 => Some(1),
        Scancode::Num2 => Some(2),
        Scancode::Num3 => Some(3),
        Scancode::Num4 => Some(4),
        Scancode::Num5 => Some(5),
        Scancode::Num6 => Some(6),
        Scancode::Num7 => Some(7),
        Scancode::Num8 => Some(8),
        Scancode::Num9 => Some(9),
        _ => None,
    };
    if let Some(index) = digit {
        controller.switch_camera(index);
        return;
    }
    match sc {
        Scancode::C => {
            let first = controller.devices().first().copied().unwrap_or(0);
            controller.switch_camera(first);
        }
        Scancode::S | Scancode::Space => controller.stop(),
        Scancode::R => controller.refresh_devices(),
        Scancode::M => {
            controller.next_model();
        }
        _ => {}
    }
}
