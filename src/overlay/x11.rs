// SPDX-License-Identifier: GPL-3.0-only
//! X11 backend for the alert overlay
//!
//! Uses XCB via x11rb. The window is override-redirect, so the window manager
//! neither decorates nor moves it. Frames are pushed through MIT-SHM.

use std::fs::File;

use memmap2::MmapMut;
use rustix::fs::{MemfdFlags, memfd_create};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::shm::{self, ConnectionExt as _};
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::fade::shade;
use super::background::Image;
use super::{DisplayMode, Fill, OverlayBackend, Resource};
use crate::error::{RenderError, WindowError};

/// Shared memory frame attached to the X server
struct ShmFrame {
    seg: shm::Seg,
    map: MmapMut,
}

pub struct X11Backend {
    display: String,
    conn: Option<RustConnection>,
    root: Window,
    root_depth: u8,
    root_visual: Visualid,
    black_pixel: u32,
    mode: DisplayMode,
    window: Option<Window>,
    gc: Option<Gcontext>,
    frame: Option<ShmFrame>,
    /// Background scaled to the window, BGRX
    texture: Option<Vec<u8>>,
}

impl X11Backend {
    pub fn new(display: &str) -> Self {
        Self {
            display: display.to_string(),
            conn: None,
            root: 0,
            root_depth: 0,
            root_visual: 0,
            black_pixel: 0,
            mode: DisplayMode::default(),
            window: None,
            gc: None,
            frame: None,
            texture: None,
        }
    }

    fn conn(&self) -> Result<&RustConnection, RenderError> {
        self.conn.as_ref().ok_or(RenderError::NoRenderer)
    }

    /// Check the root depth uses 32 bits per pixel, least significant byte first
    fn check_pixel_format(&self, conn: &RustConnection) -> Result<(), RenderError> {
        let setup = conn.setup();
        let bits_per_pixel = setup
            .pixmap_formats
            .iter()
            .find(|f| f.depth == self.root_depth)
            .map(|f| f.bits_per_pixel)
            .unwrap_or(0);

        if bits_per_pixel != 32 || setup.image_byte_order != ImageOrder::LSB_FIRST {
            return Err(RenderError::UnsupportedFormat {
                depth: self.root_depth,
                bits_per_pixel,
            });
        }
        Ok(())
    }

    fn create_shm_frame(conn: &RustConnection, size: usize) -> Result<ShmFrame, RenderError> {
        let fd = memfd_create(c"hotplug-alert-frame", MemfdFlags::CLOEXEC)
            .map_err(|e| RenderError::Buffer(format!("memfd_create failed: {}", e)))?;
        let file = File::from(fd);
        file.set_len(size as u64)
            .map_err(|e| RenderError::Buffer(format!("ftruncate failed: {}", e)))?;

        // SAFETY: the memfd is private to this process and the X server, and
        // the server only reads it during shm_put_image
        let map = unsafe { MmapMut::map_mut(&file) }
            .map_err(|e| RenderError::Buffer(format!("mmap failed: {}", e)))?;

        let seg = conn
            .generate_id()
            .map_err(|e| RenderError::Buffer(e.to_string()))?;

        // x11rb shm_attach_fd takes ownership of the fd, the mapping stays valid
        conn.shm_attach_fd(seg, file, false)
            .map_err(|e| RenderError::Buffer(format!("shm_attach_fd failed: {}", e)))?
            .check()
            .map_err(|e| RenderError::Buffer(format!("shm_attach_fd failed: {}", e)))?;

        Ok(ShmFrame { seg, map })
    }
}

fn window_err<E: std::fmt::Display>(e: E) -> WindowError {
    WindowError::Create(e.to_string())
}

/// Primary RandR monitor, or the first one listed
fn primary_monitor(conn: &RustConnection, root: Window) -> Option<DisplayMode> {
    let monitors = conn.randr_get_monitors(root, true).ok()?.reply().ok()?;
    let monitor = monitors
        .monitors
        .iter()
        .find(|m| m.primary)
        .or_else(|| monitors.monitors.first())?;

    Some(DisplayMode {
        x: monitor.x as i32,
        y: monitor.y as i32,
        width: monitor.width as u32,
        height: monitor.height as u32,
    })
}

impl OverlayBackend for X11Backend {
    fn init_video(&mut self) -> Result<DisplayMode, WindowError> {
        let (conn, screen_num) =
            x11rb::connect(Some(self.display.as_str())).map_err(|e| WindowError::Connect {
                display: self.display.clone(),
                reason: e.to_string(),
            })?;

        conn.shm_query_version()
            .map_err(|_| WindowError::MissingExtension("MIT-SHM"))?
            .reply()
            .map_err(|_| WindowError::MissingExtension("MIT-SHM"))?;

        let screen = &conn.setup().roots[screen_num];
        self.root = screen.root;
        self.root_depth = screen.root_depth;
        self.root_visual = screen.root_visual;
        self.black_pixel = screen.black_pixel;

        let mode = primary_monitor(&conn, self.root).unwrap_or_else(|| {
            debug!("RandR monitors unavailable, covering the root window");
            DisplayMode {
                x: 0,
                y: 0,
                width: screen.width_in_pixels as u32,
                height: screen.height_in_pixels as u32,
            }
        });

        info!(
            "Connected to display {} ({}x{} at {},{})",
            self.display, mode.width, mode.height, mode.x, mode.y
        );
        self.mode = mode;
        self.conn = Some(conn);
        Ok(mode)
    }

    fn create_window(&mut self, title: &str, mode: DisplayMode) -> Result<(), WindowError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| WindowError::Create("no display connection".to_string()))?;

        let window = conn.generate_id().map_err(window_err)?;
        let aux = CreateWindowAux::new()
            .background_pixel(self.black_pixel)
            .border_pixel(0)
            .event_mask(EventMask::EXPOSURE)
            .override_redirect(1);

        conn.create_window(
            self.root_depth,
            window,
            self.root,
            mode.x as i16,
            mode.y as i16,
            mode.width as u16,
            mode.height as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            self.root_visual,
            &aux,
        )
        .map_err(window_err)?
        .check()
        .map_err(window_err)?;

        let shown = conn
            .change_property8(
                PropMode::REPLACE,
                window,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                title.as_bytes(),
            )
            .map_err(window_err)
            .and_then(|_| conn.map_window(window).map_err(window_err))
            // Round trip so the window is mapped before the first frame
            .and_then(|_| conn.get_input_focus().map_err(window_err))
            .and_then(|cookie| cookie.reply().map_err(window_err));

        if let Err(e) = shown {
            let _ = conn.destroy_window(window);
            let _ = conn.flush();
            return Err(e);
        }

        self.window = Some(window);
        Ok(())
    }

    fn create_renderer(&mut self) -> Result<(), RenderError> {
        let conn = self.conn()?;
        let window = self.window.ok_or(RenderError::NoRenderer)?;
        self.check_pixel_format(conn)?;

        let gc = conn
            .generate_id()
            .map_err(|e| RenderError::Request(e.to_string()))?;
        conn.create_gc(gc, window, &CreateGCAux::new())
            .map_err(|e| RenderError::Request(e.to_string()))?
            .check()
            .map_err(|e| RenderError::Request(e.to_string()))?;

        let size = self.mode.width as usize * self.mode.height as usize * 4;
        let frame = match Self::create_shm_frame(conn, size) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = conn.free_gc(gc);
                return Err(e);
            }
        };

        self.gc = Some(gc);
        self.frame = Some(frame);
        Ok(())
    }

    fn create_texture(&mut self, image: &Image) -> Result<(), RenderError> {
        if self.frame.is_none() {
            return Err(RenderError::NoRenderer);
        }
        self.texture = Some(image.to_bgrx_scaled(self.mode.width, self.mode.height));
        Ok(())
    }

    fn draw(&mut self, fill: Fill, alpha: u8) -> Result<(), RenderError> {
        let (Some(conn), Some(window), Some(gc), Some(frame)) =
            (self.conn.as_ref(), self.window, self.gc, self.frame.as_mut())
        else {
            return Err(RenderError::NoRenderer);
        };

        match fill {
            Fill::Texture => {
                let texture = self.texture.as_ref().ok_or(RenderError::NoRenderer)?;
                for (dst, &src) in frame.map.iter_mut().zip(texture.iter()) {
                    *dst = shade(src, alpha);
                }
            }
            Fill::Solid(color) => {
                let alpha = shade(color.a, alpha);
                let pixel = [
                    shade(color.b, alpha),
                    shade(color.g, alpha),
                    shade(color.r, alpha),
                    0xff,
                ];
                for dst in frame.map.chunks_exact_mut(4) {
                    dst.copy_from_slice(&pixel);
                }
            }
        }

        let (width, height) = (self.mode.width as u16, self.mode.height as u16);
        conn.shm_put_image(
            window,
            gc,
            width,
            height,
            0,
            0,
            width,
            height,
            0,
            0,
            self.root_depth,
            ImageFormat::Z_PIXMAP.into(),
            false,
            frame.seg,
            0,
        )
        .map_err(|e| RenderError::Request(e.to_string()))?;
        conn.flush().map_err(|e| RenderError::Request(e.to_string()))?;
        Ok(())
    }

    fn release(&mut self, resource: Resource) {
        match resource {
            Resource::Texture => {
                self.texture = None;
            }
            Resource::Renderer => {
                if let Some(conn) = self.conn.as_ref() {
                    if let Some(frame) = self.frame.take() {
                        let _ = conn.shm_detach(frame.seg);
                    }
                    if let Some(gc) = self.gc.take() {
                        let _ = conn.free_gc(gc);
                    }
                    let _ = conn.flush();
                }
                self.frame = None;
                self.gc = None;
            }
            Resource::Window => {
                if let (Some(conn), Some(window)) = (self.conn.as_ref(), self.window.take()) {
                    let _ = conn.destroy_window(window);
                    let _ = conn.flush();
                }
            }
            Resource::Video => {
                self.window = None;
                self.conn = None;
            }
        }
    }
}
