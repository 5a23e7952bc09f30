// SPDX-License-Identifier: GPL-3.0-only
//! Fullscreen alert overlay
//!
//! Shows the background image (or a solid color if it cannot be loaded) over
//! the whole display, then fades it to black.
//!
//! # Lifecycle
//!
//! `Uninitialized -> VideoReady -> WindowCreated -> FirstFrameRendered -> Fading -> TornDown`
//!
//! Any failure before the first frame goes straight to `TornDown`. Teardown
//! releases, in order, the texture, the renderer, the window and the display
//! connection, each exactly once and only if it was acquired.

mod background;
mod fade;
mod x11;

use std::path::Path;

pub use background::{Image, load_image};
pub use fade::FadeSchedule;
pub use x11::X11Backend;

use crate::config::FadeConfig;
use crate::error::{OverlayError, RenderError, WindowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Geometry of the display the overlay covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayMode {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// What each frame shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Texture,
    Solid(Rgba),
}

/// Resources acquired by an overlay session, in acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Video,
    Window,
    Renderer,
    Texture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Uninitialized,
    VideoReady,
    WindowCreated,
    FirstFrameRendered,
    Fading,
    TornDown,
}

/// Display system the overlay draws through
pub trait OverlayBackend {
    /// Connect to the display and report the mode to cover
    fn init_video(&mut self) -> Result<DisplayMode, WindowError>;

    /// Create and show a borderless window covering `mode`
    fn create_window(&mut self, title: &str, mode: DisplayMode) -> Result<(), WindowError>;

    fn create_renderer(&mut self) -> Result<(), RenderError>;

    /// Upload the background, scaled to the window
    fn create_texture(&mut self, image: &Image) -> Result<(), RenderError>;

    /// Present one frame, blended towards black by `alpha` (255 = unchanged)
    fn draw(&mut self, fill: Fill, alpha: u8) -> Result<(), RenderError>;

    /// Release one acquired resource; never fails
    fn release(&mut self, resource: Resource);
}

/// Resources and fade state for one `present` call
pub struct OverlaySession<'a, B: OverlayBackend> {
    backend: &'a mut B,
    state: OverlayState,
    acquired: Vec<Resource>,
    alpha: u8,
}

impl<'a, B: OverlayBackend> OverlaySession<'a, B> {
    fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            state: OverlayState::Uninitialized,
            acquired: Vec::new(),
            alpha: u8::MAX,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> OverlayState {
        self.state
    }

    fn transition(&mut self, next: OverlayState) {
        debug!("Overlay {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn init_video(&mut self) -> Result<DisplayMode, WindowError> {
        let mode = self.backend.init_video()?;
        self.acquired.push(Resource::Video);
        self.transition(OverlayState::VideoReady);
        Ok(mode)
    }

    fn create_window(&mut self, title: &str, mode: DisplayMode) -> Result<(), OverlayError> {
        self.backend.create_window(title, mode)?;
        self.acquired.push(Resource::Window);
        self.backend.create_renderer()?;
        self.acquired.push(Resource::Renderer);
        self.transition(OverlayState::WindowCreated);
        Ok(())
    }

    /// Load the background, or pick the fallback fill
    fn load_background(&mut self, path: &Path, fallback: Rgba) -> Fill {
        if !path.exists() {
            warn!("Background not found: {}", path.display());
            return Fill::Solid(fallback);
        }

        let image = match load_image(path) {
            Ok(image) => image,
            Err(e) => {
                warn!("Failed to load background {}: {}", path.display(), e);
                return Fill::Solid(fallback);
            }
        };

        match self.backend.create_texture(&image) {
            Ok(()) => {
                self.acquired.push(Resource::Texture);
                Fill::Texture
            }
            Err(e) => {
                warn!("Failed to create texture from image: {}", e);
                Fill::Solid(fallback)
            }
        }
    }

    fn render(&mut self, fill: Fill, alpha: u8) -> Result<(), RenderError> {
        debug_assert!(alpha <= self.alpha, "fade alpha must not increase");
        self.backend.draw(fill, alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    /// Release everything acquired so far, newest first
    fn teardown(&mut self) {
        while let Some(resource) = self.acquired.pop() {
            debug!("Releasing overlay {:?}", resource);
            self.backend.release(resource);
        }
        if self.state != OverlayState::TornDown {
            self.transition(OverlayState::TornDown);
        }
    }
}

impl<B: OverlayBackend> Drop for OverlaySession<'_, B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Outcome of a completed fade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeSummary {
    /// Frames drawn after the opaque first frame
    pub fade_frames: usize,
    pub final_alpha: u8,
    pub used_fallback: bool,
}

/// Fullscreen alert with a timed fade-out
pub struct AlertOverlay<B: OverlayBackend = X11Backend> {
    backend: B,
    fade: FadeConfig,
}

impl<B: OverlayBackend> AlertOverlay<B> {
    pub fn new(backend: B, fade: FadeConfig) -> Self {
        Self { backend, fade }
    }

    /// Show the alert and block until it has faded out
    ///
    /// Returns `None` if the visual phase was aborted; the error is logged.
    pub fn present(
        &mut self,
        title: &str,
        image_path: &Path,
        fallback: Rgba,
    ) -> Option<FadeSummary> {
        let fade = self.fade;
        let mut session = OverlaySession::new(&mut self.backend);

        let result = Self::run(&mut session, fade, title, image_path, fallback);
        session.teardown();

        match result {
            Ok(summary) => {
                debug!("Overlay finished after {} fade frames", summary.fade_frames);
                Some(summary)
            }
            Err(e) => {
                error!("Alert overlay aborted: {}", e);
                None
            }
        }
    }

    fn run(
        session: &mut OverlaySession<'_, B>,
        fade: FadeConfig,
        title: &str,
        image_path: &Path,
        fallback: Rgba,
    ) -> Result<FadeSummary, OverlayError> {
        let mode = session.init_video()?;
        session.create_window(title, mode)?;

        let fill = session.load_background(image_path, fallback);
        session.render(fill, u8::MAX)?;
        session.transition(OverlayState::FirstFrameRendered);

        std::thread::sleep(fade.delay_before_fade);
        session.transition(OverlayState::Fading);

        let mut fade_frames = 0;
        for alpha in FadeSchedule::new(fade.step) {
            session.render(fill, alpha)?;
            fade_frames += 1;
            std::thread::sleep(fade.frame_delay);
        }

        Ok(FadeSummary {
            fade_frames,
            final_alpha: session.alpha,
            used_fallback: fill != Fill::Texture,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Stage {
        Video,
        Window,
        Renderer,
        Texture,
        Draw(usize),
    }

    #[derive(Default)]
    struct FakeBackend {
        fail_at: Option<Stage>,
        draws: Vec<(Fill, u8)>,
        released: Vec<Resource>,
        title: String,
    }

    impl FakeBackend {
        fn failing_at(stage: Stage) -> Self {
            Self {
                fail_at: Some(stage),
                ..Default::default()
            }
        }

        fn fails(&self, stage: Stage) -> bool {
            self.fail_at == Some(stage)
        }
    }

    impl OverlayBackend for FakeBackend {
        fn init_video(&mut self) -> Result<DisplayMode, WindowError> {
            if self.fails(Stage::Video) {
                return Err(WindowError::Connect {
                    display: ":0".to_string(),
                    reason: "refused".to_string(),
                });
            }
            Ok(DisplayMode {
                x: 0,
                y: 0,
                width: 64,
                height: 48,
            })
        }

        fn create_window(&mut self, title: &str, _mode: DisplayMode) -> Result<(), WindowError> {
            if self.fails(Stage::Window) {
                return Err(WindowError::Create("BadAlloc".to_string()));
            }
            self.title = title.to_string();
            Ok(())
        }

        fn create_renderer(&mut self) -> Result<(), RenderError> {
            if self.fails(Stage::Renderer) {
                return Err(RenderError::Buffer("no shm".to_string()));
            }
            Ok(())
        }

        fn create_texture(&mut self, _image: &Image) -> Result<(), RenderError> {
            if self.fails(Stage::Texture) {
                return Err(RenderError::Buffer("too large".to_string()));
            }
            Ok(())
        }

        fn draw(&mut self, fill: Fill, alpha: u8) -> Result<(), RenderError> {
            if self.fails(Stage::Draw(self.draws.len())) {
                return Err(RenderError::Request("connection lost".to_string()));
            }
            self.draws.push((fill, alpha));
            Ok(())
        }

        fn release(&mut self, resource: Resource) {
            self.released.push(resource);
        }
    }

    const FALLBACK: Rgba = Rgba::new(255, 0, 90, 255);

    fn instant_fade() -> FadeConfig {
        FadeConfig {
            delay_before_fade: Duration::ZERO,
            step: 5,
            frame_delay: Duration::ZERO,
        }
    }

    fn background_png(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hotplug-alert-overlay-{}-{}.png",
            name,
            std::process::id()
        ));
        ::image::RgbaImage::from_pixel(2, 2, ::image::Rgba([10, 10, 10, 10]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_missing_background_uses_fallback_and_fades_out() {
        let mut overlay = AlertOverlay::new(FakeBackend::default(), instant_fade());

        let summary = overlay
            .present("USB device connected", Path::new("/nonexistent/background.png"), FALLBACK)
            .unwrap();

        assert!(summary.used_fallback);
        assert_eq!(summary.final_alpha, 0);
        assert_eq!(summary.fade_frames, FadeSchedule::frame_count(5));

        let backend = &overlay.backend;
        assert_eq!(backend.title, "USB device connected");
        assert_eq!(backend.draws[0], (Fill::Solid(FALLBACK), 255));
        assert!(backend.draws.windows(2).all(|w| w[1].1 <= w[0].1));
        assert_eq!(backend.draws.last().unwrap().1, 0);
        assert_eq!(
            backend.released,
            vec![Resource::Renderer, Resource::Window, Resource::Video]
        );
    }

    #[test]
    fn test_image_and_fallback_fade_equally_long() {
        let path = background_png("fade");

        let mut with_image = AlertOverlay::new(FakeBackend::default(), instant_fade());
        let image_summary = with_image.present("alert", &path, FALLBACK).unwrap();

        let mut without_image = AlertOverlay::new(FakeBackend::default(), instant_fade());
        let fallback_summary = without_image
            .present("alert", Path::new("/nonexistent.png"), FALLBACK)
            .unwrap();

        assert!(!image_summary.used_fallback);
        assert_eq!(image_summary.fade_frames, fallback_summary.fade_frames);
        assert_eq!(with_image.backend.draws[0], (Fill::Texture, 255));
        assert_eq!(
            with_image.backend.released,
            vec![Resource::Texture, Resource::Renderer, Resource::Window, Resource::Video]
        );

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_texture_failure_falls_back_to_color() {
        let path = background_png("texture");
        let mut overlay =
            AlertOverlay::new(FakeBackend::failing_at(Stage::Texture), instant_fade());

        let summary = overlay.present("alert", &path, FALLBACK).unwrap();
        assert!(summary.used_fallback);
        assert!(!overlay.backend.released.contains(&Resource::Texture));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_video_failure_releases_nothing() {
        let mut overlay = AlertOverlay::new(FakeBackend::failing_at(Stage::Video), instant_fade());

        assert!(overlay.present("alert", Path::new("/nonexistent.png"), FALLBACK).is_none());
        assert!(overlay.backend.draws.is_empty());
        assert!(overlay.backend.released.is_empty());
    }

    #[test]
    fn test_window_failure_releases_video_only() {
        let mut overlay = AlertOverlay::new(FakeBackend::failing_at(Stage::Window), instant_fade());

        assert!(overlay.present("alert", Path::new("/nonexistent.png"), FALLBACK).is_none());
        assert!(overlay.backend.draws.is_empty());
        assert_eq!(overlay.backend.released, vec![Resource::Video]);
    }

    #[test]
    fn test_renderer_failure_releases_window_then_video() {
        let mut overlay =
            AlertOverlay::new(FakeBackend::failing_at(Stage::Renderer), instant_fade());

        assert!(overlay.present("alert", Path::new("/nonexistent.png"), FALLBACK).is_none());
        assert!(overlay.backend.draws.is_empty());
        assert_eq!(overlay.backend.released, vec![Resource::Window, Resource::Video]);
    }

    #[test]
    fn test_render_failure_mid_fade_tears_down() {
        let mut overlay =
            AlertOverlay::new(FakeBackend::failing_at(Stage::Draw(10)), instant_fade());

        assert!(overlay.present("alert", Path::new("/nonexistent.png"), FALLBACK).is_none());
        assert_eq!(overlay.backend.draws.len(), 10);
        assert_eq!(
            overlay.backend.released,
            vec![Resource::Renderer, Resource::Window, Resource::Video]
        );
    }

    #[test]
    fn test_session_teardown_is_single() {
        let mut backend = FakeBackend::default();
        {
            let mut session = OverlaySession::new(&mut backend);
            session.init_video().unwrap();
            session.teardown();
            assert_eq!(session.state(), OverlayState::TornDown);
        }
        assert_eq!(backend.released, vec![Resource::Video]);
    }
}
