// token-vault/src/fingerprint.rs
//! Environment fingerprinting.
//!
//! A fingerprint is a short base-36 string folded from stable properties of
//! the environment the token is cached in. It is never persisted as raw
//! components, only as the folded hash. Every capability that may be missing
//! has a fixed sentinel so computing a fingerprint cannot fail.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

pub const NO_DOCUMENT: &str = "no-document";
pub const NO_CANVAS: &str = "no-canvas";
pub const NO_WEBGL: &str = "no-webgl";
pub const CANVAS_ERROR: &str = "canvas-error";
pub const WEBGL_ERROR: &str = "webgl-error";
pub const NO_NAVIGATOR: &str = "no-navigator";
pub const NO_SCREEN: &str = "no-screen";

/// Text drawn on the canvas probe
pub const CANVAS_PROBE_TEXT: &str = "Zenow fingerprint \u{1F512}";
pub const CANVAS_PROBE_FONT: &str = "14px Arial";
/// Side of the square pixel region sampled from the canvas probe
pub const CANVAS_SAMPLE_SIZE: u32 = 10;

const COMPONENT_SEPARATOR: &str = "|";

/// A capability exists but failed while probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigatorInfo {
    pub user_agent: String,
    pub language: String,
    pub platform: String,
    pub hardware_concurrency: u32,
    pub cookie_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebGlParameter {
    Renderer,
    Vendor,
    Version,
}

/// 2D drawing surface used for the canvas probe
pub trait CanvasSurface {
    /// Draw `text` in `font` and return the RGBA bytes of the top-left
    /// `CANVAS_SAMPLE_SIZE` x `CANVAS_SAMPLE_SIZE` region.
    fn render_text_sample(&self, text: &str, font: &str) -> Result<Vec<u8>, ProbeError>;
}

pub trait WebGlContext {
    fn parameter(&self, param: WebGlParameter) -> Result<String, ProbeError>;
}

pub trait Document {
    fn canvas_2d(&self) -> Option<&dyn CanvasSurface>;
    fn webgl(&self) -> Option<&dyn WebGlContext>;
}

/// Everything a fingerprint is computed from
pub trait Environment {
    fn navigator(&self) -> Option<NavigatorInfo>;
    fn screen(&self) -> Option<ScreenInfo>;
    /// Minutes to add to local time to get UTC (positive west of Greenwich)
    fn timezone_offset_minutes(&self) -> i32;
    fn document(&self) -> Option<&dyn Document>;
}

/// Source of the current session fingerprint
pub trait FingerprintProvider {
    fn session_id(&self) -> String;
}

impl<P: FingerprintProvider + ?Sized> FingerprintProvider for Arc<P> {
    fn session_id(&self) -> String {
        (**self).session_id()
    }
}

/// Fold `input` into a short base-36 string.
///
/// 32-bit `h = h * 31 + c` over UTF-16 code units, then the absolute value.
/// Not cryptographic; only used to shorten and mix the fingerprint components.
pub fn simple_hash(input: &str) -> String {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit));
    }
    to_base36(hash.unsigned_abs())
}

fn to_base36(mut n: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.extend(std::char::from_digit(n % 36, 36));
        n /= 36;
    }
    digits.iter().rev().collect()
}

pub fn canvas_fingerprint(env: &dyn Environment) -> String {
    let document = match env.document() {
        Some(document) => document,
        None => return NO_DOCUMENT.to_string(),
    };
    let canvas = match document.canvas_2d() {
        Some(canvas) => canvas,
        None => return NO_CANVAS.to_string(),
    };

    match canvas.render_text_sample(CANVAS_PROBE_TEXT, CANVAS_PROBE_FONT) {
        Ok(pixels) => {
            let joined = pixels
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(",");
            simple_hash(&joined)
        }
        Err(ProbeError(reason)) => {
            tracing::debug!("Canvas probe failed: {}", reason);
            CANVAS_ERROR.to_string()
        }
    }
}

pub fn webgl_fingerprint(env: &dyn Environment) -> String {
    let document = match env.document() {
        Some(document) => document,
        None => return NO_DOCUMENT.to_string(),
    };
    let gl = match document.webgl() {
        Some(gl) => gl,
        None => return NO_WEBGL.to_string(),
    };

    let read = || -> Result<String, ProbeError> {
        let renderer = gl.parameter(WebGlParameter::Renderer)?;
        let vendor = gl.parameter(WebGlParameter::Vendor)?;
        let version = gl.parameter(WebGlParameter::Version)?;
        Ok(format!("{}~{}~{}", renderer, vendor, version))
    };

    match read() {
        Ok(info) => simple_hash(&info),
        Err(ProbeError(reason)) => {
            tracing::debug!("WebGL probe failed: {}", reason);
            WEBGL_ERROR.to_string()
        }
    }
}

/// The unhashed component string a fingerprint is folded from
pub fn combined_components(env: &dyn Environment) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(9);

    match env.navigator() {
        Some(nav) => {
            parts.push(nav.user_agent);
            parts.push(nav.language);
        }
        None => {
            parts.push(NO_NAVIGATOR.to_string());
            parts.push(NO_NAVIGATOR.to_string());
        }
    }

    parts.push(match env.screen() {
        Some(screen) => format!("{}x{}", screen.width, screen.height),
        None => NO_SCREEN.to_string(),
    });

    parts.push(env.timezone_offset_minutes().to_string());

    match env.navigator() {
        Some(nav) => {
            parts.push(nav.hardware_concurrency.to_string());
            parts.push(nav.platform);
            parts.push(nav.cookie_enabled.to_string());
        }
        None => parts.extend(std::iter::repeat(NO_NAVIGATOR.to_string()).take(3)),
    }

    parts.push(canvas_fingerprint(env));
    parts.push(webgl_fingerprint(env));

    parts.join(COMPONENT_SEPARATOR)
}

/// Fingerprint provider bound to one environment.
///
/// The fingerprint is computed on first use and reused afterwards, so
/// repeated calls within one validator always agree.
pub struct SessionValidator<E> {
    env: E,
    session_id: OnceLock<String>,
}

impl<E: Environment> SessionValidator<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            session_id: OnceLock::new(),
        }
    }

    pub fn generate_session_id(&self) -> String {
        self.session_id
            .get_or_init(|| {
                let id = simple_hash(&combined_components(&self.env));
                tracing::debug!("Computed session fingerprint {}", id);
                id
            })
            .clone()
    }

    /// Exact comparison; any drift in the environment invalidates the session
    pub fn validate_session(&self, stored: &str) -> bool {
        stored == self.generate_session_id()
    }

    pub fn environment(&self) -> &E {
        &self.env
    }
}

impl<E: Environment> FingerprintProvider for SessionValidator<E> {
    fn session_id(&self) -> String {
        self.generate_session_id()
    }
}

/// What a headless process can observe about itself.
///
/// There is no document, so both rendering probes report `no-document`.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment;

impl Environment for HostEnvironment {
    fn navigator(&self) -> Option<NavigatorInfo> {
        let hardware_concurrency = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        let language = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(|l| l.replace('_', "-")))
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| "en-US".to_string());

        Some(NavigatorInfo {
            user_agent: format!(
                "{}/{} ({})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            language,
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            hardware_concurrency,
            cookie_enabled: false,
        })
    }

    fn screen(&self) -> Option<ScreenInfo> {
        None
    }

    fn timezone_offset_minutes(&self) -> i32 {
        let local_minus_utc = chrono::Local::now().offset().local_minus_utc();
        -(local_minus_utc / 60)
    }

    fn document(&self) -> Option<&dyn Document> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebGlInfo {
    pub renderer: String,
    pub vendor: String,
    pub version: String,
}

/// Recorded rendering capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDocument {
    #[serde(default)]
    pub canvas_sample: Option<Vec<u8>>,
    #[serde(default)]
    pub webgl: Option<WebGlInfo>,
}

impl CanvasSurface for StaticDocument {
    fn render_text_sample(&self, _text: &str, _font: &str) -> Result<Vec<u8>, ProbeError> {
        self.canvas_sample
            .clone()
            .ok_or_else(|| ProbeError("no recorded canvas sample".to_string()))
    }
}

impl WebGlContext for StaticDocument {
    fn parameter(&self, param: WebGlParameter) -> Result<String, ProbeError> {
        let info = self
            .webgl
            .as_ref()
            .ok_or_else(|| ProbeError("no recorded webgl info".to_string()))?;
        Ok(match param {
            WebGlParameter::Renderer => info.renderer.clone(),
            WebGlParameter::Vendor => info.vendor.clone(),
            WebGlParameter::Version => info.version.clone(),
        })
    }
}

impl Document for StaticDocument {
    fn canvas_2d(&self) -> Option<&dyn CanvasSurface> {
        self.canvas_sample.as_ref().map(|_| self as &dyn CanvasSurface)
    }

    fn webgl(&self) -> Option<&dyn WebGlContext> {
        self.webgl.as_ref().map(|_| self as &dyn WebGlContext)
    }
}

/// A fixed environment snapshot, e.g. reported by a client or loaded from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEnvironment {
    #[serde(default)]
    pub navigator: Option<NavigatorInfo>,
    #[serde(default)]
    pub screen: Option<ScreenInfo>,
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    #[serde(default)]
    pub document: Option<StaticDocument>,
}

impl Environment for StaticEnvironment {
    fn navigator(&self) -> Option<NavigatorInfo> {
        self.navigator.clone()
    }

    fn screen(&self) -> Option<ScreenInfo> {
        self.screen
    }

    fn timezone_offset_minutes(&self) -> i32 {
        self.timezone_offset_minutes
    }

    fn document(&self) -> Option<&dyn Document> {
        self.document.as_ref().map(|d| d as &dyn Document)
    }
}
