//! The embedded asset set: every image and sound the game ships, decoded
//! once at startup. A decode failure here is fatal to the caller; there is
//! no fallback content.

use anyhow::Context as _;

use crate::{register_sound, Image, Pt};

const CURSOR_PNG: &[u8] = include_bytes!("../assets/cursor.png");
const CURSOR_HOVER_PNG: &[u8] = include_bytes!("../assets/cursor_hover.png");
const COURTYARD_BG_PNG: &[u8] = include_bytes!("../assets/courtyard_bg.png");
const COURTYARD_RELIC_PNG: &[u8] = include_bytes!("../assets/courtyard_relic.png");
const ARCHIVE_BG_PNG: &[u8] = include_bytes!("../assets/archive_bg.png");
const ARCHIVE_RELIC_PNG: &[u8] = include_bytes!("../assets/archive_relic.png");
const RELIQUARY_BG_PNG: &[u8] = include_bytes!("../assets/reliquary_bg.png");
const RELIQUARY_RELIC_PNG: &[u8] = include_bytes!("../assets/reliquary_relic.png");
const FINALE_BG_PNG: &[u8] = include_bytes!("../assets/finale_bg.png");
const TRANSITION_WAV: &[u8] = include_bytes!("../assets/transition.wav");
const CHIME_WAV: &[u8] = include_bytes!("../assets/chime.wav");

/// Art for one interactive scene.
pub struct SceneArt {
    pub name: &'static str,
    pub background: Image,
    pub relic: Image,
    pub relic_pos: (Pt, Pt),
}

pub struct Assets {
    pub cursor: Image,
    pub cursor_hover: Image,
    pub scenes: Vec<SceneArt>,
    pub finale_background: Image,
    pub transition: u32,
    pub chime: u32,
}

impl Assets {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            cursor: decode_image("cursor.png", CURSOR_PNG)?,
            cursor_hover: decode_image("cursor_hover.png", CURSOR_HOVER_PNG)?,
            scenes: vec![
                SceneArt {
                    name: "courtyard",
                    background: decode_image("courtyard_bg.png", COURTYARD_BG_PNG)?,
                    relic: decode_image("courtyard_relic.png", COURTYARD_RELIC_PNG)?,
                    relic_pos: (Pt(100.0), Pt(100.0)),
                },
                SceneArt {
                    name: "archive",
                    background: decode_image("archive_bg.png", ARCHIVE_BG_PNG)?,
                    relic: decode_image("archive_relic.png", ARCHIVE_RELIC_PNG)?,
                    relic_pos: (Pt(520.0), Pt(180.0)),
                },
                SceneArt {
                    name: "reliquary",
                    background: decode_image("reliquary_bg.png", RELIQUARY_BG_PNG)?,
                    relic: decode_image("reliquary_relic.png", RELIQUARY_RELIC_PNG)?,
                    relic_pos: (Pt(320.0), Pt(410.0)),
                },
            ],
            finale_background: decode_image("finale_bg.png", FINALE_BG_PNG)?,
            transition: register_sound(TRANSITION_WAV.to_vec())
                .context("decoding transition.wav")?,
            chime: register_sound(CHIME_WAV.to_vec()).context("decoding chime.wav")?,
        })
    }
}

/// PNG bytes -> RGBA8 -> GPU texture.
fn decode_image(name: &str, bytes: &[u8]) -> anyhow::Result<Image> {
    let decoded = image::load_from_memory(bytes)
        .with_context(|| format!("decoding {name}"))?
        .to_rgba8();
    let (width, height) = decoded.dimensions();
    Image::new_from_rgba8(Pt::from(width), Pt::from(height), decoded.as_raw())
        .with_context(|| format!("uploading {name}"))
}
