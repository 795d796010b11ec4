use relictrail::game::Game;
use relictrail::{Pt, WindowConfig};

const SCREEN_WIDTH: u32 = 800;
const SCREEN_HEIGHT: u32 = 600;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    relictrail::run::<Game>(WindowConfig {
        title: "Relic Trail".to_string(),
        width: Pt::from(SCREEN_WIDTH),
        height: Pt::from(SCREEN_HEIGHT),
        resizable: false,
        // The game draws its own cursor sprite.
        cursor_visible: false,
    })
}
