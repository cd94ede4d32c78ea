mod palette;
mod ppu;
mod registers;
mod sprites;

pub use palette::PaletteRam;
pub use ppu::{FrameData, Ppu};
pub use registers::Registers;
pub use sprites::{SpriteGrid, SpriteWithAttribute, Tile, build_sprite_grid};
