mod apu;
mod audio;
mod cartridge;
mod console;
mod cpu;
mod cpu_bus;
mod dma;
mod eventloop;
mod interrupts;
mod keypad;
mod ppu;
mod ppu_bus;
mod ram;
mod rom;
mod screen;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let mut rom_path = None;
    let mut video_scale = 2.0;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-scale" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse::<f32>().ok()) {
                    video_scale = value;
                }
                i += 2;
            }
            arg if !arg.starts_with('-') => {
                rom_path = Some(arg.to_string());
                i += 1;
            }
            arg => {
                eprintln!("Warning: Unknown flag {arg} ignored");
                i += 1;
            }
        }
    }
    let rom_path = rom_path.ok_or("Usage: famicore <rom.nes> [-scale N]")?;

    let rom_data = std::fs::read(&rom_path)?;
    let cart = cartridge::Cartridge::new(&rom_data)?;

    let mut event_loop = eventloop::EventLoop::new(false, video_scale)?;
    let sdl_audio = audio::SdlAudio::new(event_loop.sdl_context(), 44100)?;
    sdl_audio.resume();

    let mut console = console::Console::new(cart, Box::new(sdl_audio.sink()));
    console.reset();

    event_loop.run(&mut console).map_err(|e| e.into())
}
