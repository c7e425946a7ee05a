//! Headless driver
//!
//! Runs the simulation core against a logging host with a simulated 60 Hz
//! clock and a simple autopilot, then prints a run summary.
//!
//! Usage: `prompty-arcade [settings.json] [frames]`

use prompty_arcade::consts::FRAME_MS;
use prompty_arcade::error::HostError;
use prompty_arcade::settings::Settings;
use prompty_arcade::sim::{
    FrameLoop, FrameToken, GamePhase, GameState, Host, Simulation, SoundCue, TickInput,
};

const DEFAULT_FRAMES: u64 = 60 * 60 * 3;

/// Host that logs collaborator requests and hands frames back to `main`
#[derive(Default)]
struct HeadlessHost {
    pending: Option<FrameToken>,
    sounds: u64,
    levels_completed: Vec<u32>,
    final_score: Option<u64>,
}

impl Host for HeadlessHost {
    fn request_frame(&mut self, token: FrameToken) {
        self.pending = Some(token);
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }

    fn render(&mut self, _state: &GameState) -> Result<(), HostError> {
        Ok(())
    }

    fn play_sound(&mut self, cue: SoundCue) -> Result<(), HostError> {
        self.sounds += 1;
        log::trace!("sound: {}", cue.name());
        Ok(())
    }

    fn show_level_complete(&mut self, level: u32) -> Result<(), HostError> {
        log::info!("LEVEL {level} COMPLETE!");
        self.levels_completed.push(level);
        Ok(())
    }

    fn show_game_over(&mut self, score: u64) -> Result<(), HostError> {
        log::info!("GAME OVER - final score {score}");
        self.final_score = Some(score);
        Ok(())
    }
}

/// Chase the nearest target horizontally and keep firing
fn autopilot(state: &GameState, now_ms: f64) -> TickInput {
    let avatar_x = state.avatar.pos.x + state.avatar.size.x / 2.0;
    let target_x = state
        .boss
        .as_ref()
        .filter(|b| !b.is_defeated)
        .map(|b| b.pos.x + b.size.x / 2.0)
        .or_else(|| {
            state
                .customers
                .iter()
                .map(|c| c.pos.x + c.size.x / 2.0)
                .min_by(|a, b| (a - avatar_x).abs().total_cmp(&(b - avatar_x).abs()))
        })
        .unwrap_or(state.width / 2.0);

    TickInput {
        now_ms,
        left: target_x < avatar_x - 4.0,
        right: target_x > avatar_x + 4.0,
        shoot: true,
        ..Default::default()
    }
}

fn run(settings: Settings, frames: u64) {
    let seed = settings.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    });
    log::info!("Game initialized with seed: {}", seed);

    let sim = Simulation::with_seed(settings.clone(), seed);
    let mut frame_loop = FrameLoop::new(sim, &settings);
    let mut host = HeadlessHost::default();
    frame_loop.start(&mut host);

    let mut now_ms = 0.0;
    let mut frame = 0;
    while frame < frames {
        let Some(token) = host.pending.take() else {
            break;
        };
        now_ms += FRAME_MS;
        let input = autopilot(frame_loop.sim().state(), now_ms);
        frame_loop.on_frame(token, now_ms, &input, &mut host);
        frame += 1;
    }

    let state = frame_loop.sim().state();
    let stats = frame_loop.stats();
    println!("Frames:              {frame}");
    println!("Ticks:               {}", stats.ticks);
    println!("Faults:              {}", stats.faults);
    println!("Budget overruns:     {}", stats.overruns);
    println!(
        "Phase:               {}",
        if state.phase == GamePhase::GameOver {
            "game over"
        } else {
            "playing"
        }
    );
    println!("Score:               {}", state.score);
    println!("Level:               {}", state.level);
    println!("Lives:               {}", state.lives);
    println!("Customers converted: {}", state.customers_converted);
    println!("Bosses defeated:     {}", state.bosses_defeated);
    println!("Best combo:          {}", state.combo.max_combo);
    println!("Levels completed:    {:?}", host.levels_completed);
    println!("Sound cues:          {}", host.sounds);
    if let Some(score) = host.final_score {
        println!("Final score:         {score}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Prompty Arcade (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load(&path),
        None => Settings::default(),
    };
    let frames = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    run(settings, frames);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Web hosts drive `FrameLoop` directly; nothing to do here
    let _ = run;
}
