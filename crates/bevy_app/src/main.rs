/*!
`chime`: headless playground run.

* Loads layered config (`assets/config/playground.ron` + `playground.local.ron`, or `--config`).
* Builds a scripted scene: a staircase of walls, a floor and a cadence dispenser.
* Steps the fixed schedule as fast as possible for `--seconds` of simulated time.
* Logs every note/bounce; `--json` also prints collision notifications and a summary as JSON.
*/

use std::path::PathBuf;
use std::time::Duration;

use anyhow::ensure;
use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::Parser;

use chime_app::sinks::{LogAnnouncer, LogAudio, LogHaptics};
use chime_app::{PlaygroundConfigRes, PlaygroundInput, PlaygroundPlugin, PlaygroundStats};
use chime_config::PlaygroundConfig;
use chime_core::{CollisionNotification, Feedback, Material, Voice};
use chime_gameplay::{ObstacleSpec, PlaygroundCommand, PlaygroundSession, WallOptions};

#[derive(Parser, Debug)]
#[command(name = "chime", about = "Headless musical physics playground")]
struct Cli {
    /// Config layer (repeatable; later layers override earlier ones).
    #[arg(long = "config", value_name = "PATH")]
    config: Vec<PathBuf>,
    /// Simulated seconds to run.
    #[arg(long, default_value_t = 10.0)]
    seconds: f32,
    /// Override the spawner RNG seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Print collision notifications and the final summary as JSON lines on stdout.
    #[arg(long)]
    json: bool,
}

/// Number of fixed ticks to run before exiting.
#[derive(Resource, Debug, Clone, Copy)]
struct TickBudget(u64);

fn load_config(cli: &Cli) -> PlaygroundConfig {
    let layers = if cli.config.is_empty() {
        vec![
            PathBuf::from("assets/config/playground.ron"),
            PathBuf::from("assets/config/playground.local.ron"),
        ]
    } else {
        cli.config.clone()
    };
    let (mut cfg, used, errors) = PlaygroundConfig::load_layered(&layers);
    for e in errors {
        warn!("CONFIG LOAD ISSUE: {e}");
    }
    if used.is_empty() {
        info!("No config layers found; using defaults");
    } else {
        info!(?used, "Config layers loaded");
    }
    if let Some(seed) = cli.seed {
        cfg.seed = Some(seed);
    }
    for w in cfg.validate() {
        warn!("CONFIG WARNING: {w}");
    }
    cfg
}

fn demo_scene(mut inputs: EventWriter<PlaygroundInput>) {
    let steps = [
        (Vec3::new(-1.5, 6.0, 0.0), Vec3::new(1.0, 5.2, 0.0), Voice::A),
        (Vec3::new(3.0, 4.2, 0.0), Vec3::new(0.0, 3.0, 0.0), Voice::B),
        (Vec3::new(-2.0, 2.0, 0.0), Vec3::new(2.0, 0.5, 0.0), Voice::A),
        (Vec3::new(4.5, -0.5, 0.0), Vec3::new(-1.0, -2.5, 0.0), Voice::B),
    ];
    for (i, (start, end, voice)) in steps.into_iter().enumerate() {
        inputs.write(PlaygroundInput(PlaygroundCommand::CreateWall {
            start,
            end,
            options: WallOptions {
                material: if i % 2 == 0 { Material::Wood } else { Material::Metal },
                voice: Some(voice),
                name: Some(format!("step {}", i + 1)),
                important: i == 0,
            },
        }));
    }
    inputs.write(PlaygroundInput(PlaygroundCommand::AddDispenser {
        position: Vec3::new(0.0, 8.0, 0.0),
        cadence: Some(0.5),
    }));
}

/// Whether `--json` was given.
#[derive(Resource, Debug, Clone, Copy)]
struct JsonOutput(bool);

fn exit_after_budget(
    stats: Res<PlaygroundStats>,
    budget: Res<TickBudget>,
    json: Res<JsonOutput>,
    session: Res<PlaygroundSession>,
    mut exit: EventWriter<AppExit>,
) {
    if stats.ticks < budget.0 {
        return;
    }
    info!(
        stats = ?*stats,
        walls = session.wall_count(),
        balls = session.ball_count(),
        "Run finished"
    );
    if json.0 {
        match serde_json::to_string(&*stats) {
            Ok(summary) => println!("{summary}"),
            Err(e) => warn!("run summary not serializable: {e}"),
        }
    }
    exit.write(AppExit::Success);
}

fn print_notifications(mut reader: EventReader<CollisionNotification>) {
    for notification in reader.read() {
        match serde_json::to_string(notification) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("notification not serializable: {e}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ensure!(
        cli.seconds.is_finite() && cli.seconds > 0.0,
        "--seconds must be a positive number, got {}",
        cli.seconds
    );

    let mut app = App::new();
    app.add_plugins(LogPlugin::default());
    let cfg = load_config(&cli);
    let hz = if cfg.physics.fixed_hz > 0.0 { cfg.physics.fixed_hz } else { 60.0 };
    let step = Duration::from_secs_f64(1.0 / hz as f64);
    let ticks = (cli.seconds * hz).ceil() as u64;
    info!(
        seconds = cli.seconds,
        ticks,
        seed = ?cfg.seed,
        ball_ball = ?cfg.physics.ball_ball,
        "Runtime summary"
    );

    let mut session = PlaygroundSession::new(cfg.clone()).with_feedback(
        Feedback::default()
            .with_audio(LogAudio)
            .with_haptics(LogHaptics)
            .with_announcer(LogAnnouncer),
    );
    session.add_obstacle(ObstacleSpec {
        center: Vec3::new(0.0, -6.0, 0.0),
        half_extents: Vec3::new(8.0, 0.25, cfg.walls.depth * 0.5),
        angle_z: 0.0,
        name: "floor".into(),
        material: Some(Material::Rubber),
        important: true,
    });

    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)))
        .insert_resource(TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(PlaygroundConfigRes(cfg))
        .insert_resource(session)
        .insert_resource(TickBudget(ticks))
        .insert_resource(JsonOutput(cli.json))
        .add_plugins(PlaygroundPlugin)
        .add_systems(Startup, demo_scene)
        .add_systems(Last, exit_after_budget);
    if cli.json {
        app.add_systems(PostUpdate, print_notifications);
    }

    match app.run() {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => anyhow::bail!("playground exited with code {code}"),
    }
}
