use dotenv::dotenv;
use gymcraft::config::{AdapterConfig, ScenarioKind};
use gymcraft::env::{CombatEnv, EpisodeStats, Scenario};
use gymcraft::infra::TcpConnector;
use gymcraft::scenarios::{DuelScenario, SquadScenario};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn get_env_var_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|val| val.parse::<usize>().ok())
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gymcraft=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

/// Plays `episodes` episodes with uniformly random actions.
async fn play<S: Scenario>(
    env: &mut CombatEnv<S, TcpConnector>,
    episodes: usize,
    rng: &mut StdRng,
) -> gymcraft::Result<EpisodeStats> {
    let actions = env.action_space();
    let mut stats = EpisodeStats::new(100);

    for _ in 0..episodes {
        env.reset().await?;
        loop {
            let result = env.step(&actions.sample(rng)).await?;
            stats.record_step(&result.reward);
            if let Some(outcome) = result.info.outcome {
                stats.record_episode(outcome, result.info.steps);
                break;
            }
        }
    }

    Ok(stats)
}

async fn run<S: Scenario>(
    config: &AdapterConfig,
    scenario: S,
    episodes: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Running {} episodes of {} ({} agents vs {} enemies, self play: {})",
        episodes,
        scenario.name(),
        scenario.agent_count(),
        scenario.enemy_count(),
        config.self_play
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };
    let mut env = CombatEnv::launch(config, scenario).await?;

    let played = play(&mut env, episodes, &mut rng).await;
    env.close().await?;
    let stats = played?;

    info!("Episodes: {}", stats.episodes);
    info!("Wins: {}", stats.wins);
    info!("Timeouts: {}", stats.timeouts);
    info!("Win rate: {:.3}", stats.overall_win_rate());
    info!("Average return (last {}): {:.3}", stats.rewards.len(), stats.rewards.mean());
    info!("Average length (last {}): {:.1}", stats.lengths.len(), stats.lengths.mean());
    if let (Some(worst), Some(best)) = (stats.rewards.min(), stats.rewards.max()) {
        info!("Return range: {:.3} .. {:.3}", worst, best);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    init_logging();

    let config = AdapterConfig::from_env()?;
    let episodes = get_env_var_usize("GYMCRAFT_EPISODES").unwrap_or(50);

    match config.scenario {
        ScenarioKind::Duel => run(&config, DuelScenario::new(), episodes).await,
        ScenarioKind::Squad => run(&config, SquadScenario::from_config(&config), episodes).await,
    }
}
