mod config;

use anyhow::{Result, anyhow};
use osu_api::{BeatmapQuery, IdMode, OsuApi, Params, Score, ScoreQuery, User, UserRef};

use crate::config::{Command, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("osu_api={}", config.log_level).parse()?),
        )
        .init();

    let api = OsuApi::builder()
        .config(config.client.clone())
        .build(config.key.as_str())?;

    run(&api, config.command).await?;

    tracing::debug!("Next call id: {:x}", api.next_call_id());
    Ok(())
}

async fn run(api: &OsuApi, command: Command) -> Result<()> {
    match command {
        Command::User {
            user,
            mode,
            id,
            event_days,
        } => {
            let user = api
                .get_user(user, mode, Some(id_mode(id)), event_days)
                .await?;
            print_user(&user);
        }
        Command::Beatmaps {
            since,
            set,
            beatmap,
            user,
            mode,
            converted,
            hash,
            limit,
        } => {
            let beatmaps = api
                .get_beatmaps(BeatmapQuery {
                    since,
                    beatmapset: set,
                    beatmap,
                    user: user.map(UserRef::from),
                    id_mode: None,
                    mode,
                    include_converted: converted,
                    hash,
                    limit,
                })
                .await?;
            for beatmap in &beatmaps {
                println!(
                    "{} - {} [{}] {:.2}* {} {}",
                    beatmap.artist,
                    beatmap,
                    beatmap.version,
                    beatmap.difficulty.stars,
                    beatmap.mode,
                    beatmap.approved
                );
            }
            println!("{} beatmap(s)", beatmaps.len());
        }
        Command::Scores {
            beatmap,
            user,
            mode,
            mods,
            limit,
        } => {
            let mut query = ScoreQuery::new(beatmap);
            query.user = user.map(UserRef::from);
            query.mode = mode;
            query.mods = mods;
            query.limit = limit;
            print_scores(&api.get_scores(query).await?);
        }
        Command::Best {
            user,
            mode,
            id,
            limit,
        } => {
            let scores = api
                .get_user_best(user, mode, Some(id_mode(id)), limit)
                .await?;
            print_scores(&scores);
        }
        Command::Recent {
            user,
            mode,
            id,
            limit,
        } => {
            let scores = api
                .get_user_recent(user, mode, Some(id_mode(id)), limit)
                .await?;
            print_scores(&scores);
        }
        Command::Replay {
            beatmap,
            user,
            mode,
            id,
            mods,
        } => {
            let replay = api
                .get_replay(beatmap, user, mode, Some(id_mode(id)), mods)
                .await?;
            println!("{}", replay.encoding);
            println!("{}", replay.content);
        }
        Command::Raw { endpoint, params } => {
            let params = raw_params(&params)?;
            let body = api.call(&endpoint, params).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn id_mode(id: bool) -> IdMode {
    if id { IdMode::Id } else { IdMode::String }
}

fn raw_params(pairs: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected NAME=VALUE, got {pair:?}"))?;
        params.insert(name.to_string(), value.into());
    }
    Ok(params)
}

fn print_user(user: &User) {
    println!("{}", user);
    if let Some(hits) = &user.hit_counts {
        println!(
            "300: {}  100: {}  50: {}",
            hits.count300, hits.count100, hits.count50
        );
    }
    println!("playcount: {}", optional(user.playcount));
    println!("ranked score: {}", optional(user.ranked_score));
    println!("total score: {}", optional(user.total_score));
    println!("level: {}", optional(user.level));
    println!("rank: {}", optional(user.rank));
    println!("pp: {}", optional(user.pp));
    println!(
        "accuracy: {}",
        optional(user.accuracy.map(|a| format!("{:.2}%", a * 100.0)))
    );
    if let Some(ranks) = &user.rank_counts {
        println!(
            "SS: {} ({})  S: {} ({})  A: {}",
            ranks.ss, ranks.ssh, ranks.s, ranks.sh, ranks.a
        );
    }
    println!("country: {} #{}", user.country, optional(user.country_rank));
    for event in &user.events {
        println!("  {} {}", event.date, event.display_html);
    }
}

fn print_scores(scores: &[Score]) {
    for score in scores {
        let who = score
            .username
            .clone()
            .unwrap_or_else(|| score.user_id.to_string());
        println!(
            "{:>10} {:<3} {}x {} {}",
            score.score,
            score.rank,
            score.max_combo,
            who,
            score.pp.map(|pp| format!("{pp:.1}pp")).unwrap_or_default()
        );
    }
    println!("{} score(s)", scores.len());
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
