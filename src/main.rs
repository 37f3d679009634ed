//! League portal command-line front end.
//!
//! Usage:
//!   league login
//!   league logout
//!   league whoami
//!   league watch
//!   league profile set [--name <in-game name>] [--handle <handle>] [--position <pos>]
//!   league teams
//!   league players [--search <text>] [--position <pos>] [--team <All|Free Agent|team-id>]
//!   league player <player-id>
//!   league admin pending|managers
//!   league admin approve|reject --player <player-id>
//!   league admin assign-manager --player <player-id> --team <team-id>
//!   league admin remove-manager --id <assignment-id>
//!   league manager roster|free-agents
//!   league manager sign --player <player-id> --team <team-id>
//!   league manager stats --player <player-id> [--goals N] [--assists N] [--rating X]

use std::env;
use std::sync::Arc;

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use league_portal::auth::{GoTrueClient, IdentityProvider, start_refresh_task};
use league_portal::config::Config;
use league_portal::db::{LeagueStore, RestStore};
use league_portal::error::{AppError, AppResult};
use league_portal::models::{POSITIONS, PlayerFilter, ProfileUpdate, StatLine, TeamFilter};
use league_portal::services::{CallbackListener, ConsoleNotifier, Notifier};
use league_portal::session::{Access, SessionReader, SessionResolver, SessionState};
use league_portal::views::{
    AdminPanel, ManagerPanel, PlayerProfileView, PlayersDirectory, TeamsDirectory, nav_links,
};

/// Wired-up client: provider, store, notifier and the session resolver.
struct Portal {
    config: Config,
    provider: Arc<GoTrueClient>,
    store: Arc<dyn LeagueStore>,
    notifier: Arc<dyn Notifier>,
    resolver: Arc<SessionResolver>,
}

impl Portal {
    async fn connect(config: Config) -> AppResult<Self> {
        let provider = Arc::new(GoTrueClient::new(&config)?);
        let store: Arc<dyn LeagueStore> =
            Arc::new(RestStore::connect(&config.backend, provider.clone())?);
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
        let resolver = SessionResolver::new(provider.clone(), store.clone(), notifier.clone());

        if let Err(e) = resolver.start().await {
            warn!("Continuing signed out: {}", e);
        }

        Ok(Self {
            config,
            provider,
            store,
            notifier,
            resolver,
        })
    }

    fn session(&self) -> Arc<dyn SessionReader> {
        self.resolver.clone()
    }
}

#[actix_web::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || matches!(args[1].as_str(), "help" | "--help" | "-h") {
        print_usage();
        std::process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, LEAGUE_SUPABASE_URL and LEAGUE_SUPABASE_ANON_KEY must be set");
            std::process::exit(1);
        }
    };

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode against {}", config.backend.url);
    }

    let portal = match Portal::connect(config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args[1].as_str() {
        "login" => login(&portal).await,
        "logout" => portal.resolver.sign_out().await,
        "whoami" => {
            whoami(&portal).await;
            Ok(())
        }
        "watch" => watch(&portal).await,
        "profile" => profile(&portal, &args[2..]).await,
        "teams" => teams(&portal).await,
        "players" => players(&portal, &args[2..]).await,
        "player" => player(&portal, &args[2..]).await,
        "admin" => admin(&portal, &args[2..]).await,
        "manager" => manager(&portal, &args[2..]).await,
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    portal.resolver.shutdown();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("League portal");
    println!();
    println!("Usage:");
    println!("  league login                      Sign in through the browser");
    println!("  league logout                     Sign out locally and upstream");
    println!("  league whoami                     Show the session, profile and roles");
    println!("  league watch                      Keep the session fresh and print changes");
    println!("  league profile set [--name N] [--handle H] [--position P]");
    println!("  league teams                      List teams with managers and rosters");
    println!("  league players [--search S] [--position P] [--team All|'Free Agent'|<team-id>]");
    println!("  league player <player-id>         Show one player's profile");
    println!("  league admin pending|managers");
    println!("  league admin approve|reject --player <id>");
    println!("  league admin assign-manager --player <id> --team <id>");
    println!("  league admin remove-manager --id <assignment-id>");
    println!("  league manager roster|free-agents");
    println!("  league manager sign --player <id> --team <id>");
    println!("  league manager stats --player <id> [--goals N] [--assists N] [--rating X]");
    println!();
    println!("Positions: {}", POSITIONS.join(", "));
}

/// Value following any of `names`.
fn flag(args: &[String], names: &[&str]) -> Option<String> {
    args.windows(2)
        .find(|pair| names.contains(&pair[0].as_str()))
        .map(|pair| pair[1].clone())
}

fn required(args: &[String], names: &[&str]) -> AppResult<String> {
    flag(args, names).ok_or_else(|| AppError::InvalidInput(format!("{} is required", names[0])))
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("{} must be a number, got '{}'", what, value)))
}

fn parse_position(value: &str) -> AppResult<String> {
    let upper = value.to_uppercase();
    if POSITIONS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(AppError::InvalidInput(format!(
            "Unknown position '{}' (expected one of {})",
            value,
            POSITIONS.join(", ")
        )))
    }
}

async fn login(portal: &Portal) -> AppResult<()> {
    let auth = &portal.config.auth;
    let listener = CallbackListener::bind(&auth.callback_host, auth.callback_port)?;
    let url = portal.resolver.begin_sign_in(auth.provider)?;

    println!("Open this URL in your browser to sign in with {}:", auth.provider);
    println!();
    println!("  {}", url);
    println!();

    let code = listener.wait().await?;
    portal.resolver.complete_sign_in(&code).await?;
    whoami(portal).await;
    Ok(())
}

fn describe(state: &SessionState) {
    match state {
        SessionState::Unknown => println!("Session: unknown"),
        SessionState::SignedOut => println!("Not signed in"),
        SessionState::SignedIn {
            identity,
            profile,
            roles,
        } => {
            println!("Signed in as {}", identity.id);
            if let Some(profile) = profile {
                println!("  Handle:   {}", profile.discord_username);
                println!("  Name:     {}", profile.pro_clubs_name);
                println!("  Position: {}", profile.position);
            }
            match roles {
                Some(flags) => {
                    println!("  Admin:    {}", flags.is_admin);
                    println!("  Manager:  {}", flags.is_manager);
                }
                None => println!("  Roles:    resolving"),
            }
        }
    }
}

async fn whoami(portal: &Portal) {
    let state = portal.resolver.settled().await;
    describe(&state);

    let menu: Vec<&str> = nav_links(portal.resolver.as_ref())
        .iter()
        .map(|link| link.label)
        .collect();
    println!("Menu: {}", menu.join(" | "));
}

async fn watch(portal: &Portal) -> AppResult<()> {
    let auth = &portal.config.auth;
    let provider: Arc<dyn IdentityProvider> = portal.provider.clone();
    let refresh = start_refresh_task(provider, auth.refresh_interval, auth.refresh_margin);

    let mut changes = portal.resolver.subscribe();
    describe(&changes.borrow_and_update().clone());
    info!("Watching session, press Ctrl-C to stop");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                println!("---");
                describe(&state);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    refresh.abort();
    Ok(())
}

async fn profile(portal: &Portal, args: &[String]) -> AppResult<()> {
    if args.first().map(String::as_str) != Some("set") {
        return Err(AppError::InvalidInput("Usage: league profile set [--name N] [--handle H] [--position P]".to_string()));
    }

    let update = ProfileUpdate {
        pro_clubs_name: flag(args, &["--name", "-n"]),
        discord_username: flag(args, &["--handle"]),
        position: flag(args, &["--position", "-p"])
            .map(|p| parse_position(&p))
            .transpose()?,
        ..Default::default()
    };
    if update.is_empty() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }

    portal.resolver.settled().await;
    let profile = portal.resolver.update_profile(&update).await?;
    println!(
        "{} ({}) - {}",
        profile.display_name(),
        profile.discord_username,
        profile.position
    );
    Ok(())
}

async fn teams(portal: &Portal) -> AppResult<()> {
    let directory = TeamsDirectory::new(portal.store.clone());
    directory.load().await?;

    for detail in directory.teams() {
        println!("{} [{}]", detail.team.name, detail.team.id);
        match detail.manager {
            Some(ref manager) => println!(
                "  Manager: {} ({})",
                manager.pro_clubs_name, manager.discord_username
            ),
            None => println!("  Manager: none"),
        }
        println!("  Players: {}", detail.player_count());
        for player in &detail.players {
            println!(
                "    {:<4} {} ({})",
                player.position, player.pro_clubs_name, player.discord_username
            );
        }
    }
    Ok(())
}

async fn players(portal: &Portal, args: &[String]) -> AppResult<()> {
    let directory = PlayersDirectory::new(portal.store.clone());
    directory.load().await?;

    let filter = PlayerFilter {
        search: flag(args, &["--search", "-s"]).unwrap_or_default(),
        position: flag(args, &["--position", "-p"])
            .filter(|p| p != "All")
            .map(|p| parse_position(&p))
            .transpose()?,
        team: flag(args, &["--team", "-t"])
            .map(|t| TeamFilter::parse(&t))
            .unwrap_or_default(),
    };

    let visible = directory.visible(&filter);
    for listing in &visible {
        let team = listing
            .team
            .as_ref()
            .map(|t| t.name.as_str())
            .unwrap_or("Free Agent");
        println!(
            "{:<4} {:<24} {:<20} {:<20} G{} A{} R{:.1}",
            listing.profile.position,
            listing.profile.display_name(),
            listing.profile.discord_username,
            team,
            listing.profile.goals,
            listing.profile.assists,
            listing.profile.average_rating
        );
    }
    println!(
        "Showing {} of {} players",
        visible.len(),
        directory.players().len()
    );
    Ok(())
}

async fn player(portal: &Portal, args: &[String]) -> AppResult<()> {
    let Some(player_id) = args.first() else {
        return Err(AppError::InvalidInput("Usage: league player <player-id>".to_string()));
    };

    let view = PlayerProfileView::new(portal.store.clone());
    match view.load(player_id).await? {
        Some(profile) => {
            println!("{}", profile.display_name());
            println!("  Handle:   {}", profile.discord_username);
            println!("  Position: {}", profile.position);
            println!("  Goals:    {}", profile.goals);
            println!("  Assists:  {}", profile.assists);
            println!("  Rating:   {:.1}", profile.average_rating);
        }
        None => println!("Player not found"),
    }
    Ok(())
}

fn check_access(access: Access, role: &str) -> AppResult<()> {
    match access {
        Access::Granted => Ok(()),
        Access::Loading => Err(AppError::Unauthorized("Session is still loading".to_string())),
        Access::Denied => Err(AppError::Unauthorized(format!("{} role required", role))),
    }
}

async fn admin(portal: &Portal, args: &[String]) -> AppResult<()> {
    portal.resolver.settled().await;
    let panel = AdminPanel::new(portal.store.clone(), portal.session(), portal.notifier.clone());
    check_access(panel.load().await?, "admin")?;

    match args.first().map(String::as_str) {
        Some("pending") | None => {
            let data = panel.data();
            if data.free_agents.is_empty() {
                println!("No pending free agents");
            }
            for agent in data.free_agents {
                println!(
                    "{} {:<4} {} ({})",
                    agent.id, agent.position, agent.pro_clubs_name, agent.discord_username
                );
            }
        }
        Some("managers") => {
            for m in panel.data().managers {
                println!(
                    "{} {} ({}) -> {}",
                    m.id, m.pro_clubs_name, m.discord_username, m.team_name
                );
            }
        }
        Some("approve") => {
            panel
                .approve_free_agent(&required(args, &["--player", "-p"])?)
                .await?
        }
        Some("reject") => {
            panel
                .reject_free_agent(&required(args, &["--player", "-p"])?)
                .await?
        }
        Some("assign-manager") => {
            let player_id = required(args, &["--player", "-p"])?;
            let team_id = required(args, &["--team", "-t"])?;
            panel.assign_manager(&player_id, &team_id).await?
        }
        Some("remove-manager") => panel.remove_manager(&required(args, &["--id", "-i"])?).await?,
        Some(other) => {
            return Err(AppError::InvalidInput(format!("Unknown admin command: {}", other)));
        }
    }
    Ok(())
}

async fn manager(portal: &Portal, args: &[String]) -> AppResult<()> {
    portal.resolver.settled().await;
    let panel = ManagerPanel::new(portal.store.clone(), portal.session(), portal.notifier.clone());
    check_access(panel.load().await?, "manager")?;

    match args.first().map(String::as_str) {
        Some("roster") | None => {
            for team in panel.data().teams {
                println!("{} [{}]", team.name, team.id);
                for p in team.players {
                    println!(
                        "  {} {:<4} {:<24} G{} A{} R{:.1}",
                        p.id, p.position, p.pro_clubs_name, p.goals, p.assists, p.average_rating
                    );
                }
            }
        }
        Some("free-agents") => {
            for agent in panel.data().free_agents {
                println!(
                    "{} {:<4} {} ({})",
                    agent.id, agent.position, agent.pro_clubs_name, agent.discord_username
                );
            }
        }
        Some("sign") => {
            let player_id = required(args, &["--player", "-p"])?;
            let team_id = required(args, &["--team", "-t"])?;
            panel.sign_player(&player_id, &team_id).await?
        }
        Some("stats") => {
            let player_id = required(args, &["--player", "-p"])?;
            let current = panel
                .data()
                .stats_of(&player_id)
                .ok_or_else(|| AppError::NotFound(format!("Player {} on your teams", player_id)))?;

            let stats = StatLine {
                goals: match flag(args, &["--goals", "-g"]) {
                    Some(v) => parse_number(&v, "goals")?,
                    None => current.goals,
                },
                assists: match flag(args, &["--assists", "-a"]) {
                    Some(v) => parse_number(&v, "assists")?,
                    None => current.assists,
                },
                average_rating: match flag(args, &["--rating", "-r"]) {
                    Some(v) => parse_number(&v, "rating")?,
                    None => current.average_rating,
                },
            };
            panel.update_stats(&player_id, stats).await?
        }
        Some(other) => {
            return Err(AppError::InvalidInput(format!("Unknown manager command: {}", other)));
        }
    }
    Ok(())
}
