//! Process entry point: load configuration, build the shared process
//! singletons (Concurrency Governor, Host-Load Guard, session codec), wire
//! the Request Router, and serve HTTP.
//!
//! Startup sequencing and the `clap` CLI shape follow the teacher's
//! `main.rs`; the server body itself follows `liblaas::web::entry`.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use config::settings;
use dal::DbConnectParams;

#[derive(Parser, Debug)]
#[command(name = "switchyard", author, version, about = "Access-switch fleet management service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default when no subcommand is given).
    Server,
    /// Run the idle-session sweep once and exit, for cron-driven deployments
    /// that don't want the in-process sweeper task.
    SweepSessions,
}

fn init_tracing() {
    let subscriber = tracing_subscriber::fmt::fmt().with_max_level(settings().logging.max_level);

    if let Some(path) = settings().logging.log_file.clone() {
        let file = std::fs::File::create(&path).expect("couldn't open log file");
        let subscriber = subscriber.with_writer(std::sync::Mutex::new(file)).finish();
        tracing::subscriber::set_global_default(subscriber).expect("couldn't set up tracing");
    } else {
        tracing::subscriber::set_global_default(subscriber.finish())
            .expect("couldn't set up tracing");
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing();
    tracing::info!("tracing has been started");

    let settings = settings();

    let db = DbConnectParams {
        host: settings.database.url.host.clone(),
        port: settings.database.url.port,
        username: settings.database.username.clone(),
        password: settings.database.password.clone(),
        database_name: settings.database.database_name.clone(),
    };

    let session = Arc::new(auth::SessionCodec::new(
        &settings.session.signing_key,
        settings.session.idle_timeout(),
    ));

    match cli.command {
        Some(Command::SweepSessions) => {
            session.sweep();
            tracing::info!("session sweep complete");
            return;
        }
        Some(Command::Server) | None => {}
    }

    let governor = governor::ConcurrencyGovernor::new(
        settings.governor.global_slots,
        settings.governor.per_site_slots,
        settings.governor.per_switch_slots,
        settings.governor.commands_per_second,
        settings.governor.admission_deadline(),
    );

    let host_load = governor::HostLoadGuard::new(
        settings.host_load.ring_size,
        settings.host_load.yellow_threshold_pct,
        settings.host_load.red_threshold_pct,
    );
    let _sampler = host_load.spawn_sampler(settings.host_load.sample_interval(), governor.clone());
    let _sweeper = session.clone().spawn_sweeper(Duration::from_secs(60));

    let credential = models::Credential::new(
        settings.switch_credential.username.as_str(),
        settings.switch_credential.password.as_str(),
    );
    let connect_timeouts = switch_driver::ConnectTimeouts {
        handshake: settings.switch_credential.handshake_timeout(),
        command: settings.switch_credential.command_timeout(),
        session: settings.switch_credential.session_timeout(),
    };

    // Shared across both engines: a switch auto-probed once keeps its
    // resolved family for the rest of the process, regardless of which
    // engine happens to touch it next.
    let probe_cache = Arc::new(engine::ProbeCache::new());

    let trace_engine = Arc::new(engine::MacTraceEngine::new(
        governor.clone(),
        credential.clone(),
        connect_timeouts,
        Duration::from_secs(60),
        probe_cache.clone(),
    ));
    let vlan_engine = Arc::new(engine::VlanChangeEngine::new(
        governor.clone(),
        credential,
        connect_timeouts,
        settings.governor.admission_deadline(),
        probe_cache,
    ));

    let directory = settings.directory.clone().map(|cfg| Arc::new(auth::DirectoryClient::new(cfg)));

    let state: web::SharedState = Arc::new(web::AppState {
        db,
        session,
        host_load,
        trace_engine,
        vlan_engine,
        roles: settings.roles.clone(),
        directory,
    });

    let app = web::build_router(state);

    let bind_addr = settings.web.bind_addr.to_string();
    tracing::info!(%bind_addr, "binding HTTP listener");
    let addr = SocketAddr::from_str(&bind_addr).expect("web.bind_addr must be a valid host:port");

    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server exited with an error");
}
