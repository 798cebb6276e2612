use cerastar_bm1::config::EmulatorConfig;
use cerastar_bm1::diag::HexDump;
use cerastar_bm1::{FurnaceEmulator, ProtocolHandler, SharedRamBlock};
use clap::{App, Arg};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = App::new("bm1-emulator")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Emulated BM1 bus-module RAM with a simulated Cerastar furnace")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("host")
                .long("host")
                .value_name("HOST")
                .help("Listen address for the command interface")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Listen port for the command interface")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("tick-ms")
                .long("tick-ms")
                .value_name("MS")
                .help("Furnace simulation period in milliseconds")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-furnace")
                .long("no-furnace")
                .help("Do not run the simulated furnace"),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => EmulatorConfig::from_file(path)?,
        None => EmulatorConfig::default(),
    };
    if let Some(host) = matches.value_of("host") {
        config.host = host.to_owned();
    }
    if let Some(port) = matches.value_of("port") {
        config.port = port.parse()?;
    }
    if let Some(tick) = matches.value_of("tick-ms") {
        config.tick_ms = tick.parse()?;
    }
    if matches.is_present("no-furnace") {
        config.simulate_furnace = false;
    }
    debug!("configuration: {:?}", config);

    let block = SharedRamBlock::new();
    if let Some(t) = config.initial_targets {
        block.set_targets(t.power, t.heating_c, t.hot_water_c, t.stop_pump)?;
    }
    info!("RAM block initialised:\n{}", block.with_block(|ram| HexDump::of(ram).to_string()));

    let furnace_task = if config.simulate_furnace {
        let furnace_block = block.clone();
        let tick_ms = config.tick_ms.max(1);
        Some(tokio::spawn(async move {
            run_furnace(furnace_block, tick_ms).await;
        }))
    } else {
        None
    };

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!("command interface listening on {}", config.listen_addr());

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("client connected: {}", addr);
                    let client_block = block.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, client_block).await {
                            warn!("client {} error: {}", addr, e);
                        }
                        info!("client {} disconnected", addr);
                    });
                }
                Err(e) => error!("failed to accept connection: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    if let Some(task) = furnace_task {
        task.abort();
    }
    Ok(())
}

async fn run_furnace(block: SharedRamBlock, tick_ms: u64) {
    let mut furnace = FurnaceEmulator::new(block);
    let mut interval = time::interval(Duration::from_millis(tick_ms));

    // the mainboard keeps probing until it finds the BM1 identity
    loop {
        interval.tick().await;
        match furnace.probe() {
            Ok(()) => break,
            Err(e) => warn!("furnace probe failed: {}", e),
        }
    }
    info!("furnace found BM1 RAM, starting handshake");

    let mut last = *furnace.telemetry();
    loop {
        interval.tick().await;
        // rejected frames are already counted and logged by the furnace
        let _ = furnace.update(tick_ms as u32);
        let telemetry = *furnace.telemetry();
        if telemetry != last {
            info!("{}", telemetry);
            last = telemetry;
        }
    }
}

async fn handle_client(
    stream: TcpStream,
    block: SharedRamBlock,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();
    let mut buf_reader = BufReader::new(reader);
    let mut handler = ProtocolHandler::new(block);

    let mut line = String::new();
    loop {
        line.clear();
        if buf_reader.read_line(&mut line).await? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = handler.handle_line(trimmed)?;
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        debug!("sent response: {}", response);
    }

    let stats = handler.stats();
    debug!(
        "session stats: {} executed, {} rejected",
        stats.commands_executed, stats.commands_rejected
    );
    Ok(())
}
