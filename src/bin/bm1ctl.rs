use cerastar_bm1::config::{DEFAULT_HOST, DEFAULT_PORT};
use cerastar_bm1::diag::HexDump;
use cerastar_bm1::protocol::{Command, CommandResponse, CommandType, ResponseStatus, StatusReport};
use cerastar_bm1::ramblock::RAM_SIZE;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let default_port = DEFAULT_PORT.to_string();
    let byte_value = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .help(help)
            .required(true)
            .validator(|v| v.parse::<u8>().map(|_| ()).map_err(|_| "must be 0..=255".to_owned()))
    };

    let matches = App::new("bm1ctl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Control client for the BM1 RAM emulator")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Emulator host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Emulator port")
                .takes_value(true)
                .default_value(&default_port)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table"])
                .default_value("table")
                .global(true),
        )
        .subcommand(SubCommand::with_name("ping").about("Check that the emulator responds"))
        .subcommand(SubCommand::with_name("status").about("Show furnace telemetry and BM1 control block"))
        .subcommand(SubCommand::with_name("dump").about("Hex dump of the whole 256-byte RAM"))
        .subcommand(
            SubCommand::with_name("targets")
                .about("Set power, both setpoints and the pump flag in one write")
                .arg(byte_value("power", "Power level 0..=255 (0xFF = full)"))
                .arg(byte_value("heating", "Heating (Vorlauf) setpoint in degC"))
                .arg(byte_value("hot-water", "Hot water setpoint in degC"))
                .arg(Arg::with_name("stop-pump").long("stop-pump").help("Stop the circulation pump")),
        )
        .subcommand(
            SubCommand::with_name("pump")
                .about("Start or stop the circulation pump")
                .arg(
                    Arg::with_name("state")
                        .required(true)
                        .possible_values(&["start", "stop"]),
                ),
        )
        .subcommand(
            SubCommand::with_name("heating")
                .about("Heating control")
                .arg(Arg::with_name("state").required(true).possible_values(&["stop"])),
        )
        .subcommand(
            SubCommand::with_name("power")
                .about("Set the power level")
                .arg(byte_value("level", "Power level 0..=255")),
        )
        .subcommand(
            SubCommand::with_name("setpoint")
                .about("Set one setpoint")
                .arg(
                    Arg::with_name("circuit")
                        .required(true)
                        .possible_values(&["heating", "hot-water"]),
                )
                .arg(byte_value("celsius", "Temperature in whole degC")),
        )
        .get_matches();

    let host = matches.value_of("host").unwrap_or(DEFAULT_HOST);
    let port: u16 = matches.value_of("port").unwrap_or(&default_port).parse()?;
    let json = matches.value_of("format") == Some("json");

    let command_type = match matches.subcommand() {
        ("ping", _) => CommandType::Ping,
        ("status", _) => CommandType::Status,
        ("dump", _) => CommandType::Dump,
        ("targets", Some(m)) => CommandType::SetTargets {
            power: byte_arg(m, "power")?,
            heating_c: byte_arg(m, "heating")?,
            hot_water_c: byte_arg(m, "hot-water")?,
            stop_pump: m.is_present("stop-pump"),
        },
        ("pump", Some(m)) => match m.value_of("state") {
            Some("stop") => CommandType::StopPump,
            _ => CommandType::StartPump,
        },
        ("heating", _) => CommandType::StopHeating,
        ("power", Some(m)) => CommandType::SetPowerLevel {
            level: byte_arg(m, "level")?,
        },
        ("setpoint", Some(m)) => {
            let temp_c = byte_arg(m, "celsius")?;
            match m.value_of("circuit") {
                Some("hot-water") => CommandType::SetHotWaterSetpoint { temp_c },
                _ => CommandType::SetHeatingSetpoint { temp_c },
            }
        }
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            return Ok(());
        }
    };

    let command = Command {
        id: command_id(),
        command_type,
    };
    let raw_response = send_command(host, port, &command).await?;
    if json {
        println!("{}", raw_response);
        return Ok(());
    }

    let response: CommandResponse = serde_json::from_str(&raw_response)?;
    print_response(&command, &response);
    Ok(())
}

fn byte_arg(matches: &ArgMatches<'_>, name: &str) -> Result<u8, Box<dyn std::error::Error>> {
    Ok(matches.value_of(name).unwrap_or_default().parse()?)
}

fn command_id() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(1)
}

async fn send_command(host: &str, port: u16, command: &Command) -> Result<String, Box<dyn std::error::Error>> {
    let stream = TcpStream::connect((host, port)).await?;
    let (reader, mut writer) = stream.into_split();

    let request = serde_json::to_string(command)?;
    writer.write_all(request.as_bytes()).await?;
    writer.write_all(b"\n").await?;

    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line).await?;
    Ok(line.trim_end().to_owned())
}

fn print_response(command: &Command, response: &CommandResponse) {
    match response.status {
        ResponseStatus::Success => {}
        ResponseStatus::Error | ResponseStatus::InvalidCommand => {
            println!(
                "{} {}",
                "Command failed:".bright_red(),
                response.message.as_deref().unwrap_or("no reason given")
            );
            return;
        }
    }

    match (&command.command_type, &response.report) {
        (CommandType::Ping, _) => println!("{}", "Emulator is responsive".bright_green()),
        (CommandType::Dump, Some(report)) => print_dump(report),
        (_, Some(report)) => print_report(report),
        (_, None) => println!("{}", "OK".bright_green()),
    }
}

fn print_report(report: &StatusReport) {
    let s = &report.snapshot;
    let flag = |set: bool| if set { "ready".bright_green() } else { "pending".yellow() };

    println!("{}", "Furnace".bright_blue().bold());
    println!("  {} {}", "data available:".bright_white(), flag(s.furnace_data_avail));
    match &s.furnace {
        Some(f) => {
            println!("  {} {} (max {})", "supply:".bright_white(), f.vl_temp_x2, f.vl_max_x2);
            println!("  {} {} (max {})", "hot water:".bright_white(), f.ww_temp_x2, f.ww_max_x2);
            println!(
                "  {} {}  {} {}  {} {}",
                "flame:".bright_white(),
                on_off(f.flame_on()),
                "pump:".bright_white(),
                on_off(f.pump_on()),
                "error:".bright_white(),
                f.error
            );
        }
        None => println!("  {}", "no telemetry yet".dimmed()),
    }

    let bm = &s.bus_module;
    println!("{}", "BM1 control".bright_blue().bold());
    println!("  {} {}", "data available:".bright_white(), flag(s.bm1_data_avail));
    println!("  {} {}", "power:".bright_white(), bm.power);
    println!("  {} {}", "heating setpoint:".bright_white(), bm.vl_set_x2);
    println!("  {} {}", "hot water setpoint:".bright_white(), bm.ww_set_x2);
    println!("  {} {}", "pump:".bright_white(), if bm.pump_stopped() { "stopped".yellow() } else { "running".green() });
    let crc = format!("{:#04x}", bm.checksum);
    println!(
        "  {} {}",
        "checksum:".bright_white(),
        if bm.checksum_valid() { crc.green() } else { crc.red() }
    );
}

fn print_dump(report: &StatusReport) {
    let Some(raw) = report.raw.as_deref() else {
        println!("{}", "no RAM image in response".yellow());
        return;
    };
    let Ok(image) = <&[u8; RAM_SIZE]>::try_from(raw) else {
        println!("{} {} bytes", "unexpected RAM image size:".yellow(), raw.len());
        return;
    };
    print!("{}", HexDump(image));
}

fn on_off(on: bool) -> ColoredString {
    if on {
        "on".bright_green()
    } else {
        "off".dimmed()
    }
}
