use cerastar_bm1::protocol::*;
use cerastar_bm1::SharedRamBlock;

#[test]
fn test_parse_ping() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let command = handler.parse_command(r#"{"id":7,"command_type":"Ping"}"#).unwrap();
    assert_eq!(command.id, 7);
    assert_eq!(command.command_type, CommandType::Ping);
}

#[test]
fn test_parse_set_targets() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let json = r#"{"id":1,"command_type":{"SetTargets":{"power":128,"heating_c":22,"hot_water_c":45,"stop_pump":false}}}"#;
    let command = handler.parse_command(json).unwrap();

    if let CommandType::SetTargets {
        power,
        heating_c,
        hot_water_c,
        stop_pump,
    } = command.command_type
    {
        assert_eq!(power, 128);
        assert_eq!(heating_c, 22);
        assert_eq!(hot_water_c, 45);
        assert!(!stop_pump);
    } else {
        panic!("Expected SetTargets command type");
    }
}

#[test]
fn test_parse_invalid_json() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    assert_eq!(handler.parse_command("{not json"), Err(ProtocolError::InvalidJson));
    assert_eq!(
        handler.parse_command(r#"{"id":1,"command_type":"Reboot"}"#),
        Err(ProtocolError::InvalidJson)
    );
}

#[test]
fn test_oversized_request_rejected() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let padding = " ".repeat(MAX_COMMAND_SIZE);
    let json = format!(r#"{{"id":1,"command_type":"Ping"}}{padding}"#);
    assert_eq!(handler.parse_command(&json), Err(ProtocolError::MessageTooLarge));
}

#[test]
fn test_execute_set_targets_updates_block() {
    let block = SharedRamBlock::new();
    let mut handler = ProtocolHandler::new(block.clone());

    let response = handler.execute(&Command {
        id: 3,
        command_type: CommandType::SetTargets {
            power: 0x80,
            heating_c: 22,
            hot_water_c: 45,
            stop_pump: false,
        },
    });

    assert_eq!(response.id, 3);
    assert_eq!(response.status, ResponseStatus::Success);
    let report = response.report.unwrap();
    assert!(report.snapshot.bm1_data_avail);
    assert_eq!(report.snapshot.bus_module.checksum, 0x3B);
    assert!(report.raw.is_none());
    assert_eq!(block.snapshot(), report.snapshot);
    assert_eq!(handler.stats().commands_executed, 1);
}

#[test]
fn test_execute_out_of_range_setpoint() {
    let block = SharedRamBlock::new();
    let before = block.raw_copy();
    let mut handler = ProtocolHandler::new(block.clone());

    let response = handler.execute(&Command {
        id: 4,
        command_type: CommandType::SetHotWaterSetpoint { temp_c: 140 },
    });

    assert_eq!(response.status, ResponseStatus::Error);
    assert!(response.message.unwrap().contains("out of range"));
    assert!(response.report.is_none());
    assert_eq!(block.raw_copy(), before);
    assert_eq!(handler.stats().commands_rejected, 1);
}

#[test]
fn test_ping_has_no_report() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let response = handler.execute(&Command {
        id: 9,
        command_type: CommandType::Ping,
    });
    assert_eq!(response.status, ResponseStatus::Success);
    assert!(response.report.is_none());
}

#[test]
fn test_dump_carries_raw_image() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let response = handler.execute(&Command {
        id: 10,
        command_type: CommandType::Dump,
    });

    let raw = response.report.unwrap().raw.unwrap();
    assert_eq!(raw.len(), 256);
    assert_eq!(&raw[0xE0..0xE8], b"IF 04.00");
    assert_eq!(raw[0xFE], 0xFC);
}

#[test]
fn test_mutators_through_handler() {
    let block = SharedRamBlock::new();
    let mut handler = ProtocolHandler::new(block.clone());
    let run = |handler: &mut ProtocolHandler, command_type| {
        let response = handler.execute(&Command { id: 1, command_type });
        assert_eq!(response.status, ResponseStatus::Success);
    };

    run(&mut handler, CommandType::SetPowerLevel { level: 0x40 });
    run(&mut handler, CommandType::SetHeatingSetpoint { temp_c: 35 });
    run(&mut handler, CommandType::StopPump);
    let state = block.snapshot().bus_module;
    assert_eq!(state.power, 0x40);
    assert_eq!(state.vl_set_x2.raw(), 70);
    assert!(state.pump_stopped());

    run(&mut handler, CommandType::StartPump);
    run(&mut handler, CommandType::StopHeating);
    let state = block.snapshot().bus_module;
    assert!(!state.pump_stopped());
    assert_eq!(state.vl_set_x2.raw(), 20);
    assert_eq!(state.ww_set_x2.raw(), 20);
    assert!(state.checksum_valid());
    assert_eq!(handler.stats().commands_executed, 5);
}

#[test]
fn test_handle_line_round_trip() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let line = handler
        .handle_line(r#"{"id":42,"command_type":{"SetPowerLevel":{"level":255}}}"#)
        .unwrap();

    let response: CommandResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(response.id, 42);
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.report.unwrap().snapshot.bus_module.power, 255);
}

#[test]
fn test_handle_line_invalid_command() {
    let mut handler = ProtocolHandler::new(SharedRamBlock::new());
    let line = handler.handle_line("garbage").unwrap();

    let response: CommandResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(response.id, 0);
    assert_eq!(response.status, ResponseStatus::InvalidCommand);
    assert_eq!(response.message.as_deref(), Some("Invalid JSON format"));
    assert_eq!(handler.stats().commands_rejected, 1);
}

#[test]
fn test_dump_response_fits_buffer() {
    let block = SharedRamBlock::new();
    block.with_block(|ram| ram.write_external(0x00, &[0xFF; 0x11]));
    let mut handler = ProtocolHandler::new(block);

    let line = handler.handle_line(r#"{"id":5,"command_type":"Dump"}"#).unwrap();
    let response: CommandResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(response.status, ResponseStatus::Success);
    assert_eq!(response.report.unwrap().raw.unwrap()[0x05], 0xFF);
}
