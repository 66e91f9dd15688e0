use std::io::Cursor;
use std::time::Duration;

use instrument_console::{
    BusEvent, Console, Context, DeviceRegistry, Error, History, Input, Line, MockTransport, Step, dispatch,
};

const USB_DMM: &str = "USB0::0x2A8D::0x1301::MY57000123::INSTR";
const LAN_SCOPE: &str = "TCPIP0::192.168.1.50::inst0::INSTR";

fn console(mock: &MockTransport) -> Console<Vec<u8>> {
    let registry = DeviceRegistry::new(Box::new(mock.clone()));
    Console::new(Context::new(registry, History::in_memory(100)), Vec::new())
}

fn printed(console: &Console<Vec<u8>>) -> String {
    String::from_utf8_lossy(console.output()).into_owned()
}

#[tokio::test]
async fn list_select_then_read_voltage() {
    let mock = MockTransport::new([LAN_SCOPE, USB_DMM]);
    mock.reply("*IDN?", "Keysight Technologies,34465A,MY57000123,A.03.01")
        .reply(":MEASure:VOLTage:DC?", "+1.23456789E+00");
    let mut console = console(&mock);

    let step = console
        .run_script([
            "devicelist".to_string(),
            format!("deviceselect \"{USB_DMM}\""),
            "read_voltage".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(step, Step::Continue);

    let out = printed(&console);
    assert!(out.contains(&format!("Available VISA Resources:\n  {LAN_SCOPE}\n  {USB_DMM}\n")), "{out}");
    assert!(out.contains("Instrument IDN: Keysight Technologies,34465A"), "{out}");
    assert!(out.contains("DC Voltage: +1.23456789E+00 V"), "{out}");
}

#[tokio::test]
async fn read_voltage_returns_a_number() {
    let mock = MockTransport::new([USB_DMM]);
    mock.reply(":MEASure:VOLTage:DC?", "-0.004512");
    let registry = DeviceRegistry::new(Box::new(mock.clone()));
    let mut ctx = Context::new(registry, History::in_memory(10));

    ctx.registry.select(USB_DMM).await.unwrap();
    let command = Line::parse_words(["read_voltage"]).unwrap();
    let outcome = dispatch::execute(&mut ctx, &command).await.unwrap();
    assert_eq!(outcome.value(), Some(-0.004512));
}

#[tokio::test]
async fn read_voltage_before_select_is_rejected_without_traffic() {
    let mock = MockTransport::new([USB_DMM]);
    let mut console = console(&mock);

    let step = console.run_line("read_voltage").await.unwrap();
    assert_eq!(step, Step::Failed);
    assert!(printed(&console).contains("no device selected"));
    assert_eq!(mock.traffic(), 0);
}

#[tokio::test]
async fn every_instrument_command_needs_a_selection() {
    let mock = MockTransport::new([USB_DMM]);
    let registry = DeviceRegistry::new(Box::new(mock.clone()));
    let mut ctx = Context::new(registry, History::in_memory(10));

    let lines = [
        "id",
        "write *CLS",
        "query *IDN?",
        "reset",
        "wait_opc",
        "get_error",
        "dmm_func_set VOLT:DC",
        "dmm_range_set AUTO",
        "dmm_autoranging ON",
        "dmm_delay_set 0.1",
        "dmm_resolution_set 0.001",
        "dmm_measure_dc_v",
        "dmm_measure_ac_v",
        "dmm_measure_dc_i",
        "read_current",
        "dmm_measure_ac_i",
        "dmm_measure_continuity",
        "dmm_measure_diode",
        "dmm_measure2_resistance",
        "read_resistance",
        "dmm_measure4_resistance",
        "oscope_set_timebase 0.001",
        "oscope_set_vertscale 1,0.5",
        "oscope_measure_param 1,FREQ",
        "oscope_set_trigger_source CHAN1",
        "oscope_set_trigger_level 1,0.5",
        "oscope_set_trigger_slope 1,POS",
        "oscope_get_setup",
        "oscope_run",
        "oscope_screen_capture shot.png",
        "oscope_capture_data wave.csv",
        "afg_set_wave SIN,1000,1.0",
        "afg_output_on",
        "afg_output_off",
        "afg_psu_slew_set 10",
        "psu_set_voltage 5",
        "psu_set_current 1",
        "psu_output_on",
        "psu_output_off",
        "psu_set_ovp 6",
        "psu_set_ocp 1.1",
        "psu_set_otp 80",
        "psu_measure_output VOLT",
        "psu_protection_clear",
        "rf_set_center_freq 1GHz",
        "rf_set_span 10MHz",
        "rf_set_power -10dBm",
        "sa_set_rbw_vbw 10kHz,3kHz",
        "sa_read_marker 1",
        "vna_set_sweep 1GHz,2GHz,201",
        "vna_measure_sparam S21,MLOG",
        "vna_set_trace 1,S11,1",
        "vna_query_data",
        "rf_screen_capture sa.png",
        "eload_set_mode CURR",
        "eload_set_current 1",
        "eload_set_voltage 12",
        "eload_set_resistance 10",
        "eload_set_power 50",
        "eload_input_on",
        "eload_input_off",
        "eload_measure_input CURR",
        "eload_set_slew 0.1",
        "eload_set_transient 0.5A,2A,10ms",
        "eload_set_ovl 60",
        "eload_set_opl 150",
        "ping_device",
        "check_capabilities",
    ];
    for line in lines {
        let command = Line::parse_words(line.split_whitespace())
            .unwrap_or_else(|e| panic!("{line}: {}", e.render()));
        let err = dispatch::execute(&mut ctx, &command).await.unwrap_err();
        assert!(matches!(err, Error::NoDeviceSelected), "{line}: {err}");
    }
    assert_eq!(mock.traffic(), 0);
}

#[tokio::test]
async fn reselect_closes_prior_session() {
    let mock = MockTransport::new([LAN_SCOPE, USB_DMM]);
    let mut console = console(&mock);

    console.run_line(&format!("deviceselect {LAN_SCOPE}")).await.unwrap();
    console.run_line(&format!("deviceselect {USB_DMM}")).await.unwrap();

    let events = mock.events();
    let closed: Vec<&BusEvent> = events.iter().filter(|e| matches!(e, BusEvent::Close(_))).collect();
    assert_eq!(closed, vec![&BusEvent::Close(LAN_SCOPE.into())]);
    assert_eq!(console.context().registry.selected().unwrap().as_str(), USB_DMM);
}

#[tokio::test]
async fn failed_select_keeps_prior_session() {
    let mock = MockTransport::new([LAN_SCOPE]);
    mock.unreachable(USB_DMM);
    let mut console = console(&mock);

    console.run_line(&format!("deviceselect {LAN_SCOPE}")).await.unwrap();
    let step = console.run_line(&format!("deviceselect {USB_DMM}")).await.unwrap();
    assert_eq!(step, Step::Failed);
    assert!(printed(&console).contains("could not connect"));
    assert_eq!(console.context().registry.selected().unwrap().as_str(), LAN_SCOPE);
}

#[tokio::test]
async fn script_stops_at_first_failure() {
    let mock = MockTransport::new([LAN_SCOPE]);
    let mut console = console(&mock);

    let step = console
        .run_script([
            format!("deviceselect {LAN_SCOPE}"),
            "oscope_set_vertscale x,0.5".to_string(),
            "oscope_run".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(step, Step::Failed);
    assert!(!mock.writes().contains(&":RUN".to_string()));
}

#[tokio::test]
async fn help_is_not_a_failure() {
    let mock = MockTransport::new(Vec::<String>::new());
    let mut console = console(&mock);

    assert_eq!(console.run_line("help psu_set_ovp").await.unwrap(), Step::Continue);
    assert_eq!(console.run_line("?").await.unwrap(), Step::Continue);
    let out = printed(&console);
    assert!(out.contains("Example: psu_set_ovp 12.5"), "{out}");
    assert!(out.contains("deviceselect"), "{out}");
}

#[tokio::test]
async fn captures_land_in_files() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("screen.png");
    let data = dir.path().join("wave.txt");

    let mock = MockTransport::new([LAN_SCOPE]);
    mock.reply_bytes(":DISPlay:DATA? PNG", b"#3005\x89PNG\r\n".to_vec())
        .reply(":WAVeform:PREamble?", "0,0,4,1,0,0.5,0,0.1,100,0")
        .reply(":WAVeform:DATA?", "100,110,90,100");
    let mut console = console(&mock);

    let step = console
        .run_script([
            format!("deviceselect {LAN_SCOPE}"),
            format!("oscope_screen_capture \"{}\"", image.display()),
            format!("oscope_capture_data \"{}\"", data.display()),
        ])
        .await
        .unwrap();
    assert_eq!(step, Step::Continue, "{}", printed(&console));

    assert_eq!(std::fs::read(&image).unwrap(), b"\x89PNG\r");
    let text = std::fs::read_to_string(&data).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Time (s)\tVoltage (V)");
    assert_eq!(lines[2], "5.000000e-1\t1.000000e0");
}

#[tokio::test]
async fn interactive_session_records_history_and_exits() {
    let mock = MockTransport::new([LAN_SCOPE]);
    mock.reply("*IDN?", "RIGOL,DS1054Z,DS1ZA1,00.04.04");
    let mut console = console(&mock);

    let input = format!("devicelist\ndeviceselect {LAN_SCOPE}\nhistory 1\nexit\nid\n");
    let input = Input::from_reader(Cursor::new(input.into_bytes())).unwrap();
    console.interactive(input, std::future::pending()).await.unwrap();

    let out = printed(&console);
    assert!(out.starts_with("Welcome to the Instrument Console"));
    assert!(out.contains("    3  history 1"), "{out}");
    assert!(out.contains(&format!("Closing connection to {LAN_SCOPE}...")), "{out}");
    assert!(out.trim_end().ends_with("Exiting console. Goodbye!"), "{out}");
    // Nothing after `exit` runs.
    assert_eq!(mock.writes().iter().filter(|w| w.as_str() == "*IDN?").count(), 1);
    assert_eq!(mock.events().last(), Some(&BusEvent::Close(LAN_SCOPE.into())));
    assert!(console.context().registry.selected().is_none());
}

#[tokio::test]
async fn interrupt_leaves_without_waiting_for_input() {
    let mock = MockTransport::new([LAN_SCOPE]);
    let mut console = console(&mock);
    console.run_line(&format!("deviceselect {LAN_SCOPE}")).await.unwrap();

    // The operator never types anything; the sender stays open.
    let (_operator, input) = Input::channel();
    let interrupt = tokio::time::sleep(Duration::from_millis(20));
    tokio::time::timeout(Duration::from_secs(5), console.interactive(input, interrupt))
        .await
        .expect("console did not leave on interrupt")
        .unwrap();

    let out = printed(&console);
    assert!(out.contains("Ctrl+C detected."), "{out}");
    assert!(out.contains(&format!("Closing connection to {LAN_SCOPE}...")), "{out}");
    assert!(out.trim_end().ends_with("Exiting console. Goodbye!"), "{out}");
    assert!(console.context().registry.selected().is_none());
}

#[tokio::test]
async fn failed_start_selection_shuts_down() {
    let mock = MockTransport::new([USB_DMM]);
    mock.unreachable(USB_DMM);
    let mut console = console(&mock);

    let step = console.select_at_start(USB_DMM).await.unwrap();
    assert_eq!(step, Step::Failed);
    assert!(printed(&console).contains("could not connect"));
    assert!(console.context().registry.selected().is_none());
    assert_eq!(mock.traffic(), 0);
}

#[tokio::test]
async fn start_selection_then_batch_closes_the_session() {
    let mock = MockTransport::new([USB_DMM]);
    mock.reply(":MEASure:VOLTage:DC?", "+5.0E+00");
    let mut console = console(&mock);

    assert_eq!(console.select_at_start(USB_DMM).await.unwrap(), Step::Continue);
    let step = console.run_batch(["read_voltage"]).await.unwrap();
    assert_eq!(step, Step::Continue);
    assert!(printed(&console).contains("DC Voltage: +5.0E+00 V"));
    assert_eq!(mock.events().last(), Some(&BusEvent::Close(USB_DMM.into())));
}

#[tokio::test]
async fn negative_values_and_numeric_keywords_reach_the_instrument() {
    let mock = MockTransport::new([USB_DMM]);
    let mut console = console(&mock);

    let step = console
        .run_script([
            format!("deviceselect {USB_DMM}"),
            "psu_set_voltage -1.5".to_string(),
            "psu_set_ovp MAX".to_string(),
            "dmm_range_set min".to_string(),
            "eload_set_transient -0.5A,2A,10ms".to_string(),
            "oscope_set_trigger_level 1,-0.25".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(step, Step::Continue, "{}", printed(&console));

    let writes = mock.writes();
    for expected in [
        ":VOLTage -1.5",
        ":VOLTage:PROTection:LEVel MAX",
        ":SENSe:RANGe MIN",
        ":CURRent:STATic -0.5A",
    ] {
        assert!(writes.iter().any(|w| w == expected), "{expected} not in {writes:?}");
    }
}
