use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rpi_components::logging::{init_logger_with_level, level_from_verbosity, log_debug};
use rpi_components::BoardConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rpi-components")]
#[command(about = "Exercise Raspberry Pi peripherals from the command line")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON board configuration; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[cfg_attr(not(feature = "raspberry-pi"), allow(dead_code))]
enum Commands {
    /// Print the effective board configuration
    ShowConfig,
    /// Read one MCP3008 channel (selector 0-15)
    Adc {
        channel: u8,
        /// Report volts against the configured reference
        #[arg(long)]
        voltage: bool,
    },
    /// Dump a range of EEPROM bytes
    EepromRead {
        #[arg(default_value = "0")]
        start: usize,
        #[arg(default_value = "64")]
        len: usize,
    },
    /// Write text, or hex bytes with --hex, to the EEPROM
    EepromWrite {
        start: usize,
        data: String,
        #[arg(long)]
        hex: bool,
    },
    /// Show text on the 1602 LCD
    Lcd {
        text: String,
        /// Continue on the second line after 16 characters
        #[arg(long)]
        wrap: bool,
        /// Scroll the text until Ctrl-C
        #[arg(long)]
        marquee: bool,
        #[arg(long, default_value = "300")]
        interval_ms: u64,
        /// Scroll to the right instead of the left
        #[arg(long)]
        right: bool,
    },
    /// Print the radio STATUS, CONFIG and FIFO registers
    RadioStatus,
    /// Send one string payload over the radio
    RadioSend { message: String },
    /// Print received radio payloads until Ctrl-C
    RadioListen {
        /// Stop after this many payloads
        #[arg(long)]
        count: Option<usize>,
    },
    /// Take an averaged rangefinder reading
    Range,
    /// Report switch presses until Ctrl-C
    Switch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger_with_level(level_from_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => BoardConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            log_debug("No configuration file given, using built-in defaults");
            BoardConfig::default()
        }
    };

    match cli.command {
        Commands::ShowConfig => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
        command => hardware::run(command, &config).await,
    }
}

#[cfg(not(feature = "raspberry-pi"))]
mod hardware {
    use super::Commands;
    use rpi_components::{BoardConfig, ComponentError};

    pub async fn run(_command: Commands, _config: &BoardConfig) -> anyhow::Result<()> {
        Err(ComponentError::Config(
            "built without hardware support; rebuild with --features raspberry-pi".into(),
        )
        .into())
    }
}

#[cfg(feature = "raspberry-pi")]
mod hardware {
    use super::Commands;
    use anyhow::{bail, Context, Result};
    use rpi_components::hal::{Delay, RaspberryPiBoard, RpiOutput, RpiSpi, ThreadDelay};
    use rpi_components::logging::{log_error, log_info};
    use rpi_components::radio::nrf24::POWER_UP_DELAY;
    use rpi_components::radio::{attach_interrupt, IrqEvents};
    use rpi_components::rangefinder::centimeters;
    use rpi_components::util::{decode_hex, pretty_hex};
    use rpi_components::{
        BoardConfig, CancelSource, CancelToken, Channel, Eeprom, HcSr04, Lcd1602, Level,
        MarqueeDirection, MarqueeOptions, Mcp3008, Nrf24, PollingSwitch, Pull,
    };
    use std::time::Duration;

    type Radio = Nrf24<RpiSpi, RpiOutput, ThreadDelay>;

    /// Cancel the returned token on Ctrl-C
    fn cancel_on_ctrl_c() -> CancelToken {
        let source = CancelSource::new();
        let token = source.token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log_info("Interrupted");
                    source.cancel();
                }
                Err(e) => log_error(&format!("Cannot listen for Ctrl-C: {e}")),
            }
        });
        token
    }

    fn open_radio(board: &RaspberryPiBoard, config: &BoardConfig) -> Result<Radio> {
        let spi = board
            .spi(config.radio.spi_bus, config.radio.chip_select, config.radio.speed_hz)
            .context("opening radio SPI bus")?;
        let ce = board.output(config.radio.ce)?;
        Ok(Nrf24::new(spi, ce, board.delay())?)
    }

    /// Power up and listen on the configured channel and payload size
    fn start_radio(board: &RaspberryPiBoard, config: &BoardConfig) -> Result<Radio> {
        let mut radio = open_radio(board, config)?;
        radio.power_up()?;
        board.delay().delay(POWER_UP_DELAY);
        radio.set_channel(config.radio.channel)?;
        radio.set_payload_size(config.radio.payload_size, 0)?;
        radio.flush_all()?;
        radio.start_rx()?;
        Ok(radio)
    }

    pub async fn run(command: Commands, config: &BoardConfig) -> Result<()> {
        let board = RaspberryPiBoard::new(config.numbering).context("opening GPIO")?;

        match command {
            Commands::ShowConfig => println!("{}", config.to_json_pretty()?),
            Commands::Adc { channel, voltage } => {
                let spi = board.spi(config.adc.spi_bus, config.adc.chip_select, config.adc.speed_hz)?;
                let mut adc = Mcp3008::new(spi);
                let Some(channel) = Channel::from_selector(channel) else {
                    bail!("channel selector {channel} is not in 0-15");
                };
                if voltage {
                    println!("{channel}: {:.3} V", adc.read_voltage(channel, config.adc.vref)?);
                } else {
                    println!("{channel}: {}", adc.read(channel)?);
                }
            }
            Commands::EepromRead { start, len } => {
                let mut eeprom = Eeprom::new(
                    board.i2c(config.eeprom.i2c_bus)?,
                    board.delay(),
                    config.eeprom.base_address,
                    config.eeprom.address_mode,
                    config.eeprom.capacity,
                )?;
                let data = eeprom.read_bytes(start, len)?;
                print!("{}", pretty_hex(&data, start, 16));
            }
            Commands::EepromWrite { start, data, hex } => {
                let mut eeprom = Eeprom::new(
                    board.i2c(config.eeprom.i2c_bus)?,
                    board.delay(),
                    config.eeprom.base_address,
                    config.eeprom.address_mode,
                    config.eeprom.capacity,
                )?;
                if hex {
                    let bytes = decode_hex(&data)?;
                    eeprom.write_bytes(start, &bytes)?;
                    println!("Wrote {} bytes at 0x{start:04X}", bytes.len());
                } else {
                    eeprom.write_string(start, &data)?;
                    println!("Wrote {} characters at 0x{start:04X}", data.len());
                }
            }
            Commands::Lcd {
                text,
                wrap,
                marquee,
                interval_ms,
                right,
            } => {
                let lcd_config = &config.lcd;
                let data = [
                    board.output(lcd_config.data[0])?,
                    board.output(lcd_config.data[1])?,
                    board.output(lcd_config.data[2])?,
                    board.output(lcd_config.data[3])?,
                ];
                let mut lcd = Lcd1602::new(
                    board.output(lcd_config.enable)?,
                    board.output(lcd_config.read_write)?,
                    board.output(lcd_config.register_select)?,
                    data,
                    board.delay(),
                )?;
                if marquee {
                    let options = MarqueeOptions {
                        interval: Duration::from_millis(interval_ms),
                        direction: if right {
                            MarqueeDirection::Right
                        } else {
                            MarqueeDirection::Left
                        },
                        repeat: true,
                    };
                    lcd.marquee(&text, options, cancel_on_ctrl_c()).await?;
                    lcd.clear()?;
                } else {
                    lcd.write_str(&text, wrap)?;
                }
            }
            Commands::RadioStatus => {
                let mut radio = open_radio(&board, config)?;
                println!("State: {}", radio.state()?);
                println!("Channel: {}", radio.channel()?);
                print!("{}", radio.summary()?);
            }
            Commands::RadioSend { message } => {
                let mut radio = start_radio(&board, config)?;
                radio.write_str(&message)?;
                let mut outcome = IrqEvents::empty();
                for _ in 0..50 {
                    outcome = radio.service_interrupt()?;
                    if outcome.intersects(IrqEvents::DATA_SENT | IrqEvents::MAX_RETRIES) {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                radio.start_rx()?;
                if outcome.contains(IrqEvents::MAX_RETRIES) {
                    bail!("no acknowledgement after maximum retries");
                }
                if !outcome.contains(IrqEvents::DATA_SENT) {
                    bail!("transmission did not complete");
                }
                println!("Sent {:?}", message);
            }
            Commands::RadioListen { count } => {
                let mut radio = start_radio(&board, config)?;
                let mut cancel = cancel_on_ctrl_c();
                let mut irq = match config.radio.irq {
                    Some(pin) => Some(attach_interrupt(board.input(pin, Pull::Up)?)?),
                    None => None,
                };
                let mut received = 0usize;
                while count.map_or(true, |limit| received < limit) {
                    match irq.as_mut() {
                        Some(listener) => tokio::select! {
                            event = listener.next() => {
                                if event.is_none() {
                                    break;
                                }
                                radio.service_interrupt()?;
                            }
                            _ = cancel.cancelled() => break,
                        },
                        None => tokio::select! {
                            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
                            _ = cancel.cancelled() => break,
                        },
                    }
                    while radio.is_data_ready()? {
                        println!("{}", radio.read_str()?);
                        received += 1;
                    }
                }
                radio.power_down()?;
            }
            Commands::Range => {
                let range = &config.rangefinder;
                let mut sensor = HcSr04::new(
                    board.output(range.trigger)?,
                    board.input(range.echo, Pull::None)?,
                    board.delay(),
                )?;
                let unit = if range.metric {
                    sensor = sensor.with_conversion(centimeters);
                    "cm"
                } else {
                    "in"
                };
                let cancel = cancel_on_ctrl_c();
                let distance =
                    sensor.approximate_distance(range.samples, range.tolerance_percent, &cancel)?;
                println!("{distance:.2} {unit}");
            }
            Commands::Switch => {
                let switch_config = &config.switch;
                let input = board.input(switch_config.pin, switch_config.pull)?;
                let mut switch =
                    PollingSwitch::new(input, Level::from(switch_config.positive_trigger))
                        .with_poll_interval(Duration::from_millis(switch_config.poll_interval_ms));
                let mut events = switch.start_channel()?;
                let mut cancel = cancel_on_ctrl_c();
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Some(event) => println!("Switch #{} -> {}", event.switch_id, event.level),
                            None => break,
                        },
                        _ = cancel.cancelled() => break,
                    }
                }
                switch.stop().await?;
            }
        }
        Ok(())
    }
}
